//! Target-blob assembly (§4.H): orchestrates the toolchain calls that turn
//! a synthesized harness — plus the libraries under test and their
//! optional semantic wrappers — into a single build artifact for either
//! engine.
//!
//! Grounded in
//! `original_source/sputnik/crafter.py::TestHarness.build_target`/
//! `build_target_symex`/`build_target_fuzzing`/`generate_toolchain_fuzzing`.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use diagnostics::SputnikError;
use harness::{Engine, Harness, TestCase};
use toolchain::Toolchain;

use crate::semantic::build_semantic_wrappers;

/// Drives the toolchain invocations `build_target` needs. A thin wrapper
/// around `Toolchain` so tests can point it at nonexistent binaries.
pub struct Assembler {
    toolchain: Toolchain,
}

impl Default for Assembler {
    fn default() -> Self {
        Assembler {
            toolchain: Toolchain::default(),
        }
    }
}

impl Assembler {
    pub fn new() -> Assembler {
        Assembler::default()
    }

    pub fn with_toolchain(toolchain: Toolchain) -> Assembler {
        Assembler { toolchain }
    }

    /// Build one target blob for the harness's current configuration
    /// inside the caller-provided scratch directory `tmp_dir`. When
    /// `keep_test_harness` is set, a copy of the generated `main.c` is
    /// preserved at `target_folder/test_harness.c`.
    pub fn build_target(
        &self,
        harness: &mut Harness,
        test: &dyn TestCase,
        tmp_dir: &Path,
        target_folder: &Path,
        keep_test_harness: bool,
    ) -> Result<PathBuf, SputnikError> {
        fs::create_dir_all(target_folder)?;

        let libs = harness.ctx().libs.clone();
        let mut links: Vec<PathBuf> = libs.iter().map(|l| l.target.clone()).collect();

        if !harness.semantic_wrappers.is_empty() {
            for lib in &libs {
                let target_semwrapper = tmp_dir.join(format!("semantics_{}.ll", lib.name));
                links.extend(build_semantic_wrappers(&self.toolchain, harness, lib, &target_semwrapper)?);
            }
        }

        let source_test_harness = tmp_dir.join("main.c");
        harness.write_test_harness(test, &source_test_harness)?;

        let engine = harness
            .engine()
            .expect("engine must be set before a target can be built");
        let target = match engine {
            Engine::Symex => self.build_target_symex(harness, tmp_dir, &source_test_harness, target_folder, links)?,
            Engine::Fuzzing => self.build_target_fuzzing(harness, tmp_dir, &source_test_harness, target_folder, links)?,
        };

        if keep_test_harness {
            fs::copy(&source_test_harness, target_folder.join("test_harness.c"))?;
        }

        Ok(target)
    }

    fn build_target_symex(
        &self,
        harness: &Harness,
        tmp_dir: &Path,
        source_test_harness: &Path,
        target_folder: &Path,
        mut links: Vec<PathBuf>,
    ) -> Result<PathBuf, SputnikError> {
        let llvm_test_harness = tmp_dir.join("main.ll");
        let cflags = vec![
            "-S".to_string(),
            "-emit-llvm".to_string(),
            "-g".to_string(),
            format!("-I{}", harness.ctx().symex.klee_headers.display()),
        ];
        self.toolchain
            .compile_file(&llvm_test_harness, source_test_harness, &cflags, None)?;

        links.push(llvm_test_harness);

        let target = target_folder.join(format!("{}.bc", harness.function));
        self.toolchain.link(&target, &links, &[])?;
        Ok(target)
    }

    fn build_target_fuzzing(
        &self,
        harness: &mut Harness,
        tmp_dir: &Path,
        source_test_harness: &Path,
        target_folder: &Path,
        links: Vec<PathBuf>,
    ) -> Result<PathBuf, SputnikError> {
        let pic_cflags = vec!["-fPIC".to_string(), "-c".to_string()];

        let mut compiled_links = Vec::new();
        for src in &links {
            let name = src
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "link".to_string());
            let dest = tmp_dir.join(format!("{name}.o"));
            self.toolchain.compile_file(&dest, src, &pic_cflags, None)?;
            compiled_links.push(dest);
        }

        let target = target_folder.join(format!("{}.afl", harness.function));
        run_afl_gcc(&target, source_test_harness, &compiled_links)?;

        generate_toolchain_fuzzing(harness, target_folder, &target)?;

        Ok(target)
    }
}

/// `compiler.py::run_command`'s one non-LLVM-toolchain caller: `afl-gcc`
/// isn't one of the four binaries `toolchain::Toolchain` drives, so this
/// shells out directly, the same `Command`-builder idiom `Toolchain` uses.
fn run_afl_gcc(target: &Path, source_test_harness: &Path, objects: &[PathBuf]) -> Result<(), SputnikError> {
    let mut cmd = Command::new("afl-gcc");
    cmd.arg("-o").arg(target).arg(source_test_harness).args(objects);
    let output = cmd.output().map_err(|e| SputnikError::Compile {
        file: source_test_harness.to_path_buf(),
        stderr: e.to_string(),
    })?;
    if !output.status.success() {
        return Err(SputnikError::Compile {
            file: source_test_harness.to_path_buf(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(())
}

/// Writes the `afl-fuzz` launch script and seed corpus for a just-built
/// fuzzing target, and flips the harness back into fuzzing-engine state
/// (matching the reference, which calls `set_engine_fuzzing()` again at
/// the end of this step).
fn generate_toolchain_fuzzing(harness: &mut Harness, target_folder: &Path, target: &Path) -> Result<(), SputnikError> {
    let target_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let run_sh = ["#!/bin/sh", "rm -rf findings/*", &format!("afl-fuzz -i testcases -o findings -- ./{target_name}")].join("\n");
    fs::write(target_folder.join("run.sh"), run_sh)?;

    fs::create_dir_all(target_folder.join("findings"))?;
    fs::create_dir_all(target_folder.join("testcases"))?;

    for (name, data) in harness.testcases_fuzzing() {
        fs::write(target_folder.join("testcases").join(format!("testcase_{name}")), data)?;
    }

    harness.set_engine_fuzzing();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use harness::config::{FuzzingConfig, SymexConfig, VerifierKind};
    use harness::HarnessContext;
    use library::config::LibraryConfigFile;
    use library::Library;

    struct FixedSignature {
        function: &'static str,
        signature: &'static str,
    }

    impl TestCase for FixedSignature {
        fn configure(&self, harness: &mut Harness) -> Result<(), SputnikError> {
            harness.function = self.function.to_string();
            harness.set_signature(Some(self.signature))?;
            harness.set_engine_symex();
            Ok(())
        }
    }

    fn make_ctx(root: &Path, name: &str) -> HarnessContext {
        fs::create_dir_all(root.join(format!("{name}-1.0/src"))).unwrap();
        fs::write(
            root.join(format!("{name}-1.0/src/isdigit.c")),
            "int isdigit(int c) { return 0; }\n",
        )
        .unwrap();
        let config = LibraryConfigFile {
            config_version: "0.0.1".to_string(),
            name: name.to_string(),
            directory: format!("{name}-1.0/"),
            compiler_flags: String::new(),
            traversals: vec!["src".to_string()],
            target: format!("{name}.bc"),
        };
        fs::write(root.join(Library::CONFIG_NAME), serde_json::to_string(&config).unwrap()).unwrap();

        HarnessContext {
            libs: vec![Library::load(root).unwrap()],
            general_max_array_width: 8,
            wordsize: 64,
            verifier: VerifierKind::New,
            symex: SymexConfig {
                klee_headers: PathBuf::from("/usr/include/klee"),
            },
            fuzzing: FuzzingConfig { extra_cflags: Vec::new() },
        }
    }

    #[test]
    fn build_target_symex_fails_cleanly_without_a_real_toolchain() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = make_ctx(tmp.path(), "musl");
        let mut harness = Harness::new(ctx);
        let test = FixedSignature {
            function: "isdigit",
            signature: "int isdigit(int c);",
        };
        harness.prepare(&test).unwrap();

        let assembler = Assembler::with_toolchain(Toolchain {
            clang: "definitely-not-a-real-binary-xyz".to_string(),
            ..Toolchain::default()
        });

        let scratch = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let result = assembler.build_target(&mut harness, &test, scratch.path(), out.path(), false);
        assert!(result.is_err());
        assert!(scratch.path().join("main.c").is_file());
    }

    #[test]
    fn generate_toolchain_fuzzing_writes_run_script_and_seed_corpus() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = make_ctx(tmp.path(), "musl");
        let mut harness = Harness::new(ctx);
        harness.function = "isdigit".to_string();
        harness.set_engine_fuzzing();

        let target_folder = tempfile::tempdir().unwrap();
        let target = target_folder.path().join("isdigit.afl");
        fs::write(&target, "").unwrap();

        generate_toolchain_fuzzing(&mut harness, target_folder.path(), &target).unwrap();

        let run_sh = fs::read_to_string(target_folder.path().join("run.sh")).unwrap();
        assert!(run_sh.contains("afl-fuzz -i testcases -o findings -- ./isdigit.afl"));
        assert!(target_folder.path().join("findings").is_dir());
        assert!(target_folder.path().join("testcases/testcase_default").is_file());
    }
}
