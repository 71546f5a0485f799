//! Per-library build orchestration (§4.E): incremental compile, link,
//! rename, and integrity check, in the order
//! `original_source/prebuild.py::Builder.run` runs them.

pub mod config;

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};

use config::{BuilderConfig, RunOptions};
use diagnostics::SputnikError;
use library::Library;
use toolchain::{ScopedTempDir, Toolchain};

pub struct Builder {
    pub library: Library,
    toolchain: Toolchain,
}

/// Outcome of a full `run`: every file linked in, the rename mapping that
/// was applied, and whether every configured function survived the
/// rename (§4.E invariant: build artifacts are produced either way).
#[derive(Debug)]
pub struct BuildReport {
    pub files: Vec<PathBuf>,
    pub mapping: Vec<(String, String)>,
    pub integrity_ok: bool,
    pub missing: Vec<String>,
}

impl Builder {
    pub fn new(library: Library) -> Builder {
        Builder {
            library,
            toolchain: Toolchain::default(),
        }
    }

    pub fn with_toolchain(library: Library, toolchain: Toolchain) -> Builder {
        Builder { library, toolchain }
    }

    fn cflags(&self) -> Vec<String> {
        format!("-S -emit-llvm -g -fno-builtin {}", self.library.compiler_flags)
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    /// Compile every not-yet-built source into `.ll` text under the
    /// library's build directory, returning every file (old and new)
    /// considered part of the library's target.
    pub fn pre_compile(&mut self, rebuild: bool) -> Result<Vec<PathBuf>, SputnikError> {
        let included_files_path = self.library.builddir.join("included_files.json");

        let old_files: Vec<PathBuf> = if rebuild {
            debug!("{}: explicit rebuild", self.library.name);
            let _ = fs::remove_dir_all(&self.library.builddir);
            fs::create_dir_all(&self.library.builddir)?;
            Vec::new()
        } else if !included_files_path.is_file() {
            debug!(
                "{}: no prior build state, forcing rebuild",
                self.library.name
            );
            return self.pre_compile(true);
        } else {
            self.library
                .build
                .included_files
                .iter()
                .map(PathBuf::from)
                .collect()
        };

        let cflags = self.cflags();

        let mut new_files = Vec::new();
        for src in self.library.sources()? {
            let dest = self.library.builddir.join(src.with_extension("ll"));
            if !old_files.contains(&dest) {
                new_files.push((src, dest));
            }
        }

        for (_, dest) in &new_files {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
        }

        let (compiled_files, stats) =
            self.toolchain
                .compile_collection(&new_files, &cflags, Some(&self.library.directory));

        debug!("{}: compile statistics:", self.library.name);
        debug!("    compiled files: {}", stats.compiled);
        debug!("    skipped files:  {}", stats.skipped);
        debug!("    nr. failed:     {}", stats.failed);
        debug!("    nr. warnings:   {}", stats.warning);

        let mut all_files = old_files;
        all_files.extend(compiled_files);

        self.library.build.included_files = all_files
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        self.library.build.store_included_files()?;

        Ok(all_files)
    }

    /// Disassemble the linked target, rename every symbol it defines, and
    /// reassemble in place, keeping the pre-rename blob alongside it as
    /// `<target>.unrenamed` for debugging.
    pub fn rename(&mut self) -> Result<Vec<(String, String)>, SputnikError> {
        let tmp = ScopedTempDir::new()?;
        let stem = self
            .library
            .target
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "target".to_string());
        let tmp_file = format!("{}.ll", stem);

        let file_ll = tmp.join(&tmp_file);
        let file_ll_renamed = tmp.join(format!("new_{}", tmp_file));

        debug!("{}: tmp build dir is '{}'", self.library.name, tmp.path().display());

        let _ = self.toolchain.disassemble(&file_ll, &self.library.target)?;
        let mapping = renamer::rename(&file_ll_renamed, &file_ll, &self.library.name)?;

        fs::copy(&self.library.target, append_suffix(&self.library.target, ".unrenamed"))?;
        let _ = self.toolchain.assemble(&self.library.target, &file_ll_renamed)?;

        Ok(mapping)
    }

    /// Compile a call-wrapper translation unit into the library's build
    /// directory so it can be linked alongside the library's own sources.
    pub fn inject_wrappers(&self, filename: &Path) -> Result<PathBuf, SputnikError> {
        let cflags = self.cflags();
        let target = self.library.builddir.join("wrapper.ll");
        self.toolchain
            .compile_file(&target, filename, &cflags, Some(&self.library.directory))?;
        Ok(target)
    }

    /// Run the full build: compile, optionally inject wrappers, link,
    /// rename, and check that every configured function is still there.
    pub fn run(&mut self, config: &BuilderConfig, options: RunOptions) -> Result<BuildReport, SputnikError> {
        info!("{}: start build process", self.library.name);

        let mut files = self.pre_compile(options.rebuild)?;

        if let Some(wrappers) = &config.wrappers {
            let w = fs::canonicalize(wrappers)?;
            debug!("{}: inject wrappers '{}'", self.library.name, w.display());
            files.push(self.inject_wrappers(&w)?);
        }

        debug!("{}: link all files to '{}'", self.library.name, self.library.target.display());
        if let Some(warning) = self.toolchain.link(&self.library.target, &files, &[])? {
            warn!("{}: linker warning: {}", self.library.name, warning);
        }

        debug!("{}: rename content", self.library.name);
        let mapping = self.rename()?;
        self.library.build.name_mapping = mapping.iter().cloned().collect();
        self.library.build.store_name_mapping()?;

        let mut missing = Vec::new();
        for funcname in config.functions.keys() {
            let key = format!("@{}", funcname);
            if !self.library.build.name_mapping.contains_key(&key) {
                missing.push(key.clone());
                warn!("{}: missing function '{}'", self.library.name, key);
            }
        }

        let integrity_ok = missing.is_empty();
        if integrity_ok {
            info!("{}: integrity check passed", self.library.name);
        } else {
            error!("{}: integrity check failed", self.library.name);
        }
        info!("{}: build finished", self.library.name);

        Ok(BuildReport {
            files,
            mapping,
            integrity_ok,
            missing,
        })
    }
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use library::config::LibraryConfigFile;

    fn make_library(root: &Path, name: &str) -> Library {
        fs::create_dir_all(root.join(format!("{name}-1.0"))).unwrap();
        fs::create_dir_all(root.join(format!("{name}-1.0/src"))).unwrap();
        fs::write(
            root.join(format!("{name}-1.0/src/foo.c")),
            "int foo(int x) { return x; }\n",
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
        fs::write(
            root.join(Library::CONFIG_NAME),
            serde_json::to_string(&config).unwrap(),
        )
        .unwrap();

        Library::load(root).unwrap()
    }

    #[test]
    fn pre_compile_without_clang_counts_failures_but_does_not_error() {
        let tmp = tempfile::tempdir().unwrap();
        let library = make_library(tmp.path(), "musl");
        let toolchain = Toolchain {
            clang: "definitely-not-a-real-binary-xyz".to_string(),
            ..Toolchain::default()
        };
        let mut builder = Builder::with_toolchain(library, toolchain);
        let files = builder.pre_compile(true).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn append_suffix_appends_to_full_filename() {
        let p = append_suffix(Path::new("/tmp/musl.bc"), ".unrenamed");
        assert_eq!(p, PathBuf::from("/tmp/musl.bc.unrenamed"));
    }
}
