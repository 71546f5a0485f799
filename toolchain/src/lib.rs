//! Driver for the four LLVM binaries the pipeline shells out to:
//! `clang` (compile), `llvm-link` (link bitcode modules), `llvm-as`
//! (assemble `.ll` text to `.bc`), and `llvm-dis` (the inverse).
//!
//! Grounded in `original_source/sputnik/compiler.py`, which wraps the same
//! four tools behind `subprocess.run(..., shell=True)`. The `Command`
//! builder pattern (explicit `.arg()` calls, captured stderr, a
//! `find_*`-style PATH probe) is carried over from
//! `compiler/src/codegen/aot_compiler.rs`.

mod scoped_tempdir;

use std::path::{Path, PathBuf};
use std::process::Command;

use diagnostics::SputnikError;
use log::debug;

pub use scoped_tempdir::ScopedTempDir;

/// Paths to the four toolchain binaries. Defaults to whatever `clang`,
/// `llvm-link`, `llvm-as`, and `llvm-dis` resolve to on `$PATH`.
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub clang: String,
    pub llvm_link: String,
    pub llvm_as: String,
    pub llvm_dis: String,
}

impl Default for Toolchain {
    fn default() -> Self {
        Toolchain {
            clang: "clang".to_string(),
            llvm_link: "llvm-link".to_string(),
            llvm_as: "llvm-as".to_string(),
            llvm_dis: "llvm-dis".to_string(),
        }
    }
}

impl Toolchain {
    /// Probe `$PATH` for a few common version suffixes, falling back to
    /// the unversioned names the `Default` impl uses.
    pub fn discover() -> Toolchain {
        Toolchain {
            clang: find_candidate(&["clang", "clang-18", "clang-17", "clang-14"]),
            llvm_link: find_candidate(&["llvm-link", "llvm-link-18", "llvm-link-14"]),
            llvm_as: find_candidate(&["llvm-as", "llvm-as-18", "llvm-as-14"]),
            llvm_dis: find_candidate(&["llvm-dis", "llvm-dis-18", "llvm-dis-14"]),
        }
    }

    /// Compile `src` into `dest` with `cflags`. Returns `Ok(Some(stderr))`
    /// when the compiler exits zero but still printed something (a
    /// warning), `Ok(None)` on a silent success.
    pub fn compile_file(
        &self,
        dest: &Path,
        src: &Path,
        cflags: &[String],
        cwd: Option<&Path>,
    ) -> Result<Option<String>, SputnikError> {
        let mut cmd = Command::new(&self.clang);
        cmd.args(cflags).arg("-o").arg(dest).arg(src);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        debug!("compile_file: {:?}", cmd);
        run(cmd).map_err(|stderr| SputnikError::Compile {
            file: src.to_path_buf(),
            stderr,
        })
    }

    /// Link `files` into `dest` with `llvm-link`.
    pub fn link(&self, dest: &Path, files: &[PathBuf], args: &[String]) -> Result<Option<String>, SputnikError> {
        let mut cmd = Command::new(&self.llvm_link);
        cmd.args(args).arg("-o").arg(dest).args(files);
        debug!("link: {:?}", cmd);
        run(cmd).map_err(|stderr| SputnikError::Link { stderr })
    }

    pub fn disassemble(&self, dest: &Path, src: &Path) -> Result<Option<String>, SputnikError> {
        let mut cmd = Command::new(&self.llvm_dis);
        cmd.arg("-o").arg(dest).arg(src);
        debug!("disassemble: {:?}", cmd);
        run(cmd).map_err(|stderr| SputnikError::Compile {
            file: src.to_path_buf(),
            stderr,
        })
    }

    pub fn assemble(&self, dest: &Path, src: &Path) -> Result<Option<String>, SputnikError> {
        let mut cmd = Command::new(&self.llvm_as);
        cmd.arg("-o").arg(dest).arg(src);
        debug!("assemble: {:?}", cmd);
        run(cmd).map_err(|stderr| SputnikError::Compile {
            file: src.to_path_buf(),
            stderr,
        })
    }

    /// Compile a whole `src -> dest` map, collecting per-file failures
    /// instead of aborting the batch (§4.A). Mirrors
    /// `compiler.py::compile_collection`'s stats dict field-for-field.
    pub fn compile_collection(
        &self,
        srcs: &[(PathBuf, PathBuf)],
        cflags: &[String],
        cwd: Option<&Path>,
    ) -> (Vec<PathBuf>, CompileStats) {
        let mut files = Vec::new();
        let mut stats = CompileStats::default();

        for (src, dest) in srcs {
            match self.compile_file(dest, src, cflags, cwd) {
                Ok(warning) => {
                    if warning.is_some() {
                        stats.warning += 1;
                    }
                    stats.compiled += 1;
                    files.push(dest.clone());
                }
                Err(e) => {
                    debug!("compile_collection: {} failed: {}", src.display(), e);
                    stats.failed += 1;
                }
            }
        }

        (files, stats)
    }
}

/// Outcome counters for a batch compile, matching the Python reference's
/// `{'skipped', 'compiled', 'failed', 'warning'}` dict. `skipped` is
/// reserved for a future incremental-build short-circuit and is never
/// incremented today, same as upstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileStats {
    pub skipped: usize,
    pub compiled: usize,
    pub failed: usize,
    pub warning: usize,
}

fn find_candidate(candidates: &[&str]) -> String {
    for candidate in candidates {
        let ok = Command::new(candidate)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false);
        if ok {
            return candidate.to_string();
        }
    }
    candidates[0].to_string()
}

/// Run `cmd`, returning `Ok(Some(stderr))` on a zero exit with non-empty
/// stderr (a warning), `Ok(None)` on a clean zero exit, and `Err(stderr)`
/// on a non-zero exit.
fn run(mut cmd: Command) -> Result<Option<String>, String> {
    let output = cmd.output().map_err(|e| e.to_string())?;
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if !output.status.success() {
        return Err(stderr);
    }
    if stderr.is_empty() {
        Ok(None)
    } else {
        Ok(Some(stderr))
    }
}
