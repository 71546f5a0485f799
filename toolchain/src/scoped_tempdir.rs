//! A scratch directory for the disassemble/rewrite/reassemble round trips
//! that symbol renaming (§4.C/§4.E) and harness assembly (§4.H) both need.
//!
//! `original_source/sputnik/tools.py` hand-rolls this with
//! `generate_tmp_dir`/`cleanup_tmp_dir`: a random name under `/tmp`, and
//! an explicit `shutil.rmtree` once the caller is done with it — cleanup
//! that never runs if an exception unwinds past it. `tempfile::TempDir`
//! gives the same "sputnik_"-prefixed scratch directory but removes it
//! on every exit path, including a panic unwind, which is why this is a
//! thin wrapper around it rather than a reimplementation.

use std::path::{Path, PathBuf};

use diagnostics::SputnikError;
use tempfile::TempDir;

pub struct ScopedTempDir {
    inner: TempDir,
}

impl ScopedTempDir {
    pub fn new() -> Result<ScopedTempDir, SputnikError> {
        let inner = tempfile::Builder::new()
            .prefix("sputnik_")
            .tempdir()
            .map_err(SputnikError::from)?;
        Ok(ScopedTempDir { inner })
    }

    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.inner.path().join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_exists_while_alive_and_gone_after_drop() {
        let dir = ScopedTempDir::new().unwrap();
        let path = dir.path().to_path_buf();
        assert!(path.is_dir());
        drop(dir);
        assert!(!path.exists());
    }

    #[test]
    fn join_builds_a_path_under_the_scratch_dir() {
        let dir = ScopedTempDir::new().unwrap();
        let file = dir.join("new_foo.ll");
        assert_eq!(file, dir.path().join("new_foo.ll"));
    }
}
