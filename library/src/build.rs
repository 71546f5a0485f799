//! Per-library build state (§4.D): the rename mapping and the set of
//! source files already folded into the library's target, both persisted
//! as JSON next to the build directory so a rerun can pick up where the
//! last one left off.
//!
//! Grounded in `original_source/sputnik/library.py::Build`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use diagnostics::SputnikError;

const FILENAME_NAME_MAPPING: &str = "rename_mapping.json";
const FILENAME_INCLUDED_FILES: &str = "included_files.json";

#[derive(Debug, Clone)]
pub struct Build {
    pub dir: PathBuf,
    pub name_mapping: HashMap<String, String>,
    pub included_files: Vec<String>,
}

impl Build {
    /// Load build state from `dir`, tolerating a missing or malformed
    /// state file the same way the Python reference does (empty state).
    pub fn load(dir: impl Into<PathBuf>) -> Build {
        let dir = dir.into();
        let name_mapping = Self::load_name_mapping(&dir);
        let included_files = Self::load_included_files(&dir);
        Build {
            dir,
            name_mapping,
            included_files,
        }
    }

    /// `@old -> new` (without the leading `@`), or an error if `funcname`
    /// was never renamed.
    pub fn resolve_function(&self, funcname: &str) -> Result<&str, SputnikError> {
        let key = format!("@{}", funcname);
        self.name_mapping
            .get(&key)
            .map(|new_name| new_name.trim_start_matches('@'))
            .ok_or_else(|| SputnikError::Integrity {
                missing: vec![key],
            })
    }

    pub fn reload(&mut self) {
        self.name_mapping = Self::load_name_mapping(&self.dir);
        self.included_files = Self::load_included_files(&self.dir);
    }

    pub fn flush(&mut self) {
        self.name_mapping.clear();
        self.included_files.clear();
    }

    fn load_included_files(dir: &Path) -> Vec<String> {
        let path = dir.join(FILENAME_INCLUDED_FILES);
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    pub fn store_included_files(&self) -> Result<(), SputnikError> {
        let path = self.dir.join(FILENAME_INCLUDED_FILES);
        let json = serde_json::to_string(&self.included_files)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    fn load_name_mapping(dir: &Path) -> HashMap<String, String> {
        let path = dir.join(FILENAME_NAME_MAPPING);
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    pub fn store_name_mapping(&self) -> Result<(), SputnikError> {
        let path = self.dir.join(FILENAME_NAME_MAPPING);
        let json = serde_json::to_string(&self.name_mapping)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn abspath(&self, path: impl AsRef<Path>) -> PathBuf {
        self.dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_on_missing_files_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let build = Build::load(tmp.path());
        assert!(build.name_mapping.is_empty());
        assert!(build.included_files.is_empty());
    }

    #[test]
    fn store_and_reload_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let mut build = Build::load(tmp.path());
        build
            .name_mapping
            .insert("@strcpy".to_string(), "@musl_strcpy".to_string());
        build.included_files.push("src/string/strcpy.c".to_string());
        build.store_name_mapping().unwrap();
        build.store_included_files().unwrap();

        build.flush();
        assert!(build.name_mapping.is_empty());

        build.reload();
        assert_eq!(
            build.name_mapping.get("@strcpy").map(String::as_str),
            Some("@musl_strcpy")
        );
        assert_eq!(build.included_files, vec!["src/string/strcpy.c"]);
    }

    #[test]
    fn resolve_function_strips_leading_at() {
        let tmp = tempfile::tempdir().unwrap();
        let mut build = Build::load(tmp.path());
        build
            .name_mapping
            .insert("@strcpy".to_string(), "@musl_strcpy".to_string());
        assert_eq!(build.resolve_function("strcpy").unwrap(), "musl_strcpy");
    }

    #[test]
    fn resolve_function_errors_when_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let build = Build::load(tmp.path());
        assert!(build.resolve_function("strcpy").is_err());
    }
}
