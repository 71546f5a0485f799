//! Library descriptors (§4.D): the resolved view of a `config.json`, plus
//! non-recursive discovery of the `.c` sources it names.
//!
//! Grounded in `original_source/sputnik/library.py`'s `Library` and
//! `Build` classes.

mod build;
pub mod config;

pub use build::Build;
pub use config::LibraryConfigFile;

use std::fs;
use std::path::{Path, PathBuf};

use diagnostics::SputnikError;

/// A resolved library: where its sources live, where its build artifacts
/// go, and the flags used to compile it.
#[derive(Debug, Clone)]
pub struct Library {
    pub name: String,
    pub directory: PathBuf,
    pub builddir: PathBuf,
    pub target: PathBuf,
    pub compiler_flags: String,
    pub traversals: Vec<String>,
    pub build: Build,
}

impl Library {
    pub const CONFIG_NAME: &'static str = "config.json";

    /// Write the starter `config.json` template into `path`.
    pub fn write_default_config(path: &Path, force: bool) -> Result<(), SputnikError> {
        let config_file = path.join(Self::CONFIG_NAME);
        if config_file.is_file() && !force {
            return Err(SputnikError::Config {
                path: config_file,
                message: "file still exists".to_string(),
            });
        }
        let json = serde_json::to_string_pretty(&LibraryConfigFile::template())?;
        fs::write(config_file, json)?;
        Ok(())
    }

    /// Load `libpath/config.json` and resolve its relative fields into
    /// absolute paths, exactly as `Library.load` does:
    /// `builddir = directory + "-build"`, `target = builddir/target`.
    pub fn load(libpath: &Path) -> Result<Library, SputnikError> {
        let path = fs::canonicalize(libpath)?;
        let config_file = path.join(Self::CONFIG_NAME);
        let raw = fs::read_to_string(&config_file)?;
        let config: LibraryConfigFile =
            serde_json::from_str(&raw).map_err(|e| SputnikError::Config {
                path: config_file.clone(),
                message: e.to_string(),
            })?;

        let directory_field = config.directory.trim_end_matches('/');
        let directory = path.join(directory_field);
        let builddir = append_to_path(&directory, "-build");
        let target = builddir.join(&config.target);

        let build = Build::load(&builddir);

        Ok(Library {
            name: config.name,
            directory,
            builddir,
            target,
            compiler_flags: config.compiler_flags,
            traversals: config.traversals,
            build,
        })
    }

    /// Every `.c` source this library considers part of its surface,
    /// relative to `directory`. A traversal entry ending in `.c` is
    /// yielded verbatim; everything else is a directory that gets
    /// listed (non-recursively, matching the reference implementation's
    /// deliberate choice not to walk subdirectories).
    pub fn sources(&self) -> Result<Vec<PathBuf>, SputnikError> {
        let mut found = Vec::new();
        for traversal in &self.traversals {
            if traversal.ends_with(".c") {
                found.push(PathBuf::from(traversal));
                continue;
            }

            let dir = self.directory.join(traversal);
            let entries = fs::read_dir(&dir)?;
            for entry in entries {
                let entry = entry?;
                let entry_path = entry.path();
                if entry_path.is_file() && entry_path.extension().map(|e| e == "c").unwrap_or(false) {
                    let relative = entry_path
                        .strip_prefix(&self.directory)
                        .unwrap_or(&entry_path);
                    found.push(relative.to_path_buf());
                }
            }
        }
        Ok(found)
    }
}

fn append_to_path(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_to_path_suffixes_final_component() {
        let p = append_to_path(Path::new("/libs/musl"), "-build");
        assert_eq!(p, PathBuf::from("/libs/musl-build"));
    }

    #[test]
    fn write_default_config_refuses_overwrite_without_force() {
        let tmp = tempfile::tempdir().unwrap();
        Library::write_default_config(tmp.path(), true).unwrap();
        assert!(Library::write_default_config(tmp.path(), false).is_err());
        assert!(Library::write_default_config(tmp.path(), true).is_ok());
    }

    #[test]
    fn load_resolves_paths_from_config() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("musl-1.2.0")).unwrap();
        fs::create_dir_all(root.join("musl-1.2.0/src/ctype")).unwrap();
        fs::write(
            root.join("musl-1.2.0/src/ctype/isdigit.c"),
            "int isdigit(int c) { return 0; }\n",
        )
        .unwrap();

        let config = LibraryConfigFile {
            config_version: "0.0.1".to_string(),
            name: "musl".to_string(),
            directory: "musl-1.2.0/".to_string(),
            compiler_flags: "-I include".to_string(),
            traversals: vec!["src/ctype".to_string()],
            target: "musl.bc".to_string(),
        };
        fs::write(
            root.join(Library::CONFIG_NAME),
            serde_json::to_string(&config).unwrap(),
        )
        .unwrap();

        let lib = Library::load(root).unwrap();
        assert_eq!(lib.name, "musl");
        assert!(lib.directory.ends_with("musl-1.2.0"));
        assert!(lib.builddir.ends_with("musl-1.2.0-build"));
        assert!(lib.target.ends_with("musl-1.2.0-build/musl.bc"));

        let sources = lib.sources().unwrap();
        assert_eq!(sources, vec![PathBuf::from("src/ctype/isdigit.c")]);
    }
}
