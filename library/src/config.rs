//! The on-disk `config.json` schema (§4.D), and the default template
//! `sputnik introduce` writes out (§6).

use serde::{Deserialize, Serialize};

/// Raw `config.json` contents, before path resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfigFile {
    pub config_version: String,
    pub name: String,
    pub directory: String,
    pub compiler_flags: String,
    #[serde(default)]
    pub traversals: Vec<String>,
    pub target: String,
}

impl LibraryConfigFile {
    /// The template written by `sputnik introduce` and by
    /// `Library::write_default_config`.
    pub fn template() -> LibraryConfigFile {
        LibraryConfigFile {
            config_version: "0.0.1".to_string(),
            name: "<insert name of library>".to_string(),
            directory: "<insert current version directory>".to_string(),
            compiler_flags: "<insert compiler flags (like include flags)>".to_string(),
            traversals: Vec::new(),
            target: "./here_name_of_target.bc".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_round_trips_through_json() {
        let template = LibraryConfigFile::template();
        let json = serde_json::to_string_pretty(&template).unwrap();
        let back: LibraryConfigFile = serde_json::from_str(&json).unwrap();
        assert_eq!(back.config_version, "0.0.1");
        assert!(back.traversals.is_empty());
    }
}
