//! The test-unrelated setup every harness shares: which libraries are under
//! test, the default array width, and which engine-specific config applies.
//!
//! The Python reference keeps this as mutable class attributes on
//! `TestHarness`, set once by `load_general_config` and read by every
//! instance afterwards (crafter.py, §9 "Global mutable config on the harness
//! class"). That singleton is replaced here by an explicit value threaded
//! through `Harness::new`, so two harnesses in the same process can run
//! against different configs without stepping on each other.

use std::fs;
use std::path::Path;

use diagnostics::SputnikError;
use library::Library;

use crate::config::GeneralConfig;

pub struct HarnessContext {
    pub libs: Vec<Library>,
    pub general_max_array_width: usize,
    pub wordsize: u32,
    pub verifier: crate::config::VerifierKind,
    pub symex: crate::config::SymexConfig,
    pub fuzzing: crate::config::FuzzingConfig,
}

impl HarnessContext {
    /// `TestHarness.load_general_config`: read the harness config file and
    /// resolve every listed library path into a loaded `Library`.
    pub fn load(configfile: &Path) -> Result<HarnessContext, SputnikError> {
        let raw = fs::read_to_string(configfile)?;
        let config: GeneralConfig = serde_json::from_str(&raw).map_err(|e| SputnikError::Config {
            path: configfile.to_path_buf(),
            message: e.to_string(),
        })?;

        let libs = config
            .libs
            .iter()
            .map(|p| Library::load(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(HarnessContext {
            libs,
            general_max_array_width: config.general_max_array_width,
            wordsize: config.wordsize,
            verifier: config.verifier,
            symex: config.symex,
            fuzzing: config.fuzzing,
        })
    }
}
