//! General, test-unrelated configuration every harness is built against
//! (§4.G / §6): which libraries to differentially test, the default
//! array width, the word size, and which verifier style to emit.
//!
//! Grounded in `original_source/sputnik/crafter.py::TestHarness.load_general_config`.

use std::path::PathBuf;

use serde::Deserialize;

/// §4.G point 9: the clustering (new) verifier groups libraries into
/// equivalence classes before comparing; the traditional verifier does a
/// flat all-pairs comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifierKind {
    New,
    Traditional,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SymexConfig {
    pub klee_headers: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FuzzingConfig {
    #[serde(default)]
    pub extra_cflags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    pub libs: Vec<PathBuf>,
    pub general_max_array_width: usize,
    pub wordsize: u32,
    pub verifier: VerifierKind,
    pub symex: SymexConfig,
    pub fuzzing: FuzzingConfig,
}
