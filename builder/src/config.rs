//! The `config_builder.json` shape `sputnik prebuild` reads (§6).

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

/// `config['functions']` maps a function name to the list of headers its
/// call wrapper needs (`original_source/prebuild.py::build_call_wrappers`).
pub type FunctionHeaders = HashMap<String, Vec<String>>;

#[derive(Debug, Clone, Deserialize)]
pub struct BuilderConfig {
    /// Paths to every library's directory (each holding a `config.json`).
    pub libs: Vec<PathBuf>,
    /// Path to the generated wrapper source, if call wrappers are in use.
    pub wrappers: Option<PathBuf>,
    /// Path to the generated wrapper header.
    pub wrappers_header: Option<PathBuf>,
    #[serde(default)]
    pub functions: FunctionHeaders,
}

/// Per-invocation knobs that aren't part of the persisted config
/// (`-r`/`--rebuild` on the command line).
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub rebuild: bool,
}
