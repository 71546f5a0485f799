//! Call-wrapper generation config (§4.F): which functions to wrap, and
//! where to write the generated source/header pair.
//!
//! Grounded in `original_source/prebuild.py::build_call_wrappers`'s
//! `config` dict (`functions`, `wrappers`, `wrappers_header`). The
//! reference keys `functions` by a JSON object, whose iteration order
//! depends on Python's `dict`/`set` internals; this models it as an
//! explicit ordered list so the generated files are reproducible across
//! runs without pulling in an order-preserving map crate.

use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct WrapperEntry {
    pub function: String,
    #[serde(default)]
    pub headers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WrapperConfig {
    pub functions: Vec<WrapperEntry>,
    pub wrappers: PathBuf,
    pub wrappers_header: PathBuf,
}
