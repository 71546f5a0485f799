//! Target-blob assembly (§4.H): turns a synthesized `harness::Harness`
//! into an actual build artifact by shelling out to the toolchain —
//! compiling semantic wrappers, linking libraries and the harness
//! together, and (for fuzzing) invoking `afl-gcc` and laying out the
//! fuzzer's run directory.
//!
//! Grounded in `original_source/sputnik/crafter.py`'s `build_*` methods,
//! which the `harness` crate deliberately leaves out (that crate only
//! builds C source strings; this one invokes the toolchain on them).

mod semantic;
mod sweep;
mod target;

pub use semantic::build_semantic_wrappers;
pub use sweep::array_widths;
pub use target::Assembler;
