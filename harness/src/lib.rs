//! Test-harness C source synthesis (§4.G): given a set of libraries under
//! differential test and a function to exercise, emit one self-contained
//! C translation unit that declares inputs, asserts preconditions, calls
//! every library's entry point, and verifies cross-library equivalence.
//!
//! Grounded in `original_source/sputnik/crafter.py`'s `TestHarness` class.
//! Everything that shells out to the toolchain (compiling, linking,
//! temp-directory scoping) lives in the `assembler` crate instead — this
//! one only builds strings.

pub mod config;
pub mod context;
pub mod engine;
mod synth;

pub use context::HarnessContext;
pub use engine::Engine;
pub use synth::{Harness, TestCase};
