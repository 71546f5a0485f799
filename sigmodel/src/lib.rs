//! C declaration signature model (§4.B): parse a function prototype, fork
//! it under a new name, and render it back out as a declaration, a
//! definition, or a bare call expression.
//!
//! Grounded in `original_source/sputnik/language.py`'s `Variable`,
//! `Signature`, and `Function` classes. The parser is hand-written with
//! `nom` combinators rather than a full C grammar, matching the scope of
//! the original: single-line, non-variadic, non-function-pointer
//! declarations only.

mod manpage;
mod parse;
mod signature;
mod variable;

pub use manpage::{extract_declaration, function_signature, man_page_raw};
pub use signature::{Function, Signature};
pub use variable::Variable;
