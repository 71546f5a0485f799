//! Error types and leveled diagnostics shared by every sputnik crate.
//!
//! This crate used to carry a full rustc-style span/label/suggestion renderer;
//! that machinery assumed a multi-file source map, which this pipeline has no
//! use for (its "sources" are single-line C declarations and LLVM IR text
//! files, never positions within a parsed AST). What survives is the
//! severity/error-kind vocabulary from §7 of the spec.

use std::fmt;
use std::path::PathBuf;

/// Severity level for a logged diagnostic (distinct from `SputnikError`,
/// which is for operations that actually fail).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticSeverity::Error => write!(f, "error"),
            DiagnosticSeverity::Warning => write!(f, "warning"),
            DiagnosticSeverity::Info => write!(f, "info"),
        }
    }
}

/// Every error kind the core pipeline distinguishes (§7).
#[derive(Debug)]
pub enum SputnikError {
    /// Non-zero exit from the compiler driver; `stderr` is the captured message.
    Compile { file: PathBuf, stderr: String },
    /// Non-zero exit from the linker; always fatal.
    Link { stderr: String },
    /// Missing file, malformed JSON, or missing required key in a config.
    Config { path: PathBuf, message: String },
    /// A function listed in the wrapper config never made it into a
    /// library's post-rename map. Non-fatal: the artifact is still produced.
    Integrity { missing: Vec<String> },
    /// The fuzzing input generator was asked for a type outside its mapping.
    UnsupportedType { type_name: String },
    /// `man -P cat 3 <fn>` produced no matching C declaration.
    ManPageLookup { function: String },
    /// A C declaration did not match the signature grammar (§4.B).
    SignatureParse { input: String },
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for SputnikError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SputnikError::Compile { file, stderr } => {
                write!(f, "compile failed for {}: {}", file.display(), stderr)
            }
            SputnikError::Link { stderr } => write!(f, "link failed: {}", stderr),
            SputnikError::Config { path, message } => {
                write!(f, "config error in {}: {}", path.display(), message)
            }
            SputnikError::Integrity { missing } => {
                write!(f, "integrity check failed, missing symbols: {}", missing.join(", "))
            }
            SputnikError::UnsupportedType { type_name } => {
                write!(f, "unsupported type for fuzzing input generation: {}", type_name)
            }
            SputnikError::ManPageLookup { function } => {
                write!(f, "no man-page declaration found for `{}`", function)
            }
            SputnikError::SignatureParse { input } => {
                write!(f, "could not parse C declaration: `{}`", input)
            }
            SputnikError::Io(e) => write!(f, "I/O error: {}", e),
            SputnikError::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for SputnikError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SputnikError::Io(e) => Some(e),
            SputnikError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SputnikError {
    fn from(e: std::io::Error) -> Self {
        SputnikError::Io(e)
    }
}

impl From<serde_json::Error> for SputnikError {
    fn from(e: serde_json::Error) -> Self {
        SputnikError::Json(e)
    }
}

pub type SputnikResult<T> = Result<T, SputnikError>;
