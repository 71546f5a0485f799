//! Man-page fallback (§4.B): when a library's own header comment doesn't
//! give us a declaration for a function, shell out to `man -P cat 3 <fn>`
//! and recover the prototype from the SYNOPSIS section.
//!
//! Grounded in `original_source/sputnik/language.py`'s `function_signature`
//! / `function_signature_raw`, which run the same command and apply the
//! same two regexes.

use std::process::Command;

use diagnostics::SputnikError;
use regex::Regex;
use std::sync::OnceLock;

use crate::signature::Signature;

fn synopsis_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*((?:\w[\w ]*\*?\s+\**)\w+\s*\([^)]*\)\s*;)\s*$").unwrap()
    })
}

/// Run `man -P cat 3 <function>` and return its raw stdout.
pub fn man_page_raw(function: &str) -> Result<String, SputnikError> {
    let output = Command::new("man")
        .args(["-P", "cat", "3", function])
        .output()?;
    if !output.status.success() {
        return Err(SputnikError::ManPageLookup {
            function: function.to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Recover the first matching declaration line for `function` out of a raw
/// man page (or any other) block of text. A declaration may be wrapped
/// across a continuation line by `man`'s formatter; collapse all whitespace
/// (including embedded newlines) to a single space before matching, the
/// same way `language.py`'s `' '.join(l.strip() for l in content.split('\n'))`
/// does.
pub fn extract_declaration(page: &str, function: &str) -> Option<String> {
    synopsis_line_re()
        .captures_iter(page)
        .map(|c| c[1].split_whitespace().collect::<Vec<_>>().join(" "))
        .find(|line| line.contains(function))
}

/// Full fallback: look the function up via `man`, then parse the recovered
/// declaration into a `Signature`.
pub fn function_signature(function: &str, default_array_size: i64) -> Result<Signature, SputnikError> {
    let page = man_page_raw(function)?;
    let decl = extract_declaration(&page, function).ok_or_else(|| SputnikError::ManPageLookup {
        function: function.to_string(),
    })?;
    Signature::parse(&decl, default_array_size)
}
