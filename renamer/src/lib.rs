//! Symbol renaming over LLVM IR text (§4.C): every symbol a translation
//! unit *defines* (as opposed to merely references) gets a new name, so
//! that several libraries' object files can coexist in one linked binary
//! without colliding on `strcpy`, `malloc`, and the like.
//!
//! Grounded line-for-line in `original_source/sputnik/rename.py`. Two
//! differences from the original: `regex` has no lookaround, so the
//! `(?!internal|private|...)` negative lookaheads are checked as plain
//! string prefixes before the structural regex runs; and an empty mapping
//! is a no-op here rather than the `KeyError` it would raise in Python.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use diagnostics::SputnikError;
use regex::Regex;

fn variable_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^@(\S+) = (.*)$").unwrap())
}

fn function_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^([^("]+|"[^"]*")\("#).unwrap())
}

const SUPPRESSED_LINKAGES: [&str; 4] = ["internal", "private", "appending", "external"];

/// A symbol defined on this line, distinguishing only for documentation
/// purposes — both kinds are renamed the same way.
fn detect_symbol(line: &str) -> Option<&str> {
    if let Some(caps) = variable_re().captures(line) {
        let rest = caps.get(2).unwrap().as_str();
        if !SUPPRESSED_LINKAGES.iter().any(|kw| starts_with_word(rest, kw)) {
            return Some(caps.get(1).unwrap().as_str());
        }
        return None;
    }

    let rest = line.strip_prefix("define ")?;
    if SUPPRESSED_LINKAGES[..2]
        .iter()
        .any(|kw| starts_with_word(rest, kw))
    {
        return None;
    }
    let at_pos = rest.find('@')?;
    let after_at = &rest[at_pos + 1..];
    let caps = function_name_re().captures(after_at)?;
    Some(caps.get(1).unwrap().as_str())
}

fn starts_with_word(haystack: &str, word: &str) -> bool {
    haystack.strip_prefix(word).is_some()
}

/// Build the `@old -> @new` mapping for every symbol `content` defines,
/// in order of first appearance.
pub fn detect_names(content: &str, sub: impl Fn(&str) -> String) -> Vec<(String, String)> {
    let mut mapping = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for line in content.lines() {
        if let Some(name) = detect_symbol(line) {
            let key = format!("@{}", name);
            if seen.insert(key.clone()) {
                mapping.push((key, format!("@{}", sub(name))));
            }
        }
    }
    mapping
}

/// Apply `mapping` to every line of `content`, replacing each occurrence
/// of a mapped key with its substitution.
pub fn substitute_text(content: &str, mapping: &[(String, String)]) -> String {
    if mapping.is_empty() {
        return content.to_string();
    }

    let lookup: std::collections::HashMap<&str, &str> = mapping
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let pattern = mapping
        .iter()
        .map(|(k, _)| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    let re = Regex::new(&pattern).expect("symbol names are escaped, pattern is always valid");

    let mut out = String::with_capacity(content.len());
    for line in content.lines() {
        let replaced = re.replace_all(line, |caps: &regex::Captures| {
            lookup.get(caps.get(0).unwrap().as_str()).copied().unwrap_or("")
        });
        out.push_str(&replaced);
        out.push('\n');
    }
    out
}

fn prefix_name(name: &str, prefix: &str) -> String {
    let underscore_count = name.chars().take_while(|&c| c == '_').count();
    let (leading, rest) = name.split_at(underscore_count);
    format!("{}{}_{}", leading, prefix, rest)
}

/// Rename every symbol `src` defines by prepending `prefix`, writing the
/// result to `dest`. Returns the `@old -> @new` mapping that was applied.
pub fn rename(dest: &Path, src: &Path, prefix: &str) -> Result<Vec<(String, String)>, SputnikError> {
    let content = fs::read_to_string(src)?;
    let mapping = detect_names(&content, |name| prefix_name(name, prefix));
    let rewritten = substitute_text(&content, &mapping);
    fs::write(dest, rewritten)?;
    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_defined_global_variable() {
        let ir = "@errno = global i32 0, align 4\n";
        let mapping = detect_names(ir, |n| format!("lib_{}", n));
        assert_eq!(mapping, vec![("@errno".to_string(), "@lib_errno".to_string())]);
    }

    #[test]
    fn ignores_external_and_private_variables() {
        let ir = "\
@x = external global i32
@y = private global i32 0
@z = appending global [1 x i8*] []
";
        assert!(detect_names(ir, |n| n.to_string()).is_empty());
    }

    #[test]
    fn detects_defined_function() {
        let ir = "define i32 @strcpy(i8* %dest, i8* %src) {\n";
        let mapping = detect_names(ir, |n| format!("lib_{}", n));
        assert_eq!(
            mapping,
            vec![("@strcpy".to_string(), "@lib_strcpy".to_string())]
        );
    }

    #[test]
    fn ignores_internal_and_private_functions() {
        let ir = "\
define internal i32 @helper(i32 %x) {
define private void @hidden() {
";
        assert!(detect_names(ir, |n| n.to_string()).is_empty());
    }

    #[test]
    fn ignores_declarations_and_calls() {
        let ir = "\
declare i32 @printf(i8*, ...)
  %1 = call i32 @strcpy(i8* %a, i8* %b)
";
        assert!(detect_names(ir, |n| n.to_string()).is_empty());
    }

    #[test]
    fn prefix_preserves_leading_underscores() {
        assert_eq!(prefix_name("strcpy", "musl"), "musl_strcpy");
        assert_eq!(prefix_name("_IO_gets", "musl"), "_musl_IO_gets");
    }

    #[test]
    fn substitute_rewrites_every_occurrence() {
        let ir = "define i32 @strcpy(i8* %d, i8* %s) {\n  %r = call i32 @strcpy(i8* %d, i8* %s)\n  ret i32 %r\n}\n";
        let mapping = detect_names(ir, |n| prefix_name(n, "musl"));
        let rewritten = substitute_text(ir, &mapping);
        assert!(rewritten.contains("@musl_strcpy"));
        assert!(!rewritten.contains("@strcpy(") || rewritten.matches("@strcpy(").count() == 0);
    }

    #[test]
    fn substitute_is_noop_on_empty_mapping() {
        let ir = "declare i32 @printf(i8*, ...)\n";
        assert_eq!(substitute_text(ir, &[]), ir);
    }
}
