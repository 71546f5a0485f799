//! Which execution backend a harness targets, and the per-engine pieces
//! that differ: how a symbolic/fuzzed input is declared, how the header
//! looks, and how an assertion failure is reported.
//!
//! The Python reference dispatches these with `getattr(self,
//! f"{method}_{self.engine}")` (`crafter.py::engine_wrapper`); here each
//! of those method families is a match arm on this enum instead, so a
//! missing combination is a compile error rather than an `AttributeError`
//! at harness-generation time.

use diagnostics::SputnikError;
use sigmodel::Variable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Symex,
    Fuzzing,
}

impl Engine {
    pub fn header_lines(self) -> Vec<String> {
        match self {
            Engine::Symex => vec!["#include <klee/klee.h>".to_string()],
            Engine::Fuzzing => vec![
                "#include <stdio.h>".to_string(),
                "void abort(void);".to_string(),
            ],
        }
    }

    pub fn assumption_line(self, expr: &str) -> String {
        match self {
            Engine::Symex => format!("if (!({expr})) return 0;"),
            Engine::Fuzzing => format!("if (!({expr})) return 0;"),
        }
    }

    pub fn abort_body(self) -> Vec<String> {
        match self {
            Engine::Symex => {
                vec![r#"klee_report_error("", 0, message, "sputnik_error");"#.to_string()]
            }
            Engine::Fuzzing => vec!["abort();".to_string()],
        }
    }
}

/// Result of declaring one input variable: the C statement(s) needed to
/// feed it, plus (for the fuzzing engine) the testcase bytes that input
/// expects on stdin.
pub struct InputDeclaration {
    pub code: Vec<String>,
    pub testcase_suffix: Option<String>,
}

/// `define_input_symex`: `klee_make_symbolic` over the variable itself,
/// or over its backing array when it's a `void`/`char` pointer.
pub fn define_input_symex(variable: &Variable) -> InputDeclaration {
    let code = if variable.is_ptr() {
        if variable.type_ == "void" || variable.type_ == "char" {
            let size = format!("{} * sizeof({})", variable.array_size, variable.type_);
            vec![format!(
                "klee_make_symbolic({}, {}, \"{}\");",
                variable.name, size, variable.name
            )]
        } else {
            vec![format!(
                "klee_make_symbolic(&{0}, sizeof({0}), \"{0}\");",
                variable.name
            )]
        }
    } else {
        vec![format!(
            "klee_make_symbolic(&{0}, sizeof({0}), \"{0}\");",
            variable.name
        )]
    };
    InputDeclaration {
        code,
        testcase_suffix: None,
    }
}

/// `define_input_fuzzing`: a `scanf`/`read` call paired with the literal
/// bytes the corresponding `testcases/testcase_*` file should contain,
/// matching the exact format-string/seed table in
/// `crafter.py::define_input_fuzzing`.
pub fn define_input_fuzzing(variable: &Variable) -> Result<InputDeclaration, SputnikError> {
    let arg = if variable.is_ptr() {
        variable.name.clone()
    } else {
        format!("&{}", variable.name)
    };

    if variable.type_ == "wint_t" {
        return Ok(InputDeclaration {
            code: vec![format!("read(0, {arg}, 4);")],
            testcase_suffix: Some("AA\n".to_string()),
        });
    }

    let (fmt, testcase) = match (variable.type_.as_str(), variable.is_ptr()) {
        ("int", false) => ("%d".to_string(), "1234\n".to_string()),
        ("size_t", false) => ("%zu".to_string(), "1234\n".to_string()),
        ("char", true) => {
            let width = variable.array_size - 1;
            (format!("%{}s", width), format!("{}\n", "A".repeat(variable.array_size as usize)))
        }
        ("char", false) => ("%c".to_string(), "A\n".to_string()),
        ("long int", false) => ("%ld".to_string(), "1234\n".to_string()),
        ("long long int", false) => ("%lld".to_string(), "1234\n".to_string()),
        ("long", false) => ("%l".to_string(), "1234\n".to_string()),
        ("long long", false) => ("%ll".to_string(), "1234\n".to_string()),
        _ => {
            return Err(SputnikError::UnsupportedType {
                type_name: variable.type_.clone(),
            })
        }
    };

    Ok(InputDeclaration {
        code: vec![format!("scanf(\"{}\", {});", fmt, arg)],
        testcase_suffix: Some(testcase),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symex_char_pointer_uses_array_size() {
        let v = Variable::new("char", "buf", 1).with_array_size(8);
        let decl = define_input_symex(&v);
        assert_eq!(
            decl.code,
            vec!["klee_make_symbolic(buf, 8 * sizeof(char), \"buf\");".to_string()]
        );
    }

    #[test]
    fn symex_scalar_takes_address() {
        let v = Variable::new("int", "c", 0);
        let decl = define_input_symex(&v);
        assert_eq!(
            decl.code,
            vec!["klee_make_symbolic(&c, sizeof(c), \"c\");".to_string()]
        );
    }

    #[test]
    fn fuzzing_int_scans_with_decimal_format() {
        let v = Variable::new("int", "c", 0);
        let decl = define_input_fuzzing(&v).unwrap();
        assert_eq!(decl.code, vec!["scanf(\"%d\", &c);".to_string()]);
        assert_eq!(decl.testcase_suffix.as_deref(), Some("1234\n"));
    }

    #[test]
    fn fuzzing_char_pointer_scans_bounded_string() {
        let v = Variable::new("char", "s", 1).with_array_size(5);
        let decl = define_input_fuzzing(&v).unwrap();
        assert_eq!(decl.code, vec!["scanf(\"%4s\", s);".to_string()]);
        assert_eq!(decl.testcase_suffix.as_deref(), Some("AAAAA\n"));
    }

    #[test]
    fn fuzzing_rejects_unmapped_type() {
        let v = Variable::new("struct addrinfo", "ai", 1).with_array_size(4);
        assert!(define_input_fuzzing(&v).is_err());
    }
}
