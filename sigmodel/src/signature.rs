//! `Signature` and `Function` (§3/§4.B): a parsed C declaration and the
//! rendering operations built on top of it (fork, declare, define, call).

use diagnostics::SputnikError;

use crate::parse::{self, split_args};
use crate::variable::Variable;

/// A parsed function declaration: a name, a return variable, and its
/// arguments. Functions are always non-variadic and never function pointers
/// (§4.B Non-goals).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub ret: Variable,
    pub args: Vec<Variable>,
}

impl Signature {
    /// Parse `"RET [*]*NAME(ARGS);"` using the default array size for any
    /// pointer argument that doesn't specify one.
    pub fn parse(line: &str, default_array_size: i64) -> Result<Signature, SputnikError> {
        let raw = parse::parse_declaration(line).ok_or_else(|| SputnikError::SignatureParse {
            input: line.to_string(),
        })?;

        let mut args = Vec::new();
        for piece in split_args(raw.args) {
            let var = Variable::parse(piece, default_array_size).ok_or_else(|| {
                SputnikError::SignatureParse {
                    input: piece.to_string(),
                }
            })?;
            args.push(var);
        }

        Ok(Signature {
            name: raw.name.to_string(),
            ret: Variable::new(raw.ret_type, "unnamed", raw.ret_ptr_depth),
            args,
        })
    }

    /// A copy with a new name, and a return variable renamed to
    /// `ret_NEWNAME` — used to generate the per-library renamed variant of
    /// a shared declaration (§4.B "fork").
    pub fn fork(&self, new_name: impl Into<String>) -> Signature {
        let new_name = new_name.into();
        let mut ret = self.ret.clone();
        ret.rename(format!("ret_{new_name}"));
        Signature {
            name: new_name,
            ret,
            args: self.args.clone(),
        }
    }

    fn args_joined(&self) -> String {
        self.args
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `"RET NAME(ARGS);"`
    pub fn declaration(&self) -> String {
        format!(
            "{}{}({});",
            self.ret.type_str(),
            if self.ret.is_ptr() {
                self.name.clone()
            } else {
                format!(" {}", self.name)
            },
            self.args_joined()
        )
    }

    /// A full call statement. Pointer arguments are passed with
    /// `ptr_depth - 1` leading `&`s, since the harness declares them one
    /// level shallower than the signature asks for (an array for
    /// `void`/`char` pointers, a bare scalar otherwise) and takes the
    /// address back up to the expected depth. The result is either a bare
    /// `NAME(args);` when the return type is a non-pointer `void`, or
    /// `ret.name = NAME(args);` otherwise.
    pub fn call(&self) -> String {
        let call_args = self
            .args
            .iter()
            .map(|v| format!("{}{}", "&".repeat(v.ptr_depth.saturating_sub(1)), v.name))
            .collect::<Vec<_>>()
            .join(", ");
        let invocation = format!("{}({})", self.name, call_args);
        if self.ret.type_ == "void" && !self.ret.is_ptr() {
            format!("{invocation};")
        } else {
            format!("{} = {invocation};", self.ret.name)
        }
    }
}

/// A `Signature` plus an optional body — the thing the harness actually
/// emits as a C function definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub signature: Signature,
    pub body: Option<String>,
}

impl Function {
    pub fn new(signature: Signature) -> Self {
        Function { signature, body: None }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn fork(&self, new_name: impl Into<String>) -> Function {
        Function {
            signature: self.signature.fork(new_name),
            body: self.body.clone(),
        }
    }

    /// `"RET NAME(ARGS) {\n\tBODY \n}"` — a full function definition, with
    /// every body line tab-indented (`language.py`'s
    /// `[f"\t{l}" for l in body.split('\n')]`).
    pub fn definition(&self) -> String {
        let body = self.body.as_deref().unwrap_or("");
        let indented = body
            .split('\n')
            .map(|l| format!("\t{l}"))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "{} {{\n{}\n}}",
            self.signature.declaration().trim_end_matches(';'),
            indented
        )
    }

    pub fn call(&self) -> String {
        self.signature.call()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_declares_isdigit() {
        let sig = Signature::parse("int isdigit(int c);", -1).unwrap();
        assert_eq!(sig.name, "isdigit");
        assert_eq!(sig.declaration(), "int isdigit(int c);");
    }

    #[test]
    fn fork_renames_and_preserves_shape() {
        let sig = Signature::parse(
            "void *memcpy(void *dest, const void *src, size_t n);",
            -1,
        )
        .unwrap();
        let forked = sig.fork("foo");
        assert_eq!(
            forked.declaration(),
            "void *foo(void *dest, void *src, size_t n);"
        );
        assert_eq!(forked.call(), "ret_foo = foo(dest, src, n);");
    }

    #[test]
    fn call_assigns_return_for_non_void() {
        let sig = Signature::parse("int isdigit(int c);", -1).unwrap().fork("isdigit");
        assert_eq!(sig.call(), "ret_isdigit = isdigit(c);");
    }

    #[test]
    fn call_is_bare_statement_for_void_return() {
        let sig = Signature::parse("void qsort(void *base, size_t n);", -1)
            .unwrap()
            .fork("qsort");
        assert_eq!(sig.call(), "qsort(&base, n);");
    }

    #[test]
    fn call_prefixes_triple_pointer_arg_with_one_ampersand() {
        let sig = Signature::parse("unsigned int ***bar(size_t *x);", -1)
            .unwrap()
            .fork("foo");
        assert_eq!(sig.declaration(), "unsigned int ***foo(size_t *x);");
        assert_eq!(sig.call(), "ret_foo = foo(x);");
    }

    #[test]
    fn function_definition_wraps_body() {
        let sig = Signature::parse("int isdigit(int c);", -1).unwrap();
        let f = Function::new(sig).with_body("return ret_isdigit(c);".to_string());
        let def = f.definition();
        let lines: Vec<&str> = def.lines().collect();
        assert_eq!(lines[0], "int isdigit(int c) {");
        assert_eq!(lines[1], "\treturn ret_isdigit(c);");
        assert_eq!(lines[2], "}");
    }

    #[test]
    fn function_definition_indents_every_body_line() {
        let sig = Signature::parse("int foo(int c);", -1).unwrap();
        let f = Function::new(sig).with_body("int x = c;\nreturn x;".to_string());
        let def = f.definition();
        let lines: Vec<&str> = def.lines().collect();
        assert_eq!(lines[1], "\tint x = c;");
        assert_eq!(lines[2], "\treturn x;");
    }

    #[test]
    fn rejects_function_pointer_like_input() {
        assert!(Signature::parse("void (*cb)(int);", -1).is_err());
    }
}
