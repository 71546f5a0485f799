//! The `Variable` model (§3): a single typed C parameter, return value, or
//! local declared inside the generated harness.

use std::fmt;

/// A C variable: a type, a name, a pointer depth, and (for pointers) an
/// array length. Rendering is deterministic given these fields (§3 invariant).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    /// Free-form type string, excluding `const` and pointer stars
    /// (e.g. `"unsigned long int"`, `"struct addrinfo"`).
    pub type_: String,
    pub name: String,
    /// 0 means not a pointer.
    pub ptr_depth: usize,
    /// Only meaningful when `ptr_depth > 0`; `-1` means unspecified.
    pub array_size: i64,
    /// Initializer / alias expression, e.g. `"dest"` for `char *ptr = dest;`.
    pub value: Option<String>,
}

impl Variable {
    pub fn new(type_: impl Into<String>, name: impl Into<String>, ptr_depth: usize) -> Self {
        let array_size = if ptr_depth > 0 { -1 } else { -1 };
        Variable {
            type_: type_.into(),
            name: name.into(),
            ptr_depth,
            array_size,
            value: None,
        }
    }

    pub fn with_array_size(mut self, array_size: i64) -> Self {
        self.array_size = array_size;
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn is_ptr(&self) -> bool {
        self.ptr_depth > 0
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// `type_str()`: type plus a space-separated run of stars, e.g. `"void **"`.
    pub fn type_str(&self) -> String {
        if self.ptr_depth > 0 {
            format!("{} {}", self.type_, "*".repeat(self.ptr_depth))
        } else {
            self.type_.clone()
        }
    }

    /// Parse a fragment like `"const unsigned int **y"` or `"char x"`.
    /// `default_array_size` is only applied when the parsed variable is a pointer.
    pub fn parse(fragment: &str, default_array_size: i64) -> Option<Variable> {
        crate::parse::parse_variable_fragment(fragment, default_array_size)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ptr_depth > 0 {
            write!(f, "{}{}", self.type_str(), self.name)
        } else {
            write!(f, "{} {}", self.type_str(), self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_str_scalar() {
        let v = Variable::new("void", "foo_bar", 0);
        assert_eq!(v.type_str(), "void");
        assert_eq!(v.to_string(), "void foo_bar");
    }

    #[test]
    fn type_str_pointer() {
        let v = Variable::new("void", "foo_bar", 2);
        assert_eq!(v.type_str(), "void **");
        assert_eq!(v.to_string(), "void **foo_bar");
    }

    #[test]
    fn isptr() {
        assert!(!Variable::new("void", "x", 0).is_ptr());
        assert!(Variable::new("void", "x", 2).is_ptr());
    }

    #[test]
    fn rename_updates_name() {
        let mut v = Variable::new("void", "foo_bar", 2);
        v.rename("bar");
        assert_eq!(v.name, "bar");
    }

    #[test]
    fn parse_basic_forms() {
        assert_eq!(
            Variable::parse("void x", -1),
            Some(Variable::new("void", "x", 0))
        );
        assert_eq!(
            Variable::parse("unsigned int x", -1),
            Some(Variable::new("unsigned int", "x", 0))
        );
        assert_eq!(
            Variable::parse("struct foo *bar", -1),
            Some(Variable::new("struct foo", "bar", 1))
        );
        assert_eq!(
            Variable::parse("int *******x", -1),
            Some(Variable::new("int", "x", 7))
        );
    }

    #[test]
    fn parse_strips_const_and_trailing_semicolon() {
        assert_eq!(
            Variable::parse("const char *s;", 8),
            Some(Variable::new("char", "s", 1).with_array_size(8))
        );
    }
}
