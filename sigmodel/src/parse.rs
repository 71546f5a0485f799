//! The C-declaration grammar used throughout §4.B.
//!
//! A full recursive-descent C parser would be overkill: the inputs are
//! single-line declarations of the shape `RET_TYPE [*]* NAME(ARGS);`, where
//! neither `RET_TYPE` nor an argument's type ever contains a literal `(`
//! (no function-pointer parameters, no nested declarators). That lets the
//! grammar be split structurally — find the argument list, then run `nom`
//! combinators over each piece — instead of needing full backtracking.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, multispace1},
    combinator::opt,
    multi::many0_count,
    sequence::preceded,
    IResult,
};

use crate::variable::Variable;

fn stars(input: &str) -> IResult<&str, usize> {
    many0_count(char('*'))(input)
}

/// Strip a leading `"const "` token, if present.
fn strip_const(input: &str) -> &str {
    match opt(preceded(tag::<_, _, nom::error::Error<&str>>("const"), multispace1))(input) {
        Ok((rest, Some(_))) => rest,
        _ => input,
    }
}

/// Split `"unsigned int **y"` into a type run and a stars+name run by
/// finding the last whitespace character that precedes them — the same
/// split point a greedy `(.*)\s([*]*)([^;]*)` regex would pick.
fn split_type_and_tail(input: &str) -> Option<(&str, &str)> {
    let idx = input.trim_end().rfind(char::is_whitespace)?;
    Some((&input[..idx], input[idx + 1..].trim()))
}

/// Parse a single argument/variable fragment, e.g. `"const char *s"`.
pub fn parse_variable_fragment(fragment: &str, default_array_size: i64) -> Option<Variable> {
    let fragment = fragment.trim();
    let fragment = fragment.strip_suffix(';').unwrap_or(fragment).trim_end();
    let body = strip_const(fragment);

    let (type_run, tail) = split_type_and_tail(body)?;
    let (name, ptr_depth) = stars(tail)
        .ok()
        .map(|(name, ptr_depth)| (name.trim(), ptr_depth))?;

    if name.is_empty() || type_run.trim().is_empty() {
        return None;
    }

    let array_size = if ptr_depth > 0 { default_array_size } else { -1 };
    Some(Variable {
        type_: type_run.trim().to_string(),
        name: name.to_string(),
        ptr_depth,
        array_size,
        value: None,
    })
}

/// The parsed pieces of a full declaration `RET [*]*NAME(ARGS);`.
pub struct RawDeclaration<'a> {
    pub ret_type: &'a str,
    pub ret_ptr_depth: usize,
    pub name: &'a str,
    pub args: &'a str,
}

fn name_token(input: &str) -> IResult<&str, &str> {
    nom::bytes::complete::take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '$')(
        input,
    )
}

fn stars_then_name(input: &str) -> IResult<&str, (usize, &str)> {
    let (input, depth) = stars(input)?;
    let (input, name) = alt((name_token, nom::combinator::success("")))(input)?;
    Ok((input, (depth, name)))
}

/// Parse the whole declaration line, locating the arguments by the first
/// `(` and the return type / function name by the rightmost whitespace
/// before it, mirroring the original greedy `re.match` behaviour exactly.
pub fn parse_declaration(line: &str) -> Option<RawDeclaration<'_>> {
    let line = line.trim();
    let line = line.strip_suffix(';').unwrap_or(line);
    let line = line.trim_end();
    let close = line.rfind(')')?;
    if !line.ends_with(')') {
        return None;
    }
    let open = line.find('(')?;
    if open >= close {
        return None;
    }
    let args = &line[open + 1..close];
    let prefix = line[..open].trim_end();
    let (ret_type, tail) = split_type_and_tail(prefix)?;
    let (_, (ptr_depth, name)) = stars_then_name(tail).ok()?;
    if name.is_empty() {
        return None;
    }
    Some(RawDeclaration {
        ret_type: ret_type.trim(),
        ret_ptr_depth: ptr_depth,
        name,
        args,
    })
}

/// Split an argument list on top-level commas. There is no nesting to
/// worry about (§4.B excludes function-pointer parameters), so a plain
/// split suffices — `original_source/sputnik/language.py` does the same
/// with `str.split(", ")`.
pub fn split_args(args: &str) -> Vec<&str> {
    let args = args.trim();
    if args.is_empty() || args == "void" {
        return Vec::new();
    }
    args.split(',').map(str::trim).collect()
}
