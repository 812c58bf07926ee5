//! Character-level building blocks shared by every rule: whitespace and
//! comments, punctuation, keywords and identifiers.
//!
//! Every token rule consumes the whitespace after it, so a rule always
//! starts on a significant character once the leading whitespace of the
//! input has been skipped.

use crate::parser::combinators::{BoxedParser, all_of, any_char, literal, pure, satisfy};
use crate::parser::repetition::many_fold;

use super::Rule;

/// Reserved words that can never be identifiers.
pub const KEYWORDS: [&str; 22] = [
    "bool", "byte", "sbyte", "char", "short", "ushort", "int", "uint", "long", "ulong", "float",
    "double", "decimal", "string", "object", "void", "default", "false", "true", "new", "null",
    "typeof",
];

pub fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

pub fn is_identifier_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// skip := (blank | "//" ... | "/*" ... "*/")*
pub fn whitespace() -> Rule<()> {
    let blank = satisfy(char::is_whitespace).map(|_| ());

    let line_comment = literal("//")
        * many_fold(satisfy(|c| !is_line_terminator(c)), (), |_, _| ());

    let not_closing = pure(()).not_followed_by(literal("*/")) * any_char();
    let block_comment = literal("/*") * many_fold(not_closing, (), |_, _| ()) - literal("*/");

    many_fold(blank | line_comment | block_comment, (), |_, _| ())
}

pub fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{0085}' | '\u{2028}' | '\u{2029}')
}

/// `parser` followed by whitespace.
pub fn token<T: Clone + 'static>(parser: Rule<T>) -> Rule<T> {
    parser - whitespace()
}

/// Punctuation that is never the start of a longer operator.
pub fn symbol(text: &'static str) -> Rule<&'static str> {
    token(literal(text))
}

/// An operator that must not be the start of a longer operator, e.g. `<`
/// not followed by `<` or `=`.
pub fn operator(text: &'static str, not_before: &'static [char]) -> Rule<&'static str> {
    token(literal(text).not_followed_by(satisfy(move |c| not_before.contains(&c))))
}

/// A keyword not immediately followed by an identifier character.
pub fn keyword(word: &'static str) -> Rule<&'static str> {
    token(literal(word).not_followed_by(satisfy(is_identifier_part)))
}

fn raw_identifier() -> Rule<String> {
    satisfy(is_identifier_start).bind(|start| {
        many_fold(satisfy(is_identifier_part), String::from(start), |mut name, c| {
            name.push(c);
            name
        })
    })
}

/// identifier := (letter | "_") (letter | digit | "_")*  except keywords
pub fn identifier() -> Rule<String> {
    let keywords: Vec<BoxedParser<&'static str, _>> =
        KEYWORDS.iter().map(|word| literal(*word)).collect();
    token(raw_identifier().except(all_of(keywords)))
}
