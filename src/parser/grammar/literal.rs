//! Literal parsers
//!
//! Numeric literals follow C#: an integer literal takes the first type of
//! its suffix class that can hold it, and a real literal needs a suffix
//! when it has neither a fraction nor an exponent, since `42` alone is an
//! integer.

use crate::ast::{Decimal, Literal};
use crate::parser::combinators::{
    character, literal as text, literal_ignore_case, one_of, optional, satisfy,
};
use crate::parser::repetition::{many_fold, repeat};

use super::Rule;
use super::primitive::{is_identifier_part, keyword, token};

/// boolean := "true" | "false"
pub fn boolean() -> Rule<Literal> {
    keyword("true").map(|_| Literal::Bool(true)) | keyword("false").map(|_| Literal::Bool(false))
}

/// null := "null"
pub fn null() -> Rule<Literal> {
    keyword("null").map(|_| Literal::Null)
}

fn push(mut text: String, c: char) -> String {
    text.push(c);
    text
}

fn digits(radix: u32) -> Rule<String> {
    let digit = move || satisfy(move |c: char| c.is_digit(radix));
    digit().bind(move |first| many_fold(digit(), String::from(first), push))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IntegerSuffix {
    None,
    Unsigned,
    Long,
    UnsignedLong,
}

/// integer_suffix := "UL" | "LU" | "U" | "L"  (any case)
fn integer_suffix() -> Rule<IntegerSuffix> {
    let suffix = one_of(vec![
        literal_ignore_case("ul").map(|_| IntegerSuffix::UnsignedLong),
        literal_ignore_case("lu").map(|_| IntegerSuffix::UnsignedLong),
        literal_ignore_case("u").map(|_| IntegerSuffix::Unsigned),
        literal_ignore_case("l").map(|_| IntegerSuffix::Long),
    ]);
    optional(suffix).map(|suffix| suffix.unwrap_or(IntegerSuffix::None))
}

/// Types `value` by magnitude within its suffix class.
fn type_integer(value: u64, suffix: IntegerSuffix) -> Option<Literal> {
    let candidates: &[fn(u64) -> Option<Literal>] = match suffix {
        IntegerSuffix::None => &[as_int, as_uint, as_long, as_ulong],
        IntegerSuffix::Unsigned => &[as_uint, as_ulong],
        IntegerSuffix::Long => &[as_long, as_ulong],
        IntegerSuffix::UnsignedLong => &[as_ulong],
    };
    candidates.iter().find_map(|candidate| candidate(value))
}

fn as_int(value: u64) -> Option<Literal> {
    i32::try_from(value).ok().map(Literal::Int)
}

fn as_uint(value: u64) -> Option<Literal> {
    u32::try_from(value).ok().map(Literal::UInt)
}

fn as_long(value: u64) -> Option<Literal> {
    i64::try_from(value).ok().map(Literal::Long)
}

fn as_ulong(value: u64) -> Option<Literal> {
    Some(Literal::ULong(value))
}

/// integer := ("0x" | "0X") hex_digit+ integer_suffix
///          | digit+ integer_suffix
pub fn integer() -> Rule<Literal> {
    let hex = literal_ignore_case("0x")
        * digits(16).filter_map(|digits| u64::from_str_radix(&digits, 16).ok());
    let decimal = digits(10).filter_map(|digits| digits.parse::<u64>().ok());

    let number = (hex | decimal) + integer_suffix();
    token(
        number
            .filter_map(|(value, suffix)| type_integer(value, suffix))
            .not_followed_by(satisfy(is_identifier_part)),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RealSuffix {
    Float,
    Double,
    Decimal,
}

#[derive(Debug, Clone)]
struct RealParts {
    integral: Option<String>,
    fraction: Option<String>,
    exponent: Option<i32>,
    suffix: Option<RealSuffix>,
}

fn real_suffix() -> Rule<RealSuffix> {
    one_of(vec![
        literal_ignore_case("f").map(|_| RealSuffix::Float),
        literal_ignore_case("d").map(|_| RealSuffix::Double),
        literal_ignore_case("m").map(|_| RealSuffix::Decimal),
    ])
}

fn exponent() -> Rule<i32> {
    let sign = optional(character('+') | character('-'));
    let marker = character('e') | character('E');
    (marker * sign + digits(10)).filter_map(|(sign, digits)| {
        let magnitude: i32 = digits.parse().ok()?;
        Some(if sign == Some('-') { -magnitude } else { magnitude })
    })
}

/// real := digit* ("." digit+)? exponent? real_suffix?
///
/// At least one of the integral and fractional parts must be present, and
/// the suffix is required when both the fraction and the exponent are
/// missing.
pub fn real() -> Rule<Literal> {
    let fraction = character('.') * digits(10);
    let parts = optional(digits(10))
        + optional(fraction)
        + optional(exponent())
        + optional(real_suffix());

    let parts = parts.map(|(((integral, fraction), exponent), suffix)| RealParts {
        integral,
        fraction,
        exponent,
        suffix,
    });

    token(
        parts
            .filter(|parts| parts.integral.is_some() || parts.fraction.is_some())
            .filter(|parts| {
                parts.fraction.is_some() || parts.exponent.is_some() || parts.suffix.is_some()
            })
            .filter_map(real_value)
            .not_followed_by(satisfy(is_identifier_part)),
    )
}

fn real_value(parts: RealParts) -> Option<Literal> {
    let integral = parts.integral.as_deref().unwrap_or("0");
    let fraction = parts.fraction.as_deref().unwrap_or("");
    let exponent = parts.exponent.unwrap_or(0);

    match parts.suffix.unwrap_or(RealSuffix::Double) {
        RealSuffix::Float => {
            let value: f32 = format!("{integral}.{fraction}0e{exponent}").parse().ok()?;
            value.is_finite().then_some(Literal::Float(value))
        }
        RealSuffix::Double => {
            let value: f64 = format!("{integral}.{fraction}0e{exponent}").parse().ok()?;
            value.is_finite().then_some(Literal::Double(value))
        }
        RealSuffix::Decimal => decimal_value(integral, fraction, exponent).map(Literal::Decimal),
    }
}

/// Largest scale a decimal can carry.
const MAX_SCALE: usize = 28;

/// Decimal mantissas are 96-bit.
const MANTISSA_LIMIT: u128 = 1 << 96;

/// `integral.fraction * 10^exponent` as an exact decimal.
///
/// Digits past scale 28 are rounded half to even. A mantissa that needs
/// more than 96 bits fails.
fn decimal_value(integral: &str, fraction: &str, exponent: i32) -> Option<Decimal> {
    let digits = format!("{integral}{fraction}");
    let digits = digits.trim_start_matches('0');
    let scale = i64::try_from(fraction.len()).ok()? - i64::from(exponent);

    let (mantissa, scale) = match usize::try_from(scale) {
        Ok(scale) if scale <= MAX_SCALE => (mantissa_of(digits)?, scale),
        Ok(scale) => (round_half_even(digits, scale - MAX_SCALE)?, MAX_SCALE),
        Err(_) if digits.is_empty() => (0, 0),
        Err(_) => {
            let zeros = usize::try_from(scale.unsigned_abs()).ok()?;
            if digits.len().saturating_add(zeros) > 29 {
                return None;
            }
            (mantissa_of(&format!("{digits}{}", "0".repeat(zeros)))?, 0)
        }
    };

    if mantissa >= MANTISSA_LIMIT {
        return None;
    }
    Some(Decimal {
        mantissa: i128::try_from(mantissa).ok()?,
        scale: u32::try_from(scale).ok()?,
    })
}

/// Value of a digit run without leading zeros; 30 digits or more never
/// fit a mantissa.
fn mantissa_of(digits: &str) -> Option<u128> {
    match digits.len() {
        0 => Some(0),
        1..=29 => digits.parse().ok(),
        _ => None,
    }
}

/// Drops the last `drop` digits, rounding half to even.
fn round_half_even(digits: &str, drop: usize) -> Option<u128> {
    // Every written digit lies below the first dropped position.
    if drop > digits.len() {
        return Some(0);
    }

    let (kept, dropped) = digits.split_at(digits.len() - drop);
    let mut mantissa = mantissa_of(kept)?;
    let mut dropped = dropped.bytes();
    let first = dropped.next().unwrap_or(b'0');
    let sticky = dropped.any(|digit| digit != b'0');

    if first > b'5' || (first == b'5' && (sticky || mantissa % 2 == 1)) {
        mantissa += 1;
    }
    Some(mantissa)
}

fn hex_value(min: usize, max: usize) -> Rule<char> {
    repeat(satisfy(|c: char| c.is_ascii_hexdigit()), min, Some(max), String::new(), |s, c| {
        Some(push(s, c))
    })
    .filter_map(|digits| u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32))
}

/// escape := "\" (simple | "x" hex{1,4} | "u" hex{4} | "U" hex{8})
fn escape_sequence() -> Rule<char> {
    let simple = satisfy(|c| "'\"\\0abfnrtv".contains(c)).map(|c| match c {
        '0' => '\0',
        'a' => '\u{0007}',
        'b' => '\u{0008}',
        'f' => '\u{000C}',
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'v' => '\u{000B}',
        other => other,
    });

    character('\\')
        * one_of(vec![
            simple,
            character('x') * hex_value(1, 4),
            character('u') * hex_value(4, 4),
            character('U') * hex_value(8, 8),
        ])
}

fn plain_character(quote: char) -> Rule<char> {
    satisfy(move |c| c != quote && c != '\\' && !super::primitive::is_line_terminator(c))
}

/// character := "'" (escape | plain) "'"
pub fn character_literal() -> Rule<Literal> {
    let body = escape_sequence() | plain_character('\'');
    token(character('\'') * body - character('\'')).map(Literal::Char)
}

fn regular_string() -> Rule<String> {
    let item = escape_sequence() | plain_character('"');
    character('"') * many_fold(item, String::new(), push) - character('"')
}

fn verbatim_string() -> Rule<String> {
    let item = text("\"\"").map(|_| '"') | satisfy(|c| c != '"');
    text("@\"") * many_fold(item, String::new(), push) - character('"')
}

/// string := "\"" (escape | plain)* "\"" | "@\"" (plain | "\"\"")* "\""
pub fn string_literal() -> Rule<Literal> {
    token(regular_string() | verbatim_string()).map(Literal::String)
}

/// literal := boolean | null | real | integer | character | string
pub fn literal() -> Rule<Literal> {
    one_of(vec![
        boolean(),
        null(),
        real(),
        integer(),
        character_literal(),
        string_literal(),
    ])
}
