//! Literals as they come out of a whole-expression parse: the node type and
//! the way the tree prints them back.

use exprscript::ast::{Expression, Literal};
use exprscript::parse_expression;
use exprscript::parser::{ParseError, Scope};
use exprscript::types::{SYSTEM_TYPE, Type};

fn constant(text: &str) -> (Literal, Type) {
    match parse_expression(text, Scope::default()) {
        Ok(Expression::Constant(constant)) => (constant.value, constant.ty),
        other => panic!("`{text}` is not a constant: {other:?}"),
    }
}

#[test]
fn literal_types() {
    let cases = [
        ("true", Type::Bool),
        ("null", Type::Null),
        ("42", Type::Int),
        ("3000000000", Type::UInt),
        ("42u", Type::UInt),
        ("42L", Type::Long),
        ("0xFFul", Type::ULong),
        ("1.5f", Type::Float),
        ("1.5", Type::Double),
        ("1e10", Type::Double),
        ("1.5m", Type::Decimal),
        ("'x'", Type::Char),
        ("\"text\"", Type::String),
        ("@\"c:\\temp\"", Type::String),
    ];
    for (text, ty) in cases {
        assert_eq!(constant(text).1, ty, "{text}");
    }
}

#[test]
fn literals_print_back() {
    let cases = [
        ("0x42", "66"),
        ("42lu", "42UL"),
        ("1.50m", "1.50m"),
        ("2.5F", "2.5f"),
        ("'\\t'", "'\\t'"),
        ("@\"say \"\"hi\"\"\"", "\"say \\\"hi\\\"\""),
    ];
    for (text, expected) in cases {
        let tree = parse_expression(text, Scope::default()).unwrap();
        assert_eq!(tree.to_string(), expected, "{text}");
    }
}

#[test]
fn type_operators() {
    let tree = parse_expression("typeof(int[])", Scope::default()).unwrap();
    assert_eq!(tree.ty(), &Type::named(SYSTEM_TYPE));
    assert_eq!(tree.to_string(), "typeof(int[])");

    let tree = parse_expression("default(long)", Scope::default()).unwrap();
    assert_eq!(tree.ty(), &Type::Long);
    assert_eq!(tree.to_string(), "default(long)");
}

#[test]
fn malformed_literals_do_not_parse() {
    for text in ["18446744073709551616", "1e400", "'ab'", "\"open", "0x", "12abc", "1.0e"] {
        assert_eq!(
            parse_expression(text, Scope::default()),
            Err(ParseError::NoMatch),
            "`{text}` should not parse"
        );
    }
}
