//! Pretty printer for typed expression trees
//!
//! This module provides Display implementations for the AST. Output reads
//! like C# source, with parentheses only where precedence needs them and
//! implicit conversions shown as `Convert(value, type)`.

use std::fmt::{self, Display};

use crate::ast::{
    Assign, Binary, BinaryOperator, Block, Call, Decimal, Expression, Lambda, Literal, Member,
    Unary,
};

const INDENT: &str = "    ";

/// Binding strength of a node; children weaker than their slot get
/// parenthesized.
const LOWEST: u8 = 0;
const UNARY: u8 = 12;
const PRIMARY: u8 = 13;

struct Formatter {
    buffer: String,
    indent_level: usize,
}

impl Formatter {
    fn new() -> Self {
        Self {
            buffer: String::new(),
            indent_level: 0,
        }
    }

    fn indent(&mut self) {
        self.indent_level += 1;
    }

    fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent_level {
            self.buffer.push_str(INDENT);
        }
    }

    fn write_str(&mut self, s: &str) {
        self.buffer.push_str(s);
    }

    fn write_newline(&mut self) {
        self.buffer.push('\n');
    }

    fn finish(self) -> String {
        self.buffer
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fmt = Formatter::new();
        format_expression(self, &mut fmt, LOWEST);
        write!(f, "{}", fmt.finish())
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(value) => write!(f, "{value}"),
            Literal::Int(value) => write!(f, "{value}"),
            Literal::UInt(value) => write!(f, "{value}u"),
            Literal::Long(value) => write!(f, "{value}L"),
            Literal::ULong(value) => write!(f, "{value}UL"),
            Literal::Float(value) => write!(f, "{value:?}f"),
            Literal::Double(value) => write!(f, "{value:?}"),
            Literal::Decimal(value) => write!(f, "{value}m"),
            Literal::Char(value) => write!(f, "'{}'", value.escape_debug()),
            Literal::String(value) => write!(f, "\"{}\"", value.escape_debug()),
            Literal::Null => write!(f, "null"),
            Literal::Type(ty) => write!(f, "typeof({ty})"),
        }
    }
}

impl Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.mantissa.unsigned_abs().to_string();
        let sign = if self.mantissa < 0 { "-" } else { "" };
        let scale = self.scale as usize;

        if scale == 0 {
            return write!(f, "{sign}{digits}");
        }
        let digits = format!("{digits:0>width$}", width = scale + 1);
        let (integral, fraction) = digits.split_at(digits.len() - scale);
        write!(f, "{sign}{integral}.{fraction}")
    }
}

fn binary_precedence(op: BinaryOperator) -> u8 {
    use BinaryOperator::*;

    match op {
        Coalesce => 1,
        OrElse => 2,
        AndAlso => 3,
        Or => 4,
        ExclusiveOr => 5,
        And => 6,
        Equal | NotEqual => 7,
        LessThan | GreaterThan | LessThanOrEqual | GreaterThanOrEqual => 8,
        LeftShift | RightShift => 9,
        Add | Subtract => 10,
        Multiply | Divide | Modulo => 11,
    }
}

fn precedence(expr: &Expression) -> u8 {
    match expr {
        Expression::Binary(binary) => binary_precedence(binary.op),
        Expression::Unary(unary) if !is_postfix(unary) => UNARY,
        Expression::Conditional(_) | Expression::Lambda(_) | Expression::Assign(_) => LOWEST,
        _ => PRIMARY,
    }
}

fn is_postfix(unary: &Unary) -> bool {
    use crate::ast::UnaryOperator::*;
    matches!(unary.op, PostIncrement | PostDecrement)
}

fn format_expression(expr: &Expression, fmt: &mut Formatter, parent: u8) {
    let needs_parens = precedence(expr) < parent;
    if needs_parens {
        fmt.write_str("(");
    }

    match expr {
        Expression::Constant(constant) => fmt.write_str(&constant.value.to_string()),
        Expression::Variable(symbol) => fmt.write_str(&symbol.name),
        Expression::Default(default) => fmt.write_str(&format!("default({})", default.ty)),
        Expression::Unary(unary) => format_unary(unary, fmt),
        Expression::Binary(binary) => format_binary(binary, fmt),
        Expression::Conditional(conditional) => {
            format_expression(&conditional.condition, fmt, 1);
            fmt.write_str(" ? ");
            format_expression(&conditional.then_expr, fmt, LOWEST);
            fmt.write_str(" : ");
            format_expression(&conditional.else_expr, fmt, LOWEST);
        }
        Expression::Member(member) => format_member(member, fmt),
        Expression::Call(call) => format_call(call, fmt),
        Expression::Invoke(invoke) => {
            format_expression(&invoke.delegate, fmt, PRIMARY);
            format_arguments(&invoke.args, "(", ")", fmt);
        }
        Expression::Index(index) => {
            format_expression(&index.target, fmt, PRIMARY);
            format_arguments(&index.args, "[", "]", fmt);
        }
        Expression::NewArray(array) => {
            fmt.write_str(&format!("new {}[]", array.element));
            if !array.items.is_empty() {
                fmt.write_str(" ");
                format_arguments(&array.items, "{ ", " }", fmt);
            }
        }
        Expression::Lambda(lambda) => format_lambda(lambda, fmt),
        Expression::Convert(convert) => {
            fmt.write_str("Convert(");
            format_expression(&convert.operand, fmt, LOWEST);
            fmt.write_str(&format!(", {})", convert.ty));
        }
        Expression::Block(block) => format_block(block, fmt),
        Expression::Assign(assign) => format_assign(assign, fmt),
    }

    if needs_parens {
        fmt.write_str(")");
    }
}

fn format_unary(unary: &Unary, fmt: &mut Formatter) {
    if is_postfix(unary) {
        format_expression(&unary.operand, fmt, PRIMARY);
        fmt.write_str(unary.op.symbol());
    } else {
        fmt.write_str(unary.op.symbol());
        // `-(-x)` must not print as `--x`.
        format_expression(&unary.operand, fmt, UNARY + 1);
    }
}

fn format_binary(binary: &Binary, fmt: &mut Formatter) {
    let prec = binary_precedence(binary.op);
    // `??` groups to the right, everything else to the left.
    let (left, right) = if binary.op == BinaryOperator::Coalesce {
        (prec + 1, prec)
    } else {
        (prec, prec + 1)
    };

    format_expression(&binary.left, fmt, left);
    fmt.write_str(" ");
    fmt.write_str(binary.op.symbol());
    fmt.write_str(" ");
    format_expression(&binary.right, fmt, right);
}

fn format_arguments(args: &[Expression], open: &str, close: &str, fmt: &mut Formatter) {
    fmt.write_str(open);
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            fmt.write_str(", ");
        }
        format_expression(arg, fmt, LOWEST);
    }
    fmt.write_str(close);
}

fn format_member(member: &Member, fmt: &mut Formatter) {
    match &member.target {
        Some(target) => format_expression(target, fmt, PRIMARY),
        None => fmt.write_str(&member.owner.to_string()),
    }
    fmt.write_str(".");
    fmt.write_str(&member.name);
}

fn format_call(call: &Call, fmt: &mut Formatter) {
    match &call.target {
        Some(target) => format_expression(target, fmt, PRIMARY),
        None => fmt.write_str(&call.owner.to_string()),
    }
    fmt.write_str(".");
    fmt.write_str(&call.method);
    format_arguments(&call.args, "(", ")", fmt);
}

fn format_lambda(lambda: &Lambda, fmt: &mut Formatter) {
    fmt.write_str("(");
    for (i, param) in lambda.params.iter().enumerate() {
        if i > 0 {
            fmt.write_str(", ");
        }
        fmt.write_str(&format!("{} {}", param.ty, param.name));
    }
    fmt.write_str(") => ");
    format_expression(&lambda.body, fmt, LOWEST);
}

fn format_assign(assign: &Assign, fmt: &mut Formatter) {
    format_expression(&assign.target, fmt, PRIMARY);
    fmt.write_str(" = ");
    format_expression(&assign.value, fmt, LOWEST);
}

fn format_block(block: &Block, fmt: &mut Formatter) {
    fmt.write_str("{");
    fmt.write_newline();
    fmt.indent();

    for local in &block.locals {
        fmt.write_indent();
        fmt.write_str(&format!("{} {};", local.ty, local.name));
        fmt.write_newline();
    }
    for statement in &block.body {
        fmt.write_indent();
        format_expression(statement, fmt, LOWEST);
        if !matches!(statement, Expression::Block(_)) {
            fmt.write_str(";");
        }
        fmt.write_newline();
    }

    fmt.dedent();
    fmt.write_indent();
    fmt.write_str("}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_suffixes() {
        assert_eq!(Literal::Int(42).to_string(), "42");
        assert_eq!(Literal::UInt(42).to_string(), "42u");
        assert_eq!(Literal::Long(42).to_string(), "42L");
        assert_eq!(Literal::ULong(42).to_string(), "42UL");
        assert_eq!(Literal::Float(1.5).to_string(), "1.5f");
        assert_eq!(Literal::Double(2.0).to_string(), "2.0");
        assert_eq!(Literal::Char('\n').to_string(), "'\\n'");
        assert_eq!(Literal::String("a\"b".into()).to_string(), "\"a\\\"b\"");
    }

    #[test]
    fn test_decimal_display() {
        let decimal = |mantissa, scale| Decimal { mantissa, scale };
        assert_eq!(decimal(150, 2).to_string(), "1.50");
        assert_eq!(decimal(5, 3).to_string(), "0.005");
        assert_eq!(decimal(-25, 1).to_string(), "-2.5");
        assert_eq!(decimal(7, 0).to_string(), "7");
    }
}
