//! Statement parsers
//!
//! A statement produces the nodes it contributes to the enclosing block:
//! none for `;` or a declaration without initializers, one for most others.

use std::sync::Arc;

use crate::ast::{Expression, Symbol};
use crate::parser::combinators::{defer, one_of, optional, pure, update_state};
use crate::parser::repetition::{many, separated_by};
use crate::parser::scope::Scope;
use crate::types::Type;

use super::expression::{expecting, expression};
use super::primitive::{identifier, keyword, operator, symbol};
use super::types::type_name;
use super::{Rule, accept, in_block, scoped};

fn assign_operator() -> Rule<&'static str> {
    operator("=", &['=', '>'])
}

/// Declares `symbol` in the current block, failing on a redeclaration.
fn declare(symbol: Symbol) -> Rule<()> {
    update_state(move |scope: &Scope| scope.declare(Arc::clone(&symbol)))
}

/// block := "{" statement* "}"
pub fn block() -> Rule<Expression> {
    let statements = many(defer(statement))
        .map(|statements| statements.into_iter().flatten().collect::<Vec<_>>());
    symbol("{") * in_block(statements - symbol("}"))
}

/// declarator := identifier ("=" expression)?
///
/// The variable is in scope before its initializer is parsed.
fn declarator(ty: Type) -> Rule<Option<Expression>> {
    let initializer = assign_operator() * expecting(ty.clone(), expression());
    let variable = scoped(identifier(), move |scope, name| {
        accept("variable", scope.builder().variable(&name, ty.clone()))
    });

    variable.bind(move |symbol: Symbol| {
        let target = Expression::Variable(Arc::clone(&symbol));
        let assigned = scoped(optional(initializer.clone()), move |scope, value| match value {
            Some(value) => accept("assignment", scope.builder().assign(target.clone(), value))
                .map(Some),
            None => Some(None),
        });
        declare(symbol) * assigned
    })
}

/// typed_declaration := type_name declarator ("," declarator)* ";"
fn typed_declaration() -> Rule<Vec<Expression>> {
    let declarators = type_name().bind(|ty| separated_by(declarator(ty), symbol(",")));
    (declarators - symbol(";"))
        .map(|assignments| assignments.into_iter().flatten().collect())
}

/// implicit_declaration := "var" identifier "=" expression ";"
///
/// The variable takes the initializer's type, so it is declared only after
/// the initializer.
fn implicit_declaration() -> Rule<Vec<Expression>> {
    let initializer = assign_operator() * expression();
    let declared = scoped(keyword("var") * identifier() + initializer, |scope, (name, value)| {
        let builder = scope.builder();
        let symbol = accept("variable", builder.variable(&name, value.ty().clone()))?;
        let assignment = accept(
            "assignment",
            builder.assign(Expression::Variable(Arc::clone(&symbol)), value),
        )?;
        Some((symbol, assignment))
    });

    declared.bind(|(symbol, assignment)| declare(symbol).map(move |_| vec![assignment.clone()]))
        - symbol(";")
}

/// declaration := typed_declaration | implicit_declaration
pub fn declaration() -> Rule<Vec<Expression>> {
    typed_declaration() | implicit_declaration()
}

/// expression_statement := expression ("=" expression)? ";"
///
/// The target is parsed once and reused when an assignment tail follows;
/// the value is parsed expecting the target's type.
fn expression_statement() -> Rule<Expression> {
    let statement = expression().bind(|target: Expression| {
        let value = assign_operator() * expecting(target.ty().clone(), expression());
        let assigned = {
            let target = target.clone();
            scoped(value, move |scope, value| {
                accept("assignment", scope.builder().assign(target.clone(), value))
            })
        };
        assigned | pure(target)
    });
    statement - symbol(";")
}

/// statement := block | declaration | expression_statement | ";"
pub fn statement() -> Rule<Vec<Expression>> {
    let nested = block().map(|block| vec![block]);
    let expression_statement = expression_statement().map(|e| vec![e]);
    let empty = symbol(";").map(|_| Vec::new());

    one_of(vec![nested, declaration(), expression_statement, empty])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::combinators::parse;
    use crate::parser::grammar::statement_unit;
    use crate::types::{Capabilities, DefaultBuilder, DefaultResolver};

    fn scope() -> Scope {
        let resolver = DefaultResolver::new().with_namespace("System");
        Scope::new(Capabilities::new(resolver, DefaultBuilder::new()))
    }

    fn block_of(text: &str) -> Option<crate::ast::Block> {
        match parse(&statement_unit(), text, scope()).ok()?.value {
            Expression::Block(block) => Some(block),
            _ => None,
        }
    }

    fn names(locals: &[Symbol]) -> Vec<&str> {
        locals.iter().map(|local| local.name.as_str()).collect()
    }

    #[test]
    fn test_block_locals_in_order() {
        let block = block_of("{ var x = 1; var y = 2; }").unwrap();
        assert_eq!(names(&block.locals), vec!["x", "y"]);
        assert_eq!(block.body.len(), 2);
    }

    #[test]
    fn test_declaration_without_initializer() {
        let block = block_of("{ int a, b = 2; }").unwrap();
        assert_eq!(names(&block.locals), vec!["a", "b"]);
        assert_eq!(block.body.len(), 1);
    }

    #[test]
    fn test_top_level_statement_is_wrapped() {
        let block = block_of("long n = 1;").unwrap();
        assert_eq!(names(&block.locals), vec!["n"]);
        assert_eq!(block.ty, Type::Long);
    }

    #[test]
    fn test_redeclaration_fails() {
        assert!(block_of("{ int x; int x; }").is_none());
        assert!(block_of("{ int x; { int x; } }").is_some());
    }

    #[test]
    fn test_inner_locals_stay_inside() {
        let block = block_of("{ int x; { int y; } }").unwrap();
        assert_eq!(names(&block.locals), vec!["x"]);
        assert!(block_of("{ { int y; } y = 1; }").is_none());
    }

    #[test]
    fn test_initializer_sees_its_variable() {
        assert!(block_of("{ int x = x; }").is_some());
        assert!(block_of("{ var x = x; }").is_none());
    }

    #[test]
    fn test_assignment_and_empty_statements() {
        let block = block_of("{ int x; ; x = 3; x++; }").unwrap();
        assert_eq!(block.body.len(), 2);
        assert!(block_of("{ 1 = 2; }").is_none());
    }

    #[test]
    fn test_assignment_converts_value() {
        let block = block_of("{ double d; d = 1; }").unwrap();
        assert!(matches!(&block.body[0], Expression::Assign(assign) if assign.ty == Type::Double));
        assert!(block_of("{ int i; i = 1.5; }").is_none());
    }

    #[test]
    fn test_declared_lambda_uses_declared_type() {
        let block = block_of("{ Func<int, int> inc = x => x + 1; int two = inc(1); }").unwrap();
        assert_eq!(block.ty, Type::Int);
    }
}
