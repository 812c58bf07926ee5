//! Grammar for the expression language.
//!
//! This module contains all the parsing rules organized by category:
//! - `primitive`: whitespace, comments, punctuation, keywords, identifiers
//! - `literal`: boolean, null, numeric, character and string literals
//! - `types`: type names as written in source
//! - `expression`: the operator precedence chain, primaries and lambdas
//! - `statement`: blocks, declarations and expression statements
//!
//! Rules run over a [`Scope`] cursor. They look symbols up in it, declare
//! new ones, and call its builder for every construct they recognize; a
//! builder or resolver rejection makes the rule yield nothing.

mod expression;
mod literal;
mod primitive;
mod statement;
mod types;

use std::fmt::Display;

use tracing::trace;

use crate::ast::{Expression, Symbol};

use super::combinators::{BoxedParser, Parser, Results, end_of_input, get_state, set_state};
use super::scope::Scope;
use super::state::{Cursor, Parsed};

pub use expression::{expression, lambda, non_assignment};
pub use literal::{boolean, character_literal, integer, literal, null, real, string_literal};
pub use primitive::{KEYWORDS, identifier, keyword, operator, symbol, whitespace};
pub use statement::{block, declaration, statement};
pub use types::type_name;

/// A grammar rule.
pub type Rule<T> = BoxedParser<T, Scope>;

/// Maps every result with access to the scope at its end; `None` drops it.
pub fn scoped<T, U, F>(rule: Rule<T>, f: F) -> Rule<U>
where
    T: 'static,
    U: 'static,
    F: Fn(&Scope, T) -> Option<U> + 'static,
{
    let f = std::rc::Rc::new(f);
    BoxedParser::new(move |input: Cursor<Scope>| -> Results<U, Scope> {
        let f = std::rc::Rc::clone(&f);
        Box::new(rule.parse(input).filter_map(move |Parsed { value, tail }| {
            let value = f(tail.state(), value)?;
            Some(Parsed::new(value, tail))
        }))
    })
}

/// Turns a capability rejection into a silent failure, logging why.
pub(crate) fn accept<T, E: Display>(construct: &str, result: Result<T, E>) -> Option<T> {
    result
        .map_err(|error| trace!(construct, %error, "construct rejected"))
        .ok()
}

/// Parses `rule` in a fresh block and builds a block node from the
/// statements it produced and the locals it declared.
pub(crate) fn in_block(rule: Rule<Vec<Expression>>) -> Rule<Expression> {
    let body = get_state().bind(move |outer: Scope| {
        let enter = set_state(outer.enter_block());
        (enter * rule.clone() + get_state()).map(|(body, inner): (Vec<Expression>, Scope)| {
            (inner.locals(), body)
        }) - set_state(outer)
    });

    scoped(body, |scope, (locals, body): (Vec<Symbol>, Vec<Expression>)| {
        accept("block", scope.builder().block(locals, body))
    })
}

/// expression_unit := skip expression EOF
pub fn expression_unit() -> Rule<Expression> {
    whitespace() * expression() - end_of_input()
}

/// statement_unit := skip (block | statement) EOF
///
/// A statement outside a block is wrapped in one so its declarations have
/// somewhere to live.
pub fn statement_unit() -> Rule<Expression> {
    whitespace() * (block() | in_block(statement())) - end_of_input()
}
