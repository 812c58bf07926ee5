//! # exprscript - typed expression trees from C#-like source
//!
//! exprscript parses expressions and statement blocks written in a C#-like
//! syntax straight from text into a typed expression tree. There is no
//! separate lexer: the grammar works on characters, and every rule threads
//! an immutable [`Scope`](parser::Scope) along with the input position.
//!
//! ## Architecture Overview
//!
//! 1. **Parser engine** (`parser::combinators`, `parser::repetition`) - lazy,
//!    backtracking parser combinators over a [`Cursor`](parser::Cursor).
//!    Repetition runs on an explicit work stack so long inputs do not grow
//!    the native stack.
//! 2. **Scope** (`parser::Scope`) - visible symbols, the locals of the
//!    current block and the expected type, stored in persistent
//!    structures (`collections`) so backtracking is free.
//! 3. **Grammar** (`parser::grammar`) - literals, type names, the operator
//!    precedence chain, lambdas, blocks and declarations.
//! 4. **Capabilities** (`types`) - a type-name resolver and a node
//!    builder. The grammar never inspects types itself; it asks the
//!    builder to construct each node, and a rejection is an ordinary
//!    parse failure.
//!
//! ```text
//! Source Code (String)
//!     ↓
//! [Grammar + Scope] ──resolve──▶ [TypeResolver]
//!     │            ──build────▶ [NodeBuilder]
//!     ↓
//! Typed AST (ast::Expression)
//! ```
//!
//! ## Example
//!
//! ```
//! use exprscript::{parse_expression, parser::Scope, types::Type};
//!
//! let tree = parse_expression("(int x, int y) => x * y + 1", Scope::default()).unwrap();
//! assert_eq!(tree.ty(), &Type::delegate(vec![Type::Int, Type::Int], Type::Int));
//! assert_eq!(tree.to_string(), "(int x, int y) => x * y + 1");
//! ```
//!
//! ## Module Structure
//!
//! - [`ast`] - typed expression tree
//! - [`collections`] - persistent AVL map and stack
//! - [`fmt`] - pretty printing
//! - [`parser`] - combinators, scope and grammar
//! - [`types`] - type descriptors and the two capabilities

pub mod ast;
pub mod collections;
pub mod fmt;
pub mod parser;
pub mod types;

use ast::Expression;
use parser::grammar::{expression_unit, statement_unit};
use parser::{ParseError, Scope};

/// Parses a whole expression, surrounded by optional whitespace and
/// comments.
pub fn parse_expression(text: &str, scope: Scope) -> Result<Expression, ParseError> {
    parser::parse(&expression_unit(), text, scope).map(|parsed| parsed.value)
}

/// Parses a block `{ ... }` or a single statement, which is wrapped in a
/// block of its own.
pub fn parse_statement(text: &str, scope: Scope) -> Result<Expression, ParseError> {
    parser::parse(&statement_unit(), text, scope).map(|parsed| parsed.value)
}
