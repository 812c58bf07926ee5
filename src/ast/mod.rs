//! Typed expression trees produced by the grammar.
//!
//! Every node carries its static type. Statements are expressions too: a
//! declaration becomes an [`Assign`] to a fresh [`Variable`] and a block
//! becomes a [`Block`] listing its own locals.

pub mod expression;
pub mod statement;

pub use expression::{
    Binary, BinaryOperator, Call, Conditional, Constant, Convert, Decimal, DefaultValue, Expression,
    Index, Invoke, Lambda, Literal, Member, NewArray, Symbol, Unary, UnaryOperator, Variable,
};
pub use statement::{Assign, Block};
