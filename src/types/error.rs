//! # Type Error Definitions
//!
//! Errors raised by the capabilities the parser consults while building
//! nodes:
//!
//! - A dotted name that names no known type (`ResolveError`)
//! - A node whose operand types do not fit its operator, member or call
//!   (`TypeError`)
//!
//! Neither escapes a parse directly. A rule whose builder call fails simply
//! produces no result, so the error only decides whether an alternative
//! survives. The `Display` texts exist for the trace log.

use thiserror::Error;

use super::ty::Type;

/// Failure to resolve a dotted name to a type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("unknown type: {0}")]
    UnknownType(String),
}

/// Failure to build a typed node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// No overload of the operator accepts the operand types.
    #[error("operator {operator} cannot be applied to {operands}")]
    InvalidOperator { operator: String, operands: String },

    /// A value of type `found` is used where `expected` is required and no
    /// implicit conversion exists.
    #[error("cannot convert {found} to {expected}")]
    Mismatch { expected: Type, found: Type },

    /// The type has no instance or static member by that name.
    #[error("{owner} has no member {name}")]
    UnknownMember { owner: Type, name: String },

    /// A method was found but no overload takes the given argument types.
    #[error("no overload of {owner}.{name} takes ({arguments})")]
    NoOverload {
        owner: Type,
        name: String,
        arguments: String,
    },

    /// Invoking or indexing a value that supports neither.
    #[error("{0} cannot be invoked or indexed that way")]
    NotCallable(Type),

    /// The left side of an assignment or increment is not a variable or element.
    #[error("the left-hand side of an assignment must be a variable or element")]
    NotAssignable,

    /// Declaring a variable of a type that has no values.
    #[error("a variable cannot be of type {0}")]
    InvalidVariableType(Type),

    /// Lambda parameters do not line up with the expected delegate type.
    #[error("lambda does not match delegate type {0}")]
    LambdaMismatch(Type),
}

impl TypeError {
    pub fn mismatch(expected: &Type, found: &Type) -> Self {
        TypeError::Mismatch {
            expected: expected.clone(),
            found: found.clone(),
        }
    }

    pub(crate) fn list(types: &[Type]) -> String {
        types
            .iter()
            .map(Type::pretty)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
