use crate::types::Type;

use super::expression::{Expression, Symbol};

/// `{ statements }` together with the variables declared directly in it.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Locals in declaration order.
    pub locals: Vec<Symbol>,
    pub body: Vec<Expression>,
    /// Type of the last statement, `void` for an empty block.
    pub ty: Type,
}

/// `target = value`
#[derive(Debug, Clone, PartialEq)]
pub struct Assign {
    pub target: Box<Expression>,
    pub value: Box<Expression>,
    pub ty: Type,
}
