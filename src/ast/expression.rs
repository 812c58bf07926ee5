use std::sync::Arc;

use crate::types::Type;

use super::statement::{Assign, Block};

/// A typed, scope-resolved expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Constant(Constant),
    Variable(Symbol),
    Default(DefaultValue),
    Unary(Unary),
    Binary(Binary),
    Conditional(Conditional),
    Member(Member),
    Call(Call),
    Invoke(Invoke),
    Index(Index),
    NewArray(NewArray),
    Lambda(Lambda),
    Convert(Convert),
    Block(Block),
    Assign(Assign),
}

impl Expression {
    /// Static type of the node.
    pub fn ty(&self) -> &Type {
        match self {
            Expression::Constant(node) => &node.ty,
            Expression::Variable(symbol) => &symbol.ty,
            Expression::Default(node) => &node.ty,
            Expression::Unary(node) => &node.ty,
            Expression::Binary(node) => &node.ty,
            Expression::Conditional(node) => &node.ty,
            Expression::Member(node) => &node.ty,
            Expression::Call(node) => &node.ty,
            Expression::Invoke(node) => &node.ty,
            Expression::Index(node) => &node.ty,
            Expression::NewArray(node) => &node.ty,
            Expression::Lambda(node) => &node.ty,
            Expression::Convert(node) => &node.ty,
            Expression::Block(node) => &node.ty,
            Expression::Assign(node) => &node.ty,
        }
    }

    /// Variables and array elements can be assigned to.
    pub fn is_assignable(&self) -> bool {
        match self {
            Expression::Variable(_) => true,
            Expression::Index(index) => matches!(index.target.ty(), Type::Array(_)),
            _ => false,
        }
    }
}

/// A declared variable or lambda parameter.
///
/// Nodes refer to it through a shared [`Symbol`], so every use of a
/// variable points at the same declaration.
#[derive(Debug, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub ty: Type,
}

pub type Symbol = Arc<Variable>;

/// Exact decimal value `mantissa * 10^-scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decimal {
    pub mantissa: i128,
    pub scale: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Int(i32),
    UInt(u32),
    Long(i64),
    ULong(u64),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
    Char(char),
    String(String),
    Null,
    /// A `typeof(T)` operand.
    Type(Type),
}

impl Literal {
    /// Type of the literal as written, before any conversion.
    pub fn ty(&self) -> Type {
        match self {
            Literal::Bool(_) => Type::Bool,
            Literal::Int(_) => Type::Int,
            Literal::UInt(_) => Type::UInt,
            Literal::Long(_) => Type::Long,
            Literal::ULong(_) => Type::ULong,
            Literal::Float(_) => Type::Float,
            Literal::Double(_) => Type::Double,
            Literal::Decimal(_) => Type::Decimal,
            Literal::Char(_) => Type::Char,
            Literal::String(_) => Type::String,
            Literal::Null => Type::Null,
            Literal::Type(_) => Type::named(crate::types::SYSTEM_TYPE),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub value: Literal,
    pub ty: Type,
}

/// `default(T)`
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultValue {
    pub ty: Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Plus,
    Not,
    Complement,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
}

impl UnaryOperator {
    /// Increments and decrements write back to their operand.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            UnaryOperator::PreIncrement
                | UnaryOperator::PreDecrement
                | UnaryOperator::PostIncrement
                | UnaryOperator::PostDecrement
        )
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOperator::Negate => "-",
            UnaryOperator::Plus => "+",
            UnaryOperator::Not => "!",
            UnaryOperator::Complement => "~",
            UnaryOperator::PreIncrement | UnaryOperator::PostIncrement => "++",
            UnaryOperator::PreDecrement | UnaryOperator::PostDecrement => "--",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    LeftShift,
    RightShift,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
    Equal,
    NotEqual,
    And,
    ExclusiveOr,
    Or,
    AndAlso,
    OrElse,
    Coalesce,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::LeftShift => "<<",
            BinaryOperator::RightShift => ">>",
            BinaryOperator::LessThan => "<",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::GreaterThanOrEqual => ">=",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::And => "&",
            BinaryOperator::ExclusiveOr => "^",
            BinaryOperator::Or => "|",
            BinaryOperator::AndAlso => "&&",
            BinaryOperator::OrElse => "||",
            BinaryOperator::Coalesce => "??",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Unary {
    pub op: UnaryOperator,
    pub operand: Box<Expression>,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binary {
    pub op: BinaryOperator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub ty: Type,
}

/// `condition ? then_expr : else_expr`
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    pub condition: Box<Expression>,
    pub then_expr: Box<Expression>,
    pub else_expr: Box<Expression>,
    pub ty: Type,
}

/// Field or property read. `target` is `None` for static members.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub target: Option<Box<Expression>>,
    pub owner: Type,
    pub name: String,
    pub ty: Type,
}

/// Method call. `target` is `None` for static methods.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub target: Option<Box<Expression>>,
    pub owner: Type,
    pub method: String,
    pub args: Vec<Expression>,
    pub ty: Type,
}

/// Delegate invocation `f(args)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Invoke {
    pub delegate: Box<Expression>,
    pub args: Vec<Expression>,
    pub ty: Type,
}

/// Array element or indexer access `target[args]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    pub target: Box<Expression>,
    pub args: Vec<Expression>,
    pub ty: Type,
}

/// `new T[] { items }`
#[derive(Debug, Clone, PartialEq)]
pub struct NewArray {
    pub element: Type,
    pub items: Vec<Expression>,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    pub params: Vec<Symbol>,
    pub body: Box<Expression>,
    /// The delegate type of the lambda.
    pub ty: Type,
}

/// Implicit conversion inserted by the builder.
#[derive(Debug, Clone, PartialEq)]
pub struct Convert {
    pub operand: Box<Expression>,
    pub ty: Type,
}
