//! Node construction.
//!
//! The grammar recognizes shapes; a [`NodeBuilder`] decides whether the
//! operand types make sense for that shape and produces the typed node.
//! [`DefaultBuilder`] follows C# rules for the predefined types: binary
//! numeric promotion, implicit widening conversions (made explicit as
//! [`Convert`] nodes), constant narrowing of `int` literals, string
//! concatenation and a small library of well-known members.

use std::sync::Arc;

use crate::ast::{
    Assign, Binary, BinaryOperator, Block, Call, Conditional, Constant, Convert, DefaultValue,
    Expression, Index, Invoke, Lambda, Literal, Member, NewArray, Symbol, Unary, UnaryOperator,
    Variable,
};

use super::error::TypeError;
use super::resolver::MATH;
use super::ty::Type;

/// Builds typed nodes for recognized constructs.
///
/// Every method is called once per construct, after its operands have been
/// built. An `Err` rejects the construct; the grammar then treats it as
/// not matching.
pub trait NodeBuilder: Send + Sync {
    fn literal(&self, value: Literal) -> Expression;

    fn default_value(&self, ty: Type) -> Result<Expression, TypeError>;

    fn type_of(&self, ty: Type) -> Result<Expression, TypeError>;

    fn unary(&self, op: UnaryOperator, operand: Expression) -> Result<Expression, TypeError>;

    fn binary(
        &self,
        op: BinaryOperator,
        left: Expression,
        right: Expression,
    ) -> Result<Expression, TypeError>;

    fn conditional(
        &self,
        condition: Expression,
        then_expr: Expression,
        else_expr: Expression,
    ) -> Result<Expression, TypeError>;

    fn member(&self, target: Expression, name: &str) -> Result<Expression, TypeError>;

    fn static_member(&self, owner: &Type, name: &str) -> Result<Expression, TypeError>;

    fn call(
        &self,
        target: Expression,
        method: &str,
        args: Vec<Expression>,
    ) -> Result<Expression, TypeError>;

    fn static_call(
        &self,
        owner: &Type,
        method: &str,
        args: Vec<Expression>,
    ) -> Result<Expression, TypeError>;

    fn invoke(&self, delegate: Expression, args: Vec<Expression>) -> Result<Expression, TypeError>;

    fn index(&self, target: Expression, args: Vec<Expression>) -> Result<Expression, TypeError>;

    fn new_array(&self, element: Type, items: Vec<Expression>) -> Result<Expression, TypeError>;

    /// Builds a lambda. `expected` is the delegate type the context asks
    /// for, if any.
    fn lambda(
        &self,
        expected: Option<&Type>,
        params: Vec<Symbol>,
        body: Expression,
    ) -> Result<Expression, TypeError>;

    fn block(&self, locals: Vec<Symbol>, body: Vec<Expression>) -> Result<Expression, TypeError>;

    fn variable(&self, name: &str, ty: Type) -> Result<Symbol, TypeError>;

    fn assign(&self, target: Expression, value: Expression) -> Result<Expression, TypeError>;

    /// Implicitly converts `value` to `ty`.
    fn convert(&self, value: Expression, ty: &Type) -> Result<Expression, TypeError>;
}

/// C#-flavoured builder for the predefined types.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBuilder;

impl DefaultBuilder {
    pub fn new() -> Self {
        DefaultBuilder
    }
}

/// Result type of a binary arithmetic operation on `a` and `b`.
fn promote(a: &Type, b: &Type) -> Option<Type> {
    use Type::*;

    if !a.is_numeric() || !b.is_numeric() {
        return None;
    }

    let either = |ty: Type| *a == ty || *b == ty;
    let signed = |ty: &Type| matches!(ty, SByte | Short | Int | Long);

    if either(Decimal) {
        return (!either(Float) && !either(Double)).then_some(Decimal);
    }
    if either(Double) {
        return Some(Double);
    }
    if either(Float) {
        return Some(Float);
    }
    if either(ULong) {
        return (!signed(a) && !signed(b)).then_some(ULong);
    }
    if either(Long) {
        return Some(Long);
    }
    if either(UInt) {
        return Some(if signed(a) || signed(b) { Long } else { UInt });
    }
    Some(Int)
}

/// Result type of a unary arithmetic operation on `ty`.
fn promote_unary(ty: &Type) -> Option<Type> {
    match ty {
        Type::SByte | Type::Byte | Type::Short | Type::UShort | Type::Char => Some(Type::Int),
        numeric if numeric.is_numeric() => Some(numeric.clone()),
        _ => None,
    }
}

/// `int` constants convert to any integral type that holds their value.
fn fits_constant(value: &Expression, target: &Type) -> bool {
    let Expression::Constant(Constant {
        value: literal,
        ty: Type::Int,
    }) = value
    else {
        return false;
    };
    let Literal::Int(v) = literal else {
        return false;
    };

    match target {
        Type::SByte => i8::try_from(*v).is_ok(),
        Type::Byte => u8::try_from(*v).is_ok(),
        Type::Short => i16::try_from(*v).is_ok(),
        Type::UShort => u16::try_from(*v).is_ok(),
        Type::UInt => u32::try_from(*v).is_ok(),
        Type::ULong => u64::try_from(*v).is_ok(),
        _ => false,
    }
}

fn coerce(value: Expression, target: &Type) -> Result<Expression, TypeError> {
    if value.ty() == target {
        return Ok(value);
    }
    if value.ty().converts_to(target) || fits_constant(&value, target) {
        return Ok(Expression::Convert(Convert {
            operand: Box::new(value),
            ty: target.clone(),
        }));
    }
    Err(TypeError::mismatch(target, value.ty()))
}

fn types_of(args: &[Expression]) -> Vec<Type> {
    args.iter().map(|arg| arg.ty().clone()).collect()
}

/// A member signature: parameter types and result type.
type Signature = (Vec<Type>, Type);

/// Picks the first signature all arguments convert to and converts them.
fn resolve_overload(
    owner: &Type,
    name: &str,
    candidates: &[Signature],
    args: Vec<Expression>,
) -> Result<(Vec<Expression>, Type), TypeError> {
    let chosen = candidates.iter().find(|(params, _)| {
        params.len() == args.len()
            && args
                .iter()
                .zip(params)
                .all(|(arg, param)| arg.ty().converts_to(param) || fits_constant(arg, param))
    });

    let Some((params, ret)) = chosen else {
        return Err(TypeError::NoOverload {
            owner: owner.clone(),
            name: name.to_string(),
            arguments: TypeError::list(&types_of(&args)),
        });
    };

    let args = args
        .into_iter()
        .zip(params)
        .map(|(arg, param)| coerce(arg, param))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((args, ret.clone()))
}

fn unknown_member(owner: &Type, name: &str) -> TypeError {
    TypeError::UnknownMember {
        owner: owner.clone(),
        name: name.to_string(),
    }
}

fn instance_methods(owner: &Type, name: &str) -> Vec<Signature> {
    use Type::*;

    let mut candidates = match (owner, name) {
        (String, "Substring") => vec![(vec![Int], String), (vec![Int, Int], String)],
        (String, "Contains" | "StartsWith" | "EndsWith") => vec![(vec![String], Bool)],
        (String, "IndexOf") => vec![(vec![Char], Int), (vec![String], Int)],
        (String, "ToUpper" | "ToLower" | "Trim") => vec![(vec![], String)],
        _ => Vec::new(),
    };

    match name {
        "ToString" => candidates.push((vec![], String)),
        "GetHashCode" => candidates.push((vec![], Int)),
        "Equals" => candidates.push((vec![Object], Bool)),
        _ => {}
    }
    candidates
}

fn static_methods(owner: &Type, name: &str) -> Vec<Signature> {
    use Type::*;

    let unary = |types: &[Type]| -> Vec<Signature> {
        types.iter().map(|ty| (vec![ty.clone()], ty.clone())).collect()
    };
    let binary = |types: &[Type]| -> Vec<Signature> {
        types
            .iter()
            .map(|ty| (vec![ty.clone(), ty.clone()], ty.clone()))
            .collect()
    };

    match owner {
        Named { name: owner, .. } if owner == MATH => match name {
            "Abs" => unary(&[Int, Long, Float, Double, Decimal]),
            "Max" | "Min" => binary(&[Int, UInt, Long, ULong, Float, Double, Decimal]),
            "Floor" | "Ceiling" => unary(&[Double, Decimal]),
            "Sqrt" => unary(&[Double]),
            "Pow" => binary(&[Double]),
            _ => Vec::new(),
        },
        String => match name {
            "IsNullOrEmpty" => vec![(vec![String], Bool)],
            "Concat" => (2..=4).map(|n| (vec![String; n], String)).collect(),
            _ => Vec::new(),
        },
        Char => match name {
            "IsDigit" | "IsLetter" | "IsWhiteSpace" => vec![(vec![Char], Bool)],
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

impl NodeBuilder for DefaultBuilder {
    fn literal(&self, value: Literal) -> Expression {
        let ty = value.ty();
        Expression::Constant(Constant { value, ty })
    }

    fn default_value(&self, ty: Type) -> Result<Expression, TypeError> {
        if matches!(ty, Type::Void | Type::Null) {
            return Err(TypeError::InvalidVariableType(ty));
        }
        Ok(Expression::Default(DefaultValue { ty }))
    }

    fn type_of(&self, ty: Type) -> Result<Expression, TypeError> {
        if ty == Type::Null {
            return Err(TypeError::InvalidVariableType(ty));
        }
        Ok(self.literal(Literal::Type(ty)))
    }

    fn unary(&self, op: UnaryOperator, operand: Expression) -> Result<Expression, TypeError> {
        let invalid = || TypeError::InvalidOperator {
            operator: op.symbol().to_string(),
            operands: operand.ty().pretty(),
        };

        let ty = match op {
            UnaryOperator::Not if *operand.ty() == Type::Bool => Type::Bool,
            UnaryOperator::Not => return Err(invalid()),
            _ if op.is_mutating() => {
                if !operand.is_assignable() {
                    return Err(TypeError::NotAssignable);
                }
                if !operand.ty().is_numeric() {
                    return Err(invalid());
                }
                operand.ty().clone()
            }
            UnaryOperator::Negate => match promote_unary(operand.ty()) {
                Some(Type::UInt) => Type::Long,
                Some(Type::ULong) | None => return Err(invalid()),
                Some(ty) => ty,
            },
            UnaryOperator::Complement => match promote_unary(operand.ty()) {
                Some(ty) if ty.is_integral() => ty,
                _ => return Err(invalid()),
            },
            _ => promote_unary(operand.ty()).ok_or_else(invalid)?,
        };

        let operand = if op.is_mutating() {
            operand
        } else {
            coerce(operand, &ty)?
        };

        Ok(Expression::Unary(Unary {
            op,
            operand: Box::new(operand),
            ty,
        }))
    }

    fn binary(
        &self,
        op: BinaryOperator,
        left: Expression,
        right: Expression,
    ) -> Result<Expression, TypeError> {
        use BinaryOperator::*;

        let l = left.ty().clone();
        let r = right.ty().clone();
        let invalid = || TypeError::InvalidOperator {
            operator: op.symbol().to_string(),
            operands: TypeError::list(&[l.clone(), r.clone()]),
        };

        // (operand type, result type)
        let (operands, ty) = match op {
            Add if (l == Type::String || r == Type::String)
                && l != Type::Void
                && r != Type::Void =>
            {
                return Ok(Expression::Binary(Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                    ty: Type::String,
                }));
            }
            Add | Subtract | Multiply | Divide | Modulo => {
                let ty = promote(&l, &r).ok_or_else(invalid)?;
                (ty.clone(), ty)
            }
            LeftShift | RightShift => {
                let ty = promote_unary(&l)
                    .filter(Type::is_integral)
                    .ok_or_else(invalid)?;
                if !r.converts_to(&Type::Int) {
                    return Err(invalid());
                }
                return Ok(Expression::Binary(Binary {
                    op,
                    left: Box::new(coerce(left, &ty)?),
                    right: Box::new(coerce(right, &Type::Int)?),
                    ty,
                }));
            }
            LessThan | GreaterThan | LessThanOrEqual | GreaterThanOrEqual => {
                (promote(&l, &r).ok_or_else(invalid)?, Type::Bool)
            }
            Equal | NotEqual => {
                let operands = if let Some(ty) = promote(&l, &r) {
                    ty
                } else if l == r && l != Type::Void {
                    l.clone()
                } else if l.is_reference() && r.converts_to(&l) {
                    l.clone()
                } else if r.is_reference() && l.converts_to(&r) {
                    r.clone()
                } else {
                    return Err(invalid());
                };
                (operands, Type::Bool)
            }
            And | Or | ExclusiveOr => {
                if l == Type::Bool && r == Type::Bool {
                    (Type::Bool, Type::Bool)
                } else {
                    let ty = promote(&l, &r)
                        .filter(Type::is_integral)
                        .ok_or_else(invalid)?;
                    (ty.clone(), ty)
                }
            }
            AndAlso | OrElse => {
                if l != Type::Bool || r != Type::Bool {
                    return Err(invalid());
                }
                (Type::Bool, Type::Bool)
            }
            Coalesce => {
                if !l.is_reference() {
                    return Err(invalid());
                }
                let ty = if r.converts_to(&l) && l != Type::Null {
                    l.clone()
                } else if l.converts_to(&r) {
                    r.clone()
                } else {
                    return Err(invalid());
                };
                (ty.clone(), ty)
            }
        };

        Ok(Expression::Binary(Binary {
            op,
            left: Box::new(coerce(left, &operands)?),
            right: Box::new(coerce(right, &operands)?),
            ty,
        }))
    }

    fn conditional(
        &self,
        condition: Expression,
        then_expr: Expression,
        else_expr: Expression,
    ) -> Result<Expression, TypeError> {
        let condition = coerce(condition, &Type::Bool)?;

        let then_ty = then_expr.ty().clone();
        let else_ty = else_expr.ty().clone();
        let ty = if then_ty == else_ty {
            then_ty
        } else if then_ty.converts_to(&else_ty) {
            else_ty
        } else if else_ty.converts_to(&then_ty) {
            then_ty
        } else {
            return Err(TypeError::mismatch(&then_ty, &else_ty));
        };

        Ok(Expression::Conditional(Conditional {
            condition: Box::new(condition),
            then_expr: Box::new(coerce(then_expr, &ty)?),
            else_expr: Box::new(coerce(else_expr, &ty)?),
            ty,
        }))
    }

    fn member(&self, target: Expression, name: &str) -> Result<Expression, TypeError> {
        let owner = target.ty().clone();
        let ty = match (&owner, name) {
            (Type::String | Type::Array(_), "Length") => Type::Int,
            _ => return Err(unknown_member(&owner, name)),
        };

        Ok(Expression::Member(Member {
            target: Some(Box::new(target)),
            owner,
            name: name.to_string(),
            ty,
        }))
    }

    fn static_member(&self, owner: &Type, name: &str) -> Result<Expression, TypeError> {
        let ty = match (owner, name) {
            (Type::Named { name: math, .. }, "PI" | "E") if math == MATH => Type::Double,
            (Type::String, "Empty") => Type::String,
            (numeric, "MaxValue" | "MinValue") if numeric.is_numeric() => numeric.clone(),
            _ => return Err(unknown_member(owner, name)),
        };

        Ok(Expression::Member(Member {
            target: None,
            owner: owner.clone(),
            name: name.to_string(),
            ty,
        }))
    }

    fn call(
        &self,
        target: Expression,
        method: &str,
        args: Vec<Expression>,
    ) -> Result<Expression, TypeError> {
        if method == "Invoke" && target.ty().is_delegate() {
            return self.invoke(target, args);
        }

        let owner = target.ty().clone();
        let candidates = instance_methods(&owner, method);
        if candidates.is_empty() {
            return Err(unknown_member(&owner, method));
        }
        let (args, ty) = resolve_overload(&owner, method, &candidates, args)?;

        Ok(Expression::Call(Call {
            target: Some(Box::new(target)),
            owner,
            method: method.to_string(),
            args,
            ty,
        }))
    }

    fn static_call(
        &self,
        owner: &Type,
        method: &str,
        args: Vec<Expression>,
    ) -> Result<Expression, TypeError> {
        let candidates = static_methods(owner, method);
        if candidates.is_empty() {
            return Err(unknown_member(owner, method));
        }
        let (args, ty) = resolve_overload(owner, method, &candidates, args)?;

        Ok(Expression::Call(Call {
            target: None,
            owner: owner.clone(),
            method: method.to_string(),
            args,
            ty,
        }))
    }

    fn invoke(&self, delegate: Expression, args: Vec<Expression>) -> Result<Expression, TypeError> {
        let (params, ty) = match delegate.ty().delegate_signature() {
            Some((params, ret)) if params.len() == args.len() => (params.to_vec(), ret),
            _ => return Err(TypeError::NotCallable(delegate.ty().clone())),
        };

        let args = args
            .into_iter()
            .zip(&params)
            .map(|(arg, param)| coerce(arg, param))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Expression::Invoke(Invoke {
            delegate: Box::new(delegate),
            args,
            ty,
        }))
    }

    fn index(&self, target: Expression, args: Vec<Expression>) -> Result<Expression, TypeError> {
        let ty = match (target.ty(), args.as_slice()) {
            (Type::Array(element), [_]) => element.as_ref().clone(),
            (Type::String, [_]) => Type::Char,
            (other, _) => return Err(TypeError::NotCallable(other.clone())),
        };

        let args = args
            .into_iter()
            .map(|arg| coerce(arg, &Type::Int))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Expression::Index(Index {
            target: Box::new(target),
            args,
            ty,
        }))
    }

    fn new_array(&self, element: Type, items: Vec<Expression>) -> Result<Expression, TypeError> {
        if matches!(element, Type::Void | Type::Null) {
            return Err(TypeError::InvalidVariableType(element));
        }

        let items = items
            .into_iter()
            .map(|item| coerce(item, &element))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Expression::NewArray(NewArray {
            ty: Type::array(element.clone()),
            element,
            items,
        }))
    }

    fn lambda(
        &self,
        expected: Option<&Type>,
        params: Vec<Symbol>,
        body: Expression,
    ) -> Result<Expression, TypeError> {
        let matching = expected.and_then(|ty| {
            let (expected_params, ret) = ty.delegate_signature()?;
            let same = expected_params.len() == params.len()
                && expected_params
                    .iter()
                    .zip(&params)
                    .all(|(expected, param)| *expected == param.ty);
            same.then(|| (ty.clone(), ret))
        });

        let (ty, body) = match matching {
            Some((ty, Type::Void)) => (ty, body),
            Some((ty, ret)) => {
                let body = coerce(body, &ret).map_err(|_| TypeError::LambdaMismatch(ty.clone()))?;
                (ty, body)
            }
            None => {
                if *body.ty() == Type::Null {
                    return Err(TypeError::InvalidVariableType(Type::Null));
                }
                let param_types = params.iter().map(|param| param.ty.clone()).collect();
                (Type::delegate(param_types, body.ty().clone()), body)
            }
        };

        Ok(Expression::Lambda(Lambda {
            params,
            body: Box::new(body),
            ty,
        }))
    }

    fn block(&self, locals: Vec<Symbol>, body: Vec<Expression>) -> Result<Expression, TypeError> {
        let ty = body.last().map_or(Type::Void, |last| last.ty().clone());
        Ok(Expression::Block(Block { locals, body, ty }))
    }

    fn variable(&self, name: &str, ty: Type) -> Result<Symbol, TypeError> {
        if matches!(ty, Type::Void | Type::Null) {
            return Err(TypeError::InvalidVariableType(ty));
        }
        Ok(Arc::new(Variable {
            name: name.to_string(),
            ty,
        }))
    }

    fn assign(&self, target: Expression, value: Expression) -> Result<Expression, TypeError> {
        if !target.is_assignable() {
            return Err(TypeError::NotAssignable);
        }

        let ty = target.ty().clone();
        let value = coerce(value, &ty)?;

        Ok(Expression::Assign(Assign {
            target: Box::new(target),
            value: Box::new(value),
            ty,
        }))
    }

    fn convert(&self, value: Expression, ty: &Type) -> Result<Expression, TypeError> {
        coerce(value, ty)
    }
}
