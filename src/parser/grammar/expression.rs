//! Expression parsers
//!
//! Precedence is encoded by call order, loosest first:
//!
//! ```text
//! conditional -> ?? -> || -> && -> | -> ^ -> & -> equality -> relational
//!   -> shift -> additive -> multiplicative -> unary -> postfix -> primary
//! ```
//!
//! Every recognized construct goes through the scope's builder; a builder
//! error makes that alternative yield nothing.

use std::rc::Rc;
use std::sync::Arc;

use crate::ast::{BinaryOperator, Expression, Symbol, UnaryOperator};
use crate::parser::combinators::{
    defer, fail, get_state, one_of, optional, pure, set_state, with_state,
};
use crate::parser::repetition::{BinaryFn, UnaryFn, chain_left, chain_right, postfix, separated_by};
use crate::parser::scope::Scope;
use crate::types::Type;

use super::literal::literal;
use super::primitive::{identifier, keyword, operator, symbol};
use super::statement::block;
use super::types::{predefined_type, type_name};
use super::{Rule, accept, scoped};

/// expression := non_assignment (not followed by "=>") | lambda
pub fn expression() -> Rule<Expression> {
    defer(|| non_assignment().not_followed_by(symbol("=>")) | lambda())
}

/// non_assignment := conditional
pub fn non_assignment() -> Rule<Expression> {
    conditional()
}

/// Parses `rule` with no expected type, restoring the outer one after.
fn unhinted(rule: Rule<Expression>) -> Rule<Expression> {
    with_state(|scope: &Scope| scope.with_expected(None), rule)
}

/// Parses `rule` expecting `ty`, restoring the outer expectation after.
pub(super) fn expecting(ty: Type, rule: Rule<Expression>) -> Rule<Expression> {
    with_state(move |scope: &Scope| scope.with_expected(Some(ty.clone())), rule)
}

/// conditional := coalescing ("?" expression ":" expression)?
fn conditional() -> Rule<Expression> {
    let branches = operator("?", &['?']) * expression() - symbol(":") + expression();

    coalescing().bind(move |condition: Expression| {
        let otherwise = pure(condition.clone());
        let chosen = scoped(branches.clone(), move |scope, (then_expr, else_expr)| {
            accept(
                "conditional",
                scope.builder().conditional(condition.clone(), then_expr, else_expr),
            )
        });
        chosen | otherwise
    })
}

/// A binary operator token mapped to the builder call for it.
fn binary(
    text: &'static str,
    not_before: &'static [char],
    op: BinaryOperator,
) -> Rule<BinaryFn<Expression>> {
    scoped(operator(text, not_before), move |scope, _| {
        let capabilities = Arc::clone(scope.capabilities());
        let apply: BinaryFn<Expression> = Rc::new(move |left: Expression, right: Expression| {
            accept(op.symbol(), capabilities.builder.binary(op, left, right))
        });
        Some(apply)
    })
}

fn level(
    operand: Rule<Expression>,
    operators: Vec<Rule<BinaryFn<Expression>>>,
) -> Rule<Expression> {
    chain_left(operand, one_of(operators))
}

/// coalescing := logical_or ("??" coalescing)?
fn coalescing() -> Rule<Expression> {
    chain_right(logical_or(), binary("??", &['='], BinaryOperator::Coalesce))
}

fn logical_or() -> Rule<Expression> {
    level(logical_and(), vec![binary("||", &[], BinaryOperator::OrElse)])
}

fn logical_and() -> Rule<Expression> {
    level(bitwise_or(), vec![binary("&&", &[], BinaryOperator::AndAlso)])
}

fn bitwise_or() -> Rule<Expression> {
    level(
        exclusive_or(),
        vec![binary("|", &['|', '='], BinaryOperator::Or)],
    )
}

fn exclusive_or() -> Rule<Expression> {
    level(
        bitwise_and(),
        vec![binary("^", &['='], BinaryOperator::ExclusiveOr)],
    )
}

fn bitwise_and() -> Rule<Expression> {
    level(equality(), vec![binary("&", &['&', '='], BinaryOperator::And)])
}

fn equality() -> Rule<Expression> {
    level(
        relational(),
        vec![
            binary("==", &[], BinaryOperator::Equal),
            binary("!=", &[], BinaryOperator::NotEqual),
        ],
    )
}

fn relational() -> Rule<Expression> {
    level(
        shift(),
        vec![
            binary("<=", &[], BinaryOperator::LessThanOrEqual),
            binary(">=", &[], BinaryOperator::GreaterThanOrEqual),
            binary("<", &['<', '='], BinaryOperator::LessThan),
            binary(">", &['>', '='], BinaryOperator::GreaterThan),
        ],
    )
}

fn shift() -> Rule<Expression> {
    level(
        additive(),
        vec![
            binary("<<", &['='], BinaryOperator::LeftShift),
            binary(">>", &['='], BinaryOperator::RightShift),
        ],
    )
}

fn additive() -> Rule<Expression> {
    level(
        multiplicative(),
        vec![
            binary("+", &['+', '='], BinaryOperator::Add),
            binary("-", &['-', '='], BinaryOperator::Subtract),
        ],
    )
}

fn multiplicative() -> Rule<Expression> {
    level(
        unary(),
        vec![
            binary("*", &['='], BinaryOperator::Multiply),
            binary("/", &['='], BinaryOperator::Divide),
            binary("%", &['='], BinaryOperator::Modulo),
        ],
    )
}

/// unary := ("++" | "--" | "-" | "+" | "!" | "~") unary | postfix_expression
fn unary() -> Rule<Expression> {
    let prefix = one_of(vec![
        operator("++", &[]).map(|_| UnaryOperator::PreIncrement),
        operator("--", &[]).map(|_| UnaryOperator::PreDecrement),
        operator("-", &['=']).map(|_| UnaryOperator::Negate),
        operator("+", &['=']).map(|_| UnaryOperator::Plus),
        operator("!", &['=']).map(|_| UnaryOperator::Not),
        operator("~", &[]).map(|_| UnaryOperator::Complement),
    ]);

    let applied = scoped(prefix + defer(unary), |scope, (op, operand)| {
        accept(op.symbol(), scope.builder().unary(op, operand))
    });

    applied | postfix(primary(), suffix())
}

/// A suffix mapped to the builder call that applies it to its target.
fn applying<T, F>(rule: Rule<T>, apply: F) -> Rule<UnaryFn<Expression>>
where
    T: Clone + 'static,
    F: Fn(&Scope, Expression, T) -> Option<Expression> + 'static,
{
    let apply = Rc::new(apply);
    scoped(rule, move |scope, value| {
        let scope = scope.clone();
        let apply = Rc::clone(&apply);
        let suffix: UnaryFn<Expression> =
            Rc::new(move |target: Expression| apply(&scope, target, value.clone()));
        Some(suffix)
    })
}

/// `open (expression ("," expression)*)? close`, each argument parsed
/// without an expected type.
fn arguments(open: &'static str, close: &'static str) -> Rule<Vec<Expression>> {
    let list = separated_by(unhinted(expression()), symbol(","));
    symbol(open) * optional(list).map(Option::unwrap_or_default) - symbol(close)
}

/// suffix := "." identifier arguments? | "[" arguments "]" | arguments | "++" | "--"
fn suffix() -> Rule<UnaryFn<Expression>> {
    let member = applying(
        symbol(".") * identifier() + optional(arguments("(", ")")),
        |scope, target, (name, args)| match args {
            Some(args) => accept("call", scope.builder().call(target, &name, args)),
            None => accept("member", scope.builder().member(target, &name)),
        },
    );

    let index = applying(arguments("[", "]"), |scope, target, args| {
        accept("index", scope.builder().index(target, args))
    });

    let invoke = applying(arguments("(", ")"), |scope, target, args| {
        accept("invoke", scope.builder().invoke(target, args))
    });

    let increment = one_of(vec![
        operator("++", &[]).map(|_| UnaryOperator::PostIncrement),
        operator("--", &[]).map(|_| UnaryOperator::PostDecrement),
    ]);
    let increment = applying(increment, |scope, target, op| {
        accept(op.symbol(), scope.builder().unary(op, target))
    });

    one_of(vec![member, index, invoke, increment])
}

/// primary := literal | variable | static_access | "(" expression ")"
///          | typeof | default | new_array
fn primary() -> Rule<Expression> {
    let constant = scoped(literal(), |scope, value| Some(scope.builder().literal(value)));
    let parenthesized = symbol("(") * expression() - symbol(")");

    one_of(vec![
        constant,
        variable(),
        static_access(),
        parenthesized,
        type_of(),
        default_value(),
        new_array(),
    ])
}

/// A declared variable or parameter; fails for unknown names.
fn variable() -> Rule<Expression> {
    scoped(identifier(), |scope, name| {
        scope.lookup(&name).cloned().map(Expression::Variable)
    })
}

/// static_access := (predefined_type "." | qualified_prefix ".") members arguments?
///
/// Without a keyword owner, the longest dotted prefix the resolver knows is
/// the type. The first remaining segment is a static member, any further
/// ones are instance members, and an argument list turns the last segment
/// into a call.
fn static_access() -> Rule<Expression> {
    let members = || separated_by(identifier(), symbol("."));
    let keyword_owner = (predefined_type() - symbol(".") + members())
        .map(|(owner, path)| (Some(owner), path));
    let named_owner = members().map(|path| (None, path));

    let access = (keyword_owner | named_owner) + optional(arguments("(", ")"));
    scoped(access, |scope, ((owner, path), args)| {
        resolve_static(scope, owner, &path, args)
    })
}

fn resolve_static(
    scope: &Scope,
    owner: Option<Type>,
    path: &[String],
    mut args: Option<Vec<Expression>>,
) -> Option<Expression> {
    let (owner, members) = match owner {
        Some(owner) => (owner, path),
        None => (1..path.len()).rev().find_map(|split| {
            let owner = scope.resolver().resolve(&path[..split].join(".")).ok()?;
            Some((owner, &path[split..]))
        })?,
    };

    let builder = scope.builder();
    let last = members.len().checked_sub(1)?;
    let mut value: Option<Expression> = None;

    for (i, name) in members.iter().enumerate() {
        let call = if i == last { args.take() } else { None };
        let built = match (value, call) {
            (None, None) => builder.static_member(&owner, name),
            (None, Some(args)) => builder.static_call(&owner, name, args),
            (Some(target), None) => builder.member(target, name),
            (Some(target), Some(args)) => builder.call(target, name, args),
        };
        value = Some(accept("static access", built)?);
    }

    value
}

fn parenthesized_type(word: &'static str) -> Rule<Type> {
    keyword(word) * symbol("(") * type_name() - symbol(")")
}

/// typeof := "typeof" "(" type_name ")"
fn type_of() -> Rule<Expression> {
    scoped(parenthesized_type("typeof"), |scope, ty| {
        accept("typeof", scope.builder().type_of(ty))
    })
}

/// default := "default" "(" type_name ")"
fn default_value() -> Rule<Expression> {
    scoped(parenthesized_type("default"), |scope, ty| {
        accept("default", scope.builder().default_value(ty))
    })
}

/// new_array := "new" type_name ("{" (expression ("," expression)* ","?)? "}")?
///
/// The type must be an array type; items are parsed expecting its element
/// type.
fn new_array() -> Rule<Expression> {
    let element = keyword("new")
        * type_name().filter_map(|ty| match ty {
            Type::Array(element) => Some(*element),
            _ => None,
        });

    element.bind(|element: Type| {
        let items = separated_by(expecting(element.clone(), expression()), symbol(","));
        let initializer = symbol("{") * optional(items).map(Option::unwrap_or_default)
            - optional(symbol(","))
            - symbol("}");

        scoped(optional(initializer), move |scope, items| {
            accept(
                "array",
                scope
                    .builder()
                    .new_array(element.clone(), items.unwrap_or_default()),
            )
        })
    })
}

/// The return type a lambda with `params` should produce, if the expected
/// type is a delegate taking exactly those parameter types.
fn expected_return(expected: Option<&Type>, params: &[Symbol]) -> Option<Type> {
    let (types, ret) = expected?.delegate_signature()?;
    let matches = types.len() == params.len()
        && types.iter().zip(params).all(|(ty, param)| *ty == param.ty);
    matches.then_some(ret)
}

/// explicit_parameters := "(" (type_name identifier ("," type_name identifier)*)? ")"
fn explicit_parameters() -> Rule<Vec<Symbol>> {
    let list = separated_by(type_name() + identifier(), symbol(","));
    let declared = symbol("(") * optional(list).map(Option::unwrap_or_default) - symbol(")");

    scoped(declared, |scope, params| {
        params
            .into_iter()
            .map(|(ty, name)| accept("parameter", scope.builder().variable(&name, ty)))
            .collect()
    })
}

/// implicit_parameters := identifier | "(" identifier ("," identifier)* ")"
///
/// Parameter types come from the expected delegate type, whose arity must
/// match.
fn implicit_parameters() -> Rule<Vec<Symbol>> {
    let single = identifier().map(|name| vec![name]);
    let list = symbol("(") * separated_by(identifier(), symbol(",")) - symbol(")");

    scoped(single | list, |scope, names| {
        let (types, _) = scope.expected()?.delegate_signature()?;
        if types.len() != names.len() {
            return None;
        }
        names
            .iter()
            .zip(types)
            .map(|(name, ty)| accept("parameter", scope.builder().variable(name, ty.clone())))
            .collect()
    })
}

/// lambda := (explicit_parameters | implicit_parameters) "=>" (block | expression)
///
/// The body sees the parameters as the only locals of a fresh block and
/// expects the delegate's return type when the outer context names one.
pub fn lambda() -> Rule<Expression> {
    let params = explicit_parameters() | implicit_parameters();
    let body = defer(|| block() | expression());

    (params - symbol("=>") + get_state()).bind(move |(params, outer): (Vec<Symbol>, Scope)| {
        let ret = expected_return(outer.expected(), &params);
        let Some(inner) = outer.enter_lambda(&params, ret) else {
            return fail();
        };

        let restore = set_state(outer.clone());
        (set_state(inner) * body.clone() - restore).filter_map(move |body| {
            accept(
                "lambda",
                outer.builder().lambda(outer.expected(), params.clone(), body),
            )
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::combinators::parse;
    use crate::parser::grammar::expression_unit;
    use crate::types::{Capabilities, DefaultBuilder, DefaultResolver};

    fn scope() -> Scope {
        let resolver = DefaultResolver::new().with_namespace("System");
        Scope::new(Capabilities::new(resolver, DefaultBuilder::new()))
    }

    fn typed(text: &str) -> Option<Type> {
        parse(&expression_unit(), text, scope())
            .ok()
            .map(|parsed| parsed.value.ty().clone())
    }

    #[test]
    fn test_arithmetic_promotion() {
        assert_eq!(typed("1 + 2"), Some(Type::Int));
        assert_eq!(typed("1 + 2L"), Some(Type::Long));
        assert_eq!(typed("1 * 2.5"), Some(Type::Double));
        assert_eq!(typed("1 < 2 && true"), Some(Type::Bool));
    }

    #[test]
    fn test_type_errors_fail_the_parse() {
        assert_eq!(typed("1 + true"), None);
        assert_eq!(typed("!1"), None);
        assert_eq!(typed("1.5 + 2m"), None);
    }

    #[test]
    fn test_conditional() {
        assert_eq!(typed("true ? 1 : 2L"), Some(Type::Long));
        assert_eq!(typed("1 > 2 ? \"a\" : null"), Some(Type::String));
        assert_eq!(typed("1 ? 2 : 3"), None);
    }

    #[test]
    fn test_static_access() {
        assert_eq!(typed("Math.Max(1, 2)"), Some(Type::Int));
        assert_eq!(typed("System.Math.PI"), Some(Type::Double));
        assert_eq!(typed("int.MaxValue"), Some(Type::Int));
        assert_eq!(typed("string.IsNullOrEmpty(\"\")"), Some(Type::Bool));
        assert_eq!(typed("Math.Nope"), None);
    }

    #[test]
    fn test_member_chain() {
        assert_eq!(typed("\"abc\".Substring(1).Length"), Some(Type::Int));
        assert_eq!(typed("Math.PI.ToString()"), Some(Type::String));
    }

    #[test]
    fn test_typeof_and_default() {
        assert_eq!(typed("typeof(int)"), Some(Type::named(crate::types::SYSTEM_TYPE)));
        assert_eq!(typed("default(long)"), Some(Type::Long));
    }

    #[test]
    fn test_new_array() {
        assert_eq!(typed("new int[] { 1, 2, 3 }"), Some(Type::array(Type::Int)));
        assert_eq!(typed("new long[] { 1, 2, }"), Some(Type::array(Type::Long)));
        assert_eq!(typed("new string[]"), Some(Type::array(Type::String)));
        assert_eq!(typed("new int[] { 1, \"x\" }"), None);
        assert_eq!(typed("new int { 1 }"), None);
    }

    #[test]
    fn test_explicit_lambda_type() {
        assert_eq!(
            typed("(int x, int y) => x + y"),
            Some(Type::delegate(vec![Type::Int, Type::Int], Type::Int))
        );
        assert_eq!(typed("() => 1"), Some(Type::delegate(vec![], Type::Int)));
    }

    #[test]
    fn test_implicit_lambda_needs_expected_type() {
        assert_eq!(typed("x => x"), None);

        let func = Type::delegate(vec![Type::Int], Type::Long);
        let scope = scope().with_expected(Some(func.clone()));
        let parsed = parse(&expression_unit(), "x => x * 2", scope).unwrap();
        assert_eq!(parsed.value.ty(), &func);
    }

    #[test]
    fn test_unknown_identifier_fails() {
        assert_eq!(typed("x + y"), None);
    }
}
