//! Type names as written in source: predefined keywords, dotted and
//! generic names handed to the resolver, and array rank specifiers.

use crate::parser::combinators::{defer, one_of, optional};
use crate::parser::repetition::{many_fold, separated_by};
use crate::parser::scope::Scope;
use crate::types::Type;

use super::primitive::{identifier, keyword, symbol};
use super::{Rule, accept, scoped};

const PREDEFINED: [&str; 16] = [
    "bool", "byte", "sbyte", "char", "short", "ushort", "int", "uint", "long", "ulong", "float",
    "double", "decimal", "string", "object", "void",
];

/// predefined_type := "int" | "string" | ...
pub(super) fn predefined_type() -> Rule<Type> {
    one_of(
        PREDEFINED
            .into_iter()
            .map(|word| keyword(word).filter_map(Type::from_keyword))
            .collect(),
    )
}

/// Resolves `path` closed over `args`; a generic reference is looked up
/// by its definition name, e.g. "System.Func`2".
fn resolve_named(scope: &Scope, path: &[String], args: Vec<Type>) -> Option<Type> {
    let name = path.join(".");
    if args.is_empty() {
        return accept("type", scope.resolver().resolve(&name));
    }

    let definition = accept(
        "type",
        scope.resolver().resolve(&format!("{name}`{}", args.len())),
    )?;
    definition.instantiate(args)
}

fn type_arguments() -> Rule<Vec<Type>> {
    symbol("<") * separated_by(defer(type_name), symbol(",")) - symbol(">")
}

/// named_type := identifier ("." identifier)* type_arguments?
fn named_type() -> Rule<Type> {
    let path = separated_by(identifier(), symbol("."));
    scoped(path + optional(type_arguments()), |scope, (path, args)| {
        resolve_named(scope, &path, args.unwrap_or_default())
    })
}

/// type_name := (predefined_type | named_type) ("[" "]")*
pub fn type_name() -> Rule<Type> {
    let rank = symbol("[") - symbol("]");
    (predefined_type() | named_type())
        .bind(move |ty| many_fold(rank.clone(), ty, |ty, _| Type::array(ty)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::combinators::Parser;
    use crate::parser::Cursor;
    use crate::types::{Capabilities, DefaultBuilder, DefaultResolver, FUNC};

    fn all(text: &str) -> Vec<(Type, usize)> {
        let resolver = DefaultResolver::new().with_namespace("System");
        let scope = Scope::new(Capabilities::new(resolver, DefaultBuilder::new()));
        type_name()
            .parse(Cursor::new(text, scope))
            .map(|p| (p.value, p.tail.offset()))
            .collect()
    }

    #[test]
    fn test_predefined() {
        assert_eq!(all("int"), vec![(Type::Int, 3)]);
        assert_eq!(all("sbyte x"), vec![(Type::SByte, 6)]);
        assert!(all("integer").is_empty());
    }

    #[test]
    fn test_qualified_and_short_names() {
        assert_eq!(all("System.Int64"), vec![(Type::Long, 12)]);
        assert_eq!(all("Int64"), vec![(Type::Long, 5)]);
        assert!(all("Nowhere.Thing").is_empty());
    }

    #[test]
    fn test_generic_arguments() {
        let expected = Type::Named {
            name: format!("{FUNC}`2"),
            args: vec![Type::Int, Type::Bool],
        };
        assert_eq!(all("Func<int, bool>"), vec![(expected, 15)]);
        assert!(all("Func<int, bool, string, int, int, int, int>").is_empty());
    }

    #[test]
    fn test_nested_generics_close_with_double_angle() {
        let text = "Func<Func<int>>";
        let results = all(text);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].1, text.len());
        assert_eq!(results[0].0.to_string(), "System.Func<System.Func<int>>");
    }

    #[test]
    fn test_array_ranks() {
        assert_eq!(all("int[]"), vec![(Type::array(Type::Int), 5)]);
        assert_eq!(
            all("string[] []"),
            vec![(Type::array(Type::array(Type::String)), 11)]
        );
    }
}
