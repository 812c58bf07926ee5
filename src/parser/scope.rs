//! Lexical scope threaded through the cursor.

use std::fmt;
use std::sync::Arc;

use crate::ast::Symbol;
use crate::collections::{PersistentMap, PersistentStack};
use crate::types::{Capabilities, NodeBuilder, Type, TypeResolver};

/// Immutable scope state of a parse.
///
/// `symbols` holds everything visible by name. `locals` holds only the
/// variables declared in the innermost block or lambda, newest first.
/// Every update returns a new scope.
#[derive(Clone)]
pub struct Scope {
    expected: Option<Arc<Type>>,
    capabilities: Arc<Capabilities>,
    symbols: PersistentMap<String, Symbol>,
    locals: PersistentStack<Symbol>,
}

impl Scope {
    pub fn new(capabilities: Capabilities) -> Self {
        Self {
            expected: None,
            capabilities: Arc::new(capabilities),
            symbols: PersistentMap::new(),
            locals: PersistentStack::new(),
        }
    }

    pub fn capabilities(&self) -> &Arc<Capabilities> {
        &self.capabilities
    }

    pub fn resolver(&self) -> &dyn TypeResolver {
        self.capabilities.resolver.as_ref()
    }

    pub fn builder(&self) -> &dyn NodeBuilder {
        self.capabilities.builder.as_ref()
    }

    /// The type the surrounding context asks for, if any.
    pub fn expected(&self) -> Option<&Type> {
        self.expected.as_deref()
    }

    pub fn with_expected(&self, expected: Option<Type>) -> Self {
        Self {
            expected: expected.map(Arc::new),
            ..self.clone()
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    /// Makes `symbol` visible by name without recording it as a local.
    pub fn with_symbol(&self, symbol: Symbol) -> Self {
        Self {
            symbols: self.symbols.insert_or_replace(symbol.name.clone(), symbol),
            ..self.clone()
        }
    }

    /// Declares a local, shadowing any outer symbol of the same name.
    ///
    /// Returns `None` if the current block already declares the name.
    pub fn declare(&self, symbol: Symbol) -> Option<Self> {
        if self.locals.iter().any(|local| local.name == symbol.name) {
            return None;
        }

        Some(Self {
            symbols: self.symbols.insert_or_replace(symbol.name.clone(), symbol.clone()),
            locals: self.locals.push(symbol),
            ..self.clone()
        })
    }

    /// Starts a new block: same visible symbols, no locals, no expected type.
    pub fn enter_block(&self) -> Self {
        Self {
            expected: None,
            capabilities: Arc::clone(&self.capabilities),
            symbols: self.symbols.clone(),
            locals: PersistentStack::new(),
        }
    }

    /// Starts a lambda body with `params` as its only locals.
    ///
    /// Returns `None` if two parameters share a name.
    pub fn enter_lambda(&self, params: &[Symbol], ret: Option<Type>) -> Option<Self> {
        params
            .iter()
            .try_fold(self.enter_block(), |scope, param| scope.declare(Arc::clone(param)))
            .map(|scope| scope.with_expected(ret))
    }

    /// Locals of the current block in declaration order.
    pub fn locals(&self) -> Vec<Symbol> {
        self.locals.to_vec_in_push_order()
    }
}

impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.capabilities, &other.capabilities)
            && self.expected == other.expected
            && self.symbols == other.symbols
            && self.locals == other.locals
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("expected", &self.expected)
            .field("symbols", &self.symbols)
            .field("locals", &self.locals)
            .finish_non_exhaustive()
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new(Capabilities::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Variable;

    fn symbol(name: &str, ty: Type) -> Symbol {
        Arc::new(Variable {
            name: name.to_string(),
            ty,
        })
    }

    #[test]
    fn test_declare_records_local() {
        let x = symbol("x", Type::Int);
        let scope = Scope::default().declare(x.clone()).unwrap();

        assert!(Arc::ptr_eq(scope.lookup("x").unwrap(), &x));
        assert_eq!(scope.locals().len(), 1);
    }

    #[test]
    fn test_redeclare_in_same_block_fails() {
        let scope = Scope::default()
            .declare(symbol("x", Type::Int))
            .unwrap();
        assert!(scope.declare(symbol("x", Type::Long)).is_none());
    }

    #[test]
    fn test_inner_block_shadows() {
        let outer = Scope::default()
            .declare(symbol("x", Type::Int))
            .unwrap();
        let inner = outer.enter_block().declare(symbol("x", Type::Long)).unwrap();

        assert_eq!(inner.lookup("x").unwrap().ty, Type::Long);
        assert_eq!(outer.lookup("x").unwrap().ty, Type::Int);
        assert_eq!(inner.locals().len(), 1);
    }

    #[test]
    fn test_locals_in_declaration_order() {
        let scope = Scope::default()
            .declare(symbol("a", Type::Int))
            .and_then(|s| s.declare(symbol("b", Type::Int)))
            .and_then(|s| s.declare(symbol("c", Type::Int)))
            .unwrap();

        let names: Vec<_> = scope.locals().iter().map(|s| s.name.clone()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_enter_lambda() {
        let outer = Scope::default()
            .declare(symbol("y", Type::Int))
            .unwrap()
            .with_expected(Some(Type::Bool));
        let x = symbol("x", Type::Int);

        let body = outer.enter_lambda(&[x.clone()], Some(Type::Long)).unwrap();
        assert!(Arc::ptr_eq(body.lookup("x").unwrap(), &x));
        assert!(body.lookup("y").is_some());
        assert_eq!(body.locals(), vec![x.clone()]);
        assert_eq!(body.expected(), Some(&Type::Long));

        assert!(outer.enter_lambda(&[x.clone(), x], None).is_none());
    }

    #[test]
    fn test_with_symbol_is_not_local() {
        let scope = Scope::default().with_symbol(symbol("host", Type::String));
        assert!(scope.lookup("host").is_some());
        assert!(scope.locals().is_empty());
    }
}
