//! Type-name resolution.
//!
//! The grammar never interprets a dotted name itself. It hands the whole
//! name (with a "`N" arity suffix for generic references) to a
//! [`TypeResolver`] and treats an error as "this is not a type".

use std::collections::HashMap;

use super::error::ResolveError;
use super::ty::{ACTION, FUNC, SYSTEM_TYPE, Type};

/// Maps a dotted, possibly generic type name to a type.
pub trait TypeResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Result<Type, ResolveError>;
}

/// Resolver over a fixed table of `System` types, extended by imported
/// namespaces and explicitly registered types.
#[derive(Debug, Clone)]
pub struct DefaultResolver {
    types: HashMap<String, Type>,
    namespaces: Vec<String>,
}

pub const MATH: &str = "System.Math";

const PREDEFINED: [Type; 16] = [
    Type::Void,
    Type::Bool,
    Type::Char,
    Type::SByte,
    Type::Byte,
    Type::Short,
    Type::UShort,
    Type::Int,
    Type::UInt,
    Type::Long,
    Type::ULong,
    Type::Float,
    Type::Double,
    Type::Decimal,
    Type::String,
    Type::Object,
];

impl DefaultResolver {
    pub fn new() -> Self {
        let mut types = HashMap::new();

        for ty in PREDEFINED {
            if let Some(name) = ty.system_name() {
                types.insert(name.to_string(), ty.clone());
            }
        }

        types.insert(MATH.to_string(), Type::named(MATH));
        types.insert(SYSTEM_TYPE.to_string(), Type::named(SYSTEM_TYPE));
        types.insert(ACTION.to_string(), Type::named(ACTION));

        for arity in 1..=5 {
            let name = format!("{FUNC}`{arity}");
            types.insert(name.clone(), Type::named(name));
        }
        for arity in 1..=4 {
            let name = format!("{ACTION}`{arity}");
            types.insert(name.clone(), Type::named(name));
        }

        Self {
            types,
            namespaces: Vec::new(),
        }
    }

    /// Lets names inside `namespace` resolve without the prefix.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespaces.push(namespace.into());
        self
    }

    pub fn with_type(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.types.insert(name.into(), ty);
        self
    }
}

impl Default for DefaultResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeResolver for DefaultResolver {
    fn resolve(&self, name: &str) -> Result<Type, ResolveError> {
        if let Some(ty) = self.types.get(name) {
            return Ok(ty.clone());
        }

        self.namespaces
            .iter()
            .find_map(|namespace| self.types.get(&format!("{namespace}.{name}")))
            .cloned()
            .ok_or_else(|| ResolveError::UnknownType(name.to_string()))
    }
}
