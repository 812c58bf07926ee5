use std::fmt;

/// Static type of an expression node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    Bool,
    Char,
    SByte,
    Byte,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    Float,
    Double,
    Decimal,
    String,
    Object,
    /// Type of the `null` literal before it is converted to a reference type.
    Null,
    Array(Box<Type>),
    /// A resolved named type. Generic definitions carry their arity in the
    /// name (`System.Func`2`) and are closed by filling `args`.
    Named { name: String, args: Vec<Type> },
}

pub const FUNC: &str = "System.Func";
pub const ACTION: &str = "System.Action";
pub const SYSTEM_TYPE: &str = "System.Type";

impl Type {
    pub fn array(element: Type) -> Self {
        Type::Array(Box::new(element))
    }

    pub fn named(name: impl Into<String>) -> Self {
        Type::Named {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// `System.Func<params.., ret>` or `System.Action<params..>` when `ret` is `void`.
    pub fn delegate(params: Vec<Type>, ret: Type) -> Self {
        if ret == Type::Void {
            if params.is_empty() {
                return Type::named(ACTION);
            }
            return Type::Named {
                name: format!("{ACTION}`{}", params.len()),
                args: params,
            };
        }

        let mut args = params;
        args.push(ret);
        Type::Named {
            name: format!("{FUNC}`{}", args.len()),
            args,
        }
    }

    /// Maps a predefined type keyword (`int`, `string`, ...) to its type.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let ty = match keyword {
            "bool" => Type::Bool,
            "char" => Type::Char,
            "sbyte" => Type::SByte,
            "byte" => Type::Byte,
            "short" => Type::Short,
            "ushort" => Type::UShort,
            "int" => Type::Int,
            "uint" => Type::UInt,
            "long" => Type::Long,
            "ulong" => Type::ULong,
            "float" => Type::Float,
            "double" => Type::Double,
            "decimal" => Type::Decimal,
            "string" => Type::String,
            "object" => Type::Object,
            "void" => Type::Void,
            _ => return None,
        };
        Some(ty)
    }

    /// The CLR name of a predefined type (`System.Int32` for `int`).
    pub fn system_name(&self) -> Option<&'static str> {
        let name = match self {
            Type::Void => "System.Void",
            Type::Bool => "System.Boolean",
            Type::Char => "System.Char",
            Type::SByte => "System.SByte",
            Type::Byte => "System.Byte",
            Type::Short => "System.Int16",
            Type::UShort => "System.UInt16",
            Type::Int => "System.Int32",
            Type::UInt => "System.UInt32",
            Type::Long => "System.Int64",
            Type::ULong => "System.UInt64",
            Type::Float => "System.Single",
            Type::Double => "System.Double",
            Type::Decimal => "System.Decimal",
            Type::String => "System.String",
            Type::Object => "System.Object",
            Type::Null | Type::Array(_) | Type::Named { .. } => return None,
        };
        Some(name)
    }

    /// Number of type parameters encoded in a generic definition name.
    pub fn generic_arity(&self) -> usize {
        match self {
            Type::Named { name, .. } => name
                .rsplit_once('`')
                .and_then(|(_, arity)| arity.parse().ok())
                .unwrap_or(0),
            _ => 0,
        }
    }

    /// Closes a generic definition over `args`. Returns `None` if `self` is
    /// not an open generic definition of matching arity.
    pub fn instantiate(&self, args: Vec<Type>) -> Option<Type> {
        match self {
            Type::Named { name, args: current }
                if current.is_empty() && self.generic_arity() == args.len() =>
            {
                Some(Type::Named {
                    name: name.clone(),
                    args,
                })
            }
            _ => None,
        }
    }

    /// Parameter and return types of a delegate type.
    pub fn delegate_signature(&self) -> Option<(&[Type], Type)> {
        let Type::Named { name, args } = self else {
            return None;
        };
        let base = name.split('`').next().unwrap_or(name);
        if args.len() != self.generic_arity() {
            return None;
        }
        match base {
            FUNC => args
                .split_last()
                .map(|(ret, params)| (params, ret.clone())),
            ACTION => Some((args.as_slice(), Type::Void)),
            _ => None,
        }
    }

    pub fn is_delegate(&self) -> bool {
        self.delegate_signature().is_some()
    }

    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            Type::Char
                | Type::SByte
                | Type::Byte
                | Type::Short
                | Type::UShort
                | Type::Int
                | Type::UInt
                | Type::Long
                | Type::ULong
        )
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integral() || matches!(self, Type::Float | Type::Double | Type::Decimal)
    }

    /// Types whose values may be `null`.
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Type::String | Type::Object | Type::Null | Type::Array(_) | Type::Named { .. }
        )
    }

    /// Implicit conversions between non-identical types: numeric widening,
    /// `null` to any reference type, and anything to `object`.
    pub fn converts_to(&self, target: &Type) -> bool {
        use Type::*;

        if self == target {
            return true;
        }
        if *target == Object {
            return *self != Void;
        }
        if *self == Null {
            return target.is_reference();
        }

        match self {
            SByte => matches!(target, Short | Int | Long | Float | Double | Decimal),
            Byte => matches!(
                target,
                Short | UShort | Int | UInt | Long | ULong | Float | Double | Decimal
            ),
            Short => matches!(target, Int | Long | Float | Double | Decimal),
            UShort => matches!(
                target,
                Int | UInt | Long | ULong | Float | Double | Decimal
            ),
            Char => matches!(
                target,
                UShort | Int | UInt | Long | ULong | Float | Double | Decimal
            ),
            Int => matches!(target, Long | Float | Double | Decimal),
            UInt => matches!(target, Long | ULong | Float | Double | Decimal),
            Long | ULong => matches!(target, Float | Double | Decimal),
            Float => *target == Double,
            _ => false,
        }
    }

    pub fn pretty(&self) -> String {
        match self {
            Type::Null => "null".to_string(),
            Type::Array(element) => format!("{}[]", element.pretty()),
            Type::Named { name, args } => {
                let base = name.split('`').next().unwrap_or(name);
                if args.is_empty() {
                    base.to_string()
                } else {
                    let args: Vec<String> = args.iter().map(Type::pretty).collect();
                    format!("{}<{}>", base, args.join(", "))
                }
            }
            predefined => keyword_name(predefined).to_string(),
        }
    }
}

fn keyword_name(ty: &Type) -> &'static str {
    match ty {
        Type::Void => "void",
        Type::Bool => "bool",
        Type::Char => "char",
        Type::SByte => "sbyte",
        Type::Byte => "byte",
        Type::Short => "short",
        Type::UShort => "ushort",
        Type::Int => "int",
        Type::UInt => "uint",
        Type::Long => "long",
        Type::ULong => "ulong",
        Type::Float => "float",
        Type::Double => "double",
        Type::Decimal => "decimal",
        Type::String => "string",
        Type::Object => "object",
        Type::Null | Type::Array(_) | Type::Named { .. } => "",
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.pretty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delegate_round_trip() {
        let func = Type::delegate(vec![Type::Int, Type::Int], Type::Long);
        let (params, ret) = func.delegate_signature().unwrap();
        assert_eq!(params, &[Type::Int, Type::Int]);
        assert_eq!(ret, Type::Long);
        assert_eq!(func.pretty(), "System.Func<int, int, long>");
    }

    #[test]
    fn test_action_has_void_return() {
        let action = Type::delegate(vec![Type::String], Type::Void);
        let (params, ret) = action.delegate_signature().unwrap();
        assert_eq!(params, &[Type::String]);
        assert_eq!(ret, Type::Void);
        assert_eq!(Type::delegate(vec![], Type::Void), Type::named(ACTION));
    }

    #[test]
    fn test_instantiate_checks_arity() {
        let open = Type::named("System.Func`2");
        assert_eq!(open.generic_arity(), 2);
        assert!(open.instantiate(vec![Type::Int]).is_none());
        let closed = open.instantiate(vec![Type::Int, Type::Bool]).unwrap();
        assert!(closed.is_delegate());
        assert!(closed.instantiate(vec![Type::Int, Type::Bool]).is_none());
    }

    #[test]
    fn test_numeric_widening() {
        assert!(Type::Int.converts_to(&Type::Long));
        assert!(Type::Int.converts_to(&Type::Double));
        assert!(Type::Char.converts_to(&Type::Int));
        assert!(Type::Float.converts_to(&Type::Double));
        assert!(!Type::Long.converts_to(&Type::Int));
        assert!(!Type::Double.converts_to(&Type::Decimal));
        assert!(!Type::Int.converts_to(&Type::Char));
    }

    #[test]
    fn test_reference_conversions() {
        assert!(Type::Null.converts_to(&Type::String));
        assert!(!Type::Null.converts_to(&Type::Int));
        assert!(Type::Int.converts_to(&Type::Object));
        assert!(!Type::Void.converts_to(&Type::Object));
    }

    #[test]
    fn test_pretty_print() {
        assert_eq!(Type::Int.pretty(), "int");
        assert_eq!(Type::array(Type::String).pretty(), "string[]");
        assert_eq!(Type::named("System.Math").to_string(), "System.Math");
    }
}
