//! Static type descriptors shared by the binder and the runtime.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    None,
    Int,
    Float,
    Size,
    Bool,
    Char,
    String,
    Vector,
    Dict,
    /// Instance of a user class; `TypeInfo::name` holds the class name
    Instance,
    /// Value of a user enum; `TypeInfo::name` holds the enum name
    Enumerator,
    /// `function<ret, args...>`
    Function,
    /// A type used as a value (`typeof(x)`, bare class or enum names)
    TypeName,
    /// Unknown until runtime. Matches every type statically.
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    pub kind: TypeKind,
    pub name: Option<String>,
    pub params: Vec<TypeInfo>,
}

impl TypeInfo {
    pub fn new(kind: TypeKind) -> Self {
        Self { kind, name: None, params: Vec::new() }
    }

    pub fn none() -> Self {
        Self::new(TypeKind::None)
    }

    pub fn int() -> Self {
        Self::new(TypeKind::Int)
    }

    pub fn float() -> Self {
        Self::new(TypeKind::Float)
    }

    pub fn size() -> Self {
        Self::new(TypeKind::Size)
    }

    pub fn bool() -> Self {
        Self::new(TypeKind::Bool)
    }

    pub fn char() -> Self {
        Self::new(TypeKind::Char)
    }

    pub fn string() -> Self {
        Self::new(TypeKind::String)
    }

    pub fn dict() -> Self {
        Self::new(TypeKind::Dict)
    }

    pub fn any() -> Self {
        Self::new(TypeKind::Any)
    }

    pub fn type_name() -> Self {
        Self::new(TypeKind::TypeName)
    }

    pub fn vector(elem: TypeInfo) -> Self {
        Self { kind: TypeKind::Vector, name: None, params: vec![elem] }
    }

    pub fn instance(class: impl Into<String>) -> Self {
        Self { kind: TypeKind::Instance, name: Some(class.into()), params: Vec::new() }
    }

    pub fn enumerator(enum_name: impl Into<String>) -> Self {
        Self { kind: TypeKind::Enumerator, name: Some(enum_name.into()), params: Vec::new() }
    }

    /// `function<ret, args...>`: the first parameter is the result type.
    pub fn function(ret: TypeInfo, args: impl IntoIterator<Item = TypeInfo>) -> Self {
        let mut params = vec![ret];
        params.extend(args);
        Self { kind: TypeKind::Function, name: None, params }
    }

    pub fn is(&self, kind: TypeKind) -> bool {
        self.kind == kind
    }

    pub fn is_any(&self) -> bool {
        self.kind == TypeKind::Any
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.kind, TypeKind::Int | TypeKind::Float | TypeKind::Size)
    }

    /// Element type of a vector, `any` for anything else.
    pub fn element(&self) -> TypeInfo {
        match (self.kind, self.params.first()) {
            (TypeKind::Vector, Some(elem)) => elem.clone(),
            _ => TypeInfo::any(),
        }
    }

    /// Result type of a function type.
    pub fn result(&self) -> TypeInfo {
        match (self.kind, self.params.first()) {
            (TypeKind::Function, Some(ret)) => ret.clone(),
            _ => TypeInfo::any(),
        }
    }

    /// Argument types of a function type.
    pub fn arguments(&self) -> &[TypeInfo] {
        match self.kind {
            TypeKind::Function if !self.params.is_empty() => &self.params[1..],
            _ => &[],
        }
    }

    /// Exact equality, except that `any` matches anything at any nesting level
    /// and a bare `function` matches every function type.
    pub fn matches(&self, other: &TypeInfo) -> bool {
        if self.is_any() || other.is_any() {
            return true;
        }
        if self.kind == TypeKind::Function
            && other.kind == TypeKind::Function
            && (self.params.is_empty() || other.params.is_empty())
        {
            return true;
        }
        self.kind == other.kind
            && self.name == other.name
            && self.params.len() == other.params.len()
            && self.params.iter().zip(&other.params).all(|(a, b)| a.matches(b))
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = match self.kind {
            TypeKind::None => "none",
            TypeKind::Int => "int",
            TypeKind::Float => "float",
            TypeKind::Size => "usize",
            TypeKind::Bool => "bool",
            TypeKind::Char => "char",
            TypeKind::String => "string",
            TypeKind::Vector => "vector",
            TypeKind::Dict => "dict",
            TypeKind::Function => "function",
            TypeKind::TypeName => "type",
            TypeKind::Any => "any",
            TypeKind::Instance | TypeKind::Enumerator => {
                return write!(f, "{}", self.name.as_deref().unwrap_or("?"));
            }
        };
        write!(f, "{}", base)?;
        if !self.params.is_empty() {
            let params: Vec<_> = self.params.iter().map(|p| p.to_string()).collect();
            write!(f, "<{}>", params.join(", "))?;
        }
        Ok(())
    }
}
