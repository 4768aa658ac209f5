use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use fire_ast::{BuiltinId, ClassId, FuncId, TypeInfo, TypeKind};

use crate::Frame;

/// A runtime value.
///
/// Vectors, dicts and instances have reference semantics: copies share storage.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Int(i64),
    Float(f64),
    Size(u64),
    Bool(bool),
    Char(char),
    String(String),
    Vector(Rc<RefCell<Vec<Value>>>),
    Dict(Rc<RefCell<Vec<(Value, Value)>>>),
    Instance(Rc<Instance>),
    Callable(Callable),
    Type(TypeInfo),
    Enumerator(Rc<EnumeratorValue>),
}

/// Name and field names of a class, shared by all of its instances.
#[derive(Debug)]
pub struct ClassLayout {
    pub name: String,
    pub fields: Vec<String>,
}

#[derive(Debug)]
pub struct Instance {
    pub class: ClassId,
    pub layout: Rc<ClassLayout>,
    pub fields: RefCell<Vec<Value>>,
    /// Frame of the scope the class was declared in; member functions run under it
    pub env: Frame,
}

#[derive(Debug, Clone)]
pub enum Callable {
    Function { func: FuncId, name: Rc<str>, env: Frame },
    Method { func: FuncId, name: Rc<str>, receiver: Rc<Instance> },
    Builtin { id: BuiltinId, name: &'static str },
    /// Member function of a builtin type, bound to its object
    BuiltinMethod { id: BuiltinId, name: &'static str, receiver: Box<Value> },
}

#[derive(Debug, PartialEq, Eq)]
pub struct EnumeratorValue {
    pub enum_name: String,
    pub name: String,
    pub index: usize,
}

impl Value {
    pub fn vector(items: Vec<Value>) -> Self {
        Value::Vector(Rc::new(RefCell::new(items)))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// Zero value for a declared but uninitialized variable.
    pub fn default_for(ty: &TypeInfo) -> Self {
        match ty.kind {
            TypeKind::Int => Value::Int(0),
            TypeKind::Float => Value::Float(0.0),
            TypeKind::Size => Value::Size(0),
            TypeKind::Bool => Value::Bool(false),
            TypeKind::Char => Value::Char('\0'),
            TypeKind::String => Value::String(String::new()),
            TypeKind::Vector => Value::vector(Vec::new()),
            TypeKind::Dict => Value::Dict(Rc::new(RefCell::new(Vec::new()))),
            _ => Value::None,
        }
    }

    /// Runtime type of this value.
    ///
    /// A vector reports the type of its first element, `vector<any>` when empty.
    pub fn type_info(&self) -> TypeInfo {
        match self {
            Value::None => TypeInfo::none(),
            Value::Int(_) => TypeInfo::int(),
            Value::Float(_) => TypeInfo::float(),
            Value::Size(_) => TypeInfo::size(),
            Value::Bool(_) => TypeInfo::bool(),
            Value::Char(_) => TypeInfo::char(),
            Value::String(_) => TypeInfo::string(),
            Value::Vector(items) => {
                let elem = items.borrow().first().map(Value::type_info).unwrap_or_else(TypeInfo::any);
                TypeInfo::vector(elem)
            }
            Value::Dict(_) => TypeInfo::dict(),
            Value::Instance(inst) => TypeInfo::instance(inst.layout.name.clone()),
            Value::Callable(_) => TypeInfo::new(TypeKind::Function),
            Value::Type(_) => TypeInfo::type_name(),
            Value::Enumerator(e) => TypeInfo::enumerator(e.enum_name.clone()),
        }
    }

    /// Whether this value may be stored where `ty` is declared. Every element
    /// of a vector must conform to the element type.
    pub fn conforms_to(&self, ty: &TypeInfo) -> bool {
        match (self, ty.kind) {
            (_, TypeKind::Any) => true,
            // Callables carry no signature at runtime
            (Value::Callable(_), TypeKind::Function) => true,
            (Value::Vector(items), TypeKind::Vector) => {
                let elem = ty.element();
                items.borrow().iter().all(|item| item.conforms_to(&elem))
            }
            _ => ty.matches(&self.type_info()),
        }
    }

    pub fn type_name(&self) -> String {
        self.type_info().to_string()
    }

    /// Truth value of a `&&` or `||` operand: zero, empty and `none` are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Size(n) => *n != 0,
            Value::Char(c) => *c != '\0',
            Value::String(s) => !s.is_empty(),
            Value::Vector(items) => !items.borrow().is_empty(),
            Value::Dict(entries) => !entries.borrow().is_empty(),
            Value::Instance(_) | Value::Callable(_) | Value::Type(_) | Value::Enumerator(_) => true,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Structural equality for primitives and vectors, identity for instances.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Size(a), Value::Size(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Vector(a), Value::Vector(b)) => {
                Rc::ptr_eq(a, b) || {
                    let (a, b) = (a.borrow(), b.borrow());
                    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
                }
            }
            (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Type(a), Value::Type(b)) => a == b,
            (Value::Enumerator(a), Value::Enumerator(b)) => a == b,
            (Value::Callable(a), Value::Callable(b)) => match (a, b) {
                (Callable::Function { func: f, env: e1, .. }, Callable::Function { func: g, env: e2, .. }) => {
                    f == g && e1.ptr_eq(e2)
                }
                (Callable::Method { func: f, receiver: r1, .. }, Callable::Method { func: g, receiver: r2, .. }) => {
                    f == g && Rc::ptr_eq(r1, r2)
                }
                (Callable::Builtin { id: a, .. }, Callable::Builtin { id: b, .. }) => a == b,
                (
                    Callable::BuiltinMethod { id: a, receiver: r1, .. },
                    Callable::BuiltinMethod { id: b, receiver: r2, .. },
                ) => a == b && r1 == r2,
                _ => false,
            },
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.equals(other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "none"),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{:?}", n),
            Value::Size(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Char(c) => write!(f, "{}", c),
            Value::String(s) => write!(f, "{}", s),
            Value::Vector(items) => {
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write_nested(f, item)?;
                }
                write!(f, "]")
            }
            Value::Dict(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write_nested(f, k)?;
                    write!(f, ": ")?;
                    write_nested(f, v)?;
                }
                write!(f, "}}")
            }
            Value::Instance(inst) => {
                write!(f, "{} {{", inst.layout.name)?;
                for (i, (name, value)) in inst.layout.fields.iter().zip(inst.fields.borrow().iter()).enumerate() {
                    write!(f, "{}{}: ", if i > 0 { ", " } else { " " }, name)?;
                    write_nested(f, value)?;
                }
                write!(f, " }}")
            }
            Value::Callable(Callable::Function { name, .. }) => write!(f, "<function {}>", name),
            Value::Callable(Callable::Method { name, receiver, .. }) => {
                write!(f, "<method {}.{}>", receiver.layout.name, name)
            }
            Value::Callable(Callable::Builtin { name, .. }) => write!(f, "<builtin {}>", name),
            Value::Callable(Callable::BuiltinMethod { name, receiver, .. }) => {
                write!(f, "<builtin method {}.{}>", receiver.type_name(), name)
            }
            Value::Type(ty) => write!(f, "<type {}>", ty),
            Value::Enumerator(e) => write!(f, "{}::{}", e.enum_name, e.name),
        }
    }
}

/// Strings and chars inside containers print quoted.
fn write_nested(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::String(s) => write!(f, "{:?}", s),
        Value::Char(c) => write!(f, "{:?}", c),
        other => write!(f, "{}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display() {
        let v = Value::vector(vec![Value::Int(1), Value::string("a"), Value::Char('b')]);
        assert_eq!(v.to_string(), r#"[1, "a", 'b']"#);
        assert_eq!(Value::Float(3.0).to_string(), "3.0");
        assert_eq!(Value::None.to_string(), "none");
    }

    #[test]
    fn test_vector_type_follows_first_element() {
        assert_eq!(Value::vector(vec![]).type_info(), TypeInfo::vector(TypeInfo::any()));
        assert_eq!(
            Value::vector(vec![Value::string("x")]).type_info(),
            TypeInfo::vector(TypeInfo::string())
        );
    }

    #[test]
    fn test_conforms_to() {
        assert!(Value::Int(1).conforms_to(&TypeInfo::int()));
        assert!(!Value::Int(1).conforms_to(&TypeInfo::float()));
        assert!(Value::vector(vec![]).conforms_to(&TypeInfo::vector(TypeInfo::int())));
        assert!(Value::string("s").conforms_to(&TypeInfo::any()));
    }

    #[test]
    fn test_vector_conformance_checks_every_element() {
        let ints = TypeInfo::vector(TypeInfo::int());
        assert!(Value::vector(vec![Value::Int(1), Value::Int(2)]).conforms_to(&ints));
        assert!(!Value::vector(vec![Value::Int(1), Value::string("s")]).conforms_to(&ints));
        assert!(Value::vector(vec![Value::Int(1), Value::string("s")]).conforms_to(&TypeInfo::vector(TypeInfo::any())));
        let nested = Value::vector(vec![Value::vector(vec![Value::Int(1)]), Value::vector(vec![Value::Char('c')])]);
        assert!(!nested.conforms_to(&TypeInfo::vector(ints)));
    }

    #[test]
    fn test_vectors_share_storage() {
        let a = Value::vector(vec![Value::Int(1)]);
        let b = a.clone();
        if let Value::Vector(items) = &b {
            items.borrow_mut().push(Value::Int(2));
        }
        assert_eq!(a, Value::vector(vec![Value::Int(1), Value::Int(2)]));
    }

    #[test]
    fn test_default_values() {
        assert_eq!(Value::default_for(&TypeInfo::int()), Value::Int(0));
        assert_eq!(Value::default_for(&TypeInfo::string()), Value::string(""));
        assert_eq!(Value::default_for(&TypeInfo::instance("P")), Value::None);
    }
}
