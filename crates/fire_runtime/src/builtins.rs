use std::cell::RefCell;
use std::rc::Rc;

use fire_ast::{BuiltinId, TypeInfo, TypeKind};
use fire_lexer::Span;
use rustc_hash::FxHashMap;

use crate::{Output, RuntimeError, RuntimeErrorKind, Value};

/// Call-site information handed to every builtin.
pub struct CallContext<'a> {
    pub span: Span,
    pub output: &'a mut Output,
}

pub type BuiltinFn = fn(&mut CallContext<'_>, Vec<Value>) -> Result<Value, RuntimeError>;

#[derive(Debug, Clone)]
pub enum BuiltinParams {
    /// Any number of arguments of any type
    Variadic,
    /// Exactly these parameter types
    Exact(Vec<TypeInfo>),
}

/// How a member of a builtin type is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// Read as a value: `s.length`
    Variable,
    /// Called; the object is passed as the first argument
    Function,
}

pub struct Builtin {
    pub name: &'static str,
    pub params: BuiltinParams,
    pub ret: TypeInfo,
    pub func: BuiltinFn,
}

/// Registry of builtin functions, consulted by name after all user symbols,
/// and of the members of builtin types.
pub struct BuiltinTable {
    entries: Vec<Builtin>,
    by_name: FxHashMap<&'static str, BuiltinId>,
    members: FxHashMap<&'static str, Vec<(TypeKind, MemberKind, BuiltinId)>>,
}

impl Default for BuiltinTable {
    fn default() -> Self {
        Self::new()
    }
}

impl BuiltinTable {
    pub fn empty() -> Self {
        Self { entries: Vec::new(), by_name: FxHashMap::default(), members: FxHashMap::default() }
    }

    /// The standard builtins.
    pub fn new() -> Self {
        let mut table = Self::empty();
        let any = TypeInfo::any;
        table.register("print", BuiltinParams::Variadic, TypeInfo::none(), builtin_print);
        table.register("println", BuiltinParams::Variadic, TypeInfo::none(), builtin_println);
        table.register("len", BuiltinParams::Exact(vec![any()]), TypeInfo::int(), builtin_len);
        table.register(
            "push",
            BuiltinParams::Exact(vec![TypeInfo::vector(any()), any()]),
            TypeInfo::none(),
            builtin_push,
        );
        table.register("pop", BuiltinParams::Exact(vec![TypeInfo::vector(any())]), any(), builtin_pop);
        table.register("to_string", BuiltinParams::Exact(vec![any()]), TypeInfo::string(), builtin_to_string);
        table.register("to_int", BuiltinParams::Exact(vec![any()]), TypeInfo::int(), builtin_to_int);
        table.register("to_float", BuiltinParams::Exact(vec![any()]), TypeInfo::float(), builtin_to_float);
        table.register("typeof", BuiltinParams::Exact(vec![any()]), TypeInfo::type_name(), builtin_typeof);
        table.register("dict", BuiltinParams::Exact(vec![]), TypeInfo::dict(), builtin_dict);
        table.register("assert", BuiltinParams::Exact(vec![TypeInfo::bool()]), TypeInfo::none(), builtin_assert);

        // Member parameters exclude the receiver
        let function = MemberKind::Function;
        table.register_member(TypeKind::Vector, "push", function, vec![any()], TypeInfo::none(), builtin_push);
        table.register_member(TypeKind::Vector, "pop", function, vec![], any(), builtin_pop);
        for owner in [TypeKind::Vector, TypeKind::String, TypeKind::Dict] {
            table.register_member(owner, "length", MemberKind::Variable, vec![], TypeInfo::int(), builtin_len);
        }
        table
    }

    pub fn register(&mut self, name: &'static str, params: BuiltinParams, ret: TypeInfo, func: BuiltinFn) -> BuiltinId {
        let id = BuiltinId(self.entries.len() as u32);
        self.entries.push(Builtin { name, params, ret, func });
        self.by_name.insert(name, id);
        id
    }

    /// Register a member of values of kind `owner`. Members are not visible
    /// as free functions.
    pub fn register_member(
        &mut self,
        owner: TypeKind,
        name: &'static str,
        kind: MemberKind,
        params: Vec<TypeInfo>,
        ret: TypeInfo,
        func: BuiltinFn,
    ) -> BuiltinId {
        let id = BuiltinId(self.entries.len() as u32);
        self.entries.push(Builtin { name, params: BuiltinParams::Exact(params), ret, func });
        self.members.entry(name).or_default().push((owner, kind, id));
        id
    }

    pub fn find_member(&self, owner: TypeKind, name: &str) -> Option<(MemberKind, BuiltinId)> {
        self.members
            .get(name)?
            .iter()
            .find(|(kind, ..)| *kind == owner)
            .map(|&(_, member, id)| (member, id))
    }

    pub fn find(&self, name: &str) -> Option<BuiltinId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: BuiltinId) -> Option<&Builtin> {
        self.entries.get(id.index())
    }

    pub fn call(&self, id: BuiltinId, ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let builtin = self
            .get(id)
            .ok_or_else(|| RuntimeError::internal(format!("unknown builtin #{}", id.0), ctx.span))?;
        (builtin.func)(ctx, args)
    }
}

fn io_error(err: std::io::Error, span: Span) -> RuntimeError {
    RuntimeError::new(RuntimeErrorKind::Io, format!("failed to write output: {}", err), span)
}

fn arg_type_error(name: &str, value: &Value, span: Span) -> RuntimeError {
    RuntimeError::type_mismatch(format!("'{}' cannot take a value of type '{}'", name, value.type_name()), span)
}

/// Positional argument `index`; the binder guarantees the arity.
fn arg(args: &[Value], index: usize, span: Span) -> Result<&Value, RuntimeError> {
    args.get(index)
        .ok_or_else(|| RuntimeError::internal(format!("missing builtin argument {}", index), span))
}

fn builtin_print(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let text: String = args.iter().map(|v| v.to_string()).collect();
    ctx.output.print(&text).map_err(|e| io_error(e, ctx.span))?;
    Ok(Value::None)
}

fn builtin_println(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let mut text: String = args.iter().map(|v| v.to_string()).collect();
    text.push('\n');
    ctx.output.print(&text).map_err(|e| io_error(e, ctx.span))?;
    Ok(Value::None)
}

fn builtin_len(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let len = match arg(&args, 0, ctx.span)? {
        Value::String(s) => s.chars().count(),
        Value::Vector(items) => items.borrow().len(),
        Value::Dict(entries) => entries.borrow().len(),
        other => return Err(arg_type_error("len", other, ctx.span)),
    };
    Ok(Value::Int(len as i64))
}

fn builtin_push(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let mut args = args.into_iter();
    match (args.next(), args.next()) {
        (Some(Value::Vector(items)), Some(value)) => {
            items.borrow_mut().push(value);
            Ok(Value::None)
        }
        (Some(other), _) => Err(arg_type_error("push", &other, ctx.span)),
        _ => Err(RuntimeError::internal("push takes two arguments", ctx.span)),
    }
}

fn builtin_pop(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match arg(&args, 0, ctx.span)? {
        Value::Vector(items) => items.borrow_mut().pop().ok_or_else(|| {
            RuntimeError::new(RuntimeErrorKind::IndexOutOfRange, "pop from an empty vector", ctx.span)
        }),
        other => Err(arg_type_error("pop", other, ctx.span)),
    }
}

fn builtin_to_string(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::String(arg(&args, 0, ctx.span)?.to_string()))
}

fn builtin_to_int(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let value = arg(&args, 0, ctx.span)?;
    let n = match value {
        Value::Int(n) => *n,
        Value::Float(f) => *f as i64,
        Value::Size(n) => i64::try_from(*n).map_err(|_| {
            RuntimeError::new(RuntimeErrorKind::IntegerOverflow, format!("{}u does not fit in an int", n), ctx.span)
        })?,
        Value::Char(c) => *c as i64,
        Value::Bool(b) => *b as i64,
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| {
            RuntimeError::new(RuntimeErrorKind::InvalidOperation, format!("cannot convert {:?} to int", s), ctx.span)
        })?,
        other => return Err(arg_type_error("to_int", other, ctx.span)),
    };
    Ok(Value::Int(n))
}

fn builtin_to_float(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    let value = arg(&args, 0, ctx.span)?;
    let f = match value {
        Value::Int(n) => *n as f64,
        Value::Float(f) => *f,
        Value::Size(n) => *n as f64,
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| {
            RuntimeError::new(RuntimeErrorKind::InvalidOperation, format!("cannot convert {:?} to float", s), ctx.span)
        })?,
        other => return Err(arg_type_error("to_float", other, ctx.span)),
    };
    Ok(Value::Float(f))
}

fn builtin_typeof(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::Type(arg(&args, 0, ctx.span)?.type_info()))
}

fn builtin_dict(_ctx: &mut CallContext<'_>, _args: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::Dict(Rc::new(RefCell::new(Vec::new()))))
}

fn builtin_assert(ctx: &mut CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match arg(&args, 0, ctx.span)? {
        Value::Bool(true) => Ok(Value::None),
        Value::Bool(false) => Err(RuntimeError::new(RuntimeErrorKind::AssertionFailed, "assertion failed", ctx.span)),
        other => Err(arg_type_error("assert", other, ctx.span)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn call(name: &str, args: Vec<Value>) -> (Result<Value, RuntimeError>, String) {
        let table = BuiltinTable::new();
        let mut output = Output::buffer();
        let id = table.find(name).unwrap();
        let result = {
            let mut ctx = CallContext { span: Span::default(), output: &mut output };
            table.call(id, &mut ctx, args)
        };
        (result, output.captured().to_string())
    }

    #[test]
    fn test_println_concatenates() {
        let (result, out) = call("println", vec![Value::string("x = "), Value::Int(5)]);
        assert_eq!(result.unwrap(), Value::None);
        assert_eq!(out, "x = 5\n");
    }

    #[test]
    fn test_len() {
        assert_eq!(call("len", vec![Value::string("héllo")]).0.unwrap(), Value::Int(5));
        assert_eq!(call("len", vec![Value::vector(vec![Value::None])]).0.unwrap(), Value::Int(1));
        assert!(call("len", vec![Value::Int(3)]).0.is_err());
    }

    #[test]
    fn test_push_and_pop_share_storage() {
        let v = Value::vector(vec![]);
        call("push", vec![v.clone(), Value::Int(4)]).0.unwrap();
        assert_eq!(call("pop", vec![v.clone()]).0.unwrap(), Value::Int(4));
        let err = call("pop", vec![v]).0.unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::IndexOutOfRange);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(call("to_int", vec![Value::string(" 42 ")]).0.unwrap(), Value::Int(42));
        assert_eq!(call("to_float", vec![Value::Int(2)]).0.unwrap(), Value::Float(2.0));
        assert_eq!(call("to_string", vec![Value::Float(1.5)]).0.unwrap(), Value::string("1.5"));
        assert_eq!(call("typeof", vec![Value::Char('c')]).0.unwrap(), Value::Type(TypeInfo::char()));
    }

    #[test]
    fn test_members_are_separate_from_free_functions() {
        let table = BuiltinTable::new();
        let (kind, push) = table.find_member(TypeKind::Vector, "push").unwrap();
        assert_eq!(kind, MemberKind::Function);
        assert_ne!(Some(push), table.find("push"));
        assert_eq!(table.find_member(TypeKind::String, "length").map(|m| m.0), Some(MemberKind::Variable));
        assert!(table.find_member(TypeKind::String, "push").is_none());
        assert!(table.find("length").is_none());
    }

    #[test]
    fn test_member_receives_object_first() {
        let table = BuiltinTable::new();
        let (_, push) = table.find_member(TypeKind::Vector, "push").unwrap();
        let v = Value::vector(vec![]);
        let mut output = Output::buffer();
        let mut ctx = CallContext { span: Span::default(), output: &mut output };
        table.call(push, &mut ctx, vec![v.clone(), Value::Int(9)]).unwrap();
        assert_eq!(v, Value::vector(vec![Value::Int(9)]));
    }

    #[test]
    fn test_assert() {
        assert!(call("assert", vec![Value::Bool(true)]).0.is_ok());
        assert_eq!(
            call("assert", vec![Value::Bool(false)]).0.unwrap_err().kind,
            RuntimeErrorKind::AssertionFailed
        );
    }
}
