use std::cell::RefCell;
use std::rc::Rc;

use fire_ast::*;
use fire_lexer::Span;
use fire_runtime::{Callable, EnumeratorValue, Frame, Instance, RuntimeError, RuntimeErrorKind, Value, ops};

use super::{Evaluator, ExecResult};
use crate::stack::ensure_sufficient_stack;

/// A resolved assignment target.
enum Place {
    Slot(Frame, usize),
    Element(Rc<RefCell<Vec<Value>>>, usize),
    Field(Rc<Instance>, usize),
}

impl Place {
    fn read(&self, span: Span) -> Result<Value, RuntimeError> {
        match self {
            Place::Slot(frame, index) => frame.get(*index, span),
            Place::Element(items, index) => items
                .borrow()
                .get(*index)
                .cloned()
                .ok_or_else(|| out_of_range(*index as i128, items.borrow().len(), span)),
            Place::Field(instance, index) => instance
                .fields
                .borrow()
                .get(*index)
                .cloned()
                .ok_or_else(|| RuntimeError::internal(format!("field #{} is missing", index), span)),
        }
    }

    fn write(&self, value: Value, span: Span) -> Result<(), RuntimeError> {
        match self {
            Place::Slot(frame, index) => frame.set(*index, value, span)?,
            Place::Element(items, index) => {
                let mut items = items.borrow_mut();
                let len = items.len();
                let slot = items.get_mut(*index).ok_or_else(|| out_of_range(*index as i128, len, span))?;
                *slot = value;
            }
            Place::Field(instance, index) => {
                let mut fields = instance.fields.borrow_mut();
                let slot = fields
                    .get_mut(*index)
                    .ok_or_else(|| RuntimeError::internal(format!("field #{} is missing", index), span))?;
                *slot = value;
            }
        }
        Ok(())
    }
}

fn out_of_range(index: i128, len: usize, span: Span) -> RuntimeError {
    RuntimeError::new(
        RuntimeErrorKind::IndexOutOfRange,
        format!("index {} is out of range for length {}", index, len),
        span,
    )
}

/// Check an `int` or `usize` index against `len`.
fn element_index(index: &Value, len: usize, span: Span) -> Result<usize, RuntimeError> {
    let raw = match index {
        Value::Int(n) => *n as i128,
        Value::Size(n) => *n as i128,
        other => {
            return Err(RuntimeError::type_mismatch(
                format!("index must be an integer, found '{}'", other.type_name()),
                span,
            ));
        }
    };
    if raw < 0 || raw >= len as i128 {
        return Err(out_of_range(raw, len, span));
    }
    Ok(raw as usize)
}

fn unresolved(what: &str, span: Span) -> RuntimeError {
    RuntimeError::internal(format!("{} was not resolved before evaluation", what), span)
}

impl<'p> Evaluator<'p> {
    pub(crate) fn eval_expr(&mut self, expr: &'p Expr) -> ExecResult<Value> {
        ensure_sufficient_stack(|| self.eval_expr_inner(expr))
    }

    fn eval_expr_inner(&mut self, expr: &'p Expr) -> ExecResult<Value> {
        let span = expr.span;
        match &expr.kind {
            ExprKind::IntLiteral(n) => Ok(Value::Int(*n)),
            ExprKind::SizeLiteral(n) => Ok(Value::Size(*n)),
            ExprKind::FloatLiteral(n) => Ok(Value::Float(*n)),
            ExprKind::BoolLiteral(b) => Ok(Value::Bool(*b)),
            ExprKind::CharLiteral(c) => Ok(Value::Char(*c)),
            ExprKind::StringLiteral(s) => Ok(Value::string(s.clone())),
            ExprKind::NoneLiteral => Ok(Value::None),

            ExprKind::Variable(var) => Ok(self.frame_at(var.distance, span)?.get(var.index, span)?),
            ExprKind::FuncRef(func_ref) => {
                let env = self.frame_at(func_ref.env_distance, span)?;
                Ok(Value::Callable(Callable::Function {
                    func: func_ref.func,
                    name: Rc::from(func_ref.name.name.as_str()),
                    env,
                }))
            }
            ExprKind::BuiltinRef(name, id) => {
                let builtin = self
                    .builtins
                    .get(*id)
                    .ok_or_else(|| RuntimeError::internal(format!("unknown builtin '{}'", name.name), span))?;
                Ok(Value::Callable(Callable::Builtin { id: *id, name: builtin.name }))
            }
            ExprKind::EnumeratorRef(e) => Ok(Value::Enumerator(Rc::new(EnumeratorValue {
                enum_name: e.enum_name.clone(),
                name: e.name.name.clone(),
                index: e.index,
            }))),
            ExprKind::EnumName(name, _) => Ok(Value::Type(TypeInfo::enumerator(name.name.clone()))),
            ExprKind::ClassName(name, _) => Ok(Value::Type(TypeInfo::instance(name.name.clone()))),

            ExprKind::Array(items) => {
                let values = items.iter().map(|item| self.eval_expr(item)).collect::<ExecResult<Vec<_>>>()?;
                Ok(Value::vector(values))
            }
            ExprKind::Index(object, index) => {
                let object = self.eval_expr(object)?;
                let index_value = self.eval_expr(index)?;
                Ok(self.index(object, &index_value, index.span)?)
            }
            ExprKind::MemberVariable(object, member) => {
                let instance = self.eval_instance(object)?;
                let place = Place::Field(instance, member.index);
                Ok(place.read(span)?)
            }
            ExprKind::MemberFunction(object, method) => {
                let receiver = self.eval_instance(object)?;
                Ok(Value::Callable(Callable::Method {
                    func: method.func,
                    name: Rc::from(method.name.name.as_str()),
                    receiver,
                }))
            }
            ExprKind::BuiltinMemberVariable(object, member) => {
                let object = self.eval_expr(object)?;
                Ok(self.call_builtin(member.builtin, Some(object), Vec::new(), span)?)
            }
            ExprKind::BuiltinMemberFunction(object, member) => {
                let receiver = Box::new(self.eval_expr(object)?);
                let name = self
                    .builtins
                    .get(member.builtin)
                    .map(|b| b.name)
                    .ok_or_else(|| RuntimeError::internal(format!("unknown builtin '{}'", member.name.name), span))?;
                Ok(Value::Callable(Callable::BuiltinMethod { id: member.builtin, name, receiver }))
            }

            ExprKind::Call(call) => self.eval_call(call, span),

            ExprKind::Binary(lhs, op @ (BinOp::And | BinOp::Or), rhs) => {
                let lhs = self.eval_expr(lhs)?.is_truthy();
                // `false && _` and `true || _` never evaluate the right side
                if lhs == (*op == BinOp::Or) {
                    return Ok(Value::Bool(lhs));
                }
                Ok(Value::Bool(self.eval_expr(rhs)?.is_truthy()))
            }
            ExprKind::Binary(lhs, op, rhs) => {
                let lhs = self.eval_expr(lhs)?;
                let rhs = self.eval_expr(rhs)?;
                Ok(ops::binary(*op, lhs, rhs, span)?)
            }
            ExprKind::Unary(op, operand) => {
                let value = self.eval_expr(operand)?;
                Ok(ops::unary(*op, value, span)?)
            }
            ExprKind::Assign(target, op, value) => self.eval_assign(target, *op, value, span),

            ExprKind::Ident(name) => Err(unresolved(&format!("'{}'", name.name), span).into()),
            ExprKind::ScopeResol(_) => Err(unresolved("scope resolution", span).into()),
            ExprKind::Member(_, name) => Err(unresolved(&format!("member '{}'", name.name), span).into()),
        }
    }

    pub(crate) fn eval_instance(&mut self, object: &'p Expr) -> ExecResult<Rc<Instance>> {
        match self.eval_expr(object)? {
            Value::Instance(instance) => Ok(instance),
            other => {
                let message = format!("expected a class instance, found '{}'", other.type_name());
                Err(RuntimeError::type_mismatch(message, object.span).into())
            }
        }
    }

    fn index(&self, object: Value, index: &Value, span: Span) -> Result<Value, RuntimeError> {
        match object {
            Value::Vector(items) => {
                let items = items.borrow();
                let at = element_index(index, items.len(), span)?;
                Ok(items[at].clone())
            }
            Value::String(s) => {
                let len = s.chars().count();
                let at = element_index(index, len, span)?;
                s.chars().nth(at).map(Value::Char).ok_or_else(|| out_of_range(at as i128, len, span))
            }
            Value::Dict(_) => Err(RuntimeError::new(
                RuntimeErrorKind::NotImplemented,
                "indexing a dict is not implemented",
                span,
            )),
            other => Err(RuntimeError::new(
                RuntimeErrorKind::InvalidOperation,
                format!("cannot index into a value of type '{}'", other.type_name()),
                span,
            )),
        }
    }

    fn eval_place(&mut self, target: &'p Expr) -> ExecResult<Place> {
        let span = target.span;
        match &target.kind {
            ExprKind::Variable(var) => Ok(Place::Slot(self.frame_at(var.distance, span)?, var.index)),
            ExprKind::Index(object, index) => {
                let object = self.eval_expr(object)?;
                let index_value = self.eval_expr(index)?;
                match object {
                    Value::Vector(items) => {
                        let at = element_index(&index_value, items.borrow().len(), index.span)?;
                        Ok(Place::Element(items, at))
                    }
                    Value::Dict(_) => Err(RuntimeError::new(
                        RuntimeErrorKind::NotImplemented,
                        "assigning into a dict is not implemented",
                        span,
                    )
                    .into()),
                    other => Err(RuntimeError::new(
                        RuntimeErrorKind::InvalidOperation,
                        format!("cannot assign into an element of '{}'", other.type_name()),
                        span,
                    )
                    .into()),
                }
            }
            ExprKind::MemberVariable(object, member) => {
                let instance = self.eval_instance(object)?;
                Ok(Place::Field(instance, member.index))
            }
            _ => Err(RuntimeError::internal("invalid assignment target", span).into()),
        }
    }

    /// The value is evaluated before the target. Yields the stored value.
    fn eval_assign(&mut self, target: &'p Expr, op: Option<BinOp>, value: &'p Expr, span: Span) -> ExecResult<Value> {
        let value = self.eval_expr(value)?;
        let place = self.eval_place(target)?;
        let value = match op {
            Some(op) => ops::binary(op, place.read(span)?, value, span)?,
            None => value,
        };
        if let Place::Field(instance, index) = &place {
            self.check_field(instance, *index, &value, span)?;
        }
        place.write(value.clone(), span)?;
        Ok(value)
    }

    /// Re-check a field's declared type.
    pub(crate) fn check_field(&self, instance: &Instance, index: usize, value: &Value, span: Span) -> Result<(), RuntimeError> {
        let Some(field) = self.symbols.class(instance.class).and_then(|c| c.fields.get(index)) else {
            return Ok(());
        };
        if value.conforms_to(&field.ty) {
            return Ok(());
        }
        Err(RuntimeError::type_mismatch(
            format!(
                "field '{}' of '{}' is declared '{}', but given '{}'",
                field.name,
                instance.layout.name,
                field.ty,
                value.type_name()
            ),
            span,
        ))
    }
}
