//! Primitive binary and unary operators on runtime values.

use fire_ast::{BinOp, UnaryOp};
use fire_lexer::Span;

use crate::{RuntimeError, RuntimeErrorKind, Value};

/// Numeric operand after coercion: chars widen to int, mixed kinds promote.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Num {
    Int(i64),
    Float(f64),
    Size(u64),
}

fn as_num(value: &Value) -> Option<Num> {
    match value {
        Value::Int(n) => Some(Num::Int(*n)),
        Value::Float(n) => Some(Num::Float(*n)),
        Value::Size(n) => Some(Num::Size(*n)),
        Value::Char(c) => Some(Num::Int(*c as i64)),
        _ => None,
    }
}

fn to_float(n: Num) -> f64 {
    match n {
        Num::Int(v) => v as f64,
        Num::Float(v) => v,
        Num::Size(v) => v as f64,
    }
}

fn size_to_int(n: u64, span: Span) -> Result<i64, RuntimeError> {
    i64::try_from(n).map_err(|_| {
        RuntimeError::new(RuntimeErrorKind::IntegerOverflow, format!("{}u does not fit in an int", n), span)
    })
}

/// Bring both operands to the same numeric kind.
fn coerce(lhs: Num, rhs: Num, span: Span) -> Result<(Num, Num), RuntimeError> {
    Ok(match (lhs, rhs) {
        (Num::Int(_), Num::Int(_)) | (Num::Float(_), Num::Float(_)) | (Num::Size(_), Num::Size(_)) => (lhs, rhs),
        (Num::Float(_), _) | (_, Num::Float(_)) => (Num::Float(to_float(lhs)), Num::Float(to_float(rhs))),
        (Num::Size(a), Num::Int(b)) => (Num::Int(size_to_int(a, span)?), Num::Int(b)),
        (Num::Int(a), Num::Size(b)) => (Num::Int(a), Num::Int(size_to_int(b, span)?)),
    })
}

fn invalid(op: impl std::fmt::Display, lhs: &Value, rhs: &Value, span: Span) -> RuntimeError {
    RuntimeError::new(
        RuntimeErrorKind::InvalidOperation,
        format!("invalid operator '{}' for '{}' and '{}'", op, lhs.type_name(), rhs.type_name()),
        span,
    )
}

fn overflow(op: BinOp, span: Span) -> RuntimeError {
    RuntimeError::new(RuntimeErrorKind::IntegerOverflow, format!("integer overflow in '{}'", op), span)
}

fn repeat_count(n: i64, span: Span) -> Result<usize, RuntimeError> {
    usize::try_from(n).map_err(|_| {
        RuntimeError::new(RuntimeErrorKind::InvalidOperation, format!("cannot repeat {} times", n), span)
    })
}

/// Evaluate `lhs op rhs`. `&&` and `||` are expected to be short-circuited by
/// the caller; here both sides are already evaluated and tested for truthiness.
pub fn binary(op: BinOp, lhs: Value, rhs: Value, span: Span) -> Result<Value, RuntimeError> {
    match (op, &lhs, &rhs) {
        (BinOp::Eq, ..) => return Ok(Value::Bool(lhs.equals(&rhs))),
        (BinOp::NotEq, ..) => return Ok(Value::Bool(!lhs.equals(&rhs))),
        (BinOp::And, ..) => return Ok(Value::Bool(lhs.is_truthy() && rhs.is_truthy())),
        (BinOp::Or, ..) => return Ok(Value::Bool(lhs.is_truthy() || rhs.is_truthy())),

        (BinOp::Add, Value::Vector(a), Value::Vector(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            return Ok(Value::vector(items));
        }
        (BinOp::Add, Value::Vector(a), _) => {
            let mut items = a.borrow().clone();
            items.push(rhs.clone());
            return Ok(Value::vector(items));
        }
        (BinOp::Add, _, Value::Vector(b)) => {
            let mut items = vec![lhs.clone()];
            items.extend(b.borrow().iter().cloned());
            return Ok(Value::vector(items));
        }
        (BinOp::Mul, Value::Vector(v), Value::Int(n)) | (BinOp::Mul, Value::Int(n), Value::Vector(v)) => {
            let count = repeat_count(*n, span)?;
            let items = v.borrow();
            let repeated = (0..count).flat_map(|_| items.iter().cloned()).collect();
            return Ok(Value::vector(repeated));
        }

        (BinOp::Add, Value::String(a), Value::Char(c)) => return Ok(Value::String(format!("{}{}", a, c))),
        (BinOp::Add, Value::Char(c), Value::String(b)) => return Ok(Value::String(format!("{}{}", c, b))),
        (BinOp::Mul, Value::String(s), Value::Int(n)) | (BinOp::Mul, Value::Int(n), Value::String(s)) => {
            return Ok(Value::String(s.repeat(repeat_count(*n, span)?)));
        }
        _ => {}
    }

    let (Some(a), Some(b)) = (as_num(&lhs), as_num(&rhs)) else {
        return Err(invalid(op, &lhs, &rhs, span));
    };

    match coerce(a, b, span)? {
        (Num::Int(a), Num::Int(b)) => int_binary(op, a, b).ok_or_else(|| int_failure(op, b, &lhs, &rhs, span)),
        (Num::Size(a), Num::Size(b)) => size_binary(op, a, b).ok_or_else(|| size_failure(op, b, &lhs, &rhs, span)),
        (Num::Float(a), Num::Float(b)) => float_binary(op, a, b).ok_or_else(|| invalid(op, &lhs, &rhs, span)),
        _ => Err(RuntimeError::internal("numeric coercion produced mixed kinds", span)),
    }
}

fn int_binary(op: BinOp, a: i64, b: i64) -> Option<Value> {
    Some(match op {
        BinOp::Add => Value::Int(a.checked_add(b)?),
        BinOp::Sub => Value::Int(a.checked_sub(b)?),
        BinOp::Mul => Value::Int(a.checked_mul(b)?),
        BinOp::Div => Value::Int(a.checked_div(b)?),
        BinOp::Mod => Value::Int(a.checked_rem(b)?),
        BinOp::Shl => Value::Int(a.checked_shl(u32::try_from(b).ok()?)?),
        BinOp::Shr => Value::Int(a.checked_shr(u32::try_from(b).ok()?)?),
        BinOp::BitAnd => Value::Int(a & b),
        BinOp::BitOr => Value::Int(a | b),
        BinOp::BitXor => Value::Int(a ^ b),
        BinOp::Lt => Value::Bool(a < b),
        BinOp::Gt => Value::Bool(a > b),
        BinOp::LtEq => Value::Bool(a <= b),
        BinOp::GtEq => Value::Bool(a >= b),
        BinOp::Eq | BinOp::NotEq | BinOp::And | BinOp::Or => return None,
    })
}

fn int_failure(op: BinOp, rhs: i64, lhs_value: &Value, rhs_value: &Value, span: Span) -> RuntimeError {
    match op {
        BinOp::Div | BinOp::Mod if rhs == 0 => {
            RuntimeError::new(RuntimeErrorKind::DivisionByZero, "division by zero", span)
        }
        BinOp::And | BinOp::Or | BinOp::Eq | BinOp::NotEq => invalid(op, lhs_value, rhs_value, span),
        _ => overflow(op, span),
    }
}

fn size_binary(op: BinOp, a: u64, b: u64) -> Option<Value> {
    Some(match op {
        BinOp::Add => Value::Size(a.checked_add(b)?),
        BinOp::Sub => Value::Size(a.checked_sub(b)?),
        BinOp::Mul => Value::Size(a.checked_mul(b)?),
        BinOp::Div => Value::Size(a.checked_div(b)?),
        BinOp::Mod => Value::Size(a.checked_rem(b)?),
        BinOp::Lt => Value::Bool(a < b),
        BinOp::Gt => Value::Bool(a > b),
        BinOp::LtEq => Value::Bool(a <= b),
        BinOp::GtEq => Value::Bool(a >= b),
        _ => return None,
    })
}

fn size_failure(op: BinOp, rhs: u64, lhs_value: &Value, rhs_value: &Value, span: Span) -> RuntimeError {
    match op {
        BinOp::Div | BinOp::Mod if rhs == 0 => {
            RuntimeError::new(RuntimeErrorKind::DivisionByZero, "division by zero", span)
        }
        BinOp::Add | BinOp::Sub | BinOp::Mul => overflow(op, span),
        _ => invalid(op, lhs_value, rhs_value, span),
    }
}

fn float_binary(op: BinOp, a: f64, b: f64) -> Option<Value> {
    Some(match op {
        BinOp::Add => Value::Float(a + b),
        BinOp::Sub => Value::Float(a - b),
        BinOp::Mul => Value::Float(a * b),
        BinOp::Div => Value::Float(a / b),
        BinOp::Mod => Value::Float(a % b),
        BinOp::Lt => Value::Bool(a < b),
        BinOp::Gt => Value::Bool(a > b),
        BinOp::LtEq => Value::Bool(a <= b),
        BinOp::GtEq => Value::Bool(a >= b),
        _ => return None,
    })
}

pub fn unary(op: UnaryOp, value: Value, span: Span) -> Result<Value, RuntimeError> {
    match (op, &value) {
        (UnaryOp::Neg, Value::Int(n)) => n.checked_neg().map(Value::Int).ok_or_else(|| {
            RuntimeError::new(RuntimeErrorKind::IntegerOverflow, "integer overflow in '-'", span)
        }),
        (UnaryOp::Neg, Value::Float(n)) => Ok(Value::Float(-n)),
        (UnaryOp::Neg, Value::Size(n)) => size_to_int(*n, span)?.checked_neg().map(Value::Int).ok_or_else(|| {
            RuntimeError::new(RuntimeErrorKind::IntegerOverflow, "integer overflow in '-'", span)
        }),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::BitNot, Value::Int(n)) => Ok(Value::Int(!n)),
        _ => Err(RuntimeError::new(
            RuntimeErrorKind::InvalidOperation,
            format!("invalid operator '{}' for '{}'", op, value.type_name()),
            span,
        )),
    }
}
