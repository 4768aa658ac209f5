//! Runtime argument binding.

use fire_ast::{Ident, TypeInfo};
use fire_lexer::Span;
use fire_runtime::{RuntimeError, RuntimeErrorKind, Value};

/// An evaluated call argument.
pub struct ArgValue<'p> {
    pub name: Option<&'p Ident>,
    pub value: Value,
    pub span: Span,
}

/// A parameter slot to bind into.
pub struct ParamSpec<'s> {
    pub name: &'s str,
    pub ty: &'s TypeInfo,
    pub variadic: bool,
    /// May stay unassigned; the caller supplies a default
    pub optional: bool,
}

/// Assign `args` to `params` and re-check each declared type against the
/// bound value. A variadic parameter receives its arguments as a vector.
///
/// Returns one entry per parameter, `None` for an optional one left unassigned.
pub fn bind_arguments(
    callee: &str,
    params: &[ParamSpec<'_>],
    args: Vec<ArgValue<'_>>,
    span: Span,
) -> Result<Vec<Option<Value>>, RuntimeError> {
    let total = args.len();
    let mut bound: Vec<Option<Value>> = vec![None; params.len()];
    let mut rest: Vec<Value> = Vec::new();
    let mut cursor = 0;

    for arg in args {
        let index = match arg.name {
            Some(name) => {
                let index = params.iter().position(|p| p.name == name.name).ok_or_else(|| {
                    RuntimeError::new(
                        RuntimeErrorKind::UnknownArgument,
                        format!("'{}' is not found in arguments of '{}'", name.name, callee),
                        arg.span,
                    )
                })?;
                if bound[index].is_some() {
                    return Err(RuntimeError::new(
                        RuntimeErrorKind::DuplicateArgument,
                        format!("set to same argument name again: '{}'", name.name),
                        arg.span,
                    ));
                }
                index
            }
            None => {
                while cursor < params.len() && bound[cursor].is_some() && !params[cursor].variadic {
                    cursor += 1;
                }
                if cursor >= params.len() {
                    return Err(RuntimeError::new(
                        RuntimeErrorKind::TooManyArguments,
                        format!("too many arguments to '{}': expected {}, found {}", callee, params.len(), total),
                        span,
                    ));
                }
                let index = cursor;
                if !params[index].variadic {
                    cursor += 1;
                }
                index
            }
        };

        let param = &params[index];
        if !arg.value.conforms_to(param.ty) {
            return Err(RuntimeError::type_mismatch(
                format!("argument '{}' expects '{}', found '{}'", param.name, param.ty, arg.value.type_name()),
                arg.span,
            ));
        }
        if param.variadic {
            rest.push(arg.value);
            bound[index] = Some(Value::None);
        } else {
            bound[index] = Some(arg.value);
        }
    }

    for (index, param) in params.iter().enumerate() {
        if param.variadic {
            bound[index] = Some(Value::vector(std::mem::take(&mut rest)));
        } else if bound[index].is_none() && !param.optional {
            return Err(RuntimeError::new(
                RuntimeErrorKind::MissingArgument,
                format!("argument '{}' was not assigned", param.name),
                span,
            ));
        }
    }
    Ok(bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn positional(value: Value) -> ArgValue<'static> {
        ArgValue { name: None, value, span: Span::default() }
    }

    #[test]
    fn test_named_and_positional_bind_identically() {
        let int = TypeInfo::int();
        let params = [
            ParamSpec { name: "a", ty: &int, variadic: false, optional: false },
            ParamSpec { name: "b", ty: &int, variadic: false, optional: false },
        ];
        let a = Ident::new("a".to_string(), Span::default());
        let b = Ident::new("b".to_string(), Span::default());

        let by_position = bind_arguments("f", &params, vec![positional(Value::Int(1)), positional(Value::Int(2))], Span::default());
        let by_name = bind_arguments(
            "f",
            &params,
            vec![
                ArgValue { name: Some(&b), value: Value::Int(2), span: Span::default() },
                ArgValue { name: Some(&a), value: Value::Int(1), span: Span::default() },
            ],
            Span::default(),
        );
        assert_eq!(by_position.unwrap(), by_name.unwrap());
    }

    #[test]
    fn test_binding_failures() {
        let int = TypeInfo::int();
        let params = [ParamSpec { name: "a", ty: &int, variadic: false, optional: false }];
        let a = Ident::new("a".to_string(), Span::default());
        let named = |value| ArgValue { name: Some(&a), value, span: Span::default() };

        let err = bind_arguments("f", &params, vec![named(Value::Int(1)), named(Value::Int(2))], Span::default());
        assert_eq!(err.unwrap_err().kind, RuntimeErrorKind::DuplicateArgument);

        let err = bind_arguments("f", &params, vec![], Span::default());
        assert_eq!(err.unwrap_err().message, "argument 'a' was not assigned");

        let err = bind_arguments("f", &params, vec![positional(Value::string("s"))], Span::default());
        assert_eq!(err.unwrap_err().kind, RuntimeErrorKind::TypeMismatch);
    }

    #[test]
    fn test_variadic_collects_surplus() {
        let any = TypeInfo::any();
        let params = [
            ParamSpec { name: "first", ty: &any, variadic: false, optional: false },
            ParamSpec { name: "rest", ty: &any, variadic: true, optional: false },
        ];
        let bound = bind_arguments(
            "f",
            &params,
            vec![positional(Value::Int(1)), positional(Value::Int(2)), positional(Value::Int(3))],
            Span::default(),
        )
        .unwrap();
        assert_eq!(bound[1], Some(Value::vector(vec![Value::Int(2), Value::Int(3)])));

        let bound = bind_arguments("f", &params, vec![positional(Value::Int(1))], Span::default()).unwrap();
        assert_eq!(bound[1], Some(Value::vector(vec![])));
    }
}
