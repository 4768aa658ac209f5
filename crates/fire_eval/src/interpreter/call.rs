//! Function, method, builtin and constructor calls.

use std::cell::RefCell;
use std::rc::Rc;

use fire_ast::*;
use fire_lexer::Span;
use fire_runtime::{CallContext, Callable, Frame, Instance, RuntimeError, RuntimeErrorKind, Value};
use tracing::debug;

use super::{CallEntry, Evaluator, ExecResult, Unwind};
use crate::args::{ArgValue, ParamSpec, bind_arguments};

/// Call-chain notes kept on an error unwinding through calls.
const MAX_TRACE_NOTES: usize = 16;

impl<'p> Evaluator<'p> {
    pub(crate) fn eval_call(&mut self, call: &'p CallExpr, span: Span) -> ExecResult<Value> {
        let target = call
            .target
            .ok_or_else(|| RuntimeError::internal("call target was not resolved", span))?;
        match target {
            CallTarget::Function { func, env_distance } => {
                let env = self.frame_at(env_distance, span)?;
                let args = self.eval_args(&call.args)?;
                self.call_function(func, env, None, args, span)
            }
            CallTarget::Method(func) => {
                let ExprKind::MemberFunction(object, _) = &call.callee.kind else {
                    return Err(RuntimeError::internal("method call without a receiver", span).into());
                };
                let receiver = self.eval_instance(object)?;
                let args = self.eval_args(&call.args)?;
                self.call_method(func, receiver, args, span)
            }
            CallTarget::Builtin(id) => {
                let args = self.eval_args(&call.args)?;
                Ok(self.call_builtin(id, None, args, span)?)
            }
            CallTarget::BuiltinMethod(id) => {
                let ExprKind::BuiltinMemberFunction(object, _) = &call.callee.kind else {
                    return Err(RuntimeError::internal("builtin method call without an object", span).into());
                };
                let receiver = self.eval_expr(object)?;
                let args = self.eval_args(&call.args)?;
                Ok(self.call_builtin(id, Some(receiver), args, span)?)
            }
            CallTarget::Constructor { class, env_distance } => {
                let env = self.frame_at(env_distance, span)?;
                let args = self.eval_args(&call.args)?;
                self.construct(class, env, args, span)
            }
            CallTarget::Functor => {
                let callee = self.eval_expr(&call.callee)?;
                let args = self.eval_args(&call.args)?;
                match callee {
                    Value::Callable(Callable::Function { func, env, .. }) => self.call_function(func, env, None, args, span),
                    Value::Callable(Callable::Method { func, receiver, .. }) => self.call_method(func, receiver, args, span),
                    Value::Callable(Callable::Builtin { id, .. }) => Ok(self.call_builtin(id, None, args, span)?),
                    Value::Callable(Callable::BuiltinMethod { id, receiver, .. }) => {
                        Ok(self.call_builtin(id, Some(*receiver), args, span)?)
                    }
                    other => Err(RuntimeError::new(
                        RuntimeErrorKind::NotCallable,
                        format!("a value of type '{}' is not callable", other.type_name()),
                        call.callee.span,
                    )
                    .into()),
                }
            }
        }
    }

    /// Arguments are evaluated left to right in the caller's frame.
    fn eval_args(&mut self, args: &'p [CallArg]) -> ExecResult<Vec<ArgValue<'p>>> {
        args.iter()
            .map(|arg| {
                let value = self.eval_expr(&arg.value)?;
                Ok::<_, Unwind>(ArgValue { name: arg.name.as_ref(), value, span: arg.span })
            })
            .collect()
    }

    fn call_method(&mut self, func: FuncId, receiver: Rc<Instance>, args: Vec<ArgValue<'p>>, span: Span) -> ExecResult<Value> {
        let env = receiver.env.clone();
        self.call_function(func, env, Some(Value::Instance(receiver)), args, span)
    }

    /// Run a user function in a new argument frame below `env`.
    fn call_function(
        &mut self,
        func: FuncId,
        env: Frame,
        receiver: Option<Value>,
        args: Vec<ArgValue<'p>>,
        span: Span,
    ) -> ExecResult<Value> {
        let symbols = self.symbols;
        let (Some(def), Some(symbol)) = (self.functions.get(&func).copied(), symbols.function(func)) else {
            return Err(RuntimeError::internal(format!("unknown function #{}", func.0), span).into());
        };

        let max = self.config.max_call_depth;
        if self.call_stack.len() >= max {
            let message = format!("stack overflow: call depth exceeded {} in '{}'", max, symbol.name);
            return Err(RuntimeError::new(RuntimeErrorKind::StackOverflow, message, span).into());
        }

        let params: Vec<ParamSpec<'_>> = symbol
            .params
            .iter()
            .map(|p| ParamSpec { name: &p.name, ty: &p.ty, variadic: p.variadic, optional: false })
            .collect();
        let bound = bind_arguments(&symbol.name, &params, args, span)?;

        let offset = usize::from(symbol.has_self);
        let frame = env.child(offset + bound.len());
        if let Some(receiver) = receiver {
            frame.set(0, receiver, span)?;
        }
        for (i, value) in bound.into_iter().enumerate() {
            frame.set(offset + i, value.unwrap_or(Value::None), span)?;
        }

        debug!(name = %symbol.name, depth = self.call_stack.len() + 1, "call");
        let result = {
            let mut scoped = self.scoped_call(CallEntry { func, frame: frame.clone(), span });
            scoped.exec_block(&def.body)
        };
        match result {
            Ok(_) => {}
            Err(Unwind::Error(err)) => {
                let err = if err.notes.len() < MAX_TRACE_NOTES {
                    err.with_note(format!("in call to '{}'", symbol.name), span)
                } else {
                    err
                };
                return Err(Unwind::Error(err));
            }
            Err(throw) => return Err(throw),
        }

        let value = frame.take_result().unwrap_or(Value::None);
        if !symbol.ret.is_any() && !value.conforms_to(&symbol.ret) {
            let message = format!("'{}' must return '{}', but returned '{}'", symbol.name, symbol.ret, value.type_name());
            return Err(RuntimeError::type_mismatch(message, span).into());
        }
        Ok(value)
    }

    /// Builtins run directly, outside the frame chain and the call stack. A
    /// member of a builtin type gets its object as the first argument.
    pub(super) fn call_builtin(
        &mut self,
        id: BuiltinId,
        receiver: Option<Value>,
        args: Vec<ArgValue<'_>>,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        let values = receiver.into_iter().chain(args.into_iter().map(|arg| arg.value)).collect();
        let mut ctx = CallContext { span, output: &mut self.output };
        self.builtins.call(id, &mut ctx, values)
    }

    /// Fields bind like parameters; one left out takes its default, which is
    /// evaluated in the frame the class was declared in.
    fn construct(&mut self, class: ClassId, env: Frame, args: Vec<ArgValue<'p>>, span: Span) -> ExecResult<Value> {
        let symbols = self.symbols;
        let (Some(def), Some(symbol), Some(layout)) = (
            self.classes.get(&class).copied(),
            symbols.class(class),
            self.layouts.get(&class).cloned(),
        ) else {
            return Err(RuntimeError::internal(format!("unknown class #{}", class.0), span).into());
        };

        let params: Vec<ParamSpec<'_>> = symbol
            .fields
            .iter()
            .map(|f| ParamSpec { name: &f.name, ty: &f.ty, variadic: false, optional: f.has_default })
            .collect();
        let bound = bind_arguments(&symbol.name, &params, args, span)?;

        let mut fields = Vec::with_capacity(bound.len());
        for (i, value) in bound.into_iter().enumerate() {
            let value = match (value, def.fields.get(i).and_then(|f| f.default.as_ref())) {
                (Some(value), _) => value,
                (None, Some(default)) => {
                    let value = self.with_frame(env.clone(), |ev| ev.eval_expr(default))?;
                    let field = &symbol.fields[i];
                    if !value.conforms_to(&field.ty) {
                        let message = format!(
                            "default of field '{}' has type '{}', but the field is declared '{}'",
                            field.name,
                            value.type_name(),
                            field.ty
                        );
                        return Err(RuntimeError::type_mismatch(message, default.span).into());
                    }
                    value
                }
                (None, None) => Value::None,
            };
            fields.push(value);
        }

        debug!(class = %symbol.name, "construct");
        Ok(Value::Instance(Rc::new(Instance { class, layout, fields: RefCell::new(fields), env })))
    }
}

#[cfg(test)]
mod tests {
    use fire_parser::Parser;
    use fire_runtime::{BuiltinTable, Output};
    use pretty_assertions::assert_eq;

    use crate::EvalConfig;

    use super::*;

    fn run_with(source: &str, config: EvalConfig) -> Result<String, RuntimeError> {
        let mut program = Parser::parse(source).unwrap();
        let builtins = BuiltinTable::new();
        let bound = fire_sema::bind(&mut program, &builtins).unwrap();
        let mut evaluator = Evaluator::new(&program, &bound, &builtins)
            .with_config(config)
            .with_output(Output::buffer());
        evaluator.run()?;
        assert_eq!(evaluator.call_depth(), 0);
        Ok(evaluator.output().captured().to_string())
    }

    fn run(source: &str) -> Result<String, RuntimeError> {
        run_with(source, EvalConfig::default())
    }

    #[test]
    fn test_closure_sees_defining_frame() {
        let source = "
            fn outer(n: int) -> int {
                fn inner(k: int) -> int { return n + k; }
                return inner(1);
            }
            print(outer(41));
        ";
        assert_eq!(run(source).unwrap(), "42");
    }

    #[test]
    fn test_missing_return_yields_none() {
        assert_eq!(run("fn f() { } print(f());").unwrap(), "none");
    }

    #[test]
    fn test_return_type_rechecked() {
        let err = run("fn f(x) -> int { return x; } f(\"s\");").unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::TypeMismatch);
        assert_eq!(err.message, "'f' must return 'int', but returned 'string'");
    }

    #[test]
    fn test_depth_bound_is_configurable() {
        let source = "fn down(n: int) -> int { if n == 0 { return 0; } return down(n - 1); } print(down(5));";
        assert_eq!(run_with(source, EvalConfig { max_call_depth: 6 }).unwrap(), "0");
        let err = run_with(source, EvalConfig { max_call_depth: 5 }).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::StackOverflow);
        assert_eq!(err.notes.len(), 5);
    }

    #[test]
    fn test_error_trace_is_capped() {
        let source = "fn down(n: int) -> int { return down(n + 1); } down(0);";
        let err = run(source).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::StackOverflow);
        assert_eq!(err.notes.len(), MAX_TRACE_NOTES);
    }

    #[test]
    fn test_bound_method_value() {
        let source = "
            class Counter { n: int = 0; fn bump(self) -> int { self.n += 1; return self.n; } }
            let c = Counter();
            let f = c.bump;
            f();
            f();
            print(c.n);
        ";
        assert_eq!(run(source).unwrap(), "2");
    }

    #[test]
    fn test_builtin_as_value() {
        assert_eq!(run("let p = println; p(1, 2);").unwrap(), "12\n");
    }
}
