//! Call binding and overload resolution.

use fire_ast::*;
use fire_lexer::Span;
use fire_runtime::BuiltinParams;
use tracing::debug;

use super::{Binder, Lookup};
use crate::error::{SemaError, SemaErrorKind};

/// Static view of one call argument.
struct ArgInfo {
    name: Option<Ident>,
    ty: TypeInfo,
    span: Span,
}

/// A parameter as the argument matcher sees it.
struct Formal {
    name: String,
    ty: TypeInfo,
    variadic: bool,
    /// May be left unassigned (a field with a default value)
    optional: bool,
    span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArgFailure {
    TooFew { param: usize },
    TooMany,
    Mismatch { arg: usize, param: usize },
    Unknown { arg: usize },
    Duplicate { arg: usize },
}

/// What the callee of a call expression denotes.
enum Callee {
    Functions(Ident, Vec<(FuncId, usize)>),
    Method(FuncId),
    Builtin(BuiltinId),
    /// Member function of a builtin type; the object is the first argument
    BuiltinMethod(BuiltinId),
    Constructor(ClassId, usize),
    Value(TypeInfo),
}

/// Map arguments onto parameters: named arguments by name, positional ones
/// left to right, a trailing variadic absorbing the surplus.
fn match_arguments(args: &[ArgInfo], params: &[Formal]) -> Result<(), ArgFailure> {
    let mut assigned = vec![false; params.len()];
    let mut cursor = 0;
    for (i, arg) in args.iter().enumerate() {
        let param = match &arg.name {
            Some(name) => {
                let param = params.iter().position(|p| p.name == name.name).ok_or(ArgFailure::Unknown { arg: i })?;
                if assigned[param] {
                    return Err(ArgFailure::Duplicate { arg: i });
                }
                param
            }
            None => {
                while cursor < params.len() && assigned[cursor] && !params[cursor].variadic {
                    cursor += 1;
                }
                if cursor >= params.len() {
                    return Err(ArgFailure::TooMany);
                }
                let param = cursor;
                if !params[param].variadic {
                    cursor += 1;
                }
                param
            }
        };
        if !params[param].ty.matches(&arg.ty) {
            return Err(ArgFailure::Mismatch { arg: i, param });
        }
        assigned[param] = true;
    }

    match params.iter().zip(&assigned).position(|(p, done)| !done && !p.variadic && !p.optional) {
        Some(param) => Err(ArgFailure::TooFew { param }),
        None => Ok(()),
    }
}

impl<'a> Binder<'a> {
    pub(super) fn bind_call(&mut self, call: &mut CallExpr, span: Span) -> TypeInfo {
        let args: Vec<ArgInfo> = call
            .args
            .iter_mut()
            .map(|arg| ArgInfo { name: arg.name.clone(), ty: self.bind_expr(&mut arg.value), span: arg.span })
            .collect();

        match self.resolve_callee(&mut call.callee) {
            Callee::Functions(name, overloads) => {
                let Some((func, env_distance)) = self.resolve_overload(&name, &overloads, &args, span) else {
                    return TypeInfo::any();
                };
                call.callee.kind = ExprKind::FuncRef(FuncRef { name, func, env_distance });
                call.target = Some(CallTarget::Function { func, env_distance });
                self.symbols.function(func).map_or_else(TypeInfo::any, |f| f.ret.clone())
            }
            Callee::Method(func) => {
                let Some(symbol) = self.symbols.function(func) else { return TypeInfo::any() };
                let (name, ret) = (symbol.name.clone(), symbol.ret.clone());
                let params = self.function_formals(func);
                if let Err(failure) = match_arguments(&args, &params) {
                    self.report_arg_failure(&name, failure, &args, &params, span);
                }
                call.target = Some(CallTarget::Method(func));
                ret
            }
            Callee::Builtin(id) => {
                call.target = Some(CallTarget::Builtin(id));
                self.check_builtin_call(id, &args, span)
            }
            Callee::BuiltinMethod(id) => {
                call.target = Some(CallTarget::BuiltinMethod(id));
                self.check_builtin_call(id, &args, span)
            }
            Callee::Constructor(class, env_distance) => {
                let Some(symbol) = self.symbols.class(class) else { return TypeInfo::any() };
                let name = symbol.name.clone();
                let params: Vec<Formal> = symbol
                    .fields
                    .iter()
                    .map(|f| Formal {
                        name: f.name.clone(),
                        ty: f.ty.clone(),
                        variadic: false,
                        optional: f.has_default,
                        span: f.span,
                    })
                    .collect();
                if let Err(failure) = match_arguments(&args, &params) {
                    self.report_arg_failure(&name, failure, &args, &params, span);
                }
                call.target = Some(CallTarget::Constructor { class, env_distance });
                TypeInfo::instance(name)
            }
            Callee::Value(ty) => {
                call.target = Some(CallTarget::Functor);
                self.check_functor_call(&ty, &args, call.callee.span, span)
            }
        }
    }

    fn resolve_callee(&mut self, callee: &mut Expr) -> Callee {
        match &callee.kind {
            ExprKind::Ident(name) => match self.lookup(&name.name) {
                Some(Lookup::Functions(overloads)) => return Callee::Functions(name.clone(), overloads),
                Some(Lookup::Class(class, env_distance)) => {
                    callee.kind = ExprKind::ClassName(name.clone(), class);
                    return Callee::Constructor(class, env_distance);
                }
                Some(Lookup::Builtin(id)) => {
                    callee.kind = ExprKind::BuiltinRef(name.clone(), id);
                    return Callee::Builtin(id);
                }
                // Variables and enums are values; undefined names are reported below
                _ => {}
            },
            ExprKind::FuncRef(func_ref) => {
                return Callee::Functions(func_ref.name.clone(), vec![(func_ref.func, func_ref.env_distance)]);
            }
            ExprKind::BuiltinRef(_, id) => return Callee::Builtin(*id),
            ExprKind::ClassName(_, class) => {
                let owner = self.symbols.class(*class).map(|c| self.scopes.get(c.owner).depth);
                let env_distance = owner.map_or(0, |d| self.depth() - d);
                return Callee::Constructor(*class, env_distance);
            }
            _ => {}
        }

        let ty = self.bind_expr(callee);
        match &callee.kind {
            ExprKind::MemberFunction(_, method) => Callee::Method(method.func),
            ExprKind::BuiltinMemberFunction(_, member) => Callee::BuiltinMethod(member.builtin),
            _ => Callee::Value(ty),
        }
    }

    fn function_formals(&self, func: FuncId) -> Vec<Formal> {
        self.symbols
            .function(func)
            .map(|f| {
                f.params
                    .iter()
                    .map(|p| Formal {
                        name: p.name.clone(),
                        ty: p.ty.clone(),
                        variadic: p.variadic,
                        optional: false,
                        span: p.span,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Pick the one overload the arguments fit.
    fn resolve_overload(
        &mut self,
        name: &Ident,
        overloads: &[(FuncId, usize)],
        args: &[ArgInfo],
        span: Span,
    ) -> Option<(FuncId, usize)> {
        if let [(func, env_distance)] = overloads {
            let params = self.function_formals(*func);
            return match match_arguments(args, &params) {
                Ok(()) => Some((*func, *env_distance)),
                Err(failure) => {
                    self.report_arg_failure(&name.name, failure, args, &params, span);
                    None
                }
            };
        }

        let matching: Vec<(FuncId, usize)> = overloads
            .iter()
            .copied()
            .filter(|(func, _)| match_arguments(args, &self.function_formals(*func)).is_ok())
            .collect();
        debug!(name = %name.name, candidates = overloads.len(), matching = matching.len(), "overload resolution");

        match matching[..] {
            [winner] => Some(winner),
            [] => {
                let given: Vec<String> = args.iter().map(|a| a.ty.to_string()).collect();
                let message = format!("no overload of '{}' matches the arguments ({})", name.name, given.join(", "));
                let error = self.with_candidates(SemaError::new(SemaErrorKind::NoMatchingOverload, message, span), overloads);
                self.report(error);
                None
            }
            _ => {
                let message = format!("call to '{}' is ambiguous", name.name);
                let error = self.with_candidates(SemaError::new(SemaErrorKind::AmbiguousCall, message, span), &matching);
                self.report(error);
                None
            }
        }
    }

    fn with_candidates(&self, mut error: SemaError, overloads: &[(FuncId, usize)]) -> SemaError {
        for (func, _) in overloads {
            if let Some(symbol) = self.symbols.function(*func) {
                error = error.with_note(format!("candidate: {}", symbol.signature()), symbol.span);
            }
        }
        error
    }

    fn report_arg_failure(&mut self, callee: &str, failure: ArgFailure, args: &[ArgInfo], params: &[Formal], span: Span) {
        let arg_name = |arg: usize| args[arg].name.as_ref().map_or_else(String::new, |n| n.name.clone());
        let error = match failure {
            ArgFailure::TooFew { param } => SemaError::new(
                SemaErrorKind::TooFewArguments,
                format!("too few arguments to '{}': argument '{}' was not assigned", callee, params[param].name),
                span,
            )
            .with_note(format!("'{}' declared here", params[param].name), params[param].span),
            ArgFailure::TooMany => SemaError::new(
                SemaErrorKind::TooManyArguments,
                format!("too many arguments to '{}': expected {}, found {}", callee, params.len(), args.len()),
                span,
            ),
            ArgFailure::Mismatch { arg, param } => SemaError::new(
                SemaErrorKind::TypeMismatch,
                format!("argument type mismatch in call to '{}'", callee),
                args[arg].span,
            )
            .with_note(
                format!("declared type as '{}', but given '{}'", params[param].ty, args[arg].ty),
                params[param].span,
            ),
            ArgFailure::Unknown { arg } => SemaError::new(
                SemaErrorKind::UnknownArgument,
                format!("'{}' is not found in arguments of '{}'", arg_name(arg), callee),
                args[arg].span,
            ),
            ArgFailure::Duplicate { arg } => SemaError::new(
                SemaErrorKind::DuplicateArgument,
                format!("argument '{}' is set more than once", arg_name(arg)),
                args[arg].span,
            ),
        };
        self.report(error);
    }

    fn check_builtin_call(&mut self, id: BuiltinId, args: &[ArgInfo], span: Span) -> TypeInfo {
        let builtins = self.builtins;
        let Some(builtin) = builtins.get(id) else { return TypeInfo::any() };
        if let Some(named) = args.iter().find(|a| a.name.is_some()) {
            let message = format!("builtin '{}' does not take named arguments", builtin.name);
            self.error(SemaErrorKind::UnknownArgument, message, named.span);
            return builtin.ret.clone();
        }
        if let BuiltinParams::Exact(types) = &builtin.params {
            let params: Vec<Formal> = types
                .iter()
                .enumerate()
                .map(|(i, ty)| Formal { name: format!("#{}", i), ty: ty.clone(), variadic: false, optional: false, span })
                .collect();
            if let Err(failure) = match_arguments(args, &params) {
                self.report_arg_failure(builtin.name, failure, args, &params, span);
            }
        }
        builtin.ret.clone()
    }

    /// Call through a value. Only positional arguments are checked, and only
    /// when the function type spells out its parameters.
    fn check_functor_call(&mut self, ty: &TypeInfo, args: &[ArgInfo], callee_span: Span, span: Span) -> TypeInfo {
        match ty.kind {
            TypeKind::Any => TypeInfo::any(),
            TypeKind::Function if ty.params.is_empty() => TypeInfo::any(),
            TypeKind::Function => {
                if let Some(named) = args.iter().find(|a| a.name.is_some()) {
                    self.error(
                        SemaErrorKind::UnknownArgument,
                        "named arguments need a function name, not a function value",
                        named.span,
                    );
                    return ty.result();
                }
                let params: Vec<Formal> = ty
                    .arguments()
                    .iter()
                    .enumerate()
                    .map(|(i, p)| Formal {
                        name: format!("#{}", i),
                        ty: p.clone(),
                        variadic: false,
                        optional: false,
                        span: callee_span,
                    })
                    .collect();
                if let Err(failure) = match_arguments(args, &params) {
                    self.report_arg_failure("function value", failure, args, &params, span);
                }
                ty.result()
            }
            _ => {
                self.error(SemaErrorKind::NotCallable, format!("a value of type '{}' is not callable", ty), callee_span);
                TypeInfo::any()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arg(ty: TypeInfo) -> ArgInfo {
        ArgInfo { name: None, ty, span: Span::default() }
    }

    fn named(name: &str, ty: TypeInfo) -> ArgInfo {
        ArgInfo { name: Some(Ident::new(name.to_string(), Span::default())), ty, span: Span::default() }
    }

    fn param(name: &str, ty: TypeInfo) -> Formal {
        Formal { name: name.to_string(), ty, variadic: false, optional: false, span: Span::default() }
    }

    #[test]
    fn test_named_and_positional_mix() {
        let params = [param("a", TypeInfo::int()), param("b", TypeInfo::string())];
        assert_eq!(match_arguments(&[arg(TypeInfo::int()), arg(TypeInfo::string())], &params), Ok(()));
        assert_eq!(match_arguments(&[named("b", TypeInfo::string()), arg(TypeInfo::int())], &params), Ok(()));
        assert_eq!(
            match_arguments(&[named("a", TypeInfo::int()), named("a", TypeInfo::int())], &params),
            Err(ArgFailure::Duplicate { arg: 1 })
        );
        assert_eq!(
            match_arguments(&[named("c", TypeInfo::int())], &params),
            Err(ArgFailure::Unknown { arg: 0 })
        );
    }

    #[test]
    fn test_arity_failures() {
        let params = [param("a", TypeInfo::int()), param("b", TypeInfo::int())];
        assert_eq!(match_arguments(&[arg(TypeInfo::int())], &params), Err(ArgFailure::TooFew { param: 1 }));
        let three = [arg(TypeInfo::int()), arg(TypeInfo::int()), arg(TypeInfo::int())];
        assert_eq!(match_arguments(&three, &params), Err(ArgFailure::TooMany));
    }

    #[test]
    fn test_variadic_absorbs_surplus() {
        let mut rest = param("rest", TypeInfo::int());
        rest.variadic = true;
        let params = [param("first", TypeInfo::string()), rest];
        assert_eq!(match_arguments(&[arg(TypeInfo::string())], &params), Ok(()));
        let many = [arg(TypeInfo::string()), arg(TypeInfo::int()), arg(TypeInfo::int())];
        assert_eq!(match_arguments(&many, &params), Ok(()));
        let wrong = [arg(TypeInfo::string()), arg(TypeInfo::int()), arg(TypeInfo::bool())];
        assert_eq!(match_arguments(&wrong, &params), Err(ArgFailure::Mismatch { arg: 2, param: 1 }));
    }

    #[test]
    fn test_any_matches_every_parameter() {
        let params = [param("a", TypeInfo::int())];
        assert_eq!(match_arguments(&[arg(TypeInfo::any())], &params), Ok(()));
        let any_params = [param("a", TypeInfo::any())];
        assert_eq!(match_arguments(&[arg(TypeInfo::string())], &any_params), Ok(()));
    }
}
