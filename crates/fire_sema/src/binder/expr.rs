use fire_ast::*;
use fire_lexer::Span;

use super::{Binder, Lookup, VarSite};
use crate::error::SemaErrorKind;
use crate::operators;
use fire_runtime::MemberKind;

/// Type of an assignment target.
enum Place {
    Typed(TypeInfo),
    /// A variable without a type yet; the assigned value deduces it
    Undeduced(VarSite),
    Invalid,
}

impl<'a> Binder<'a> {
    /// Infer the static type of `expr`, rewriting it to its resolved kind.
    pub(super) fn bind_expr(&mut self, expr: &mut Expr) -> TypeInfo {
        let kind = std::mem::replace(&mut expr.kind, ExprKind::NoneLiteral);
        let (kind, ty) = self.bind_kind(kind, expr.span);
        expr.kind = kind;
        ty
    }

    fn bind_kind(&mut self, kind: ExprKind, span: Span) -> (ExprKind, TypeInfo) {
        match kind {
            ExprKind::IntLiteral(_) => (kind, TypeInfo::int()),
            ExprKind::SizeLiteral(_) => (kind, TypeInfo::size()),
            ExprKind::FloatLiteral(_) => (kind, TypeInfo::float()),
            ExprKind::BoolLiteral(_) => (kind, TypeInfo::bool()),
            ExprKind::CharLiteral(_) => (kind, TypeInfo::char()),
            ExprKind::StringLiteral(_) => (kind, TypeInfo::string()),
            ExprKind::NoneLiteral => (kind, TypeInfo::none()),

            ExprKind::Ident(name) => self.bind_name(name),
            ExprKind::Variable(var) => {
                let ty = match self.var_at(var.distance, var.index) {
                    Some(site) => self.deduced(&var.name, site.ty),
                    None => {
                        self.error(SemaErrorKind::Internal, format!("stale address for '{}'", var.name.name), span);
                        TypeInfo::any()
                    }
                };
                (ExprKind::Variable(var), ty)
            }
            ExprKind::FuncRef(func_ref) => {
                let ty = self.symbols.function(func_ref.func).map_or_else(TypeInfo::any, |f| f.ty());
                (ExprKind::FuncRef(func_ref), ty)
            }
            ExprKind::BuiltinRef(name, id) => {
                let ty = self.builtin_type(id);
                (ExprKind::BuiltinRef(name, id), ty)
            }
            ExprKind::EnumeratorRef(e) => {
                let ty = TypeInfo::enumerator(e.enum_name.clone());
                (ExprKind::EnumeratorRef(e), ty)
            }
            ExprKind::EnumName(..) | ExprKind::ClassName(..) => (kind, TypeInfo::type_name()),

            ExprKind::ScopeResol(path) => match self.resolve_path(&path) {
                Some((enumerator, ty)) => (ExprKind::EnumeratorRef(enumerator), ty),
                None => (ExprKind::ScopeResol(path), TypeInfo::any()),
            },

            ExprKind::Array(mut items) => {
                let types: Vec<TypeInfo> = items.iter_mut().map(|item| self.bind_expr(item)).collect();
                let elem = match types.split_first() {
                    Some((first, rest)) if rest.iter().all(|t| t == first) => first.clone(),
                    _ => TypeInfo::any(),
                };
                (ExprKind::Array(items), TypeInfo::vector(elem))
            }

            ExprKind::Index(mut object, mut index) => {
                let object_ty = self.bind_expr(&mut object);
                let index_ty = self.bind_expr(&mut index);
                let ty = self.index_type(&object_ty, &index_ty, index.span, span);
                (ExprKind::Index(object, index), ty)
            }

            ExprKind::Member(mut object, name) => {
                let object_ty = self.bind_expr(&mut object);
                self.bind_member(object, object_ty, name, span)
            }
            ExprKind::MemberVariable(mut object, member) => {
                let object_ty = self.bind_expr(&mut object);
                let ty = self
                    .class_of(&object_ty)
                    .and_then(|c| self.symbols.class(c))
                    .and_then(|c| c.fields.get(member.index))
                    .map_or_else(TypeInfo::any, |f| f.ty.clone());
                (ExprKind::MemberVariable(object, member), ty)
            }
            ExprKind::MemberFunction(mut object, method) => {
                self.bind_expr(&mut object);
                let ty = self.symbols.function(method.func).map_or_else(TypeInfo::any, |f| f.ty());
                (ExprKind::MemberFunction(object, method), ty)
            }
            ExprKind::BuiltinMemberVariable(mut object, member) => {
                self.bind_expr(&mut object);
                let ty = self.builtins.get(member.builtin).map_or_else(TypeInfo::any, |b| b.ret.clone());
                (ExprKind::BuiltinMemberVariable(object, member), ty)
            }
            ExprKind::BuiltinMemberFunction(mut object, member) => {
                self.bind_expr(&mut object);
                let ty = self.builtin_type(member.builtin);
                (ExprKind::BuiltinMemberFunction(object, member), ty)
            }

            ExprKind::Call(mut call) => {
                let ty = self.bind_call(&mut call, span);
                (ExprKind::Call(call), ty)
            }

            ExprKind::Binary(mut lhs, op, mut rhs) => {
                let lhs_ty = self.bind_expr(&mut lhs);
                let rhs_ty = self.bind_expr(&mut rhs);
                let ty = operators::binary_type(op, &lhs_ty, &rhs_ty).unwrap_or_else(|| {
                    let message = format!("invalid operator '{}' for '{}' and '{}'", op, lhs_ty, rhs_ty);
                    self.error(SemaErrorKind::InvalidOperator, message, span);
                    TypeInfo::any()
                });
                (ExprKind::Binary(lhs, op, rhs), ty)
            }
            ExprKind::Unary(op, mut operand) => {
                let operand_ty = self.bind_expr(&mut operand);
                let ty = operators::unary_type(op, &operand_ty).unwrap_or_else(|| {
                    self.error(SemaErrorKind::InvalidOperator, format!("invalid operator '{}' for '{}'", op, operand_ty), span);
                    TypeInfo::any()
                });
                (ExprKind::Unary(op, operand), ty)
            }

            ExprKind::Assign(mut target, op, mut value) => {
                let value_ty = self.bind_expr(&mut value);
                let ty = self.bind_assign(&mut target, op, value_ty, span);
                (ExprKind::Assign(target, op, value), ty)
            }
        }
    }

    /// A variable's type, or a use-before-deduction error.
    fn deduced(&mut self, name: &Ident, ty: Option<TypeInfo>) -> TypeInfo {
        ty.unwrap_or_else(|| {
            self.error(
                SemaErrorKind::UseBeforeDeduction,
                format!("type of '{}' is not deduced before its use", name.name),
                name.span,
            );
            TypeInfo::any()
        })
    }

    pub(super) fn builtin_type(&self, id: BuiltinId) -> TypeInfo {
        match self.builtins.get(id) {
            Some(builtin) => match &builtin.params {
                fire_runtime::BuiltinParams::Exact(params) => TypeInfo::function(builtin.ret.clone(), params.clone()),
                // Unchecked arity: a bare function type
                fire_runtime::BuiltinParams::Variadic => TypeInfo::new(TypeKind::Function),
            },
            None => TypeInfo::any(),
        }
    }

    fn bind_name(&mut self, name: Ident) -> (ExprKind, TypeInfo) {
        match self.lookup(&name.name) {
            Some(Lookup::Variable(site)) => {
                let ty = self.deduced(&name, site.ty);
                (ExprKind::Variable(VarRef { name, distance: site.distance, index: site.slot }), ty)
            }
            Some(Lookup::Functions(overloads)) => {
                if let [(func, env_distance)] = overloads[..] {
                    let ty = self.symbols.function(func).map_or_else(TypeInfo::any, |f| f.ty());
                    (ExprKind::FuncRef(FuncRef { name, func, env_distance }), ty)
                } else {
                    let mut error = crate::SemaError::new(
                        SemaErrorKind::AmbiguousName,
                        format!("'{}' is ambiguous: it names {} overloads", name.name, overloads.len()),
                        name.span,
                    );
                    for (func, _) in &overloads {
                        if let Some(f) = self.symbols.function(*func) {
                            error = error.with_note(format!("candidate: {}", f.signature()), f.span);
                        }
                    }
                    self.report(error);
                    (ExprKind::Ident(name), TypeInfo::any())
                }
            }
            Some(Lookup::Enum(id)) => (ExprKind::EnumName(name, id), TypeInfo::type_name()),
            Some(Lookup::Class(id, _)) => (ExprKind::ClassName(name, id), TypeInfo::type_name()),
            Some(Lookup::Builtin(id)) => {
                let ty = self.builtin_type(id);
                (ExprKind::BuiltinRef(name, id), ty)
            }
            None => {
                self.error(SemaErrorKind::UndefinedName, format!("'{}' is not defined", name.name), name.span);
                (ExprKind::Ident(name), TypeInfo::any())
            }
        }
    }

    /// `Enum::Member`. Each segment is resolved against what the previous
    /// one named.
    fn resolve_path(&mut self, path: &[Ident]) -> Option<(EnumeratorRef, TypeInfo)> {
        enum Named {
            Enum(EnumId),
            Enumerator(EnumId, usize),
            Class,
            Other,
        }

        let (head, rest) = path.split_first()?;
        let mut named = match self.lookup(&head.name) {
            Some(Lookup::Enum(id)) => Named::Enum(id),
            Some(Lookup::Class(..)) => Named::Class,
            Some(_) => Named::Other,
            None => {
                self.error(SemaErrorKind::UndefinedName, format!("'{}' is not defined", head.name), head.span);
                return None;
            }
        };

        let mut owner = head;
        for segment in rest {
            named = match named {
                Named::Enum(id) => match self.symbols.enum_symbol(id).and_then(|e| e.enumerator(&segment.name)) {
                    Some(index) => Named::Enumerator(id, index),
                    None => {
                        let message = format!("'{}' is not an enumerator of '{}'", segment.name, owner.name);
                        self.error(SemaErrorKind::EnumeratorNotFound, message, segment.span);
                        return None;
                    }
                },
                Named::Class => {
                    let message = format!("scope resolution on class '{}' is not supported", owner.name);
                    self.error(SemaErrorKind::NotSupported, message, segment.span);
                    return None;
                }
                Named::Enumerator(..) | Named::Other => {
                    self.error(SemaErrorKind::NotEnumOrClass, format!("'{}' is not an enum or class", owner.name), owner.span);
                    return None;
                }
            };
            owner = segment;
        }

        let Named::Enumerator(enum_id, index) = named else {
            self.error(SemaErrorKind::NotSupported, format!("'{}' cannot be used as a value here", owner.name), owner.span);
            return None;
        };
        let enum_name = self.symbols.enum_symbol(enum_id).map(|e| e.name.clone()).unwrap_or_default();
        let ty = TypeInfo::enumerator(enum_name.clone());
        Some((EnumeratorRef { enum_id, enum_name, name: owner.clone(), index }, ty))
    }

    fn index_type(&mut self, object: &TypeInfo, index: &TypeInfo, index_span: Span, span: Span) -> TypeInfo {
        let elem = match object.kind {
            TypeKind::Vector => object.element(),
            TypeKind::String => TypeInfo::char(),
            TypeKind::Dict | TypeKind::Any => return TypeInfo::any(),
            _ => {
                self.error(SemaErrorKind::InvalidOperator, format!("cannot index into a value of type '{}'", object), span);
                return TypeInfo::any();
            }
        };
        if !(index.is_any() || index.is(TypeKind::Int) || index.is(TypeKind::Size)) {
            self.error(SemaErrorKind::TypeMismatch, format!("index must be an integer, found '{}'", index), index_span);
        }
        elem
    }

    pub(super) fn class_of(&self, ty: &TypeInfo) -> Option<ClassId> {
        match (ty.kind, &ty.name) {
            (TypeKind::Instance, Some(name)) => self.symbols.class_by_name(name),
            _ => None,
        }
    }

    fn bind_member(&mut self, object: Box<Expr>, object_ty: TypeInfo, name: Ident, span: Span) -> (ExprKind, TypeInfo) {
        if object_ty.is_any() {
            let message = format!("member '{}' needs a value of class type, found 'any'", name.name);
            self.error(SemaErrorKind::NotSupported, message, span);
            return (ExprKind::Member(object, name), TypeInfo::any());
        }
        if let Some((kind, builtin)) = self.builtins.find_member(object_ty.kind, &name.name) {
            let member = BuiltinMemberRef { name, builtin };
            return match kind {
                MemberKind::Variable => {
                    let ty = self.builtins.get(builtin).map_or_else(TypeInfo::any, |b| b.ret.clone());
                    (ExprKind::BuiltinMemberVariable(object, member), ty)
                }
                MemberKind::Function => (ExprKind::BuiltinMemberFunction(object, member), self.builtin_type(builtin)),
            };
        }
        let Some(class) = self.class_of(&object_ty).and_then(|id| self.symbols.class(id)) else {
            self.error(SemaErrorKind::UnknownMember, format!("type '{}' has no member '{}'", object_ty, name.name), name.span);
            return (ExprKind::Member(object, name), TypeInfo::any());
        };

        if let Some((index, field)) = class.field(&name.name) {
            let ty = field.ty.clone();
            return (ExprKind::MemberVariable(object, MemberRef { name, index }), ty);
        }
        let method = class
            .methods
            .iter()
            .copied()
            .find(|m| self.symbols.function(*m).is_some_and(|f| f.name == name.name));
        match method {
            Some(func) => {
                let ty = self.symbols.function(func).map_or_else(TypeInfo::any, |f| f.ty());
                (ExprKind::MemberFunction(object, MethodRef { name, func }), ty)
            }
            None => {
                let message = format!("class '{}' has no member '{}'", class.name, name.name);
                self.error(SemaErrorKind::UnknownMember, message, name.span);
                (ExprKind::Member(object, name), TypeInfo::any())
            }
        }
    }

    fn bind_place(&mut self, target: &mut Expr) -> Place {
        let site = match &target.kind {
            ExprKind::Ident(name) => match self.lookup(&name.name) {
                Some(Lookup::Variable(site)) => Some((name.clone(), site)),
                _ => None,
            },
            ExprKind::Variable(var) => self.var_at(var.distance, var.index).map(|site| (var.name.clone(), site)),
            _ => None,
        };

        if let Some((name, site)) = site {
            target.kind = ExprKind::Variable(VarRef { name, distance: site.distance, index: site.slot });
            return match site.ty.clone() {
                Some(ty) => Place::Typed(ty),
                None => Place::Undeduced(site),
            };
        }

        let ty = self.bind_expr(target);
        match target.kind {
            ExprKind::Index(..) | ExprKind::MemberVariable(..) => Place::Typed(ty),
            // Already reported while binding the target
            ExprKind::Ident(_) | ExprKind::Member(..) => Place::Invalid,
            _ => {
                self.error(SemaErrorKind::InvalidAssignTarget, "invalid assignment target", target.span);
                Place::Invalid
            }
        }
    }

    fn bind_assign(&mut self, target: &mut Expr, op: Option<BinOp>, value: TypeInfo, span: Span) -> TypeInfo {
        match self.bind_place(target) {
            Place::Invalid => TypeInfo::any(),
            Place::Undeduced(site) => {
                if op.is_some() {
                    let name = self.scopes.get(site.scope).vars[site.var].name.clone();
                    let message = format!("type of '{}' is not deduced before its use", name);
                    self.error(SemaErrorKind::UseBeforeDeduction, message, target.span);
                    return TypeInfo::any();
                }
                self.set_var_type(&site, value.clone());
                value
            }
            Place::Typed(ty) => {
                let result = match op {
                    Some(op) => operators::binary_type(op, &ty, &value).unwrap_or_else(|| {
                        let message = format!("invalid operator '{}=' for '{}' and '{}'", op, ty, value);
                        self.error(SemaErrorKind::InvalidOperator, message, span);
                        ty.clone()
                    }),
                    None => value,
                };
                if !ty.matches(&result) {
                    let message = format!("cannot assign a value of type '{}' to a target of type '{}'", result, ty);
                    self.error(SemaErrorKind::TypeMismatch, message, span);
                }
                ty
            }
        }
    }
}
