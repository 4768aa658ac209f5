//! Binder: name resolution, overload resolution and static typing.
//!
//! Every visited expression is rewritten in place to its resolved kind, so a
//! second visit of the same node takes the memoized path and yields the same
//! addresses.

mod call;
mod expr;
mod stmt;

use fire_ast::*;
use fire_lexer::Span;
use fire_runtime::BuiltinTable;
use tracing::debug;

use crate::error::{SemaError, SemaErrorKind};
use crate::scope::{ScopeId, ScopeTree};
use crate::symbols::SymbolTable;

/// Result of binding a whole program.
#[derive(Debug)]
pub struct Bound {
    pub scopes: ScopeTree,
    pub symbols: SymbolTable,
}

/// What a bare name resolves to at the current location.
#[derive(Debug, Clone)]
enum Lookup {
    Variable(VarSite),
    /// Every visible overload with the distance to its declaring scope
    Functions(Vec<(FuncId, usize)>),
    Enum(EnumId),
    Class(ClassId, usize),
    Builtin(BuiltinId),
}

/// A variable slot found on the scope chain.
#[derive(Debug, Clone)]
struct VarSite {
    scope: ScopeId,
    var: usize,
    distance: usize,
    slot: usize,
    ty: Option<TypeInfo>,
}

/// Enclosing function while its body is bound.
struct FnContext {
    ret: TypeInfo,
    /// Loop depth outside the function, restored on exit
    saved_loops: usize,
}

pub struct Binder<'a> {
    scopes: ScopeTree,
    symbols: SymbolTable,
    builtins: &'a BuiltinTable,
    current: ScopeId,
    functions: Vec<FnContext>,
    loop_depth: usize,
    errors: Vec<SemaError>,
}

/// Build the scope tree for `program`, then resolve and type-check it.
///
/// All errors are collected; the program is only usable if none were found.
pub fn bind(program: &mut Program, builtins: &BuiltinTable) -> Result<Bound, Vec<SemaError>> {
    let mut symbols = SymbolTable::default();
    let scopes = ScopeTree::build(program, &mut symbols);
    debug!(scopes = scopes.len(), functions = symbols.functions.len(), "scope tree built");

    let mut binder = Binder {
        current: scopes.root(),
        scopes,
        symbols,
        builtins,
        functions: Vec::new(),
        loop_depth: 0,
        errors: Vec::new(),
    };
    binder.declare_signatures(&program.body.stmts);
    binder.bind_stmts(&mut program.body.stmts);
    program.body.frame_size = binder.scopes.get(binder.scopes.root()).frame_size();

    if binder.errors.is_empty() {
        Ok(Bound { scopes: binder.scopes, symbols: binder.symbols })
    } else {
        Err(binder.errors)
    }
}

impl<'a> Binder<'a> {
    fn error(&mut self, kind: SemaErrorKind, message: impl Into<String>, span: Span) {
        self.errors.push(SemaError::new(kind, message, span));
    }

    fn report(&mut self, error: SemaError) {
        self.errors.push(error);
    }

    fn depth(&self) -> usize {
        self.scopes.get(self.current).depth
    }

    fn is_visible(&self, owner: ScopeId) -> bool {
        self.scopes.chain(self.current).any(|s| s == owner)
    }

    /// Resolve `name` innermost-first: variables, then functions, enums,
    /// classes and finally builtins.
    fn lookup(&self, name: &str) -> Option<Lookup> {
        for (distance, scope_id) in self.scopes.chain(self.current).enumerate() {
            let scope = self.scopes.get(scope_id);
            if let Some(var) = scope.find_var(name) {
                let local = &scope.vars[var];
                return Some(Lookup::Variable(VarSite {
                    scope: scope_id,
                    var,
                    distance,
                    slot: local.slot(),
                    ty: local.ty.clone(),
                }));
            }
        }

        let depth = self.depth();
        let overloads: Vec<(FuncId, usize)> = self
            .symbols
            .functions
            .iter()
            .enumerate()
            .filter(|(_, f)| f.class.is_none() && f.name == name && self.is_visible(f.owner))
            .map(|(i, f)| (FuncId(i as u32), depth - self.scopes.get(f.owner).depth))
            .collect();
        if !overloads.is_empty() {
            return Some(Lookup::Functions(overloads));
        }

        // Innermost declaration wins for enums and classes
        for scope_id in self.scopes.chain(self.current) {
            if let Some(i) = self.symbols.enums.iter().position(|e| e.name == name && e.owner == scope_id) {
                return Some(Lookup::Enum(EnumId(i as u32)));
            }
        }
        for scope_id in self.scopes.chain(self.current) {
            if let Some(i) = self.symbols.classes.iter().position(|c| c.name == name && c.owner == scope_id) {
                return Some(Lookup::Class(ClassId(i as u32), depth - self.scopes.get(scope_id).depth));
            }
        }

        self.builtins.find(name).map(Lookup::Builtin)
    }

    /// Re-find the slot a memoized variable reference points at.
    fn var_at(&self, distance: usize, slot: usize) -> Option<VarSite> {
        let scope_id = self.scopes.ancestor(self.current, distance)?;
        let scope = self.scopes.get(scope_id);
        let var = scope.var_at_slot(slot)?;
        Some(VarSite { scope: scope_id, var, distance, slot, ty: scope.vars[var].ty.clone() })
    }

    fn set_var_type(&mut self, site: &VarSite, ty: TypeInfo) {
        self.scopes.get_mut(site.scope).vars[site.var].ty = Some(ty);
    }

    /// Resolve a written type. Unknown names are reported and become `any`.
    fn resolve_type(&mut self, ty: &TypeExpr) -> TypeInfo {
        let arity = |expected: usize| ty.args.len() == expected;
        let resolved = match ty.name.name.as_str() {
            "int" if arity(0) => Some(TypeInfo::int()),
            "float" if arity(0) => Some(TypeInfo::float()),
            "usize" if arity(0) => Some(TypeInfo::size()),
            "bool" if arity(0) => Some(TypeInfo::bool()),
            "char" if arity(0) => Some(TypeInfo::char()),
            "string" if arity(0) => Some(TypeInfo::string()),
            "dict" if arity(0) => Some(TypeInfo::dict()),
            "any" if arity(0) => Some(TypeInfo::any()),
            "type" if arity(0) => Some(TypeInfo::type_name()),
            "none" if arity(0) => Some(TypeInfo::none()),
            "vector" if arity(1) => Some(TypeInfo::vector(self.resolve_type(&ty.args[0]))),
            "function" if arity(0) => Some(TypeInfo::new(TypeKind::Function)),
            "function" => {
                let ret = self.resolve_type(&ty.args[0]);
                let args: Vec<TypeInfo> = ty.args[1..].iter().map(|a| self.resolve_type(a)).collect();
                Some(TypeInfo::function(ret, args))
            }
            name if arity(0) => {
                if self.symbols.class_by_name(name).is_some() {
                    Some(TypeInfo::instance(name))
                } else if self.symbols.enum_by_name(name).is_some() {
                    Some(TypeInfo::enumerator(name))
                } else {
                    None
                }
            }
            _ => None,
        };
        resolved.unwrap_or_else(|| {
            self.error(SemaErrorKind::InvalidType, format!("'{}' is not a valid type", type_expr_text(ty)), ty.span);
            TypeInfo::any()
        })
    }

    /// Resolve parameter, result and field types of every function and class
    /// before any body is bound, so calls may precede declarations.
    fn declare_signatures(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            match &stmt.kind {
                StmtKind::Fn(def) => self.declare_fn(def),
                StmtKind::Class(def) => {
                    if let Some(class) = def.class {
                        for (i, field) in def.fields.iter().enumerate() {
                            let ty = field.ty.as_ref().map_or_else(TypeInfo::any, |t| self.resolve_type(t));
                            self.symbols.classes[class.index()].fields[i].ty = ty;
                        }
                    }
                    for method in &def.methods {
                        self.declare_fn(method);
                    }
                }
                StmtKind::Block(block) => self.declare_signatures(&block.stmts),
                StmtKind::If(if_stmt) => self.declare_if(if_stmt),
                StmtKind::While(while_stmt) => self.declare_signatures(&while_stmt.body.stmts),
                StmtKind::Try(try_stmt) => {
                    self.declare_signatures(&try_stmt.body.stmts);
                    for clause in &try_stmt.catches {
                        self.declare_signatures(&clause.body.stmts);
                    }
                }
                StmtKind::Namespace(ns) => self.declare_signatures(&ns.body.stmts),
                StmtKind::Let(_)
                | StmtKind::Expr(_)
                | StmtKind::Return(_)
                | StmtKind::Throw(_)
                | StmtKind::Break
                | StmtKind::Continue
                | StmtKind::Enum(_) => {}
            }
        }
    }

    fn declare_if(&mut self, if_stmt: &IfStmt) {
        self.declare_signatures(&if_stmt.then_block.stmts);
        match &if_stmt.else_branch {
            Some(ElseBranch::Block(block)) => self.declare_signatures(&block.stmts),
            Some(ElseBranch::If(nested)) => self.declare_if(nested),
            None => {}
        }
    }

    fn declare_fn(&mut self, def: &FnDef) {
        let Some(func) = def.func else { return };
        let param_types: Vec<TypeInfo> =
            def.params.iter().map(|p| p.ty.as_ref().map_or_else(TypeInfo::any, |t| self.resolve_type(t))).collect();
        // Without an annotation the result is only known at runtime
        let ret = def.return_type.as_ref().map_or_else(TypeInfo::any, |t| self.resolve_type(t));

        let symbol = &mut self.symbols.functions[func.index()];
        symbol.ret = ret;
        for (param, ty) in symbol.params.iter_mut().zip(&param_types) {
            param.ty = ty.clone();
        }
        let self_ty = symbol.class.and_then(|c| self.symbols.classes.get(c.index())).map(|c| TypeInfo::instance(&c.name));
        let scope = self.scopes.get_mut(symbol.scope);

        let mut vars = scope.vars.iter_mut();
        if def.has_self {
            if let Some(var) = vars.next() {
                var.ty = Some(self_ty.unwrap_or_else(TypeInfo::any));
            }
        }
        for ((var, param), ty) in vars.zip(&def.params).zip(param_types) {
            var.ty = Some(if param.variadic { TypeInfo::vector(ty) } else { ty });
        }

        self.declare_signatures(&def.body.stmts);
    }
}

/// Source form of a type expression, for messages.
fn type_expr_text(ty: &TypeExpr) -> String {
    if ty.args.is_empty() {
        ty.name.name.clone()
    } else {
        let args: Vec<String> = ty.args.iter().map(type_expr_text).collect();
        format!("{}<{}>", ty.name.name, args.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fire_parser::Parser;
    use pretty_assertions::assert_eq;

    fn bind_source(source: &str) -> (Program, Result<Bound, Vec<SemaError>>) {
        let mut program = Parser::parse(source).unwrap();
        let builtins = BuiltinTable::new();
        let result = bind(&mut program, &builtins);
        (program, result)
    }

    fn error_kinds(source: &str) -> Vec<SemaErrorKind> {
        match bind_source(source).1 {
            Ok(_) => Vec::new(),
            Err(errors) => errors.into_iter().map(|e| e.kind).collect(),
        }
    }

    fn single_error(source: &str) -> SemaError {
        let errors = bind_source(source).1.unwrap_err();
        assert_eq!(errors.len(), 1, "{:?}", errors);
        errors.into_iter().next().unwrap()
    }

    fn let_init(program: &Program, index: usize) -> &Expr {
        let StmtKind::Let(let_stmt) = &program.body.stmts[index].kind else { panic!("expected let") };
        let_stmt.init.as_ref().unwrap()
    }

    fn call_target(expr: &Expr) -> Option<CallTarget> {
        let ExprKind::Call(call) = &expr.kind else { panic!("expected call, got {:?}", expr.kind) };
        call.target
    }

    #[test]
    fn test_variables_resolve_to_slots() {
        let (program, result) = bind_source("let x = 2; let y = x + 3;");
        let bound = result.unwrap();

        let ExprKind::Binary(lhs, BinOp::Add, _) = &let_init(&program, 1).kind else { panic!("expected binary") };
        let ExprKind::Variable(var) = &lhs.kind else { panic!("expected variable") };
        assert_eq!((var.distance, var.index), (0, 0));

        let root = bound.scopes.get(bound.scopes.root());
        assert_eq!(root.vars[1].ty, Some(TypeInfo::int()));
        assert_eq!(program.body.frame_size, 2);
    }

    #[test]
    fn test_rebinding_keeps_addresses() {
        let source = "let a = 1; fn f(n: int) -> int { let m = n + a; { return m; } } let b = f(a);";
        let (mut program, result) = bind_source(source);
        result.unwrap();
        let first = program.pretty_print();

        bind(&mut program, &BuiltinTable::new()).unwrap();
        assert_eq!(program.pretty_print(), first);
    }

    #[test]
    fn test_outer_variable_distance() {
        let (program, result) = bind_source("let a = 1; fn f() -> int { return a; }");
        result.unwrap();
        let StmtKind::Fn(def) = &program.body.stmts[1].kind else { panic!("expected fn") };
        let StmtKind::Return(Some(value)) = &def.body.stmts[0].kind else { panic!("expected return") };
        // body block -> argument scope -> root
        let ExprKind::Variable(var) = &value.kind else { panic!("expected variable") };
        assert_eq!((var.distance, var.index), (2, 0));
    }

    #[test]
    fn test_overload_follows_argument_type() {
        let source = r#"
            fn f1(a: int) -> int { return 1; }
            fn f1(a: string) -> int { return 2; }
            let r = f1("x");
            let s = f1(5);
        "#;
        let (program, result) = bind_source(source);
        result.unwrap();
        assert_eq!(call_target(let_init(&program, 2)), Some(CallTarget::Function { func: FuncId(1), env_distance: 0 }));
        assert_eq!(call_target(let_init(&program, 3)), Some(CallTarget::Function { func: FuncId(0), env_distance: 0 }));
    }

    #[test]
    fn test_no_matching_overload_lists_candidates() {
        let error = single_error("fn f1(a: int) {} fn f1(a: string) {} f1(true);");
        assert_eq!(error.kind, SemaErrorKind::NoMatchingOverload);
        assert_eq!(error.notes.len(), 2);
        assert_eq!(error.notes[0].0, "candidate: f1(int) -> any");
    }

    #[test]
    fn test_ambiguous_call() {
        let error = single_error("fn g(a: int) {} fn g(a: any) {} g(1);");
        assert_eq!(error.kind, SemaErrorKind::AmbiguousCall);
    }

    #[test]
    fn test_named_argument_failures() {
        let decl = "fn f(a: int, b: int) -> int { return a + b; }";
        assert_eq!(error_kinds(&format!("{} f(b: 2, a: 1);", decl)), vec![]);
        assert_eq!(error_kinds(&format!("{} f(a: 1, a: 2);", decl)), vec![SemaErrorKind::DuplicateArgument]);
        assert_eq!(error_kinds(&format!("{} f(c: 1, b: 2);", decl)), vec![SemaErrorKind::UnknownArgument]);
        assert_eq!(error_kinds(&format!("{} f(1);", decl)), vec![SemaErrorKind::TooFewArguments]);
        assert_eq!(error_kinds(&format!("{} f(1, 2, 3);", decl)), vec![SemaErrorKind::TooManyArguments]);
    }

    #[test]
    fn test_argument_mismatch_notes_declaration() {
        let error = single_error(r#"fn f(a: int) {} f("s");"#);
        assert_eq!(error.kind, SemaErrorKind::TypeMismatch);
        assert_eq!(error.notes[0].0, "declared type as 'int', but given 'string'");
    }

    #[test]
    fn test_use_before_deduction() {
        assert_eq!(error_kinds("println(x); let x = 1;"), vec![SemaErrorKind::UseBeforeDeduction]);
        assert_eq!(error_kinds("let x; x = 3; let y: int = x;"), vec![]);
        assert_eq!(error_kinds("let x; x += 3;"), vec![SemaErrorKind::UseBeforeDeduction]);
    }

    #[test]
    fn test_enumerator_resolution() {
        let (program, result) = bind_source("enum Color { Red, Green } let c = Color::Green;");
        result.unwrap();
        let ExprKind::EnumeratorRef(e) = &let_init(&program, 1).kind else { panic!("expected enumerator") };
        assert_eq!((e.enum_name.as_str(), e.index), ("Color", 1));
    }

    #[test]
    fn test_scope_resolution_errors() {
        assert_eq!(error_kinds("let v = 1; v::A;"), vec![SemaErrorKind::NotEnumOrClass]);
        assert_eq!(error_kinds("class P { x: int; } P::x;"), vec![SemaErrorKind::NotSupported]);
        assert_eq!(error_kinds("enum E { A } E::B;"), vec![SemaErrorKind::EnumeratorNotFound]);
        assert_eq!(error_kinds("Nope::A;"), vec![SemaErrorKind::UndefinedName]);
    }

    #[test]
    fn test_misplaced_control_flow() {
        assert_eq!(error_kinds("break;"), vec![SemaErrorKind::MisplacedStatement]);
        assert_eq!(error_kinds("return 1;"), vec![SemaErrorKind::MisplacedStatement]);
        assert_eq!(error_kinds("while true { if true { continue; } break; }"), vec![]);
        // a function body does not inherit the surrounding loop
        assert_eq!(error_kinds("while true { fn g() { break; } }"), vec![SemaErrorKind::MisplacedStatement]);
    }

    #[test]
    fn test_statement_type_checks() {
        assert_eq!(error_kinds("if 1 { }"), vec![SemaErrorKind::TypeMismatch]);
        assert_eq!(error_kinds(r#"fn f() -> int { return "s"; }"#), vec![SemaErrorKind::TypeMismatch]);
        assert_eq!(error_kinds(r#"let s = "a"; s = 1;"#), vec![SemaErrorKind::TypeMismatch]);
        assert_eq!(error_kinds("let x: int = 2.5;"), vec![SemaErrorKind::TypeMismatch]);
        assert_eq!(error_kinds("1 = 2;"), vec![SemaErrorKind::InvalidAssignTarget]);
        assert_eq!(error_kinds("let t: wat = 1;"), vec![SemaErrorKind::InvalidType]);
    }

    #[test]
    fn test_errors_are_collected_without_cascading() {
        let kinds = error_kinds("let a = 1 + true; let b = missing; let c = a + 1; let d = b * 2;");
        assert_eq!(kinds, vec![SemaErrorKind::InvalidOperator, SemaErrorKind::UndefinedName]);
    }

    #[test]
    fn test_operator_typing_rules() {
        assert_eq!(error_kinds(r#"let s = "a" + "b";"#), vec![SemaErrorKind::InvalidOperator]);
        assert_eq!(error_kinds(r#"let s: string = "a" + 'b';"#), vec![]);
        assert_eq!(error_kinds("let b: bool = 1 && 2;"), vec![]);
        assert_eq!(error_kinds("let b = 1 || true;"), vec![SemaErrorKind::InvalidOperator]);
        assert_eq!(error_kinds("let a = 3u; let b: int = -a;"), vec![]);
        assert_eq!(error_kinds("let v: vector<int> = [1] + 2;"), vec![]);
    }

    #[test]
    fn test_forward_reference_to_function() {
        assert_eq!(error_kinds("let r = g(2); fn g(n: int) -> int { return n * 2; }"), vec![]);
    }

    #[test]
    fn test_class_members_and_constructor() {
        let source = r#"
            class P {
                x: int;
                y: int = 0;
                fn sum(self) -> int { return self.x + self.y; }
            }
            let p = P(1);
            let s = p.sum();
            let q = P(y: 2, x: 3);
        "#;
        let (program, result) = bind_source(source);
        result.unwrap();
        assert_eq!(
            call_target(let_init(&program, 1)),
            Some(CallTarget::Constructor { class: ClassId(0), env_distance: 0 })
        );
        assert_eq!(call_target(let_init(&program, 2)), Some(CallTarget::Method(FuncId(0))));

        assert_eq!(error_kinds("class P { x: int; } let p = P(1); p.z;"), vec![SemaErrorKind::UnknownMember]);
        assert_eq!(error_kinds("class P { x: int; } let p = P();"), vec![SemaErrorKind::TooFewArguments]);
    }

    #[test]
    fn test_builtin_type_members() {
        let source = "let v = [1]; let p = v.push(2); let n: int = v.length; let x = v.pop();";
        let (program, result) = bind_source(source);
        result.unwrap();
        let push = BuiltinTable::new().find_member(TypeKind::Vector, "push").map(|m| m.1).unwrap();
        assert_eq!(call_target(let_init(&program, 1)), Some(CallTarget::BuiltinMethod(push)));
        assert!(matches!(let_init(&program, 2).kind, ExprKind::BuiltinMemberVariable(..)));

        assert_eq!(error_kinds("let v = [1]; v.push();"), vec![SemaErrorKind::TooFewArguments]);
        assert_eq!(error_kinds("let n = 1; n.length;"), vec![SemaErrorKind::UnknownMember]);
    }

    #[test]
    fn test_function_values() {
        let source = "fn sq(n: int) -> int { return n * n; } let f = sq; let r: int = f(3);";
        let (program, result) = bind_source(source);
        result.unwrap();
        assert_eq!(call_target(let_init(&program, 2)), Some(CallTarget::Functor));

        assert_eq!(error_kinds("let n = 3; n(1);"), vec![SemaErrorKind::NotCallable]);
        assert_eq!(error_kinds("fn h(a: int) {} fn h(a: string) {} let k = h;"), vec![SemaErrorKind::AmbiguousName]);
    }

    #[test]
    fn test_builtin_calls() {
        assert_eq!(error_kinds(r#"println("a", 1, 2.0); let n: int = len("abc");"#), vec![]);
        assert_eq!(error_kinds("len();"), vec![SemaErrorKind::TooFewArguments]);
        assert_eq!(error_kinds("assert(1);"), vec![SemaErrorKind::TypeMismatch]);
    }

    #[test]
    fn test_namespace_gets_frame_key() {
        let (program, result) = bind_source("namespace n { let a = 1; } namespace n { let b = a; }");
        result.unwrap();
        let keys: Vec<Option<u32>> = program
            .body
            .stmts
            .iter()
            .map(|s| match &s.kind {
                StmtKind::Namespace(ns) => ns.frame_key,
                _ => None,
            })
            .collect();
        assert!(keys[0].is_some());
        assert_eq!(keys[0], keys[1]);
    }

    #[test]
    fn test_catch_variable_type() {
        assert_eq!(error_kinds(r#"try { throw 1; } catch e: int { let n: int = e + 1; }"#), vec![]);
        assert_eq!(error_kinds(r#"try { throw 1; } catch e: string { let n: int = e; }"#), vec![SemaErrorKind::TypeMismatch]);
    }
}
