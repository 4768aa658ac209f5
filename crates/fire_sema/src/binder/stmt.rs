use fire_ast::*;
use tracing::trace;

use super::{Binder, FnContext};
use crate::error::SemaErrorKind;
use crate::scope::ScopeId;

impl<'a> Binder<'a> {
    pub(super) fn bind_stmts(&mut self, stmts: &mut [Stmt]) {
        for stmt in stmts {
            self.bind_stmt(stmt);
        }
    }

    fn scope_for(&mut self, node: NodeId, span: fire_lexer::Span) -> Option<ScopeId> {
        let scope = self.scopes.scope_of(node);
        if scope.is_none() {
            self.error(SemaErrorKind::Internal, "no scope was built for this block", span);
        }
        scope
    }

    /// Bind `stmts` inside the scope built for `node` and return that scope.
    fn bind_in_scope(&mut self, node: NodeId, stmts: &mut [Stmt], span: fire_lexer::Span) -> Option<ScopeId> {
        let scope = self.scope_for(node, span)?;
        let saved = std::mem::replace(&mut self.current, scope);
        trace!(scope = scope.0, depth = self.depth(), "enter scope");
        self.bind_stmts(stmts);
        self.current = saved;
        Some(scope)
    }

    pub(super) fn bind_block(&mut self, block: &mut Block) {
        if let Some(scope) = self.bind_in_scope(block.id, &mut block.stmts, block.span) {
            block.frame_size = self.scopes.get(scope).frame_size();
        }
    }

    fn expect_bool(&mut self, ty: &TypeInfo, span: fire_lexer::Span, what: &str) {
        if !TypeInfo::bool().matches(ty) {
            self.error(SemaErrorKind::TypeMismatch, format!("{} must be 'bool', found '{}'", what, ty), span);
        }
    }

    fn expect_loop(&mut self, word: &str, span: fire_lexer::Span) {
        if self.loop_depth == 0 {
            self.error(SemaErrorKind::MisplacedStatement, format!("'{}' outside of a loop", word), span);
        }
    }

    pub(super) fn bind_stmt(&mut self, stmt: &mut Stmt) {
        let span = stmt.span;
        match &mut stmt.kind {
            StmtKind::Let(let_stmt) => self.bind_let(let_stmt),
            StmtKind::Expr(expr) => {
                self.bind_expr(expr);
            }
            StmtKind::Block(block) => self.bind_block(block),
            StmtKind::If(if_stmt) => self.bind_if(if_stmt),
            StmtKind::While(while_stmt) => {
                let cond = self.bind_expr(&mut while_stmt.cond);
                self.expect_bool(&cond, while_stmt.cond.span, "loop condition");
                self.loop_depth += 1;
                self.bind_block(&mut while_stmt.body);
                self.loop_depth -= 1;
            }
            StmtKind::Try(try_stmt) => self.bind_try(try_stmt),
            StmtKind::Return(value) => {
                let ty = match value {
                    Some(expr) => self.bind_expr(expr),
                    None => TypeInfo::none(),
                };
                match self.functions.last() {
                    None => self.error(SemaErrorKind::MisplacedStatement, "'return' outside of a function", span),
                    Some(ctx) if !ctx.ret.matches(&ty) => {
                        let message = format!("return type mismatch: expected '{}', found '{}'", ctx.ret, ty);
                        self.error(SemaErrorKind::TypeMismatch, message, span);
                    }
                    Some(_) => {}
                }
            }
            StmtKind::Throw(value) => {
                self.bind_expr(value);
            }
            StmtKind::Break => self.expect_loop("break", span),
            StmtKind::Continue => self.expect_loop("continue", span),
            StmtKind::Fn(def) => self.bind_fn(def),
            StmtKind::Class(def) => self.bind_class(def),
            StmtKind::Enum(_) => {}
            StmtKind::Namespace(ns) => {
                if let Some(scope) = self.bind_in_scope(ns.body.id, &mut ns.body.stmts, ns.body.span) {
                    ns.body.frame_size = self.scopes.get(scope).frame_size();
                    ns.frame_key = Some(scope.0);
                }
            }
        }
    }

    fn bind_let(&mut self, let_stmt: &mut LetStmt) {
        let declared = let_stmt.ty.as_ref().map(|t| self.resolve_type(t));
        let errors_before = self.errors.len();
        let init = let_stmt.init.as_mut().map(|e| (self.bind_expr(e), e.span));

        let ty = match (&declared, init) {
            _ if self.errors.len() > errors_before => Some(TypeInfo::any()),
            (Some(declared), Some((init, span))) => {
                if !declared.matches(&init) {
                    let message = format!(
                        "cannot initialize '{}' of type '{}' with a value of type '{}'",
                        let_stmt.name.name, declared, init
                    );
                    self.error(SemaErrorKind::TypeMismatch, message, span);
                }
                Some(declared.clone())
            }
            (Some(declared), None) => Some(declared.clone()),
            (None, Some((init, _))) => Some(init),
            (None, None) => None,
        };

        let scope = self.scopes.get_mut(self.current);
        let Some(var) = scope.find_var(&let_stmt.name.name) else {
            self.error(SemaErrorKind::Internal, "variable was not declared in its scope", let_stmt.name.span);
            return;
        };
        // A bare `let x;` leaves an earlier declaration's type alone
        if ty.is_some() {
            scope.vars[var].ty = ty;
        }
        let_stmt.slot = Some(scope.vars[var].slot());
        let_stmt.declared = declared;
    }

    fn bind_if(&mut self, if_stmt: &mut IfStmt) {
        let cond = self.bind_expr(&mut if_stmt.cond);
        self.expect_bool(&cond, if_stmt.cond.span, "condition");
        self.bind_block(&mut if_stmt.then_block);
        match &mut if_stmt.else_branch {
            Some(ElseBranch::Block(block)) => self.bind_block(block),
            Some(ElseBranch::If(nested)) => self.bind_if(nested),
            None => {}
        }
    }

    fn bind_try(&mut self, try_stmt: &mut TryStmt) {
        self.bind_block(&mut try_stmt.body);
        for clause in &mut try_stmt.catches {
            let caught = clause.ty.as_ref().map(|t| self.resolve_type(t));
            let Some(scope) = self.scope_for(clause.body.id, clause.span) else { continue };
            if let Some(var) = self.scopes.get_mut(scope).vars.first_mut() {
                var.ty = Some(caught.clone().unwrap_or_else(TypeInfo::any));
            }
            clause.resolved = caught;
            self.bind_block(&mut clause.body);
        }
    }

    pub(super) fn bind_fn(&mut self, def: &mut FnDef) {
        let Some(func) = def.func else { return };
        let Some(scope) = self.scope_for(def.id, def.span) else { return };
        let ret = self.symbols.functions[func.index()].ret.clone();
        trace!(name = %def.name.name, func = func.0, "bind function body");

        let saved_scope = std::mem::replace(&mut self.current, scope);
        let saved_loops = std::mem::take(&mut self.loop_depth);
        self.functions.push(FnContext { ret, saved_loops });
        self.bind_block(&mut def.body);
        if let Some(ctx) = self.functions.pop() {
            self.loop_depth = ctx.saved_loops;
        }
        self.current = saved_scope;
    }

    fn bind_class(&mut self, def: &mut ClassDef) {
        if let Some(class) = def.class {
            for (i, field) in def.fields.iter_mut().enumerate() {
                let Some(default) = &mut field.default else { continue };
                let ty = self.bind_expr(default);
                let declared = self.symbols.classes[class.index()].fields[i].ty.clone();
                if !declared.matches(&ty) {
                    let message = format!(
                        "default of field '{}' has type '{}', but the field is declared '{}'",
                        field.name.name, ty, declared
                    );
                    self.error(SemaErrorKind::TypeMismatch, message, default.span);
                }
            }
        }
        for method in &mut def.methods {
            self.bind_fn(method);
        }
    }
}
