use fire_ast::*;
use fire_lexer::Span;
use fire_runtime::{RuntimeError, Value};
use tracing::trace;

use super::{Evaluator, ExecResult, Flow, Unwind};

impl<'p> Evaluator<'p> {
    pub(crate) fn exec_stmts(&mut self, stmts: &'p [Stmt]) -> ExecResult<Flow> {
        for stmt in stmts {
            match self.exec_stmt(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    /// Run `block` in a fresh frame below the current one.
    pub(crate) fn exec_block(&mut self, block: &'p Block) -> ExecResult<Flow> {
        let frame = self.frame.child(block.frame_size);
        let mut scoped = self.scoped_frame(frame);
        scoped.exec_stmts(&block.stmts)
    }

    fn exec_stmt(&mut self, stmt: &'p Stmt) -> ExecResult<Flow> {
        match &stmt.kind {
            StmtKind::Let(let_stmt) => {
                self.exec_let(let_stmt, stmt.span)?;
                Ok(Flow::Normal)
            }
            StmtKind::Expr(expr) => {
                self.eval_expr(expr)?;
                Ok(Flow::Normal)
            }
            StmtKind::Block(block) => self.exec_block(block),
            StmtKind::If(if_stmt) => self.exec_if(if_stmt),
            StmtKind::While(while_stmt) => self.exec_while(while_stmt),
            StmtKind::Try(try_stmt) => self.exec_try(try_stmt),
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::None,
                };
                let Some(call) = self.call_stack.last() else {
                    return Err(RuntimeError::internal("'return' outside of a call", stmt.span).into());
                };
                call.frame.set_result(value);
                Ok(Flow::Return)
            }
            StmtKind::Throw(expr) => {
                let value = self.eval_expr(expr)?;
                trace!(value = %value, "throw");
                Err(Unwind::Throw(value, stmt.span))
            }
            StmtKind::Break => Ok(Flow::Break(self.innermost_loop(stmt.span)?)),
            StmtKind::Continue => Ok(Flow::Continue(self.innermost_loop(stmt.span)?)),
            StmtKind::Namespace(ns) => self.exec_namespace(ns, stmt.span),
            // Definitions are resolved statically
            StmtKind::Fn(_) | StmtKind::Class(_) | StmtKind::Enum(_) => Ok(Flow::Normal),
        }
    }

    fn exec_let(&mut self, let_stmt: &'p LetStmt, span: Span) -> ExecResult<()> {
        let slot = let_stmt
            .slot
            .ok_or_else(|| RuntimeError::internal(format!("'{}' has no slot", let_stmt.name.name), span))?;
        let value = match (&let_stmt.init, &let_stmt.declared) {
            (Some(init), _) => self.eval_expr(init)?,
            (None, Some(declared)) => Value::default_for(declared),
            (None, None) => Value::None,
        };
        if let Some(declared) = &let_stmt.declared {
            if !value.conforms_to(declared) {
                let message = format!(
                    "cannot initialize '{}' of type '{}' with a value of type '{}'",
                    let_stmt.name.name,
                    declared,
                    value.type_name()
                );
                return Err(RuntimeError::type_mismatch(message, span).into());
            }
        }
        self.frame.set(slot, value, span)?;
        Ok(())
    }

    fn condition(&mut self, cond: &'p Expr) -> ExecResult<bool> {
        let value = self.eval_expr(cond)?;
        value.as_bool().ok_or_else(|| {
            let message = format!("condition must be 'bool', found '{}'", value.type_name());
            RuntimeError::type_mismatch(message, cond.span).into()
        })
    }

    fn exec_if(&mut self, if_stmt: &'p IfStmt) -> ExecResult<Flow> {
        if self.condition(&if_stmt.cond)? {
            return self.exec_block(&if_stmt.then_block);
        }
        match &if_stmt.else_branch {
            Some(ElseBranch::Block(block)) => self.exec_block(block),
            Some(ElseBranch::If(nested)) => self.exec_if(nested),
            None => Ok(Flow::Normal),
        }
    }

    fn exec_while(&mut self, while_stmt: &'p WhileStmt) -> ExecResult<Flow> {
        let mut scoped = self.scoped_loop(while_stmt.id);
        while scoped.condition(&while_stmt.cond)? {
            match scoped.exec_block(&while_stmt.body)? {
                Flow::Normal => {}
                Flow::Break(id) if id == while_stmt.id => break,
                Flow::Continue(id) if id == while_stmt.id => continue,
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn innermost_loop(&self, span: Span) -> Result<NodeId, RuntimeError> {
        self.loops
            .last()
            .copied()
            .ok_or_else(|| RuntimeError::internal("loop control outside of a loop", span))
    }

    /// Only thrown values are caught; runtime errors pass through.
    fn exec_try(&mut self, try_stmt: &'p TryStmt) -> ExecResult<Flow> {
        let (value, span) = match self.exec_block(&try_stmt.body) {
            Err(Unwind::Throw(value, span)) => (value, span),
            other => return other,
        };

        let clause = try_stmt
            .catches
            .iter()
            .find(|clause| clause.resolved.as_ref().is_none_or(|ty| value.conforms_to(ty)));
        let Some(clause) = clause else {
            trace!(value = %value, "no catch clause matched, rethrow");
            return Err(Unwind::Throw(value, span));
        };

        trace!(name = %clause.name.name, "caught");
        let frame = self.frame.child(clause.body.frame_size.max(1));
        frame.set(0, value, clause.span)?;
        let mut scoped = self.scoped_frame(frame);
        scoped.exec_stmts(&clause.body.stmts)
    }

    /// Same-named sibling namespaces run in one shared frame.
    fn exec_namespace(&mut self, ns: &'p NamespaceDef, span: Span) -> ExecResult<Flow> {
        let key = ns
            .frame_key
            .ok_or_else(|| RuntimeError::internal(format!("namespace '{}' has no frame", ns.name.name), span))?;
        let frame = match self.namespaces.get(&key) {
            Some(frame) if frame.parent().is_some_and(|parent| parent.ptr_eq(&self.frame)) => frame.clone(),
            _ => {
                let frame = self.frame.child(ns.body.frame_size);
                self.namespaces.insert(key, frame.clone());
                frame
            }
        };
        let mut scoped = self.scoped_frame(frame);
        scoped.exec_stmts(&ns.body.stmts)
    }
}

#[cfg(test)]
mod tests {
    use fire_parser::Parser;
    use fire_runtime::{BuiltinTable, Output, RuntimeErrorKind};
    use pretty_assertions::assert_eq;

    use super::*;

    fn run(source: &str) -> Result<String, RuntimeError> {
        let mut program = Parser::parse(source).unwrap();
        let builtins = BuiltinTable::new();
        let bound = fire_sema::bind(&mut program, &builtins).unwrap();
        let mut evaluator = Evaluator::new(&program, &bound, &builtins).with_output(Output::buffer());
        evaluator.run()?;
        Ok(evaluator.output().captured().to_string())
    }

    #[test]
    fn test_uninitialized_let_gets_default() {
        assert_eq!(run("let n: int; let s: string; println(n, \"|\", s, \"|\");").unwrap(), "0||\n");
    }

    #[test]
    fn test_else_if_chain() {
        let source = "let x = 2; if x == 1 { print(\"one\"); } else if x == 2 { print(\"two\"); } else { print(\"many\"); }";
        assert_eq!(run(source).unwrap(), "two");
    }

    #[test]
    fn test_block_variables_do_not_leak() {
        let source = "let x = 1; { let x = 2; print(x); } print(x);";
        assert_eq!(run(source).unwrap(), "21");
    }

    #[test]
    fn test_catch_rethrows_when_no_clause_matches() {
        let source = "try { try { throw \"s\"; } catch e: int { print(\"int\"); } } catch e: string { print(e); }";
        assert_eq!(run(source).unwrap(), "s");
    }

    #[test]
    fn test_runtime_errors_are_not_caught() {
        let err = run("let v = [1]; try { print(v[3]); } catch e { print(\"caught\"); }").unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::IndexOutOfRange);
    }

    #[test]
    fn test_namespace_frame_is_shared() {
        let source = "namespace n { let a = 1; } namespace n { let b = a + 1; print(a, b); }";
        assert_eq!(run(source).unwrap(), "12");
    }
}
