//! RAII guards for the evaluator's frame, call and loop stacks.
//!
//! A guard holds `&mut Evaluator` and derefs to it, so evaluation continues
//! through the guard. Whatever the guard pushed is restored when it drops,
//! on every exit path including `?` propagation of a throw.

use std::ops::{Deref, DerefMut};

use fire_ast::NodeId;
use fire_runtime::Frame;

use super::{CallEntry, Evaluator};

enum Release {
    /// Restore this frame
    Frame(Frame),
    /// Pop the call stack, then restore this frame
    Call(Frame),
    Loop,
}

pub struct ScopedEvaluator<'g, 'p> {
    evaluator: &'g mut Evaluator<'p>,
    release: Release,
}

impl Drop for ScopedEvaluator<'_, '_> {
    fn drop(&mut self) {
        match &self.release {
            Release::Frame(saved) => self.evaluator.frame = saved.clone(),
            Release::Call(saved) => {
                self.evaluator.call_stack.pop();
                self.evaluator.frame = saved.clone();
            }
            Release::Loop => {
                self.evaluator.loops.pop();
            }
        }
    }
}

impl<'p> Deref for ScopedEvaluator<'_, 'p> {
    type Target = Evaluator<'p>;

    fn deref(&self) -> &Self::Target {
        self.evaluator
    }
}

impl DerefMut for ScopedEvaluator<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.evaluator
    }
}

impl<'p> Evaluator<'p> {
    /// Make `frame` current until the guard drops.
    pub fn scoped_frame(&mut self, frame: Frame) -> ScopedEvaluator<'_, 'p> {
        let saved = std::mem::replace(&mut self.frame, frame);
        ScopedEvaluator { evaluator: self, release: Release::Frame(saved) }
    }

    /// Enter a call: push `entry` and make its argument frame current.
    pub(crate) fn scoped_call(&mut self, entry: CallEntry) -> ScopedEvaluator<'_, 'p> {
        let saved = std::mem::replace(&mut self.frame, entry.frame.clone());
        self.call_stack.push(entry);
        ScopedEvaluator { evaluator: self, release: Release::Call(saved) }
    }

    pub(crate) fn scoped_loop(&mut self, id: NodeId) -> ScopedEvaluator<'_, 'p> {
        self.loops.push(id);
        ScopedEvaluator { evaluator: self, release: Release::Loop }
    }

    /// Run `f` with `frame` current.
    pub fn with_frame<T>(&mut self, frame: Frame, f: impl FnOnce(&mut Evaluator<'p>) -> T) -> T {
        let mut scoped = self.scoped_frame(frame);
        f(&mut *scoped)
    }
}

#[cfg(test)]
mod tests {
    use fire_ast::{FuncId, Program};
    use fire_lexer::Span;
    use fire_runtime::{BuiltinTable, Frame, Value};

    use super::*;

    fn bound_program() -> (Program, fire_sema::Bound) {
        let mut program = fire_parser::Parser::parse("let x = 1;").unwrap();
        let bound = fire_sema::bind(&mut program, &BuiltinTable::new()).unwrap();
        (program, bound)
    }

    #[test]
    fn test_frame_restored_on_drop() {
        let (program, bound) = bound_program();
        let builtins = BuiltinTable::new();
        let mut evaluator = Evaluator::new(&program, &bound, &builtins);
        let root = evaluator.frame.clone();

        let inner = root.child(1);
        evaluator.with_frame(inner.clone(), |ev| {
            assert!(ev.frame.ptr_eq(&inner));
            ev.frame.set(0, Value::Int(3), Span::default()).unwrap();
        });
        assert!(evaluator.frame.ptr_eq(&root));
        assert_eq!(inner.slot(0), Some(Value::Int(3)));
    }

    #[test]
    fn test_call_guard_pops_entry() {
        let (program, bound) = bound_program();
        let builtins = BuiltinTable::new();
        let mut evaluator = Evaluator::new(&program, &bound, &builtins);

        let frame = Frame::root(0);
        {
            let scoped = evaluator.scoped_call(CallEntry { func: FuncId(0), frame, span: Span::default() });
            assert_eq!(scoped.call_depth(), 1);
        }
        assert_eq!(evaluator.call_depth(), 0);
    }
}
