use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use fire_lexer::Span;

use crate::{RuntimeError, Value};

/// One activation's variable slots, linked to the frame of the enclosing scope.
///
/// Frames are shared handles: closures, instances and the evaluator may all
/// hold the same frame.
#[derive(Clone)]
pub struct Frame(Rc<RefCell<FrameData>>);

struct FrameData {
    slots: Vec<Value>,
    parent: Option<Frame>,
    /// Written by `return`, read back when the call completes
    result: Option<Value>,
}

impl Frame {
    pub fn root(size: usize) -> Self {
        Self::with_parent(None, size)
    }

    /// A new frame whose lexical parent is `self`.
    pub fn child(&self, size: usize) -> Self {
        Self::with_parent(Some(self.clone()), size)
    }

    fn with_parent(parent: Option<Frame>, size: usize) -> Self {
        Frame(Rc::new(RefCell::new(FrameData {
            slots: vec![Value::None; size],
            parent,
            result: None,
        })))
    }

    pub fn parent(&self) -> Option<Frame> {
        self.0.borrow().parent.clone()
    }

    /// Follow `distance` parent links. `None` if the chain is shorter.
    pub fn ancestor(&self, distance: usize) -> Option<Frame> {
        let mut frame = self.clone();
        for _ in 0..distance {
            frame = frame.parent()?;
        }
        Some(frame)
    }

    pub fn len(&self) -> usize {
        self.0.borrow().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read a slot, `None` past the end of the frame.
    pub fn slot(&self, index: usize) -> Option<Value> {
        self.0.borrow().slots.get(index).cloned()
    }

    /// Read a slot the binder addressed. A slot past the end means the
    /// address and the frame size disagree.
    pub fn get(&self, index: usize, span: Span) -> Result<Value, RuntimeError> {
        self.slot(index).ok_or_else(|| self.bad_slot(index, span))
    }

    pub fn set(&self, index: usize, value: Value, span: Span) -> Result<(), RuntimeError> {
        if index >= self.len() {
            return Err(self.bad_slot(index, span));
        }
        self.0.borrow_mut().slots[index] = value;
        Ok(())
    }

    fn bad_slot(&self, index: usize, span: Span) -> RuntimeError {
        RuntimeError::internal(format!("slot {} is out of range for a frame of {} slots", index, self.len()), span)
    }

    pub fn set_result(&self, value: Value) {
        self.0.borrow_mut().result = Some(value);
    }

    pub fn take_result(&self) -> Option<Value> {
        self.0.borrow_mut().result.take()
    }

    pub fn ptr_eq(&self, other: &Frame) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame").field("slots", &self.len()).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RuntimeErrorKind;

    #[test]
    fn test_ancestor_walks_parent_links() {
        let root = Frame::root(1);
        root.set(0, Value::Int(7), Span::default()).unwrap();
        let body = root.child(2).child(0);

        let found = body.ancestor(2).unwrap();
        assert!(found.ptr_eq(&root));
        assert_eq!(found.get(0, Span::default()).unwrap(), Value::Int(7));
        assert!(body.ancestor(3).is_none());
    }

    #[test]
    fn test_out_of_range_slot_is_internal_error() {
        let frame = Frame::root(2);
        assert_eq!(frame.get(1, Span::default()).unwrap(), Value::None);

        let err = frame.get(2, Span::new(4, 5)).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::Internal);
        assert_eq!(err.message, "slot 2 is out of range for a frame of 2 slots");
        assert_eq!(err.span, Span::new(4, 5));

        let err = frame.set(5, Value::Bool(true), Span::default()).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::Internal);
        assert_eq!(frame.len(), 2);
    }

    #[test]
    fn test_result_slot_is_taken_once() {
        let frame = Frame::root(0);
        frame.set_result(Value::Int(42));
        assert_eq!(frame.take_result(), Some(Value::Int(42)));
        assert_eq!(frame.take_result(), None);
    }
}
