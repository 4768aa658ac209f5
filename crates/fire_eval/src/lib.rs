//! Tree-walking evaluator for bound Fire programs.
//!
//! Variables are read through the lexical addresses the binder wrote into
//! the tree: each scope activation gets a [`fire_runtime::Frame`], and a
//! `(distance, index)` pair walks `distance` parent links before indexing a
//! slot. Calls, loops and frames are released through RAII guards so that
//! `return`, `throw` and runtime errors all leave the evaluator balanced.

pub mod args;
mod interpreter;
mod stack;

pub use interpreter::{CallEntry, EvalConfig, Evaluator, MAX_CALL_DEPTH, ScopedEvaluator};
pub use stack::ensure_sufficient_stack;
