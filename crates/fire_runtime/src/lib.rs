//! Runtime value model for the Fire evaluator: tagged values, variable
//! frames, primitive operators and the builtin function table.

mod builtins;
mod error;
mod frame;
pub mod ops;
mod output;
mod value;

pub use builtins::{Builtin, BuiltinFn, BuiltinParams, BuiltinTable, CallContext, MemberKind};
pub use error::{RuntimeError, RuntimeErrorKind};
pub use frame::Frame;
pub use output::Output;
pub use value::{Callable, ClassLayout, EnumeratorValue, Instance, Value};
