//! Semantic analysis for Fire.
//!
//! `bind` builds the scope tree, resolves every name to a lexical address
//! or symbol, picks overloads and infers static types. The rewritten
//! program can then be run by the evaluator without any name lookup.

pub mod binder;
mod error;
pub mod operators;
pub mod scope;
pub mod symbols;

pub use binder::{Bound, bind};
pub use error::{SemaError, SemaErrorKind};
pub use scope::{LocalVar, Scope, ScopeId, ScopeKind, ScopeTree};
pub use symbols::{ClassSymbol, EnumSymbol, FieldSymbol, FunctionSymbol, ParamSymbol, SymbolTable};
