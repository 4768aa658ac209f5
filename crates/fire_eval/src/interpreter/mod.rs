//! Tree-walking evaluator over a bound program.

mod call;
mod expr;
mod scope_guard;
mod stmt;

use std::rc::Rc;

use fire_ast::*;
use fire_lexer::Span;
use fire_runtime::{BuiltinTable, ClassLayout, Frame, Output, RuntimeError, RuntimeErrorKind, Value};
use fire_sema::{Bound, SymbolTable};
use rustc_hash::FxHashMap;
use tracing::debug;

pub use scope_guard::ScopedEvaluator;

/// Deepest call nesting before evaluation fails with a stack overflow.
pub const MAX_CALL_DEPTH: usize = 1588;

#[derive(Debug, Clone)]
pub struct EvalConfig {
    pub max_call_depth: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self { max_call_depth: MAX_CALL_DEPTH }
    }
}

/// How a statement finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Normal,
    /// Leave the loop with this id
    Break(NodeId),
    Continue(NodeId),
    /// The result is already in the call's argument frame
    Return,
}

/// Abrupt completion that crosses call boundaries.
#[derive(Debug)]
pub(crate) enum Unwind {
    Throw(Value, Span),
    Error(RuntimeError),
}

impl From<RuntimeError> for Unwind {
    fn from(err: RuntimeError) -> Self {
        Unwind::Error(err)
    }
}

pub(crate) type ExecResult<T> = Result<T, Unwind>;

/// One active user-function call.
#[derive(Debug, Clone)]
pub struct CallEntry {
    pub func: FuncId,
    /// Argument frame; `return` writes the result here
    pub frame: Frame,
    pub span: Span,
}

pub struct Evaluator<'p> {
    program: &'p Program,
    symbols: &'p SymbolTable,
    builtins: &'p BuiltinTable,
    config: EvalConfig,
    functions: FxHashMap<FuncId, &'p FnDef>,
    classes: FxHashMap<ClassId, &'p ClassDef>,
    layouts: FxHashMap<ClassId, Rc<ClassLayout>>,
    /// Current frame; variables are addressed relative to it
    frame: Frame,
    globals: Frame,
    call_stack: Vec<CallEntry>,
    /// Enclosing `while` loops, innermost last
    loops: Vec<NodeId>,
    /// Merged namespace frames by namespace key
    namespaces: FxHashMap<u32, Frame>,
    output: Output,
}

impl<'p> Evaluator<'p> {
    pub fn new(program: &'p Program, bound: &'p Bound, builtins: &'p BuiltinTable) -> Self {
        let mut functions = FxHashMap::default();
        let mut classes = FxHashMap::default();
        index_definitions(&program.body.stmts, &mut functions, &mut classes);

        let layouts = bound
            .symbols
            .classes
            .iter()
            .enumerate()
            .map(|(i, class)| {
                let layout = ClassLayout {
                    name: class.name.clone(),
                    fields: class.fields.iter().map(|f| f.name.clone()).collect(),
                };
                (ClassId(i as u32), Rc::new(layout))
            })
            .collect();

        let globals = Frame::root(program.body.frame_size);
        Self {
            program,
            symbols: &bound.symbols,
            builtins,
            config: EvalConfig::default(),
            functions,
            classes,
            layouts,
            frame: globals.clone(),
            globals,
            call_stack: Vec::new(),
            loops: Vec::new(),
            namespaces: FxHashMap::default(),
            output: Output::default(),
        }
    }

    pub fn with_config(mut self, config: EvalConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_output(mut self, output: Output) -> Self {
        self.output = output;
        self
    }

    /// Execute the top-level statements. An uncaught `throw` is an error.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        debug!(slots = self.globals.len(), "run program");
        let program = self.program;
        match self.exec_stmts(&program.body.stmts) {
            Ok(_) => Ok(()),
            Err(Unwind::Error(err)) => Err(err),
            Err(Unwind::Throw(value, span)) => Err(RuntimeError::new(
                RuntimeErrorKind::UncaughtThrow,
                format!("uncaught exception: {}", value),
                span,
            )),
        }
    }

    /// A top-level variable by slot.
    pub fn global(&self, slot: usize) -> Option<Value> {
        self.globals.slot(slot)
    }

    pub fn call_depth(&self) -> usize {
        self.call_stack.len()
    }

    pub fn output(&self) -> &Output {
        &self.output
    }

    pub fn into_output(self) -> Output {
        self.output
    }

    /// The frame `distance` links above the current one.
    fn frame_at(&self, distance: usize, span: Span) -> Result<Frame, RuntimeError> {
        self.frame
            .ancestor(distance)
            .ok_or_else(|| RuntimeError::internal(format!("no frame {} levels up", distance), span))
    }
}

fn index_definitions<'p>(
    stmts: &'p [Stmt],
    functions: &mut FxHashMap<FuncId, &'p FnDef>,
    classes: &mut FxHashMap<ClassId, &'p ClassDef>,
) {
    for stmt in stmts {
        match &stmt.kind {
            StmtKind::Fn(def) => {
                if let Some(func) = def.func {
                    functions.insert(func, def);
                }
                index_definitions(&def.body.stmts, functions, classes);
            }
            StmtKind::Class(def) => {
                if let Some(class) = def.class {
                    classes.insert(class, def);
                }
                for method in &def.methods {
                    if let Some(func) = method.func {
                        functions.insert(func, method);
                    }
                    index_definitions(&method.body.stmts, functions, classes);
                }
            }
            StmtKind::Block(block) => index_definitions(&block.stmts, functions, classes),
            StmtKind::While(while_stmt) => index_definitions(&while_stmt.body.stmts, functions, classes),
            StmtKind::If(if_stmt) => {
                let mut branch = Some(if_stmt);
                while let Some(current) = branch {
                    index_definitions(&current.then_block.stmts, functions, classes);
                    branch = match &current.else_branch {
                        Some(ElseBranch::Block(block)) => {
                            index_definitions(&block.stmts, functions, classes);
                            None
                        }
                        Some(ElseBranch::If(nested)) => Some(&**nested),
                        None => None,
                    };
                }
            }
            StmtKind::Try(try_stmt) => {
                index_definitions(&try_stmt.body.stmts, functions, classes);
                for clause in &try_stmt.catches {
                    index_definitions(&clause.body.stmts, functions, classes);
                }
            }
            StmtKind::Namespace(ns) => index_definitions(&ns.body.stmts, functions, classes),
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
