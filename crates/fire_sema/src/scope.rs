//! Scope tree construction.
//!
//! One depth-first pass over the program records every lexical scope, every
//! variable slot and every function, class and enum before any name is
//! resolved, so later declarations are visible to earlier code.

use std::fmt::Write as _;

use fire_ast::*;
use fire_lexer::Span;
use rustc_hash::FxHashMap;

use crate::symbols::{ClassSymbol, EnumSymbol, FieldSymbol, FunctionSymbol, ParamSymbol, SymbolTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeKind {
    Block,
    /// Argument slots of a function; its body is the single child block
    Function(FuncId),
    /// Shared by every same-named sibling `namespace` occurrence
    Namespace(String),
}

/// A variable slot
#[derive(Debug, Clone)]
pub struct LocalVar {
    pub name: String,
    /// `None` until the binder deduces it
    pub ty: Option<TypeInfo>,
    pub depth: usize,
    /// Position within the declaring namespace occurrence (or the scope)
    pub index: usize,
    /// Slots taken by earlier occurrences of a merged namespace
    pub index_add: usize,
    pub span: Span,
}

impl LocalVar {
    pub fn slot(&self) -> usize {
        self.index + self.index_add
    }
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub depth: usize,
    pub owner: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    pub vars: Vec<LocalVar>,
    /// Slot offset of the namespace occurrence being declared
    occurrence_base: usize,
}

impl Scope {
    fn new(kind: ScopeKind, depth: usize, owner: Option<ScopeId>) -> Self {
        Self { kind, depth, owner, children: Vec::new(), vars: Vec::new(), occurrence_base: 0 }
    }

    pub fn find_var(&self, name: &str) -> Option<usize> {
        self.vars.iter().position(|v| v.name == name)
    }

    pub fn var_at_slot(&self, slot: usize) -> Option<usize> {
        self.vars.iter().position(|v| v.slot() == slot)
    }

    /// Number of slots a frame for this scope needs.
    pub fn frame_size(&self) -> usize {
        self.vars.iter().map(|v| v.slot() + 1).max().unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    /// Block ids and function definition ids to the scope they introduce
    by_node: FxHashMap<NodeId, ScopeId>,
}

impl ScopeTree {
    /// Build the tree for `program`, registering functions, classes and enums
    /// in `symbols` and writing their ids back into the definitions.
    pub fn build(program: &mut Program, symbols: &mut SymbolTable) -> ScopeTree {
        let mut tree = ScopeTree { scopes: vec![Scope::new(ScopeKind::Block, 0, None)], by_node: FxHashMap::default() };
        tree.by_node.insert(program.body.id, ScopeId(0));
        let mut builder = ScopeBuilder { tree, symbols, current: ScopeId(0) };
        builder.visit_stmts(&mut program.body.stmts);
        builder.tree
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.index()]
    }

    pub fn scope_of(&self, node: NodeId) -> Option<ScopeId> {
        self.by_node.get(&node).copied()
    }

    /// `from` and its owners up to the root, innermost first.
    pub fn chain(&self, from: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(from), move |id| self.get(*id).owner)
    }

    /// Follow `distance` owner links.
    pub fn ancestor(&self, from: ScopeId, distance: usize) -> Option<ScopeId> {
        self.chain(from).nth(distance)
    }

    fn push(&mut self, kind: ScopeKind, owner: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        let depth = self.get(owner).depth + 1;
        self.scopes.push(Scope::new(kind, depth, Some(owner)));
        self.get_mut(owner).children.push(id);
        id
    }

    /// Declare `name` in `scope`; a name already declared there keeps its slot.
    fn declare(&mut self, scope: ScopeId, name: &str, span: Span) -> usize {
        let scope = self.get_mut(scope);
        if let Some(existing) = scope.find_var(name) {
            return scope.vars[existing].slot();
        }
        let base = scope.occurrence_base;
        let index = scope.vars.iter().filter(|v| v.index_add == base).count();
        let var = LocalVar { name: name.to_string(), ty: None, depth: scope.depth, index, index_add: base, span };
        let slot = var.slot();
        scope.vars.push(var);
        slot
    }

    /// Human-readable tree, one scope per line.
    pub fn dump(&self, symbols: &SymbolTable) -> String {
        let mut out = String::new();
        self.dump_scope(self.root(), symbols, &mut out);
        out
    }

    fn dump_scope(&self, id: ScopeId, symbols: &SymbolTable, out: &mut String) {
        let scope = self.get(id);
        let pad = "  ".repeat(scope.depth);
        let kind = match &scope.kind {
            ScopeKind::Block => "block".to_string(),
            ScopeKind::Function(func) => match symbols.function(*func) {
                Some(f) => format!("function {}", f.name),
                None => format!("function #{}", func.0),
            },
            ScopeKind::Namespace(name) => format!("namespace {}", name),
        };
        let _ = writeln!(out, "{}{} (depth {}, {} slots)", pad, kind, scope.depth, scope.frame_size());
        for var in &scope.vars {
            let ty = var.ty.as_ref().map_or_else(|| "?".to_string(), |t| t.to_string());
            let _ = writeln!(out, "{}  [{}] {}: {}", pad, var.slot(), var.name, ty);
        }
        for child in &scope.children {
            self.dump_scope(*child, symbols, out);
        }
    }
}

struct ScopeBuilder<'a> {
    tree: ScopeTree,
    symbols: &'a mut SymbolTable,
    current: ScopeId,
}

impl ScopeBuilder<'_> {
    fn within(&mut self, scope: ScopeId, f: impl FnOnce(&mut Self)) {
        let saved = std::mem::replace(&mut self.current, scope);
        f(self);
        self.current = saved;
    }

    fn visit_stmts(&mut self, stmts: &mut [Stmt]) {
        for stmt in stmts {
            self.visit_stmt(stmt);
        }
    }

    fn visit_block(&mut self, block: &mut Block) {
        let scope = self.tree.push(ScopeKind::Block, self.current);
        self.tree.by_node.insert(block.id, scope);
        self.within(scope, |b| b.visit_stmts(&mut block.stmts));
    }

    fn visit_stmt(&mut self, stmt: &mut Stmt) {
        match &mut stmt.kind {
            StmtKind::Let(let_stmt) => {
                self.tree.declare(self.current, &let_stmt.name.name, let_stmt.name.span);
            }
            StmtKind::Expr(_) | StmtKind::Return(_) | StmtKind::Throw(_) | StmtKind::Break | StmtKind::Continue => {}
            StmtKind::Block(block) => self.visit_block(block),
            StmtKind::If(if_stmt) => self.visit_if(if_stmt),
            StmtKind::While(while_stmt) => self.visit_block(&mut while_stmt.body),
            StmtKind::Try(try_stmt) => {
                self.visit_block(&mut try_stmt.body);
                for clause in &mut try_stmt.catches {
                    let scope = self.tree.push(ScopeKind::Block, self.current);
                    self.tree.by_node.insert(clause.body.id, scope);
                    self.tree.declare(scope, &clause.name.name, clause.name.span);
                    self.within(scope, |b| b.visit_stmts(&mut clause.body.stmts));
                }
            }
            StmtKind::Fn(def) => {
                self.visit_fn(def, None);
            }
            StmtKind::Class(def) => self.visit_class(def),
            StmtKind::Enum(def) => {
                let id = self.symbols.add_enum(EnumSymbol {
                    name: def.name.name.clone(),
                    enumerators: def.variants.iter().map(|v| v.name.clone()).collect(),
                    owner: self.current,
                    span: def.span,
                });
                def.enum_id = Some(id);
            }
            StmtKind::Namespace(ns) => self.visit_namespace(ns),
        }
    }

    fn visit_if(&mut self, if_stmt: &mut IfStmt) {
        self.visit_block(&mut if_stmt.then_block);
        match &mut if_stmt.else_branch {
            Some(ElseBranch::Block(block)) => self.visit_block(block),
            Some(ElseBranch::If(nested)) => self.visit_if(nested),
            None => {}
        }
    }

    fn visit_fn(&mut self, def: &mut FnDef, class: Option<ClassId>) -> FuncId {
        // Parameter types are filled in by the binder once all classes are known
        let params = def
            .params
            .iter()
            .map(|p| ParamSymbol { name: p.name.name.clone(), ty: TypeInfo::any(), variadic: p.variadic, span: p.span })
            .collect();
        let func = self.symbols.add_function(FunctionSymbol {
            name: def.name.name.clone(),
            params,
            ret: TypeInfo::any(),
            has_self: def.has_self,
            class,
            owner: self.current,
            scope: self.current,
            span: def.span,
        });
        def.func = Some(func);

        let scope = self.tree.push(ScopeKind::Function(func), self.current);
        self.tree.by_node.insert(def.id, scope);
        self.symbols.functions[func.index()].scope = scope;
        if def.has_self {
            self.tree.declare(scope, "self", def.name.span);
        }
        for param in &def.params {
            self.tree.declare(scope, &param.name.name, param.span);
        }
        self.within(scope, |b| b.visit_block(&mut def.body));
        func
    }

    fn visit_class(&mut self, def: &mut ClassDef) {
        let fields = def
            .fields
            .iter()
            .map(|f| FieldSymbol { name: f.name.name.clone(), ty: TypeInfo::any(), has_default: f.default.is_some(), span: f.span })
            .collect();
        let class = self.symbols.add_class(ClassSymbol {
            name: def.name.name.clone(),
            fields,
            methods: Vec::new(),
            owner: self.current,
            span: def.span,
        });
        def.class = Some(class);
        for method in &mut def.methods {
            let func = self.visit_fn(method, Some(class));
            self.symbols.classes[class.index()].methods.push(func);
        }
    }

    fn visit_namespace(&mut self, ns: &mut NamespaceDef) {
        let existing = self.tree.get(self.current).children.iter().copied().find(|child| {
            matches!(&self.tree.get(*child).kind, ScopeKind::Namespace(name) if *name == ns.name.name)
        });
        let scope = match existing {
            Some(scope) => {
                let merged = self.tree.get_mut(scope);
                merged.occurrence_base = merged.frame_size();
                scope
            }
            None => self.tree.push(ScopeKind::Namespace(ns.name.name.clone()), self.current),
        };
        self.tree.by_node.insert(ns.body.id, scope);
        self.within(scope, |b| b.visit_stmts(&mut ns.body.stmts));
    }
}
