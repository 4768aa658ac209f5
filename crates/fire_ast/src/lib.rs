use fire_lexer::Span;

mod pretty;
mod types;

pub use types::{TypeInfo, TypeKind};

/// Unique identifier for AST nodes
pub type NodeId = u32;

/// Index into the binder's function table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncId(pub u32);

/// Index into the binder's class table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub u32);

/// Index into the binder's enum table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnumId(pub u32);

/// Index into the builtin function table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BuiltinId(pub u32);

impl FuncId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl ClassId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl EnumId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl BuiltinId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A complete Fire program: the top-level block
#[derive(Debug, Clone)]
pub struct Program {
    pub body: Block,
}

/// A block of statements
#[derive(Debug, Clone)]
pub struct Block {
    pub id: NodeId,
    pub stmts: Vec<Stmt>,
    pub span: Span,
    /// Number of variable slots this block's frame needs (set by the binder)
    pub frame_size: usize,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    /// Variable definition: let x: int = 1;
    Let(LetStmt),
    /// Expression statement: f(x);
    Expr(Expr),
    /// Nested block: { ... }
    Block(Block),
    If(IfStmt),
    While(WhileStmt),
    Try(TryStmt),
    Return(Option<Expr>),
    Throw(Expr),
    Break,
    Continue,
    Fn(FnDef),
    Class(ClassDef),
    Enum(EnumDef),
    Namespace(NamespaceDef),
}

/// Variable definition
#[derive(Debug, Clone)]
pub struct LetStmt {
    pub name: Ident,
    pub ty: Option<TypeExpr>,
    pub init: Option<Expr>,
    /// Slot in the current frame (set by the binder)
    pub slot: Option<usize>,
    /// Declared type, used for the default value of uninitialized variables
    pub declared: Option<TypeInfo>,
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub cond: Expr,
    pub then_block: Block,
    pub else_branch: Option<ElseBranch>,
}

/// Else branch - can be a block or another if
#[derive(Debug, Clone)]
pub enum ElseBranch {
    Block(Block),
    If(Box<IfStmt>),
}

#[derive(Debug, Clone)]
pub struct WhileStmt {
    /// Identifies the loop on the evaluator's loop-context stack
    pub id: NodeId,
    pub cond: Expr,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct TryStmt {
    pub body: Block,
    pub catches: Vec<CatchClause>,
}

/// `catch e: T { ... }`. The caught value lives in slot 0 of the body frame.
#[derive(Debug, Clone)]
pub struct CatchClause {
    pub name: Ident,
    pub ty: Option<TypeExpr>,
    pub body: Block,
    pub span: Span,
    pub resolved: Option<TypeInfo>,
}

/// Function definition
#[derive(Debug, Clone)]
pub struct FnDef {
    pub id: NodeId,
    pub name: Ident,
    /// Member functions take `self` as their first parameter
    pub has_self: bool,
    pub params: Vec<Param>,
    pub return_type: Option<TypeExpr>,
    pub body: Block,
    pub span: Span,
    /// Entry in the function table (set during scope construction)
    pub func: Option<FuncId>,
}

/// Function parameter. A variadic parameter (`xs: int...`) must come last.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: Ident,
    pub ty: Option<TypeExpr>,
    pub variadic: bool,
    pub span: Span,
}

/// Class definition
#[derive(Debug, Clone)]
pub struct ClassDef {
    pub name: Ident,
    pub fields: Vec<FieldDef>,
    pub methods: Vec<FnDef>,
    pub span: Span,
    pub class: Option<ClassId>,
}

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: Ident,
    pub ty: Option<TypeExpr>,
    pub default: Option<Expr>,
    pub span: Span,
}

/// Enum definition
#[derive(Debug, Clone)]
pub struct EnumDef {
    pub name: Ident,
    pub variants: Vec<Ident>,
    pub span: Span,
    pub enum_id: Option<EnumId>,
}

/// `namespace name { ... }`. Same-named sibling namespaces share one frame.
#[derive(Debug, Clone)]
pub struct NamespaceDef {
    pub name: Ident,
    pub body: Block,
    /// Key of the merged namespace frame (set by the binder)
    pub frame_key: Option<u32>,
}

/// Expressions
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Integer literal: 42
    IntLiteral(i64),
    /// Size literal: 42u
    SizeLiteral(u64),
    /// Float literal: 3.14
    FloatLiteral(f64),
    /// Boolean literal: true, false
    BoolLiteral(bool),
    /// Char literal: 'a'
    CharLiteral(char),
    /// String literal: "hello"
    StringLiteral(String),
    /// none
    NoneLiteral,
    /// Identifier: foo
    Ident(Ident),
    /// Scope resolution: Color::Red
    ScopeResol(Vec<Ident>),
    /// Array literal: [1, 2, 3]
    Array(Vec<Expr>),
    /// Index expression: arr[idx]
    Index(Box<Expr>, Box<Expr>),
    /// Member access: foo.bar
    Member(Box<Expr>, Ident),
    /// Function call: foo(a, b) or foo(x: a, y: b)
    Call(CallExpr),
    /// Binary operation: a + b
    Binary(Box<Expr>, BinOp, Box<Expr>),
    /// Unary operation: -x, !x, ~x
    Unary(UnaryOp, Box<Expr>),
    /// Assignment: x = expr, x += expr
    Assign(Box<Expr>, Option<BinOp>, Box<Expr>),

    // === Produced by the binder ===
    /// Local variable at a lexical address
    Variable(VarRef),
    /// A single user function
    FuncRef(FuncRef),
    BuiltinRef(Ident, BuiltinId),
    EnumeratorRef(EnumeratorRef),
    EnumName(Ident, EnumId),
    ClassName(Ident, ClassId),
    MemberVariable(Box<Expr>, MemberRef),
    MemberFunction(Box<Expr>, MethodRef),
    /// Member of a builtin type read as a value: `s.length`
    BuiltinMemberVariable(Box<Expr>, BuiltinMemberRef),
    /// Member of a builtin type called with the object as receiver: `v.push(1)`
    BuiltinMemberFunction(Box<Expr>, BuiltinMemberRef),
}

impl ExprKind {
    /// True once the binder has rewritten this node into a resolved kind.
    pub fn is_resolved(&self) -> bool {
        matches!(
            self,
            ExprKind::Variable(_)
                | ExprKind::FuncRef(_)
                | ExprKind::BuiltinRef(..)
                | ExprKind::EnumeratorRef(_)
                | ExprKind::EnumName(..)
                | ExprKind::ClassName(..)
                | ExprKind::MemberVariable(..)
                | ExprKind::MemberFunction(..)
                | ExprKind::BuiltinMemberVariable(..)
                | ExprKind::BuiltinMemberFunction(..)
        )
    }
}

#[derive(Debug, Clone)]
pub struct CallExpr {
    pub callee: Box<Expr>,
    pub args: Vec<CallArg>,
    /// What the call dispatches to (set by the binder)
    pub target: Option<CallTarget>,
}

/// Function call argument - can be positional or named
#[derive(Debug, Clone)]
pub struct CallArg {
    /// If Some, this is a named argument (name: value)
    pub name: Option<Ident>,
    pub value: Expr,
    pub span: Span,
}

/// `distance` counts frames from the current one; `index` is the slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarRef {
    pub name: Ident,
    pub distance: usize,
    pub index: usize,
}

/// `env_distance` counts frames up to the scope the function was declared in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncRef {
    pub name: Ident,
    pub func: FuncId,
    pub env_distance: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumeratorRef {
    pub enum_id: EnumId,
    pub enum_name: String,
    pub name: Ident,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRef {
    pub name: Ident,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRef {
    pub name: Ident,
    pub func: FuncId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinMemberRef {
    pub name: Ident,
    pub builtin: BuiltinId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallTarget {
    Function { func: FuncId, env_distance: usize },
    Builtin(BuiltinId),
    /// Member function; the receiver is the callee's object expression
    Method(FuncId),
    /// Builtin member function, receiver passed as the first argument
    BuiltinMethod(BuiltinId),
    Constructor { class: ClassId, env_distance: usize },
    /// The callee evaluates to a callable value
    Functor,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // Bitwise
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    // Comparison
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    // Logical
    And,
    Or,
}

impl BinOp {
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Or => 1,
            BinOp::And => 2,
            BinOp::BitOr => 3,
            BinOp::BitXor => 4,
            BinOp::BitAnd => 5,
            BinOp::Eq | BinOp::NotEq => 6,
            BinOp::Lt | BinOp::Gt | BinOp::LtEq | BinOp::GtEq => 7,
            BinOp::Shl | BinOp::Shr => 8,
            BinOp::Add | BinOp::Sub => 9,
            BinOp::Mul | BinOp::Div | BinOp::Mod => 10,
        }
    }
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinOp::Add => write!(f, "+"),
            BinOp::Sub => write!(f, "-"),
            BinOp::Mul => write!(f, "*"),
            BinOp::Div => write!(f, "/"),
            BinOp::Mod => write!(f, "%"),
            BinOp::Shl => write!(f, "<<"),
            BinOp::Shr => write!(f, ">>"),
            BinOp::BitAnd => write!(f, "&"),
            BinOp::BitOr => write!(f, "|"),
            BinOp::BitXor => write!(f, "^"),
            BinOp::Eq => write!(f, "=="),
            BinOp::NotEq => write!(f, "!="),
            BinOp::Lt => write!(f, "<"),
            BinOp::Gt => write!(f, ">"),
            BinOp::LtEq => write!(f, "<="),
            BinOp::GtEq => write!(f, ">="),
            BinOp::And => write!(f, "&&"),
            BinOp::Or => write!(f, "||"),
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,    // -
    Not,    // !
    BitNot, // ~
}

impl std::fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOp::Neg => write!(f, "-"),
            UnaryOp::Not => write!(f, "!"),
            UnaryOp::BitNot => write!(f, "~"),
        }
    }
}

/// Type expression: int, vector<int>, function<int, string>, Point
#[derive(Debug, Clone)]
pub struct TypeExpr {
    pub name: Ident,
    pub args: Vec<TypeExpr>,
    pub span: Span,
}

/// Identifier with span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: String, span: Span) -> Self {
        Self { name, span }
    }
}
