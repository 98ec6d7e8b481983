//! Syntax tree for the analyzed Go subset.
//!
//! Every identifier carries a unique [`IdentId`], which is the key the
//! resolver uses to attach declaration/use objects in `TypeInfo`. Nodes carry
//! spans; source-position ordering of the tree is the ordering the analyzer
//! relies on, so children are stored in source order.

use crate::token::Span;

/// Unique identity of one identifier occurrence, program-wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdentId(pub u32);

/// Allocator for [`IdentId`]s, shared across all files of a program so that
/// resolver tables can be keyed program-wide.
#[derive(Debug, Default)]
pub struct IdentIds {
    next: u32,
}

impl IdentIds {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self) -> IdentId {
        let id = IdentId(self.next);
        self.next += 1;
        id
    }
}

#[derive(Debug, Clone)]
pub struct Ident {
    pub id: IdentId,
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    /// Address-of `&`.
    Addr,
    Not,
    Neg,
    Pos,
    /// Channel receive; parsed but semantically opaque.
    Recv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    AndNot,
    Shl,
    Shr,
    LogAnd,
    LogOr,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl BinOp {
    /// Comparison operators admissible for nil guards.
    #[must_use]
    pub fn is_equality(self) -> bool {
        matches!(self, Self::Eq | Self::NotEq)
    }

    /// Comparison operators admissible for slice-length guards.
    #[must_use]
    pub fn is_ordering_or_equality(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::NotEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LitKind {
    Int,
    Float,
    Char,
    Str,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Ident(Ident),
    Lit {
        kind: LitKind,
        text: String,
        span: Span,
    },
    /// `x.sel`
    Selector {
        x: Box<Expr>,
        sel: Ident,
        span: Span,
    },
    /// `f(args...)`
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },
    /// `*x` — dereference (or pointer type in type position).
    Star {
        x: Box<Expr>,
        span: Span,
    },
    Unary {
        op: UnOp,
        x: Box<Expr>,
        span: Span,
    },
    Binary {
        x: Box<Expr>,
        op: BinOp,
        y: Box<Expr>,
        span: Span,
    },
    /// `x[index]`
    Index {
        x: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },
    /// `x[low:high]` (either bound optional)
    Slice {
        x: Box<Expr>,
        low: Option<Box<Expr>>,
        high: Option<Box<Expr>>,
        span: Span,
    },
    /// `x.(T)`; `typ` is `None` for the `x.(type)` form inside a type switch.
    TypeAssert {
        x: Box<Expr>,
        typ: Option<TypeExpr>,
        span: Span,
    },
    /// `T{elts...}`
    Composite {
        typ: TypeExpr,
        elts: Vec<Expr>,
        span: Span,
    },
    /// `key: value` inside a composite literal.
    KeyValue {
        key: Box<Expr>,
        value: Box<Expr>,
        span: Span,
    },
    Paren {
        x: Box<Expr>,
        span: Span,
    },
    /// A type in value position, e.g. the first argument of `make([]int, 0)`.
    TypeRef {
        typ: TypeExpr,
        span: Span,
    },
}

impl Expr {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Ident(id) => id.span,
            Self::Lit { span, .. }
            | Self::Selector { span, .. }
            | Self::Call { span, .. }
            | Self::Star { span, .. }
            | Self::Unary { span, .. }
            | Self::Binary { span, .. }
            | Self::Index { span, .. }
            | Self::Slice { span, .. }
            | Self::TypeAssert { span, .. }
            | Self::Composite { span, .. }
            | Self::KeyValue { span, .. }
            | Self::Paren { span, .. }
            | Self::TypeRef { span, .. } => *span,
        }
    }
}

/// Type expressions, kept apart from value expressions: the resolver treats
/// them structurally and they never produce guard/use classifications.
#[derive(Debug, Clone)]
pub enum TypeExpr {
    /// `T`
    Name(Ident),
    /// `pkg.T`
    Qualified { pkg: Ident, name: Ident, span: Span },
    /// `*T`
    Pointer { elem: Box<TypeExpr>, span: Span },
    /// `[]T`
    Slice { elem: Box<TypeExpr>, span: Span },
    /// `[N]T`; the length expression is not evaluated.
    Array { elem: Box<TypeExpr>, span: Span },
    /// `map[K]V`
    Map {
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
        span: Span,
    },
    /// `chan T` (any direction); semantically opaque.
    Chan { elem: Box<TypeExpr>, span: Span },
    /// `func(params) results`
    Func { sig: Box<Signature>, span: Span },
    /// `struct { fields }`
    Struct { fields: Vec<FieldGroup>, span: Span },
    /// `interface { methods }`
    Interface { methods: Vec<MethodSpec>, span: Span },
}

impl TypeExpr {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Name(id) => id.span,
            Self::Qualified { span, .. }
            | Self::Pointer { span, .. }
            | Self::Slice { span, .. }
            | Self::Array { span, .. }
            | Self::Map { span, .. }
            | Self::Chan { span, .. }
            | Self::Func { span, .. }
            | Self::Struct { span, .. }
            | Self::Interface { span, .. } => *span,
        }
    }
}

/// One `name1, name2 T` group in a struct, parameter list, or result list.
/// Unnamed parameters/results have an empty `names` list.
#[derive(Debug, Clone)]
pub struct FieldGroup {
    pub names: Vec<Ident>,
    pub typ: TypeExpr,
}

#[derive(Debug, Clone)]
pub struct MethodSpec {
    pub name: Ident,
    pub sig: Signature,
}

#[derive(Debug, Clone)]
pub struct Signature {
    pub params: Vec<FieldGroup>,
    pub results: Vec<FieldGroup>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expr(Expr),
    /// `lhs = rhs` / `lhs := rhs` (multi-assign kept as parallel lists).
    Assign {
        lhs: Vec<Expr>,
        rhs: Vec<Expr>,
        define: bool,
        span: Span,
    },
    /// `x++` / `x--`
    IncDec {
        x: Expr,
        span: Span,
    },
    Var {
        names: Vec<Ident>,
        typ: Option<TypeExpr>,
        values: Vec<Expr>,
        span: Span,
    },
    Return {
        results: Vec<Expr>,
        span: Span,
    },
    Block(Block),
    If {
        init: Option<Box<Stmt>>,
        cond: Expr,
        then: Block,
        els: Option<Box<Stmt>>,
        span: Span,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        post: Option<Box<Stmt>>,
        body: Block,
        span: Span,
    },
    /// `for k, v := range x { ... }`
    Range {
        key: Option<Expr>,
        value: Option<Expr>,
        define: bool,
        x: Expr,
        body: Block,
        span: Span,
    },
    Switch {
        init: Option<Box<Stmt>>,
        tag: Option<Expr>,
        cases: Vec<SwitchCase>,
        span: Span,
    },
    /// `switch bind := subject.(type) { ... }`
    TypeSwitch {
        bind: Option<Ident>,
        subject: Expr,
        cases: Vec<TypeSwitchCase>,
        span: Span,
    },
    /// `go call` / `defer call`
    GoDefer {
        call: Expr,
        span: Span,
    },
    Branch {
        span: Span,
    },
    Empty {
        span: Span,
    },
}

impl Stmt {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Expr(e) => e.span(),
            Self::Block(b) => b.span,
            Self::Assign { span, .. }
            | Self::IncDec { span, .. }
            | Self::Var { span, .. }
            | Self::Return { span, .. }
            | Self::If { span, .. }
            | Self::For { span, .. }
            | Self::Range { span, .. }
            | Self::Switch { span, .. }
            | Self::TypeSwitch { span, .. }
            | Self::GoDefer { span, .. }
            | Self::Branch { span, .. }
            | Self::Empty { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    /// Empty for `default:`.
    pub exprs: Vec<Expr>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TypeSwitchCase {
    /// Empty for `default:`.
    pub types: Vec<TypeExpr>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub name: Ident,
    pub recv: Option<FieldGroup>,
    pub sig: Signature,
    pub body: Option<Block>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TypeSpec {
    pub name: Ident,
    pub alias: bool,
    pub typ: TypeExpr,
}

#[derive(Debug, Clone)]
pub struct ImportSpec {
    /// Local binding name; derived from the path's last segment when no
    /// explicit alias is given.
    pub name: String,
    pub path: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Decl {
    Func(FuncDecl),
    Type(Vec<TypeSpec>),
    Import(Vec<ImportSpec>),
    Var(Vec<Stmt>),
}

/// One parsed source file.
#[derive(Debug, Clone)]
pub struct File {
    pub name: String,
    pub package: Ident,
    pub decls: Vec<Decl>,
}

/// A reference to any statement or expression node during a walk.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Stmt(&'a Stmt),
    Expr(&'a Expr),
}

/// Pre-order traversal of a block, visiting statements and expressions in
/// source order. This is the traversal the guard/use classifier is defined
/// over; positions of visited nodes are monotone within a straight-line
/// statement list but the callback must not assume global monotonicity.
pub fn walk_block<'a>(block: &'a Block, f: &mut impl FnMut(NodeRef<'a>)) {
    for stmt in &block.stmts {
        walk_stmt(stmt, f);
    }
}

pub fn walk_stmt<'a>(stmt: &'a Stmt, f: &mut impl FnMut(NodeRef<'a>)) {
    f(NodeRef::Stmt(stmt));
    match stmt {
        Stmt::Expr(e) | Stmt::IncDec { x: e, .. } | Stmt::GoDefer { call: e, .. } => walk_expr(e, f),
        Stmt::Assign { lhs, rhs, .. } => {
            for e in lhs {
                walk_expr(e, f);
            }
            for e in rhs {
                walk_expr(e, f);
            }
        }
        Stmt::Var { values, .. } => {
            for e in values {
                walk_expr(e, f);
            }
        }
        Stmt::Return { results, .. } => {
            for e in results {
                walk_expr(e, f);
            }
        }
        Stmt::Block(b) => walk_block(b, f),
        Stmt::If {
            init,
            cond,
            then,
            els,
            ..
        } => {
            if let Some(init) = init {
                walk_stmt(init, f);
            }
            walk_expr(cond, f);
            walk_block(then, f);
            if let Some(els) = els {
                walk_stmt(els, f);
            }
        }
        Stmt::For {
            init,
            cond,
            post,
            body,
            ..
        } => {
            if let Some(init) = init {
                walk_stmt(init, f);
            }
            if let Some(cond) = cond {
                walk_expr(cond, f);
            }
            if let Some(post) = post {
                walk_stmt(post, f);
            }
            walk_block(body, f);
        }
        Stmt::Range { key, value, x, body, .. } => {
            if let Some(key) = key {
                walk_expr(key, f);
            }
            if let Some(value) = value {
                walk_expr(value, f);
            }
            walk_expr(x, f);
            walk_block(body, f);
        }
        Stmt::Switch { init, tag, cases, .. } => {
            if let Some(init) = init {
                walk_stmt(init, f);
            }
            if let Some(tag) = tag {
                walk_expr(tag, f);
            }
            for case in cases {
                for e in &case.exprs {
                    walk_expr(e, f);
                }
                for s in &case.body {
                    walk_stmt(s, f);
                }
            }
        }
        Stmt::TypeSwitch { subject, cases, .. } => {
            walk_expr(subject, f);
            for case in cases {
                for s in &case.body {
                    walk_stmt(s, f);
                }
            }
        }
        Stmt::Branch { .. } | Stmt::Empty { .. } => {}
    }
}

pub fn walk_expr<'a>(expr: &'a Expr, f: &mut impl FnMut(NodeRef<'a>)) {
    f(NodeRef::Expr(expr));
    match expr {
        Expr::Ident(_) | Expr::Lit { .. } | Expr::TypeRef { .. } => {}
        Expr::Selector { x, .. } | Expr::Star { x, .. } | Expr::Unary { x, .. } | Expr::Paren { x, .. } => {
            walk_expr(x, f);
        }
        Expr::Call { func, args, .. } => {
            walk_expr(func, f);
            for a in args {
                walk_expr(a, f);
            }
        }
        Expr::Binary { x, y, .. } => {
            walk_expr(x, f);
            walk_expr(y, f);
        }
        Expr::Index { x, index, .. } => {
            walk_expr(x, f);
            walk_expr(index, f);
        }
        Expr::Slice { x, low, high, .. } => {
            walk_expr(x, f);
            if let Some(low) = low {
                walk_expr(low, f);
            }
            if let Some(high) = high {
                walk_expr(high, f);
            }
        }
        Expr::TypeAssert { x, .. } => walk_expr(x, f),
        Expr::Composite { elts, .. } => {
            for e in elts {
                walk_expr(e, f);
            }
        }
        Expr::KeyValue { key, value, .. } => {
            walk_expr(key, f);
            walk_expr(value, f);
        }
    }
}
