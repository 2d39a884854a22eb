use crate::arena::Id;
use crate::decl::Decl;
use crate::expr::Expr;
use crate::span::SourceSpan;

pub type StmtId = Id<StmtNode>;
pub type ExprId = Id<Expr>;
pub type DeclId = Id<Decl>;

#[derive(Debug, Clone, Copy)]
pub struct StmtCommon {
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct StmtNode {
    pub common: StmtCommon,
    pub kind: StmtKind,
}

impl StmtNode {
    pub fn new(span: SourceSpan, kind: StmtKind) -> Self {
        Self { common: StmtCommon { span }, kind }
    }
}

#[derive(Debug, Clone)]
pub struct CatchClause {
    /// `let name: Type` binding, absent for a catch-all.
    pub binding: Option<(String, crate::ty::TypeId)>,
    pub body: StmtId,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Break { label: Option<String> },
    Case { condition: Option<ExprId>, body: Vec<StmtId> },
    Catch(CatchClause),
    /// An expression used as a statement — a bare call, an assignment, or a
    /// `let` binding (`VariableDecl` expr) at statement position. GULC's own
    /// `Stmt` hierarchy makes `Expr` a statement subtype directly
    /// (`Stmt::Kind::Expr`); this crate keeps expressions and statements as
    /// separate top-level kinds and bridges them with this one
    /// wrapper variant instead.
    Expr(ExprId),
    /// A braced block. Owns its statement sequence.
    Compound { statements: Vec<StmtId> },
    Continue { label: Option<String> },
    /// `do { } while (cond)` — GULC's low-level `DoStmt` for a plain `do` block
    /// wrapped by `DoWhileStmt` once a trailing `while` is attached.
    Do { body: StmtId },
    DoCatch { body: StmtId, catches: Vec<StmtId> },
    DoWhile { body: StmtId, condition: ExprId },
    Fallthrough,
    For {
        init: Option<StmtId>,
        condition: Option<ExprId>,
        increment: Option<ExprId>,
        body: StmtId,
    },
    Goto {
        label: String,
        /// Destructor calls inserted by P7 for locals going out of scope
        /// between this `goto` and its target ("Destruction
        /// semantics"), built in reverse declaration order.
        pre_goto_deferred: Vec<ExprId>,
    },
    If {
        condition: ExprId,
        then_body: StmtId,
        else_body: Option<StmtId>,
    },
    Labeled {
        label: String,
        body: StmtId,
        /// Ambient local-variable count at the label site, so a `goto` back
        /// to this label can roll back the scope correctly.
        local_variable_count: usize,
    },
    Return {
        value: Option<ExprId>,
        pre_return_deferred: Vec<ExprId>,
    },
    Switch {
        condition: ExprId,
        cases: Vec<StmtId>,
    },
    While {
        condition: ExprId,
        body: StmtId,
    },
}
