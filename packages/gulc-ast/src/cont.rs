use crate::arena::Id;
use crate::decl::Decl;
use crate::expr::Expr;
use crate::span::SourceSpan;

pub type ExprId = Id<Expr>;
pub type DeclId = Id<Decl>;
pub type ContId = Id<ContNode>;

#[derive(Debug, Clone)]
pub struct ContNode {
    pub span: SourceSpan,
    pub kind: ContKind,
}

/// Contract clauses attached to a declaration.
#[derive(Debug, Clone)]
pub enum ContKind {
    Requires { condition: ExprId },
    Ensures { condition: ExprId },
    Throws { exception_type: Option<DeclId> },
    Where { condition: ExprId },
}
