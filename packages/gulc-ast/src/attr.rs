use crate::arena::Id;
use crate::decl::Decl;
use crate::span::SourceSpan;

pub type DeclId = Id<Decl>;
pub type AttrId = Id<AttrNode>;

#[derive(Debug, Clone)]
pub struct AttrNode {
    pub span: SourceSpan,
    pub kind: AttrKind,
}

#[derive(Debug, Clone)]
pub enum AttrKind {
    Copy,
    /// References a resolved `AttributeDecl`.
    Custom { decl: DeclId, arguments: Vec<String> },
    /// An attribute name that didn't resolve to a known `AttributeDecl`;
    /// produces a non-fatal warning rather than a fatal error.
    Unresolved { name: String },
    Pod,
}
