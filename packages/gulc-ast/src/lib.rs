//! The AST data model: an arena of nodes tagged by one of seven
//! top-level kinds (Attribute, Contract, Declaration, Expression, Identifier,
//! Statement, Type), each carrying a source position pair.
//!
//! Ownership rule: each node exclusively owns its sub-nodes (modeled as
//! owning-indexed children into the arena of the relevant kind); `container`,
//! `originalDecl`, and a type's resolved `decl` are weak, lookup-only
//! back-references — bare ids with no ownership implied.

pub mod arena;
pub mod attr;
pub mod builder;
pub mod cont;
pub mod decl;
pub mod expr;
pub mod ident;
pub mod modifiers;
pub mod span;
pub mod stmt;
pub mod ty;

pub use arena::{Arena, Id};
pub use attr::{AttrId, AttrKind, AttrNode};
pub use cont::{ContId, ContKind, ContNode};
pub use decl::{Decl, DeclCommon, DeclId, DeclKind, EnumBody, FunctionBody, StructBody, TraitBody};
pub use expr::{AssignOp, Expr, ExprCommon, ExprId, ExprKind, InfixOp, PostfixOp, PrefixOp};
pub use ident::Identifier;
pub use modifiers::{DeclModifiers, Qualifier, Visibility};
pub use span::{SourceSpan, TextPosition};
pub use stmt::{StmtId, StmtKind, StmtNode};
pub use ty::{BuiltInKind, TypeId, TypeKind, TypeNode};

/// One parsed source file, as delivered by the (out-of-scope) parser
/// collaborator.
#[derive(Debug, Clone)]
pub struct AstFile {
    pub source_file_id: u32,
    pub path: String,
    pub top_level_decls: Vec<DeclId>,
    /// Filled in by P1 as it scans top-level `Import` decls.
    pub imports: Vec<DeclId>,
}

impl AstFile {
    pub fn new(source_file_id: u32, path: impl Into<String>) -> Self {
        Self { source_file_id, path: path.into(), top_level_decls: Vec::new(), imports: Vec::new() }
    }
}

/// The whole-program arena: every file's declarations, statements,
/// expressions, types, attributes and contracts live here, addressed by
/// stable indices rather than owned pointers.
#[derive(Debug, Default)]
pub struct Ast {
    pub decls: Arena<Decl>,
    pub stmts: Arena<StmtNode>,
    pub exprs: Arena<Expr>,
    pub types: Arena<TypeNode>,
    pub attrs: Arena<AttrNode>,
    pub conts: Arena<ContNode>,
    pub files: Vec<AstFile>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decl(&self, id: DeclId) -> &Decl {
        self.decls.get(id)
    }

    pub fn decl_mut(&mut self, id: DeclId) -> &mut Decl {
        self.decls.get_mut(id)
    }

    pub fn ty(&self, id: TypeId) -> &TypeNode {
        self.types.get(id)
    }

    pub fn ty_mut(&mut self, id: TypeId) -> &mut TypeNode {
        self.types.get_mut(id)
    }

    pub fn expr(&self, id: ExprId) -> &Expr {
        self.exprs.get(id)
    }

    pub fn expr_mut(&mut self, id: ExprId) -> &mut Expr {
        self.exprs.get_mut(id)
    }

    pub fn stmt(&self, id: StmtId) -> &StmtNode {
        self.stmts.get(id)
    }

    pub fn stmt_mut(&mut self, id: StmtId) -> &mut StmtNode {
        self.stmts.get_mut(id)
    }
}
