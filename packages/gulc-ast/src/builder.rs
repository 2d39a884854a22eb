//! Hand-construction helpers for building small ASTs directly, without a
//! parser (the parser is treated as an out-of-scope
//! collaborator). Used by `gulc-sema`'s pass unit tests and by the driver
//! crate's input-builder API when there is no real front end attached.

use smallvec::SmallVec;

use crate::decl::{Decl, DeclCommon, DeclKind, EnumBody, FunctionBody, StructBody, TemplateParameterKind, TraitBody};
use crate::expr::{ConstructorKind, Expr, ExprKind, LiteralType, ValueLiteral};
use crate::ident::Identifier;
use crate::modifiers::{DeclModifiers, Visibility};
use crate::span::{SourceSpan, TextPosition};
use crate::stmt::{StmtKind, StmtNode};
use crate::ty::{BuiltInKind, TypeKind, TypeNode};
use crate::{Ast, DeclId, ExprId, StmtId, TypeId};

/// A span with no real source location, for hand-built fixtures.
pub fn dummy_span() -> SourceSpan {
    SourceSpan::new(TextPosition::default(), TextPosition::default())
}

pub struct AstBuilder<'a> {
    pub ast: &'a mut Ast,
    pub source_file_id: u32,
}

impl<'a> AstBuilder<'a> {
    pub fn new(ast: &'a mut Ast, source_file_id: u32) -> Self {
        Self { ast, source_file_id }
    }

    fn ident(&self, name: &str) -> Identifier {
        Identifier::new(dummy_span(), name)
    }

    fn common(&self, name: &str) -> DeclCommon {
        DeclCommon::new(dummy_span(), self.source_file_id, self.ident(name))
    }

    pub fn ty(&mut self, kind: TypeKind) -> TypeId {
        self.ast.types.alloc(TypeNode::new(dummy_span(), kind))
    }

    pub fn builtin(&mut self, kind: BuiltInKind) -> TypeId {
        self.ty(TypeKind::BuiltIn(kind))
    }

    pub fn unresolved_type(&mut self, path: &[&str]) -> TypeId {
        self.ty(TypeKind::Unresolved(crate::ty::UnresolvedPath {
            namespace_path: path[..path.len().saturating_sub(1)].iter().map(|s| s.to_string()).collect(),
            identifier: path.last().copied().unwrap_or_default().to_string(),
            template_arguments: SmallVec::new(),
        }))
    }

    pub fn unresolved_templated_type(&mut self, path: &[&str], template_arguments: Vec<ExprId>) -> TypeId {
        self.ty(TypeKind::Unresolved(crate::ty::UnresolvedPath {
            namespace_path: path[..path.len().saturating_sub(1)].iter().map(|s| s.to_string()).collect(),
            identifier: path.last().copied().unwrap_or_default().to_string(),
            template_arguments: template_arguments.into(),
        }))
    }

    pub fn expr(&mut self, kind: ExprKind) -> ExprId {
        self.ast.exprs.alloc(Expr::new(dummy_span(), kind))
    }

    pub fn int_literal(&mut self, value: i64) -> ExprId {
        self.expr(ExprKind::ValueLiteral(ValueLiteral {
            literal_type: LiteralType::Integer,
            value: value.to_string(),
            suffix: None,
        }))
    }

    pub fn int_literal_suffixed(&mut self, value: i64, suffix: &str) -> ExprId {
        self.expr(ExprKind::ValueLiteral(ValueLiteral {
            literal_type: LiteralType::Integer,
            value: value.to_string(),
            suffix: Some(suffix.to_string()),
        }))
    }

    pub fn identifier_expr(&mut self, path: &[&str]) -> ExprId {
        self.expr(ExprKind::Identifier {
            path: path.iter().map(|s| s.to_string()).collect(),
            template_arguments: SmallVec::new(),
        })
    }

    pub fn type_expr(&mut self, ty: TypeId) -> ExprId {
        self.expr(ExprKind::Type(ty))
    }

    pub fn stmt(&mut self, kind: StmtKind) -> StmtId {
        self.ast.stmts.alloc(StmtNode::new(dummy_span(), kind))
    }

    pub fn return_stmt(&mut self, value: Option<ExprId>) -> StmtId {
        self.stmt(StmtKind::Return { value, pre_return_deferred: Vec::new() })
    }

    pub fn compound(&mut self, statements: Vec<StmtId>) -> StmtId {
        self.stmt(StmtKind::Compound { statements })
    }

    pub fn expr_stmt(&mut self, expr: ExprId) -> StmtId {
        self.stmt(StmtKind::Expr(expr))
    }

    pub fn goto_stmt(&mut self, label: &str) -> StmtId {
        self.stmt(StmtKind::Goto { label: label.to_string(), pre_goto_deferred: Vec::new() })
    }

    pub fn labeled(&mut self, label: &str, body: StmtId, local_variable_count: usize) -> StmtId {
        self.stmt(StmtKind::Labeled { label: label.to_string(), body, local_variable_count })
    }

    pub fn decl(&mut self, common: DeclCommon, kind: DeclKind) -> DeclId {
        self.ast.decls.alloc(Decl::new(common, kind))
    }

    pub fn namespace(&mut self, name: &str) -> DeclId {
        self.decl(self.common(name), DeclKind::Namespace { nested_decls: Vec::new(), prototype: None })
    }

    pub fn add_nested(&mut self, namespace: DeclId, member: DeclId) {
        if let DeclKind::Namespace { nested_decls, .. } = &mut self.ast.decl_mut(namespace).kind {
            nested_decls.push(member);
        }
        self.ast.decl_mut(member).common.container = Some(namespace);
    }

    pub fn parameter(&mut self, label: Option<&str>, param_type: TypeId) -> DeclId {
        let name = label.unwrap_or("_");
        self.decl(
            self.common(name),
            DeclKind::Parameter {
                argument_label: label.map(|s| s.to_string()),
                param_type,
                default_value: None,
            },
        )
    }

    pub fn function(&mut self, name: &str, parameters: Vec<DeclId>, return_type: Option<TypeId>, body: Option<StmtId>) -> DeclId {
        let common = self.common(name);
        let decl_id = self.decl(
            common,
            DeclKind::Function(FunctionBody { parameters: parameters.clone(), return_type, contracts: Vec::new(), body }),
        );
        for p in parameters {
            self.ast.decl_mut(p).common.container = Some(decl_id);
        }
        decl_id
    }

    pub fn variable(&mut self, name: &str, var_type: Option<TypeId>, initializer: Option<ExprId>) -> DeclId {
        self.decl(self.common(name), DeclKind::Variable { var_type, initializer })
    }

    pub fn struct_decl(&mut self, name: &str) -> DeclId {
        self.decl(self.common(name), DeclKind::Struct(StructBody::default()))
    }

    pub fn template_struct(&mut self, name: &str, template_parameters: Vec<DeclId>) -> DeclId {
        let decl_id = self.decl(
            self.common(name),
            DeclKind::TemplateStruct { body: StructBody::default(), template_parameters: template_parameters.clone() },
        );
        for p in template_parameters {
            self.ast.decl_mut(p).common.container = Some(decl_id);
        }
        decl_id
    }

    pub fn template_parameter_typename(&mut self, name: &str) -> DeclId {
        self.decl(self.common(name), DeclKind::TemplateParameter(TemplateParameterKind::Typename { default: None }))
    }

    pub fn template_parameter_const(&mut self, name: &str, const_type: TypeId) -> DeclId {
        self.decl(
            self.common(name),
            DeclKind::TemplateParameter(TemplateParameterKind::Const { const_type, default: None }),
        )
    }

    pub fn add_struct_member(&mut self, strukt: DeclId, member: DeclId) {
        if let Some(body) = self.ast.decl_mut(strukt).kind.struct_body_mut() {
            body.members.push(member);
        }
        self.ast.decl_mut(member).common.container = Some(strukt);
    }

    pub fn set_struct_base(&mut self, strukt: DeclId, base: TypeId) {
        if let Some(body) = self.ast.decl_mut(strukt).kind.struct_body_mut() {
            body.unresolved_bases.push(base);
        }
    }

    pub fn trait_decl(&mut self, name: &str) -> DeclId {
        self.decl(self.common(name), DeclKind::Trait(TraitBody::default()))
    }

    pub fn enum_decl(&mut self, name: &str) -> DeclId {
        self.decl(self.common(name), DeclKind::Enum(EnumBody::default()))
    }

    pub fn constructor(&mut self, kind: ConstructorKind, parameters: Vec<DeclId>, body: Option<StmtId>) -> DeclId {
        self.decl(
            self.common("init"),
            DeclKind::Constructor { kind, body: FunctionBody { parameters, return_type: None, contracts: Vec::new(), body } },
        )
    }

    pub fn visibility(&mut self, decl: DeclId, visibility: Visibility) {
        self.ast.decl_mut(decl).common.visibility = visibility;
    }

    pub fn modifiers(&mut self, decl: DeclId, modifiers: DeclModifiers) {
        self.ast.decl_mut(decl).common.modifiers = modifiers;
    }
}
