//! Pre-P5 constness propagation: P5 needs a fully const-qualified tree, and
//! this is what builds it. A `const`-qualified variable or parameter has its
//! declaration's `is_const_expr` flag raised so P5 can read constness off the
//! decl directly instead of re-deriving it from the type qualifier at every
//! member access.

use gulc_ast::{Ast, DeclId, DeclKind, Qualifier};

pub struct ConstInheriter<'a> {
    ast: &'a mut Ast,
}

impl<'a> ConstInheriter<'a> {
    pub fn new(ast: &'a mut Ast) -> Self {
        Self { ast }
    }

    pub fn run(&mut self, globals: &[DeclId]) {
        for &ns in globals {
            self.walk_namespace(ns);
        }
    }

    fn walk_namespace(&mut self, namespace: DeclId) {
        let nested = match &self.ast.decl(namespace).kind {
            DeclKind::Namespace { nested_decls, .. } => nested_decls.clone(),
            _ => return,
        };
        for child in nested {
            match &self.ast.decl(child).kind {
                DeclKind::Namespace { .. } => self.walk_namespace(child),
                DeclKind::Struct(_) | DeclKind::TemplateStruct { .. } | DeclKind::TemplateStructInst { .. } => {
                    self.walk_struct(child)
                }
                DeclKind::Variable { .. } => self.mark_if_const(child),
                _ => {}
            }
        }
    }

    fn walk_struct(&mut self, strukt: DeclId) {
        let members = crate::lookup::member_decls(self.ast, strukt);
        for member in members {
            if matches!(self.ast.decl(member).kind, DeclKind::Variable { .. }) {
                self.mark_if_const(member);
            }
        }
    }

    fn mark_if_const(&mut self, decl_id: DeclId) {
        let is_const = match &self.ast.decl(decl_id).kind {
            DeclKind::Variable { var_type: Some(t), .. } => self.ast.ty(*t).common.qualifier == Qualifier::Immut,
            _ => false,
        };
        if is_const {
            self.ast.decl_mut(decl_id).common.is_const_expr = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gulc_ast::builder::AstBuilder;
    use gulc_ast::BuiltInKind;

    #[test]
    fn marks_const_qualified_struct_member() {
        let mut ast = Ast::new();
        let strukt = {
            let mut b = AstBuilder::new(&mut ast, 0);
            let s = b.struct_decl("Config");
            let i32_ty = b.builtin(BuiltInKind::I32);
            let field = b.variable("limit", Some(i32_ty), None);
            b.add_struct_member(s, field);
            s
        };
        if let Some(body) = ast.decl(strukt).kind.struct_body() {
            let field = body.members[0];
            let DeclKind::Variable { var_type: Some(t), .. } = &ast.decl(field).kind else { panic!() };
            ast.ty_mut(*t).common.qualifier = Qualifier::Immut;
        }

        let mut pass = ConstInheriter::new(&mut ast);
        pass.walk_struct(strukt);

        let field = ast.decl(strukt).kind.struct_body().unwrap().members[0];
        assert!(ast.decl(field).common.is_const_expr);
    }
}
