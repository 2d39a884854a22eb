//! P4: turns a struct/trait's resolved base-list types into its
//! `base_struct`/`base_traits` fields.
//!
//! A second struct base is rejected outright (single-inheritance only), a
//! re-entry guard makes processing an already-processed struct a no-op
//! (template instantiations reuse the same body and must not be
//! re-checked), and a struct requires its own resolution to be complete
//! before dependents can see it.

use gulc_ast::{Ast, DeclId, DeclKind, TypeKind};
use gulc_diagnostics::FatalError;

use crate::session::Sess;

pub struct BaseResolver<'a> {
    ast: &'a mut Ast,
}

impl<'a> BaseResolver<'a> {
    pub fn new(ast: &'a mut Ast) -> Self {
        Self { ast }
    }

    pub fn run(&mut self, sess: &mut Sess, globals: &[DeclId]) -> Result<(), FatalError> {
        for &ns in globals {
            self.process_namespace(sess, ns)?;
        }
        Ok(())
    }

    fn process_namespace(&mut self, sess: &mut Sess, namespace: DeclId) -> Result<(), FatalError> {
        let nested = match &self.ast.decl(namespace).kind {
            DeclKind::Namespace { nested_decls, .. } => nested_decls.clone(),
            _ => return Ok(()),
        };
        for child in nested {
            match &self.ast.decl(child).kind {
                DeclKind::Namespace { .. } => self.process_namespace(sess, child)?,
                DeclKind::Struct(_) | DeclKind::TemplateStruct { .. } | DeclKind::TemplateStructInst { .. } => {
                    self.process_struct(sess, child)?
                }
                DeclKind::Trait(_) | DeclKind::TemplateTrait { .. } | DeclKind::TemplateTraitInst { .. } => {
                    self.process_trait(sess, child)?
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn process_struct(&mut self, sess: &mut Sess, struct_decl: DeclId) -> Result<(), FatalError> {
        if self.ast.decl(struct_decl).kind.struct_body().map(|b| b.base_was_resolved).unwrap_or(true) {
            return Ok(());
        }

        let file_path = sess.file_path(self.ast.decl(struct_decl).common.source_file_id).to_string();
        let inherited: Vec<gulc_ast::TypeId> =
            self.ast.decl(struct_decl).kind.struct_body().unwrap().unresolved_bases.clone();

        for ty_id in inherited {
            let span = self.ast.ty(ty_id).common.span;
            match self.ast.ty(ty_id).kind.clone() {
                TypeKind::Struct { decl } | TypeKind::TemplateStruct { decl } => {
                    let already = self.ast.decl(struct_decl).kind.struct_body().unwrap().base_struct;
                    if already.is_some() {
                        return Err(FatalError::internal_invariant(
                            file_path,
                            span,
                            "inheriting from multiple structs/classes is not supported",
                        ));
                    }
                    self.ast.decl_mut(struct_decl).kind.struct_body_mut().unwrap().base_struct = Some(decl);
                }
                TypeKind::Trait { decl } | TypeKind::TemplateTrait { decl } => {
                    self.ast.decl_mut(struct_decl).kind.struct_body_mut().unwrap().base_traits.push(decl);
                }
                _ => {
                    return Err(FatalError::unresolved_reference(
                        file_path,
                        span,
                        "base-list entry did not resolve to a struct or trait",
                    ));
                }
            }
        }

        self.ast.decl_mut(struct_decl).kind.struct_body_mut().unwrap().base_was_resolved = true;
        Ok(())
    }

    fn process_trait(&mut self, sess: &mut Sess, trait_decl: DeclId) -> Result<(), FatalError> {
        let file_path = sess.file_path(self.ast.decl(trait_decl).common.source_file_id).to_string();
        let unresolved_bases = match &self.ast.decl(trait_decl).kind {
            DeclKind::Trait(body) | DeclKind::TemplateTraitInst { body, .. } => body.unresolved_bases.clone(),
            DeclKind::TemplateTrait { body, .. } => body.unresolved_bases.clone(),
            _ => return Ok(()),
        };

        for ty_id in unresolved_bases {
            let span = self.ast.ty(ty_id).common.span;
            match self.ast.ty(ty_id).kind.clone() {
                TypeKind::Trait { decl } | TypeKind::TemplateTrait { decl } => {
                    push_trait_base(&mut self.ast.decl_mut(trait_decl).kind, decl);
                }
                _ => {
                    return Err(FatalError::unresolved_reference(
                        file_path,
                        span,
                        "a trait can only extend other traits",
                    ));
                }
            }
        }
        Ok(())
    }
}

fn push_trait_base(kind: &mut DeclKind, base: DeclId) {
    match kind {
        DeclKind::Trait(body) | DeclKind::TemplateTrait { body, .. } | DeclKind::TemplateTraitInst { body, .. } => {
            body.base_traits.push(base);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gulc_ast::builder::AstBuilder;

    #[test]
    fn rejects_second_struct_base() {
        let mut ast = Ast::new();
        let (a, b_id, c) = {
            let mut b = AstBuilder::new(&mut ast, 0);
            (b.struct_decl("A"), b.struct_decl("B"), b.struct_decl("C"))
        };
        let ty_b = ast.types.alloc(gulc_ast::TypeNode::new(gulc_ast::builder::dummy_span(), TypeKind::Struct { decl: b_id }));
        let ty_c = ast.types.alloc(gulc_ast::TypeNode::new(gulc_ast::builder::dummy_span(), TypeKind::Struct { decl: c }));
        ast.decl_mut(a).kind.struct_body_mut().unwrap().unresolved_bases.push(ty_b);
        ast.decl_mut(a).kind.struct_body_mut().unwrap().unresolved_bases.push(ty_c);

        let mut sess = Sess::new(vec!["a.lang".into()]);
        let mut pass = BaseResolver::new(&mut ast);
        let err = pass.process_struct(&mut sess, a).unwrap_err();
        assert!(matches!(err, FatalError::InternalInvariant(_)));
    }

    #[test]
    fn single_struct_base_and_traits_are_recorded() {
        let mut ast = Ast::new();
        let (a, base, t) = {
            let mut b = AstBuilder::new(&mut ast, 0);
            (b.struct_decl("A"), b.struct_decl("Base"), b.trait_decl("Drawable"))
        };
        let ty_base = ast.types.alloc(gulc_ast::TypeNode::new(gulc_ast::builder::dummy_span(), TypeKind::Struct { decl: base }));
        let ty_trait = ast.types.alloc(gulc_ast::TypeNode::new(gulc_ast::builder::dummy_span(), TypeKind::Trait { decl: t }));
        ast.decl_mut(a).kind.struct_body_mut().unwrap().unresolved_bases.push(ty_base);
        ast.decl_mut(a).kind.struct_body_mut().unwrap().unresolved_bases.push(ty_trait);

        let mut sess = Sess::new(vec!["a.lang".into()]);
        let mut pass = BaseResolver::new(&mut ast);
        pass.process_struct(&mut sess, a).unwrap();

        let body = ast.decl(a).kind.struct_body().unwrap();
        assert_eq!(body.base_struct, Some(base));
        assert_eq!(body.base_traits, vec![t]);
        assert!(body.base_was_resolved);
    }
}
