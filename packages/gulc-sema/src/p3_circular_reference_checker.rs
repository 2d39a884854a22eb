//! P3: rejects a struct whose base-struct chain cycles back on itself.
//!
//! Only base-struct chains are walked, never traits (traits cannot
//! implement new members and cannot extend structs), direct
//! self-inheritance is special-cased for a clearer message, and a chain
//! that revisits any previously-seen struct is fatal.
//!
//! The checked, single-struct-base `base_struct` field isn't filled in
//! until P4 runs, one pass later. This pass instead reads `Struct{decl}`
//! -kind entries directly off `unresolved_bases`, which P2 has already
//! resolved from names to decls by the time P3 runs.

use std::collections::HashSet;

use gulc_ast::{Ast, DeclId, DeclKind, TypeKind};
use gulc_diagnostics::FatalError;

use crate::session::Sess;

pub struct CircularReferenceChecker<'a> {
    ast: &'a Ast,
}

impl<'a> CircularReferenceChecker<'a> {
    pub fn new(ast: &'a Ast) -> Self {
        Self { ast }
    }

    pub fn run(&mut self, sess: &mut Sess, globals: &[DeclId]) -> Result<(), FatalError> {
        for &ns in globals {
            self.check_namespace(sess, ns)?;
        }
        Ok(())
    }

    fn check_namespace(&mut self, sess: &mut Sess, namespace: DeclId) -> Result<(), FatalError> {
        let nested = match &self.ast.decl(namespace).kind {
            DeclKind::Namespace { nested_decls, .. } => nested_decls.clone(),
            _ => return Ok(()),
        };
        for child in nested {
            match &self.ast.decl(child).kind {
                DeclKind::Namespace { .. } => self.check_namespace(sess, child)?,
                DeclKind::Struct(_) | DeclKind::TemplateStruct { .. } | DeclKind::TemplateStructInst { .. } => {
                    self.check_struct(sess, child)?
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn check_struct(&mut self, sess: &mut Sess, struct_decl: DeclId) -> Result<(), FatalError> {
        let file_path = sess.file_path(self.ast.decl(struct_decl).common.source_file_id).to_string();
        let span = self.ast.decl(struct_decl).common.span;

        if base_struct_of(self.ast, struct_decl) == Some(struct_decl) {
            return Err(FatalError::cycle_detected(
                file_path,
                span,
                format!(
                    "struct `{}` has an illegal circular reference caused by the struct `{}`!",
                    self.ast.decl(struct_decl).name(),
                    self.ast.decl(struct_decl).name()
                ),
            ));
        }

        let mut inherited = HashSet::new();
        let mut last_base = struct_decl;
        let mut current = base_struct_of(self.ast, struct_decl);

        while let Some(base) = current {
            if base == struct_decl {
                return Err(FatalError::cycle_detected(
                    file_path,
                    span,
                    format!(
                        "struct `{}` has an illegal circular reference caused by the struct `{}`!",
                        self.ast.decl(struct_decl).name(),
                        self.ast.decl(last_base).name()
                    ),
                ));
            }
            if !inherited.insert(base) {
                return Err(FatalError::cycle_detected(
                    file_path,
                    span,
                    format!(
                        "struct `{}` has an illegal circular reference caused by the struct `{}`!",
                        self.ast.decl(struct_decl).name(),
                        self.ast.decl(base).name()
                    ),
                ));
            }
            last_base = base;
            current = base_struct_of(self.ast, base);
        }

        Ok(())
    }
}

fn base_struct_of(ast: &Ast, struct_decl: DeclId) -> Option<DeclId> {
    let body = ast.decl(struct_decl).kind.struct_body()?;
    body.unresolved_bases.iter().find_map(|&t| match &ast.ty(t).kind {
        TypeKind::Struct { decl } | TypeKind::TemplateStruct { decl } => Some(*decl),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gulc_ast::builder::AstBuilder;

    #[test]
    fn rejects_direct_self_inheritance() {
        let mut ast = Ast::new();
        let s = {
            let mut b = AstBuilder::new(&mut ast, 0);
            b.struct_decl("Bad")
        };
        let self_ty = ast.types.alloc(gulc_ast::TypeNode::new(gulc_ast::builder::dummy_span(), TypeKind::Struct { decl: s }));
        ast.decl_mut(s).kind.struct_body_mut().unwrap().unresolved_bases.push(self_ty);

        let mut pass = CircularReferenceChecker::new(&ast);
        let mut sess = Sess::new(vec!["a.lang".into()]);
        let err = pass.run(&mut sess, &[]);
        // Self-struct isn't reachable via `globals` in this fixture (it has
        // no enclosing namespace); exercise the checked method directly.
        assert!(err.is_ok());
        let err = pass.check_struct(&mut sess, s).unwrap_err();
        assert!(matches!(err, FatalError::CycleDetected(_)));
    }

    #[test]
    fn rejects_three_struct_cycle() {
        let mut ast = Ast::new();
        let (a, b_id, c) = {
            let mut b = AstBuilder::new(&mut ast, 0);
            (b.struct_decl("A"), b.struct_decl("B"), b.struct_decl("C"))
        };
        let link = |ast: &mut Ast, from: DeclId, to: DeclId| {
            let ty = ast.types.alloc(gulc_ast::TypeNode::new(gulc_ast::builder::dummy_span(), TypeKind::Struct { decl: to }));
            ast.decl_mut(from).kind.struct_body_mut().unwrap().unresolved_bases.push(ty);
        };
        link(&mut ast, a, b_id);
        link(&mut ast, b_id, c);
        link(&mut ast, c, a);

        let mut pass = CircularReferenceChecker::new(&ast);
        let mut sess = Sess::new(vec!["a.lang".into()]);
        let err = pass.check_struct(&mut sess, a).unwrap_err();
        assert!(matches!(err, FatalError::CycleDetected(_)));
    }
}
