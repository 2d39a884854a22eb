//! P5: checks that every declaration explicitly marked `const`
//! (`common.is_const_expr`) has a type this language actually permits as a
//! compile-time constant.
//!
//! Dispatches over every decl kind (function/namespace/struct/
//! template-function/template-struct/variable) with an early return for a
//! non-const declaration, and skips static struct members. The recursive
//! permissibility check (built-ins, `bool`, one level of pointer/reference,
//! struct/enum) is this crate's own reconstruction of what such a check
//! would reasonably allow.

use gulc_ast::{Ast, DeclId, DeclKind, DeclModifiers, TypeId, TypeKind};
use gulc_diagnostics::FatalError;

use crate::session::Sess;

pub struct ConstTypeResolver<'a> {
    ast: &'a mut Ast,
}

impl<'a> ConstTypeResolver<'a> {
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
            self.process_decl(sess, child, true)?;
        }
        Ok(())
    }

    fn process_decl(&mut self, sess: &mut Sess, decl_id: DeclId, is_global: bool) -> Result<(), FatalError> {
        match &self.ast.decl(decl_id).kind {
            DeclKind::Import { .. } => Ok(()),
            DeclKind::Namespace { .. } => self.process_namespace(sess, decl_id),
            DeclKind::Function(_) | DeclKind::TemplateFunction { .. } => self.process_function(sess, decl_id),
            DeclKind::Struct(_) | DeclKind::TemplateStruct { .. } | DeclKind::TemplateStructInst { .. } => {
                self.process_struct(sess, decl_id)
            }
            DeclKind::Variable { .. } => self.process_variable(sess, decl_id, is_global),
            _ => Ok(()),
        }
    }

    fn process_function(&mut self, sess: &mut Sess, decl_id: DeclId) -> Result<(), FatalError> {
        if !self.ast.decl(decl_id).common.is_const_expr {
            return Ok(());
        }

        let params = self.ast.decl(decl_id).kind.function_body().map(|b| b.parameters.clone()).unwrap_or_default();
        for p in params {
            self.check_decl_type(sess, p)?;
        }

        let return_type = self.ast.decl(decl_id).kind.function_body().and_then(|b| b.return_type);
        if let Some(rt) = return_type {
            self.require_const_permissible(sess, decl_id, rt)?;
        }
        Ok(())
    }

    fn process_struct(&mut self, sess: &mut Sess, decl_id: DeclId) -> Result<(), FatalError> {
        if !self.ast.decl(decl_id).common.is_const_expr {
            return Ok(());
        }

        let bases = self.ast.decl(decl_id).kind.struct_body().map(|b| b.unresolved_bases.clone()).unwrap_or_default();
        for base_ty in bases {
            match &self.ast.ty(base_ty).kind {
                TypeKind::Struct { .. } | TypeKind::TemplateStruct { .. } => {}
                _ => {
                    return Err(FatalError::const_violation(
                        sess.file_path(self.ast.decl(decl_id).common.source_file_id).to_string(),
                        self.ast.ty(base_ty).common.span,
                        "a const struct can only inherit from another struct",
                    ))
                }
            }
        }

        let members = crate::lookup::member_decls(self.ast, decl_id);
        for member in members {
            self.process_decl(sess, member, false)?;
        }
        Ok(())
    }

    fn process_variable(&mut self, sess: &mut Sess, decl_id: DeclId, is_global: bool) -> Result<(), FatalError> {
        let common = &self.ast.decl(decl_id).common;
        let is_static = common.modifiers.contains(DeclModifiers::STATIC);
        let is_const = common.is_const_expr;

        if is_global && !is_const {
            return Ok(());
        }
        if !is_global && is_static {
            return Ok(());
        }

        self.check_decl_type(sess, decl_id)
    }

    fn check_decl_type(&mut self, sess: &mut Sess, decl_id: DeclId) -> Result<(), FatalError> {
        let var_type = match &self.ast.decl(decl_id).kind {
            DeclKind::Variable { var_type, .. } => *var_type,
            DeclKind::Parameter { param_type, .. } => Some(*param_type),
            _ => None,
        };
        match var_type {
            Some(t) => self.require_const_permissible(sess, decl_id, t),
            None => Err(FatalError::const_violation(
                sess.file_path(self.ast.decl(decl_id).common.source_file_id).to_string(),
                self.ast.decl(decl_id).common.span,
                "a const declaration must have an explicit type",
            )),
        }
    }

    fn require_const_permissible(&mut self, sess: &mut Sess, decl_id: DeclId, ty_id: TypeId) -> Result<(), FatalError> {
        if is_const_permissible(self.ast, ty_id) {
            Ok(())
        } else {
            Err(FatalError::const_violation(
                sess.file_path(self.ast.decl(decl_id).common.source_file_id).to_string(),
                self.ast.ty(ty_id).common.span,
                "type is not valid in a `const` context",
            ))
        }
    }
}

fn is_const_permissible(ast: &Ast, ty_id: TypeId) -> bool {
    match &ast.ty(ty_id).kind {
        TypeKind::BuiltIn(_) | TypeKind::Bool | TypeKind::Enum { .. } => true,
        TypeKind::Pointer { nested } | TypeKind::Reference { nested } => is_const_permissible(ast, *nested),
        TypeKind::Struct { decl } => {
            let body = ast.decl(*decl).kind.struct_body();
            body.is_some_and(|b| b.members.iter().all(|&m| match &ast.decl(m).kind {
                DeclKind::Variable { var_type: Some(t), .. } => is_const_permissible(ast, *t),
                _ => true,
            }))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gulc_ast::builder::AstBuilder;
    use gulc_ast::{BuiltInKind, DeclModifiers};

    #[test]
    fn rejects_const_variable_without_type() {
        let mut ast = Ast::new();
        let v = {
            let mut b = AstBuilder::new(&mut ast, 0);
            b.variable("X", None, None)
        };
        ast.decl_mut(v).common.is_const_expr = true;

        let mut sess = Sess::new(vec!["a.lang".into()]);
        let mut pass = ConstTypeResolver::new(&mut ast);
        let err = pass.process_variable(&mut sess, v, true).unwrap_err();
        assert!(matches!(err, FatalError::ConstViolation(_)));
    }

    #[test]
    fn accepts_builtin_const_variable() {
        let mut ast = Ast::new();
        let v = {
            let mut b = AstBuilder::new(&mut ast, 0);
            let ty = b.builtin(BuiltInKind::I32);
            b.variable("X", Some(ty), None)
        };
        ast.decl_mut(v).common.is_const_expr = true;

        let mut sess = Sess::new(vec!["a.lang".into()]);
        let mut pass = ConstTypeResolver::new(&mut ast);
        pass.process_variable(&mut sess, v, true).unwrap();
    }

    #[test]
    fn skips_non_global_static_member() {
        let mut ast = Ast::new();
        let v = {
            let mut b = AstBuilder::new(&mut ast, 0);
            b.variable("X", None, None)
        };
        ast.decl_mut(v).common.modifiers = DeclModifiers::STATIC;

        let mut sess = Sess::new(vec!["a.lang".into()]);
        let mut pass = ConstTypeResolver::new(&mut ast);
        pass.process_variable(&mut sess, v, false).unwrap();
    }
}
