//! P1: merges per-file namespace fragments into a project-wide namespace
//! graph. Prototype lookup is siblings-first at the current nesting level,
//! creating a new prototype node only on miss, and non-namespace children
//! are appended directly into the prototype's nested-decl list while
//! namespace children recurse with the newly selected prototype as the new
//! parent.

use gulc_ast::{Ast, DeclId, DeclKind};
use indexmap::IndexMap;

pub struct NamespacePrototyper<'a> {
    ast: &'a mut Ast,
    /// `(parent prototype, name) -> prototype`, keyed the same way
    /// `get_namespace_prototype` searches siblings; insertion order mirrors
    /// first-seen order so diagnostics and mangling see namespaces in a
    /// stable, source-derived sequence rather than sibling-scan order.
    seen: IndexMap<(Option<DeclId>, String), DeclId>,
}

impl<'a> NamespacePrototyper<'a> {
    pub fn new(ast: &'a mut Ast) -> Self {
        Self { ast, seen: IndexMap::new() }
    }

    /// Returns the top-level prototype namespaces (one per distinct
    /// top-level dotted path root).
    pub fn run(&mut self, file_decls: &[Vec<DeclId>]) -> Vec<DeclId> {
        let mut result: Vec<DeclId> = Vec::new();

        for decls in file_decls {
            for &decl_id in decls {
                if matches!(self.ast.decl(decl_id).kind, DeclKind::Namespace { .. }) {
                    self.generate_namespace_decl(&mut result, None, decl_id);
                }
                // Imports are recorded by the driver as it walks each file's
                // top-level decls.
            }
        }

        result
    }

    fn get_namespace_prototype(&mut self, result: &mut Vec<DeclId>, current: Option<DeclId>, name: &str) -> DeclId {
        let key = (current, name.to_string());
        if let Some(&existing) = self.seen.get(&key) {
            return existing;
        }

        let common = gulc_ast::DeclCommon::new(
            gulc_ast::builder::dummy_span(),
            u32::MAX,
            gulc_ast::Identifier::new(gulc_ast::builder::dummy_span(), name),
        );
        let new_namespace =
            self.ast.decls.alloc(gulc_ast::Decl::new(common, DeclKind::Namespace { nested_decls: Vec::new(), prototype: None }));

        match current {
            None => result.push(new_namespace),
            Some(parent) => {
                if let DeclKind::Namespace { nested_decls, .. } = &mut self.ast.decl_mut(parent).kind {
                    nested_decls.push(new_namespace);
                }
            }
        }
        self.seen.insert(key, new_namespace);

        new_namespace
    }

    fn generate_namespace_decl(&mut self, result: &mut Vec<DeclId>, current: Option<DeclId>, namespace_decl: DeclId) {
        let name = self.ast.decl(namespace_decl).name().to_string();
        let prototype = self.get_namespace_prototype(result, current, &name);

        // Record the prototype back-pointer on the original per-file decl.
        if let DeclKind::Namespace { prototype: proto_slot, .. } = &mut self.ast.decl_mut(namespace_decl).kind {
            *proto_slot = Some(prototype);
        }

        let nested: Vec<DeclId> = match &self.ast.decl(namespace_decl).kind {
            DeclKind::Namespace { nested_decls, .. } => nested_decls.clone(),
            _ => Vec::new(),
        };

        for child in nested {
            if matches!(self.ast.decl(child).kind, DeclKind::Namespace { .. }) {
                self.generate_namespace_decl(result, Some(prototype), child);
            } else {
                self.ast.decl_mut(child).common.container = Some(prototype);
                if let DeclKind::Namespace { nested_decls, .. } = &mut self.ast.decl_mut(prototype).kind {
                    nested_decls.push(child);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gulc_ast::builder::AstBuilder;

    #[test]
    fn merges_same_named_namespace_across_files() {
        let mut ast = Ast::new();

        let (file_a_decls, file_b_decls) = {
            let mut b = AstBuilder::new(&mut ast, 0);
            let ns_a = b.namespace("a");
            let f1 = b.function("one", vec![], None, None);
            b.add_nested(ns_a, f1);

            let ns_a2 = b.namespace("a");
            let f2 = b.function("two", vec![], None, None);
            b.add_nested(ns_a2, f2);

            (vec![ns_a], vec![ns_a2])
        };

        let mut pass = NamespacePrototyper::new(&mut ast);
        let result = pass.run(&[file_a_decls, file_b_decls]);

        assert_eq!(result.len(), 1);
        let DeclKind::Namespace { nested_decls, .. } = &ast.decl(result[0]).kind else { panic!() };
        assert_eq!(nested_decls.len(), 2);
    }

    #[test]
    fn nested_namespaces_merge_recursively() {
        let mut ast = Ast::new();
        let file_decls = {
            let mut b = AstBuilder::new(&mut ast, 0);
            let outer = b.namespace("a");
            let inner = b.namespace("b");
            b.add_nested(outer, inner);
            let f = b.function("hello", vec![], None, None);
            b.add_nested(inner, f);
            vec![outer]
        };

        let mut pass = NamespacePrototyper::new(&mut ast);
        let result = pass.run(&[file_decls]);

        assert_eq!(result.len(), 1);
        let DeclKind::Namespace { nested_decls, .. } = &ast.decl(result[0]).kind else { panic!() };
        assert_eq!(nested_decls.len(), 1);
        let DeclKind::Namespace { nested_decls: inner_decls, .. } = &ast.decl(nested_decls[0]).kind else { panic!() };
        assert_eq!(inner_decls.len(), 1);
    }
}
