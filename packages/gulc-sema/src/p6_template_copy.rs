//! P6: turns a unique `TemplatedType` candidate left over from P2 into a
//! concrete `*Inst` declaration, deep-copying the template's body and
//! substituting every `TemplateTypenameRef`/`TemplateConstRef` that names
//! one of its own template parameters.
//!
//! Substitution is by position against the old/new template-parameter
//! lists: if a referenced parameter isn't found that's fine, it could
//! belong to a nested template that hasn't been instantiated yet. The copy
//! and the substitution happen together in one walk, since nothing upstream
//! of this pass produces a standalone copy to substitute into.
//!
//! A `const` template parameter's argument is substituted by rewriting
//! `TemplateConstRef` to a clone of the bound argument expression.
//!
//! Decl kinds with no template-bearing content reachable from a struct,
//! trait, or function body (e.g. a nested namespace) are left unvisited.

use std::collections::HashMap;

use gulc_ast::decl::TemplateParameterKind;
use gulc_ast::ty::{TemplatedTypeCandidates, UnresolvedPath};
use gulc_ast::{
    Ast, DeclId, DeclKind, ExprId, ExprKind, StmtId, StmtKind, TypeId, TypeKind, TypeNode,
};

pub struct TemplateCopier<'a> {
    ast: &'a mut Ast,
}

#[derive(Default, Clone)]
struct Subst {
    types: HashMap<DeclId, TypeId>,
    consts: HashMap<DeclId, ExprId>,
    decls: HashMap<DeclId, DeclId>,
}

impl<'a> TemplateCopier<'a> {
    pub fn new(ast: &'a mut Ast) -> Self {
        Self { ast }
    }

    /// Scans every type node allocated so far for an unambiguous
    /// `TemplatedType` candidate and instantiates it in place. Types
    /// allocated by an instantiation performed during this pass are not
    /// re-scanned in the same run; a nested template argument is still
    /// substituted correctly because `clone_type` recurses into it directly.
    pub fn run(&mut self, _globals: &[DeclId]) {
        let snapshot: Vec<TypeId> = self.ast.types.ids().collect();
        for ty_id in snapshot {
            self.instantiate_if_templated(ty_id);
        }
    }

    fn instantiate_if_templated(&mut self, ty_id: TypeId) {
        let TypeKind::TemplatedType(candidates) = self.ast.ty(ty_id).kind.clone() else { return };
        if candidates.matching_template_decls.len() != 1 {
            return;
        }
        let template_decl = candidates.matching_template_decls[0];
        let args: Vec<ExprId> = candidates.template_arguments.iter().copied().collect();

        let new_kind = match &self.ast.decl(template_decl).kind {
            DeclKind::TemplateStruct { .. } => {
                let inst = self.instantiate_struct(template_decl, &args);
                Some(TypeKind::Struct { decl: inst })
            }
            DeclKind::TemplateTrait { .. } => {
                let inst = self.instantiate_trait(template_decl, &args);
                Some(TypeKind::Trait { decl: inst })
            }
            _ => None,
        };

        if let Some(kind) = new_kind {
            self.ast.ty_mut(ty_id).kind = kind;
        }
    }

    fn instantiate_struct(&mut self, template_decl: DeclId, args: &[ExprId]) -> DeclId {
        let (template_parameters, body) = match &self.ast.decl(template_decl).kind {
            DeclKind::TemplateStruct { template_parameters, body } => (template_parameters.clone(), body.clone()),
            _ => unreachable!("instantiate_struct called on a non-template-struct decl"),
        };
        let common = self.ast.decl(template_decl).common.clone();
        let mut subst = self.build_subst(&template_parameters, args);

        let unresolved_bases =
            body.unresolved_bases.iter().map(|&t| self.clone_type(t, &subst)).collect();
        let mut new_body = gulc_ast::StructBody {
            base_struct: body.base_struct,
            base_traits: body.base_traits.clone(),
            unresolved_bases,
            members: Vec::new(),
            constructors: Vec::new(),
            destructor: None,
            vtable: Vec::new(),
            vtable_name: String::new(),
            base_was_resolved: body.base_was_resolved,
            contracts: body.contracts.clone(),
            is_union: body.is_union,
        };

        let mut inst_common = common.clone();
        inst_common.original_decl = Some(template_decl);
        inst_common.contained_in_template = false;
        let inst_id = self
            .ast
            .decls
            .alloc(gulc_ast::Decl::new(inst_common, DeclKind::TemplateStructInst {
                body: gulc_ast::StructBody::default(),
                template_arguments: args.to_vec(),
            }));

        for &member in &body.members {
            let new_member = self.clone_decl(member, &mut subst, Some(inst_id));
            new_body.members.push(new_member);
        }
        for &ctor in &body.constructors {
            new_body.constructors.push(self.clone_decl(ctor, &mut subst, Some(inst_id)));
        }
        if let Some(dtor) = body.destructor {
            new_body.destructor = Some(self.clone_decl(dtor, &mut subst, Some(inst_id)));
        }

        if let DeclKind::TemplateStructInst { body, .. } = &mut self.ast.decl_mut(inst_id).kind {
            *body = new_body;
        }
        inst_id
    }

    fn instantiate_trait(&mut self, template_decl: DeclId, args: &[ExprId]) -> DeclId {
        let (template_parameters, body) = match &self.ast.decl(template_decl).kind {
            DeclKind::TemplateTrait { template_parameters, body } => (template_parameters.clone(), body.clone()),
            _ => unreachable!("instantiate_trait called on a non-template-trait decl"),
        };
        let common = self.ast.decl(template_decl).common.clone();
        let mut subst = self.build_subst(&template_parameters, args);

        let unresolved_bases =
            body.unresolved_bases.iter().map(|&t| self.clone_type(t, &subst)).collect();

        let mut inst_common = common;
        inst_common.original_decl = Some(template_decl);
        inst_common.contained_in_template = false;
        let inst_id = self
            .ast
            .decls
            .alloc(gulc_ast::Decl::new(inst_common, DeclKind::TemplateTraitInst {
                body: gulc_ast::TraitBody::default(),
                template_arguments: args.to_vec(),
            }));

        let base_traits = body.base_traits.clone();
        let mut members = Vec::new();
        for &member in &body.members {
            members.push(self.clone_decl(member, &mut subst, Some(inst_id)));
        }

        if let DeclKind::TemplateTraitInst { body, .. } = &mut self.ast.decl_mut(inst_id).kind {
            body.base_traits = base_traits;
            body.unresolved_bases = unresolved_bases;
            body.members = members;
        }
        inst_id
    }

    fn build_subst(&self, template_parameters: &[DeclId], args: &[ExprId]) -> Subst {
        let mut subst = Subst::default();
        for (i, &param) in template_parameters.iter().enumerate() {
            let Some(&arg) = args.get(i) else { continue };
            match &self.ast.decl(param).kind {
                DeclKind::TemplateParameter(TemplateParameterKind::Typename { .. }) => {
                    if let ExprKind::Type(t) = &self.ast.expr(arg).kind {
                        subst.types.insert(param, *t);
                    }
                }
                DeclKind::TemplateParameter(TemplateParameterKind::Const { .. }) => {
                    subst.consts.insert(param, arg);
                }
                _ => {}
            }
        }
        subst
    }

    fn clone_decl(&mut self, decl_id: DeclId, subst: &mut Subst, new_container: Option<DeclId>) -> DeclId {
        if let Some(&already) = subst.decls.get(&decl_id) {
            return already;
        }
        let common = self.ast.decl(decl_id).common.clone();
        let kind = self.ast.decl(decl_id).kind.clone();

        let new_kind = match kind {
            DeclKind::Variable { var_type, initializer } => DeclKind::Variable {
                var_type: var_type.map(|t| self.clone_type(t, subst)),
                initializer: initializer.map(|e| self.clone_expr(e, subst)),
            },
            DeclKind::Parameter { argument_label, param_type, default_value } => DeclKind::Parameter {
                argument_label,
                param_type: self.clone_type(param_type, subst),
                default_value: default_value.map(|e| self.clone_expr(e, subst)),
            },
            DeclKind::Function(body) => DeclKind::Function(self.clone_function_body(body, subst)),
            DeclKind::Constructor { kind, body } => {
                DeclKind::Constructor { kind, body: self.clone_function_body(body, subst) }
            }
            DeclKind::Destructor { body } => DeclKind::Destructor { body: self.clone_function_body(body, subst) },
            DeclKind::Operator { op, body } => DeclKind::Operator { op, body: self.clone_function_body(body, subst) },
            DeclKind::CastOperator { target_type, body } => DeclKind::CastOperator {
                target_type: self.clone_type(target_type, subst),
                body: self.clone_function_body(body, subst),
            },
            DeclKind::CallOperator { body } => DeclKind::CallOperator { body: self.clone_function_body(body, subst) },
            DeclKind::SubscriptOperatorGet { body } => {
                DeclKind::SubscriptOperatorGet { body: self.clone_function_body(body, subst) }
            }
            DeclKind::SubscriptOperatorSet { body } => {
                DeclKind::SubscriptOperatorSet { body: self.clone_function_body(body, subst) }
            }
            DeclKind::PropertyGet { body } => DeclKind::PropertyGet { body: self.clone_function_body(body, subst) },
            DeclKind::PropertySet { body } => DeclKind::PropertySet { body: self.clone_function_body(body, subst) },
            DeclKind::Property { getter, setter, property_type } => DeclKind::Property {
                getter: getter.map(|g| self.clone_decl(g, subst, new_container)),
                setter: setter.map(|s| self.clone_decl(s, subst, new_container)),
                property_type: self.clone_type(property_type, subst),
            },
            DeclKind::TypeAlias { aliased_type } => {
                DeclKind::TypeAlias { aliased_type: self.clone_type(aliased_type, subst) }
            }
            other => other,
        };

        let mut new_common = common;
        new_common.container = new_container;
        new_common.original_decl = Some(decl_id);
        let new_id = self.ast.decls.alloc(gulc_ast::Decl::new(new_common, new_kind));
        subst.decls.insert(decl_id, new_id);
        new_id
    }

    fn clone_function_body(&mut self, body: gulc_ast::FunctionBody, subst: &mut Subst) -> gulc_ast::FunctionBody {
        let parameters = body.parameters.iter().map(|&p| self.clone_decl(p, subst, None)).collect();
        let return_type = body.return_type.map(|t| self.clone_type(t, subst));
        let body_stmt = body.body.map(|s| self.clone_stmt(s, subst));
        gulc_ast::FunctionBody { parameters, return_type, contracts: body.contracts, body: body_stmt }
    }

    fn clone_type(&mut self, ty_id: TypeId, subst: &Subst) -> TypeId {
        let node = self.ast.ty(ty_id).clone();
        let kind = match node.kind {
            TypeKind::TemplateTypenameRef { ref_template_parameter } => {
                match subst.types.get(&ref_template_parameter) {
                    Some(&bound) => return self.clone_type(bound, &Subst::default()),
                    None => TypeKind::TemplateTypenameRef { ref_template_parameter },
                }
            }
            TypeKind::Pointer { nested } => TypeKind::Pointer { nested: self.clone_type(nested, subst) },
            TypeKind::Reference { nested } => TypeKind::Reference { nested: self.clone_type(nested, subst) },
            TypeKind::RValueReference { nested } => {
                TypeKind::RValueReference { nested: self.clone_type(nested, subst) }
            }
            TypeKind::Imaginary { nested } => TypeKind::Imaginary { nested: self.clone_type(nested, subst) },
            TypeKind::Labeled { label, nested } => {
                TypeKind::Labeled { label, nested: self.clone_type(nested, subst) }
            }
            TypeKind::FlatArray { element, length } => {
                TypeKind::FlatArray { element: self.clone_type(element, subst), length }
            }
            TypeKind::Dimension { element, sizes } => {
                TypeKind::Dimension { element: self.clone_type(element, subst), sizes }
            }
            TypeKind::FunctionPointer(sig) => TypeKind::FunctionPointer(gulc_ast::ty::FunctionPointerSignature {
                param_labels: sig.param_labels,
                param_types: sig.param_types.into_iter().map(|t| self.clone_type(t, subst)).collect(),
                return_type: self.clone_type(sig.return_type, subst),
            }),
            TypeKind::TemplatedType(c) => TypeKind::TemplatedType(TemplatedTypeCandidates {
                path: c.path,
                template_arguments: c.template_arguments.iter().map(|&e| self.clone_expr(e, subst)).collect(),
                matching_template_decls: c.matching_template_decls,
            }),
            TypeKind::Unresolved(p) => TypeKind::Unresolved(self.clone_unresolved_path(p, subst)),
            TypeKind::UnresolvedNested { base, segments } => TypeKind::UnresolvedNested {
                base: self.clone_type(base, subst),
                segments: segments.into_iter().map(|s| self.clone_unresolved_path(s, subst)).collect(),
            },
            TypeKind::Dependent(d) => TypeKind::Dependent(gulc_ast::ty::DependentPath {
                container: self.clone_type(d.container, subst),
                dependent: self.clone_type(d.dependent, subst),
            }),
            same => same,
        };
        self.ast.types.alloc(TypeNode { common: node.common, kind })
    }

    fn clone_unresolved_path(&mut self, path: UnresolvedPath, subst: &Subst) -> UnresolvedPath {
        UnresolvedPath {
            namespace_path: path.namespace_path,
            identifier: path.identifier,
            template_arguments: path.template_arguments.iter().map(|&e| self.clone_expr(e, subst)).collect(),
        }
    }

    fn clone_expr(&mut self, expr_id: ExprId, subst: &Subst) -> ExprId {
        let node = self.ast.expr(expr_id).clone();
        let kind = match node.kind {
            ExprKind::TemplateConstRef { template_parameter } => match subst.consts.get(&template_parameter) {
                Some(&bound) => return self.clone_expr(bound, &Subst::default()),
                None => ExprKind::TemplateConstRef { template_parameter },
            },
            ExprKind::ArrayLiteral { elements } => {
                ExprKind::ArrayLiteral { elements: elements.into_iter().map(|e| self.clone_expr(e, subst)).collect() }
            }
            ExprKind::As { value, target_type } => {
                ExprKind::As { value: self.clone_expr(value, subst), target_type: self.clone_type(target_type, subst) }
            }
            ExprKind::AssignmentOperator { op, target, value } => ExprKind::AssignmentOperator {
                op,
                target: self.clone_expr(target, subst),
                value: self.clone_expr(value, subst),
            },
            ExprKind::InfixOperator { op, left, right } => {
                ExprKind::InfixOperator { op, left: self.clone_expr(left, subst), right: self.clone_expr(right, subst) }
            }
            ExprKind::PrefixOperator { op, operand } => {
                ExprKind::PrefixOperator { op, operand: self.clone_expr(operand, subst) }
            }
            ExprKind::PostfixOperator { op, operand } => {
                ExprKind::PostfixOperator { op, operand: self.clone_expr(operand, subst) }
            }
            ExprKind::Paren { inner } => ExprKind::Paren { inner: self.clone_expr(inner, subst) },
            ExprKind::Ternary { condition, then_value, else_value } => ExprKind::Ternary {
                condition: self.clone_expr(condition, subst),
                then_value: self.clone_expr(then_value, subst),
                else_value: self.clone_expr(else_value, subst),
            },
            ExprKind::Try { inner } => ExprKind::Try { inner: self.clone_expr(inner, subst) },
            ExprKind::Is { value, check_type } => {
                ExprKind::Is { value: self.clone_expr(value, subst), check_type: self.clone_type(check_type, subst) }
            }
            ExprKind::Has { value, trait_type } => {
                ExprKind::Has { value: self.clone_expr(value, subst), trait_type: self.clone_type(trait_type, subst) }
            }
            ExprKind::CheckExtendsType { base, extends } => ExprKind::CheckExtendsType {
                base: self.clone_type(base, subst),
                extends: self.clone_type(extends, subst),
            },
            ExprKind::Identifier { path, template_arguments } => ExprKind::Identifier {
                path,
                template_arguments: template_arguments.iter().map(|&e| self.clone_expr(e, subst)).collect(),
            },
            ExprKind::MemberAccessCall { object, member, arguments } => ExprKind::MemberAccessCall {
                object: self.clone_expr(object, subst),
                member,
                arguments: arguments.into_iter().map(|a| self.clone_labeled_arg(a, subst)).collect(),
            },
            ExprKind::FunctionCall { callee, arguments } => ExprKind::FunctionCall {
                callee: self.clone_expr(callee, subst),
                arguments: arguments.into_iter().map(|a| self.clone_labeled_arg(a, subst)).collect(),
            },
            ExprKind::SubscriptCall { object, arguments, get_or_set } => ExprKind::SubscriptCall {
                object: self.clone_expr(object, subst),
                arguments: arguments.into_iter().map(|a| self.clone_labeled_arg(a, subst)).collect(),
                get_or_set,
            },
            ExprKind::LabeledArgumentExpr(arg) => ExprKind::LabeledArgumentExpr(self.clone_labeled_arg(arg, subst)),
            ExprKind::Type(t) => ExprKind::Type(self.clone_type(t, subst)),
            // `decl` here is an `if let`-style inline binding, not a member
            // reachable from the struct/function body walk that built
            // `subst.decls`; left pointing at the original local like every
            // post-P7 reference kind below.
            ExprKind::VariableDecl { decl, initializer } => ExprKind::VariableDecl {
                decl,
                initializer: initializer.map(|e| self.clone_expr(e, subst)),
            },
            // Kinds P7 introduces (`*Ref`, `ImplicitCast`, `StructAssignmentOperator`,
            // ...) never appear in a tree P6 processes, since P6 runs before P7.
            same => same,
        };
        self.ast.exprs.alloc(gulc_ast::Expr { common: node.common, kind })
    }

    fn clone_labeled_arg(&mut self, arg: gulc_ast::expr::LabeledArgument, subst: &Subst) -> gulc_ast::expr::LabeledArgument {
        gulc_ast::expr::LabeledArgument { label: arg.label, value: self.clone_expr(arg.value, subst) }
    }

    fn clone_stmt(&mut self, stmt_id: StmtId, subst: &Subst) -> StmtId {
        let node = self.ast.stmt(stmt_id).clone();
        let kind = match node.kind {
            StmtKind::Compound { statements } => {
                StmtKind::Compound { statements: statements.into_iter().map(|s| self.clone_stmt(s, subst)).collect() }
            }
            StmtKind::If { condition, then_body, else_body } => StmtKind::If {
                condition: self.clone_expr(condition, subst),
                then_body: self.clone_stmt(then_body, subst),
                else_body: else_body.map(|s| self.clone_stmt(s, subst)),
            },
            StmtKind::While { condition, body } => {
                StmtKind::While { condition: self.clone_expr(condition, subst), body: self.clone_stmt(body, subst) }
            }
            StmtKind::Do { body } => StmtKind::Do { body: self.clone_stmt(body, subst) },
            StmtKind::DoWhile { body, condition } => {
                StmtKind::DoWhile { body: self.clone_stmt(body, subst), condition: self.clone_expr(condition, subst) }
            }
            StmtKind::DoCatch { body, catches } => StmtKind::DoCatch {
                body: self.clone_stmt(body, subst),
                catches: catches.into_iter().map(|s| self.clone_stmt(s, subst)).collect(),
            },
            StmtKind::For { init, condition, increment, body } => StmtKind::For {
                init: init.map(|s| self.clone_stmt(s, subst)),
                condition: condition.map(|e| self.clone_expr(e, subst)),
                increment: increment.map(|e| self.clone_expr(e, subst)),
                body: self.clone_stmt(body, subst),
            },
            StmtKind::Switch { condition, cases } => StmtKind::Switch {
                condition: self.clone_expr(condition, subst),
                cases: cases.into_iter().map(|s| self.clone_stmt(s, subst)).collect(),
            },
            StmtKind::Case { condition, body } => StmtKind::Case {
                condition: condition.map(|e| self.clone_expr(e, subst)),
                body: body.into_iter().map(|s| self.clone_stmt(s, subst)).collect(),
            },
            StmtKind::Catch(c) => StmtKind::Catch(gulc_ast::stmt::CatchClause {
                binding: c.binding.map(|(name, t)| (name, self.clone_type(t, subst))),
                body: self.clone_stmt(c.body, subst),
            }),
            StmtKind::Labeled { label, body, local_variable_count } => {
                StmtKind::Labeled { label, body: self.clone_stmt(body, subst), local_variable_count }
            }
            StmtKind::Return { value, pre_return_deferred } => StmtKind::Return {
                value: value.map(|e| self.clone_expr(e, subst)),
                pre_return_deferred: pre_return_deferred.into_iter().map(|e| self.clone_expr(e, subst)).collect(),
            },
            StmtKind::Goto { label, pre_goto_deferred } => StmtKind::Goto {
                label,
                pre_goto_deferred: pre_goto_deferred.into_iter().map(|e| self.clone_expr(e, subst)).collect(),
            },
            StmtKind::Expr(e) => StmtKind::Expr(self.clone_expr(e, subst)),
            same @ (StmtKind::Break { .. } | StmtKind::Continue { .. } | StmtKind::Fallthrough) => same,
        };
        self.ast.stmts.alloc(gulc_ast::StmtNode { common: node.common, kind })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gulc_ast::builder::AstBuilder;
    use gulc_ast::BuiltInKind;
    use smallvec::SmallVec;

    #[test]
    fn instantiates_unique_templated_type_candidate() {
        let mut ast = Ast::new();
        let (template_struct, field, i32_ty) = {
            let mut b = AstBuilder::new(&mut ast, 0);
            let t_param = b.template_parameter_typename("T");
            let strukt = b.template_struct("Box", vec![t_param]);
            let ref_ty = b.ty(TypeKind::TemplateTypenameRef { ref_template_parameter: t_param });
            let field = b.variable("value", Some(ref_ty), None);
            b.add_struct_member(strukt, field);
            let i32_ty = b.builtin(BuiltInKind::I32);
            (strukt, field, i32_ty)
        };

        let mut b = AstBuilder::new(&mut ast, 0);
        let arg_expr = b.type_expr(i32_ty);
        let templated = b.ty(TypeKind::TemplatedType(TemplatedTypeCandidates {
            path: vec!["Box".to_string()],
            template_arguments: SmallVec::from_vec(vec![arg_expr]),
            matching_template_decls: vec![template_struct],
        }));
        drop(b);

        let mut pass = TemplateCopier::new(&mut ast);
        pass.run(&[]);

        let TypeKind::Struct { decl: inst } = ast.ty(templated).kind else { panic!("expected instantiated struct") };
        assert_ne!(inst, template_struct);

        let body = ast.decl(inst).kind.struct_body().unwrap();
        assert_eq!(body.members.len(), 1);
        let new_field = body.members[0];
        assert_ne!(new_field, field);
        let DeclKind::Variable { var_type: Some(new_field_ty), .. } = &ast.decl(new_field).kind else {
            panic!("expected variable")
        };
        assert!(matches!(ast.ty(*new_field_ty).kind, TypeKind::BuiltIn(BuiltInKind::I32)));
    }
}
