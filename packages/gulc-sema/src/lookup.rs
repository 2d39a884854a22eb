//! Shared name-lookup plumbing used by P2, P4 and P7: a single lookup order
//! is reused, with pass-specific tiers layered on top, rather than
//! duplicating the member-list walk in every pass.

use gulc_ast::decl::TemplateParameterKind;
use gulc_ast::{Ast, AstFile, Decl, DeclId, DeclKind, ExprId, ExprKind, TypeKind};
use gulc_diagnostics::FatalError;

use crate::session::Sess;

/// Resolves a file's `Import` declarations to the prototype namespace each
/// dotted path names, walking `globals` one path segment at a time (used by
/// P2 and P7, which both need a file's import list before they can run
/// [`LookupCtx::resolve_name`] against it).
pub fn resolve_imports(ast: &Ast, sess: &mut Sess, file: &AstFile, globals: &[DeclId]) -> Result<Vec<DeclId>, FatalError> {
    let mut result = Vec::new();
    for &import_decl in &file.imports {
        let DeclKind::Import { path } = &ast.decl(import_decl).kind else { continue };
        let mut candidates: Vec<DeclId> = globals.to_vec();
        let mut found = None;
        for (i, segment) in path.iter().enumerate() {
            let matches: Vec<DeclId> = candidates
                .iter()
                .copied()
                .filter(|&id| matches!(ast.decl(id).kind, DeclKind::Namespace { .. }) && ast.decl(id).name() == segment)
                .collect();
            if matches.is_empty() {
                return Err(FatalError::unresolved_reference(
                    sess.file_path(file.source_file_id),
                    ast.decl(import_decl).common.span,
                    format!("unresolved import path `{}`", path.join(".")),
                ));
            }
            let ns = matches[0];
            if i + 1 == path.len() {
                found = Some(ns);
            } else if let DeclKind::Namespace { nested_decls, .. } = &ast.decl(ns).kind {
                candidates = nested_decls.clone();
            }
        }
        if let Some(ns) = found {
            result.push(ns);
        }
    }
    Ok(result)
}

/// The direct children a container "owns" for name-lookup purposes. Does not
/// recurse into base structs/traits — inherited-member lookup is a
/// deliberately unimplemented extension (no call site in this crate needs
/// it yet; see DESIGN.md).
pub fn member_decls(ast: &Ast, container: DeclId) -> Vec<DeclId> {
    match &ast.decl(container).kind {
        DeclKind::Namespace { nested_decls, .. } => nested_decls.clone(),
        DeclKind::Struct(body) | DeclKind::TemplateStructInst { body, .. } => {
            let mut v = body.members.clone();
            v.extend(body.constructors.iter().copied());
            if let Some(d) = body.destructor {
                v.push(d);
            }
            v
        }
        DeclKind::TemplateStruct { body, template_parameters } => {
            let mut v = body.members.clone();
            v.extend(body.constructors.iter().copied());
            if let Some(d) = body.destructor {
                v.push(d);
            }
            v.extend(template_parameters.iter().copied());
            v
        }
        DeclKind::Trait(body) | DeclKind::TemplateTraitInst { body, .. } => body.members.clone(),
        DeclKind::TemplateTrait { body, template_parameters } => {
            let mut v = body.members.clone();
            v.extend(template_parameters.iter().copied());
            v
        }
        DeclKind::Enum(body) => body.constants.clone(),
        DeclKind::Extension { members, .. } => members.clone(),
        DeclKind::Function(b)
        | DeclKind::TemplateFunctionInst { body: b, .. }
        | DeclKind::Constructor { body: b, .. }
        | DeclKind::Destructor { body: b }
        | DeclKind::Operator { body: b, .. }
        | DeclKind::CastOperator { body: b, .. }
        | DeclKind::CallOperator { body: b }
        | DeclKind::SubscriptOperatorGet { body: b }
        | DeclKind::SubscriptOperatorSet { body: b }
        | DeclKind::PropertyGet { body: b }
        | DeclKind::PropertySet { body: b } => b.parameters.clone(),
        DeclKind::TemplateFunction { body, template_parameters } => {
            let mut v = body.parameters.clone();
            v.extend(template_parameters.iter().copied());
            v
        }
        _ => Vec::new(),
    }
}

pub fn filter_by_name(ast: &Ast, decls: &[DeclId], name: &str) -> Vec<DeclId> {
    decls.iter().copied().filter(|&id| ast.decl(id).name() == name).collect()
}

/// Lexical context threaded through a single declaration's resolution:
/// nearest-first container and template-parameter stacks, plus the
/// whole-program scopes named in the lookup order below.
pub struct LookupCtx<'a> {
    pub container_stack: Vec<DeclId>,
    pub template_stack: Vec<Vec<DeclId>>,
    pub file_top_level: &'a [DeclId],
    pub imports: &'a [DeclId],
    pub globals: &'a [DeclId],
}

impl<'a> LookupCtx<'a> {
    pub fn push_container(&mut self, id: DeclId) {
        self.container_stack.push(id);
    }

    pub fn pop_container(&mut self) {
        self.container_stack.pop();
    }

    pub fn push_template_params(&mut self, params: Vec<DeclId>) {
        self.template_stack.push(params);
    }

    pub fn pop_template_params(&mut self) {
        self.template_stack.pop();
    }

    /// The five-tier lookup order, nearest-scope-first. Returns the first
    /// non-empty tier's matches (a match in an inner scope shadows
    /// everything further out; ambiguity is only checked within one tier).
    pub fn resolve_name(&self, ast: &Ast, name: &str) -> Vec<DeclId> {
        for &container in self.container_stack.iter().rev() {
            let members = member_decls(ast, container);
            let found = filter_by_name(ast, &members, name);
            if !found.is_empty() {
                return found;
            }
        }

        for params in self.template_stack.iter().rev() {
            let found = filter_by_name(ast, params, name);
            if !found.is_empty() {
                return found;
            }
        }

        let found = filter_by_name(ast, self.file_top_level, name);
        if !found.is_empty() {
            return found;
        }

        for &import in self.imports {
            let members = member_decls(ast, import);
            let found = filter_by_name(ast, &members, name);
            if !found.is_empty() {
                return found;
            }
        }

        filter_by_name(ast, self.globals, name)
    }

    /// Innermost struct/trait/enum container, used to rewrite a bare `Self`
    /// type reference.
    pub fn nearest_type_container(&self, ast: &Ast) -> Option<DeclId> {
        self.container_stack.iter().rev().copied().find(|&id| {
            matches!(
                ast.decl(id).kind,
                DeclKind::Struct(_)
                    | DeclKind::TemplateStruct { .. }
                    | DeclKind::TemplateStructInst { .. }
                    | DeclKind::Trait(_)
                    | DeclKind::TemplateTrait { .. }
                    | DeclKind::TemplateTraitInst { .. }
                    | DeclKind::Enum(_)
            )
        })
    }
}

fn template_parameters_of(ast: &Ast, decl: DeclId) -> Vec<DeclId> {
    match &ast.decl(decl).kind {
        DeclKind::TemplateStruct { template_parameters, .. }
        | DeclKind::TemplateTrait { template_parameters, .. }
        | DeclKind::TemplateFunction { template_parameters, .. } => template_parameters.clone(),
        _ => Vec::new(),
    }
}

/// Shallow structural equality used only to decide whether a const template
/// argument matches a parameter's declared type exactly. Recurses through
/// the handful of type kinds a const parameter's type realistically takes
/// (built-ins, and one level of pointer/reference); anything else is
/// treated as not-exactly-equal rather than chasing every `TypeKind`
/// variant, since deep structural type equality is P7's job, not P2/P4's.
pub(crate) fn types_structurally_equal(ast: &Ast, a: gulc_ast::TypeId, b: gulc_ast::TypeId) -> bool {
    match (&ast.ty(a).kind, &ast.ty(b).kind) {
        (TypeKind::BuiltIn(x), TypeKind::BuiltIn(y)) => x == y,
        (TypeKind::Bool, TypeKind::Bool) => true,
        (TypeKind::Struct { decl: d1 }, TypeKind::Struct { decl: d2 }) => d1 == d2,
        (TypeKind::Enum { decl: d1 }, TypeKind::Enum { decl: d2 }) => d1 == d2,
        (TypeKind::Trait { decl: d1 }, TypeKind::Trait { decl: d2 }) => d1 == d2,
        (TypeKind::Pointer { nested: n1 }, TypeKind::Pointer { nested: n2 }) => types_structurally_equal(ast, *n1, *n2),
        (TypeKind::Reference { nested: n1 }, TypeKind::Reference { nested: n2 }) => {
            types_structurally_equal(ast, *n1, *n2)
        }
        _ => false,
    }
}

/// Splits `candidates` (already filtered to template decls of the right
/// name) into exact and inexact matches for `args`, the supplied template
/// argument list, for disambiguation. A typename
/// parameter matches any `Type` argument; a const parameter matches any
/// non-type argument, and the match is "exact" only when the argument's
/// resolved value type equals the parameter's declared const type.
pub fn match_template_candidates(ast: &Ast, candidates: &[DeclId], args: &[ExprId]) -> (Vec<DeclId>, Vec<DeclId>) {
    let mut exact = Vec::new();
    let mut inexact = Vec::new();

    'candidate: for &cand in candidates {
        let params = template_parameters_of(ast, cand);
        if args.len() > params.len() {
            continue;
        }

        let mut is_exact = true;
        for (i, &param) in params.iter().enumerate() {
            let Some(&arg) = args.get(i) else {
                let has_default = match &ast.decl(param).kind {
                    DeclKind::TemplateParameter(TemplateParameterKind::Typename { default }) => default.is_some(),
                    DeclKind::TemplateParameter(TemplateParameterKind::Const { default, .. }) => default.is_some(),
                    _ => false,
                };
                if !has_default {
                    continue 'candidate;
                }
                continue;
            };

            let arg_is_type = matches!(ast.expr(arg).kind, ExprKind::Type(_));
            match &ast.decl(param).kind {
                DeclKind::TemplateParameter(TemplateParameterKind::Typename { .. }) => {
                    if !arg_is_type {
                        continue 'candidate;
                    }
                }
                DeclKind::TemplateParameter(TemplateParameterKind::Const { const_type, .. }) => {
                    if arg_is_type {
                        continue 'candidate;
                    }
                    match ast.expr(arg).common.value_type {
                        Some(arg_ty) if types_structurally_equal(ast, arg_ty, *const_type) => {}
                        _ => is_exact = false,
                    }
                }
                _ => continue 'candidate,
            }
        }

        if is_exact {
            exact.push(cand);
        } else {
            inexact.push(cand);
        }
    }

    (exact, inexact)
}

/// True if `candidate` is a declaration kind that can anchor a `Type`
/// (struct/trait/enum/alias/template variants), used to prune lookup noise
/// (e.g. a variable named the same as a type in an outer scope never
/// satisfies a type reference since we filter by decl kind after lookup).
pub fn is_type_like(decl: &Decl) -> bool {
    matches!(
        decl.kind,
        DeclKind::Struct(_)
            | DeclKind::TemplateStruct { .. }
            | DeclKind::TemplateStructInst { .. }
            | DeclKind::Trait(_)
            | DeclKind::TemplateTrait { .. }
            | DeclKind::TemplateTraitInst { .. }
            | DeclKind::Enum(_)
            | DeclKind::TypeAlias { .. }
            | DeclKind::TemplateParameter(_)
    )
}
