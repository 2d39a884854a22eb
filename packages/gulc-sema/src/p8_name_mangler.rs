//! P8: assigns every name-bearing declaration its Itanium-compatible link
//! name, plus the `_ZTV...` v-table symbol for each struct with any virtual
//! members.
//!
//! Follows the `_Z<prefix><unqualified-name><suffix><bare-function-type>`
//! layout, the `N...E` nested-name wrapping a namespace/struct/trait prefix
//! picks up once it's nested inside something else, the `U<length><label>`
//! vendor extension this language's mandatory argument labels need bolted
//! onto the bare-function-type, and the `C2`/`D2` complete-object
//! constructor/destructor codes.
//!
//! Runs in the two phases spec'd for the mangler: a type-declaration
//! pre-pass assigns every struct/trait/enum its `mangled_name` first, then a
//! second walk mangles functions, variables, operators, call operators, and
//! constructors. This order matters because `bare_function_type`/`type_name`
//! read a parameter's struct/trait/enum type off its already-assigned
//! `mangled_name` — a single interleaved walk would read an empty string for
//! a function declared (in source, or namespace child-list) ahead of a
//! struct it takes by value or reference.
//!
//! Template instantiations carry their argument list in the mangled name
//! (`TemplateStructInst`/`TemplateTraitInst` are not mangled like a plain
//! `Struct`/`Trait`): two differently-instantiated copies of the same
//! template would otherwise mangle to the same symbol, which P6 already
//! guards against at the AST level (each instantiation is a distinct
//! `DeclId`) but would silently collide at link time without this.
//!
//! Constructors conceptually carry two mangled names (`C2`, the
//! complete-object constructor used for ordinary calls, and `C1`, the
//! base-object variant referenced from a v-table); `DeclCommon` here has
//! only one `mangled_name` slot, so only the `C2` form is produced. No call
//! site in this crate's pipeline reads a constructor's v-table-variant name.

use gulc_ast::expr::{ConstructorKind, LiteralType, ValueLiteral};
use gulc_ast::modifiers::Qualifier;
use gulc_ast::{Ast, BuiltInKind, DeclId, DeclKind, ExprId, ExprKind, InfixOp, TypeId, TypeKind};

pub struct NameMangler<'a> {
    ast: &'a mut Ast,
}

impl<'a> NameMangler<'a> {
    pub fn new(ast: &'a mut Ast) -> Self {
        Self { ast }
    }

    pub fn run(&mut self, globals: &[DeclId]) {
        let files = self.ast.files.clone();

        // Phase 1: every enum/struct/trait gets its `mangled_name` first, so
        // phase 2's parameter/variable type lookups never read an empty
        // string for a type declared later in the same scope.
        for file in &files {
            for &decl_id in &file.top_level_decls {
                self.mangle_top_level_type(decl_id);
            }
        }
        for &ns in globals {
            self.mangle_namespace_types(ns, "");
        }

        // Phase 2: functions, variables, operators, call operators, and
        // constructors, which may reference any type mangled in phase 1.
        for file in &files {
            for &decl_id in &file.top_level_decls {
                if !matches!(self.ast.decl(decl_id).kind, DeclKind::Namespace { .. }) {
                    self.mangle_top_level_value(decl_id);
                }
            }
        }
        for &ns in globals {
            self.mangle_namespace_values(ns, "");
        }
    }

    fn mangle_top_level_type(&mut self, decl_id: DeclId) {
        match self.ast.decl(decl_id).kind.clone() {
            DeclKind::Struct(_) | DeclKind::TemplateStructInst { .. } => self.mangle_struct_type(decl_id, ""),
            DeclKind::Trait(_) | DeclKind::TemplateTraitInst { .. } => self.mangle_trait_type(decl_id, ""),
            DeclKind::Enum(_) => self.mangle_enum(decl_id, "", ""),
            _ => {}
        }
    }

    fn mangle_top_level_value(&mut self, decl_id: DeclId) {
        match self.ast.decl(decl_id).kind.clone() {
            DeclKind::Function(_) => self.mangle_function(decl_id, "", ""),
            DeclKind::Variable { .. } => self.mangle_variable(decl_id, "", ""),
            DeclKind::Struct(_) | DeclKind::TemplateStructInst { .. } => self.mangle_struct_members(decl_id),
            DeclKind::Trait(_) | DeclKind::TemplateTraitInst { .. } => self.mangle_trait_members(decl_id),
            _ => {}
        }
    }

    fn mangle_namespace_types(&mut self, decl_id: DeclId, prefix: &str) {
        let name = self.ast.decl(decl_id).name().to_string();
        let n_prefix = format!("{prefix}{}", source_name(&name));
        let nested = match &self.ast.decl(decl_id).kind {
            DeclKind::Namespace { nested_decls, .. } => nested_decls.clone(),
            _ => return,
        };
        for child in nested {
            match self.ast.decl(child).kind.clone() {
                DeclKind::Namespace { .. } => self.mangle_namespace_types(child, &n_prefix),
                DeclKind::Struct(_) | DeclKind::TemplateStructInst { .. } => self.mangle_struct_type(child, &n_prefix),
                DeclKind::Trait(_) | DeclKind::TemplateTraitInst { .. } => self.mangle_trait_type(child, &n_prefix),
                DeclKind::Enum(_) => self.mangle_enum(child, &format!("N{n_prefix}"), "E"),
                _ => {}
            }
        }
    }

    fn mangle_namespace_values(&mut self, decl_id: DeclId, prefix: &str) {
        let name = self.ast.decl(decl_id).name().to_string();
        let n_prefix = format!("{prefix}{}", source_name(&name));
        let nested = match &self.ast.decl(decl_id).kind {
            DeclKind::Namespace { nested_decls, .. } => nested_decls.clone(),
            _ => return,
        };
        for child in nested {
            match self.ast.decl(child).kind.clone() {
                DeclKind::Namespace { .. } => self.mangle_namespace_values(child, &n_prefix),
                DeclKind::Function(_) => self.mangle_function(child, &format!("N{n_prefix}"), "E"),
                DeclKind::Variable { .. } => self.mangle_variable(child, &format!("N{n_prefix}"), "E"),
                DeclKind::Struct(_) | DeclKind::TemplateStructInst { .. } => self.mangle_struct_members(child),
                DeclKind::Trait(_) | DeclKind::TemplateTraitInst { .. } => self.mangle_trait_members(child),
                _ => {}
            }
        }
    }

    fn mangle_enum(&mut self, decl_id: DeclId, prefix: &str, suffix: &str) {
        let name = self.ast.decl(decl_id).name().to_string();
        self.ast.decl_mut(decl_id).common.mangled_name = format!("{prefix}{}{suffix}", source_name(&name));
    }

    /// Phase 1 for structs: assigns `mangled_name`/`vtable_name` and recurses
    /// into any nested struct/trait/enum member so those get a name too
    /// before phase 2 needs to reference them.
    fn mangle_struct_type(&mut self, decl_id: DeclId, prefix: &str) {
        let name = self.ast.decl(decl_id).name().to_string();
        let template_arguments: Option<Vec<ExprId>> = match &self.ast.decl(decl_id).kind {
            DeclKind::TemplateStructInst { template_arguments, .. } => Some(template_arguments.clone()),
            _ => None,
        };
        let template_suffix = template_arguments.map(|a| self.template_args_suffix(&a)).unwrap_or_default();
        let n_prefix = format!("{prefix}{}{template_suffix}", source_name(&name));

        let vtable_name = format!("_ZTVN{n_prefix}E");
        if let Some(body) = self.ast.decl_mut(decl_id).kind.struct_body_mut() {
            body.vtable_name = vtable_name;
        }
        self.ast.decl_mut(decl_id).common.mangled_name = n_prefix.clone();

        let members = self.ast.decl(decl_id).kind.struct_body().map(|b| b.members.clone()).unwrap_or_default();
        for member in members {
            match self.ast.decl(member).kind.clone() {
                DeclKind::Struct(_) | DeclKind::TemplateStructInst { .. } => {
                    self.mangle_struct_type(member, &format!("N{n_prefix}"))
                }
                DeclKind::Trait(_) | DeclKind::TemplateTraitInst { .. } => {
                    self.mangle_trait_type(member, &format!("N{n_prefix}"))
                }
                DeclKind::Enum(_) => self.mangle_enum(member, &format!("N{n_prefix}"), "E"),
                _ => {}
            }
        }
    }

    /// Phase 2 for structs: mangles constructors, function/operator/call-
    /// operator members, and the destructor, reading the struct's own
    /// `mangled_name` (already assigned in phase 1) as the nested-name
    /// prefix.
    fn mangle_struct_members(&mut self, decl_id: DeclId) {
        let n_prefix = self.ast.decl(decl_id).common.mangled_name.clone();

        let (constructors, members, destructor) = match self.ast.decl(decl_id).kind.struct_body() {
            Some(b) => (b.constructors.clone(), b.members.clone(), b.destructor),
            None => (Vec::new(), Vec::new(), None),
        };

        for &ctor in &constructors {
            self.mangle_constructor(ctor, &format!("N{n_prefix}"), "E");
        }

        for &member in &members {
            match self.ast.decl(member).kind.clone() {
                DeclKind::CallOperator { .. } => self.mangle_call_operator(member, &format!("N{n_prefix}"), "E"),
                DeclKind::Function(_) => self.mangle_function(member, &format!("N{n_prefix}"), "E"),
                DeclKind::Operator { op, .. } => self.mangle_operator(member, op, &format!("N{n_prefix}"), "E"),
                DeclKind::Struct(_) | DeclKind::TemplateStructInst { .. } => self.mangle_struct_members(member),
                DeclKind::Trait(_) | DeclKind::TemplateTraitInst { .. } => self.mangle_trait_members(member),
                _ => {}
            }
        }

        if let Some(d) = destructor {
            self.mangle_destructor(d, &format!("N{n_prefix}"), "E");
        }
    }

    /// Phase 1 for traits: mirrors `mangle_struct_type` minus the v-table.
    fn mangle_trait_type(&mut self, decl_id: DeclId, prefix: &str) {
        let name = self.ast.decl(decl_id).name().to_string();
        let template_arguments: Option<Vec<ExprId>> = match &self.ast.decl(decl_id).kind {
            DeclKind::TemplateTraitInst { template_arguments, .. } => Some(template_arguments.clone()),
            _ => None,
        };
        let template_suffix = template_arguments.map(|a| self.template_args_suffix(&a)).unwrap_or_default();
        let n_prefix = format!("{prefix}{}{template_suffix}", source_name(&name));
        self.ast.decl_mut(decl_id).common.mangled_name = n_prefix.clone();

        let members = match &self.ast.decl(decl_id).kind {
            DeclKind::Trait(body) => body.members.clone(),
            DeclKind::TemplateTraitInst { body, .. } => body.members.clone(),
            _ => Vec::new(),
        };
        for member in members {
            match self.ast.decl(member).kind.clone() {
                DeclKind::Struct(_) | DeclKind::TemplateStructInst { .. } => {
                    self.mangle_struct_type(member, &format!("N{n_prefix}"))
                }
                DeclKind::Trait(_) | DeclKind::TemplateTraitInst { .. } => {
                    self.mangle_trait_type(member, &format!("N{n_prefix}"))
                }
                DeclKind::Enum(_) => self.mangle_enum(member, &format!("N{n_prefix}"), "E"),
                _ => {}
            }
        }
    }

    /// Phase 2 for traits: mangles function/operator/call-operator members.
    fn mangle_trait_members(&mut self, decl_id: DeclId) {
        let n_prefix = self.ast.decl(decl_id).common.mangled_name.clone();

        let members = match &self.ast.decl(decl_id).kind {
            DeclKind::Trait(body) => body.members.clone(),
            DeclKind::TemplateTraitInst { body, .. } => body.members.clone(),
            _ => Vec::new(),
        };
        for member in members {
            match self.ast.decl(member).kind.clone() {
                DeclKind::CallOperator { .. } => self.mangle_call_operator(member, &format!("N{n_prefix}"), "E"),
                DeclKind::Function(_) => self.mangle_function(member, &format!("N{n_prefix}"), "E"),
                DeclKind::Operator { op, .. } => self.mangle_operator(member, op, &format!("N{n_prefix}"), "E"),
                DeclKind::Struct(_) | DeclKind::TemplateStructInst { .. } => self.mangle_struct_members(member),
                DeclKind::Trait(_) | DeclKind::TemplateTraitInst { .. } => self.mangle_trait_members(member),
                _ => {}
            }
        }
    }

    fn mangle_function(&mut self, decl_id: DeclId, prefix: &str, suffix: &str) {
        let name = self.ast.decl(decl_id).name().to_string();
        let params = self.ast.decl(decl_id).kind.function_body().map(|b| b.parameters.clone()).unwrap_or_default();
        let mangled = format!("_Z{prefix}{}{suffix}{}", source_name(&name), self.bare_function_type(&params));
        self.ast.decl_mut(decl_id).common.mangled_name = mangled;
    }

    fn mangle_variable(&mut self, decl_id: DeclId, prefix: &str, suffix: &str) {
        let name = self.ast.decl(decl_id).name().to_string();
        self.ast.decl_mut(decl_id).common.mangled_name = format!("_Z{prefix}{}{suffix}", source_name(&name));
    }

    fn mangle_call_operator(&mut self, decl_id: DeclId, prefix: &str, suffix: &str) {
        let params = self.ast.decl(decl_id).kind.function_body().map(|b| b.parameters.clone()).unwrap_or_default();
        let mangled = format!("_Z{prefix}cl{suffix}{}", self.bare_function_type(&params));
        self.ast.decl_mut(decl_id).common.mangled_name = mangled;
    }

    fn mangle_operator(&mut self, decl_id: DeclId, op: InfixOp, prefix: &str, suffix: &str) {
        let params = self.ast.decl(decl_id).kind.function_body().map(|b| b.parameters.clone()).unwrap_or_default();
        let mangled = format!("_Z{prefix}{}{suffix}{}", infix_operator_name(op), self.bare_function_type(&params));
        self.ast.decl_mut(decl_id).common.mangled_name = mangled;
    }

    fn mangle_constructor(&mut self, decl_id: DeclId, prefix: &str, suffix: &str) {
        let (kind, params) = match &self.ast.decl(decl_id).kind {
            DeclKind::Constructor { kind, body } => (*kind, body.parameters.clone()),
            _ => return,
        };
        let bare = match kind {
            ConstructorKind::Normal => self.bare_function_type(&params),
            ConstructorKind::Copy => "RKS_".to_string(),
            ConstructorKind::Move => "OS_".to_string(),
        };
        self.ast.decl_mut(decl_id).common.mangled_name = format!("_Z{prefix}C2{suffix}{bare}");
    }

    fn mangle_destructor(&mut self, decl_id: DeclId, prefix: &str, suffix: &str) {
        self.ast.decl_mut(decl_id).common.mangled_name = format!("_Z{prefix}D2{suffix}v");
    }

    fn bare_function_type(&self, params: &[DeclId]) -> String {
        if params.is_empty() {
            return "v".to_string();
        }
        let mut result = String::new();
        for &p in params {
            let (label, param_type) = match &self.ast.decl(p).kind {
                DeclKind::Parameter { argument_label, param_type, .. } => (argument_label.clone().unwrap_or_default(), *param_type),
                _ => continue,
            };
            result.push('U');
            result.push_str(&source_name(&label));
            result.push_str(&self.type_name(param_type));
        }
        result
    }

    fn type_name(&self, ty: TypeId) -> String {
        let qualifier_prefix = if self.ast.ty(ty).common.qualifier == Qualifier::Immut { "K" } else { "" };
        let body = match &self.ast.ty(ty).kind {
            TypeKind::BuiltIn(BuiltInKind::Void) => "v".to_string(),
            TypeKind::BuiltIn(k) => source_name(k.name()),
            TypeKind::Bool => "b".to_string(),
            TypeKind::Enum { decl } | TypeKind::Struct { decl } | TypeKind::Trait { decl } => {
                self.ast.decl(*decl).common.mangled_name.clone()
            }
            TypeKind::Pointer { nested } => format!("P{}", self.type_name(*nested)),
            TypeKind::Reference { nested } | TypeKind::RValueReference { nested } => {
                format!("R{}", self.type_name(*nested))
            }
            // Function pointers, arrays, and anything still unresolved at this
            // point in the pipeline have no defined mangled form. There's no
            // call site in this crate that reaches this arm with a
            // fully-resolved program, so it's left empty rather than panicking.
            _ => String::new(),
        };
        format!("{qualifier_prefix}{body}")
    }

    fn template_args_suffix(&self, template_arguments: &[ExprId]) -> String {
        let mut result = String::from("I");
        for &arg in template_arguments {
            result.push_str(&self.template_arg(arg));
        }
        result.push('E');
        result
    }

    fn template_arg(&self, arg: ExprId) -> String {
        match &self.ast.expr(arg).kind {
            ExprKind::Type(t) => self.type_name(*t),
            ExprKind::ValueLiteral(lit) => self.expr_primary(lit, arg),
            _ => String::new(),
        }
    }

    fn expr_primary(&self, lit: &ValueLiteral, expr_id: ExprId) -> String {
        match lit.literal_type {
            LiteralType::Integer | LiteralType::Float => {
                let type_str = self.ast.expr(expr_id).common.value_type.map(|t| self.type_name(t)).unwrap_or_default();
                format!("L{type_str}{}E", lit.value)
            }
            _ => String::new(),
        }
    }
}

fn source_name(s: &str) -> String {
    format!("{}{}", s.len(), s)
}

/// `ItaniumMangler::operatorName`'s infix branch; this crate only attempts
/// member-operator-overload resolution for infix operators (`DeclKind::
/// Operator` carries no prefix/postfix tag), so that's the only branch a
/// member `Operator` decl ever needs.
fn infix_operator_name(op: InfixOp) -> &'static str {
    match op {
        InfixOp::Add => "pl",
        InfixOp::Sub => "mi",
        InfixOp::Mul => "ml",
        InfixOp::Div => "dv",
        InfixOp::Rem => "rm",
        InfixOp::Pow => "v23pow",
        InfixOp::BitAnd => "an",
        InfixOp::BitOr => "or",
        InfixOp::BitXor => "eo",
        InfixOp::Shl => "ls",
        InfixOp::Shr => "rs",
        InfixOp::LogicalAnd => "aa",
        InfixOp::LogicalOr => "oo",
        InfixOp::Eq => "eq",
        InfixOp::Ne => "ne",
        InfixOp::Gt => "gt",
        InfixOp::Lt => "lt",
        InfixOp::Ge => "ge",
        InfixOp::Le => "le",
        InfixOp::Spaceship => "ss",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gulc_ast::builder::AstBuilder;
    use gulc_ast::AstFile;
    use pretty_assertions::assert_eq;

    fn single_file(ast: &mut Ast, decls: Vec<DeclId>) {
        ast.files.push(AstFile { source_file_id: 0, path: "a.lang".into(), top_level_decls: decls, imports: vec![] });
    }

    #[test]
    fn mangles_argument_less_top_level_function() {
        let mut ast = Ast::new();
        let func = {
            let mut b = AstBuilder::new(&mut ast, 0);
            b.function("f", vec![], None, None)
        };
        single_file(&mut ast, vec![func]);

        NameMangler::new(&mut ast).run(&[]);

        assert_eq!(ast.decl(func).common.mangled_name, "_Z1fv");
    }

    #[test]
    fn mangles_nested_function_with_namespace_wrapping() {
        let mut ast = Ast::new();
        let (ns, func) = {
            let mut b = AstBuilder::new(&mut ast, 0);
            let ns = b.namespace("m");
            let f = b.function("go", vec![], None, None);
            b.add_nested(ns, f);
            (ns, f)
        };
        single_file(&mut ast, vec![ns]);

        NameMangler::new(&mut ast).run(&[ns]);

        assert_eq!(ast.decl(func).common.mangled_name, "_ZN1m2goEv");
    }

    #[test]
    fn mangles_labeled_parameter_with_vendor_extension() {
        let mut ast = Ast::new();
        let func = {
            let mut b = AstBuilder::new(&mut ast, 0);
            let i32_ty = b.builtin(BuiltInKind::I32);
            let p = b.parameter(Some("count"), i32_ty);
            b.function("take", vec![p], None, None)
        };
        single_file(&mut ast, vec![func]);

        NameMangler::new(&mut ast).run(&[]);

        assert_eq!(ast.decl(func).common.mangled_name, "_Z4takeU5count3i32");
    }

    #[test]
    fn function_declared_before_its_struct_parameter_type_still_mangles() {
        let mut ast = Ast::new();
        let (func, strukt) = {
            let mut b = AstBuilder::new(&mut ast, 0);
            let s = b.struct_decl("Point");
            let struct_ty = b.ty(TypeKind::Struct { decl: s });
            let p = b.parameter(Some("at"), struct_ty);
            let func = b.function("take", vec![p], None, None);
            (func, s)
        };
        // Declared in source order func-then-struct, the order the buggy
        // single-walk mangler would have mangled them in too.
        single_file(&mut ast, vec![func, strukt]);

        NameMangler::new(&mut ast).run(&[]);

        assert_eq!(ast.decl(strukt).common.mangled_name, "5Point");
        assert_eq!(ast.decl(func).common.mangled_name, "_Z4takeU2at5Point");
    }

    #[test]
    fn struct_with_virtual_member_gets_vtable_name() {
        use gulc_ast::modifiers::DeclModifiers;
        let mut ast = Ast::new();
        let (s, method) = {
            let mut b = AstBuilder::new(&mut ast, 0);
            let s = b.struct_decl("Shape");
            let m = b.function("area", vec![], None, None);
            b.modifiers(m, DeclModifiers::VIRTUAL);
            b.add_struct_member(s, m);
            (s, m)
        };
        single_file(&mut ast, vec![s]);

        NameMangler::new(&mut ast).run(&[]);

        assert_eq!(ast.decl(s).common.mangled_name, "5Shape");
        let DeclKind::Struct(body) = &ast.decl(s).kind else { panic!() };
        assert_eq!(body.vtable_name, "_ZTVN5ShapeE");
        assert_eq!(ast.decl(method).common.mangled_name, "_ZN5Shape4areaEv");
    }
}
