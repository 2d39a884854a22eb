use crate::arena::Id;
use crate::attr::AttrId;
use crate::cont::ContId;
use crate::expr::{ConstructorKind, ExprId, InfixOp};
use crate::ident::Identifier;
use crate::modifiers::{DeclModifiers, Visibility};
use crate::span::SourceSpan;
use crate::stmt::StmtId;
use crate::ty::TypeId;

pub type DeclId = Id<Decl>;

/// Fields shared by every declaration variant.
#[derive(Debug, Clone)]
pub struct DeclCommon {
    pub span: SourceSpan,
    pub source_file_id: u32,
    pub visibility: Visibility,
    pub identifier: Identifier,
    pub attributes: Vec<AttrId>,
    pub modifiers: DeclModifiers,
    pub is_const_expr: bool,
    /// Filled by P8. Empty before that pass runs.
    pub mangled_name: String,
    /// The namespace/struct/trait/etc. this decl is nested within. `None`
    /// only for a top-level (file-level) declaration.
    pub container: Option<DeclId>,
    /// True if `container`, or its container ad infinitum, is a template.
    /// `StructA<i32>::Inner` and `StructA<i8>::Inner` are distinct decls.
    pub contained_in_template: bool,
    /// Set on copies produced by P6; points at the template source.
    pub original_decl: Option<DeclId>,
}

impl DeclCommon {
    pub fn new(span: SourceSpan, source_file_id: u32, identifier: Identifier) -> Self {
        Self {
            span,
            source_file_id,
            visibility: Visibility::Unassigned,
            identifier,
            attributes: Vec::new(),
            modifiers: DeclModifiers::empty(),
            is_const_expr: false,
            mangled_name: String::new(),
            container: None,
            contained_in_template: false,
            original_decl: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Decl {
    pub common: DeclCommon,
    pub kind: DeclKind,
}

impl Decl {
    pub fn new(common: DeclCommon, kind: DeclKind) -> Self {
        Self { common, kind }
    }

    pub fn name(&self) -> &str {
        &self.common.identifier.name
    }
}

/// Fields shared by `Struct`/`TemplateStruct`/`TemplateStructInst` (they
/// differ only in whether they carry a template parameter list or an
/// argument list — see [`DeclKind`]).
#[derive(Debug, Clone, Default)]
pub struct StructBody {
    /// At most one; multi-struct inheritance is rejected.
    pub base_struct: Option<DeclId>,
    pub base_traits: Vec<DeclId>,
    /// Inheritance-list types before P4 resolves them.
    pub unresolved_bases: Vec<TypeId>,
    pub members: Vec<DeclId>,
    pub constructors: Vec<DeclId>,
    pub destructor: Option<DeclId>,
    /// Populated by P7 in override order, for the back-end v-table symbols.
    pub vtable: Vec<DeclId>,
    pub vtable_name: String,
    /// P4 re-entry guard.
    pub base_was_resolved: bool,
    pub contracts: Vec<ContId>,
    pub is_union: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TraitBody {
    pub base_traits: Vec<DeclId>,
    pub unresolved_bases: Vec<TypeId>,
    pub members: Vec<DeclId>,
}

#[derive(Debug, Clone, Default)]
pub struct EnumBody {
    pub base_type: Option<TypeId>,
    pub constants: Vec<DeclId>,
}

#[derive(Debug, Clone, Default)]
pub struct FunctionBody {
    pub parameters: Vec<DeclId>,
    pub return_type: Option<TypeId>,
    pub contracts: Vec<ContId>,
    /// `None` for a prototype/extern declaration with no body.
    pub body: Option<StmtId>,
}

#[derive(Debug, Clone)]
pub enum TemplateParameterKind {
    Typename { default: Option<TypeId> },
    Const { const_type: TypeId, default: Option<ExprId> },
}

#[derive(Debug, Clone)]
pub enum DeclKind {
    Import { path: Vec<String> },

    /// Set by P1; holds every nested decl merged from every file sharing
    /// this dotted path. `prototype` is filled on the *original* per-file
    /// namespace decl, pointing at the canonical merged one.
    Namespace { nested_decls: Vec<DeclId>, prototype: Option<DeclId> },

    Struct(StructBody),
    TemplateStruct { body: StructBody, template_parameters: Vec<DeclId> },
    TemplateStructInst { body: StructBody, template_arguments: Vec<ExprId> },

    Trait(TraitBody),
    TemplateTrait { body: TraitBody, template_parameters: Vec<DeclId> },
    TemplateTraitInst { body: TraitBody, template_arguments: Vec<ExprId> },

    Enum(EnumBody),
    EnumConst { value: Option<ExprId> },

    Function(FunctionBody),
    TemplateFunction { body: FunctionBody, template_parameters: Vec<DeclId> },
    TemplateFunctionInst { body: FunctionBody, template_arguments: Vec<ExprId> },

    Constructor { kind: ConstructorKind, body: FunctionBody },
    Destructor { body: FunctionBody },

    Operator { op: InfixOp, body: FunctionBody },
    CastOperator { target_type: TypeId, body: FunctionBody },
    CallOperator { body: FunctionBody },
    SubscriptOperatorGet { body: FunctionBody },
    SubscriptOperatorSet { body: FunctionBody },

    PropertyGet { body: FunctionBody },
    PropertySet { body: FunctionBody },
    Property { getter: Option<DeclId>, setter: Option<DeclId>, property_type: TypeId },

    Extension { extended_type: TypeId, base_traits: Vec<DeclId>, members: Vec<DeclId> },

    Attribute { parameters: Vec<DeclId> },

    TypeAlias { aliased_type: TypeId },
    TypeSuffix { suffix: String, aliased_type: TypeId },

    Variable { var_type: Option<TypeId>, initializer: Option<ExprId> },
    Parameter { argument_label: Option<String>, param_type: TypeId, default_value: Option<ExprId> },
    TemplateParameter(TemplateParameterKind),
}

impl DeclKind {
    pub fn struct_body(&self) -> Option<&StructBody> {
        match self {
            DeclKind::Struct(b) => Some(b),
            DeclKind::TemplateStruct { body, .. } => Some(body),
            DeclKind::TemplateStructInst { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn struct_body_mut(&mut self) -> Option<&mut StructBody> {
        match self {
            DeclKind::Struct(b) => Some(b),
            DeclKind::TemplateStruct { body, .. } => Some(body),
            DeclKind::TemplateStructInst { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn function_body(&self) -> Option<&FunctionBody> {
        match self {
            DeclKind::Function(b)
            | DeclKind::TemplateFunction { body: b, .. }
            | DeclKind::TemplateFunctionInst { body: b, .. }
            | DeclKind::Constructor { body: b, .. }
            | DeclKind::Destructor { body: b }
            | DeclKind::Operator { body: b, .. }
            | DeclKind::CastOperator { body: b, .. }
            | DeclKind::CallOperator { body: b }
            | DeclKind::SubscriptOperatorGet { body: b }
            | DeclKind::SubscriptOperatorSet { body: b }
            | DeclKind::PropertyGet { body: b }
            | DeclKind::PropertySet { body: b } => Some(b),
            _ => None,
        }
    }

    pub fn is_template(&self) -> bool {
        matches!(
            self,
            DeclKind::TemplateStruct { .. } | DeclKind::TemplateTrait { .. } | DeclKind::TemplateFunction { .. }
        )
    }

    pub fn is_template_instantiation(&self) -> bool {
        matches!(
            self,
            DeclKind::TemplateStructInst { .. }
                | DeclKind::TemplateTraitInst { .. }
                | DeclKind::TemplateFunctionInst { .. }
        )
    }
}
