use smallvec::SmallVec;

use crate::arena::Id;
use crate::decl::Decl;
use crate::expr::Expr;
use crate::modifiers::Qualifier;
use crate::span::SourceSpan;

pub type TypeId = Id<TypeNode>;
pub type DeclId = Id<Decl>;
pub type ExprId = Id<Expr>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeCommon {
    pub span: SourceSpan,
    pub qualifier: Qualifier,
    /// Function-return temporaries are `lvalue` but always `const` (GULC's
    /// `Type::isLValue` doc comment carried over verbatim in spirit).
    pub is_lvalue: bool,
}

#[derive(Debug, Clone)]
pub struct TypeNode {
    pub common: TypeCommon,
    pub kind: TypeKind,
}

impl TypeNode {
    pub fn new(span: SourceSpan, kind: TypeKind) -> Self {
        Self {
            common: TypeCommon { span, qualifier: Qualifier::Unassigned, is_lvalue: false },
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltInKind {
    Void,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F16,
    F32,
    F64,
    Char,
}

impl BuiltInKind {
    pub fn size_bits(self) -> u32 {
        match self {
            BuiltInKind::Void => 0,
            BuiltInKind::I8 | BuiltInKind::U8 => 8,
            BuiltInKind::I16 | BuiltInKind::U16 | BuiltInKind::F16 => 16,
            BuiltInKind::I32 | BuiltInKind::U32 | BuiltInKind::F32 => 32,
            BuiltInKind::I64 | BuiltInKind::U64 | BuiltInKind::F64 => 64,
            BuiltInKind::Char => 32,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(self, BuiltInKind::I8 | BuiltInKind::I16 | BuiltInKind::I32 | BuiltInKind::I64)
    }

    pub fn is_floating(self) -> bool {
        matches!(self, BuiltInKind::F16 | BuiltInKind::F32 | BuiltInKind::F64)
    }

    pub fn name(self) -> &'static str {
        match self {
            BuiltInKind::Void => "void",
            BuiltInKind::I8 => "i8",
            BuiltInKind::I16 => "i16",
            BuiltInKind::I32 => "i32",
            BuiltInKind::I64 => "i64",
            BuiltInKind::U8 => "u8",
            BuiltInKind::U16 => "u16",
            BuiltInKind::U32 => "u32",
            BuiltInKind::U64 => "u64",
            BuiltInKind::F16 => "f16",
            BuiltInKind::F32 => "f32",
            BuiltInKind::F64 => "f64",
            BuiltInKind::Char => "char",
        }
    }
}

/// A single `Dimension` shape entry in a multi-D array type, e.g. `[4][N]`.
#[derive(Debug, Clone, Copy)]
pub enum DimensionSize {
    Known(u64),
    /// Bound by a `const` template parameter not yet substituted.
    TemplateConst(DeclId),
}

#[derive(Debug, Clone)]
pub struct FunctionPointerSignature {
    pub param_labels: Vec<String>,
    pub param_types: Vec<TypeId>,
    pub return_type: TypeId,
}

/// A candidate declaration before §4.2/§4.4 disambiguation has picked a
/// unique match; carries the raw template-argument expressions and the
/// candidate list gathered from name lookup.
#[derive(Debug, Clone)]
pub struct TemplatedTypeCandidates {
    pub path: Vec<String>,
    pub template_arguments: SmallVec<[ExprId; 4]>,
    pub matching_template_decls: Vec<DeclId>,
}

#[derive(Debug, Clone)]
pub struct UnresolvedPath {
    pub namespace_path: Vec<String>,
    pub identifier: String,
    pub template_arguments: SmallVec<[ExprId; 4]>,
}

#[derive(Debug, Clone)]
pub struct DependentPath {
    pub container: TypeId,
    pub dependent: TypeId,
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    BuiltIn(BuiltInKind),
    Bool,
    Pointer { nested: TypeId },
    Reference { nested: TypeId },
    RValueReference { nested: TypeId },
    FunctionPointer(FunctionPointerSignature),
    Dimension { element: TypeId, sizes: SmallVec<[DimensionSize; 2]> },
    FlatArray { element: TypeId, length: u64 },
    Enum { decl: DeclId },
    Struct { decl: DeclId },
    Trait { decl: DeclId },
    TemplateStruct { decl: DeclId },
    TemplateTrait { decl: DeclId },
    /// An as-yet-unresolved reference to a template parameter.
    /// `ref_template_parameter` is the `DeclId` of the `TemplateParameter`
    /// decl this refers to; substitution rewrites this node's `kind` in
    /// place once the enclosing instantiation supplies a concrete argument.
    TemplateTypenameRef { ref_template_parameter: DeclId },
    /// Candidate list before §4.2/§4.4 pick a unique match.
    TemplatedType(TemplatedTypeCandidates),
    Dependent(DependentPath),
    /// `X<T>.Y<U>.Z` before the nested path has been walked.
    UnresolvedNested { base: TypeId, segments: Vec<UnresolvedPath> },
    /// A dotted namespace path plus identifier plus template args, not yet
    /// looked up at all.
    Unresolved(UnresolvedPath),
    Alias { decl: DeclId },
    Imaginary { nested: TypeId },
    /// `Self` inside an enum/struct/trait body; rewritten to the concrete
    /// enclosing type during P2.
    SelfType,
    VTable { owner: DeclId },
    Labeled { label: String, nested: TypeId },
}
