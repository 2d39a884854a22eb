use smallvec::SmallVec;

use crate::arena::Id;
use crate::decl::Decl;
use crate::span::SourceSpan;
use crate::ty::TypeId;

pub type ExprId = Id<Expr>;
pub type DeclId = Id<Decl>;

#[derive(Debug, Clone, Copy)]
pub struct ExprCommon {
    pub span: SourceSpan,
    /// Filled by P7. `None` before that pass runs; an invariant of the
    /// pipeline is that it is never `None` afterwards.
    pub value_type: Option<TypeId>,
    pub is_lvalue: bool,
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub common: ExprCommon,
    pub kind: ExprKind,
}

impl Expr {
    pub fn new(span: SourceSpan, kind: ExprKind) -> Self {
        Self {
            common: ExprCommon { span, value_type: None, is_lvalue: false },
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    /// `^^`, the Itanium vendor-extension `v23pow` operator.
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    LogicalAnd,
    LogicalOr,
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    /// `<=>`
    Spaceship,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOp {
    Increment,
    Decrement,
    Plus,
    Negate,
    Not,
    BitNot,
    Deref,
    AddressOf,
    SizeOf,
    AlignOf,
    OffsetOf,
    NameOf,
    TraitsOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostfixOp {
    Increment,
    Decrement,
}

/// `=` or one of the `op=` compound-assignment variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    RemAssign,
    BitAndAssign,
    BitOrAssign,
    BitXorAssign,
    ShlAssign,
    ShrAssign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralType {
    Integer,
    Float,
    Char,
    String,
}

#[derive(Debug, Clone)]
pub struct ValueLiteral {
    pub literal_type: LiteralType,
    /// Raw textual value exactly as it appears in source, used verbatim by
    /// the mangler's `exprPrimary` for template non-type arguments.
    pub value: String,
    /// An explicit type suffix such as `i64` in `42i64`, if present.
    pub suffix: Option<String>,
}

/// Which flavor of constructor a `ConstructorDecl`/`ConstructorCall` is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructorKind {
    Normal,
    Copy,
    Move,
}

/// Copy vs Move rewrite target for struct assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructAssignmentKind {
    Copy,
    Move,
}

#[derive(Debug, Clone)]
pub struct LabeledArgument {
    pub label: Option<String>,
    pub value: ExprId,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    ArrayLiteral { elements: Vec<ExprId> },
    /// Explicit `as` cast.
    As { value: ExprId, target_type: TypeId },
    AssignmentOperator { op: AssignOp, target: ExprId, value: ExprId },
    BoolLiteral(bool),
    ValueLiteral(ValueLiteral),
    InfixOperator { op: InfixOp, left: ExprId, right: ExprId },
    PrefixOperator { op: PrefixOp, operand: ExprId },
    PostfixOperator { op: PostfixOp, operand: ExprId },
    Paren { inner: ExprId },
    Ternary { condition: ExprId, then_value: ExprId, else_value: ExprId },
    /// `try expr`, propagating a thrown error.
    Try { inner: ExprId },
    /// `expr is Type`
    Is { value: ExprId, check_type: TypeId },
    /// `expr has Trait`
    Has { value: ExprId, trait_type: TypeId },
    CheckExtendsType { base: TypeId, extends: TypeId },
    /// An unresolved bare name, replaced by one of the `*Ref` variants once
    /// P7 has looked it up.
    Identifier { path: Vec<String>, template_arguments: SmallVec<[ExprId; 4]> },
    TemplateConstRef { template_parameter: DeclId },
    LocalVariableRef { decl: DeclId },
    ParameterRef { decl: DeclId },
    VariableRef { decl: DeclId },
    MemberVariableRef { object: ExprId, decl: DeclId },
    MemberPropertyRef { object: ExprId, decl: DeclId },
    PropertyRef { decl: DeclId },
    PropertyGetCall { property: ExprId },
    PropertySetCall { property: ExprId, value: ExprId },
    SubscriptRef { object: ExprId, decl: DeclId },
    SubscriptCall { object: ExprId, arguments: Vec<LabeledArgument>, get_or_set: DeclId },
    FunctionReference { decl: DeclId },
    VTableFunctionReference { owner_type: TypeId, vtable_index: usize },
    CallOperatorReference { decl: DeclId },
    ConstructorReference { decl: DeclId },
    ConstructorCall { decl: DeclId, arguments: Vec<LabeledArgument> },
    DestructorReference { decl: DeclId },
    DestructorCall { object: ExprId, decl: DeclId },
    MemberAccessCall { object: ExprId, member: String, arguments: Vec<LabeledArgument> },
    FunctionCall { callee: ExprId, arguments: Vec<LabeledArgument> },
    LabeledArgumentExpr(LabeledArgument),
    /// Inserted by P7 for a lossless implicit conversion (conversion
    /// lattice item 2 and the `as` rule).
    ImplicitCast { inner: ExprId, target_type: TypeId },
    ImplicitDeref { inner: ExprId },
    /// Conversion lattice item 3.
    LValueToRValue { inner: ExprId },
    /// Conversion lattice item 4; creates a temporary binding.
    RValueToInRef { inner: ExprId },
    Ref { inner: ExprId },
    StructAssignmentOperator { kind: StructAssignmentKind, target: ExprId, value: ExprId },
    MemberInfixOperatorCall { op: InfixOp, left: ExprId, right: ExprId, decl: DeclId },
    MemberPrefixOperatorCall { op: PrefixOp, operand: ExprId, decl: DeclId },
    MemberPostfixOperatorCall { op: PostfixOp, operand: ExprId, decl: DeclId },
    /// Wraps an original const expression plus its constant-folded solution.
    SolvedConstExpr { original: ExprId, solution: ExprId },
    StoreTemporaryValue { value: ExprId },
    TemporaryValueRef { store: ExprId },
    /// Wraps a resolved `Type` as an expression, used for template arguments
    /// (e.g. `Box<i32>`'s `i32` argument).
    Type(TypeId),
    /// A `let` binding that appears inside an expression position (e.g. an
    /// `if let` condition).
    VariableDecl { decl: DeclId, initializer: Option<ExprId> },
    EnumConstRef { decl: DeclId },
    CurrentSelf,
}
