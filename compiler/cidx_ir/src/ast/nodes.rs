//! Declaration, statement, expression and name nodes.

use bitflags::bitflags;

use super::{DeclId, ExprId, NameId, ProblemId, StmtId};
use super::{Access, ClassKey, CvQualifiers, TypeSpec};
use crate::{FileId, Name, Span};

// Names

/// How a name segment is spelled.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum SegmentKind {
    Identifier,
    /// `~X`; `ident` holds `X`.
    Destructor,
    /// `operator+`; `ident` holds the interned `operator+` spelling.
    Operator,
}

/// Explicit template argument written in a template-id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TemplateArg {
    Type(TypeSpec),
    Expr(ExprId),
}

/// One `::`-separated component of a name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NameSegment {
    pub ident: Name,
    pub kind: SegmentKind,
    /// `Some` for a template-id (`C<int>`), even when the list is empty.
    pub template_args: Option<Vec<TemplateArg>>,
    pub span: Span,
}

impl NameSegment {
    pub fn ident(ident: Name, span: Span) -> Self {
        NameSegment {
            ident,
            kind: SegmentKind::Identifier,
            template_args: None,
            span,
        }
    }

    pub fn is_template_id(&self) -> bool {
        self.template_args.is_some()
    }
}

/// A possibly qualified name: `::a::B<int>::c`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NameNode {
    /// Leading `::`.
    pub global: bool,
    pub qualifier: Vec<NameSegment>,
    pub last: NameSegment,
    pub span: Span,
    pub file: FileId,
}

impl NameNode {
    pub fn simple(ident: Name, span: Span, file: FileId) -> Self {
        NameNode {
            global: false,
            qualifier: Vec::new(),
            last: NameSegment::ident(ident, span),
            span,
            file,
        }
    }

    pub fn is_qualified(&self) -> bool {
        self.global || !self.qualifier.is_empty()
    }

    /// All segments, qualifier first.
    pub fn segments(&self) -> impl Iterator<Item = &NameSegment> {
        self.qualifier.iter().chain(std::iter::once(&self.last))
    }
}

// Declarations

bitflags! {
    /// Storage-class and function specifiers written on a declaration.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct DeclSpecifiers: u16 {
        const STATIC = 1 << 0;
        const EXTERN = 1 << 1;
        const INLINE = 1 << 2;
        const VIRTUAL = 1 << 3;
        const EXPLICIT = 1 << 4;
        const MUTABLE = 1 << 5;
        const FRIEND = 1 << 6;
        const CONSTEXPR = 1 << 7;
        const REGISTER = 1 << 8;
        /// Declared inside an `extern "C"` block.
        const EXTERN_C = 1 << 9;
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decl {
    pub kind: DeclKind,
    pub span: Span,
    pub file: FileId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeclKind {
    Namespace(NamespaceDecl),
    /// `extern "C" { ... }` or `extern "C" decl`.
    LinkageSpec { language: Name, body: Vec<DeclId> },
    /// `using namespace N;`
    UsingDirective(NameId),
    /// `using N::x;`
    UsingDeclaration(NameId),
    /// `using X = T;`
    Alias { name: NameId, ty: TypeSpec },
    Typedef { name: NameId, ty: TypeSpec },
    Class(ClassDecl),
    Enum(EnumDecl),
    Function(FunctionDecl),
    Variable(VariableDecl),
    /// `template<...> decl`; `template<>` (no params) is an explicit
    /// specialization.
    Template(TemplateDecl),
    /// `template class X<int>;`
    ExplicitInstantiation(DeclId),
    /// `public:` inside a class body.
    Access(Access),
    Empty,
    Problem(ProblemId),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamespaceDecl {
    /// `None` for an anonymous namespace.
    pub name: Option<NameId>,
    pub is_inline: bool,
    pub body: Vec<DeclId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaseSpec {
    pub name: NameId,
    pub access: Option<Access>,
    pub is_virtual: bool,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassDecl {
    pub key: ClassKey,
    /// `None` for an anonymous class. A template-id here names a
    /// specialization.
    pub name: Option<NameId>,
    pub bases: Vec<BaseSpec>,
    pub members: Vec<DeclId>,
    /// False for `class X;`.
    pub is_definition: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Enumerator {
    pub name: NameId,
    pub value: Option<ExprId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumDecl {
    pub name: Option<NameId>,
    /// `enum class`
    pub scoped: bool,
    pub underlying: Option<TypeSpec>,
    pub enumerators: Vec<Enumerator>,
    pub is_definition: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    pub name: Option<NameId>,
    pub ty: TypeSpec,
    pub default: Option<ExprId>,
    pub span: Span,
}

/// `Base(x)` / `member(x)` in a constructor initializer list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberInit {
    pub name: NameId,
    pub args: Vec<ExprId>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FunctionBody {
    /// Declaration only.
    None,
    /// Body skipped by brace matching in structural mode.
    Skipped(Span),
    Parsed(StmtId),
    /// `= delete`
    Deleted,
    /// `= default`
    Defaulted,
    /// `= 0`
    Pure,
}

impl FunctionBody {
    pub fn is_definition(self) -> bool {
        matches!(
            self,
            FunctionBody::Skipped(_)
                | FunctionBody::Parsed(_)
                | FunctionBody::Deleted
                | FunctionBody::Defaulted
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionDecl {
    pub name: NameId,
    /// `None` for constructors, destructors and conversion operators.
    pub ret: Option<TypeSpec>,
    pub params: Vec<Param>,
    pub variadic: bool,
    /// Trailing `const`/`volatile` on a member function.
    pub cv: CvQualifiers,
    pub specifiers: DeclSpecifiers,
    pub inits: Vec<MemberInit>,
    pub body: FunctionBody,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Initializer {
    /// `= expr`
    Assign(ExprId),
    /// `(args)`
    Construct(Vec<ExprId>),
    /// `{args}` or `= {args}`
    Braced(Vec<ExprId>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariableDecl {
    pub name: NameId,
    pub ty: TypeSpec,
    pub specifiers: DeclSpecifiers,
    pub init: Option<Initializer>,
    /// Bit-field width.
    pub bits: Option<ExprId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TemplateParamKind {
    /// `typename T = Default`
    Type { default: Option<TypeSpec> },
    /// `int N = 3`
    NonType {
        ty: TypeSpec,
        default: Option<ExprId>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateParam {
    pub kind: TemplateParamKind,
    pub name: Option<NameId>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateDecl {
    pub params: Vec<TemplateParam>,
    pub decl: DeclId,
}

impl TemplateDecl {
    pub fn is_explicit_specialization(&self) -> bool {
        self.params.is_empty()
    }
}

// Statements

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StmtKind {
    Compound(Vec<StmtId>),
    Decl(Vec<DeclId>),
    Expr(ExprId),
    Return(Option<ExprId>),
    If {
        cond: ExprId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
    },
    While {
        cond: ExprId,
        body: StmtId,
    },
    DoWhile {
        body: StmtId,
        cond: ExprId,
    },
    For {
        init: Option<StmtId>,
        cond: Option<ExprId>,
        step: Option<ExprId>,
        body: StmtId,
    },
    Switch {
        cond: ExprId,
        body: StmtId,
    },
    /// `case value:` or, without a value, `default:`.
    Case {
        value: Option<ExprId>,
        body: StmtId,
    },
    Label {
        label: Name,
        body: StmtId,
    },
    Goto(Name),
    Try {
        body: StmtId,
        handlers: Vec<Handler>,
    },
    Break,
    Continue,
    Empty,
    Problem(ProblemId),
}

/// `catch (param) body`; `param` is `None` for `catch (...)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Handler {
    pub param: Option<DeclId>,
    pub body: StmtId,
}

// Expressions

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum UnaryOp {
    Plus,
    Neg,
    Not,
    BitNot,
    Deref,
    AddrOf,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
    Comma,
}

impl BinaryOp {
    /// Relational, equality and logical operators yield `bool`.
    pub const fn is_boolean(self) -> bool {
        matches!(
            self,
            BinaryOp::Lt
                | BinaryOp::Gt
                | BinaryOp::Le
                | BinaryOp::Ge
                | BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::And
                | BinaryOp::Or
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExprKind {
    IntLit(Name),
    FloatLit(Name),
    CharLit(Name),
    StringLit(Name),
    Bool(bool),
    Nullptr,
    This,
    Name(NameId),
    Unary {
        op: UnaryOp,
        operand: ExprId,
    },
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    /// `=` when `op` is `None`, otherwise a compound assignment.
    Assign {
        op: Option<BinaryOp>,
        lhs: ExprId,
        rhs: ExprId,
    },
    Conditional {
        cond: ExprId,
        then_expr: ExprId,
        else_expr: ExprId,
    },
    /// C-style or named cast (`static_cast<T>(e)`).
    Cast {
        ty: TypeSpec,
        operand: ExprId,
    },
    /// Functional cast or temporary: `T(args)` / `T{args}`.
    Construct {
        ty: TypeSpec,
        args: Vec<ExprId>,
    },
    SizeofType(TypeSpec),
    SizeofExpr(ExprId),
    Call {
        callee: ExprId,
        args: Vec<ExprId>,
    },
    Member {
        object: ExprId,
        member: NameId,
        arrow: bool,
    },
    Index {
        base: ExprId,
        index: ExprId,
    },
    New {
        ty: TypeSpec,
        args: Vec<ExprId>,
    },
    Delete {
        operand: ExprId,
        array: bool,
    },
    /// `throw` with an optional operand.
    Throw(Option<ExprId>),
    /// Braced initializer list used as an expression.
    InitList(Vec<ExprId>),
    Problem(ProblemId),
}
