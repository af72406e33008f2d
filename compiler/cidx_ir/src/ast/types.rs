//! Syntactic type specifiers and the builtin type set shared with the binder.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{DeclId, ExprId, NameId};

/// Fundamental types, after folding `unsigned long int` style specifier runs.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum BuiltinType {
    Void,
    Bool,
    Char,
    SignedChar,
    UnsignedChar,
    WChar,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
    LongLong,
    UnsignedLongLong,
    Float,
    Double,
    LongDouble,
    /// `decltype(nullptr)`.
    NullPtr,
}

impl BuiltinType {
    pub const fn as_str(self) -> &'static str {
        match self {
            BuiltinType::Void => "void",
            BuiltinType::Bool => "bool",
            BuiltinType::Char => "char",
            BuiltinType::SignedChar => "signed char",
            BuiltinType::UnsignedChar => "unsigned char",
            BuiltinType::WChar => "wchar_t",
            BuiltinType::Short => "short",
            BuiltinType::UnsignedShort => "unsigned short",
            BuiltinType::Int => "int",
            BuiltinType::UnsignedInt => "unsigned int",
            BuiltinType::Long => "long",
            BuiltinType::UnsignedLong => "unsigned long",
            BuiltinType::LongLong => "long long",
            BuiltinType::UnsignedLongLong => "unsigned long long",
            BuiltinType::Float => "float",
            BuiltinType::Double => "double",
            BuiltinType::LongDouble => "long double",
            BuiltinType::NullPtr => "nullptr_t",
        }
    }

    pub const fn is_integral(self) -> bool {
        !matches!(
            self,
            BuiltinType::Void
                | BuiltinType::Float
                | BuiltinType::Double
                | BuiltinType::LongDouble
                | BuiltinType::NullPtr
        )
    }

    pub const fn is_floating(self) -> bool {
        matches!(
            self,
            BuiltinType::Float | BuiltinType::Double | BuiltinType::LongDouble
        )
    }

    pub const fn is_arithmetic(self) -> bool {
        self.is_integral() || self.is_floating()
    }

    /// Integral rank used for promotions; `int` is 3.
    pub const fn integer_rank(self) -> u8 {
        match self {
            BuiltinType::Bool => 0,
            BuiltinType::Char
            | BuiltinType::SignedChar
            | BuiltinType::UnsignedChar => 1,
            BuiltinType::Short | BuiltinType::UnsignedShort | BuiltinType::WChar => 2,
            BuiltinType::Int | BuiltinType::UnsignedInt => 3,
            BuiltinType::Long | BuiltinType::UnsignedLong => 4,
            BuiltinType::LongLong | BuiltinType::UnsignedLongLong => 5,
            _ => u8::MAX,
        }
    }
}

impl fmt::Display for BuiltinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `const` / `volatile` qualification.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct CvQualifiers {
    pub is_const: bool,
    pub is_volatile: bool,
}

impl CvQualifiers {
    pub const NONE: CvQualifiers = CvQualifiers {
        is_const: false,
        is_volatile: false,
    };
    pub const CONST: CvQualifiers = CvQualifiers {
        is_const: true,
        is_volatile: false,
    };

    pub const fn is_empty(self) -> bool {
        !self.is_const && !self.is_volatile
    }

    /// True when `self` has every qualifier `other` has.
    pub const fn covers(self, other: CvQualifiers) -> bool {
        (self.is_const || !other.is_const) && (self.is_volatile || !other.is_volatile)
    }

    #[must_use]
    pub const fn union(self, other: CvQualifiers) -> CvQualifiers {
        CvQualifiers {
            is_const: self.is_const || other.is_const,
            is_volatile: self.is_volatile || other.is_volatile,
        }
    }
}

/// `class`, `struct` or `union`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum ClassKey {
    Class,
    Struct,
    Union,
}

impl ClassKey {
    /// Access of members and bases when none is written.
    pub const fn default_access(self) -> Access {
        match self {
            ClassKey::Class => Access::Private,
            ClassKey::Struct | ClassKey::Union => Access::Public,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ClassKey::Class => "class",
            ClassKey::Struct => "struct",
            ClassKey::Union => "union",
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum Access {
    Public,
    Protected,
    Private,
}

/// What a type specifier names before declarator operators are applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BaseType {
    Builtin(BuiltinType),
    /// A user type named by a (possibly qualified, possibly template-id) name.
    Named(NameId),
    /// Class or enum defined inline in the specifier (`struct { int x; } v;`).
    Inline(DeclId),
    /// `auto` placeholder.
    Auto,
    /// Specifiers could not be understood; a problem was reported.
    Error,
}

/// Declarator operator, innermost first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeOp {
    Pointer(CvQualifiers),
    LValueRef,
    RValueRef,
    Array(Option<ExprId>),
}

/// A written type: base specifier, its cv-qualifiers, then declarator
/// operators applied innermost first.
///
/// `const char* const p[4]` is `Builtin(Char)` with `cv = CONST` and ops
/// `[Pointer(CONST), Array(Some(4))]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeSpec {
    pub base: BaseType,
    pub cv: CvQualifiers,
    pub ops: Vec<TypeOp>,
}

impl TypeSpec {
    pub fn builtin(ty: BuiltinType) -> Self {
        TypeSpec {
            base: BaseType::Builtin(ty),
            cv: CvQualifiers::NONE,
            ops: Vec::new(),
        }
    }

    pub fn named(name: NameId) -> Self {
        TypeSpec {
            base: BaseType::Named(name),
            cv: CvQualifiers::NONE,
            ops: Vec::new(),
        }
    }
}
