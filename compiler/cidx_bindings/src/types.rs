//! Semantic types, generic over how a binding is referenced.
//!
//! The binder builds `Type<BindingId>`; the index store persists the same
//! shape as `Type<RecordNo>`. [`Type::map_refs`] converts between the two.
//!
//! Typedefs never appear in a `Type`: they are replaced by their target when
//! the type is built, so two spellings of one type compare equal.

use serde::{Deserialize, Serialize};

use cidx_ir::ast::{BuiltinType, CvQualifiers};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type<R> {
    Builtin(BuiltinType),
    /// Class or enumeration.
    Named(R),
    Pointer(Box<Type<R>>),
    LValueRef(Box<Type<R>>),
    RValueRef(Box<Type<R>>),
    /// Never wraps another `Qualified` and never carries empty qualifiers.
    Qualified(CvQualifiers, Box<Type<R>>),
    Array(Box<Type<R>>, Option<u64>),
    Function(FunctionType<R>),
    TemplateParam(R),
    /// `Vec<int>` where no explicit specialization matches the arguments.
    Instance {
        template: R,
        args: Vec<TemplateArgument<R>>,
    },
    /// Named through a template parameter (`typename T::value_type`).
    Dependent,
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionType<R> {
    pub ret: Box<Type<R>>,
    pub params: Vec<Type<R>>,
    pub variadic: bool,
    /// Qualifiers of the implicit object parameter.
    pub cv: CvQualifiers,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemplateArgument<R> {
    Type(Type<R>),
    Value(i64),
    /// A non-type argument that is not a constant we can evaluate.
    Unknown,
}

/// Base class of a class, as written.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Base<R> {
    pub ty: Type<R>,
    pub access: cidx_ir::ast::Access,
    pub is_virtual: bool,
}

impl<R: Copy> Type<R> {
    /// `cv inner`, folding nested qualification.
    pub fn qualified(cv: CvQualifiers, inner: Type<R>) -> Type<R> {
        if cv.is_empty() {
            return inner;
        }
        match inner {
            Type::Qualified(existing, inner) => Type::Qualified(existing.union(cv), inner),
            // References cannot be qualified.
            Type::LValueRef(_) | Type::RValueRef(_) => inner,
            other => Type::Qualified(cv, Box::new(other)),
        }
    }

    #[must_use]
    pub fn pointer_to(self) -> Type<R> {
        Type::Pointer(Box::new(self))
    }

    #[must_use]
    pub fn lvalue_ref_to(self) -> Type<R> {
        match self {
            // Reference collapsing.
            Type::LValueRef(_) => self,
            Type::RValueRef(inner) => Type::LValueRef(inner),
            other => Type::LValueRef(Box::new(other)),
        }
    }

    #[must_use]
    pub fn rvalue_ref_to(self) -> Type<R> {
        match self {
            Type::LValueRef(_) | Type::RValueRef(_) => self,
            other => Type::RValueRef(Box::new(other)),
        }
    }

    /// Top-level qualifiers and the type under them.
    pub fn split_cv(&self) -> (CvQualifiers, &Type<R>) {
        match self {
            Type::Qualified(cv, inner) => (*cv, inner),
            other => (CvQualifiers::NONE, other),
        }
    }

    /// The type without top-level qualifiers.
    pub fn unqualified(&self) -> &Type<R> {
        self.split_cv().1
    }

    /// The referenced type for references, `self` otherwise.
    pub fn non_reference(&self) -> &Type<R> {
        match self {
            Type::LValueRef(inner) | Type::RValueRef(inner) => inner,
            other => other,
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Type::LValueRef(_) | Type::RValueRef(_))
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.unqualified(), Type::Pointer(_))
    }

    /// Pointee or element type.
    pub fn pointee(&self) -> Option<&Type<R>> {
        match self.non_reference().unqualified() {
            Type::Pointer(inner) | Type::Array(inner, _) => Some(inner),
            _ => None,
        }
    }

    /// The class an object of this type is, seeing through references and
    /// qualifiers.
    pub fn class_ref(&self) -> Option<R> {
        match self.non_reference().unqualified() {
            Type::Named(r) => Some(*r),
            Type::Instance { template, .. } => Some(*template),
            _ => None,
        }
    }

    /// True when the type mentions a template parameter.
    pub fn is_dependent(&self) -> bool {
        match self {
            Type::TemplateParam(_) | Type::Dependent => true,
            Type::Builtin(_) | Type::Named(_) | Type::Unknown => false,
            Type::Pointer(inner)
            | Type::LValueRef(inner)
            | Type::RValueRef(inner)
            | Type::Qualified(_, inner)
            | Type::Array(inner, _) => inner.is_dependent(),
            Type::Function(f) => f.ret.is_dependent() || f.params.iter().any(Type::is_dependent),
            Type::Instance { args, .. } => args.iter().any(TemplateArgument::is_dependent),
        }
    }

    /// Same type with every binding reference converted by `f`.
    pub fn map_refs<S: Copy>(&self, f: &mut impl FnMut(R) -> S) -> Type<S> {
        match self {
            Type::Builtin(b) => Type::Builtin(*b),
            Type::Named(r) => Type::Named(f(*r)),
            Type::Pointer(inner) => Type::Pointer(Box::new(inner.map_refs(f))),
            Type::LValueRef(inner) => Type::LValueRef(Box::new(inner.map_refs(f))),
            Type::RValueRef(inner) => Type::RValueRef(Box::new(inner.map_refs(f))),
            Type::Qualified(cv, inner) => Type::Qualified(*cv, Box::new(inner.map_refs(f))),
            Type::Array(inner, len) => Type::Array(Box::new(inner.map_refs(f)), *len),
            Type::Function(func) => Type::Function(func.map_refs(f)),
            Type::TemplateParam(r) => Type::TemplateParam(f(*r)),
            Type::Instance { template, args } => Type::Instance {
                template: f(*template),
                args: args.iter().map(|a| a.map_refs(f)).collect(),
            },
            Type::Dependent => Type::Dependent,
            Type::Unknown => Type::Unknown,
        }
    }
}

impl<R: Copy + Eq> Type<R> {
    /// Replace template parameters bound in `map`.
    #[must_use]
    pub fn substitute(&self, map: &ArgMap<R>) -> Type<R> {
        if map.is_empty() {
            return self.clone();
        }
        match self {
            Type::TemplateParam(param) => match map.get(*param) {
                Some(TemplateArgument::Type(ty)) => ty.clone(),
                _ => self.clone(),
            },
            Type::Pointer(inner) => inner.substitute(map).pointer_to(),
            Type::LValueRef(inner) => inner.substitute(map).lvalue_ref_to(),
            Type::RValueRef(inner) => inner.substitute(map).rvalue_ref_to(),
            Type::Qualified(cv, inner) => Type::qualified(*cv, inner.substitute(map)),
            Type::Array(inner, len) => Type::Array(Box::new(inner.substitute(map)), *len),
            Type::Function(f) => Type::Function(FunctionType {
                ret: Box::new(f.ret.substitute(map)),
                params: f.params.iter().map(|p| p.substitute(map)).collect(),
                variadic: f.variadic,
                cv: f.cv,
            }),
            Type::Instance { template, args } => Type::Instance {
                template: *template,
                args: args.iter().map(|a| a.substitute(map)).collect(),
            },
            Type::Builtin(_) | Type::Named(_) | Type::Dependent | Type::Unknown => self.clone(),
        }
    }
}

impl<R: Copy> FunctionType<R> {
    pub fn map_refs<S: Copy>(&self, f: &mut impl FnMut(R) -> S) -> FunctionType<S> {
        FunctionType {
            ret: Box::new(self.ret.map_refs(f)),
            params: self.params.iter().map(|p| p.map_refs(f)).collect(),
            variadic: self.variadic,
            cv: self.cv,
        }
    }
}

impl<R: Copy> TemplateArgument<R> {
    pub fn is_dependent(&self) -> bool {
        match self {
            TemplateArgument::Type(ty) => ty.is_dependent(),
            TemplateArgument::Value(_) | TemplateArgument::Unknown => false,
        }
    }

    pub fn map_refs<S: Copy>(&self, f: &mut impl FnMut(R) -> S) -> TemplateArgument<S> {
        match self {
            TemplateArgument::Type(ty) => TemplateArgument::Type(ty.map_refs(f)),
            TemplateArgument::Value(v) => TemplateArgument::Value(*v),
            TemplateArgument::Unknown => TemplateArgument::Unknown,
        }
    }
}

impl<R: Copy + Eq> TemplateArgument<R> {
    #[must_use]
    pub fn substitute(&self, map: &ArgMap<R>) -> TemplateArgument<R> {
        match self {
            // A non-type parameter used as an argument takes the bound value.
            TemplateArgument::Type(Type::TemplateParam(param)) => match map.get(*param) {
                Some(arg) => arg.clone(),
                None => self.clone(),
            },
            TemplateArgument::Type(ty) => TemplateArgument::Type(ty.substitute(map)),
            TemplateArgument::Value(_) | TemplateArgument::Unknown => self.clone(),
        }
    }
}

impl<R: Copy> Base<R> {
    pub fn map_refs<S: Copy>(&self, f: &mut impl FnMut(R) -> S) -> Base<S> {
        Base {
            ty: self.ty.map_refs(f),
            access: self.access,
            is_virtual: self.is_virtual,
        }
    }
}

/// Template parameters bound to arguments, in parameter order.
///
/// Two maps are equal when they bind the same parameters to the same
/// arguments in the same order; the index store relies on this to reuse an
/// existing implicit specialization.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArgMap<R> {
    entries: Vec<(R, TemplateArgument<R>)>,
}

impl<R> Default for ArgMap<R> {
    fn default() -> Self {
        ArgMap {
            entries: Vec::new(),
        }
    }
}

impl<R: Copy + Eq> ArgMap<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair `params` with `args` positionally; extra parameters stay unbound.
    pub fn from_pairs(params: &[R], args: Vec<TemplateArgument<R>>) -> Self {
        ArgMap {
            entries: params.iter().copied().zip(args).collect(),
        }
    }

    /// Bind `param`, replacing an earlier binding.
    pub fn insert(&mut self, param: R, arg: TemplateArgument<R>) {
        if let Some(entry) = self.entries.iter_mut().find(|(p, _)| *p == param) {
            entry.1 = arg;
        } else {
            self.entries.push((param, arg));
        }
    }

    pub fn get(&self, param: R) -> Option<&TemplateArgument<R>> {
        self.entries
            .iter()
            .find(|(p, _)| *p == param)
            .map(|(_, arg)| arg)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(R, TemplateArgument<R>)> {
        self.entries.iter()
    }

    pub fn args(&self) -> impl Iterator<Item = &TemplateArgument<R>> {
        self.entries.iter().map(|(_, arg)| arg)
    }

    pub fn is_dependent(&self) -> bool {
        self.args().any(TemplateArgument::is_dependent)
    }

    /// Apply `outer` to every argument: `self` then `outer`.
    #[must_use]
    pub fn compose(&self, outer: &ArgMap<R>) -> ArgMap<R> {
        ArgMap {
            entries: self
                .entries
                .iter()
                .map(|(p, arg)| (*p, arg.substitute(outer)))
                .collect(),
        }
    }

    pub fn map_refs<S: Copy>(&self, f: &mut impl FnMut(R) -> S) -> ArgMap<S> {
        ArgMap {
            entries: self
                .entries
                .iter()
                .map(|(p, arg)| (f(*p), arg.map_refs(f)))
                .collect(),
        }
    }
}
