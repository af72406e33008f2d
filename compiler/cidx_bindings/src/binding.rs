//! Bindings: the entities names resolve to.
//!
//! One tagged [`Binding`] struct covers every kind of entity; the
//! [`BindingKind`] discriminant decides which fields are meaningful.
//! Bindings reference each other by [`BindingId`], so cyclic structure
//! (a class whose member returns the class) needs no shared pointers.

use std::fmt;

use cidx_ir::ast::{Access, ClassKey, DeclSpecifiers};
use cidx_ir::{Dialect, Name};

use crate::scope::ScopeId;
use crate::types::{ArgMap, Base, Type};

/// Index of a binding in a [`BindingArena`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct BindingId(u32);

impl BindingId {
    #[inline]
    pub const fn new(index: u32) -> Self {
        BindingId(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BindingId({})", self.0)
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BindingKind {
    Namespace,
    Class,
    ClassTemplate,
    /// Explicit or partial specialization declared in source.
    ClassSpecialization,
    Function,
    FunctionTemplate,
    FunctionSpecialization,
    Method,
    Constructor,
    Field,
    Variable,
    Typedef,
    Enumeration,
    Enumerator,
    TemplateParameter,
}

impl BindingKind {
    pub const ALL: [BindingKind; 15] = [
        BindingKind::Namespace,
        BindingKind::Class,
        BindingKind::ClassTemplate,
        BindingKind::ClassSpecialization,
        BindingKind::Function,
        BindingKind::FunctionTemplate,
        BindingKind::FunctionSpecialization,
        BindingKind::Method,
        BindingKind::Constructor,
        BindingKind::Field,
        BindingKind::Variable,
        BindingKind::Typedef,
        BindingKind::Enumeration,
        BindingKind::Enumerator,
        BindingKind::TemplateParameter,
    ];

    /// Owns a scope that other bindings are declared in.
    pub const fn is_scope(self) -> bool {
        matches!(
            self,
            BindingKind::Namespace
                | BindingKind::Class
                | BindingKind::ClassTemplate
                | BindingKind::ClassSpecialization
                | BindingKind::Enumeration
        ) || self.is_function()
    }

    pub const fn is_specialization(self) -> bool {
        matches!(
            self,
            BindingKind::ClassSpecialization | BindingKind::FunctionSpecialization
        )
    }

    pub const fn is_template(self) -> bool {
        matches!(self, BindingKind::ClassTemplate | BindingKind::FunctionTemplate)
    }

    pub const fn is_class(self) -> bool {
        matches!(
            self,
            BindingKind::Class | BindingKind::ClassTemplate | BindingKind::ClassSpecialization
        )
    }

    pub const fn is_function(self) -> bool {
        matches!(
            self,
            BindingKind::Function
                | BindingKind::FunctionTemplate
                | BindingKind::FunctionSpecialization
                | BindingKind::Method
                | BindingKind::Constructor
        )
    }

    /// Names a type.
    pub const fn is_type(self) -> bool {
        self.is_class()
            || matches!(
                self,
                BindingKind::Typedef | BindingKind::Enumeration | BindingKind::TemplateParameter
            )
    }

    /// Names an object or value.
    pub const fn is_object(self) -> bool {
        matches!(
            self,
            BindingKind::Field | BindingKind::Variable | BindingKind::Enumerator
        )
    }

    /// Stable numeric code used in persisted records.
    pub const fn code(self) -> u8 {
        match self {
            BindingKind::Namespace => 1,
            BindingKind::Class => 2,
            BindingKind::ClassTemplate => 3,
            BindingKind::ClassSpecialization => 4,
            BindingKind::Function => 5,
            BindingKind::FunctionTemplate => 6,
            BindingKind::FunctionSpecialization => 7,
            BindingKind::Method => 8,
            BindingKind::Constructor => 9,
            BindingKind::Field => 10,
            BindingKind::Variable => 11,
            BindingKind::Typedef => 12,
            BindingKind::Enumeration => 13,
            BindingKind::Enumerator => 14,
            BindingKind::TemplateParameter => 15,
        }
    }

    pub const fn from_code(code: u8) -> Option<BindingKind> {
        if code == 0 || code as usize > Self::ALL.len() {
            return None;
        }
        Some(Self::ALL[code as usize - 1])
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            BindingKind::Namespace => "namespace",
            BindingKind::Class => "class",
            BindingKind::ClassTemplate => "class template",
            BindingKind::ClassSpecialization => "class specialization",
            BindingKind::Function => "function",
            BindingKind::FunctionTemplate => "function template",
            BindingKind::FunctionSpecialization => "function specialization",
            BindingKind::Method => "method",
            BindingKind::Constructor => "constructor",
            BindingKind::Field => "field",
            BindingKind::Variable => "variable",
            BindingKind::Typedef => "typedef",
            BindingKind::Enumeration => "enumeration",
            BindingKind::Enumerator => "enumerator",
            BindingKind::TemplateParameter => "template parameter",
        }
    }
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The generic a specialization was made from and its arguments.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Specialization {
    pub generic: BindingId,
    pub args: ArgMap<BindingId>,
}

/// A declared entity.
#[derive(Clone, Debug, PartialEq)]
pub struct Binding {
    pub kind: BindingKind,
    /// Destructors are named `~X`; anonymous entities use `Name::EMPTY`.
    pub name: Name,
    /// Enclosing binding; `None` at global scope.
    pub owner: Option<BindingId>,
    pub linkage: Dialect,
    /// Object type, function type, typedef target or enum underlying type.
    pub ty: Option<Type<BindingId>>,
    pub access: Option<Access>,
    pub specifiers: DeclSpecifiers,
    pub class_key: Option<ClassKey>,
    pub bases: Vec<Base<BindingId>>,
    /// Parameters of a template or partial specialization, in order.
    pub template_params: Vec<BindingId>,
    pub specialization: Option<Specialization>,
    /// Explicit and partial specializations of a template.
    pub specializations: Vec<BindingId>,
    /// Position of a template parameter in its list.
    pub position: u16,
    /// Enumerator value, when it is a constant.
    pub value: Option<i64>,
    /// Trailing parameters with default arguments.
    pub defaults: u16,
    /// `enum class`.
    pub scoped: bool,
    pub scope: Option<ScopeId>,
    pub is_defined: bool,
    /// Bindings declared directly inside this one, in declaration order.
    pub members: Vec<BindingId>,
}

impl Binding {
    pub fn new(kind: BindingKind, name: Name, owner: Option<BindingId>, linkage: Dialect) -> Self {
        Binding {
            kind,
            name,
            owner,
            linkage,
            ty: None,
            access: None,
            specifiers: DeclSpecifiers::empty(),
            class_key: None,
            bases: Vec::new(),
            template_params: Vec::new(),
            specialization: None,
            specializations: Vec::new(),
            position: 0,
            value: None,
            defaults: 0,
            scoped: false,
            scope: None,
            is_defined: false,
            members: Vec::new(),
        }
    }

    /// Template parameters are visible to everything declared inside them.
    pub fn is_templated(&self) -> bool {
        !self.template_params.is_empty()
    }
}

/// Storage for every binding of one translation unit.
#[derive(Clone, Debug, Default)]
pub struct BindingArena {
    bindings: Vec<Binding>,
}

impl BindingArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `binding` and append it to its owner's members.
    pub fn alloc(&mut self, binding: Binding) -> BindingId {
        let id = BindingId::new(u32::try_from(self.bindings.len()).unwrap_or(u32::MAX));
        let owner = binding.owner;
        self.bindings.push(binding);
        if let Some(owner) = owner {
            self.bindings[owner.index()].members.push(id);
        }
        id
    }

    #[inline]
    pub fn get(&self, id: BindingId) -> &Binding {
        &self.bindings[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: BindingId) -> &mut Binding {
        &mut self.bindings[id.index()]
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BindingId, &Binding)> {
        self.bindings
            .iter()
            .enumerate()
            .map(|(i, b)| (BindingId::new(u32::try_from(i).unwrap_or(u32::MAX)), b))
    }

    /// Bindings declared at global scope.
    pub fn roots(&self) -> impl Iterator<Item = BindingId> + '_ {
        self.iter().filter(|(_, b)| b.owner.is_none()).map(|(id, _)| id)
    }

    /// Owners from the binding outward, excluding the binding itself.
    pub fn ancestors(&self, id: BindingId) -> impl Iterator<Item = BindingId> + '_ {
        std::iter::successors(self.get(id).owner, move |&b| self.get(b).owner)
    }

    /// True when `base` is `derived` or one of its direct or indirect bases.
    pub fn is_base_of(&self, base: BindingId, derived: BindingId) -> bool {
        let mut seen = Vec::new();
        self.is_base_of_inner(base, derived, &mut seen)
    }

    fn is_base_of_inner(&self, base: BindingId, derived: BindingId, seen: &mut Vec<BindingId>) -> bool {
        if base == derived {
            return true;
        }
        if seen.contains(&derived) {
            return false;
        }
        seen.push(derived);
        self.get(derived)
            .bases
            .iter()
            .filter_map(|b| b.ty.class_ref())
            .any(|b| self.is_base_of_inner(base, b, seen))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::types::Type;
    use cidx_ir::ast::Access;

    #[test]
    fn kind_codes_round_trip() {
        for kind in BindingKind::ALL {
            assert_eq!(BindingKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(BindingKind::from_code(0), None);
        assert_eq!(BindingKind::from_code(16), None);
    }

    #[test]
    fn capabilities() {
        assert!(BindingKind::Namespace.is_scope());
        assert!(BindingKind::Constructor.is_scope());
        assert!(!BindingKind::Field.is_scope());
        assert!(BindingKind::ClassSpecialization.is_specialization());
        assert!(BindingKind::FunctionTemplate.is_template());
        assert!(BindingKind::TemplateParameter.is_type());
        assert!(BindingKind::Enumerator.is_object());
    }

    #[test]
    fn members_follow_owners() {
        let mut arena = BindingArena::new();
        let ns = arena.alloc(Binding::new(BindingKind::Namespace, Name::EMPTY, None, Dialect::Cpp));
        let class = arena.alloc(Binding::new(BindingKind::Class, Name::EMPTY, Some(ns), Dialect::Cpp));
        let field = arena.alloc(Binding::new(BindingKind::Field, Name::EMPTY, Some(class), Dialect::Cpp));
        assert_eq!(arena.get(ns).members, vec![class]);
        assert_eq!(arena.ancestors(field).collect::<Vec<_>>(), vec![class, ns]);
        assert_eq!(arena.roots().collect::<Vec<_>>(), vec![ns]);
    }

    #[test]
    fn base_chain() {
        let mut arena = BindingArena::new();
        let a = arena.alloc(Binding::new(BindingKind::Class, Name::EMPTY, None, Dialect::Cpp));
        let b = arena.alloc(Binding::new(BindingKind::Class, Name::EMPTY, None, Dialect::Cpp));
        let c = arena.alloc(Binding::new(BindingKind::Class, Name::EMPTY, None, Dialect::Cpp));
        for (derived, base) in [(b, a), (c, b), (a, c)] {
            arena.get_mut(derived).bases.push(Base {
                ty: Type::Named(base),
                access: Access::Public,
                is_virtual: false,
            });
        }
        assert!(arena.is_base_of(a, c));
        // The cycle a -> c -> b -> a terminates.
        let d = arena.alloc(Binding::new(BindingKind::Class, Name::EMPTY, None, Dialect::Cpp));
        assert!(!arena.is_base_of(d, a));
    }
}
