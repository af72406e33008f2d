//! Arena indices for AST nodes.

use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn new(index: u32) -> Self {
                $name(index)
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

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

define_id!(
    /// Index of a declaration in the [`super::AstArena`].
    DeclId
);
define_id!(
    /// Index of a statement in the [`super::AstArena`].
    StmtId
);
define_id!(
    /// Index of an expression in the [`super::AstArena`].
    ExprId
);
define_id!(
    /// Index of a (possibly qualified) name in the [`super::AstArena`].
    ///
    /// Binding resolution results are keyed by this id.
    NameId
);
define_id!(
    /// Index of a syntax problem in the parse result's diagnostic list.
    ProblemId
);
