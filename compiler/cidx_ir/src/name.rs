//! Interned identifier handle.

use std::fmt;

const LOCAL_BITS: u32 = 28;

/// Handle to a string in a [`StringInterner`](crate::StringInterner).
///
/// The top four bits select the interner shard, the low 28 the slot in it.
/// Handles from one interner are equal exactly when their text is, so
/// macro names, identifiers and binding names compare as integers.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
#[repr(transparent)]
pub struct Name(u32);

impl Name {
    /// The empty string, interned by every interner at slot 0 of shard 0.
    /// Anonymous namespaces, classes and enums are named by it.
    pub const EMPTY: Name = Name(0);

    pub const MAX_LOCAL: u32 = (1 << LOCAL_BITS) - 1;

    pub const NUM_SHARDS: usize = 1 << (32 - LOCAL_BITS);

    #[inline]
    pub const fn new(shard: u32, local: u32) -> Self {
        debug_assert!((shard as usize) < Self::NUM_SHARDS);
        debug_assert!(local <= Self::MAX_LOCAL);
        Name((shard << LOCAL_BITS) | local)
    }

    #[inline]
    pub const fn shard(self) -> usize {
        (self.0 >> LOCAL_BITS) as usize
    }

    #[inline]
    pub const fn local(self) -> usize {
        (self.0 & Self::MAX_LOCAL) as usize
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("Name(<empty>)")
        } else {
            write!(f, "Name({}.{})", self.shard(), self.local())
        }
    }
}
