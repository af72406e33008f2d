//! Lexical scopes.
//!
//! Scopes form a tree rooted at the global scope. Each maps names to the
//! bindings declared in it; a name maps to several bindings for overloads and
//! for a class hidden by a variable of the same name. Namespaces and
//! functions reopened by later declarations keep a single scope.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use cidx_ir::Name;

use crate::binding::BindingId;

#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Debug)]
pub struct ScopeId(u32);

impl ScopeId {
    pub const GLOBAL: ScopeId = ScopeId(0);

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ScopeKind {
    Global,
    Namespace,
    Class,
    Enumeration,
    /// Parameters of a `template<...>` header.
    TemplateParams,
    Function,
    Block,
}

impl ScopeKind {
    /// Scopes a `using namespace` directive can be written in.
    pub const fn takes_directives(self) -> bool {
        matches!(
            self,
            ScopeKind::Global | ScopeKind::Namespace | ScopeKind::Function | ScopeKind::Block
        )
    }
}

pub type Found = SmallVec<[BindingId; 2]>;

#[derive(Clone, Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    /// Binding that owns the scope; `None` for global and block scopes.
    pub owner: Option<BindingId>,
    entries: FxHashMap<Name, Found>,
    /// Namespaces nominated by `using namespace`, plus inline and anonymous
    /// namespaces nested here.
    using: Vec<ScopeId>,
}

#[derive(Clone, Debug)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    pub fn new() -> Self {
        ScopeTree {
            scopes: vec![Scope {
                kind: ScopeKind::Global,
                parent: None,
                owner: None,
                entries: FxHashMap::default(),
                using: Vec::new(),
            }],
        }
    }

    pub fn push(&mut self, kind: ScopeKind, parent: ScopeId, owner: Option<BindingId>) -> ScopeId {
        let id = ScopeId(u32::try_from(self.scopes.len()).unwrap_or(u32::MAX));
        self.scopes.push(Scope {
            kind,
            parent: Some(parent),
            owner,
            entries: FxHashMap::default(),
            using: Vec::new(),
        });
        id
    }

    #[inline]
    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn kind(&self, id: ScopeId) -> ScopeKind {
        self.get(id).kind
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.get(id).parent
    }

    /// Add `binding` under `name`; adding it twice is a no-op.
    pub fn add(&mut self, scope: ScopeId, name: Name, binding: BindingId) {
        let found = self.scopes[scope.index()].entries.entry(name).or_default();
        if !found.contains(&binding) {
            found.push(binding);
        }
    }

    /// Bindings declared directly in `scope` under `name`.
    pub fn local(&self, scope: ScopeId, name: Name) -> &[BindingId] {
        self.get(scope)
            .entries
            .get(&name)
            .map_or(&[] as &[BindingId], |found| found.as_slice())
    }

    pub fn add_using(&mut self, scope: ScopeId, nominated: ScopeId) {
        let using = &mut self.scopes[scope.index()].using;
        if nominated != scope && !using.contains(&nominated) {
            using.push(nominated);
        }
    }

    pub fn using(&self, scope: ScopeId) -> &[ScopeId] {
        &self.get(scope).using
    }

    /// Every name declared in `scope`, for completion.
    pub fn names(&self, scope: ScopeId) -> impl Iterator<Item = (Name, &[BindingId])> {
        self.get(scope)
            .entries
            .iter()
            .map(|(name, found)| (*name, found.as_slice()))
    }

    /// Scopes from `scope` outward, `scope` first.
    pub fn chain(&self, scope: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(scope), move |&s| self.parent(s))
    }

    /// Nearest enclosing scope that is neither a template header nor a class.
    pub fn enclosing_namespace_or_block(&self, scope: ScopeId) -> ScopeId {
        self.chain(scope)
            .find(|&s| {
                matches!(
                    self.kind(s),
                    ScopeKind::Global | ScopeKind::Namespace | ScopeKind::Block | ScopeKind::Function
                )
            })
            .unwrap_or(ScopeId::GLOBAL)
    }

    /// Nearest enclosing namespace (or the global scope).
    pub fn enclosing_namespace(&self, scope: ScopeId) -> ScopeId {
        self.chain(scope)
            .find(|&s| matches!(self.kind(s), ScopeKind::Global | ScopeKind::Namespace))
            .unwrap_or(ScopeId::GLOBAL)
    }

    /// True when a template parameter list encloses `scope`.
    pub fn in_template(&self, scope: ScopeId) -> bool {
        self.chain(scope)
            .any(|s| self.kind(s) == ScopeKind::TemplateParams)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use cidx_ir::StringInterner;

    #[test]
    fn entries_are_deduplicated() {
        let interner = StringInterner::new();
        let x = interner.intern("x");
        let mut tree = ScopeTree::new();
        tree.add(ScopeId::GLOBAL, x, BindingId::new(1));
        tree.add(ScopeId::GLOBAL, x, BindingId::new(1));
        tree.add(ScopeId::GLOBAL, x, BindingId::new(2));
        assert_eq!(tree.local(ScopeId::GLOBAL, x), &[BindingId::new(1), BindingId::new(2)]);
        assert!(tree.local(ScopeId::GLOBAL, interner.intern("y")).is_empty());
    }

    #[test]
    fn chains_and_enclosing_scopes() {
        let mut tree = ScopeTree::new();
        let ns = tree.push(ScopeKind::Namespace, ScopeId::GLOBAL, None);
        let tpl = tree.push(ScopeKind::TemplateParams, ns, None);
        let class = tree.push(ScopeKind::Class, tpl, None);
        assert_eq!(tree.chain(class).collect::<Vec<_>>(), vec![class, tpl, ns, ScopeId::GLOBAL]);
        assert_eq!(tree.enclosing_namespace_or_block(class), ns);
        assert!(tree.in_template(class));
        assert!(!tree.in_template(ns));
    }

    #[test]
    fn using_ignores_self_and_duplicates() {
        let mut tree = ScopeTree::new();
        let ns = tree.push(ScopeKind::Namespace, ScopeId::GLOBAL, None);
        tree.add_using(ScopeId::GLOBAL, ns);
        tree.add_using(ScopeId::GLOBAL, ns);
        tree.add_using(ScopeId::GLOBAL, ScopeId::GLOBAL);
        assert_eq!(tree.using(ScopeId::GLOBAL), &[ns]);
    }
}
