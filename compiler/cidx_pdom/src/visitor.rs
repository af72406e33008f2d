//! Walking stored bindings.

use cidx_ir::stack::ensure_sufficient_stack;
use cidx_ir::{Dialect, VisitAction};

use crate::database::{Database, RecordNo};
use crate::error::PdomResult;
use crate::query::StoredBinding;
use crate::records::BindingRec;

/// Callbacks for [`Database::visit`].
///
/// `visit` decides whether the walk enters a binding's members; `leave` runs
/// after them, whether or not they were entered.
pub trait PdomVisitor {
    fn visit(&mut self, binding: &StoredBinding) -> VisitAction;

    fn leave(&mut self, _binding: &StoredBinding) {}
}

impl Database {
    /// Walk the members of `start`, in declaration order.
    pub fn visit(&self, start: RecordNo, visitor: &mut dyn PdomVisitor) -> PdomResult<()> {
        for child in BindingRec(start).children(self)? {
            self.walk(child, visitor)?;
        }
        Ok(())
    }

    /// Walk every binding of `linkage`, starting from global scope.
    pub fn visit_linkage(&self, linkage: Dialect, visitor: &mut dyn PdomVisitor) -> PdomResult<()> {
        for root in self.roots(linkage)? {
            self.walk(root, visitor)?;
        }
        Ok(())
    }

    fn walk(&self, rec: BindingRec, visitor: &mut dyn PdomVisitor) -> PdomResult<()> {
        ensure_sufficient_stack(|| {
            let binding = self.binding(rec.0)?;
            if visitor.visit(&binding) == VisitAction::Descend {
                for child in rec.children(self)? {
                    self.walk(child, visitor)?;
                }
            }
            visitor.leave(&binding);
            Ok(())
        })
    }
}

/// Collects every visited binding matching a predicate without descending.
pub(crate) struct MemberCollector<F> {
    pub filter: F,
    pub found: Vec<StoredBinding>,
}

impl<F: FnMut(&StoredBinding) -> bool> PdomVisitor for MemberCollector<F> {
    fn visit(&mut self, binding: &StoredBinding) -> VisitAction {
        if (self.filter)(binding) {
            self.found.push(binding.clone());
        }
        VisitAction::Prune
    }
}
