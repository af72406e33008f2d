//! Template specializations in the index.
//!
//! An explicit specialization (`template<> struct Box<int> {...}`) is an
//! ordinary class record with its own members and bases. An implicit
//! specialization (`Box<double>` used somewhere) is a record holding only
//! its template and argument map; its members and bases are the template's,
//! seen through the argument substitution. [`ClassView`] hides the
//! difference from readers.
//!
//! Specialized member views are never stored. A [`ResolutionBatch`] caches
//! them for one batch of queries, keyed by the template member and the
//! argument map, so every view is reproducible from its key.

use rustc_hash::FxHashMap;

use cidx_bindings::{ArgMap, BindingKind, TemplateArgument, Type};
use cidx_ir::ast::Access;
use cidx_ir::VisitAction;

use crate::database::{Database, RecordNo};
use crate::error::{PdomError, PdomResult};
use crate::query::StoredBinding;
use crate::records::{binding_flags, binding_layout, BindingRec};
use crate::visitor::{MemberCollector, PdomVisitor};

/// Bound on nested base specializations; `template<class T> struct A : A<T*>`
/// would otherwise never stop.
const MAX_BASE_DEPTH: usize = 16;

/// Template instances named anywhere inside `ty`, innermost first.
pub(crate) fn collect_instances(
    ty: &Type<RecordNo>,
    out: &mut Vec<(RecordNo, Vec<TemplateArgument<RecordNo>>)>,
) {
    match ty {
        Type::Pointer(inner)
        | Type::LValueRef(inner)
        | Type::RValueRef(inner)
        | Type::Qualified(_, inner)
        | Type::Array(inner, _) => collect_instances(inner, out),
        Type::Function(f) => {
            collect_instances(&f.ret, out);
            for p in &f.params {
                collect_instances(p, out);
            }
        }
        Type::Instance { template, args } => {
            for arg in args {
                if let TemplateArgument::Type(t) = arg {
                    collect_instances(t, out);
                }
            }
            out.push((*template, args.clone()));
        }
        Type::Builtin(_)
        | Type::Named(_)
        | Type::TemplateParam(_)
        | Type::Dependent
        | Type::Unknown => {}
    }
}

impl Database {
    /// Template parameters of `generic`, in order.
    pub fn template_params(&self, generic: RecordNo) -> PdomResult<Vec<RecordNo>> {
        match BindingRec(generic).params_blob(self)?.get() {
            Some(blob) => self.get_blob(blob),
            None => Ok(Vec::new()),
        }
    }

    /// [`Database::specialize`] with arguments paired to the template's
    /// parameters by position.
    pub fn specialize_with(
        &mut self,
        generic: RecordNo,
        args: Vec<TemplateArgument<RecordNo>>,
    ) -> PdomResult<RecordNo> {
        self.specialize_nested(generic, args, 0)
    }

    fn specialize_nested(
        &mut self,
        generic: RecordNo,
        args: Vec<TemplateArgument<RecordNo>>,
        depth: usize,
    ) -> PdomResult<RecordNo> {
        let params = self.template_params(generic)?;
        let map = ArgMap::from_pairs(&params, args);
        self.specialize_at(generic, &map, depth)
    }

    /// The specialization of `generic` for `args`, creating an implicit one
    /// when neither an explicit nor an earlier implicit one matches.
    ///
    /// A new class specialization also specializes the template instances its
    /// substituted bases name, so base lookup finds `Base<int>` rather than
    /// `Base`.
    pub fn specialize(&mut self, generic: RecordNo, args: &ArgMap<RecordNo>) -> PdomResult<RecordNo> {
        self.specialize_at(generic, args, 0)
    }

    fn specialize_at(
        &mut self,
        generic: RecordNo,
        args: &ArgMap<RecordNo>,
        depth: usize,
    ) -> PdomResult<RecordNo> {
        if let Some(existing) = self.specialization_of(generic, args)? {
            return Ok(existing);
        }
        let g = BindingRec(generic);
        let kind = match g.kind(self)? {
            BindingKind::ClassTemplate => BindingKind::ClassSpecialization,
            BindingKind::FunctionTemplate => BindingKind::FunctionSpecialization,
            other => {
                return Err(PdomError::Corrupt(format!(
                    "cannot specialize {generic}, a {other}"
                )))
            }
        };
        let name = g.name(self)?;
        let linkage = g.linkage(self)?;
        let parent = g.parent(self)?;
        let class_key = g.class_key(self)?;
        let access = g.access(self)?;
        // Implicit specializations stay out of member lists and the name
        // index; they hang off their template only.
        let spec = BindingRec::create(self, kind, linkage, &name, parent)?;
        spec.set_flag(self, binding_flags::IMPLICIT, true)?;
        spec.set_generic(self, generic)?;
        let blob = self.put_blob(args)?;
        spec.set_args_blob(self, blob)?;
        spec.set_class_key(self, class_key)?;
        spec.set_access(self, access)?;
        if let Some(blob) = g.type_blob(self)?.get() {
            let ty: Type<RecordNo> = self.get_blob(blob)?;
            let blob = self.put_blob(&ty.substitute(args))?;
            spec.replace_blob(self, binding_layout::TYPE, blob)?;
        }
        g.add_specialization(self, spec)?;
        tracing::trace!(template = %generic, record = %spec.0, name, "implicit specialization");
        if kind == BindingKind::ClassSpecialization {
            self.specialize_bases(g, args, depth)?;
        }
        Ok(spec.0)
    }

    fn specialize_bases(
        &mut self,
        generic: BindingRec,
        args: &ArgMap<RecordNo>,
        depth: usize,
    ) -> PdomResult<()> {
        if depth >= MAX_BASE_DEPTH {
            tracing::warn!(template = %generic.0, depth, "base specialization too deep; stopped");
            return Ok(());
        }
        let mut instances = Vec::new();
        for base in generic.bases(self)? {
            if let Some(blob) = base.type_blob(self)?.get() {
                let stored: Type<RecordNo> = self.get_blob(blob)?;
                collect_instances(&stored.substitute(args), &mut instances);
            }
        }
        for (template, base_args) in instances {
            if base_args.iter().any(TemplateArgument::is_dependent) || !self.is_binding(template) {
                continue;
            }
            if BindingRec(template).kind(self)? == BindingKind::ClassTemplate {
                self.specialize_nested(template, base_args, depth + 1)?;
            }
        }
        Ok(())
    }

    /// Read-side view of a class, resolving specialized members and bases.
    pub fn class_view(&self, class: RecordNo) -> PdomResult<ClassView<'_>> {
        let binding = self.binding(class)?;
        if !binding.kind.is_class() {
            return Err(PdomError::Corrupt(format!(
                "{class} is a {}, not a class",
                binding.kind
            )));
        }
        let source = match (&binding.generic, &binding.args) {
            (Some(generic), Some(args)) if binding.implicit => Members::Template {
                generic: *generic,
                args: args.clone(),
            },
            _ => Members::Own,
        };
        Ok(ClassView {
            db: self,
            binding,
            source,
        })
    }
}

/// Where a class's members and bases come from.
#[derive(Clone, Debug)]
enum Members {
    /// Its own lists: plain classes, templates and explicit specializations.
    Own,
    /// The template's lists under an argument substitution.
    Template {
        generic: RecordNo,
        args: ArgMap<RecordNo>,
    },
}

/// A member as seen from a class view.
#[derive(Clone, Debug, PartialEq)]
pub struct MemberView {
    /// The stored member: the class's own, or the template's for an implicit
    /// specialization.
    pub binding: StoredBinding,
    /// The member's type with the specialization's arguments substituted.
    pub ty: Option<Type<RecordNo>>,
    /// The implicit specialization the member was seen through.
    pub specialization: Option<RecordNo>,
}

/// A base class as seen from a class view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaseView {
    pub ty: Type<RecordNo>,
    /// The class the base names: a plain class, a stored specialization
    /// matching the arguments, or the template.
    pub class: RecordNo,
    pub access: Access,
    pub is_virtual: bool,
}

/// Cache of specialized member views for one batch of queries.
#[derive(Debug, Default)]
pub struct ResolutionBatch {
    members: FxHashMap<(RecordNo, ArgMap<RecordNo>), MemberView>,
    hits: usize,
}

impl ResolutionBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Views served from the cache.
    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

pub struct ClassView<'a> {
    db: &'a Database,
    binding: StoredBinding,
    source: Members,
}

impl ClassView<'_> {
    pub fn binding(&self) -> &StoredBinding {
        &self.binding
    }

    pub fn is_implicit_specialization(&self) -> bool {
        matches!(self.source, Members::Template { .. })
    }

    /// The record whose member and base lists this view reads.
    fn list_owner(&self) -> RecordNo {
        match &self.source {
            Members::Own => self.binding.record,
            Members::Template { generic, .. } => *generic,
        }
    }

    fn specialized(
        &self,
        member: StoredBinding,
        batch: &mut ResolutionBatch,
    ) -> MemberView {
        let Members::Template { args, .. } = &self.source else {
            let ty = member.ty.clone();
            return MemberView {
                binding: member,
                ty,
                specialization: None,
            };
        };
        let key = (member.record, args.clone());
        if let Some(view) = batch.members.get(&key) {
            batch.hits += 1;
            return MemberView {
                specialization: Some(self.binding.record),
                ..view.clone()
            };
        }
        let ty = member.ty.as_ref().map(|t| t.substitute(args));
        let view = MemberView {
            binding: member,
            ty,
            specialization: Some(self.binding.record),
        };
        batch.members.insert(key, view.clone());
        view
    }

    fn collect(
        &self,
        batch: &mut ResolutionBatch,
        filter: impl FnMut(&StoredBinding) -> bool,
    ) -> PdomResult<Vec<MemberView>> {
        let mut collector = MemberCollector {
            filter,
            found: Vec::new(),
        };
        self.db.visit(self.list_owner(), &mut collector)?;
        Ok(collector
            .found
            .into_iter()
            .map(|m| self.specialized(m, batch))
            .collect())
    }

    /// Members named `name`, or starting with it when `prefix` is set.
    pub fn find(
        &self,
        name: &str,
        prefix: bool,
        batch: &mut ResolutionBatch,
    ) -> PdomResult<Vec<MemberView>> {
        self.collect(batch, |m| {
            m.kind != BindingKind::TemplateParameter
                && if prefix {
                    m.name.starts_with(name)
                } else {
                    m.name == name
                }
        })
    }

    pub fn members(&self, batch: &mut ResolutionBatch) -> PdomResult<Vec<MemberView>> {
        self.collect(batch, |m| m.kind != BindingKind::TemplateParameter)
    }

    pub fn constructors(&self, batch: &mut ResolutionBatch) -> PdomResult<Vec<MemberView>> {
        struct Constructors(Vec<StoredBinding>);

        impl PdomVisitor for Constructors {
            fn visit(&mut self, binding: &StoredBinding) -> VisitAction {
                if binding.kind == BindingKind::Constructor {
                    self.0.push(binding.clone());
                }
                VisitAction::Prune
            }
        }

        let mut collector = Constructors(Vec::new());
        self.db.visit(self.list_owner(), &mut collector)?;
        Ok(collector
            .0
            .into_iter()
            .map(|c| self.specialized(c, batch))
            .collect())
    }

    /// Direct bases in declaration order. Bases whose type does not name a
    /// class after substitution are logged and left out.
    pub fn bases(&self) -> PdomResult<Vec<BaseView>> {
        let owner = BindingRec(self.list_owner());
        let mut out = Vec::new();
        for base in owner.bases(self.db)? {
            let Some(blob) = base.type_blob(self.db)?.get() else {
                continue;
            };
            let stored: Type<RecordNo> = self.db.get_blob(blob)?;
            let ty = match &self.source {
                Members::Own => stored,
                Members::Template { args, .. } => stored.substitute(args),
            };
            match self.resolve_base(&ty)? {
                Some(class) => out.push(BaseView {
                    ty,
                    class,
                    access: base.access(self.db)?,
                    is_virtual: base.is_virtual(self.db)?,
                }),
                None => tracing::warn!(
                    class = %self.binding.record,
                    name = %self.binding.name,
                    base = ?ty,
                    "base does not resolve to a class; omitted"
                ),
            }
        }
        Ok(out)
    }

    fn resolve_base(&self, ty: &Type<RecordNo>) -> PdomResult<Option<RecordNo>> {
        let resolved = match ty.non_reference().unqualified() {
            Type::Named(class) => Some(*class),
            // A dependent base still names its class template.
            Type::Instance { template, args } if args.iter().any(TemplateArgument::is_dependent) => {
                Some(*template)
            }
            Type::Instance { template, args } => {
                if !self.db.is_binding(*template) {
                    return Ok(None);
                }
                let params = self.db.template_params(*template)?;
                let map = ArgMap::from_pairs(&params, args.clone());
                Some(self.db.specialization_of(*template, &map)?.unwrap_or(*template))
            }
            _ => None,
        };
        Ok(resolved.filter(|&class| self.db.is_binding(class)))
    }
}
