//! Write side: storing a bound translation unit and removing a file's
//! contribution.
//!
//! A binding record is found again by its identity: parent, kind, name and
//! signature (parameter types for functions, template arguments for
//! specializations). Storing a unit a second time therefore reuses the same
//! binding records and only replaces names.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use cidx_bindings::{ArgMap, BindingId, BindingKind, BoundUnit, TemplateArgument, Type};
use cidx_ir::{CancellationToken, Dialect, FileId, StringInterner};

use crate::database::{Database, RecordNo, Root};
use crate::error::{PdomResult, WriteError};
use crate::query::TuState;
use crate::records::{
    binding_flags, binding_layout, file_layout, name_flags, name_layout, unlink, BaseRec,
    BindingRec, FileRec, IndexRec, NameRec,
};

/// A file read while preprocessing a unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFile {
    pub id: FileId,
    pub path: String,
    /// Content hash; an indexed header with an unchanged hash is skipped.
    pub hash: u64,
}

/// Everything needed to store one translation unit.
#[derive(Clone, Copy)]
pub struct UnitContribution<'a> {
    pub unit: &'a BoundUnit,
    pub interner: &'a StringInterner,
    /// Every file of the unit; `FileId::MAIN` is the unit's own file.
    pub files: &'a [SourceFile],
}

/// What a write transaction did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub files_written: usize,
    /// Headers already indexed with the same content.
    pub files_skipped: usize,
    pub bindings_created: usize,
    pub names_written: usize,
    pub bindings_deleted: usize,
}

/// A reference inside a signature key: template parameters are keyed by
/// position so a redeclared template finds its earlier record.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize)]
enum KeyRef {
    Rec(RecordNo),
    Param(u16),
}

impl Database {
    pub(crate) fn linkage_index(&mut self, linkage: Dialect) -> PdomResult<IndexRec> {
        if let Some(index) = self.index(linkage)? {
            return Ok(index);
        }
        let index = IndexRec::create(self)?;
        let root = match linkage {
            Dialect::C => Root::CIndex,
            Dialect::Cpp => Root::CppIndex,
        };
        self.set_root(root, index.0)?;
        Ok(index)
    }

    /// Allocate a binding, link it under `parent` and into its linkage index.
    pub fn create_binding(
        &mut self,
        kind: BindingKind,
        name: &str,
        parent: Option<RecordNo>,
        linkage: Dialect,
    ) -> PdomResult<RecordNo> {
        let parent = RecordNo::from(parent);
        let b = BindingRec::create(self, kind, linkage, name, parent)?;
        if parent.is_some() {
            BindingRec(parent).add_child(self, b)?;
        }
        self.linkage_index(linkage)?.insert(self, name, b)?;
        Ok(b.0)
    }

    /// Store `contribution`, replacing what its files contributed before.
    ///
    /// The caller owns the transaction; see [`crate::Pdom::write_unit`].
    pub(crate) fn write_unit(
        &mut self,
        contribution: &UnitContribution<'_>,
        cancel: &CancellationToken,
    ) -> Result<WriteSummary, WriteError> {
        cancel.check()?;
        let mut summary = WriteSummary::default();
        let mut written: FxHashMap<FileId, FileRec> = FxHashMap::default();
        let mut touched = FxHashSet::default();
        for source in contribution.files {
            let existing = self.file_rec(&source.path)?;
            if let Some(file) = existing {
                let unchanged = TuState::from_code(file.state(self)?) == TuState::Indexed
                    && file.hash(self)? == source.hash;
                if unchanged && source.id != FileId::MAIN {
                    summary.files_skipped += 1;
                    continue;
                }
            }
            let file = match existing {
                Some(file) => {
                    self.clear_names(file, &mut touched)?;
                    file
                }
                None => FileRec::create(self, &source.path)?,
            };
            file.set_state(self, TuState::Indexing.code())?;
            written.insert(source.id, file);
        }

        let unit = contribution.unit;
        let mut declared = FxHashSet::default();
        let mut defined_in = FxHashMap::default();
        for decl in &unit.declarations {
            if let Some(&file) = written.get(&decl.file) {
                declared.insert(decl.binding);
                if decl.is_definition {
                    defined_in.entry(decl.binding).or_insert(file);
                }
            }
        }
        let mut writer = UnitWriter {
            db: self,
            unit,
            interner: contribution.interner,
            records: vec![None; unit.bindings.len()],
            in_progress: FxHashSet::default(),
            pending: Vec::new(),
            instances: Vec::new(),
            created: FxHashSet::default(),
            written: &written,
            declared,
            defined_in,
        };
        writer.write(cancel, &mut summary)?;

        for binding in touched {
            summary.bindings_deleted += self.sweep(binding)?;
        }
        for source in contribution.files {
            if let Some(file) = written.get(&source.id) {
                file.set_hash(self, source.hash)?;
                file.set_state(self, TuState::Indexed.code())?;
            }
        }
        summary.files_written = written.len();
        tracing::debug!(
            files = summary.files_written,
            skipped = summary.files_skipped,
            created = summary.bindings_created,
            names = summary.names_written,
            deleted = summary.bindings_deleted,
            "stored translation unit"
        );
        Ok(summary)
    }

    /// Remove everything `path` contributed and forget the file.
    pub(crate) fn remove_file(&mut self, path: &str) -> PdomResult<Option<usize>> {
        let Some(file) = self.file_rec(path)? else {
            return Ok(None);
        };
        let mut touched = FxHashSet::default();
        self.clear_names(file, &mut touched)?;
        let mut deleted = 0;
        for binding in touched {
            deleted += self.sweep(binding)?;
        }
        unlink(self, RecordNo::NONE, Root::Files.offset(), file_layout::NEXT, file.0)?;
        let path_rec = self.get_rec(file.0, file_layout::PATH)?;
        self.free_value(path_rec)?;
        self.free(file.0)?;
        tracing::debug!(path, deleted, "removed file from index");
        Ok(Some(deleted))
    }

    /// Free the names of `file` and the bases its class definitions added.
    /// Bindings that lost names are collected in `touched` for a later sweep.
    fn clear_names(&mut self, file: FileRec, touched: &mut FxHashSet<BindingRec>) -> PdomResult<()> {
        let mut cur = file.first_name(self)?;
        let mut classes = Vec::new();
        while cur.is_some() {
            let name = NameRec(cur);
            let next = name.next_in_file(self)?;
            let binding = name.binding(self)?;
            unlink(self, binding.0, binding_layout::FIRST_NAME, name_layout::NEXT_IN_BINDING, name.0)?;
            if name.flags(self)? & name_flags::DEFINITION != 0 && binding.kind(self)?.is_class() {
                classes.push(binding);
            }
            self.free(name.0)?;
            touched.insert(binding);
            cur = next;
        }
        file.set_first_name(self, RecordNo::NONE)?;
        for class in classes {
            for base in class.bases(self)? {
                if base.file(self)? == file {
                    base.delete(self, class)?;
                }
            }
        }
        for &binding in touched.iter() {
            let defined = binding
                .names(self)?
                .into_iter()
                .map(|n| n.flags(self))
                .collect::<PdomResult<Vec<_>>>()?
                .into_iter()
                .any(|f| f & name_flags::DEFINITION != 0);
            binding.set_flag(self, binding_flags::DEFINED, defined)?;
        }
        file.set_state(self, TuState::NotIndexed.code())?;
        Ok(())
    }

    fn deletable(&self, b: BindingRec) -> PdomResult<bool> {
        if !b.is_live(self) || b.first_name(self)?.is_some() || b.first_child(self)?.is_some() {
            return Ok(false);
        }
        for spec in b.specializations(self)? {
            if !spec.has_flag(self, binding_flags::IMPLICIT)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Delete `b` if nothing names it any more, then retry its parent.
    /// Returns how many bindings were deleted.
    fn sweep(&mut self, b: BindingRec) -> PdomResult<usize> {
        let mut deleted = 0;
        let mut cur = b;
        while self.deletable(cur)? {
            let parent = cur.parent(self)?;
            deleted += self.delete_binding(cur)?;
            if parent.is_none() {
                break;
            }
            cur = BindingRec(parent);
        }
        Ok(deleted)
    }

    /// Unlink and free a binding with its bases, blobs and implicit
    /// specializations.
    pub(crate) fn delete_binding(&mut self, b: BindingRec) -> PdomResult<usize> {
        let mut deleted = 1;
        for spec in b.specializations(self)? {
            deleted += self.delete_binding(spec)?;
        }
        let parent = b.parent(self)?;
        if parent.is_some() {
            BindingRec(parent).remove_child(self, b)?;
        }
        let generic = b.generic(self)?;
        if generic.is_some() {
            BindingRec(generic).remove_specialization(self, b)?;
        }
        let name = b.name(self)?;
        if !b.has_flag(self, binding_flags::IMPLICIT)? {
            let linkage = b.linkage(self)?;
            if let Some(index) = self.index(linkage)? {
                index.remove(self, &name, b)?;
            }
        }
        for base in b.bases(self)? {
            base.delete(self, b)?;
        }
        for field in [
            binding_layout::NAME,
            binding_layout::TYPE,
            binding_layout::ARGS,
            binding_layout::TEMPLATE_PARAMS,
            binding_layout::SIGNATURE,
        ] {
            let rec = self.get_rec(b.0, field)?;
            self.free_value(rec)?;
        }
        tracing::trace!(record = %b.0, name, "deleted binding");
        self.free(b.0)?;
        Ok(deleted)
    }
}

/// Maps one unit's bindings onto records.
struct UnitWriter<'a> {
    db: &'a mut Database,
    unit: &'a BoundUnit,
    interner: &'a StringInterner,
    /// Record of each `BindingId`; `NONE` for bindings that are not stored.
    records: Vec<Option<RecordNo>>,
    in_progress: FxHashSet<BindingId>,
    /// Mapped bindings whose properties still need writing.
    pending: Vec<BindingId>,
    /// Mapped types whose template instances get implicit specializations
    /// once every property is written.
    instances: Vec<Type<RecordNo>>,
    created: FxHashSet<BindingId>,
    written: &'a FxHashMap<FileId, FileRec>,
    /// Bindings with a declaration in a file being written.
    declared: FxHashSet<BindingId>,
    /// File holding each such binding's definition.
    defined_in: FxHashMap<BindingId, FileRec>,
}

impl UnitWriter<'_> {
    fn write(&mut self, cancel: &CancellationToken, summary: &mut WriteSummary) -> Result<(), WriteError> {
        let unit = self.unit;
        for decl in &unit.declarations {
            cancel.check()?;
            let Some(&file) = self.written.get(&decl.file) else {
                continue;
            };
            let rec = self.record_for(decl.binding)?;
            if rec.is_none() {
                continue;
            }
            let mut flags = name_flags::DECLARATION;
            if decl.is_definition {
                flags |= name_flags::DEFINITION;
            }
            NameRec::create(
                self.db,
                BindingRec(rec),
                file,
                decl.span.start,
                decl.span.end.saturating_sub(decl.span.start),
                flags,
            )?;
            summary.names_written += 1;
        }
        for reference in &unit.references {
            cancel.check()?;
            let Some(&file) = self.written.get(&reference.file) else {
                continue;
            };
            let rec = self.record_for(reference.binding)?;
            if rec.is_none() {
                continue;
            }
            let mut flags = name_flags::REFERENCE;
            if reference.implicit {
                flags |= name_flags::IMPLICIT;
            }
            NameRec::create(
                self.db,
                BindingRec(rec),
                file,
                reference.span.start,
                reference.span.end.saturating_sub(reference.span.start),
                flags,
            )?;
            summary.names_written += 1;
        }
        while let Some(id) = self.pending.pop() {
            cancel.check()?;
            self.write_properties(id)?;
        }
        // Template parameter lists must all be stored before arguments can be
        // paired with them.
        for ty in std::mem::take(&mut self.instances) {
            cancel.check()?;
            self.instantiate(&ty)?;
        }
        summary.bindings_created = self.created.len();
        Ok(())
    }

    /// Locals, parameters and anything else declared inside a function body
    /// stay out of the index; template parameters of function templates do not.
    fn is_stored(&self, id: BindingId) -> bool {
        let binding = self.unit.binding(id);
        let mut owners = self.unit.bindings.ancestors(id);
        if binding.kind == BindingKind::TemplateParameter {
            // The template itself is a function; look above it.
            owners.next();
        }
        owners.all(|owner| !self.unit.binding(owner).kind.is_function())
    }

    fn text(&self, id: BindingId) -> &'static str {
        self.interner.lookup(self.unit.binding(id).name)
    }

    /// Find or create the record of `id`.
    fn record_for(&mut self, id: BindingId) -> PdomResult<RecordNo> {
        if let Some(rec) = self.records[id.index()] {
            return Ok(rec);
        }
        if !self.is_stored(id) || !self.in_progress.insert(id) {
            // A signature that mentions its own binding keys it as absent.
            return Ok(RecordNo::NONE);
        }
        let result = self.find_or_create(id);
        self.in_progress.remove(&id);
        let rec = result?;
        self.records[id.index()] = Some(rec);
        if self.created.contains(&id) || self.declared.contains(&id) {
            self.pending.push(id);
        }
        Ok(rec)
    }

    fn find_or_create(&mut self, id: BindingId) -> PdomResult<RecordNo> {
        let unit = self.unit;
        let binding = unit.binding(id);
        let parent = match binding.owner {
            Some(owner) => {
                let rec = self.record_for(owner)?;
                if rec.is_none() {
                    return Ok(RecordNo::NONE);
                }
                rec
            }
            None => RecordNo::NONE,
        };
        let generic = match &binding.specialization {
            Some(spec) => self.record_for(spec.generic)?,
            None => RecordNo::NONE,
        };
        let signature = self.signature(id, generic)?;
        let name = self.text(id);
        let linkage = binding.linkage;

        if let Some(found) = self.find_existing(id, parent, name, signature.as_deref())? {
            return Ok(found);
        }

        let rec = self.db.create_binding(binding.kind, name, parent.get(), linkage)?;
        let b = BindingRec(rec);
        if let Some(signature) = signature {
            let blob = self.db.put_bytes(&signature)?;
            b.set_signature_blob(self.db, blob)?;
        }
        if generic.is_some() {
            b.set_generic(self.db, generic)?;
            BindingRec(generic).add_specialization(self.db, b)?;
        }
        self.created.insert(id);
        tracing::trace!(record = %rec, kind = %binding.kind, name, "created binding");
        Ok(rec)
    }

    fn find_existing(
        &self,
        id: BindingId,
        parent: RecordNo,
        name: &str,
        signature: Option<&[u8]>,
    ) -> PdomResult<Option<RecordNo>> {
        let binding = self.unit.binding(id);
        let db = &*self.db;
        let Some(index) = db.index(binding.linkage)? else {
            return Ok(None);
        };
        for candidate in index.chain(db, name)? {
            if candidate.parent(db)? != parent
                || candidate.kind(db)? != binding.kind
                || !candidate.name_eq(db, name)?
            {
                continue;
            }
            if binding.kind == BindingKind::TemplateParameter
                && candidate.position(db)? != binding.position
            {
                continue;
            }
            let stored = candidate.signature_blob(db)?;
            let same = match (signature, stored.get()) {
                (None, None) => true,
                (Some(sig), Some(blob)) => db.get_bytes(blob)? == sig,
                _ => false,
            };
            if same {
                return Ok(Some(candidate.0));
            }
        }
        Ok(None)
    }

    fn key_ref(&mut self, r: BindingId) -> PdomResult<KeyRef> {
        let unit = self.unit;
        let referenced = unit.binding(r);
        if referenced.kind == BindingKind::TemplateParameter {
            return Ok(KeyRef::Param(referenced.position));
        }
        Ok(KeyRef::Rec(self.record_for(r)?))
    }

    fn key_type(&mut self, ty: &Type<BindingId>) -> PdomResult<Type<KeyRef>> {
        let mut keyed = FxHashMap::default();
        for r in refs_of(ty) {
            let key = self.key_ref(r)?;
            keyed.insert(r, key);
        }
        Ok(ty.map_refs(&mut |r| keyed.get(&r).copied().unwrap_or(KeyRef::Rec(RecordNo::NONE))))
    }

    /// Identity beyond parent, kind and name: parameter types of C++
    /// functions, arguments of specializations.
    fn signature(&mut self, id: BindingId, generic: RecordNo) -> PdomResult<Option<Vec<u8>>> {
        let unit = self.unit;
        let binding = unit.binding(id);
        if let Some(spec) = &binding.specialization {
            let mut map = ArgMap::new();
            for (param, arg) in spec.args.iter() {
                let param = self.key_ref(*param)?;
                let arg = match arg {
                    TemplateArgument::Type(ty) => TemplateArgument::Type(self.key_type(ty)?),
                    TemplateArgument::Value(v) => TemplateArgument::Value(*v),
                    TemplateArgument::Unknown => TemplateArgument::Unknown,
                };
                map.insert(param, arg);
            }
            return key_bytes(&(generic, map)).map(Some);
        }
        if binding.kind.is_function() && binding.linkage == Dialect::Cpp {
            if let Some(Type::Function(f)) = &binding.ty {
                let mut params = Vec::with_capacity(f.params.len());
                for p in &f.params {
                    params.push(self.key_type(p)?);
                }
                return key_bytes(&(params, f.variadic, f.cv)).map(Some);
            }
        }
        Ok(None)
    }

    fn map_type(&mut self, ty: &Type<BindingId>) -> PdomResult<Type<RecordNo>> {
        let mut mapped = FxHashMap::default();
        for r in refs_of(ty) {
            let rec = self.record_for(r)?;
            mapped.insert(r, rec);
        }
        Ok(ty.map_refs(&mut |r| mapped.get(&r).copied().unwrap_or(RecordNo::NONE)))
    }

    fn map_args(&mut self, args: &ArgMap<BindingId>) -> PdomResult<ArgMap<RecordNo>> {
        let mut map = ArgMap::new();
        for (param, arg) in args.iter() {
            let param = self.record_for(*param)?;
            let arg = match arg {
                TemplateArgument::Type(ty) => TemplateArgument::Type(self.map_type(ty)?),
                TemplateArgument::Value(v) => TemplateArgument::Value(*v),
                TemplateArgument::Unknown => TemplateArgument::Unknown,
            };
            map.insert(param, arg);
        }
        Ok(map)
    }

    /// Copy the binding's attributes into its record. Types naming template
    /// instances are queued for [`UnitWriter::instantiate`].
    fn write_properties(&mut self, id: BindingId) -> PdomResult<()> {
        let Some(rec) = self.records[id.index()].filter(|r| r.is_some()) else {
            return Ok(());
        };
        let b = BindingRec(rec);
        let unit = self.unit;
        let binding = unit.binding(id);

        if let Some(ty) = &binding.ty {
            let ty = self.map_type(ty)?;
            let blob = self.db.put_blob(&ty)?;
            b.replace_blob(self.db, binding_layout::TYPE, blob)?;
            self.instances.push(ty);
        }
        b.set_access(self.db, binding.access)?;
        b.set_specifiers(self.db, binding.specifiers)?;
        b.set_class_key(self.db, binding.class_key)?;
        b.set_value(self.db, binding.value)?;
        b.set_defaults(self.db, binding.defaults)?;
        b.set_position(self.db, binding.position)?;
        b.set_flag(self.db, binding_flags::SCOPED, binding.scoped)?;

        if !binding.template_params.is_empty() {
            let mut params = Vec::with_capacity(binding.template_params.len());
            for &p in &binding.template_params {
                params.push(self.record_for(p)?);
            }
            let blob = self.db.put_blob(&params)?;
            b.replace_blob(self.db, binding_layout::TEMPLATE_PARAMS, blob)?;
        }
        if let Some(spec) = &binding.specialization {
            let args = self.map_args(&spec.args)?;
            let blob = self.db.put_blob(&args)?;
            b.replace_blob(self.db, binding_layout::ARGS, blob)?;
        }

        let definition = self.defined_in.get(&id).copied();
        if definition.is_some() {
            b.set_flag(self.db, binding_flags::DEFINED, true)?;
        }
        if let Some(file) = definition.filter(|_| binding.kind.is_class()) {
            for base in &binding.bases {
                let ty = self.map_type(&base.ty)?;
                let blob = self.db.put_blob(&ty)?;
                BaseRec::create(self.db, b, blob, base.access, base.is_virtual, file)?;
                self.instances.push(ty);
            }
        }
        Ok(())
    }

    /// Create implicit specializations for the concrete template instances
    /// `ty` mentions.
    fn instantiate(&mut self, ty: &Type<RecordNo>) -> PdomResult<()> {
        let mut instances = Vec::new();
        crate::specialization::collect_instances(ty, &mut instances);
        for (template, args) in instances {
            if args.iter().any(TemplateArgument::is_dependent) || !self.db.is_binding(template) {
                continue;
            }
            if BindingRec(template).kind(self.db)?.is_template() {
                self.db.specialize_with(template, args)?;
            }
        }
        Ok(())
    }
}

fn key_bytes<T: Serialize>(value: &T) -> PdomResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| crate::error::PdomError::Serialization {
        record: RecordNo::NONE,
        message: e.to_string(),
    })
}

/// Every binding `ty` mentions.
fn refs_of(ty: &Type<BindingId>) -> Vec<BindingId> {
    let mut refs = Vec::new();
    let _ = ty.map_refs(&mut |r| {
        refs.push(r);
        r
    });
    refs
}
