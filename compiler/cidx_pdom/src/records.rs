//! Fixed record layouts and typed views over them.
//!
//! Each view is a `Copy` wrapper around a [`RecordNo`] that reads and writes
//! fields at constant offsets. Views hold no data of their own; every
//! accessor goes to the image, so a view stays valid across writes for as
//! long as its record is live.

use cidx_bindings::BindingKind;
use cidx_ir::ast::{Access, ClassKey, DeclSpecifiers};
use cidx_ir::Dialect;

use crate::database::{Database, RecordNo};
use crate::error::{PdomError, PdomResult};

const BLOCK_HEADER: u32 = 4;

fn alloc(db: &mut Database, size: u32) -> PdomResult<RecordNo> {
    db.malloc(size - BLOCK_HEADER)
}

pub(crate) fn access_code(access: Option<Access>) -> u8 {
    match access {
        None => 0,
        Some(Access::Public) => 1,
        Some(Access::Protected) => 2,
        Some(Access::Private) => 3,
    }
}

pub(crate) fn access_from_code(code: u8) -> Option<Access> {
    match code {
        1 => Some(Access::Public),
        2 => Some(Access::Protected),
        3 => Some(Access::Private),
        _ => None,
    }
}

fn class_key_code(key: Option<ClassKey>) -> u8 {
    match key {
        None => 0,
        Some(ClassKey::Class) => 1,
        Some(ClassKey::Struct) => 2,
        Some(ClassKey::Union) => 3,
    }
}

fn class_key_from_code(code: u8) -> Option<ClassKey> {
    match code {
        1 => Some(ClassKey::Class),
        2 => Some(ClassKey::Struct),
        3 => Some(ClassKey::Union),
        _ => None,
    }
}

/// Getter and setter for a record-number field. Not every field is read
/// and written through both.
macro_rules! rec_field {
    ($get:ident, $set:ident, $offset:expr) => {
        #[allow(dead_code)]
        pub fn $get(self, db: &Database) -> PdomResult<RecordNo> {
            db.get_rec(self.0, $offset)
        }

        #[allow(dead_code)]
        pub fn $set(self, db: &mut Database, value: RecordNo) -> PdomResult<()> {
            db.put_rec(self.0, $offset, value)
        }
    };
}

// Binding

pub(crate) mod binding_layout {
    pub const KIND: u32 = 4;
    pub const LINKAGE: u32 = 5;
    pub const FLAGS: u32 = 6;
    pub const ACCESS: u32 = 7;
    pub const NAME: u32 = 8;
    pub const PARENT: u32 = 12;
    pub const NEXT_SIBLING: u32 = 16;
    pub const FIRST_CHILD: u32 = 20;
    pub const FIRST_NAME: u32 = 24;
    pub const TYPE: u32 = 28;
    pub const SPECIFIERS: u32 = 32;
    pub const DEFAULTS: u32 = 34;
    pub const POSITION: u32 = 36;
    pub const CLASS_KEY: u32 = 38;
    pub const VALUE: u32 = 40;
    pub const FIRST_BASE: u32 = 48;
    pub const GENERIC: u32 = 52;
    pub const ARGS: u32 = 56;
    pub const FIRST_SPEC: u32 = 60;
    pub const NEXT_SPEC: u32 = 64;
    pub const TEMPLATE_PARAMS: u32 = 68;
    pub const NEXT_IN_INDEX: u32 = 72;
    /// Overload identity of a function: its parameter list with template
    /// parameters replaced by their positions.
    pub const SIGNATURE: u32 = 76;
    pub const SIZE: u32 = 80;
}

pub(crate) mod binding_flags {
    pub const DEFINED: u8 = 1;
    pub const SCOPED: u8 = 2;
    pub const HAS_VALUE: u8 = 4;
    /// Made by instantiating a template rather than declared in source.
    pub const IMPLICIT: u8 = 8;
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub(crate) struct BindingRec(pub RecordNo);

impl BindingRec {
    pub fn create(
        db: &mut Database,
        kind: BindingKind,
        linkage: Dialect,
        name: &str,
        parent: RecordNo,
    ) -> PdomResult<BindingRec> {
        use binding_layout as l;
        let rec = alloc(db, l::SIZE)?;
        db.put_u8(rec, l::KIND, kind.code())?;
        db.put_u8(rec, l::LINKAGE, linkage.linkage_id())?;
        if !name.is_empty() {
            let name = db.put_string(name)?;
            db.put_rec(rec, l::NAME, name)?;
        }
        db.put_rec(rec, l::PARENT, parent)?;
        Ok(BindingRec(rec))
    }

    pub fn kind(self, db: &Database) -> PdomResult<BindingKind> {
        let code = db.get_u8(self.0, binding_layout::KIND)?;
        BindingKind::from_code(code)
            .ok_or_else(|| PdomError::Corrupt(format!("{} has unknown binding kind {code}", self.0)))
    }

    /// False for freed or foreign records.
    pub fn is_live(self, db: &Database) -> bool {
        self.0.is_some()
            && db
                .get_u8(self.0, binding_layout::KIND)
                .is_ok_and(|code| BindingKind::from_code(code).is_some())
            && db
                .block_size(self.0)
                .is_ok_and(|size| size == binding_layout::SIZE)
    }

    pub fn linkage(self, db: &Database) -> PdomResult<Dialect> {
        let id = db.get_u8(self.0, binding_layout::LINKAGE)?;
        Dialect::from_linkage_id(id)
            .ok_or_else(|| PdomError::Corrupt(format!("{} has unknown linkage {id}", self.0)))
    }

    pub fn flags(self, db: &Database) -> PdomResult<u8> {
        db.get_u8(self.0, binding_layout::FLAGS)
    }

    pub fn set_flag(self, db: &mut Database, flag: u8, on: bool) -> PdomResult<()> {
        let flags = self.flags(db)?;
        let updated = if on { flags | flag } else { flags & !flag };
        if updated != flags {
            db.put_u8(self.0, binding_layout::FLAGS, updated)?;
        }
        Ok(())
    }

    pub fn has_flag(self, db: &Database, flag: u8) -> PdomResult<bool> {
        Ok(self.flags(db)? & flag != 0)
    }

    pub fn access(self, db: &Database) -> PdomResult<Option<Access>> {
        Ok(access_from_code(db.get_u8(self.0, binding_layout::ACCESS)?))
    }

    pub fn set_access(self, db: &mut Database, access: Option<Access>) -> PdomResult<()> {
        db.put_u8(self.0, binding_layout::ACCESS, access_code(access))
    }

    pub fn name(self, db: &Database) -> PdomResult<String> {
        db.get_string(db.get_rec(self.0, binding_layout::NAME)?)
    }

    pub fn name_eq(self, db: &Database, name: &str) -> PdomResult<bool> {
        db.string_eq(db.get_rec(self.0, binding_layout::NAME)?, name)
    }

    pub fn name_starts_with(self, db: &Database, prefix: &str) -> PdomResult<bool> {
        db.string_starts_with(db.get_rec(self.0, binding_layout::NAME)?, prefix)
    }

    rec_field!(parent, set_parent, binding_layout::PARENT);
    rec_field!(next_sibling, set_next_sibling, binding_layout::NEXT_SIBLING);
    rec_field!(first_child, set_first_child, binding_layout::FIRST_CHILD);
    rec_field!(first_name, set_first_name, binding_layout::FIRST_NAME);
    rec_field!(type_blob, set_type_blob, binding_layout::TYPE);
    rec_field!(first_base, set_first_base, binding_layout::FIRST_BASE);
    rec_field!(generic, set_generic, binding_layout::GENERIC);
    rec_field!(args_blob, set_args_blob, binding_layout::ARGS);
    rec_field!(first_spec, set_first_spec, binding_layout::FIRST_SPEC);
    rec_field!(next_spec, set_next_spec, binding_layout::NEXT_SPEC);
    rec_field!(params_blob, set_params_blob, binding_layout::TEMPLATE_PARAMS);
    rec_field!(next_in_index, set_next_in_index, binding_layout::NEXT_IN_INDEX);
    rec_field!(signature_blob, set_signature_blob, binding_layout::SIGNATURE);

    pub fn specifiers(self, db: &Database) -> PdomResult<DeclSpecifiers> {
        Ok(DeclSpecifiers::from_bits_truncate(
            db.get_u16(self.0, binding_layout::SPECIFIERS)?,
        ))
    }

    pub fn set_specifiers(self, db: &mut Database, specifiers: DeclSpecifiers) -> PdomResult<()> {
        db.put_u16(self.0, binding_layout::SPECIFIERS, specifiers.bits())
    }

    pub fn defaults(self, db: &Database) -> PdomResult<u16> {
        db.get_u16(self.0, binding_layout::DEFAULTS)
    }

    pub fn set_defaults(self, db: &mut Database, defaults: u16) -> PdomResult<()> {
        db.put_u16(self.0, binding_layout::DEFAULTS, defaults)
    }

    pub fn position(self, db: &Database) -> PdomResult<u16> {
        db.get_u16(self.0, binding_layout::POSITION)
    }

    pub fn set_position(self, db: &mut Database, position: u16) -> PdomResult<()> {
        db.put_u16(self.0, binding_layout::POSITION, position)
    }

    pub fn class_key(self, db: &Database) -> PdomResult<Option<ClassKey>> {
        Ok(class_key_from_code(db.get_u8(self.0, binding_layout::CLASS_KEY)?))
    }

    pub fn set_class_key(self, db: &mut Database, key: Option<ClassKey>) -> PdomResult<()> {
        db.put_u8(self.0, binding_layout::CLASS_KEY, class_key_code(key))
    }

    pub fn value(self, db: &Database) -> PdomResult<Option<i64>> {
        if self.has_flag(db, binding_flags::HAS_VALUE)? {
            Ok(Some(db.get_i64(self.0, binding_layout::VALUE)?))
        } else {
            Ok(None)
        }
    }

    pub fn set_value(self, db: &mut Database, value: Option<i64>) -> PdomResult<()> {
        self.set_flag(db, binding_flags::HAS_VALUE, value.is_some())?;
        db.put_i64(self.0, binding_layout::VALUE, value.unwrap_or(0))
    }

    /// Replace a blob field, freeing the old value.
    pub fn replace_blob(self, db: &mut Database, offset: u32, value: RecordNo) -> PdomResult<()> {
        let old = db.get_rec(self.0, offset)?;
        db.free_value(old)?;
        db.put_rec(self.0, offset, value)
    }

    /// Prepend `child` to the member list.
    pub fn add_child(self, db: &mut Database, child: BindingRec) -> PdomResult<()> {
        let first = self.first_child(db)?;
        child.set_next_sibling(db, first)?;
        self.set_first_child(db, child.0)
    }

    /// Unlink `child` from the member list.
    pub fn remove_child(self, db: &mut Database, child: BindingRec) -> PdomResult<()> {
        unlink(
            db,
            self.0,
            binding_layout::FIRST_CHILD,
            binding_layout::NEXT_SIBLING,
            child.0,
        )
    }

    /// Members in declaration order.
    pub fn children(self, db: &Database) -> PdomResult<Vec<BindingRec>> {
        let mut out = collect(db, self.first_child(db)?, binding_layout::NEXT_SIBLING)?;
        out.reverse();
        Ok(out.into_iter().map(BindingRec).collect())
    }

    pub fn add_specialization(self, db: &mut Database, spec: BindingRec) -> PdomResult<()> {
        let first = self.first_spec(db)?;
        spec.set_next_spec(db, first)?;
        self.set_first_spec(db, spec.0)
    }

    pub fn remove_specialization(self, db: &mut Database, spec: BindingRec) -> PdomResult<()> {
        unlink(
            db,
            self.0,
            binding_layout::FIRST_SPEC,
            binding_layout::NEXT_SPEC,
            spec.0,
        )
    }

    pub fn specializations(self, db: &Database) -> PdomResult<Vec<BindingRec>> {
        let mut out = collect(db, self.first_spec(db)?, binding_layout::NEXT_SPEC)?;
        out.reverse();
        Ok(out.into_iter().map(BindingRec).collect())
    }

    pub fn names(self, db: &Database) -> PdomResult<Vec<NameRec>> {
        Ok(collect(db, self.first_name(db)?, name_layout::NEXT_IN_BINDING)?
            .into_iter()
            .map(NameRec)
            .collect())
    }

    pub fn add_base(self, db: &mut Database, base: BaseRec) -> PdomResult<()> {
        let first = self.first_base(db)?;
        base.set_next(db, first)?;
        self.set_first_base(db, base.0)
    }

    /// Bases in declaration order.
    pub fn bases(self, db: &Database) -> PdomResult<Vec<BaseRec>> {
        let mut out = collect(db, self.first_base(db)?, base_layout::NEXT)?;
        out.reverse();
        Ok(out.into_iter().map(BaseRec).collect())
    }
}

// Name

pub(crate) mod name_layout {
    pub const BINDING: u32 = 4;
    pub const FILE: u32 = 8;
    pub const OFFSET: u32 = 12;
    pub const LENGTH: u32 = 16;
    pub const FLAGS: u32 = 20;
    pub const NEXT_IN_BINDING: u32 = 24;
    pub const NEXT_IN_FILE: u32 = 28;
    pub const SIZE: u32 = 32;
}

pub(crate) mod name_flags {
    pub const DECLARATION: u8 = 1;
    pub const DEFINITION: u8 = 2;
    pub const REFERENCE: u8 = 4;
    pub const IMPLICIT: u8 = 8;
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub(crate) struct NameRec(pub RecordNo);

impl NameRec {
    /// Allocate a name and link it into its binding's and its file's lists.
    pub fn create(
        db: &mut Database,
        binding: BindingRec,
        file: FileRec,
        offset: u32,
        length: u32,
        flags: u8,
    ) -> PdomResult<NameRec> {
        use name_layout as l;
        let rec = alloc(db, l::SIZE)?;
        db.put_rec(rec, l::BINDING, binding.0)?;
        db.put_rec(rec, l::FILE, file.0)?;
        db.put_u32(rec, l::OFFSET, offset)?;
        db.put_u32(rec, l::LENGTH, length)?;
        db.put_u8(rec, l::FLAGS, flags)?;
        let next = binding.first_name(db)?;
        db.put_rec(rec, l::NEXT_IN_BINDING, next)?;
        binding.set_first_name(db, rec)?;
        let next = file.first_name(db)?;
        db.put_rec(rec, l::NEXT_IN_FILE, next)?;
        file.set_first_name(db, rec)?;
        Ok(NameRec(rec))
    }

    pub fn binding(self, db: &Database) -> PdomResult<BindingRec> {
        db.get_rec(self.0, name_layout::BINDING).map(BindingRec)
    }

    pub fn file(self, db: &Database) -> PdomResult<FileRec> {
        db.get_rec(self.0, name_layout::FILE).map(FileRec)
    }

    pub fn offset(self, db: &Database) -> PdomResult<u32> {
        db.get_u32(self.0, name_layout::OFFSET)
    }

    pub fn length(self, db: &Database) -> PdomResult<u32> {
        db.get_u32(self.0, name_layout::LENGTH)
    }

    pub fn flags(self, db: &Database) -> PdomResult<u8> {
        db.get_u8(self.0, name_layout::FLAGS)
    }

    pub fn next_in_file(self, db: &Database) -> PdomResult<RecordNo> {
        db.get_rec(self.0, name_layout::NEXT_IN_FILE)
    }
}

// Base

pub(crate) mod base_layout {
    pub const CLASS: u32 = 4;
    pub const TYPE: u32 = 8;
    pub const FLAGS: u32 = 12;
    pub const FILE: u32 = 16;
    pub const NEXT: u32 = 20;
    pub const SIZE: u32 = 24;
}

const BASE_VIRTUAL: u8 = 1;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub(crate) struct BaseRec(pub RecordNo);

impl BaseRec {
    pub fn create(
        db: &mut Database,
        class: BindingRec,
        ty: RecordNo,
        access: Access,
        is_virtual: bool,
        file: FileRec,
    ) -> PdomResult<BaseRec> {
        use base_layout as l;
        let rec = alloc(db, l::SIZE)?;
        db.put_rec(rec, l::CLASS, class.0)?;
        db.put_rec(rec, l::TYPE, ty)?;
        let flags = (access_code(Some(access)) << 1) | u8::from(is_virtual);
        db.put_u8(rec, l::FLAGS, flags)?;
        db.put_rec(rec, l::FILE, file.0)?;
        let base = BaseRec(rec);
        class.add_base(db, base)?;
        Ok(base)
    }

    rec_field!(type_blob, set_type_blob, base_layout::TYPE);
    rec_field!(next, set_next, base_layout::NEXT);

    pub fn file(self, db: &Database) -> PdomResult<FileRec> {
        db.get_rec(self.0, base_layout::FILE).map(FileRec)
    }

    pub fn access(self, db: &Database) -> PdomResult<Access> {
        let flags = db.get_u8(self.0, base_layout::FLAGS)?;
        Ok(access_from_code(flags >> 1).unwrap_or(Access::Public))
    }

    pub fn is_virtual(self, db: &Database) -> PdomResult<bool> {
        Ok(db.get_u8(self.0, base_layout::FLAGS)? & BASE_VIRTUAL != 0)
    }

    /// Unlink from `class` and free the record and its type blob.
    pub fn delete(self, db: &mut Database, class: BindingRec) -> PdomResult<()> {
        unlink(db, class.0, binding_layout::FIRST_BASE, base_layout::NEXT, self.0)?;
        let ty = self.type_blob(db)?;
        db.free_value(ty)?;
        db.free(self.0)
    }
}

// File

pub(crate) mod file_layout {
    pub const PATH: u32 = 4;
    pub const STATE: u32 = 8;
    pub const HASH: u32 = 12;
    pub const FIRST_NAME: u32 = 20;
    pub const NEXT: u32 = 24;
    pub const SIZE: u32 = 28;
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub(crate) struct FileRec(pub RecordNo);

impl FileRec {
    pub fn create(db: &mut Database, path: &str) -> PdomResult<FileRec> {
        use crate::database::Root;
        use file_layout as l;
        let rec = alloc(db, l::SIZE)?;
        let path = db.put_string(path)?;
        db.put_rec(rec, l::PATH, path)?;
        let next = db.root(Root::Files)?;
        db.put_rec(rec, l::NEXT, next)?;
        db.set_root(Root::Files, rec)?;
        Ok(FileRec(rec))
    }

    pub fn path(self, db: &Database) -> PdomResult<String> {
        db.get_string(db.get_rec(self.0, file_layout::PATH)?)
    }

    pub fn path_eq(self, db: &Database, path: &str) -> PdomResult<bool> {
        db.string_eq(db.get_rec(self.0, file_layout::PATH)?, path)
    }

    pub fn state(self, db: &Database) -> PdomResult<u8> {
        db.get_u8(self.0, file_layout::STATE)
    }

    pub fn set_state(self, db: &mut Database, state: u8) -> PdomResult<()> {
        db.put_u8(self.0, file_layout::STATE, state)
    }

    pub fn hash(self, db: &Database) -> PdomResult<u64> {
        db.get_u64(self.0, file_layout::HASH)
    }

    pub fn set_hash(self, db: &mut Database, hash: u64) -> PdomResult<()> {
        db.put_u64(self.0, file_layout::HASH, hash)
    }

    rec_field!(first_name, set_first_name, file_layout::FIRST_NAME);
    rec_field!(next, set_next, file_layout::NEXT);
}

// Linkage index: a fixed hash table of binding chains keyed by name.

pub(crate) mod index_layout {
    pub const BUCKETS: u32 = 32;
    pub const FIRST_BUCKET: u32 = 4;
    pub const SIZE: u32 = FIRST_BUCKET + BUCKETS * 4;
}

pub(crate) fn bucket_of(name: &str) -> u32 {
    use std::hash::{Hash, Hasher};
    let mut hasher = rustc_hash::FxHasher::default();
    name.hash(&mut hasher);
    // Truncation keeps the low bits, which is all the modulus needs.
    #[allow(clippy::cast_possible_truncation)]
    let hash = hasher.finish() as u32;
    hash % index_layout::BUCKETS
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) struct IndexRec(pub RecordNo);

impl IndexRec {
    pub fn create(db: &mut Database) -> PdomResult<IndexRec> {
        alloc(db, index_layout::SIZE).map(IndexRec)
    }

    fn bucket_offset(bucket: u32) -> u32 {
        index_layout::FIRST_BUCKET + bucket * 4
    }

    pub fn insert(self, db: &mut Database, name: &str, binding: BindingRec) -> PdomResult<()> {
        let offset = Self::bucket_offset(bucket_of(name));
        let head = db.get_rec(self.0, offset)?;
        binding.set_next_in_index(db, head)?;
        db.put_rec(self.0, offset, binding.0)
    }

    pub fn remove(self, db: &mut Database, name: &str, binding: BindingRec) -> PdomResult<()> {
        let offset = Self::bucket_offset(bucket_of(name));
        unlink(db, self.0, offset, binding_layout::NEXT_IN_INDEX, binding.0)
    }

    /// Bindings hashed into the bucket of `name`.
    pub fn chain(self, db: &Database, name: &str) -> PdomResult<Vec<BindingRec>> {
        let head = db.get_rec(self.0, Self::bucket_offset(bucket_of(name)))?;
        Ok(collect(db, head, binding_layout::NEXT_IN_INDEX)?
            .into_iter()
            .map(BindingRec)
            .collect())
    }

    pub fn all(self, db: &Database) -> PdomResult<Vec<BindingRec>> {
        let mut out = Vec::new();
        for bucket in 0..index_layout::BUCKETS {
            let head = db.get_rec(self.0, Self::bucket_offset(bucket))?;
            out.extend(
                collect(db, head, binding_layout::NEXT_IN_INDEX)?
                    .into_iter()
                    .map(BindingRec),
            );
        }
        Ok(out)
    }
}

// Intrusive lists

/// Follow `next` fields from `head` until the null record.
pub(crate) fn collect(db: &Database, head: RecordNo, next: u32) -> PdomResult<Vec<RecordNo>> {
    let mut out = Vec::new();
    let mut cur = head;
    let limit = db.len() / 16;
    while cur.is_some() {
        if out.len() > limit {
            return Err(PdomError::Corrupt(format!("cycle in list starting at {head}")));
        }
        out.push(cur);
        cur = db.get_rec(cur, next)?;
    }
    Ok(out)
}

/// Remove `target` from the list whose head lives at `owner + head_field`.
pub(crate) fn unlink(
    db: &mut Database,
    owner: RecordNo,
    head_field: u32,
    next_field: u32,
    target: RecordNo,
) -> PdomResult<()> {
    let mut prev = owner;
    let mut prev_field = head_field;
    let mut cur = db.get_rec(owner, head_field)?;
    while cur.is_some() {
        let next = db.get_rec(cur, next_field)?;
        if cur == target {
            db.put_rec(prev, prev_field, next)?;
            return db.put_rec(cur, next_field, RecordNo::NONE);
        }
        prev = cur;
        prev_field = next_field;
        cur = next;
    }
    Ok(())
}
