//! Read side: reconstructing bindings, names and files from records.

use std::fmt::Write as _;

use cidx_bindings::{ArgMap, BindingKind, Type};
use cidx_ir::ast::{Access, ClassKey, DeclSpecifiers};
use cidx_ir::{Dialect, VisitAction};

use crate::database::{Database, RecordNo, Root};
use crate::error::{PdomError, PdomResult};
use crate::records::{binding_flags, name_flags, BindingRec, FileRec, IndexRec, NameRec};
use crate::visitor::PdomVisitor;

/// Indexing state of a file.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum TuState {
    #[default]
    NotIndexed,
    /// Only observable inside a write transaction.
    Indexing,
    Indexed,
}

impl TuState {
    pub(crate) const fn code(self) -> u8 {
        match self {
            TuState::NotIndexed => 0,
            TuState::Indexing => 1,
            TuState::Indexed => 2,
        }
    }

    pub(crate) fn from_code(code: u8) -> TuState {
        match code {
            1 => TuState::Indexing,
            2 => TuState::Indexed,
            _ => TuState::NotIndexed,
        }
    }
}

/// A binding read back from its record.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredBinding {
    pub record: RecordNo,
    pub kind: BindingKind,
    pub name: String,
    pub linkage: Dialect,
    pub parent: Option<RecordNo>,
    pub ty: Option<Type<RecordNo>>,
    pub access: Option<Access>,
    pub specifiers: DeclSpecifiers,
    pub class_key: Option<ClassKey>,
    pub value: Option<i64>,
    pub defaults: u16,
    pub position: u16,
    pub scoped: bool,
    pub is_defined: bool,
    /// Made by instantiating a template rather than declared in source.
    pub implicit: bool,
    /// The template a specialization specializes.
    pub generic: Option<RecordNo>,
    pub args: Option<ArgMap<RecordNo>>,
    pub template_params: Vec<RecordNo>,
}

impl StoredBinding {
    pub fn is_specialization(&self) -> bool {
        self.generic.is_some()
    }
}

/// A declaration, definition or reference site.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredName {
    pub record: RecordNo,
    pub binding: RecordNo,
    pub file: String,
    pub offset: u32,
    pub length: u32,
    pub is_declaration: bool,
    pub is_definition: bool,
    pub is_reference: bool,
    /// A constructor call not spelled in source.
    pub is_implicit: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileInfo {
    pub record: RecordNo,
    pub path: String,
    pub state: TuState,
    pub hash: u64,
}

impl Database {
    pub(crate) fn index(&self, linkage: Dialect) -> PdomResult<Option<IndexRec>> {
        let root = match linkage {
            Dialect::C => Root::CIndex,
            Dialect::Cpp => Root::CppIndex,
        };
        Ok(self.root(root)?.get().map(IndexRec))
    }

    /// Bindings of `linkage` at global scope, in creation order.
    pub(crate) fn roots(&self, linkage: Dialect) -> PdomResult<Vec<BindingRec>> {
        let Some(index) = self.index(linkage)? else {
            return Ok(Vec::new());
        };
        let mut roots = Vec::new();
        for b in index.all(self)? {
            if b.parent(self)?.is_none() {
                roots.push(b);
            }
        }
        roots.sort_by_key(|b| b.0);
        Ok(roots)
    }

    /// Reconstruct the binding stored at `rec`.
    pub fn binding(&self, rec: RecordNo) -> PdomResult<StoredBinding> {
        let b = BindingRec(rec);
        if !b.is_live(self) {
            return Err(PdomError::Corrupt(format!("{rec} is not a binding")));
        }
        let flags = b.flags(self)?;
        let ty = match b.type_blob(self)?.get() {
            Some(blob) => Some(self.get_blob(blob)?),
            None => None,
        };
        let args = match b.args_blob(self)?.get() {
            Some(blob) => Some(self.get_blob(blob)?),
            None => None,
        };
        let template_params = match b.params_blob(self)?.get() {
            Some(blob) => self.get_blob(blob)?,
            None => Vec::new(),
        };
        Ok(StoredBinding {
            record: rec,
            kind: b.kind(self)?,
            name: b.name(self)?,
            linkage: b.linkage(self)?,
            parent: b.parent(self)?.get(),
            ty,
            access: b.access(self)?,
            specifiers: b.specifiers(self)?,
            class_key: b.class_key(self)?,
            value: b.value(self)?,
            defaults: b.defaults(self)?,
            position: b.position(self)?,
            scoped: flags & binding_flags::SCOPED != 0,
            is_defined: flags & binding_flags::DEFINED != 0,
            implicit: flags & binding_flags::IMPLICIT != 0,
            generic: b.generic(self)?.get(),
            args,
            template_params,
        })
    }

    /// Whether `rec` still holds a binding. Type blobs reference bindings
    /// weakly; check before following one.
    pub fn is_binding(&self, rec: RecordNo) -> bool {
        BindingRec(rec).is_live(self)
    }

    /// Bindings of `linkage` named `name`, or whose name starts with it.
    pub fn find_bindings(
        &self,
        linkage: Dialect,
        name: &str,
        prefix: bool,
    ) -> PdomResult<Vec<StoredBinding>> {
        let Some(index) = self.index(linkage)? else {
            return Ok(Vec::new());
        };
        let candidates = if prefix {
            index.all(self)?
        } else {
            index.chain(self, name)?
        };
        let mut found = Vec::new();
        for b in candidates {
            let hit = if prefix {
                b.name_starts_with(self, name)?
            } else {
                b.name_eq(self, name)?
            };
            if hit && (!prefix || !b.name_eq(self, "")?) {
                found.push(self.binding(b.0)?);
            }
        }
        found.sort_by_key(|b| b.record);
        Ok(found)
    }

    /// Bindings named by a `::`-separated path from global scope. Anonymous
    /// namespaces on the way are transparent.
    pub fn find_qualified(&self, linkage: Dialect, path: &str) -> PdomResult<Vec<StoredBinding>> {
        let segments: Vec<&str> = path.trim_start_matches("::").split("::").collect();
        let Some((last, scopes)) = segments.split_last() else {
            return Ok(Vec::new());
        };
        let mut found = Vec::new();
        for candidate in self.find_bindings(linkage, last, false)? {
            if self.parents_match(candidate.parent, scopes)? {
                found.push(candidate);
            }
        }
        Ok(found)
    }

    fn parents_match(&self, mut parent: Option<RecordNo>, scopes: &[&str]) -> PdomResult<bool> {
        let mut remaining = scopes;
        while let Some(rec) = parent {
            let b = BindingRec(rec);
            let anonymous = b.name_eq(self, "")?;
            if !anonymous {
                let Some((expected, rest)) = remaining.split_last() else {
                    return Ok(false);
                };
                if !b.name_eq(self, expected)? {
                    return Ok(false);
                }
                remaining = rest;
            } else if b.kind(self)? != BindingKind::Namespace {
                return Ok(false);
            }
            parent = b.parent(self)?.get();
        }
        Ok(remaining.is_empty())
    }

    /// `ns::Class::member`, anonymous scopes spelled `{anonymous}`.
    pub fn qualified_name(&self, rec: RecordNo) -> PdomResult<String> {
        let mut parts = Vec::new();
        let mut cur = rec.get();
        while let Some(r) = cur {
            let b = BindingRec(r);
            let name = b.name(self)?;
            parts.push(if name.is_empty() {
                "{anonymous}".to_owned()
            } else {
                name
            });
            cur = b.parent(self)?.get();
            if parts.len() > 256 {
                return Err(PdomError::Corrupt(format!("parent cycle above {rec}")));
            }
        }
        parts.reverse();
        Ok(parts.join("::"))
    }

    pub fn children(&self, rec: RecordNo) -> PdomResult<Vec<StoredBinding>> {
        BindingRec(rec)
            .children(self)?
            .into_iter()
            .map(|c| self.binding(c.0))
            .collect()
    }

    /// Explicit, partial and implicit specializations of a template.
    pub fn specializations(&self, rec: RecordNo) -> PdomResult<Vec<StoredBinding>> {
        BindingRec(rec)
            .specializations(self)?
            .into_iter()
            .map(|s| self.binding(s.0))
            .collect()
    }

    /// The specialization of `generic` for exactly `args`, if one is stored.
    /// Explicit specializations win over implicit ones.
    pub fn specialization_of(
        &self,
        generic: RecordNo,
        args: &ArgMap<RecordNo>,
    ) -> PdomResult<Option<RecordNo>> {
        let mut implicit = None;
        for spec in BindingRec(generic).specializations(self)? {
            let Some(blob) = spec.args_blob(self)?.get() else {
                continue;
            };
            // Partial specializations match patterns, not exact arguments.
            if spec.params_blob(self)?.is_some() {
                continue;
            }
            let stored: ArgMap<RecordNo> = self.get_blob(blob)?;
            if stored.args().eq(args.args()) {
                if spec.has_flag(self, binding_flags::IMPLICIT)? {
                    implicit = Some(spec.0);
                } else {
                    return Ok(Some(spec.0));
                }
            }
        }
        Ok(implicit)
    }

    fn stored_name(&self, name: NameRec) -> PdomResult<StoredName> {
        let flags = name.flags(self)?;
        Ok(StoredName {
            record: name.0,
            binding: name.binding(self)?.0,
            file: name.file(self)?.path(self)?,
            offset: name.offset(self)?,
            length: name.length(self)?,
            is_declaration: flags & name_flags::DECLARATION != 0,
            is_definition: flags & name_flags::DEFINITION != 0,
            is_reference: flags & name_flags::REFERENCE != 0,
            is_implicit: flags & name_flags::IMPLICIT != 0,
        })
    }

    /// Every name of `rec`, ordered by file and offset.
    pub fn names_of(&self, rec: RecordNo) -> PdomResult<Vec<StoredName>> {
        let mut names = BindingRec(rec)
            .names(self)?
            .into_iter()
            .map(|n| self.stored_name(n))
            .collect::<PdomResult<Vec<_>>>()?;
        names.sort_by(|a, b| (&a.file, a.offset).cmp(&(&b.file, b.offset)));
        Ok(names)
    }

    pub fn declarations(&self, rec: RecordNo) -> PdomResult<Vec<StoredName>> {
        let mut names = self.names_of(rec)?;
        names.retain(|n| n.is_declaration);
        Ok(names)
    }

    pub fn definitions(&self, rec: RecordNo) -> PdomResult<Vec<StoredName>> {
        let mut names = self.names_of(rec)?;
        names.retain(|n| n.is_definition);
        Ok(names)
    }

    pub fn references(&self, rec: RecordNo) -> PdomResult<Vec<StoredName>> {
        let mut names = self.names_of(rec)?;
        names.retain(|n| n.is_reference);
        Ok(names)
    }

    pub(crate) fn file_rec(&self, path: &str) -> PdomResult<Option<FileRec>> {
        let mut cur = self.root(Root::Files)?;
        while cur.is_some() {
            let file = FileRec(cur);
            if file.path_eq(self, path)? {
                return Ok(Some(file));
            }
            cur = file.next(self)?;
        }
        Ok(None)
    }

    fn file_info(&self, file: FileRec) -> PdomResult<FileInfo> {
        Ok(FileInfo {
            record: file.0,
            path: file.path(self)?,
            state: TuState::from_code(file.state(self)?),
            hash: file.hash(self)?,
        })
    }

    /// Every known file, sorted by path.
    pub fn files(&self) -> PdomResult<Vec<FileInfo>> {
        let mut files = Vec::new();
        let mut cur = self.root(Root::Files)?;
        while cur.is_some() {
            let file = FileRec(cur);
            files.push(self.file_info(file)?);
            cur = file.next(self)?;
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    pub fn file(&self, path: &str) -> PdomResult<Option<FileInfo>> {
        self.file_rec(path)?.map(|f| self.file_info(f)).transpose()
    }

    /// Names a file contributed, by offset.
    pub fn names_in_file(&self, path: &str) -> PdomResult<Vec<StoredName>> {
        let Some(file) = self.file_rec(path)? else {
            return Ok(Vec::new());
        };
        let mut names = Vec::new();
        let mut cur = file.first_name(self)?;
        while cur.is_some() {
            let name = NameRec(cur);
            names.push(self.stored_name(name)?);
            cur = name.next_in_file(self)?;
        }
        names.sort_by_key(|n| n.offset);
        Ok(names)
    }

    /// Indented listing of every binding and its names, for debugging.
    /// Record numbers are left out so equal contents dump equally.
    pub fn dump(&self) -> PdomResult<String> {
        struct Dumper<'a> {
            db: &'a Database,
            out: String,
            depth: usize,
            error: Option<PdomError>,
        }

        impl Dumper<'_> {
            fn line(&mut self, binding: &StoredBinding) -> PdomResult<()> {
                let indent = "  ".repeat(self.depth);
                let name = if binding.name.is_empty() {
                    "{anonymous}"
                } else {
                    &binding.name
                };
                let _ = write!(self.out, "{indent}{} {name}", binding.kind);
                if binding.is_defined {
                    self.out.push_str(" [defined]");
                }
                if let Some(value) = binding.value {
                    let _ = write!(self.out, " = {value}");
                }
                let _ = writeln!(self.out);
                for name in self.db.names_of(binding.record)? {
                    let role = if name.is_definition {
                        "def"
                    } else if name.is_declaration {
                        "decl"
                    } else if name.is_implicit {
                        "call"
                    } else {
                        "ref"
                    };
                    let _ = writeln!(
                        self.out,
                        "{indent}  {role} {}:{}+{}",
                        name.file, name.offset, name.length
                    );
                }
                let implicit = self
                    .db
                    .specializations(binding.record)?
                    .into_iter()
                    .filter(|s| s.implicit)
                    .count();
                if implicit > 0 {
                    let _ = writeln!(self.out, "{indent}  {implicit} implicit specialization(s)");
                }
                Ok(())
            }
        }

        impl PdomVisitor for Dumper<'_> {
            fn visit(&mut self, binding: &StoredBinding) -> VisitAction {
                if self.error.is_none() {
                    if let Err(e) = self.line(binding) {
                        self.error = Some(e);
                    }
                }
                self.depth += 1;
                VisitAction::Descend
            }

            fn leave(&mut self, _binding: &StoredBinding) {
                self.depth -= 1;
            }
        }

        let mut dumper = Dumper {
            db: self,
            out: String::new(),
            depth: 0,
            error: None,
        };
        for linkage in [Dialect::C, Dialect::Cpp] {
            if self.index(linkage)?.is_none() {
                continue;
            }
            let start = dumper.out.len();
            let _ = writeln!(dumper.out, "linkage {linkage}");
            let header = dumper.out.len();
            dumper.depth = 1;
            self.visit_linkage(linkage, &mut dumper)?;
            // An index emptied by removals prints nothing.
            if dumper.out.len() == header {
                dumper.out.truncate(start);
            }
        }
        if let Some(e) = dumper.error {
            return Err(e);
        }
        for file in self.files()? {
            let _ = writeln!(
                dumper.out,
                "file {} {:?} {} names",
                file.path,
                file.state,
                self.names_in_file(&file.path)?.len()
            );
        }
        Ok(dumper.out)
    }
}
