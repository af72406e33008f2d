//! Queries over a built index: finding symbols, their declaration and
//! reference sites, class members and bases.

use std::fmt::{self, Write as _};
use std::path::Path;

use cidx_bindings::{BindingKind, TemplateArgument, Type};
use cidx_diagnostic::span_utils::LineOffsetTable;
use cidx_ir::ast::Access;
use cidx_ir::Dialect;
use cidx_pdom::{Database, PdomResult, RecordNo, ResolutionBatch, StoredBinding, StoredName};

use crate::error::IndexResult;
use crate::indexer::Indexer;

/// How a name site relates to its symbol.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Declaration,
    Definition,
    Reference,
    /// A constructor call with no name written at the site.
    ImplicitCall,
}

impl Role {
    fn of(name: &StoredName) -> Role {
        if name.is_definition {
            Role::Definition
        } else if name.is_declaration {
            Role::Declaration
        } else if name.is_implicit {
            Role::ImplicitCall
        } else {
            Role::Reference
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Declaration => "declaration",
            Role::Definition => "definition",
            Role::Reference => "reference",
            Role::ImplicitCall => "implicit call",
        }
    }
}

/// A name site with a 1-based line and column. Both are 0 when the file can
/// no longer be read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub offset: u32,
    pub length: u32,
    pub role: Role,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{}@{}", self.file, self.offset)
        } else {
            write!(f, "{}:{}:{}", self.file, self.line, self.column)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
    pub record: RecordNo,
    pub qualified_name: String,
    pub kind: BindingKind,
    pub linkage: Dialect,
    pub is_defined: bool,
    /// The symbol's type, spelled out.
    pub ty: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Member {
    pub record: RecordNo,
    pub name: String,
    pub kind: BindingKind,
    /// With the class's template arguments substituted.
    pub ty: Option<String>,
    pub access: Option<Access>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaseClass {
    pub record: RecordNo,
    pub name: String,
    pub access: Access,
    pub is_virtual: bool,
}

fn write_args(db: &Database, args: &[TemplateArgument<RecordNo>], out: &mut String) -> PdomResult<()> {
    out.push('<');
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        match arg {
            TemplateArgument::Type(ty) => write_type(db, ty, out)?,
            TemplateArgument::Value(v) => {
                let _ = write!(out, "{v}");
            }
            TemplateArgument::Unknown => out.push('?'),
        }
    }
    out.push('>');
    Ok(())
}

fn write_ref(db: &Database, rec: RecordNo, out: &mut String) -> PdomResult<()> {
    if db.is_binding(rec) {
        out.push_str(&db.qualified_name(rec)?);
    } else {
        out.push_str("<removed>");
    }
    Ok(())
}

fn write_type(db: &Database, ty: &Type<RecordNo>, out: &mut String) -> PdomResult<()> {
    match ty {
        Type::Builtin(b) => {
            let _ = write!(out, "{b}");
        }
        Type::Named(rec) => write_ref(db, *rec, out)?,
        Type::TemplateParam(rec) => {
            if db.is_binding(*rec) {
                out.push_str(&db.binding(*rec)?.name);
            } else {
                out.push_str("<param>");
            }
        }
        Type::Pointer(inner) => {
            write_type(db, inner, out)?;
            out.push('*');
        }
        Type::LValueRef(inner) => {
            write_type(db, inner, out)?;
            out.push('&');
        }
        Type::RValueRef(inner) => {
            write_type(db, inner, out)?;
            out.push_str("&&");
        }
        Type::Qualified(cv, inner) => {
            if cv.is_const {
                out.push_str("const ");
            }
            if cv.is_volatile {
                out.push_str("volatile ");
            }
            write_type(db, inner, out)?;
        }
        Type::Array(inner, len) => {
            write_type(db, inner, out)?;
            match len {
                Some(n) => {
                    let _ = write!(out, "[{n}]");
                }
                None => out.push_str("[]"),
            }
        }
        Type::Function(f) => {
            write_type(db, &f.ret, out)?;
            out.push('(');
            for (i, p) in f.params.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_type(db, p, out)?;
            }
            if f.variadic {
                out.push_str(if f.params.is_empty() { "..." } else { ", ..." });
            }
            out.push(')');
            if f.cv.is_const {
                out.push_str(" const");
            }
        }
        Type::Instance { template, args } => {
            write_ref(db, *template, out)?;
            write_args(db, args, out)?;
        }
        Type::Dependent => out.push_str("<dependent>"),
        Type::Unknown => out.push('?'),
    }
    Ok(())
}

/// `ty` in C++-like spelling, with stored bindings by qualified name.
pub fn render_type(db: &Database, ty: &Type<RecordNo>) -> PdomResult<String> {
    let mut out = String::new();
    write_type(db, ty, &mut out)?;
    Ok(out)
}

fn symbol(db: &Database, binding: &StoredBinding) -> PdomResult<Symbol> {
    let mut qualified_name = db.qualified_name(binding.record)?;
    if let Some(args) = &binding.args {
        let args: Vec<_> = args.args().cloned().collect();
        write_args(db, &args, &mut qualified_name)?;
    }
    let ty = binding.ty.as_ref().map(|t| render_type(db, t)).transpose()?;
    Ok(Symbol {
        record: binding.record,
        qualified_name,
        kind: binding.kind,
        linkage: binding.linkage,
        is_defined: binding.is_defined,
        ty,
    })
}

impl Indexer {
    /// Symbols matching `pattern`, C linkage first.
    ///
    /// A plain name matches in any scope; `a::b` and `::b` are qualified from
    /// global scope. A trailing `*` matches by prefix.
    pub fn find(&self, pattern: &str) -> IndexResult<Vec<Symbol>> {
        let (text, prefix) = match pattern.strip_suffix('*') {
            Some(text) => (text, true),
            None => (pattern, false),
        };
        let db = self.pdom().read();
        let mut found = Vec::new();
        for linkage in [Dialect::C, Dialect::Cpp] {
            let bindings = if !text.contains("::") {
                db.find_bindings(linkage, text, prefix)?
            } else if prefix {
                let qualified = text.trim_start_matches("::");
                let last = qualified.rsplit("::").next().unwrap_or(qualified);
                let mut matching = Vec::new();
                for b in db.find_bindings(linkage, last, true)? {
                    if db.qualified_name(b.record)?.starts_with(qualified) {
                        matching.push(b);
                    }
                }
                matching
            } else {
                db.find_qualified(linkage, text)?
            };
            for b in &bindings {
                found.push(symbol(&db, b)?);
            }
        }
        Ok(found)
    }

    /// Every site naming `symbol`, by file and position.
    pub fn locations(&self, symbol: &Symbol) -> IndexResult<Vec<Location>> {
        let names = self.pdom().read().names_of(symbol.record)?;
        Ok(names.iter().map(|n| self.location(n)).collect())
    }

    fn location(&self, name: &StoredName) -> Location {
        let (line, column) = self.line_col(&name.file, name.offset).unwrap_or((0, 0));
        Location {
            file: name.file.clone(),
            line,
            column,
            offset: name.offset,
            length: name.length,
            role: Role::of(name),
        }
    }

    fn line_col(&self, file: &str, offset: u32) -> Option<(u32, u32)> {
        let mut lines = self.lines.lock();
        let entry = lines.entry(file.to_owned()).or_insert_with(|| {
            let text = self.provider().read(Path::new(file))?;
            let table = LineOffsetTable::build(&text);
            Some((text, table))
        });
        entry
            .as_ref()
            .map(|(text, table)| table.offset_to_line_col(text, offset))
    }

    /// Members of a class, as seen through its template arguments when it
    /// is an implicit specialization. Empty for anything but a class.
    pub fn members(&self, class: &Symbol) -> IndexResult<Vec<Member>> {
        if !class.kind.is_class() {
            return Ok(Vec::new());
        }
        let db = self.pdom().read();
        let view = db.class_view(class.record)?;
        let mut batch = ResolutionBatch::new();
        let mut members = Vec::new();
        for m in view.members(&mut batch)? {
            let ty = m.ty.as_ref().map(|t| render_type(&db, t)).transpose()?;
            members.push(Member {
                record: m.binding.record,
                name: m.binding.name,
                kind: m.binding.kind,
                ty,
                access: m.binding.access,
            });
        }
        Ok(members)
    }

    /// Direct bases of a class. Empty for anything but a class.
    pub fn bases(&self, class: &Symbol) -> IndexResult<Vec<BaseClass>> {
        if !class.kind.is_class() {
            return Ok(Vec::new());
        }
        let db = self.pdom().read();
        let mut bases = Vec::new();
        for base in db.class_view(class.record)?.bases()? {
            bases.push(BaseClass {
                record: base.class,
                name: render_type(&db, &base.ty)?,
                access: base.access,
                is_virtual: base.is_virtual,
            });
        }
        Ok(bases)
    }

    /// Explicit, partial and implicit specializations of a template.
    pub fn specializations(&self, template: &Symbol) -> IndexResult<Vec<Symbol>> {
        let db = self.pdom().read();
        let mut specs = Vec::new();
        for spec in db.specializations(template.record)? {
            specs.push(symbol(&db, &spec)?);
        }
        Ok(specs)
    }
}
