//! Macro definitions and the per-scanner macro table.

use std::sync::{Arc, OnceLock};

use cidx_ir::{Dialect, FileId, Name, Span, Token};
use rustc_hash::FxHashMap;

/// Pseudo file owning built-in and command-line definitions.
pub const BUILTIN_FILE: FileId = FileId::new(u32::MAX);

/// Macros whose expansion is computed at the point of use.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DynamicMacro {
    /// `__FILE__`
    File,
    /// `__LINE__`
    Line,
    /// `__COUNTER__`
    Counter,
    /// `__INCLUDE_LEVEL__`
    IncludeLevel,
    /// `__BASE_FILE__`
    BaseFile,
}

impl DynamicMacro {
    pub const ALL: [(&'static str, DynamicMacro); 5] = [
        ("__FILE__", DynamicMacro::File),
        ("__LINE__", DynamicMacro::Line),
        ("__COUNTER__", DynamicMacro::Counter),
        ("__INCLUDE_LEVEL__", DynamicMacro::IncludeLevel),
        ("__BASE_FILE__", DynamicMacro::BaseFile),
    ];
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MacroKind {
    Object,
    Function {
        /// Parameter names. A variadic macro's last parameter is `__VA_ARGS__`
        /// or the name given before `...`.
        params: Vec<Name>,
        variadic: bool,
    },
    Dynamic(DynamicMacro),
}

/// One `#define`.
#[derive(Clone, Debug)]
pub struct MacroDef {
    pub name: Name,
    pub kind: MacroKind,
    /// Replacement list. The first token never carries `LEADING_SPACE`.
    pub body: Vec<Token>,
    pub file: FileId,
    /// Span of the macro name in the defining directive.
    pub name_span: Span,
    /// Span of the whole directive, `#` to end of line.
    pub span: Span,
}

impl MacroDef {
    pub fn object(name: Name, body: Vec<Token>) -> Self {
        MacroDef {
            name,
            kind: MacroKind::Object,
            body,
            file: BUILTIN_FILE,
            name_span: Span::DUMMY,
            span: Span::DUMMY,
        }
    }

    pub fn function(name: Name, params: Vec<Name>, variadic: bool, body: Vec<Token>) -> Self {
        MacroDef {
            kind: MacroKind::Function { params, variadic },
            ..MacroDef::object(name, body)
        }
    }

    pub fn dynamic(name: Name, which: DynamicMacro) -> Self {
        MacroDef {
            kind: MacroKind::Dynamic(which),
            ..MacroDef::object(name, Vec::new())
        }
    }

    #[inline]
    pub fn is_function_like(&self) -> bool {
        matches!(self.kind, MacroKind::Function { .. })
    }

    pub fn params(&self) -> &[Name] {
        match &self.kind {
            MacroKind::Function { params, .. } => params,
            _ => &[],
        }
    }

    pub fn is_variadic(&self) -> bool {
        matches!(self.kind, MacroKind::Function { variadic: true, .. })
    }

    /// Index of the parameter spelled `name`.
    pub fn param_index(&self, name: Name) -> Option<usize> {
        self.params().iter().position(|&p| p == name)
    }

    /// Whether a redefinition with `other` is benign: same kind, same
    /// parameters, and replacement lists identical up to whitespace amount.
    pub fn is_equivalent(&self, other: &MacroDef) -> bool {
        self.kind == other.kind
            && self.body.len() == other.body.len()
            && self.body.iter().zip(&other.body).all(|(a, b)| {
                a.kind == b.kind
                    && a.text == b.text
                    && a.flags.has_leading_space() == b.flags.has_leading_space()
            })
    }
}

/// Macros visible at the current point of a scan.
#[derive(Clone, Default)]
pub struct MacroTable {
    map: FxHashMap<Name, Arc<MacroDef>>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `def`, returning the definition it replaced.
    pub fn define(&mut self, def: MacroDef) -> Option<Arc<MacroDef>> {
        self.map.insert(def.name, Arc::new(def))
    }

    pub fn insert(&mut self, def: Arc<MacroDef>) -> Option<Arc<MacroDef>> {
        self.map.insert(def.name, def)
    }

    /// Remove `name`; true when it was defined.
    pub fn undefine(&mut self, name: Name) -> bool {
        self.map.remove(&name).is_some()
    }

    #[inline]
    pub fn get(&self, name: Name) -> Option<&Arc<MacroDef>> {
        self.map.get(&name)
    }

    #[inline]
    pub fn is_defined(&self, name: Name) -> bool {
        self.map.contains_key(&name)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<MacroDef>> {
        self.map.values()
    }
}

/// Object-like macros predefined for `dialect`, as `(name, replacement)`.
pub fn builtin_macros(dialect: Dialect) -> &'static [(&'static str, &'static str)] {
    const COMMON: [(&str, &str); 2] = [("__STDC__", "1"), ("__STDC_HOSTED__", "1")];
    static C: OnceLock<Vec<(&str, &str)>> = OnceLock::new();
    static CPP: OnceLock<Vec<(&str, &str)>> = OnceLock::new();
    match dialect {
        Dialect::C => C.get_or_init(|| {
            let mut table = COMMON.to_vec();
            table.push(("__STDC_VERSION__", "201710L"));
            table
        }),
        Dialect::Cpp => CPP.get_or_init(|| {
            let mut table = COMMON.to_vec();
            table.push(("__cplusplus", "201703L"));
            table
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cidx_ir::{StringInterner, TokenFlags, TokenKind};

    fn tok(interner: &StringInterner, text: &str, space: bool) -> Token {
        let kind = if text.starts_with(|c: char| c.is_ascii_digit()) {
            TokenKind::IntLiteral
        } else {
            TokenKind::Ident
        };
        let mut t = Token::new(kind, interner.intern(text), Span::DUMMY, FileId::MAIN);
        if space {
            t.flags.set(TokenFlags::LEADING_SPACE);
        }
        t
    }

    #[test]
    fn equivalence_ignores_spans_but_not_spacing() {
        let interner = StringInterner::new();
        let name = interner.intern("M");
        let a = MacroDef::object(name, vec![tok(&interner, "a", false), tok(&interner, "b", true)]);
        let mut moved = a.clone();
        for t in &mut moved.body {
            t.span = Span::new(40, 41);
        }
        assert!(a.is_equivalent(&moved));

        let glued = MacroDef::object(name, vec![tok(&interner, "a", false), tok(&interner, "b", false)]);
        assert!(!a.is_equivalent(&glued));

        let func = MacroDef::function(name, vec![], false, a.body.clone());
        assert!(!a.is_equivalent(&func));
    }

    #[test]
    fn table_define_and_undefine() {
        let interner = StringInterner::new();
        let name = interner.intern("X");
        let mut table = MacroTable::new();
        assert!(table.define(MacroDef::object(name, vec![])).is_none());
        assert!(table.define(MacroDef::object(name, vec![tok(&interner, "1", false)])).is_some());
        assert_eq!(table.get(name).map(|d| d.body.len()), Some(1));
        assert!(table.undefine(name));
        assert!(!table.undefine(name));
        assert!(table.is_empty());
    }

    #[test]
    fn params_and_variadics() {
        let interner = StringInterner::new();
        let va = interner.intern("__VA_ARGS__");
        let x = interner.intern("x");
        let def = MacroDef::function(interner.intern("F"), vec![x, va], true, vec![]);
        assert!(def.is_function_like());
        assert!(def.is_variadic());
        assert_eq!(def.param_index(va), Some(1));
        assert_eq!(def.param_index(interner.intern("y")), None);
    }

    #[test]
    fn builtins_depend_on_dialect() {
        assert!(builtin_macros(Dialect::Cpp).iter().any(|(n, _)| *n == "__cplusplus"));
        assert!(!builtin_macros(Dialect::C).iter().any(|(n, _)| *n == "__cplusplus"));
        assert!(builtin_macros(Dialect::C).iter().any(|(n, _)| *n == "__STDC_VERSION__"));
    }
}
