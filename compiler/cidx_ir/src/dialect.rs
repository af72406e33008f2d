//! Language dialects. A dialect doubles as the linkage a binding belongs to.

use std::fmt;

/// Source language of a translation unit.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum Dialect {
    C,
    #[default]
    Cpp,
}

impl Dialect {
    /// Stable numeric id used as the linkage id in the persistent index.
    pub const fn linkage_id(self) -> u8 {
        match self {
            Dialect::C => 1,
            Dialect::Cpp => 2,
        }
    }

    pub const fn from_linkage_id(id: u8) -> Option<Dialect> {
        match id {
            1 => Some(Dialect::C),
            2 => Some(Dialect::Cpp),
            _ => None,
        }
    }

    pub const fn is_cpp(self) -> bool {
        matches!(self, Dialect::Cpp)
    }

    /// Guess the dialect from a file extension (`.c` and `.h` are C).
    pub fn from_path(path: &std::path::Path) -> Dialect {
        match path.extension().and_then(|e| e.to_str()) {
            Some("c" | "h") => Dialect::C,
            _ => Dialect::Cpp,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Dialect::C => "C",
            Dialect::Cpp => "C++",
        })
    }
}
