//! Problem codes.

use std::fmt;

/// Problem codes. The leading letter and first digit name the phase.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    // Lexical (L0xxx)
    /// Unterminated string literal
    L0001,
    /// Unterminated character literal
    L0002,
    /// Unterminated block comment
    L0003,
    /// Stray character that starts no token
    L0004,

    // Preprocessor (P1xxx)
    /// `#include` target not found
    P1001,
    /// Unknown or malformed directive
    P1002,
    /// Malformed `#define`
    P1003,
    /// `#error` directive
    P1004,
    /// Macro redefined with an incompatible body
    P1005,
    /// Unbalanced conditional directive
    P1006,
    /// Malformed `#if` expression
    P1007,
    /// Division by zero in `#if`
    P1008,
    /// `##` did not produce a single valid token
    P1009,
    /// Include nesting too deep
    P1010,
    /// Wrong number of macro arguments
    P1011,
    /// Unterminated macro invocation
    P1012,
    /// `#warning` directive
    P1013,
    /// Malformed `#line`
    P1014,

    // Syntax (E2xxx)
    /// Unexpected token
    E2001,
    /// Expected expression
    E2002,
    /// Expected declaration
    E2003,
    /// Unclosed delimiter
    E2004,
    /// Expected identifier
    E2005,
    /// Expected type
    E2006,
    /// Expected statement
    E2007,

    // Semantic (S3xxx)
    /// Name does not resolve
    S3001,
    /// Ambiguous overload
    S3002,
    /// No viable overload
    S3003,
    /// Base class does not resolve
    S3004,
    /// Ambiguous name lookup
    S3005,
    /// Redeclaration as a different kind of entity
    S3006,
}

impl ErrorCode {
    /// All codes, for lookup by spelling.
    pub const ALL: &'static [ErrorCode] = &[
        ErrorCode::L0001,
        ErrorCode::L0002,
        ErrorCode::L0003,
        ErrorCode::L0004,
        ErrorCode::P1001,
        ErrorCode::P1002,
        ErrorCode::P1003,
        ErrorCode::P1004,
        ErrorCode::P1005,
        ErrorCode::P1006,
        ErrorCode::P1007,
        ErrorCode::P1008,
        ErrorCode::P1009,
        ErrorCode::P1010,
        ErrorCode::P1011,
        ErrorCode::P1012,
        ErrorCode::P1013,
        ErrorCode::P1014,
        ErrorCode::E2001,
        ErrorCode::E2002,
        ErrorCode::E2003,
        ErrorCode::E2004,
        ErrorCode::E2005,
        ErrorCode::E2006,
        ErrorCode::E2007,
        ErrorCode::S3001,
        ErrorCode::S3002,
        ErrorCode::S3003,
        ErrorCode::S3004,
        ErrorCode::S3005,
        ErrorCode::S3006,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::L0001 => "L0001",
            ErrorCode::L0002 => "L0002",
            ErrorCode::L0003 => "L0003",
            ErrorCode::L0004 => "L0004",
            ErrorCode::P1001 => "P1001",
            ErrorCode::P1002 => "P1002",
            ErrorCode::P1003 => "P1003",
            ErrorCode::P1004 => "P1004",
            ErrorCode::P1005 => "P1005",
            ErrorCode::P1006 => "P1006",
            ErrorCode::P1007 => "P1007",
            ErrorCode::P1008 => "P1008",
            ErrorCode::P1009 => "P1009",
            ErrorCode::P1010 => "P1010",
            ErrorCode::P1011 => "P1011",
            ErrorCode::P1012 => "P1012",
            ErrorCode::P1013 => "P1013",
            ErrorCode::P1014 => "P1014",
            ErrorCode::E2001 => "E2001",
            ErrorCode::E2002 => "E2002",
            ErrorCode::E2003 => "E2003",
            ErrorCode::E2004 => "E2004",
            ErrorCode::E2005 => "E2005",
            ErrorCode::E2006 => "E2006",
            ErrorCode::E2007 => "E2007",
            ErrorCode::S3001 => "S3001",
            ErrorCode::S3002 => "S3002",
            ErrorCode::S3003 => "S3003",
            ErrorCode::S3004 => "S3004",
            ErrorCode::S3005 => "S3005",
            ErrorCode::S3006 => "S3006",
        }
    }

    pub fn is_lexical(&self) -> bool {
        self.as_str().starts_with('L')
    }

    pub fn is_preprocessor(&self) -> bool {
        self.as_str().starts_with('P')
    }

    pub fn is_syntax(&self) -> bool {
        self.as_str().starts_with('E')
    }

    pub fn is_semantic(&self) -> bool {
        self.as_str().starts_with('S')
    }

    /// Codes reported as warnings rather than errors.
    pub fn is_warning(&self) -> bool {
        matches!(self, ErrorCode::P1005 | ErrorCode::P1013)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a code spelling like `"P1001"`; case-insensitive.
impl std::str::FromStr for ErrorCode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_uppercase();
        Self::ALL
            .iter()
            .find(|code| code.as_str() == upper)
            .copied()
            .ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_code_parses_back() {
        for code in ErrorCode::ALL {
            assert_eq!(code.as_str().parse::<ErrorCode>(), Ok(*code));
        }
        assert_eq!("p1001".parse::<ErrorCode>(), Ok(ErrorCode::P1001));
        assert!("X9999".parse::<ErrorCode>().is_err());
    }

    #[test]
    fn phase_prefixes() {
        assert!(ErrorCode::L0003.is_lexical());
        assert!(ErrorCode::P1001.is_preprocessor());
        assert!(ErrorCode::E2004.is_syntax());
        assert!(ErrorCode::S3002.is_semantic());
        assert!(!ErrorCode::S3002.is_warning());
        assert!(ErrorCode::P1013.is_warning());
    }
}
