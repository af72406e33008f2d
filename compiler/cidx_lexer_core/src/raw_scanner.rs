//! Hand-written raw scanner producing `(RawTag, len)` pairs.
//!
//! The scanner is stateless between tokens: it can be created at any byte
//! offset, which lets the preprocessor resume after a directive or a skipped
//! conditional block without keeping a borrowed cursor alive.

use crate::cursor::Cursor;
use crate::tag::{RawTag, RawToken};

/// Punctuators by length, longest first. Matched greedily.
const PUNCT3: &[&[u8; 3]] = &[b"<<=", b">>=", b"..."];
const PUNCT2: &[&[u8; 2]] = &[
    b"::", b"->", b"++", b"--", b"<<", b">>", b"<=", b">=", b"==", b"!=", b"&&", b"||", b"+=",
    b"-=", b"*=", b"/=", b"%=", b"&=", b"|=", b"^=", b"##",
];
const PUNCT1: &[u8] = b"()[]{};,:.?+-*/%&|^~!=<>#";

#[inline]
fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$' || b >= 0x80
}

#[inline]
fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

pub struct RawScanner<'a> {
    cursor: Cursor<'a>,
}

impl<'a> RawScanner<'a> {
    pub fn new(cursor: Cursor<'a>) -> Self {
        Self { cursor }
    }

    pub fn pos(&self) -> u32 {
        self.cursor.pos()
    }

    /// Produce the next raw token. Returns `Eof` with `len == 0` forever once
    /// the source is exhausted.
    pub fn next_token(&mut self) -> RawToken {
        let start = self.cursor.pos();
        if self.cursor.is_eof() {
            return RawToken {
                tag: RawTag::Eof,
                len: 0,
            };
        }
        let tag = match self.cursor.current() {
            b' ' | b'\t' | b'\x0b' | b'\x0c' => self.whitespace(),
            b'\r' => {
                if self.cursor.peek() == b'\n' {
                    self.cursor.advance_n(2);
                    RawTag::Newline
                } else {
                    self.whitespace()
                }
            }
            b'\n' => {
                self.cursor.advance();
                RawTag::Newline
            }
            b'\\' if self.cursor.at_line_splice() => self.whitespace(),
            b'0'..=b'9' => self.number(),
            b'.' if self.cursor.peek().is_ascii_digit() => self.number(),
            b'"' => self.quoted(b'"'),
            b'\'' => self.quoted(b'\''),
            b'/' if self.cursor.peek() == b'/' => self.line_comment(),
            b'/' if self.cursor.peek() == b'*' => self.block_comment(),
            b if is_ident_start(b) => self.identifier_or_prefixed_literal(start),
            _ => self.punct(),
        };
        RawToken {
            tag,
            len: self.cursor.pos() - start,
        }
    }

    /// Scan `<...>` as a header name if the cursor is at `<` and a `>` closes
    /// it on the same line; otherwise scan normally.
    pub fn header_name(&mut self) -> RawToken {
        let start = self.cursor.pos();
        if self.cursor.current() == b'<' {
            let mut probe = self.cursor;
            probe.advance();
            probe.eat_while(|b| b != b'>' && b != b'\n');
            if probe.current() == b'>' {
                probe.advance();
                self.cursor = probe;
                return RawToken {
                    tag: RawTag::HeaderName,
                    len: self.cursor.pos() - start,
                };
            }
        }
        self.next_token()
    }

    /// Whitespace run, including line splices and lone carriage returns.
    fn whitespace(&mut self) -> RawTag {
        loop {
            match self.cursor.current() {
                b' ' | b'\t' | b'\x0b' | b'\x0c' if !self.cursor.is_eof() => self.cursor.advance(),
                b'\r' if self.cursor.peek() != b'\n' && !self.cursor.is_eof() => {
                    self.cursor.advance();
                }
                b'\\' if self.cursor.at_line_splice() => {
                    let len = if self.cursor.peek() == b'\r' { 3 } else { 2 };
                    self.cursor.advance_n(len);
                }
                _ => return RawTag::Whitespace,
            }
        }
    }

    /// Runs to the end of the line; a splice continues it onto the next.
    fn line_comment(&mut self) -> RawTag {
        loop {
            match self.cursor.current() {
                _ if self.cursor.is_eof() => return RawTag::LineComment,
                b'\n' => return RawTag::LineComment,
                b'\r' if self.cursor.peek() == b'\n' => return RawTag::LineComment,
                b'\\' if self.cursor.at_line_splice() => {
                    let len = if self.cursor.peek() == b'\r' { 3 } else { 2 };
                    self.cursor.advance_n(len);
                }
                _ => self.cursor.advance(),
            }
        }
    }

    fn block_comment(&mut self) -> RawTag {
        self.cursor.advance_n(2);
        if self.cursor.skip_block_comment_body() {
            RawTag::BlockComment
        } else {
            RawTag::UnterminatedComment
        }
    }

    fn number(&mut self) -> RawTag {
        self.cursor.advance();
        loop {
            let b = self.cursor.current();
            if self.cursor.is_eof() {
                break;
            }
            if matches!(b, b'e' | b'E' | b'p' | b'P') && matches!(self.cursor.peek(), b'+' | b'-')
            {
                self.cursor.advance_n(2);
            } else if b == b'\'' && self.cursor.peek().is_ascii_alphanumeric() {
                self.cursor.advance_n(2);
            } else if is_ident_continue(b) || b == b'.' {
                self.cursor.advance();
            } else {
                break;
            }
        }
        RawTag::Number
    }

    fn identifier_or_prefixed_literal(&mut self, start: u32) -> RawTag {
        self.cursor.eat_while(is_ident_continue);
        let text = self.cursor.bytes(start, self.cursor.pos());
        let next = self.cursor.current();
        match (text, next) {
            (b"L" | b"u" | b"U" | b"u8", b'"' | b'\'') => self.quoted(next),
            (b"R" | b"LR" | b"uR" | b"UR" | b"u8R", b'"') => self.raw_string(),
            _ => RawTag::Ident,
        }
    }

    /// String or character literal starting at the opening quote. Stops before
    /// an unescaped newline, which makes the literal unterminated.
    fn quoted(&mut self, quote: u8) -> RawTag {
        self.cursor.advance();
        loop {
            match self.cursor.skip_to_quote_delim(quote) {
                b'\\' => {
                    // Escape or splice: skip the backslash and the next byte
                    // (both bytes of a `\r\n` splice).
                    if self.cursor.peek() == b'\r' && self.cursor.peek2() == b'\n' {
                        self.cursor.advance_n(3);
                    } else {
                        self.cursor.advance_n(2);
                    }
                }
                b'\n' | 0 => {
                    return if quote == b'"' {
                        RawTag::UnterminatedString
                    } else {
                        RawTag::UnterminatedChar
                    };
                }
                _ => {
                    self.cursor.advance();
                    return if quote == b'"' {
                        RawTag::StringLit
                    } else {
                        RawTag::CharLit
                    };
                }
            }
        }
    }

    /// `R"delim(...)delim"`.
    fn raw_string(&mut self) -> RawTag {
        self.cursor.advance();
        let delim_start = self.cursor.pos();
        self.cursor
            .eat_while(|b| b != b'(' && b != b'"' && b != b'\n' && b != b' ');
        if self.cursor.current() != b'(' {
            return RawTag::UnterminatedString;
        }
        let mut closing = vec![b')'];
        closing.extend_from_slice(self.cursor.bytes(delim_start, self.cursor.pos()));
        closing.push(b'"');
        self.cursor.advance();
        if self.cursor.find(&closing) {
            self.cursor.advance_n(u32::try_from(closing.len()).unwrap_or(u32::MAX));
            RawTag::StringLit
        } else {
            RawTag::UnterminatedString
        }
    }

    fn punct(&mut self) -> RawTag {
        let b0 = self.cursor.current();
        let b1 = self.cursor.peek();
        let b2 = self.cursor.peek2();
        if PUNCT3.iter().any(|p| **p == [b0, b1, b2]) {
            self.cursor.advance_n(3);
            return RawTag::Punct;
        }
        if PUNCT2.iter().any(|p| **p == [b0, b1]) {
            self.cursor.advance_n(2);
            return RawTag::Punct;
        }
        self.cursor.advance();
        if PUNCT1.contains(&b0) {
            RawTag::Punct
        } else {
            RawTag::Other
        }
    }
}
