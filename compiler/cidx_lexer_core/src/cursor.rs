//! Cursor over a sentinel-terminated buffer.

/// Byte cursor. `Copy`, so a scan can be retried from a saved position.
///
/// `buf[source_len..]` is all zero and at least three bytes long.
#[derive(Clone, Copy, Debug)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: u32,
    source_len: u32,
}

const _: () = assert!(std::mem::size_of::<Cursor<'static>>() <= 24);

impl<'a> Cursor<'a> {
    pub(crate) fn new(buf: &'a [u8], source_len: u32, pos: u32) -> Self {
        debug_assert!((source_len as usize) + 2 < buf.len());
        Self {
            buf,
            pos,
            source_len,
        }
    }

    /// Byte at the cursor; `0` at EOF.
    #[inline]
    pub fn current(&self) -> u8 {
        self.at(self.pos)
    }

    #[inline]
    pub fn peek(&self) -> u8 {
        self.at(self.pos + 1)
    }

    #[inline]
    pub fn peek2(&self) -> u8 {
        self.at(self.pos + 2)
    }

    /// Bytes past the sentinel region read as `0`.
    #[inline]
    fn at(&self, pos: u32) -> u8 {
        self.buf.get(pos as usize).copied().unwrap_or(0)
    }

    #[inline]
    pub fn advance(&mut self) {
        self.advance_n(1);
    }

    /// Advance `n` bytes, never past the end of the source.
    #[inline]
    pub fn advance_n(&mut self, n: u32) {
        self.pos = self.pos.saturating_add(n).min(self.source_len);
    }

    /// At or past the end of the source. Interior NUL bytes are not EOF.
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.source_len
    }

    #[inline]
    pub fn pos(&self) -> u32 {
        self.pos
    }

    #[inline]
    pub fn source_len(&self) -> u32 {
        self.source_len
    }

    /// Advance while `pred` holds for the current byte and input remains.
    #[inline]
    pub fn eat_while(&mut self, pred: impl Fn(u8) -> bool) {
        while !self.is_eof() && pred(self.current()) {
            self.pos += 1;
        }
    }

    /// True if a backslash-newline splice starts at the cursor.
    #[inline]
    pub fn at_line_splice(&self) -> bool {
        self.current() == b'\\'
            && (self.peek() == b'\n' || (self.peek() == b'\r' && self.peek2() == b'\n'))
    }

    /// Move to the next occurrence of `quote`, `\` or `\n`, returning that
    /// byte, or `0` at EOF.
    pub fn skip_to_quote_delim(&mut self, quote: u8) -> u8 {
        match memchr::memchr3(quote, b'\\', b'\n', self.remaining()) {
            Some(offset) => {
                self.pos += offset_u32(offset);
                self.current()
            }
            None => {
                self.pos = self.source_len;
                0
            }
        }
    }

    /// Move past the next `*/`. Returns `false` (cursor at EOF) if there is
    /// none.
    pub fn skip_block_comment_body(&mut self) -> bool {
        let finder = memchr::memmem::find(self.remaining(), b"*/");
        match finder {
            Some(offset) => {
                self.pos += offset_u32(offset) + 2;
                true
            }
            None => {
                self.pos = self.source_len;
                false
            }
        }
    }

    /// Move to the first occurrence of `needle` (not consumed). Returns
    /// `false` (cursor at EOF) if there is none.
    pub fn find(&mut self, needle: &[u8]) -> bool {
        match memchr::memmem::find(self.remaining(), needle) {
            Some(offset) => {
                self.pos += offset_u32(offset);
                true
            }
            None => {
                self.pos = self.source_len;
                false
            }
        }
    }

    fn remaining(&self) -> &'a [u8] {
        let start = (self.pos as usize).min(self.source_len as usize);
        &self.buf[start..self.source_len as usize]
    }

    /// Source bytes of `start..end`.
    pub fn bytes(&self, start: u32, end: u32) -> &'a [u8] {
        let end = end.min(self.source_len) as usize;
        &self.buf[(start as usize).min(end)..end]
    }
}

/// Offsets within `remaining()` are bounded by `source_len`, a `u32`.
fn offset_u32(offset: usize) -> u32 {
    u32::try_from(offset).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests;
