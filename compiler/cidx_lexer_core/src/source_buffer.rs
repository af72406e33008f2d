//! Sentinel-terminated source buffer.

use crate::Cursor;

const CACHE_LINE: usize = 64;

/// Source bytes followed by at least three `0x00` bytes (sentinel plus peek
/// room), padded to the next 64-byte boundary.
#[derive(Clone, Debug)]
pub struct SourceBuffer {
    buf: Vec<u8>,
    source_len: u32,
}

impl SourceBuffer {
    /// Files larger than `u32::MAX` bytes are truncated to that length.
    pub fn new(source: &str) -> Self {
        let bytes = source.as_bytes();
        let source_len = bytes.len().min(u32::MAX as usize - CACHE_LINE);
        let padded_len = (source_len + 3 + CACHE_LINE - 1) & !(CACHE_LINE - 1);
        let mut buf = vec![0u8; padded_len];
        buf[..source_len].copy_from_slice(&bytes[..source_len]);
        Self {
            buf,
            source_len: u32::try_from(source_len).unwrap_or(u32::MAX),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.source_len as usize]
    }

    /// Cursor positioned at byte 0.
    pub fn cursor(&self) -> Cursor<'_> {
        Cursor::new(&self.buf, self.source_len, 0)
    }

    /// Cursor positioned at `pos`, clamped to the end of the source.
    pub fn cursor_at(&self, pos: u32) -> Cursor<'_> {
        Cursor::new(&self.buf, self.source_len, pos.min(self.source_len))
    }

    /// Text of `start..end`. Empty if the range is out of bounds or splits a
    /// UTF-8 character.
    pub fn slice(&self, start: u32, end: u32) -> &str {
        let end = end.min(self.source_len) as usize;
        let start = (start as usize).min(end);
        std::str::from_utf8(&self.buf[start..end]).unwrap_or("")
    }

    pub fn len(&self) -> u32 {
        self.source_len
    }

    pub fn is_empty(&self) -> bool {
        self.source_len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_and_padding() {
        let buf = SourceBuffer::new("int");
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.as_bytes(), b"int");
        let cursor = buf.cursor_at(3);
        assert!(cursor.is_eof());
        assert_eq!(cursor.peek2(), 0);
    }

    #[test]
    fn slice_clamps() {
        let buf = SourceBuffer::new("abc");
        assert_eq!(buf.slice(1, 3), "bc");
        assert_eq!(buf.slice(2, 99), "c");
        assert_eq!(buf.slice(5, 9), "");
    }

    #[test]
    fn empty_source() {
        let buf = SourceBuffer::new("");
        assert!(buf.is_empty());
        assert!(buf.cursor().is_eof());
    }
}
