//! The database image: a growable byte array of length-prefixed blocks.
//!
//! # Layout
//!
//! ```text
//! 0    magic  b"CIDXPDOM"
//! 8    u32    layout version
//! 12   u32    live block count
//! 16   u32    end of the allocated image
//! 20   u32    root slots (linkage indexes, file list)
//! 32   u32    free list heads, one per 8-byte size class from 16 to 256
//! 156  u32    free list of larger blocks, first fit
//! 160         first block
//! ```
//!
//! Every block starts with its `u32` size; a [`RecordNo`] is the offset of
//! that size word, so record fields start at offset 4. `0` is never a valid
//! block and serves as the null reference.
//!
//! All integers are little-endian. Reads are bounds-checked and report
//! [`PdomError::Corrupt`] instead of panicking on a damaged image.
//!
//! # Transactions
//!
//! Between [`Database::begin`] and [`Database::commit`] every overwritten
//! byte range is copied into an undo journal first. [`Database::rollback`]
//! replays the journal backwards and truncates the image to its length at
//! `begin`, restoring the image byte for byte.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{PdomError, PdomResult};

pub const MAGIC: &[u8; 8] = b"CIDXPDOM";

/// Bumped whenever a record layout changes.
pub const VERSION: u32 = 1;

/// Address of a block in the image.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct RecordNo(u32);

impl RecordNo {
    pub const NONE: RecordNo = RecordNo(0);

    #[inline]
    pub const fn new(raw: u32) -> Self {
        RecordNo(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_some(self) -> bool {
        self.0 != 0
    }

    /// `None` for the null record.
    #[inline]
    pub fn get(self) -> Option<RecordNo> {
        self.is_some().then_some(self)
    }
}

impl From<Option<RecordNo>> for RecordNo {
    fn from(rec: Option<RecordNo>) -> Self {
        rec.unwrap_or(RecordNo::NONE)
    }
}

impl fmt::Debug for RecordNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for RecordNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Header slots.
pub(crate) mod header {
    pub const VERSION: u32 = 8;
    pub const RECORD_COUNT: u32 = 12;
    pub const END: u32 = 16;
    /// Root slots, addressed through [`super::Root`].
    pub const ROOTS: u32 = 20;
    pub const FREE_LISTS: u32 = 32;
    pub const LARGE_FREE: u32 = FREE_LISTS + super::SMALL_CLASSES * 4;
    pub const SIZE: u32 = LARGE_FREE + 4;
}

const BLOCK_HEADER: u32 = 4;
const GRANULE: u32 = 8;
const MIN_BLOCK: u32 = 16;
const MAX_SMALL: u32 = 256;
const SMALL_CLASSES: u32 = (MAX_SMALL - MIN_BLOCK) / GRANULE + 1;

/// Named pointers stored in the header.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Root {
    CIndex,
    CppIndex,
    Files,
}

impl Root {
    pub(crate) const fn offset(self) -> u32 {
        header::ROOTS
            + 4 * match self {
                Root::CIndex => 0,
                Root::CppIndex => 1,
                Root::Files => 2,
            }
    }
}

/// Undo information for one open transaction.
#[derive(Debug)]
struct Journal {
    /// Image length at `begin`; bytes past it need no undo entries.
    len: usize,
    entries: Vec<(u32, SmallVec<[u8; 8]>)>,
}

#[derive(Debug)]
pub struct Database {
    image: Vec<u8>,
    journal: Option<Journal>,
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl Database {
    /// An empty database holding only the header.
    pub fn new() -> Self {
        let mut image = vec![0; header::SIZE as usize];
        image[..8].copy_from_slice(MAGIC);
        image[header::VERSION as usize..][..4].copy_from_slice(&VERSION.to_le_bytes());
        image[header::END as usize..][..4].copy_from_slice(&header::SIZE.to_le_bytes());
        Database {
            image,
            journal: None,
        }
    }

    /// Adopt an image read from disk.
    pub fn from_bytes(image: Vec<u8>) -> PdomResult<Self> {
        if image.len() < header::SIZE as usize || &image[..8] != MAGIC {
            return Err(PdomError::Corrupt("missing database header".to_owned()));
        }
        let db = Database {
            image,
            journal: None,
        };
        let found = db.get_u32(RecordNo::NONE, header::VERSION)?;
        if found != VERSION {
            return Err(PdomError::VersionMismatch {
                found,
                expected: VERSION,
            });
        }
        let end = db.get_u32(RecordNo::NONE, header::END)? as usize;
        if end != db.image.len() {
            return Err(PdomError::Corrupt(format!(
                "image is {} bytes but the header says {end}",
                db.image.len()
            )));
        }
        Ok(db)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.image
    }

    pub fn len(&self) -> usize {
        self.image.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= header::SIZE as usize
    }

    /// Blocks currently allocated.
    pub fn record_count(&self) -> PdomResult<u32> {
        self.get_u32(RecordNo::NONE, header::RECORD_COUNT)
    }

    // Transactions

    pub fn begin(&mut self) {
        debug_assert!(self.journal.is_none(), "nested transaction");
        self.journal = Some(Journal {
            len: self.image.len(),
            entries: Vec::new(),
        });
    }

    pub fn in_transaction(&self) -> bool {
        self.journal.is_some()
    }

    pub fn commit(&mut self) {
        self.journal = None;
    }

    /// Undo every write since [`Database::begin`].
    pub fn rollback(&mut self) {
        let Some(journal) = self.journal.take() else {
            return;
        };
        tracing::debug!(entries = journal.entries.len(), "rolling back index transaction");
        for (offset, old) in journal.entries.into_iter().rev() {
            let start = offset as usize;
            self.image[start..start + old.len()].copy_from_slice(&old);
        }
        self.image.truncate(journal.len);
    }

    // Raw access

    fn range(&self, rec: RecordNo, offset: u32, len: usize) -> PdomResult<std::ops::Range<usize>> {
        let start = rec.raw() as usize + offset as usize;
        let end = start + len;
        if end > self.image.len() {
            return Err(PdomError::out_of_bounds(rec, self.image.len()));
        }
        Ok(start..end)
    }

    fn bytes<const N: usize>(&self, rec: RecordNo, offset: u32) -> PdomResult<[u8; N]> {
        let range = self.range(rec, offset, N)?;
        let mut out = [0; N];
        out.copy_from_slice(&self.image[range]);
        Ok(out)
    }

    fn write(&mut self, rec: RecordNo, offset: u32, data: &[u8]) -> PdomResult<()> {
        let range = self.range(rec, offset, data.len())?;
        if let Some(journal) = &mut self.journal {
            if range.start < journal.len {
                let logged = range.end.min(journal.len);
                let start = u32::try_from(range.start)
                    .map_err(|_| PdomError::Corrupt("image exceeds 4 GiB".to_owned()))?;
                journal
                    .entries
                    .push((start, SmallVec::from_slice(&self.image[range.start..logged])));
            }
        }
        self.image[range].copy_from_slice(data);
        Ok(())
    }

    pub fn get_u8(&self, rec: RecordNo, offset: u32) -> PdomResult<u8> {
        Ok(self.bytes::<1>(rec, offset)?[0])
    }

    pub fn get_u16(&self, rec: RecordNo, offset: u32) -> PdomResult<u16> {
        self.bytes(rec, offset).map(u16::from_le_bytes)
    }

    pub fn get_u32(&self, rec: RecordNo, offset: u32) -> PdomResult<u32> {
        self.bytes(rec, offset).map(u32::from_le_bytes)
    }

    pub fn get_u64(&self, rec: RecordNo, offset: u32) -> PdomResult<u64> {
        self.bytes(rec, offset).map(u64::from_le_bytes)
    }

    pub fn get_i64(&self, rec: RecordNo, offset: u32) -> PdomResult<i64> {
        self.bytes(rec, offset).map(i64::from_le_bytes)
    }

    pub fn get_rec(&self, rec: RecordNo, offset: u32) -> PdomResult<RecordNo> {
        self.get_u32(rec, offset).map(RecordNo)
    }

    pub fn put_u8(&mut self, rec: RecordNo, offset: u32, value: u8) -> PdomResult<()> {
        self.write(rec, offset, &[value])
    }

    pub fn put_u16(&mut self, rec: RecordNo, offset: u32, value: u16) -> PdomResult<()> {
        self.write(rec, offset, &value.to_le_bytes())
    }

    pub fn put_u32(&mut self, rec: RecordNo, offset: u32, value: u32) -> PdomResult<()> {
        self.write(rec, offset, &value.to_le_bytes())
    }

    pub fn put_u64(&mut self, rec: RecordNo, offset: u32, value: u64) -> PdomResult<()> {
        self.write(rec, offset, &value.to_le_bytes())
    }

    pub fn put_i64(&mut self, rec: RecordNo, offset: u32, value: i64) -> PdomResult<()> {
        self.write(rec, offset, &value.to_le_bytes())
    }

    pub fn put_rec(&mut self, rec: RecordNo, offset: u32, value: RecordNo) -> PdomResult<()> {
        self.put_u32(rec, offset, value.0)
    }

    pub fn root(&self, root: Root) -> PdomResult<RecordNo> {
        self.get_rec(RecordNo::NONE, root.offset())
    }

    pub fn set_root(&mut self, root: Root, value: RecordNo) -> PdomResult<()> {
        self.put_rec(RecordNo::NONE, root.offset(), value)
    }

    // Allocation

    /// Size of the block at `rec`, header included.
    pub fn block_size(&self, rec: RecordNo) -> PdomResult<u32> {
        self.get_u32(rec, 0)
    }

    fn block_size_for(len: u32) -> u32 {
        (len + BLOCK_HEADER).max(MIN_BLOCK).next_multiple_of(GRANULE)
    }

    fn free_list(size: u32) -> u32 {
        if size <= MAX_SMALL {
            header::FREE_LISTS + (size - MIN_BLOCK) / GRANULE * 4
        } else {
            header::LARGE_FREE
        }
    }

    /// Allocate a zeroed block with room for `len` bytes after the size word.
    pub fn malloc(&mut self, len: u32) -> PdomResult<RecordNo> {
        let size = Self::block_size_for(len);
        let rec = match self.take_free(size)? {
            Some(rec) => rec,
            None => self.grow(size)?,
        };
        let count = self.record_count()?;
        self.put_u32(RecordNo::NONE, header::RECORD_COUNT, count + 1)?;
        Ok(rec)
    }

    fn take_free(&mut self, size: u32) -> PdomResult<Option<RecordNo>> {
        let list = Self::free_list(size);
        let mut prev = RecordNo::NONE;
        let mut prev_field = list;
        let mut cur = self.get_rec(RecordNo::NONE, list)?;
        while cur.is_some() {
            let fits = if size <= MAX_SMALL {
                true
            } else {
                self.block_size(cur)? >= size
            };
            let next = self.get_rec(cur, BLOCK_HEADER)?;
            if fits {
                self.put_rec(prev, prev_field, next)?;
                // The rest of a free block is already zero.
                self.put_u32(cur, BLOCK_HEADER, 0)?;
                return Ok(Some(cur));
            }
            prev = cur;
            prev_field = BLOCK_HEADER;
            cur = next;
        }
        Ok(None)
    }

    fn grow(&mut self, size: u32) -> PdomResult<RecordNo> {
        let end = self.image.len();
        let new_end = u32::try_from(end + size as usize)
            .map_err(|_| PdomError::Corrupt("image exceeds 4 GiB".to_owned()))?;
        let rec = RecordNo(new_end - size);
        self.image.resize(new_end as usize, 0);
        self.put_u32(rec, 0, size)?;
        self.put_u32(RecordNo::NONE, header::END, new_end)?;
        Ok(rec)
    }

    /// Return a block to its free list, zeroing its contents.
    pub fn free(&mut self, rec: RecordNo) -> PdomResult<()> {
        if rec.raw() < header::SIZE {
            return Err(PdomError::Corrupt(format!("attempt to free {rec}")));
        }
        let size = self.block_size(rec)?;
        if size < MIN_BLOCK {
            return Err(PdomError::Corrupt(format!("{rec} has invalid size {size}")));
        }
        let zeros = vec![0; (size - BLOCK_HEADER) as usize];
        self.write(rec, BLOCK_HEADER, &zeros)?;
        let list = Self::free_list(size);
        let head = self.get_rec(RecordNo::NONE, list)?;
        self.put_rec(rec, BLOCK_HEADER, head)?;
        self.put_rec(RecordNo::NONE, list, rec)?;
        let count = self.record_count()?;
        self.put_u32(RecordNo::NONE, header::RECORD_COUNT, count.saturating_sub(1))
    }

    // Strings and blobs: `u32` length followed by the bytes.

    pub fn put_bytes(&mut self, data: &[u8]) -> PdomResult<RecordNo> {
        let len = u32::try_from(data.len())
            .map_err(|_| PdomError::Corrupt("value exceeds 4 GiB".to_owned()))?;
        let rec = self.malloc(len + 4)?;
        self.put_u32(rec, BLOCK_HEADER, len)?;
        self.write(rec, BLOCK_HEADER + 4, data)?;
        Ok(rec)
    }

    pub fn get_bytes(&self, rec: RecordNo) -> PdomResult<&[u8]> {
        let len = self.get_u32(rec, BLOCK_HEADER)? as usize;
        let range = self.range(rec, BLOCK_HEADER + 4, len)?;
        Ok(&self.image[range])
    }

    pub fn put_string(&mut self, s: &str) -> PdomResult<RecordNo> {
        self.put_bytes(s.as_bytes())
    }

    pub fn get_string(&self, rec: RecordNo) -> PdomResult<String> {
        if rec.is_none() {
            return Ok(String::new());
        }
        let bytes = self.get_bytes(rec)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| PdomError::Corrupt(format!("{rec} is not a UTF-8 string")))
    }

    /// Compare a stored string without allocating.
    pub fn string_eq(&self, rec: RecordNo, s: &str) -> PdomResult<bool> {
        if rec.is_none() {
            return Ok(s.is_empty());
        }
        Ok(self.get_bytes(rec)? == s.as_bytes())
    }

    pub fn string_starts_with(&self, rec: RecordNo, prefix: &str) -> PdomResult<bool> {
        if rec.is_none() {
            return Ok(prefix.is_empty());
        }
        Ok(self.get_bytes(rec)?.starts_with(prefix.as_bytes()))
    }

    pub fn put_blob<T: Serialize>(&mut self, value: &T) -> PdomResult<RecordNo> {
        let data = bincode::serialize(value).map_err(|e| PdomError::Serialization {
            record: RecordNo::NONE,
            message: e.to_string(),
        })?;
        self.put_bytes(&data)
    }

    pub fn get_blob<T: DeserializeOwned>(&self, rec: RecordNo) -> PdomResult<T> {
        bincode::deserialize(self.get_bytes(rec)?).map_err(|e| PdomError::Serialization {
            record: rec,
            message: e.to_string(),
        })
    }

    /// Free a string or blob record, ignoring the null record.
    pub fn free_value(&mut self, rec: RecordNo) -> PdomResult<()> {
        if rec.is_some() {
            self.free(rec)?;
        }
        Ok(())
    }
}
