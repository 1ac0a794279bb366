//! Read-only access to the target's cell heap.
//!
//! The cell heap is one flat array of 8-byte words. Atom names are stored as
//! NUL-terminated bytes addressed by byte offset; cons cells occupy two
//! consecutive words addressed by word ordinal.

use std::cell::RefCell;

use rustc_hash::FxHashMap;

use crate::error::{InspectError, Result};
use crate::tag::Lexp;

/// Bytes per heap word.
pub const WORD_SIZE: usize = 8;

// ============================================================================
// Accessor Interface
// ============================================================================

/// Bounds-checked reads from a cell heap.
pub trait CellHeap {
    /// Size of the heap in bytes.
    fn extent(&self) -> usize;

    /// Read up to `max_len` bytes starting at byte `offset`. The result is
    /// shorter than `max_len` only when the heap ends first.
    fn read_bytes(&self, offset: u64, max_len: usize) -> Result<Vec<u8>>;

    /// Read the word at `ordinal` (byte offset `ordinal * 8`).
    fn read_word(&self, ordinal: u64) -> Result<Lexp>;

    /// Read a NUL-terminated string starting at byte `offset`. The name and
    /// its terminator must fit in `max_len` bytes.
    fn read_cstring(&self, offset: u64, max_len: usize) -> Result<String> {
        let bytes = self.read_bytes(offset, max_len)?;
        match bytes.iter().position(|&b| b == 0) {
            Some(end) => Ok(String::from_utf8_lossy(&bytes[..end]).into_owned()),
            None => Err(InspectError::unterminated(offset, max_len)),
        }
    }
}

impl<H: CellHeap + ?Sized> CellHeap for &H {
    fn extent(&self) -> usize {
        (**self).extent()
    }

    fn read_bytes(&self, offset: u64, max_len: usize) -> Result<Vec<u8>> {
        (**self).read_bytes(offset, max_len)
    }

    fn read_word(&self, ordinal: u64) -> Result<Lexp> {
        (**self).read_word(ordinal)
    }

    fn read_cstring(&self, offset: u64, max_len: usize) -> Result<String> {
        (**self).read_cstring(offset, max_len)
    }
}

/// Byte range of the word at `ordinal`, if it lies inside `extent`.
pub(crate) fn word_range(ordinal: u64, extent: usize) -> Result<std::ops::Range<usize>> {
    let start = ordinal
        .checked_mul(WORD_SIZE as u64)
        .and_then(|s| usize::try_from(s).ok())
        .ok_or_else(|| InspectError::out_of_range(ordinal, extent))?;
    match start.checked_add(WORD_SIZE) {
        Some(end) if end <= extent => Ok(start..end),
        _ => Err(
            InspectError::heap(format!(
                "cell[{ordinal:#x}] outside cell heap of {} words",
                extent / WORD_SIZE
            ))
            .with_ordinal(ordinal),
        ),
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// A frozen copy of the cell heap, words stored little-endian.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    bytes: Vec<u8>,
}

impl Snapshot {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Snapshot { bytes }
    }

    pub fn from_words(words: &[Lexp]) -> Self {
        let mut bytes = Vec::with_capacity(words.len() * WORD_SIZE);
        for w in words {
            bytes.extend_from_slice(&w.bits().to_le_bytes());
        }
        Snapshot { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Number of whole words in the snapshot.
    pub fn len_words(&self) -> usize {
        self.bytes.len() / WORD_SIZE
    }
}

impl CellHeap for Snapshot {
    fn extent(&self) -> usize {
        self.bytes.len()
    }

    fn read_bytes(&self, offset: u64, max_len: usize) -> Result<Vec<u8>> {
        let start = usize::try_from(offset)
            .ok()
            .filter(|&s| s < self.bytes.len())
            .ok_or_else(|| InspectError::out_of_range(offset, self.bytes.len()))?;
        let end = start.saturating_add(max_len).min(self.bytes.len());
        Ok(self.bytes[start..end].to_vec())
    }

    fn read_word(&self, ordinal: u64) -> Result<Lexp> {
        let range = word_range(ordinal, self.bytes.len())?;
        let mut raw = [0u8; WORD_SIZE];
        raw.copy_from_slice(&self.bytes[range]);
        Ok(Lexp::from_bits(u64::from_le_bytes(raw)))
    }
}

// ============================================================================
// Per-inspection Cache
// ============================================================================

/// Memoizes reads for one top-level inspection, then is dropped.
///
/// The target may change between inspections, so a cache must never outlive
/// the call that created it.
pub struct CachedHeap<'a, H: CellHeap + ?Sized> {
    inner: &'a H,
    enabled: bool,
    words: RefCell<FxHashMap<u64, Lexp>>,
    strings: RefCell<FxHashMap<(u64, usize), String>>,
}

impl<'a, H: CellHeap + ?Sized> CachedHeap<'a, H> {
    pub fn new(inner: &'a H, enabled: bool) -> Self {
        CachedHeap {
            inner,
            enabled,
            words: RefCell::new(FxHashMap::default()),
            strings: RefCell::new(FxHashMap::default()),
        }
    }

    /// Number of distinct words fetched from the underlying heap.
    pub fn cached_words(&self) -> usize {
        self.words.borrow().len()
    }
}

impl<H: CellHeap + ?Sized> CellHeap for CachedHeap<'_, H> {
    fn extent(&self) -> usize {
        self.inner.extent()
    }

    fn read_bytes(&self, offset: u64, max_len: usize) -> Result<Vec<u8>> {
        self.inner.read_bytes(offset, max_len)
    }

    fn read_word(&self, ordinal: u64) -> Result<Lexp> {
        if !self.enabled {
            return self.inner.read_word(ordinal);
        }
        if let Some(&w) = self.words.borrow().get(&ordinal) {
            return Ok(w);
        }
        let w = self.inner.read_word(ordinal)?;
        log::trace!("cell[{ordinal:#x}] = {w}");
        self.words.borrow_mut().insert(ordinal, w);
        Ok(w)
    }

    fn read_cstring(&self, offset: u64, max_len: usize) -> Result<String> {
        if !self.enabled {
            return self.inner.read_cstring(offset, max_len);
        }
        if let Some(s) = self.strings.borrow().get(&(offset, max_len)) {
            return Ok(s.clone());
        }
        let s = self.inner.read_cstring(offset, max_len)?;
        log::trace!("((char*)cell) + {offset:#x} = {s:?}");
        self.strings
            .borrow_mut()
            .insert((offset, max_len), s.clone());
        Ok(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InspectErrorKind;
    use crate::tag::Tag;
    use std::cell::Cell;

    fn heap_with_atom() -> Snapshot {
        let mut bytes = vec![0u8; 64];
        bytes[5..8].copy_from_slice(b"ab\0");
        Snapshot::from_bytes(bytes)
    }

    #[test]
    fn test_read_word_little_endian() {
        let w = Lexp::boxed(Tag::Cons, 7);
        let snap = Snapshot::from_words(&[Lexp::nil(), w]);
        assert_eq!(snap.read_word(1).unwrap(), w);
        assert_eq!(snap.as_bytes()[8], 7);
    }

    #[test]
    fn test_read_word_out_of_range() {
        let snap = Snapshot::from_words(&[Lexp::nil(); 4]);
        let err = snap.read_word(4).unwrap_err();
        assert_eq!(err.kind, InspectErrorKind::HeapAccess);
        assert!(snap.read_word(u64::MAX).is_err());
    }

    #[test]
    fn test_partial_trailing_word_is_not_readable() {
        let snap = Snapshot::from_bytes(vec![0u8; 12]);
        assert_eq!(snap.len_words(), 1);
        assert!(snap.read_word(1).is_err());
    }

    #[test]
    fn test_read_cstring() {
        let snap = heap_with_atom();
        assert_eq!(snap.read_cstring(5, 16).unwrap(), "ab");
        assert_eq!(snap.read_cstring(7, 16).unwrap(), "");
    }

    #[test]
    fn test_read_cstring_needs_room_for_terminator() {
        let snap = heap_with_atom();
        assert_eq!(snap.read_cstring(5, 3).unwrap(), "ab");
        let err = snap.read_cstring(5, 2).unwrap_err();
        assert_eq!(err.kind, InspectErrorKind::UnterminatedString);
    }

    #[test]
    fn test_read_cstring_running_off_heap_end() {
        let snap = Snapshot::from_bytes(b"xyz".to_vec());
        let err = snap.read_cstring(0, 100).unwrap_err();
        assert_eq!(err.kind, InspectErrorKind::UnterminatedString);
    }

    #[test]
    fn test_read_bytes_bounds() {
        let snap = heap_with_atom();
        assert_eq!(snap.read_bytes(60, 10).unwrap().len(), 4);
        let err = snap.read_bytes(64, 1).unwrap_err();
        assert_eq!(err.kind, InspectErrorKind::HeapAccess);
    }

    struct CountingHeap {
        snap: Snapshot,
        reads: Cell<usize>,
    }

    impl CellHeap for CountingHeap {
        fn extent(&self) -> usize {
            self.snap.extent()
        }

        fn read_bytes(&self, offset: u64, max_len: usize) -> Result<Vec<u8>> {
            self.reads.set(self.reads.get() + 1);
            self.snap.read_bytes(offset, max_len)
        }

        fn read_word(&self, ordinal: u64) -> Result<Lexp> {
            self.reads.set(self.reads.get() + 1);
            self.snap.read_word(ordinal)
        }
    }

    #[test]
    fn test_cache_avoids_repeat_reads() {
        let heap = CountingHeap {
            snap: heap_with_atom(),
            reads: Cell::new(0),
        };
        let cached = CachedHeap::new(&heap, true);
        cached.read_word(2).unwrap();
        cached.read_word(2).unwrap();
        cached.read_cstring(5, 16).unwrap();
        cached.read_cstring(5, 16).unwrap();
        assert_eq!(heap.reads.get(), 2);
        assert_eq!(cached.cached_words(), 1);
    }

    #[test]
    fn test_disabled_cache_passes_through() {
        let heap = CountingHeap {
            snap: heap_with_atom(),
            reads: Cell::new(0),
        };
        let cached = CachedHeap::new(&heap, false);
        cached.read_word(2).unwrap();
        cached.read_word(2).unwrap();
        assert_eq!(heap.reads.get(), 2);
    }
}
