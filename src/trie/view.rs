//! Read-only snapshot views
//!
//! A [`TrieView`] serves the read-only operations straight from the bytes of
//! a compact snapshot, without building a mutable trie: decoded node words
//! are read on the fly, so the buffer can be a borrowed slice, an owned
//! vector, or (with the `mmap` feature) a memory-mapped file shared between
//! processes. This is the intended way to share a trie across threads: save
//! the node array once, let readers map it read-only.

use std::marker::PhantomData;
use std::ops::Deref;

use crate::error::{Result, TrieError};
use crate::traits::{StatisticsProvider, TrieStats};

use super::node::NODE_BYTES;
use super::search::{self, CommonPrefix, count_keys, count_nonzero, FindOutcome, NodeRead, TraverseResult};
use super::value::TrieValue;
use super::variant::{Standard, Variant};

/// A read-only trie over the raw bytes of a compact snapshot.
///
/// Supports exact-match, common-prefix, and traverse queries. Corrupt or
/// foreign bytes degrade to "not found"; they never cause out-of-bounds
/// access.
pub struct TrieView<V: TrieValue = i32, M: Variant = Standard, B = Vec<u8>>
where
    B: Deref<Target = [u8]>,
{
    bytes: B,
    size: usize,
    _marker: PhantomData<(V, M)>,
}

impl<V: TrieValue, M: Variant, B: Deref<Target = [u8]>> TrieView<V, M, B> {
    /// Wrap a snapshot buffer. The length must be a whole number of node
    /// records.
    pub fn new(bytes: B) -> Result<Self> {
        let len = bytes.len();
        if len == 0 || len % NODE_BYTES != 0 {
            return Err(TrieError::invalid_data(format!(
                "snapshot buffer of {} bytes is not a whole number of {}-byte nodes",
                len, NODE_BYTES
            )));
        }
        Ok(Self {
            size: len / NODE_BYTES,
            bytes,
            _marker: PhantomData,
        })
    }

    /// Number of node records in the snapshot
    pub fn size(&self) -> usize {
        self.size
    }

    /// The underlying snapshot bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of keys stored in the snapshot
    pub fn num_keys(&self) -> usize {
        count_keys::<M, _>(self)
    }

    /// Look up `key` and return its value, if stored
    pub fn exact_match_search(&self, key: &[u8]) -> Option<V> {
        search::exact_match::<V, M, _>(self, key, 0)
    }

    /// Look up `key` as a suffix under node `from`
    pub fn exact_match_search_from(&self, key: &[u8], from: usize) -> Option<V> {
        search::exact_match::<V, M, _>(self, key, from)
    }

    /// Iterate the values stored at successive prefixes of `key`
    pub fn common_prefix_search<'a>(&'a self, key: &'a [u8]) -> CommonPrefix<'a, Self, V, M> {
        CommonPrefix::new(self, key, 0)
    }

    /// Walk `key[*pos..]` from node `*from`, advancing both cursors
    pub fn traverse(&self, key: &[u8], from: &mut usize, pos: &mut usize) -> TraverseResult<V> {
        match search::find::<M, _>(self, key, from, pos, key.len()) {
            FindOutcome::Word(word) => TraverseResult::Found(V::from_word(word)),
            FindOutcome::NoValue => TraverseResult::NoValue,
            FindOutcome::NoPath => TraverseResult::NoPath,
        }
    }

    #[inline]
    fn word_at(&self, offset: usize) -> i64 {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&self.bytes[offset..offset + 8]);
        i64::from_le_bytes(buf)
    }
}

impl<V: TrieValue, M: Variant, B: Deref<Target = [u8]>> NodeRead for TrieView<V, M, B> {
    fn data(&self, id: usize) -> i64 {
        if id >= self.size {
            return 0;
        }
        self.word_at(id * NODE_BYTES)
    }

    fn check(&self, id: usize) -> i64 {
        if id >= self.size {
            return -1;
        }
        self.word_at(id * NODE_BYTES + 8)
    }

    fn slots(&self) -> usize {
        self.size
    }
}

impl<V: TrieValue, M: Variant, B: Deref<Target = [u8]>> StatisticsProvider for TrieView<V, M, B> {
    fn stats(&self) -> TrieStats {
        let mut stats = TrieStats {
            num_keys: self.num_keys(),
            size: self.size,
            capacity: self.size,
            nonzero_size: count_nonzero(self),
            memory_usage: self.bytes.len(),
            bits_per_key: 0.0,
        };
        stats.calculate_bits_per_key();
        stats
    }
}

#[cfg(feature = "mmap")]
impl<V: TrieValue, M: Variant> TrieView<V, M, memmap2::Mmap> {
    /// Memory-map a snapshot file read-only and serve queries from it.
    ///
    /// The file must not be mutated while mapped.
    pub fn open_mmap<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        // Safety: the map is read-only and the caller keeps the file unchanged
        let map = unsafe { memmap2::Mmap::map(&file)? };
        Self::new(map)
    }
}
