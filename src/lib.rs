//! # dartrie: Efficiently Updatable Double-Array Trie
//!
//! This crate provides an in-memory double-array trie mapping byte-string
//! keys to fixed-width values, designed for workloads that mutate the key
//! set incrementally:
//!
//! - **O(|key|) exact lookup** with one XOR-addressed array probe per byte
//! - **Incremental insert and erase** with no global rebuild; label
//!   conflicts relocate only the smaller of the two colliding subtrees
//! - **Prefix tooling**: common-prefix scan, predictive (subtree)
//!   enumeration, and key recovery
//! - **Compact snapshots**: the node array saves verbatim and reloads for
//!   read-only use instantly; mutation bookkeeping restores on demand
//! - **Zero-copy readers**: snapshot views over borrowed buffers or
//!   memory-mapped files (feature `mmap`)
//!
//! Keys must be non-empty and must not contain the zero byte, which is
//! reserved for the terminal edge.
//!
//! ## Quick Start
//!
//! ```rust
//! use dartrie::DoubleArrayTrie;
//!
//! let mut trie = DoubleArrayTrie::<i32>::new();
//! trie.update(b"banana", 7);
//! trie.update(b"band", 11);
//! trie.update(b"ban", 3);
//!
//! assert_eq!(trie.exact_match_search(b"band"), Some(11));
//! assert_eq!(trie.num_keys(), 3);
//!
//! // values stored at prefixes of a query
//! let hits: Vec<_> = trie.common_prefix_search(b"bandana").collect();
//! assert_eq!(hits.len(), 2); // "ban", "band"
//!
//! // keys extending a prefix, lexicographically
//! let keys: Vec<_> = trie.keys_with_prefix(b"ban").map(|(k, _)| k).collect();
//! assert_eq!(keys, vec![b"ban".to_vec(), b"banana".to_vec(), b"band".to_vec()]);
//!
//! trie.erase(b"banana");
//! assert_eq!(trie.exact_match_search(b"banana"), None);
//! ```
//!
//! ## Trie shapes
//!
//! Two shapes are selected at compile time through the second type
//! parameter: [`Standard`] stores values at terminal children, while
//! [`Reduced`] embeds values of leaf keys directly in the node word, which
//! is smaller and faster for short non-negative integer payloads.

#![warn(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod error;
pub mod io;
pub mod traits;
pub mod trie;

// Re-export core types
pub use error::{Result, TrieError};
pub use traits::{StatisticsProvider, TrieStats};
pub use trie::{
    CommonPrefix, DoubleArrayTrie, Keys, Match, MinimalPrefix, Node, Predict, Prediction, Reduced,
    Standard, TraverseResult, TrieConfig, TrieValue, TrieView, ValueMut, Variant,
};

/// Node identifier: an index into the node array
pub type NodeId = usize;

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info() {
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_re_exports() {
        let mut trie = DoubleArrayTrie::<i32>::new();
        trie.update(b"re-export", 1);
        assert_eq!(trie.exact_match_search(b"re-export"), Some(1));

        let _err: TrieError = TrieError::invalid_data("test");
        let _stats: TrieStats = trie.stats();
        let _id: NodeId = 0;
    }
}
