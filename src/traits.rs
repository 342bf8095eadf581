//! Shared traits for trie structures
//!
//! Statistics reporting implemented by both the mutable trie and the
//! read-only snapshot view.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Statistics about trie structure and space usage
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrieStats {
    /// Number of keys stored
    pub num_keys: usize,
    /// Number of node slots in use (occupied plus freed-but-reserved)
    pub size: usize,
    /// Number of allocated node slots
    pub capacity: usize,
    /// Number of occupied node slots
    pub nonzero_size: usize,
    /// Memory usage of the arrays in bytes
    pub memory_usage: usize,
    /// Space efficiency (bits per key)
    pub bits_per_key: f64,
}

impl TrieStats {
    /// Create new empty statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculate bits per key from `memory_usage` and `num_keys`
    pub fn calculate_bits_per_key(&mut self) {
        if self.num_keys > 0 {
            self.bits_per_key = (self.memory_usage * 8) as f64 / self.num_keys as f64;
        }
    }
}

/// Trait for structures that provide space statistics
pub trait StatisticsProvider {
    /// Get detailed statistics about the structure
    fn stats(&self) -> TrieStats;

    /// Get memory usage in bytes
    fn memory_usage(&self) -> usize {
        self.stats().memory_usage
    }

    /// Get space efficiency in bits per key
    fn bits_per_key(&self) -> f64 {
        self.stats().bits_per_key
    }
}
