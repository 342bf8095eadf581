//! Error handling for the dartrie library
//!
//! Search misses are not errors: lookups return `Option`/enum results. The
//! error type below covers the fallible surface, which is persistence I/O
//! and snapshot decoding.

use thiserror::Error;

/// Main error type for the dartrie library
#[derive(Error, Debug)]
pub enum TrieError {
    /// I/O related errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid data format or corruption
    #[error("Invalid data: {message}")]
    InvalidData {
        /// Error message describing the issue
        message: String,
    },

    /// Structural invariant violation detected by [`validate`](crate::DoubleArrayTrie::validate)
    #[error("Corrupt trie: {message}")]
    Corrupt {
        /// Which invariant failed, and where
        message: String,
    },
}

impl TrieError {
    /// Create an invalid data error
    pub fn invalid_data<S: Into<String>>(message: S) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create a corrupt-trie error
    pub fn corrupt<S: Into<String>>(message: S) -> Self {
        Self::Corrupt {
            message: message.into(),
        }
    }

    /// Create an I/O error from a message
    pub fn io_error<S: Into<String>>(message: S) -> Self {
        Self::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            message.into(),
        ))
    }

    /// Get the error category for logging/metrics
    pub fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::InvalidData { .. } => "data",
            Self::Corrupt { .. } => "corrupt",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, TrieError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = TrieError::invalid_data("truncated snapshot");
        assert_eq!(err.category(), "data");
        let display = format!("{}", err);
        assert!(display.contains("Invalid data"));
        assert!(display.contains("truncated snapshot"));
    }

    #[test]
    fn test_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: TrieError = io_error.into();
        assert_eq!(err.category(), "io");
        assert!(format!("{}", err).contains("I/O error"));
    }

    #[test]
    fn test_corrupt_display() {
        let err = TrieError::corrupt("check[42] does not address its parent");
        assert!(format!("{}", err).contains("Corrupt trie"));
    }
}
