//! Structured binary I/O
//!
//! This module provides traits and implementations for reading and writing
//! fixed-width little-endian records, used by the snapshot persistence layer.

pub mod data_input;
pub mod data_output;

// Re-export core types
pub use data_input::{DataInput, ReaderDataInput, SliceDataInput};
pub use data_output::{DataOutput, VecDataOutput, WriterDataOutput};
