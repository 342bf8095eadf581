//! Data output abstractions and implementations
//!
//! This module provides traits and implementations for writing fixed-width
//! values to different destinations including byte vectors and writers.

use std::io::Write;

use crate::error::Result;

/// Trait for writing structured data to various destinations
///
/// All multi-byte integers are little-endian.
pub trait DataOutput {
    /// Write a single byte
    fn write_u8(&mut self, value: u8) -> Result<()>;

    /// Write a 16-bit unsigned integer in little-endian format
    fn write_u16(&mut self, value: u16) -> Result<()>;

    /// Write a 32-bit unsigned integer in little-endian format
    fn write_u32(&mut self, value: u32) -> Result<()>;

    /// Write a 64-bit unsigned integer in little-endian format
    fn write_u64(&mut self, value: u64) -> Result<()>;

    /// Write bytes from the provided buffer
    fn write_bytes(&mut self, data: &[u8]) -> Result<()>;

    /// Write a 16-bit signed integer in little-endian format
    fn write_i16(&mut self, value: i16) -> Result<()> {
        self.write_u16(value as u16)
    }

    /// Write a 32-bit signed integer in little-endian format
    fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_u32(value as u32)
    }

    /// Write a 64-bit signed integer in little-endian format
    fn write_i64(&mut self, value: i64) -> Result<()> {
        self.write_u64(value as u64)
    }

    /// Flush any buffered data to the underlying destination
    fn flush(&mut self) -> Result<()>;
}

/// DataOutput implementation for Vec<u8>
#[derive(Default)]
pub struct VecDataOutput {
    data: Vec<u8>,
}

impl VecDataOutput {
    /// Create a new VecDataOutput
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new VecDataOutput with the specified initial capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Get the number of bytes written
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if no bytes have been written
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get a reference to the underlying data
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Convert into the underlying Vec<u8>
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl DataOutput for VecDataOutput {
    fn write_u8(&mut self, value: u8) -> Result<()> {
        self.data.push(value);
        Ok(())
    }

    fn write_u16(&mut self, value: u16) -> Result<()> {
        self.data.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn write_u32(&mut self, value: u32) -> Result<()> {
        self.data.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn write_u64(&mut self, value: u64) -> Result<()> {
        self.data.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.data.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// DataOutput implementation for any `std::io::Write`
pub struct WriterDataOutput<W: Write> {
    writer: W,
}

impl<W: Write> WriterDataOutput<W> {
    /// Create a new WriterDataOutput wrapping the given writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Consume the output and return the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DataOutput for WriterDataOutput<W> {
    fn write_u8(&mut self, value: u8) -> Result<()> {
        self.writer.write_all(&[value])?;
        Ok(())
    }

    fn write_u16(&mut self, value: u16) -> Result<()> {
        self.writer.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    fn write_u32(&mut self, value: u32) -> Result<()> {
        self.writer.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    fn write_u64(&mut self, value: u64) -> Result<()> {
        self.writer.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::data_input::{DataInput, SliceDataInput};

    #[test]
    fn test_vec_output_round_trip() {
        let mut out = VecDataOutput::new();
        out.write_u8(7).unwrap();
        out.write_i16(-2).unwrap();
        out.write_i32(1 << 20).unwrap();
        out.write_i64(-(1i64 << 40)).unwrap();
        assert_eq!(out.len(), 15);

        let data = out.into_vec();
        let mut input = SliceDataInput::new(&data);
        assert_eq!(input.read_u8().unwrap(), 7);
        assert_eq!(input.read_i16().unwrap(), -2);
        assert_eq!(input.read_i32().unwrap(), 1 << 20);
        assert_eq!(input.read_i64().unwrap(), -(1i64 << 40));
    }

    #[test]
    fn test_writer_output() {
        let mut buf = Vec::new();
        {
            let mut out = WriterDataOutput::new(&mut buf);
            out.write_u64(0x1122334455667788).unwrap();
            out.flush().unwrap();
        }
        assert_eq!(buf, 0x1122334455667788u64.to_le_bytes());
    }
}
