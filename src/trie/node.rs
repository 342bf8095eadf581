//! Array record types
//!
//! A trie is three parallel arrays: nodes (`data`/`check` word pairs), node
//! link info (`sibling`/`child` label bytes), and per-256-slot block
//! bookkeeping. The node record is the unit of the on-disk snapshot format:
//! 16 bytes, little-endian. The sidecar records keep LP64-style field
//! widths so the layout is stable across builds.

use crate::error::Result;
use crate::io::{DataInput, DataOutput};

/// Bytes per node record in a snapshot
pub const NODE_BYTES: usize = 16;
/// Bytes per ninfo record in a sidecar
pub(crate) const NINFO_BYTES: usize = 2;
/// Bytes per block record in a sidecar
pub(crate) const BLOCK_BYTES: usize = 32;

/// A single double-array node.
///
/// `data` is a union word: the encoded child offset of an interior node, the
/// stored value of a value slot, or the negated previous-empty index of a
/// free slot. `check` holds the parent index of an occupied slot, or the
/// negated next-empty index of a free slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Node {
    pub(crate) data: i64,
    pub(crate) check: i64,
}

impl Node {
    pub(crate) fn new(data: i64, check: i64) -> Self {
        Self { data, check }
    }

    /// Raw data word (base/value union)
    #[inline]
    pub fn data(&self) -> i64 {
        self.data
    }

    /// Raw check word (parent index, negative if the slot is empty)
    #[inline]
    pub fn check(&self) -> i64 {
        self.check
    }

    pub(crate) fn write_to(&self, out: &mut impl DataOutput) -> Result<()> {
        out.write_i64(self.data)?;
        out.write_i64(self.check)
    }

    pub(crate) fn read_from(input: &mut impl DataInput) -> Result<Self> {
        let data = input.read_i64()?;
        let check = input.read_i64()?;
        Ok(Self { data, check })
    }
}

/// Per-node link info: the label of the first child and the label of the
/// right sibling. Zero means "none" (the label byte 0 is reserved for the
/// terminal edge, so it never names a sibling).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct NodeInfo {
    pub(crate) sibling: u8,
    pub(crate) child: u8,
}

impl NodeInfo {
    pub(crate) fn write_to(&self, out: &mut impl DataOutput) -> Result<()> {
        out.write_u8(self.sibling)?;
        out.write_u8(self.child)
    }

    pub(crate) fn read_from(input: &mut impl DataInput) -> Result<Self> {
        let sibling = input.read_u8()?;
        let child = input.read_u8()?;
        Ok(Self { sibling, child })
    }
}

/// Bookkeeping for one 256-slot block: its position on a state ring, the
/// count and head of its empty-slot ring, and the placement failure data
/// that drives the Full/Closed/Open state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Block {
    pub(crate) prev: i64,
    pub(crate) next: i64,
    /// Number of empty slots, 0..=256
    pub(crate) num: i16,
    /// Smallest child-group size known not to fit here; soft limit
    pub(crate) reject: i16,
    /// Failed placement attempts since the last release into this block
    pub(crate) trial: i32,
    /// First slot of the empty ring, meaningful while `num > 0`
    pub(crate) ehead: i64,
}

impl Block {
    pub(crate) fn new() -> Self {
        Self {
            prev: 0,
            next: 0,
            num: 256,
            reject: 257,
            trial: 0,
            ehead: 0,
        }
    }

    pub(crate) fn write_to(&self, out: &mut impl DataOutput) -> Result<()> {
        out.write_i64(self.prev)?;
        out.write_i64(self.next)?;
        out.write_i16(self.num)?;
        out.write_i16(self.reject)?;
        out.write_i32(self.trial)?;
        out.write_i64(self.ehead)
    }

    pub(crate) fn read_from(input: &mut impl DataInput) -> Result<Self> {
        let prev = input.read_i64()?;
        let next = input.read_i64()?;
        let num = input.read_i16()?;
        let reject = input.read_i16()?;
        let trial = input.read_i32()?;
        let ehead = input.read_i64()?;
        Ok(Self {
            prev,
            next,
            num,
            reject,
            trial,
            ehead,
        })
    }
}
