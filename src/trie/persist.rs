//! Snapshot persistence
//!
//! The compact snapshot is the node array written verbatim: `size` records
//! of 16 bytes, little-endian. Loading it alone supports every read-only
//! operation; the first mutating call rebuilds the link info and block
//! bookkeeping from the node words. The fast snapshot additionally writes a
//! `<name>.sbl` sidecar (ring heads, link info, block records) so a loaded
//! trie is immediately mutable.
//!
//! The format is little-endian and not portable across endianness.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use crate::error::{Result, TrieError};
use crate::io::{DataInput, DataOutput, ReaderDataInput, WriterDataOutput};

use super::da::{BlockKind, DoubleArrayTrie, TrieConfig};
use super::node::{Block, Node, NodeInfo, BLOCK_BYTES, NINFO_BYTES, NODE_BYTES};
use super::value::TrieValue;
use super::variant::Variant;

fn sidecar_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".sbl");
    PathBuf::from(name)
}

impl<V: TrieValue, M: Variant> DoubleArrayTrie<V, M> {
    /// Write the compact snapshot: the node array verbatim.
    ///
    /// A trie loaded from it serves read-only queries immediately and
    /// rebuilds its mutation bookkeeping on demand (see
    /// [`restore`](Self::restore)).
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut out = WriterDataOutput::new(BufWriter::new(File::create(path)?));
        for node in &self.array[..self.size] {
            node.write_to(&mut out)?;
        }
        out.flush()?;
        log::debug!(
            "saved {} nodes ({} bytes) to {}",
            self.size,
            self.total_size(),
            path.display()
        );
        Ok(())
    }

    /// Write the compact snapshot plus the `<name>.sbl` sidecar, making a
    /// later [`open_fast`](Self::open_fast) immediately mutable.
    pub fn save_fast<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.save(path)?;
        if self.ninfo.is_empty() || self.blocks.is_empty() {
            return Err(TrieError::invalid_data(
                "cannot write a sidecar before restore()",
            ));
        }
        let sidecar = sidecar_path(path);
        let mut out = WriterDataOutput::new(BufWriter::new(File::create(&sidecar)?));
        for kind in [BlockKind::Full, BlockKind::Closed, BlockKind::Open] {
            out.write_i64(self.head(kind))?;
        }
        for info in &self.ninfo[..self.size] {
            info.write_to(&mut out)?;
        }
        for block in &self.blocks[..self.size >> 8] {
            block.write_to(&mut out)?;
        }
        out.flush()?;
        log::debug!("saved sidecar to {}", sidecar.display());
        Ok(())
    }

    /// Load a compact snapshot with the default configuration
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, TrieConfig::default())
    }

    /// Load a compact snapshot.
    ///
    /// The loaded trie serves read-only queries as-is; the first mutating
    /// call (or an explicit [`restore`](Self::restore)) rebuilds the link
    /// info and block bookkeeping.
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: TrieConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let bytes = file.metadata()?.len() as usize;
        if bytes == 0 || bytes % (256 * NODE_BYTES) != 0 {
            return Err(TrieError::invalid_data(format!(
                "snapshot {} is {} bytes, not a whole number of 256-node blocks",
                path.display(),
                bytes
            )));
        }
        let size = bytes / NODE_BYTES;
        let mut input = ReaderDataInput::new(BufReader::new(file));
        let mut array = Vec::with_capacity(size);
        for _ in 0..size {
            array.push(Node::read_from(&mut input)?);
        }
        log::debug!("opened {} nodes from {}", size, path.display());

        let mut reject = [0i16; 257];
        for (i, r) in reject.iter_mut().enumerate() {
            *r = i as i16 + 1;
        }
        Ok(Self {
            array,
            ninfo: Vec::new(),
            blocks: Vec::new(),
            bhead: [0; 3],
            size,
            capacity: size,
            reject,
            tracking: Vec::new(),
            config,
            _marker: std::marker::PhantomData,
        })
    }

    /// Load a fast snapshot (main file plus `<name>.sbl` sidecar); the
    /// result is immediately mutable.
    pub fn open_fast<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut trie = Self::open(path)?;
        let sidecar = sidecar_path(path);
        let file = File::open(&sidecar)?;
        let expected = 3 * 8 + trie.size * NINFO_BYTES + (trie.size >> 8) * BLOCK_BYTES;
        if (file.metadata()?.len() as usize) < expected {
            return Err(TrieError::invalid_data(format!(
                "sidecar {} is shorter than the {} bytes its snapshot requires",
                sidecar.display(),
                expected
            )));
        }
        let mut input = ReaderDataInput::new(BufReader::new(file));
        for kind in [BlockKind::Full, BlockKind::Closed, BlockKind::Open] {
            trie.bhead[kind as usize] = input.read_i64()?;
        }
        let mut ninfo = Vec::with_capacity(trie.size);
        for _ in 0..trie.size {
            ninfo.push(NodeInfo::read_from(&mut input)?);
        }
        let mut blocks = Vec::with_capacity(trie.size >> 8);
        for _ in 0..trie.size >> 8 {
            blocks.push(Block::read_from(&mut input)?);
        }
        trie.ninfo = ninfo;
        trie.blocks = blocks;
        log::debug!("opened sidecar from {}", sidecar.display());
        Ok(trie)
    }

    /// Rebuild whatever bookkeeping a compact-snapshot load left out, making
    /// the trie mutable without the first-mutation overhead.
    pub fn restore(&mut self) {
        if self.blocks.is_empty() {
            self.restore_block();
        }
        if self.ninfo.is_empty() {
            self.restore_ninfo();
        }
        self.capacity = self.size;
    }

    /// Rebuild the sibling chains by scanning every occupied slot: each
    /// non-terminal label is re-spliced under its parent.
    pub(crate) fn restore_ninfo(&mut self) {
        log::debug!("restoring link info for {} nodes", self.size);
        self.ninfo = vec![NodeInfo::default(); self.size];
        for to in 0..self.size {
            let from = self.array[to].check;
            if from < 0 {
                continue;
            }
            let base = M::decode_base(self.array[from as usize].data);
            let label = (base ^ to as i64) as u8;
            if label != 0 {
                let from = from as usize;
                let walk = from == 0
                    || self.ninfo[from].child != 0
                    || self.array[base as usize].check == from as i64;
                self.push_sibling(from, base, label, walk);
            }
        }
    }

    /// Rebuild the block records by counting each block's empties, and sort
    /// the blocks onto their state rings.
    pub(crate) fn restore_block(&mut self) {
        log::debug!("restoring block records for {} blocks", self.size >> 8);
        self.blocks = vec![Block::new(); self.size >> 8];
        self.bhead = [0; 3];
        let mut e = 0usize;
        for bi in 0..self.size >> 8 {
            self.blocks[bi].num = 0;
            while e < (bi << 8) + 256 {
                if self.array[e].check < 0 {
                    self.blocks[bi].num += 1;
                    if self.blocks[bi].num == 1 {
                        self.blocks[bi].ehead = e as i64;
                    }
                }
                e += 1;
            }
            let kind = match self.blocks[bi].num {
                0 => BlockKind::Full,
                1 => BlockKind::Closed,
                _ => BlockKind::Open,
            };
            let empty = self.head(kind) == 0 && self.blocks[bi].num != 0;
            self.push_block(bi as i64, kind, empty);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::variant::Standard;
    use super::*;

    fn sample() -> DoubleArrayTrie<i32, Standard> {
        let mut trie = DoubleArrayTrie::new();
        for (i, key) in [b"open".as_ref(), b"opera".as_ref(), b"save".as_ref()]
            .iter()
            .enumerate()
        {
            trie.update(key, i as i32 + 1);
        }
        trie
    }

    #[test]
    fn test_save_open_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trie.da");

        let trie = sample();
        trie.save(&path).unwrap();
        assert_eq!(
            std::fs::metadata(&path).unwrap().len() as usize,
            trie.total_size()
        );

        let loaded = DoubleArrayTrie::<i32>::open(&path).unwrap();
        assert_eq!(loaded.size(), trie.size());
        assert_eq!(loaded.exact_match_search(b"open"), Some(1));
        assert_eq!(loaded.exact_match_search(b"opera"), Some(2));
        assert_eq!(loaded.exact_match_search(b"save"), Some(3));
        assert_eq!(loaded.exact_match_search(b"ope"), None);
        assert_eq!(loaded.num_keys(), 3);
    }

    #[test]
    fn test_restore_then_mutate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trie.da");
        sample().save(&path).unwrap();

        let mut loaded = DoubleArrayTrie::<i32>::open(&path).unwrap();
        loaded.restore();
        loaded.validate().unwrap();

        loaded.update(b"new", 9);
        assert!(loaded.erase(b"save"));
        assert_eq!(loaded.exact_match_search(b"new"), Some(9));
        assert_eq!(loaded.exact_match_search(b"open"), Some(1));
        assert_eq!(loaded.exact_match_search(b"opera"), Some(2));
        assert_eq!(loaded.exact_match_search(b"save"), None);
        loaded.validate().unwrap();
    }

    #[test]
    fn test_mutate_without_explicit_restore() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trie.da");
        sample().save(&path).unwrap();

        // the first update triggers the on-demand restore
        let mut loaded = DoubleArrayTrie::<i32>::open(&path).unwrap();
        loaded.update(b"lazy", 7);
        assert_eq!(loaded.exact_match_search(b"lazy"), Some(7));
        assert_eq!(loaded.exact_match_search(b"opera"), Some(2));
        loaded.validate().unwrap();
    }

    #[test]
    fn test_fast_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trie.da");

        let trie = sample();
        trie.save_fast(&path).unwrap();
        assert!(sidecar_path(&path).exists());

        let mut loaded = DoubleArrayTrie::<i32>::open_fast(&path).unwrap();
        // immediately mutable: bookkeeping came from the sidecar
        assert!(!loaded.ninfo.is_empty());
        loaded.update(b"more", 4);
        assert_eq!(loaded.exact_match_search(b"more"), Some(4));
        assert_eq!(loaded.exact_match_search(b"opera"), Some(2));
        loaded.validate().unwrap();
    }

    #[test]
    fn test_open_rejects_truncated_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.da");
        std::fs::write(&path, vec![0u8; 100]).unwrap();
        assert!(DoubleArrayTrie::<i32>::open(&path).is_err());
    }

    #[test]
    fn test_open_missing_file() {
        assert!(DoubleArrayTrie::<i32>::open("/no/such/file.da").is_err());
    }

    #[test]
    fn test_save_reopen_save_identical() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.da");
        let second = dir.path().join("second.da");

        sample().save(&first).unwrap();
        let loaded = DoubleArrayTrie::<i32>::open(&first).unwrap();
        loaded.save(&second).unwrap();
        assert_eq!(
            std::fs::read(&first).unwrap(),
            std::fs::read(&second).unwrap()
        );
    }
}
