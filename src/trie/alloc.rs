//! Slot allocation and block-state bookkeeping
//!
//! Empty slots are kept on doubly-linked rings, one per 256-slot block,
//! threaded through the negated `data`/`check` words of the empty nodes.
//! Blocks sit on one of three state rings: Full (no empties, skipped by
//! placement), Closed (one empty, or too many failed placements; takes
//! single-child branches), and Open (everything else; searched for
//! multi-child stripes). Block 0 hosts the root and never migrates.

use super::da::{BlockKind, DoubleArrayTrie};
use super::node::{Block, Node, NodeInfo};
use super::value::TrieValue;
use super::variant::{Variant, VALUE_LIMIT};

impl<V: TrieValue, M: Variant> DoubleArrayTrie<V, M> {
    #[inline]
    pub(crate) fn head(&self, kind: BlockKind) -> i64 {
        self.bhead[kind as usize]
    }

    #[inline]
    fn set_head(&mut self, kind: BlockKind, bi: i64) {
        self.bhead[kind as usize] = bi;
    }

    /// Remove block `bi` from the ring headed by `kind`. `last` means it is
    /// the only member.
    fn pop_block(&mut self, bi: i64, kind: BlockKind, last: bool) {
        if last {
            self.set_head(kind, 0);
        } else {
            let b = bi as usize;
            let (prev, next) = (self.blocks[b].prev, self.blocks[b].next);
            self.blocks[prev as usize].next = next;
            self.blocks[next as usize].prev = prev;
            if bi == self.head(kind) {
                self.set_head(kind, next);
            }
        }
    }

    /// Insert block `bi` into the ring headed by `kind`, at the tail so the
    /// most recently pushed block is visited last. `empty` means the target
    /// ring has no members yet.
    pub(crate) fn push_block(&mut self, bi: i64, kind: BlockKind, empty: bool) {
        let b = bi as usize;
        if empty {
            self.blocks[b].prev = bi;
            self.blocks[b].next = bi;
            self.set_head(kind, bi);
        } else {
            let head = self.head(kind);
            let tail = self.blocks[head as usize].prev;
            self.blocks[b].prev = tail;
            self.blocks[b].next = head;
            self.blocks[tail as usize].next = bi;
            self.blocks[head as usize].prev = bi;
            self.set_head(kind, bi);
        }
    }

    /// Move block `bi` between state rings
    pub(crate) fn transfer_block(&mut self, bi: i64, from: BlockKind, to: BlockKind) {
        let last = bi == self.blocks[bi as usize].next;
        self.pop_block(bi, from, last);
        let empty = self.head(to) == 0 && self.blocks[bi as usize].num != 0;
        self.push_block(bi, to, empty);
    }

    /// Take an empty slot for the child of `from` under `label`. With
    /// `base < 0` (parent has no children yet) a slot is found through the
    /// block rings and the parent's new base is published.
    pub(crate) fn pop_enode(&mut self, base: i64, label: u8, from: i64) -> i64 {
        let e = if base < 0 {
            self.find_place()
        } else {
            base ^ i64::from(label)
        };
        let bi = (e >> 8) as usize;
        let eu = e as usize;
        self.blocks[bi].num -= 1;
        if self.blocks[bi].num == 0 {
            if bi != 0 {
                self.transfer_block(bi as i64, BlockKind::Closed, BlockKind::Full);
            }
        } else {
            // splice the slot out of its block's empty ring
            let n = self.array[eu];
            self.array[(-n.data) as usize].check = n.check;
            self.array[(-n.check) as usize].data = n.data;
            if e == self.blocks[bi].ehead {
                self.blocks[bi].ehead = -n.check;
            }
            if bi != 0
                && self.blocks[bi].num == 1
                && self.blocks[bi].trial != self.config.max_trial
            {
                self.transfer_block(bi as i64, BlockKind::Open, BlockKind::Closed);
            }
        }
        self.array[eu].data = if M::REDUCED {
            VALUE_LIMIT
        } else if label != 0 {
            -1
        } else {
            0
        };
        self.array[eu].check = from;
        if base < 0 {
            self.array[from as usize].data = M::encode_base(e ^ i64::from(label));
        }
        e
    }

    /// Return slot `e` to its block's empty ring, driving the block-state
    /// transitions and refreshing the block's reject bound.
    pub(crate) fn push_enode(&mut self, e: i64) {
        let bi = (e >> 8) as usize;
        let eu = e as usize;
        self.blocks[bi].num += 1;
        if self.blocks[bi].num == 1 {
            self.blocks[bi].ehead = e;
            self.array[eu] = Node::new(-e, -e);
            if bi != 0 {
                self.transfer_block(bi as i64, BlockKind::Full, BlockKind::Closed);
            }
        } else {
            let prev = self.blocks[bi].ehead;
            let next = -self.array[prev as usize].check;
            self.array[eu] = Node::new(-prev, -next);
            self.array[prev as usize].check = -e;
            self.array[next as usize].data = -e;
            if (self.blocks[bi].num == 2 || self.blocks[bi].trial == self.config.max_trial)
                && bi != 0
            {
                self.transfer_block(bi as i64, BlockKind::Closed, BlockKind::Open);
            }
            self.blocks[bi].trial = 0;
        }
        let num = self.blocks[bi].num as usize;
        if self.blocks[bi].reject < self.reject[num] {
            self.blocks[bi].reject = self.reject[num];
        }
        self.ninfo[eu] = NodeInfo::default();
    }

    /// Pick a slot for a single new edge: any Closed block first, then any
    /// Open block, else a fresh block.
    pub(crate) fn find_place(&mut self) -> i64 {
        let closed = self.head(BlockKind::Closed);
        if closed != 0 {
            return self.blocks[closed as usize].ehead;
        }
        let open = self.head(BlockKind::Open);
        if open != 0 {
            return self.blocks[open as usize].ehead;
        }
        self.add_block() << 8
    }

    /// Pick a slot for the first label of a child group so the whole group
    /// fits free slots under XOR addressing. Walks the Open ring, skipping
    /// blocks whose empty count or reject bound rules them out; failed
    /// blocks accumulate trials and may be demoted to Closed.
    pub(crate) fn find_place_range(&mut self, labels: &[u8]) -> i64 {
        let mut bi = self.head(BlockKind::Open);
        if bi != 0 {
            let bz = self.blocks[bi as usize].prev;
            let nc = labels.len() as i16;
            loop {
                let b = self.blocks[bi as usize];
                if b.num >= nc && nc < b.reject {
                    let mut e = b.ehead;
                    loop {
                        let base = e ^ i64::from(labels[0]);
                        let fits = labels[1..]
                            .iter()
                            .all(|&l| self.array[(base ^ i64::from(l)) as usize].check < 0);
                        if fits {
                            self.blocks[bi as usize].ehead = e;
                            return e;
                        }
                        e = -self.array[e as usize].check;
                        if e == b.ehead {
                            break;
                        }
                    }
                }
                self.blocks[bi as usize].reject = nc;
                let num = self.blocks[bi as usize].num as usize;
                if nc < self.reject[num] {
                    self.reject[num] = nc;
                }
                let next = self.blocks[bi as usize].next;
                self.blocks[bi as usize].trial += 1;
                if self.blocks[bi as usize].trial == self.config.max_trial {
                    self.transfer_block(bi, BlockKind::Open, BlockKind::Closed);
                }
                if bi == bz {
                    break;
                }
                bi = next;
            }
        }
        self.add_block() << 8
    }

    /// Append a fresh 256-slot block, growing the arrays if needed, and put
    /// it on the Open ring.
    pub(crate) fn add_block(&mut self) -> i64 {
        if self.size == self.capacity {
            self.grow_capacity();
        }
        let bi = self.size >> 8;
        let s = self.size as i64;
        self.blocks[bi].ehead = s;
        self.array[self.size] = Node::new(-(s + 255), -(s + 1));
        for i in self.size + 1..self.size + 255 {
            self.array[i] = Node::new(-(i as i64 - 1), -(i as i64 + 1));
        }
        self.array[self.size + 255] = Node::new(-(s + 254), -s);
        let empty = self.head(BlockKind::Open) == 0;
        self.push_block(bi as i64, BlockKind::Open, empty);
        self.size += 256;
        (self.size as i64 >> 8) - 1
    }

    fn footprint(capacity: usize) -> usize {
        capacity * (std::mem::size_of::<Node>() + std::mem::size_of::<NodeInfo>())
            + (capacity >> 8) * std::mem::size_of::<Block>()
    }

    /// Double the capacity, or with a configured cap step by 256-slot blocks
    /// up to the largest footprint under it.
    ///
    /// # Panics
    ///
    /// Panics when the cap leaves no room for even one more block.
    fn grow_capacity(&mut self) {
        let old = self.capacity;
        let mut capacity = self.capacity * 2;
        if self.config.max_alloc > 0 && Self::footprint(capacity) > self.config.max_alloc {
            capacity = self.size;
            while Self::footprint(capacity + 256) <= self.config.max_alloc {
                capacity += 256;
            }
            if capacity <= self.size {
                panic!(
                    "dartrie: memory cap of {} bytes leaves no room to grow past {} slots",
                    self.config.max_alloc, self.size
                );
            }
        }
        log::debug!("growing arrays from {} to {} slots", old, capacity);
        self.capacity = capacity;
        self.array.resize(capacity, Node::default());
        self.ninfo.resize(capacity, NodeInfo::default());
        self.blocks.resize(capacity >> 8, Block::new());
    }
}

#[cfg(test)]
mod tests {
    use super::super::da::TrieConfig;
    use super::*;

    #[test]
    fn test_growth_doubles() {
        let mut trie = DoubleArrayTrie::<i32>::new();
        assert_eq!(trie.capacity(), 256);
        // force allocations past the first block
        for i in 0..64 {
            let key = format!("growing_key_number_{:04}", i);
            trie.update(key.as_bytes(), i);
        }
        assert!(trie.capacity() >= 512);
        assert_eq!(trie.capacity() % 256, 0);
        trie.validate().unwrap();
    }

    #[test]
    #[should_panic(expected = "memory cap")]
    fn test_memory_cap_exhaustion_panics() {
        let mut trie = DoubleArrayTrie::<i32>::with_config(TrieConfig {
            // just above the footprint of the initial block
            max_alloc: 8 * 1024,
            ..Default::default()
        });
        for i in 0..10_000 {
            let key = format!("key_{:08}", i);
            trie.update(key.as_bytes(), i);
        }
    }

    #[test]
    fn test_growth_under_memory_cap() {
        let mut trie = DoubleArrayTrie::<i32>::with_config(TrieConfig {
            max_alloc: 64 * 1024,
            ..Default::default()
        });
        // fits comfortably under the cap but needs growth past 256 slots
        for i in 0..40 {
            let key = format!("capped_{:03}", i);
            trie.update(key.as_bytes(), i);
        }
        assert!(trie.capacity() > 256);
        let footprint = trie.capacity() * 18 + (trie.capacity() >> 8) * 32;
        assert!(footprint <= 64 * 1024);
        for i in 0..40 {
            let key = format!("capped_{:03}", i);
            assert_eq!(trie.exact_match_search(key.as_bytes()), Some(i));
        }
    }

    #[test]
    fn test_block_rings_after_heavy_churn() {
        let mut trie = DoubleArrayTrie::<i32>::new();
        for i in 0..500 {
            let key = format!("churn_{:05}", i);
            trie.update(key.as_bytes(), i);
        }
        for i in (0..500).step_by(2) {
            let key = format!("churn_{:05}", i);
            assert!(trie.erase(key.as_bytes()));
        }
        for i in 0..500 {
            let key = format!("churn_{:05}", i);
            let expect = if i % 2 == 0 { None } else { Some(i) };
            assert_eq!(trie.exact_match_search(key.as_bytes()), expect);
        }
        trie.validate().unwrap();
    }
}
