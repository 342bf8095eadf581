//! Dynamically-updatable double-array trie
//!
//! The trie is a single logical array of nodes addressed by XOR: the child of
//! node `p` under label `l` lives at `base(p) ^ l` and confirms its parentage
//! via `check`. Keys are byte strings excluding the zero byte (reserved for
//! the terminal edge) and the empty key. Insertion and deletion are
//! incremental: label conflicts are resolved by relocating the smaller of
//! the two colliding child sets into a fresh address stripe, found through
//! per-block free-slot rings.

use std::marker::PhantomData;

use crate::traits::{StatisticsProvider, TrieStats};

use super::node::{Block, Node, NodeInfo, NODE_BYTES};
use super::search::{
    self, count_keys, count_nonzero, CommonPrefix, FindOutcome, NodeRead, TraverseResult,
};
use super::value::TrieValue;
use super::variant::{Standard, Variant, VALUE_LIMIT};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for a [`DoubleArrayTrie`]
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrieConfig {
    /// Keep sibling rings sorted by label, making enumeration lexicographic
    pub ordered: bool,
    /// Placement failures before a block is demoted from Open to Closed
    pub max_trial: i32,
    /// Byte cap for the three arrays combined; 0 disables the cap
    pub max_alloc: usize,
}

impl Default for TrieConfig {
    fn default() -> Self {
        Self {
            ordered: true,
            max_trial: 1,
            max_alloc: 0,
        }
    }
}

/// The three block states; each state keeps its members on one ring.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BlockKind {
    Full = 0,
    Closed = 1,
    Open = 2,
}

/// An in-memory, dynamically-updatable double-array trie mapping byte-string
/// keys to fixed-width values.
///
/// `V` is the value type, `M` the shape variant ([`Standard`] or
/// [`Reduced`](crate::Reduced)), chosen at construction.
///
/// Keys must be non-empty and must not contain the zero byte; inserting an
/// empty key panics, and keys with embedded zero bytes are unsupported
/// (checked in debug builds only).
///
/// # Examples
///
/// ```rust
/// use dartrie::DoubleArrayTrie;
///
/// let mut trie = DoubleArrayTrie::<i32>::new();
/// trie.update(b"apple", 10);
/// trie.update(b"app", 20);
/// assert_eq!(trie.exact_match_search(b"apple"), Some(10));
/// assert_eq!(trie.exact_match_search(b"ap"), None);
/// assert_eq!(trie.num_keys(), 2);
/// ```
pub struct DoubleArrayTrie<V: TrieValue = i32, M: Variant = Standard> {
    pub(crate) array: Vec<Node>,
    /// Empty after a plain snapshot load, until `restore` rebuilds it
    pub(crate) ninfo: Vec<NodeInfo>,
    /// Empty after a plain snapshot load, until `restore` rebuilds it
    pub(crate) blocks: Vec<Block>,
    /// Ring heads, indexed by `BlockKind`; 0 means the ring is empty
    pub(crate) bhead: [i64; 3],
    pub(crate) size: usize,
    pub(crate) capacity: usize,
    /// Monotone lower bounds on child-group sizes rejected per empty count
    pub(crate) reject: [i16; 257],
    pub(crate) tracking: Vec<usize>,
    pub(crate) config: TrieConfig,
    pub(crate) _marker: PhantomData<(V, M)>,
}

/// Write handle to a stored value, returned by
/// [`update`](DoubleArrayTrie::update) so callers may overwrite the merged
/// result.
pub struct ValueMut<'a, V: TrieValue> {
    pub(crate) word: &'a mut i64,
    pub(crate) _marker: PhantomData<V>,
}

impl<'a, V: TrieValue> ValueMut<'a, V> {
    /// Read the stored value
    pub fn get(&self) -> V {
        V::from_word(*self.word)
    }

    /// Overwrite the stored value
    pub fn set(&mut self, value: V) {
        *self.word = value.to_word();
    }
}

impl<V: TrieValue, M: Variant> DoubleArrayTrie<V, M> {
    /// Create a new empty trie with the default configuration
    pub fn new() -> Self {
        Self::with_config(TrieConfig::default())
    }

    /// Create a new empty trie with a custom configuration
    pub fn with_config(config: TrieConfig) -> Self {
        let mut trie = Self {
            array: Vec::new(),
            ninfo: Vec::new(),
            blocks: Vec::new(),
            bhead: [0; 3],
            size: 0,
            capacity: 0,
            reject: [0; 257],
            tracking: Vec::new(),
            config,
            _marker: PhantomData,
        };
        trie.initialize();
        trie
    }

    /// Lay out the special first block: slot 0 is the root, slots 1..=255
    /// form the initial empty ring.
    pub(crate) fn initialize(&mut self) {
        self.array = vec![Node::default(); 256];
        self.ninfo = vec![NodeInfo::default(); 256];
        self.blocks = vec![Block::new()];
        self.array[0] = if M::REDUCED {
            Node::new(-1, -1)
        } else {
            Node::new(0, -1)
        };
        for i in 1..256i64 {
            let prev = if i == 1 { -255 } else { -(i - 1) };
            let next = if i == 255 { -1 } else { -(i + 1) };
            self.array[i as usize] = Node::new(prev, next);
        }
        self.blocks[0].ehead = 1;
        self.bhead = [0; 3];
        self.capacity = 256;
        self.size = 256;
        for i in 0..257 {
            self.reject[i] = i as i16 + 1;
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &TrieConfig {
        &self.config
    }

    /// Number of allocated node slots
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of node slots in use (occupied plus freed-but-reserved)
    pub fn size(&self) -> usize {
        self.size
    }

    /// Bytes occupied by the node array in a snapshot
    pub fn total_size(&self) -> usize {
        self.size * NODE_BYTES
    }

    /// Bytes per node record
    pub fn unit_size(&self) -> usize {
        NODE_BYTES
    }

    /// Number of occupied node slots
    pub fn nonzero_size(&self) -> usize {
        count_nonzero(self)
    }

    /// Number of keys stored in the trie
    pub fn num_keys(&self) -> usize {
        count_keys::<M, _>(self)
    }

    /// Set the byte cap for the arrays; 0 disables the cap.
    ///
    /// When the cap is too low for a required growth step, the growing
    /// mutation panics (the trie never silently corrupts).
    pub fn set_max_alloc(&mut self, bytes: usize) {
        self.config.max_alloc = bytes;
    }

    /// Register a node id to be kept up to date across relocations
    pub fn track_node(&mut self, id: usize) {
        self.tracking.push(id);
    }

    /// Currently tracked node ids
    pub fn tracked_nodes(&self) -> &[usize] {
        &self.tracking
    }

    /// Drop all tracked node ids
    pub fn clear_tracked(&mut self) {
        self.tracking.clear();
    }

    /// The node records of the trie, `0..size()`
    pub fn nodes(&self) -> &[Node] {
        &self.array[..self.size]
    }

    /// Reinitialize to an empty trie, keeping the configuration
    pub fn clear(&mut self) {
        self.tracking.clear();
        self.initialize();
    }

    /// Look up `key` and return its value, if stored.
    ///
    /// A key that is present only as a prefix of other keys (no value) and a
    /// key that is absent both return `None`; use
    /// [`traverse`](Self::traverse) to tell them apart.
    pub fn exact_match_search(&self, key: &[u8]) -> Option<V> {
        search::exact_match::<V, M, _>(self, key, 0)
    }

    /// Look up `key` as a suffix under node `from`
    pub fn exact_match_search_from(&self, key: &[u8], from: usize) -> Option<V> {
        search::exact_match::<V, M, _>(self, key, from)
    }

    /// Iterate the values stored at successive prefixes of `key`, in
    /// increasing prefix-length order.
    pub fn common_prefix_search<'a>(
        &'a self,
        key: &'a [u8],
    ) -> CommonPrefix<'a, Self, V, M> {
        CommonPrefix::new(self, key, 0)
    }

    /// Like [`common_prefix_search`](Self::common_prefix_search), starting
    /// from node `from`
    pub fn common_prefix_search_from<'a>(
        &'a self,
        key: &'a [u8],
        from: usize,
    ) -> CommonPrefix<'a, Self, V, M> {
        CommonPrefix::new(self, key, from)
    }

    /// Walk `key[*pos..]` from node `*from`, advancing both cursors, and
    /// report what the walk reached. Resume a partial walk by passing the
    /// cursors back in.
    pub fn traverse(&self, key: &[u8], from: &mut usize, pos: &mut usize) -> TraverseResult<V> {
        match search::find::<M, _>(self, key, from, pos, key.len()) {
            FindOutcome::Word(word) => TraverseResult::Found(V::from_word(word)),
            FindOutcome::NoValue => TraverseResult::NoValue,
            FindOutcome::NoPath => TraverseResult::NoPath,
        }
    }

    /// Insert `key` if absent and merge `val` into its value.
    ///
    /// Returns a write handle so the merged value can be overwritten.
    ///
    /// # Panics
    ///
    /// Panics when `key` is empty, or when a configured memory cap leaves no
    /// room to grow.
    pub fn update(&mut self, key: &[u8], val: V) -> ValueMut<'_, V> {
        let mut from = 0;
        let mut pos = 0;
        self.update_with(key, &mut from, &mut pos, val, &mut |_: usize, _: usize| {})
    }

    /// Like [`update`](Self::update), resuming from the `from`/`pos` cursors
    /// and reporting every slot relocation to `cf(old, new)`.
    ///
    /// The callback is invoked exactly once per migrated slot during
    /// conflict resolution, and never for the slot of the edge being added.
    /// It must not touch the trie.
    pub fn update_with<F>(
        &mut self,
        key: &[u8],
        from: &mut usize,
        pos: &mut usize,
        val: V,
        cf: &mut F,
    ) -> ValueMut<'_, V>
    where
        F: FnMut(usize, usize),
    {
        if key.is_empty() && *from == 0 {
            panic!("dartrie: cannot insert a zero-length key");
        }
        debug_assert!(
            !key[*pos..].contains(&0),
            "keys must not contain the zero byte"
        );
        self.ensure_restored();
        while *pos < key.len() {
            if M::REDUCED {
                let word = self.array[*from].data;
                if word >= 0 && word != VALUE_LIMIT {
                    // leaf becomes interior: move its value to a terminal child
                    let to = self.follow(from, 0, cf) as usize;
                    self.array[to].data = word;
                }
            }
            let label = key[*pos];
            *from = self.follow(from, label, cf) as usize;
            *pos += 1;
        }
        let to = if M::REDUCED && self.array[*from].data >= 0 {
            *from
        } else {
            self.follow(from, 0, cf) as usize
        };
        if M::REDUCED && self.array[to].data == VALUE_LIMIT {
            self.array[to].data = 0;
        }
        let merged = V::from_word(self.array[to].data).merge(val);
        self.array[to].data = merged.to_word();
        ValueMut {
            word: &mut self.array[to].data,
            _marker: PhantomData,
        }
    }

    /// Bulk-insert unsorted keys. Values default to the key index when no
    /// value slice is given.
    ///
    /// # Panics
    ///
    /// Panics when `values` is shorter than `keys`.
    pub fn build<K: AsRef<[u8]>>(&mut self, keys: &[K], values: Option<&[V]>) {
        for (i, key) in keys.iter().enumerate() {
            let val = match values {
                Some(vs) => vs[i],
                None => V::from_index(i),
            };
            self.update(key.as_ref(), val);
        }
    }

    /// Remove `key` from the trie. Returns `false` when the key is absent.
    ///
    /// Freed slots return to their block's empty ring; the trie is never
    /// compacted.
    pub fn erase(&mut self, key: &[u8]) -> bool {
        self.erase_from(key, 0)
    }

    /// Remove the key that is `key` read as a suffix under node `from`
    pub fn erase_from(&mut self, key: &[u8], mut from: usize) -> bool {
        self.ensure_restored();
        let mut pos = 0;
        match search::find::<M, _>(self, key, &mut from, &mut pos, key.len()) {
            FindOutcome::Word(_) => {
                self.erase_node(from);
                true
            }
            _ => false,
        }
    }

    /// Unlink the value below `from` and release now-valueless ancestors.
    fn erase_node(&mut self, mut from: usize) {
        let mut e = if M::REDUCED && self.array[from].data >= 0 {
            from as i64
        } else {
            M::decode_base(self.array[from].data)
        };
        if M::REDUCED {
            from = self.array[e as usize].check as usize;
        }
        loop {
            let base = M::decode_base(self.array[from].data);
            let first = self.ninfo[from].child;
            let has_sibling = self.ninfo[(base ^ i64::from(first)) as usize].sibling != 0;
            if has_sibling {
                let label = (base ^ e) as u8;
                self.pop_sibling(from, base, label);
            }
            self.push_enode(e);
            e = from as i64;
            from = self.array[from].check as usize;
            if has_sibling {
                break;
            }
        }
    }

    /// Restore ninfo/block bookkeeping if a plain snapshot load left it out
    pub(crate) fn ensure_restored(&mut self) {
        if self.ninfo.is_empty() || self.blocks.is_empty() {
            self.restore();
        }
    }

    /// Follow the edge labeled `label` out of `*from`, creating it if
    /// needed. `*from` is rebound if conflict resolution relocates it.
    pub(crate) fn follow<F: FnMut(usize, usize)>(
        &mut self,
        from: &mut usize,
        label: u8,
        cf: &mut F,
    ) -> i64 {
        let base = M::decode_base(self.array[*from].data);
        let mut to = base ^ i64::from(label);
        if base < 0 || self.array[to as usize].check < 0 {
            to = self.pop_enode(base, label, *from as i64);
            self.push_sibling(*from, to ^ i64::from(label), label, base >= 0);
        } else if self.array[to as usize].check != *from as i64 {
            to = self.resolve(from, base, label, cf);
        }
        to
    }

    /// Resolve the conflict `base ^ label` being owned by another parent.
    ///
    /// The parent with fewer children is relocated: its full child-label set
    /// (plus the new label, if the newcomer side moves) is placed in a fresh
    /// stripe, children are migrated slot by slot, and grandchildren are
    /// re-parented. Returns the slot of the new edge.
    fn resolve<F: FnMut(usize, usize)>(
        &mut self,
        from_n: &mut usize,
        base_n: i64,
        label_n: u8,
        cf: &mut F,
    ) -> i64 {
        let to_pn = base_n ^ i64::from(label_n);
        let from_p = self.array[to_pn as usize].check as usize;
        let base_p = M::decode_base(self.array[from_p].data);

        // whichever sibling chain exhausts first moves fewer nodes
        let flag = self.consult(
            base_n,
            base_p,
            self.ninfo[*from_n].child,
            self.ninfo[from_p].child,
        );
        let labels = if flag {
            self.child_labels(base_n, self.ninfo[*from_n].child, Some(label_n))
        } else {
            self.child_labels(base_p, self.ninfo[from_p].child, None)
        };
        let place = if labels.len() == 1 {
            self.find_place()
        } else {
            self.find_place_range(&labels)
        };
        let base = place ^ i64::from(labels[0]);

        let from = if flag { *from_n } else { from_p };
        let base_old = if flag { base_n } else { base_p };
        if flag && labels[0] == label_n {
            self.ninfo[from].child = label_n;
        }
        self.array[from].data = M::encode_base(base);

        for (i, &label) in labels.iter().enumerate() {
            let to = self.pop_enode(base, label, from as i64);
            let to_ = base_old ^ i64::from(label);
            self.ninfo[to as usize].sibling = if i + 1 == labels.len() {
                0
            } else {
                labels[i + 1]
            };
            if flag && to_ == to_pn {
                continue; // the newcomer slot was freshly allocated above
            }
            cf(to_ as usize, to as usize);
            let word = self.array[to_ as usize].data;
            self.array[to as usize].data = word;
            let has_children = if M::REDUCED { word < 0 } else { word > 0 };
            if has_children && label != 0 {
                let mut c = self.ninfo[to_ as usize].child;
                self.ninfo[to as usize].child = c;
                let moved_base = M::decode_base(word);
                loop {
                    let grandchild = (moved_base ^ i64::from(c)) as usize;
                    self.array[grandchild].check = to;
                    c = self.ninfo[grandchild].sibling;
                    if c == 0 {
                        break;
                    }
                }
            }
            if !flag && to_ == *from_n as i64 {
                // the newcomer's own parent was among the migrated children
                *from_n = to as usize;
            }
            if !flag && to_ == to_pn {
                // the contested slot is immediately reused for the newcomer
                self.push_sibling(*from_n, to_pn ^ i64::from(label_n), label_n, true);
                self.ninfo[to_ as usize].child = 0;
                self.array[to_ as usize].data = if M::REDUCED {
                    VALUE_LIMIT
                } else if label_n != 0 {
                    -1
                } else {
                    0
                };
                self.array[to_ as usize].check = *from_n as i64;
            } else {
                self.push_enode(to_);
            }
            for tracked in &mut self.tracking {
                if *tracked == to_ as usize {
                    *tracked = to as usize;
                }
            }
        }
        if flag {
            base ^ i64::from(label_n)
        } else {
            to_pn
        }
    }

    /// Compare two sibling chains in lockstep; true if the chain under
    /// `base_n` exhausts first (the newcomer side moves).
    fn consult(&self, base_n: i64, base_p: i64, mut c_n: u8, mut c_p: u8) -> bool {
        loop {
            c_n = self.ninfo[(base_n ^ i64::from(c_n)) as usize].sibling;
            c_p = self.ninfo[(base_p ^ i64::from(c_p)) as usize].sibling;
            if c_n == 0 || c_p == 0 {
                break;
            }
        }
        c_p != 0
    }

    /// Materialize the child-label set under `base`, merging in `extra` at
    /// its sorted position (or right after the terminal label if unordered).
    fn child_labels(&self, base: i64, mut c: u8, extra: Option<u8>) -> Vec<u8> {
        let mut labels = Vec::with_capacity(257);
        if c == 0 {
            labels.push(0);
            c = self.ninfo[base as usize].sibling;
        }
        if self.config.ordered {
            if let Some(label) = extra {
                while c != 0 && c < label {
                    labels.push(c);
                    c = self.ninfo[(base ^ i64::from(c)) as usize].sibling;
                }
            }
        }
        if let Some(label) = extra {
            labels.push(label);
        }
        while c != 0 {
            labels.push(c);
            c = self.ninfo[(base ^ i64::from(c)) as usize].sibling;
        }
        labels
    }

    /// Splice `label` into `from`'s sibling chain. With `walk` set the chain
    /// is walked past smaller labels first (keeping it sorted when ordered);
    /// otherwise the label becomes the new chain head.
    pub(crate) fn push_sibling(&mut self, from: usize, base: i64, label: u8, walk: bool) {
        let mut at_child = true;
        let mut slot = from;
        let mut c = self.ninfo[from].child;
        if walk && (if self.config.ordered { label > c } else { c == 0 }) {
            loop {
                slot = (base ^ i64::from(c)) as usize;
                at_child = false;
                c = self.ninfo[slot].sibling;
                if !(self.config.ordered && c != 0 && c < label) {
                    break;
                }
            }
        }
        self.ninfo[(base ^ i64::from(label)) as usize].sibling = c;
        if at_child {
            self.ninfo[slot].child = label;
        } else {
            self.ninfo[slot].sibling = label;
        }
    }

    /// Bypass `label` in `from`'s sibling chain
    pub(crate) fn pop_sibling(&mut self, from: usize, base: i64, label: u8) {
        let mut at_child = true;
        let mut slot = from;
        let mut c = self.ninfo[from].child;
        while c != label {
            slot = (base ^ i64::from(c)) as usize;
            at_child = false;
            c = self.ninfo[slot].sibling;
        }
        let next = self.ninfo[(base ^ i64::from(label)) as usize].sibling;
        if at_child {
            self.ninfo[slot].child = next;
        } else {
            self.ninfo[slot].sibling = next;
        }
    }

    /// Check the structural invariants, returning the first violation found.
    ///
    /// Covers XOR parent addressing, sibling-chain completeness and order,
    /// empty-ring closure, and block-state ring membership. Bookkeeping that
    /// a plain snapshot load leaves unrestored is skipped.
    pub fn validate(&self) -> crate::Result<()> {
        use crate::error::TrieError;

        for to in 1..self.size {
            let check = self.array[to].check;
            if check < 0 {
                continue;
            }
            let parent = check as usize;
            if parent >= self.size {
                return Err(TrieError::corrupt(format!(
                    "check[{}] = {} is out of range",
                    to, parent
                )));
            }
            let label = M::decode_base(self.array[parent].data) ^ to as i64;
            if !(0..256).contains(&label) {
                return Err(TrieError::corrupt(format!(
                    "slot {} is not XOR-addressable from its parent {}",
                    to, parent
                )));
            }
        }

        if !self.ninfo.is_empty() {
            self.validate_sibling_chains()?;
        }
        if !self.blocks.is_empty() {
            self.validate_blocks()?;
        }
        Ok(())
    }

    fn validate_sibling_chains(&self) -> crate::Result<()> {
        use crate::error::TrieError;

        for p in 0..self.size {
            if p != 0 {
                let check = self.array[p].check;
                if check < 0 {
                    continue;
                }
                // skip value slots and embedded leaves; they have no chain
                if M::REDUCED && self.array[p].data >= 0 {
                    continue;
                }
                let parent = check as usize;
                if !M::REDUCED && M::decode_base(self.array[parent].data) == p as i64 {
                    continue;
                }
            }
            let base = M::decode_base(self.array[p].data);

            let mut expected = Vec::new();
            for label in 0..256i64 {
                let slot = (base ^ label) as usize;
                if slot < self.size && self.array[slot].check == p as i64 {
                    expected.push(label as u8);
                }
            }

            let mut chain = Vec::new();
            let mut c = self.ninfo[p].child;
            if c == 0 {
                let slot = base as usize;
                if slot < self.size && self.array[slot].check == p as i64 {
                    chain.push(0u8);
                }
                c = if slot < self.size {
                    self.ninfo[slot].sibling
                } else {
                    0
                };
            }
            while c != 0 {
                if chain.len() > 256 {
                    return Err(TrieError::corrupt(format!(
                        "sibling chain of node {} does not terminate",
                        p
                    )));
                }
                chain.push(c);
                let slot = (base ^ i64::from(c)) as usize;
                c = self.ninfo.get(slot).map_or(0, |i| i.sibling);
            }

            if self.config.ordered && !chain.windows(2).all(|w| w[0] < w[1]) {
                return Err(TrieError::corrupt(format!(
                    "sibling chain of node {} is not strictly increasing",
                    p
                )));
            }
            let mut sorted = chain.clone();
            sorted.sort_unstable();
            if sorted != expected {
                return Err(TrieError::corrupt(format!(
                    "sibling chain of node {} does not enumerate its children",
                    p
                )));
            }
        }
        Ok(())
    }

    fn validate_blocks(&self) -> crate::Result<()> {
        use crate::error::TrieError;

        let nblocks = self.size >> 8;
        let mut on_ring = vec![None; nblocks];
        for kind in [BlockKind::Full, BlockKind::Closed, BlockKind::Open] {
            let head = self.head(kind);
            if head == 0 {
                continue;
            }
            let mut bi = head;
            let mut steps = 0;
            loop {
                let b = bi as usize;
                if b == 0 || b >= nblocks || on_ring[b].is_some() || steps > nblocks {
                    return Err(TrieError::corrupt(format!(
                        "malformed {:?} block ring at block {}",
                        kind, bi
                    )));
                }
                on_ring[b] = Some(kind);
                steps += 1;
                bi = self.blocks[b].next;
                if bi == head {
                    break;
                }
            }
        }
        for bi in 1..nblocks {
            let b = &self.blocks[bi];
            let expect = if b.num == 0 {
                BlockKind::Full
            } else if b.num == 1 || b.trial == self.config.max_trial {
                BlockKind::Closed
            } else {
                BlockKind::Open
            };
            if on_ring[bi] != Some(expect) {
                return Err(TrieError::corrupt(format!(
                    "block {} (num {}, trial {}) is on ring {:?}, expected {:?}",
                    bi, b.num, b.trial, on_ring[bi], expect
                )));
            }
        }

        for bi in 0..nblocks {
            let lo = bi << 8;
            let empties = (lo..lo + 256)
                .filter(|&e| self.array[e].check < 0)
                .count();
            let num = self.blocks[bi].num as usize;
            // block 0 carries its root-slot bias from initialization
            let consistent = if bi == 0 {
                num == empties || num == empties + 1
            } else {
                num == empties
            };
            if !consistent {
                return Err(TrieError::corrupt(format!(
                    "block {} counts {} empties, ring holds {}",
                    bi, num, empties
                )));
            }
            if empties == 0 {
                continue;
            }
            let head = self.blocks[bi].ehead;
            let mut e = head;
            let mut visited = 0;
            loop {
                let eu = e as usize;
                if eu < lo || eu >= lo + 256 || self.array[eu].check >= 0 || visited > empties {
                    return Err(TrieError::corrupt(format!(
                        "empty ring of block {} is not closed within the block",
                        bi
                    )));
                }
                visited += 1;
                e = -self.array[eu].check;
                if e == head {
                    break;
                }
            }
            if visited != empties {
                return Err(TrieError::corrupt(format!(
                    "empty ring of block {} visits {} of {} empties",
                    bi, visited, empties
                )));
            }
        }
        Ok(())
    }
}

impl<V: TrieValue, M: Variant> NodeRead for DoubleArrayTrie<V, M> {
    fn data(&self, id: usize) -> i64 {
        self.array.get(id).map_or(0, |n| n.data)
    }

    fn check(&self, id: usize) -> i64 {
        self.array.get(id).map_or(-1, |n| n.check)
    }

    fn slots(&self) -> usize {
        self.size
    }
}

impl<V: TrieValue, M: Variant> StatisticsProvider for DoubleArrayTrie<V, M> {
    fn stats(&self) -> TrieStats {
        let memory_usage = self.capacity
            * (std::mem::size_of::<Node>() + std::mem::size_of::<NodeInfo>())
            + self.blocks.len() * std::mem::size_of::<Block>();
        let mut stats = TrieStats {
            num_keys: self.num_keys(),
            size: self.size,
            capacity: self.capacity,
            nonzero_size: self.nonzero_size(),
            memory_usage,
            bits_per_key: 0.0,
        };
        stats.calculate_bits_per_key();
        stats
    }
}

impl<V: TrieValue, M: Variant> Default for DoubleArrayTrie<V, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: TrieValue, M: Variant> std::fmt::Debug for DoubleArrayTrie<V, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DoubleArrayTrie")
            .field("size", &self.size)
            .field("capacity", &self.capacity)
            .field("restored", &!self.ninfo.is_empty())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::super::variant::Reduced;
    use super::*;

    #[test]
    fn test_empty_trie() {
        let trie = DoubleArrayTrie::<i32>::new();
        assert_eq!(trie.num_keys(), 0);
        assert_eq!(trie.size(), 256);
        assert_eq!(trie.capacity(), 256);
        assert_eq!(trie.exact_match_search(b"anything"), None);
        trie.validate().unwrap();
    }

    #[test]
    fn test_insert_and_find() {
        let mut trie = DoubleArrayTrie::<i32>::new();
        trie.update(b"a", 1);
        trie.update(b"ab", 2);
        trie.update(b"abc", 3);
        trie.update(b"b", 4);

        assert_eq!(trie.exact_match_search(b"a"), Some(1));
        assert_eq!(trie.exact_match_search(b"ab"), Some(2));
        assert_eq!(trie.exact_match_search(b"abc"), Some(3));
        assert_eq!(trie.exact_match_search(b"b"), Some(4));
        assert_eq!(trie.exact_match_search(b"c"), None);
        assert_eq!(trie.exact_match_search(b"abd"), None);
        assert_eq!(trie.num_keys(), 4);
        trie.validate().unwrap();
    }

    #[test]
    fn test_update_merges() {
        let mut trie = DoubleArrayTrie::<i32>::new();
        trie.update(b"key", 5);
        trie.update(b"key", 3);
        assert_eq!(trie.exact_match_search(b"key"), Some(8));
        // merging zero is the identity
        trie.update(b"key", 0);
        assert_eq!(trie.exact_match_search(b"key"), Some(8));
    }

    #[test]
    fn test_value_mut_overwrite() {
        let mut trie = DoubleArrayTrie::<i32>::new();
        let mut v = trie.update(b"key", 5);
        assert_eq!(v.get(), 5);
        v.set(42);
        assert_eq!(trie.exact_match_search(b"key"), Some(42));
    }

    #[test]
    #[should_panic(expected = "zero-length key")]
    fn test_empty_key_panics() {
        let mut trie = DoubleArrayTrie::<i32>::new();
        trie.update(b"", 1);
    }

    #[test]
    fn test_traverse_distinguishes_misses() {
        let mut trie = DoubleArrayTrie::<i32>::new();
        trie.update(b"abc", 7);

        let (mut from, mut pos) = (0, 0);
        assert_eq!(trie.traverse(b"ab", &mut from, &mut pos), TraverseResult::NoValue);
        // resume from the prefix node
        let (mut from2, mut pos2) = (from, 0);
        assert_eq!(
            trie.traverse(b"c", &mut from2, &mut pos2),
            TraverseResult::Found(7)
        );
        let (mut from3, mut pos3) = (0, 0);
        assert_eq!(trie.traverse(b"zz", &mut from3, &mut pos3), TraverseResult::NoPath);
    }

    #[test]
    fn test_common_prefix_search() {
        let mut trie = DoubleArrayTrie::<i32>::new();
        trie.update(b"a", 1);
        trie.update(b"ab", 2);
        trie.update(b"abc", 3);
        trie.update(b"b", 4);

        let matches: Vec<_> = trie.common_prefix_search(b"abcd").collect();
        assert_eq!(matches.len(), 3);
        assert_eq!(
            matches.iter().map(|m| (m.value, m.length)).collect::<Vec<_>>(),
            vec![(1, 1), (2, 2), (3, 3)]
        );
    }

    #[test]
    fn test_forced_conflicts() {
        let mut trie = DoubleArrayTrie::<i32>::new();
        let keys: [&[u8]; 5] = [b"ab", b"ac", b"axy", b"bcd", b"bce"];
        for (i, key) in keys.iter().enumerate() {
            trie.update(key, i as i32 + 1);
            trie.validate().unwrap();
        }
        for (i, key) in keys.iter().enumerate() {
            assert_eq!(trie.exact_match_search(key), Some(i as i32 + 1));
        }
        assert_eq!(trie.num_keys(), 5);
    }

    #[test]
    fn test_erase() {
        let mut trie = DoubleArrayTrie::<i32>::new();
        trie.update(b"aaa", 7);
        assert!(trie.erase(b"aaa"));
        assert_eq!(trie.exact_match_search(b"aaa"), None);
        assert_eq!(trie.num_keys(), 0);
        trie.validate().unwrap();

        trie.update(b"aaa", 9);
        assert_eq!(trie.exact_match_search(b"aaa"), Some(9));
        trie.validate().unwrap();

        assert!(!trie.erase(b"zzz"));
    }

    #[test]
    fn test_erase_keeps_shared_prefixes() {
        let mut trie = DoubleArrayTrie::<i32>::new();
        trie.update(b"share", 1);
        trie.update(b"shared", 2);
        trie.update(b"shard", 3);

        assert!(trie.erase(b"shared"));
        assert_eq!(trie.exact_match_search(b"share"), Some(1));
        assert_eq!(trie.exact_match_search(b"shard"), Some(3));
        assert_eq!(trie.exact_match_search(b"shared"), None);
        assert_eq!(trie.num_keys(), 2);
        trie.validate().unwrap();
    }

    #[test]
    fn test_erase_slots_are_reused() {
        let mut trie = DoubleArrayTrie::<i32>::new();
        for round in 0..50 {
            trie.update(b"transient", round);
            assert!(trie.erase(b"transient"));
        }
        // the trie never grew past the blocks the first round touched
        assert!(trie.size() <= 1024);
        trie.validate().unwrap();
    }

    #[test]
    fn test_build_with_default_values() {
        let mut trie = DoubleArrayTrie::<i32>::new();
        trie.build(&[b"one".as_ref(), b"two".as_ref(), b"three".as_ref()], None);
        assert_eq!(trie.exact_match_search(b"one"), Some(0));
        assert_eq!(trie.exact_match_search(b"two"), Some(1));
        assert_eq!(trie.exact_match_search(b"three"), Some(2));
    }

    #[test]
    fn test_clear() {
        let mut trie = DoubleArrayTrie::<i32>::new();
        trie.update(b"gone", 1);
        trie.clear();
        assert_eq!(trie.num_keys(), 0);
        assert_eq!(trie.size(), 256);
        trie.update(b"fresh", 2);
        assert_eq!(trie.exact_match_search(b"fresh"), Some(2));
        assert_eq!(trie.exact_match_search(b"gone"), None);
    }

    #[test]
    fn test_reduced_basic() {
        let mut trie = DoubleArrayTrie::<i32, Reduced>::new();
        trie.update(b"a", 1);
        trie.update(b"ab", 2);
        trie.update(b"abc", 3);
        trie.update(b"b", 4);

        assert_eq!(trie.exact_match_search(b"a"), Some(1));
        assert_eq!(trie.exact_match_search(b"ab"), Some(2));
        assert_eq!(trie.exact_match_search(b"abc"), Some(3));
        assert_eq!(trie.exact_match_search(b"b"), Some(4));
        assert_eq!(trie.exact_match_search(b"ac"), None);
        assert_eq!(trie.num_keys(), 4);
    }

    #[test]
    fn test_reduced_leaf_split() {
        let mut trie = DoubleArrayTrie::<i32, Reduced>::new();
        // leaf first, then extend through it so its value must move
        trie.update(b"car", 1);
        trie.update(b"carpet", 2);
        assert_eq!(trie.exact_match_search(b"car"), Some(1));
        assert_eq!(trie.exact_match_search(b"carpet"), Some(2));
        // a leaf reached mid-key is a dead end
        assert_eq!(trie.exact_match_search(b"carpets"), None);
    }

    #[test]
    fn test_reduced_erase() {
        let mut trie = DoubleArrayTrie::<i32, Reduced>::new();
        trie.update(b"x", 1);
        trie.update(b"xy", 2);
        assert!(trie.erase(b"x"));
        assert_eq!(trie.exact_match_search(b"x"), None);
        assert_eq!(trie.exact_match_search(b"xy"), Some(2));
        assert_eq!(trie.num_keys(), 1);
    }

    #[test]
    fn test_f32_values() {
        let mut trie = DoubleArrayTrie::<f32>::new();
        trie.update(b"pi", 3.0);
        trie.update(b"pi", 0.14159);
        let got = trie.exact_match_search(b"pi").unwrap();
        assert!((got - 3.14159).abs() < 1e-6);
    }

    #[test]
    fn test_u32_values() {
        let mut trie = DoubleArrayTrie::<u32>::new();
        trie.update(b"big", u32::MAX);
        assert_eq!(trie.exact_match_search(b"big"), Some(u32::MAX));
    }

    #[test]
    fn test_many_keys() {
        let mut trie = DoubleArrayTrie::<i32>::new();
        for i in 0..1000 {
            let key = format!("key_{:06}", i);
            trie.update(key.as_bytes(), i);
        }
        assert_eq!(trie.num_keys(), 1000);
        for i in 0..1000 {
            let key = format!("key_{:06}", i);
            assert_eq!(trie.exact_match_search(key.as_bytes()), Some(i));
        }
        assert_eq!(trie.exact_match_search(b"key_1000000"), None);
        trie.validate().unwrap();
    }

    #[test]
    fn test_unordered_config() {
        let mut trie = DoubleArrayTrie::<i32, Standard>::with_config(TrieConfig {
            ordered: false,
            ..Default::default()
        });
        for (i, key) in [b"zebra".as_ref(), b"apple".as_ref(), b"mango".as_ref()]
            .iter()
            .enumerate()
        {
            trie.update(key, i as i32);
        }
        assert_eq!(trie.exact_match_search(b"zebra"), Some(0));
        assert_eq!(trie.exact_match_search(b"apple"), Some(1));
        assert_eq!(trie.exact_match_search(b"mango"), Some(2));
        trie.validate().unwrap();
    }

    #[test]
    fn test_tracked_nodes_follow_relocation() {
        let mut trie = DoubleArrayTrie::<i32>::new();
        trie.update(b"ab", 1);
        let (mut from, mut pos) = (0usize, 0usize);
        assert!(matches!(
            trie.traverse(b"ab", &mut from, &mut pos),
            TraverseResult::Found(1)
        ));
        trie.track_node(from);
        for (i, key) in [b"ac".as_ref(), b"axy".as_ref(), b"bcd".as_ref(), b"bce".as_ref()]
            .iter()
            .enumerate()
        {
            trie.update(key, i as i32 + 2);
        }
        // wherever "ab"'s node went, the tracked id still resolves to it
        let node = trie.tracked_nodes()[0];
        assert_eq!(trie.exact_match_search_from(b"", node), Some(1));
    }

    #[test]
    fn test_stats() {
        let mut trie = DoubleArrayTrie::<i32>::new();
        trie.update(b"hello", 1);
        trie.update(b"world", 2);
        let stats = trie.stats();
        assert_eq!(stats.num_keys, 2);
        assert!(stats.memory_usage > 0);
        assert!(stats.bits_per_key > 0.0);
        assert!(stats.nonzero_size >= 12);
    }
}
