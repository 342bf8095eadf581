//! Double-array trie implementation
//!
//! The module is split by concern: node records and the value/variant
//! abstractions at the bottom, the slot allocator and block-state machine
//! above them, then the trie itself with its search, enumeration, and
//! persistence surfaces, and finally the read-only snapshot view.

mod alloc;
mod da;
mod iter;
mod node;
mod persist;
mod search;
mod value;
mod variant;
mod view;

pub use da::{DoubleArrayTrie, TrieConfig, ValueMut};
pub use iter::{Keys, Predict, Prediction};
pub use node::{Node, NODE_BYTES};
pub use search::{CommonPrefix, Match, TraverseResult};
pub use value::TrieValue;
pub use variant::{MinimalPrefix, Reduced, Standard, Variant};
pub use view::TrieView;
