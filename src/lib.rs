//! # seqtree
//!
//! An online suffix-tree index for sequences over small alphabets, built
//! with Ukkonen's linear-time algorithm. Aimed at bioinformatics-scale
//! inputs: hundreds of thousands to tens of millions of symbols over an
//! alphabet like {A, C, G, T, N} plus a terminator.
//!
//! ## Design
//!
//! Two pieces carry the load:
//!
//! - The **engine** ([`SuffixTree`]) extends an implicit suffix tree one
//!   symbol at a time, maintaining suffix links and the classic tricks
//!   (open leaf edges, skipped known-leaf extensions, skip/count descent)
//!   that make total construction O(n).
//! - The **edge map** ([`TwoKeyMap`]) stores every parent-to-child edge of
//!   the whole tree in one open-addressed table keyed by (parent, first
//!   edge symbol). Buckets are sized to the alphabet, so one parent's
//!   edges share a cache line and hash-table overhead is amortized across
//!   millions of nodes instead of paid per node.
//!
//! Nodes live in a flat arena and reference each other by index; see
//! [`node`] for the record layout.
//!
//! ## Example
//!
//! ```rust
//! use seqtree::{Nucleotides, SuffixTree};
//!
//! let mut tree = SuffixTree::new(Nucleotides);
//! tree.append(b"GATTACA").unwrap();
//! tree.terminate().unwrap();
//!
//! assert_eq!(tree.size(), 7);
//! // Primitive child lookup from any node:
//! let g = tree.child(tree.root(), b'G').unwrap();
//! assert!(tree.node(g).is_leaf());
//! ```
//!
//! ## Logging
//!
//! Construction emits `tracing` events (phase/extension/rule at trace
//! level, map growth at debug level) when built with the `tracing`
//! feature; without it the call sites compile to nothing.

pub mod alphabet;
mod dot;
pub mod node;
mod tracing_helpers;
pub mod tree;
pub mod twokey;

pub use alphabet::{Alphabet, Nucleotides};
pub use node::{Node, NodeId};
pub use tree::{SuffixTree, TreeError};
pub use twokey::TwoKeyMap;
