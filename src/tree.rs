//! Filepath: src/tree.rs
//!
//! Online suffix-tree construction with Ukkonen's algorithm.
//!
//! This module provides the main [`SuffixTree`] type. Symbols are appended
//! one at a time; after each append the tree is the implicit suffix tree of
//! everything appended so far, and [`terminate`](SuffixTree::terminate)
//! turns it into a true suffix tree by writing the alphabet's reserved
//! terminator everywhere an explicit extension is still needed.
//!
//! # Shape of the algorithm
//!
//! One appended symbol is one *phase*; within a phase, each still-implicit
//! suffix gets one *extension*. Three devices make the whole construction
//! linear in the input:
//!
//! - leaf edges have no stored end — a leaf's edge runs to the current end
//!   of the string, so rule-1 extensions cost nothing;
//! - extensions below `starting_extension` are skipped outright: those
//!   suffixes already end at leaves;
//! - the engine remembers where the previous extension ended (`last_end` +
//!   `last_end_offset`) and re-enters the tree through suffix links,
//!   descending by edge lengths (skip/count) instead of symbol by symbol.
//!
//! # Example
//!
//! ```rust
//! use seqtree::{Nucleotides, SuffixTree};
//!
//! let mut tree = SuffixTree::new(Nucleotides);
//! tree.append(b"TAA").unwrap();
//! tree.terminate().unwrap();
//!
//! assert_eq!(tree.size(), 3);
//! assert_eq!(tree.leaf_count(), 4); // TAA$, AA$, A$, $
//! ```

use std::fmt;

use crate::alphabet::Alphabet;
use crate::node::{Node, NodeArena, NodeId};
use crate::tracing_helpers::trace_log;
use crate::twokey::{IterK1, TwoKeyMap};

// ============================================================================
//  TreeError
// ============================================================================

/// Errors surfaced by [`SuffixTree::append`] and [`SuffixTree::terminate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeError {
    /// An input symbol converted to the alphabet's terminator. State up to
    /// the offending symbol is preserved.
    InvalidSymbol,

    /// `append` after `terminate`, or a second `terminate`. State unchanged.
    AlreadyTerminated,
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSymbol => write!(f, "input symbol equals the alphabet terminator"),

            Self::AlreadyTerminated => write!(f, "suffix tree is already terminated"),
        }
    }
}

impl std::error::Error for TreeError {}

// ============================================================================
//  SuffixTree
// ============================================================================

/// A suffix tree under online construction.
///
/// The tree owns the stored string, the node arena and the single
/// [`TwoKeyMap`] holding every parent-to-child edge. Repeated
/// [`append`](SuffixTree::append) calls index the concatenation of their
/// inputs; [`terminate`](SuffixTree::terminate) freezes the string.
///
/// Single-writer: no operation suspends, nothing here is thread-safe.
pub struct SuffixTree<A: Alphabet> {
    alphabet: A,

    /// The stored string S: every converted symbol, terminator last.
    text: Vec<A::Symbol>,

    arena: NodeArena,

    /// Every parent-to-child edge in the tree, keyed by
    /// `(parent, first symbol of the child's edge label)`.
    edges: TwoKeyMap<NodeId, A::Symbol, NodeId>,

    /// The symbol currently being written into the tree.
    element: A::Symbol,

    /// Zero-based index of the symbol being added; equals `text.len() - 1`
    /// from the first append onwards.
    phase: usize,

    /// Suffix index currently being extended within the phase.
    extension: usize,

    /// First extension the next phase must run; everything below it already
    /// ends at a leaf.
    starting_extension: usize,

    /// Leaf created by the very first symbol; termination re-enters the
    /// tree through it.
    leaf1: Option<NodeId>,

    /// Internal node at or above the end of the previous extension's
    /// suffix, with `last_end_offset` symbols below it along that path.
    last_end: NodeId,
    last_end_offset: usize,

    /// Internal node created by the previous extension, still waiting for
    /// its suffix link.
    new_internal_node: Option<NodeId>,

    terminated: bool,
}

impl<A: Alphabet> SuffixTree<A> {
    // ========================================================================
    //  Construction & accessors
    // ========================================================================

    /// Create an empty tree over `alphabet`.
    ///
    /// The alphabet size picks the bucket capacity of the edge map, so one
    /// parent's edges share a cache-resident bucket.
    #[must_use]
    pub fn new(alphabet: A) -> Self {
        let edges = TwoKeyMap::new(alphabet.size());
        // Inert sentinel; overwritten before it is ever read.
        let element = alphabet.terminator();

        Self {
            alphabet,
            text: Vec::new(),
            arena: NodeArena::new(),
            edges,
            element,
            phase: 0,
            extension: 0,
            starting_extension: 0,
            leaf1: None,
            last_end: NodeId::ROOT,
            last_end_offset: 0,
            new_internal_node: None,
            terminated: false,
        }
    }

    /// Number of indexed symbols, terminator excluded.
    #[must_use]
    pub fn size(&self) -> usize {
        self.text.len() - usize::from(self.terminated)
    }

    /// Whether the terminator has been written.
    #[inline]
    #[must_use]
    pub const fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// The root node.
    #[inline]
    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// The stored string, in internal symbols (terminator included once
    /// terminated).
    #[inline]
    #[must_use]
    pub fn text(&self) -> &[A::Symbol] {
        &self.text
    }

    /// The alphabet this tree was built with.
    #[inline]
    #[must_use]
    pub const fn alphabet(&self) -> &A {
        &self.alphabet
    }

    /// Look up a node record.
    #[inline]
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        self.arena.node(id)
    }

    /// Iterate every node in the arena, root first.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.arena.iter()
    }

    /// Child of `id` whose edge label starts with `symbol`, if any.
    #[must_use]
    pub fn child(&self, id: NodeId, symbol: A::Symbol) -> Option<NodeId> {
        self.edges.get(id, symbol)
    }

    /// Lazily iterate `(first edge symbol, child)` pairs of `id`.
    #[must_use]
    pub fn children(&self, id: NodeId) -> IterK1<'_, NodeId, A::Symbol, NodeId> {
        self.edges.iter_k1(id)
    }

    /// Total number of nodes, root included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    /// Number of leaves.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.arena.iter().filter(|(_, n)| n.is_leaf()).count()
    }

    /// Number of internal nodes, root included.
    #[must_use]
    pub fn internal_node_count(&self) -> usize {
        self.arena.len() - self.leaf_count()
    }

    /// The edge map, for diagnostics.
    #[must_use]
    pub const fn edge_map(&self) -> &TwoKeyMap<NodeId, A::Symbol, NodeId> {
        &self.edges
    }

    /// Where the previous extension ended: an internal node and the number
    /// of symbols below it along the tracked path. Debug surface.
    #[must_use]
    pub const fn tracked_end(&self) -> (NodeId, usize) {
        (self.last_end, self.last_end_offset)
    }

    /// Internal node created by the previous extension and still waiting
    /// for its suffix link, if any. Debug surface.
    #[must_use]
    pub const fn pending_internal_node(&self) -> Option<NodeId> {
        self.new_internal_node
    }

    // ========================================================================
    //  Public mutation
    // ========================================================================

    /// Append a sequence of external symbols. Chainable; an empty sequence
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// [`TreeError::AlreadyTerminated`] after [`terminate`]; on
    /// [`TreeError::InvalidSymbol`] (an input equal to the terminator) the
    /// symbols before the offending one are already indexed.
    ///
    /// [`terminate`]: SuffixTree::terminate
    pub fn append(&mut self, seq: &[A::External]) -> Result<&mut Self, TreeError> {
        if self.terminated {
            return Err(TreeError::AlreadyTerminated);
        }
        for &external in seq {
            let symbol = self.alphabet.convert(external);
            if symbol == self.alphabet.terminator() {
                return Err(TreeError::InvalidSymbol);
            }
            self.add_symbol(symbol);
        }
        Ok(self)
    }

    /// Write the terminator, turning the implicit tree into a true suffix
    /// tree: every suffix of the stored string now ends at a leaf.
    ///
    /// # Errors
    ///
    /// [`TreeError::AlreadyTerminated`] on a second call.
    pub fn terminate(&mut self) -> Result<&mut Self, TreeError> {
        if self.terminated {
            return Err(TreeError::AlreadyTerminated);
        }
        self.terminated = true;
        let terminator = self.alphabet.terminator();

        if self.text.is_empty() {
            // Nothing was appended: record the terminator as phase 0 with
            // no tree extension at all.
            self.text.push(terminator);
            self.phase = 0;
            return Ok(self);
        }

        // Re-enter the tree at the position representing the whole string:
        // the full length of leaf1's edge below its parent. The final phase
        // is forced to start at extension 1 so the terminator reaches every
        // suffix that is still implicit.
        let leaf1 = self.leaf1.expect("a non-empty tree created leaf1 in phase 0");
        let leaf = *self.arena.node(leaf1);
        self.last_end = leaf.parent().expect("leaf1 is not the root");
        self.last_end_offset = leaf.edge_length(self.phase);
        self.starting_extension = 1;

        self.add_symbol(terminator);
        Ok(self)
    }

    // ========================================================================
    //  One phase per symbol
    // ========================================================================

    /// Admit one internal symbol: append it to S, run its phase.
    fn add_symbol(&mut self, element: A::Symbol) {
        assert!(
            self.text.len() < u32::MAX as usize,
            "stored string exceeds addressable length"
        );
        self.element = element;
        self.text.push(element);
        self.phase = self.text.len() - 1;

        if self.phase == 0 {
            // The first symbol is a single leaf under the root; every later
            // phase starts its extensions past it.
            let leaf = self.arena.alloc(Node::Leaf {
                parent: NodeId::ROOT,
                edge_start: 0,
                string_start: 0,
            });
            let previous = self.edges.put(NodeId::ROOT, element, leaf);
            debug_assert!(previous.is_none(), "first symbol cannot displace an edge");
            self.leaf1 = Some(leaf);
            self.starting_extension = 1;
        } else {
            self.do_phase();
        }

        // Every open leaf edge silently grew by one symbol, including the
        // one under the previous extension's end.
        self.last_end_offset += 1;
    }

    /// Run extensions `starting_extension..=phase`, stopping early when a
    /// suffix turns out to be present already (every shorter one then is
    /// too).
    fn do_phase(&mut self) {
        self.new_internal_node = None;
        let last_extension = self.phase;

        let mut rule3 = false;
        for i in self.starting_extension..=last_extension {
            self.extension = i;
            if self.extend_via_suffix_link() {
                rule3 = true;
                break;
            }
        }

        self.starting_extension = self.extension + usize::from(!rule3);
        trace_log!(
            phase = self.phase,
            next_starting_extension = self.starting_extension,
            stopped_early = rule3,
            "phase complete"
        );
    }

    /// One extension: re-enter the tree near the previous extension's end,
    /// hop one suffix link, extend, and wire the suffix link the previous
    /// extension left pending. Returns whether the suffix was already
    /// present (rule 3).
    fn extend_via_suffix_link(&mut self) -> bool {
        // Ascend to a node with a suffix link, or to the root. Only a node
        // created in the immediately previous extension can lack one.
        let mut node = self.last_end;
        let mut path_length = self.last_end_offset;
        let record = *self.arena.node(node);
        debug_assert!(record.is_internal(), "tracked end is an internal node");
        if record.suffix_link().is_none() && !record.is_root() {
            path_length += record.edge_length(self.phase);
            node = record.parent().expect("internal nodes have parents");
        }

        // Drop the suffix's first symbol: at the root that is one path
        // symbol, elsewhere the suffix link does it for free.
        if node.is_root() {
            debug_assert!(path_length > 0, "root re-entry with an empty path");
            path_length -= 1;
        } else {
            node = self
                .arena
                .node(node)
                .suffix_link()
                .expect("ascent stops at a linked node or the root");
        }

        let (rule3_node, created) = self.extend(node, path_length);

        // The previous extension's new node now gets its suffix link: the
        // node this extension ended at carries the one-symbol-shorter path.
        if let Some(pending) = self.new_internal_node.take() {
            let target = rule3_node.unwrap_or(self.last_end);
            debug_assert!(
                self.arena.node(target).is_internal(),
                "suffix links point at internal nodes"
            );
            self.arena.set_suffix_link(pending, target);
        }
        self.new_internal_node = created;

        rule3_node.is_some()
    }

    /// Descend `path_length` symbols below `node` by edge lengths
    /// (skip/count) and apply the extension rule found there.
    ///
    /// Returns `(rule3_node, created_internal_node)`; at most one is set.
    fn extend(&mut self, mut node: NodeId, mut path_length: usize) -> (Option<NodeId>, Option<NodeId>) {
        loop {
            if path_length == 0 {
                // The suffix minus its last symbol ends exactly at `node`.
                return match self.edges.get(node, self.element) {
                    None => {
                        // Rule 2a: new leaf straight under `node`.
                        self.last_end = node;
                        self.last_end_offset = 0;
                        self.attach_leaf(node);
                        trace_log!(phase = self.phase, extension = self.extension, rule = "2a");
                        (None, None)
                    }
                    // Rule 3: already present, nothing to write.
                    Some(_) => (Some(node), None),
                };
            }

            let next_on_edge = self.text[self.phase - path_length];
            let child_id = self
                .edges
                .get(node, next_on_edge)
                .expect("tracked path has an edge for its next symbol");
            let child = *self.arena.node(child_id);

            if child.is_leaf() {
                // Length as of the previous phase; this phase's symbol is
                // not part of the comparison.
                let child_length = child.edge_length(self.phase) - 1;
                debug_assert!(
                    path_length <= child_length,
                    "tracked path overruns a leaf edge"
                );
                if child_length == path_length {
                    // Rule 1: ends at an existing leaf, which auto-extends.
                    self.last_end = node;
                    self.last_end_offset = path_length;
                    trace_log!(phase = self.phase, extension = self.extension, rule = "1");
                    return (None, None);
                }
            } else {
                let edge_length = child.edge_length(self.phase);
                if path_length >= edge_length {
                    // Skip/count: hop the whole edge in O(1).
                    node = child_id;
                    path_length -= edge_length;
                    continue;
                }
            }

            // The path ends strictly inside the edge to `child`.
            let next_edge_char = self.text[child.edge_start() as usize + path_length];
            if self.element == next_edge_char {
                // Rule 3, mid-edge.
                return (Some(node), None);
            }

            // Rule 2b: split the edge, hang the new leaf off the split.
            let first_edge_char = self.text[child.edge_start() as usize];
            let split = self.split_edge(child_id, first_edge_char, next_edge_char, path_length);
            self.attach_leaf(split);
            self.last_end = split;
            self.last_end_offset = 0;
            trace_log!(phase = self.phase, extension = self.extension, rule = "2b");
            return (None, Some(split));
        }
    }

    /// Attach a leaf for the current extension under `parent`, keyed by the
    /// current element.
    fn attach_leaf(&mut self, parent: NodeId) {
        let leaf = self.arena.alloc(Node::Leaf {
            parent,
            edge_start: self.phase as u32,
            string_start: self.extension as u32,
        });
        let previous = self.edges.put(parent, self.element, leaf);
        debug_assert!(previous.is_none(), "new leaf must not displace an edge");
    }

    /// Split the incoming edge of `child_id` after `edge_length` symbols,
    /// inserting a new internal node between `child_id` and its parent.
    ///
    /// The caller attaches the current phase's leaf under the returned node
    /// and later assigns its suffix link.
    fn split_edge(
        &mut self,
        child_id: NodeId,
        first_edge_char: A::Symbol,
        next_edge_char: A::Symbol,
        edge_length: usize,
    ) -> NodeId {
        let child = *self.arena.node(child_id);
        debug_assert!(
            edge_length > 0 && edge_length < child.edge_length(self.phase),
            "split point must fall strictly inside the edge"
        );
        debug_assert_eq!(self.text[child.edge_start() as usize], first_edge_char);
        debug_assert_eq!(
            self.text[child.edge_start() as usize + edge_length],
            next_edge_char
        );

        let parent = child.parent().expect("the root is never split");
        let split = self.arena.alloc(Node::Internal {
            parent,
            edge_start: child.edge_start(),
            edge_end: child.edge_start() + edge_length as u32,
            suffix_link: None,
        });

        // The new node takes over the parent's edge slot; the overwritten
        // value must be exactly the child being split.
        let displaced = self.edges.put(parent, first_edge_char, split);
        debug_assert_eq!(
            displaced,
            Some(child_id),
            "split must displace exactly the node being split"
        );

        self.arena.reparent(child_id, split, edge_length);
        let previous = self.edges.put(split, next_edge_char, child_id);
        debug_assert!(previous.is_none(), "split child re-insert must be fresh");

        split
    }
}

impl<A: Alphabet> fmt::Debug for SuffixTree<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuffixTree")
            .field("size", &self.size())
            .field("terminated", &self.terminated)
            .field("nodes", &self.arena.len())
            .field("edges", &self.edges.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
//  Tests
// ============================================================================
