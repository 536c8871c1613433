//! Large randomized construction runs.
//!
//! A million uniformly random nucleotides are indexed and terminated, then
//! the structural invariants are spot-checked: per-suffix depth accounting
//! on 10,000 random suffixes, full label reads on a sample, and short
//! substring queries across the text.
//!
//! Run in release mode for sensible wall times:
//! ```bash
//! cargo test --test stress_tests --release
//! ```

#![allow(clippy::unwrap_used)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use seqtree::{NodeId, Nucleotides, SuffixTree};

const SYMBOLS: [u8; 4] = [b'A', b'C', b'G', b'T'];
const INPUT_LEN: usize = 1_000_000;
const DEPTH_SPOT_CHECKS: usize = 10_000;
const FULL_READ_SPOT_CHECKS: usize = 100;
const SUBSTRING_SPOT_CHECKS: usize = 10_000;

fn random_dna(rng: &mut StdRng, len: usize) -> Vec<u8> {
    (0..len).map(|_| SYMBOLS[rng.random_range(0..SYMBOLS.len())]).collect()
}

/// Depth of a node: total edge length from the root.
fn depth(tree: &SuffixTree<Nucleotides>, mut id: NodeId) -> usize {
    let phase = tree.text().len() - 1;
    let mut total = 0;
    while let Some(parent) = tree.node(id).parent() {
        total += tree.node(id).edge_length(phase);
        id = parent;
    }
    total
}

/// Read a root-to-leaf label and compare it to the expected suffix.
fn leaf_reads_suffix(tree: &SuffixTree<Nucleotides>, leaf: NodeId, start: usize) -> bool {
    let phase = tree.text().len() - 1;
    let mut parts: Vec<&[u8]> = Vec::new();
    let mut cursor = leaf;
    while let Some(parent) = tree.node(cursor).parent() {
        let node = tree.node(cursor);
        let from = node.edge_start() as usize;
        parts.push(&tree.text()[from..from + node.edge_length(phase)]);
        cursor = parent;
    }
    parts.reverse();
    parts.concat() == tree.text()[start..]
}

/// Whether `needle` is spelled by some root path.
fn is_substring(tree: &SuffixTree<Nucleotides>, needle: &[u8]) -> bool {
    let phase = tree.text().len() - 1;
    let mut node = tree.root();
    let mut i = 0;
    while i < needle.len() {
        let Some(child) = tree.child(node, needle[i]) else {
            return false;
        };
        let record = tree.node(child);
        let from = record.edge_start() as usize;
        let edge = &tree.text()[from..from + record.edge_length(phase)];
        let take = edge.len().min(needle.len() - i);
        if edge[..take] != needle[i..i + take] {
            return false;
        }
        i += take;
        node = child;
    }
    true
}

#[test]
fn million_random_symbols() {
    let mut rng = StdRng::seed_from_u64(0x517c_c1b7_2722_0a95);
    let input = random_dna(&mut rng, INPUT_LEN);

    let mut tree = SuffixTree::new(Nucleotides);
    tree.append(&input).unwrap();
    tree.terminate().unwrap();

    assert_eq!(tree.size(), INPUT_LEN);
    // One leaf per suffix of S$, the lone-terminator suffix included.
    assert_eq!(tree.leaf_count(), INPUT_LEN + 1);
    let m = tree.text().len();
    assert!(tree.node_count() >= m + 1);
    assert!(tree.node_count() <= 2 * m);
    assert_eq!(tree.edge_map().len(), tree.node_count() - 1);

    // Index leaves by the suffix they end.
    let mut leaf_of_suffix: Vec<Option<NodeId>> = vec![None; m];
    for (id, node) in tree.nodes() {
        if let Some(start) = node.string_start() {
            assert!(leaf_of_suffix[start as usize].is_none(), "duplicate suffix leaf");
            leaf_of_suffix[start as usize] = Some(id);
        }
    }
    assert!(leaf_of_suffix.iter().all(Option::is_some));

    // Depth accounting: the path to suffix i's leaf spans exactly m - i
    // symbols.
    for _ in 0..DEPTH_SPOT_CHECKS {
        let i = rng.random_range(0..m);
        let leaf = leaf_of_suffix[i].unwrap();
        assert_eq!(depth(&tree, leaf), m - i, "wrong depth for suffix {i}");
    }

    // Full label reads on a smaller sample.
    for _ in 0..FULL_READ_SPOT_CHECKS {
        let i = rng.random_range(0..m);
        let leaf = leaf_of_suffix[i].unwrap();
        assert!(leaf_reads_suffix(&tree, leaf, i), "bad label for suffix {i}");
    }

    // Short substrings drawn from the text must all be found.
    for _ in 0..SUBSTRING_SPOT_CHECKS {
        let start = rng.random_range(0..INPUT_LEN);
        let end = (start + rng.random_range(1..=24)).min(INPUT_LEN);
        assert!(is_substring(&tree, &input[start..end]));
    }
}

#[test]
fn repeated_appends_match_single_append() {
    let mut rng = StdRng::seed_from_u64(42);
    let chunks: Vec<Vec<u8>> = (0..50).map(|_| random_dna(&mut rng, 997)).collect();

    let mut piecewise = SuffixTree::new(Nucleotides);
    for chunk in &chunks {
        piecewise.append(chunk).unwrap();
    }
    piecewise.terminate().unwrap();

    let whole: Vec<u8> = chunks.concat();
    let mut at_once = SuffixTree::new(Nucleotides);
    at_once.append(&whole).unwrap();
    at_once.terminate().unwrap();

    assert_eq!(piecewise.size(), whole.len());
    assert_eq!(piecewise.node_count(), at_once.node_count());
    assert_eq!(piecewise.leaf_count(), at_once.leaf_count());
}

#[test]
fn highly_repetitive_input() {
    // Period-3 text keeps the active point deep and exercises long
    // suffix-link chases.
    let input: Vec<u8> = b"ACG".iter().copied().cycle().take(30_000).collect();
    let mut tree = SuffixTree::new(Nucleotides);
    tree.append(&input).unwrap();
    tree.terminate().unwrap();

    assert_eq!(tree.leaf_count(), input.len() + 1);
    assert!(is_substring(&tree, &input[..2_000]));
}
