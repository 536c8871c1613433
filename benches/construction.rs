//! Benchmarks for suffix-tree construction and the two-key edge map, using
//! Divan.
//!
//! Run with: `cargo bench --bench construction`

use divan::{Bencher, black_box};
use seqtree::{Nucleotides, SuffixTree, TwoKeyMap};

fn main() {
    divan::main();
}

const SYMBOLS: [u8; 4] = [b'A', b'C', b'G', b'T'];

/// Deterministic pseudo-random DNA (splitmix-style, no rand dependency in
/// the hot loop).
fn dna(len: usize) -> Vec<u8> {
    let mut state = 0x9e37_79b9_7f4a_7c15u64;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(0xbf58_476d_1ce4_e5b9).wrapping_add(1);
            SYMBOLS[(state >> 61) as usize & 3]
        })
        .collect()
}

// =============================================================================
// Construction
// =============================================================================

#[divan::bench_group]
mod construction {
    use super::{Bencher, Nucleotides, SuffixTree, black_box, dna};

    #[divan::bench(args = [1_000, 10_000, 100_000, 1_000_000])]
    fn random_dna(bencher: Bencher, len: usize) {
        let input = dna(len);
        bencher.bench(|| {
            let mut tree = SuffixTree::new(Nucleotides);
            tree.append(black_box(&input)).unwrap();
            tree.terminate().unwrap();
            tree.node_count()
        });
    }

    #[divan::bench(args = [10_000, 100_000])]
    fn repetitive_dna(bencher: Bencher, len: usize) {
        let input: Vec<u8> = b"ACGT".iter().copied().cycle().take(len).collect();
        bencher.bench(|| {
            let mut tree = SuffixTree::new(Nucleotides);
            tree.append(black_box(&input)).unwrap();
            tree.terminate().unwrap();
            tree.node_count()
        });
    }
}

// =============================================================================
// Edge map
// =============================================================================

#[divan::bench_group]
mod edge_map {
    use super::{Bencher, TwoKeyMap, black_box};

    const PAIRS: usize = 100_000;

    #[divan::bench]
    fn put_distinct_parents(bencher: Bencher) {
        bencher.bench(|| {
            let mut map: TwoKeyMap<u32, u8, u32> = TwoKeyMap::new(5);
            for k1 in 0..PAIRS as u32 {
                map.put(k1, b'A', k1);
            }
            map.len()
        });
    }

    #[divan::bench]
    fn get_hit(bencher: Bencher) {
        let mut map: TwoKeyMap<u32, u8, u32> = TwoKeyMap::new(5);
        for k1 in 0..PAIRS as u32 {
            for k2 in [b'A', b'C', b'G', b'T'] {
                map.put(k1, k2, k1);
            }
        }
        bencher.bench(|| {
            let mut sum = 0u64;
            for k1 in 0..PAIRS as u32 {
                sum += u64::from(map.get(black_box(k1), b'G').unwrap());
            }
            sum
        });
    }

    #[divan::bench]
    fn iter_children(bencher: Bencher) {
        let mut map: TwoKeyMap<u32, u8, u32> = TwoKeyMap::new(5);
        for k1 in 0..PAIRS as u32 {
            for k2 in [b'A', b'C', b'G', b'T', b'$'] {
                map.put(k1, k2, k1);
            }
        }
        bencher.bench(|| {
            let mut total = 0usize;
            for k1 in 0..PAIRS as u32 {
                total += map.iter_k1(black_box(k1)).count();
            }
            total
        });
    }
}
