//! Filepath: src/twokey.rs
//!
//! Two-level open-addressed map from `(K1, K2)` pairs to values.
//!
//! One [`TwoKeyMap`] holds every parent-to-child edge of the suffix tree:
//! `K1` is a parent node, `K2` the first symbol of a child edge, `V` the
//! child node. Amortizing one table across the whole tree is what lets a
//! multi-million-node tree fit in memory; a per-node map would pay hash
//! table overhead per parent.
//!
//! # Layout
//!
//! The table is partitioned into *buckets* of fixed power-of-two capacity
//! `B`, chosen from the requested second-key capacity (≈ alphabet size, so a
//! parent's edges share one cache-resident bucket). Four parallel arrays
//! back the table: a byte-wide slot-state array and the `K1`/`K2`/`V`
//! arrays.
//!
//! # Probing
//!
//! `hash(K1)` (mixed with an odd multiplier, high bits) selects a bucket;
//! a seed mixed from both key hashes selects the starting slot inside it.
//! Collisions probe linearly over the bucket's `B` slots; an exhausted
//! bucket advances by double hashing — the step is forced odd in bucket
//! units, hence coprime with the power-of-two bucket count, so a full probe
//! visits every bucket exactly once before declaring absence.

use std::hash::{Hash, Hasher};
use std::mem::MaybeUninit;

use rustc_hash::{FxHashMap, FxHasher};

use crate::tracing_helpers::debug_log;

// ============================================================================
//  Constants
// ============================================================================

/// First-level mixing multiplier (odd).
const MIX1: u64 = 0x9e37_79b9_7f4a_7c15;

/// Second-level mixing multiplier (odd).
const MIX2: u64 = 0xbf58_476d_1ce4_e5b9;

/// Number of buckets a fresh map starts with.
const INITIAL_BUCKETS: usize = 16;

/// Capacity threshold above which growth switches from 4x to 2x.
const GROWTH_SWITCH: usize = 65_536;

/// Hard ceiling on slot capacity.
const MAX_CAPACITY: usize = 1 << (usize::BITS - 2);

// ============================================================================
//  SlotState
// ============================================================================

/// Per-slot occupancy state, stored in a byte-wide array parallel to the
/// key/value arrays.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SlotState {
    /// Never occupied. Terminates a probe.
    Empty = 0,

    /// Tombstone left by `remove`. Skipped by lookups, reused by inserts.
    Deleted = 1,

    /// Holds an initialized `(K1, K2, V)` triple.
    Occupied = 2,
}

/// Outcome of an insert-oriented probe.
enum Probe {
    /// Occupied slot with equal keys.
    Found(usize),

    /// First Deleted-or-Empty slot visited before reaching Empty.
    Free(usize),

    /// Every reachable slot is Occupied or Deleted-with-no-reuse; grow.
    Exhausted,
}

// ============================================================================
//  Hashing helpers
// ============================================================================

#[inline]
fn hash_one<T: Hash>(value: &T) -> u64 {
    let mut hasher = FxHasher::default();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Bucket index for a first-level hash: odd multiply, keep the high bits.
#[inline]
fn bucket_of(h1: u64, bucket_count: usize) -> usize {
    let log2 = bucket_count.trailing_zeros();
    if log2 == 0 {
        0
    } else {
        (h1.wrapping_mul(MIX1) >> (64 - log2)) as usize
    }
}

/// Seed for the starting slot inside a bucket; mixes both keys.
#[inline]
fn probe_seed(h1: u64, h2: u64) -> u64 {
    h1.wrapping_add(h2).wrapping_mul(MIX2)
}

/// Starting slot offset inside a bucket.
#[inline]
fn slot_offset(seed: u64, bucket_shift: u32) -> usize {
    if bucket_shift == 0 {
        0
    } else {
        (seed >> (64 - bucket_shift)) as usize
    }
}

/// Double-hashing advance in bucket units, forced odd so it is coprime with
/// the power-of-two bucket count.
///
/// Derived from the first key alone: every entry under one `K1` then walks
/// the same bucket chain, which is what makes the per-`K1` view possible.
#[inline]
fn bucket_step(h1: u64, bucket_count: usize) -> usize {
    (((h1.wrapping_mul(MIX2) >> 32) as usize) | 1) & (bucket_count - 1)
}

/// Allocate `n` uninitialized slots.
fn uninit_slots<T>(n: usize) -> Vec<MaybeUninit<T>> {
    let mut slots: Vec<MaybeUninit<T>> = Vec::with_capacity(n);
    // SAFETY: `MaybeUninit<T>` requires no initialization.
    unsafe { slots.set_len(n) };
    slots
}

// ============================================================================
//  TwoKeyMap
// ============================================================================

/// Open-addressed map from `(K1, K2)` to `V` with two-level bucket locality.
///
/// All three type parameters must be `Copy`; slots live in uninitialized
/// storage and are only read while their state byte says `Occupied`.
///
/// # Panics
///
/// Growth past 2^(word bits − 2) slots panics: the table cannot address more.
/// A per-`K1` iterator that observes a structural modification panics; see
/// [`iter_k1`](TwoKeyMap::iter_k1).
pub struct TwoKeyMap<K1, K2, V> {
    /// Slot occupancy, parallel to the three arrays below.
    states: Vec<SlotState>,

    /// First keys; initialized wherever `states` is not `Empty`.
    k1s: Vec<MaybeUninit<K1>>,

    /// Second keys; same validity as `k1s`.
    k2s: Vec<MaybeUninit<K2>>,

    /// Values; same validity as `k1s`.
    vals: Vec<MaybeUninit<V>>,

    /// log2 of the bucket capacity `B`. Fixed for the map's lifetime.
    bucket_shift: u32,

    /// Occupied slot count.
    len: usize,

    /// Tombstone count.
    deleted: usize,

    /// Structural modification counter; guards live iterators.
    mods: u64,

    /// Per-`K1` population, maintained by `put`/`remove`. Bounds per-`K1`
    /// iteration exactly.
    fanout: FxHashMap<K1, u32>,
}

impl<K1, K2, V> TwoKeyMap<K1, K2, V>
where
    K1: Copy + Eq + Hash,
    K2: Copy + Eq + Hash,
    V: Copy,
{
    // ========================================================================
    //  Construction
    // ========================================================================

    /// Create a map whose buckets hold at least `second_key_capacity` slots
    /// (rounded up to a power of two).
    ///
    /// Pass the alphabet size: one parent's edges then share one bucket.
    ///
    /// # Panics
    ///
    /// Panics if `second_key_capacity` is zero.
    #[must_use]
    pub fn new(second_key_capacity: usize) -> Self {
        assert!(second_key_capacity > 0, "bucket capacity must be positive");
        let bucket_capacity = second_key_capacity.next_power_of_two();
        let bucket_shift = bucket_capacity.trailing_zeros();
        let capacity = INITIAL_BUCKETS << bucket_shift;

        Self {
            states: vec![SlotState::Empty; capacity],
            k1s: uninit_slots(capacity),
            k2s: uninit_slots(capacity),
            vals: uninit_slots(capacity),
            bucket_shift,
            len: 0,
            deleted: 0,
            mods: 0,
            fanout: FxHashMap::default(),
        }
    }

    // ========================================================================
    //  Capacity & size
    // ========================================================================

    /// Total slot capacity (always a power of two).
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.states.len()
    }

    /// Slots per bucket.
    #[inline]
    #[must_use]
    pub const fn bucket_capacity(&self) -> usize {
        1 << self.bucket_shift
    }

    /// Number of stored `(K1, K2)` pairs.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the map stores no pairs.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of tombstones awaiting reuse or the next growth.
    #[inline]
    #[must_use]
    pub const fn tombstones(&self) -> usize {
        self.deleted
    }

    /// Number of pairs stored under `k1`.
    #[inline]
    #[must_use]
    pub fn fanout(&self, k1: K1) -> usize {
        self.fanout.get(&k1).copied().unwrap_or(0) as usize
    }

    #[inline]
    fn bucket_count(&self) -> usize {
        self.states.len() >> self.bucket_shift
    }

    // ========================================================================
    //  Slot access
    // ========================================================================

    /// Read the keys of an occupied slot.
    #[inline]
    fn keys_at(&self, slot: usize) -> (K1, K2) {
        debug_assert_eq!(self.states[slot], SlotState::Occupied);
        // SAFETY: the slot state is Occupied, so both keys were written.
        unsafe { (self.k1s[slot].assume_init(), self.k2s[slot].assume_init()) }
    }

    /// Read the value of an occupied slot.
    #[inline]
    fn value_at(&self, slot: usize) -> V {
        debug_assert_eq!(self.states[slot], SlotState::Occupied);
        // SAFETY: the slot state is Occupied, so the value was written.
        unsafe { self.vals[slot].assume_init() }
    }

    // ========================================================================
    //  Probing
    // ========================================================================

    /// Locate the occupied slot holding `(k1, k2)`, if any.
    ///
    /// Examines each reachable slot at most once: every bucket is visited at
    /// most once (odd step, power-of-two bucket count), each bucket scans
    /// its `B` slots, and an `Empty` slot ends the probe.
    fn find(&self, k1: K1, k2: K2) -> Option<usize> {
        let h1 = hash_one(&k1);
        let seed = probe_seed(h1, hash_one(&k2));

        let bucket_count = self.bucket_count();
        let slot_mask = self.bucket_capacity() - 1;
        let start = slot_offset(seed, self.bucket_shift);
        let step = bucket_step(h1, bucket_count);
        let mut bucket = bucket_of(h1, bucket_count);

        for _ in 0..bucket_count {
            let base = bucket << self.bucket_shift;
            for i in 0..=slot_mask {
                let slot = base + ((start + i) & slot_mask);
                match self.states[slot] {
                    SlotState::Empty => return None,
                    SlotState::Deleted => {}
                    SlotState::Occupied => {
                        if self.keys_at(slot) == (k1, k2) {
                            return Some(slot);
                        }
                    }
                }
            }
            bucket = (bucket + step) & (bucket_count - 1);
        }

        None
    }

    /// Probe for insertion: find equal keys, or the first reusable slot
    /// visited before reaching `Empty`.
    fn probe_insert(&self, k1: K1, k2: K2) -> Probe {
        let h1 = hash_one(&k1);
        let seed = probe_seed(h1, hash_one(&k2));

        let bucket_count = self.bucket_count();
        let slot_mask = self.bucket_capacity() - 1;
        let start = slot_offset(seed, self.bucket_shift);
        let step = bucket_step(h1, bucket_count);
        let mut bucket = bucket_of(h1, bucket_count);

        let mut first_free: Option<usize> = None;

        for _ in 0..bucket_count {
            let base = bucket << self.bucket_shift;
            for i in 0..=slot_mask {
                let slot = base + ((start + i) & slot_mask);
                match self.states[slot] {
                    SlotState::Empty => {
                        return Probe::Free(first_free.unwrap_or(slot));
                    }
                    SlotState::Deleted => {
                        if first_free.is_none() {
                            first_free = Some(slot);
                        }
                    }
                    SlotState::Occupied => {
                        if self.keys_at(slot) == (k1, k2) {
                            return Probe::Found(slot);
                        }
                    }
                }
            }
            bucket = (bucket + step) & (bucket_count - 1);
        }

        first_free.map_or(Probe::Exhausted, Probe::Free)
    }

    // ========================================================================
    //  Lookup
    // ========================================================================

    /// Value stored under `(k1, k2)`, if any.
    #[must_use]
    pub fn get(&self, k1: K1, k2: K2) -> Option<V> {
        self.find(k1, k2).map(|slot| self.value_at(slot))
    }

    /// Whether `(k1, k2)` is present.
    #[must_use]
    pub fn contains(&self, k1: K1, k2: K2) -> bool {
        self.find(k1, k2).is_some()
    }

    // ========================================================================
    //  Mutation
    // ========================================================================

    /// Insert or overwrite `(k1, k2) → v`, returning the previous value on
    /// overwrite.
    ///
    /// Callers that expect a fresh insert should assert the return is
    /// `None`: a silent overwrite here would mask an engine bug.
    pub fn put(&mut self, k1: K1, k2: K2, v: V) -> Option<V> {
        if 2 * (self.len + self.deleted + 1) > self.capacity() {
            self.grow();
        }

        loop {
            match self.probe_insert(k1, k2) {
                Probe::Found(slot) => {
                    let old = self.value_at(slot);
                    self.vals[slot] = MaybeUninit::new(v);
                    return Some(old);
                }
                Probe::Free(slot) => {
                    if self.states[slot] == SlotState::Deleted {
                        self.deleted -= 1;
                    }
                    self.states[slot] = SlotState::Occupied;
                    self.k1s[slot] = MaybeUninit::new(k1);
                    self.k2s[slot] = MaybeUninit::new(k2);
                    self.vals[slot] = MaybeUninit::new(v);
                    self.len += 1;
                    self.mods += 1;
                    *self.fanout.entry(k1).or_insert(0) += 1;
                    return None;
                }
                Probe::Exhausted => self.grow(),
            }
        }
    }

    /// Remove `(k1, k2)`, returning its value. Leaves a tombstone.
    pub fn remove(&mut self, k1: K1, k2: K2) -> Option<V> {
        let slot = self.find(k1, k2)?;
        let old = self.value_at(slot);

        self.states[slot] = SlotState::Deleted;
        self.len -= 1;
        self.deleted += 1;
        self.mods += 1;

        let count = self
            .fanout
            .get_mut(&k1)
            .expect("population tracks every occupied first key");
        *count -= 1;
        if *count == 0 {
            self.fanout.remove(&k1);
        }

        Some(old)
    }

    // ========================================================================
    //  Growth
    // ========================================================================

    /// Reallocate the four parallel arrays and reinsert every occupied
    /// entry. 4x below [`GROWTH_SWITCH`] slots, 2x above. Tombstones are
    /// dropped; `len` and the per-`K1` populations are unchanged.
    fn grow(&mut self) {
        let capacity = self.capacity();
        let new_capacity = if capacity > GROWTH_SWITCH {
            capacity * 2
        } else {
            capacity * 4
        };
        assert!(
            new_capacity <= MAX_CAPACITY,
            "two-key map cannot grow past {MAX_CAPACITY} slots"
        );

        debug_log!(
            old_capacity = capacity,
            new_capacity,
            len = self.len,
            tombstones = self.deleted,
            "growing two-key map"
        );

        let mut states = vec![SlotState::Empty; new_capacity];
        let mut k1s = uninit_slots(new_capacity);
        let mut k2s = uninit_slots(new_capacity);
        let mut vals = uninit_slots(new_capacity);

        for slot in 0..capacity {
            if self.states[slot] == SlotState::Occupied {
                let (k1, k2) = self.keys_at(slot);
                let v = self.value_at(slot);
                Self::insert_fresh(&mut states, &mut k1s, &mut k2s, &mut vals, self.bucket_shift, k1, k2, v);
            }
        }

        self.states = states;
        self.k1s = k1s;
        self.k2s = k2s;
        self.vals = vals;
        self.deleted = 0;
        self.mods += 1;
    }

    /// Place a known-unique entry in a rebuilt table. Probes for `Empty`
    /// only; the table is at most half full, so one must exist.
    fn insert_fresh(
        states: &mut [SlotState],
        k1s: &mut [MaybeUninit<K1>],
        k2s: &mut [MaybeUninit<K2>],
        vals: &mut [MaybeUninit<V>],
        bucket_shift: u32,
        k1: K1,
        k2: K2,
        v: V,
    ) {
        let h1 = hash_one(&k1);
        let seed = probe_seed(h1, hash_one(&k2));

        let bucket_count = states.len() >> bucket_shift;
        let slot_mask = (1 << bucket_shift) - 1;
        let start = slot_offset(seed, bucket_shift);
        let step = bucket_step(h1, bucket_count);
        let mut bucket = bucket_of(h1, bucket_count);

        for _ in 0..bucket_count {
            let base = bucket << bucket_shift;
            for i in 0..=slot_mask {
                let slot = base + ((start + i) & slot_mask);
                if states[slot] == SlotState::Empty {
                    states[slot] = SlotState::Occupied;
                    k1s[slot] = MaybeUninit::new(k1);
                    k2s[slot] = MaybeUninit::new(k2);
                    vals[slot] = MaybeUninit::new(v);
                    return;
                }
            }
            bucket = (bucket + step) & (bucket_count - 1);
        }

        unreachable!("rebuilt table is at most half full");
    }

    // ========================================================================
    //  Per-K1 iteration
    // ========================================================================

    /// Lazily iterate the `(K2, V)` pairs stored under `k1`.
    ///
    /// Scans only the buckets reachable for `k1` (the same double-hashing
    /// chain inserts followed) and yields exactly the per-`K1` population.
    ///
    /// # Panics
    ///
    /// A structural modification of the map while the iterator is alive
    /// panics on the next `next()` call. (The borrow checker already rules
    /// this out in safe code; the modification counter keeps the check
    /// honest across refactors.)
    #[must_use]
    pub fn iter_k1(&self, k1: K1) -> IterK1<'_, K1, K2, V> {
        let h1 = hash_one(&k1);
        let bucket_count = self.bucket_count();

        IterK1 {
            map: self,
            k1,
            remaining: self.fanout.get(&k1).copied().unwrap_or(0),
            bucket: bucket_of(h1, bucket_count),
            step: bucket_step(h1, bucket_count),
            in_bucket: 0,
            buckets_scanned: 0,
            mods: self.mods,
        }
    }
}

impl<K1, K2, V> std::fmt::Debug for TwoKeyMap<K1, K2, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwoKeyMap")
            .field("len", &self.len)
            .field("tombstones", &self.deleted)
            .field("capacity", &self.states.len())
            .field("bucket_capacity", &(1usize << self.bucket_shift))
            .finish_non_exhaustive()
    }
}

// ============================================================================
//  IterK1
// ============================================================================

/// Lazy per-`K1` view produced by [`TwoKeyMap::iter_k1`].
pub struct IterK1<'a, K1, K2, V> {
    map: &'a TwoKeyMap<K1, K2, V>,
    k1: K1,

    /// Pairs still to yield; the per-`K1` population at creation.
    remaining: u32,

    bucket: usize,
    step: usize,

    /// Next slot offset within the current bucket.
    in_bucket: usize,

    buckets_scanned: usize,

    /// Modification counter snapshot; a mismatch fails the iteration loudly.
    mods: u64,
}

impl<K1, K2, V> Iterator for IterK1<'_, K1, K2, V>
where
    K1: Copy + Eq + Hash,
    K2: Copy + Eq + Hash,
    V: Copy,
{
    type Item = (K2, V);

    fn next(&mut self) -> Option<(K2, V)> {
        if self.remaining == 0 {
            return None;
        }
        assert_eq!(
            self.mods, self.map.mods,
            "two-key map modified during per-K1 iteration"
        );

        let bucket_count = self.map.bucket_count();
        let bucket_capacity = self.map.bucket_capacity();

        while self.buckets_scanned < bucket_count {
            let base = self.bucket << self.map.bucket_shift;
            while self.in_bucket < bucket_capacity {
                let slot = base + self.in_bucket;
                self.in_bucket += 1;
                if self.map.states[slot] == SlotState::Occupied {
                    let (k1, k2) = self.map.keys_at(slot);
                    if k1 == self.k1 {
                        self.remaining -= 1;
                        return Some((k2, self.map.value_at(slot)));
                    }
                }
            }
            // A bucket with an Empty slot ends the chain: no insert for this
            // K1 can ever have probed past it.
            let has_empty = self.map.states[base..base + bucket_capacity]
                .iter()
                .any(|s| *s == SlotState::Empty);
            if has_empty {
                debug_assert_eq!(self.remaining, 0, "population exceeds reachable entries");
                self.remaining = 0;
                return None;
            }
            self.in_bucket = 0;
            self.buckets_scanned += 1;
            self.bucket = (self.bucket + self.step) & (bucket_count - 1);
        }

        debug_assert_eq!(self.remaining, 0, "population exceeds reachable entries");
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining as usize, Some(self.remaining as usize))
    }
}

// ============================================================================
//  Tests
// ============================================================================
