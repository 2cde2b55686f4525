#![forbid(unsafe_code)]
#![deny(missing_docs, missing_debug_implementations)]

//! A simple library implementing an immutable, flat representation of an
//! [augmented interval tree](https://en.wikipedia.org/wiki/Interval_tree#Augmented_tree).
//!
//! Unlike a pointer-based tree, the `N` stored intervals are laid out as a
//! concatenation of perfect (full-and-complete) implicit binary trees whose
//! sizes are exactly the set bits of `N` — a forest in the style of
//! [cgranges](https://github.com/lh3/cgranges). Parent/child relationships
//! within each tree are pure bit arithmetic on array indices, so queries
//! need no pointers and no per-node heap allocation.
//!
//! [`Builder`] accumulates raw `(beg, end)` pairs in insertion order;
//! [`Builder::build`] turns them into an immutable [`ITree`]. The resulting
//! tree is read-only: it can be queried from any number of threads at once
//! with no locking, and shared by value or by reference without
//! synchronization.

mod augment;
mod error;
mod forest;
mod query;
mod sort;

use std::mem;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use error::Error;

/// Accumulates `(beg, end)` intervals in insertion order and builds an
/// [`ITree`] from them.
///
/// `Builder` is single-owner: callers must serialize calls to
/// [`add`](Builder::add) externally if shared across threads. As intervals
/// are added it tracks whether they arrived in non-decreasing `(beg, end)`
/// order, so that [`build`](Builder::build) can skip sorting entirely when
/// it safely can.
#[derive(Debug, Clone)]
pub struct Builder<K> {
    beg: Vec<K>,
    end: Vec<K>,
    sorted: bool,
}

impl<K> Default for Builder<K> {
    fn default() -> Self {
        Self {
            beg: Vec::new(),
            end: Vec::new(),
            sorted: true,
        }
    }
}

impl<K> Builder<K>
where
    K: Ord + Copy,
{
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty builder with storage reserved for `capacity`
    /// intervals.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            beg: Vec::with_capacity(capacity),
            end: Vec::with_capacity(capacity),
            sorted: true,
        }
    }

    /// The number of intervals accumulated so far.
    pub fn len(&self) -> usize {
        self.beg.len()
    }

    /// Whether no intervals have been accumulated yet.
    pub fn is_empty(&self) -> bool {
        self.beg.is_empty()
    }

    /// Appends the half-open interval `[beg, end)`, returning its stable
    /// insertion ID.
    ///
    /// Fails with [`Error::InvalidInterval`] if `beg > end`, and with
    /// [`Error::CapacityOverflow`] if accumulating this interval would push
    /// the builder past the largest ID it can represent. A rejected
    /// interval is not added; builder state is unchanged on error.
    pub fn add(&mut self, beg: K, end: K) -> Result<usize, Error> {
        if beg > end {
            return Err(Error::InvalidInterval);
        }
        if self.beg.len() == usize::MAX {
            return Err(Error::CapacityOverflow);
        }

        if self.sorted {
            if let (Some(&prev_beg), Some(&prev_end)) = (self.beg.last(), self.end.last()) {
                if (beg, end) < (prev_beg, prev_end) {
                    self.sorted = false;
                }
            }
        }

        let id = self.beg.len();
        self.beg.push(beg);
        self.end.push(end);
        Ok(id)
    }

    /// Consumes the accumulated intervals into an immutable [`ITree`],
    /// resetting the builder back to empty so it can be reused.
    pub fn build(&mut self) -> ITree<K> {
        let n = self.beg.len();
        let beg_buf = mem::take(&mut self.beg);
        let end_buf = mem::take(&mut self.end);
        let sorted = mem::replace(&mut self.sorted, true);

        let (beg, end, perm) = sort::sort(beg_buf, end_buf, sorted);

        let idx = forest::descriptor(n);
        let mut max_end = end.clone();
        augment::build(&beg, &end, &idx, &mut max_end);

        ITree {
            beg,
            end,
            max_end,
            idx,
            perm,
        }
    }

    /// Like [`build`](Builder::build), but sorts and augments using the
    /// current [rayon] thread pool.
    ///
    /// Requires the `rayon` feature.
    #[cfg(feature = "rayon")]
    pub fn par_build(&mut self) -> ITree<K>
    where
        K: Send + Sync,
    {
        let n = self.beg.len();
        let beg_buf = mem::take(&mut self.beg);
        let end_buf = mem::take(&mut self.end);
        let sorted = mem::replace(&mut self.sorted, true);

        let (beg, end, perm) = sort::par_sort(beg_buf, end_buf, sorted);

        let idx = forest::descriptor(n);
        let mut max_end = end.clone();
        augment::par_build(&beg, &end, &idx, &mut max_end);

        ITree {
            beg,
            end,
            max_end,
            idx,
            perm,
        }
    }
}

/// An immutable, flat, augmented interval forest over half-open intervals
/// `[beg, end)` with keys of type `K`.
///
/// Built once by [`Builder::build`] and never mutated afterwards. Every read
/// operation — [`walk`](ITree::walk), [`walk_exact`](ITree::walk_exact), and
/// the sugar built on top of them — takes `&self` and allocates nothing on
/// its own, so a single `ITree` can be queried from as many threads as the
/// caller likes, concurrently, without synchronization.
#[derive(Debug, Default, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ITree<K> {
    beg: Box<[K]>,
    end: Box<[K]>,
    max_end: Box<[K]>,
    idx: Box<[usize]>,
    perm: Option<Box<[usize]>>,
}

impl<K> ITree<K>
where
    K: Ord + Copy,
{
    /// The number of stored intervals.
    pub fn size(&self) -> usize {
        self.beg.len()
    }

    /// Whether the tree holds no intervals.
    pub fn is_empty(&self) -> bool {
        self.beg.is_empty()
    }

    /// The insertion ID of the interval at sorted position `i`.
    ///
    /// Equal to `perm[i]` when a permutation was recorded at build time
    /// (the input wasn't already sorted), or `i` itself otherwise.
    pub fn id(&self, i: usize) -> usize {
        match &self.perm {
            Some(perm) => perm[i],
            None => i,
        }
    }

    /// The `(beg, end)` pair stored at sorted position `i`.
    pub fn interval(&self, i: usize) -> (K, K) {
        (self.beg[i], self.end[i])
    }

    /// Visits every stored position whose interval overlaps `[q_beg,
    /// q_end)`, i.e. `beg < q_end && end > q_beg`.
    ///
    /// `visit` is called once per overlapping sorted position, in the order
    /// documented on the type: slices in ascending order, each slice's
    /// index node before its embedded tree, and each tree in ascending
    /// sorted-position order. `visit` returns `true` to keep walking or
    /// `false` to stop; `walk` itself returns `false` iff `visit` requested
    /// an early stop (it returns `true` when the walk ran to completion,
    /// including when `[q_beg, q_end)` is empty or inverted).
    pub fn walk<F>(&self, q_beg: K, q_end: K, visit: F) -> bool
    where
        F: FnMut(usize) -> bool,
    {
        query::walk(
            &self.beg, &self.end, &self.max_end, &self.idx, q_beg, q_end, visit,
        )
    }

    /// Like [`walk`](ITree::walk), but fanned out across the current
    /// [rayon] thread pool. Visit order across slices and across threads is
    /// unspecified; `visit` may be called concurrently from multiple
    /// threads and must tolerate that.
    ///
    /// Requires the `rayon` feature.
    #[cfg(feature = "rayon")]
    pub fn par_walk<F>(&self, q_beg: K, q_end: K, visit: F) -> bool
    where
        K: Sync,
        F: Fn(usize) -> bool + Sync,
    {
        query::par_walk(
            &self.beg, &self.end, &self.max_end, &self.idx, q_beg, q_end, visit,
        )
    }

    /// Visits every stored position whose interval is exactly `[q_beg,
    /// q_end)`, in ascending sorted-position order (which, for exact
    /// matches, coincides with ascending insertion order).
    ///
    /// Implemented via binary search on the globally `(beg, end)`-sorted
    /// arrays rather than a filtered overlap walk, following the variant
    /// flagged as preferable in the design notes this crate carries
    /// forward.
    pub fn walk_exact<F>(&self, q_beg: K, q_end: K, visit: F) -> bool
    where
        F: FnMut(usize) -> bool,
    {
        query::walk_exact(&self.beg, &self.end, q_beg, q_end, visit)
    }

    /// Visits every stored position in ascending sorted order, regardless
    /// of overlap — a direct iteration over the sorted arrays rather than
    /// an unbounded overlap walk.
    pub fn query_all<F>(&self, mut visit: F) -> bool
    where
        F: FnMut(usize) -> bool,
    {
        for i in 0..self.beg.len() {
            if !visit(i) {
                return false;
            }
        }
        true
    }

    /// Materializes every interval overlapping `[q_beg, q_end)` as
    /// `(beg, end, id)` triples, in the same order [`walk`](ITree::walk)
    /// would visit them.
    pub fn query_overlap(&self, q_beg: K, q_end: K) -> Vec<(K, K, usize)> {
        let mut hits = Vec::new();
        self.walk(q_beg, q_end, |i| {
            hits.push((self.beg[i], self.end[i], self.id(i)));
            true
        });
        hits
    }

    /// Returns the first interval overlapping `[q_beg, q_end)`, or `None`.
    pub fn query_any_overlap(&self, q_beg: K, q_end: K) -> Option<(K, K, usize)> {
        let mut hit = None;
        self.walk(q_beg, q_end, |i| {
            hit = Some((self.beg[i], self.end[i], self.id(i)));
            false
        });
        hit
    }

    /// Whether any stored interval overlaps `[q_beg, q_end)`.
    pub fn query_overlap_exists(&self, q_beg: K, q_end: K) -> bool {
        self.query_any_overlap(q_beg, q_end).is_some()
    }

    /// Debug self-check: asserts the structural invariants the rest of the
    /// type relies on. Intended for tests and explicit `validate()` calls
    /// after deserializing untrusted data, not the query hot path.
    pub fn validate(&self)
    where
        K: std::fmt::Debug,
    {
        let n = self.beg.len();
        assert_eq!(self.end.len(), n, "end[] length does not match beg[]");
        assert_eq!(
            self.max_end.len(),
            n,
            "max_end[] length does not match beg[]"
        );
        if let Some(perm) = &self.perm {
            assert_eq!(perm.len(), n, "perm[] length does not match N");
        }

        for i in 0..n {
            assert!(
                self.beg[i] <= self.end[i],
                "beg > end at sorted position {i}"
            );
            assert!(
                self.max_end[i] >= self.end[i],
                "max_end < end at sorted position {i}"
            );
        }
        for i in 1..n {
            assert!(
                (self.beg[i - 1], self.end[i - 1]) <= (self.beg[i], self.end[i]),
                "sorted order violated between positions {} and {i}",
                i - 1
            );
        }

        assert_eq!(self.idx.first().copied(), Some(0));
        assert_eq!(self.idx.last().copied(), Some(n));
        for w in self.idx.windows(2) {
            assert!(
                n == 0 || (w[1] - w[0]).is_power_of_two(),
                "slice {}..{} is not a power of two",
                w[0],
                w[1]
            );
        }

        if n > 0 {
            let mut expected = self.end.clone();
            augment::build(&self.beg, &self.end, &self.idx, &mut expected);
            assert_eq!(
                expected.as_ref(),
                self.max_end.as_ref(),
                "max_end does not match a fresh augmentation pass"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(intervals: &[(i32, i32)]) -> ITree<i32> {
        let mut builder = Builder::new();
        for &(beg, end) in intervals {
            builder.add(beg, end).unwrap();
        }
        builder.build()
    }

    // S1 (basic three): insert [0,23), [12,34), [34,56).
    #[test]
    fn s1_basic_three() {
        let tree = build(&[(0, 23), (12, 34), (34, 56)]);
        tree.validate();

        assert_eq!(tree.query_overlap(22, 25), vec![(0, 23, 0), (12, 34, 1)]);
        assert_eq!(tree.query_overlap(34, 34), vec![]);
        assert_eq!(tree.query_overlap(33, 34), vec![(12, 34, 1)]);
    }

    // S2 (abutment): half-open semantics at shared boundaries.
    #[test]
    fn s2_abutment() {
        let tree = build(&[(0, 10), (10, 20)]);
        tree.validate();

        assert_eq!(tree.query_overlap(10, 10), vec![]);
        assert_eq!(tree.query_overlap(9, 10), vec![(0, 10, 0)]);
        assert_eq!(tree.query_overlap(10, 11), vec![(10, 20, 1)]);
        assert_eq!(tree.query_overlap(9, 11), vec![(0, 10, 0), (10, 20, 1)]);
    }

    // S3 (unsorted insertion): IDs track insertion order, not sorted position.
    #[test]
    fn s3_unsorted_insertion() {
        let mut builder = Builder::new();
        builder.add(50, 60).unwrap(); // id 0
        builder.add(10, 20).unwrap(); // id 1
        builder.add(30, 40).unwrap(); // id 2
        builder.add(10, 15).unwrap(); // id 3
        let tree = builder.build();
        tree.validate();

        assert_eq!(tree.query_overlap(16, 35), vec![(10, 20, 1), (30, 40, 2)]);
    }

    // S4 (duplicates): sort stability preserves insertion order among equals.
    #[test]
    fn s4_duplicates() {
        let tree = build(&[(5, 7), (5, 7), (5, 7)]);
        tree.validate();

        assert_eq!(tree.query_overlap(6, 6), vec![]);
        assert_eq!(
            tree.query_overlap(5, 6),
            vec![(5, 7, 0), (5, 7, 1), (5, 7, 2)]
        );

        let mut exact = Vec::new();
        tree.walk_exact(5, 7, |i| {
            exact.push(tree.id(i));
            true
        });
        assert_eq!(exact, vec![0, 1, 2]);
    }

    // S5 (N = 7 = 4 + 2 + 1): index-node-first ordering across slices.
    #[test]
    fn s5_index_node_first_across_slices() {
        // sorted positions: 0..4 is the size-4 slice (index node at 0), 4..6
        // is the size-2 slice (index node at 4), 6..7 is the size-1 slice.
        let tree = build(&[
            (0, 100), // pos 0: slice-3 (size 4) index node, huge end
            (1, 2),
            (2, 3),
            (3, 4),
            (10, 20), // pos 4: slice-1 (size 2) index node
            (11, 12),
            (50, 60), // pos 6: slice-0 (size 1)
        ]);
        tree.validate();

        let mut order = Vec::new();
        tree.walk(11, 21, |i| {
            order.push(i);
            true
        });
        // (0,100), (10,20) and (11,12) all overlap [11,21); the slice-3
        // index node at position 0 is reported before slice-1's index
        // node and tree hit, even though position 0's beg is smaller and
        // would not otherwise dictate visit order on its own.
        assert_eq!(order, vec![0, 4, 5]);
    }

    // S6 (early termination): visitor returning false stops the walk at once.
    #[test]
    fn s6_early_termination() {
        let mut builder = Builder::with_capacity(1000);
        for i in 0..1000i32 {
            builder.add(i, i + 5).unwrap();
        }
        let tree = builder.build();
        tree.validate();

        let mut calls = 0;
        let completed = tree.walk(0, 1000, |_| {
            calls += 1;
            false
        });
        assert_eq!(calls, 1);
        assert!(!completed);
    }

    #[test]
    fn empty_tree() {
        let tree: ITree<i32> = Builder::new().build();
        tree.validate();
        assert_eq!(tree.size(), 0);
        assert!(tree.is_empty());
        assert_eq!(tree.query_overlap(0, 10), vec![]);
        assert!(tree.query_all(|_| true));
    }

    #[test]
    fn degenerate_query_is_empty() {
        let tree = build(&[(0, 10)]);
        assert_eq!(tree.query_overlap(5, 5), vec![]);
        assert_eq!(tree.query_overlap(8, 3), vec![]);
    }

    #[test]
    fn add_rejects_inverted_interval() {
        let mut builder: Builder<i32> = Builder::new();
        assert_eq!(builder.add(5, 3), Err(Error::InvalidInterval));
        assert_eq!(builder.len(), 0);
    }

    #[test]
    fn query_any_and_exists() {
        let tree = build(&[(0, 10), (20, 30)]);
        assert_eq!(tree.query_any_overlap(25, 26), Some((20, 30, 1)));
        assert!(tree.query_overlap_exists(25, 26));
        assert!(!tree.query_overlap_exists(15, 16));
        assert_eq!(tree.query_any_overlap(15, 16), None);
    }

    #[test]
    fn query_all_is_sorted_order() {
        let tree = build(&[(5, 7), (1, 2), (3, 9)]);
        let mut seen = Vec::new();
        tree.query_all(|i| {
            seen.push(tree.interval(i));
            true
        });
        assert_eq!(seen, vec![(1, 2), (3, 9), (5, 7)]);
    }

    #[test]
    fn builder_resets_after_build() {
        let mut builder = Builder::new();
        builder.add(1, 2).unwrap();
        let _ = builder.build();
        assert!(builder.is_empty());
        assert_eq!(builder.len(), 0);
    }

    #[test]
    fn sorted_fast_path_matches_permuted_build() {
        let sorted_tree = build(&[(1, 2), (3, 4), (5, 6)]);
        let permuted_tree = build(&[(3, 4), (1, 2), (5, 6)]);

        for &(q_beg, q_end) in &[(0, 10), (2, 4), (4, 5)] {
            let mut sorted_hits: Vec<_> = sorted_tree
                .query_overlap(q_beg, q_end)
                .into_iter()
                .map(|(b, e, _)| (b, e))
                .collect();
            let mut permuted_hits: Vec<_> = permuted_tree
                .query_overlap(q_beg, q_end)
                .into_iter()
                .map(|(b, e, _)| (b, e))
                .collect();
            sorted_hits.sort();
            permuted_hits.sort();
            assert_eq!(sorted_hits, permuted_hits);
        }
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn par_build_matches_serial_build() {
        let intervals: Vec<(i32, i32)> = (0..500).map(|i| (i, i + (i % 7) + 1)).collect();

        let serial = build(&intervals);
        let parallel = {
            let mut builder = Builder::new();
            for &(b, e) in &intervals {
                builder.add(b, e).unwrap();
            }
            builder.par_build()
        };
        parallel.validate();

        for &(q_beg, q_end) in &[(0, 500), (100, 150), (499, 500)] {
            assert_eq!(
                serial.query_overlap(q_beg, q_end),
                parallel.query_overlap(q_beg, q_end)
            );
        }
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn par_walk_matches_walk() {
        use std::sync::Mutex;

        let tree = build(&[(0, 23), (12, 34), (34, 56), (40, 45), (1, 3)]);

        let mut serial = Vec::new();
        tree.walk(10, 40, |i| {
            serial.push(tree.interval(i));
            true
        });

        let parallel = Mutex::new(Vec::new());
        tree.par_walk(10, 40, |i| {
            parallel.lock().unwrap().push(tree.interval(i));
            true
        });
        let mut parallel = parallel.into_inner().unwrap();

        serial.sort();
        parallel.sort();
        assert_eq!(serial, parallel);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_roundtrip() {
        let tree = build(&[(0, 23), (12, 34), (34, 56)]);
        let bytes = serde_json::to_vec(&tree).unwrap();
        let restored: ITree<i32> = serde_json::from_slice(&bytes).unwrap();
        restored.validate();

        for &(q_beg, q_end) in &[(0, 100), (22, 25), (34, 34)] {
            assert_eq!(tree.query_overlap(q_beg, q_end), restored.query_overlap(q_beg, q_end));
        }
    }
}
