//! The query engine: the outer scan over forest slices plus the recursive
//! in-order traversal of each slice's embedded implicit tree, pruned by
//! `maxEnd`.

#[cfg(feature = "rayon")]
use std::sync::atomic::{AtomicBool, Ordering};

/// Walks every sorted position overlapping `[q_beg, q_end)`, in the order
/// documented on [`crate::ITree::walk`].
///
/// Returns `false` iff `visit` requested an early stop.
pub(crate) fn walk<K, F>(
    beg: &[K],
    end: &[K],
    max_end: &[K],
    idx: &[usize],
    q_beg: K,
    q_end: K,
    mut visit: F,
) -> bool
where
    K: Ord + Copy,
    F: FnMut(usize) -> bool,
{
    if q_beg >= q_end {
        return true;
    }

    let mut stopped = false;
    walk_slices(beg, end, max_end, idx, q_beg, q_end, &mut visit, &mut stopped);
    !stopped
}

fn walk_slices<K, F>(
    beg: &[K],
    end: &[K],
    max_end: &[K],
    idx: &[usize],
    q_beg: K,
    q_end: K,
    visit: &mut F,
    stopped: &mut bool,
) where
    K: Ord + Copy,
    F: FnMut(usize) -> bool,
{
    for w in idx.windows(2) {
        let i = w[0];
        let sz = w[1] - i;

        // Every later slice's index node has a beg >= this one's (index
        // nodes are themselves in sorted position), so once one index node
        // is past the query's end, nothing further can overlap.
        if beg[i] >= q_end {
            return;
        }
        if max_end[i] <= q_beg {
            continue;
        }

        if end[i] > q_beg && !visit(i) {
            *stopped = true;
            return;
        }

        if sz > 1 {
            let p = sz.trailing_zeros();
            let root = (1usize << (p - 1)) - 1;
            if !walk_tree(beg, end, max_end, i + 1, root, p - 1, q_beg, q_end, visit) {
                *stopped = true;
                return;
            }
        }
    }
}

/// In-order traversal of the implicit tree rooted at in-tree position
/// `node` (level `lvl`), whose sorted-array offset is `ofs`. Returns
/// `false` iff `visit` requested a stop, in which case the caller must
/// propagate it immediately.
fn walk_tree<K, F>(
    beg: &[K],
    end: &[K],
    max_end: &[K],
    ofs: usize,
    node: usize,
    lvl: u32,
    q_beg: K,
    q_end: K,
    visit: &mut F,
) -> bool
where
    K: Ord + Copy,
    F: FnMut(usize) -> bool,
{
    let j = ofs + node;

    if max_end[j] <= q_beg {
        return true;
    }

    if lvl > 0 {
        let half = 1usize << (lvl - 1);
        if !walk_tree(beg, end, max_end, ofs, node - half, lvl - 1, q_beg, q_end, visit) {
            return false;
        }
    }

    if beg[j] < q_end {
        if end[j] > q_beg && !visit(j) {
            return false;
        }
        if lvl > 0 {
            let half = 1usize << (lvl - 1);
            if !walk_tree(beg, end, max_end, ofs, node + half, lvl - 1, q_beg, q_end, visit) {
                return false;
            }
        }
    }

    true
}

/// Binary-searches the globally `(beg, end)`-sorted arrays for exact
/// matches, per the binary-search variant flagged as preferred.
pub(crate) fn walk_exact<K, F>(beg: &[K], end: &[K], q_beg: K, q_end: K, mut visit: F) -> bool
where
    K: Ord + Copy,
    F: FnMut(usize) -> bool,
{
    let lo = lower_bound(beg, end, q_beg, q_end);
    let hi = upper_bound(beg, end, q_beg, q_end);

    for i in lo..hi {
        if !visit(i) {
            return false;
        }
    }
    true
}

fn lower_bound<K: Ord + Copy>(beg: &[K], end: &[K], q_beg: K, q_end: K) -> usize {
    let mut lo = 0;
    let mut hi = beg.len();
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if (beg[mid], end[mid]) < (q_beg, q_end) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

fn upper_bound<K: Ord + Copy>(beg: &[K], end: &[K], q_beg: K, q_end: K) -> usize {
    let mut lo = 0;
    let mut hi = beg.len();
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if (beg[mid], end[mid]) <= (q_beg, q_end) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Parallel counterpart of [`walk`], fanned out across forest slices via
/// [`rayon::join`]. Visit order across slices is unspecified; `visit` may
/// be invoked concurrently and is responsible for its own synchronization.
#[cfg(feature = "rayon")]
pub(crate) fn par_walk<K, F>(
    beg: &[K],
    end: &[K],
    max_end: &[K],
    idx: &[usize],
    q_beg: K,
    q_end: K,
    visit: F,
) -> bool
where
    K: Ord + Copy + Sync,
    F: Fn(usize) -> bool + Sync,
{
    if q_beg >= q_end {
        return true;
    }

    let stopped = AtomicBool::new(false);
    par_walk_slices(beg, end, max_end, idx, q_beg, q_end, &visit, &stopped);
    !stopped.load(Ordering::Relaxed)
}

#[cfg(feature = "rayon")]
fn par_walk_slices<K, F>(
    beg: &[K],
    end: &[K],
    max_end: &[K],
    idx: &[usize],
    q_beg: K,
    q_end: K,
    visit: &F,
    stopped: &AtomicBool,
) where
    K: Ord + Copy + Sync,
    F: Fn(usize) -> bool + Sync,
{
    if idx.len() < 2 || stopped.load(Ordering::Relaxed) {
        return;
    }

    if idx.len() == 2 {
        let i = idx[0];
        let sz = idx[1] - i;

        if max_end[i] <= q_beg {
            return;
        }

        if end[i] > q_beg && !visit(i) {
            stopped.store(true, Ordering::Relaxed);
            return;
        }

        if sz > 1 {
            let p = sz.trailing_zeros();
            let root = (1usize << (p - 1)) - 1;
            par_walk_tree(
                beg, end, max_end, i + 1, root, p - 1, q_beg, q_end, visit, stopped,
            );
        }
        return;
    }

    let mid = idx.len() / 2;
    let split_pos = idx[mid];

    let (beg_l, beg_r) = beg.split_at(split_pos);
    let (end_l, end_r) = end.split_at(split_pos);
    let (max_l, max_r) = max_end.split_at(split_pos);
    let idx_l = &idx[..=mid];
    let idx_r: Vec<usize> = idx[mid..].iter().map(|&v| v - split_pos).collect();

    rayon::join(
        || par_walk_slices(beg_l, end_l, max_l, idx_l, q_beg, q_end, visit, stopped),
        || par_walk_slices(beg_r, end_r, max_r, &idx_r, q_beg, q_end, visit, stopped),
    );
}

#[cfg(feature = "rayon")]
#[allow(clippy::too_many_arguments)]
fn par_walk_tree<K, F>(
    beg: &[K],
    end: &[K],
    max_end: &[K],
    ofs: usize,
    node: usize,
    lvl: u32,
    q_beg: K,
    q_end: K,
    visit: &F,
    stopped: &AtomicBool,
) where
    K: Ord + Copy + Sync,
    F: Fn(usize) -> bool + Sync,
{
    if stopped.load(Ordering::Relaxed) {
        return;
    }

    let j = ofs + node;
    if max_end[j] <= q_beg {
        return;
    }

    if lvl > 0 {
        let half = 1usize << (lvl - 1);
        par_walk_tree(
            beg,
            end,
            max_end,
            ofs,
            node - half,
            lvl - 1,
            q_beg,
            q_end,
            visit,
            stopped,
        );
        if stopped.load(Ordering::Relaxed) {
            return;
        }
    }

    if beg[j] < q_end {
        if end[j] > q_beg && !visit(j) {
            stopped.store(true, Ordering::Relaxed);
            return;
        }
        if lvl > 0 {
            let half = 1usize << (lvl - 1);
            par_walk_tree(
                beg,
                end,
                max_end,
                ofs,
                node + half,
                lvl - 1,
                q_beg,
                q_end,
                visit,
                stopped,
            );
        }
    }
}
