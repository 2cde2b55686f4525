//! The augmentation builder: computes the `maxEnd` array over the sorted
//! `beg`/`end` arrays, slice by slice.

/// Fills `max_end[0..n)` from `beg`/`end[0..n)` and the slice boundaries in
/// `idx`, following the per-slice recursion of spec §4.3: an index node
/// followed by a perfect implicit tree whose root is augmented bottom-up.
pub(crate) fn build<K>(beg: &[K], end: &[K], idx: &[usize], max_end: &mut [K])
where
    K: Ord + Copy,
{
    for w in idx.windows(2) {
        let (s, next) = (w[0], w[1]);
        let sz = next - s;

        if sz == 1 {
            max_end[s] = end[s];
            continue;
        }

        let p = sz.trailing_zeros();
        let ofs = s + 1;
        let root = (1usize << (p - 1)) - 1;

        let tree_max = augment_subtree(ofs, root, p - 1, end, max_end);
        max_end[s] = end[s].max(tree_max);
    }
}

/// Recursively augments the subtree rooted at in-tree position `node` (level
/// `lvl`) of the perfect tree with sorted-array offset `ofs`, returning the
/// subtree's maximum `end`. Bottom-up post-order: both children are
/// augmented (and their maxima folded in) before the parent's own `maxEnd`
/// is written.
fn augment_subtree<K>(ofs: usize, node: usize, lvl: u32, end: &[K], max_end: &mut [K]) -> K
where
    K: Ord + Copy,
{
    let j = ofs + node;
    let mut m = end[j];

    if lvl > 0 {
        let half = 1usize << (lvl - 1);
        let left = augment_subtree(ofs, node - half, lvl - 1, end, max_end);
        let right = augment_subtree(ofs, node + half, lvl - 1, end, max_end);
        m = m.max(left).max(right);
    }

    max_end[j] = m;
    m
}

/// Parallel counterpart of [`build`]: recursively halves the slice list
/// and dispatches each half via [`rayon::join`], falling back to the
/// sequential per-slice augmentation ([`augment_subtree`]) once a single
/// slice remains. Each half operates on disjoint sub-slices of `max_end`
/// obtained by splitting at a slice boundary, so no synchronization is
/// needed between the two halves.
#[cfg(feature = "rayon")]
pub(crate) fn par_build<K>(beg: &[K], end: &[K], idx: &[usize], max_end: &mut [K])
where
    K: Ord + Copy + Send + Sync,
{
    if idx.len() < 2 {
        return;
    }

    if idx.len() == 2 {
        let s = idx[0];
        let sz = idx[1] - s;

        if sz == 1 {
            max_end[s] = end[s];
            return;
        }

        let p = sz.trailing_zeros();
        let ofs = s + 1;
        let root = (1usize << (p - 1)) - 1;

        let tree_max = augment_subtree(ofs, root, p - 1, end, max_end);
        max_end[s] = end[s].max(tree_max);
        return;
    }

    let mid = idx.len() / 2;
    let split_pos = idx[mid];

    let (max_l, max_r) = max_end.split_at_mut(split_pos);
    let (beg_l, beg_r) = beg.split_at(split_pos);
    let (end_l, end_r) = end.split_at(split_pos);
    let idx_l = &idx[..=mid];
    let idx_r: Vec<usize> = idx[mid..].iter().map(|&v| v - split_pos).collect();

    rayon::join(
        || par_build(beg_l, end_l, idx_l, max_l),
        || par_build(beg_r, end_r, &idx_r, max_r),
    );
}
