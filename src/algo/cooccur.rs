//! Windowed word-word co-occurrence counts for embedding training.

use std::collections::HashMap;

use sprs::{CsMat, TriMat};

/// Window used by the GloVe pipeline.
pub const DEFAULT_WINDOW: usize = 10;

/// Symmetric co-occurrence matrix over `dictionary`.
///
/// Two tokens `d` positions apart within a sentence (`1 <= d <= window`) add
/// `1/d` to both `(i, j)` and `(j, i)`. Tokens missing from the dictionary are
/// dropped before windowing.
pub fn cooccurrence<'a, I>(
    sentences: I,
    dictionary: &HashMap<String, usize>,
    window: usize,
) -> CsMat<f64>
where
    I: IntoIterator<Item = &'a [String]>,
{
    let n = dictionary.len();
    let mut pairs: HashMap<(usize, usize), f64> = HashMap::new();

    for sentence in sentences {
        let ids: Vec<usize> = sentence
            .iter()
            .filter_map(|w| dictionary.get(w).copied())
            .collect();
        for (pos, &center) in ids.iter().enumerate() {
            let end = pos.saturating_add(window).saturating_add(1).min(ids.len());
            for (offset, &context) in ids[pos + 1..end].iter().enumerate() {
                let weight = 1.0 / (offset + 1) as f64;
                *pairs.entry((center, context)).or_insert(0.0) += weight;
                if context != center {
                    *pairs.entry((context, center)).or_insert(0.0) += weight;
                }
            }
        }
    }

    let mut tri: TriMat<f64> = TriMat::with_capacity((n, n), pairs.len());
    let mut entries: Vec<((usize, usize), f64)> = pairs.into_iter().collect();
    entries.sort_by_key(|&(k, _)| k);
    for ((i, j), v) in entries {
        tri.add_triplet(i, j, v);
    }
    tri.to_csr()
}

/// Keep only rows and columns below `cutoff`.
pub fn restrict(matrix: &CsMat<f64>, cutoff: usize) -> CsMat<f64> {
    let cutoff = cutoff.min(matrix.rows()).min(matrix.cols());
    let mut tri: TriMat<f64> = TriMat::new((cutoff, cutoff));
    for (i, row) in matrix.outer_iterator().enumerate().take(cutoff) {
        for (j, &v) in row.iter() {
            if j < cutoff {
                tri.add_triplet(i, j, v);
            }
        }
    }
    tri.to_csr()
}

/// Non-zero entries as `(row, col, value)` in row-major order.
pub fn entries(matrix: &CsMat<f64>) -> Vec<(usize, usize, f64)> {
    let mut out = Vec::with_capacity(matrix.nnz());
    for (i, row) in matrix.outer_iterator().enumerate() {
        for (j, &v) in row.iter() {
            out.push((i, j, v));
        }
    }
    out
}
