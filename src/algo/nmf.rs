use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::algo::doc_term::DocTermMatrix;
use crate::algo::topics::Factorization;
use crate::error::{Result, TextlensError};

/// NMF stopping and seeding parameters.
#[derive(Debug, Clone)]
pub struct NmfParams {
    /// Maximum iterations (default: 200).
    pub max_iter: usize,
    /// Stop once the relative drop in reconstruction error falls below this.
    pub tol: f64,
    /// Seed for the random initialisation of W and H.
    pub seed: u64,
}

impl Default for NmfParams {
    fn default() -> Self {
        Self {
            max_iter: 200,
            tol: 1e-4,
            seed: 0,
        }
    }
}

const EPS: f64 = 1e-10;

/// Non-negative Matrix Factorization for topic modeling.
///
/// Given a document-term matrix V (n_docs × n_terms), usually tf-idf
/// weighted, decompose into:
///   V ≈ W × H
/// where W (n_docs × k) represents document-topic weights
/// and H (k × n_terms) represents topic-term weights.
///
/// Uses multiplicative update rules (Lee & Seung, 2001).
pub fn nmf(matrix: &DocTermMatrix, k: usize, params: &NmfParams) -> Result<Factorization> {
    let n_docs = matrix.n_docs();
    let n_terms = matrix.n_terms();
    if k == 0 {
        return Err(TextlensError::config("number of topics must be positive"));
    }
    if n_docs == 0 || n_terms == 0 || matrix.is_all_zero() {
        return Err(TextlensError::fit(format!(
            "NMF received a degenerate {n_docs}x{n_terms} matrix with no positive entries"
        )));
    }

    let v = matrix.sparse_rows();
    let v_norm_sq: f64 = v.iter().flatten().map(|(_, x)| x * x).sum();
    let mean = v.iter().flatten().map(|(_, x)| x).sum::<f64>() / (n_docs * n_terms) as f64;

    // Random positive start scaled so that W × H has the same mean as V
    let scale = (mean / k as f64).sqrt();
    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut w: Vec<Vec<f64>> = (0..n_docs)
        .map(|_| (0..k).map(|_| scale * rng.gen_range(0.01..2.0)).collect())
        .collect();
    let mut h: Vec<Vec<f64>> = (0..k)
        .map(|_| (0..n_terms).map(|_| scale * rng.gen_range(0.01..2.0)).collect())
        .collect();

    let initial_error = reconstruction_error(&v, v_norm_sq, &w, &h);
    let mut previous_error = initial_error;

    for iter in 0..params.max_iter {
        // Update H: H = H * (W^T V) / (W^T W H)
        let wt_v = sparse_transpose_a(&w, &v, k, n_terms);
        let wtw = mat_mul_transpose_a(&w, &w, k);
        let wtw_h = mat_mul(&wtw, &h);
        for i in 0..k {
            for j in 0..n_terms {
                h[i][j] *= wt_v[i][j] / (wtw_h[i][j] + EPS);
            }
        }

        // Update W: W = W * (V H^T) / (W H H^T)
        let v_ht = sparse_transpose_b(&v, &h);
        let hht = mat_mul_transpose_b(&h, &h);
        let w_hht = mat_mul(&w, &hht);
        for i in 0..n_docs {
            for j in 0..k {
                w[i][j] *= v_ht[i][j] / (w_hht[i][j] + EPS);
            }
        }

        if (iter + 1) % 10 == 0 {
            let error = reconstruction_error(&v, v_norm_sq, &w, &h);
            if !error.is_finite() {
                return Err(TextlensError::fit(format!(
                    "NMF diverged at iteration {}",
                    iter + 1
                )));
            }
            debug!(iteration = iter + 1, error, "nmf progress");
            if initial_error > 0.0 && (previous_error - error) / initial_error < params.tol {
                debug!(iteration = iter + 1, "nmf converged");
                break;
            }
            previous_error = error;
        }
    }

    if w.iter().chain(h.iter()).flatten().any(|x| !x.is_finite()) {
        return Err(TextlensError::fit("NMF produced non-finite factors"));
    }

    Ok(Factorization {
        doc_topics: w,
        topic_terms: h,
        vocabulary: matrix.vocab.clone(),
        k,
    })
}

// Frobenius norm ||V - WH||, expanded so V stays sparse.
fn reconstruction_error(
    v: &[Vec<(usize, f64)>],
    v_norm_sq: f64,
    w: &[Vec<f64>],
    h: &[Vec<f64>],
) -> f64 {
    let k = h.len();
    let mut cross = 0.0;
    for (d, row) in v.iter().enumerate() {
        for &(t, x) in row {
            let wh: f64 = (0..k).map(|z| w[d][z] * h[z][t]).sum();
            cross += x * wh;
        }
    }
    let wtw = mat_mul_transpose_a(w, w, k);
    let hht = mat_mul_transpose_b(h, h);
    let mut wh_sq = 0.0;
    for i in 0..k {
        for j in 0..k {
            wh_sq += wtw[i][j] * hht[i][j];
        }
    }
    (v_norm_sq - 2.0 * cross + wh_sq).max(0.0).sqrt()
}

// W^T × V where V is sparse (m × p) by rows, result is (n × p)
fn sparse_transpose_a(
    w: &[Vec<f64>],
    v: &[Vec<(usize, f64)>],
    n: usize,
    p: usize,
) -> Vec<Vec<f64>> {
    let mut result = vec![vec![0.0; p]; n];
    for (d, row) in v.iter().enumerate() {
        for &(t, x) in row {
            for i in 0..n {
                result[i][t] += w[d][i] * x;
            }
        }
    }
    result
}

// V × H^T where V is sparse (m × n) by rows and H is (p × n), result is (m × p)
fn sparse_transpose_b(v: &[Vec<(usize, f64)>], h: &[Vec<f64>]) -> Vec<Vec<f64>> {
    v.iter()
        .map(|row| {
            h.iter()
                .map(|h_row| row.iter().map(|&(t, x)| x * h_row[t]).sum())
                .collect()
        })
        .collect()
}

// A^T × B where A is (m × n) and B is (m × p), result is (n × p)
fn mat_mul_transpose_a(a: &[Vec<f64>], b: &[Vec<f64>], n: usize) -> Vec<Vec<f64>> {
    let p = b.first().map_or(0, Vec::len);
    let mut result = vec![vec![0.0; p]; n];
    for (a_row, b_row) in a.iter().zip(b) {
        for i in 0..n {
            for j in 0..p {
                result[i][j] += a_row[i] * b_row[j];
            }
        }
    }
    result
}

// A × B where A is (m × n), B is (n × p)
fn mat_mul(a: &[Vec<f64>], b: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let p = b.first().map_or(0, Vec::len);
    a.iter()
        .map(|a_row| {
            (0..p)
                .map(|j| a_row.iter().zip(b).map(|(x, b_row)| x * b_row[j]).sum())
                .collect()
        })
        .collect()
}

// A × B^T where A is (m × n) and B is (p × n), result is (m × p)
fn mat_mul_transpose_b(a: &[Vec<f64>], b: &[Vec<f64>]) -> Vec<Vec<f64>> {
    a.iter()
        .map(|a_row| {
            b.iter()
                .map(|b_row| a_row.iter().zip(b_row).map(|(x, y)| x * y).sum())
                .collect()
        })
        .collect()
}
