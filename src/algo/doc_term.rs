use std::collections::HashMap;

use sprs::{CsMat, TriMat};

use crate::algo::vocab;

/// Sparse documents × terms matrix with its column vocabulary.
#[derive(Debug, Clone)]
pub struct DocTermMatrix {
    /// CSR, one row per document in input order.
    pub matrix: CsMat<f64>,
    /// Column index -> term.
    pub vocab: Vec<String>,
}

impl DocTermMatrix {
    pub fn n_docs(&self) -> usize {
        self.matrix.rows()
    }

    pub fn n_terms(&self) -> usize {
        self.matrix.cols()
    }

    /// Each row as `(term index, value)` pairs.
    pub fn sparse_rows(&self) -> Vec<Vec<(usize, f64)>> {
        self.matrix
            .outer_iterator()
            .map(|row| row.iter().map(|(c, &v)| (c, v)).collect())
            .collect()
    }

    pub fn is_all_zero(&self) -> bool {
        self.matrix.data().iter().all(|&v| v == 0.0)
    }
}

/// Raw term counts over terms found in at least `min_df` documents.
pub fn count_matrix(docs: &[Vec<String>], min_df: usize) -> DocTermMatrix {
    let vocab = vocab::document_frequency_vocab(docs, min_df);
    let rows = count_rows(docs, &vocab);
    let mut tri: TriMat<f64> = TriMat::new((docs.len(), vocab.len()));
    for (d, row) in rows.iter().enumerate() {
        for &(t, count) in row {
            tri.add_triplet(d, t, count);
        }
    }
    DocTermMatrix {
        matrix: tri.to_csr(),
        vocab,
    }
}

/// tf-idf weights with smooth idf `ln((1 + n) / (1 + df)) + 1`, rows L2-normalised.
pub fn tfidf_matrix(docs: &[Vec<String>], min_df: usize) -> DocTermMatrix {
    let vocab = vocab::document_frequency_vocab(docs, min_df);
    let rows = count_rows(docs, &vocab);
    let n = docs.len() as f64;

    let mut df = vec![0usize; vocab.len()];
    for row in &rows {
        for &(t, _) in row {
            df[t] += 1;
        }
    }
    let idf: Vec<f64> = df
        .iter()
        .map(|&d| ((1.0 + n) / (1.0 + d as f64)).ln() + 1.0)
        .collect();

    let mut tri: TriMat<f64> = TriMat::new((docs.len(), vocab.len()));
    for (d, row) in rows.iter().enumerate() {
        let weighted: Vec<(usize, f64)> = row.iter().map(|&(t, c)| (t, c * idf[t])).collect();
        let norm = weighted.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        for (t, w) in weighted {
            tri.add_triplet(d, t, if norm > 0.0 { w / norm } else { w });
        }
    }
    DocTermMatrix {
        matrix: tri.to_csr(),
        vocab,
    }
}

// Per-document (term index, count) pairs sorted by term index.
fn count_rows(docs: &[Vec<String>], vocab: &[String]) -> Vec<Vec<(usize, f64)>> {
    let index: HashMap<&str, usize> = vocab
        .iter()
        .enumerate()
        .map(|(i, t)| (t.as_str(), i))
        .collect();
    docs.iter()
        .map(|doc| {
            let mut counts: HashMap<usize, f64> = HashMap::new();
            for token in doc {
                if let Some(&t) = index.get(token.as_str()) {
                    *counts.entry(t).or_insert(0.0) += 1.0;
                }
            }
            let mut row: Vec<(usize, f64)> = counts.into_iter().collect();
            row.sort_by_key(|&(t, _)| t);
            row
        })
        .collect()
}
