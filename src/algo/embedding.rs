//! Word embeddings and the document vectors averaged from them.

use std::collections::HashMap;

use crate::error::{Result, TextlensError};

/// Word vectors indexed by vocabulary position.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    vocab: Vec<String>,
    index: HashMap<String, usize>,
    vectors: Vec<Vec<f64>>,
}

/// Mean vectors of the documents that had at least one known token.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentVectors {
    pub vectors: Vec<Vec<f64>>,
    /// Input positions of `vectors`, in order.
    pub kept: Vec<usize>,
    /// Input positions of documents with no in-vocabulary token.
    pub skipped: Vec<usize>,
}

impl Embedding {
    pub fn new(vocab: Vec<String>, vectors: Vec<Vec<f64>>) -> Result<Self> {
        if vocab.len() != vectors.len() {
            return Err(TextlensError::config(format!(
                "vocabulary has {} entries but there are {} vectors",
                vocab.len(),
                vectors.len()
            )));
        }
        let dim = vectors.first().map_or(0, Vec::len);
        if vectors.iter().any(|v| v.len() != dim) {
            return Err(TextlensError::config("word vectors differ in length"));
        }
        let index = vocab
            .iter()
            .enumerate()
            .map(|(i, w)| (w.clone(), i))
            .collect();
        Ok(Self {
            vocab,
            index,
            vectors,
        })
    }

    pub fn dim(&self) -> usize {
        self.vectors.first().map_or(0, Vec::len)
    }

    pub fn len(&self) -> usize {
        self.vocab.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocab.is_empty()
    }

    pub fn vocab(&self) -> &[String] {
        &self.vocab
    }

    pub fn vector(&self, word: &str) -> Option<&[f64]> {
        self.index.get(word).map(|&i| self.vectors[i].as_slice())
    }

    /// Arithmetic mean of the vectors of known tokens, skipping unknown ones.
    /// `None` when no token is in the vocabulary.
    pub fn document_vector(&self, tokens: &[String]) -> Option<Vec<f64>> {
        let mut sum = vec![0.0; self.dim()];
        let mut n = 0usize;
        for v in tokens.iter().filter_map(|t| self.vector(t)) {
            for (s, x) in sum.iter_mut().zip(v) {
                *s += x;
            }
            n += 1;
        }
        if n == 0 {
            return None;
        }
        for s in sum.iter_mut() {
            *s /= n as f64;
        }
        Some(sum)
    }

    pub fn document_vectors(&self, docs: &[Vec<String>]) -> DocumentVectors {
        let mut out = DocumentVectors::default();
        for (i, doc) in docs.iter().enumerate() {
            match self.document_vector(doc) {
                Some(v) => {
                    out.vectors.push(v);
                    out.kept.push(i);
                }
                None => out.skipped.push(i),
            }
        }
        out
    }

    /// Scalar projection of `word` onto `direction`.
    pub fn projection(&self, word: &str, direction: &[f64]) -> Option<f64> {
        let v = self.vector(word)?;
        let norm = dot(direction, direction).sqrt();
        if norm == 0.0 {
            return None;
        }
        Some(dot(v, direction) / norm)
    }

    /// `(dim × vocab)` matrix; entry `(d, t)` is term `t` projected on unit vector `e_d`.
    pub fn dimension_terms(&self) -> Vec<Vec<f64>> {
        let dim = self.dim();
        (0..dim)
            .map(|d| {
                let mut e = vec![0.0; dim];
                e[d] = 1.0;
                self.vocab
                    .iter()
                    .map(|w| self.projection(w, &e).unwrap_or(0.0))
                    .collect()
            })
            .collect()
    }

    /// Express every word in a new basis: coordinate `k` is `v · basis[k]`.
    /// The result has one dimension per basis vector.
    pub fn rebase(&self, basis: &[Vec<f64>]) -> Result<Embedding> {
        if basis.is_empty() {
            return Err(TextlensError::config("a new basis needs at least one direction"));
        }
        if let Some(b) = basis.iter().find(|b| b.len() != self.dim()) {
            return Err(TextlensError::config(format!(
                "basis vector has {} dimensions, embedding has {}",
                b.len(),
                self.dim()
            )));
        }
        let vectors = self
            .vectors
            .iter()
            .map(|v| basis.iter().map(|b| dot(v, b)).collect())
            .collect();
        Ok(Self {
            vocab: self.vocab.clone(),
            index: self.index.clone(),
            vectors,
        })
    }
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy() -> Embedding {
        Embedding::new(
            vec!["a".into(), "b".into(), "c".into()],
            vec![vec![1.0, 0.0], vec![3.0, 0.0], vec![0.0, 2.0]],
        )
        .unwrap()
    }

    fn toks(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn document_vector_is_mean() {
        assert_eq!(toy().document_vector(&toks(&["a", "b"])), Some(vec![2.0, 0.0]));
    }

    #[test]
    fn unknown_tokens_ignored() {
        assert_eq!(
            toy().document_vector(&toks(&["a", "zzz", "b"])),
            Some(vec![2.0, 0.0])
        );
    }

    #[test]
    fn empty_documents_flagged() {
        let e = toy();
        assert_eq!(e.document_vector(&toks(&["zzz"])), None);
        let dv = e.document_vectors(&[toks(&["c"]), toks(&["nope"]), toks(&["a"])]);
        assert_eq!(dv.kept, vec![0, 2]);
        assert_eq!(dv.skipped, vec![1]);
        assert_eq!(dv.vectors.len(), 2);
    }

    #[test]
    fn dimension_terms_are_components() {
        let dt = toy().dimension_terms();
        assert_eq!(dt, vec![vec![1.0, 3.0, 0.0], vec![0.0, 0.0, 2.0]]);
    }

    #[test]
    fn rebase_changes_dimensionality() {
        let e = toy();
        let rebased = e.rebase(&[vec![0.6, 0.8], vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        assert_eq!(rebased.dim(), 3);
        assert_eq!(rebased.vector("c"), Some(&[1.6, 0.0, 2.0][..]));
        assert_eq!(rebased.dimension_terms().len(), 3);
    }

    #[test]
    fn rebase_rejects_wrong_width() {
        assert!(toy().rebase(&[vec![1.0, 0.0, 0.0]]).is_err());
        assert!(toy().rebase(&[]).is_err());
    }

    #[test]
    fn mismatched_lengths_rejected() {
        assert!(Embedding::new(vec!["a".into()], vec![]).is_err());
    }
}
