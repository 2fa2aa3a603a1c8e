use crate::algo::doc_term::{self, DocTermMatrix};
use crate::algo::lda::{self, LdaParams};
use crate::algo::nmf::{self, NmfParams};
use crate::error::Result;

/// Output of a topic decomposition: `V ≈ doc_topics × topic_terms`.
#[derive(Debug, Clone, PartialEq)]
pub struct Factorization {
    /// Document-topic weights (n_docs × k).
    pub doc_topics: Vec<Vec<f64>>,
    /// Topic-term weights (k × n_terms).
    pub topic_terms: Vec<Vec<f64>>,
    /// Column index -> term.
    pub vocabulary: Vec<String>,
    /// Number of topics.
    pub k: usize,
}

impl Factorization {
    /// Top N terms for topic t.
    pub fn top_terms(&self, topic: usize, n: usize) -> Vec<(String, f64)> {
        if topic >= self.k {
            return vec![];
        }
        let row = &self.topic_terms[topic];
        let mut indexed: Vec<(usize, f64)> = row.iter().copied().enumerate().collect();
        indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        indexed
            .into_iter()
            .take(n)
            .map(|(i, w)| (self.vocabulary[i].clone(), w))
            .collect()
    }

    /// Dominant topic for each document.
    pub fn dominant_topics(&self) -> Vec<usize> {
        self.doc_topics
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                    .map(|(i, _)| i)
                    .unwrap_or(0)
            })
            .collect()
    }
}

/// Topic decomposition strategy.
#[derive(Debug, Clone)]
pub enum TopicMethod {
    /// Variational Bayes LDA over raw counts. Topic rows sum to 1.
    Lda(LdaParams),
    /// Multiplicative-update NMF over tf-idf weights.
    Nmf(NmfParams),
}

impl TopicMethod {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "lda" => Some(Self::Lda(LdaParams::default())),
            "nmf" => Some(Self::Nmf(NmfParams::default())),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Lda(_) => "lda",
            Self::Nmf(_) => "nmf",
        }
    }

    /// Build the document-term matrix this method expects.
    pub fn doc_term(&self, docs: &[Vec<String>], min_df: usize) -> DocTermMatrix {
        match self {
            Self::Lda(_) => doc_term::count_matrix(docs, min_df),
            Self::Nmf(_) => doc_term::tfidf_matrix(docs, min_df),
        }
    }

    pub fn fit(&self, matrix: &DocTermMatrix, k: usize) -> Result<Factorization> {
        match self {
            Self::Lda(params) => lda::lda(matrix, k, params),
            Self::Nmf(params) => nmf::nmf(matrix, k, params),
        }
    }
}
