//! Algorithm-agnostic result of a topic model or embedding run.

use std::path::{Path, PathBuf};

use crate::algo::embedding::{DocumentVectors, Embedding};
use crate::algo::topics::Factorization;
use crate::error::{Result, TextlensError};
use crate::report::{self, Table};

/// Document features, feature-term weights, vocabulary and document labels.
#[derive(Debug, Clone, PartialEq)]
pub struct DocModel {
    doc_features: Vec<Vec<f64>>,
    feature_terms: Vec<Vec<f64>>,
    vocab: Vec<String>,
    docnames: Vec<String>,
}

impl DocModel {
    /// `docnames` labels the rows of `doc_features`; pass `None` to label by position.
    pub fn new(
        doc_features: Vec<Vec<f64>>,
        feature_terms: Vec<Vec<f64>>,
        vocab: Vec<String>,
        docnames: Option<Vec<String>>,
    ) -> Result<Self> {
        let docnames = docnames
            .unwrap_or_else(|| (0..doc_features.len()).map(|i| i.to_string()).collect());
        if docnames.len() != doc_features.len() {
            return Err(TextlensError::config(format!(
                "{} document names for {} documents",
                docnames.len(),
                doc_features.len()
            )));
        }
        if let Some(row) = feature_terms.iter().find(|r| r.len() != vocab.len()) {
            return Err(TextlensError::config(format!(
                "feature row has {} terms but vocabulary has {}",
                row.len(),
                vocab.len()
            )));
        }
        let n_features = feature_terms.len();
        if doc_features.iter().any(|r| r.len() != n_features) {
            return Err(TextlensError::config(
                "document feature rows do not match the number of features",
            ));
        }
        Ok(Self {
            doc_features,
            feature_terms,
            vocab,
            docnames,
        })
    }

    /// Wrap a topic decomposition. `docnames` follows the matrix rows.
    pub fn from_factorization(f: Factorization, docnames: Option<Vec<String>>) -> Result<Self> {
        Self::new(f.doc_topics, f.topic_terms, f.vocabulary, docnames)
    }

    /// Wrap an embedding and the document vectors derived from it.
    /// `docnames` covers every input document; skipped ones are dropped.
    pub fn from_embedding(
        embedding: &Embedding,
        docs: DocumentVectors,
        docnames: Option<&[String]>,
    ) -> Result<Self> {
        let names = match docnames {
            Some(names) => docs
                .kept
                .iter()
                .map(|&i| names.get(i).cloned())
                .collect::<Option<Vec<_>>>(),
            None => Some(docs.kept.iter().map(|i| i.to_string()).collect()),
        }
        .ok_or_else(|| TextlensError::config("fewer document names than documents"))?;
        Self::new(
            docs.vectors,
            embedding.dimension_terms(),
            embedding.vocab().to_vec(),
            Some(names),
        )
    }

    pub fn n_features(&self) -> usize {
        self.feature_terms.len()
    }

    pub fn feature_terms(&self) -> &[Vec<f64>] {
        &self.feature_terms
    }

    pub fn docnames(&self) -> &[String] {
        &self.docnames
    }

    fn feature_labels(&self, featurename: &str) -> Vec<String> {
        (0..self.n_features()).map(|i| format!("{featurename}{i}")).collect()
    }

    /// `doc_features`, and `feature_terms` when `save_wordmatrix` is set.
    pub fn tables(&self, featurename: &str, save_wordmatrix: bool) -> Result<Vec<(String, Table)>> {
        let labels = self.feature_labels(featurename);
        let mut sheets = vec![(
            "doc_features".to_string(),
            Table::numeric(self.docnames.clone(), labels.clone(), self.doc_features.clone())?,
        )];
        if save_wordmatrix {
            sheets.push((
                "feature_terms".to_string(),
                Table::numeric(labels, self.vocab.clone(), self.feature_terms.clone())?,
            ));
        }
        Ok(sheets)
    }

    pub fn write_report(
        &self,
        path: &Path,
        featurename: &str,
        save_wordmatrix: bool,
        fallback: bool,
    ) -> Result<Vec<PathBuf>> {
        report::write_report(path, &self.tables(featurename, save_wordmatrix)?, fallback)
    }
}
