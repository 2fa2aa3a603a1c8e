//! Keyword-guided re-basing of an embedding space.
//!
//! Each keyword group names one new basis direction: the sum of its word
//! vectors, with any rejection directions projected out, normalised to unit
//! length. Words and documents are then expressed in that basis.
//!
//! Text form: groups are separated by `;`, words by `,`, and each `|` starts
//! a rejection direction made of the words that follow it:
//!
//! ```text
//! king,queen;man,woman|king,queen
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::algo::embedding::{dot, Embedding};
use crate::error::{Result, TextlensError};

/// One target direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordGroup {
    pub words: Vec<String>,
    /// Each entry is one direction (sum of its words) to remove.
    #[serde(default)]
    pub reject: Vec<Vec<String>>,
}

impl KeywordGroup {
    pub fn new(words: &[&str]) -> Self {
        Self {
            words: words.iter().map(|w| w.to_string()).collect(),
            reject: vec![],
        }
    }

    pub fn rejecting(mut self, words: &[&str]) -> Self {
        self.reject.push(words.iter().map(|w| w.to_string()).collect());
        self
    }

    /// Display label, e.g. `king+queen`.
    pub fn label(&self) -> String {
        self.words.join("+")
    }
}

/// Parse the `;` / `,` / `|` text form.
pub fn parse_keywords(text: &str) -> Result<Vec<KeywordGroup>> {
    let mut groups = Vec::new();
    for group in text.split(';').map(str::trim).filter(|g| !g.is_empty()) {
        let mut parts = group.split('|');
        let words = split_words(parts.next().unwrap_or(""));
        if words.is_empty() {
            return Err(TextlensError::config(format!(
                "keyword group '{group}' names no words"
            )));
        }
        let mut reject = Vec::new();
        for part in parts {
            let r = split_words(part);
            if r.is_empty() {
                return Err(TextlensError::config(format!(
                    "keyword group '{group}' has an empty rejection"
                )));
            }
            reject.push(r);
        }
        groups.push(KeywordGroup { words, reject });
    }
    if groups.is_empty() {
        return Err(TextlensError::config("no keyword groups given"));
    }
    Ok(groups)
}

/// Parse keyword groups from JSON: `[{"words": [...], "reject": [[...]]}]`.
pub fn parse_keywords_json(json: &str) -> Result<Vec<KeywordGroup>> {
    let groups: Vec<KeywordGroup> = serde_json::from_str(json)?;
    if groups.is_empty() || groups.iter().any(|g| g.words.is_empty()) {
        return Err(TextlensError::config("every keyword group needs at least one word"));
    }
    Ok(groups)
}

/// Load keyword groups from a file, JSON if it ends in `.json`, text form otherwise.
pub fn load_keywords(path: &str) -> Result<Vec<KeywordGroup>> {
    let content = std::fs::read_to_string(path)?;
    if path.ends_with(".json") {
        parse_keywords_json(&content)
    } else {
        parse_keywords(content.trim())
    }
}

fn split_words(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(String::from)
        .collect()
}

/// Every keyword must be in the vocabulary. Checked before any vector math.
pub fn validate(embedding: &Embedding, groups: &[KeywordGroup]) -> Result<()> {
    check_vocabulary(groups, embedding.vocab())
}

/// Same check against a bare vocabulary, so it can run before training.
pub fn check_vocabulary(groups: &[KeywordGroup], vocab: &[String]) -> Result<()> {
    let known: HashSet<&str> = vocab.iter().map(String::as_str).collect();
    for group in groups {
        for word in group.words.iter().chain(group.reject.iter().flatten()) {
            if !known.contains(word.as_str()) {
                return Err(TextlensError::config(format!(
                    "keyword '{word}' is not in the vocabulary"
                )));
            }
        }
    }
    Ok(())
}

/// Unit basis vectors, one per group.
///
/// Rejection directions of a group are first made mutually orthogonal
/// (Gram-Schmidt), then each is rejected from the summed direction.
pub fn build_basis(embedding: &Embedding, groups: &[KeywordGroup]) -> Result<Vec<Vec<f64>>> {
    validate(embedding, groups)?;
    let mut basis = Vec::with_capacity(groups.len());
    for group in groups {
        let mut direction = sum_vectors(embedding, &group.words);
        let rejections: Vec<Vec<f64>> = group
            .reject
            .iter()
            .map(|words| sum_vectors(embedding, words))
            .collect();
        for u in gram_schmidt(&rejections) {
            direction = reject(&direction, &u);
        }
        let norm = dot(&direction, &direction).sqrt();
        if norm <= f64::EPSILON {
            return Err(TextlensError::fit(format!(
                "keyword direction '{}' vanishes after rejection",
                group.label()
            )));
        }
        basis.push(direction.into_iter().map(|x| x / norm).collect());
    }
    Ok(basis)
}

/// Re-express the embedding in the keyword basis. No groups leaves it unchanged.
pub fn supervised(embedding: Embedding, groups: &[KeywordGroup]) -> Result<Embedding> {
    if groups.is_empty() {
        return Ok(embedding);
    }
    let basis = build_basis(&embedding, groups)?;
    debug!(from = embedding.dim(), to = basis.len(), "re-basing embedding on keywords");
    embedding.rebase(&basis)
}

fn sum_vectors(embedding: &Embedding, words: &[String]) -> Vec<f64> {
    let mut sum = vec![0.0; embedding.dim()];
    for v in words.iter().filter_map(|w| embedding.vector(w)) {
        for (s, x) in sum.iter_mut().zip(v) {
            *s += x;
        }
    }
    sum
}

/// Component of `v` orthogonal to `u`: `v - (v·u / u·u) u`.
pub fn reject(v: &[f64], u: &[f64]) -> Vec<f64> {
    let uu = dot(u, u);
    if uu == 0.0 {
        return v.to_vec();
    }
    let scale = dot(v, u) / uu;
    v.iter().zip(u).map(|(a, b)| a - scale * b).collect()
}

// Orthogonal (not normalised) vectors spanning the same space; drops dependent ones.
fn gram_schmidt(vectors: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let mut out: Vec<Vec<f64>> = Vec::new();
    for v in vectors {
        let mut w = v.clone();
        for u in &out {
            w = reject(&w, u);
        }
        if dot(&w, &w) > 1e-12 {
            out.push(w);
        }
    }
    out
}
