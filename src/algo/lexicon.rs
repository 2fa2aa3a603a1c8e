//! Category lexicons for lexicon-based sentiment scoring.

use std::collections::{HashMap, HashSet};

use crate::error::{Result, TextlensError};

/// Categories used when only positive/negative emotion is requested.
pub const POSNEG_CATEGORIES: [&str; 2] = ["positive_emotion", "negative_emotion"];

/// Scores token lists against named word categories.
pub trait Lexicon {
    /// All category names, in a stable order.
    fn categories(&self) -> Vec<String>;

    /// Number of tokens in `tokens` belonging to `category`.
    fn count(&self, category: &str, tokens: &[String]) -> Option<usize>;

    /// One score per requested category. With `normalize`, counts are
    /// divided by the number of tokens.
    fn analyze(
        &self,
        tokens: &[String],
        categories: &[String],
        normalize: bool,
    ) -> Result<Vec<f64>> {
        categories
            .iter()
            .map(|c| -> Result<f64> {
                let n = self.count(c, tokens).ok_or_else(|| {
                    TextlensError::config(format!("lexicon has no category '{c}'"))
                })?;
                Ok(if normalize && !tokens.is_empty() {
                    n as f64 / tokens.len() as f64
                } else {
                    n as f64
                })
            })
            .collect()
    }
}

/// Lexicon read from a JSON object mapping category names to word lists.
#[derive(Debug, Clone, Default)]
pub struct JsonLexicon {
    names: Vec<String>,
    words: HashMap<String, HashSet<String>>,
}

impl JsonLexicon {
    pub fn parse(json: &str) -> Result<Self> {
        let raw: HashMap<String, Vec<String>> = serde_json::from_str(json)?;
        if raw.is_empty() {
            return Err(TextlensError::config("lexicon defines no categories"));
        }
        let mut names: Vec<String> = raw.keys().cloned().collect();
        names.sort();
        let words = raw
            .into_iter()
            .map(|(cat, ws)| (cat, ws.into_iter().map(|w| w.to_lowercase()).collect()))
            .collect();
        Ok(Self { names, words })
    }

    pub fn load(path: &str) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| TextlensError::config(format!("failed to read lexicon '{path}': {e}")))?;
        Self::parse(&json)
    }
}

impl Lexicon for JsonLexicon {
    fn categories(&self) -> Vec<String> {
        self.names.clone()
    }

    fn count(&self, category: &str, tokens: &[String]) -> Option<usize> {
        let words = self.words.get(category)?;
        Some(tokens.iter().filter(|t| words.contains(t.as_str())).count())
    }
}
