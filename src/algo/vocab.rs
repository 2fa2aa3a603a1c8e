//! Frequency-sorted vocabularies and the minimum-frequency cutoff.

use std::collections::HashMap;

use crate::error::{Result, TextlensError};

/// Corpus term frequencies, sorted descending. Ties keep first-seen order.
#[derive(Debug, Clone, Default)]
pub struct FrequencyTable {
    entries: Vec<(String, usize)>,
}

impl FrequencyTable {
    /// Count every token of every sentence.
    pub fn from_sentences<'a, I>(sentences: I) -> Self
    where
        I: IntoIterator<Item = &'a [String]>,
    {
        Self::from_tokens(sentences.into_iter().flatten())
    }

    /// Count every token of every bag-of-words document.
    pub fn from_documents(docs: &[Vec<String>]) -> Self {
        Self::from_tokens(docs.iter().flatten())
    }

    fn from_tokens<'a, I>(tokens: I) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut entries: Vec<(String, usize)> = Vec::new();
        for token in tokens {
            match index.get(token.as_str()) {
                Some(&i) => entries[i].1 += 1,
                None => {
                    index.insert(token.as_str(), entries.len());
                    entries.push((token.clone(), 1));
                }
            }
        }
        // sort_by is stable, so equal counts stay in first-seen order
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(String, usize)] {
        &self.entries
    }

    pub fn frequencies(&self) -> Vec<usize> {
        self.entries.iter().map(|(_, f)| *f).collect()
    }

    /// Token -> position in the sorted table, over the full table.
    pub fn dictionary(&self) -> HashMap<String, usize> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, (w, _))| (w.clone(), i))
            .collect()
    }

    /// Tokens seen strictly more than `min_tf` times, in table order.
    pub fn vocab_above(&self, min_tf: usize) -> Vec<String> {
        self.entries
            .iter()
            .take_while(|(_, f)| *f > min_tf)
            .map(|(w, _)| w.clone())
            .collect()
    }
}

/// Index of the first entry to cut from a descending frequency list.
///
/// Entries before the index have frequency strictly greater than `min_tf`.
/// A `min_tf` at or below the smallest frequency keeps everything, one above
/// the largest frequency is a configuration error.
pub fn calc_cutoff(freqs: &[usize], min_tf: usize) -> Result<usize> {
    let (Some(&largest), Some(&smallest)) = (freqs.first(), freqs.last()) else {
        return Err(TextlensError::config("cannot compute a cutoff for an empty vocabulary"));
    };
    if min_tf > largest {
        return Err(TextlensError::config(format!(
            "cutoff {min_tf} is larger than largest frequency {largest}"
        )));
    }
    if min_tf <= smallest {
        return Ok(freqs.len());
    }
    Ok(freqs.iter().take_while(|&&f| f > min_tf).count())
}

/// Terms appearing in at least `min_df` documents, ordered by corpus frequency.
pub fn document_frequency_vocab(docs: &[Vec<String>], min_df: usize) -> Vec<String> {
    let mut doc_freq: HashMap<&str, usize> = HashMap::new();
    for doc in docs {
        let mut seen: Vec<&str> = doc.iter().map(String::as_str).collect();
        seen.sort_unstable();
        seen.dedup();
        for term in seen {
            *doc_freq.entry(term).or_insert(0) += 1;
        }
    }
    FrequencyTable::from_documents(docs)
        .entries
        .into_iter()
        .filter(|(w, _)| doc_freq.get(w.as_str()).copied().unwrap_or(0) >= min_df)
        .map(|(w, _)| w)
        .collect()
}

/// Terms with corpus frequency of at least `min_tf`, in first-seen order.
pub fn count_vocab(docs: &[Vec<String>], min_tf: usize) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for token in docs.iter().flatten() {
        let c = counts.entry(token.as_str()).or_insert(0);
        if *c == 0 {
            order.push(token.as_str());
        }
        *c += 1;
    }
    order
        .into_iter()
        .filter(|w| counts[w] >= min_tf)
        .map(str::to_string)
        .collect()
}
