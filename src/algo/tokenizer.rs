use rayon::prelude::*;
use unicode_segmentation::UnicodeSegmentation;

/// One annotated document. Produced once by an [`Annotator`] and never mutated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    /// Label from the input, if any. Otherwise the document is known by position.
    pub name: Option<String>,
    /// Bag-of-words view, in text order.
    pub words: Vec<String>,
    /// Sentence view: the same tokens grouped by sentence.
    pub sentences: Vec<Vec<String>>,
}

impl Document {
    pub fn from_words(words: Vec<String>) -> Self {
        let sentences = if words.is_empty() { vec![] } else { vec![words.clone()] };
        Self {
            name: None,
            words,
            sentences,
        }
    }

    pub fn from_sentences(sentences: Vec<Vec<String>>) -> Self {
        let words = sentences.iter().flatten().cloned().collect();
        Self {
            name: None,
            words,
            sentences,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Turns raw text into word and sentence token lists.
pub trait Annotator: Sync {
    fn words(&self, text: &str) -> Vec<String>;

    fn sentences(&self, text: &str) -> Vec<Vec<String>>;

    fn annotate(&self, text: &str) -> Document {
        Document::from_sentences(self.sentences(text))
    }

    /// Annotate a whole corpus in parallel, keeping input order.
    fn annotate_all(&self, texts: &[String], names: Option<&[String]>) -> Vec<Document> {
        let mut docs: Vec<Document> = texts.par_iter().map(|t| self.annotate(t)).collect();
        if let Some(names) = names {
            for (doc, name) in docs.iter_mut().zip(names) {
                doc.name = Some(name.clone());
            }
        }
        docs
    }
}

/// UAX #29 word and sentence segmentation, lowercased.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeAnnotator {
    pub drop_stopwords: bool,
}

impl UnicodeAnnotator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stopwords_removed() -> Self {
        Self {
            drop_stopwords: true,
        }
    }

    fn keep(&self, word: &str) -> bool {
        use_token(word) && !(self.drop_stopwords && is_stopword(word))
    }
}

impl Annotator for UnicodeAnnotator {
    fn words(&self, text: &str) -> Vec<String> {
        text.unicode_words()
            .flat_map(split_clitic)
            .map(|w| w.to_lowercase())
            .filter(|w| self.keep(w))
            .collect()
    }

    fn sentences(&self, text: &str) -> Vec<Vec<String>> {
        text.unicode_sentences()
            .map(|s| self.words(s))
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// "john's" -> "john", "'s". UAX #29 keeps these together.
fn split_clitic(word: &str) -> Vec<&str> {
    match word.find('\'') {
        Some(pos) if pos > 0 => vec![&word[..pos], &word[pos..]],
        _ => vec![word],
    }
}

/// Alphabetic tokens, or an apostrophe followed by letters ("'s", "'re").
pub fn use_token(word: &str) -> bool {
    let rest = word.strip_prefix('\'').unwrap_or(word);
    !rest.is_empty() && rest.chars().all(char::is_alphabetic)
}

fn is_stopword(word: &str) -> bool {
    matches!(
        word,
        "a" | "an" | "the" | "is" | "it" | "of" | "to" | "in" | "for" | "on" | "with"
        | "at" | "by" | "from" | "as" | "or" | "and" | "but" | "not" | "be" | "are"
        | "was" | "were" | "been" | "being" | "have" | "has" | "had" | "do" | "does"
        | "did" | "will" | "would" | "could" | "should" | "may" | "might" | "shall"
        | "can" | "this" | "that" | "these" | "those" | "there" | "here" | "where"
        | "when" | "what" | "which" | "who" | "whom" | "how" | "all" | "each" | "every"
        | "both" | "few" | "more" | "most" | "other" | "some" | "such" | "no" | "nor"
        | "only" | "own" | "same" | "so" | "than" | "too" | "very" | "just" | "because"
        | "about" | "into" | "through" | "during" | "before" | "after" | "above" | "below"
        | "between" | "under" | "again" | "further" | "then" | "once" | "any" | "its"
        | "your" | "our" | "their" | "his" | "her" | "my" | "if" | "up" | "out" | "also"
    )
}
