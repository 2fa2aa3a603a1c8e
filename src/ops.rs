//! Operations behind each subcommand.
//!
//! Each `op_*` function is a pure, synchronous wrapper around one or more
//! `algo` modules. Parameters are checked before any numerical work,
//! documents with nothing to contribute are skipped and counted, and the
//! result comes back as report sheets. Writing them is left to the caller,
//! so a failed run never leaves a partial report behind.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::algo::cooccur;
use crate::algo::glove::{Glove, GloveParams};
use crate::algo::keywords::{self, KeywordGroup};
use crate::algo::lexicon::{Lexicon, POSNEG_CATEGORIES};
use crate::algo::tokenizer::Document;
use crate::algo::topics::TopicMethod;
use crate::algo::vocab::{self, FrequencyTable};
use crate::error::{Result, TextlensError};
use crate::input::Record;
use crate::model::DocModel;
use crate::report::Table;

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Report sheets plus the number of input documents left out of them.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub sheets: Vec<(String, Table)>,
    pub skipped: usize,
}

/// Row label: the document's name, else its input position.
pub fn doc_label(name: Option<&str>, position: usize) -> String {
    name.map_or_else(|| position.to_string(), str::to_string)
}

/// Labels and word lists of documents that have at least one word.
fn non_empty_bags(docs: &[Document]) -> (Vec<String>, Vec<Vec<String>>, usize) {
    let mut labels = Vec::new();
    let mut bags = Vec::new();
    for (i, doc) in docs.iter().enumerate().filter(|(_, d)| !d.is_empty()) {
        labels.push(doc_label(doc.name.as_deref(), i));
        bags.push(doc.words.clone());
    }
    let skipped = docs.len() - bags.len();
    (labels, bags, skipped)
}

fn require_documents(kept: usize, op: &str) -> Result<()> {
    if kept == 0 {
        return Err(TextlensError::EmptyInput(format!(
            "{op}: no document has any usable tokens"
        )));
    }
    Ok(())
}

fn log_skipped(op: &str, skipped: usize) {
    if skipped > 0 {
        warn!(op, skipped, "skipped documents with nothing to count");
    }
}

/// Occurrences of each column term in each bag.
fn count_table(labels: Vec<String>, columns: Vec<String>, bags: &[Vec<String>]) -> Result<Table> {
    let rows = bags
        .iter()
        .map(|bag| {
            let mut counts: HashMap<&str, usize> = HashMap::new();
            for token in bag {
                *counts.entry(token.as_str()).or_insert(0) += 1;
            }
            columns
                .iter()
                .map(|c| counts.get(c.as_str()).copied().unwrap_or(0) as f64)
                .collect()
        })
        .collect();
    Table::numeric(labels, columns, rows)
}

fn count_sheet(name: &str, table: Table, human_readable: bool) -> (String, Table) {
    if human_readable {
        (format!("human{name}"), table.human_readable())
    } else {
        (name.to_string(), table)
    }
}

// ── Operations ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct WordcountArgs {
    /// Count exactly these words. Otherwise every word reaching `min_tf`.
    pub words: Option<Vec<String>>,
    pub min_tf: usize,
    pub human_readable: bool,
}

impl Default for WordcountArgs {
    fn default() -> Self {
        Self {
            words: None,
            min_tf: 1,
            human_readable: false,
        }
    }
}

pub fn op_wordcount(docs: &[Document], args: &WordcountArgs) -> Result<Outcome> {
    match &args.words {
        Some(words) if words.is_empty() => {
            return Err(TextlensError::config("no words given to count"));
        }
        None if args.min_tf == 0 => {
            return Err(TextlensError::config("min_tf must be positive when counting all words"));
        }
        _ => {}
    }

    let (labels, bags, skipped) = non_empty_bags(docs);
    require_documents(bags.len(), "wordcount")?;
    log_skipped("wordcount", skipped);

    let columns = match &args.words {
        Some(words) => words.clone(),
        None => {
            let terms = vocab::count_vocab(&bags, args.min_tf);
            if terms.is_empty() {
                return Err(TextlensError::config(format!(
                    "no word occurs at least {} times",
                    args.min_tf
                )));
            }
            info!(words = terms.len(), min_tf = args.min_tf, "kept words to count");
            terms
        }
    };

    let table = count_table(labels, columns, &bags)?;
    Ok(Outcome {
        sheets: vec![count_sheet("counts", table, args.human_readable)],
        skipped,
    })
}

/// Entity types left out unless `use_types` or `ignore_types` says otherwise.
pub const DEFAULT_IGNORED_TYPES: [&str; 7] = [
    "DATE", "TIME", "PERCENT", "MONEY", "QUANTITY", "ORDINAL", "CARDINAL",
];

#[derive(Debug, Clone)]
pub struct EntityArgs {
    pub min_tf: usize,
    /// Keep only these types. Exclusive with `ignore_types`.
    pub use_types: Option<Vec<String>>,
    /// Drop these types instead of [`DEFAULT_IGNORED_TYPES`].
    pub ignore_types: Option<Vec<String>>,
    pub human_readable: bool,
}

impl Default for EntityArgs {
    fn default() -> Self {
        Self {
            min_tf: 1,
            use_types: None,
            ignore_types: None,
            human_readable: false,
        }
    }
}

/// Key under which surface forms are merged: ASCII punctuation and spaces
/// removed, uppercased. "U.S." and "US" share a key.
pub fn base_text(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_ascii_punctuation() && *c != ' ')
        .flat_map(char::to_uppercase)
        .collect()
}

pub fn op_entities(records: &[Record], args: &EntityArgs) -> Result<Outcome> {
    if args.use_types.is_some() && args.ignore_types.is_some() {
        return Err(TextlensError::config(
            "use_types and ignore_types cannot both be given",
        ));
    }
    if args.min_tf == 0 {
        return Err(TextlensError::config("min_tf must be positive"));
    }

    let upper =
        |types: &[String]| -> Vec<String> { types.iter().map(|t| t.to_uppercase()).collect() };
    let use_types = args.use_types.as_deref().map(upper);
    let ignore_types = match &args.ignore_types {
        Some(types) => upper(types),
        None => DEFAULT_IGNORED_TYPES.iter().map(|t| t.to_string()).collect(),
    };
    let keep = |label: &str| {
        let label = label.to_uppercase();
        match &use_types {
            Some(types) => types.contains(&label),
            None => !ignore_types.contains(&label),
        }
    };

    // base text -> first surface form seen
    let mut canonical: HashMap<String, String> = HashMap::new();
    let mut labels = Vec::new();
    let mut bags = Vec::new();
    for (i, record) in records.iter().enumerate() {
        let names: Vec<String> = record
            .entities
            .iter()
            .filter(|m| keep(&m.label))
            .map(|m| {
                canonical
                    .entry(base_text(&m.text))
                    .or_insert_with(|| m.text.clone())
                    .clone()
            })
            .collect();
        if !names.is_empty() {
            labels.push(doc_label(record.name.as_deref(), i));
            bags.push(names);
        }
    }
    let skipped = records.len() - bags.len();
    require_documents(bags.len(), "entities")?;
    log_skipped("entities", skipped);

    let entities = vocab::count_vocab(&bags, args.min_tf);
    if entities.is_empty() {
        return Err(TextlensError::config(format!(
            "no entities reached the count threshold {}",
            args.min_tf
        )));
    }
    info!(entities = entities.len(), "kept entities to count");

    let table = count_table(labels, entities, &bags)?;
    Ok(Outcome {
        sheets: vec![count_sheet("ents", table, args.human_readable)],
        skipped,
    })
}

#[derive(Debug, Clone)]
pub struct SentimentArgs {
    /// Score only positive and negative emotion.
    pub posneg_only: bool,
    /// Divide category counts by document length.
    pub normalize: bool,
    pub human_readable: bool,
}

impl Default for SentimentArgs {
    fn default() -> Self {
        Self {
            posneg_only: false,
            normalize: true,
            human_readable: false,
        }
    }
}

/// Per-document category scores (`report`) and their per-category
/// statistics (`summary`).
pub fn op_sentiment(
    docs: &[Document],
    lexicon: &dyn Lexicon,
    args: &SentimentArgs,
) -> Result<Outcome> {
    let categories: Vec<String> = if args.posneg_only {
        POSNEG_CATEGORIES.iter().map(|c| c.to_string()).collect()
    } else {
        lexicon.categories()
    };
    if let Some(missing) = categories.iter().find(|c| lexicon.count(c, &[]).is_none()) {
        return Err(TextlensError::config(format!(
            "lexicon has no category '{missing}'"
        )));
    }

    let (labels, bags, skipped) = non_empty_bags(docs);
    require_documents(bags.len(), "sentiment")?;
    log_skipped("sentiment", skipped);

    let rows = bags
        .iter()
        .map(|bag| lexicon.analyze(bag, &categories, args.normalize))
        .collect::<Result<Vec<_>>>()?;
    let table = Table::numeric(labels, categories, rows)?;
    let summary = table.summary();
    let report = if args.human_readable {
        table.human_readable()
    } else {
        table
    };
    Ok(Outcome {
        sheets: vec![("report".into(), report), ("summary".into(), summary)],
        skipped,
    })
}

#[derive(Debug, Clone)]
pub struct TopicArgs {
    pub n_topics: usize,
    /// Algorithm and its parameters, seed included.
    pub method: TopicMethod,
    /// Minimum number of documents a term must appear in.
    pub min_tf: usize,
    pub save_wordmatrix: bool,
}

pub fn op_topicmodel(docs: &[Document], args: &TopicArgs) -> Result<Outcome> {
    if args.n_topics == 0 {
        return Err(TextlensError::config("number of topics must be positive"));
    }
    let (labels, bags, empty) = non_empty_bags(docs);
    require_documents(bags.len(), "topicmodel")?;

    let terms: HashSet<String> = vocab::document_frequency_vocab(&bags, args.min_tf)
        .into_iter()
        .collect();
    if terms.is_empty() {
        return Err(TextlensError::config(format!(
            "no term appears in at least {} documents",
            args.min_tf
        )));
    }
    // Documents whose every term was pruned have no row to fit.
    let (labels, bags): (Vec<String>, Vec<Vec<String>>) = labels
        .into_iter()
        .zip(bags)
        .filter(|(_, bag)| bag.iter().any(|t| terms.contains(t)))
        .unzip();
    let skipped = docs.len() - bags.len();
    if args.n_topics >= bags.len() {
        return Err(TextlensError::config(format!(
            "number of topics ({}) must be less than the number of documents ({})",
            args.n_topics,
            bags.len()
        )));
    }
    if skipped > empty {
        warn!(
            op = "topicmodel",
            pruned = skipped - empty,
            min_df = args.min_tf,
            "skipped documents left without terms after pruning"
        );
    }
    log_skipped("topicmodel", empty);

    let matrix = args.method.doc_term(&bags, args.min_tf);
    info!(
        method = args.method.name(),
        topics = args.n_topics,
        docs = matrix.n_docs(),
        terms = matrix.n_terms(),
        "fitting topic model"
    );

    let fit = args.method.fit(&matrix, args.n_topics)?;
    for topic in 0..fit.k {
        let top: Vec<String> = fit.top_terms(topic, 5).into_iter().map(|(t, _)| t).collect();
        debug!(topic, terms = ?top, "top terms");
    }

    let model = DocModel::from_factorization(fit, Some(labels))?;
    Ok(Outcome {
        sheets: model.tables("topic", args.save_wordmatrix)?,
        skipped,
    })
}

#[derive(Debug, Clone)]
pub struct GloveArgs {
    /// Training parameters; `n_dim` is the embedding size.
    pub params: GloveParams,
    /// Tokens must occur more than this many times to enter the vocabulary.
    pub min_tf: usize,
    pub window: usize,
    /// Re-base the embedding on these directions. Empty keeps the natural basis.
    pub keywords: Vec<KeywordGroup>,
    pub save_wordmatrix: bool,
}

impl Default for GloveArgs {
    fn default() -> Self {
        Self {
            params: GloveParams::default(),
            min_tf: 0,
            window: cooccur::DEFAULT_WINDOW,
            keywords: vec![],
            save_wordmatrix: true,
        }
    }
}

pub fn op_glove(docs: &[Document], args: &GloveArgs) -> Result<Outcome> {
    let n_dim = args.params.n_dim;
    if n_dim == 0 {
        return Err(TextlensError::config("number of dimensions must be positive"));
    }
    if args.window == 0 {
        return Err(TextlensError::config("co-occurrence window must be positive"));
    }

    let kept: Vec<(String, &Document)> = docs
        .iter()
        .enumerate()
        .filter(|(_, d)| !d.sentences.is_empty())
        .map(|(i, d)| (doc_label(d.name.as_deref(), i), d))
        .collect();
    require_documents(kept.len(), "glove")?;
    if n_dim >= kept.len() {
        return Err(TextlensError::config(format!(
            "number of dimensions ({n_dim}) must be less than the number of documents ({})",
            kept.len()
        )));
    }

    let sentences = || kept.iter().flat_map(|(_, d)| d.sentences.iter().map(Vec::as_slice));
    let table = FrequencyTable::from_sentences(sentences());
    let cutoff = vocab::calc_cutoff(&table.frequencies(), args.min_tf)?;
    let mut terms = table.vocab_above(args.min_tf);
    terms.truncate(cutoff);
    if terms.is_empty() {
        return Err(TextlensError::config(format!(
            "no token occurs more than {} times",
            args.min_tf
        )));
    }
    keywords::check_vocabulary(&args.keywords, &terms)?;

    let full = cooccur::cooccurrence(sentences(), &table.dictionary(), args.window);
    let cooc = cooccur::restrict(&full, terms.len());
    info!(vocab = terms.len(), entries = cooc.nnz(), "built co-occurrence matrix");

    let glove = Glove::fit(&cooc, &args.params)?;
    info!(loss = glove.final_loss, "trained embedding");
    let embedding = keywords::supervised(glove.into_embedding(terms)?, &args.keywords)?;

    let labels: Vec<String> = kept.iter().map(|(label, _)| label.clone()).collect();
    let words: Vec<Vec<String>> = kept.iter().map(|(_, d)| d.words.clone()).collect();
    let vectors = embedding.document_vectors(&words);
    let skipped = docs.len() - kept.len() + vectors.skipped.len();
    require_documents(vectors.vectors.len(), "glove")?;
    log_skipped("glove", skipped);

    let model = DocModel::from_embedding(&embedding, vectors, Some(&labels))?;
    Ok(Outcome {
        sheets: model.tables("dimension", args.save_wordmatrix)?,
        skipped,
    })
}
