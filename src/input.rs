//! Corpus loading from `.json`, `.csv` and `.txt` files.
//!
//! - `.json`: an array of objects (or a single object). The text lives in the
//!   text column; an optional `entities` array holds pre-annotated mentions
//!   as `{"text": ..., "label": ...}`.
//! - `.csv`: a header row naming the text column.
//! - `.txt` (or anything else): the whole file is one document named after
//!   the file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::{Result, TextlensError};

/// JSON field holding pre-annotated entity mentions.
pub const ENTITY_FIELD: &str = "entities";

/// A named-entity mention: surface text plus entity type (`PERSON`, `ORG`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMention {
    pub text: String,
    #[serde(alias = "type")]
    pub label: String,
}

impl EntityMention {
    pub fn new(text: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
        }
    }
}

/// One input document before annotation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub text: String,
    pub name: Option<String>,
    pub entities: Vec<EntityMention>,
}

/// Documents in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    pub records: Vec<Record>,
}

impl Corpus {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn texts(&self) -> Vec<String> {
        self.records.iter().map(|r| r.text.clone()).collect()
    }

    /// Labels for every document, or `None` if any document is unlabelled.
    pub fn names(&self) -> Option<Vec<String>> {
        self.records.iter().map(|r| r.name.clone()).collect()
    }
}

/// Load and concatenate every file. An empty result is an error.
pub fn load_corpus(paths: &[String], textcol: &str, doclabelcol: Option<&str>) -> Result<Corpus> {
    let mut corpus = Corpus::default();
    for path in paths {
        let records = load_file(Path::new(path), textcol, doclabelcol)?;
        info!(path = %path, documents = records.len(), "loaded input");
        corpus.records.extend(records);
    }
    if corpus.is_empty() {
        return Err(TextlensError::EmptyInput("no documents in the input files".into()));
    }
    Ok(corpus)
}

pub fn load_file(path: &Path, textcol: &str, doclabelcol: Option<&str>) -> Result<Vec<Record>> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "json" => parse_json(&std::fs::read_to_string(path)?, textcol, doclabelcol),
        "csv" => parse_csv(std::fs::File::open(path)?, textcol, doclabelcol),
        _ => {
            let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
            Ok(vec![Record {
                text: std::fs::read_to_string(path)?,
                name,
                entities: vec![],
            }])
        }
    }
}

pub fn parse_json(json: &str, textcol: &str, doclabelcol: Option<&str>) -> Result<Vec<Record>> {
    let rows = match serde_json::from_str::<Value>(json)? {
        Value::Array(rows) => rows,
        single => vec![single],
    };
    rows.iter()
        .enumerate()
        .map(|(i, row)| -> Result<Record> {
            let text = row.get(textcol).and_then(Value::as_str).ok_or_else(|| {
                TextlensError::config(format!("record {i} has no text field '{textcol}'"))
            })?;
            let name = doclabelcol.and_then(|col| row.get(col)).map(label_text);
            let entities = match row.get(ENTITY_FIELD) {
                Some(v) => serde_json::from_value(v.clone())?,
                None => vec![],
            };
            Ok(Record {
                text: text.to_string(),
                name,
                entities,
            })
        })
        .collect()
}

pub fn parse_csv<R: std::io::Read>(
    reader: R,
    textcol: &str,
    doclabelcol: Option<&str>,
) -> Result<Vec<Record>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name);
    let text_idx = column(textcol)
        .ok_or_else(|| TextlensError::config(format!("CSV input has no column '{textcol}'")))?;
    let label_idx = match doclabelcol {
        Some(col) => Some(
            column(col)
                .ok_or_else(|| TextlensError::config(format!("CSV input has no column '{col}'")))?,
        ),
        None => None,
    };

    let mut records = Vec::new();
    for row in rdr.records() {
        let row = row?;
        records.push(Record {
            text: row.get(text_idx).unwrap_or("").to_string(),
            name: label_idx.and_then(|i| row.get(i)).map(str::to_string),
            entities: vec![],
        });
    }
    Ok(records)
}

// Labels may be numbers in JSON input.
fn label_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
