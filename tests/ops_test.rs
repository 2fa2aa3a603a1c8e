use textlens::algo::glove::GloveParams;
use textlens::algo::keywords::KeywordGroup;
use textlens::algo::lexicon::JsonLexicon;
use textlens::algo::tokenizer::{Annotator, Document, UnicodeAnnotator};
use textlens::algo::topics::TopicMethod;
use textlens::input::{EntityMention, Record};
use textlens::ops::{self, EntityArgs, GloveArgs, SentimentArgs, TopicArgs, WordcountArgs};
use textlens::report::{Cell, Table};
use textlens::TextlensError;

fn words(tokens: &[&str]) -> Document {
    Document::from_words(tokens.iter().map(|t| t.to_string()).collect())
}

fn annotate(texts: &[&str]) -> Vec<Document> {
    let texts: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
    UnicodeAnnotator::new().annotate_all(&texts, None)
}

fn numbers(table: &Table) -> Vec<Vec<f64>> {
    table
        .rows
        .iter()
        .map(|r| r.iter().filter_map(Cell::as_f64).collect())
        .collect()
}

fn topic_corpus() -> Vec<Document> {
    annotate(&[
        "Rust compiles fast systems code. The borrow checker keeps memory safe.",
        "Memory safety in Rust comes from ownership and the borrow checker.",
        "Systems programmers like Rust for speed and memory control.",
        "The browser renders HTML and CSS. JavaScript makes web pages interactive.",
        "Web design uses CSS layouts and HTML markup in the browser.",
        "JavaScript frameworks build web pages that run in every browser.",
    ])
}

fn glove_corpus() -> Vec<Document> {
    annotate(&[
        "The cat chased the dog. The dog chased the cat.",
        "A cat and a dog are pets. Pets sleep at home.",
        "The car drove down the road. The road was long.",
        "A car needs a road. The driver drove the car home.",
        "The dog and the cat sleep. The car is parked on the road.",
        "Pets like the cat and the dog. The driver likes the road.",
        "The cat sat. The dog sat. The car stopped on the road.",
    ])
}

// ── Wordcount ────────────────────────────────────────────────────────────────

#[test]
fn ops_wordcount_end_to_end() {
    let docs = vec![
        words(&["x", "x", "y"]),
        words(&["y", "y", "z"]),
        words(&["x", "z", "z"]),
    ];
    let args = WordcountArgs {
        min_tf: 1,
        ..WordcountArgs::default()
    };
    let outcome = ops::op_wordcount(&docs, &args).unwrap();
    assert_eq!(outcome.skipped, 0);
    assert_eq!(outcome.sheets.len(), 1);
    let (name, table) = &outcome.sheets[0];
    assert_eq!(name, "counts");
    assert_eq!(table.columns, vec!["x", "y", "z"]);
    assert_eq!(table.index, vec!["0", "1", "2"]);
    assert_eq!(
        numbers(table),
        vec![vec![2.0, 1.0, 0.0], vec![0.0, 2.0, 1.0], vec![1.0, 0.0, 2.0]]
    );
    for j in 0..3 {
        assert_eq!(table.column_values(j).iter().sum::<f64>(), 3.0);
    }
}

#[test]
fn ops_wordcount_fixed_words() {
    let docs = vec![words(&["a", "b", "a"]), words(&["c"])];
    let args = WordcountArgs {
        words: Some(vec!["a".into(), "missing".into()]),
        ..WordcountArgs::default()
    };
    let outcome = ops::op_wordcount(&docs, &args).unwrap();
    let table = &outcome.sheets[0].1;
    assert_eq!(table.columns, vec!["a", "missing"]);
    assert_eq!(numbers(table), vec![vec![2.0, 0.0], vec![0.0, 0.0]]);
}

#[test]
fn ops_wordcount_skips_empty_documents() {
    let docs = vec![
        words(&["x", "y"]).named("first"),
        Document::default(),
        words(&["x"]).named("third"),
    ];
    let outcome = ops::op_wordcount(&docs, &WordcountArgs::default()).unwrap();
    assert_eq!(outcome.skipped, 1);
    assert_eq!(outcome.sheets[0].1.index, vec!["first", "third"]);
}

#[test]
fn ops_wordcount_all_empty_is_empty_input() {
    let docs = vec![Document::default(), Document::default()];
    let err = ops::op_wordcount(&docs, &WordcountArgs::default()).unwrap_err();
    assert!(matches!(err, TextlensError::EmptyInput(_)));
}

#[test]
fn ops_wordcount_invalid_thresholds() {
    let docs = vec![words(&["x", "x", "y"])];
    let too_high = WordcountArgs {
        min_tf: 5,
        ..WordcountArgs::default()
    };
    assert!(matches!(
        ops::op_wordcount(&docs, &too_high),
        Err(TextlensError::Configuration(_))
    ));
    let zero = WordcountArgs {
        min_tf: 0,
        ..WordcountArgs::default()
    };
    assert!(matches!(
        ops::op_wordcount(&docs, &zero),
        Err(TextlensError::Configuration(_))
    ));
}

#[test]
fn ops_wordcount_human_readable() {
    let docs = vec![words(&["x", "x", "y"])];
    let args = WordcountArgs {
        human_readable: true,
        ..WordcountArgs::default()
    };
    let outcome = ops::op_wordcount(&docs, &args).unwrap();
    let (name, table) = &outcome.sheets[0];
    assert_eq!(name, "humancounts");
    assert_eq!(table.rows[0][0], Cell::Text("x (2)".into()));
}

// ── Entities ─────────────────────────────────────────────────────────────────

fn entity_records() -> Vec<Record> {
    let record = |name: &str, ents: &[(&str, &str)]| Record {
        text: String::new(),
        name: Some(name.to_string()),
        entities: ents.iter().map(|(t, l)| EntityMention::new(*t, *l)).collect(),
    };
    vec![
        record("a", &[("U.S.", "GPE"), ("Ada Lovelace", "PERSON"), ("1843", "DATE")]),
        record("b", &[("US", "GPE"), ("London", "GPE")]),
        record("c", &[("Monday", "DATE")]),
        record("d", &[("u.s", "GPE"), ("Ada Lovelace", "PERSON")]),
    ]
}

#[test]
fn ops_entities_merges_surface_forms() {
    let outcome = ops::op_entities(&entity_records(), &EntityArgs::default()).unwrap();
    // record "c" only mentions a DATE, which is ignored by default
    assert_eq!(outcome.skipped, 1);
    let (name, table) = &outcome.sheets[0];
    assert_eq!(name, "ents");
    assert_eq!(table.columns, vec!["U.S.", "Ada Lovelace", "London"]);
    assert_eq!(table.index, vec!["a", "b", "d"]);
    assert_eq!(
        numbers(table),
        vec![vec![1.0, 1.0, 0.0], vec![1.0, 0.0, 1.0], vec![1.0, 1.0, 0.0]]
    );
}

#[test]
fn ops_entities_threshold_and_types() {
    let args = EntityArgs {
        min_tf: 2,
        use_types: Some(vec!["person".into()]),
        ..EntityArgs::default()
    };
    let outcome = ops::op_entities(&entity_records(), &args).unwrap();
    let table = &outcome.sheets[0].1;
    assert_eq!(table.columns, vec!["Ada Lovelace"]);
    assert_eq!(outcome.skipped, 2);

    let args = EntityArgs {
        ignore_types: Some(vec!["GPE".into(), "PERSON".into()]),
        ..EntityArgs::default()
    };
    let outcome = ops::op_entities(&entity_records(), &args).unwrap();
    assert_eq!(outcome.sheets[0].1.columns, vec!["1843", "Monday"]);
}

#[test]
fn ops_entities_conflicting_filters() {
    let args = EntityArgs {
        use_types: Some(vec!["GPE".into()]),
        ignore_types: Some(vec!["DATE".into()]),
        ..EntityArgs::default()
    };
    let err = ops::op_entities(&entity_records(), &args).unwrap_err();
    assert!(matches!(err, TextlensError::Configuration(_)));
}

#[test]
fn ops_entities_nothing_reaches_threshold() {
    let args = EntityArgs {
        min_tf: 10,
        ..EntityArgs::default()
    };
    let err = ops::op_entities(&entity_records(), &args).unwrap_err();
    assert!(err.to_string().contains("count threshold"));
}

// ── Sentiment ────────────────────────────────────────────────────────────────

fn lexicon() -> JsonLexicon {
    JsonLexicon::parse(
        r#"{"positive_emotion": ["happy", "love"], "negative_emotion": ["sad", "hate"], "weather": ["rain", "sun"]}"#,
    )
    .unwrap()
}

#[test]
fn ops_sentiment_report_and_summary() {
    let docs = annotate(&["I love the sun", "Sad rain, sad day", ""]);
    let args = SentimentArgs {
        normalize: false,
        ..SentimentArgs::default()
    };
    let outcome = ops::op_sentiment(&docs, &lexicon(), &args).unwrap();
    assert_eq!(outcome.skipped, 1);
    let names: Vec<&str> = outcome.sheets.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["report", "summary"]);

    let report = &outcome.sheets[0].1;
    assert_eq!(report.columns, vec!["negative_emotion", "positive_emotion", "weather"]);
    assert_eq!(numbers(report), vec![vec![0.0, 1.0, 1.0], vec![2.0, 0.0, 1.0]]);

    let summary = &outcome.sheets[1].1;
    assert_eq!(summary.index, report.columns);
    assert_eq!(summary.rows[0][0], Cell::Number(1.0));
    assert_eq!(summary.rows[0][3], Cell::Number(2.0));
}

#[test]
fn ops_sentiment_normalized_posneg() {
    let docs = annotate(&["happy happy sad rain"]);
    let args = SentimentArgs {
        posneg_only: true,
        ..SentimentArgs::default()
    };
    let outcome = ops::op_sentiment(&docs, &lexicon(), &args).unwrap();
    let report = &outcome.sheets[0].1;
    assert_eq!(report.columns, vec!["positive_emotion", "negative_emotion"]);
    assert_eq!(numbers(report), vec![vec![0.5, 0.25]]);
}

#[test]
fn ops_sentiment_missing_category() {
    let lex = JsonLexicon::parse(r#"{"joy": ["happy"]}"#).unwrap();
    let args = SentimentArgs {
        posneg_only: true,
        ..SentimentArgs::default()
    };
    let err = ops::op_sentiment(&annotate(&["happy"]), &lex, &args).unwrap_err();
    assert!(matches!(err, TextlensError::Configuration(_)));
}

// ── Topic models ─────────────────────────────────────────────────────────────

fn topic_args(kind: &str, n_topics: usize) -> TopicArgs {
    TopicArgs {
        n_topics,
        method: TopicMethod::from_str(kind).unwrap(),
        min_tf: 1,
        save_wordmatrix: true,
    }
}

#[test]
fn ops_topicmodel_lda_sheets() {
    let outcome = ops::op_topicmodel(&topic_corpus(), &topic_args("lda", 2)).unwrap();
    assert_eq!(outcome.skipped, 0);
    let (name, docs) = &outcome.sheets[0];
    assert_eq!(name, "doc_features");
    assert_eq!(docs.columns, vec!["topic0", "topic1"]);
    assert_eq!(docs.n_rows(), 6);

    let (name, terms) = &outcome.sheets[1];
    assert_eq!(name, "feature_terms");
    assert_eq!(terms.index, vec!["topic0", "topic1"]);
    for row in numbers(terms) {
        let sum: f64 = row.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6, "topic row sums to {sum}");
    }
}

#[test]
fn ops_topicmodel_deterministic() {
    for kind in ["lda", "nmf"] {
        let a = ops::op_topicmodel(&topic_corpus(), &topic_args(kind, 2)).unwrap();
        let b = ops::op_topicmodel(&topic_corpus(), &topic_args(kind, 2)).unwrap();
        assert_eq!(a, b, "{kind} should be reproducible");
    }
}

#[test]
fn ops_topicmodel_nmf_without_word_matrix() {
    let args = TopicArgs {
        save_wordmatrix: false,
        ..topic_args("nmf", 2)
    };
    let outcome = ops::op_topicmodel(&topic_corpus(), &args).unwrap();
    assert_eq!(outcome.sheets.len(), 1);
    assert!(numbers(&outcome.sheets[0].1).iter().flatten().all(|&x| x >= 0.0));
}

#[test]
fn ops_topicmodel_rejects_too_many_topics() {
    let err = ops::op_topicmodel(&topic_corpus(), &topic_args("lda", 6)).unwrap_err();
    assert!(matches!(err, TextlensError::Configuration(_)));
    let err = ops::op_topicmodel(&topic_corpus(), &topic_args("lda", 0)).unwrap_err();
    assert!(matches!(err, TextlensError::Configuration(_)));
}

#[test]
fn ops_topicmodel_min_df_too_high() {
    let args = TopicArgs {
        min_tf: 50,
        ..topic_args("nmf", 2)
    };
    let err = ops::op_topicmodel(&topic_corpus(), &args).unwrap_err();
    assert!(matches!(err, TextlensError::Configuration(_)));
}

#[test]
fn ops_topicmodel_skips_documents_pruned_empty() {
    let mut docs = topic_corpus();
    docs.push(words(&["zebra", "unicorn"]).named("stray"));
    for kind in ["lda", "nmf"] {
        let args = TopicArgs {
            min_tf: 2,
            ..topic_args(kind, 2)
        };
        let outcome = ops::op_topicmodel(&docs, &args).unwrap();
        assert_eq!(outcome.skipped, 1, "{kind}");
        let table = &outcome.sheets[0].1;
        assert_eq!(table.n_rows(), 6);
        assert!(!table.index.iter().any(|l| l == "stray"));
    }
}

#[test]
fn ops_topicmodel_counts_topics_against_kept_documents() {
    let mut docs: Vec<Document> = topic_corpus().into_iter().take(2).collect();
    docs.push(words(&["zebra"]));
    docs.push(words(&["unicorn"]));
    let args = TopicArgs {
        min_tf: 2,
        ..topic_args("lda", 2)
    };
    let err = ops::op_topicmodel(&docs, &args).unwrap_err();
    assert!(matches!(err, TextlensError::Configuration(_)));
}

// ── GloVe ────────────────────────────────────────────────────────────────────

fn glove_args(n_dim: usize) -> GloveArgs {
    GloveArgs {
        params: GloveParams {
            n_dim,
            epochs: 20,
            seed: 3,
            ..GloveParams::default()
        },
        ..GloveArgs::default()
    }
}

#[test]
fn ops_glove_natural_basis() {
    let outcome = ops::op_glove(&glove_corpus(), &glove_args(4)).unwrap();
    assert_eq!(outcome.skipped, 0);
    let (name, docs) = &outcome.sheets[0];
    assert_eq!(name, "doc_features");
    assert_eq!(docs.columns, vec!["dimension0", "dimension1", "dimension2", "dimension3"]);
    assert_eq!(docs.n_rows(), 7);
    let (name, terms) = &outcome.sheets[1];
    assert_eq!(name, "feature_terms");
    assert_eq!(terms.n_rows(), 4);
    // most frequent token first
    assert_eq!(terms.columns[0], "the");
}

#[test]
fn ops_glove_keywords_set_dimensionality() {
    let args = GloveArgs {
        keywords: vec![
            KeywordGroup::new(&["cat", "dog"]),
            KeywordGroup::new(&["car"]).rejecting(&["road"]),
        ],
        ..glove_args(5)
    };
    let outcome = ops::op_glove(&glove_corpus(), &args).unwrap();
    assert_eq!(outcome.sheets[0].1.columns, vec!["dimension0", "dimension1"]);
    assert_eq!(outcome.sheets[1].1.n_rows(), 2);
}

#[test]
fn ops_glove_unknown_keyword() {
    let args = GloveArgs {
        keywords: vec![KeywordGroup::new(&["unicorn"])],
        ..glove_args(3)
    };
    let err = ops::op_glove(&glove_corpus(), &args).unwrap_err();
    assert!(matches!(err, TextlensError::Configuration(_)));
}

#[test]
fn ops_glove_configuration_errors() {
    let err = ops::op_glove(&glove_corpus(), &glove_args(7)).unwrap_err();
    assert!(matches!(err, TextlensError::Configuration(_)));
    let err = ops::op_glove(&glove_corpus(), &glove_args(0)).unwrap_err();
    assert!(matches!(err, TextlensError::Configuration(_)));
    let args = GloveArgs {
        min_tf: 1000,
        ..glove_args(3)
    };
    let err = ops::op_glove(&glove_corpus(), &args).unwrap_err();
    assert!(matches!(err, TextlensError::Configuration(_)));
}

#[test]
fn ops_glove_skips_documents_without_vocabulary() {
    let mut docs = glove_corpus();
    docs.push(words(&["zebra"]).named("stray"));
    docs.push(Document::default());
    let args = GloveArgs {
        min_tf: 1,
        ..glove_args(3)
    };
    let outcome = ops::op_glove(&docs, &args).unwrap();
    assert_eq!(outcome.skipped, 2);
    let index = &outcome.sheets[0].1.index;
    assert_eq!(index.len(), 7);
    assert!(!index.contains(&"stray".to_string()));
    assert!(!outcome.sheets[1].1.columns.contains(&"zebra".to_string()));
}
