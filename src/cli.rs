use std::path::Path;

use clap::{Args, Parser, Subcommand};
use textlens::algo::keywords::{self, KeywordGroup};
use textlens::algo::lda::LearningMethod;
use textlens::algo::lexicon::JsonLexicon;
use textlens::algo::tokenizer::{Annotator, Document, UnicodeAnnotator};
use textlens::algo::topics::TopicMethod;
use textlens::config::Settings;
use textlens::input::{self, Corpus};
use textlens::ops::{self, EntityArgs, GloveArgs, Outcome, SentimentArgs, TopicArgs, WordcountArgs};
use textlens::report;
use textlens::{Result, TextlensError};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "textlens",
    version,
    about = "Corpus analytics: word counts, entities, lexicon scores, topic models and embeddings"
)]
struct Cli {
    /// Settings file (JSON). Defaults to $TEXTLENS_CONFIG, then the XDG config path
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log filter used when RUST_LOG is unset, e.g. "debug"
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Input and output options shared by every subcommand.
#[derive(Args)]
struct Common {
    /// Input files: .json (array of records), .csv (with header) or plain text
    #[arg(required = true, num_args = 1..)]
    infiles: Vec<String>,

    /// Report path. Each sheet is written as <stem>_<sheet>.csv next to it
    #[arg(short, long)]
    outfile: String,

    /// Column holding document titles or ids
    #[arg(long)]
    doclabelcol: Option<String>,

    /// Column holding document text [default: from settings, "text"]
    #[arg(short = 'c', long)]
    textcol: Option<String>,

    /// Fail instead of writing JSON when a sheet is too big for a spreadsheet
    #[arg(long)]
    no_fallback: bool,

    /// Remove common English stopwords during tokenization
    #[arg(long)]
    drop_stopwords: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Count words per document, either a fixed list or every word above a frequency
    Wordcount {
        #[command(flatten)]
        common: Common,
        /// Comma-separated words to count, one column each
        #[arg(short, long)]
        words: Option<String>,
        /// Count every word appearing at least this many times in the corpus
        #[arg(short, long, default_value_t = 1)]
        min_tf: usize,
        /// List each document's words by count instead of a wide table
        #[arg(long)]
        human_readable: bool,
    },
    /// Count pre-annotated named entities per document (JSON input)
    Entities {
        #[command(flatten)]
        common: Common,
        /// Minimum total occurrences for an entity to be counted
        #[arg(short, long, default_value_t = 1)]
        min_tf: usize,
        /// Comma-separated entity types to keep
        #[arg(long, conflicts_with = "ignore_types")]
        use_types: Option<String>,
        /// Comma-separated entity types to drop [default: DATE,TIME,PERCENT,MONEY,QUANTITY,ORDINAL,CARDINAL]
        #[arg(long)]
        ignore_types: Option<String>,
        #[arg(long)]
        human_readable: bool,
    },
    /// Score documents against the categories of a JSON lexicon
    Sentiment {
        #[command(flatten)]
        common: Common,
        /// Lexicon file: {"category": ["word", ...], ...}
        #[arg(short, long)]
        lexicon: String,
        /// Only positive_emotion and negative_emotion
        #[arg(short, long)]
        posneg_only: bool,
        /// Report raw counts instead of dividing by document length
        #[arg(long)]
        no_normalize: bool,
        #[arg(long)]
        human_readable: bool,
    },
    /// Fit an LDA or NMF topic model
    Topicmodel {
        #[command(flatten)]
        common: Common,
        /// Number of topics
        #[arg(short = 'n', long)]
        numtopics: usize,
        /// Algorithm: lda, nmf
        #[arg(short = 't', long = "type", default_value = "lda")]
        kind: String,
        /// Random seed [default: from settings]
        #[arg(short, long)]
        seed: Option<u64>,
        /// Minimum number of documents a term must appear in
        #[arg(short, long, default_value_t = 0)]
        min_tf: usize,
        /// LDA learning method: batch, online [default: from settings]
        #[arg(long)]
        learning_method: Option<String>,
        /// Leave out the topic-term sheet
        #[arg(long)]
        nosave_wordmatrix: bool,
    },
    /// Train GloVe word vectors and average them into document vectors
    Glove {
        #[command(flatten)]
        common: Common,
        /// Embedding dimensions
        #[arg(short = 'd', long)]
        dimensions: usize,
        /// Keyword directions, e.g. "good,great;bad|good" (groups by ';', rejections by '|')
        #[arg(short, long)]
        keywords: Option<String>,
        /// Keyword directions from a file (.json or the text form)
        #[arg(long, conflicts_with = "keywords")]
        keywords_file: Option<String>,
        /// Keep tokens appearing more than this many times
        #[arg(short, long, default_value_t = 0)]
        min_tf: usize,
        /// Random seed [default: from settings]
        #[arg(short, long)]
        seed: Option<u64>,
        /// AdaGrad learning rate [default: from settings]
        #[arg(long)]
        learning_rate: Option<f64>,
        /// Leave out the dimension-term sheet
        #[arg(long)]
        nosave_wordmatrix: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref()).unwrap_or_else(|e| fail(&e));
    init_logging(cli.log_level.as_deref().unwrap_or(&settings.log_level));

    if let Err(e) = run(cli.command, &settings) {
        fail(&e);
    }
}

fn fail(err: &TextlensError) -> ! {
    eprintln!("error[{}]: {err}", err.kind().as_str());
    std::process::exit(1);
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("warning: a tracing subscriber was already installed");
    }
}

fn run(command: Commands, settings: &Settings) -> Result<()> {
    match command {
        Commands::Wordcount {
            common,
            words,
            min_tf,
            human_readable,
        } => {
            let docs = annotate(&load(&common, settings)?, &common);
            let args = WordcountArgs {
                words: words.as_deref().map(split_list),
                min_tf,
                human_readable,
            };
            finish(&common, settings, ops::op_wordcount(&docs, &args)?)
        }
        Commands::Entities {
            common,
            min_tf,
            use_types,
            ignore_types,
            human_readable,
        } => {
            let corpus = load(&common, settings)?;
            let args = EntityArgs {
                min_tf,
                use_types: use_types.as_deref().map(split_list),
                ignore_types: ignore_types.as_deref().map(split_list),
                human_readable,
            };
            finish(&common, settings, ops::op_entities(&corpus.records, &args)?)
        }
        Commands::Sentiment {
            common,
            lexicon,
            posneg_only,
            no_normalize,
            human_readable,
        } => {
            let lexicon = JsonLexicon::load(&lexicon)?;
            let docs = annotate(&load(&common, settings)?, &common);
            let args = SentimentArgs {
                posneg_only,
                normalize: !no_normalize,
                human_readable,
            };
            finish(&common, settings, ops::op_sentiment(&docs, &lexicon, &args)?)
        }
        Commands::Topicmodel {
            common,
            numtopics,
            kind,
            seed,
            min_tf,
            learning_method,
            nosave_wordmatrix,
        } => {
            let seed = seed.unwrap_or(settings.seed);
            let method = match TopicMethod::from_str(&kind) {
                Some(TopicMethod::Lda(_)) => {
                    let mut params = settings.lda_params(seed);
                    if let Some(m) = learning_method {
                        params.learning_method = LearningMethod::from_str(&m).ok_or_else(|| {
                            TextlensError::config(format!(
                                "unknown learning method '{m}'. Use: batch, online"
                            ))
                        })?;
                    }
                    TopicMethod::Lda(params)
                }
                Some(TopicMethod::Nmf(_)) => TopicMethod::Nmf(settings.nmf_params(seed)),
                None => {
                    return Err(TextlensError::config(format!(
                        "unknown topic model '{kind}'. Use: lda, nmf"
                    )))
                }
            };
            let docs = annotate(&load(&common, settings)?, &common);
            let args = TopicArgs {
                n_topics: numtopics,
                method,
                min_tf,
                save_wordmatrix: !nosave_wordmatrix,
            };
            finish(&common, settings, ops::op_topicmodel(&docs, &args)?)
        }
        Commands::Glove {
            common,
            dimensions,
            keywords,
            keywords_file,
            min_tf,
            seed,
            learning_rate,
            nosave_wordmatrix,
        } => {
            let keywords: Vec<KeywordGroup> = match (keywords, keywords_file) {
                (Some(text), _) => keywords::parse_keywords(&text)?,
                (None, Some(path)) => keywords::load_keywords(&path)?,
                (None, None) => vec![],
            };
            let mut params = settings.glove_params(dimensions, seed.unwrap_or(settings.seed));
            if let Some(lr) = learning_rate {
                if lr.is_nan() || lr <= 0.0 {
                    return Err(TextlensError::config("learning rate must be positive"));
                }
                params.learning_rate = lr;
            }
            let docs = annotate(&load(&common, settings)?, &common);
            let args = GloveArgs {
                params,
                min_tf,
                window: settings.window,
                keywords,
                save_wordmatrix: !nosave_wordmatrix,
            };
            finish(&common, settings, ops::op_glove(&docs, &args)?)
        }
    }
}

fn load(common: &Common, settings: &Settings) -> Result<Corpus> {
    let textcol = common.textcol.as_deref().unwrap_or(&settings.text_column);
    input::load_corpus(&common.infiles, textcol, common.doclabelcol.as_deref())
}

fn annotate(corpus: &Corpus, common: &Common) -> Vec<Document> {
    let annotator = if common.drop_stopwords {
        UnicodeAnnotator::with_stopwords_removed()
    } else {
        UnicodeAnnotator::new()
    };
    let names = corpus.names();
    let docs = annotator.annotate_all(&corpus.texts(), names.as_deref());
    info!(documents = docs.len(), "annotated corpus");
    docs
}

fn finish(common: &Common, settings: &Settings, outcome: Outcome) -> Result<()> {
    if outcome.skipped > 0 {
        info!(skipped = outcome.skipped, "documents left out of the report");
    }
    let fallback = settings.fallback && !common.no_fallback;
    let written = report::write_report(Path::new(&common.outfile), &outcome.sheets, fallback)?;
    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(String::from)
        .collect()
}
