pub mod cooccur;
pub mod doc_term;
pub mod embedding;
pub mod glove;
pub mod keywords;
pub mod lda;
pub mod lexicon;
pub mod nmf;
pub mod tokenizer;
pub mod topics;
pub mod vocab;
