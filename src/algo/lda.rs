//! Latent Dirichlet Allocation fitted with variational Bayes.
//!
//! Follows Hoffman, Blei & Bach (2010): a per-document E-step updates the
//! variational topic proportions, and the M-step updates the topic-word
//! variational parameters either from the whole corpus at once (batch) or
//! from mini-batches with a decaying step size (online).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::algo::doc_term::DocTermMatrix;
use crate::algo::topics::Factorization;
use crate::error::{Result, TextlensError};

/// How the topic-word parameters are updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearningMethod {
    /// One update per pass over the whole corpus.
    Batch,
    /// One update per mini-batch.
    Online,
}

impl LearningMethod {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "batch" => Some(Self::Batch),
            "online" => Some(Self::Online),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LdaParams {
    pub learning_method: LearningMethod,
    /// Passes over the corpus.
    pub max_iter: usize,
    /// Document-topic prior. `None` means `1 / k`.
    pub doc_topic_prior: Option<f64>,
    /// Topic-word prior. `None` means `1 / k`.
    pub topic_word_prior: Option<f64>,
    /// Down-weights early online iterations. Must be > 0.
    pub learning_offset: f64,
    /// Online step size exponent, in (0.5, 1].
    pub learning_decay: f64,
    pub batch_size: usize,
    /// E-step stops when the mean change of a document's proportions is below this.
    pub mean_change_tol: f64,
    pub max_doc_update_iter: usize,
    pub seed: u64,
}

impl Default for LdaParams {
    fn default() -> Self {
        Self {
            learning_method: LearningMethod::Online,
            max_iter: 10,
            doc_topic_prior: None,
            topic_word_prior: None,
            learning_offset: 10.0,
            learning_decay: 0.7,
            batch_size: 128,
            mean_change_tol: 1e-3,
            max_doc_update_iter: 100,
            seed: 0,
        }
    }
}

const EPS: f64 = f64::EPSILON;

struct Model<'a> {
    params: &'a LdaParams,
    k: usize,
    alpha: f64,
    eta: f64,
    /// Topic-word variational parameters (k × n_terms).
    lambda: Vec<Vec<f64>>,
    /// exp(E[log beta]) for the current lambda.
    exp_beta: Vec<Vec<f64>>,
    n_batch_iter: usize,
}

impl<'a> Model<'a> {
    fn new(params: &'a LdaParams, k: usize, n_terms: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(params.seed);
        let lambda: Vec<Vec<f64>> = (0..k)
            .map(|_| (0..n_terms).map(|_| rng.gen_range(0.8..1.2)).collect())
            .collect();
        let exp_beta = dirichlet_expectation(&lambda);
        Self {
            params,
            k,
            alpha: params.doc_topic_prior.unwrap_or(1.0 / k as f64),
            eta: params.topic_word_prior.unwrap_or(1.0 / k as f64),
            lambda,
            exp_beta,
            n_batch_iter: 1,
        }
    }

    /// Variational E-step. Returns unnormalised doc-topic parameters and,
    /// when asked, the sufficient statistics for the M-step.
    fn e_step(
        &self,
        docs: &[Vec<(usize, f64)>],
        with_stats: bool,
    ) -> (Vec<Vec<f64>>, Option<Vec<Vec<f64>>>) {
        let n_terms = self.lambda.first().map_or(0, Vec::len);
        let mut stats = with_stats.then(|| vec![vec![0.0; n_terms]; self.k]);
        let mut gammas = Vec::with_capacity(docs.len());

        for doc in docs {
            let mut gamma = vec![1.0; self.k];
            if doc.is_empty() {
                gammas.push(gamma);
                continue;
            }
            let mut exp_theta = dirichlet_expectation_row(&gamma);
            let mut norm_phi = self.norm_phi(doc, &exp_theta);

            for _ in 0..self.params.max_doc_update_iter {
                let last = gamma.clone();
                for z in 0..self.k {
                    let s: f64 = doc
                        .iter()
                        .zip(&norm_phi)
                        .map(|(&(t, cnt), &np)| cnt / np * self.exp_beta[z][t])
                        .sum();
                    gamma[z] = self.alpha + exp_theta[z] * s;
                }
                exp_theta = dirichlet_expectation_row(&gamma);
                norm_phi = self.norm_phi(doc, &exp_theta);
                let change = last.iter().zip(&gamma).map(|(a, b)| (a - b).abs()).sum::<f64>()
                    / self.k as f64;
                if change < self.params.mean_change_tol {
                    break;
                }
            }

            if let Some(stats) = stats.as_mut() {
                for (&(t, cnt), &np) in doc.iter().zip(&norm_phi) {
                    for z in 0..self.k {
                        stats[z][t] += exp_theta[z] * cnt / np;
                    }
                }
            }
            gammas.push(gamma);
        }

        if let Some(stats) = stats.as_mut() {
            for (row, beta_row) in stats.iter_mut().zip(&self.exp_beta) {
                for (s, b) in row.iter_mut().zip(beta_row) {
                    *s *= b;
                }
            }
        }
        (gammas, stats)
    }

    fn norm_phi(&self, doc: &[(usize, f64)], exp_theta: &[f64]) -> Vec<f64> {
        doc.iter()
            .map(|&(t, _)| {
                (0..self.k).map(|z| exp_theta[z] * self.exp_beta[z][t]).sum::<f64>() + EPS
            })
            .collect()
    }

    /// M-step. `doc_ratio` scales mini-batch statistics up to the corpus size.
    fn m_step(&mut self, stats: &[Vec<f64>], doc_ratio: f64, batch_update: bool) {
        if batch_update {
            for (row, s_row) in self.lambda.iter_mut().zip(stats) {
                for (l, s) in row.iter_mut().zip(s_row) {
                    *l = self.eta + s;
                }
            }
        } else {
            let weight = (self.params.learning_offset + self.n_batch_iter as f64)
                .powf(-self.params.learning_decay);
            for (row, s_row) in self.lambda.iter_mut().zip(stats) {
                for (l, s) in row.iter_mut().zip(s_row) {
                    *l = (1.0 - weight) * *l + weight * (self.eta + doc_ratio * s);
                }
            }
        }
        self.exp_beta = dirichlet_expectation(&self.lambda);
        self.n_batch_iter += 1;
    }
}

/// Fit LDA on raw term counts.
///
/// Document-topic rows and topic-term rows are each normalised to sum to 1.
pub fn lda(matrix: &DocTermMatrix, k: usize, params: &LdaParams) -> Result<Factorization> {
    let n_docs = matrix.n_docs();
    let n_terms = matrix.n_terms();
    if k == 0 {
        return Err(TextlensError::config("number of topics must be positive"));
    }
    if params.batch_size == 0 {
        return Err(TextlensError::config("LDA batch size must be positive"));
    }
    if n_docs == 0 || n_terms == 0 || matrix.is_all_zero() {
        return Err(TextlensError::fit(format!(
            "LDA received a degenerate {n_docs}x{n_terms} matrix with no positive entries"
        )));
    }
    if matrix.matrix.data().iter().any(|&x| x < 0.0) {
        return Err(TextlensError::fit("LDA requires non-negative counts"));
    }

    let docs = matrix.sparse_rows();
    let mut model = Model::new(params, k, n_terms);

    for pass in 0..params.max_iter {
        match params.learning_method {
            LearningMethod::Batch => {
                let (_, stats) = model.e_step(&docs, true);
                if let Some(stats) = stats {
                    model.m_step(&stats, 1.0, true);
                }
            }
            LearningMethod::Online => {
                for batch in docs.chunks(params.batch_size) {
                    let (_, stats) = model.e_step(batch, true);
                    if let Some(stats) = stats {
                        model.m_step(&stats, n_docs as f64 / batch.len() as f64, false);
                    }
                }
            }
        }
        debug!(pass = pass + 1, max_iter = params.max_iter, "lda pass");
    }

    let (gammas, _) = model.e_step(&docs, false);
    let doc_topics: Vec<Vec<f64>> = gammas.into_iter().map(normalize_row).collect();
    // Each topic becomes a probability distribution over terms
    let topic_terms: Vec<Vec<f64>> = model.lambda.into_iter().map(normalize_row).collect();

    if doc_topics.iter().chain(topic_terms.iter()).flatten().any(|x| !x.is_finite()) {
        return Err(TextlensError::fit("LDA produced non-finite parameters"));
    }

    Ok(Factorization {
        doc_topics,
        topic_terms,
        vocabulary: matrix.vocab.clone(),
        k,
    })
}

fn normalize_row(mut row: Vec<f64>) -> Vec<f64> {
    let sum: f64 = row.iter().sum();
    if sum > 0.0 {
        for x in row.iter_mut() {
            *x /= sum;
        }
    }
    row
}

// exp(E[log X]) for X ~ Dirichlet(row), per row
fn dirichlet_expectation(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    rows.iter().map(|r| dirichlet_expectation_row(r)).collect()
}

fn dirichlet_expectation_row(row: &[f64]) -> Vec<f64> {
    let psi_sum = digamma(row.iter().sum());
    row.iter().map(|&x| (digamma(x) - psi_sum).exp()).collect()
}

/// Digamma function for positive arguments.
pub fn digamma(mut x: f64) -> f64 {
    let mut result = 0.0;
    while x < 6.0 {
        result -= 1.0 / x;
        x += 1.0;
    }
    let f = 1.0 / (x * x);
    result + x.ln()
        - 0.5 / x
        - f * (1.0 / 12.0 - f * (1.0 / 120.0 - f * (1.0 / 252.0 - f * (1.0 / 240.0 - f / 132.0))))
}
