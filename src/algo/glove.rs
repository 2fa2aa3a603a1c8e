//! GloVe word vectors fitted to a co-occurrence matrix with AdaGrad.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use sprs::CsMat;
use tracing::debug;

use crate::algo::cooccur;
use crate::algo::embedding::Embedding;
use crate::error::{Result, TextlensError};

#[derive(Debug, Clone)]
pub struct GloveParams {
    /// Embedding dimensionality.
    pub n_dim: usize,
    /// Initial AdaGrad learning rate.
    pub learning_rate: f64,
    pub epochs: usize,
    /// Counts at or above this get full weight.
    pub max_count: f64,
    /// Exponent of the weighting function below `max_count`.
    pub alpha: f64,
    /// Per-entry loss is clipped to `[-max_loss, max_loss]`.
    pub max_loss: f64,
    pub seed: u64,
}

impl Default for GloveParams {
    fn default() -> Self {
        Self {
            n_dim: 100,
            learning_rate: 0.05,
            epochs: 5,
            max_count: 100.0,
            alpha: 0.75,
            max_loss: 10.0,
            seed: 0,
        }
    }
}

/// Fitted word and context vectors with their biases.
#[derive(Debug, Clone, PartialEq)]
pub struct Glove {
    pub word_vectors: Vec<Vec<f64>>,
    pub context_vectors: Vec<Vec<f64>>,
    pub word_biases: Vec<f64>,
    pub context_biases: Vec<f64>,
    /// Weighted squared error of the last epoch.
    pub final_loss: f64,
}

impl Glove {
    /// Fit on a square co-occurrence matrix. Entries are visited in a
    /// seeded random order each epoch.
    pub fn fit(cooc: &CsMat<f64>, params: &GloveParams) -> Result<Self> {
        if params.n_dim == 0 {
            return Err(TextlensError::config("embedding dimensionality must be positive"));
        }
        if cooc.rows() != cooc.cols() {
            return Err(TextlensError::fit(format!(
                "co-occurrence matrix must be square, got {}x{}",
                cooc.rows(),
                cooc.cols()
            )));
        }
        let mut entries: Vec<(usize, usize, f64)> = cooccur::entries(cooc)
            .into_iter()
            .filter(|&(_, _, x)| x > 0.0)
            .collect();
        if entries.is_empty() {
            return Err(TextlensError::fit(
                "co-occurrence matrix has no positive entries; nothing to train on",
            ));
        }

        let n = cooc.rows();
        let dim = params.n_dim;
        let mut rng = StdRng::seed_from_u64(params.seed);
        let init = |rng: &mut StdRng| -> Vec<Vec<f64>> {
            (0..n)
                .map(|_| (0..dim).map(|_| (rng.gen::<f64>() - 0.5) / dim as f64).collect())
                .collect()
        };
        let mut w = init(&mut rng);
        let mut c = init(&mut rng);
        let mut bw = vec![0.0; n];
        let mut bc = vec![0.0; n];
        let mut gw = vec![vec![1.0f64; dim]; n];
        let mut gc = vec![vec![1.0f64; dim]; n];
        let mut gbw = vec![1.0f64; n];
        let mut gbc = vec![1.0f64; n];

        let lr = params.learning_rate;
        let mut epoch_loss = 0.0;
        for epoch in 0..params.epochs {
            entries.shuffle(&mut rng);
            epoch_loss = 0.0;
            for &(i, j, count) in &entries {
                let prediction: f64 =
                    w[i].iter().zip(&c[j]).map(|(a, b)| a * b).sum::<f64>() + bw[i] + bc[j];
                let weight = (count / params.max_count).powf(params.alpha).min(1.0);
                let diff = prediction - count.ln();
                epoch_loss += 0.5 * weight * diff * diff;
                let loss = (weight * diff).clamp(-params.max_loss, params.max_loss);

                for d in 0..dim {
                    let grad_w = loss * c[j][d];
                    let grad_c = loss * w[i][d];
                    w[i][d] -= lr / gw[i][d].sqrt() * grad_w;
                    c[j][d] -= lr / gc[j][d].sqrt() * grad_c;
                    gw[i][d] += grad_w * grad_w;
                    gc[j][d] += grad_c * grad_c;
                }
                bw[i] -= lr / gbw[i].sqrt() * loss;
                bc[j] -= lr / gbc[j].sqrt() * loss;
                gbw[i] += loss * loss;
                gbc[j] += loss * loss;
            }
            if !epoch_loss.is_finite() {
                return Err(TextlensError::fit(format!(
                    "GloVe loss diverged in epoch {}",
                    epoch + 1
                )));
            }
            debug!(epoch = epoch + 1, loss = epoch_loss, "glove epoch");
        }

        Ok(Self {
            word_vectors: w,
            context_vectors: c,
            word_biases: bw,
            context_biases: bc,
            final_loss: epoch_loss,
        })
    }

    /// Attach the index -> word mapping. `vocab[i]` names row `i`.
    pub fn into_embedding(self, vocab: Vec<String>) -> Result<Embedding> {
        Embedding::new(vocab, self.word_vectors)
    }
}
