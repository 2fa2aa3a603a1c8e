//! Model defaults, overridable from a JSON settings file.
//!
//! Resolution order:
//!
//! 1. `--config <path>` (errors if unreadable or invalid)
//! 2. `$TEXTLENS_CONFIG` env var (path to JSON file)
//! 3. `$XDG_CONFIG_HOME/textlens/config.json`
//! 4. `~/.config/textlens/config.json`
//! 5. Built-in defaults
//!
//! Steps 2 to 4 fall through silently on failure. Fields missing from a file
//! keep their defaults; command-line flags override whatever is loaded.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::algo::glove::GloveParams;
use crate::algo::lda::{LdaParams, LearningMethod};
use crate::algo::nmf::NmfParams;
use crate::error::{Result, TextlensError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Column holding document text in CSV/JSON input.
    pub text_column: String,
    pub seed: u64,
    /// `batch` or `online`.
    pub lda_learning_method: String,
    pub lda_max_iter: usize,
    pub nmf_max_iter: usize,
    pub nmf_tol: f64,
    pub glove_epochs: usize,
    pub learning_rate: f64,
    /// Co-occurrence window, in tokens.
    pub window: usize,
    /// Write a JSON report when a sheet exceeds spreadsheet limits.
    pub fallback: bool,
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        let lda = LdaParams::default();
        let nmf = NmfParams::default();
        let glove = GloveParams::default();
        Self {
            text_column: "text".into(),
            seed: 0,
            lda_learning_method: "online".into(),
            lda_max_iter: lda.max_iter,
            nmf_max_iter: nmf.max_iter,
            nmf_tol: nmf.tol,
            glove_epochs: glove.epochs,
            learning_rate: glove.learning_rate,
            window: crate::algo::cooccur::DEFAULT_WINDOW,
            fallback: true,
            log_level: "info".into(),
        }
    }
}

impl Settings {
    /// Resolve settings using the order in the module docs.
    pub fn load(explicit: Option<&str>) -> Result<Self> {
        if let Some(path) = explicit {
            let json = std::fs::read_to_string(path).map_err(|e| {
                TextlensError::config(format!("failed to read config '{path}': {e}"))
            })?;
            return Self::parse(&json)
                .map_err(|e| TextlensError::config(format!("invalid config '{path}': {e}")));
        }

        let candidates = std::env::var("TEXTLENS_CONFIG")
            .ok()
            .map(PathBuf::from)
            .into_iter()
            .chain(xdg_config_path());
        for path in candidates {
            if let Ok(json) = std::fs::read_to_string(&path) {
                if let Ok(settings) = Self::parse(&json) {
                    debug!(path = %path.display(), "loaded settings");
                    return Ok(settings);
                }
            }
        }
        Ok(Self::default())
    }

    pub fn parse(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if LearningMethod::from_str(&self.lda_learning_method).is_none() {
            return Err(TextlensError::config(format!(
                "unknown LDA learning method '{}'. Use: batch, online",
                self.lda_learning_method
            )));
        }
        if self.window == 0 {
            return Err(TextlensError::config("co-occurrence window must be positive"));
        }
        if self.learning_rate.is_nan() || self.learning_rate <= 0.0 {
            return Err(TextlensError::config("learning rate must be positive"));
        }
        Ok(())
    }

    pub fn lda_params(&self, seed: u64) -> LdaParams {
        LdaParams {
            learning_method: LearningMethod::from_str(&self.lda_learning_method)
                .unwrap_or(LearningMethod::Online),
            max_iter: self.lda_max_iter,
            seed,
            ..LdaParams::default()
        }
    }

    pub fn nmf_params(&self, seed: u64) -> NmfParams {
        NmfParams {
            max_iter: self.nmf_max_iter,
            tol: self.nmf_tol,
            seed,
        }
    }

    pub fn glove_params(&self, n_dim: usize, seed: u64) -> GloveParams {
        GloveParams {
            n_dim,
            learning_rate: self.learning_rate,
            epochs: self.glove_epochs,
            seed,
            ..GloveParams::default()
        }
    }
}

/// `$XDG_CONFIG_HOME/textlens/config.json`, else `~/.config/textlens/config.json`.
fn xdg_config_path() -> Option<PathBuf> {
    let config_home = std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        })?;
    Some(config_home.join("textlens/config.json"))
}
