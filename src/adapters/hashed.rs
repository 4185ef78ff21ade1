//! Hash-based adapter.
//!
//! Generates deterministic pseudo-embeddings by seeding a `ChaCha8Rng`
//! with the SHA-256 digest of each token. The vectors carry no
//! semantic similarity; they stand in for a pretrained encoder while keeping
//! shapes and determinism identical.

use super::{Adapter, AdapterParams};
use crate::models::{Mode, SequenceEmbedding, SyntaxFeatures};
use crate::{Error, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};

/// Special markers stripped on detokenization.
pub(super) const SPECIAL_TOKENS: [&str; 4] = ["[CLS]", "[SEP]", "[cls]", "[sep]"];

/// Language-specific segmentation used by [`HashedAdapter`].
pub trait Segmenter: Default + Send + Sync {
    /// Language identifier.
    const LANGUAGE: &'static str;

    /// Model name recorded when none is configured.
    const DEFAULT_MODEL: &'static str;

    /// Splits text into tokens.
    fn tokenize(&self, text: &str) -> Vec<String>;

    /// Joins tokens back into text, dropping special markers.
    fn detokenize(&self, tokens: &[String]) -> String;

    /// Fills in the language-specific counts of a syntax record.
    fn annotate(&self, text: &str, features: &mut SyntaxFeatures);
}

/// Serialized adapter state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct AdapterState {
    language: String,
    embed_dim: usize,
    max_seq_len: usize,
    model_name: String,
}

/// Adapter producing hashed embeddings over a [`Segmenter`]'s tokens.
pub struct HashedAdapter<S: Segmenter> {
    segmenter: S,
    embed_dim: usize,
    max_seq_len: usize,
    model_name: String,
    training: AtomicBool,
}

impl<S: Segmenter> HashedAdapter<S> {
    /// Creates an adapter from typed params.
    #[must_use]
    pub fn new(params: AdapterParams) -> Self {
        Self {
            segmenter: S::default(),
            embed_dim: params.embed_dim,
            max_seq_len: params.max_seq_len,
            model_name: params
                .model_name
                .unwrap_or_else(|| S::DEFAULT_MODEL.to_string()),
            training: AtomicBool::new(false),
        }
    }

    /// Creates an adapter from a configuration params map.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the params are invalid.
    pub fn from_params(params: &serde_json::Value) -> Result<Self> {
        AdapterParams::from_value(params).map(Self::new)
    }

    /// Returns the configured model name.
    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Returns the current execution mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        if self.training.load(Ordering::Relaxed) {
            Mode::Training
        } else {
            Mode::Inference
        }
    }

    /// Generates the unit-norm vector for one token.
    fn token_vector(&self, token: &str) -> Vec<f32> {
        let digest = Sha256::digest(format!("{}:{token}", S::LANGUAGE).as_bytes());
        let mut rng = ChaCha8Rng::from_seed(digest.into());
        let mut vector: Vec<f32> = (0..self.embed_dim)
            .map(|_| rng.random_range(-1.0..1.0))
            .collect();
        normalize(&mut vector);
        vector
    }

    fn current_state(&self) -> AdapterState {
        AdapterState {
            language: S::LANGUAGE.to_string(),
            embed_dim: self.embed_dim,
            max_seq_len: self.max_seq_len,
            model_name: self.model_name.clone(),
        }
    }
}

impl<S: Segmenter> Adapter for HashedAdapter<S> {
    fn language(&self) -> &str {
        S::LANGUAGE
    }

    fn embed_dim(&self) -> usize {
        self.embed_dim
    }

    fn max_seq_len(&self) -> usize {
        self.max_seq_len
    }

    fn tokenize(&self, text: &str) -> Vec<String> {
        self.segmenter.tokenize(text)
    }

    fn detokenize(&self, tokens: &[String]) -> String {
        self.segmenter.detokenize(tokens)
    }

    fn embed(&self, text: &str) -> Result<SequenceEmbedding> {
        let mut embedding = SequenceEmbedding::zeros(self.max_seq_len, self.embed_dim);
        // Padding rows stay zero; tokens past max_seq_len are truncated.
        for (i, token) in self
            .segmenter
            .tokenize(text)
            .iter()
            .take(self.max_seq_len)
            .enumerate()
        {
            if let Some(row) = embedding.row_mut(i) {
                row.copy_from_slice(&self.token_vector(token));
            }
        }
        Ok(embedding)
    }

    fn parse_syntax(&self, text: &str) -> SyntaxFeatures {
        let tokens = self.segmenter.tokenize(text);
        let mut features = SyntaxFeatures {
            token_count: tokens.len(),
            tokens,
            word_count: None,
            char_count: None,
            structure: "basic".to_string(),
        };
        self.segmenter.annotate(text, &mut features);
        features
    }

    fn set_mode(&self, mode: Mode) {
        self.training.store(mode.is_training(), Ordering::Relaxed);
    }

    fn state(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self.current_state()).map_err(|e| Error::failed("adapter_state", e))
    }

    fn load_state(&self, state: &serde_json::Value) -> Result<()> {
        let stored: AdapterState = serde_json::from_value(state.clone())
            .map_err(|e| Error::InvalidInput(format!("adapter state: {e}")))?;
        let current = self.current_state();
        // The encoder is frozen; a checkpoint only has to agree on its shape.
        if stored.language != current.language
            || stored.embed_dim != current.embed_dim
            || stored.max_seq_len != current.max_seq_len
        {
            return Err(Error::InvalidInput(format!(
                "adapter state for {}/{}x{} does not fit {}/{}x{}",
                stored.language,
                stored.max_seq_len,
                stored.embed_dim,
                current.language,
                current.max_seq_len,
                current.embed_dim
            )));
        }
        Ok(())
    }
}

/// Normalizes a vector in-place to unit L2 norm.
fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
}
