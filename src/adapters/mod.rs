//! Language adapters.
//!
//! An adapter owns everything language-specific about one human language:
//! segmentation, detokenization, dense embeddings, and syntax features.
//! Adapters are shared by reference across every subnet of a pipeline and
//! are read-only while serving requests.

mod chinese;
mod english;
mod hashed;

pub use chinese::ChineseSegmenter;
pub use english::EnglishSegmenter;
pub use hashed::{HashedAdapter, Segmenter};

use crate::models::{Mode, SequenceEmbedding, SyntaxFeatures};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// English adapter backed by deterministic hashed embeddings.
pub type EnglishAdapter = HashedAdapter<EnglishSegmenter>;

/// Chinese adapter backed by deterministic hashed embeddings.
pub type ChineseAdapter = HashedAdapter<ChineseSegmenter>;

/// Default embedding width (BERT-base hidden size).
pub const DEFAULT_EMBED_DIM: usize = 768;

/// Default sequence length every embedding is padded or truncated to.
pub const DEFAULT_MAX_SEQ_LEN: usize = 128;

/// Capability contract for language adapters.
///
/// `embed_dim` and `max_seq_len` are fixed at construction.
pub trait Adapter: Send + Sync {
    /// Language identifier (e.g. `"en"`).
    fn language(&self) -> &str;

    /// Width of every embedding row.
    fn embed_dim(&self) -> usize;

    /// Number of rows in every embedding.
    fn max_seq_len(&self) -> usize;

    /// Splits text into ordered tokens.
    fn tokenize(&self, text: &str) -> Vec<String>;

    /// Reassembles text from tokens.
    fn detokenize(&self, tokens: &[String]) -> String;

    /// Embeds text into a `[1, max_seq_len, embed_dim]` tensor.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedding backend fails.
    fn embed(&self, text: &str) -> Result<SequenceEmbedding>;

    /// Extracts structured syntax features.
    fn parse_syntax(&self, text: &str) -> SyntaxFeatures;

    /// Receives the pipeline's execution mode.
    fn set_mode(&self, _mode: Mode) {}

    /// Serializes the adapter's learned state.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be serialized.
    fn state(&self) -> Result<serde_json::Value>;

    /// Restores learned state produced by [`Adapter::state`].
    ///
    /// # Errors
    ///
    /// Returns an error if the state was produced by an incompatible adapter.
    fn load_state(&self, state: &serde_json::Value) -> Result<()>;
}

/// Construction parameters shared by the built-in adapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdapterParams {
    /// Embedding width. Default: 768.
    pub embed_dim: usize,
    /// Sequence length. Default: 128.
    pub max_seq_len: usize,
    /// Pretrained model identifier, recorded in checkpoints.
    pub model_name: Option<String>,
}

impl Default for AdapterParams {
    fn default() -> Self {
        Self {
            embed_dim: DEFAULT_EMBED_DIM,
            max_seq_len: DEFAULT_MAX_SEQ_LEN,
            model_name: None,
        }
    }
}

impl AdapterParams {
    /// Parses params from a configuration map.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for unknown fields, wrong types, or
    /// zero-sized dimensions.
    pub fn from_value(params: &serde_json::Value) -> Result<Self> {
        let parsed: Self = if params.is_null() {
            Self::default()
        } else {
            serde_json::from_value(params.clone())
                .map_err(|e| Error::InvalidInput(format!("adapter params: {e}")))?
        };
        if parsed.embed_dim == 0 || parsed.max_seq_len == 0 {
            return Err(Error::InvalidInput(
                "adapter params: embed_dim and max_seq_len must be positive".to_string(),
            ));
        }
        Ok(parsed)
    }

    /// Sets the embedding width.
    #[must_use]
    pub const fn with_embed_dim(mut self, embed_dim: usize) -> Self {
        self.embed_dim = embed_dim;
        self
    }

    /// Sets the sequence length.
    #[must_use]
    pub const fn with_max_seq_len(mut self, max_seq_len: usize) -> Self {
        self.max_seq_len = max_seq_len;
        self
    }
}
