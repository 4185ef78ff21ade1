//! Syntax feature records produced by adapters.

use serde::{Deserialize, Serialize};

/// Structured syntax features extracted from one piece of text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyntaxFeatures {
    /// Tokens as produced by the adapter's tokenizer.
    pub tokens: Vec<String>,
    /// Number of tokens.
    pub token_count: usize,
    /// Whitespace-separated word count, for languages that delimit words.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_count: Option<usize>,
    /// Character count, for languages that do not delimit words.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub char_count: Option<usize>,
    /// Depth of the structural analysis performed.
    pub structure: String,
}
