//! English segmentation.

use super::hashed::{SPECIAL_TOKENS, Segmenter};
use crate::models::SyntaxFeatures;

/// Lowercasing word/punctuation segmenter for English.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishSegmenter;

impl Segmenter for EnglishSegmenter {
    const LANGUAGE: &'static str = "en";
    const DEFAULT_MODEL: &'static str = "bert-base-uncased";

    fn tokenize(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        for word in text.to_lowercase().split_whitespace() {
            let mut current = String::new();
            for c in word.chars() {
                if c.is_alphanumeric() || c == '\'' || c == '-' {
                    current.push(c);
                } else {
                    if !current.is_empty() {
                        tokens.push(std::mem::take(&mut current));
                    }
                    tokens.push(c.to_string());
                }
            }
            if !current.is_empty() {
                tokens.push(current);
            }
        }
        tokens
    }

    fn detokenize(&self, tokens: &[String]) -> String {
        let mut text = String::new();
        for token in tokens {
            if SPECIAL_TOKENS.contains(&token.as_str()) || token.is_empty() {
                continue;
            }
            let attaches = token.chars().all(|c| ",.;:!?)%".contains(c));
            if !text.is_empty() && !attaches && !text.ends_with('(') {
                text.push(' ');
            }
            text.push_str(token);
        }
        text.trim().to_string()
    }

    fn annotate(&self, text: &str, features: &mut SyntaxFeatures) {
        features.word_count = Some(text.split_whitespace().count());
    }
}
