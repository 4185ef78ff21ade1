//! Chinese segmentation.

use super::hashed::{SPECIAL_TOKENS, Segmenter};
use crate::models::SyntaxFeatures;

/// Character-level segmenter for Chinese.
///
/// Each CJK character is one token; runs of ASCII letters and digits stay
/// together, matching how BERT's Chinese vocabulary splits mixed text.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChineseSegmenter;

impl Segmenter for ChineseSegmenter {
    const LANGUAGE: &'static str = "zh";
    const DEFAULT_MODEL: &'static str = "bert-base-chinese";

    fn tokenize(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut word = String::new();
        for c in text.chars() {
            if c.is_ascii_alphanumeric() {
                word.push(c.to_ascii_lowercase());
                continue;
            }
            if !word.is_empty() {
                tokens.push(std::mem::take(&mut word));
            }
            if !c.is_whitespace() {
                tokens.push(c.to_string());
            }
        }
        if !word.is_empty() {
            tokens.push(word);
        }
        tokens
    }

    fn detokenize(&self, tokens: &[String]) -> String {
        let mut text = String::new();
        let mut previous_ascii = false;
        for token in tokens {
            if SPECIAL_TOKENS.contains(&token.as_str()) || token.is_empty() {
                continue;
            }
            let ascii = token.chars().all(|c| c.is_ascii_alphanumeric());
            if previous_ascii && ascii {
                text.push(' ');
            }
            text.push_str(token);
            previous_ascii = ascii;
        }
        text.trim().to_string()
    }

    fn annotate(&self, text: &str, features: &mut SyntaxFeatures) {
        features.char_count = Some(text.chars().count());
    }
}
