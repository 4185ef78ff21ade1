//! Domain lexicon.
//!
//! Pure text transforms backed by flat per-domain tables: term translation,
//! pattern rewrite rules, and abbreviation expansion. Tables live under the
//! configured data directory as
//! `domain_<domain>_{terms,rules,abbreviations}.json`; any missing table is
//! treated as empty.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Maximum size of a single lexicon table (16MB).
const MAX_TABLE_SIZE: u64 = 16 * 1024 * 1024;

/// Boundary contract for domain text transforms.
///
/// Implementations must be deterministic and side-effect free.
pub trait Lexicon: Send + Sync {
    /// The domain this lexicon serves.
    fn domain(&self) -> &str;

    /// Translates a single term, returning it unchanged when unknown.
    fn translate_term(&self, term: &str) -> String;

    /// Applies every rewrite rule in order.
    fn apply_rules(&self, text: &str) -> String;

    /// Expands known abbreviations.
    fn expand_abbreviations(&self, text: &str) -> String;
}

/// One literal rewrite rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteRule {
    /// Text to look for.
    pub source_pattern: String,
    /// Replacement text.
    pub target_pattern: String,
}

/// Lexicon loaded from JSON tables.
#[derive(Debug, Clone, Default)]
pub struct DomainLexicon {
    domain: String,
    terms: HashMap<String, String>,
    rules: Vec<RewriteRule>,
    /// Sorted longest-key-first so overlapping abbreviations expand deterministically.
    abbreviations: Vec<(String, String)>,
}

impl DomainLexicon {
    /// Creates an empty lexicon for a domain.
    #[must_use]
    pub fn empty(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Self::default()
        }
    }

    /// Loads the tables for `domain` from `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if a table exists but cannot be read or parsed.
    pub fn load(domain: &str, data_dir: &Path) -> Result<Self> {
        let terms: HashMap<String, String> = load_table(data_dir, domain, "terms")?;
        let rules: Vec<RewriteRule> = load_table(data_dir, domain, "rules")?;
        let abbreviations: HashMap<String, String> =
            load_table(data_dir, domain, "abbreviations")?;

        tracing::debug!(
            domain,
            data_dir = %data_dir.display(),
            terms = terms.len(),
            rules = rules.len(),
            abbreviations = abbreviations.len(),
            "Loaded domain lexicon"
        );

        Ok(Self::empty(domain)
            .with_terms(terms)
            .with_rules(rules)
            .with_abbreviations(abbreviations))
    }

    /// Replaces the term table.
    #[must_use]
    pub fn with_terms<I, K, V>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.terms = terms
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Replaces the rule list.
    #[must_use]
    pub fn with_rules(mut self, rules: Vec<RewriteRule>) -> Self {
        self.rules = rules;
        self
    }

    /// Replaces the abbreviation table.
    #[must_use]
    pub fn with_abbreviations<I, K, V>(mut self, abbreviations: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut entries: Vec<(String, String)> = abbreviations
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| !k.is_empty())
            .collect();
        entries.sort_by(|(a, _), (b, _)| {
            b.chars()
                .count()
                .cmp(&a.chars().count())
                .then_with(|| a.cmp(b))
        });
        self.abbreviations = entries;
        self
    }
}

impl Lexicon for DomainLexicon {
    fn domain(&self) -> &str {
        &self.domain
    }

    fn translate_term(&self, term: &str) -> String {
        self.terms
            .get(term)
            .cloned()
            .unwrap_or_else(|| term.to_string())
    }

    fn apply_rules(&self, text: &str) -> String {
        self.rules
            .iter()
            .filter(|rule| !rule.source_pattern.is_empty())
            .fold(text.to_string(), |acc, rule| {
                acc.replace(&rule.source_pattern, &rule.target_pattern)
            })
    }

    fn expand_abbreviations(&self, text: &str) -> String {
        self.abbreviations
            .iter()
            .filter(|(abbr, _)| !abbr.is_empty())
            .fold(text.to_string(), |acc, (abbr, full)| expand_each(&acc, abbr, full))
    }
}

/// Replaces every raw occurrence of `abbr` with `full`.
///
/// When `full` embeds `abbr`, occurrences already inside an expanded form are
/// copied through unchanged.
fn expand_each(text: &str, abbr: &str, full: &str) -> String {
    if !full.contains(abbr) {
        return text.replace(abbr, full);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(ch) = rest.chars().next() {
        if rest.starts_with(full) {
            out.push_str(full);
            rest = &rest[full.len()..];
        } else if rest.starts_with(abbr) {
            out.push_str(full);
            rest = &rest[abbr.len()..];
        } else {
            out.push(ch);
            rest = &rest[ch.len_utf8()..];
        }
    }
    out
}

/// Path of one lexicon table.
fn table_path(data_dir: &Path, domain: &str, kind: &str) -> PathBuf {
    data_dir.join(format!("domain_{domain}_{kind}.json"))
}

/// Reads one table, falling back to its empty value when the file is absent.
fn load_table<T>(data_dir: &Path, domain: &str, kind: &str) -> Result<T>
where
    T: Default + for<'de> Deserialize<'de>,
{
    let path = table_path(data_dir, domain, kind);
    if !path.exists() {
        return Ok(T::default());
    }

    let metadata = fs::metadata(&path).map_err(|e| Error::failed("read_lexicon_metadata", e))?;
    if metadata.len() > MAX_TABLE_SIZE {
        return Err(Error::InvalidInput(format!(
            "lexicon table exceeds maximum size of {MAX_TABLE_SIZE} bytes: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(&path).map_err(|e| Error::OperationFailed {
        operation: "read_lexicon_table".to_string(),
        cause: format!("{}: {e}", path.display()),
    })?;

    serde_json::from_str(&contents).map_err(|e| Error::OperationFailed {
        operation: "parse_lexicon_table".to_string(),
        cause: format!("{}: {e}", path.display()),
    })
}
