//! Processing units ("subnets").
//!
//! A subnet specializes in one narrow transformation and produces a
//! candidate translation plus a feature vector for every request. Subnets
//! never see each other's output within a request, and each owns exactly
//! one [`MemoryLog`](crate::MemoryLog).

mod context;
mod domain;
mod lexical;
mod syntax;
mod unit;

pub use context::ContextSpecialist;
pub use domain::DomainSpecialist;
pub use lexical::LexicalSpecialist;
pub use syntax::SyntaxSpecialist;
pub use unit::{MemoryBackedSubnet, MemoryView, Specialist};

use crate::adapters::Adapter;
use crate::lexicon::Lexicon;
use crate::models::{MemorySample, Mode};
use crate::storage::MemoryLog;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Term-alignment subnet.
pub type LexicalSubnet = MemoryBackedSubnet<LexicalSpecialist>;

/// Sentence-structure subnet.
pub type SyntaxSubnet = MemoryBackedSubnet<SyntaxSpecialist>;

/// Context and reference-resolution subnet.
pub type ContextSubnet = MemoryBackedSubnet<ContextSpecialist>;

/// Domain-convention subnet.
pub type DomainSubnet = MemoryBackedSubnet<DomainSpecialist>;

/// One subnet's answer for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct SubnetOutput {
    /// Candidate target-language text.
    pub candidate: String,
    /// Feature vector handed to the fuser.
    pub features: Vec<f32>,
}

/// Capability contract for processing units.
pub trait Subnet: Send + Sync {
    /// Registry name of this unit's kind.
    fn name(&self) -> &str;

    /// Processes one request.
    ///
    /// # Errors
    ///
    /// Returns an error if an adapter call fails.
    fn process(&self, text: &str, context: &str) -> Result<SubnetOutput>;

    /// Appends samples to this unit's own memory log.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be persisted.
    fn update_memory(&self, samples: &[MemorySample]) -> Result<()>;

    /// Returns the most recent `n` samples, without timestamps.
    ///
    /// # Errors
    ///
    /// Returns an error if the memory log is unavailable.
    fn recent_memory(&self, n: usize) -> Result<Vec<MemorySample>>;

    /// Storage location of this unit's memory log.
    fn memory_path(&self) -> Option<PathBuf>;

    /// Receives the pipeline's execution mode.
    fn set_mode(&self, _mode: Mode) {}

    /// Serializes the unit's learned state.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be serialized.
    fn state(&self) -> Result<serde_json::Value>;

    /// Restores state produced by [`Subnet::state`].
    ///
    /// # Errors
    ///
    /// Returns an error if the state belongs to a different kind of unit.
    fn load_state(&self, state: &serde_json::Value) -> Result<()>;
}

/// Dependencies injected into every subnet by the factory.
#[derive(Clone)]
pub struct SubnetDeps {
    /// Source-language adapter.
    pub source: Arc<dyn Adapter>,
    /// Target-language adapter.
    pub target: Arc<dyn Adapter>,
    /// Shared domain lexicon.
    pub lexicon: Arc<dyn Lexicon>,
    /// Directory holding default memory log locations.
    pub memory_dir: PathBuf,
}

impl SubnetDeps {
    /// Bundles the shared dependencies.
    pub fn new(
        source: Arc<dyn Adapter>,
        target: Arc<dyn Adapter>,
        lexicon: Arc<dyn Lexicon>,
        memory_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            target,
            lexicon,
            memory_dir: memory_dir.into(),
        }
    }

    /// Default memory log location for a unit kind in this domain.
    #[must_use]
    pub fn default_memory_path(&self, stem: &str) -> PathBuf {
        self.memory_dir
            .join(format!("{stem}_{}.json", self.lexicon.domain()))
    }
}

/// Construction parameters for the built-in subnets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SubnetParams {
    /// Memory log location. Default: `<memory_dir>/<kind>_<domain>.json`.
    pub memory_path: Option<PathBuf>,
    /// Memory log capacity. Default: 1000.
    pub max_size: usize,
    /// Persist after every append. Default: true.
    pub auto_persist: bool,
    /// Keep the memory log in process only.
    pub in_memory: bool,
}

impl Default for SubnetParams {
    fn default() -> Self {
        Self {
            memory_path: None,
            max_size: MemoryLog::DEFAULT_MAX_SIZE,
            auto_persist: true,
            in_memory: false,
        }
    }
}

impl SubnetParams {
    /// Parses params from a configuration map.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for unknown fields or wrong types.
    pub fn from_value(params: &serde_json::Value) -> Result<Self> {
        if params.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(params.clone())
            .map_err(|e| Error::InvalidInput(format!("subnet params: {e}")))
    }

    /// Resolves the memory log location, if the log is file-backed.
    #[must_use]
    pub fn resolve_memory_path(&self, deps: &SubnetDeps, stem: &str) -> Option<PathBuf> {
        if self.in_memory {
            return None;
        }
        Some(
            self.memory_path
                .clone()
                .unwrap_or_else(|| deps.default_memory_path(stem)),
        )
    }
}

/// Mean-pools `text`'s embedding under `adapter`.
pub(crate) fn pooled_embedding(adapter: &dyn Adapter, text: &str) -> Result<Vec<f32>> {
    Ok(adapter.embed(text)?.mean_pool())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::path::Path;
    use crate::adapters::{AdapterParams, ChineseAdapter, EnglishAdapter};
    use crate::lexicon::{DomainLexicon, RewriteRule};

    /// Small zh → en dependency set with a medical lexicon.
    pub fn medical_deps(memory_dir: &Path) -> SubnetDeps {
        let params = AdapterParams::default()
            .with_embed_dim(16)
            .with_max_seq_len(12);
        let lexicon = DomainLexicon::empty("medical")
            .with_terms([
                ("心肌梗死患者需要紧急处理", "myocardial infarction patients need emergency treatment"),
                ("患", "patient"),
            ])
            .with_rules(vec![RewriteRule {
                source_pattern: "需要".to_string(),
                target_pattern: "需".to_string(),
            }])
            .with_abbreviations([("心梗", "心肌梗死")]);
        SubnetDeps::new(
            Arc::new(ChineseAdapter::new(params.clone())),
            Arc::new(EnglishAdapter::new(params)),
            Arc::new(lexicon),
            memory_dir,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_params_defaults() {
        let params = SubnetParams::from_value(&json!({})).unwrap();
        assert_eq!(params.max_size, 1000);
        assert!(params.auto_persist);
        assert!(params.memory_path.is_none());
    }

    #[test]
    fn test_params_reject_unknown() {
        assert!(SubnetParams::from_value(&json!({"maxsize": 3})).is_err());
    }

    #[test]
    fn test_default_memory_path_uses_domain() {
        let dir = TempDir::new().unwrap();
        let deps = test_support::medical_deps(dir.path());
        let path = SubnetParams::default().resolve_memory_path(&deps, "lexical");
        assert_eq!(path, Some(dir.path().join("lexical_medical.json")));

        let in_memory = SubnetParams {
            in_memory: true,
            ..SubnetParams::default()
        };
        assert_eq!(in_memory.resolve_memory_path(&deps, "lexical"), None);
    }
}
