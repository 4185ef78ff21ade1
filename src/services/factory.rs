//! Pipeline factory.
//!
//! Turns a [`PipelineConfig`] into a fully wired [`Pipeline`], resolving
//! every component through a [`Registry`]. Resolution order is adapters,
//! then subnets, then the coordinator; any failure aborts the build and no
//! partial pipeline is returned.

use super::Pipeline;
use crate::config::{self, PipelineConfig};
use crate::coordinators::FuserContext;
use crate::lexicon::{DomainLexicon, Lexicon};
use crate::registry::Registry;
use crate::storage::storage_key;
use crate::subnets::{Subnet, SubnetDeps};
use crate::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Builds pipelines from configuration documents.
#[derive(Debug, Clone, Copy)]
pub struct PipelineFactory<'a> {
    registry: &'a Registry,
}

impl<'a> PipelineFactory<'a> {
    /// Creates a factory resolving components through `registry`.
    #[must_use]
    pub const fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Checks that a raw document holds every required key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the first missing key.
    pub fn validate(document: &serde_json::Value) -> Result<()> {
        config::validate(document)
    }

    /// Validates and builds from a raw document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] before resolving anything if the
    /// document is invalid, otherwise any build error.
    pub fn build_from_value(&self, document: &serde_json::Value) -> Result<Pipeline> {
        self.build(&PipelineConfig::from_value(document)?)
    }

    /// Loads a config file and builds from it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable or invalid, or the build
    /// fails.
    pub fn build_from_file(&self, path: &Path) -> Result<Pipeline> {
        self.build(&PipelineConfig::load_from_file(path)?)
    }

    /// Builds a pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownComponent`] for an unregistered name,
    /// [`Error::InvalidConfig`] if two subnets share a memory log location or
    /// the coordinator does not fit the subnets, or any constructor error.
    pub fn build(&self, config: &PipelineConfig) -> Result<Pipeline> {
        let lexicon: Arc<dyn Lexicon> =
            Arc::new(DomainLexicon::load(&config.domain, &config.data_dir)?);

        let adapters = &config.adapters;
        let source = self
            .registry
            .resolve_adapter(&adapters.source, &adapters.source_params)?;
        let target = self
            .registry
            .resolve_adapter(&adapters.target, &adapters.target_params)?;

        let deps = SubnetDeps::new(
            Arc::clone(&source),
            Arc::clone(&target),
            lexicon,
            config.memory_dir.clone(),
        );

        let mut subnets: Vec<Arc<dyn Subnet>> = Vec::with_capacity(config.subnets.len());
        let mut owners: HashMap<PathBuf, usize> = HashMap::new();
        for (index, spec) in config.subnets.iter().enumerate() {
            let subnet = self
                .registry
                .resolve_subnet(&spec.name, deps.clone(), &spec.params)?;
            if let Some(path) = subnet.memory_path() {
                let key = storage_key(&path);
                if let Some(owner) = owners.get(&key) {
                    return Err(Error::InvalidConfig {
                        key: format!("subnets[{index}]"),
                        reason: format!(
                            "memory log {} is already owned by subnets[{owner}]",
                            path.display()
                        ),
                    });
                }
                owners.insert(key, index);
            }
            subnets.push(subnet);
        }

        let context = FuserContext {
            subnet_count: subnets.len(),
            embed_dim: source.embed_dim(),
        };
        let fuser = self.registry.resolve_coordinator(
            &config.coordinator.name,
            context,
            &config.coordinator.params,
        )?;

        let pipeline = Pipeline::new(config.domain.clone(), source, target, subnets, fuser)?;
        tracing::info!(
            domain = %config.domain,
            source = %adapters.source,
            target = %adapters.target,
            subnets = ?pipeline.subnet_names(),
            coordinator = %config.coordinator.name,
            "Assembled pipeline"
        );
        Ok(pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ComponentKind;
    use serde_json::json;
    use tempfile::TempDir;

    fn document(dir: &Path) -> serde_json::Value {
        json!({
            "domain": "medical",
            "data_dir": dir.join("data"),
            "memory_dir": dir.join("memory"),
            "adapters": {
                "source": "chinese_v1",
                "target": "english_v1",
                "source_params": {"embed_dim": 16, "max_seq_len": 12},
                "target_params": {"embed_dim": 16, "max_seq_len": 12}
            },
            "subnets": [{"name": "lexical_v1"}, {"name": "syntax_v1"}],
            "coordinator": {"name": "attention_v1", "params": {"hidden_dim": 8}}
        })
    }

    #[test]
    fn test_build_wires_components() {
        let dir = TempDir::new().unwrap();
        let registry = Registry::with_builtins();
        let pipeline = PipelineFactory::new(&registry)
            .build_from_value(&document(dir.path()))
            .unwrap();
        assert_eq!(pipeline.domain(), "medical");
        assert_eq!(pipeline.subnet_names(), vec!["lexical_v1", "syntax_v1"]);
        assert_eq!(pipeline.fuser().subnet_count(), 2);
        assert_eq!(pipeline.fuser().embed_dim(), 16);
        assert_eq!(
            pipeline.memory_paths()[0],
            Some(dir.path().join("memory").join("lexical_medical.json"))
        );
    }

    #[test]
    fn test_unknown_subnet_aborts_build() {
        let dir = TempDir::new().unwrap();
        let mut doc = document(dir.path());
        doc["subnets"] = json!([{"name": "lexical_v1"}, {"name": "ghost"}]);
        let registry = Registry::with_builtins();
        match PipelineFactory::new(&registry).build_from_value(&doc) {
            Err(Error::UnknownComponent { kind, name, available }) => {
                assert_eq!(kind, ComponentKind::Subnet);
                assert_eq!(name, "ghost");
                assert_eq!(available, registry.available(ComponentKind::Subnet));
            },
            other => panic!("expected UnknownComponent, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_key_resolves_nothing() {
        let mut registry = Registry::new();
        registry
            .register_adapter("chinese_v1", |_| panic!("adapter resolved before validation"))
            .unwrap();
        let dir = TempDir::new().unwrap();
        let mut doc = document(dir.path());
        doc.as_object_mut().unwrap().remove("coordinator");
        assert!(matches!(
            PipelineFactory::new(&registry).build_from_value(&doc),
            Err(Error::InvalidConfig { key, .. }) if key == "coordinator"
        ));
    }

    #[test]
    fn test_shared_memory_path_rejected() {
        let dir = TempDir::new().unwrap();
        let mut doc = document(dir.path());
        doc["subnets"] = json!([{"name": "lexical_v1"}, {"name": "lexical_v1"}]);
        let registry = Registry::with_builtins();
        assert!(matches!(
            PipelineFactory::new(&registry).build_from_value(&doc),
            Err(Error::InvalidConfig { key, .. }) if key == "subnets[1]"
        ));
    }

    #[test]
    fn test_equivalent_memory_paths_rejected() {
        let dir = TempDir::new().unwrap();
        let mut doc = document(dir.path());
        let detour = dir
            .path()
            .join("memory")
            .join("sub")
            .join("..")
            .join("lexical_medical.json");
        doc["subnets"] = json!([
            {"name": "lexical_v1"},
            {"name": "domain_v1", "params": {"memory_path": detour}}
        ]);
        let registry = Registry::with_builtins();
        assert!(matches!(
            PipelineFactory::new(&registry).build_from_value(&doc),
            Err(Error::InvalidConfig { key, .. }) if key == "subnets[1]"
        ));
    }

    #[test]
    fn test_same_kind_with_distinct_paths() {
        let dir = TempDir::new().unwrap();
        let mut doc = document(dir.path());
        doc["subnets"] = json!([
            {"name": "lexical_v1"},
            {"name": "lexical_v1", "params": {"memory_path": dir.path().join("second.json")}}
        ]);
        let registry = Registry::with_builtins();
        let pipeline = PipelineFactory::new(&registry).build_from_value(&doc).unwrap();
        assert_eq!(pipeline.subnet_count(), 2);
    }

    #[test]
    fn test_coordinator_params_error_aborts() {
        let dir = TempDir::new().unwrap();
        let mut doc = document(dir.path());
        doc["coordinator"] = json!({"name": "fixed_weight_v1", "params": {"weights": [1.0]}});
        let registry = Registry::with_builtins();
        assert!(PipelineFactory::new(&registry).build_from_value(&doc).is_err());
    }
}
