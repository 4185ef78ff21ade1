//! Pipeline configuration.
//!
//! A configuration document names every component of a pipeline:
//!
//! ```yaml
//! domain: medical
//! data_dir: data
//! adapters:
//!   source: chinese_v1
//!   target: english_v1
//!   source_params: { embed_dim: 768 }
//! subnets:
//!   - name: lexical_v1
//!   - name: syntax_v1
//!     params: { max_size: 500 }
//! coordinator:
//!   name: attention_v1
//!   params: { hidden_dim: 256 }
//! ```
//!
//! `domain`, `adapters`, `subnets` and `coordinator` are required; a missing
//! key fails before any component is resolved.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Required top-level keys, in the order they are checked.
pub const REQUIRED_KEYS: [&str; 4] = ["domain", "adapters", "subnets", "coordinator"];

/// Default lexicon directory.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Default memory log directory.
pub const DEFAULT_MEMORY_DIR: &str = "memory";

/// Directory holding per-config checkpoints.
pub const DEFAULT_MODEL_DIR: &str = "models";

/// File names searched by [`PipelineConfig::load_default`].
const DEFAULT_FILE_NAMES: [&str; 2] = ["octopus.yaml", "octopus.toml"];

/// Adapter selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdapterSection {
    /// Registry name of the source adapter.
    pub source: String,
    /// Params handed to the source adapter.
    #[serde(default)]
    pub source_params: serde_json::Value,
    /// Registry name of the target adapter.
    pub target: String,
    /// Params handed to the target adapter.
    #[serde(default)]
    pub target_params: serde_json::Value,
}

/// One named component and its params.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentSpec {
    /// Registry name.
    pub name: String,
    /// Component-specific params; `null` selects the defaults.
    #[serde(default)]
    pub params: serde_json::Value,
}

impl ComponentSpec {
    /// Creates a spec with default params.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: serde_json::Value::Null,
        }
    }

    /// Sets the params.
    #[must_use]
    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = params;
        self
    }
}

/// A validated configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Domain whose lexicon and memory logs are used.
    pub domain: String,
    /// Directory holding the domain lexicon files.
    pub data_dir: PathBuf,
    /// Directory holding default memory log locations.
    pub memory_dir: PathBuf,
    /// Adapter selection.
    pub adapters: AdapterSection,
    /// Subnets in pipeline order.
    pub subnets: Vec<ComponentSpec>,
    /// Fuser selection.
    pub coordinator: ComponentSpec,
}

/// Checks that every required key is present.
///
/// Nested values are not type-checked here.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] naming the first missing key.
pub fn validate(document: &serde_json::Value) -> Result<()> {
    let Some(map) = document.as_object() else {
        return Err(Error::InvalidConfig {
            key: "document".to_string(),
            reason: "must be a mapping".to_string(),
        });
    };
    REQUIRED_KEYS
        .iter()
        .find(|key| !map.contains_key(**key))
        .map_or(Ok(()), |key| Err(Error::missing_key(*key)))
}

fn section<T: DeserializeOwned>(document: &serde_json::Value, key: &str) -> Result<T> {
    serde_json::from_value(document[key].clone()).map_err(|e| Error::InvalidConfig {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

fn optional_dir(document: &serde_json::Value, key: &str, default: &str) -> Result<PathBuf> {
    match document.get(key) {
        None | Some(serde_json::Value::Null) => Ok(PathBuf::from(default)),
        Some(_) => section(document, key),
    }
}

impl PipelineConfig {
    /// Validates and parses a configuration document.
    ///
    /// Unknown top-level keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for a missing required key or a
    /// malformed section.
    pub fn from_value(document: &serde_json::Value) -> Result<Self> {
        validate(document)?;

        let config = Self {
            domain: section(document, "domain")?,
            data_dir: optional_dir(document, "data_dir", DEFAULT_DATA_DIR)?,
            memory_dir: optional_dir(document, "memory_dir", DEFAULT_MEMORY_DIR)?,
            adapters: section(document, "adapters")?,
            subnets: section(document, "subnets")?,
            coordinator: section(document, "coordinator")?,
        };

        if config.domain.trim().is_empty() {
            return Err(Error::InvalidConfig {
                key: "domain".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if config.subnets.is_empty() {
            return Err(Error::InvalidConfig {
                key: "subnets".to_string(),
                reason: "must list at least one subnet".to_string(),
            });
        }

        Ok(config)
    }

    /// Loads configuration from a file path.
    ///
    /// The format follows the extension: `.yaml`/`.yml`, `.toml` or `.json`.
    /// Other extensions are read as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// document is invalid.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let document: serde_json::Value = match extension.as_deref() {
            Some("toml") => toml::from_str(&contents).map_err(|e| Error::failed("parse_config_file", e))?,
            Some("json") => {
                serde_json::from_str(&contents).map_err(|e| Error::failed("parse_config_file", e))?
            },
            _ => serde_yaml_ng::from_str(&contents)
                .map_err(|e| Error::failed("parse_config_file", e))?,
        };

        tracing::debug!(path = %path.display(), "Loaded config file");
        Self::from_value(&document)
    }

    /// Candidate default config locations, in lookup order.
    ///
    /// 1. Platform-specific config dir (`~/Library/Application Support/octopus/` on macOS)
    /// 2. XDG config dir (`~/.config/octopus/`)
    #[must_use]
    pub fn default_paths() -> Vec<PathBuf> {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Vec::new();
        };
        let platform = base_dirs.config_dir().join("octopus");
        let xdg = base_dirs.home_dir().join(".config").join("octopus");

        let mut paths = Vec::new();
        for dir in [platform, xdg] {
            for name in DEFAULT_FILE_NAMES {
                let path = dir.join(name);
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
        }
        paths
    }

    /// Loads the first config file found in the default locations, together
    /// with the path it was read from.
    ///
    /// Returns `Ok(None)` when no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if a file exists but is invalid.
    pub fn load_default() -> Result<Option<(PathBuf, Self)>> {
        Self::default_paths()
            .into_iter()
            .find(|path| path.exists())
            .map(|path| Self::load_from_file(&path).map(|config| (path, config)))
            .transpose()
    }
}

/// Checkpoint location for the config file at `config_path`.
///
/// `configs/zh2en_medical.yaml` maps to `models/zh2en_medical.ckpt`, so each
/// config trains into and translates from its own checkpoint.
#[must_use]
pub fn checkpoint_path(config_path: &Path) -> PathBuf {
    let stem = config_path
        .file_stem()
        .map_or_else(|| "octopus".into(), |stem| stem.to_string_lossy());
    Path::new(DEFAULT_MODEL_DIR).join(format!("{stem}.ckpt"))
}
