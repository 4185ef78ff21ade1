//! Pipeline checkpoints.

use crate::storage::temp_path;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Upper bound on checkpoint size read from disk.
const MAX_CHECKPOINT_BYTES: u64 = 256 * 1024 * 1024;

/// Learned state of a whole pipeline, keyed by component position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Source adapter state.
    pub source_adapter: serde_json::Value,
    /// Target adapter state.
    pub target_adapter: serde_json::Value,
    /// Subnet states in pipeline order.
    pub subnets: Vec<serde_json::Value>,
    /// Fuser state.
    pub coordinator: serde_json::Value,
}

impl Checkpoint {
    /// Writes the checkpoint, replacing any existing file atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or I/O fails.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::failed("create_checkpoint_dir", e))?;
        }

        let json =
            serde_json::to_vec(self).map_err(|e| Error::failed("serialize_checkpoint", e))?;
        let tmp = temp_path(path);
        fs::write(&tmp, json).map_err(|e| Error::OperationFailed {
            operation: "write_checkpoint".to_string(),
            cause: format!("{}: {e}", tmp.display()),
        })?;
        fs::rename(&tmp, path).map_err(|e| Error::OperationFailed {
            operation: "replace_checkpoint".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        tracing::info!(path = %path.display(), subnets = self.subnets.len(), "Saved checkpoint");
        Ok(())
    }

    /// Reads a checkpoint written by [`Checkpoint::write`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, too large, or malformed.
    pub fn read(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path).map_err(|e| Error::OperationFailed {
            operation: "read_checkpoint".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;
        if metadata.len() > MAX_CHECKPOINT_BYTES {
            return Err(Error::InvalidInput(format!(
                "checkpoint {} exceeds {MAX_CHECKPOINT_BYTES} bytes",
                path.display()
            )));
        }

        let bytes = fs::read(path).map_err(|e| Error::failed("read_checkpoint", e))?;
        serde_json::from_slice(&bytes).map_err(|e| Error::OperationFailed {
            operation: "parse_checkpoint".to_string(),
            cause: format!("{}: {e}", path.display()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample() -> Checkpoint {
        Checkpoint {
            source_adapter: json!({"language": "zh"}),
            target_adapter: json!({"language": "en"}),
            subnets: vec![json!({"name": "lexical_v1"}), json!({"name": "syntax_v1"})],
            coordinator: json!({"weights": [0.5, 0.5]}),
        }
    }

    #[test]
    fn test_write_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("model.ckpt");
        sample().write(&path).unwrap();
        assert!(!temp_path(&path).exists());
        assert_eq!(Checkpoint::read(&path).unwrap(), sample());
    }

    #[test]
    fn test_has_four_named_blobs() {
        let value = serde_json::to_value(sample()).unwrap();
        let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            vec!["coordinator", "source_adapter", "subnets", "target_adapter"]
        );
    }

    #[test]
    fn test_read_missing_or_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.ckpt");
        assert!(Checkpoint::read(&path).is_err());
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            Checkpoint::read(&path),
            Err(Error::OperationFailed { .. })
        ));
    }
}
