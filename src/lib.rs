//! # Octopus
//!
//! A configuration-driven translation pipeline.
//!
//! Octopus assembles interchangeable components from a declarative
//! configuration document and runs every request through all of them before
//! fusing their outputs into one result.
//!
//! ## Architecture
//!
//! ```text
//! PipelineConfig ──► PipelineFactory ──► Registry (kind, name) → constructor
//!                          │
//!                          ▼
//!                      Pipeline
//!   source Adapter ─┬─► Subnet 0 ─┐
//!   target Adapter ─┼─► Subnet 1 ─┼─► Fuser ──► final text
//!   Lexicon ────────┴─► Subnet n ─┘
//!                      (each Subnet owns one MemoryLog)
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use octopus::{PipelineConfig, PipelineFactory, Registry};
//!
//! let config = PipelineConfig::load_from_file("configs/zh2en_medical.yaml".as_ref())?;
//! let pipeline = PipelineFactory::new(Registry::global()).build(&config)?;
//! let text = pipeline.translate("心梗患者需要紧急处理", "")?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod adapters;
pub mod config;
pub mod coordinators;
pub mod lexicon;
pub mod models;
pub mod observability;
pub mod registry;
pub mod services;
pub mod storage;
pub mod subnets;

pub use adapters::Adapter;
pub use config::PipelineConfig;
pub use coordinators::Fuser;
pub use lexicon::{DomainLexicon, Lexicon};
pub use models::{ComponentKind, MemorySample, Mode, SequenceEmbedding, SyntaxFeatures};
pub use registry::{DuplicatePolicy, Registry};
pub use services::{Checkpoint, Pipeline, PipelineFactory};
pub use storage::MemoryLog;
pub use subnets::Subnet;

/// Error type for octopus operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidConfig` | Required configuration key missing, malformed section, inconsistent assembly |
/// | `UnknownComponent` | A name is not registered for the requested component kind |
/// | `DuplicateComponent` | Registering a taken name under `DuplicatePolicy::Reject` |
/// | `StateMismatch` | Checkpoint holds a different number of subnet states than the pipeline |
/// | `NoStorageTarget` | A memory log is persisted without a configured location |
/// | `InvalidInput` | Bad component params or arguments to an operation |
/// | `OperationFailed` | I/O, serialization, poisoned locks, failed tasks |
#[derive(Debug, ThisError)]
pub enum Error {
    /// The configuration document is invalid.
    ///
    /// Raised before any component is resolved when a required key is absent,
    /// and during assembly when the resolved components are inconsistent.
    #[error("invalid config: '{key}' {reason}")]
    InvalidConfig {
        /// The offending configuration key.
        key: String,
        /// Why the key was rejected.
        reason: String,
    },

    /// A component name is not registered for its kind.
    #[error("{kind} '{name}' not registered. Available: {available:?}")]
    UnknownComponent {
        /// The component kind that was looked up.
        kind: models::ComponentKind,
        /// The requested name.
        name: String,
        /// Names currently registered for `kind`, sorted.
        available: Vec<String>,
    },

    /// A component name is already bound and the registry rejects duplicates.
    #[error("{kind} '{name}' is already registered")]
    DuplicateComponent {
        /// The component kind.
        kind: models::ComponentKind,
        /// The duplicated name.
        name: String,
    },

    /// A checkpoint does not match the pipeline it is loaded into.
    #[error("checkpoint holds {found} subnet states but the pipeline has {expected} subnets")]
    StateMismatch {
        /// Number of subnets in the pipeline.
        expected: usize,
        /// Number of subnet states in the checkpoint.
        found: usize,
    },

    /// A memory log was asked to persist without a storage location.
    #[error("no storage location configured for memory log")]
    NoStorageTarget,

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Builds an [`Error::InvalidConfig`] for a missing required key.
    #[must_use]
    pub fn missing_key(key: impl Into<String>) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            reason: "missing required key".to_string(),
        }
    }

    /// Builds an [`Error::OperationFailed`] from any displayable cause.
    pub(crate) fn failed(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::OperationFailed {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for octopus operations.
pub type Result<T> = std::result::Result<T, Error>;
