//! Component kinds and execution modes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three capability kinds a [`Registry`](crate::Registry) binds names for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    /// Language adapters.
    Adapter,
    /// Processing units.
    Subnet,
    /// Fusers.
    Coordinator,
}

impl ComponentKind {
    /// Returns all component kinds in resolution order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Adapter, Self::Subnet, Self::Coordinator]
    }

    /// Returns the kind as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Adapter => "adapter",
            Self::Subnet => "subnet",
            Self::Coordinator => "coordinator",
        }
    }

    /// Parses a kind from a string (case-insensitive).
    ///
    /// `fuser` is accepted as an alias for `coordinator`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "adapter" | "adapters" => Some(Self::Adapter),
            "subnet" | "subnets" => Some(Self::Subnet),
            "coordinator" | "fuser" => Some(Self::Coordinator),
            _ => None,
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Execution mode propagated to every pipeline component.
///
/// Advisory for components whose behavior does not change between modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Learning from new samples.
    Training,
    /// Serving requests.
    #[default]
    Inference,
}

impl Mode {
    /// Returns true for [`Mode::Training`].
    #[must_use]
    pub const fn is_training(self) -> bool {
        matches!(self, Self::Training)
    }

    /// Parses a mode string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "training" | "train" => Some(Self::Training),
            "inference" | "eval" => Some(Self::Inference),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Training => write!(f, "training"),
            Self::Inference => write!(f, "inference"),
        }
    }
}
