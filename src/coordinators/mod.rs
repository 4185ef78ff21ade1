//! Fusers ("coordinators").
//!
//! A fuser consumes every subnet's candidate and feature vector, together
//! with the source embedding of the whole input, and returns one final text.
//! The built-in policies score each subnet and select the best candidate;
//! on exact ties the lowest subnet index wins.

mod attention;
mod fixed;

pub use attention::{AttentionFuser, AttentionParams};
pub use fixed::{FixedWeightFuser, FixedWeightParams};

use crate::models::{Mode, SequenceEmbedding};
use crate::{Error, Result};

/// Dependencies injected into every fuser by the factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuserContext {
    /// Number of subnets the fuser arbitrates between.
    pub subnet_count: usize,
    /// Source adapter embedding width.
    pub embed_dim: usize,
}

/// Capability contract for fusers.
///
/// `subnet_count` and `embed_dim` are fixed at construction.
pub trait Fuser: Send + Sync {
    /// Registry name.
    fn name(&self) -> &str;

    /// Number of subnets this fuser was built for.
    fn subnet_count(&self) -> usize;

    /// Embedding width this fuser was built for.
    fn embed_dim(&self) -> usize;

    /// Scores every subnet for this input; one weight per subnet.
    ///
    /// # Errors
    ///
    /// Returns an error if the input does not match the fuser's shape.
    fn weights(&self, features: &[Vec<f32>], input: &SequenceEmbedding) -> Result<Vec<f32>>;

    /// Fuses all candidates into the final text.
    ///
    /// The default policy returns the candidate with the highest weight,
    /// preferring the lowest index on ties.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the number of candidates or feature
    /// vectors differs from [`Fuser::subnet_count`].
    fn fuse(
        &self,
        candidates: &[String],
        features: &[Vec<f32>],
        input: &SequenceEmbedding,
    ) -> Result<String> {
        if candidates.len() != self.subnet_count() || features.len() != self.subnet_count() {
            return Err(Error::InvalidInput(format!(
                "{} expects {} candidates, got {} candidates and {} feature vectors",
                self.name(),
                self.subnet_count(),
                candidates.len(),
                features.len()
            )));
        }
        let weights = self.weights(features, input)?;
        let best = select_best(&weights).ok_or_else(|| {
            Error::InvalidInput(format!("{} produced no usable weights", self.name()))
        })?;
        candidates
            .get(best)
            .cloned()
            .ok_or_else(|| Error::InvalidInput(format!("weight index {best} out of range")))
    }

    /// Receives the pipeline's execution mode.
    fn set_mode(&mut self, _mode: Mode) {}

    /// Serializes learned parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be serialized.
    fn state(&self) -> Result<serde_json::Value>;

    /// Restores parameters produced by [`Fuser::state`].
    ///
    /// Nothing is modified unless the whole state is valid.
    ///
    /// # Errors
    ///
    /// Returns an error if the state does not fit this fuser.
    fn load_state(&mut self, state: &serde_json::Value) -> Result<()>;
}

/// Index of the highest weight; the lowest index wins exact ties.
///
/// NaN weights are never selected. Returns `None` if no weight is usable.
#[must_use]
pub fn select_best(weights: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &w) in weights.iter().enumerate() {
        if w.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if w <= top => {},
            _ => best = Some((i, w)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_best_highest() {
        assert_eq!(select_best(&[0.1, 0.7, 0.2]), Some(1));
    }

    #[test]
    fn test_select_best_tie_prefers_lowest_index() {
        assert_eq!(select_best(&[0.2, 0.4, 0.4]), Some(1));
        assert_eq!(select_best(&[0.5, 0.5]), Some(0));
    }

    #[test]
    fn test_select_best_skips_nan() {
        assert_eq!(select_best(&[f32::NAN, 0.1]), Some(1));
        assert_eq!(select_best(&[f32::NAN]), None);
        assert_eq!(select_best(&[]), None);
    }
}
