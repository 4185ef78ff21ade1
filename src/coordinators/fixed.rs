//! Constant-weight fuser.

use super::{Fuser, FuserContext};
use crate::models::SequenceEmbedding;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Params for [`FixedWeightFuser`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixedWeightParams {
    /// One weight per subnet, in pipeline order.
    pub weights: Vec<f32>,
}

/// Fuser that scores subnets with configured constants, ignoring the input.
///
/// Useful for pinning a preferred subnet and for reproducible tests.
#[derive(Debug, Clone)]
pub struct FixedWeightFuser {
    weights: Vec<f32>,
    embed_dim: usize,
}

impl FixedWeightFuser {
    /// Registry name.
    pub const NAME: &'static str = "fixed_weight_v1";

    /// Creates a fuser with explicit weights.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] unless there is exactly one weight per
    /// subnet.
    pub fn new(context: FuserContext, weights: Vec<f32>) -> Result<Self> {
        if weights.len() != context.subnet_count {
            return Err(Error::InvalidInput(format!(
                "{} needs {} weights, got {}",
                Self::NAME,
                context.subnet_count,
                weights.len()
            )));
        }
        Ok(Self {
            weights,
            embed_dim: context.embed_dim,
        })
    }

    /// Creates a fuser from a configuration params map.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `weights` is missing or has the
    /// wrong length.
    pub fn from_params(context: FuserContext, params: &serde_json::Value) -> Result<Self> {
        let params: FixedWeightParams = serde_json::from_value(params.clone())
            .map_err(|e| Error::InvalidInput(format!("{} params: {e}", Self::NAME)))?;
        Self::new(context, params.weights)
    }
}

impl Fuser for FixedWeightFuser {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn subnet_count(&self) -> usize {
        self.weights.len()
    }

    fn embed_dim(&self) -> usize {
        self.embed_dim
    }

    fn weights(&self, _features: &[Vec<f32>], _input: &SequenceEmbedding) -> Result<Vec<f32>> {
        Ok(self.weights.clone())
    }

    fn state(&self) -> Result<serde_json::Value> {
        serde_json::to_value(FixedWeightParams {
            weights: self.weights.clone(),
        })
        .map_err(|e| Error::failed("fuser_state", e))
    }

    fn load_state(&mut self, state: &serde_json::Value) -> Result<()> {
        let stored: FixedWeightParams = serde_json::from_value(state.clone())
            .map_err(|e| Error::InvalidInput(format!("{} state: {e}", Self::NAME)))?;
        if stored.weights.len() != self.weights.len() {
            return Err(Error::InvalidInput(format!(
                "{} state has {} weights, expected {}",
                Self::NAME,
                stored.weights.len(),
                self.weights.len()
            )));
        }
        self.weights = stored.weights;
        Ok(())
    }
}
