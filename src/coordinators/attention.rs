//! Learned attention fuser.
//!
//! Scores subnets from the mean-pooled source embedding with a two-layer
//! network: `Linear(embed_dim, hidden_dim) -> ReLU -> Linear(hidden_dim,
//! subnet_count) -> Softmax`. Parameters are initialized deterministically
//! from `seed`, so identical configurations produce identical fusers.

use super::{Fuser, FuserContext};
use crate::models::SequenceEmbedding;
use crate::{Error, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Default hidden layer width.
pub const DEFAULT_HIDDEN_DIM: usize = 256;

/// Params for [`AttentionFuser`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AttentionParams {
    /// Hidden layer width. Default: 256.
    pub hidden_dim: usize,
    /// Initialization seed. Default: 0.
    pub seed: u64,
}

impl Default for AttentionParams {
    fn default() -> Self {
        Self {
            hidden_dim: DEFAULT_HIDDEN_DIM,
            seed: 0,
        }
    }
}

/// One dense layer, row-major `[inputs][outputs]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Linear {
    inputs: usize,
    outputs: usize,
    weight: Vec<f32>,
    bias: Vec<f32>,
}

impl Linear {
    #[allow(clippy::cast_precision_loss)]
    fn init(inputs: usize, outputs: usize, rng: &mut ChaCha8Rng) -> Self {
        // Uniform in ±1/sqrt(fan_in).
        let bound = 1.0 / (inputs.max(1) as f32).sqrt();
        let weight = (0..inputs * outputs)
            .map(|_| rng.random_range(-bound..bound))
            .collect();
        let bias = (0..outputs)
            .map(|_| rng.random_range(-bound..bound))
            .collect();
        Self {
            inputs,
            outputs,
            weight,
            bias,
        }
    }

    fn forward(&self, x: &[f32]) -> Vec<f32> {
        let mut out = self.bias.clone();
        for (i, &xi) in x.iter().enumerate().take(self.inputs) {
            let row = &self.weight[i * self.outputs..(i + 1) * self.outputs];
            for (o, &w) in out.iter_mut().zip(row) {
                *o = w.mul_add(xi, *o);
            }
        }
        out
    }

    fn is_consistent(&self) -> bool {
        self.weight.len() == self.inputs * self.outputs && self.bias.len() == self.outputs
    }
}

/// Serialized fuser parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct AttentionState {
    subnet_count: usize,
    embed_dim: usize,
    hidden_dim: usize,
    hidden: Linear,
    output: Linear,
}

/// Attention fuser: selects the candidate with the highest softmax weight.
#[derive(Debug, Clone)]
pub struct AttentionFuser {
    context: FuserContext,
    hidden_dim: usize,
    hidden: Linear,
    output: Linear,
}

impl AttentionFuser {
    /// Registry name.
    pub const NAME: &'static str = "attention_v1";

    /// Creates a freshly initialized fuser.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if any dimension is zero.
    pub fn new(context: FuserContext, params: &AttentionParams) -> Result<Self> {
        if context.subnet_count == 0 || context.embed_dim == 0 || params.hidden_dim == 0 {
            return Err(Error::InvalidInput(format!(
                "{} needs non-zero dimensions (subnets={}, embed_dim={}, hidden_dim={})",
                Self::NAME,
                context.subnet_count,
                context.embed_dim,
                params.hidden_dim
            )));
        }

        let digest = Sha256::digest(format!("{}:{}", Self::NAME, params.seed).as_bytes());
        let mut rng = ChaCha8Rng::from_seed(digest.into());
        let hidden = Linear::init(context.embed_dim, params.hidden_dim, &mut rng);
        let output = Linear::init(params.hidden_dim, context.subnet_count, &mut rng);

        Ok(Self {
            context,
            hidden_dim: params.hidden_dim,
            hidden,
            output,
        })
    }

    /// Creates a fuser from a configuration params map.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for unknown fields, wrong types or zero
    /// dimensions.
    pub fn from_params(context: FuserContext, params: &serde_json::Value) -> Result<Self> {
        let params = if params.is_null() {
            AttentionParams::default()
        } else {
            serde_json::from_value(params.clone())
                .map_err(|e| Error::InvalidInput(format!("{} params: {e}", Self::NAME)))?
        };
        Self::new(context, &params)
    }

    /// Hidden layer width.
    #[must_use]
    pub const fn hidden_dim(&self) -> usize {
        self.hidden_dim
    }
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

impl Fuser for AttentionFuser {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn subnet_count(&self) -> usize {
        self.context.subnet_count
    }

    fn embed_dim(&self) -> usize {
        self.context.embed_dim
    }

    fn weights(&self, _features: &[Vec<f32>], input: &SequenceEmbedding) -> Result<Vec<f32>> {
        if input.dim() != self.context.embed_dim {
            return Err(Error::InvalidInput(format!(
                "{} expects embeddings of width {}, got {}",
                Self::NAME,
                self.context.embed_dim,
                input.dim()
            )));
        }
        let pooled = input.mean_pool();
        let hidden: Vec<f32> = self
            .hidden
            .forward(&pooled)
            .into_iter()
            .map(|h| h.max(0.0))
            .collect();
        Ok(softmax(&self.output.forward(&hidden)))
    }

    fn state(&self) -> Result<serde_json::Value> {
        serde_json::to_value(AttentionState {
            subnet_count: self.context.subnet_count,
            embed_dim: self.context.embed_dim,
            hidden_dim: self.hidden_dim,
            hidden: self.hidden.clone(),
            output: self.output.clone(),
        })
        .map_err(|e| Error::failed("fuser_state", e))
    }

    fn load_state(&mut self, state: &serde_json::Value) -> Result<()> {
        let stored: AttentionState = serde_json::from_value(state.clone())
            .map_err(|e| Error::InvalidInput(format!("{} state: {e}", Self::NAME)))?;

        let shape_matches = stored.subnet_count == self.context.subnet_count
            && stored.embed_dim == self.context.embed_dim
            && stored.hidden.inputs == stored.embed_dim
            && stored.hidden.outputs == stored.hidden_dim
            && stored.output.inputs == stored.hidden_dim
            && stored.output.outputs == stored.subnet_count
            && stored.hidden.is_consistent()
            && stored.output.is_consistent();
        if !shape_matches {
            return Err(Error::InvalidInput(format!(
                "{} state shape (subnets={}, embed_dim={}, hidden_dim={}) does not fit fuser (subnets={}, embed_dim={})",
                Self::NAME,
                stored.subnet_count,
                stored.embed_dim,
                stored.hidden_dim,
                self.context.subnet_count,
                self.context.embed_dim
            )));
        }

        self.hidden_dim = stored.hidden_dim;
        self.hidden = stored.hidden;
        self.output = stored.output;
        Ok(())
    }
}
