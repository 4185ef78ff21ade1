//! Data models for octopus.

mod component;
mod embedding;
mod sample;
mod syntax;

pub use component::{ComponentKind, Mode};
pub use embedding::SequenceEmbedding;
pub use sample::{MemorySample, StoredSample};
pub use syntax::SyntaxFeatures;
