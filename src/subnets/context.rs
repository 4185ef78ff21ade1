//! Context understanding.

use super::{MemoryView, Specialist, SubnetDeps, SubnetOutput};
use crate::Result;
use crate::models::SequenceEmbedding;

/// Pronoun replacements applied after context is merged in.
const PRONOUNS: [(&str, &str); 3] = [("他", "the patient"), ("她", "the patient"), ("它", "the object")];

/// Resolves references using the caller-supplied context.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextSpecialist;

impl ContextSpecialist {
    fn resolve_pronouns(text: &str) -> String {
        PRONOUNS
            .iter()
            .fold(text.to_string(), |acc, (pronoun, noun)| acc.replace(pronoun, noun))
    }
}

impl Specialist for ContextSpecialist {
    const NAME: &'static str = "context_v1";
    const MEMORY_STEM: &'static str = "context";

    fn run(
        &self,
        deps: &SubnetDeps,
        _memory: &MemoryView<'_>,
        text: &str,
        context: &str,
    ) -> Result<SubnetOutput> {
        let full = if context.is_empty() {
            text.to_string()
        } else {
            format!("{context}. {text}")
        };
        let expanded = deps.lexicon.expand_abbreviations(&full);
        let candidate = Self::resolve_pronouns(&expanded);

        // Without context a single zero row stands in for it.
        let context_embedding = if context.is_empty() {
            SequenceEmbedding::zeros(1, deps.source.embed_dim())
        } else {
            deps.source.embed(context)?
        };
        let combined = context_embedding.concat(&deps.source.embed(text)?)?;

        Ok(SubnetOutput {
            candidate,
            features: combined.mean_pool(),
        })
    }
}
