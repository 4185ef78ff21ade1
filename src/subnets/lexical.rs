//! Lexical alignment.

use super::{MemoryView, Specialist, SubnetDeps, SubnetOutput, pooled_embedding};
use crate::Result;

/// Aligns source and target vocabulary term by term.
///
/// Abbreviations are expanded first. A remembered translation of the whole
/// expanded text wins; otherwise every source token goes through the
/// lexicon's term table and the target adapter reassembles the result.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalSpecialist;

impl Specialist for LexicalSpecialist {
    const NAME: &'static str = "lexical_v1";
    const MEMORY_STEM: &'static str = "lexical";

    fn run(
        &self,
        deps: &SubnetDeps,
        memory: &MemoryView<'_>,
        text: &str,
        _context: &str,
    ) -> Result<SubnetOutput> {
        let expanded = deps.lexicon.expand_abbreviations(text);

        let candidate = if let Some(hit) = memory.lookup(&expanded)? {
            hit.target
        } else {
            let translated: Vec<String> = deps
                .source
                .tokenize(&expanded)
                .iter()
                .map(|token| deps.lexicon.translate_term(token))
                .collect();
            deps.target.detokenize(&translated)
        };

        Ok(SubnetOutput {
            candidate,
            features: pooled_embedding(deps.source.as_ref(), &expanded)?,
        })
    }
}
