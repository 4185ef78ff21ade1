//! Syntax transformation.

use super::{MemoryView, Specialist, SubnetDeps, SubnetOutput, pooled_embedding};
use crate::Result;

/// Rewrites sentence structure with the domain's transformation rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntaxSpecialist;

impl Specialist for SyntaxSpecialist {
    const NAME: &'static str = "syntax_v1";
    const MEMORY_STEM: &'static str = "syntax";

    fn run(
        &self,
        deps: &SubnetDeps,
        _memory: &MemoryView<'_>,
        text: &str,
        _context: &str,
    ) -> Result<SubnetOutput> {
        let expanded = deps.lexicon.expand_abbreviations(text);
        let syntax = deps.source.parse_syntax(&expanded);
        tracing::trace!(
            tokens = syntax.token_count,
            structure = %syntax.structure,
            "Parsed source syntax"
        );

        let transformed = deps.lexicon.apply_rules(&expanded);
        let features = pooled_embedding(deps.target.as_ref(), &transformed)?;

        Ok(SubnetOutput {
            candidate: transformed,
            features,
        })
    }
}
