//! Domain adaptation.

use super::{MemoryView, Specialist, SubnetDeps, SubnetOutput, pooled_embedding};
use crate::Result;

/// Applies domain conventions: abbreviations, rules, then whole-text terms.
#[derive(Debug, Clone, Copy, Default)]
pub struct DomainSpecialist;

impl Specialist for DomainSpecialist {
    const NAME: &'static str = "domain_v1";
    const MEMORY_STEM: &'static str = "domain";

    fn run(
        &self,
        deps: &SubnetDeps,
        _memory: &MemoryView<'_>,
        text: &str,
        _context: &str,
    ) -> Result<SubnetOutput> {
        let expanded = deps.lexicon.expand_abbreviations(text);
        let transformed = deps.lexicon.apply_rules(&expanded);
        let candidate = deps.lexicon.translate_term(&transformed);

        Ok(SubnetOutput {
            candidate,
            features: pooled_embedding(deps.source.as_ref(), &expanded)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::subnets::test_support::medical_deps;
    use crate::subnets::{DomainSubnet, Subnet, SubnetParams};
    use tempfile::TempDir;

    #[test]
    fn test_expands_abbreviation() {
        let dir = TempDir::new().unwrap();
        let subnet = DomainSubnet::new(medical_deps(dir.path()), &SubnetParams::default()).unwrap();
        let output = subnet.process("心梗患者需要紧急处理", "").unwrap();
        assert!(output.candidate.contains("心肌梗死"));
    }

    #[test]
    fn test_state_rejects_other_kind() {
        let dir = TempDir::new().unwrap();
        let deps = medical_deps(dir.path());
        let domain = DomainSubnet::new(deps.clone(), &SubnetParams::default()).unwrap();
        let lexical =
            crate::subnets::LexicalSubnet::new(deps, &SubnetParams::default()).unwrap();

        let state = domain.state().unwrap();
        assert!(domain.load_state(&state).is_ok());
        assert!(lexical.load_state(&state).is_err());
    }
}
