//! Branch to stack mapping.

use glob::Pattern;
use tracing::debug;

use crate::config::BranchMapping;
use crate::error::{IacError, IacResult};

/// Compiled branch mappings; the first matching pattern wins.
#[derive(Debug, Clone)]
pub struct EnvironmentMap {
    entries: Vec<(Pattern, BranchMapping)>,
}

impl EnvironmentMap {
    pub fn new(mappings: &[BranchMapping]) -> IacResult<Self> {
        let entries = mappings
            .iter()
            .map(|mapping| {
                Pattern::new(&mapping.pattern)
                    .map(|pattern| (pattern, mapping.clone()))
                    .map_err(|e| {
                        IacError::InvalidConfig(format!("invalid branch pattern '{}': {}", mapping.pattern, e))
                    })
            })
            .collect::<IacResult<Vec<_>>>()?;

        Ok(Self { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mapping for a branch name or `refs/heads/...` ref.
    pub fn mapping_for_branch(&self, branch: &str) -> Option<&BranchMapping> {
        let branch = branch.strip_prefix("refs/heads/").unwrap_or(branch);
        let found = self
            .entries
            .iter()
            .find(|(pattern, _)| pattern.matches(branch))
            .map(|(_, mapping)| mapping);

        debug!("Branch {} -> {:?}", branch, found.map(|m| &m.stack));
        found
    }

    pub fn stack_for_branch(&self, branch: &str) -> Option<&str> {
        self.mapping_for_branch(branch).map(|m| m.stack.as_str())
    }

    pub fn mappings(&self) -> impl Iterator<Item = &BranchMapping> {
        self.entries.iter().map(|(_, mapping)| mapping)
    }
}
