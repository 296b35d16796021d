//! Reference cycle guard
//!
//! A technology may populate a new component from another technology's operation
//! tree. Following such a reference must not lead back to a technology already on
//! the chain.
//!
//! The check is single-hop: the chain is seeded with the owning technology and is
//! not grown while resolving further references, so `A -> B -> A` passes.

use std::collections::HashSet;

use tracing::instrument;

use crate::domain::entities::{Technology, TechnologyId};

/// Technologies visited while resolving a reference. Lives for one copy attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceChain {
    visited: HashSet<TechnologyId>,
}

impl ReferenceChain {
    /// Chain seeded with the technology that owns the component requesting the copy.
    pub fn starting_at(owner: TechnologyId) -> Self {
        Self {
            visited: HashSet::from([owner]),
        }
    }

    pub fn contains(&self, id: TechnologyId) -> bool {
        self.visited.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.visited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
    }
}

impl FromIterator<TechnologyId> for ReferenceChain {
    fn from_iter<I: IntoIterator<Item = TechnologyId>>(iter: I) -> Self {
        Self {
            visited: iter.into_iter().collect(),
        }
    }
}

/// True iff `referenced` is already on the chain.
#[instrument(level = "debug", skip(referenced), fields(referenced = %referenced.id))]
pub fn detect_cycle(visited: &ReferenceChain, referenced: &Technology) -> bool {
    visited.contains(referenced.id)
}
