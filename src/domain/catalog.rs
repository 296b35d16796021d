//! In-memory catalog of technologies, operations and structure usages.
//!
//! Plays the persistence role for the component hooks: lookups by identity or number,
//! and identity assignment on save.

use std::collections::BTreeMap;

use generational_arena::Index;
use tracing::{debug, instrument};

use crate::domain::entities::{
    EntityId, FieldValue, Operation, StructureUsage, Technology, TechnologyId,
};
use crate::domain::error::{DomainError, DomainResult};

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    technologies: BTreeMap<TechnologyId, Technology>,
    operations: BTreeMap<EntityId, Operation>,
    structure_usages: Vec<StructureUsage>,
    /// Last identity handed out
    sequence: u64,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Raises the sequence so it never hands out an identity already in use.
    pub fn bump_sequence(&mut self, at_least: u64) {
        self.sequence = self.sequence.max(at_least);
    }

    pub fn next_id(&mut self) -> EntityId {
        self.sequence += 1;
        EntityId(self.sequence)
    }

    pub fn add_technology(&mut self, technology: Technology) -> DomainResult<TechnologyId> {
        if self.technology_by_number(&technology.number).is_ok() {
            return Err(DomainError::DuplicateTechnology(technology.number));
        }
        let id = technology.id;
        self.bump_sequence(id.0);
        self.technologies.insert(id, technology);
        Ok(id)
    }

    /// Creates an empty technology with a fresh identity.
    pub fn create_technology(
        &mut self,
        number: &str,
        product: Option<EntityId>,
    ) -> DomainResult<TechnologyId> {
        let id = TechnologyId(self.next_id().0);
        self.add_technology(Technology::new(id, number, product))
    }

    pub fn technology(&self, id: TechnologyId) -> DomainResult<&Technology> {
        self.technologies
            .get(&id)
            .ok_or_else(|| DomainError::TechnologyNotFound(id.to_string()))
    }

    pub fn technology_mut(&mut self, id: TechnologyId) -> DomainResult<&mut Technology> {
        self.technologies
            .get_mut(&id)
            .ok_or_else(|| DomainError::TechnologyNotFound(id.to_string()))
    }

    pub fn technology_by_number(&self, number: &str) -> DomainResult<&Technology> {
        self.technologies
            .values()
            .find(|t| t.number == number)
            .ok_or_else(|| DomainError::TechnologyNotFound(number.to_string()))
    }

    pub fn technologies(&self) -> impl Iterator<Item = &Technology> {
        self.technologies.values()
    }

    pub fn add_operation(&mut self, operation: Operation) {
        self.bump_sequence(operation.id.0);
        self.operations.insert(operation.id, operation);
    }

    pub fn operation(&self, id: EntityId) -> DomainResult<&Operation> {
        self.operations
            .get(&id)
            .ok_or(DomainError::OperationNotFound(id))
    }

    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations.values()
    }

    pub fn add_structure_usage(&mut self, usage: StructureUsage) {
        self.structure_usages.push(usage);
    }

    /// Technology whose tree holds the component with identity `id`.
    pub fn component_owner(&self, id: EntityId) -> DomainResult<TechnologyId> {
        self.technologies()
            .find(|t| t.operation_components.find(id).is_some())
            .map(|t| t.id)
            .ok_or_else(|| DomainError::NodeNotFound(id.to_string()))
    }

    pub fn structure_usages(&self) -> &[StructureUsage] {
        &self.structure_usages
    }

    /// Usages of the component with identity `id`.
    pub fn usages_of(&self, id: EntityId) -> impl Iterator<Item = &StructureUsage> {
        self.structure_usages
            .iter()
            .filter(move |u| u.operation_component == id)
    }

    /// Assigns fresh identities to every component of the subtree at `idx` and to every
    /// owned row that has none. Returns the identity of the subtree root.
    #[instrument(level = "debug", skip(self))]
    pub fn persist_subtree(&mut self, technology: TechnologyId, idx: Index) -> DomainResult<EntityId> {
        let pending: Vec<Index> = self
            .technology(technology)?
            .operation_components
            .iter_from(idx)
            .map(|(i, _)| i)
            .collect();
        if pending.is_empty() {
            return Err(DomainError::NodeNotFound(format!("{:?}", idx)));
        }

        let mut assigned = 0usize;
        for node_idx in pending {
            let mut sequence = self.sequence;
            let node = self
                .technology_mut(technology)?
                .operation_components
                .get_node_mut(node_idx)
                .ok_or_else(|| DomainError::NodeNotFound(format!("{:?}", node_idx)))?;

            let mut fresh = || {
                sequence += 1;
                EntityId(sequence)
            };
            if node.data.id.is_none() {
                node.data.id = Some(fresh());
                assigned += 1;
            }
            for (_, value) in node.data.attributes.iter_mut() {
                if let FieldValue::HasMany(rows) = value {
                    for row in rows.iter_mut().filter(|r| r.id.is_none()) {
                        row.id = Some(fresh());
                    }
                }
            }
            self.sequence = sequence;
        }
        debug!("assigned {} component identities", assigned);

        self.technology(technology)?
            .operation_components
            .get_node(idx)
            .and_then(|n| n.data.id)
            .ok_or_else(|| DomainError::NodeNotFound(format!("{:?}", idx)))
    }
}
