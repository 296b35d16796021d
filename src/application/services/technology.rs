//! Technology operation tree service
//!
//! Applies the component hooks to a catalog: create with reference copy, edit, delete.

use chrono::NaiveDateTime;
use generational_arena::Index;
use tracing::{debug, info, instrument};

use crate::application::hooks::{ComponentDraft, OperationComponentHooks};
use crate::application::ApplicationResult;
use crate::domain::{
    Attributes, Catalog, ComponentData, DomainError, EntityId, TechnologyId,
};

/// Input for creating an operation component.
#[derive(Debug, Clone, Default)]
pub struct NewComponent {
    /// Identity of the parent component, None to attach below the root
    pub parent: Option<EntityId>,
    pub operation: Option<EntityId>,
    /// Technology whose operation tree is copied below the new component
    pub reference_technology: Option<TechnologyId>,
    pub attributes: Attributes,
}

/// Service for editing technology operation trees.
#[derive(Debug, Default)]
pub struct TechnologyService {
    hooks: OperationComponentHooks,
}

impl TechnologyService {
    pub fn new() -> Self {
        Self {
            hooks: OperationComponentHooks::new(),
        }
    }

    /// Creates a component in technology `technology` (by number). Returns its identity.
    ///
    /// Nothing is written when a create rule refuses the component.
    #[instrument(level = "debug", skip(self, catalog, component))]
    pub fn add_component(
        &self,
        catalog: &mut Catalog,
        technology: &str,
        component: NewComponent,
        now: NaiveDateTime,
    ) -> ApplicationResult<EntityId> {
        let technology_id = catalog.technology_by_number(technology)?.id;
        let parent = match component.parent {
            Some(parent_id) => Some(locate(catalog, technology_id, parent_id)?),
            None => None,
        };

        let mut draft = ComponentDraft {
            data: ComponentData {
                id: None,
                technology: technology_id,
                operation: component.operation,
                reference_technology: component.reference_technology,
                attributes: component.attributes,
            },
            parent,
        };

        let copied = self.hooks.on_create(catalog, &mut draft)?;
        self.hooks.on_save(catalog, &mut draft.data, None, now)?;

        let tree = &mut catalog.technology_mut(technology_id)?.operation_components;
        let idx = tree.insert_node(draft.data, draft.parent)?;
        if let Some(copy) = copied {
            let grafted = tree.graft_children(idx, &copy)?;
            debug!("grafted {} copied components", grafted);
        }

        let id = catalog.persist_subtree(technology_id, idx)?;
        info!("created component {} in technology {}", id, technology);
        Ok(id)
    }

    /// Applies `edit` to component `id` and saves it.
    ///
    /// Identity and tree position cannot be changed through `edit`.
    #[instrument(level = "debug", skip(self, catalog, edit))]
    pub fn update_component<F>(
        &self,
        catalog: &mut Catalog,
        technology: &str,
        id: EntityId,
        edit: F,
        now: NaiveDateTime,
    ) -> ApplicationResult<()>
    where
        F: FnOnce(&mut ComponentData),
    {
        let technology_id = catalog.technology_by_number(technology)?.id;
        let idx = locate(catalog, technology_id, id)?;
        let stored = component_at(catalog, technology_id, idx)?.clone();

        let mut data = stored.clone();
        edit(&mut data);
        data.id = stored.id;
        data.technology = stored.technology;

        self.hooks.on_save(catalog, &mut data, Some(&stored), now)?;

        let node = catalog
            .technology_mut(technology_id)?
            .operation_components
            .get_node_mut(idx)
            .ok_or_else(|| DomainError::NodeNotFound(id.to_string()))?;
        node.data = data;
        catalog.persist_subtree(technology_id, idx)?;
        info!("updated component {} in technology {}", id, technology);
        Ok(())
    }

    /// Deletes component `id` and its descendants. Returns the number of removed components.
    ///
    /// Every component of the subtree is checked before anything is removed.
    #[instrument(level = "debug", skip(self, catalog))]
    pub fn delete_component(
        &self,
        catalog: &mut Catalog,
        technology: &str,
        id: EntityId,
    ) -> ApplicationResult<usize> {
        let technology_id = catalog.technology_by_number(technology)?.id;
        let idx = locate(catalog, technology_id, id)?;

        let tree = &catalog.technology(technology_id)?.operation_components;
        for (_, node) in tree.iter_from(idx) {
            self.hooks.on_delete(catalog, &node.data)?;
        }

        let removed = catalog
            .technology_mut(technology_id)?
            .operation_components
            .remove_subtree(idx)?;
        info!(
            "deleted {} components from technology {}",
            removed.len(),
            technology
        );
        Ok(removed.len())
    }

    /// Whether technology `reference` may be copied into technology `technology` (both by number).
    pub fn check_reference(
        &self,
        catalog: &Catalog,
        technology: &str,
        reference: &str,
    ) -> ApplicationResult<()> {
        let owner = catalog.technology_by_number(technology)?.id;
        let reference = catalog.technology_by_number(reference)?.id;
        self.hooks.check_reference(catalog, owner, reference)?;
        Ok(())
    }
}

fn locate(catalog: &Catalog, technology: TechnologyId, id: EntityId) -> ApplicationResult<Index> {
    Ok(catalog
        .technology(technology)?
        .operation_components
        .find(id)
        .ok_or_else(|| DomainError::NodeNotFound(id.to_string()))?)
}

fn component_at(
    catalog: &Catalog,
    technology: TechnologyId,
    idx: Index,
) -> ApplicationResult<&ComponentData> {
    Ok(catalog
        .technology(technology)?
        .operation_components
        .get_node(idx)
        .map(|n| &n.data)
        .ok_or_else(|| DomainError::NodeNotFound(format!("{:?}", idx)))?)
}
