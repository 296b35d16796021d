//! Lifecycle rules of technology operation components
//!
//! Create, save and delete hooks. A component created with a reference technology
//! receives a deep copy of that technology's operation tree.

use chrono::NaiveDateTime;
use generational_arena::Index;
use itertools::Itertools;
use tracing::{debug, instrument, warn};

use crate::application::ApplicationResult;
use crate::domain::{
    copy_subtree, detect_cycle, merge_copied_fields, AssignedToOperation, Attributes, Catalog,
    ComponentData, EntityId, Field, FieldValue, OperationTree, Record, ReferenceChain,
    ReferenceCopyError, Technology, TechnologyId, ValidationError,
};

/// Deletion is refused while a product structure tree uses the component.
pub const USED_IN_PRODUCT_STRUCTURE_TREE: &str =
    "technologies.technologyDetails.window.treeTab.technologyTree.error.cannotDeleteOperationUsedInProductStructureTree";

/// Component about to be created, not yet part of its technology's tree.
#[derive(Debug, Clone)]
pub struct ComponentDraft {
    pub data: ComponentData,
    /// Parent in the owning technology's tree, None to become (or join below) the root
    pub parent: Option<Index>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OperationComponentHooks;

impl OperationComponentHooks {
    pub fn new() -> Self {
        Self
    }

    /// Runs the create rules on `draft`.
    ///
    /// Returns the copied tree when a reference technology was resolved; its root's
    /// fields are already merged into the draft, its children still need grafting
    /// below the inserted component.
    #[instrument(level = "debug", skip(self, catalog, draft))]
    pub fn on_create(
        &self,
        catalog: &Catalog,
        draft: &mut ComponentDraft,
    ) -> ApplicationResult<Option<OperationTree>> {
        self.copy_comment_and_attachment_from_operation(catalog, &mut draft.data)?;
        self.set_parent_if_root_node_already_exists(catalog, draft)?;
        self.set_operation_out_product(catalog, &mut draft.data)?;
        let copied = self.copy_referenced_technology(catalog, &mut draft.data)?;
        self.copy_workstations_settings_from_operation(catalog, &mut draft.data)?;
        Ok(copied)
    }

    /// Runs the save rules. `stored` is the last persisted state of the component.
    #[instrument(level = "debug", skip(self, catalog, data, stored))]
    pub fn on_save(
        &self,
        catalog: &Catalog,
        data: &mut ComponentData,
        stored: Option<&ComponentData>,
        now: NaiveDateTime,
    ) -> ApplicationResult<()> {
        clear_workstations_for_type_assignment(data);

        if data.id.is_some() {
            if let Some(stored) = stored {
                self.copy_workstations(catalog, data, stored)?;
                set_process_list_assignment_date(data, stored, now);
            }
        }
        Ok(())
    }

    /// Refuses deletion of a component used by a product structure tree.
    pub fn on_delete(&self, catalog: &Catalog, data: &ComponentData) -> Result<(), ValidationError> {
        let Some(id) = data.id else {
            return Ok(());
        };

        let usages: Vec<_> = catalog.usages_of(id).collect();
        if usages.is_empty() {
            return Ok(());
        }

        let numbers = usages
            .iter()
            .filter_map(|u| catalog.technology(u.main_technology).ok())
            .map(|t| t.number.as_str())
            .unique()
            .join(", ");
        warn!("component {} is used in product structure trees: {}", id, numbers);
        Err(ValidationError::Global {
            code: USED_IN_PRODUCT_STRUCTURE_TREE.to_string(),
            args: vec![numbers],
        })
    }

    /// Cycle and empty-tree checks for copying `reference` into `owner`.
    pub fn check_reference<'a>(
        &self,
        catalog: &'a Catalog,
        owner: TechnologyId,
        reference: TechnologyId,
    ) -> ApplicationResult<&'a Technology> {
        self.resolve_reference(catalog, owner, reference)
            .map(|(technology, _)| technology)
    }

    /// Referenced technology and the root of its tree, once both checks passed.
    fn resolve_reference<'a>(
        &self,
        catalog: &'a Catalog,
        owner: TechnologyId,
        reference: TechnologyId,
    ) -> ApplicationResult<(&'a Technology, Index)> {
        let referenced = catalog.technology(reference)?;

        let chain = ReferenceChain::starting_at(owner);
        if detect_cycle(&chain, referenced) {
            return Err(ValidationError::from(ReferenceCopyError::CyclicDependency(reference)).into());
        }
        let Some(root) = referenced.operation_components.root() else {
            return Err(
                ValidationError::from(ReferenceCopyError::OperationComponentsEmpty(reference)).into(),
            );
        };
        Ok((referenced, root))
    }

    fn copy_comment_and_attachment_from_operation(
        &self,
        catalog: &Catalog,
        data: &mut ComponentData,
    ) -> ApplicationResult<()> {
        let Some(operation_id) = data.operation else {
            return Ok(());
        };
        let operation = catalog.operation(operation_id)?;

        for (field, value) in [
            (Field::Comment, &operation.comment),
            (Field::Attachment, &operation.attachment),
        ] {
            if data.attributes.get(field).is_none() {
                if let Some(value) = value {
                    data.attributes.set(field, FieldValue::Text(value.clone()));
                }
            }
        }
        Ok(())
    }

    fn set_parent_if_root_node_already_exists(
        &self,
        catalog: &Catalog,
        draft: &mut ComponentDraft,
    ) -> ApplicationResult<()> {
        if draft.parent.is_some() {
            return Ok(());
        }
        let tree = &catalog.technology(draft.data.technology)?.operation_components;
        if let Some(root) = tree.root() {
            debug!("attaching new component below existing root");
            draft.parent = Some(root);
        }
        Ok(())
    }

    fn set_operation_out_product(
        &self,
        catalog: &Catalog,
        data: &mut ComponentData,
    ) -> ApplicationResult<()> {
        let has_out_products = data
            .attributes
            .get(Field::OperationProductOutComponents)
            .and_then(FieldValue::as_has_many)
            .is_some_and(|rows| !rows.is_empty());
        if has_out_products {
            return Ok(());
        }

        let technology = catalog.technology(data.technology)?;
        let product: Option<EntityId> = if technology.operation_components.is_empty() {
            technology.product
        } else {
            let operation = data.operation.map(|id| catalog.operation(id)).transpose()?;
            match operation.and_then(|op| op.product) {
                Some(product) => Some(product),
                None => return Ok(()),
            }
        };

        let mut fields = Attributes::new();
        fields.set(Field::Quantity, FieldValue::Decimal(1.0));
        fields.set(Field::Product, product);
        data.attributes.set(
            Field::OperationProductOutComponents,
            FieldValue::HasMany(vec![Record::new(fields)]),
        );
        Ok(())
    }

    fn copy_referenced_technology(
        &self,
        catalog: &Catalog,
        data: &mut ComponentData,
    ) -> ApplicationResult<Option<OperationTree>> {
        let Some(reference) = data.reference_technology else {
            return Ok(None);
        };
        let owner = data.technology;

        let (referenced, root) = match self.resolve_reference(catalog, owner, reference) {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!("reference copy of technology {} into {} refused: {}", reference, owner, e);
                return Err(e);
            }
        };
        let copy = copy_subtree(&referenced.operation_components, root, owner)?;

        if let Some(copy_root) = copy.root().and_then(|r| copy.get_node(r)) {
            merge_copied_fields(data, copy_root);
        }
        data.reference_technology = None;

        debug!(
            "copied {} components of technology {} into {}",
            copy.len(),
            referenced.number,
            owner
        );
        Ok(Some(copy))
    }

    fn copy_workstations_settings_from_operation(
        &self,
        catalog: &Catalog,
        data: &mut ComponentData,
    ) -> ApplicationResult<()> {
        let Some(operation_id) = data.operation else {
            return Ok(());
        };
        let operation = catalog.operation(operation_id)?;
        let attrs = &mut data.attributes;

        attrs.set(
            Field::QuantityOfWorkstations,
            operation
                .quantity_of_workstations
                .map(FieldValue::Integer)
                .unwrap_or(FieldValue::Null),
        );
        attrs.set(
            Field::AssignedToOperation,
            operation
                .assigned_to_operation
                .map(FieldValue::from)
                .unwrap_or(FieldValue::Null),
        );
        attrs.set(Field::WorkstationType, operation.workstation_type);
        attrs.set(
            Field::Workstations,
            FieldValue::ManyToMany(operation.workstations.clone()),
        );
        attrs.set(Field::Division, operation.division);
        attrs.set(Field::ProductionLine, operation.production_line);
        Ok(())
    }

    fn copy_workstations(
        &self,
        catalog: &Catalog,
        data: &mut ComponentData,
        stored: &ComponentData,
    ) -> ApplicationResult<()> {
        let Some(operation_id) = data.operation else {
            return Ok(());
        };
        if stored.operation == Some(operation_id) {
            return Ok(());
        }
        let operation = catalog.operation(operation_id)?;
        data.attributes.set(
            Field::Workstations,
            FieldValue::ManyToMany(operation.workstations.clone()),
        );
        Ok(())
    }
}

fn clear_workstations_for_type_assignment(data: &mut ComponentData) {
    let assigned = data
        .attributes
        .get(Field::AssignedToOperation)
        .and_then(FieldValue::as_text)
        .and_then(AssignedToOperation::parse);
    if assigned == Some(AssignedToOperation::WorkstationTypes) {
        data.attributes.clear(Field::Workstations);
    }
}

fn set_process_list_assignment_date(
    data: &mut ComponentData,
    stored: &ComponentData,
    now: NaiveDateTime,
) {
    let list_of = |d: &ComponentData| {
        d.attributes
            .get(Field::TechnologicalProcessList)
            .and_then(FieldValue::as_belongs_to)
    };
    let current = list_of(&*data);
    let same = current == list_of(stored);

    match current {
        Some(_) => {
            let dated = data
                .attributes
                .get(Field::TechnologicalProcessListAssignmentDate)
                .is_some();
            if !dated || !same {
                data.attributes
                    .set(Field::TechnologicalProcessListAssignmentDate, FieldValue::Date(now));
            }
        }
        None => data
            .attributes
            .clear(Field::TechnologicalProcessListAssignmentDate),
    }
}
