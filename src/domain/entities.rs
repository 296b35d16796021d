//! Domain entities: core data structures

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::arena::OperationTree;

/// Identity assigned by the catalog when a record is persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a technology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TechnologyId(pub u64);

impl fmt::Display for TechnologyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Attribute keys of operation components and their owned rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Comment,
    Attachment,
    NodeNumber,
    QuantityOfWorkstations,
    AssignedToOperation,
    WorkstationType,
    Workstations,
    Division,
    ProductionLine,
    TechnologicalProcessList,
    TechnologicalProcessListAssignmentDate,
    OperationProductOutComponents,
    OperationProductInComponents,
    Product,
    Quantity,
    ProductionCountingQuantities,
    ProductionCountingOperationRuns,
    OperationalTasks,
    OperCompTimeCalculations,
    BarcodeOperationComponents,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Comment => "comment",
            Field::Attachment => "attachment",
            Field::NodeNumber => "nodeNumber",
            Field::QuantityOfWorkstations => "quantityOfWorkstations",
            Field::AssignedToOperation => "assignedToOperation",
            Field::WorkstationType => "workstationType",
            Field::Workstations => "workstations",
            Field::Division => "division",
            Field::ProductionLine => "productionLine",
            Field::TechnologicalProcessList => "technologicalProcessList",
            Field::TechnologicalProcessListAssignmentDate => "technologicalProcessListAssignmentDate",
            Field::OperationProductOutComponents => "operationProductOutComponents",
            Field::OperationProductInComponents => "operationProductInComponents",
            Field::Product => "product",
            Field::Quantity => "quantity",
            Field::ProductionCountingQuantities => "productionCountingQuantities",
            Field::ProductionCountingOperationRuns => "productionCountingOperationRuns",
            Field::OperationalTasks => "operationalTasks",
            Field::OperCompTimeCalculations => "operCompTimeCalculations",
            Field::BarcodeOperationComponents => "barcodeOperationComponents",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of an attribute. `Null` is kept explicitly so a merge can overwrite with "no value".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Null,
    Text(String),
    Integer(i64),
    Decimal(f64),
    Bool(bool),
    Date(NaiveDateTime),
    /// Reference to a record owned elsewhere
    BelongsTo(EntityId),
    /// References to shared records, never cloned
    ManyToMany(Vec<EntityId>),
    /// Rows owned by this record
    HasMany(Vec<Record>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_belongs_to(&self) -> Option<EntityId> {
        match self {
            FieldValue::BelongsTo(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_has_many(&self) -> Option<&[Record]> {
        match self {
            FieldValue::HasMany(rows) => Some(rows),
            _ => None,
        }
    }
}

impl From<Option<EntityId>> for FieldValue {
    fn from(id: Option<EntityId>) -> Self {
        id.map(FieldValue::BelongsTo).unwrap_or(FieldValue::Null)
    }
}

impl From<Option<String>> for FieldValue {
    fn from(s: Option<String>) -> Self {
        s.map(FieldValue::Text).unwrap_or(FieldValue::Null)
    }
}

/// Attribute map with a closed key set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<Field, FieldValue>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-null value of `field`.
    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.0.get(&field).filter(|v| !v.is_null())
    }

    pub fn set(&mut self, field: Field, value: impl Into<FieldValue>) {
        self.0.insert(field, value.into());
    }

    /// Sets `field` to an explicit `Null`.
    pub fn clear(&mut self, field: Field) {
        self.0.insert(field, FieldValue::Null);
    }

    /// Whether the key is present at all, `Null` included.
    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &FieldValue)> {
        self.0.iter().map(|(k, v)| (*k, v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Field, &mut FieldValue)> {
        self.0.iter_mut().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Field, FieldValue)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (Field, FieldValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Row owned by an operation component (e.g. an output product link).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(default)]
    pub fields: Attributes,
}

impl Record {
    pub fn new(fields: Attributes) -> Self {
        Self { id: None, fields }
    }

    /// Shallow duplicate with identity removed.
    pub fn detached(&self) -> Self {
        Self {
            id: None,
            fields: self.fields.clone(),
        }
    }
}

/// How workstations are assigned to an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignedToOperation {
    #[serde(rename = "01workstations")]
    Workstations,
    #[serde(rename = "02workstationTypes")]
    WorkstationTypes,
}

impl AssignedToOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignedToOperation::Workstations => "01workstations",
            AssignedToOperation::WorkstationTypes => "02workstationTypes",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "01workstations" => Some(AssignedToOperation::Workstations),
            "02workstationTypes" => Some(AssignedToOperation::WorkstationTypes),
            _ => None,
        }
    }
}

impl From<AssignedToOperation> for FieldValue {
    fn from(a: AssignedToOperation) -> Self {
        FieldValue::Text(a.as_str().to_string())
    }
}

/// Operation dictionary entry. Read-only for the component hooks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Operation {
    pub id: EntityId,
    pub number: String,
    pub name: String,
    pub comment: Option<String>,
    pub attachment: Option<String>,
    pub product: Option<EntityId>,
    pub quantity_of_workstations: Option<i64>,
    pub assigned_to_operation: Option<AssignedToOperation>,
    pub workstation_type: Option<EntityId>,
    pub workstations: Vec<EntityId>,
    pub division: Option<EntityId>,
    pub production_line: Option<EntityId>,
}

/// Manufacturing process definition owning one operation tree.
#[derive(Debug, Clone)]
pub struct Technology {
    pub id: TechnologyId,
    /// Unique human-readable key
    pub number: String,
    pub product: Option<EntityId>,
    pub operation_components: OperationTree,
}

impl Technology {
    pub fn new(id: TechnologyId, number: impl Into<String>, product: Option<EntityId>) -> Self {
        Self {
            id,
            number: number.into(),
            product,
            operation_components: OperationTree::new(),
        }
    }
}

/// Product structure tree node that uses an operation component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureUsage {
    pub operation_component: EntityId,
    pub main_technology: TechnologyId,
}
