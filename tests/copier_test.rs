//! Tests for copying operation trees between technologies

use rstest::{fixture, rstest};

use techtree::domain::{
    copy_subtree, merge_copied_fields, Attributes, Catalog, ComponentData, EntityId, Field,
    FieldValue, NodeSpec, OperationTree, Record, TechnologyId, TreeBuilder,
    DERIVED_STATE_FIELDS,
};
use techtree::util::testing;

const SOURCE: TechnologyId = TechnologyId(1);
const TARGET: TechnologyId = TechnologyId(2);

fn component(id: u64, operation: u64) -> NodeSpec {
    let mut spec = NodeSpec::with_id(id);
    spec.operation = Some(EntityId(operation));
    spec.attributes.set(
        Field::OperationProductOutComponents,
        FieldValue::HasMany(vec![Record {
            id: Some(EntityId(id * 100)),
            fields: [(Field::Quantity, FieldValue::Decimal(1.0))]
                .into_iter()
                .collect(),
        }]),
    );
    spec.attributes.set(
        Field::Workstations,
        FieldValue::ManyToMany(vec![EntityId(900), EntityId(901)]),
    );
    for field in DERIVED_STATE_FIELDS {
        spec.attributes
            .set(field, FieldValue::HasMany(vec![Record::new(Attributes::new())]));
    }
    spec
}

/// root(10) -> [a(11) -> [c(13)], b(12)]
#[fixture]
fn source() -> OperationTree {
    testing::init_test_setup();
    let spec = component(10, 1)
        .child(component(11, 2).child(component(13, 4)))
        .child(component(12, 3));
    TreeBuilder::new().build(SOURCE, &spec).unwrap()
}

fn copy_of(source: &OperationTree) -> OperationTree {
    copy_subtree(source, source.root().unwrap(), TARGET).unwrap()
}

#[rstest]
fn given_tree_when_copying_then_node_count_and_shape_match(source: OperationTree) {
    // Act
    let copy = copy_of(&source);

    // Assert
    assert_eq!(copy.len(), source.len());
    assert_eq!(copy.depth(), source.depth());
    let operations = |t: &OperationTree| -> Vec<Option<EntityId>> {
        t.iter().map(|(_, n)| n.data.operation).collect()
    };
    assert_eq!(operations(&copy), operations(&source));
}

#[rstest]
fn given_tree_when_copying_then_parents_point_at_copied_parents(source: OperationTree) {
    let copy = copy_of(&source);

    let root = copy.root().unwrap();
    assert!(copy.get_node(root).unwrap().parent.is_none());
    for (idx, node) in copy.iter() {
        if idx == root {
            continue;
        }
        let parent = node.parent.expect("non-root copy has a parent");
        assert!(copy.get_node(parent).unwrap().children.contains(&idx));
    }
}

#[rstest]
fn given_tree_when_copying_then_every_node_is_detached_and_retargeted(source: OperationTree) {
    let copy = copy_of(&source);

    for (_, node) in copy.iter() {
        assert_eq!(node.data.id, None);
        assert_eq!(node.data.technology, TARGET);
        let rows = node
            .data
            .attributes
            .get(Field::OperationProductOutComponents)
            .and_then(FieldValue::as_has_many)
            .unwrap();
        assert!(rows.iter().all(|r| r.id.is_none()));
    }
}

#[rstest]
#[case(Field::ProductionCountingQuantities)]
#[case(Field::ProductionCountingOperationRuns)]
#[case(Field::OperationalTasks)]
#[case(Field::OperCompTimeCalculations)]
#[case(Field::BarcodeOperationComponents)]
fn given_derived_state_when_copying_then_field_is_null(source: OperationTree, #[case] field: Field) {
    let copy = copy_of(&source);

    for (_, node) in copy.iter() {
        assert!(node.data.attributes.contains(field));
        assert!(node.data.attributes.get(field).is_none());
    }
}

#[rstest]
fn given_shared_references_when_copying_then_kept_verbatim(source: OperationTree) {
    let copy = copy_of(&source);

    for (_, node) in copy.iter() {
        assert_eq!(
            node.data.attributes.get(Field::Workstations),
            Some(&FieldValue::ManyToMany(vec![EntityId(900), EntityId(901)]))
        );
    }
}

#[rstest]
fn given_tree_when_copying_then_source_is_untouched(source: OperationTree) {
    let before = TreeBuilder::export(&source);

    let _copy = copy_of(&source);

    assert_eq!(TreeBuilder::export(&source), before);
}

#[rstest]
fn given_inner_node_when_copying_then_only_its_subtree_is_copied(source: OperationTree) {
    let inner = source.find(EntityId(11)).unwrap();

    let copy = copy_subtree(&source, inner, TARGET).unwrap();

    assert_eq!(copy.len(), 2);
}

#[rstest]
fn given_copy_when_persisting_then_rows_get_identities_distinct_from_source(
    source: OperationTree,
) {
    // Arrange
    let mut catalog = Catalog::new();
    catalog.bump_sequence(10_000);
    let target = catalog.create_technology("T-target", None).unwrap();
    let copy = copy_subtree(&source, source.root().unwrap(), target).unwrap();
    catalog.technology_mut(target).unwrap().operation_components = copy;
    let root = catalog
        .technology(target)
        .unwrap()
        .operation_components
        .root()
        .unwrap();

    // Act
    catalog.persist_subtree(target, root).unwrap();

    // Assert
    let source_rows: Vec<EntityId> = source
        .iter()
        .flat_map(|(_, n)| row_ids(&n.data))
        .collect();
    let tree = &catalog.technology(target).unwrap().operation_components;
    for (_, node) in tree.iter() {
        assert!(node.data.id.is_some());
        for id in row_ids(&node.data) {
            assert!(!source_rows.contains(&id));
        }
    }
}

#[rstest]
fn given_copied_root_when_merging_then_keeps_identity_and_replaces_fields(
    source: OperationTree,
) {
    // Arrange
    let copy = copy_of(&source);
    let copy_root = copy.get_node(copy.root().unwrap()).unwrap();
    let mut target = ComponentData::new(TARGET);
    target.id = Some(EntityId(77));
    target.operation = Some(EntityId(5));
    target
        .attributes
        .set(Field::Comment, FieldValue::Text("from other operation".into()));
    target
        .attributes
        .set(Field::Attachment, FieldValue::Text("other.pdf".into()));

    // Act
    merge_copied_fields(&mut target, copy_root);
    let once = target.clone();
    merge_copied_fields(&mut target, copy_root);

    // Assert
    assert_eq!(target.id, Some(EntityId(77)));
    assert_eq!(target.operation, Some(EntityId(1)));
    assert!(!target.attributes.contains(Field::Comment));
    assert!(!target.attributes.contains(Field::Attachment));
    assert_eq!(target.attributes, copy_root.data.attributes);
    assert_eq!(target, once, "merging twice changes nothing");
}

fn row_ids(data: &ComponentData) -> Vec<EntityId> {
    data.attributes
        .iter()
        .filter_map(|(_, v)| v.as_has_many())
        .flatten()
        .filter_map(|r| r.id)
        .collect()
}
