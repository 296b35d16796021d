//! Tests for TechnologyService

use rstest::{fixture, rstest};

use techtree::application::services::{NewComponent, TechnologyService};
use techtree::application::ApplicationError;
use techtree::domain::{
    Catalog, DomainError, EntityId, Field, FieldValue, Operation, StructureUsage, TechnologyId,
};
use techtree::util::testing::{self, fixed_now};

struct Setup {
    catalog: Catalog,
    service: TechnologyService,
    operation: EntityId,
}

#[fixture]
fn setup() -> Setup {
    testing::init_test_setup();
    let mut catalog = Catalog::new();
    let operation = catalog.next_id();
    catalog.add_operation(Operation {
        id: operation,
        number: "OP-1".into(),
        product: Some(EntityId(4000)),
        workstations: vec![EntityId(4100)],
        ..Operation::default()
    });
    catalog.create_technology("BASE", Some(EntityId(4001))).unwrap();
    catalog.create_technology("TARGET", None).unwrap();
    Setup {
        catalog,
        service: TechnologyService::new(),
        operation,
    }
}

fn with_operation(operation: EntityId) -> NewComponent {
    NewComponent {
        operation: Some(operation),
        ..NewComponent::default()
    }
}

/// BASE: root -> [a -> [b]], returns (root, a, b)
fn build_base(setup: &mut Setup) -> (EntityId, EntityId, EntityId) {
    let op = setup.operation;
    let root = setup
        .service
        .add_component(&mut setup.catalog, "BASE", with_operation(op), fixed_now())
        .unwrap();
    let a = setup
        .service
        .add_component(&mut setup.catalog, "BASE", with_operation(op), fixed_now())
        .unwrap();
    let b = setup
        .service
        .add_component(
            &mut setup.catalog,
            "BASE",
            NewComponent {
                parent: Some(a),
                ..with_operation(op)
            },
            fixed_now(),
        )
        .unwrap();
    (root, a, b)
}

fn technology_id(catalog: &Catalog, number: &str) -> TechnologyId {
    catalog.technology_by_number(number).unwrap().id
}

#[rstest]
fn given_components_when_adding_then_builds_tree_with_identities(mut setup: Setup) {
    // Act
    let (root, a, b) = build_base(&mut setup);

    // Assert
    let tree = &setup.catalog.technology_by_number("BASE").unwrap().operation_components;
    assert_eq!(tree.len(), 3);
    let root_idx = tree.find(root).unwrap();
    let a_idx = tree.find(a).unwrap();
    let b_idx = tree.find(b).unwrap();
    assert_eq!(tree.root(), Some(root_idx));
    assert_eq!(tree.get_node(a_idx).unwrap().parent, Some(root_idx));
    assert_eq!(tree.get_node(b_idx).unwrap().parent, Some(a_idx));
}

#[rstest]
fn given_reference_when_adding_then_copies_tree_below_new_component(mut setup: Setup) {
    // Arrange
    build_base(&mut setup);
    let base = technology_id(&setup.catalog, "BASE");

    // Act
    let id = setup
        .service
        .add_component(
            &mut setup.catalog,
            "TARGET",
            NewComponent {
                reference_technology: Some(base),
                ..NewComponent::default()
            },
            fixed_now(),
        )
        .unwrap();

    // Assert
    let target = technology_id(&setup.catalog, "TARGET");
    let tree = &setup.catalog.technology(target).unwrap().operation_components;
    assert_eq!(tree.len(), 3);
    assert_eq!(tree.depth(), 3);
    let root = tree.get_node(tree.root().unwrap()).unwrap();
    assert_eq!(root.data.id, Some(id));
    assert_eq!(root.data.reference_technology, None);
    assert!(tree.iter().all(|(_, n)| n.data.technology == target));
    assert!(tree.iter().all(|(_, n)| n.data.id.is_some()));

    let base_tree = &setup.catalog.technology(base).unwrap().operation_components;
    for (_, node) in tree.iter() {
        assert!(base_tree.find(node.data.id.unwrap()).is_none());
    }
}

#[rstest]
fn given_reference_and_commented_operation_when_adding_then_root_takes_copied_fields(
    mut setup: Setup,
) {
    // Arrange
    build_base(&mut setup);
    let base = technology_id(&setup.catalog, "BASE");
    let commented = setup.catalog.next_id();
    setup.catalog.add_operation(Operation {
        id: commented,
        number: "OP-2".into(),
        comment: Some("comment of OP-2".into()),
        attachment: Some("op2.pdf".into()),
        ..Operation::default()
    });

    // Act
    let id = setup
        .service
        .add_component(
            &mut setup.catalog,
            "TARGET",
            NewComponent {
                operation: Some(commented),
                reference_technology: Some(base),
                ..NewComponent::default()
            },
            fixed_now(),
        )
        .unwrap();

    // Assert
    let tree = &setup.catalog.technology_by_number("TARGET").unwrap().operation_components;
    let root = tree.get_node(tree.find(id).unwrap()).unwrap();
    assert_eq!(root.data.operation, Some(setup.operation));
    assert!(root.data.attributes.get(Field::Comment).is_none());
    assert!(root.data.attributes.get(Field::Attachment).is_none());
}

#[rstest]
fn given_rejected_reference_when_adding_then_nothing_is_written(mut setup: Setup) {
    let before = setup.catalog.sequence();
    let base = technology_id(&setup.catalog, "BASE");

    let result = setup.service.add_component(
        &mut setup.catalog,
        "TARGET",
        NewComponent {
            reference_technology: Some(base),
            ..NewComponent::default()
        },
        fixed_now(),
    );

    assert!(result.unwrap_err().validation().is_some());
    assert!(setup
        .catalog
        .technology_by_number("TARGET")
        .unwrap()
        .operation_components
        .is_empty());
    assert_eq!(setup.catalog.sequence(), before);
}

#[rstest]
fn given_unknown_technology_when_adding_then_not_found(mut setup: Setup) {
    let result = setup.service.add_component(
        &mut setup.catalog,
        "NOPE",
        NewComponent::default(),
        fixed_now(),
    );

    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::TechnologyNotFound(_)))
    ));
}

#[rstest]
fn given_process_list_when_updating_then_stamps_date(mut setup: Setup) {
    let (_, a, _) = build_base(&mut setup);

    setup
        .service
        .update_component(
            &mut setup.catalog,
            "BASE",
            a,
            |data| {
                data.attributes.set(
                    Field::TechnologicalProcessList,
                    FieldValue::BelongsTo(EntityId(700)),
                );
                data.id = None;
            },
            fixed_now(),
        )
        .unwrap();

    let tree = &setup.catalog.technology_by_number("BASE").unwrap().operation_components;
    let node = tree.get_node(tree.find(a).unwrap()).unwrap();
    assert_eq!(node.data.id, Some(a), "identity survives the edit");
    assert_eq!(
        node.data
            .attributes
            .get(Field::TechnologicalProcessListAssignmentDate),
        Some(&FieldValue::Date(fixed_now()))
    );
}

#[rstest]
fn given_subtree_when_deleting_then_removes_all_descendants(mut setup: Setup) {
    let (root, a, _) = build_base(&mut setup);

    let removed = setup
        .service
        .delete_component(&mut setup.catalog, "BASE", a)
        .unwrap();

    assert_eq!(removed, 2);
    let tree = &setup.catalog.technology_by_number("BASE").unwrap().operation_components;
    assert_eq!(tree.len(), 1);
    assert!(tree.find(root).is_some());
}

#[rstest]
fn given_used_descendant_when_deleting_then_nothing_is_removed(mut setup: Setup) {
    let (_, a, b) = build_base(&mut setup);
    let main_technology = technology_id(&setup.catalog, "TARGET");
    setup.catalog.add_structure_usage(StructureUsage {
        operation_component: b,
        main_technology,
    });

    let result = setup.service.delete_component(&mut setup.catalog, "BASE", a);

    let err = result.unwrap_err();
    assert!(err.validation().unwrap().to_string().contains("TARGET"));
    let tree = &setup.catalog.technology_by_number("BASE").unwrap().operation_components;
    assert_eq!(tree.len(), 3);
}

#[rstest]
#[case::self_reference("BASE", "BASE", false)]
#[case::other("TARGET", "BASE", true)]
fn given_reference_when_checking_then_matches_cycle_rule(
    mut setup: Setup,
    #[case] owner: &str,
    #[case] reference: &str,
    #[case] allowed: bool,
) {
    build_base(&mut setup);

    let result = setup
        .service
        .check_reference(&setup.catalog, owner, reference);

    assert_eq!(result.is_ok(), allowed);
}
