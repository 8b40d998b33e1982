mod common;

use common::{IfcFixture, PROJECT};
use ifc_workbench::error::RegistryError;
use ifc_workbench::model::{AddOutcome, ProjectRegistry};
use ifc_workbench::parser::SetKind;
use ifc_workbench::session::Session;
use ifc_workbench::tree::{
    BuiltinColumn, ColumnRegistry, CustomField, NodeId, Tree, TreeKind,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

fn two_files(dir: &TempDir) -> (PathBuf, PathBuf) {
    let a = IfcFixture::new()
        .element(55, "IfcWall", "G1", "Wall")
        .object_type("Basic 200")
        .write(dir.path(), "a.ifc");
    let b = IfcFixture::new()
        .element(77, "IfcWall", "G1", "Wall")
        .object_type("Basic 200")
        .element(78, "IfcSlab", "G2", "Slab")
        .write(dir.path(), "b.ifc");
    (a, b)
}

fn nodes_with_guid(tree: &Tree, guid: &str) -> Vec<NodeId> {
    tree.walk(Tree::ROOT)
        .into_iter()
        .filter(|(n, _)| tree.element(*n).is_some_and(|e| e.guid == guid))
        .map(|(n, _)| n)
        .collect()
}

#[test]
fn shared_element_appears_once_in_every_tree_whatever_the_order() {
    let dir = TempDir::new().unwrap();
    let (a, b) = two_files(&dir);

    for order in [vec![a.clone(), b.clone()], vec![b.clone(), a.clone()]] {
        let mut session = Session::new(vec![CustomField::Class, CustomField::ObjectType]);
        let summary = session.add_files(&order);
        assert_eq!(summary.added.len(), 2);

        for kind in TreeKind::ALL {
            let tree = session.tree(kind);
            let nodes = nodes_with_guid(tree, "G1");
            assert_eq!(nodes.len(), 1, "{kind} tree");
            let mut filenames = tree.element(nodes[0]).unwrap().filenames();
            filenames.sort_unstable();
            assert_eq!(filenames, vec!["a.ifc", "b.ifc"], "{kind} tree");
        }
    }
}

#[test]
fn local_ids_of_each_file_are_kept() {
    let dir = TempDir::new().unwrap();
    let (a, b) = two_files(&dir);
    let mut session = Session::default();
    session.add_files(&[a, b]);

    let location = session.tree(TreeKind::Location);
    let g1 = nodes_with_guid(location, "G1");
    let g2 = nodes_with_guid(location, "G2");
    assert_eq!(g1.len(), 1);
    assert_eq!(g2.len(), 1);

    let element = location.element(g1[0]).unwrap();
    assert_eq!(element.filenames(), vec!["a.ifc", "b.ifc"]);
    assert_eq!(element.local_ids(), vec![55, 77]);
    assert_eq!(location.element(g2[0]).unwrap().filenames(), vec!["b.ifc"]);

    let ctx = session.cell_context();
    assert_eq!(
        location.data(g1[0], BuiltinColumn::Id.index(), &ctx),
        Some("55".to_string())
    );

    let details = session.element_details("G1").unwrap();
    assert_eq!(details.local_ids, vec![55, 77]);
    assert_eq!(details.container.as_deref(), Some("Level 1"));
}

#[test]
fn elements_sit_below_the_spatial_structure() {
    let dir = TempDir::new().unwrap();
    let path = IfcFixture::new()
        .element(10, "IfcWall", "G1", "Wall")
        .element(11, "IfcDoor", "G2", "Door")
        .orphan()
        .write(dir.path(), "a.ifc");
    let mut session = Session::default();
    session.add_files(&[path]);

    let location = session.tree(TreeKind::Location);
    let ctx = session.cell_context();
    let rows: Vec<(String, usize)> = location
        .walk(Tree::ROOT)
        .into_iter()
        .map(|(n, level)| (location.data(n, 0, &ctx).unwrap_or_default(), level))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("IfcProject".to_string(), 0),
            ("IfcSite".to_string(), 1),
            ("IfcBuilding".to_string(), 2),
            ("IfcBuildingStorey".to_string(), 3),
            ("IfcWall".to_string(), 4),
            ("Without container (1)".to_string(), 0),
            ("IfcDoor".to_string(), 1),
        ]
    );
}

#[test]
fn storey_outside_the_decomposition_keeps_its_elements() {
    let dir = TempDir::new().unwrap();
    let content: String = IfcFixture::new()
        .element(10, "IfcWall", "G1", "Wall")
        .render()
        .lines()
        .filter(|line| !line.starts_with("#7=IFCRELAGGREGATES"))
        .map(|line| format!("{line}\n"))
        .collect();
    let path = dir.path().join("a.ifc");
    fs::write(&path, content).unwrap();
    let mut session = Session::default();
    session.add_files(&[path]);

    let location = session.tree(TreeKind::Location);
    let wall = location.find_by_guid(Tree::ROOT, "G1").unwrap();
    let storey = location.parent(wall).unwrap();
    assert_eq!(location.element(storey).unwrap().class, "IfcBuildingStorey");
    let group = location.parent(storey).unwrap();
    assert_eq!(
        location.child_with_label(Tree::ROOT, "Without container"),
        Some(group)
    );
    assert_eq!(location.parent(group), Some(Tree::ROOT));
}

#[test]
fn second_file_with_a_taken_name_is_reported() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("arch")).unwrap();
    fs::create_dir(dir.path().join("mep")).unwrap();
    let arch = IfcFixture::new()
        .element(10, "IfcWall", "G1", "Wall")
        .write(&dir.path().join("arch"), "model.ifc");
    let mep = IfcFixture::new()
        .element(20, "IfcPipeSegment", "G9", "Pipe")
        .write(&dir.path().join("mep"), "model.ifc");

    let mut session = Session::default();
    let summary = session.add_files(&[arch, mep.clone()]);

    assert_eq!(summary.added, vec!["model.ifc"]);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, mep);
    assert!(matches!(
        summary.failed[0].1,
        RegistryError::FilenameTaken { ref filename, .. } if filename == "model.ifc"
    ));
    assert_eq!(session.registry().count(), 1);
    assert!(session.tree(TreeKind::Flat).find_by_guid(Tree::ROOT, "G1").is_some());
}

#[test]
fn leaf_count_sums_children() {
    let dir = TempDir::new().unwrap();
    let (a, b) = two_files(&dir);
    let mut session = Session::default();
    session.add_files(&[a, b]);

    for kind in TreeKind::ALL {
        let tree = session.tree(kind);
        for (node, _) in tree.walk(Tree::ROOT) {
            let children = tree.children(node);
            let leaves = tree.leaf_count(node);
            assert!(leaves >= 1);
            if children.is_empty() {
                assert_eq!(leaves, 1);
            } else {
                let sum: usize = children.iter().map(|&c| tree.leaf_count(c)).sum();
                assert_eq!(leaves, sum);
            }
        }
    }
}

#[test]
fn class_and_object_type_grouping() {
    let dir = TempDir::new().unwrap();
    let path = IfcFixture::new()
        .element(10, "IfcWall", "G1", "W1")
        .object_type("Basic 200")
        .element(11, "IfcWall", "G2", "W2")
        .element(12, "IfcSlab", "G3", "S1")
        .write(dir.path(), "a.ifc");
    let mut session = Session::default();
    session.add_files(&[path]);

    assert_eq!(session.element_count(), 3);
    assert_eq!(session.class_count(), 2);

    let class = session.tree(TreeKind::Class);
    let walls = class.child_with_label(Tree::ROOT, "IfcWall").unwrap();
    assert_eq!(class.child_count(walls), 2);
    assert_eq!(class.leaf_count(walls), 2);
}

#[test]
fn custom_tree_groups_by_property() {
    let dir = TempDir::new().unwrap();
    let path = IfcFixture::new()
        .element(10, "IfcWall", "G1", "W1")
        .property("Pset_WallCommon", "FireRating", "EI60")
        .element(11, "IfcWall", "G2", "W2")
        .write(dir.path(), "a.ifc");
    let fields: Vec<CustomField> = ["pset:Pset_WallCommon:FireRating", "class"]
        .iter()
        .map(|f| f.parse().unwrap())
        .collect();
    let mut session = Session::new(fields);
    session.add_files(&[path]);

    let custom = session.tree(TreeKind::Custom);
    let rated = custom.child_with_label(Tree::ROOT, "EI60").unwrap();
    let undefined = custom.child_with_label(Tree::ROOT, "Undefined").unwrap();
    assert_eq!(custom.leaf_count(rated), 1);
    assert_eq!(custom.leaf_count(undefined), 1);

    session.set_custom_fields(vec![CustomField::Filename]);
    let custom = session.tree(TreeKind::Custom);
    let file = custom.child_with_label(Tree::ROOT, "a.ifc").unwrap();
    assert_eq!(custom.leaf_count(file), 2);
}

#[test]
fn column_order_does_not_depend_on_toggle_order() {
    let toggles = [
        (SetKind::Quantity, "BaseQuantities", "Length"),
        (SetKind::Property, "Pset_WallCommon", "IsExternal"),
        (SetKind::Property, "Pset_WallCommon", "FireRating"),
        (SetKind::Property, "Pset_DoorCommon", "FireRating"),
    ];

    let build = |order: &[usize]| {
        let mut columns = ColumnRegistry::with_debounce(Duration::ZERO);
        for &i in order {
            let (kind, set, member) = toggles[i];
            columns.toggle(kind, set, member, true);
        }
        columns.flush();
        columns
            .dynamic_columns()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
    };

    let forward = build(&[0, 1, 2, 3]);
    let backward = build(&[3, 2, 1, 0]);
    let shuffled = build(&[2, 0, 3, 1]);
    assert_eq!(forward, backward);
    assert_eq!(forward, shuffled);
    assert_eq!(
        forward,
        vec![
            "BaseQuantities:Length",
            "Pset_DoorCommon:FireRating",
            "Pset_WallCommon:FireRating",
            "Pset_WallCommon:IsExternal",
        ]
    );
}

#[test]
fn property_columns_read_any_source_file() {
    let dir = TempDir::new().unwrap();
    let a = IfcFixture::new()
        .element(10, "IfcWall", "G1", "Wall")
        .write(dir.path(), "a.ifc");
    let b = IfcFixture::new()
        .element(10, "IfcWall", "G1", "Wall")
        .property("Pset_WallCommon", "FireRating", "EI30")
        .write(dir.path(), "b.ifc");
    let mut session = Session::default();
    session.add_files(&[a, b]);

    let column = session.resolve_column("Pset_WallCommon", "FireRating");
    assert_eq!(column.kind, SetKind::Property);
    session.set_columns(vec![column]);
    assert_eq!(session.columns().column_count(), BuiltinColumn::COUNT + 1);

    let flat = session.tree(TreeKind::Flat);
    let node = nodes_with_guid(flat, "G1")[0];
    assert_eq!(
        flat.data(node, BuiltinColumn::COUNT, &session.cell_context()),
        Some("EI30".to_string())
    );
}

#[test]
fn file_of_another_project_is_rejected() {
    let dir = TempDir::new().unwrap();
    let a = IfcFixture::new()
        .element(10, "IfcWall", "G1", "Wall")
        .write(dir.path(), "a.ifc");
    let other = IfcFixture::for_project("0OTHERPROJECT00000000X")
        .element(10, "IfcWall", "G9", "Wall")
        .write(dir.path(), "other.ifc");

    let mut registry = ProjectRegistry::new();
    assert!(matches!(registry.add_file(&a), Ok(AddOutcome::Added(_))));
    let err = registry.add_file(&other).unwrap_err();
    match err {
        RegistryError::ProjectMismatch { expected, found, .. } => {
            assert_eq!(expected, PROJECT);
            assert_eq!(found, "0OTHERPROJECT00000000X");
        }
        unexpected => panic!("unexpected error: {unexpected}"),
    }
    assert_eq!(registry.filenames(), vec!["a.ifc"]);
    assert!(matches!(registry.add_file(&a), Ok(AddOutcome::AlreadyOpen)));
    assert_eq!(registry.count(), 1);
}

#[test]
fn lookups_by_guid_and_local_id() {
    let dir = TempDir::new().unwrap();
    let (a, b) = two_files(&dir);
    let mut registry = ProjectRegistry::new();
    registry.add_file(&a).unwrap();
    registry.add_file(&b).unwrap();

    assert_eq!(registry.get_by_guid("G1", Some("b.ifc")).unwrap().1.id(), 77);
    assert_eq!(registry.get_by_guid("G2", None).unwrap().1.id(), 78);
    assert!(registry.get_by_guid("G2", Some("a.ifc")).is_none());
    assert!(registry.get_by_guid("missing", None).is_none());
    assert_eq!(
        registry.get_by_local_id("a.ifc", 55).unwrap().global_id(),
        Some("G1")
    );
}

#[test]
fn close_all_resets_the_session() {
    let dir = TempDir::new().unwrap();
    let (a, b) = two_files(&dir);
    let mut session = Session::default();
    session.add_files(&[a.clone(), b]);
    session.close_all();

    assert!(session.registry().is_empty());
    assert_eq!(session.element_count(), 0);
    for kind in TreeKind::ALL {
        assert!(session.tree(kind).walk(Tree::ROOT).is_empty());
    }
    assert_eq!(session.validation().validators().len(), 1);

    let summary = session.add_files(&[a]);
    assert_eq!(summary.added, vec!["a.ifc"]);
}
