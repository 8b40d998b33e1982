mod common;

use common::{property_ids, wall_property_ids, IfcFixture};
use ifc_workbench::session::Session;
use ifc_workbench::tree::{BuiltinColumn, Tree, TreeKind};
use ifc_workbench::validation::{
    Cardinality, ValidationStatus, INTEGRITY_ID,
};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

fn integrity_failures(session: &Session) -> [usize; 3] {
    let report = session.validation().reporter(INTEGRITY_ID, None).unwrap();
    let spec = &report.specifications[0];
    [0, 1, 2].map(|i| spec.requirements[i].failed_entities.len())
}

#[test]
fn one_differing_attribute_fails_only_the_attribute_requirement() {
    let dir = TempDir::new().unwrap();
    let a = IfcFixture::new()
        .element(10, "IfcWall", "G1", "Wall")
        .property("Pset_WallCommon", "FireRating", "EI30")
        .write(dir.path(), "a.ifc");
    let b = IfcFixture::new()
        .element(10, "IfcWall", "G1", "Wall renamed")
        .property("Pset_WallCommon", "FireRating", "EI30")
        .write(dir.path(), "b.ifc");
    let mut session = Session::default();
    session.add_files(&[a, b]);

    assert_eq!(session.validate(Some(INTEGRITY_ID)), 1);
    assert_eq!(integrity_failures(&session), [0, 1, 0]);

    let report = session.validation().reporter(INTEGRITY_ID, None).unwrap();
    let failed = &report.specifications[0].requirements[1].failed_entities[0];
    assert_eq!(failed.element.global_id.as_deref(), Some("G1"));
    let reason = failed.reason.as_deref().unwrap();
    assert!(reason.contains("a.ifc"), "{reason}");
    assert!(reason.contains("b.ifc"), "{reason}");
    assert!(reason.contains("Name 'Wall' != 'Wall renamed'"), "{reason}");
}

#[test]
fn local_id_and_property_differences_are_reported() {
    let dir = TempDir::new().unwrap();
    let a = IfcFixture::new()
        .element(55, "IfcWall", "G1", "Wall")
        .property("Pset_WallCommon", "FireRating", "EI30")
        .write(dir.path(), "a.ifc");
    let b = IfcFixture::new()
        .element(77, "IfcWall", "G1", "Wall")
        .property("Pset_WallCommon", "FireRating", "EI60")
        .write(dir.path(), "b.ifc");
    let mut session = Session::default();
    session.add_files(&[a, b]);
    session.validate(None);

    assert_eq!(integrity_failures(&session), [1, 0, 1]);
    let records = session
        .validation()
        .results_for_element("G1", &["a.ifc", "b.ifc"]);
    let reasons: Vec<&str> = records
        .failed
        .iter()
        .filter_map(|r| r.reason.as_deref())
        .collect();
    assert_eq!(
        reasons,
        vec![
            "ID mismatch: 55 in a.ifc != 77 in b.ifc",
            "Pset mismatch: between a.ifc and b.ifc: Pset_WallCommon.FireRating 'EI30' != 'EI60'",
        ]
    );
}

#[test]
fn rule_document_results_per_element() {
    let dir = TempDir::new().unwrap();
    let model = IfcFixture::new()
        .element(10, "IfcWall", "G1", "Wall 1")
        .property("Pset_WallCommon", "FireRating", "EI90")
        .element(11, "IfcWall", "G2", "Wall 2")
        .property("Pset_WallCommon", "FireRating", "EI30")
        .element(12, "IfcSlab", "G3", "Slab")
        .write(dir.path(), "a.ifc");
    let rules = dir.path().join("walls.ids");
    fs::write(&rules, wall_property_ids("Pset_WallCommon", "FireRating", &["EI30", "EI60"])).unwrap();

    let mut session = Session::default();
    session.add_files(&[model]);
    let id = session.validation_mut().add_ids_file(&rules).unwrap();
    assert_eq!(id, "walls.ids");
    assert_eq!(session.validation().status(&id), ValidationStatus::Idle);

    assert_eq!(session.validate(Some(id.as_str())), 1);
    assert_eq!(session.validation().status(&id), ValidationStatus::Validated);
    assert_eq!(session.validation().status(INTEGRITY_ID), ValidationStatus::Idle);

    let g1 = session.validation().results_for_element("G1", &["a.ifc"]);
    assert_eq!(g1.failed.len(), 1);
    assert!(g1.passed.is_empty());
    assert_eq!(g1.failed[0].specification, "Wall property");
    assert_eq!(g1.failed[0].filename.as_deref(), Some("a.ifc"));

    let g2 = session.validation().results_for_element("G2", &["a.ifc"]);
    assert!(g2.failed.is_empty());
    assert_eq!(g2.passed.len(), 1);

    // Not applicable
    let g3 = session.validation().results_for_element("G3", &["a.ifc"]);
    assert!(g3.failed.is_empty() && g3.passed.is_empty());

    let summary = session.validation().summary(&id);
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].text(), "1 failed, 1 passed");

    // The validation column shows the per element counters
    assert!(!session.columns().is_hidden(BuiltinColumn::Validation.index()));
    let flat = session.tree(TreeKind::Flat);
    let g1_node = flat.find_by_guid(Tree::ROOT, "G1").unwrap();
    let g3_node = flat.find_by_guid(Tree::ROOT, "G3").unwrap();
    let ctx = session.cell_context();
    assert_eq!(
        flat.data(g1_node, BuiltinColumn::Validation.index(), &ctx),
        Some("1 failed, 0 passed".to_string())
    );
    assert_eq!(flat.data(g3_node, BuiltinColumn::Validation.index(), &ctx), None);
}

#[test]
fn rules_matching_nothing_give_empty_results() {
    let dir = TempDir::new().unwrap();
    let model = IfcFixture::new()
        .element(10, "IfcWall", "G1", "Wall 1")
        .write(dir.path(), "a.ifc");
    let doors = dir.path().join("doors.ids");
    fs::write(&doors, property_ids("IFCDOOR", "IFC4", "Pset_DoorCommon", "FireRating", &["EI30"])).unwrap();
    let legacy = dir.path().join("legacy.ids");
    fs::write(&legacy, property_ids("IFCWALL", "IFC2X3", "Pset_WallCommon", "FireRating", &["EI30"])).unwrap();

    let mut session = Session::default();
    session.add_files(&[model]);
    let doors = session.validation_mut().add_ids_file(&doors).unwrap();
    let legacy = session.validation_mut().add_ids_file(&legacy).unwrap();
    session.validate(None);

    for id in [&doors, &legacy] {
        assert_eq!(session.validation().status(id), ValidationStatus::Validated);
        let report = session.validation().reporter(id, Some("a.ifc")).unwrap();
        let spec = &report.specifications[0];
        assert_eq!(spec.total_applicable, 0, "{id}");
        assert_eq!(spec.total_checks_fail, 0, "{id}");
        assert!(spec.requirements[0].failed_entities.is_empty(), "{id}");
    }
    let g1 = session.validation().results_for_element("G1", &["a.ifc"]);
    assert!(g1.failed.is_empty() && g1.passed.is_empty());
}

#[test]
fn cardinality_change_drops_stale_results() {
    let dir = TempDir::new().unwrap();
    let model = IfcFixture::new()
        .element(10, "IfcWall", "G1", "Wall 1")
        .write(dir.path(), "a.ifc");
    let rules = dir.path().join("walls.ids");
    fs::write(&rules, wall_property_ids("Pset_WallCommon", "FireRating", &["EI30"])).unwrap();

    let mut session = Session::default();
    session.add_files(&[model]);
    let id = session.validation_mut().add_ids_file(&rules).unwrap();
    session.validate(None);
    assert_eq!(session.validation().tally_text("G1").as_deref(), Some("1 failed, 0 passed"));

    assert!(session
        .validation_mut()
        .set_cardinality(&id, 0, 0, Cardinality::Optional));
    assert_eq!(session.validation().status(&id), ValidationStatus::Idle);
    assert_eq!(session.validation().tally("G1"), None);

    session.validate(Some(id.as_str()));
    assert_eq!(session.validation().tally_text("G1").as_deref(), Some("0 failed, 1 passed"));
}

#[test]
fn adding_files_clears_results() {
    let dir = TempDir::new().unwrap();
    let a = IfcFixture::new()
        .element(10, "IfcWall", "G1", "Wall")
        .write(dir.path(), "a.ifc");
    let b = IfcFixture::new()
        .element(10, "IfcWall", "G1", "Wall")
        .write(dir.path(), "b.ifc");
    let mut session = Session::default();
    session.add_files(&[a]);
    session.validate(None);
    assert!(session.validation().has_results());

    session.add_files(&[b]);
    assert!(!session.validation().has_results());
}

#[test]
fn integrity_check_cannot_be_removed() {
    let mut session = Session::default();
    assert!(!session.validation_mut().remove_validator(INTEGRITY_ID));
    assert_eq!(session.validation().validators().len(), 1);
}
