use crate::model::{ElementRef, ProjectRegistry};
use crate::parser::Entity;
use crate::tree::{NodeId, Tree};
use crate::validation::reporter::{RequirementResult, Reporter, SpecificationResult};
use std::collections::BTreeMap;
use std::fmt::Display;
use tracing::debug;

pub const INTEGRITY_ID: &str = "integrity";

const TITLE: &str = "Integrity check";
const DESCRIPTION: &str = "Check if entities with the same GUID are the same";

const ID_REQUIREMENT: usize = 0;
const ATTRIBUTE_REQUIREMENT: usize = 1;
const PSET_REQUIREMENT: usize = 2;

pub const REQUIREMENTS: [&str; 3] = [
    "The ID should be the same in all files",
    "The attributes should be the same in all files",
    "The property sets should be the same in all files",
];

/// Cross-file consistency check of elements loaded from several files.
///
/// Compares the first file an element was seen in with every later one:
/// local id, non-relational attributes and property sets. Runs once for
/// the whole project.
#[derive(Debug, Clone, Default)]
pub struct IntegrityValidator;

impl IntegrityValidator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[must_use]
    pub fn id(&self) -> &'static str {
        INTEGRITY_ID
    }

    #[must_use]
    pub fn title(&self) -> &'static str {
        TITLE
    }

    #[must_use]
    pub fn empty_report(&self) -> Reporter {
        let mut spec = SpecificationResult::new(TITLE, DESCRIPTION);
        spec.applicability = vec!["All entities".to_string()];
        spec.requirements = REQUIREMENTS.iter().map(|r| RequirementResult::new(*r)).collect();
        Reporter {
            title: TITLE.to_string(),
            filename: None,
            specifications: vec![spec],
        }
    }

    /// Walks `tree` (the location view) and checks every element node that
    /// was merged from more than one file.
    #[must_use]
    pub fn validate(&self, registry: &ProjectRegistry, tree: &Tree) -> Reporter {
        let mut report = self.empty_report();
        if let Some(spec) = report.specifications.first_mut() {
            check_node(registry, tree, Tree::ROOT, spec);
            debug!(
                checked = spec.total_applicable,
                failed = spec.total_checks_fail,
                "integrity check finished"
            );
        }
        report
    }
}

fn check_node(registry: &ProjectRegistry, tree: &Tree, id: NodeId, spec: &mut SpecificationResult) {
    for &child in tree.children(id) {
        check_node(registry, tree, child, spec);
    }

    let Some(element) = tree.element(id) else {
        return;
    };
    if element.sources().len() < 2 {
        return;
    }
    let first = element.first_file();
    let Some(left) = registry.get_by_local_id(&first.filename, first.id) else {
        return;
    };
    let left_attributes = left.attributes();
    let left_psets = flatten_sets(&left);

    let mut id_diffs = Vec::new();
    let mut attribute_diffs = Vec::new();
    let mut pset_diffs = Vec::new();

    for source in &element.sources()[1..] {
        let Some(right) = registry.get_by_local_id(&source.filename, source.id) else {
            continue;
        };
        let between = format!("{} and {}", first.filename, source.filename);

        if first.id != source.id {
            id_diffs.push(format!(
                "{} in {} != {} in {}",
                first.id, first.filename, source.id, source.filename
            ));
        }
        let diff = map_diff(&left_attributes, &right.attributes());
        if !diff.is_empty() {
            attribute_diffs.push(format!("between {between}: {}", diff.join("; ")));
        }
        let diff = map_diff(&left_psets, &flatten_sets(&right));
        if !diff.is_empty() {
            pset_diffs.push(format!("between {between}: {}", diff.join("; ")));
        }
    }

    spec.total_applicable += 1;
    let element_ref = ElementRef::from_entity(&first.filename, &left);
    let checks = [
        (ID_REQUIREMENT, "ID mismatch", id_diffs),
        (ATTRIBUTE_REQUIREMENT, "Attribute mismatch", attribute_diffs),
        (PSET_REQUIREMENT, "Pset mismatch", pset_diffs),
    ];
    for (requirement, label, diffs) in checks {
        if diffs.is_empty() {
            spec.record_pass(requirement, element_ref.clone());
        } else {
            spec.record_fail(requirement, element_ref.clone(), format!("{label}: {}", diffs.join(", ")));
        }
    }
}

/// `Set.Member -> value` over property and quantity sets.
fn flatten_sets(entity: &Entity<'_>) -> BTreeMap<String, String> {
    entity
        .property_sets()
        .into_iter()
        .flat_map(|(set, members)| {
            members
                .into_iter()
                .map(move |(member, value)| (format!("{set}.{member}"), value))
        })
        .collect()
}

fn map_diff<V: PartialEq + Display>(left: &BTreeMap<String, V>, right: &BTreeMap<String, V>) -> Vec<String> {
    let mut diffs = Vec::new();
    for (key, l) in left {
        match right.get(key) {
            Some(r) if r == l => {}
            Some(r) => diffs.push(format!("{key} '{l}' != '{r}'")),
            None => diffs.push(format!("{key} '{l}' != missing")),
        }
    }
    for (key, r) in right {
        if !left.contains_key(key) {
            diffs.push(format!("{key} missing != '{r}'"));
        }
    }
    diffs
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn diff_lists_changed_added_and_removed_keys() {
        let left: BTreeMap<String, String> =
            [("Name".to_string(), "A".to_string()), ("Tag".to_string(), "1".to_string())].into();
        let right: BTreeMap<String, String> =
            [("Name".to_string(), "B".to_string()), ("Description".to_string(), "d".to_string())].into();
        assert_eq!(
            map_diff(&left, &right),
            vec![
                "Name 'A' != 'B'".to_string(),
                "Tag '1' != missing".to_string(),
                "Description missing != 'd'".to_string(),
            ]
        );
        assert!(map_diff(&left, &left).is_empty());
    }

    #[test]
    fn empty_report_has_three_requirements() {
        let report = IntegrityValidator::new().empty_report();
        assert_eq!(report.specifications[0].requirements.len(), 3);
        assert_eq!(report.filename, None);
    }
}
