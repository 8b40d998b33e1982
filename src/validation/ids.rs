//! IDS rule documents.
//!
//! Reads the subset of the Information Delivery Specification format the
//! workbench evaluates: entity, attribute and property facets with simple
//! values, enumerations and numeric bounds.

use crate::error::RuleError;
use crate::model::{ElementRef, ProjectFile};
use crate::parser::Entity;
use crate::validation::reporter::{RequirementResult, Reporter, SpecificationResult};
use roxmltree::Node;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Accepted values of a facet parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueConstraint {
    Any,
    Simple(String),
    Enumeration(Vec<String>),
    Range {
        min: Option<Bound>,
        max: Option<Bound>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound {
    pub value: f64,
    pub inclusive: bool,
}

impl ValueConstraint {
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        match self {
            ValueConstraint::Any => true,
            ValueConstraint::Simple(expected) => values_equal(expected, value),
            ValueConstraint::Enumeration(options) => options.iter().any(|o| values_equal(o, value)),
            ValueConstraint::Range { min, max } => {
                let Ok(number) = value.trim().parse::<f64>() else {
                    return false;
                };
                let above = min.is_none_or(|b| {
                    if b.inclusive {
                        number >= b.value
                    } else {
                        number > b.value
                    }
                });
                let below = max.is_none_or(|b| {
                    if b.inclusive {
                        number <= b.value
                    } else {
                        number < b.value
                    }
                });
                above && below
            }
        }
    }
}

fn values_equal(expected: &str, actual: &str) -> bool {
    if expected == actual {
        return true;
    }
    if ["true", "false"].iter().any(|b| b.eq_ignore_ascii_case(expected)) {
        return expected.eq_ignore_ascii_case(actual);
    }
    match (expected.trim().parse::<f64>(), actual.trim().parse::<f64>()) {
        (Ok(a), Ok(b)) => (a - b).abs() <= f64::EPSILON * a.abs().max(b.abs()).max(1.0),
        _ => false,
    }
}

impl fmt::Display for ValueConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueConstraint::Any => f.write_str("any value"),
            ValueConstraint::Simple(value) => write!(f, "'{value}'"),
            ValueConstraint::Enumeration(options) => {
                let quoted: Vec<String> = options.iter().map(|o| format!("'{o}'")).collect();
                write!(f, "one of {}", quoted.join(", "))
            }
            ValueConstraint::Range { min, max } => {
                let mut parts = Vec::new();
                if let Some(b) = min {
                    parts.push(format!("{} {}", if b.inclusive { ">=" } else { ">" }, b.value));
                }
                if let Some(b) = max {
                    parts.push(format!("{} {}", if b.inclusive { "<=" } else { "<" }, b.value));
                }
                f.write_str(&parts.join(" and "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Facet {
    Entity {
        name: String,
    },
    Attribute {
        name: String,
        value: ValueConstraint,
    },
    Property {
        set: String,
        name: String,
        value: ValueConstraint,
    },
}

/// What a facet finds on one entity.
enum Presence {
    Missing,
    Mismatch(String),
    Match,
}

impl Facet {
    fn inspect(&self, entity: &Entity<'_>) -> Presence {
        match self {
            Facet::Entity { name } => {
                if entity.step_type().eq_ignore_ascii_case(name) {
                    Presence::Match
                } else {
                    Presence::Mismatch(entity.class())
                }
            }
            Facet::Attribute { name, value } => match entity.attribute(name) {
                None => Presence::Missing,
                Some(actual) if value.matches(&actual) => Presence::Match,
                Some(actual) => Presence::Mismatch(actual),
            },
            Facet::Property { set, name, value } => {
                let actual = entity
                    .property_sets()
                    .get(set)
                    .and_then(|members| members.get(name))
                    .cloned();
                match actual {
                    None => Presence::Missing,
                    Some(actual) if value.matches(&actual) => Presence::Match,
                    Some(actual) => Presence::Mismatch(actual),
                }
            }
        }
    }

    fn applies_to(&self, entity: &Entity<'_>) -> bool {
        matches!(self.inspect(entity), Presence::Match)
    }

    /// Text used in the applicability list of a result.
    #[must_use]
    pub fn applicability_text(&self) -> String {
        match self {
            Facet::Entity { name } => format!("All {name} data"),
            Facet::Attribute { name, value } => match value {
                ValueConstraint::Any => format!("Data where the {name} is provided"),
                value => format!("Data where the {name} is {value}"),
            },
            Facet::Property { set, name, value } => match value {
                ValueConstraint::Any => format!("Elements with {name} data in the dataset {set}"),
                value => format!("Elements with {name} data of {value} in the dataset {set}"),
            },
        }
    }

    fn subject(&self) -> String {
        match self {
            Facet::Entity { name } => format!("an {name}"),
            Facet::Attribute { name, .. } => format!("The {name}"),
            Facet::Property { set, name, .. } => format!("{name} data in the dataset {set}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cardinality {
    #[default]
    Required,
    Optional,
    Prohibited,
}

impl Cardinality {
    fn parse(value: Option<&str>) -> Self {
        match value {
            Some("optional") => Cardinality::Optional,
            Some("prohibited") => Cardinality::Prohibited,
            _ => Cardinality::Required,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Requirement {
    pub facet: Facet,
    pub cardinality: Cardinality,
}

impl Requirement {
    /// Human readable requirement, always in line with the current cardinality.
    #[must_use]
    pub fn description(&self) -> String {
        let subject = self.facet.subject();
        let value = match &self.facet {
            Facet::Attribute { value, .. } | Facet::Property { value, .. } => Some(value),
            Facet::Entity { .. } => None,
        }
        .filter(|v| **v != ValueConstraint::Any);

        match (&self.facet, self.cardinality, value) {
            (Facet::Entity { .. }, Cardinality::Prohibited, _) => format!("Shall not be {subject}"),
            (Facet::Entity { .. }, _, _) => format!("Shall be {subject}"),
            (_, Cardinality::Required, Some(v)) => format!("{subject} shall be {v}"),
            (_, Cardinality::Required, None) => format!("{subject} shall be provided"),
            (_, Cardinality::Optional, Some(v)) => {
                format!("{subject} may be provided and if so shall be {v}")
            }
            (_, Cardinality::Optional, None) => format!("{subject} may be provided"),
            (_, Cardinality::Prohibited, Some(v)) => format!("{subject} shall not be {v}"),
            (_, Cardinality::Prohibited, None) => format!("{subject} shall not be provided"),
        }
    }

    /// `None` if the entity passes, the failure reason otherwise.
    fn check(&self, entity: &Entity<'_>) -> Option<String> {
        let presence = self.facet.inspect(entity);
        match (self.cardinality, presence) {
            (Cardinality::Required, Presence::Match)
            | (Cardinality::Optional, Presence::Match | Presence::Missing)
            | (Cardinality::Prohibited, Presence::Missing | Presence::Mismatch(_)) => None,
            (Cardinality::Required, Presence::Missing) => {
                Some(format!("{} does not exist", self.facet.subject()))
            }
            (Cardinality::Required | Cardinality::Optional, Presence::Mismatch(actual)) => {
                Some(format!("The value \"{actual}\" does not meet the requirement"))
            }
            (Cardinality::Prohibited, Presence::Match) => {
                Some(format!("{} was found but is prohibited", self.facet.subject()))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Specification {
    pub name: String,
    pub description: String,
    /// Schemas this specification targets; empty means all.
    pub ifc_versions: Vec<String>,
    pub applicability: Vec<Facet>,
    pub requirements: Vec<Requirement>,
}

impl Specification {
    fn targets_schema(&self, schema: &str) -> bool {
        let schema = schema.to_ascii_uppercase();
        self.ifc_versions.is_empty()
            || self.ifc_versions.iter().any(|v| {
                let v = v.to_ascii_uppercase();
                schema == v || schema.starts_with(&format!("{v}_"))
            })
    }

    fn validate(&self, file: &ProjectFile) -> SpecificationResult {
        let mut result = SpecificationResult::new(&self.name, &self.description);
        result.applicability = self.applicability.iter().map(Facet::applicability_text).collect();
        result.requirements = self
            .requirements
            .iter()
            .map(|r| RequirementResult::new(r.description()))
            .collect();

        if !self.targets_schema(file.model().schema()) {
            debug!(
                specification = %self.name,
                schema = file.model().schema(),
                "schema not targeted, nothing applicable"
            );
            return result;
        }

        let applicable: Vec<Entity<'_>> = file
            .model()
            .objects()
            .into_iter()
            .filter(|entity| {
                !self.applicability.is_empty() && self.applicability.iter().all(|f| f.applies_to(entity))
            })
            .collect();
        result.total_applicable = applicable.len();

        for entity in &applicable {
            let element = ElementRef::from_entity(file.filename(), entity);
            for (index, requirement) in self.requirements.iter().enumerate() {
                match requirement.check(entity) {
                    None => result.record_pass(index, element.clone()),
                    Some(reason) => result.record_fail(index, element.clone(), reason),
                }
            }
        }
        result
    }
}

/// Validator backed by one IDS document; identified by the file name.
#[derive(Debug, Clone)]
pub struct IdsValidator {
    abspath: PathBuf,
    filename: String,
    title: String,
    specifications: Vec<Specification>,
}

impl IdsValidator {
    /// Reads an IDS document.
    ///
    /// # Errors
    ///
    /// [`RuleError::FileNotFound`] if the path is missing,
    /// [`RuleError::InvalidRuleFile`] if it cannot be read as IDS.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RuleError> {
        let path = path.as_ref();
        let abspath = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        if !abspath.exists() {
            return Err(RuleError::FileNotFound { path: abspath });
        }
        let content = std::fs::read_to_string(&abspath).map_err(|e| RuleError::InvalidRuleFile {
            path: abspath.clone(),
            message: e.to_string(),
        })?;
        Self::parse(abspath, &content)
    }

    /// Parses IDS text; `abspath` names the document.
    pub fn parse(abspath: PathBuf, content: &str) -> Result<Self, RuleError> {
        let invalid = |message: String| RuleError::InvalidRuleFile {
            path: abspath.clone(),
            message,
        };

        let doc = roxmltree::Document::parse(content).map_err(|e| invalid(e.to_string()))?;
        let specifications_node = doc
            .descendants()
            .find(|n| n.has_tag_name("specifications"))
            .ok_or_else(|| invalid("no <specifications> element".to_string()))?;

        let title = doc
            .descendants()
            .find(|n| n.has_tag_name("info"))
            .and_then(|info| child(info, "title"))
            .and_then(|t| t.text())
            .map(|t| t.trim().to_string())
            .unwrap_or_default();

        let specifications = specifications_node
            .children()
            .filter(|n| n.has_tag_name("specification"))
            .map(parse_specification)
            .collect();

        let filename = abspath
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Self {
            title: if title.is_empty() { filename.clone() } else { title },
            abspath,
            filename,
            specifications,
        })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.filename
    }

    #[must_use]
    pub fn abspath(&self) -> &Path {
        &self.abspath
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn specifications(&self) -> &[Specification] {
        &self.specifications
    }

    /// Changes the cardinality of one requirement. Returns false if the
    /// indices do not exist or the requirement is an entity facet.
    pub fn set_cardinality(&mut self, specification: usize, requirement: usize, cardinality: Cardinality) -> bool {
        match self
            .specifications
            .get_mut(specification)
            .and_then(|s| s.requirements.get_mut(requirement))
        {
            Some(req) if !matches!(req.facet, Facet::Entity { .. }) => {
                req.cardinality = cardinality;
                true
            }
            _ => false,
        }
    }

    /// Applies every specification to one file.
    #[must_use]
    pub fn validate_file(&self, file: &ProjectFile) -> Reporter {
        let specifications: Vec<SpecificationResult> =
            self.specifications.iter().map(|s| s.validate(file)).collect();
        let reporter = Reporter {
            title: self.title.clone(),
            filename: Some(file.filename().to_string()),
            specifications,
        };
        debug!(
            validator = self.id(),
            file = file.filename(),
            failed = reporter.total_failed(),
            passed = reporter.total_passed(),
            "file validated"
        );
        reporter
    }
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(name))
}

fn facet_nodes<'a, 'input>(node: Node<'a, 'input>, section: &str) -> Vec<Node<'a, 'input>> {
    child(node, section)
        .map(|s| s.children().filter(Node::is_element).collect())
        .unwrap_or_default()
}

fn parse_specification(node: Node<'_, '_>) -> Specification {
    let applicability = facet_nodes(node, "applicability")
        .into_iter()
        .filter_map(parse_facet)
        .collect();
    let requirements = facet_nodes(node, "requirements")
        .into_iter()
        .filter_map(|n| {
            parse_facet(n).map(|facet| Requirement {
                facet,
                cardinality: Cardinality::parse(n.attribute("cardinality")),
            })
        })
        .collect();

    Specification {
        name: node.attribute("name").unwrap_or("Unnamed").to_string(),
        description: node.attribute("description").unwrap_or_default().to_string(),
        ifc_versions: node
            .attribute("ifcVersion")
            .map(|v| v.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default(),
        applicability,
        requirements,
    }
}

fn parse_facet(node: Node<'_, '_>) -> Option<Facet> {
    let value = || child(node, "value").map_or(ValueConstraint::Any, parse_value);
    let name_of = |tag: &str| -> Option<String> {
        match child(node, tag).map(parse_value) {
            Some(ValueConstraint::Simple(name)) => Some(name),
            _ => {
                warn!(facet = node.tag_name().name(), field = tag, "only simple names are supported, facet skipped");
                None
            }
        }
    };

    match node.tag_name().name() {
        "entity" => Some(Facet::Entity {
            name: name_of("name")?,
        }),
        "attribute" => Some(Facet::Attribute {
            name: name_of("name")?,
            value: value(),
        }),
        "property" => Some(Facet::Property {
            set: name_of("propertySet")?,
            name: name_of("baseName")?,
            value: value(),
        }),
        other => {
            warn!(facet = other, "unsupported facet skipped");
            None
        }
    }
}

fn parse_value(node: Node<'_, '_>) -> ValueConstraint {
    if let Some(simple) = child(node, "simpleValue") {
        return ValueConstraint::Simple(simple.text().unwrap_or_default().trim().to_string());
    }
    let Some(restriction) = child(node, "restriction") else {
        return ValueConstraint::Any;
    };

    let options: Vec<String> = restriction
        .children()
        .filter(|n| n.has_tag_name("enumeration"))
        .filter_map(|n| n.attribute("value").map(str::to_string))
        .collect();
    if !options.is_empty() {
        return ValueConstraint::Enumeration(options);
    }

    let bound = |tag: &str, inclusive: bool| {
        child(restriction, tag)
            .and_then(|n| n.attribute("value"))
            .and_then(|v| v.trim().parse::<f64>().ok())
            .map(|value| Bound { value, inclusive })
    };
    let min = bound("minInclusive", true).or_else(|| bound("minExclusive", false));
    let max = bound("maxInclusive", true).or_else(|| bound("maxExclusive", false));
    if min.is_some() || max.is_some() {
        return ValueConstraint::Range { min, max };
    }

    warn!("unsupported value restriction, any value accepted");
    ValueConstraint::Any
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const IDS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ids:ids xmlns:ids="http://standards.buildingsmart.org/IDS" xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <ids:info><ids:title>Walls</ids:title></ids:info>
  <ids:specifications>
    <ids:specification name="Fire rating" ifcVersion="IFC4" description="Walls need a rating">
      <ids:applicability>
        <ids:entity><ids:name><ids:simpleValue>IFCWALL</ids:simpleValue></ids:name></ids:entity>
      </ids:applicability>
      <ids:requirements>
        <ids:property cardinality="required">
          <ids:propertySet><ids:simpleValue>Pset_WallCommon</ids:simpleValue></ids:propertySet>
          <ids:baseName><ids:simpleValue>FireRating</ids:simpleValue></ids:baseName>
          <ids:value>
            <xs:restriction base="xs:string">
              <xs:enumeration value="EI30"/>
              <xs:enumeration value="EI60"/>
            </xs:restriction>
          </ids:value>
        </ids:property>
        <ids:attribute>
          <ids:name><ids:simpleValue>Name</ids:simpleValue></ids:name>
        </ids:attribute>
      </ids:requirements>
    </ids:specification>
  </ids:specifications>
</ids:ids>"#;

    fn validator() -> IdsValidator {
        IdsValidator::parse(PathBuf::from("/rules/walls.ids"), IDS).unwrap()
    }

    #[test]
    fn reads_specifications() {
        let ids = validator();
        assert_eq!(ids.id(), "walls.ids");
        assert_eq!(ids.title(), "Walls");
        let spec = &ids.specifications()[0];
        assert_eq!(spec.ifc_versions, vec!["IFC4"]);
        assert_eq!(spec.applicability, vec![Facet::Entity { name: "IFCWALL".to_string() }]);
        assert_eq!(spec.requirements.len(), 2);
        assert_eq!(
            spec.requirements[0].facet,
            Facet::Property {
                set: "Pset_WallCommon".to_string(),
                name: "FireRating".to_string(),
                value: ValueConstraint::Enumeration(vec!["EI30".to_string(), "EI60".to_string()]),
            }
        );
    }

    #[test]
    fn description_follows_cardinality() {
        let mut ids = validator();
        assert_eq!(
            ids.specifications()[0].requirements[1].description(),
            "The Name shall be provided"
        );
        assert!(ids.set_cardinality(0, 1, Cardinality::Prohibited));
        assert_eq!(
            ids.specifications()[0].requirements[1].description(),
            "The Name shall not be provided"
        );
        assert!(!ids.set_cardinality(0, 9, Cardinality::Optional));
    }

    #[test]
    fn rejects_malformed_documents() {
        let err = IdsValidator::parse(PathBuf::from("bad.ids"), "<ids><unclosed></ids>").unwrap_err();
        assert!(matches!(err, RuleError::InvalidRuleFile { .. }));
        let err = IdsValidator::parse(PathBuf::from("empty.ids"), "<ids/>").unwrap_err();
        assert!(matches!(err, RuleError::InvalidRuleFile { .. }));
        let err = IdsValidator::open("/does/not/exist.ids").unwrap_err();
        assert!(matches!(err, RuleError::FileNotFound { .. }));
    }

    #[test]
    fn value_constraints() {
        let range = ValueConstraint::Range {
            min: Some(Bound { value: 1.0, inclusive: true }),
            max: Some(Bound { value: 5.0, inclusive: false }),
        };
        assert!(range.matches("1"));
        assert!(range.matches("4.5"));
        assert!(!range.matches("5"));
        assert!(!range.matches("abc"));
        assert!(ValueConstraint::Simple("true".to_string()).matches("True"));
        assert!(ValueConstraint::Simple("4.50".to_string()).matches("4.5"));
        assert!(!ValueConstraint::Simple("EI30".to_string()).matches("ei30"));
    }
}
