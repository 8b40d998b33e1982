//! User defined grouping.
//!
//! Each [`CustomField`] adds one level of label nodes; elements become
//! leaves below the path of labels their values select. An element is
//! placed once per tree: the file that brings it first decides its path.

use crate::model::ProjectFile;
use crate::parser::{Entity, SetKind};
use crate::tree::{BuilderState, NodeId, Tree, TreeBuilder, TreeKind};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub const UNDEFINED: &str = "Undefined";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CustomField {
    Class,
    ObjectType,
    /// A property, or a quantity if no property set has the name.
    Property { set: String, name: String },
    Filename,
    Container,
}

impl CustomField {
    fn value(&self, entity: &Entity<'_>, filename: &str) -> Option<String> {
        match self {
            CustomField::Class => Some(entity.class()),
            CustomField::ObjectType => entity.object_type().map(str::to_string),
            CustomField::Property { set, name } => entity
                .property(SetKind::Property, set, name)
                .or_else(|| entity.property(SetKind::Quantity, set, name)),
            CustomField::Filename => Some(filename.to_string()),
            CustomField::Container => entity
                .container()
                .map(|c| c.name().map_or_else(|| c.class(), str::to_string)),
        }
    }
}

impl fmt::Display for CustomField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomField::Class => f.write_str("class"),
            CustomField::ObjectType => f.write_str("object-type"),
            CustomField::Property { set, name } => write!(f, "pset:{set}:{name}"),
            CustomField::Filename => f.write_str("file"),
            CustomField::Container => f.write_str("container"),
        }
    }
}

impl FromStr for CustomField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "class" => Ok(CustomField::Class),
            "object-type" => Ok(CustomField::ObjectType),
            "file" => Ok(CustomField::Filename),
            "container" => Ok(CustomField::Container),
            other => {
                let mut parts = other.splitn(3, ':');
                match (parts.next(), parts.next(), parts.next()) {
                    (Some("pset"), Some(set), Some(name)) if !set.is_empty() && !name.is_empty() => {
                        Ok(CustomField::Property {
                            set: set.to_string(),
                            name: name.to_string(),
                        })
                    }
                    _ => Err(format!(
                        "unknown field '{other}', expected class, object-type, file, container or pset:<Set>:<Prop>"
                    )),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CustomTree {
    state: BuilderState,
    fields: Vec<CustomField>,
    placed: HashMap<String, NodeId>,
}

impl CustomTree {
    #[must_use]
    pub fn new(fields: Vec<CustomField>) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn fields(&self) -> &[CustomField] {
        &self.fields
    }

    /// Replaces the grouping. Existing nodes are dropped; callers re-add
    /// the open files.
    pub fn set_fields(&mut self, fields: Vec<CustomField>) {
        self.fields = fields;
        self.clear();
    }
}

impl TreeBuilder for CustomTree {
    fn kind(&self) -> TreeKind {
        TreeKind::Custom
    }

    fn tree(&self) -> &Tree {
        &self.state.tree
    }

    fn add_file(&mut self, file: &ProjectFile) {
        let filename = file.filename();
        for element in file.model().elements() {
            let Some(guid) = element.global_id() else {
                continue;
            };
            if let Some(&node) = self.placed.get(guid) {
                if let Some(existing) = self.state.tree.element_mut(node) {
                    existing.absorb(filename, element.id());
                }
                continue;
            }

            let mut parent = Tree::ROOT;
            for field in &self.fields {
                let label = field
                    .value(&element, filename)
                    .unwrap_or_else(|| UNDEFINED.to_string());
                parent = self.state.tree.label_child(parent, &label);
            }
            let node = self
                .state
                .tree
                .element_child(parent, guid, &element.class(), filename, element.id());
            self.placed.insert(guid.to_string(), node);
        }
    }

    fn clear(&mut self) {
        self.state.tree.clear();
        self.placed.clear();
    }

    fn column_count(&self) -> usize {
        self.state.columns
    }

    fn columns_changed(&mut self, count: usize) {
        self.state.columns = count;
    }
}
