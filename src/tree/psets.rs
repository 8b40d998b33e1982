use crate::model::ProjectFile;
use crate::parser::SetKind;
use crate::tree::{NodeId, Tree};
use std::collections::{HashMap, HashSet};

/// Property set overview: set, property, then each distinct value with the
/// number of elements carrying it. Label column 1 holds the count.
#[derive(Debug, Clone, Default)]
pub struct PsetSummary {
    tree: Tree,
    counted: HashSet<(String, String, String)>,
    counts: HashMap<NodeId, usize>,
}

impl PsetSummary {
    pub const HEADERS: [&'static str; 2] = ["Property", "Elements"];

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Adds one file's property values. An element already counted from
    /// another file is not counted again.
    pub fn add_file(&mut self, file: &ProjectFile) {
        for element in file.model().elements() {
            let Some(guid) = element.global_id() else {
                continue;
            };
            for (set, properties) in element.sets_of_kind(SetKind::Property) {
                for (property, value) in properties {
                    let key = (guid.to_string(), set.clone(), property.clone());
                    if !self.counted.insert(key) {
                        continue;
                    }
                    let set_node = self.tree.label_child(Tree::ROOT, &set);
                    let property_node = self.tree.label_child(set_node, &property);
                    let value_node = self.tree.label_child(property_node, &value);

                    let count = self.counts.entry(value_node).or_default();
                    *count += 1;
                    let count = count.to_string();
                    if let Some(data) = self.tree.label_mut(value_node) {
                        data.truncate(1);
                        data.push(count);
                    }
                }
            }
        }
    }

    /// Elements counted for one value, 0 if absent.
    #[must_use]
    pub fn count(&self, set: &str, property: &str, value: &str) -> usize {
        self.tree
            .child_with_label(Tree::ROOT, set)
            .and_then(|s| self.tree.child_with_label(s, property))
            .and_then(|p| self.tree.child_with_label(p, value))
            .and_then(|v| self.counts.get(&v).copied())
            .unwrap_or(0)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
