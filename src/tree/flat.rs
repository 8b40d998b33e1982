use crate::model::ProjectFile;
use crate::tree::{BuilderState, NodeId, Tree, TreeBuilder, TreeKind};

pub const ELEMENTS: &str = "Elements";
pub const ELEMENT_TYPES: &str = "Element types";

/// Two groups: every element occurrence, and every element type.
#[derive(Debug, Clone, Default)]
pub struct FlatTree {
    state: BuilderState,
}

impl FlatTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct elements across all files.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.group(ELEMENTS)
            .map_or(0, |group| self.state.tree.child_count(group))
    }

    #[must_use]
    pub fn type_count(&self) -> usize {
        self.group(ELEMENT_TYPES)
            .map_or(0, |group| self.state.tree.child_count(group))
    }

    fn group(&self, label: &str) -> Option<NodeId> {
        self.state.tree.child_with_label(Tree::ROOT, label)
    }
}

impl TreeBuilder for FlatTree {
    fn kind(&self) -> TreeKind {
        TreeKind::Flat
    }

    fn tree(&self) -> &Tree {
        &self.state.tree
    }

    fn add_file(&mut self, file: &ProjectFile) {
        let model = file.model();
        let tree = &mut self.state.tree;
        let elements = tree.label_child(Tree::ROOT, ELEMENTS);
        let types = tree.label_child(Tree::ROOT, ELEMENT_TYPES);

        for (group, entities) in [(elements, model.elements()), (types, model.element_types())] {
            for entity in entities {
                if let Some(guid) = entity.global_id() {
                    tree.element_child(group, guid, &entity.class(), file.filename(), entity.id());
                }
            }
        }
    }

    fn clear(&mut self) {
        self.state.tree.clear();
    }

    fn column_count(&self) -> usize {
        self.state.columns
    }

    fn columns_changed(&mut self, count: usize) {
        self.state.columns = count;
    }
}
