use crate::model::ProjectFile;
use crate::tree::{BuilderState, Tree, TreeBuilder, TreeKind};

pub const WITHOUT_OBJECT_TYPE: &str = "Without object type";

/// Elements grouped by class, then by object type.
#[derive(Debug, Clone, Default)]
pub struct ClassTree {
    state: BuilderState,
}

impl ClassTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct classes seen so far.
    #[must_use]
    pub fn class_count(&self) -> usize {
        self.state.tree.child_count(Tree::ROOT)
    }
}

impl TreeBuilder for ClassTree {
    fn kind(&self) -> TreeKind {
        TreeKind::Class
    }

    fn tree(&self) -> &Tree {
        &self.state.tree
    }

    fn add_file(&mut self, file: &ProjectFile) {
        let tree = &mut self.state.tree;
        for element in file.model().elements() {
            let Some(guid) = element.global_id() else {
                continue;
            };
            let class = element.class();
            let class_node = tree.label_child(Tree::ROOT, &class);
            let type_node = tree.label_child(
                class_node,
                element.object_type().unwrap_or(WITHOUT_OBJECT_TYPE),
            );
            tree.element_child(type_node, guid, &class, file.filename(), element.id());
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
