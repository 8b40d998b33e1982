use crate::model::ProjectFile;
use crate::parser::Entity;
use crate::tree::{BuilderState, NodeId, Tree, TreeBuilder, TreeKind};
use std::collections::HashSet;
use tracing::debug;

pub const WITHOUT_CONTAINER: &str = "Without container";

/// Spatial structure view: project, site, building, storey, space, then
/// the elements contained in each.
#[derive(Debug, Clone, Default)]
pub struct LocationTree {
    state: BuilderState,
}

impl LocationTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn add_object(
        &mut self,
        parent: NodeId,
        entity: Entity<'_>,
        filename: &str,
        visited: &mut HashSet<u64>,
    ) {
        if !visited.insert(entity.id()) {
            return;
        }
        let Some(guid) = entity.global_id() else {
            return;
        };
        let node = self
            .state
            .tree
            .element_child(parent, guid, &entity.class(), filename, entity.id());

        for child in entity.children() {
            self.add_object(node, child, filename, visited);
        }
        for element in entity.contained_elements() {
            self.add_object(node, element, filename, visited);
        }
    }
}

impl TreeBuilder for LocationTree {
    fn kind(&self) -> TreeKind {
        TreeKind::Location
    }

    fn tree(&self) -> &Tree {
        &self.state.tree
    }

    fn add_file(&mut self, file: &ProjectFile) {
        let model = file.model();
        let filename = file.filename();
        let mut visited = HashSet::new();

        match model.project() {
            Some(project) if !project.children().is_empty() => {
                self.add_object(Tree::ROOT, project, filename, &mut visited);
            }
            // Some exporters leave out the project decomposition
            project => {
                let parent = match project.and_then(|p| p.global_id().map(|g| (p, g))) {
                    Some((p, guid)) => {
                        visited.insert(p.id());
                        self.state
                            .tree
                            .element_child(Tree::ROOT, guid, &p.class(), filename, p.id())
                    }
                    None => Tree::ROOT,
                };
                for site in model.by_type("IfcSite") {
                    self.add_object(parent, site, filename, &mut visited);
                }
            }
        }

        // Elements not reached from the project, either uncontained or held
        // by a container outside the decomposition. Such a container is
        // kept as the group's child so its elements stay below it.
        let mut seen = HashSet::new();
        let mut strays: Vec<Entity<'_>> = Vec::new();
        for element in model.elements() {
            if visited.contains(&element.id()) {
                continue;
            }
            let root = match element.container() {
                Some(container) if !visited.contains(&container.id()) => container,
                _ => element,
            };
            if seen.insert(root.id()) {
                strays.push(root);
            }
        }
        if !strays.is_empty() {
            let group = self.state.tree.label_child(Tree::ROOT, WITHOUT_CONTAINER);
            for stray in strays {
                self.add_object(group, stray, filename, &mut visited);
            }
        }

        debug!(file = filename, nodes = self.state.tree.len(), "location tree updated");
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
