//! Mirrors element selection between the tree views.
//!
//! Each view keeps the nodes the user picked in it apart from the nodes
//! mirrored into it from another view. A selection change in one view
//! drops the mirrored nodes of every other view, then mirrors the selected
//! global ids into them again.

use crate::tree::{NodeId, Tree};
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Nodes were mirrored into the other views.
    Synced { mirrored: usize },
    /// Everything is selected; show the aggregate view instead.
    ShowAggregate,
}

#[derive(Debug, Clone, Default)]
struct ViewSelection {
    own: BTreeSet<NodeId>,
    mirrored: BTreeSet<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct SelectionSynchronizer {
    views: Vec<ViewSelection>,
}

impl SelectionSynchronizer {
    #[must_use]
    pub fn new(views: usize) -> Self {
        Self {
            views: vec![ViewSelection::default(); views],
        }
    }

    pub fn clear(&mut self) {
        for view in &mut self.views {
            *view = ViewSelection::default();
        }
    }

    /// Every node shown as selected in a view.
    #[must_use]
    pub fn selected(&self, view: usize) -> BTreeSet<NodeId> {
        self.views
            .get(view)
            .map(|v| v.own.union(&v.mirrored).copied().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_selected(&self, view: usize, node: NodeId) -> bool {
        self.views
            .get(view)
            .is_some_and(|v| v.own.contains(&node) || v.mirrored.contains(&node))
    }

    /// Selects or deselects one node in `source` and mirrors the result.
    pub fn set_selected(
        &mut self,
        trees: &[&Tree],
        source: usize,
        node: NodeId,
        selected: bool,
        total_elements: usize,
    ) -> SyncOutcome {
        if let Some(view) = self.views.get_mut(source) {
            if selected {
                view.own.insert(node);
            } else {
                view.own.remove(&node);
                view.mirrored.remove(&node);
            }
        }
        self.sync(trees, source, total_elements)
    }

    /// Replaces the selection of `source` and mirrors it.
    pub fn replace_selection<I>(
        &mut self,
        trees: &[&Tree],
        source: usize,
        nodes: I,
        total_elements: usize,
    ) -> SyncOutcome
    where
        I: IntoIterator<Item = NodeId>,
    {
        if let Some(view) = self.views.get_mut(source) {
            view.own = nodes.into_iter().collect();
            view.mirrored.clear();
        }
        self.sync(trees, source, total_elements)
    }

    /// Mirrors the selection of `source` into every other view.
    pub fn sync(&mut self, trees: &[&Tree], source: usize, total_elements: usize) -> SyncOutcome {
        let (Some(view), Some(source_tree)) = (self.views.get(source), trees.get(source)) else {
            return SyncOutcome::Synced { mirrored: 0 };
        };

        let selected_elements = view
            .own
            .iter()
            .filter(|&&n| source_tree.element(n).is_some())
            .count();
        if total_elements > 0 && selected_elements >= total_elements {
            debug!(view = source, selected_elements, "everything selected, sync skipped");
            return SyncOutcome::ShowAggregate;
        }

        let guids: Vec<String> = view
            .own
            .iter()
            .filter_map(|&n| source_tree.element(n).map(|e| e.guid.clone()))
            .collect();

        let mut mirrored = 0;
        for (index, tree) in trees.iter().enumerate() {
            if index == source {
                continue;
            }
            let Some(target) = self.views.get_mut(index) else {
                continue;
            };
            target.mirrored.clear();
            for guid in &guids {
                if let Some(node) = tree.find_by_guid(Tree::ROOT, guid) {
                    target.mirrored.insert(node);
                    mirrored += 1;
                }
            }
        }
        debug!(view = source, guids = guids.len(), mirrored, "selection mirrored");
        SyncOutcome::Synced { mirrored }
    }
}
