//! Arena tree shared by every view.
//!
//! Nodes live in a `Vec` owned by the [`Tree`]; parents own their children
//! through index lists and children point back to their parent by index.
//! Node 0 is the invisible root.

use crate::tree::columns::{BuiltinColumn, ColumnDescriptor};
use crate::tree::CellContext;

pub type NodeId = usize;

/// One file an element node was seen in, with the element's local id there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub filename: String,
    pub id: u64,
}

/// A logical building element, merged across files by global id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementNode {
    pub guid: String,
    pub class: String,
    sources: Vec<FileRef>,
}

impl ElementNode {
    #[must_use]
    pub fn new(guid: &str, class: &str, filename: &str, id: u64) -> Self {
        Self {
            guid: guid.to_string(),
            class: class.to_string(),
            sources: vec![FileRef {
                filename: filename.to_string(),
                id,
            }],
        }
    }

    /// Records another file containing this element. Returns false if the
    /// file was already recorded.
    pub fn absorb(&mut self, filename: &str, id: u64) -> bool {
        if self.sources.iter().any(|s| s.filename == filename) {
            return false;
        }
        self.sources.push(FileRef {
            filename: filename.to_string(),
            id,
        });
        true
    }

    #[must_use]
    pub fn sources(&self) -> &[FileRef] {
        &self.sources
    }

    #[must_use]
    pub fn filenames(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.filename.as_str()).collect()
    }

    /// The local id from the first file the element was seen in.
    #[must_use]
    pub fn canonical_id(&self) -> u64 {
        self.sources[0].id
    }

    /// Distinct local ids in first-seen order.
    #[must_use]
    pub fn local_ids(&self) -> Vec<u64> {
        let mut ids = Vec::new();
        for source in &self.sources {
            if !ids.contains(&source.id) {
                ids.push(source.id);
            }
        }
        ids
    }

    #[must_use]
    pub fn first_file(&self) -> &FileRef {
        &self.sources[0]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Grouping node with one display string per column.
    Label(Vec<String>),
    Element(ElementNode),
}

#[derive(Debug, Clone)]
pub struct TreeNode {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl TreeNode {
    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    #[must_use]
    pub fn element(&self) -> Option<&ElementNode> {
        match &self.kind {
            NodeKind::Element(element) => Some(element),
            NodeKind::Label(_) => None,
        }
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Label(data) => data.first().map(String::as_str),
            NodeKind::Element(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Substring,
    Exact,
}

#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<TreeNode>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub const ROOT: NodeId = 0;

    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![TreeNode {
                kind: NodeKind::Label(Vec::new()),
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Drops every node but the root.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id]
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    #[must_use]
    pub fn element(&self, id: NodeId) -> Option<&ElementNode> {
        self.nodes.get(id).and_then(TreeNode::element)
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementNode> {
        match self.nodes.get_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Element(element)) => Some(element),
            _ => None,
        }
    }

    pub fn label_mut(&mut self, id: NodeId) -> Option<&mut Vec<String>> {
        match self.nodes.get_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Label(data)) => Some(data),
            _ => None,
        }
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes[Self::ROOT].children.is_empty()
    }

    pub fn append_child(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(TreeNode {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        id
    }

    pub fn append_label(&mut self, parent: NodeId, label: &str) -> NodeId {
        self.append_child(parent, NodeKind::Label(vec![label.to_string()]))
    }

    /// Existing label child with this text, or a new one.
    pub fn label_child(&mut self, parent: NodeId, label: &str) -> NodeId {
        match self.child_with_label(parent, label) {
            Some(id) => id,
            None => self.append_label(parent, label),
        }
    }

    /// Element child for the given entity; an existing node with the same
    /// global id absorbs the file instead of being duplicated.
    pub fn element_child(
        &mut self,
        parent: NodeId,
        guid: &str,
        class: &str,
        filename: &str,
        id: u64,
    ) -> NodeId {
        if let Some(existing) = self.child_with_guid(parent, guid) {
            if let Some(element) = self.element_mut(existing) {
                element.absorb(filename, id);
            }
            return existing;
        }
        self.append_child(
            parent,
            NodeKind::Element(ElementNode::new(guid, class, filename, id)),
        )
    }

    #[must_use]
    pub fn child_with_label(&self, parent: NodeId, label: &str) -> Option<NodeId> {
        self.nodes[parent]
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes[c].label() == Some(label))
    }

    #[must_use]
    pub fn child_with_guid(&self, parent: NodeId, guid: &str) -> Option<NodeId> {
        self.nodes[parent]
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes[c].element().is_some_and(|e| e.guid == guid))
    }

    #[must_use]
    pub fn child_count(&self, id: NodeId) -> usize {
        self.nodes[id].children.len()
    }

    /// Number of leaves below this node; a node without children is a leaf
    /// itself and counts as one.
    #[must_use]
    pub fn leaf_count(&self, id: NodeId) -> usize {
        let children = &self.nodes[id].children;
        if children.is_empty() {
            return 1;
        }
        children.iter().map(|&c| self.leaf_count(c)).sum()
    }

    /// Depth below the invisible root; its direct children are level 0.
    #[must_use]
    pub fn level(&self, id: NodeId) -> usize {
        let mut level = 0;
        let mut current = self.nodes[id].parent;
        while let Some(parent) = current {
            if parent == Self::ROOT {
                return level;
            }
            level += 1;
            current = self.nodes[parent].parent;
        }
        level
    }

    /// Position among the parent's children.
    #[must_use]
    pub fn row(&self, id: NodeId) -> usize {
        self.nodes[id]
            .parent
            .and_then(|p| self.nodes[p].children.iter().position(|&c| c == id))
            .unwrap_or(0)
    }

    /// Every node below `from` (excluding it) in document order, with level.
    #[must_use]
    pub fn walk(&self, from: NodeId) -> Vec<(NodeId, usize)> {
        let mut out = Vec::new();
        let base = if from == Self::ROOT {
            0
        } else {
            self.level(from) + 1
        };
        self.walk_into(from, base, &mut out);
        out
    }

    fn walk_into(&self, id: NodeId, level: usize, out: &mut Vec<(NodeId, usize)>) {
        for &child in &self.nodes[id].children {
            out.push((child, level));
            self.walk_into(child, level + 1, out);
        }
    }

    /// First element node with this global id at or below `from`.
    #[must_use]
    pub fn find_by_guid(&self, from: NodeId, guid: &str) -> Option<NodeId> {
        if self.nodes[from].element().is_some_and(|e| e.guid == guid) {
            return Some(from);
        }
        self.nodes[from]
            .children
            .iter()
            .find_map(|&c| self.find_by_guid(c, guid))
    }

    /// First element node whose entity carries this tag, at or below `from`.
    #[must_use]
    pub fn find_by_tag(&self, from: NodeId, tag: &str, ctx: &CellContext<'_>) -> Option<NodeId> {
        let matches = self
            .data(from, BuiltinColumn::Tag.index(), ctx)
            .is_some_and(|t| t == tag);
        if self.nodes[from].element().is_some() && matches {
            return Some(from);
        }
        self.nodes[from]
            .children
            .iter()
            .find_map(|&c| self.find_by_tag(c, tag, ctx))
    }

    /// Every node at or below `from` whose value in `column` matches.
    #[must_use]
    pub fn search(
        &self,
        from: NodeId,
        pattern: &str,
        column: usize,
        case_sensitive: bool,
        mode: SearchMode,
        ctx: &CellContext<'_>,
    ) -> Vec<NodeId> {
        let pattern = if case_sensitive {
            pattern.to_string()
        } else {
            pattern.to_lowercase()
        };
        let mut found = Vec::new();
        self.search_into(from, &pattern, column, case_sensitive, mode, ctx, &mut found);
        found
    }

    #[allow(clippy::too_many_arguments)]
    fn search_into(
        &self,
        id: NodeId,
        pattern: &str,
        column: usize,
        case_sensitive: bool,
        mode: SearchMode,
        ctx: &CellContext<'_>,
        found: &mut Vec<NodeId>,
    ) {
        if id != Self::ROOT {
            let value = match self.nodes[id].label() {
                // Search the bare label, without the child count suffix
                Some(label) if column == 0 => Some(label.to_string()),
                _ => self.data(id, column, ctx),
            };
            if let Some(value) = value {
                let value = if case_sensitive {
                    value
                } else {
                    value.to_lowercase()
                };
                let hit = match mode {
                    SearchMode::Substring => value.contains(pattern),
                    SearchMode::Exact => value == pattern,
                };
                if hit {
                    found.push(id);
                }
            }
        }
        for &child in &self.nodes[id].children {
            self.search_into(child, pattern, column, case_sensitive, mode, ctx, found);
        }
    }

    /// Number of element nodes in the whole tree.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.element().is_some()).count()
    }

    /// Display value of one cell.
    ///
    /// Label nodes show their own strings, with a `(children)` or
    /// `(children/leaves)` suffix on column 0 when they have children.
    /// Element nodes read from the open files on every call.
    #[must_use]
    pub fn data(&self, id: NodeId, column: usize, ctx: &CellContext<'_>) -> Option<String> {
        match &self.nodes[id].kind {
            NodeKind::Label(data) => {
                let value = data.get(column)?;
                if column == 0 {
                    let children = self.child_count(id);
                    if children > 0 {
                        let leaves = self.leaf_count(id);
                        return Some(if leaves == children {
                            format!("{value} ({children})")
                        } else {
                            format!("{value} ({children}/{leaves})")
                        });
                    }
                }
                Some(value.clone())
            }
            NodeKind::Element(element) => element_data(element, column, ctx),
        }
    }
}

fn element_data(element: &ElementNode, column: usize, ctx: &CellContext<'_>) -> Option<String> {
    let first = element.first_file();
    let entity = ctx.registry.get_by_local_id(&first.filename, first.id);

    match ctx.columns.descriptor(column)? {
        ColumnDescriptor::Builtin(builtin) => match builtin {
            BuiltinColumn::Class => Some(element.class.clone()),
            BuiltinColumn::Id => Some(element.canonical_id().to_string()),
            BuiltinColumn::Name => entity?.name().map(str::to_string),
            BuiltinColumn::Guid => Some(element.guid.clone()),
            BuiltinColumn::Tag => entity?.tag().map(str::to_string),
            BuiltinColumn::ObjectType => entity?.object_type().map(str::to_string),
            BuiltinColumn::Description => entity?.description().map(str::to_string),
            BuiltinColumn::Filenames => Some(element.filenames().join(", ")),
            BuiltinColumn::Container => entity?
                .container()
                .and_then(|c| c.name().map(str::to_string)),
            BuiltinColumn::Validation => ctx.validation?.tally_text(&element.guid),
        },
        ColumnDescriptor::Dynamic(dynamic) => {
            // Not cached: later files may carry the value when the first does not
            element.sources().iter().find_map(|source| {
                ctx.registry
                    .get_by_local_id(&source.filename, source.id)?
                    .property(dynamic.kind, &dynamic.set, &dynamic.member)
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProjectRegistry;
    use crate::tree::columns::ColumnRegistry;
    use pretty_assertions::assert_eq;

    fn sample() -> (Tree, NodeId, NodeId) {
        let mut tree = Tree::new();
        let group = tree.append_label(Tree::ROOT, "Walls");
        let sub = tree.append_label(group, "Basic");
        tree.element_child(sub, "G1", "IfcWall", "a.ifc", 1);
        tree.element_child(sub, "G2", "IfcWall", "a.ifc", 2);
        let single = tree.element_child(group, "G3", "IfcWall", "a.ifc", 3);
        (tree, group, single)
    }

    #[test]
    fn leaf_count_counts_only_leaves() {
        let (tree, group, single) = sample();
        assert_eq!(tree.leaf_count(single), 1);
        assert_eq!(tree.leaf_count(group), 3);
        assert_eq!(tree.leaf_count(Tree::ROOT), 3);
    }

    #[test]
    fn label_shows_children_and_leaves() {
        let (tree, group, _) = sample();
        let registry = ProjectRegistry::new();
        let columns = ColumnRegistry::new();
        let ctx = CellContext::new(&registry, &columns);
        assert_eq!(tree.data(group, 0, &ctx).as_deref(), Some("Walls (2/3)"));
        let sub = tree.children(group)[0];
        assert_eq!(tree.data(sub, 0, &ctx).as_deref(), Some("Basic (2)"));
    }

    #[test]
    fn levels_start_below_root() {
        let (tree, group, single) = sample();
        assert_eq!(tree.level(group), 0);
        assert_eq!(tree.level(single), 1);
        let deep = tree.children(tree.children(group)[0])[1];
        assert_eq!(tree.level(deep), 2);
        assert_eq!(tree.row(deep), 1);
    }

    #[test]
    fn element_child_absorbs_duplicate_guid() {
        let (mut tree, group, single) = sample();
        let again = tree.element_child(group, "G3", "IfcWall", "b.ifc", 30);
        assert_eq!(again, single);
        let element = tree.element(single).unwrap();
        assert_eq!(element.filenames(), vec!["a.ifc", "b.ifc"]);
        assert_eq!(element.local_ids(), vec![3, 30]);
        assert_eq!(element.canonical_id(), 3);
    }

    #[test]
    fn finds_by_guid_and_searches() {
        let (tree, _, single) = sample();
        assert_eq!(tree.find_by_guid(Tree::ROOT, "G3"), Some(single));
        assert_eq!(tree.find_by_guid(Tree::ROOT, "nope"), None);

        let registry = ProjectRegistry::new();
        let columns = ColumnRegistry::new();
        let ctx = CellContext::new(&registry, &columns);
        let hits = tree.search(Tree::ROOT, "g", 3, false, SearchMode::Substring, &ctx);
        assert_eq!(hits.len(), 3);
        let exact = tree.search(Tree::ROOT, "G2", 3, true, SearchMode::Exact, &ctx);
        assert_eq!(exact.len(), 1);
        let labels = tree.search(Tree::ROOT, "walls", 0, false, SearchMode::Exact, &ctx);
        assert_eq!(labels.len(), 1);
    }

    #[test]
    fn walk_is_document_order() {
        let (tree, _, _) = sample();
        let levels: Vec<usize> = tree.walk(Tree::ROOT).iter().map(|(_, l)| *l).collect();
        assert_eq!(levels, vec![0, 1, 2, 2, 1]);
    }
}
