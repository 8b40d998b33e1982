//! Tree views over the open project.
//!
//! Every view is an arena [`Tree`] built incrementally, one file at a
//! time, by a [`TreeBuilder`]. Element nodes are keyed by global id so the
//! same element loaded from several files appears once per parent.

pub mod class;
pub mod columns;
pub mod custom;
pub mod flat;
pub mod location;
pub mod node;
pub mod psets;

pub use class::ClassTree;
pub use columns::{BuiltinColumn, ColumnDescriptor, ColumnEvent, ColumnRegistry, DynamicColumn};
pub use custom::{CustomField, CustomTree};
pub use flat::FlatTree;
pub use location::LocationTree;
pub use node::{ElementNode, FileRef, NodeId, NodeKind, SearchMode, Tree, TreeNode};
pub use psets::PsetSummary;

use crate::model::{ProjectFile, ProjectRegistry};
use crate::validation::ValidationAggregator;
use std::fmt;

/// Everything a cell lookup may read. Element data is never stored in the
/// tree itself.
#[derive(Clone, Copy)]
pub struct CellContext<'a> {
    pub registry: &'a ProjectRegistry,
    pub columns: &'a ColumnRegistry,
    pub validation: Option<&'a ValidationAggregator>,
}

impl<'a> CellContext<'a> {
    #[must_use]
    pub fn new(registry: &'a ProjectRegistry, columns: &'a ColumnRegistry) -> Self {
        Self {
            registry,
            columns,
            validation: None,
        }
    }

    #[must_use]
    pub fn with_validation(mut self, validation: &'a ValidationAggregator) -> Self {
        self.validation = Some(validation);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeKind {
    Location,
    Class,
    Flat,
    Custom,
}

impl TreeKind {
    /// Views in tab order.
    pub const ALL: [TreeKind; 4] = [
        TreeKind::Location,
        TreeKind::Class,
        TreeKind::Flat,
        TreeKind::Custom,
    ];

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for TreeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = match self {
            TreeKind::Location => "Location",
            TreeKind::Class => "Class",
            TreeKind::Flat => "Flat",
            TreeKind::Custom => "Custom",
        };
        f.write_str(title)
    }
}

/// One incrementally built view.
pub trait TreeBuilder: Send {
    fn kind(&self) -> TreeKind;

    fn tree(&self) -> &Tree;

    /// Merges one file into the tree without touching existing nodes other
    /// than adding the file to already present elements.
    fn add_file(&mut self, file: &ProjectFile);

    /// Removes every node.
    fn clear(&mut self);

    fn column_count(&self) -> usize;

    /// Resizes to `count` columns. Never rebuilds nodes.
    fn columns_changed(&mut self, count: usize);
}

/// Column count bookkeeping shared by the builders.
#[derive(Debug, Clone)]
pub(crate) struct BuilderState {
    pub(crate) tree: Tree,
    pub(crate) columns: usize,
}

impl Default for BuilderState {
    fn default() -> Self {
        Self {
            tree: Tree::new(),
            columns: BuiltinColumn::COUNT,
        }
    }
}
