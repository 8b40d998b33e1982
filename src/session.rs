//! One open project: files, views, columns, validation and selection.

use crate::error::RegistryError;
use crate::loader::{self, LoadEvent, LoadHandle, LoadSummary};
use crate::model::ProjectRegistry;
use crate::parser::{PropertySets, SetIndex, SetKind};
use crate::sync::{SelectionSynchronizer, SyncOutcome};
use crate::tree::{
    BuiltinColumn, CellContext, ClassTree, ColumnRegistry, CustomField, CustomTree, DynamicColumn,
    FileRef, FlatTree, LocationTree, NodeId, PsetSummary, Tree, TreeBuilder, TreeKind,
};
use crate::validation::{ElementValidation, ValidationAggregator};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::time::Instant;
use tracing::{debug, info, warn};

/// The four views of a session.
#[derive(Debug, Clone, Default)]
pub struct Views {
    pub location: LocationTree,
    pub class: ClassTree,
    pub flat: FlatTree,
    pub custom: CustomTree,
}

impl Views {
    #[must_use]
    pub fn builder(&self, kind: TreeKind) -> &dyn TreeBuilder {
        match kind {
            TreeKind::Location => &self.location,
            TreeKind::Class => &self.class,
            TreeKind::Flat => &self.flat,
            TreeKind::Custom => &self.custom,
        }
    }

    fn builders_mut(&mut self) -> [&mut dyn TreeBuilder; 4] {
        [
            &mut self.location,
            &mut self.class,
            &mut self.flat,
            &mut self.custom,
        ]
    }

    /// Trees in [`TreeKind::ALL`] order.
    #[must_use]
    pub fn trees(&self) -> [&Tree; 4] {
        [
            self.location.tree(),
            self.class.tree(),
            self.flat.tree(),
            self.custom.tree(),
        ]
    }
}

/// Everything known about one element, for the details pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementDetails {
    pub guid: String,
    pub class: String,
    pub name: Option<String>,
    pub sources: Vec<FileRef>,
    /// Distinct local ids; more than one when files disagree.
    pub local_ids: Vec<u64>,
    pub container: Option<String>,
    pub attributes: BTreeMap<String, String>,
    pub property_sets: PropertySets,
    pub validation: ElementValidation,
}

#[derive(Debug)]
struct PendingLoad {
    handle: LoadHandle,
    current: Option<PathBuf>,
    progress: u8,
}

/// State of one open project, shared with every view by reference.
#[derive(Debug)]
pub struct Session {
    registry: ProjectRegistry,
    columns: ColumnRegistry,
    views: Views,
    psets: PsetSummary,
    validation: ValidationAggregator,
    selection: SelectionSynchronizer,
    pset_index: SetIndex,
    qset_index: SetIndex,
    load: Option<PendingLoad>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(vec![CustomField::Class, CustomField::ObjectType])
    }
}

impl Session {
    #[must_use]
    pub fn new(custom: Vec<CustomField>) -> Self {
        Self {
            registry: ProjectRegistry::new(),
            columns: ColumnRegistry::new(),
            views: Views {
                custom: CustomTree::new(custom),
                ..Views::default()
            },
            psets: PsetSummary::new(),
            validation: ValidationAggregator::new(),
            selection: SelectionSynchronizer::new(TreeKind::ALL.len()),
            pset_index: SetIndex::new(),
            qset_index: SetIndex::new(),
            load: None,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &ProjectRegistry {
        &self.registry
    }

    #[must_use]
    pub fn columns(&self) -> &ColumnRegistry {
        &self.columns
    }

    #[must_use]
    pub fn views(&self) -> &Views {
        &self.views
    }

    #[must_use]
    pub fn tree(&self, kind: TreeKind) -> &Tree {
        self.views.builder(kind).tree()
    }

    #[must_use]
    pub fn psets(&self) -> &PsetSummary {
        &self.psets
    }

    #[must_use]
    pub fn validation(&self) -> &ValidationAggregator {
        &self.validation
    }

    pub fn validation_mut(&mut self) -> &mut ValidationAggregator {
        &mut self.validation
    }

    #[must_use]
    pub fn selection(&self) -> &SelectionSynchronizer {
        &self.selection
    }

    #[must_use]
    pub fn cell_context(&self) -> CellContext<'_> {
        CellContext::new(&self.registry, &self.columns).with_validation(&self.validation)
    }

    /// Distinct elements across all files.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.views.flat.element_count()
    }

    #[must_use]
    pub fn class_count(&self) -> usize {
        self.views.class.class_count()
    }

    // Loading

    /// Loads files on the calling thread.
    pub fn add_files(&mut self, paths: &[PathBuf]) -> LoadSummary {
        if self.is_loading() {
            return busy_summary(paths);
        }
        let stop = AtomicBool::new(false);
        let mut registry = std::mem::take(&mut self.registry);
        let summary = loader::load_files(&mut registry, paths, &stop, None);
        self.apply_load(registry, &summary.added);
        summary
    }

    /// Starts a background load. Returns false if one is already running.
    pub fn start_load(&mut self, paths: Vec<PathBuf>) -> bool {
        if self.is_loading() {
            warn!("a load is already running");
            return false;
        }
        let registry = std::mem::take(&mut self.registry);
        self.load = Some(PendingLoad {
            handle: loader::spawn_load(registry, paths),
            current: None,
            progress: 0,
        });
        true
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.load.is_some()
    }

    /// File being parsed and percentage done of a running load.
    #[must_use]
    pub fn load_progress(&self) -> Option<(Option<&PathBuf>, u8)> {
        self.load.as_ref().map(|l| (l.current.as_ref(), l.progress))
    }

    pub fn stop_load(&self) {
        if let Some(load) = &self.load {
            load.handle.stop();
        }
    }

    /// Handles pending load events. Returns the summary once the load is done.
    pub fn poll_load(&mut self) -> Option<LoadSummary> {
        let mut finished = None;
        {
            let pending = self.load.as_mut()?;
            while let Some(event) = pending.handle.try_next() {
                match event {
                    LoadEvent::Started(path) => pending.current = Some(path),
                    LoadEvent::Progress(percent) => pending.progress = percent,
                    LoadEvent::Failed { path, error } => {
                        debug!(path = %path.display(), %error, "file not loaded");
                    }
                    LoadEvent::AlreadyOpen(path) => {
                        debug!(path = %path.display(), "file already open");
                    }
                    LoadEvent::Finished { registry, summary } => {
                        finished = Some((registry, summary));
                        break;
                    }
                }
            }
        }

        let (registry, summary) = finished?;
        self.load = None;
        self.apply_load(registry, &summary.added);
        Some(summary)
    }

    /// Takes back the registry of a finished load and merges the files added
    /// by it into every view.
    pub fn apply_load(&mut self, registry: ProjectRegistry, added: &[String]) {
        self.registry = registry;
        for name in added {
            let Some(file) = self.registry.file(name) else {
                continue;
            };
            for builder in self.views.builders_mut() {
                builder.add_file(file);
            }
            self.psets.add_file(file);
        }
        if !added.is_empty() {
            self.pset_index = self.registry.pset_index();
            self.qset_index = self.registry.qset_index();
            self.validation.clear_results();
            info!(
                files = self.registry.count(),
                elements = self.element_count(),
                classes = self.class_count(),
                "project updated"
            );
        }
    }

    /// Drops all files and results. Rule documents are removed too; the
    /// integrity check stays.
    pub fn close_all(&mut self) {
        self.load = None;
        self.registry = ProjectRegistry::new();
        for builder in self.views.builders_mut() {
            builder.clear();
        }
        self.psets.clear();
        self.validation.reset();
        self.selection.clear();
        self.columns.reset();
        self.sync_column_count();
        self.pset_index.clear();
        self.qset_index.clear();
        debug!("session closed");
    }

    // Columns

    /// Property and quantity members offered as columns.
    #[must_use]
    pub fn available_columns(&self) -> Vec<DynamicColumn> {
        let mut columns = Vec::new();
        for (kind, index) in [(SetKind::Property, &self.pset_index), (SetKind::Quantity, &self.qset_index)] {
            for (set, members) in index {
                for member in members {
                    columns.push(DynamicColumn::new(kind, set, member));
                }
            }
        }
        columns
    }

    /// Resolves a `Set:Member` pair against the open files.
    #[must_use]
    pub fn resolve_column(&self, set: &str, member: &str) -> DynamicColumn {
        let kind = if !self.pset_index.contains_key(set) && self.qset_index.contains_key(set) {
            SetKind::Quantity
        } else {
            SetKind::Property
        };
        DynamicColumn::new(kind, set, member)
    }

    pub fn toggle_column(&mut self, kind: SetKind, set: &str, member: &str, checked: bool) -> bool {
        self.columns.toggle(kind, set, member, checked)
    }

    /// Replaces the dynamic columns and publishes right away.
    pub fn set_columns(&mut self, columns: Vec<DynamicColumn>) {
        self.columns.set_selection(columns);
        self.flush_columns();
    }

    /// Publishes debounced column changes once due.
    pub fn poll_columns(&mut self, now: Instant) -> bool {
        let changed = self.columns.poll(now);
        if changed {
            self.sync_column_count();
        }
        changed
    }

    pub fn flush_columns(&mut self) -> bool {
        let changed = self.columns.flush();
        if changed {
            self.sync_column_count();
        }
        changed
    }

    pub fn hide_column(&mut self, column: BuiltinColumn, hidden: bool) {
        self.columns.hide_builtin(column, hidden);
    }

    fn sync_column_count(&mut self) {
        let count = self.columns.column_count();
        for builder in self.views.builders_mut() {
            builder.columns_changed(count);
        }
    }

    /// Regroups the custom view and re-adds every open file to it.
    pub fn set_custom_fields(&mut self, fields: Vec<CustomField>) {
        self.views.custom.set_fields(fields);
        for file in &self.registry {
            self.views.custom.add_file(file);
        }
    }

    // Validation

    /// Runs one validator or all of them and shows the validation column.
    pub fn validate(&mut self, id: Option<&str>) -> usize {
        if self.is_loading() {
            warn!("validation skipped while loading");
            return 0;
        }
        let ran = self
            .validation
            .validate(id, &self.registry, self.views.location.tree());
        if ran > 0 {
            self.columns.hide_builtin(BuiltinColumn::Validation, false);
        }
        ran
    }

    // Selection

    /// Selects or deselects a node of one view and mirrors it into the others.
    pub fn select(&mut self, kind: TreeKind, node: NodeId, selected: bool) -> SyncOutcome {
        let total = self.views.flat.element_count();
        self.selection
            .set_selected(&self.views.trees(), kind.index(), node, selected, total)
    }

    /// Replaces the selection of one view.
    pub fn select_nodes(&mut self, kind: TreeKind, nodes: Vec<NodeId>) -> SyncOutcome {
        let total = self.views.flat.element_count();
        self.selection
            .replace_selection(&self.views.trees(), kind.index(), nodes, total)
    }

    /// Selects every element node of one view.
    pub fn select_all(&mut self, kind: TreeKind) -> SyncOutcome {
        let tree = self.tree(kind);
        let nodes: Vec<NodeId> = tree
            .walk(Tree::ROOT)
            .into_iter()
            .filter(|(n, _)| tree.element(*n).is_some())
            .map(|(n, _)| n)
            .collect();
        self.select_nodes(kind, nodes)
    }

    /// Selects an element by global id in the first view that has it.
    pub fn select_by_guid(&mut self, guid: &str) -> Option<SyncOutcome> {
        let (kind, node) = TreeKind::ALL
            .iter()
            .find_map(|&k| self.tree(k).find_by_guid(Tree::ROOT, guid).map(|n| (k, n)))?;
        Some(self.select_nodes(kind, vec![node]))
    }

    /// Selects the first element carrying `tag`.
    pub fn select_by_tag(&mut self, tag: &str) -> Option<SyncOutcome> {
        let ctx = CellContext::new(&self.registry, &self.columns);
        let (kind, node) = TreeKind::ALL.iter().find_map(|&k| {
            self.views
                .builder(k)
                .tree()
                .find_by_tag(Tree::ROOT, tag, &ctx)
                .map(|n| (k, n))
        })?;
        Some(self.select_nodes(kind, vec![node]))
    }

    /// Selects an element by its numeric id in one file.
    pub fn select_by_id(&mut self, filename: &str, id: u64) -> Option<SyncOutcome> {
        let guid = self
            .registry
            .get_by_local_id(filename, id)?
            .global_id()?
            .to_string();
        self.select_by_guid(&guid)
    }

    // Details

    /// Details of an element, from the first file it was seen in.
    #[must_use]
    pub fn element_details(&self, guid: &str) -> Option<ElementDetails> {
        let element = [TreeKind::Flat, TreeKind::Location]
            .iter()
            .find_map(|&k| {
                let tree = self.tree(k);
                tree.find_by_guid(Tree::ROOT, guid).and_then(|n| tree.element(n))
            })?;
        let first = element.first_file();
        let entity = self.registry.get_by_local_id(&first.filename, first.id)?;
        let filenames = element.filenames();

        Some(ElementDetails {
            guid: element.guid.clone(),
            class: element.class.clone(),
            name: entity.name().map(str::to_string),
            sources: element.sources().to_vec(),
            local_ids: element.local_ids(),
            container: entity
                .container()
                .map(|c| c.name().map_or_else(|| c.class(), str::to_string)),
            attributes: entity.attributes(),
            property_sets: entity.property_sets(),
            validation: self.validation.results_for_element(guid, &filenames),
        })
    }
}

fn busy_summary(paths: &[PathBuf]) -> LoadSummary {
    LoadSummary {
        failed: paths
            .iter()
            .map(|p| (p.clone(), RegistryError::LoadRunning { path: p.clone() }))
            .collect(),
        ..LoadSummary::default()
    }
}
