//! Built-in and user selected columns shared by every tree.

use crate::parser::SetKind;
use std::collections::BTreeSet;
use std::cmp::Ordering;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default delay before a burst of toggles is published.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);

/// Fixed columns, in display order. They can be hidden but never moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinColumn {
    Class,
    Id,
    Name,
    Guid,
    Tag,
    ObjectType,
    Description,
    Filenames,
    Container,
    Validation,
}

impl BuiltinColumn {
    pub const ALL: [BuiltinColumn; 10] = [
        BuiltinColumn::Class,
        BuiltinColumn::Id,
        BuiltinColumn::Name,
        BuiltinColumn::Guid,
        BuiltinColumn::Tag,
        BuiltinColumn::ObjectType,
        BuiltinColumn::Description,
        BuiltinColumn::Filenames,
        BuiltinColumn::Container,
        BuiltinColumn::Validation,
    ];

    pub const COUNT: usize = Self::ALL.len();

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            BuiltinColumn::Class => "Class",
            BuiltinColumn::Id => "IFC ID",
            BuiltinColumn::Name => "Name",
            BuiltinColumn::Guid => "GUID",
            BuiltinColumn::Tag => "Tag",
            BuiltinColumn::ObjectType => "Object Type",
            BuiltinColumn::Description => "Description",
            BuiltinColumn::Filenames => "Files",
            BuiltinColumn::Container => "Container",
            BuiltinColumn::Validation => "Validation",
        }
    }
}

/// A column showing one property or quantity of every element.
///
/// Ordered by set name, then member name; the kind only separates a
/// property set and a quantity set sharing a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DynamicColumn {
    pub kind: SetKind,
    pub set: String,
    pub member: String,
}

impl DynamicColumn {
    #[must_use]
    pub fn new(kind: SetKind, set: &str, member: &str) -> Self {
        Self {
            kind,
            set: set.to_string(),
            member: member.to_string(),
        }
    }
}

impl Ord for DynamicColumn {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.set, &self.member, self.kind).cmp(&(&other.set, &other.member, other.kind))
    }
}

impl PartialOrd for DynamicColumn {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for DynamicColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.set, self.member)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnDescriptor<'a> {
    Builtin(BuiltinColumn),
    Dynamic(&'a DynamicColumn),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnEvent {
    /// The dynamic column list was rebuilt; trees must resize to `count` columns.
    DynamicColumnsChanged { count: usize },
    BuiltinVisibilityChanged { column: BuiltinColumn, hidden: bool },
}

type Listener = Box<dyn FnMut(&ColumnEvent) + Send>;

/// Ordered column state of one session.
///
/// Dynamic columns are kept sorted by set name, then member name.
/// Toggles only mark the list dirty; the published list is rebuilt from
/// scratch once the debounce delay passes or on [`ColumnRegistry::flush`].
pub struct ColumnRegistry {
    hidden: [bool; BuiltinColumn::COUNT],
    selected: BTreeSet<DynamicColumn>,
    ordered: Vec<DynamicColumn>,
    pending_since: Option<Instant>,
    debounce: Duration,
    listeners: Vec<Listener>,
}

impl fmt::Debug for ColumnRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnRegistry")
            .field("hidden", &self.hidden)
            .field("ordered", &self.ordered)
            .field("pending", &self.pending_since.is_some())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for ColumnRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ColumnRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::with_debounce(DEFAULT_DEBOUNCE)
    }

    #[must_use]
    pub fn with_debounce(debounce: Duration) -> Self {
        let mut hidden = [false; BuiltinColumn::COUNT];
        hidden[BuiltinColumn::Validation.index()] = true;
        Self {
            hidden,
            selected: BTreeSet::new(),
            ordered: Vec::new(),
            pending_since: None,
            debounce,
            listeners: Vec::new(),
        }
    }

    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&ColumnEvent) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Adds or removes a dynamic column. Returns whether the selection changed.
    ///
    /// The change is published later by [`Self::poll`] or [`Self::flush`].
    pub fn toggle(&mut self, kind: SetKind, set: &str, member: &str, checked: bool) -> bool {
        let column = DynamicColumn::new(kind, set, member);
        let changed = if checked {
            self.selected.insert(column)
        } else {
            self.selected.remove(&column)
        };
        if changed {
            self.pending_since = Some(Instant::now());
        }
        changed
    }

    /// Replaces the whole selection.
    pub fn set_selection<I: IntoIterator<Item = DynamicColumn>>(&mut self, columns: I) {
        let selected: BTreeSet<DynamicColumn> = columns.into_iter().collect();
        if selected != self.selected {
            self.selected = selected;
            self.pending_since = Some(Instant::now());
        }
    }

    #[must_use]
    pub fn is_selected(&self, kind: SetKind, set: &str, member: &str) -> bool {
        self.selected.contains(&DynamicColumn::new(kind, set, member))
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending_since.is_some()
    }

    /// Publishes pending toggles once the debounce delay has passed since
    /// the last toggle. Returns true if an event was emitted.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.pending_since {
            Some(since) if now.saturating_duration_since(since) >= self.debounce => self.publish(),
            _ => false,
        }
    }

    /// Publishes pending toggles immediately.
    pub fn flush(&mut self) -> bool {
        if self.pending_since.is_some() {
            self.publish()
        } else {
            false
        }
    }

    fn publish(&mut self) -> bool {
        self.pending_since = None;
        let ordered: Vec<DynamicColumn> = self.selected.iter().cloned().collect();
        if ordered == self.ordered {
            return false;
        }
        self.ordered = ordered;
        let event = ColumnEvent::DynamicColumnsChanged {
            count: self.column_count(),
        };
        debug!(columns = self.ordered.len(), "dynamic columns rebuilt");
        self.emit(&event);
        true
    }

    fn emit(&mut self, event: &ColumnEvent) {
        for listener in &mut self.listeners {
            listener(event);
        }
    }

    /// Hides or shows a fixed column. Emitted right away, without debounce.
    pub fn hide_builtin(&mut self, column: BuiltinColumn, hidden: bool) {
        if self.hidden[column.index()] == hidden {
            return;
        }
        self.hidden[column.index()] = hidden;
        self.emit(&ColumnEvent::BuiltinVisibilityChanged { column, hidden });
    }

    /// Whether a column is hidden. Dynamic columns are always shown.
    #[must_use]
    pub fn is_hidden(&self, index: usize) -> bool {
        self.hidden.get(index).copied().unwrap_or(false)
    }

    /// Drops all dynamic columns and restores default visibility.
    pub fn reset(&mut self) {
        let listeners = std::mem::take(&mut self.listeners);
        *self = Self {
            listeners,
            ..Self::with_debounce(self.debounce)
        };
        let event = ColumnEvent::DynamicColumnsChanged {
            count: self.column_count(),
        };
        self.emit(&event);
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        BuiltinColumn::COUNT + self.ordered.len()
    }

    #[must_use]
    pub fn dynamic_columns(&self) -> &[DynamicColumn] {
        &self.ordered
    }

    #[must_use]
    pub fn descriptor(&self, index: usize) -> Option<ColumnDescriptor<'_>> {
        match BuiltinColumn::from_index(index) {
            Some(builtin) => Some(ColumnDescriptor::Builtin(builtin)),
            None => self
                .ordered
                .get(index - BuiltinColumn::COUNT)
                .map(ColumnDescriptor::Dynamic),
        }
    }

    #[must_use]
    pub fn index_of(&self, descriptor: ColumnDescriptor<'_>) -> Option<usize> {
        match descriptor {
            ColumnDescriptor::Builtin(builtin) => Some(builtin.index()),
            ColumnDescriptor::Dynamic(dynamic) => self
                .ordered
                .iter()
                .position(|c| c == dynamic)
                .map(|i| i + BuiltinColumn::COUNT),
        }
    }

    #[must_use]
    pub fn header(&self, index: usize) -> Option<String> {
        match self.descriptor(index)? {
            ColumnDescriptor::Builtin(builtin) => Some(builtin.title().to_string()),
            ColumnDescriptor::Dynamic(dynamic) => Some(dynamic.to_string()),
        }
    }

    /// Indices of the columns currently shown.
    #[must_use]
    pub fn visible_columns(&self) -> Vec<usize> {
        (0..self.column_count())
            .filter(|&i| !self.is_hidden(i))
            .collect()
    }
}
