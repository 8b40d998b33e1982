use crate::session::Session;
use crate::sync::SyncOutcome;
use crate::tree::{NodeId, Tree, TreeKind};
use color_eyre::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{DefaultTerminal, Frame};
use std::collections::HashSet;
use std::time::{Duration, Instant};

const TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum View {
    Trees,
    Validation,
    PropertySets,
}

/// Work deferred until the first load is done.
#[derive(Debug, Clone, Default)]
pub struct AfterLoad {
    /// `Set:Member` pairs resolved against the loaded files.
    pub columns: Vec<(String, String)>,
    pub validate: bool,
}

pub struct App {
    pub session: Session,
    pub after_load: Option<AfterLoad>,
    pub view: View,
    pub tab: TreeKind,
    pub cursors: [usize; 4],
    pub collapsed: [HashSet<NodeId>; 4],
    pub psets_cursor: usize,
    pub status: String,
    pub should_quit: bool,
}

impl App {
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            session,
            after_load: None,
            view: View::Trees,
            tab: TreeKind::Location,
            cursors: [0; 4],
            collapsed: Default::default(),
            psets_cursor: 0,
            status: String::new(),
            should_quit: false,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    #[must_use]
    pub fn with_after_load(mut self, after_load: AfterLoad) -> Self {
        self.after_load = Some(after_load);
        self
    }

    pub fn run(mut self, mut terminal: DefaultTerminal) -> Result<()> {
        while !self.should_quit {
            self.tick();
            terminal.draw(|frame| self.draw(frame))?;
            self.handle_events()?;
        }
        Ok(())
    }

    /// Picks up background work: finished loads and debounced columns.
    fn tick(&mut self) {
        if let Some(summary) = self.session.poll_load() {
            self.status = summary.message();
            if let Some(after_load) = self.after_load.take() {
                self.apply_after_load(after_load);
            }
            self.clamp_cursors();
        }
        self.session.poll_columns(Instant::now());
    }

    fn draw(&self, frame: &mut Frame) {
        match self.view {
            View::Trees => super::dashboard::draw_trees(frame, self),
            View::Validation => super::dashboard::draw_validation(frame, self),
            View::PropertySets => super::dashboard::draw_property_sets(frame, self),
        }
    }

    fn handle_events(&mut self) -> Result<()> {
        // Poll so a running load keeps the screen moving
        if !event::poll(TICK)? {
            return Ok(());
        }
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                return Ok(());
            }

            match self.view {
                View::Trees => self.handle_tree_keys(key.code),
                View::Validation | View::PropertySets => self.handle_overlay_keys(key.code),
            }
        }
        Ok(())
    }

    fn handle_tree_keys(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1),
            KeyCode::PageUp => self.move_cursor(-20),
            KeyCode::PageDown => self.move_cursor(20),
            KeyCode::Left | KeyCode::BackTab | KeyCode::Char('h') => self.previous_tab(),
            KeyCode::Right | KeyCode::Tab | KeyCode::Char('l') => self.next_tab(),
            KeyCode::Enter => self.toggle_collapsed(),
            KeyCode::Char(' ') => self.toggle_selection(),
            KeyCode::Char('a') => self.select_all(),
            KeyCode::Char('c') => self.clear_selection(),
            KeyCode::Char('v') => self.validate(),
            KeyCode::Char('x') => self.stop_load(),
            KeyCode::Char('r') => self.view = View::Validation,
            KeyCode::Char('p') => self.view = View::PropertySets,
            _ => {}
        }
    }

    fn handle_overlay_keys(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc | KeyCode::Backspace => self.view = View::Trees,
            KeyCode::Up | KeyCode::Char('k') if self.view == View::PropertySets => {
                self.psets_cursor = self.psets_cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') if self.view == View::PropertySets => {
                let max = self.session.psets().tree().walk(Tree::ROOT).len();
                if self.psets_cursor + 1 < max {
                    self.psets_cursor += 1;
                }
            }
            KeyCode::Char('v') => self.validate(),
            _ => {}
        }
    }

    fn apply_after_load(&mut self, after_load: AfterLoad) {
        if !after_load.columns.is_empty() {
            let columns = after_load
                .columns
                .iter()
                .map(|(set, member)| self.session.resolve_column(set, member))
                .collect();
            self.session.set_columns(columns);
        }
        if after_load.validate {
            let ran = self.session.validate(None);
            self.status.push_str(&format!(", {ran} validator(s) run"));
        }
    }

    /// Rows of the active view, skipping collapsed subtrees.
    #[must_use]
    pub fn rows(&self) -> Vec<(NodeId, usize)> {
        visible_rows(
            self.session.tree(self.tab),
            &self.collapsed[self.tab.index()],
        )
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursors[self.tab.index()]
    }

    /// Node under the cursor of the active view.
    #[must_use]
    pub fn current_node(&self) -> Option<NodeId> {
        self.rows().get(self.cursor()).map(|(node, _)| *node)
    }

    /// Global id of the element under the cursor, if it is one.
    #[must_use]
    pub fn current_guid(&self) -> Option<String> {
        let node = self.current_node()?;
        self.session
            .tree(self.tab)
            .element(node)
            .map(|e| e.guid.clone())
    }

    fn move_cursor(&mut self, delta: isize) {
        let count = self.rows().len();
        if count == 0 {
            return;
        }
        let cursor = &mut self.cursors[self.tab.index()];
        *cursor = cursor.saturating_add_signed(delta).min(count - 1);
    }

    fn next_tab(&mut self) {
        let next = (self.tab.index() + 1) % TreeKind::ALL.len();
        self.tab = TreeKind::ALL[next];
    }

    fn previous_tab(&mut self) {
        let count = TreeKind::ALL.len();
        let previous = (self.tab.index() + count - 1) % count;
        self.tab = TreeKind::ALL[previous];
    }

    fn toggle_collapsed(&mut self) {
        let Some(node) = self.current_node() else {
            return;
        };
        if self.session.tree(self.tab).children(node).is_empty() {
            return;
        }
        let collapsed = &mut self.collapsed[self.tab.index()];
        if !collapsed.remove(&node) {
            collapsed.insert(node);
        }
        self.clamp_cursors();
    }

    fn toggle_selection(&mut self) {
        let Some(node) = self.current_node() else {
            return;
        };
        let tree = self.session.tree(self.tab);
        let outcome = if tree.element(node).is_some() {
            let selected = !self.session.selection().is_selected(self.tab.index(), node);
            self.session.select(self.tab, node, selected)
        } else {
            // A group selects the elements below it
            let nodes: Vec<NodeId> = tree
                .walk(node)
                .into_iter()
                .filter(|(n, _)| tree.element(*n).is_some())
                .map(|(n, _)| n)
                .collect();
            self.session.select_nodes(self.tab, nodes)
        };
        self.report_selection(outcome);
    }

    fn select_all(&mut self) {
        let outcome = self.session.select_all(self.tab);
        self.report_selection(outcome);
    }

    fn clear_selection(&mut self) {
        self.session.select_nodes(self.tab, Vec::new());
        self.status = "Selection cleared".to_string();
    }

    fn report_selection(&mut self, outcome: SyncOutcome) {
        self.status = match outcome {
            SyncOutcome::Synced { mirrored } => {
                let own = self.session.selection().selected(self.tab.index()).len();
                format!("{own} selected in {}, {mirrored} mirrored", self.tab)
            }
            SyncOutcome::ShowAggregate => "Every element selected".to_string(),
        };
    }

    fn validate(&mut self) {
        if self.session.is_loading() {
            self.status = "Wait for the load to finish before validating".to_string();
            return;
        }
        let ran = self.session.validate(None);
        self.status = format!("{ran} validator(s) run");
    }

    fn stop_load(&mut self) {
        if self.session.is_loading() {
            self.session.stop_load();
            self.status = "Stopping after the current file".to_string();
        }
    }

    fn clamp_cursors(&mut self) {
        for kind in TreeKind::ALL {
            let count = visible_rows(self.session.tree(kind), &self.collapsed[kind.index()]).len();
            let cursor = &mut self.cursors[kind.index()];
            *cursor = (*cursor).min(count.saturating_sub(1));
        }
    }
}

/// Nodes in document order with their depth, not descending into
/// `collapsed` nodes.
#[must_use]
pub fn visible_rows(tree: &Tree, collapsed: &HashSet<NodeId>) -> Vec<(NodeId, usize)> {
    let mut rows = Vec::new();
    push_rows(tree, Tree::ROOT, 0, collapsed, &mut rows);
    rows
}

fn push_rows(
    tree: &Tree,
    id: NodeId,
    level: usize,
    collapsed: &HashSet<NodeId>,
    rows: &mut Vec<(NodeId, usize)>,
) {
    for &child in tree.children(id) {
        rows.push((child, level));
        if !collapsed.contains(&child) {
            push_rows(tree, child, level + 1, collapsed, rows);
        }
    }
}
