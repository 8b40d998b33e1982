use crate::session::ElementDetails;
use crate::tree::{Tree, TreeKind};
use crate::ui::app::App;
use crate::validation::{ValidationStatus, Validator};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, Borders, Gauge, List, ListItem, Paragraph, Row, Scrollbar, ScrollbarOrientation,
        ScrollbarState, Table, Tabs, Wrap,
    },
    Frame,
};

// Brandbook colors
const BRAND_DARK: Color = Color::Rgb(0x1F, 0x2F, 0x3C); // #1f2f3c
const BRAND_ACCENT: Color = Color::Rgb(0x58, 0x6B, 0x71); // #586b71
const BRAND_SELECT_BG: Color = Color::Rgb(0xC3, 0xD3, 0xE0); // #c3d3e0
const BRAND_GREEN: Color = Color::Rgb(0x82, 0x9A, 0x68); // #829a68
const BRAND_ORANGE: Color = Color::Rgb(0x9E, 0x68, 0x3C); // #9e683c
const BRAND_MUTED: Color = Color::Rgb(0x71, 0x65, 0x65); // #716565

// Styles
const HEADER_STYLE: Style = Style::new().fg(BRAND_DARK).add_modifier(Modifier::BOLD);
const CURSOR_STYLE: Style = Style::new()
    .bg(BRAND_SELECT_BG)
    .fg(BRAND_DARK)
    .add_modifier(Modifier::BOLD);
const SELECTED_STYLE: Style = Style::new().fg(BRAND_ORANGE).add_modifier(Modifier::BOLD);
const COUNT_COLOR: Color = BRAND_GREEN;
const FAILED_COLOR: Color = BRAND_ORANGE;

pub fn draw_trees(frame: &mut Frame, app: &App) {
    let chunks = Layout::vertical([
        Constraint::Length(3), // Header
        Constraint::Length(3), // Tabs
        Constraint::Min(10),   // Tree + details
        Constraint::Length(3), // Footer
    ])
    .split(frame.area());

    draw_header(frame, chunks[0], app);
    draw_tabs(frame, chunks[1], app);

    let main = Layout::horizontal([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(chunks[2]);
    draw_tree_table(frame, main[0], app);
    draw_details(frame, main[1], app);

    draw_footer(
        frame,
        chunks[3],
        app,
        " ←→ View | ↑↓ Move | Enter Fold | Space Select | a All | c Clear | v Validate | r Results | p Psets | q Quit ",
    );
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
    let session = &app.session;
    if let Some((current, progress)) = session.load_progress() {
        let label = current.map_or_else(
            || "Loading...".to_string(),
            |path| format!("Loading {}", path.display()),
        );
        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title(" IFC Workbench "))
            .gauge_style(Style::default().fg(BRAND_GREEN))
            .percent(u16::from(progress.min(100)))
            .label(label);
        frame.render_widget(gauge, area);
        return;
    }

    let project = session
        .registry()
        .iter()
        .next()
        .and_then(|f| f.model().project())
        .and_then(|p| p.name().map(str::to_string))
        .unwrap_or_else(|| "-".to_string());
    let title = format!(
        " IFC Workbench | {} | {} files | {} elements | {} classes ",
        project,
        session.registry().count(),
        session.element_count(),
        session.class_count()
    );

    let header = Paragraph::new(title)
        .style(HEADER_STYLE)
        .block(Block::default().borders(Borders::ALL));

    frame.render_widget(header, area);
}

fn draw_tabs(frame: &mut Frame, area: Rect, app: &App) {
    let titles: Vec<Line> = TreeKind::ALL
        .iter()
        .map(|kind| {
            let selected = app.session.selection().selected(kind.index()).len();
            if selected > 0 {
                Line::from(vec![
                    Span::raw(format!("{kind} ")),
                    Span::styled(format!("[{selected}]"), Style::default().fg(COUNT_COLOR)),
                ])
            } else {
                Line::from(kind.to_string())
            }
        })
        .collect();

    let tabs = Tabs::new(titles)
        .select(app.tab.index())
        .highlight_style(CURSOR_STYLE)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(tabs, area);
}

fn draw_tree_table(frame: &mut Frame, area: Rect, app: &App) {
    let session = &app.session;
    let tree = session.tree(app.tab);
    let ctx = session.cell_context();
    let columns = session.columns().visible_columns();
    let rows_data = app.rows();
    let cursor = app.cursor();

    // Borders and header
    let visible_rows = (area.height as usize).saturating_sub(3);
    let scroll_offset = if cursor >= visible_rows {
        cursor - visible_rows + 1
    } else {
        0
    };

    let header = Row::new(
        columns
            .iter()
            .map(|&c| session.columns().header(c).unwrap_or_default())
            .collect::<Vec<_>>(),
    )
    .style(HEADER_STYLE)
    .height(1);

    let rows: Vec<Row> = rows_data
        .iter()
        .enumerate()
        .skip(scroll_offset)
        .take(visible_rows)
        .map(|(i, &(node, level))| {
            let folded = app.collapsed[app.tab.index()].contains(&node);
            let marker = if tree.children(node).is_empty() {
                "  "
            } else if folded {
                "▸ "
            } else {
                "▾ "
            };
            let cells: Vec<String> = columns
                .iter()
                .enumerate()
                .map(|(position, &column)| {
                    let value = tree.data(node, column, &ctx).unwrap_or_default();
                    if position == 0 {
                        format!("{}{marker}{value}", "  ".repeat(level))
                    } else {
                        value
                    }
                })
                .collect();

            let style = if i == cursor {
                CURSOR_STYLE
            } else if session.selection().is_selected(app.tab.index(), node) {
                SELECTED_STYLE
            } else if tree.element(node).is_none() {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Row::new(cells).style(style)
        })
        .collect();

    let widths: Vec<Constraint> = columns
        .iter()
        .enumerate()
        .map(|(position, _)| {
            if position == 0 {
                Constraint::Min(30)
            } else {
                Constraint::Min(12)
            }
        })
        .collect();

    let title = format!(" {} ({} rows) ", app.tab, rows_data.len());
    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(BRAND_ORANGE)),
    );
    frame.render_widget(table, area);

    if rows_data.len() > visible_rows && area.height > 3 {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("↑"))
            .end_symbol(Some("↓"));
        let mut scrollbar_state = ScrollbarState::new(rows_data.len()).position(cursor);

        let scrollbar_area = Rect {
            x: area.x + area.width - 1,
            y: area.y + 2,
            width: 1,
            height: area.height - 3,
        };
        frame.render_stateful_widget(scrollbar, scrollbar_area, &mut scrollbar_state);
    }
}

fn draw_details(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().title(" Details ").borders(Borders::ALL);
    let Some(details) = app
        .current_guid()
        .and_then(|guid| app.session.element_details(&guid))
    else {
        let hint = Paragraph::new("Move to an element to see its data")
            .style(Style::default().fg(BRAND_MUTED))
            .block(block);
        frame.render_widget(hint, area);
        return;
    };

    let paragraph = Paragraph::new(detail_lines(&details))
        .wrap(Wrap { trim: false })
        .block(block);
    frame.render_widget(paragraph, area);
}

fn detail_lines(details: &ElementDetails) -> Vec<Line<'_>> {
    let mut lines = vec![
        Line::from(Span::styled(details.class.clone(), HEADER_STYLE)),
        field("GlobalId", &details.guid),
        field("Name", details.name.as_deref().unwrap_or("-")),
        field("Container", details.container.as_deref().unwrap_or("-")),
    ];
    if details.local_ids.len() > 1 {
        let ids: Vec<String> = details.local_ids.iter().map(u64::to_string).collect();
        lines.push(Line::from(Span::styled(
            format!("IDs differ between files: {}", ids.join(", ")),
            Style::default().fg(FAILED_COLOR),
        )));
    }

    section(&mut lines, "Files");
    for source in &details.sources {
        lines.push(Line::from(format!("  {} #{}", source.filename, source.id)));
    }

    section(&mut lines, "Attributes");
    for (name, value) in &details.attributes {
        lines.push(field(name, value));
    }

    for (set, properties) in &details.property_sets {
        section(&mut lines, set);
        for (name, value) in properties {
            lines.push(field(name, value));
        }
    }

    if !details.validation.failed.is_empty() || !details.validation.passed.is_empty() {
        section(&mut lines, "Validation");
        for record in &details.validation.failed {
            let mut text = format!("  ✗ {}: {}", record.specification, record.requirement);
            if let Some(reason) = &record.reason {
                text.push_str(&format!(" ({reason})"));
            }
            lines.push(Line::from(Span::styled(text, Style::default().fg(FAILED_COLOR))));
        }
        for record in &details.validation.passed {
            lines.push(Line::from(Span::styled(
                format!("  ✓ {}: {}", record.specification, record.requirement),
                Style::default().fg(COUNT_COLOR),
            )));
        }
    }
    lines
}

fn field<'a>(name: &str, value: &str) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("  {name}: "), Style::default().fg(BRAND_MUTED)),
        Span::raw(value.to_string()),
    ])
}

fn section(lines: &mut Vec<Line<'_>>, title: &str) {
    lines.push(Line::from(Span::styled(
        format!("── {title} ──"),
        Style::default()
            .fg(BRAND_MUTED)
            .add_modifier(Modifier::ITALIC),
    )));
}

fn draw_footer(frame: &mut Frame, area: Rect, app: &App, help: &str) {
    let text = if app.status.is_empty() {
        Line::from(Span::styled(help.to_string(), Style::default().fg(BRAND_MUTED)))
    } else {
        Line::from(vec![
            Span::styled(format!(" {} ", app.status), Style::default().fg(BRAND_ACCENT)),
            Span::styled("|", Style::default().fg(BRAND_MUTED)),
            Span::styled(help.to_string(), Style::default().fg(BRAND_MUTED)),
        ])
    };
    let footer = Paragraph::new(text).block(Block::default().borders(Borders::ALL));

    frame.render_widget(footer, area);
}

pub fn draw_validation(frame: &mut Frame, app: &App) {
    let chunks = Layout::vertical([
        Constraint::Length(3), // Header
        Constraint::Min(6),    // Validators
        Constraint::Length(3), // Footer
    ])
    .split(frame.area());

    draw_header(frame, chunks[0], app);

    let validation = app.session.validation();
    let mut items: Vec<ListItem> = Vec::new();
    for validator in validation.validators() {
        let kind = match validator {
            Validator::Ids(_) => "IDS",
            Validator::Integrity(_) => "Integrity",
        };
        let status = match validation.status(validator.id()) {
            ValidationStatus::Idle => Span::styled("not run", Style::default().fg(BRAND_MUTED)),
            ValidationStatus::Validated => {
                Span::styled("validated", Style::default().fg(COUNT_COLOR))
            }
        };
        items.push(ListItem::new(Line::from(vec![
            Span::styled(validator.title().to_string(), HEADER_STYLE),
            Span::styled(format!(" [{kind}] "), Style::default().fg(BRAND_MUTED)),
            status,
        ])));

        for spec in validation.summary(validator.id()) {
            let color = if spec.failed > 0 { FAILED_COLOR } else { COUNT_COLOR };
            items.push(ListItem::new(Line::from(vec![
                Span::raw(format!("  {} ", spec.name)),
                Span::styled(spec.text(), Style::default().fg(color)),
            ])));
            for requirement in &spec.requirements {
                items.push(ListItem::new(Line::from(Span::styled(
                    format!(
                        "    {} ({} failed, {} passed)",
                        requirement.description, requirement.failed, requirement.passed
                    ),
                    Style::default().fg(BRAND_MUTED),
                ))));
            }
        }
    }

    let list = List::new(items).block(
        Block::default()
            .title(" Validation ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(BRAND_ORANGE)),
    );
    frame.render_widget(list, chunks[1]);

    draw_footer(frame, chunks[2], app, " v Validate | Esc Back | q Quit ");
}

pub fn draw_property_sets(frame: &mut Frame, app: &App) {
    let chunks = Layout::vertical([
        Constraint::Length(3), // Header
        Constraint::Min(6),    // Summary
        Constraint::Length(3), // Footer
    ])
    .split(frame.area());

    draw_header(frame, chunks[0], app);

    let tree = app.session.psets().tree();
    let ctx = app.session.cell_context();
    let rows_data = tree.walk(Tree::ROOT);
    let visible_rows = (chunks[1].height as usize).saturating_sub(3);
    let scroll_offset = if app.psets_cursor >= visible_rows {
        app.psets_cursor - visible_rows + 1
    } else {
        0
    };

    let header = Row::new(crate::tree::PsetSummary::HEADERS.to_vec())
        .style(HEADER_STYLE)
        .height(1);
    let rows: Vec<Row> = rows_data
        .iter()
        .enumerate()
        .skip(scroll_offset)
        .take(visible_rows)
        .map(|(i, &(node, level))| {
            let name = tree.data(node, 0, &ctx).unwrap_or_default();
            let count = tree.data(node, 1, &ctx).unwrap_or_default();
            let style = if i == app.psets_cursor {
                CURSOR_STYLE
            } else {
                Style::default()
            };
            Row::new(vec![format!("{}{name}", "  ".repeat(level)), count]).style(style)
        })
        .collect();

    let widths = [Constraint::Percentage(80), Constraint::Percentage(20)];
    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .title(" Property sets ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(BRAND_ORANGE)),
    );
    frame.render_widget(table, chunks[1]);

    draw_footer(frame, chunks[2], app, " ↑↓ Move | Esc Back | q Quit ");
}
