//! Terminal rendering
//!
//! Document state comes from the session [`Snapshot`]; cursor, selection and
//! popups come from [`App`]. Nothing here mutates either.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use mdreview_core::{
    Annotation, App, Focus, InputTarget, Mode, SegmentationMode, SelectionKind, SessionState,
    Snapshot, Summary, Target, Unit, UnitKind,
};

// Catppuccin Mocha colors
const SURFACE0: Color = Color::Rgb(49, 50, 68);
const SURFACE1: Color = Color::Rgb(69, 71, 90);
const OVERLAY0: Color = Color::Rgb(108, 112, 134);
const TEXT: Color = Color::Rgb(205, 214, 244);
const SUBTEXT0: Color = Color::Rgb(166, 173, 200);
const RED: Color = Color::Rgb(243, 139, 168);
const YELLOW: Color = Color::Rgb(249, 226, 175);
const GREEN: Color = Color::Rgb(166, 227, 161);
const BLUE: Color = Color::Rgb(137, 180, 250);
const MAUVE: Color = Color::Rgb(203, 166, 247);
const TEAL: Color = Color::Rgb(148, 226, 213);

const RAW_PREVIEW_LINES: usize = 8;

pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title bar
            Constraint::Min(0),    // Main content
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    let snapshot = app.session.snapshot();

    draw_title_bar(frame, &snapshot, chunks[0]);
    match snapshot.mode {
        SegmentationMode::Block => draw_blocks(frame, app, &snapshot, chunks[1]),
        SegmentationMode::Line => draw_line_view(frame, app, &snapshot, chunks[1]),
    }
    draw_status_bar(frame, app, chunks[2]);

    // Draw popups/overlays
    match app.mode {
        Mode::Input => draw_input_dialog(frame, app),
        Mode::Help => draw_help(frame, app),
        Mode::DeliveryFailed => draw_delivery_failed(frame, app),
        _ => {}
    }
}

fn draw_title_bar(frame: &mut Frame, snapshot: &Snapshot, area: Rect) {
    let counts = match snapshot.summary {
        Summary::Block {
            approved_count,
            rejected_count,
        } => format!("{} approved / {} rejected", approved_count, rejected_count),
        Summary::Line { comment_count } => format!("{} comments", comment_count),
    };

    let mut title_text = format!(" mdreview - {} [{}]", snapshot.title, counts);
    if snapshot.state != SessionState::Reviewing {
        title_text.push_str(&format!(" ({})", snapshot.state));
    }
    let title_bar = Paragraph::new(title_text).style(Style::default().fg(TEXT).bg(SURFACE0));

    frame.render_widget(title_bar, area);
}

fn draw_blocks(frame: &mut Frame, app: &App, snapshot: &Snapshot, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(BLUE))
        .title("Blocks");

    let items: Vec<ListItem> = snapshot
        .units
        .iter()
        .enumerate()
        .map(|(i, unit)| unit_item(snapshot, unit, i == app.selected_unit))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(SURFACE1));
    let mut state = ListState::default().with_selected(Some(app.selected_unit));

    frame.render_stateful_widget(list, area, &mut state);
}

fn unit_item<'a>(snapshot: &Snapshot, unit: &'a Unit, selected: bool) -> ListItem<'a> {
    let approved = snapshot.is_approved(&unit.id);
    let (checkbox, check_color) = if approved {
        ("[x]", GREEN)
    } else {
        ("[ ]", RED)
    };

    let kind = match unit.kind {
        UnitKind::Heading => format!("h{}", unit.level),
        other => other.as_str().to_string(),
    };

    let mut text_style = Style::default().fg(if approved { TEXT } else { SUBTEXT0 });
    if unit.kind == UnitKind::Heading {
        text_style = text_style.add_modifier(Modifier::BOLD);
    }
    if !approved {
        text_style = text_style.add_modifier(Modifier::CROSSED_OUT);
    }

    let mut lines = vec![Line::from(vec![
        Span::styled(format!("{} ", checkbox), Style::default().fg(check_color)),
        Span::styled(format!("{:<10}", kind), Style::default().fg(OVERLAY0)),
        Span::styled(unit.display_text.as_str(), text_style),
    ])];

    if selected && unit.has_hidden_source() {
        for raw in unit.raw_source.lines().take(RAW_PREVIEW_LINES) {
            lines.push(Line::from(Span::styled(
                format!("      {}", raw),
                Style::default().fg(OVERLAY0),
            )));
        }
    }

    if let Some(ann) = snapshot.annotation_for_unit(&unit.id) {
        if !ann.comment.is_empty() {
            lines.push(Line::from(Span::styled(
                format!("      > {}", ann.comment),
                Style::default().fg(YELLOW),
            )));
        }
    }

    ListItem::new(lines)
}

fn draw_line_view(frame: &mut Frame, app: &App, snapshot: &Snapshot, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),     // Document
            Constraint::Length(34), // Sidebar
        ])
        .split(area);

    draw_document(frame, app, &snapshot.annotations, chunks[0]);
    draw_sidebar(frame, app, &snapshot.annotations, chunks[1]);
}

fn draw_document(frame: &mut Frame, app: &App, annotations: &[&Annotation], area: Rect) {
    let border_style = if app.focus == Focus::Document {
        Style::default().fg(BLUE)
    } else {
        Style::default().fg(SUBTEXT0)
    };

    let mode_indicator = match (app.mode, app.selection_kind) {
        (Mode::Visual, SelectionKind::Lines) => " [VISUAL LINE]",
        (Mode::Visual, SelectionKind::Text) => " [VISUAL]",
        _ => "",
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(format!("Document{}", mode_indicator));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let selected_lines = app.selected_lines();
    let text_selection = match (app.mode, app.selection_kind, app.selection_start) {
        (Mode::Visual, SelectionKind::Text, Some(start)) => {
            let end = app.cursor.position();
            Some(if start <= end { (start, end) } else { (end, start) })
        }
        _ => None,
    };
    let cursor = app.cursor.position();

    let mut lines: Vec<Line> = Vec::with_capacity(app.cursor.line_count());
    for row in 0..app.cursor.line_count() {
        let content = app.cursor.line(row).unwrap_or("");
        let commented = annotations
            .iter()
            .any(|a| a.line_range().is_some_and(|r| r.contains(row)));

        let mut base = Style::default().fg(TEXT);
        if commented {
            base = base.fg(YELLOW).add_modifier(Modifier::UNDERLINED);
        }
        if selected_lines.is_some_and(|r| r.contains(row)) && text_selection.is_none() {
            base = base.bg(SURFACE1).add_modifier(Modifier::BOLD);
        }

        let gutter_style = if row == cursor.0 {
            Style::default().fg(MAUVE)
        } else {
            Style::default().fg(OVERLAY0)
        };
        let mut spans = vec![Span::styled(format!("{:>4} ", row + 1), gutter_style)];

        for (col, ch) in content.chars().enumerate() {
            let mut style = base;
            if let Some((start, end)) = text_selection {
                if (row, col) >= start && (row, col) < end {
                    style = style.bg(SURFACE1).add_modifier(Modifier::BOLD);
                }
            }
            if (row, col) == cursor && app.focus == Focus::Document {
                style = style.add_modifier(Modifier::REVERSED);
            }
            spans.push(Span::styled(ch.to_string(), style));
        }
        if cursor == (row, content.chars().count()) && app.focus == Focus::Document {
            spans.push(Span::styled(" ", base.add_modifier(Modifier::REVERSED)));
        }

        lines.push(Line::from(spans));
    }

    // Keep the cursor row on screen
    let visible_height = inner.height as usize;
    let scroll_offset = if cursor.0 >= visible_height {
        cursor.0 - visible_height + 1
    } else {
        0
    };

    let paragraph = Paragraph::new(lines).scroll((scroll_offset as u16, 0));
    frame.render_widget(paragraph, inner);
}

fn draw_sidebar(frame: &mut Frame, app: &App, annotations: &[&Annotation], area: Rect) {
    let sidebar_style = if app.focus == Focus::Sidebar {
        Style::default().fg(BLUE)
    } else {
        Style::default().fg(SUBTEXT0)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(sidebar_style)
        .title(format!("Comments ({})", annotations.len()));

    let items: Vec<ListItem> = annotations
        .iter()
        .enumerate()
        .map(|(i, ann)| {
            let selected = i == app.sidebar_selected;
            let marker = if selected { ">" } else { " " };

            let line1 = format!("{} {} \"{}\"", marker, range_label(ann), preview(app, ann));
            let line2 = format!("   {}", ann.comment.chars().take(28).collect::<String>());

            let style = if selected {
                Style::default().fg(TEXT).bg(SURFACE1)
            } else {
                Style::default().fg(TEXT)
            };

            ListItem::new(vec![
                Line::from(Span::styled(line1, style)),
                Line::from(Span::styled(line2, style.fg(SUBTEXT0))),
            ])
        })
        .collect();

    let list = List::new(items).block(block);
    frame.render_widget(list, area);
}

fn range_label(ann: &Annotation) -> String {
    match ann.line_range() {
        Some(r) if r.start_line == r.end_line => format!("L{}", r.start_line + 1),
        Some(r) => format!("L{}-{}", r.start_line + 1, r.end_line + 1),
        None => String::new(),
    }
}

fn preview(app: &App, ann: &Annotation) -> String {
    let text = match &ann.target {
        Target::Selection(sel) => sel.selected_text.clone(),
        _ => ann
            .line_range()
            .and_then(|r| app.cursor.line(r.start_line))
            .unwrap_or("")
            .to_string(),
    };
    text.trim()
        .chars()
        .take(14)
        .collect::<String>()
        .replace('\n', " ")
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mode_str = match app.mode {
        Mode::Normal => "NORMAL",
        Mode::Visual => "VISUAL",
        Mode::Input => "INPUT",
        Mode::Help => "HELP",
        Mode::DeliveryFailed => "FAILED",
        Mode::Finished => "DONE",
    };

    let status = app.status_message.as_deref().unwrap_or("");

    let help_hint = if app.is_block_mode() {
        "space toggle | c comment | A/R all | S submit | q cancel | ? help"
    } else {
        "v/V select | c comment | d delete | S submit | q cancel | ? help"
    };

    let status_text = format!(
        " {} | {}",
        mode_str,
        if status.is_empty() { help_hint } else { status },
    );

    let status_bar = Paragraph::new(status_text).style(Style::default().fg(SUBTEXT0).bg(SURFACE0));

    frame.render_widget(status_bar, area);
}

fn draw_input_dialog(frame: &mut Frame, app: &App) {
    let area = centered_rect(64, 7, frame.area());
    frame.render_widget(Clear, area);

    let title = match &app.input_target {
        Some(InputTarget::Comment(Target::Unit { id })) => format!("Comment on {}", id),
        Some(InputTarget::NewRange(r)) if r.start_line == r.end_line => {
            format!("Comment on line {}", r.start_line + 1)
        }
        Some(InputTarget::NewRange(r)) => {
            format!("Comment on lines {}-{}", r.start_line + 1, r.end_line + 1)
        }
        Some(InputTarget::NewSelection(_)) => "Comment on selection".to_string(),
        _ => "Edit comment".to_string(),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(GREEN))
        .title(format!("{} (Enter to save, Esc to discard)", title));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let input = Paragraph::new(format!("{}_", app.input_buffer))
        .style(Style::default().fg(TEXT))
        .wrap(Wrap { trim: false });
    frame.render_widget(input, inner);
}

fn draw_delivery_failed(frame: &mut Frame, app: &App) {
    let area = centered_rect(60, 7, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(RED))
        .title("Submission failed");

    let reason = app
        .outbox()
        .and_then(|o| o.last_error())
        .unwrap_or("unknown error");
    let attempts = app.outbox().map(|o| o.attempts()).unwrap_or(0);

    let text = vec![
        Line::from(Span::styled(reason.to_string(), Style::default().fg(TEXT))),
        Line::from(Span::styled(
            format!("Attempts: {}", attempts),
            Style::default().fg(SUBTEXT0),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "r  retry the same payload   a  abandon and exit",
            Style::default().fg(TEAL),
        )),
    ];

    let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn draw_help(frame: &mut Frame, app: &App) {
    let area = centered_rect(60, 20, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(BLUE))
        .title("Help (press any key to close)");

    let heading = Style::default().fg(MAUVE).add_modifier(Modifier::BOLD);
    let mut help_text = vec![
        Line::from(Span::styled("Navigation", heading)),
        Line::from("  j/k      Move down/up"),
        Line::from("  g/G      Go to top/bottom"),
    ];

    if app.is_block_mode() {
        help_text.extend([
            Line::from(""),
            Line::from(Span::styled("Review", heading)),
            Line::from("  space    Toggle approve/reject"),
            Line::from("  c        Comment on block"),
            Line::from("  A / R    Approve all / reject all"),
        ]);
    } else {
        help_text.extend([
            Line::from("  h/l w/b  Move by character/word"),
            Line::from("  ]/[      Next/prev comment"),
            Line::from("  Tab      Toggle document/sidebar"),
            Line::from(""),
            Line::from(Span::styled("Comments", heading)),
            Line::from("  V        Select lines"),
            Line::from("  v        Select text"),
            Line::from("  c        Comment on selection or line"),
            Line::from("  e        Edit selected comment"),
            Line::from("  d / X    Delete comment / clear all"),
        ]);
    }

    help_text.extend([
        Line::from(""),
        Line::from(Span::styled("Finish", heading)),
        Line::from("  S        Submit review"),
        Line::from("  q / Esc  Cancel review"),
    ]);

    let paragraph = Paragraph::new(help_text).block(block);
    frame.render_widget(paragraph, area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}
