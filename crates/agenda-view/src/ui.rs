use crate::app::App;
use crate::theme;
use agenda_core::FallbackStore;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

pub fn render<S: FallbackStore>(f: &mut Frame, app: &App<S>) {
    let area = f.size();
    let prompt_height = if app.prompt.is_some() { 1 } else { 0 };
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(prompt_height),
            Constraint::Length(1),
        ])
        .split(area);

    render_header(f, app, rows[0]);
    app.sync.widget().draw(f, rows[1]);
    if app.prompt.is_some() {
        render_prompt(f, app, rows[2]);
    }
    render_status(f, app, rows[3]);

    if app.show_help {
        let read_only = app.sync.widget().options().is_read_only();
        render_help(f, centered(area, 44, 14), read_only);
    }
}

fn render_header<S: FallbackStore>(f: &mut Frame, app: &App<S>, area: Rect) {
    let calendar = app.sync.widget();
    let policy = app.sync.policy();
    let line = Line::from(vec![
        Span::styled(" agenda ", theme::HEADER_STYLE),
        Span::raw(calendar.period_label()),
        Span::styled(format!("  [{}]", calendar.view()), theme::MUTED_STYLE),
        Span::styled(
            format!("  grouping {} / colors {}", policy.grouping, policy.colors),
            theme::MUTED_STYLE,
        ),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

fn render_status<S: FallbackStore>(f: &mut Frame, app: &App<S>, area: Rect) {
    let sync = &app.sync;
    let state = sync.state();
    let mut spans = vec![
        Span::styled(
            format!(" {} ", state),
            Style::default()
                .fg(theme::connection_color(state))
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            " {} events  snapshots {} ",
            sync.widget().event_count(),
            sync.snapshots_applied()
        )),
    ];
    if let Some(at) = sync.last_snapshot_at() {
        spans.push(Span::raw(format!(" updated {} ", at.format("%H:%M:%S"))));
    }
    if !state.is_open() {
        spans.push(Span::styled(" showing last known agenda ", theme::MUTED_STYLE));
    }
    let unplaced = sync.widget().unplaced();
    if unplaced > 0 {
        spans.push(Span::styled(
            format!(" {unplaced} without usable dates "),
            theme::MUTED_STYLE,
        ));
    }
    if let Some(err) = sync.last_error() {
        spans.push(Span::styled(format!(" {err} "), theme::NOW_STYLE));
    }
    spans.push(Span::styled("  ? help", theme::MUTED_STYLE));
    f.render_widget(
        Paragraph::new(Line::from(spans)).style(theme::STATUS_STYLE),
        area,
    );
}

fn render_prompt<S: FallbackStore>(f: &mut Frame, app: &App<S>, area: Rect) {
    let buffer = app.prompt.as_deref().unwrap_or_default();
    let mut spans = vec![
        Span::styled("go to date: ", theme::HEADER_STYLE),
        Span::raw(buffer.to_string()),
        Span::styled("_", theme::MUTED_STYLE),
    ];
    if let Some(err) = &app.prompt_error {
        spans.push(Span::styled(format!("  {err}"), theme::NOW_STYLE));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_help(f: &mut Frame, area: Rect, read_only: bool) {
    let title = if read_only { "Help (read-only)" } else { "Help" };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(area);
    f.render_widget(Clear, area);
    f.render_widget(block, area);

    let key = |keys: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(format!("{keys:<10}"), Color::Cyan),
            Span::raw(what),
        ])
    };
    let text = vec![
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        key("k / Left", "Previous period"),
        key("j / Right", "Next period"),
        key("t", "Today"),
        key("d", "Day view"),
        key("w", "Week view"),
        key("m", "Month view"),
        key("g", "Go to date"),
        key("?", "Toggle help"),
        key("q / Esc", "Quit"),
    ];
    f.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }), inner);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
