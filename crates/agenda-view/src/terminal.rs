use crate::theme;
use agenda_core::{CalendarOptions, CalendarWidget, NormalizedEvent, ViewKind};
use chrono::{
    DateTime, Datelike, Days, Local, Months, NaiveDate, NaiveDateTime, NaiveTime, Timelike,
    Weekday,
};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

const MONTH_ROWS: usize = 6;

#[derive(Debug, Clone)]
struct PlacedEvent {
    event: NormalizedEvent,
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl PlacedEvent {
    fn place(event: &NormalizedEvent) -> Option<Self> {
        let start = parse_event_time(event.start.as_deref()?)?;
        let end = event
            .end
            .as_deref()
            .and_then(parse_event_time)
            .filter(|end| *end >= start)
            .unwrap_or(start);
        Some(Self {
            event: event.clone(),
            start,
            end,
        })
    }

    fn first_day(&self) -> NaiveDate {
        self.start.date()
    }

    /// All-day spans include their end date; timed spans ending exactly at
    /// midnight stop the day before.
    fn last_day(&self) -> NaiveDate {
        if !self.event.is_all_day() && self.end > self.start && self.end.time() == NaiveTime::MIN {
            self.end.date().pred_opt().unwrap_or(self.start.date())
        } else {
            self.end.date()
        }
    }

    fn covers(&self, day: NaiveDate) -> bool {
        self.first_day() <= day && day <= self.last_day()
    }
}

/// Read-only calendar drawn into a terminal frame.
pub struct TerminalCalendar {
    options: CalendarOptions,
    view: ViewKind,
    anchor: NaiveDate,
    now: NaiveDateTime,
    clock: fn() -> NaiveDateTime,
    events: Vec<PlacedEvent>,
    unplaced: usize,
    dirty: bool,
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

impl TerminalCalendar {
    pub fn new(options: CalendarOptions) -> Self {
        Self::with_clock(options, local_now)
    }

    pub fn with_clock(options: CalendarOptions, clock: fn() -> NaiveDateTime) -> Self {
        let now = clock();
        Self {
            view: options.default_view,
            options,
            anchor: now.date(),
            now,
            clock,
            events: Vec::new(),
            unplaced: 0,
            dirty: true,
        }
    }

    pub fn options(&self) -> &CalendarOptions {
        &self.options
    }

    pub fn view(&self) -> ViewKind {
        self.view
    }

    pub fn anchor(&self) -> NaiveDate {
        self.anchor
    }

    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    pub fn event_count(&self) -> usize {
        self.events.len() + self.unplaced
    }

    pub fn unplaced(&self) -> usize {
        self.unplaced
    }

    pub fn go_to(&mut self, day: NaiveDate) {
        self.anchor = day;
        self.dirty = true;
    }

    /// Returns whether anything changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    pub fn period_label(&self) -> String {
        match self.view {
            ViewKind::Day => self.anchor.format("%a %Y-%m-%d").to_string(),
            ViewKind::Week => {
                let start = self.week_start(self.anchor);
                let end = add_days(start, 6);
                format!("{} .. {}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d"))
            }
            ViewKind::Month => self.anchor.format("%B %Y").to_string(),
        }
    }

    pub fn week_start(&self, day: NaiveDate) -> NaiveDate {
        let offset = (day.weekday().num_days_from_monday() + 7
            - self.options.start_day_of_week.num_days_from_monday())
            % 7;
        day.checked_sub_days(Days::new(u64::from(offset)))
            .unwrap_or(day)
    }

    pub fn visible_days(&self) -> Vec<NaiveDate> {
        match self.view {
            ViewKind::Day => vec![self.anchor],
            ViewKind::Week => {
                let start = self.week_start(self.anchor);
                (0..7)
                    .map_while(|i| start.checked_add_days(Days::new(i)))
                    .collect()
            }
            ViewKind::Month => {
                let start = self.week_start(first_of_month(self.anchor));
                (0..(MONTH_ROWS * 7) as u64)
                    .map_while(|i| start.checked_add_days(Days::new(i)))
                    .collect()
            }
        }
    }

    /// Events covering `day`: all-day first, then by start time.
    pub fn events_on(&self, day: NaiveDate) -> Vec<&NormalizedEvent> {
        let mut placed: Vec<&PlacedEvent> = self.events.iter().filter(|p| p.covers(day)).collect();
        placed.sort_by(|a, b| {
            b.event
                .is_all_day()
                .cmp(&a.event.is_all_day())
                .then(a.start.cmp(&b.start))
                .then_with(|| a.event.display_title().cmp(b.event.display_title()))
        });
        placed.into_iter().map(|p| &p.event).collect()
    }

    fn start_of(&self, event: &NormalizedEvent) -> Option<NaiveDateTime> {
        event.start.as_deref().and_then(parse_event_time)
    }

    pub fn draw(&self, f: &mut Frame, area: Rect) {
        match self.view {
            ViewKind::Day => self.draw_day(f, area),
            ViewKind::Week => self.draw_week(f, area),
            ViewKind::Month => self.draw_month(f, area),
        }
    }

    fn day_title(&self, day: NaiveDate, format: &str) -> Span<'static> {
        let label = day.format(format).to_string();
        if day == self.now.date() {
            Span::styled(label, theme::TODAY_STYLE)
        } else {
            Span::styled(label, theme::HEADER_STYLE)
        }
    }

    fn now_line(&self) -> Line<'static> {
        Line::from(Span::styled(
            format!("-- now {} --", self.now.format("%H:%M")),
            theme::NOW_STYLE,
        ))
    }

    fn event_line(&self, event: &NormalizedEvent) -> Line<'static> {
        let style = theme::event_style(event, &self.options.groups);
        if event.is_all_day() {
            return Line::from(Span::styled(format!(" {} ", event.display_title()), style));
        }
        let time = self
            .start_of(event)
            .map(|start| start.format("%H:%M").to_string())
            .unwrap_or_default();
        Line::from(vec![
            Span::styled(format!("{time} "), theme::HOUR_STYLE),
            Span::styled(event.display_title().to_string(), style),
        ])
    }

    /// Lines for one day column. The now marker sits before the first timed
    /// event that starts after the current time.
    fn day_lines(&self, day: NaiveDate) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        let mut marker_pending = day == self.now.date();
        for event in self.events_on(day) {
            if marker_pending && !event.is_all_day() {
                let starts_later = self
                    .start_of(event)
                    .is_some_and(|start| start > self.now);
                if starts_later {
                    lines.push(self.now_line());
                    marker_pending = false;
                }
            }
            lines.push(self.event_line(event));
        }
        if marker_pending {
            lines.push(self.now_line());
        }
        lines
    }

    fn draw_week(&self, f: &mut Frame, area: Rect) {
        let days = self.visible_days();
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(self.week_constraints(&days))
            .split(area);
        for (day, column) in days.iter().zip(columns.iter()) {
            let block = Block::default()
                .borders(Borders::ALL)
                .title(self.day_title(*day, "%a %d"));
            let inner = block.inner(*column);
            f.render_widget(block, *column);
            f.render_widget(Paragraph::new(self.day_lines(*day)), inner);
        }
    }

    fn week_constraints(&self, days: &[NaiveDate]) -> Vec<Constraint> {
        let weight = |day: &NaiveDate| -> u32 {
            if self.options.narrow_weekend && is_weekend(day.weekday()) {
                1
            } else {
                2
            }
        };
        let total: u32 = days.iter().map(weight).sum();
        days.iter()
            .map(|day| Constraint::Ratio(weight(day), total.max(1)))
            .collect()
    }

    fn draw_day(&self, f: &mut Frame, area: Rect) {
        let day = self.anchor;
        let block = Block::default()
            .borders(Borders::ALL)
            .title(self.day_title(day, "%A %Y-%m-%d"));
        let inner = block.inner(area);
        f.render_widget(block, area);
        f.render_widget(Paragraph::new(self.day_grid_lines(day)), inner);
    }

    /// Hour rows from the configured start hour (earlier if an event starts
    /// before it) with timed events placed in their starting hour.
    pub fn day_grid_lines(&self, day: NaiveDate) -> Vec<Line<'static>> {
        let events = self.events_on(day);
        let mut lines: Vec<Line<'static>> = events
            .iter()
            .filter(|event| event.is_all_day())
            .map(|event| self.event_line(event))
            .collect();

        let hour_of = |event: &NormalizedEvent| -> u32 {
            match self.start_of(event) {
                Some(start) if start.date() == day => start.hour(),
                _ => 0,
            }
        };
        let timed: Vec<&NormalizedEvent> = events
            .iter()
            .copied()
            .filter(|event| !event.is_all_day())
            .collect();
        let first_hour = timed
            .iter()
            .map(|&event| hour_of(event))
            .min()
            .unwrap_or(self.options.hour_start)
            .min(self.options.hour_start);

        for hour in first_hour..24 {
            let mut spans = vec![Span::styled(format!("{hour:02}:00 | "), theme::HOUR_STYLE)];
            let in_hour = timed.iter().filter(|&&event| hour_of(event) == hour);
            for (idx, event) in in_hour.enumerate() {
                if idx > 0 {
                    spans.push(Span::styled(", ", theme::MUTED_STYLE));
                }
                spans.push(Span::styled(
                    event.display_title().to_string(),
                    theme::event_style(event, &self.options.groups),
                ));
            }
            lines.push(Line::from(spans));
            if day == self.now.date() && self.now.hour() == hour {
                lines.push(self.now_line());
            }
        }
        lines
    }

    fn draw_month(&self, f: &mut Frame, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(0)])
            .split(area);
        let days = self.visible_days();

        let header_cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, 7); 7])
            .split(rows[0]);
        for (day, col) in days.iter().take(7).zip(header_cols.iter()) {
            let name = day.format("%a").to_string();
            f.render_widget(Paragraph::new(Span::styled(name, theme::HEADER_STYLE)), *col);
        }

        let week_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(vec![Constraint::Ratio(1, MONTH_ROWS as u32); MONTH_ROWS])
            .split(rows[1]);
        let month = self.anchor.month();
        for (week, row) in days.chunks(7).zip(week_rows.iter()) {
            let cells = Layout::default()
                .direction(Direction::Horizontal)
                .constraints(vec![Constraint::Ratio(1, 7); 7])
                .split(*row);
            for (day, cell) in week.iter().zip(cells.iter()) {
                let title = if day.month() == month {
                    self.day_title(*day, "%d")
                } else {
                    Span::styled(day.format("%d").to_string(), theme::MUTED_STYLE)
                };
                let block = Block::default().borders(Borders::ALL).title(title);
                let inner = block.inner(*cell);
                f.render_widget(block, *cell);
                let lines = self.month_cell_lines(*day, usize::from(inner.height));
                f.render_widget(Paragraph::new(lines), inner);
            }
        }
    }

    /// Up to `capacity` lines; the last one becomes `+N` when events overflow.
    pub fn month_cell_lines(&self, day: NaiveDate, capacity: usize) -> Vec<Line<'static>> {
        let events = self.events_on(day);
        if capacity == 0 {
            return Vec::new();
        }
        if events.len() <= capacity {
            return events.iter().map(|event| self.event_line(event)).collect();
        }
        let shown = capacity - 1;
        let mut lines: Vec<Line<'static>> = events
            .iter()
            .take(shown)
            .map(|event| self.event_line(event))
            .collect();
        lines.push(Line::from(Span::styled(
            format!("+{} more", events.len() - shown),
            theme::MUTED_STYLE,
        )));
        lines
    }
}

impl CalendarWidget for TerminalCalendar {
    fn clear(&mut self) {
        self.events.clear();
        self.unplaced = 0;
        self.dirty = true;
    }

    fn render(&mut self) {
        self.now = (self.clock)();
        self.dirty = true;
    }

    fn create_events(&mut self, events: &[NormalizedEvent]) {
        for event in events {
            match PlacedEvent::place(event) {
                Some(placed) => self.events.push(placed),
                None => self.unplaced += 1,
            }
        }
        self.dirty = true;
    }

    fn change_view(&mut self, view: ViewKind, force: bool) {
        if view == self.view && !force {
            return;
        }
        self.view = view;
        self.dirty = true;
    }

    fn prev(&mut self) {
        self.anchor = match self.view {
            ViewKind::Day => sub_days(self.anchor, 1),
            ViewKind::Week => sub_days(self.anchor, 7),
            ViewKind::Month => first_of_month(self.anchor)
                .checked_sub_months(Months::new(1))
                .unwrap_or(self.anchor),
        };
        self.dirty = true;
    }

    fn next(&mut self) {
        self.anchor = match self.view {
            ViewKind::Day => add_days(self.anchor, 1),
            ViewKind::Week => add_days(self.anchor, 7),
            ViewKind::Month => first_of_month(self.anchor)
                .checked_add_months(Months::new(1))
                .unwrap_or(self.anchor),
        };
        self.dirty = true;
    }

    fn today(&mut self) {
        self.now = (self.clock)();
        self.anchor = self.now.date();
        self.dirty = true;
    }
}

/// Stays on `day` at the end of the representable range.
fn add_days(day: NaiveDate, n: u64) -> NaiveDate {
    day.checked_add_days(Days::new(n)).unwrap_or(day)
}

fn sub_days(day: NaiveDate, n: u64) -> NaiveDate {
    day.checked_sub_days(Days::new(n)).unwrap_or(day)
}

fn first_of_month(day: NaiveDate) -> NaiveDate {
    day.with_day(1).unwrap_or(day)
}

fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}

/// Reads the time formats the agenda exporter is known to produce, plus
/// epoch seconds or milliseconds. Offsets are converted to local time.
pub fn parse_event_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(epoch) = raw.parse::<i64>() {
        let utc = if epoch.abs() >= 100_000_000_000 {
            DateTime::from_timestamp_millis(epoch)
        } else {
            DateTime::from_timestamp(epoch, 0)
        };
        return utc.map(|dt| dt.with_timezone(&Local).naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%dT%H:%M%z", "%Y-%m-%d %H:%M:%S%z"] {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt.with_timezone(&Local).naive_local());
        }
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|day| day.and_time(NaiveTime::MIN))
}
