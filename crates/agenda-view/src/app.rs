use crate::terminal::TerminalCalendar;
use agenda_core::{ConnectionEvent, FallbackStore, SyncController};
use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::debug;

pub struct App<S> {
    pub sync: SyncController<TerminalCalendar, S>,
    pub prompt: Option<String>,
    pub prompt_error: Option<String>,
    pub show_help: bool,
    should_quit: bool,
    redraw: bool,
}

impl<S: FallbackStore> App<S> {
    pub fn new(sync: SyncController<TerminalCalendar, S>) -> Self {
        Self {
            sync,
            prompt: None,
            prompt_error: None,
            show_help: false,
            should_quit: false,
            redraw: true,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn mark_dirty(&mut self) {
        self.redraw = true;
    }

    /// True when the screen is stale; clears the flag.
    pub fn needs_draw(&mut self) -> bool {
        let widget_dirty = self.sync.widget_mut().take_dirty();
        std::mem::replace(&mut self.redraw, false) || widget_dirty
    }

    pub fn handle_connection(&mut self, event: ConnectionEvent) -> Option<String> {
        // Every event can change the status bar, even when the calendar is untouched.
        self.redraw = true;
        let request = self.sync.handle_event(event)?;
        match request.encode() {
            Ok(text) => Some(text),
            Err(err) => {
                debug!("request_encode_error: {err}");
                None
            }
        }
    }

    pub fn on_tick(&mut self) {
        self.sync.refresh();
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        self.redraw = true;
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if key.code == KeyCode::Char('c') {
                self.should_quit = true;
            }
            return;
        }
        if key.modifiers.contains(KeyModifiers::ALT) {
            return;
        }
        if let KeyCode::Char(c) = key.code {
            // Navigation keys are ignored while the date prompt has focus.
            if self.sync.on_key(c, self.prompt.is_some()).is_some() {
                self.show_help = false;
                return;
            }
        }
        if self.prompt.is_some() {
            self.handle_prompt_key(key);
            return;
        }
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc => {
                if self.show_help {
                    self.show_help = false;
                } else {
                    self.should_quit = true;
                }
            }
            KeyCode::Char('?') => self.show_help = !self.show_help,
            KeyCode::Char('g') => {
                self.show_help = false;
                self.prompt_error = None;
                self.prompt = Some(String::new());
            }
            KeyCode::Left => {
                self.sync.on_key('k', false);
            }
            KeyCode::Right => {
                self.sync.on_key('j', false);
            }
            _ => {}
        }
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) {
        let Some(buffer) = self.prompt.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.prompt = None,
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Char(c) => buffer.push(c),
            KeyCode::Enter => match NaiveDate::parse_from_str(buffer.trim(), "%Y-%m-%d") {
                Ok(day) => {
                    self.sync.widget_mut().go_to(day);
                    self.prompt = None;
                    self.prompt_error = None;
                }
                Err(_) => {
                    self.prompt_error = Some(format!("not a date (YYYY-MM-DD): {}", buffer.trim()));
                }
            },
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agenda_core::{CalendarOptions, ConnectionState, TransformPolicy, ViewKind};
    use agenda_storage::SqliteFallbackStore;
    use chrono::{Datelike, NaiveDateTime};

    fn fixed_now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 21)
            .and_then(|day| day.and_hms_opt(9, 0, 0))
            .expect("valid time")
    }

    fn app() -> App<SqliteFallbackStore> {
        let widget = TerminalCalendar::with_clock(CalendarOptions::default(), fixed_now);
        let store = SqliteFallbackStore::open_in_memory().expect("store");
        App::new(SyncController::new(widget, store, TransformPolicy::default()))
    }

    fn press(app: &mut App<SqliteFallbackStore>, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut App<SqliteFallbackStore>, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn navigation_keys_drive_the_calendar() {
        let mut app = app();
        press(&mut app, KeyCode::Char('m'));
        assert_eq!(app.sync.widget().view(), ViewKind::Month);
        press(&mut app, KeyCode::Char('j'));
        assert_eq!(
            app.sync.widget().anchor(),
            NaiveDate::from_ymd_opt(2026, 11, 1).expect("date")
        );
        press(&mut app, KeyCode::Char('t'));
        assert_eq!(app.sync.widget().anchor(), fixed_now().date());
        assert!(!app.should_quit());
    }

    #[test]
    fn goto_prompt_swallows_navigation_keys() {
        let mut app = app();
        press(&mut app, KeyCode::Char('g'));
        type_text(&mut app, "2027-01-05");
        assert_eq!(app.prompt.as_deref(), Some("2027-01-05"));
        assert_eq!(app.sync.widget().view(), ViewKind::Week);

        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Enter);
        assert!(app.prompt.is_none());
        assert_eq!(
            app.sync.widget().anchor(),
            NaiveDate::from_ymd_opt(2027, 1, 5).expect("date")
        );
        assert_eq!(app.sync.widget().view(), ViewKind::Week);
    }

    #[test]
    fn far_future_date_survives_navigation() {
        let mut app = app();
        press(&mut app, KeyCode::Char('g'));
        type_text(&mut app, "+262142-12-31");
        press(&mut app, KeyCode::Enter);
        assert!(app.prompt.is_none());
        let landed = app.sync.widget().anchor();
        assert_eq!(landed.year(), 262142);

        type_text(&mut app, "jwjmjdj");
        assert_eq!(app.sync.widget().anchor(), landed);
        press(&mut app, KeyCode::Char('k'));
        assert!(app.sync.widget().anchor() < landed);
    }

    #[test]
    fn bad_date_keeps_prompt_open() {
        let mut app = app();
        press(&mut app, KeyCode::Char('g'));
        type_text(&mut app, "soon");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.prompt.as_deref(), Some("soon"));
        assert!(app.prompt_error.is_some());

        press(&mut app, KeyCode::Esc);
        assert!(app.prompt.is_none());
        assert!(!app.should_quit());
    }

    #[test]
    fn help_and_quit_keys() {
        let mut app = app();
        press(&mut app, KeyCode::Char('?'));
        assert!(app.show_help);
        press(&mut app, KeyCode::Esc);
        assert!(!app.show_help);
        assert!(!app.should_quit());
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit());

        let mut app = self::app();
        press(&mut app, KeyCode::Char('g'));
        app.handle_key(KeyEvent::new(KeyCode::Char('w'), KeyModifiers::ALT));
        assert_eq!(app.prompt.as_deref(), Some(""));
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit());
    }

    #[test]
    fn open_connection_yields_agenda_request() {
        let mut app = app();
        assert!(app.handle_connection(ConnectionEvent::Connecting).is_none());
        let request = app.handle_connection(ConnectionEvent::Opened);
        assert_eq!(request.as_deref(), Some(r#"{"command":"get-agenda"}"#));
        assert_eq!(app.sync.state(), ConnectionState::Open);

        let snapshot = r#"[{"ID":"a","ITEM":"Standup","startDate":"2026-10-21T10:00:00","endDate":"2026-10-21T10:15:00"}]"#;
        assert!(app
            .handle_connection(ConnectionEvent::Message(snapshot.to_string()))
            .is_none());
        assert_eq!(app.sync.widget().event_count(), 1);
        assert_eq!(app.sync.store().try_load().expect("load").len(), 1);
        assert!(app.needs_draw());
        assert!(!app.needs_draw());
    }

    #[test]
    fn status_changes_request_redraw() {
        let mut app = app();
        app.handle_connection(ConnectionEvent::Opened);
        while app.needs_draw() {}

        app.handle_connection(ConnectionEvent::Closed(None));
        assert!(app.needs_draw());
        assert_eq!(app.sync.state(), ConnectionState::Closed);

        app.handle_connection(ConnectionEvent::Message("not json".to_string()));
        assert!(app.needs_draw());
        assert!(app.sync.last_error().is_some());

        app.handle_connection(ConnectionEvent::Errored("reset".to_string()));
        assert!(app.needs_draw());
        assert_eq!(app.sync.state(), ConnectionState::Errored);
        assert!(!app.needs_draw());
    }

    #[test]
    fn tick_requests_redraw() {
        let mut app = app();
        app.needs_draw();
        app.on_tick();
        assert!(app.needs_draw());
    }
}
