mod app;
mod config;
mod connection;
mod logging;
mod scheduler;
mod terminal;
mod theme;
mod ui;

use agenda_core::{ConnectionEvent, SyncController};
use agenda_storage::SqliteFallbackStore;
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use tokio::sync::mpsc;
use tracing::{info, warn};

type Term = Terminal<CrosstermBackend<io::Stdout>>;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = config::Args::parse();
    let config = config::load_config(args).map_err(|err| anyhow!(err))?;
    let log_guard = logging::init_logging(&config);
    info!(
        "agenda-view starting; url={} state={}",
        config.url,
        config.state_path.display()
    );

    let store = match SqliteFallbackStore::open(&config.state_path) {
        Ok(store) => store,
        Err(err) => {
            warn!("fallback_store_open_error: {err}; using in-memory store");
            SqliteFallbackStore::open_in_memory().context("open in-memory store")?
        }
    };
    let widget = terminal::TerminalCalendar::new(config.calendar.clone());
    let mut sync = SyncController::new(widget, store, config.policy);
    sync.seed_from_store();
    let mut app = app::App::new(sync);

    let (event_tx, event_rx) = mpsc::channel(64);
    let (outbound_tx, outbound_rx) = mpsc::channel(8);
    let transport = tokio::spawn(connection::connection_loop(
        config.url.clone(),
        config.reconnect,
        event_tx,
        outbound_rx,
    ));
    let refresh = scheduler::RefreshScheduler::new(config.refresh_interval);
    info!("refresh every {}s", refresh.period().as_secs());

    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, &mut app, event_rx, outbound_tx, refresh).await;
    restore_terminal(&mut terminal)?;
    transport.abort();

    info!("agenda-view stopped");
    if let Some(guard) = log_guard {
        guard.flush();
    }
    if let Err(err) = result {
        eprintln!("agenda-view: {err}");
    }
    Ok(())
}

fn setup_terminal() -> Result<Term> {
    enable_raw_mode()?;
    rollback_on_error(open_screen, || {
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        let _ = disable_raw_mode();
    })
}

fn open_screen() -> Result<Term> {
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

/// Runs `init`; on failure runs `rollback` before handing back the error.
fn rollback_on_error<T>(init: impl FnOnce() -> Result<T>, rollback: impl FnOnce()) -> Result<T> {
    init().map_err(|err| {
        rollback();
        err
    })
}

fn restore_terminal(terminal: &mut Term) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

async fn run_app(
    terminal: &mut Term,
    app: &mut app::App<SqliteFallbackStore>,
    mut events: mpsc::Receiver<ConnectionEvent>,
    outbound: mpsc::Sender<String>,
    mut refresh: scheduler::RefreshScheduler,
) -> Result<()> {
    let mut input = EventStream::new();
    let mut transport_done = false;

    loop {
        if app.needs_draw() {
            terminal.draw(|f| ui::render(f, app))?;
        }

        tokio::select! {
            event = events.recv(), if !transport_done => match event {
                Some(event) => {
                    if let Some(request) = app.handle_connection(event) {
                        if outbound.try_send(request).is_err() {
                            warn!("outbound_queue_full; request dropped");
                        }
                    }
                }
                None => {
                    info!("transport finished; showing last known agenda");
                    transport_done = true;
                }
            },
            _ = refresh.refresh_when_due(&mut app.sync) => {}
            input_event = input.next() => match input_event {
                Some(Ok(Event::Key(key))) => {
                    if matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
                        app.handle_key(key);
                    }
                }
                Some(Ok(Event::Resize(_, _))) => {
                    app.on_tick();
                    app.mark_dirty();
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(err.into()),
                None => break,
            },
        }

        if app.should_quit() {
            break;
        }
    }

    Ok(())
}
