use std::io::{self, Stderr};
use std::time::Duration;
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyEvent, KeyEventKind, MouseEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

pub type Tui = Terminal<CrosstermBackend<Stderr>>;

pub const ANIMATION_TICK: Duration = Duration::from_millis(300);

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(u16, u16),
    /// Animation frame for the pending-reply indicator
    Tick,
    /// Redraw so relative ages stay current
    Refresh,
}

/// Terminal events plus periodic ticks. Dropping the handler stops every
/// task it spawned.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<AppEvent>,
    tx: mpsc::UnboundedSender<AppEvent>,
    tasks: Vec<JoinHandle<()>>,
}

impl EventHandler {
    pub fn new(refresh_interval: Duration) -> Self {
        let mut handler = Self::with_ticks(ANIMATION_TICK, refresh_interval);
        handler.tasks.push(tokio::spawn(read_terminal_events(handler.tx.clone())));
        handler
    }

    /// Only the tick tasks, no terminal reader
    pub fn with_ticks(animation_interval: Duration, refresh_interval: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let tasks = vec![
            spawn_ticker(tx.clone(), animation_interval, || AppEvent::Tick),
            spawn_ticker(tx.clone(), refresh_interval, || AppEvent::Refresh),
        ];
        debug!(?animation_interval, ?refresh_interval, "EventHandler: tick tasks started");
        Self { rx, tx, tasks }
    }

    pub async fn next(&mut self) -> Option<AppEvent> {
        self.rx.recv().await
    }

    /// Stop all tasks. Also runs on drop.
    pub fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        debug!("EventHandler: tasks stopped");
    }
}

impl Drop for EventHandler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_ticker(
    tx: mpsc::UnboundedSender<AppEvent>,
    period: Duration,
    make: fn() -> AppEvent,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick of a tokio interval completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            if tx.send(make()).is_err() {
                break;
            }
        }
    })
}

async fn read_terminal_events(tx: mpsc::UnboundedSender<AppEvent>) {
    let mut reader = event::EventStream::new();
    while let Some(evt) = reader.next().await {
        let Ok(evt) = evt else { continue };
        let app_event = match evt {
            // Only handle key press events, not release
            Event::Key(key) if key.kind == KeyEventKind::Press => Some(AppEvent::Key(key)),
            Event::Mouse(mouse) => Some(AppEvent::Mouse(mouse)),
            Event::Resize(w, h) => Some(AppEvent::Resize(w, h)),
            _ => None,
        };

        if let Some(event) = app_event {
            if tx.send(event).is_err() {
                break;
            }
        }
    }
}

pub fn init() -> Result<Tui> {
    enable_raw_mode()?;
    execute!(io::stderr(), EnterAlternateScreen)?;
    execute!(io::stderr(), crossterm::event::EnableMouseCapture)?;

    let backend = CrosstermBackend::new(io::stderr());
    let terminal = Terminal::new(backend)?;

    Ok(terminal)
}

pub fn restore() -> Result<()> {
    execute!(io::stderr(), crossterm::event::DisableMouseCapture)?;
    execute!(io::stderr(), LeaveAlternateScreen)?;
    disable_raw_mode()?;
    Ok(())
}

/// Install panic hook to restore terminal on panic
pub fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = restore();
        original_hook(panic_info);
    }));
}
