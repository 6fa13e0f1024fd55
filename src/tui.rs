use anyhow::Result;
use crossterm::{
    event::{Event, EventStream, KeyEvent, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{self, Stderr};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

pub type Tui = Terminal<CrosstermBackend<Stderr>>;

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize(u16, u16),
    Tick,
}

/// Merges terminal input and the animation tick into one channel
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl EventHandler {
    pub fn new(tick: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        let tx_events = tx.clone();
        tokio::spawn(async move {
            let mut reader = EventStream::new();
            while let Some(event) = reader.next().await {
                let app_event = match event {
                    // release and repeat events would double-type characters
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => AppEvent::Key(key),
                    Ok(Event::Resize(w, h)) => AppEvent::Resize(w, h),
                    Ok(_) => continue,
                    Err(err) => {
                        debug!(error = %err, "terminal event stream failed");
                        break;
                    }
                };
                if tx_events.send(app_event).is_err() {
                    break;
                }
            }
        });

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            loop {
                interval.tick().await;
                if tx.send(AppEvent::Tick).is_err() {
                    break;
                }
            }
        });

        Self { rx }
    }

    pub async fn next(&mut self) -> Option<AppEvent> {
        self.rx.recv().await
    }
}

pub fn init() -> Result<Tui> {
    enable_raw_mode()?;
    undo_on_err(execute!(io::stderr(), EnterAlternateScreen), disable_raw_mode)?;

    let backend = CrosstermBackend::new(io::stderr());
    undo_on_err(Terminal::new(backend), || {
        execute!(io::stderr(), LeaveAlternateScreen)?;
        disable_raw_mode()
    })
}

/// Run `undo` when a setup step fails, keeping the step's error
fn undo_on_err<T>(step: io::Result<T>, undo: impl FnOnce() -> io::Result<()>) -> Result<T> {
    match step {
        Ok(value) => Ok(value),
        Err(err) => {
            if let Err(undo_err) = undo() {
                debug!(error = %undo_err, "failed to undo terminal setup");
            }
            Err(err.into())
        }
    }
}

pub fn restore() -> Result<()> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn failed_setup_step_runs_undo_and_keeps_error() {
        let undone = Cell::new(false);
        let result: Result<()> = undo_on_err(
            Err(io::Error::new(io::ErrorKind::Other, "no tty")),
            || {
                undone.set(true);
                Ok(())
            },
        );
        assert!(undone.get());
        assert_eq!(result.unwrap_err().to_string(), "no tty");
    }

    #[test]
    fn failing_undo_does_not_mask_setup_error() {
        let result: Result<()> = undo_on_err(
            Err(io::Error::new(io::ErrorKind::Other, "no tty")),
            || Err(io::Error::new(io::ErrorKind::Other, "still raw")),
        );
        assert_eq!(result.unwrap_err().to_string(), "no tty");
    }

    #[test]
    fn successful_setup_step_skips_undo() {
        let undone = Cell::new(false);
        let value = undo_on_err(Ok(7), || {
            undone.set(true);
            Ok(())
        })
        .unwrap();
        assert_eq!(value, 7);
        assert!(!undone.get());
    }
}
