//! Terminal dashboard
//!
//! One loop iteration runs a collection cycle, then redraws and handles
//! keys until the refresh interval has elapsed or a refresh was requested.

mod app;
mod input;
mod terminal;
mod ui;

use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyEventKind};
use pisensors_core::Collector;
use pisensors_core::session::CommandRunner;

pub use app::App;

use crate::error::CliError;
use terminal::TerminalGuard;

/// Runs the dashboard until the user quits.
///
/// The terminal is restored before this returns, on success and on error.
///
/// # Errors
///
/// Returns a fatal session error from the collector or a terminal IO error.
pub async fn run<R: CommandRunner>(
    collector: &mut Collector<R>,
    mut app: App,
) -> Result<(), CliError> {
    let mut guard = TerminalGuard::enter()?;
    let terminal = guard.terminal_mut();

    // Placeholders while the first cycle fetches the static values
    terminal.draw(|f| ui::draw(f, &app, collector.snapshot()))?;

    loop {
        let started = Instant::now();
        let snapshot = collector.collect(&mut app.config).await?;

        loop {
            terminal.draw(|f| ui::draw(f, &app, snapshot))?;
            if app.should_quit {
                tracing::info!("Dashboard closed by user");
                return Ok(());
            }
            if app.config.refresh_pending() {
                break;
            }

            let deadline = started + app.config.refresh_interval();
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining == Duration::ZERO {
                break;
            }
            if event::poll(remaining)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        input::handle_key(&mut app, key);
                    }
                    // Resize and everything else: redraw on the next pass
                    _ => {}
                }
            }
        }
    }
}
