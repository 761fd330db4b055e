//! Event loop - terminal setup, input thread and the update/dispatch cycle.

use crate::event::Event;
use crate::model::Model;
use crate::tasks::{Collaborators, TaskRunner};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event as TermEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use nodeup_shared::config::InstallerConfig;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use super::render::draw;

const INPUT_POLL: Duration = Duration::from_millis(50);

/// Run the installer TUI until the user quits or the pipeline ends.
pub async fn run(config: InstallerConfig, collaborators: Collaborators) -> Result<()> {
    enable_raw_mode().context(
        "failed to enable raw mode; run the installer from an interactive terminal",
    )?;

    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(anyhow::anyhow!("failed to initialize terminal: {e}"));
    }

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_event_loop(&mut terminal, &config, collaborators).await;

    // Always attempt cleanup, even when the loop failed.
    let cleanup = restore_terminal(&mut terminal);
    result.and(cleanup)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Forward key presses and resizes from a dedicated thread.
///
/// A plain thread rather than a blocking tokio task: the runtime must not wait
/// for it on shutdown. It exits on its own once the loop drops the receiver.
fn spawn_input_reader(tx: UnboundedSender<Event>) {
    std::thread::spawn(move || loop {
        if tx.is_closed() {
            break;
        }
        match event::poll(INPUT_POLL) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(err) => {
                warn!("terminal poll failed: {}", err);
                break;
            }
        }
        let forwarded = match event::read() {
            Ok(TermEvent::Key(key)) if key.kind == KeyEventKind::Press => Event::Key(key),
            Ok(TermEvent::Resize(width, height)) => Event::Resize { width, height },
            Ok(_) => continue,
            Err(err) => {
                warn!("terminal read failed: {}", err);
                break;
            }
        };
        if tx.send(forwarded).is_err() {
            break;
        }
    });
}

async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: &InstallerConfig,
    collaborators: Collaborators,
) -> Result<()> {
    let (mut model, relays, log) = Model::with_channels(config);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let runner = TaskRunner::new(collaborators, tx.clone(), relays, log, config.timeouts.clone());

    let size = terminal.size()?;
    model.size = (size.width, size.height);
    spawn_input_reader(tx);

    let mut ticker = tokio::time::interval(config.ui.tick());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("installer session started");
    while !model.should_quit {
        terminal.draw(|f| draw(f, &model))?;

        let event = tokio::select! {
            _ = ticker.tick() => Event::Tick,
            received = rx.recv() => match received {
                Some(event) => event,
                None => break,
            },
        };

        for command in model.update(event) {
            runner.spawn(command);
        }
    }
    info!(phase = %model.phase, "installer session ended");
    Ok(())
}
