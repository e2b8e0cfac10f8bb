mod app;
mod config;
mod theme;
mod ui;

use anyhow::Result;
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
use tracing::info;
use vdemo_core::Selection;
use vdemo_link::{LinkEvent, LinkHandle};

const LINK_EVENT_CAPACITY: usize = 256;

type ConsoleTerminal = Terminal<CrosstermBackend<io::Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load_config(config::Args::parse())?;
    let log_path = config::init_logging(&config);
    info!(
        event = "console_start",
        backend = %config.backend_url,
        batch_count = config.batch_count
    );
    let selection = Selection::new(config.batch_count)?;

    let mut terminal = setup_terminal()?;

    let (link_tx, mut link_rx) = mpsc::channel(LINK_EVENT_CAPACITY);
    let link = LinkHandle::spawn(config.backend_url.clone(), link_tx);
    let mut app = app::App::new(link, selection);
    app.log_path = log_path.map(|path| path.display().to_string());

    let result = run_app(&mut terminal, &mut app, &mut link_rx).await;

    // The socket is closed here whether the loop ended by quit or by error.
    drop(link_rx);
    app.into_sink().shutdown().await;
    let restored = restore_terminal(&mut terminal);
    info!(event = "console_exit");
    result?;
    restored
}

fn setup_terminal() -> Result<ConsoleTerminal> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut ConsoleTerminal) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

async fn run_app(
    terminal: &mut ConsoleTerminal,
    app: &mut app::App<LinkHandle>,
    link_rx: &mut mpsc::Receiver<LinkEvent>,
) -> Result<()> {
    let mut events = EventStream::new();
    loop {
        terminal.draw(|frame| ui::render(frame, app))?;
        tokio::select! {
            Some(event) = link_rx.recv() => {
                app.apply_link_event(event);
            }
            maybe_event = events.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if app.handle_key(key) {
                            return Ok(());
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => return Err(err.into()),
                    None => return Ok(()),
                }
            }
        }
    }
}
