// main.rs

mod app;
mod store;
mod task;
mod tui;

use crate::app::App;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{self};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Build the shared store client once; without a saved config the TUI
    // opens in the setup flow instead.
    let mut app = App::new();
    if app.store_config.is_some() {
        if let Err(e) = app.connect() {
            app.error_message = Some(e);
        }
    }

    // Run the TUI event loop (blocks until exit)
    let res = tui::run_app(&mut terminal, &mut app);

    // Restore terminal state
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // Handle errors from the event loop if any
    if let Err(err) = res {
        eprintln!("Application error: {}", err);
    }

    Ok(())
}
