
use color_eyre::Result;
use std::{fs, sync::Mutex};
use tracing::info;
use tracing_subscriber::EnvFilter;

pub mod acquire;
pub mod app;
pub mod config;
pub mod csv_utils;
pub mod error;
pub mod handshake;
pub mod history;
pub mod persist;
pub mod plot_png;
pub mod reflow_port;
pub mod sample;

use acquire::Session;
use config::Config;
use reflow_port::LineLink;

/// Entry point: connect, start the reflow process, run the live view, then
/// stop the controller and save the run.
fn main() -> Result<()> {
    color_eyre::install()?;
    let cfg = Config::default();
    init_tracing(&cfg)?;

    let link = reflow_port::open_port(&cfg)?;
    println!("Connected to {}", link.name());
    info!(port = %link.name(), baud = cfg.baud_rate, "serial port open");

    let mut session = Session::new(link);
    // Stops the controller itself on failure; nothing is saved.
    handshake::start_reflow(&mut session.link, cfg.handshake_attempts)?;

    let mut app = app::App::new(session, cfg.clone());
    let mut terminal = ratatui::init();
    let result = app.run(&mut terminal);
    ratatui::restore();

    let saved = persist::shutdown(app.into_session(), &cfg);
    // UI errors take precedence over save errors.
    result?;
    saved?;
    Ok(())
}

/// Log to a file; the terminal belongs to the UI.
fn init_tracing(cfg: &Config) -> Result<()> {
    if let Some(dir) = cfg.log_path.parent() {
        fs::create_dir_all(dir)?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&cfg.log_path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
    Ok(())
}
