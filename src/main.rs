use absurdpg_tui::config::ProfileStore;
use absurdpg_tui::db::PostgresProbe;
use absurdpg_tui::settings::Settings;
use absurdpg_tui::tui::{App, Form, Theme, run_app};
use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Stdout};
use std::path::Path;
use std::sync::Mutex;

#[derive(Parser)]
#[command(name = "absurdpg-tui", version)]
#[command(about = "Connect to a PostgreSQL database and summarize its tables", long_about = None)]
struct Cli {}

#[tokio::main]
async fn main() -> Result<()> {
    let _cli = Cli::parse();

    let settings = Settings::load()?;
    init_logging(&settings);

    let theme = Theme::from_settings(&settings.theme)?;
    let form = initial_form(&settings);

    run_tui(form, theme).await
}

async fn run_tui(form: Form, theme: Theme) -> Result<()> {
    let mut terminal = init_terminal().context("failed to initialize the terminal")?;

    let size = terminal.size()?;
    let app = App::new(form).with_viewport(size.width, size.height);
    let res = run_app(&mut terminal, app, PostgresProbe, theme).await;

    restore_terminal(&mut terminal)?;

    res?;
    tracing::info!("exiting");
    Ok(())
}

fn init_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(e.into());
    }

    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Sends logs to the configured file; the terminal itself belongs to the UI.
fn init_logging(settings: &Settings) {
    let Some(path) = settings.log_path() else {
        return;
    };

    let level = settings
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or_else(|_| {
            eprintln!(
                "warning: unknown log level '{}', using info",
                settings.log_level
            );
            tracing::Level::INFO
        });

    let file = match open_log_file(path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("warning: logging disabled: {:#}", e);
            return;
        }
    };

    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(level)
        .init();
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("could not open log file {}", path.display()))
}

/// Builds the first form, pre-filled from the saved profile named in the settings.
fn initial_form(settings: &Settings) -> Form {
    let Some(name) = settings.profile.as_deref() else {
        return Form::default();
    };

    let store = ProfileStore::new(settings.profiles_path.clone());
    match store.find(name) {
        Ok(Some(profile)) => {
            tracing::info!(profile = name, "pre-filling form from saved profile");
            Form::from_parameters(&profile.parameters())
        }
        Ok(None) => {
            tracing::warn!(
                profile = name,
                path = %store.path().display(),
                "saved profile not found"
            );
            Form::default()
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not load saved profiles");
            Form::default()
        }
    }
}
