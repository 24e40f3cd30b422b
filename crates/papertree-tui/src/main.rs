use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use ratatui::crossterm::event;
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::prelude::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use papertree_core::{Config, ConfigFile, ResearchClient};

mod action;
mod app;
mod backend;
mod tui_event;
mod input;
mod model;
mod theme;
mod view;

use app::App;

/// Papertree TUI - explore a research question as a live tree of arXiv papers.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Research question to start with (otherwise type it in the prompt)
    query: Vec<String>,

    /// Base URL of the research-tree API
    #[arg(long)]
    api_url: Option<String>,

    /// Papers to fetch per generated query
    #[arg(long)]
    max_results: Option<u32>,

    /// Number of queries to generate
    #[arg(long)]
    max_queries: Option<u32>,

    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write logs to this file (the terminal is reserved for the UI)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    if let Some(path) = &args.log_file {
        let file = std::fs::File::create(path)
            .with_context(|| format!("cannot create log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init();
    }

    // Resolve config from CLI flags > env vars > config file > defaults
    let mut config = Config::default();
    ConfigFile::discover(args.config.as_deref())?.apply_to(&mut config);
    config.apply_env()?;
    if let Some(url) = args.api_url {
        config.api_url = url;
    }
    if let Some(n) = args.max_results {
        config.max_results_per_query = n;
    }
    if let Some(n) = args.max_queries {
        config.max_queries = n;
    }
    let client = ResearchClient::new(&config)?;

    let initial_query = Some(args.query.join(" ")).filter(|q| !q.is_empty());

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    // Install panic hook that restores terminal before printing panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Drain any stray input events (e.g. Enter keypress from launching the command)
    while event::poll(Duration::from_millis(50)).unwrap_or(false) {
        let _ = event::read();
    }

    let mut app = App::new(initial_query);
    let size = terminal.size()?;
    app.update(action::Action::Resize(size.width, size.height));

    let (tx, mut rx) = mpsc::unbounded_channel();

    // Also handle Ctrl+C at the OS level for clean shutdown
    let shutdown = CancellationToken::new();
    let shutdown_for_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown_for_signal.cancel();
        }
    });

    // Main event loop
    let tick_rate = Duration::from_millis(100);

    loop {
        if let Some(launch) = app.take_launch() {
            let request = config.search_request(launch.query);
            tokio::spawn(backend::run_search(
                client.clone(),
                request,
                launch.generation,
                tx.clone(),
                launch.cancel,
            ));
        }

        // Draw
        terminal.draw(|f| app.view(f))?;

        tokio::select! {
            // Backend events (non-blocking drain)
            Some(backend_event) = rx.recv() => {
                app.handle_backend_event(backend_event);
                while let Ok(evt) = rx.try_recv() {
                    app.handle_backend_event(evt);
                }
            }
            // Terminal input events
            _ = async {
                if event::poll(tick_rate).unwrap_or(false) {
                    if let Ok(evt) = event::read() {
                        let action = input::map_event(&evt, app.editing);
                        app.update(action);
                    }
                }
            } => {}
        }

        // Process tick
        app.update(action::Action::Tick);

        if app.should_quit || shutdown.is_cancelled() {
            if let Some(cancel) = &app.cancel {
                cancel.cancel();
            }
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    Ok(())
}
