use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use papertree_core::{
    Config, ConfigFile, PaperFilter, ResearchClient, ResearchEngine, StreamOutcome,
};
use papertree_reporting::ExportFormat;

mod output;

/// Papertree - turn a research question into a tree of arXiv papers
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Natural-language research question
    #[arg(required = true, num_args = 1..)]
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

    /// Only list papers scoring at least this relevance (0.0 - 1.0)
    #[arg(long)]
    min_score: Option<f64>,

    /// Only list papers in these arXiv categories (comma-separated)
    #[arg(long, value_delimiter = ',')]
    category: Vec<String>,

    /// Only list papers published on or after this date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    since: Option<NaiveDate>,

    /// Export the finished tree (json or markdown)
    #[arg(long)]
    export: Option<ExportFormat>,

    /// Write the export to this file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("{s:?}: {e}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // Resolve config: CLI flags > env vars > config file > defaults
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
    config.validate()?;

    let filter = PaperFilter {
        min_score: args.min_score.unwrap_or(0.0).clamp(0.0, 1.0),
        categories: args.category.iter().cloned().collect(),
        published_after: args.since,
        ..PaperFilter::default()
    };

    let export_format = match (args.export, &args.output) {
        (Some(format), _) => Some(format),
        (None, Some(path)) => {
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
            Some(ext.parse::<ExportFormat>().map_err(anyhow::Error::msg).with_context(|| {
                format!("cannot infer export format from {}", path.display())
            })?)
        }
        (None, None) => None,
    };

    let client = ResearchClient::new(&config)?;
    let request = config.search_request(args.query.join(" "));
    let mut engine = ResearchEngine::new();

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg:<24} [{bar:30.cyan/blue}] {pos}/{len}")?
            .progress_chars("=>-"),
    );
    bar.enable_steady_tick(Duration::from_millis(100));

    let progress_bar = bar.clone();
    engine.subscribe_progress(move |state| {
        progress_bar.set_length(state.total as u64);
        progress_bar.set_position(state.current as u64);
        progress_bar.set_message(state.phase.label());
    });

    // Announce each query once its results have landed
    let announce_bar = bar.clone();
    let announced = Mutex::new(HashSet::new());
    let color = !args.no_color;
    engine.subscribe(move |snapshot| {
        let Ok(mut announced) = announced.lock() else {
            return;
        };
        for node in snapshot.query_nodes.iter().filter(|n| n.received) {
            if announced.insert(node.id) {
                announce_bar.println(output::query_line(node, color));
            }
        }
    });

    let cancel = CancellationToken::new();
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_for_signal.cancel();
        }
    });

    let result = engine.run(&client, &request, &cancel).await;
    bar.finish_and_clear();

    let snapshot = engine.snapshot();
    let printing_export = export_format.is_some() && args.output.is_none();
    if !printing_export {
        output::print_summary(&snapshot, &filter, color);
    }
    if !engine.decode_errors().is_empty() {
        log::warn!(
            "{} stream record(s) could not be decoded",
            engine.decode_errors().len()
        );
    }

    match &result {
        Ok(StreamOutcome::Completed { records }) => {
            log::info!("search finished after {records} records");
        }
        Ok(StreamOutcome::Cancelled) => {
            eprintln!("Search cancelled; showing partial results.");
        }
        Err(err) => {
            eprintln!("Search failed: {err}");
        }
    }

    if let Some(format) = export_format {
        let content = papertree_reporting::export(&snapshot, format)?;
        match &args.output {
            Some(path) => {
                std::fs::write(path, content)
                    .with_context(|| format!("cannot write {}", path.display()))?;
                eprintln!("Wrote {} export to {}", format, path.display());
            }
            None => println!("{content}"),
        }
    }

    result?;
    Ok(())
}
