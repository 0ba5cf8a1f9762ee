//! Happy News command-line entrypoint.
//! Runs one load cycle (fetch, classify, flag new) and prints the happy list.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use happy_news::analyze::ai_adapter::build_scorer;
use happy_news::clock::SystemClock;
use happy_news::config::AppConfig;
use happy_news::feed::{categories, filter_by_categories};
use happy_news::ingest::NytSource;
use happy_news::pipeline::Progress;
use happy_news::session::Session;
use happy_news::storage::FileKvStore;

#[derive(Debug, Parser)]
#[command(name = "happy-news")]
#[command(about = "Fetch the newswire and print only the uplifting stories")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Drop all cached verdicts before loading
    #[arg(long)]
    clear_cache: bool,

    /// Forget the last visit, so every dated article is new
    #[arg(long)]
    reset_visit: bool,
}

/// Compact logs by default; `HAPPY_NEWS_LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("happy_news=info,warn"));

    let json = std::env::var("HAPPY_NEWS_LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parsed before anything touches storage: --help and bad flags exit here.
    let cli = Cli::parse();

    // Local .env is optional.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::load_default().context("loading configuration")?;
    let store = Arc::new(FileKvStore::new(cfg.cache.dir.clone()));
    let mut session = Session::new(store, Arc::new(SystemClock), cfg.session_settings());

    if cli.clear_cache {
        session.cache().clear();
    }
    if cli.reset_visit {
        session.tracker_mut().reset();
    }

    let scorer = build_scorer(&cfg.ai).context("building sentiment scorer")?;
    let source = NytSource::from_config(&cfg.source).context("building article source")?;

    let on_progress = |p: &Progress| {
        debug!(
            processed = p.processed,
            total = p.total,
            happy = p.happy.len(),
            "classification progress"
        );
    };

    let outcome = session
        .load(&source, scorer.as_ref(), &on_progress)
        .await
        .context("loading happy news")?;

    let cats = categories(&outcome.articles);
    let divider = outcome.divider_index;
    let shown = filter_by_categories(outcome.articles, &cfg.display.categories);

    println!(
        "{} happy articles ({} fetched, {} from cache)",
        shown.len(),
        outcome.fetched,
        outcome.cached
    );
    if !cats.is_empty() {
        let list: Vec<String> = cats.iter().map(|c| format!("{} ({})", c.name, c.count)).collect();
        println!("categories: {}", list.join(", "));
    }

    // The divider refers to the unfiltered list; recompute when a filter is active.
    let divider = if cfg.display.categories.is_empty() {
        divider
    } else {
        happy_news::tracker::divider_index(&shown)
    };

    for (i, a) in shown.iter().enumerate() {
        if divider == Some(i) {
            println!("---- earlier ----");
        }
        let score = a.sentiment.as_ref().map(|v| v.score).unwrap_or_default();
        let marker = if a.is_new { "*" } else { " " };
        println!(
            "{marker} [{score:>2}] {} ({})",
            a.headline,
            a.section.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}
