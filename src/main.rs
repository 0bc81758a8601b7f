// SPDX-License-Identifier: MPL-2.0

mod cache;
mod config;
mod pipeline;
mod reddit;
mod report;
mod runtime;
mod sentiment;
mod state;
mod ui;

use anyhow::{Context, Result, anyhow};
use cache::CacheDb;
use clap::Parser;
use pipeline::CommentPipeline;
use reddit::{RedditClient, post_id_from_url};
use sentiment::LexiconScorer;
use state::{AppSettings, RefreshContext, RefreshController, RefreshInterval, RefreshOutcome};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use ui::Dashboard;

/// Track the sentiment of a Reddit thread's comments over time
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Thread URL, e.g. https://www.reddit.com/r/rust/comments/abc123/title/
    url: Option<String>,

    /// Minimum seconds between re-fetches of the thread
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(30..=300))]
    interval: Option<u64>,

    /// Seconds between re-renders in watch mode
    #[arg(long, default_value_t = 10)]
    tick: u64,

    /// Render once and exit
    #[arg(long)]
    once: bool,

    /// Path to the comment database (overrides settings and THREADMOOD_DB)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Name of the view cache session
    #[arg(long, default_value = "cli")]
    session: String,

    /// Emit the dashboard as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Write the effective settings to the settings file and exit
    #[arg(long)]
    init_config: bool,
}

fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the dashboard
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();

    let mut settings = AppSettings::load();
    if let Some(secs) = args.interval {
        settings.refresh_interval = RefreshInterval::new(secs)
            .ok_or_else(|| anyhow!("refresh interval out of range: {}", secs))?;
    }
    if let Some(db) = args.db.clone() {
        settings.db_path = Some(db);
    }

    if args.init_config {
        let path = settings.save().context("failed to save settings")?;
        info!("Settings written to {}", path.display());
        return Ok(());
    }

    let url = args
        .url
        .as_deref()
        .ok_or_else(|| anyhow!("a thread URL is required"))?;
    let post_id = post_id_from_url(url).ok_or_else(|| anyhow!("invalid Reddit post URL: {}", url))?;

    let client =
        RedditClient::new(settings.credentials.clone()).context("failed to set up API client")?;
    let db = match &settings.db_path {
        Some(path) => CacheDb::open(path),
        None => CacheDb::open_default(),
    }
    .context("failed to open comment database")?;
    let scorer = LexiconScorer::new();

    info!(
        "Watching post {} - interval={}s, session={}",
        post_id,
        settings.refresh_interval.secs(),
        args.session
    );

    let mut controller = RefreshController::new(
        CommentPipeline::new(&client, &scorer, &db),
        settings.refresh_interval,
    );
    let mut ctx = RefreshContext::new();

    loop {
        let view = controller
            .render(&mut ctx, &args.session, &post_id, Instant::now())
            .context("refresh failed")?;

        if args.once || view.outcome != RefreshOutcome::Cached {
            let dashboard = Dashboard::new(&post_id, view.comments, &view.outcome);
            if args.json {
                println!("{}", dashboard.to_json()?);
            } else {
                println!("{}", dashboard.to_text());
            }
        } else {
            debug!("View unchanged - new_this_round={}", view.new_this_round());
        }

        if args.once {
            break;
        }
        std::thread::sleep(Duration::from_secs(args.tick.max(1)));
    }

    Ok(())
}
