use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use medianwatch_common::{Config, Suburb};
use medianwatch_scout::fetcher::ChromeFetcher;
use medianwatch_scout::pipeline::report::MarketReport;
use medianwatch_scout::run_log::RunLog;
use medianwatch_scout::scout::Scout;
use medianwatch_scout::sources;

/// Scrape median market statistics for the tracked suburbs and merge new
/// observations into the report.
#[derive(Parser)]
#[command(name = "medianwatch-scout")]
struct Args {
    /// Report file to merge into (overrides REPORT_PATH).
    #[arg(long)]
    report: Option<PathBuf>,

    /// Process only these suburb slugs (repeatable). Defaults to the full
    /// tracked list; order always follows the tracked list.
    #[arg(long = "suburb")]
    suburbs: Vec<String>,

    /// Override the session retry bound.
    #[arg(long)]
    max_retries: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("medianwatch=info".parse()?))
        .init();

    info!("Medianwatch scout starting...");

    let args = Args::parse();
    let mut config = Config::from_env();
    if let Some(report) = args.report {
        config.report_path = report;
    }
    if let Some(max_retries) = args.max_retries {
        config.max_session_retries = max_retries;
    }
    config.log_summary();

    let tracked = sources::tracked_suburbs();
    let suburbs: Vec<Suburb> = if args.suburbs.is_empty() {
        tracked.iter().map(|slug| Suburb::from_slug(slug)).collect()
    } else {
        tracked
            .iter()
            .filter(|slug| args.suburbs.iter().any(|wanted| wanted.as_str() == **slug))
            .map(|slug| Suburb::from_slug(slug))
            .collect()
    };
    if suburbs.is_empty() {
        anyhow::bail!("no tracked suburbs matched the --suburb filter");
    }

    let report = MarketReport::load(&config.report_path)?;
    let fetcher = Arc::new(ChromeFetcher::new(&config));
    let mut run_log = RunLog::new(Uuid::new_v4().to_string());

    let mut scout = Scout::new(fetcher, report, config.clone(), suburbs);
    let stats = scout.run(&mut run_log).await;
    run_log.save(&stats, &config.data_dir)?;

    info!("Scout run complete. {stats}");

    if stats.aborted {
        anyhow::bail!(
            "run aborted after {} session retries",
            config.max_session_retries
        );
    }
    Ok(())
}
