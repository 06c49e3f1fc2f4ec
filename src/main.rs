use anyhow::Result;
use channel_leads::config::{api_key_from_env, Config};
use channel_leads::contact::HttpPageFetcher;
use channel_leads::pipeline::{self, Pipeline};
use channel_leads::quota::QuotaTracker;
use channel_leads::retry::RetryPolicy;
use channel_leads::storage::{self, Ledger};
use channel_leads::youtube::YouTubeClient;
use channel_leads::{export, keywords, logger};
use chrono::Utc;
use std::path::PathBuf;
use tracing::info;

fn main() -> Result<()> {
    logger::init()?;

    let root = PathBuf::from(std::env::var("ROOT").unwrap_or_else(|_| ".".to_string()));

    // Everything that can fail without the network fails here
    let config = Config::load(&root)?;
    let paths = config.paths.resolve(&root);
    let api_key = api_key_from_env()?;
    let pool = storage::load_keyword_pool(&paths.keyword_pool)?;

    let now = Utc::now();
    let today = now.date_naive();
    let date_key = today.format("%Y%m%d").to_string();
    let keywords = keywords::select(&pool, config.daily_keyword_count, &date_key);
    println!("Keywords ({}): {}", keywords.len(), keywords.join(", "));

    let mut ledger = Ledger::open(&paths.ledger)?;
    let client = YouTubeClient::new(api_key, &config.http)?;
    let fetcher = HttpPageFetcher::new(&config)?;
    let quota = QuotaTracker::from_config(&config.quota);
    let retry = RetryPolicy::from_config(&config.http);

    // Quota exhaustion is absorbed by the run; only credential errors surface
    let report = Pipeline::new(&config, &client, &fetcher, &quota, &retry, now).run(&keywords, &ledger)?;

    let out_path = export::output_path(&paths.out_dir, &paths.source_label, today);
    let added = pipeline::publish(&report, &out_path, &mut ledger)?;
    info!(added, ledger = ledger.len(), "Ledger committed");

    println!("{}", report.summary_line(&out_path));
    if let Some(hint) = report.shortfall_hint(&config) {
        eprintln!("Warning: {}", hint);
    }

    Ok(())
}
