pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

pub use crate::core::config;

use crate::cli::{ui, views};
use crate::core::cache::Cache;
use crate::core::config::AppConfig;
use crate::core::investment::{Asset, PriceStatus};
use crate::core::remote::RemoteStore;
use anyhow::{Result, bail};
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use tracing::{debug, info};

/// Commands the CLI can dispatch; the binary maps clap args onto these.
pub enum AppCommand {
    List,
    Summary,
    Add { asset: Asset, notes: Option<String> },
    Edit { id: String, asset: Asset, notes: Option<String> },
    Remove { id: String },
    Refresh { force: bool, id: Option<String> },
    Retry,
    Sync,
    Pull,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Investment tracker starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    // One quote cache shared by both market providers
    let quote_cache = Arc::new(Cache::<String, f64>::new());

    let indodax_base = config
        .providers
        .indodax
        .as_ref()
        .map_or("https://indodax.com", |p| &p.base_url);
    let crypto_prices = Arc::new(providers::indodax::IndodaxProvider::new(
        indodax_base,
        Arc::clone(&quote_cache),
    ));

    let yahoo_base = config
        .providers
        .yahoo
        .as_ref()
        .map_or("https://query1.finance.yahoo.com", |p| &p.base_url);
    let stock_prices = Arc::new(providers::yahoo_finance::YahooFinanceProvider::new(
        yahoo_base,
        Arc::clone(&quote_cache),
    ));

    let remote: Option<Arc<dyn RemoteStore>> = match &config.sync {
        Some(sync) => Some(Arc::new(providers::remote_http::HttpRemoteStore::new(
            &sync.base_url,
            sync.api_key.clone(),
        )?)),
        None => None,
    };

    let snapshot = store::snapshot::SnapshotStore::open(&config.data_path()?)?;
    let investments = store::InvestmentStore::new(crypto_prices, stock_prices, remote);
    if let Some(saved) = snapshot.load()? {
        investments.seed(saved).await;
    }

    match command {
        AppCommand::List => {
            refresh_if_stale(&investments, &config).await;
            let records = investments.list().await;
            if records.is_empty() {
                println!("No investments recorded yet. Add one with `pundi add`.");
            } else {
                println!("{}", views::holdings_table(&records, &config.currency));
            }
            if let Some(error) = investments.last_update_error().await {
                println!(
                    "{}",
                    ui::style_text(&format!("Last price error: {error}"), ui::StyleType::Error)
                );
            }
        }
        AppCommand::Summary => {
            refresh_if_stale(&investments, &config).await;
            let summary = investments.summary().await;
            println!("{}", views::summary_block(&summary, &config.currency));
        }
        AppCommand::Add { asset, notes } => {
            let market = asset.is_market();
            let record = investments.create(asset, notes).await;
            if market {
                // Settle the first quote before the process exits.
                investments.refresh_all().await;
            }
            let record = investments.get(&record.id).await.unwrap_or(record);
            println!("{}", views::record_detail(&record, &config.currency));
            investments.sync_all().await;
        }
        AppCommand::Edit { id, asset, notes } => {
            let market = asset.is_market();
            match investments.update(&id, asset, notes).await {
                Some(_) => {
                    if market {
                        investments.refresh_all().await;
                    }
                    let record = investments.get(&id).await;
                    if let Some(record) = record {
                        println!("{}", views::record_detail(&record, &config.currency));
                    }
                    investments.sync_all().await;
                }
                None => bail!("No investment found with id {}", id),
            }
        }
        AppCommand::Remove { id } => {
            if investments.remove(&id).await {
                println!("Removed {id}");
            } else {
                bail!("No investment found with id {}", id);
            }
        }
        AppCommand::Refresh { force, id } => match id {
            Some(id) => match investments.refresh_one(&id).await {
                Some(record) => println!("{}", views::record_detail(&record, &config.currency)),
                None => bail!("No refreshable investment found with id {}", id),
            },
            None => {
                let spinner = refresh_spinner(&investments).await;
                let records = if force {
                    investments.force_refresh_all().await
                } else {
                    investments.refresh_all().await
                };
                spinner.finish_and_clear();
                println!("{}", views::holdings_table(&records, &config.currency));
            }
        },
        AppCommand::Retry => {
            let queued = investments.retry_failed_updates().await;
            if queued == 0 {
                println!("No failed price updates to retry.");
            } else {
                // The debounce timer will not outlive this process; settle now.
                let records = investments.refresh_all().await;
                println!("Re-quoted {queued} investment(s).");
                println!("{}", views::holdings_table(&records, &config.currency));
            }
        }
        AppCommand::Sync => {
            if config.sync.is_none() {
                bail!("Remote sync is not configured. Add a `sync:` section to the config.");
            }
            let outcomes = investments.sync_all().await;
            if outcomes.is_empty() {
                println!("Everything is already in sync.");
            } else {
                println!("{}", views::sync_outcomes_table(&outcomes));
            }
        }
        AppCommand::Pull => {
            let count = investments.load_from_cloud().await?;
            if count == 0 {
                println!("Remote returned no investments; local records kept.");
            } else {
                println!("Loaded {count} investment(s) from remote.");
                let records = investments.list().await;
                println!("{}", views::holdings_table(&records, &config.currency));
            }
        }
    }

    snapshot.save(&investments.list().await)?;
    Ok(())
}

/// Load-time refresh trigger: re-quote when any market record is pending,
/// failed, or settled longer ago than the configured staleness window.
async fn refresh_if_stale(investments: &store::InvestmentStore, config: &AppConfig) {
    let window = ChronoDuration::minutes(config.refresh_after_minutes as i64);
    let cutoff = Utc::now() - window;
    let stale = investments.list().await.iter().any(|record| {
        record.asset.is_market()
            && match record.price_status {
                PriceStatus::Updated => record.updated_at < cutoff,
                _ => true,
            }
    });
    if stale {
        debug!("Quotes are stale, refreshing");
        let spinner = refresh_spinner(investments).await;
        investments.refresh_all().await;
        spinner.finish_and_clear();
    }
}

async fn refresh_spinner(investments: &store::InvestmentStore) -> indicatif::ProgressBar {
    let count = investments.needing_update().await.len() as u64;
    let pb = ui::new_progress_bar(count.max(1), true);
    pb.set_message("Fetching prices...");
    pb
}
