//! CLI command implementations.
//!
//! None of these commands talk to a live chain: `core::interfaces` names the
//! adapter boundaries but a concrete on-chain feed/executor is out of scope
//! for this crate (spec §1), so `run` and `simulate` both drive the
//! orchestrator with the in-memory paper adapters from `core::interfaces::test_doubles`.

use std::io::{BufRead, BufReader};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::config::Config;
use crate::core::interfaces::test_doubles::{InMemoryTradeJournal, NullMarketDataProvider, NullSwapExecutor};
use crate::core::interfaces::{DataFeed, FeedEvent};
use crate::core::Orchestrator;

/// A [`DataFeed`] that replays a pre-recorded, in-memory sequence of events.
/// Used by `simulate` to drive the pipeline without a live feed.
struct ReplayFeed {
    events: Mutex<VecDeque<FeedEvent>>,
}

#[async_trait]
impl DataFeed for ReplayFeed {
    async fn next_event(&mut self) -> Option<FeedEvent> {
        self.events.lock().pop_front()
    }
}

/// A [`DataFeed`] that never produces an event and never closes. Stands in
/// for the live feed adapter `run` has no concrete implementation of (spec
/// §1 scopes feed adapters out of this crate); it keeps the orchestrator's
/// `select!` loop parked on its `shutdown_rx` arm instead of exiting the
/// instant a feed with nothing queued would.
struct IdleFeed;

#[async_trait]
impl DataFeed for IdleFeed {
    async fn next_event(&mut self) -> Option<FeedEvent> {
        std::future::pending().await
    }
}

fn load_fixture(path: &str) -> Result<Vec<FeedEvent>> {
    let file = std::fs::File::open(path).with_context(|| format!("opening fixture {}", path))?;
    let reader = BufReader::new(file);
    let mut events = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading line {} of {}", line_no + 1, path))?;
        if line.trim().is_empty() {
            continue;
        }
        let event: FeedEvent = serde_json::from_str(&line)
            .with_context(|| format!("parsing FeedEvent at line {} of {}", line_no + 1, path))?;
        events.push(event);
    }
    Ok(events)
}

/// Runs the orchestrator against the paper executor until `Ctrl+C`. No
/// concrete on-chain feed adapter lives in this crate (spec §1), so this
/// binds an [`IdleFeed`] in place of one: the orchestrator stays up with
/// nothing to process, which is enough to exercise startup/shutdown and the
/// stats reporter. `dry_run` forces `enable_trading` off regardless of the
/// loaded config.
pub async fn run(mut config: Config, dry_run: bool) -> Result<()> {
    if dry_run {
        info!("dry-run requested, disabling trade submission");
        config.orchestrator.enable_trading = false;
    }

    let (events_tx, mut events_rx) = crate::core::interfaces::event_channel(256);
    let orchestrator = Orchestrator::new(
        config,
        Arc::new(NullMarketDataProvider),
        Arc::new(NullSwapExecutor::default()),
        Arc::new(InMemoryTradeJournal::default()),
        events_tx,
    );

    tokio::spawn(async move {
        while let Ok(event) = events_rx.recv().await {
            info!(?event, "core event");
        }
    });

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let feed: Box<dyn DataFeed> = Box::new(IdleFeed);

    tokio::spawn({
        let shutdown_tx = shutdown_tx.clone();
        async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
            let _ = shutdown_tx.send(());
        }
    });

    orchestrator.run(feed, shutdown_rx).await;
    Ok(())
}

/// Replays a JSONL fixture of `FeedEvent`s through the pipeline with trading
/// forced off, then prints the resulting position/risk snapshot.
pub async fn simulate(mut config: Config, fixture_path: &str) -> Result<()> {
    config.orchestrator.enable_trading = false;
    let events = load_fixture(fixture_path)?;
    info!(count = events.len(), fixture = fixture_path, "loaded simulation fixture");

    let (events_tx, mut events_rx) = crate::core::interfaces::event_channel(256);
    let orchestrator = Orchestrator::new(
        config,
        Arc::new(NullMarketDataProvider),
        Arc::new(NullSwapExecutor::default()),
        Arc::new(InMemoryTradeJournal::default()),
        events_tx,
    );

    tokio::spawn(async move {
        while let Ok(event) = events_rx.recv().await {
            info!(?event, "core event");
        }
    });

    let feed: Box<dyn DataFeed> = Box::new(ReplayFeed {
        events: Mutex::new(events.into_iter().collect()),
    });
    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

    orchestrator.run(feed, shutdown_rx).await;

    let stats = orchestrator.stats().await;
    println!("simulation complete:");
    println!("  open positions:      {}", stats.open_position_count);
    println!("  unrealized pnl (sol): {:.4}", stats.total_unrealized_pnl_sol);
    println!("  daily trades:         {}", stats.daily_stats.total_trades);
    println!("  daily win rate:       {:.1}%", stats.daily_stats.win_rate() * 100.0);
    println!("  risk paused:          {}", stats.risk_state.is_paused);
    Ok(())
}

/// Dumps the current risk state and open-position summary. Since this
/// binary holds no persistent orchestrator across invocations, `status`
/// reports the configuration's resting state rather than a live snapshot.
pub async fn status(config: &Config) -> Result<()> {
    println!("Signal-to-Trade Core — configuration-derived status");
    println!("  trading enabled:        {}", config.orchestrator.enable_trading);
    println!("  max concurrent positions: {}", config.risk.max_concurrent_positions);
    println!("  daily loss limit (sol): {:.3}", config.risk.daily_loss_limit_sol);
    println!("  max drawdown:           {:.1}%", config.risk.max_drawdown * 100.0);
    println!(
        "  min score to trade:     {}",
        config.scoring.min_score_to_trade
    );
    println!(
        "note: this reflects configuration only; run `stc run` for a live orchestrator instance."
    );
    Ok(())
}

/// Prints the loaded configuration. No secrets are currently held in
/// `Config` (the core takes wallet/RPC credentials from the embedding
/// application), so nothing needs masking, but the format matches what the
/// teacher's `Config` command showed.
pub fn show_config(config: &Config) -> Result<()> {
    let json = serde_json::to_string_pretty(config).context("serializing configuration")?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_fixture_parses_newline_delimited_feed_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.jsonl");
        std::fs::write(
            &path,
            r#"{"Price":["So11111111111111111111111111111111111111112",{"timestamp":0,"price_sol":0.001,"price_usd":0.1,"market_cap_sol":20.0,"liquidity":5.0,"volume_24h":1.0}]}
"#,
        )
        .unwrap();

        let events = load_fixture(path.to_str().unwrap()).unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], FeedEvent::Price(_, _)));
    }

    #[test]
    fn load_fixture_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.jsonl");
        std::fs::write(&path, "\n\n").unwrap();
        let events = load_fixture(path.to_str().unwrap()).unwrap();
        assert!(events.is_empty());
    }
}
