//! Periodic on-chain balance reconciliation (spec §4.12).
//!
//! Structurally this is `position::price_feed::PriceFeed::start`'s
//! interval-driven polling loop, retargeted from price polling onto balance
//! reconciliation: an `interval` ticks, a `tokio::select!` also watches a
//! shutdown broadcast, and each tick fans out over the tracked set (here,
//! open positions plus any wallet balance) instead of monitored mints.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{info, warn};

use crate::config::ReconcilerConfig;
use crate::core::interfaces::{CoreEvent, EventSender, SwapExecutor, TradeJournal};
use crate::core::position_manager::PositionManager;
use crate::core::types::{TokenId, Timestamp};

/// A wallet balance the executor reports for a mint the Position Manager has
/// no record of. The reconciler never acts on this autonomously; it only
/// surfaces the event for an operator.
#[derive(Debug, Clone)]
pub struct OrphanToken {
    pub mint: TokenId,
    pub balance: u128,
}

/// Runs a periodic reconcile pass: phantom detection (delegated to the
/// Position Manager) plus orphan-token detection against a caller-supplied
/// set of known mints.
pub struct Reconciler {
    config: ReconcilerConfig,
    positions: Arc<PositionManager>,
    events: EventSender,
}

impl Reconciler {
    pub fn new(config: ReconcilerConfig, positions: Arc<PositionManager>, events: EventSender) -> Self {
        Self {
            config,
            positions,
            events,
        }
    }

    /// One reconciliation pass: closes phantom positions, then checks
    /// `wallet_mints` (balances the executor reports as held) for entries
    /// with no corresponding open position.
    pub async fn reconcile_once(
        &self,
        executor: &dyn SwapExecutor,
        journal: &dyn TradeJournal,
        wallet_mints: &[(TokenId, u128)],
        now: Timestamp,
    ) -> Vec<OrphanToken> {
        let closed = self
            .positions
            .reconcile(self.config.phantom_fraction, executor, journal, now)
            .await;
        if !closed.is_empty() {
            info!(count = closed.len(), "reconciler closed phantom positions");
        }

        let known: HashSet<TokenId> = self
            .positions
            .all_open()
            .into_iter()
            .map(|p| p.mint)
            .collect();

        let mut orphans = Vec::new();
        for (mint, balance) in wallet_mints {
            if *balance > 0 && !known.contains(mint) {
                let orphan = OrphanToken {
                    mint: mint.clone(),
                    balance: *balance,
                };
                warn!(%mint, balance, "orphan token balance with no matching position");
                let _ = self.events.send(CoreEvent::OrphanDetected {
                    mint: mint.clone(),
                    balance: *balance,
                });
                orphans.push(orphan);
            }
        }
        orphans
    }

    /// Spawns the interval-driven reconciliation loop. `wallet_mints_fn` is
    /// polled fresh each tick (the reconciler has no opinion on how balances
    /// are enumerated — that is an executor/adapter concern).
    pub fn start<F, Fut>(
        self: Arc<Self>,
        executor: Arc<dyn SwapExecutor>,
        journal: Arc<dyn TradeJournal>,
        wallet_mints_fn: F,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Vec<(TokenId, u128)>> + Send + 'static,
    {
        let poll_interval = Duration::from_secs(self.config.interval_secs);
        tokio::spawn(async move {
            let mut ticker = interval(poll_interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let wallet_mints = wallet_mints_fn().await;
                        let _ = self
                            .reconcile_once(executor.as_ref(), journal.as_ref(), &wallet_mints, Timestamp::now())
                            .await;
                    }
                    _ = shutdown_rx.recv() => {
                        info!("reconciler loop shutting down");
                        break;
                    }
                }
            }
        });
    }
}
