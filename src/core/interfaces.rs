//! External collaborator boundaries (spec §6). The core depends only on
//! these traits; concrete feed/execution/storage adapters are out of scope
//! and are expected to be supplied by the embedding application.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::smart_money::WalletTradeStats;
use crate::core::types::{
    CloseReason, EquitySnapshot, NewTokenEvent, Position, PriceSample, RiskKind, TokenId,
    TokenMetadata, TokenScore, TradeEvent, WalletId,
};
use crate::error::Result;

/// Urgency hint passed to the executor; affects priority fee / slippage
/// tolerance at the adapter's discretion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Normal,
    High,
    Immediate,
}

#[derive(Debug, Clone)]
pub struct BuyOutcome {
    pub signature: String,
    pub tokens_received: u128,
    pub price_effective: f64,
}

#[derive(Debug, Clone)]
pub struct SellOutcome {
    pub signature: String,
    pub sol_received: f64,
    pub price_effective: f64,
}

/// Inbound event stream. The core makes no assumption about transport;
/// adapters must deliver events in per-mint timestamp order. Serializable so
/// fixtures for `cli simulate` can be recorded as JSONL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FeedEvent {
    NewToken(NewTokenEvent),
    Trade(TradeEvent),
    Price(TokenId, PriceSample),
}

/// Abstract inbound data source. Concrete adapters (websocket streams, RPC
/// pollers) live outside this crate.
#[async_trait]
pub trait DataFeed: Send + Sync {
    async fn next_event(&mut self) -> Option<FeedEvent>;
}

/// Abstract outbound execution venue. Error kinds follow spec §6 / §7:
/// `InsufficientLiquidity`/`PriceImpactTooHigh`/`RouteNotFound` are
/// non-retryable; `RateLimited`/`NetworkError` retry with backoff.
#[async_trait]
pub trait SwapExecutor: Send + Sync {
    async fn buy(
        &self,
        mint: &TokenId,
        amount_sol: f64,
        slippage_bps: u32,
        urgency: Urgency,
    ) -> Result<BuyOutcome>;

    async fn sell(
        &self,
        mint: &TokenId,
        token_amount: u128,
        slippage_bps: u32,
        urgency: Urgency,
    ) -> Result<SellOutcome>;

    async fn token_balance(&self, mint: &TokenId) -> Result<u128>;

    async fn wallet_balance_sol(&self) -> Result<f64>;
}

/// Market-data lookups the pipeline needs but that the named boundaries
/// above don't cover: token authority/extension metadata (Safety Analyzer
/// input) and top-holder composition (Scoring Engine concentration +
/// Smart-Money Tracker input). A single holder fetch serves both, matching
/// the single `holder_fetch_timeout_ms` budget in the orchestrator config.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn fetch_metadata(&self, mint: &TokenId) -> Result<TokenMetadata>;

    /// Returns `(wallet, share_of_supply, trade_history)` for the top
    /// `limit` holders.
    async fn fetch_holders(
        &self,
        mint: &TokenId,
        limit: usize,
    ) -> Result<Vec<(WalletId, f64, WalletTradeStats)>>;

    async fn liquidity_usd(&self, mint: &TokenId) -> Result<f64>;
}

/// A journal entry recorded when a position opens.
#[derive(Debug, Clone)]
pub struct OpenRecord {
    pub position: Position,
    pub score: TokenScore,
}

/// A journal entry recorded when a position closes.
#[derive(Debug, Clone)]
pub struct ExitRecord {
    pub position_id: Uuid,
    pub reason: CloseReason,
    pub realized_pnl_sol: f64,
    pub was_estimated: bool,
}

/// Append-only trade journal. No schema is prescribed beyond the fields
/// referenced by the data model.
#[async_trait]
pub trait TradeJournal: Send + Sync {
    async fn open(&self, record: OpenRecord) -> Result<()>;
    async fn close(&self, exit: ExitRecord) -> Result<()>;
    async fn recent(&self, limit: usize) -> Result<Vec<OpenRecord>>;
    async fn for_training(&self, weeks: u32) -> Result<Vec<OpenRecord>>;
}

/// Periodic equity snapshot store.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn put(&self, snapshot: EquitySnapshot) -> Result<()>;
    async fn history(&self, hours: u32) -> Result<Vec<EquitySnapshot>>;
}

/// Observer-facing events emitted by the pipeline. Advisory; subscribers
/// must not assume ordering across mints.
#[derive(Debug, Clone)]
pub enum CoreEvent {
    TokenDiscovered { mint: TokenId },
    SafetyCheck { mint: TokenId, is_safe: bool, risks: Vec<RiskKind> },
    SmartMoneyCheck { mint: TokenId, count: usize },
    TradeDecision { mint: TokenId, approve: bool, size_sol: f64, reasons: Vec<String> },
    TradeExecuted { mint: TokenId, signature: String },
    PositionOpened { position_id: Uuid, mint: TokenId },
    PartialClose { position_id: Uuid, fraction: f64, realized_sol: f64 },
    PositionClosed { position_id: Uuid, reason: CloseReason, realized_pnl_sol: f64 },
    RugAlert { mint: TokenId, critical: bool },
    PhantomDetected { position_id: Uuid },
    OrphanDetected { mint: TokenId, balance: u128 },
    RiskPaused { reason: String },
    RiskResumed,
    StatsUpdate {
        open_position_count: usize,
        cache_hit_rate: f64,
        risk_paused: bool,
    },
}

/// Broadcast sender used by components to publish [`CoreEvent`]s to any
/// number of observers without blocking on a slow subscriber.
pub type EventSender = tokio::sync::broadcast::Sender<CoreEvent>;

pub fn event_channel(capacity: usize) -> (EventSender, tokio::sync::broadcast::Receiver<CoreEvent>) {
    tokio::sync::broadcast::channel(capacity)
}

/// In-memory test doubles, useful for simulation and unit tests.
pub mod test_doubles {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    #[derive(Default)]
    pub struct NullSwapExecutor {
        pub token_balances: Mutex<std::collections::HashMap<String, u128>>,
        pub wallet_balance_sol: Mutex<f64>,
    }

    #[async_trait]
    impl SwapExecutor for NullSwapExecutor {
        async fn buy(
            &self,
            _mint: &TokenId,
            amount_sol: f64,
            _slippage_bps: u32,
            _urgency: Urgency,
        ) -> Result<BuyOutcome> {
            Ok(BuyOutcome {
                signature: "null-buy".to_string(),
                tokens_received: (amount_sol * 1_000_000.0) as u128,
                price_effective: 0.001,
            })
        }

        async fn sell(
            &self,
            _mint: &TokenId,
            token_amount: u128,
            _slippage_bps: u32,
            _urgency: Urgency,
        ) -> Result<SellOutcome> {
            Ok(SellOutcome {
                signature: "null-sell".to_string(),
                sol_received: token_amount as f64 / 1_000_000.0,
                price_effective: 0.001,
            })
        }

        async fn token_balance(&self, mint: &TokenId) -> Result<u128> {
            Ok(*self
                .token_balances
                .lock()
                .get(mint.as_str())
                .unwrap_or(&0))
        }

        async fn wallet_balance_sol(&self) -> Result<f64> {
            Ok(*self.wallet_balance_sol.lock())
        }
    }

    /// Reports clean metadata, no holders and zero liquidity for every
    /// mint. Useful as a baseline that tests override per field.
    #[derive(Default)]
    pub struct NullMarketDataProvider;

    #[async_trait]
    impl MarketDataProvider for NullMarketDataProvider {
        async fn fetch_metadata(&self, _mint: &TokenId) -> Result<TokenMetadata> {
            Ok(TokenMetadata::default())
        }

        async fn fetch_holders(
            &self,
            _mint: &TokenId,
            _limit: usize,
        ) -> Result<Vec<(WalletId, f64, WalletTradeStats)>> {
            Ok(Vec::new())
        }

        async fn liquidity_usd(&self, _mint: &TokenId) -> Result<f64> {
            Ok(0.0)
        }
    }

    #[derive(Default)]
    pub struct InMemoryTradeJournal {
        opens: Mutex<Vec<OpenRecord>>,
        closes: Mutex<Vec<ExitRecord>>,
    }

    #[async_trait]
    impl TradeJournal for InMemoryTradeJournal {
        async fn open(&self, record: OpenRecord) -> Result<()> {
            self.opens.lock().push(record);
            Ok(())
        }

        async fn close(&self, exit: ExitRecord) -> Result<()> {
            self.closes.lock().push(exit);
            Ok(())
        }

        async fn recent(&self, limit: usize) -> Result<Vec<OpenRecord>> {
            let opens = self.opens.lock();
            Ok(opens.iter().rev().take(limit).cloned().collect())
        }

        async fn for_training(&self, _weeks: u32) -> Result<Vec<OpenRecord>> {
            Ok(self.opens.lock().clone())
        }
    }

    #[derive(Default)]
    pub struct InMemorySnapshotStore {
        snapshots: Mutex<VecDeque<EquitySnapshot>>,
    }

    #[async_trait]
    impl SnapshotStore for InMemorySnapshotStore {
        async fn put(&self, snapshot: EquitySnapshot) -> Result<()> {
            self.snapshots.lock().push_back(snapshot);
            Ok(())
        }

        async fn history(&self, hours: u32) -> Result<Vec<EquitySnapshot>> {
            let cutoff_ms = hours as i64 * 3_600_000;
            let snapshots = self.snapshots.lock();
            let newest = snapshots.back().map(|s| s.timestamp.millis()).unwrap_or(0);
            Ok(snapshots
                .iter()
                .filter(|s| newest - s.timestamp.millis() <= cutoff_ms)
                .cloned()
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_doubles::*;
    use super::*;

    #[tokio::test]
    async fn null_swap_executor_round_trips_a_buy_and_sell() {
        let executor = NullSwapExecutor::default();
        let mint = TokenId::new("So11111111111111111111111111111111111111112").unwrap();
        let buy = executor.buy(&mint, 1.0, 500, Urgency::Normal).await.unwrap();
        assert!(buy.tokens_received > 0);
        let sell = executor
            .sell(&mint, buy.tokens_received, 500, Urgency::Normal)
            .await
            .unwrap();
        assert!(sell.sol_received > 0.0);
    }

    #[tokio::test]
    async fn in_memory_journal_tracks_recent_opens() {
        use crate::core::types::{PoolType, PositionStatus, Timestamp};

        let journal = InMemoryTradeJournal::default();
        let mint = TokenId::new("So11111111111111111111111111111111111111112").unwrap();
        let position = Position {
            id: Uuid::new_v4(),
            mint: mint.clone(),
            symbol: "TEST".to_string(),
            entry_time: Timestamp::from_millis(0),
            entry_price: 1.0,
            entry_amount_sol: 1.0,
            entry_amount_tokens: 1_000_000,
            current_price: 1.0,
            highest_price: 1.0,
            stop_loss_fraction: 0.15,
            take_profit_ladder: Vec::new(),
            trailing_stop: None,
            tp_sold: Vec::new(),
            partial_close_realized_sol: 0.0,
            status: PositionStatus::Open,
            pool_type: PoolType::BondingCurve,
        };
        journal
            .open(OpenRecord {
                position: position.clone(),
                score: TokenScore {
                    total: 80,
                    safety: 40,
                    smart_money: 20,
                    liquidity: 15,
                    momentum: 5,
                    concentration_penalty_applied: false,
                    flags: Vec::new(),
                },
            })
            .await
            .unwrap();
        let recent = journal.recent(10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].position.mint, mint);
    }
}
