//! Shared data model for the Signal-to-Trade Core.
//!
//! These types are exchanged across component boundaries by value or by
//! snapshot — no component holds a mutable reference into another's state.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Opaque base58 token mint address. Equality and hashing by bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenId(String);

impl TokenId {
    pub fn new(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        if s.len() < 32 || s.len() > 44 {
            return Err(Error::InvalidTokenId(s));
        }
        bs58::decode(&s)
            .into_vec()
            .map_err(|_| Error::InvalidTokenId(s.clone()))?;
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Same shape as [`TokenId`], distinct semantic type for wallet addresses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalletId(String);

impl WalletId {
    pub fn new(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        if s.len() < 32 || s.len() > 44 {
            return Err(Error::InvalidTokenId(s));
        }
        bs58::decode(&s)
            .into_vec()
            .map_err(|_| Error::InvalidTokenId(s.clone()))?;
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WalletId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic milliseconds since epoch. All rolling windows expire entries by
/// comparing timestamps, never by counting indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn millis(&self) -> i64 {
        self.0
    }

    pub fn saturating_sub_ms(&self, other: Timestamp) -> i64 {
        self.0.saturating_sub(other.0)
    }

    pub fn plus_ms(&self, ms: i64) -> Self {
        Self(self.0 + ms)
    }
}

impl std::ops::Sub for Timestamp {
    type Output = i64;
    fn sub(self, rhs: Timestamp) -> i64 {
        self.0 - rhs.0
    }
}

/// Side of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Buy,
    Sell,
}

/// Price/liquidity sample produced by external price adapters; consumed
/// read-only by Watchlist and Pump Detector. Series is monotonically
/// non-decreasing in timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSample {
    pub timestamp: Timestamp,
    pub price_sol: f64,
    pub price_usd: f64,
    pub market_cap_sol: f64,
    pub liquidity: f64,
    pub volume_24h: f64,
}

/// A single trade produced by the external feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeEvent {
    pub timestamp: Timestamp,
    pub mint: TokenId,
    pub trader: WalletId,
    pub side: Side,
    pub token_amount: u128,
    pub sol_amount: f64,
    pub market_cap_sol: f64,
    pub price_sol: f64,
    pub signature: String,
}

/// A newly discovered token, produced by the external feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTokenEvent {
    pub timestamp: Timestamp,
    pub mint: TokenId,
    pub creator: WalletId,
    pub symbol: String,
    pub name: String,
    pub initial_price_sol: f64,
    pub initial_market_cap_sol: f64,
    pub bonding_curve_key: Option<String>,
    pub virtual_sol: f64,
    pub virtual_tokens: f64,
}

/// Derived (not stored) 60-second trade metrics from the Velocity Tracker.
#[derive(Debug, Clone, Default)]
pub struct VelocityMetrics {
    pub tx_count: u32,
    pub buy_count: u32,
    pub sell_count: u32,
    pub unique_buyers: HashSet<WalletId>,
    pub unique_sellers: HashSet<WalletId>,
    pub tx_per_minute: f64,
    pub window_start: Option<Timestamp>,
}

impl VelocityMetrics {
    /// `buy_count / max(1, tx_count)`.
    pub fn buy_pressure(&self) -> f64 {
        self.buy_count as f64 / (self.tx_count.max(1) as f64)
    }
}

/// Pump-phase classification (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PumpPhase {
    Cold,
    Building,
    Hot,
    Peak,
    Dumping,
}

/// Derived pump metrics for a token at a point in time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PumpMetrics {
    pub phase: PumpPhase,
    pub heat: f64,
    pub volume_ratio: f64,
    pub price_velocity: f64,
    pub buy_pressure: f64,
    pub confidence: f64,
    pub pump_from_low: f64,
    pub heat_decay: f64,
    pub buy_pressure_decay: f64,
}

/// Risk kinds a [`SafetyResult`] may carry, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskKind {
    MintAuthorityActive,
    FreezeAuthorityActive,
    PermanentDelegate,
    HighTransferFee,
    TransferHook,
    MutableMetadata,
}

/// Token authority/extension metadata as reported by an external fetcher.
/// The Safety Analyzer is a pure function of this struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub mint_authority: Option<String>,
    pub freeze_authority: Option<String>,
    pub has_permanent_delegate: bool,
    pub transfer_fee_bps: u32,
    pub has_transfer_hook: bool,
    pub has_mutable_metadata: bool,
}

/// Result of a safety analysis, cached for 24h under `"token_safety:<mint>"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyResult {
    pub mint: TokenId,
    pub is_safe: bool,
    pub risks: Vec<RiskKind>,
    pub timestamp: Timestamp,
}

/// 0-100 composite score (spec §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenScore {
    pub total: u32,
    pub safety: u32,
    pub smart_money: u32,
    pub liquidity: u32,
    pub momentum: u32,
    pub concentration_penalty_applied: bool,
    pub flags: Vec<String>,
}

impl TokenScore {
    pub fn meets_minimum(&self, min_score_to_trade: u32) -> bool {
        self.total >= min_score_to_trade
    }
}

/// One rung of a take-profit ladder: sell `fraction_of_initial` of the
/// original token amount once price reaches `entry * price_multiple`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TPLevel {
    pub price_multiple: f64,
    pub fraction_of_initial: f64,
}

/// Trailing stop parameters: arms once price reaches
/// `entry * activation_multiple`, then fires on a `drawdown_fraction` pullback
/// from the highest price seen since arming.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrailingStop {
    pub activation_multiple: f64,
    pub drawdown_fraction: f64,
    pub armed: bool,
}

/// Lifecycle state of a [`Position`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionStatus {
    Open,
    Closing,
    Closed,
}

/// Terminal reason a position closed, or why it is currently closing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    StopLoss,
    TakeProfit,
    TrailingStop,
    PumpExit,
    RugDetected,
    Phantom,
    SellFailed,
    Manual,
}

/// Which pool the position is traded against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolType {
    BondingCurve,
    DexAmm,
}

/// An open (or closing/closed) trading position, exclusively owned by the
/// Position Manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: Uuid,
    pub mint: TokenId,
    pub symbol: String,
    pub entry_time: Timestamp,
    pub entry_price: f64,
    pub entry_amount_sol: f64,
    pub entry_amount_tokens: u128,
    pub current_price: f64,
    pub highest_price: f64,
    pub stop_loss_fraction: f64,
    pub take_profit_ladder: Vec<TPLevel>,
    pub trailing_stop: Option<TrailingStop>,
    pub tp_sold: Vec<bool>,
    pub partial_close_realized_sol: f64,
    pub status: PositionStatus,
    pub pool_type: PoolType,
}

impl Position {
    pub fn unrealized_pnl_sol(&self) -> f64 {
        let current_value_fraction = self.remaining_fraction();
        (self.current_price - self.entry_price) / self.entry_price.max(f64::EPSILON)
            * self.entry_amount_sol
            * current_value_fraction
    }

    pub fn unrealized_pnl_percent(&self) -> f64 {
        if self.entry_price == 0.0 {
            return 0.0;
        }
        (self.current_price - self.entry_price) / self.entry_price
    }

    /// Fraction of the initial token amount still held (1.0 minus whatever
    /// the TP ladder has already sold).
    pub fn remaining_fraction(&self) -> f64 {
        let sold: f64 = self
            .take_profit_ladder
            .iter()
            .zip(self.tp_sold.iter())
            .filter(|(_, sold)| **sold)
            .map(|(level, _)| level.fraction_of_initial)
            .sum();
        (1.0 - sold).max(0.0)
    }

    pub fn update_price(&mut self, price: f64) {
        self.current_price = price;
        if price > self.highest_price {
            self.highest_price = price;
        }
    }
}

/// Portfolio-wide risk state, exclusively owned by the Risk Guard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskState {
    pub is_paused: bool,
    pub pause_reason: Option<String>,
    pub pause_until: Option<Timestamp>,
    pub daily_pnl_sol: f64,
    pub high_water_mark: f64,
    pub current_drawdown: f64,
    pub consecutive_losses: u32,
    pub consecutive_wins: u32,
    pub open_position_count: usize,
}

impl Default for RiskState {
    fn default() -> Self {
        Self {
            is_paused: false,
            pause_reason: None,
            pause_until: None,
            daily_pnl_sol: 0.0,
            high_water_mark: 0.0,
            current_drawdown: 0.0,
            consecutive_losses: 0,
            consecutive_wins: 0,
            open_position_count: 0,
        }
    }
}

/// Source that triggered an equity snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSource {
    Periodic,
    TradeClose,
    Startup,
}

/// Point-in-time equity snapshot for the [`crate::core::interfaces::SnapshotStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquitySnapshot {
    pub timestamp: Timestamp,
    pub wallet_sol: f64,
    pub positions_value_sol: f64,
    pub total_equity_sol: f64,
    pub unrealized_pnl_sol: f64,
    pub position_count: usize,
    pub source: SnapshotSource,
}
