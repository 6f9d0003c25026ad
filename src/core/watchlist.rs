//! Per-token records and hard (instant-reject) filters (spec §4.3).

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::config::WatchlistConfig;
use crate::core::rolling_window::RollingWindow;
use crate::core::types::{PriceSample, TokenId, TradeEvent, WalletId};

const VOLUME_BUCKET_MS: i64 = 30_000;
const DEV_SELL_CLAMP_STEP: f64 = 0.1;
const DEV_AGE_THRESHOLD_MS: i64 = 180_000;
const DEV_SOLD_THRESHOLD_YOUNG: f64 = 0.02;
const DEV_SOLD_THRESHOLD_OLD: f64 = 0.05;
const UNIQUE_TRADER_GROWTH_SAMPLES: usize = 10;

/// `prices` window bound (spec §3): 300 samples *and* 5 minutes.
const PRICE_WINDOW_CAPACITY: usize = 300;
const PRICE_WINDOW_MAX_AGE_MS: i64 = 5 * 60_000;
/// `trades` window bound (spec §3): 500 trades *and* 60 seconds.
const TRADE_WINDOW_CAPACITY: usize = 500;
const TRADE_WINDOW_MAX_AGE_MS: i64 = 60_000;

/// Why a token was rejected by the hard filter gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HardFilterResult {
    Pass,
    Reject(&'static str),
}

/// Derived features handed to the Scoring Engine / Entry Evaluator.
#[derive(Debug, Clone)]
pub struct WatchlistFeatures {
    pub price_change: f64,
    pub volatility: f64,
    pub drawdown: f64,
    pub buy_pressure: f64,
    pub volume_trend: f64,
    pub age_seconds: i64,
    pub unique_traders: usize,
    pub dev_holding_residual: f64,
    pub volume_acceleration: f64,
    pub unique_trader_growth: f64,
    pub momentum_override: bool,
}

#[derive(Debug, Clone, Default)]
struct VolumeBucket {
    bucket_start_ms: i64,
    volume_sol: f64,
}

/// A token under observation, from the moment it is first seen until it
/// ages out or is rejected by a hard filter.
#[derive(Debug, Clone)]
pub struct WatchedToken {
    pub mint: TokenId,
    pub creator: WalletId,
    pub first_seen: crate::core::types::Timestamp,
    pub prices: RollingWindow<PriceSample>,
    pub trades: RollingWindow<TradeEvent>,
    pub peak_price: f64,
    pub lowest_price: f64,
    pub dev_initial_holding: u128,
    pub dev_sold_percent: f64,
    pub dev_flagged: bool,
    pub unique_traders: HashSet<WalletId>,
    unique_trader_growth_samples: Vec<usize>,
    buckets: Vec<VolumeBucket>,
    ready_emitted: bool,
}

impl WatchedToken {
    fn new(mint: TokenId, creator: WalletId, now: crate::core::types::Timestamp) -> Self {
        Self {
            mint,
            creator,
            first_seen: now,
            prices: RollingWindow::new(PRICE_WINDOW_CAPACITY, Some(PRICE_WINDOW_MAX_AGE_MS)),
            trades: RollingWindow::new(TRADE_WINDOW_CAPACITY, Some(TRADE_WINDOW_MAX_AGE_MS)),
            peak_price: 0.0,
            lowest_price: f64::MAX,
            dev_initial_holding: 0,
            dev_sold_percent: 0.0,
            dev_flagged: false,
            unique_traders: HashSet::new(),
            unique_trader_growth_samples: Vec::new(),
            buckets: Vec::new(),
            ready_emitted: false,
        }
    }

    fn age_ms(&self, now: crate::core::types::Timestamp) -> i64 {
        now.saturating_sub_ms(self.first_seen)
    }

    fn latest_price(&self) -> Option<&PriceSample> {
        self.prices.newest().map(|(_, p)| p)
    }

    fn price_at_or_before(&self, cutoff_ms_ago: i64, now: crate::core::types::Timestamp) -> Option<f64> {
        self.prices
            .iter_newest_first()
            .find(|(ts, _)| now.saturating_sub_ms(*ts) >= cutoff_ms_ago)
            .map(|(_, p)| p.price_sol)
    }
}

/// Events the Watchlist emits. Advisory only — consumers must not assume
/// ordering across different mints.
#[derive(Debug, Clone)]
pub enum WatchlistEvent {
    TokenAdded { mint: TokenId },
    TokenRemoved { mint: TokenId },
    DevSold { mint: TokenId, sold_percent: f64 },
    TokenReady { mint: TokenId },
}

/// Maintains `WatchedToken` records and applies hard filters.
pub struct Watchlist {
    config: WatchlistConfig,
    tokens: HashMap<TokenId, WatchedToken>,
    events: Vec<WatchlistEvent>,
}

impl Watchlist {
    pub fn new(config: WatchlistConfig) -> Self {
        Self {
            config,
            tokens: HashMap::new(),
            events: Vec::new(),
        }
    }

    /// Drains and returns events emitted since the last call.
    pub fn drain_events(&mut self) -> Vec<WatchlistEvent> {
        std::mem::take(&mut self.events)
    }

    /// Idempotent: re-adding an already-tracked mint is a no-op.
    pub fn add(&mut self, mint: TokenId, creator: WalletId, now: crate::core::types::Timestamp) {
        if self.tokens.contains_key(&mint) {
            return;
        }
        self.events.push(WatchlistEvent::TokenAdded {
            mint: mint.clone(),
        });
        self.tokens
            .insert(mint.clone(), WatchedToken::new(mint, creator, now));
    }

    pub fn get(&self, mint: &TokenId) -> Option<&WatchedToken> {
        self.tokens.get(mint)
    }

    pub fn record_price(&mut self, mint: &TokenId, sample: PriceSample) {
        let min_data_points = self.config.min_data_points;
        let Some(token) = self.tokens.get_mut(mint) else {
            return;
        };
        token.peak_price = token.peak_price.max(sample.price_sol);
        token.lowest_price = token.lowest_price.min(sample.price_sol);
        let ts = sample.timestamp;
        token.prices.push(ts, sample);

        if !token.ready_emitted && token.prices.len() == min_data_points {
            token.ready_emitted = true;
            self.events.push(WatchlistEvent::TokenReady {
                mint: mint.clone(),
            });
        }
    }

    /// Dedups by signature: feeding the same trade twice does not
    /// double-count it against unique traders, volume buckets, or dev-sell
    /// accounting.
    pub fn record_trade(&mut self, mint: &TokenId, trade: TradeEvent, now: crate::core::types::Timestamp) {
        let Some(token) = self.tokens.get_mut(mint) else {
            return;
        };
        if token
            .trades
            .iter()
            .any(|(_, t)| t.signature == trade.signature)
        {
            return;
        }

        token.unique_traders.insert(trade.trader.clone());
        token
            .unique_trader_growth_samples
            .push(token.unique_traders.len());
        if token.unique_trader_growth_samples.len() > UNIQUE_TRADER_GROWTH_SAMPLES {
            token.unique_trader_growth_samples.remove(0);
        }

        let bucket_start = (trade.timestamp.millis() / VOLUME_BUCKET_MS) * VOLUME_BUCKET_MS;
        match token.buckets.last_mut() {
            Some(b) if b.bucket_start_ms == bucket_start => b.volume_sol += trade.sol_amount,
            _ => token.buckets.push(VolumeBucket {
                bucket_start_ms: bucket_start,
                volume_sol: trade.sol_amount,
            }),
        }

        let is_dev_trade = trade.trader == token.creator;
        let trade_ts = trade.timestamp;
        token.trades.push(trade_ts, trade.clone());

        if is_dev_trade {
            self.apply_dev_trade(mint, &trade, now);
        }
    }

    fn apply_dev_trade(&mut self, mint: &TokenId, trade: &TradeEvent, now: crate::core::types::Timestamp) {
        let Some(token) = self.tokens.get_mut(mint) else {
            return;
        };
        match trade.side {
            crate::core::types::Side::Buy => {
                if token.dev_initial_holding == 0 {
                    token.dev_initial_holding = trade.token_amount;
                }
            }
            crate::core::types::Side::Sell => {
                let fraction = if token.dev_initial_holding > 0 {
                    trade.token_amount as f64 / token.dev_initial_holding as f64
                } else {
                    DEV_SELL_CLAMP_STEP
                };
                token.dev_sold_percent = (token.dev_sold_percent + fraction).min(1.0);

                let age = token.age_ms(now);
                let threshold = if age < DEV_AGE_THRESHOLD_MS {
                    DEV_SOLD_THRESHOLD_YOUNG
                } else {
                    DEV_SOLD_THRESHOLD_OLD
                };
                if token.dev_sold_percent > threshold && !token.dev_flagged {
                    token.dev_flagged = true;
                    let sold_percent = token.dev_sold_percent;
                    self.events.push(WatchlistEvent::DevSold {
                        mint: mint.clone(),
                        sold_percent,
                    });
                }
            }
        }
    }

    pub fn passes_hard_filters(
        &self,
        mint: &TokenId,
        now: crate::core::types::Timestamp,
    ) -> HardFilterResult {
        let Some(token) = self.tokens.get(mint) else {
            return HardFilterResult::Reject("unknown token");
        };

        if token.dev_flagged {
            return HardFilterResult::Reject("dev sold");
        }
        if token.prices.len() < self.config.min_data_points {
            return HardFilterResult::Reject("insufficient data");
        }
        let age_s = token.age_ms(now) / 1000;
        if age_s < self.config.min_age_seconds as i64 {
            return HardFilterResult::Reject("too young");
        }
        if let Some(latest) = token.latest_price() {
            if token.peak_price > 0.0 {
                let drawdown = 1.0 - latest.price_sol / token.peak_price;
                if drawdown > self.config.max_drawdown_from_peak {
                    return HardFilterResult::Reject("crashed");
                }
            }
            if latest.market_cap_sol < self.config.min_market_cap_sol {
                return HardFilterResult::Reject("low mcap");
            }
        }
        if token.unique_traders.len() < self.config.min_unique_traders as usize {
            return HardFilterResult::Reject("wash risk");
        }
        if self.config.require_uptrend {
            if let (Some(now_price), Some(price_60s_ago)) = (
                token.latest_price().map(|p| p.price_sol),
                token.price_at_or_before(60_000, now),
            ) {
                if now_price < 0.98 * price_60s_ago {
                    return HardFilterResult::Reject("downtrend");
                }
            }
        }
        HardFilterResult::Pass
    }

    pub fn extract_features(
        &self,
        mint: &TokenId,
        now: crate::core::types::Timestamp,
    ) -> Option<WatchlistFeatures> {
        let token = self.tokens.get(mint)?;
        if token.prices.len() < 2 {
            return None;
        }

        let price_series: Vec<f64> = token.prices.iter().map(|(_, p)| p.price_sol).collect();
        let returns: Vec<f64> = price_series
            .windows(2)
            .map(|w| (w[1] - w[0]) / w[0].max(f64::EPSILON))
            .collect();
        let mean_return = returns.iter().sum::<f64>() / returns.len() as f64;
        let volatility = (returns
            .iter()
            .map(|r| (r - mean_return).powi(2))
            .sum::<f64>()
            / returns.len() as f64)
            .sqrt();

        let first_price = price_series.first().copied().unwrap_or(0.0);
        let latest = token.latest_price()?;
        let price_change = if first_price > 0.0 {
            (latest.price_sol - first_price) / first_price
        } else {
            0.0
        };
        let drawdown = if token.peak_price > 0.0 {
            1.0 - latest.price_sol / token.peak_price
        } else {
            0.0
        };

        let buys = token
            .trades
            .iter()
            .filter(|(_, t)| t.side == crate::core::types::Side::Buy)
            .count();
        let buy_pressure = if token.trades.is_empty() {
            0.0
        } else {
            buys as f64 / token.trades.len() as f64
        };

        let volume_acceleration = match (token.buckets.len() >= 2)
            .then(|| (&token.buckets[token.buckets.len() - 1], &token.buckets[token.buckets.len() - 2]))
        {
            Some((last, prev)) if prev.volume_sol > 0.0 => last.volume_sol / prev.volume_sol,
            _ => 1.0,
        };
        let volume_trend = volume_acceleration - 1.0;

        let unique_trader_growth = match (
            token.unique_trader_growth_samples.first(),
            token.unique_trader_growth_samples.last(),
        ) {
            (Some(first), Some(last)) => (*last as f64) - (*first as f64),
            _ => 0.0,
        };

        let dev_holding_residual = (1.0 - token.dev_sold_percent).max(0.0);
        let momentum_override = buy_pressure > 0.7 && price_change > 0.2;

        Some(WatchlistFeatures {
            price_change,
            volatility,
            drawdown,
            buy_pressure,
            volume_trend,
            age_seconds: token.age_ms(now) / 1000,
            unique_traders: token.unique_traders.len(),
            dev_holding_residual,
            volume_acceleration,
            unique_trader_growth,
            momentum_override,
        })
    }

    /// Drops tokens that have aged out past `max_age_ms` with no trades in
    /// the same window.
    pub fn cleanup(&mut self, max_age_ms: i64, now: crate::core::types::Timestamp) {
        let stale: Vec<TokenId> = self
            .tokens
            .iter()
            .filter(|(_, t)| {
                let aged_out = t.age_ms(now) > max_age_ms;
                let no_recent_trade = t
                    .trades
                    .newest()
                    .map(|(ts, _)| now.saturating_sub_ms(*ts) > max_age_ms)
                    .unwrap_or(true);
                aged_out && no_recent_trade
            })
            .map(|(mint, _)| mint.clone())
            .collect();

        for mint in stale {
            self.tokens.remove(&mint);
            debug!(%mint, "watchlist token aged out");
            self.events.push(WatchlistEvent::TokenRemoved { mint });
        }
    }
}
