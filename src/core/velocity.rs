//! Per-token 60-second trade windows and momentum classification (spec §4.4).

use std::collections::HashMap;

use crate::config::VelocityConfig;
use crate::core::rolling_window::RollingWindow;
use crate::core::types::{Side, TokenId, TradeEvent, Timestamp, VelocityMetrics};

const WINDOW_MS: i64 = 60_000;
const WINDOW_CAPACITY: usize = 4096;

/// Strength bucket derived from a token's current velocity metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MomentumStrength {
    Unknown,
    Weak,
    Medium,
    Strong,
}

/// Outcome of `has_good_velocity`.
#[derive(Debug, Clone)]
pub struct VelocityGate {
    pub ok: bool,
    pub metrics: Option<VelocityMetrics>,
    pub reason: Option<&'static str>,
}

/// Keeps per-token rolling windows of trades and derives velocity metrics.
pub struct VelocityTracker {
    config: VelocityConfig,
    windows: HashMap<TokenId, RollingWindow<TradeEvent>>,
}

impl VelocityTracker {
    pub fn new(config: VelocityConfig) -> Self {
        Self {
            config,
            windows: HashMap::new(),
        }
    }

    /// Dedups by signature: feeding the same trade twice does not
    /// double-count it in the window.
    pub fn record(&mut self, trade: TradeEvent) {
        let window = self
            .windows
            .entry(trade.mint.clone())
            .or_insert_with(|| RollingWindow::new(WINDOW_CAPACITY, Some(WINDOW_MS)));
        if window.iter().any(|(_, t)| t.signature == trade.signature) {
            return;
        }
        window.push(trade.timestamp, trade);
    }

    pub fn metrics(&self, mint: &TokenId) -> Option<VelocityMetrics> {
        let window = self.windows.get(mint)?;
        if window.is_empty() {
            return None;
        }

        let mut metrics = VelocityMetrics::default();
        let mut window_start: Option<Timestamp> = None;
        let mut window_end: Option<Timestamp> = None;

        for (ts, trade) in window.iter() {
            metrics.tx_count += 1;
            match trade.side {
                Side::Buy => {
                    metrics.buy_count += 1;
                    metrics.unique_buyers.insert(trade.trader.clone());
                }
                Side::Sell => {
                    metrics.sell_count += 1;
                    metrics.unique_sellers.insert(trade.trader.clone());
                }
            }
            window_start = Some(window_start.map_or(*ts, |s| if *ts < s { *ts } else { s }));
            window_end = Some(window_end.map_or(*ts, |e| if *ts > e { *ts } else { e }));
        }

        metrics.window_start = window_start;
        let span_minutes = match (window_start, window_end) {
            (Some(start), Some(end)) => ((end.saturating_sub_ms(start)).max(1_000) as f64) / 60_000.0,
            _ => 1.0 / 60.0,
        };
        metrics.tx_per_minute = metrics.tx_count as f64 / span_minutes.max(1.0 / 60.0);

        Some(metrics)
    }

    /// Applies thresholds in order: max market cap, min tx_count, min unique
    /// buyers, min buy pressure. First failure wins.
    pub fn has_good_velocity(&self, mint: &TokenId, market_cap_sol: Option<f64>) -> VelocityGate {
        let Some(metrics) = self.metrics(mint) else {
            return VelocityGate {
                ok: false,
                metrics: None,
                reason: Some("no trades"),
            };
        };

        if let (Some(max_mcap), Some(mcap)) = (self.config.max_market_cap_sol, market_cap_sol) {
            if mcap > max_mcap {
                return VelocityGate {
                    ok: false,
                    metrics: Some(metrics),
                    reason: Some("market cap too high"),
                };
            }
        }
        if metrics.tx_count < self.config.min_tx_count {
            return VelocityGate {
                ok: false,
                metrics: Some(metrics),
                reason: Some("tx count too low"),
            };
        }
        if (metrics.unique_buyers.len() as u32) < self.config.min_unique_buyers {
            return VelocityGate {
                ok: false,
                metrics: Some(metrics),
                reason: Some("unique buyers too low"),
            };
        }
        if metrics.buy_pressure() < self.config.min_buy_pressure {
            return VelocityGate {
                ok: false,
                metrics: Some(metrics),
                reason: Some("buy pressure too low"),
            };
        }

        VelocityGate {
            ok: true,
            metrics: Some(metrics),
            reason: None,
        }
    }

    pub fn momentum_strength(&self, mint: &TokenId) -> MomentumStrength {
        let Some(metrics) = self.metrics(mint) else {
            return MomentumStrength::Unknown;
        };
        if metrics.tx_count < 3 {
            return MomentumStrength::Unknown;
        }
        let buy_pressure = metrics.buy_pressure();
        if buy_pressure >= 0.70 && metrics.tx_per_minute >= 10.0 && metrics.unique_buyers.len() >= 5 {
            return MomentumStrength::Strong;
        }
        if buy_pressure < 0.50 || metrics.tx_per_minute < 3.0 {
            return MomentumStrength::Weak;
        }
        MomentumStrength::Medium
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::WalletId;

    fn mint() -> TokenId {
        TokenId::new("So11111111111111111111111111111111111111112").unwrap()
    }

    fn wallet(n: u8) -> WalletId {
        WalletId::new(format!("So1111111111111111111111111111111111111{:03}", n)).unwrap()
    }

    fn trade(ts_ms: i64, trader: u8, side: Side) -> TradeEvent {
        TradeEvent {
            timestamp: Timestamp::from_millis(ts_ms),
            mint: mint(),
            trader: wallet(trader),
            side,
            token_amount: 1_000,
            sol_amount: 0.1,
            market_cap_sol: 20_000.0,
            price_sol: 0.001,
            signature: format!("sig-{ts_ms}"),
        }
    }

    #[test]
    fn metrics_none_without_trades() {
        let tracker = VelocityTracker::new(VelocityConfig::default());
        assert!(tracker.metrics(&mint()).is_none());
    }

    #[test]
    fn metrics_counts_buys_and_sells() {
        let mut tracker = VelocityTracker::new(VelocityConfig::default());
        tracker.record(trade(0, 1, Side::Buy));
        tracker.record(trade(1_000, 2, Side::Buy));
        tracker.record(trade(2_000, 3, Side::Sell));
        let metrics = tracker.metrics(&mint()).unwrap();
        assert_eq!(metrics.tx_count, 3);
        assert_eq!(metrics.buy_count, 2);
        assert_eq!(metrics.sell_count, 1);
        assert_eq!(metrics.unique_buyers.len(), 2);
    }

    #[test]
    fn stale_trades_prune_out_of_window() {
        let mut tracker = VelocityTracker::new(VelocityConfig::default());
        tracker.record(trade(0, 1, Side::Buy));
        tracker.record(trade(70_000, 2, Side::Buy));
        let metrics = tracker.metrics(&mint()).unwrap();
        assert_eq!(metrics.tx_count, 1);
    }

    #[test]
    fn gate_fails_on_first_violated_threshold() {
        let mut cfg = VelocityConfig::default();
        cfg.min_tx_count = 5;
        let mut tracker = VelocityTracker::new(cfg);
        tracker.record(trade(0, 1, Side::Buy));
        let gate = tracker.has_good_velocity(&mint(), None);
        assert!(!gate.ok);
        assert_eq!(gate.reason, Some("tx count too low"));
    }

    #[test]
    fn momentum_strong_requires_all_three_thresholds() {
        let mut tracker = VelocityTracker::new(VelocityConfig::default());
        for i in 0..12u8 {
            tracker.record(trade(i as i64 * 100, i % 6, Side::Buy));
        }
        assert_eq!(tracker.momentum_strength(&mint()), MomentumStrength::Strong);
    }

    #[test]
    fn duplicate_signature_does_not_double_count() {
        let mut tracker = VelocityTracker::new(VelocityConfig::default());
        let t = trade(0, 1, Side::Buy);
        tracker.record(t.clone());
        tracker.record(t);
        let metrics = tracker.metrics(&mint()).unwrap();
        assert_eq!(metrics.tx_count, 1);
    }

    #[test]
    fn momentum_unknown_below_three_trades() {
        let mut tracker = VelocityTracker::new(VelocityConfig::default());
        tracker.record(trade(0, 1, Side::Buy));
        assert_eq!(tracker.momentum_strength(&mint()), MomentumStrength::Unknown);
    }
}
