//! Phase classifier over price + velocity, with decay tracking (spec §4.5).
//!
//! `PumpMetrics` is a pure function of a price series plus the Velocity
//! Tracker's current metrics; the only internal state kept here is each
//! token's bounded history of past `PumpMetrics`, used for decay.

use std::collections::HashMap;

use crate::config::PumpDetectorConfig;
use crate::core::types::{PriceSample, PumpMetrics, PumpPhase, TokenId, VelocityMetrics};

/// Scales `volume_ratio` onto the same rough numeric range as the heat
/// thresholds used by the phase classifier (25 / 48 / 80 / 120).
const HEAT_SCALE: f64 = 48.0;
const HISTORY_CAPACITY: usize = 60;
const DECAY_LOOKBACK: usize = 10;
const VELOCITY_TX_COUNT_THRESHOLD: u32 = 5;

/// Bounded ring of a token's last 60 `PumpMetrics`, used for decay.
#[derive(Debug, Clone, Default)]
struct PumpHistory {
    entries: std::collections::VecDeque<PumpMetrics>,
}

impl PumpHistory {
    fn push(&mut self, metrics: PumpMetrics) {
        self.entries.push_back(metrics);
        while self.entries.len() > HISTORY_CAPACITY {
            self.entries.pop_front();
        }
    }

    fn recent(&self, n: usize) -> impl Iterator<Item = &PumpMetrics> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip)
    }
}

/// Computes and remembers pump metrics per token.
pub struct PumpDetector {
    config: PumpDetectorConfig,
    history: HashMap<TokenId, PumpHistory>,
}

impl PumpDetector {
    pub fn new(config: PumpDetectorConfig) -> Self {
        Self {
            config,
            history: HashMap::new(),
        }
    }

    /// Computes `PumpMetrics` for `mint` from its price series and current
    /// velocity metrics, recording the result into that token's history.
    pub fn compute(
        &mut self,
        mint: &TokenId,
        prices: &[PriceSample],
        velocity: Option<&VelocityMetrics>,
        lowest_price: f64,
        now_ms: i64,
    ) -> Option<PumpMetrics> {
        if prices.is_empty() {
            return None;
        }
        let latest = prices.last().unwrap();

        let volume_ratio = Self::volume_ratio(prices, velocity, now_ms);
        let price_velocity = Self::price_velocity(prices, now_ms);
        let buy_pressure = Self::buy_pressure(prices, velocity);
        let heat = volume_ratio * HEAT_SCALE;
        let pump_from_low = if lowest_price > 0.0 {
            (latest.price_sol - lowest_price) / lowest_price
        } else {
            0.0
        };
        let confidence = Self::confidence(prices.len(), velocity);

        let phase = Self::classify(heat, price_velocity, buy_pressure);

        let history = self.history.entry(mint.clone()).or_default();
        let (heat_decay, buy_pressure_decay) = Self::decay(history, heat, buy_pressure);

        let metrics = PumpMetrics {
            phase,
            heat,
            volume_ratio,
            price_velocity,
            buy_pressure,
            confidence,
            pump_from_low,
            heat_decay,
            buy_pressure_decay,
        };
        history.push(metrics);
        Some(metrics)
    }

    fn volume_ratio(prices: &[PriceSample], velocity: Option<&VelocityMetrics>, _now_ms: i64) -> f64 {
        if let Some(v) = velocity {
            if v.tx_count >= VELOCITY_TX_COUNT_THRESHOLD {
                return v.tx_per_minute / 10.0;
            }
        }
        let sum_abs_delta = |window_ms: i64| -> f64 {
            let cutoff = prices.last().map(|p| p.timestamp.millis() - window_ms).unwrap_or(i64::MIN);
            prices
                .windows(2)
                .filter(|w| w[1].timestamp.millis() >= cutoff)
                .map(|w| (w[1].price_sol - w[0].price_sol).abs())
                .sum()
        };
        let delta_60 = sum_abs_delta(60_000);
        let delta_300 = sum_abs_delta(300_000).max(f64::EPSILON);
        (delta_60 / 60.0) / (delta_300 / 300.0)
    }

    fn price_velocity(prices: &[PriceSample], _now_ms: i64) -> f64 {
        let latest = prices.last().unwrap();
        let cutoff = latest.timestamp.millis() - 30_000;
        let Some(reference) = prices.iter().find(|p| p.timestamp.millis() >= cutoff) else {
            return 0.0;
        };
        if reference.price_sol <= 0.0 {
            return 0.0;
        }
        let elapsed_s = ((latest.timestamp.millis() - reference.timestamp.millis()).max(1) as f64) / 1000.0;
        ((latest.price_sol - reference.price_sol) / reference.price_sol) * 100.0 / elapsed_s
    }

    fn buy_pressure(prices: &[PriceSample], velocity: Option<&VelocityMetrics>) -> f64 {
        if let Some(v) = velocity {
            if v.tx_count >= VELOCITY_TX_COUNT_THRESHOLD {
                return v.buy_pressure();
            }
        }
        if prices.len() < 2 {
            return 0.5;
        }
        let (up, total) = prices
            .windows(2)
            .fold((0u32, 0u32), |(up, total), w| {
                if w[1].price_sol > w[0].price_sol {
                    (up + 1, total + 1)
                } else {
                    (up, total + 1)
                }
            });
        if total == 0 {
            0.5
        } else {
            up as f64 / total as f64
        }
    }

    fn confidence(price_sample_count: usize, velocity: Option<&VelocityMetrics>) -> f64 {
        let price_confidence = (price_sample_count as f64 / 20.0).min(1.0);
        let velocity_confidence = velocity.map(|v| (v.tx_count as f64 / 10.0).min(1.0)).unwrap_or(0.0);
        (price_confidence * 0.5 + velocity_confidence * 0.5).clamp(0.0, 1.0)
    }

    fn classify(heat: f64, price_velocity: f64, buy_pressure: f64) -> PumpPhase {
        if price_velocity < -2.0 && buy_pressure < 0.3 {
            return PumpPhase::Dumping;
        }
        if heat > 120.0 && price_velocity < 0.0 {
            return PumpPhase::Peak;
        }
        if heat >= 48.0 && buy_pressure > 0.45 {
            return PumpPhase::Hot;
        }
        if heat >= 25.0 && buy_pressure > 0.45 {
            return PumpPhase::Building;
        }
        PumpPhase::Cold
    }

    fn decay(history: &PumpHistory, current_heat: f64, current_buy_pressure: f64) -> (f64, f64) {
        let recent: Vec<&PumpMetrics> = history.recent(DECAY_LOOKBACK).collect();

        let peak_heat = recent.iter().map(|m| m.heat).fold(0.0, f64::max);
        let heat_decay = if peak_heat > 0.0 {
            ((peak_heat - current_heat) / peak_heat).max(0.0)
        } else {
            0.0
        };

        let peak_buy_pressure = recent.iter().map(|m| m.buy_pressure).fold(0.0, f64::max);
        let buy_pressure_decay = if peak_buy_pressure > 0.5 {
            ((peak_buy_pressure - current_buy_pressure) / peak_buy_pressure).max(0.0)
        } else {
            0.0
        };

        (heat_decay, buy_pressure_decay)
    }

    pub fn is_good_entry(&self, metrics: &PumpMetrics) -> bool {
        if metrics.phase == PumpPhase::Dumping || metrics.heat < self.config.min_pump_heat {
            return false;
        }
        if metrics.phase == PumpPhase::Building && metrics.confidence > 0.4 && metrics.buy_pressure > 0.5 {
            return true;
        }
        if metrics.phase == PumpPhase::Hot && metrics.heat < 80.0 && metrics.confidence > 0.4 {
            return true;
        }
        if metrics.buy_pressure > 0.65 && metrics.heat > 20.0 {
            return true;
        }
        false
    }

    /// `profit_fraction` is the position's current unrealized P&L fraction,
    /// when known. Never exits on momentum alone while at a loss.
    pub fn should_exit(&self, metrics: &PumpMetrics, profit_fraction: Option<f64>) -> bool {
        if metrics.phase == PumpPhase::Dumping {
            return true;
        }
        if metrics.price_velocity < -5.0 && metrics.confidence > 0.6 {
            return true;
        }
        if let Some(profit) = profit_fraction {
            if profit > 0.10 {
                let heat_exit = metrics.heat_decay > 0.6 && metrics.price_velocity < -1.0;
                let pressure_exit = metrics.buy_pressure_decay > 0.5
                    && metrics.buy_pressure < 0.35
                    && metrics.price_velocity < -1.0;
                if heat_exit || pressure_exit {
                    return true;
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Timestamp;

    fn mint() -> TokenId {
        TokenId::new("So11111111111111111111111111111111111111112").unwrap()
    }

    fn sample(ts_ms: i64, price: f64) -> PriceSample {
        PriceSample {
            timestamp: Timestamp::from_millis(ts_ms),
            price_sol: price,
            price_usd: price * 150.0,
            market_cap_sol: price * 1_000_000.0,
            liquidity: 10_000.0,
            volume_24h: 1_000.0,
        }
    }

    #[test]
    fn classify_dumping_beats_everything_else() {
        let phase = PumpDetector::classify(200.0, -3.0, 0.1);
        assert_eq!(phase, PumpPhase::Dumping);
    }

    #[test]
    fn classify_order_peak_before_hot() {
        assert_eq!(PumpDetector::classify(150.0, -1.0, 0.5), PumpPhase::Peak);
        assert_eq!(PumpDetector::classify(60.0, 1.0, 0.5), PumpPhase::Hot);
        assert_eq!(PumpDetector::classify(30.0, 1.0, 0.5), PumpPhase::Building);
        assert_eq!(PumpDetector::classify(10.0, 1.0, 0.9), PumpPhase::Cold);
    }

    #[test]
    fn compute_returns_none_on_empty_series() {
        let mut detector = PumpDetector::new(PumpDetectorConfig::default());
        assert!(detector.compute(&mint(), &[], None, 0.0, 0).is_none());
    }

    #[test]
    fn compute_is_pure_given_same_inputs_regardless_of_call_time() {
        let prices: Vec<PriceSample> = (0..10).map(|i| sample(i * 1_000, 1.0 + i as f64 * 0.05)).collect();
        let mut a = PumpDetector::new(PumpDetectorConfig::default());
        let mut b = PumpDetector::new(PumpDetectorConfig::default());
        let m1 = a.compute(&mint(), &prices, None, 1.0, 9_000).unwrap();
        let m2 = b.compute(&mint(), &prices, None, 1.0, 9_000).unwrap();
        assert_eq!(m1.phase, m2.phase);
        assert!((m1.heat - m2.heat).abs() < 1e-9);
    }

    #[test]
    fn is_good_entry_rejects_below_min_heat() {
        let detector = PumpDetector::new(PumpDetectorConfig {
            min_pump_heat: 25.0,
        });
        let metrics = PumpMetrics {
            phase: PumpPhase::Building,
            heat: 10.0,
            volume_ratio: 0.2,
            price_velocity: 1.0,
            buy_pressure: 0.6,
            confidence: 0.8,
            pump_from_low: 0.1,
            heat_decay: 0.0,
            buy_pressure_decay: 0.0,
        };
        assert!(!detector.is_good_entry(&metrics));
    }

    #[test]
    fn should_exit_never_fires_on_momentum_alone_at_a_loss() {
        let detector = PumpDetector::new(PumpDetectorConfig::default());
        let metrics = PumpMetrics {
            phase: PumpPhase::Hot,
            heat: 60.0,
            volume_ratio: 1.2,
            price_velocity: -1.5,
            buy_pressure: 0.3,
            confidence: 0.8,
            pump_from_low: 0.1,
            heat_decay: 0.8,
            buy_pressure_decay: 0.8,
        };
        assert!(!detector.should_exit(&metrics, Some(-0.05)));
    }

    #[test]
    fn should_exit_fires_on_decay_when_in_profit() {
        let detector = PumpDetector::new(PumpDetectorConfig::default());
        let metrics = PumpMetrics {
            phase: PumpPhase::Hot,
            heat: 60.0,
            volume_ratio: 1.2,
            price_velocity: -1.5,
            buy_pressure: 0.3,
            confidence: 0.8,
            pump_from_low: 0.1,
            heat_decay: 0.8,
            buy_pressure_decay: 0.8,
        };
        assert!(detector.should_exit(&metrics, Some(0.15)));
    }
}
