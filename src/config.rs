//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration for the Signal-to-Trade Core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub watchlist: WatchlistConfig,
    #[serde(default)]
    pub velocity: VelocityConfig,
    #[serde(default)]
    pub pump_detector: PumpDetectorConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub entry: EntryConfig,
    #[serde(default)]
    pub sizing: SizingConfig,
    #[serde(default)]
    pub position: PositionConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub reconciler: ReconcilerConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

/// Hard filter thresholds applied by the Watchlist (spec §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistConfig {
    #[serde(default = "default_min_data_points")]
    pub min_data_points: usize,
    #[serde(default = "default_min_age_seconds")]
    pub min_age_seconds: u64,
    #[serde(default = "default_max_drawdown")]
    pub max_drawdown_from_peak: f64,
    #[serde(default = "default_min_market_cap")]
    pub min_market_cap_sol: f64,
    #[serde(default = "default_min_unique_traders")]
    pub min_unique_traders: u32,
    #[serde(default = "default_true")]
    pub require_uptrend: bool,
}

impl Default for WatchlistConfig {
    fn default() -> Self {
        Self {
            min_data_points: default_min_data_points(),
            min_age_seconds: default_min_age_seconds(),
            max_drawdown_from_peak: default_max_drawdown(),
            min_market_cap_sol: default_min_market_cap(),
            min_unique_traders: default_min_unique_traders(),
            require_uptrend: true,
        }
    }
}

/// Velocity Tracker thresholds (spec §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VelocityConfig {
    #[serde(default)]
    pub max_market_cap_sol: Option<f64>,
    #[serde(default = "default_velocity_min_tx")]
    pub min_tx_count: u32,
    #[serde(default = "default_velocity_min_unique_buyers")]
    pub min_unique_buyers: u32,
    #[serde(default = "default_velocity_min_buy_pressure")]
    pub min_buy_pressure: f64,
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self {
            max_market_cap_sol: None,
            min_tx_count: default_velocity_min_tx(),
            min_unique_buyers: default_velocity_min_unique_buyers(),
            min_buy_pressure: default_velocity_min_buy_pressure(),
        }
    }
}

/// Pump Detector gates (spec §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PumpDetectorConfig {
    #[serde(default = "default_min_pump_heat")]
    pub min_pump_heat: f64,
}

impl Default for PumpDetectorConfig {
    fn default() -> Self {
        Self {
            min_pump_heat: default_min_pump_heat(),
        }
    }
}

/// Scoring Engine gate (spec §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_min_score_to_trade")]
    pub min_score_to_trade: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_score_to_trade: default_min_score_to_trade(),
        }
    }
}

/// Entry Evaluator two-tier gate (spec §4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryConfig {
    #[serde(default = "default_snipe_max_age_s")]
    pub snipe_max_age_s: u64,
    #[serde(default = "default_snipe_min_tx")]
    pub snipe_min_tx: u32,
    #[serde(default = "default_snipe_min_unique_buyers")]
    pub snipe_min_unique_buyers: u32,
    #[serde(default = "default_snipe_min_buy_pressure")]
    pub snipe_min_buy_pressure: f64,
    #[serde(default = "default_snipe_max_mcap")]
    pub snipe_max_mcap_sol: f64,
}

impl Default for EntryConfig {
    fn default() -> Self {
        Self {
            snipe_max_age_s: default_snipe_max_age_s(),
            snipe_min_tx: default_snipe_min_tx(),
            snipe_min_unique_buyers: default_snipe_min_unique_buyers(),
            snipe_min_buy_pressure: default_snipe_min_buy_pressure(),
            snipe_max_mcap_sol: default_snipe_max_mcap(),
        }
    }
}

/// Position sizing (Risk Guard `compute_size`, spec §4.11).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingConfig {
    #[serde(default = "default_base_position_sol")]
    pub base_position_sol: f64,
    #[serde(default = "default_max_position_sol")]
    pub max_position_sol: f64,
    #[serde(default = "default_max_fraction_per_trade")]
    pub max_fraction_per_trade: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            base_position_sol: default_base_position_sol(),
            max_position_sol: default_max_position_sol(),
            max_fraction_per_trade: default_max_fraction_per_trade(),
        }
    }
}

/// Position Manager exit structure (spec §4.10, §3 `TPLevel`/`TrailingStop`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionConfig {
    #[serde(default = "default_stop_loss_fraction")]
    pub stop_loss_fraction: f64,
    /// (price_multiple, fraction_of_initial) pairs; Σfraction ≤ 1.0.
    #[serde(default = "default_tp_ladder")]
    pub tp_ladder: Vec<(f64, f64)>,
    #[serde(default = "default_trailing_activation_multiple")]
    pub trailing_activation_multiple: f64,
    #[serde(default = "default_trailing_drawdown_fraction")]
    pub trailing_drawdown_fraction: f64,
    #[serde(default = "default_sell_retry_attempts")]
    pub sell_retry_attempts: u32,
    #[serde(default = "default_sell_retry_base_delay_ms")]
    pub sell_retry_base_delay_ms: u64,
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            stop_loss_fraction: default_stop_loss_fraction(),
            tp_ladder: default_tp_ladder(),
            trailing_activation_multiple: default_trailing_activation_multiple(),
            trailing_drawdown_fraction: default_trailing_drawdown_fraction(),
            sell_retry_attempts: default_sell_retry_attempts(),
            sell_retry_base_delay_ms: default_sell_retry_base_delay_ms(),
        }
    }
}

/// Risk Guard limits (spec §4.11).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    #[serde(default = "default_max_concurrent_positions")]
    pub max_concurrent_positions: usize,
    #[serde(default = "default_max_drawdown")]
    pub max_drawdown: f64,
    #[serde(default = "default_daily_loss_limit_sol")]
    pub daily_loss_limit_sol: f64,
    #[serde(default = "default_tilted_loss_streak")]
    pub tilted_loss_streak: u32,
    #[serde(default = "default_pause_cooldown_secs")]
    pub pause_cooldown_secs: u64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_concurrent_positions: default_max_concurrent_positions(),
            max_drawdown: default_max_drawdown(),
            daily_loss_limit_sol: default_daily_loss_limit_sol(),
            tilted_loss_streak: default_tilted_loss_streak(),
            pause_cooldown_secs: default_pause_cooldown_secs(),
        }
    }
}

/// TTL Cache configuration (spec §4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_safety_cache_ttl")]
    pub safety_cache_ttl_secs: u64,
    #[serde(default = "default_holder_cache_ttl")]
    pub holder_cache_ttl_secs: u64,
    #[serde(default = "default_smart_money_cache_ttl")]
    pub smart_money_cache_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            safety_cache_ttl_secs: default_safety_cache_ttl(),
            holder_cache_ttl_secs: default_holder_cache_ttl(),
            smart_money_cache_ttl_secs: default_smart_money_cache_ttl(),
        }
    }
}

/// Reconciler cadence (spec §4.12).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    #[serde(default = "default_reconcile_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_phantom_fraction")]
    pub phantom_fraction: f64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_reconcile_interval_secs(),
            phantom_fraction: default_phantom_fraction(),
        }
    }
}

/// Orchestrator timeouts and concurrency (spec §5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default = "default_true")]
    pub enable_trading: bool,
    #[serde(default = "default_token_debounce_ms")]
    pub new_token_debounce_ms: u64,
    #[serde(default = "default_safety_fetch_timeout_ms")]
    pub safety_fetch_timeout_ms: u64,
    #[serde(default = "default_holder_fetch_timeout_ms")]
    pub holder_fetch_timeout_ms: u64,
    #[serde(default = "default_swap_submission_timeout_ms")]
    pub swap_submission_timeout_ms: u64,
    #[serde(default = "default_per_mint_queue_capacity")]
    pub per_mint_queue_capacity: usize,
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_stats_interval_secs")]
    pub stats_interval_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            enable_trading: true,
            new_token_debounce_ms: default_token_debounce_ms(),
            safety_fetch_timeout_ms: default_safety_fetch_timeout_ms(),
            holder_fetch_timeout_ms: default_holder_fetch_timeout_ms(),
            swap_submission_timeout_ms: default_swap_submission_timeout_ms(),
            per_mint_queue_capacity: default_per_mint_queue_capacity(),
            max_retry_attempts: default_max_retry_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            stats_interval_secs: default_stats_interval_secs(),
        }
    }
}

// Default value functions, one per config table row (spec §6).
fn default_min_data_points() -> usize {
    20
}
fn default_min_age_seconds() -> u64 {
    180
}
fn default_max_drawdown() -> f64 {
    0.15
}
fn default_min_market_cap() -> f64 {
    50.0
}
fn default_min_unique_traders() -> u32 {
    10
}
fn default_velocity_min_tx() -> u32 {
    20
}
fn default_velocity_min_unique_buyers() -> u32 {
    10
}
fn default_velocity_min_buy_pressure() -> f64 {
    0.60
}
fn default_min_pump_heat() -> f64 {
    25.0
}
fn default_min_score_to_trade() -> u32 {
    50
}
fn default_snipe_max_age_s() -> u64 {
    60
}
fn default_snipe_min_tx() -> u32 {
    20
}
fn default_snipe_min_unique_buyers() -> u32 {
    10
}
fn default_snipe_min_buy_pressure() -> f64 {
    0.60
}
fn default_snipe_max_mcap() -> f64 {
    100.0
}
fn default_base_position_sol() -> f64 {
    0.1
}
fn default_max_position_sol() -> f64 {
    0.5
}
fn default_max_fraction_per_trade() -> f64 {
    0.10
}
fn default_stop_loss_fraction() -> f64 {
    0.25
}
fn default_tp_ladder() -> Vec<(f64, f64)> {
    vec![(1.5, 0.25), (2.0, 0.25), (3.0, 0.25), (5.0, 0.25)]
}
fn default_trailing_activation_multiple() -> f64 {
    2.0
}
fn default_trailing_drawdown_fraction() -> f64 {
    0.25
}
fn default_sell_retry_attempts() -> u32 {
    3
}
fn default_sell_retry_base_delay_ms() -> u64 {
    200
}
fn default_max_concurrent_positions() -> usize {
    5
}
fn default_daily_loss_limit_sol() -> f64 {
    1.0
}
fn default_tilted_loss_streak() -> u32 {
    3
}
fn default_pause_cooldown_secs() -> u64 {
    1800
}
fn default_safety_cache_ttl() -> u64 {
    86400
}
fn default_holder_cache_ttl() -> u64 {
    300
}
fn default_smart_money_cache_ttl() -> u64 {
    3600
}
fn default_reconcile_interval_secs() -> u64 {
    30
}
fn default_phantom_fraction() -> f64 {
    0.001
}
fn default_token_debounce_ms() -> u64 {
    100
}
fn default_safety_fetch_timeout_ms() -> u64 {
    5000
}
fn default_holder_fetch_timeout_ms() -> u64 {
    5000
}
fn default_swap_submission_timeout_ms() -> u64 {
    60000
}
fn default_per_mint_queue_capacity() -> usize {
    256
}
fn default_max_retry_attempts() -> u32 {
    3
}
fn default_retry_base_delay_ms() -> u64 {
    100
}
fn default_stats_interval_secs() -> u64 {
    30
}
fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from file and environment variables (prefix `STC__`).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("STC")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Fail-fast validation of cross-field invariants (§7 "Configuration" kind).
    fn validate(&self) -> Result<()> {
        let ladder_sum: f64 = self.position.tp_ladder.iter().map(|(_, frac)| frac).sum();
        if ladder_sum > 1.0 + f64::EPSILON {
            anyhow::bail!(
                "tp_ladder fractions sum to {:.3}, must be <= 1.0",
                ladder_sum
            );
        }

        for (multiple, fraction) in &self.position.tp_ladder {
            if *multiple <= 1.0 {
                anyhow::bail!("tp_ladder price_multiple must be > 1.0, got {}", multiple);
            }
            if *fraction <= 0.0 || *fraction > 1.0 {
                anyhow::bail!(
                    "tp_ladder fraction_of_initial must be in (0, 1], got {}",
                    fraction
                );
            }
        }

        if self.scoring.min_score_to_trade > 100 {
            anyhow::bail!("min_score_to_trade must be in [0, 100]");
        }

        if self.sizing.max_position_sol <= 0.0 {
            anyhow::bail!("max_position_sol must be positive");
        }

        if self.sizing.base_position_sol <= 0.0 {
            anyhow::bail!("base_position_sol must be positive");
        }

        if self.position.stop_loss_fraction <= 0.0 || self.position.stop_loss_fraction >= 1.0 {
            anyhow::bail!("stop_loss_fraction must be in (0, 1)");
        }

        if self.risk.daily_loss_limit_sol <= 0.0 {
            anyhow::bail!("daily_loss_limit_sol must be positive");
        }

        if self.risk.max_concurrent_positions == 0 {
            anyhow::bail!("max_concurrent_positions must be >= 1");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watchlist: WatchlistConfig::default(),
            velocity: VelocityConfig::default(),
            pump_detector: PumpDetectorConfig::default(),
            scoring: ScoringConfig::default(),
            entry: EntryConfig::default(),
            sizing: SizingConfig::default(),
            position: PositionConfig::default(),
            risk: RiskConfig::default(),
            cache: CacheConfig::default(),
            reconciler: ReconcilerConfig::default(),
            orchestrator: OrchestratorConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scoring.min_score_to_trade, 50);
        assert_eq!(config.watchlist.min_data_points, 20);
        assert!(config.orchestrator.enable_trading);
    }

    #[test]
    fn test_validate_rejects_overfull_ladder() {
        let mut config = Config::default();
        config.position.tp_ladder = vec![(1.5, 0.6), (2.0, 0.6)];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_default_ladder() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }
}
