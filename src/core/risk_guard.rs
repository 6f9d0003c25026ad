//! Portfolio-wide pause/resume state machine and position sizing (spec §4.11).

use parking_lot::RwLock;

use crate::config::{RiskConfig, SizingConfig};
use crate::core::interfaces::{CoreEvent, EventSender};
use crate::core::types::{RiskState, Timestamp};
use crate::core::velocity::MomentumStrength;

/// Win-rate/trade-count bookkeeping for the current trading day, reset by
/// [`RiskGuard::reset_daily`].
#[derive(Debug, Clone, Default)]
pub struct DailyStats {
    pub total_trades: u32,
    pub winning_trades: u32,
    pub losing_trades: u32,
    pub total_profit_sol: f64,
    pub total_loss_sol: f64,
}

impl DailyStats {
    pub fn record_trade(&mut self, realized_pnl_sol: f64) {
        self.total_trades += 1;
        if realized_pnl_sol > 0.0 {
            self.winning_trades += 1;
            self.total_profit_sol += realized_pnl_sol;
        } else if realized_pnl_sol < 0.0 {
            self.losing_trades += 1;
            self.total_loss_sol += -realized_pnl_sol;
        }
    }

    pub fn win_rate(&self) -> f64 {
        if self.total_trades == 0 {
            0.0
        } else {
            self.winning_trades as f64 / self.total_trades as f64
        }
    }

    pub fn net_pnl_sol(&self) -> f64 {
        self.total_profit_sol - self.total_loss_sol
    }
}

/// Portfolio-wide risk state machine: sizing, drawdown/loss-streak pause
/// triggers, and the concurrency cap. `RiskState` is the single writer's
/// state; all mutation goes through this type.
pub struct RiskGuard {
    risk_config: RiskConfig,
    sizing_config: SizingConfig,
    state: RwLock<RiskState>,
    daily_stats: RwLock<DailyStats>,
    events: EventSender,
}

impl RiskGuard {
    pub fn new(risk_config: RiskConfig, sizing_config: SizingConfig, events: EventSender) -> Self {
        Self {
            risk_config,
            sizing_config,
            state: RwLock::new(RiskState::default()),
            daily_stats: RwLock::new(DailyStats::default()),
            events,
        }
    }

    pub fn state(&self) -> RiskState {
        self.state.read().clone()
    }

    pub fn daily_stats(&self) -> DailyStats {
        self.daily_stats.read().clone()
    }

    /// Scales `base_size_sol` by `score/100` and a momentum multiplier, then
    /// caps by the configured max position size and by the wallet-fraction
    /// cap against `available_balance_sol`.
    pub fn compute_size(
        &self,
        base_size_sol: f64,
        score: u32,
        momentum: MomentumStrength,
        available_balance_sol: f64,
    ) -> f64 {
        let momentum_multiplier = match momentum {
            MomentumStrength::Strong => 1.0,
            MomentumStrength::Medium => 0.7,
            MomentumStrength::Weak | MomentumStrength::Unknown => 0.4,
        };
        let scaled = base_size_sol * (score as f64 / 100.0).clamp(0.0, 1.0) * momentum_multiplier;
        let wallet_cap = available_balance_sol * self.sizing_config.max_fraction_per_trade;
        scaled.min(self.sizing_config.max_position_sol).min(wallet_cap).max(0.0)
    }

    /// `true` iff a new entry may be opened right now: not paused (auto-
    /// resuming if the cooldown has elapsed) and under the concurrency cap.
    pub fn can_trade(&self, now: Timestamp, open_position_count: usize) -> bool {
        let mut state = self.state.write();
        if state.is_paused {
            match state.pause_until {
                Some(until) if now.millis() >= until.millis() => {
                    state.is_paused = false;
                    state.pause_reason = None;
                    state.pause_until = None;
                    let _ = self.events.send(CoreEvent::RiskResumed);
                }
                _ => return false,
            }
        }
        state.open_position_count = open_position_count;
        open_position_count < self.risk_config.max_concurrent_positions
    }

    /// Records the realized outcome of a closed position: updates daily
    /// P&L, the high-water mark / drawdown, consecutive win/loss streaks,
    /// and daily stats, then evaluates the pause triggers.
    pub fn on_position_closed(&self, realized_pnl_sol: f64, equity_sol: f64, now: Timestamp) {
        self.daily_stats.write().record_trade(realized_pnl_sol);

        let mut state = self.state.write();
        state.daily_pnl_sol += realized_pnl_sol;

        if equity_sol > state.high_water_mark {
            state.high_water_mark = equity_sol;
        }
        state.current_drawdown = if state.high_water_mark > 0.0 {
            (1.0 - equity_sol / state.high_water_mark).max(0.0)
        } else {
            0.0
        };

        if realized_pnl_sol > 0.0 {
            state.consecutive_wins += 1;
            state.consecutive_losses = 0;
        } else if realized_pnl_sol < 0.0 {
            state.consecutive_losses += 1;
            state.consecutive_wins = 0;
        }

        if state.is_paused {
            return;
        }

        let drawdown_tripped = state.current_drawdown >= self.risk_config.max_drawdown;
        let streak_tripped = state.consecutive_losses >= self.risk_config.tilted_loss_streak;
        let daily_loss_tripped = state.daily_pnl_sol <= -self.risk_config.daily_loss_limit_sol;

        if drawdown_tripped || streak_tripped || daily_loss_tripped {
            let reason = if drawdown_tripped {
                format!(
                    "drawdown {:.1}% >= max {:.1}%",
                    state.current_drawdown * 100.0,
                    self.risk_config.max_drawdown * 100.0
                )
            } else if streak_tripped {
                format!("{} consecutive losses", state.consecutive_losses)
            } else {
                format!(
                    "daily pnl {:.3} SOL breached limit -{:.3}",
                    state.daily_pnl_sol, self.risk_config.daily_loss_limit_sol
                )
            };
            state.is_paused = true;
            state.pause_reason = Some(reason.clone());
            state.pause_until =
                Some(now.plus_ms(self.risk_config.pause_cooldown_secs as i64 * 1000));
            let _ = self.events.send(CoreEvent::RiskPaused { reason });
        }
    }

    /// Clears the pause state immediately, bypassing the cooldown. Intended
    /// for operator-triggered resumption.
    pub fn force_resume(&self) {
        let mut state = self.state.write();
        if state.is_paused {
            state.is_paused = false;
            state.pause_reason = None;
            state.pause_until = None;
            let _ = self.events.send(CoreEvent::RiskResumed);
        }
    }

    /// Resets daily P&L and daily stats at day rollover. Does not touch
    /// drawdown/high-water-mark, which are equity-lifetime quantities.
    pub fn reset_daily(&self) {
        self.state.write().daily_pnl_sol = 0.0;
        *self.daily_stats.write() = DailyStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::interfaces::event_channel;

    fn guard() -> RiskGuard {
        let (tx, _rx) = event_channel(16);
        RiskGuard::new(RiskConfig::default(), SizingConfig::default(), tx)
    }

    #[test]
    fn compute_size_scales_by_score_and_momentum() {
        let guard = guard();
        // base=0.1, score=50 -> 0.5 scale, momentum Medium -> 0.7
        let size = guard.compute_size(0.1, 50, MomentumStrength::Medium, 100.0);
        assert!((size - 0.1 * 0.5 * 0.7).abs() < 1e-9);
    }

    #[test]
    fn compute_size_caps_by_max_position() {
        let guard = guard();
        let size = guard.compute_size(10.0, 100, MomentumStrength::Strong, 1000.0);
        assert_eq!(size, guard.sizing_config.max_position_sol);
    }

    #[test]
    fn compute_size_caps_by_wallet_fraction() {
        let guard = guard();
        // available=1.0 sol, max_fraction=0.10 -> cap 0.1
        let size = guard.compute_size(10.0, 100, MomentumStrength::Strong, 1.0);
        assert!((size - 0.1).abs() < 1e-9);
    }

    #[test]
    fn pause_triggers_on_consecutive_loss_streak() {
        let guard = guard();
        let threshold = guard.risk_config.tilted_loss_streak;
        for i in 0..threshold {
            guard.on_position_closed(-0.01, 1.0, Timestamp::from_millis(i as i64 * 1000));
        }
        assert!(guard.state().is_paused);
    }

    #[test]
    fn pause_triggers_on_daily_loss_limit() {
        let guard = guard();
        let limit = guard.risk_config.daily_loss_limit_sol;
        guard.on_position_closed(-(limit + 0.01), 1.0, Timestamp::from_millis(0));
        assert!(guard.state().is_paused);
    }

    #[test]
    fn pause_triggers_on_drawdown() {
        let guard = guard();
        guard.on_position_closed(1.0, 10.0, Timestamp::from_millis(0));
        assert_eq!(guard.state().high_water_mark, 10.0);
        // Equity crashes to 20% of the high-water mark -> 80% drawdown.
        guard.on_position_closed(-8.0, 2.0, Timestamp::from_millis(1000));
        assert!(guard.state().is_paused);
    }

    #[test]
    fn can_trade_resumes_after_cooldown_elapses() {
        let guard = guard();
        guard.on_position_closed(-10.0, 1.0, Timestamp::from_millis(0));
        assert!(guard.state().is_paused);
        let pause_until = guard.state().pause_until.unwrap();

        assert!(!guard.can_trade(pause_until.plus_ms(-1), 0));
        assert!(guard.can_trade(pause_until, 0));
        assert!(!guard.state().is_paused);
    }

    #[test]
    fn can_trade_respects_concurrency_cap() {
        let guard = guard();
        let cap = guard.risk_config.max_concurrent_positions;
        assert!(!guard.can_trade(Timestamp::from_millis(0), cap));
        assert!(guard.can_trade(Timestamp::from_millis(0), cap - 1));
    }

    #[test]
    fn daily_stats_track_win_rate() {
        let guard = guard();
        guard.on_position_closed(1.0, 1.0, Timestamp::from_millis(0));
        guard.on_position_closed(-0.5, 1.0, Timestamp::from_millis(1000));
        let stats = guard.daily_stats();
        assert_eq!(stats.total_trades, 2);
        assert!((stats.win_rate() - 0.5).abs() < 1e-9);
    }
}
