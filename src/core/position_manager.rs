//! Per-position state machine: exit rules, rug monitoring, reconciliation
//! (spec §4.10).

use std::collections::{HashMap, VecDeque};

use parking_lot::RwLock;
use tracing::warn;
use uuid::Uuid;

use crate::config::PositionConfig;
use crate::core::interfaces::{CoreEvent, EventSender, ExitRecord, SwapExecutor, TradeJournal, Urgency};
use crate::core::pump_detector::PumpDetector;
use crate::core::retry::with_retry;
use crate::core::types::{
    CloseReason, PoolType, Position, PositionStatus, PumpMetrics, Side, TPLevel, Timestamp,
    TokenId, TradeEvent, TrailingStop, WalletId,
};
use crate::error::{Error, Result};

/// Swap slippage used for position exits; wider than entry slippage since
/// exits must fill even on a fast-moving price.
const EXIT_SLIPPAGE_BPS: u32 = 500;
/// Flat fee estimate used only when the executor cannot report `sol_received`.
const ESTIMATED_SELL_FEE_SOL: f64 = 0.0005;

/// A step the exit-rule evaluation wants taken against the current price
/// tick. Pure data; no I/O happens until the caller executes these.
#[derive(Debug, Clone, PartialEq)]
pub enum ExitAction {
    PartialTp { level_index: usize, fraction: f64 },
    FullExit { reason: CloseReason },
}

/// Evaluates the ordered exit rules (stop loss, TP ladder, trailing stop,
/// pump-based exit) against a single price tick, mutating `position`'s
/// `current_price`/`highest_price`/`tp_sold` in place. Several TP levels may
/// fire against the same tick; a stop loss or trailing-stop hit short-circuits
/// the remaining checks.
pub fn evaluate_exits(
    position: &mut Position,
    price: f64,
    pump_metrics: Option<&PumpMetrics>,
    pump_detector: &PumpDetector,
) -> Vec<ExitAction> {
    position.update_price(price);
    let mut actions = Vec::new();

    let stop_price = position.entry_price * (1.0 - position.stop_loss_fraction);
    if price <= stop_price {
        actions.push(ExitAction::FullExit {
            reason: CloseReason::StopLoss,
        });
        return actions;
    }

    for i in 0..position.take_profit_ladder.len() {
        if position.tp_sold[i] {
            continue;
        }
        let level: TPLevel = position.take_profit_ladder[i];
        let target = position.entry_price * level.price_multiple;
        if price >= target {
            position.tp_sold[i] = true;
            actions.push(ExitAction::PartialTp {
                level_index: i,
                fraction: level.fraction_of_initial,
            });
        }
    }
    if position.remaining_fraction() <= f64::EPSILON {
        actions.push(ExitAction::FullExit {
            reason: CloseReason::TakeProfit,
        });
        return actions;
    }

    if let Some(trailing) = position.trailing_stop.as_mut() {
        if !trailing.armed && position.highest_price >= position.entry_price * trailing.activation_multiple {
            trailing.armed = true;
        }
        if trailing.armed && price <= position.highest_price * (1.0 - trailing.drawdown_fraction) {
            actions.push(ExitAction::FullExit {
                reason: CloseReason::TrailingStop,
            });
            return actions;
        }
    }

    if let Some(metrics) = pump_metrics {
        let profit = position.unrealized_pnl_percent();
        if profit > 0.10 && pump_detector.should_exit(metrics, Some(profit)) {
            actions.push(ExitAction::FullExit {
                reason: CloseReason::PumpExit,
            });
        }
    }

    actions
}

/// Severity of a single rug warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RugSeverity {
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RugWarningKind {
    CreatorSell,
    LargeDump,
    HighSellRatio,
    DeepDrawdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RugWarning {
    pub kind: RugWarningKind,
    pub severity: RugSeverity,
}

/// Per-mint rug-detection state: cumulative creator sells, a short trade-side
/// ring for the sell-ratio rule, and a 60s window of critical timestamps for
/// the "two criticals" exit trigger.
#[derive(Debug, Clone, Default)]
struct RugMonitor {
    creator_sell_count: u32,
    recent_sells: VecDeque<bool>,
    critical_at: VecDeque<Timestamp>,
}

impl RugMonitor {
    const TRADE_WINDOW: usize = 20;
    const CRITICAL_WINDOW_MS: i64 = 60_000;

    fn sell_ratio(&self) -> Option<f64> {
        let n = self.recent_sells.len();
        if n < 5 {
            return None;
        }
        let sells = self.recent_sells.iter().filter(|s| **s).count();
        Some(sells as f64 / n as f64)
    }

    fn evaluate(
        &mut self,
        trade: &TradeEvent,
        is_creator: bool,
        position: &Position,
        now: Timestamp,
    ) -> (Vec<RugWarning>, bool) {
        let mut warnings = Vec::new();
        let is_sell = trade.side == Side::Sell;

        self.recent_sells.push_back(is_sell);
        while self.recent_sells.len() > Self::TRADE_WINDOW {
            self.recent_sells.pop_front();
        }

        if is_creator && is_sell {
            self.creator_sell_count += 1;
            let severity = if self.creator_sell_count >= 2 {
                RugSeverity::Critical
            } else {
                RugSeverity::Warning
            };
            warnings.push(RugWarning {
                kind: RugWarningKind::CreatorSell,
                severity,
            });
        }

        if is_sell && trade.market_cap_sol > 0.0 {
            let fraction = trade.sol_amount / trade.market_cap_sol;
            if fraction > 0.10 {
                warnings.push(RugWarning {
                    kind: RugWarningKind::LargeDump,
                    severity: RugSeverity::Critical,
                });
            } else if fraction > 0.05 {
                warnings.push(RugWarning {
                    kind: RugWarningKind::LargeDump,
                    severity: RugSeverity::Warning,
                });
            }
        }

        if let Some(ratio) = self.sell_ratio() {
            if ratio > 0.75 {
                warnings.push(RugWarning {
                    kind: RugWarningKind::HighSellRatio,
                    severity: RugSeverity::Critical,
                });
            }
        }

        let prior_upside = position.highest_price > position.entry_price;
        if prior_upside && position.highest_price > 0.0 {
            let drop = (position.highest_price - trade.price_sol) / position.highest_price;
            if drop > 0.50 {
                warnings.push(RugWarning {
                    kind: RugWarningKind::DeepDrawdown,
                    severity: RugSeverity::Critical,
                });
            }
        }

        let creator_sell_critical = warnings
            .iter()
            .any(|w| w.kind == RugWarningKind::CreatorSell && w.severity == RugSeverity::Critical);

        for _ in warnings.iter().filter(|w| w.severity == RugSeverity::Critical) {
            self.critical_at.push_back(now);
        }
        while self
            .critical_at
            .front()
            .is_some_and(|t| now.saturating_sub_ms(*t) > Self::CRITICAL_WINDOW_MS)
        {
            self.critical_at.pop_front();
        }

        let should_exit = creator_sell_critical || self.critical_at.len() >= 2;
        (warnings, should_exit)
    }
}

/// Result of a position exit, handed back to the Risk Guard and the journal.
#[derive(Debug, Clone)]
pub struct ExitOutcome {
    pub position: Position,
    pub reason: CloseReason,
    pub realized_pnl_sol: f64,
    pub was_estimated: bool,
}

/// Owns every open/closing position, keyed by id with a mint index for O(1)
/// per-mint lookups. Holds no lock across an `await`: state is read/cloned,
/// the lock dropped, then external calls happen, then state is written back.
pub struct PositionManager {
    config: PositionConfig,
    positions: RwLock<HashMap<Uuid, Position>>,
    by_mint: RwLock<HashMap<TokenId, Uuid>>,
    rug_monitors: RwLock<HashMap<TokenId, RugMonitor>>,
    events: EventSender,
}

impl PositionManager {
    pub fn new(config: PositionConfig, events: EventSender) -> Self {
        Self {
            config,
            positions: RwLock::new(HashMap::new()),
            by_mint: RwLock::new(HashMap::new()),
            rug_monitors: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Opens a position sized by `amount_sol` (as computed by the Risk
    /// Guard), deriving the TP ladder/trailing-stop/stop-loss shape from
    /// configuration.
    pub fn open(
        &self,
        mint: TokenId,
        symbol: String,
        entry_price: f64,
        entry_amount_sol: f64,
        entry_amount_tokens: u128,
        pool_type: PoolType,
        now: Timestamp,
    ) -> Position {
        let ladder: Vec<TPLevel> = self
            .config
            .tp_ladder
            .iter()
            .map(|(multiple, fraction)| TPLevel {
                price_multiple: *multiple,
                fraction_of_initial: *fraction,
            })
            .collect();
        let tp_sold = vec![false; ladder.len()];

        let position = Position {
            id: Uuid::new_v4(),
            mint: mint.clone(),
            symbol,
            entry_time: now,
            entry_price,
            entry_amount_sol,
            entry_amount_tokens,
            current_price: entry_price,
            highest_price: entry_price,
            stop_loss_fraction: self.config.stop_loss_fraction,
            take_profit_ladder: ladder,
            trailing_stop: Some(TrailingStop {
                activation_multiple: self.config.trailing_activation_multiple,
                drawdown_fraction: self.config.trailing_drawdown_fraction,
                armed: false,
            }),
            tp_sold,
            partial_close_realized_sol: 0.0,
            status: PositionStatus::Open,
            pool_type,
        };

        self.positions.write().insert(position.id, position.clone());
        self.by_mint.write().insert(mint.clone(), position.id);
        let _ = self.events.send(CoreEvent::PositionOpened {
            position_id: position.id,
            mint,
        });
        position
    }

    pub fn get(&self, position_id: Uuid) -> Option<Position> {
        self.positions.read().get(&position_id).cloned()
    }

    pub fn get_by_mint(&self, mint: &TokenId) -> Option<Position> {
        let id = *self.by_mint.read().get(mint)?;
        self.positions.read().get(&id).cloned()
    }

    pub fn open_position_count(&self) -> usize {
        self.positions
            .read()
            .values()
            .filter(|p| p.status == PositionStatus::Open)
            .count()
    }

    pub fn all_open(&self) -> Vec<Position> {
        self.positions
            .read()
            .values()
            .filter(|p| p.status == PositionStatus::Open)
            .cloned()
            .collect()
    }

    pub fn total_position_value_sol(&self) -> f64 {
        self.all_open()
            .iter()
            .map(|p| p.current_price * p.entry_amount_tokens as f64 * p.remaining_fraction())
            .sum()
    }

    pub fn total_unrealized_pnl_sol(&self) -> f64 {
        self.all_open().iter().map(|p| p.unrealized_pnl_sol()).sum()
    }

    /// Runs the exit-rule evaluation for `mint` against a new price tick and
    /// executes whatever actions it produces. Returns `Some` if the position
    /// fully closed as a result.
    pub async fn on_price(
        &self,
        mint: &TokenId,
        price: f64,
        pump_metrics: Option<&PumpMetrics>,
        pump_detector: &PumpDetector,
        executor: &dyn SwapExecutor,
        journal: &dyn TradeJournal,
        now: Timestamp,
    ) -> Result<Option<ExitOutcome>> {
        let Some(position_id) = self.by_mint.read().get(mint).copied() else {
            return Ok(None);
        };
        let Some(mut position) = self.positions.read().get(&position_id).cloned() else {
            return Ok(None);
        };
        if position.status != PositionStatus::Open {
            return Ok(None);
        }

        let actions = evaluate_exits(&mut position, price, pump_metrics, pump_detector);
        self.positions.write().insert(position.id, position.clone());

        for action in actions {
            match action {
                ExitAction::PartialTp { level_index, fraction } => {
                    let sell_amount =
                        (position.entry_amount_tokens as f64 * fraction).round() as u128;
                    match executor
                        .sell(mint, sell_amount, EXIT_SLIPPAGE_BPS, Urgency::Normal)
                        .await
                    {
                        Ok(outcome) => {
                            position.partial_close_realized_sol += outcome.sol_received;
                            self.positions.write().insert(position.id, position.clone());
                            let _ = self.events.send(CoreEvent::PartialClose {
                                position_id: position.id,
                                fraction,
                                realized_sol: outcome.sol_received,
                            });
                        }
                        Err(e) => {
                            warn!(%mint, level_index, error = %e, "take-profit sell failed, will retry next tick");
                            position.tp_sold[level_index] = false;
                            self.positions.write().insert(position.id, position.clone());
                        }
                    }
                }
                ExitAction::FullExit { reason } => {
                    let outcome = self.close(position.id, reason, executor, journal, now).await?;
                    return Ok(Some(outcome));
                }
            }
        }
        Ok(None)
    }

    /// Feeds a trade into the per-mint rug monitor and, if the monitor's
    /// exit trigger fires, closes the position with `RugDetected`.
    pub async fn on_trade(
        &self,
        trade: &TradeEvent,
        creator: &WalletId,
        executor: &dyn SwapExecutor,
        journal: &dyn TradeJournal,
        now: Timestamp,
    ) -> Result<Option<ExitOutcome>> {
        let (warnings, should_exit) = self.evaluate_rug(trade, creator, now);
        if !warnings.is_empty() {
            let critical = warnings.iter().any(|w| w.severity == RugSeverity::Critical);
            let _ = self.events.send(CoreEvent::RugAlert {
                mint: trade.mint.clone(),
                critical,
            });
        }
        if should_exit {
            if let Some(position_id) = self.by_mint.read().get(&trade.mint).copied() {
                let outcome = self
                    .close(position_id, CloseReason::RugDetected, executor, journal, now)
                    .await?;
                return Ok(Some(outcome));
            }
        }
        Ok(None)
    }

    /// Pure half of [`Self::on_trade`]: updates rug-monitor state and
    /// reports warnings/exit trigger without touching the executor.
    fn evaluate_rug(
        &self,
        trade: &TradeEvent,
        creator: &WalletId,
        now: Timestamp,
    ) -> (Vec<RugWarning>, bool) {
        let Some(position_id) = self.by_mint.read().get(&trade.mint).copied() else {
            return (Vec::new(), false);
        };
        let Some(position) = self.positions.read().get(&position_id).cloned() else {
            return (Vec::new(), false);
        };
        if position.status != PositionStatus::Open {
            return (Vec::new(), false);
        }
        let is_creator = trade.trader == *creator;
        let mut monitors = self.rug_monitors.write();
        let monitor = monitors.entry(trade.mint.clone()).or_default();
        monitor.evaluate(trade, is_creator, &position, now)
    }

    /// Transitions a position to `Closing` then `Closed`, invoking the
    /// executor for whatever fraction remains unsold. A `Phantom` close
    /// skips the sell (there is nothing left to sell) and books a full loss.
    /// A sell that exhausts its retries downgrades the reason to
    /// `SellFailed` and estimates P&L from the last known price.
    pub async fn close(
        &self,
        position_id: Uuid,
        reason: CloseReason,
        executor: &dyn SwapExecutor,
        journal: &dyn TradeJournal,
        _now: Timestamp,
    ) -> Result<ExitOutcome> {
        let mut position = {
            let mut positions = self.positions.write();
            let position = positions
                .get_mut(&position_id)
                .ok_or_else(|| Error::PositionNotFound(position_id.to_string()))?;
            position.status = PositionStatus::Closing;
            position.clone()
        };

        let remaining_tokens =
            (position.entry_amount_tokens as f64 * position.remaining_fraction()).round() as u128;

        let (final_reason, realized_pnl_sol, was_estimated) = if reason == CloseReason::Phantom {
            (reason, -position.entry_amount_sol, false)
        } else if remaining_tokens == 0 {
            (reason, position.partial_close_realized_sol - position.entry_amount_sol, false)
        } else {
            let mint = position.mint.clone();
            match with_retry("position_close_sell", || {
                executor.sell(&mint, remaining_tokens, EXIT_SLIPPAGE_BPS, Urgency::Immediate)
            })
            .await
            {
                Ok(outcome) => {
                    let realized =
                        outcome.sol_received + position.partial_close_realized_sol - position.entry_amount_sol;
                    (reason, realized, false)
                }
                Err(e) => {
                    warn!(mint = %position.mint, error = %e, "sell failed after retries, closing as sell-failed");
                    let estimated_sol_received =
                        (remaining_tokens as f64 * position.current_price - ESTIMATED_SELL_FEE_SOL).max(0.0);
                    let realized = estimated_sol_received + position.partial_close_realized_sol
                        - position.entry_amount_sol;
                    (CloseReason::SellFailed, realized, true)
                }
            }
        };

        position.status = PositionStatus::Closed;
        self.positions.write().remove(&position_id);
        self.by_mint.write().retain(|_, id| *id != position_id);
        self.rug_monitors.write().remove(&position.mint);

        journal
            .close(ExitRecord {
                position_id,
                reason: final_reason.clone(),
                realized_pnl_sol,
                was_estimated,
            })
            .await?;
        let _ = self.events.send(CoreEvent::PositionClosed {
            position_id,
            reason: final_reason.clone(),
            realized_pnl_sol,
        });

        Ok(ExitOutcome {
            position,
            reason: final_reason,
            realized_pnl_sol,
            was_estimated,
        })
    }

    /// Queries on-chain token balance for every open position and closes any
    /// whose balance has fallen below `phantom_fraction` of the entry amount.
    pub async fn reconcile(
        &self,
        phantom_fraction: f64,
        executor: &dyn SwapExecutor,
        journal: &dyn TradeJournal,
        now: Timestamp,
    ) -> Vec<ExitOutcome> {
        let candidates: Vec<(Uuid, TokenId, u128)> = self
            .all_open()
            .into_iter()
            .map(|p| (p.id, p.mint, p.entry_amount_tokens))
            .collect();

        let mut closed = Vec::new();
        for (id, mint, entry_tokens) in candidates {
            let balance = match executor.token_balance(&mint).await {
                Ok(b) => b,
                Err(e) => {
                    warn!(%mint, error = %e, "reconcile balance query failed");
                    continue;
                }
            };
            let threshold = (entry_tokens as f64 * phantom_fraction) as u128;
            if balance < threshold {
                match self.close(id, CloseReason::Phantom, executor, journal, now).await {
                    Ok(outcome) => {
                        let _ = self.events.send(CoreEvent::PhantomDetected { position_id: id });
                        closed.push(outcome);
                    }
                    Err(e) => warn!(%mint, error = %e, "failed to close phantom position"),
                }
            }
        }
        closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PumpDetectorConfig;
    use crate::core::interfaces::test_doubles::{InMemoryTradeJournal, NullSwapExecutor};
    use crate::core::interfaces::event_channel;
    use crate::core::types::{PumpPhase, Timestamp};

    fn mint() -> TokenId {
        TokenId::new("So11111111111111111111111111111111111111112").unwrap()
    }

    fn wallet(n: u8) -> WalletId {
        WalletId::new(format!("So1111111111111111111111111111111111111{:03}", n)).unwrap()
    }

    fn new_position(entry_price: f64) -> Position {
        Position {
            id: Uuid::new_v4(),
            mint: mint(),
            symbol: "TEST".into(),
            entry_time: Timestamp::from_millis(0),
            entry_price,
            entry_amount_sol: 1.0,
            entry_amount_tokens: 1_000_000,
            current_price: entry_price,
            highest_price: entry_price,
            stop_loss_fraction: 0.25,
            take_profit_ladder: vec![
                TPLevel { price_multiple: 1.5, fraction_of_initial: 0.25 },
                TPLevel { price_multiple: 2.0, fraction_of_initial: 0.25 },
                TPLevel { price_multiple: 3.0, fraction_of_initial: 0.25 },
                TPLevel { price_multiple: 5.0, fraction_of_initial: 0.25 },
            ],
            trailing_stop: Some(TrailingStop {
                activation_multiple: 2.0,
                drawdown_fraction: 0.25,
                armed: false,
            }),
            tp_sold: vec![false; 4],
            partial_close_realized_sol: 0.0,
            status: PositionStatus::Open,
            pool_type: PoolType::BondingCurve,
        }
    }

    fn detector() -> PumpDetector {
        PumpDetector::new(PumpDetectorConfig::default())
    }

    #[test]
    fn stop_loss_fires_at_the_boundary() {
        let mut position = new_position(1.0);
        let actions = evaluate_exits(&mut position, 0.75, None, &detector());
        assert_eq!(actions, vec![ExitAction::FullExit { reason: CloseReason::StopLoss }]);
    }

    #[test]
    fn tp_ladder_and_trailing_stop_scenario() {
        let mut position = new_position(1.0);

        let a1 = evaluate_exits(&mut position, 1.5, None, &detector());
        assert_eq!(a1, vec![ExitAction::PartialTp { level_index: 0, fraction: 0.25 }]);

        let a2 = evaluate_exits(&mut position, 2.2, None, &detector());
        assert_eq!(a2, vec![ExitAction::PartialTp { level_index: 1, fraction: 0.25 }]);
        assert!(position.trailing_stop.unwrap().armed);
        assert_eq!(position.highest_price, 2.2);

        let a3 = evaluate_exits(&mut position, 3.1, None, &detector());
        assert_eq!(a3, vec![ExitAction::PartialTp { level_index: 2, fraction: 0.25 }]);
        assert_eq!(position.highest_price, 3.1);

        // 2.3 <= 3.1 * 0.75 = 2.325 -> trailing stop triggers.
        let a4 = evaluate_exits(&mut position, 2.3, None, &detector());
        assert_eq!(a4, vec![ExitAction::FullExit { reason: CloseReason::TrailingStop }]);

        let sold: f64 = position
            .take_profit_ladder
            .iter()
            .zip(position.tp_sold.iter())
            .filter(|(_, s)| **s)
            .map(|(l, _)| l.fraction_of_initial)
            .sum();
        assert!((sold - 0.75).abs() < 1e-9);
    }

    #[test]
    fn rug_exit_on_single_large_creator_dump() {
        let config = PositionConfig::default();
        let (tx, _rx) = event_channel(16);
        let manager = PositionManager::new(config, tx);
        let position = manager.open(
            mint(),
            "TEST".to_string(),
            1.0,
            1.0,
            1_000_000,
            PoolType::BondingCurve,
            Timestamp::from_millis(0),
        );
        assert_eq!(position.status, PositionStatus::Open);

        let creator = wallet(1);
        let trade = TradeEvent {
            timestamp: Timestamp::from_millis(1_000),
            mint: mint(),
            trader: creator.clone(),
            side: Side::Sell,
            token_amount: 10_000,
            sol_amount: 12.0,
            market_cap_sol: 100.0,
            price_sol: 1.0,
            signature: "sig1".to_string(),
        };
        let (warnings, should_exit) = manager.evaluate_rug(&trade, &creator, Timestamp::from_millis(1_000));
        assert!(warnings.iter().any(|w| w.kind == RugWarningKind::LargeDump && w.severity == RugSeverity::Critical));
        assert!(should_exit, "a creator sell that is also a critical dump must trigger exit");
    }

    #[tokio::test]
    async fn phantom_reconciliation_closes_with_full_loss() {
        let config = PositionConfig::default();
        let (tx, _rx) = event_channel(16);
        let manager = PositionManager::new(config, tx);
        manager.open(
            mint(),
            "TEST".to_string(),
            1.0,
            1.0,
            1_000_000,
            PoolType::BondingCurve,
            Timestamp::from_millis(0),
        );

        let executor = NullSwapExecutor::default();
        executor.token_balances.lock().insert(mint().as_str().to_string(), 100);
        let journal = InMemoryTradeJournal::default();

        let closed = manager.reconcile(0.001, &executor, &journal, Timestamp::from_millis(60_000)).await;
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].reason, CloseReason::Phantom);
        assert!((closed[0].realized_pnl_sol - (-1.0)).abs() < 1e-9);
        assert_eq!(manager.open_position_count(), 0);
    }

    #[tokio::test]
    async fn on_price_executes_partial_tp_sell_and_emits_event() {
        let config = PositionConfig::default();
        let (tx, mut rx) = event_channel(16);
        let manager = PositionManager::new(config, tx);
        manager.open(
            mint(),
            "TEST".to_string(),
            1.0,
            1.0,
            1_000_000,
            PoolType::BondingCurve,
            Timestamp::from_millis(0),
        );

        let executor = NullSwapExecutor::default();
        let journal = InMemoryTradeJournal::default();
        let det = detector();

        let outcome = manager
            .on_price(&mint(), 1.5, None, &det, &executor, &journal, Timestamp::from_millis(1_000))
            .await
            .unwrap();
        assert!(outcome.is_none());

        let position = manager.get_by_mint(&mint()).unwrap();
        assert!(position.tp_sold[0]);
        assert!(position.partial_close_realized_sol > 0.0);

        let mut saw_partial_close = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, CoreEvent::PartialClose { .. }) {
                saw_partial_close = true;
            }
        }
        assert!(saw_partial_close);
    }

    #[tokio::test]
    async fn stop_loss_closes_position_and_records_loss() {
        let config = PositionConfig::default();
        let (tx, _rx) = event_channel(16);
        let manager = PositionManager::new(config, tx);
        manager.open(
            mint(),
            "TEST".to_string(),
            1.0,
            1.0,
            1_000_000,
            PoolType::BondingCurve,
            Timestamp::from_millis(0),
        );

        let executor = NullSwapExecutor::default();
        let journal = InMemoryTradeJournal::default();
        let det = detector();

        let outcome = manager
            .on_price(&mint(), 0.70, None, &det, &executor, &journal, Timestamp::from_millis(1_000))
            .await
            .unwrap()
            .expect("stop loss should close the position");
        assert_eq!(outcome.reason, CloseReason::StopLoss);
        assert!(outcome.realized_pnl_sol < 0.0);
        assert_eq!(manager.open_position_count(), 0);
    }
}
