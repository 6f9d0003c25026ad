//! Wires every component into the end-to-end discovery -> entry -> exit
//! pipeline (spec §4.13), with per-mint single-threaded-view concurrency and
//! bounded backpressure (spec §5).
//!
//! Each mint gets exactly one worker task, spawned on first sight, reading
//! from a dedicated `watch` channel for prices (last-write-wins, mirroring
//! `position::price_feed`'s price-cache overwrite) and a bounded `mpsc`
//! channel for trades/evaluation requests. Because only that task ever
//! touches a given mint's sequence of events, no two pieces of logic for the
//! same mint ever run concurrently, without needing a lock held across an
//! `.await`.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::core::entry_evaluator::{EntryDecision, EntryEvaluator};
use crate::core::interfaces::{
    CoreEvent, DataFeed, EventSender, FeedEvent, MarketDataProvider, OpenRecord, SwapExecutor,
    TradeJournal, Urgency,
};
use crate::core::position_manager::PositionManager;
use crate::core::pump_detector::PumpDetector;
use crate::core::reconciler::Reconciler;
use crate::core::risk_guard::{DailyStats, RiskGuard};
use crate::core::retry::{with_retry, with_timeout};
use crate::core::safety::SafetyAnalyzer;
use crate::core::scoring::{HolderShare, ScoringEngine};
use crate::core::smart_money::SmartMoneyTracker;
use crate::core::types::{
    NewTokenEvent, PoolType, PriceSample, RiskState, Timestamp, TokenId, TradeEvent, WalletId,
};
use crate::core::velocity::VelocityTracker;
use crate::core::watchlist::{HardFilterResult, Watchlist};

/// Swap slippage used for entry buys. Exits use a wider tolerance
/// (`position_manager::EXIT_SLIPPAGE_BPS`) since they must fill regardless.
const ENTRY_SLIPPAGE_BPS: u32 = 300;
/// How many top holders to pull per evaluation; shared across the scoring
/// engine's concentration check and the smart-money tally.
const TOP_HOLDERS_LIMIT: usize = 20;

enum MintJob {
    Trade(TradeEvent),
    Evaluate,
}

#[derive(Clone)]
struct MintChannels {
    price_tx: watch::Sender<Option<PriceSample>>,
    job_tx: mpsc::Sender<MintJob>,
}

/// Point-in-time snapshot for the `status` CLI command.
#[derive(Debug, Clone)]
pub struct OrchestratorStats {
    pub open_position_count: usize,
    pub total_unrealized_pnl_sol: f64,
    pub risk_state: RiskState,
    pub daily_stats: DailyStats,
}

/// The pipeline. Holds every stateful component; external collaborators
/// (feed, executor, journal, market data) are injected as trait objects.
pub struct Orchestrator {
    config: Config,
    watchlist: tokio::sync::Mutex<Watchlist>,
    velocity: tokio::sync::Mutex<VelocityTracker>,
    pump_detector: tokio::sync::Mutex<PumpDetector>,
    safety: SafetyAnalyzer,
    smart_money: SmartMoneyTracker,
    scoring: ScoringEngine,
    entry_evaluator: EntryEvaluator,
    risk_guard: Arc<RiskGuard>,
    positions: Arc<PositionManager>,
    market_data: Arc<dyn MarketDataProvider>,
    executor: Arc<dyn SwapExecutor>,
    journal: Arc<dyn TradeJournal>,
    events: EventSender,
    mint_workers: DashMap<TokenId, MintChannels>,
    passed_hard_filters: DashMap<TokenId, ()>,
    symbols: DashMap<TokenId, String>,
    creators: DashMap<TokenId, WalletId>,
    pool_types: DashMap<TokenId, PoolType>,
}

impl Orchestrator {
    pub fn new(
        config: Config,
        market_data: Arc<dyn MarketDataProvider>,
        executor: Arc<dyn SwapExecutor>,
        journal: Arc<dyn TradeJournal>,
        events: EventSender,
    ) -> Arc<Self> {
        let min_data_points = config.watchlist.min_data_points;
        let risk_guard = Arc::new(RiskGuard::new(
            config.risk.clone(),
            config.sizing.clone(),
            events.clone(),
        ));
        let positions = Arc::new(PositionManager::new(config.position.clone(), events.clone()));

        Arc::new(Self {
            watchlist: tokio::sync::Mutex::new(Watchlist::new(config.watchlist.clone())),
            velocity: tokio::sync::Mutex::new(VelocityTracker::new(config.velocity.clone())),
            pump_detector: tokio::sync::Mutex::new(PumpDetector::new(config.pump_detector.clone())),
            safety: SafetyAnalyzer::new(),
            smart_money: SmartMoneyTracker::with_default_classifier(),
            scoring: ScoringEngine::new(config.scoring.clone()),
            entry_evaluator: EntryEvaluator::new(config.entry.clone(), min_data_points),
            risk_guard,
            positions,
            market_data,
            executor,
            journal,
            events,
            mint_workers: DashMap::new(),
            passed_hard_filters: DashMap::new(),
            symbols: DashMap::new(),
            creators: DashMap::new(),
            pool_types: DashMap::new(),
            config,
        })
    }

    pub fn risk_guard(&self) -> &Arc<RiskGuard> {
        &self.risk_guard
    }

    pub fn positions(&self) -> &Arc<PositionManager> {
        &self.positions
    }

    pub async fn stats(&self) -> OrchestratorStats {
        OrchestratorStats {
            open_position_count: self.positions.open_position_count(),
            total_unrealized_pnl_sol: self.positions.total_unrealized_pnl_sol(),
            risk_state: self.risk_guard.state(),
            daily_stats: self.risk_guard.daily_stats(),
        }
    }

    /// Builds a [`Reconciler`] sharing this orchestrator's position manager
    /// and event bus, and spawns its periodic polling loop.
    pub fn start_reconciler<F, Fut>(
        self: &Arc<Self>,
        wallet_mints_fn: F,
        shutdown_rx: broadcast::Receiver<()>,
    ) where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Vec<(TokenId, u128)>> + Send + 'static,
    {
        let reconciler = Arc::new(Reconciler::new(
            self.config.reconciler.clone(),
            Arc::clone(&self.positions),
            self.events.clone(),
        ));
        reconciler.start(
            Arc::clone(&self.executor),
            Arc::clone(&self.journal),
            wallet_mints_fn,
            shutdown_rx,
        );
    }

    /// Drives `feed` until it closes or `shutdown_rx` fires. Each event is
    /// routed to its mint's worker (spawning one on first sight) and
    /// processed there; `run` itself never blocks on a single mint. A
    /// periodic `StatsUpdate` is emitted alongside the main loop.
    pub async fn run(self: Arc<Self>, mut feed: Box<dyn DataFeed>, mut shutdown_rx: broadcast::Receiver<()>) {
        self.spawn_stats_reporter(shutdown_rx.resubscribe());

        loop {
            tokio::select! {
                event = feed.next_event() => {
                    match event {
                        Some(event) => self.handle_event(event).await,
                        None => {
                            info!("data feed closed, stopping orchestrator loop");
                            break;
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("orchestrator loop shutting down");
                    break;
                }
            }
        }
    }

    /// Spawns a loop that emits `CoreEvent::StatsUpdate` every
    /// `stats_interval_secs`, combining both analysis-kind caches' hit
    /// rates into one figure.
    fn spawn_stats_reporter(self: &Arc<Self>, mut shutdown_rx: broadcast::Receiver<()>) {
        let this = Arc::clone(self);
        let interval = Duration::from_secs(self.config.orchestrator.stats_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let safety_stats = this.safety.cache_stats();
                        let smart_money_stats = this.smart_money.cache_stats();
                        let total_hits = safety_stats.hits + smart_money_stats.hits;
                        let total_lookups = total_hits + safety_stats.misses + smart_money_stats.misses;
                        let cache_hit_rate = if total_lookups == 0 {
                            0.0
                        } else {
                            total_hits as f64 / total_lookups as f64
                        };
                        let _ = this.events.send(CoreEvent::StatsUpdate {
                            open_position_count: this.positions.open_position_count(),
                            cache_hit_rate,
                            risk_paused: this.risk_guard.state().is_paused,
                        });
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });
    }

    pub async fn handle_event(self: &Arc<Self>, event: FeedEvent) {
        match event {
            FeedEvent::NewToken(e) => self.on_new_token(e).await,
            FeedEvent::Trade(t) => self.enqueue_trade(t),
            FeedEvent::Price(mint, sample) => self.enqueue_price(mint, sample),
        }
    }

    /// Registers the token, emits `TokenDiscovered`, then schedules a first
    /// entry evaluation after `new_token_debounce_ms` — enough time for a
    /// handful of price/trade samples to land before judging the token.
    async fn on_new_token(self: &Arc<Self>, event: NewTokenEvent) {
        let mint = event.mint.clone();
        self.symbols.insert(mint.clone(), event.symbol.clone());
        self.creators.insert(mint.clone(), event.creator.clone());
        self.pool_types.insert(
            mint.clone(),
            if event.bonding_curve_key.is_some() {
                PoolType::BondingCurve
            } else {
                PoolType::DexAmm
            },
        );

        {
            let mut wl = self.watchlist.lock().await;
            wl.add(mint.clone(), event.creator.clone(), event.timestamp);
        }
        let _ = self.events.send(CoreEvent::TokenDiscovered { mint: mint.clone() });

        let channels = self.ensure_mint_worker(mint.clone());
        let debounce = Duration::from_millis(self.config.orchestrator.new_token_debounce_ms);
        tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if channels.job_tx.try_send(MintJob::Evaluate).is_err() {
                debug!(%mint, "debounced evaluate dropped, mint queue full");
            }
        });
    }

    fn enqueue_trade(self: &Arc<Self>, trade: TradeEvent) {
        let mint = trade.mint.clone();
        let channels = self.ensure_mint_worker(mint.clone());
        if channels.job_tx.try_send(MintJob::Trade(trade)).is_err() {
            // The Velocity Tracker's 60s window discards old trades anyway;
            // dropping the overflow here just moves that discard earlier.
            warn!(%mint, "trade queue full, dropping trade event");
        }
    }

    fn enqueue_price(self: &Arc<Self>, mint: TokenId, sample: PriceSample) {
        let channels = self.ensure_mint_worker(mint);
        // `watch` coalesces by construction: a burst of price ticks collapses
        // to whatever was most recently sent by the time the worker reads it.
        let _ = channels.price_tx.send(Some(sample));
    }

    fn ensure_mint_worker(self: &Arc<Self>, mint: TokenId) -> MintChannels {
        if let Some(existing) = self.mint_workers.get(&mint) {
            return existing.clone();
        }

        let (price_tx, mut price_rx) = watch::channel(None);
        let (job_tx, mut job_rx) = mpsc::channel(self.config.orchestrator.per_mint_queue_capacity);
        let channels = MintChannels { price_tx, job_tx };
        self.mint_workers.insert(mint.clone(), channels.clone());

        let this = Arc::clone(self);
        let worker_mint = mint;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = price_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let sample = price_rx.borrow_and_update().clone();
                        if let Some(sample) = sample {
                            this.process_price(&worker_mint, sample).await;
                        }
                    }
                    job = job_rx.recv() => {
                        match job {
                            Some(MintJob::Trade(trade)) => this.process_trade(trade).await,
                            Some(MintJob::Evaluate) => this.evaluate(&worker_mint).await,
                            None => break,
                        }
                    }
                }
            }
        });

        channels
    }

    async fn process_trade(&self, trade: TradeEvent) {
        let mint = trade.mint.clone();
        {
            self.velocity.lock().await.record(trade.clone());
        }
        {
            self.watchlist
                .lock()
                .await
                .record_trade(&mint, trade.clone(), Timestamp::now());
        }

        if let Some(creator) = self.creators.get(&mint).map(|r| r.clone()) {
            match self
                .positions
                .on_trade(&trade, &creator, self.executor.as_ref(), self.journal.as_ref(), Timestamp::now())
                .await
            {
                Ok(Some(outcome)) => self.finalize_close(outcome).await,
                Ok(None) => {}
                Err(e) => warn!(%mint, error = %e, "on_trade failed"),
            }
        }

        if self.passed_hard_filters.contains_key(&mint) {
            self.evaluate(&mint).await;
        }
    }

    async fn process_price(&self, mint: &TokenId, sample: PriceSample) {
        {
            self.watchlist.lock().await.record_price(mint, sample.clone());
        }

        let (prices, lowest_price) = {
            let wl = self.watchlist.lock().await;
            match wl.get(mint) {
                Some(token) => (
                    token.prices.iter().map(|(_, p)| p.clone()).collect::<Vec<_>>(),
                    token.lowest_price,
                ),
                None => return,
            }
        };
        let velocity_metrics = { self.velocity.lock().await.metrics(mint) };
        let pump_metrics = {
            let mut pd = self.pump_detector.lock().await;
            pd.compute(mint, &prices, velocity_metrics.as_ref(), lowest_price, Timestamp::now().millis())
        };

        if self.positions.get_by_mint(mint).is_some() {
            let pd = self.pump_detector.lock().await;
            match self
                .positions
                .on_price(
                    mint,
                    sample.price_sol,
                    pump_metrics.as_ref(),
                    &pd,
                    self.executor.as_ref(),
                    self.journal.as_ref(),
                    Timestamp::now(),
                )
                .await
            {
                Ok(Some(outcome)) => {
                    drop(pd);
                    self.finalize_close(outcome).await;
                }
                Ok(None) => {}
                Err(e) => warn!(%mint, error = %e, "on_price failed"),
            }
        }

        if self.passed_hard_filters.contains_key(mint) {
            self.evaluate(mint).await;
        }
    }

    async fn finalize_close(&self, outcome: crate::core::position_manager::ExitOutcome) {
        let equity = self.equity_sol().await;
        self.risk_guard
            .on_position_closed(outcome.realized_pnl_sol, equity, Timestamp::now());
    }

    async fn equity_sol(&self) -> f64 {
        let wallet = self.executor.wallet_balance_sol().await.unwrap_or(0.0);
        wallet + self.positions.total_position_value_sol()
    }

    /// The evaluation pipeline (spec §4.13): hard filters, safety analysis,
    /// entry decision, scoring, risk sizing, then (if everything clears and
    /// trading is enabled) a buy and a new position. Bails early on any
    /// rejection along the way.
    async fn evaluate(&self, mint: &TokenId) {
        let now = Timestamp::now();

        let (prices, lowest_price, market_cap_sol, age_seconds) = {
            let wl = self.watchlist.lock().await;
            match wl.passes_hard_filters(mint, now) {
                HardFilterResult::Pass => {
                    self.passed_hard_filters.insert(mint.clone(), ());
                }
                HardFilterResult::Reject(reason) => {
                    self.passed_hard_filters.remove(mint);
                    debug!(%mint, reason, "evaluate: hard filter rejected");
                    return;
                }
            }
            let Some(token) = wl.get(mint) else { return };
            let market_cap_sol = token
                .prices
                .newest()
                .map(|(_, p)| p.market_cap_sol)
                .unwrap_or(0.0);
            let age_seconds = now.saturating_sub_ms(token.first_seen) / 1000;
            (
                token.prices.iter().map(|(_, p)| p.clone()).collect::<Vec<_>>(),
                token.lowest_price,
                market_cap_sol,
                age_seconds,
            )
        };

        let velocity_metrics = { self.velocity.lock().await.metrics(mint) };
        let pump_metrics = {
            let mut pd = self.pump_detector.lock().await;
            pd.compute(mint, &prices, velocity_metrics.as_ref(), lowest_price, now.millis())
        };

        let decision = {
            let pd = self.pump_detector.lock().await;
            self.entry_evaluator.evaluate(
                age_seconds,
                market_cap_sol,
                velocity_metrics.as_ref(),
                prices.len(),
                &pd,
                pump_metrics.as_ref(),
            )
        };
        let source = match decision {
            EntryDecision::Enter { source } => source,
            EntryDecision::Wait { reason } => {
                debug!(%mint, reason, "evaluate: entry waiting");
                return;
            }
            EntryDecision::Skip { reason } => {
                debug!(%mint, reason, "evaluate: entry skipped");
                return;
            }
        };

        let safety_timeout = Duration::from_millis(self.config.orchestrator.safety_fetch_timeout_ms);
        let market_data = Arc::clone(&self.market_data);
        let mint_for_fetch = mint.clone();
        let safety_result = match with_timeout(
            safety_timeout,
            self.safety.get_or_analyze(mint, now, move || async move {
                market_data.fetch_metadata(&mint_for_fetch).await
            }),
        )
        .await
        {
            Ok(result) => result,
            Err(e) => {
                warn!(%mint, error = %e, "evaluate: safety fetch failed, skipping");
                return;
            }
        };
        let _ = self.events.send(CoreEvent::SafetyCheck {
            mint: mint.clone(),
            is_safe: safety_result.is_safe,
            risks: safety_result.risks.clone(),
        });

        let holder_timeout = Duration::from_millis(self.config.orchestrator.holder_fetch_timeout_ms);
        let holders = match with_timeout(holder_timeout, self.market_data.fetch_holders(mint, TOP_HOLDERS_LIMIT)).await
        {
            Ok(holders) => holders,
            Err(e) => {
                warn!(%mint, error = %e, "evaluate: holder fetch failed, proceeding with none");
                Vec::new()
            }
        };
        let smart_money_wallets: Vec<WalletId> = holders
            .iter()
            .filter(|(wallet, _, stats)| self.smart_money.is_smart_money(wallet, stats))
            .map(|(wallet, _, _)| wallet.clone())
            .collect();
        let _ = self.events.send(CoreEvent::SmartMoneyCheck {
            mint: mint.clone(),
            count: smart_money_wallets.len(),
        });
        let holder_shares: Vec<HolderShare> = holders
            .iter()
            .map(|(wallet, share, _)| HolderShare {
                address: wallet.as_str().to_string(),
                share: *share,
            })
            .collect();

        let liquidity_usd = match self.market_data.liquidity_usd(mint).await {
            Ok(usd) => usd,
            Err(e) => {
                warn!(%mint, error = %e, "evaluate: liquidity fetch failed, treating as zero");
                0.0
            }
        };
        // Approximated from the tracked price series rather than a strict
        // trailing-1h window; the Watchlist does not retain a separate
        // hourly series.
        let momentum_1h_percent = {
            let wl = self.watchlist.lock().await;
            wl.extract_features(mint, now).map(|f| f.price_change * 100.0).unwrap_or(0.0)
        };

        let score = self
            .scoring
            .score(&safety_result, smart_money_wallets.len(), liquidity_usd, momentum_1h_percent, &holder_shares);
        if !self.scoring.meets_minimum(&score) {
            debug!(%mint, score = score.total, source = ?source, "evaluate: score below minimum");
            return;
        }

        if !self.config.orchestrator.enable_trading {
            let _ = self.events.send(CoreEvent::TradeDecision {
                mint: mint.clone(),
                approve: false,
                size_sol: 0.0,
                reasons: vec!["trading disabled".to_string()],
            });
            return;
        }

        if !self.risk_guard.can_trade(now, self.positions.open_position_count()) {
            let _ = self.events.send(CoreEvent::TradeDecision {
                mint: mint.clone(),
                approve: false,
                size_sol: 0.0,
                reasons: vec!["risk guard blocked".to_string()],
            });
            return;
        }

        let wallet_balance_sol = match self.executor.wallet_balance_sol().await {
            Ok(balance) => balance,
            Err(e) => {
                warn!(%mint, error = %e, "evaluate: wallet balance fetch failed, aborting entry");
                return;
            }
        };
        let momentum = { self.velocity.lock().await.momentum_strength(mint) };
        let size_sol =
            self.risk_guard
                .compute_size(self.config.sizing.base_position_sol, score.total, momentum, wallet_balance_sol);
        if size_sol <= 0.0 {
            debug!(%mint, "evaluate: computed size is zero, skipping entry");
            return;
        }

        let _ = self.events.send(CoreEvent::TradeDecision {
            mint: mint.clone(),
            approve: true,
            size_sol,
            reasons: vec![format!("score {} via {:?}", score.total, source)],
        });

        let swap_timeout = Duration::from_millis(self.config.orchestrator.swap_submission_timeout_ms);
        let executor = Arc::clone(&self.executor);
        let mint_for_buy = mint.clone();
        let buy_outcome = match with_timeout(
            swap_timeout,
            with_retry("swap_buy", move || {
                let executor = Arc::clone(&executor);
                let mint = mint_for_buy.clone();
                async move { executor.buy(&mint, size_sol, ENTRY_SLIPPAGE_BPS, Urgency::High).await }
            }),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(%mint, error = %e, "evaluate: buy failed, abandoning entry");
                return;
            }
        };
        let _ = self.events.send(CoreEvent::TradeExecuted {
            mint: mint.clone(),
            signature: buy_outcome.signature.clone(),
        });

        let symbol = self.symbols.get(mint).map(|r| r.clone()).unwrap_or_default();
        let pool_type = self.pool_types.get(mint).map(|r| *r).unwrap_or(PoolType::BondingCurve);
        let position = self.positions.open(
            mint.clone(),
            symbol,
            buy_outcome.price_effective,
            size_sol,
            buy_outcome.tokens_received,
            pool_type,
            now,
        );
        if let Err(e) = self.journal.open(OpenRecord { position, score }).await {
            warn!(%mint, error = %e, "evaluate: journal write failed after open");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::interfaces::test_doubles::{
        InMemoryTradeJournal, NullMarketDataProvider, NullSwapExecutor,
    };
    use crate::core::interfaces::event_channel;
    use crate::core::types::Side;

    fn mint() -> TokenId {
        TokenId::new("So11111111111111111111111111111111111111112").unwrap()
    }

    fn wallet(n: u8) -> WalletId {
        WalletId::new(format!("So1111111111111111111111111111111111111{:03}", n)).unwrap()
    }

    fn orchestrator() -> Arc<Orchestrator> {
        let (tx, _rx) = event_channel(64);
        Orchestrator::new(
            Config::default(),
            Arc::new(NullMarketDataProvider),
            Arc::new(NullSwapExecutor::default()),
            Arc::new(InMemoryTradeJournal::default()),
            tx,
        )
    }

    #[tokio::test]
    async fn new_token_is_added_to_the_watchlist_and_emits_discovery() {
        let (tx, mut rx) = event_channel(64);
        let orchestrator = Orchestrator::new(
            Config::default(),
            Arc::new(NullMarketDataProvider),
            Arc::new(NullSwapExecutor::default()),
            Arc::new(InMemoryTradeJournal::default()),
            tx,
        );

        orchestrator
            .on_new_token(NewTokenEvent {
                timestamp: Timestamp::from_millis(0),
                mint: mint(),
                creator: wallet(1),
                symbol: "TEST".to_string(),
                name: "Test Token".to_string(),
                initial_price_sol: 0.001,
                initial_market_cap_sol: 20.0,
                bonding_curve_key: Some("curve".to_string()),
                virtual_sol: 30.0,
                virtual_tokens: 1_000_000_000.0,
            })
            .await;

        let mut saw_discovery = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, CoreEvent::TokenDiscovered { .. }) {
                saw_discovery = true;
            }
        }
        assert!(saw_discovery);
        assert_eq!(orchestrator.symbols.get(&mint()).map(|s| s.clone()), Some("TEST".to_string()));
    }

    #[tokio::test]
    async fn trade_for_unknown_mint_does_not_panic() {
        let orchestrator = orchestrator();
        let trade = TradeEvent {
            timestamp: Timestamp::from_millis(0),
            mint: mint(),
            trader: wallet(2),
            side: Side::Buy,
            token_amount: 1_000,
            sol_amount: 0.1,
            market_cap_sol: 20.0,
            price_sol: 0.001,
            signature: "sig".to_string(),
        };
        orchestrator.process_trade(trade).await;
        assert!(orchestrator.positions.get_by_mint(&mint()).is_none());
    }

    #[tokio::test]
    async fn evaluate_skips_when_hard_filters_reject_unknown_mint() {
        let orchestrator = orchestrator();
        orchestrator.evaluate(&mint()).await;
        assert!(!orchestrator.passed_hard_filters.contains_key(&mint()));
    }
}
