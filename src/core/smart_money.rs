//! Wallet quality classification and per-token smart-money tallying (spec §4.7).

use std::time::Duration;

use tracing::warn;

use crate::core::cache;
use crate::core::cache::TtlCache;
use crate::core::types::{TokenId, WalletId};

const CACHE_NAMESPACE: &str = "smart_money";
const CACHE_TTL: Duration = Duration::from_secs(6 * 60 * 60);
const TOP_HOLDERS_LIMIT: usize = 20;

/// Prior trade history summary used to classify a wallet. Kept deliberately
/// narrow: the classifier only needs aggregate stats, not raw trades.
#[derive(Debug, Clone, Default)]
pub struct WalletTradeStats {
    pub total_trades: u32,
    pub win_rate: f64,
    pub avg_roi: f64,
    pub consistency_score: f64,
}

/// Classifies a wallet's trading quality from its history. The heuristic
/// itself is swappable so the tracker's caching/counting logic stays stable
/// even if the underlying model changes.
pub trait SmartMoneyClassifier: Send + Sync {
    fn is_smart_money(&self, stats: &WalletTradeStats) -> bool;
}

/// Default heuristic: weighted combination of win rate, ROI and consistency.
pub struct HeuristicClassifier {
    pub min_trades: u32,
    pub threshold: f64,
}

impl Default for HeuristicClassifier {
    fn default() -> Self {
        Self {
            min_trades: 10,
            threshold: 0.65,
        }
    }
}

impl SmartMoneyClassifier for HeuristicClassifier {
    fn is_smart_money(&self, stats: &WalletTradeStats) -> bool {
        if stats.total_trades < self.min_trades {
            return false;
        }
        let score = stats.win_rate * 0.4 + stats.avg_roi.clamp(0.0, 2.0) / 2.0 * 0.35
            + stats.consistency_score * 0.25;
        score >= self.threshold
    }
}

/// External-lookup failures for holder/history fetches, tallied as a
/// silent `(0, [])` result per spec.
#[derive(Debug, Clone)]
pub struct HolderLookupError(pub String);

/// Tracks per-wallet smart-money classification with TTL caching, and tallies
/// counts across a token's top holders.
pub struct SmartMoneyTracker {
    classifier: Box<dyn SmartMoneyClassifier>,
    cache: TtlCache<bool>,
}

impl SmartMoneyTracker {
    pub fn new(classifier: Box<dyn SmartMoneyClassifier>) -> Self {
        Self {
            classifier,
            cache: TtlCache::new(),
        }
    }

    pub fn with_default_classifier() -> Self {
        Self::new(Box::new(HeuristicClassifier::default()))
    }

    pub fn cache_stats(&self) -> cache::CacheStats {
        self.cache.stats()
    }

    pub fn is_smart_money(&self, wallet: &WalletId, stats: &WalletTradeStats) -> bool {
        let key = cache::key(CACHE_NAMESPACE, wallet.as_str());
        if let Some(cached) = self.cache.get(&key) {
            return cached;
        }
        let verdict = self.classifier.is_smart_money(stats);
        self.cache.set(key, verdict, CACHE_TTL);
        verdict
    }

    /// Fetches top holders for `mint` and tallies how many classify as
    /// smart money. Fetch failures return `(0, [])` and are logged, never
    /// propagated, so the pipeline can always proceed.
    pub async fn count_for<F, Fut>(&self, mint: &TokenId, fetch_holders: F) -> (usize, Vec<WalletId>)
    where
        F: FnOnce(usize) -> Fut,
        Fut: std::future::Future<Output = Result<Vec<(WalletId, WalletTradeStats)>, HolderLookupError>>,
    {
        let holders = match fetch_holders(TOP_HOLDERS_LIMIT).await {
            Ok(holders) => holders,
            Err(e) => {
                warn!(%mint, error = %e.0, "smart money holder fetch failed");
                return (0, Vec::new());
            }
        };

        let mut smart_wallets = Vec::new();
        for (wallet, stats) in holders {
            if self.is_smart_money(&wallet, &stats) {
                smart_wallets.push(wallet);
            }
        }
        let count = smart_wallets.len();
        (count, smart_wallets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet(n: u8) -> WalletId {
        WalletId::new(format!("So1111111111111111111111111111111111111{:03}", n)).unwrap()
    }

    fn mint() -> TokenId {
        TokenId::new("So11111111111111111111111111111111111111112").unwrap()
    }

    #[test]
    fn heuristic_rejects_below_min_trades() {
        let classifier = HeuristicClassifier::default();
        let stats = WalletTradeStats {
            total_trades: 2,
            win_rate: 0.9,
            avg_roi: 2.0,
            consistency_score: 1.0,
        };
        assert!(!classifier.is_smart_money(&stats));
    }

    #[test]
    fn heuristic_accepts_strong_track_record() {
        let classifier = HeuristicClassifier::default();
        let stats = WalletTradeStats {
            total_trades: 40,
            win_rate: 0.8,
            avg_roi: 1.5,
            consistency_score: 0.8,
        };
        assert!(classifier.is_smart_money(&stats));
    }

    #[test]
    fn is_smart_money_caches_verdict() {
        let tracker = SmartMoneyTracker::with_default_classifier();
        let stats = WalletTradeStats {
            total_trades: 40,
            win_rate: 0.9,
            avg_roi: 2.0,
            consistency_score: 1.0,
        };
        assert!(tracker.is_smart_money(&wallet(1), &stats));
        // Second call hits cache even with materially different (ignored) stats.
        let weak_stats = WalletTradeStats::default();
        assert!(tracker.is_smart_money(&wallet(1), &weak_stats));
    }

    #[tokio::test]
    async fn count_for_tallies_only_smart_wallets() {
        let tracker = SmartMoneyTracker::with_default_classifier();
        let strong = WalletTradeStats {
            total_trades: 40,
            win_rate: 0.9,
            avg_roi: 2.0,
            consistency_score: 1.0,
        };
        let weak = WalletTradeStats {
            total_trades: 40,
            win_rate: 0.3,
            avg_roi: 0.1,
            consistency_score: 0.2,
        };
        let (count, wallets) = tracker
            .count_for(&mint(), |_limit| async {
                Ok(vec![
                    (wallet(1), strong.clone()),
                    (wallet(2), weak.clone()),
                ])
            })
            .await;
        assert_eq!(count, 1);
        assert_eq!(wallets, vec![wallet(1)]);
    }

    #[tokio::test]
    async fn count_for_returns_empty_on_fetch_failure() {
        let tracker = SmartMoneyTracker::with_default_classifier();
        let (count, wallets) = tracker
            .count_for(&mint(), |_limit| async {
                Err(HolderLookupError("rpc timeout".into()))
            })
            .await;
        assert_eq!(count, 0);
        assert!(wallets.is_empty());
    }
}
