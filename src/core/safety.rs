//! Pure safety analysis over asset metadata (spec §4.6).

use std::time::Duration;

use tracing::warn;

use crate::core::cache;
use crate::core::cache::TtlCache;
use crate::core::types::{RiskKind, SafetyResult, Timestamp, TokenId, TokenMetadata};
use crate::error::Result;

const CACHE_NAMESPACE: &str = "token_safety";
const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const HIGH_TRANSFER_FEE_BPS: u32 = 100;

/// Classifies asset metadata into a [`SafetyResult`] and caches the verdict.
pub struct SafetyAnalyzer {
    cache: TtlCache<SafetyResult>,
}

impl SafetyAnalyzer {
    pub fn new() -> Self {
        Self {
            cache: TtlCache::new(),
        }
    }

    /// Pure classification, independent of caching.
    pub fn analyze(mint: &TokenId, metadata: &TokenMetadata, now: Timestamp) -> SafetyResult {
        let mut risks = Vec::new();
        if metadata.mint_authority.is_some() {
            risks.push(RiskKind::MintAuthorityActive);
        }
        if metadata.freeze_authority.is_some() {
            risks.push(RiskKind::FreezeAuthorityActive);
        }
        if metadata.has_permanent_delegate {
            risks.push(RiskKind::PermanentDelegate);
        }
        if metadata.transfer_fee_bps > HIGH_TRANSFER_FEE_BPS {
            risks.push(RiskKind::HighTransferFee);
        }
        if metadata.has_transfer_hook {
            risks.push(RiskKind::TransferHook);
        }
        if metadata.has_mutable_metadata {
            risks.push(RiskKind::MutableMetadata);
        }

        let is_safe = risks.is_empty() || risks == [RiskKind::MutableMetadata];

        SafetyResult {
            mint: mint.clone(),
            is_safe,
            risks,
            timestamp: now,
        }
    }

    pub fn cached(&self, mint: &TokenId) -> Option<SafetyResult> {
        self.cache.get(&cache::key(CACHE_NAMESPACE, mint.as_str()))
    }

    pub fn cache_stats(&self) -> cache::CacheStats {
        self.cache.stats()
    }

    /// Returns the cached verdict if present, otherwise calls `fetch` for
    /// the token's metadata, analyzes it, and caches the result. Fetch
    /// failures propagate without populating the cache.
    pub async fn get_or_analyze<F, Fut>(
        &self,
        mint: &TokenId,
        now: Timestamp,
        fetch: F,
    ) -> Result<SafetyResult>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<TokenMetadata>>,
    {
        if let Some(cached) = self.cached(mint) {
            return Ok(cached);
        }

        let metadata = fetch().await.map_err(|e| {
            warn!(%mint, error = %e, "safety metadata fetch failed");
            e
        })?;
        let result = Self::analyze(mint, &metadata, now);
        self.cache.set(
            cache::key(CACHE_NAMESPACE, mint.as_str()),
            result.clone(),
            CACHE_TTL,
        );
        Ok(result)
    }
}

impl Default for SafetyAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mint() -> TokenId {
        TokenId::new("So11111111111111111111111111111111111111112").unwrap()
    }

    #[test]
    fn clean_metadata_is_safe() {
        let result = SafetyAnalyzer::analyze(&mint(), &TokenMetadata::default(), Timestamp::from_millis(0));
        assert!(result.is_safe);
        assert!(result.risks.is_empty());
    }

    #[test]
    fn mutable_metadata_alone_is_still_safe() {
        let metadata = TokenMetadata {
            has_mutable_metadata: true,
            ..Default::default()
        };
        let result = SafetyAnalyzer::analyze(&mint(), &metadata, Timestamp::from_millis(0));
        assert!(result.is_safe);
        assert_eq!(result.risks, vec![RiskKind::MutableMetadata]);
    }

    #[test]
    fn mint_authority_is_unsafe() {
        let metadata = TokenMetadata {
            mint_authority: Some("authority".to_string()),
            ..Default::default()
        };
        let result = SafetyAnalyzer::analyze(&mint(), &metadata, Timestamp::from_millis(0));
        assert!(!result.is_safe);
        assert_eq!(result.risks, vec![RiskKind::MintAuthorityActive]);
    }

    #[test]
    fn risks_are_reported_in_evaluation_order() {
        let metadata = TokenMetadata {
            freeze_authority: Some("freeze".to_string()),
            mint_authority: Some("mint".to_string()),
            transfer_fee_bps: 500,
            ..Default::default()
        };
        let result = SafetyAnalyzer::analyze(&mint(), &metadata, Timestamp::from_millis(0));
        assert_eq!(
            result.risks,
            vec![
                RiskKind::MintAuthorityActive,
                RiskKind::FreezeAuthorityActive,
                RiskKind::HighTransferFee,
            ]
        );
    }

    #[tokio::test]
    async fn fetch_failure_does_not_populate_cache() {
        let analyzer = SafetyAnalyzer::new();
        let result = analyzer
            .get_or_analyze(&mint(), Timestamp::from_millis(0), || async {
                Err(crate::error::Error::Network("boom".into()))
            })
            .await;
        assert!(result.is_err());
        assert!(analyzer.cached(&mint()).is_none());
    }

    #[tokio::test]
    async fn successful_fetch_populates_cache() {
        let analyzer = SafetyAnalyzer::new();
        let result = analyzer
            .get_or_analyze(&mint(), Timestamp::from_millis(0), || async {
                Ok(TokenMetadata::default())
            })
            .await
            .unwrap();
        assert!(result.is_safe);
        assert!(analyzer.cached(&mint()).is_some());
    }
}
