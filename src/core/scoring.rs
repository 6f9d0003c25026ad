//! Composite 0-100 token score and concentration penalty (spec §4.8).

use crate::config::ScoringConfig;
use crate::core::types::{RiskKind, SafetyResult, TokenScore};

const KNOWN_AMM_PROGRAMS: &[&str] = &[
    "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8", // Raydium AMM v4
    "whirLbMiicVdio4qvUfM5KAg6Ct8VwpYzGff3uctyCc",  // Orca Whirlpools
];

/// Top-holder share used for the concentration penalty. `address` lets the
/// caller filter out known AMM/pool program accounts before scoring.
#[derive(Debug, Clone)]
pub struct HolderShare {
    pub address: String,
    pub share: f64,
}

/// Pure combination of safety, smart-money, liquidity and momentum signals
/// into a single 0-100 score.
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn score(
        &self,
        safety: &SafetyResult,
        smart_money_count: usize,
        liquidity_usd: f64,
        momentum_1h_percent: f64,
        holders: &[HolderShare],
    ) -> TokenScore {
        let mut flags = Vec::new();

        let safety_points = Self::safety_points(safety);
        let smart_money_points = Self::smart_money_points(smart_money_count);
        let liquidity_points = Self::liquidity_points(liquidity_usd);
        let momentum_points = Self::momentum_points(momentum_1h_percent);

        let raw_total = safety_points + smart_money_points + liquidity_points + momentum_points;

        let filtered: Vec<&HolderShare> = holders
            .iter()
            .filter(|h| !KNOWN_AMM_PROGRAMS.contains(&h.address.as_str()))
            .collect();
        let top1 = filtered.iter().map(|h| h.share).fold(0.0, f64::max);
        let top10: f64 = {
            let mut shares: Vec<f64> = filtered.iter().map(|h| h.share).collect();
            shares.sort_by(|a, b| b.partial_cmp(a).unwrap());
            shares.iter().take(10).sum()
        };
        let concentrated = top1 > 0.15 || top10 > 0.50;
        if concentrated {
            flags.push("concentration_penalty".to_string());
        }

        let total = if concentrated {
            (raw_total as f64 * 0.8).floor() as u32
        } else {
            raw_total
        };

        TokenScore {
            total,
            safety: safety_points,
            smart_money: smart_money_points,
            liquidity: liquidity_points,
            momentum: momentum_points,
            concentration_penalty_applied: concentrated,
            flags,
        }
    }

    pub fn meets_minimum(&self, score: &TokenScore) -> bool {
        score.meets_minimum(self.config.min_score_to_trade)
    }

    fn safety_points(safety: &SafetyResult) -> u32 {
        let critical = safety
            .risks
            .iter()
            .any(|r| matches!(r, RiskKind::MintAuthorityActive | RiskKind::FreezeAuthorityActive));
        if critical {
            0
        } else if safety.is_safe {
            40
        } else {
            20
        }
    }

    fn smart_money_points(count: usize) -> u32 {
        if count >= 5 {
            30
        } else if count >= 3 {
            22
        } else if count >= 1 {
            15
        } else {
            0
        }
    }

    fn liquidity_points(liquidity_usd: f64) -> u32 {
        if liquidity_usd >= 50_000.0 {
            20
        } else if liquidity_usd >= 20_000.0 {
            15
        } else if liquidity_usd >= 10_000.0 {
            10
        } else if liquidity_usd >= 5_000.0 {
            5
        } else {
            0
        }
    }

    fn momentum_points(momentum_1h_percent: f64) -> u32 {
        if momentum_1h_percent > 20.0 && momentum_1h_percent < 100.0 {
            10
        } else if momentum_1h_percent > 5.0 {
            5
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Timestamp, TokenId};

    fn mint() -> TokenId {
        TokenId::new("So11111111111111111111111111111111111111112").unwrap()
    }

    fn safe_result() -> SafetyResult {
        SafetyResult {
            mint: mint(),
            is_safe: true,
            risks: Vec::new(),
            timestamp: Timestamp::from_millis(0),
        }
    }

    #[test]
    fn happy_path_scenario_scores_82() {
        let engine = ScoringEngine::new(ScoringConfig::default());
        let score = engine.score(&safe_result(), 4, 25_000.0, 10.0, &[]);
        assert_eq!(score.safety, 40);
        assert_eq!(score.smart_money, 22);
        assert_eq!(score.liquidity, 15);
        assert_eq!(score.momentum, 5);
        assert_eq!(score.total, 82);
        assert!(!score.concentration_penalty_applied);
    }

    #[test]
    fn critical_risk_zeroes_safety_points() {
        let engine = ScoringEngine::new(ScoringConfig::default());
        let unsafe_result = SafetyResult {
            risks: vec![RiskKind::MintAuthorityActive],
            is_safe: false,
            ..safe_result()
        };
        let score = engine.score(&unsafe_result, 5, 50_000.0, 30.0, &[]);
        assert_eq!(score.safety, 0);
    }

    #[test]
    fn concentration_penalty_floors_total() {
        let engine = ScoringEngine::new(ScoringConfig::default());
        let holders = vec![HolderShare {
            address: "whale".to_string(),
            share: 0.20,
        }];
        let score = engine.score(&safe_result(), 5, 50_000.0, 30.0, &holders);
        // raw = 40 + 30 + 20 + 10 = 100, penalized = floor(100 * 0.8) = 80
        assert_eq!(score.total, 80);
        assert!(score.concentration_penalty_applied);
    }

    #[test]
    fn known_amm_programs_are_excluded_from_concentration_check() {
        let engine = ScoringEngine::new(ScoringConfig::default());
        let holders = vec![HolderShare {
            address: KNOWN_AMM_PROGRAMS[0].to_string(),
            share: 0.90,
        }];
        let score = engine.score(&safe_result(), 5, 50_000.0, 30.0, &holders);
        assert!(!score.concentration_penalty_applied);
    }

    #[test]
    fn meets_minimum_uses_default_threshold() {
        let engine = ScoringEngine::new(ScoringConfig::default());
        let score = engine.score(&safe_result(), 3, 25_000.0, 30.0, &[]);
        assert!(engine.meets_minimum(&score));
    }
}
