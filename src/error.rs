//! Error types for the Signal-to-Trade Core

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the core
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    // External feed / execution errors
    #[error("Feed error: {0}")]
    Feed(String),

    #[error("Insufficient liquidity for {mint}")]
    InsufficientLiquidity { mint: String },

    #[error("Price impact too high: {impact_bps} bps > {max_bps} bps")]
    PriceImpactTooHigh { impact_bps: u32, max_bps: u32 },

    #[error("No route found for {mint}")]
    RouteNotFound { mint: String },

    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Executor timeout after {0}ms")]
    ExecutorTimeout(u64),

    // Position management errors
    #[error("Position not found: {0}")]
    PositionNotFound(String),

    #[error("Position persistence failed: {0}")]
    PositionPersistence(String),

    #[error("Sell failed after {attempts} attempts: {reason}")]
    SellFailed { attempts: u32, reason: String },

    // Safety / risk errors
    #[error("Safety limit exceeded: {0}")]
    SafetyLimitExceeded(String),

    #[error("Daily loss limit reached: lost {lost} SOL, limit is {limit} SOL")]
    DailyLossLimitReached { lost: f64, limit: f64 },

    #[error("Max position size exceeded: current {current} SOL + buy {buy} SOL > max {max} SOL")]
    MaxPositionExceeded { current: f64, buy: f64, max: f64 },

    #[error("Trading paused: {reason}")]
    TradingPaused { reason: String },

    // Invariant / logical errors
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Invalid token id: {0}")]
    InvalidTokenId(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Transient failures worth retrying with backoff (transient external kind).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Network(_) | Error::RateLimited { .. } | Error::ExecutorTimeout(_)
        )
    }

    /// Safety-related failures that must never be retried blindly.
    pub fn is_safety_violation(&self) -> bool {
        matches!(
            self,
            Error::SafetyLimitExceeded(_)
                | Error::DailyLossLimitReached { .. }
                | Error::MaxPositionExceeded { .. }
                | Error::TradingPaused { .. }
        )
    }

    /// Permanent external failures: non-retryable, entry aborts / exit records the
    /// failure and loosens slippage on the next tick.
    pub fn is_permanent_external(&self) -> bool {
        matches!(
            self,
            Error::InsufficientLiquidity { .. }
                | Error::PriceImpactTooHigh { .. }
                | Error::RouteNotFound { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}
