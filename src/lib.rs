//! Signal-to-Trade Core
//!
//! Turns a raw stream of new-token and trade events into sized, risk-gated
//! buy/sell decisions, managing positions end to end.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;

pub use config::Config;
pub use error::{Error, Result};
