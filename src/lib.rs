//! Consensus Trader Library
//!
//! Multi-model trade decision engine: technical, fundamental and sentiment
//! models vote on a direction, a weighted consensus decides whether the
//! idea is actionable, and a risk manager sizes it and gates trading.

pub mod analyst;
pub mod analytics;
pub mod cli;
pub mod config;
pub mod error;
pub mod market;
pub mod models;
pub mod position;
pub mod strategy;

// Re-export commonly used types
pub use analyst::{AiAnalyst, MarketBacktester, StockAnalysis};
pub use config::Config;
pub use error::{Error, Result};
