//! Consensus Trading Strategy
//!
//! ## Decision
//! - `consensus` - Weighted multi-model verdicts and trade proposals
//! - `sizing` - Stop, target and position size calculators
//!
//! ## Safety
//! - `risk_manager` - Capital state, drawdown shield and trade throttling

// Shared types
pub mod types;

// Decision
pub mod consensus;
pub mod sizing;

// Safety
pub mod risk_manager;

// Re-exports
pub use consensus::{ConsensusConfig, ConsensusEngine};
pub use risk_manager::{
    RiskConfig, RiskLevel, RiskManager, RiskProfile, RiskStatus, TradeLimits, TradeLogEntry,
    TradingBlock, TRADING_ALLOWED,
};
pub use sizing::{RiskPlan, RiskSizingModel, SizingConfig};
pub use types::*;
