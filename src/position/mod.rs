//! Proposal and trade tracking

pub mod manager;

pub use manager::TradeBook;
