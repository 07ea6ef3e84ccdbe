//! AI analyst
//!
//! Owns one consensus engine, one risk manager, the performance ledger and the
//! trade book, and drives the propose, approve and close lifecycle against
//! them. Every method takes `&self`; share it across threads or tasks with an
//! `Arc`.
//!
//! Locks are always taken in the order risk, consensus, analytics.

use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use crate::analytics::{PerformanceAnalytics, PerformanceMetrics};
use crate::market::MarketSnapshot;
use crate::models::{ModelProfile, SignalSource};
use crate::position::TradeBook;
use crate::strategy::{
    ConsensusConfig, ConsensusEngine, ConsensusResult, ModelWeights, RiskConfig, RiskManager,
    RiskStatus, TradeLimits, TradeProposal, TradingBlock, TRADING_ALLOWED,
};

pub mod backtest;

pub use backtest::{BacktestIteration, BacktestSummary, MarketBacktester, TradeOutcome};

/// Consensus verdict plus the risk picture at the time of analysis
#[derive(Debug, Clone, Serialize)]
pub struct StockAnalysis {
    pub ticker: String,
    pub consensus: ConsensusResult,
    pub risk_status: RiskStatus,
    pub trading_allowed: bool,
    pub risk_message: String,
}

/// AI analyst
#[derive(Debug)]
pub struct AiAnalyst {
    risk: RwLock<RiskManager>,
    consensus: RwLock<ConsensusEngine>,
    analytics: RwLock<PerformanceAnalytics>,
    book: TradeBook,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl AiAnalyst {
    /// Create a new analyst
    pub fn new(initial_capital: f64, risk: RiskConfig, consensus: ConsensusConfig) -> Self {
        info!(
            initial_capital = initial_capital,
            max_drawdown_pct = risk.max_drawdown_pct,
            "AI analyst initialized"
        );
        Self {
            risk: RwLock::new(RiskManager::new(initial_capital, risk)),
            consensus: RwLock::new(ConsensusEngine::new(consensus)),
            analytics: RwLock::new(PerformanceAnalytics::new()),
            book: TradeBook::new(),
        }
    }

    /// Run the consensus and attach the current risk status
    ///
    /// Never blocks on policy; the caller decides what to do with a blocked status.
    pub fn analyze_stock(&self, ticker: &str, snapshot: &MarketSnapshot) -> StockAnalysis {
        let risk_status = read(&self.risk).risk_status();
        let consensus = read(&self.consensus).analyze(snapshot);

        debug!(ticker = %ticker, "{}", consensus);

        StockAnalysis {
            ticker: ticker.to_string(),
            consensus,
            trading_allowed: risk_status.trading_allowed,
            risk_message: risk_status.status_message.clone(),
            risk_status,
        }
    }

    /// Generate a risk-adjusted proposal and queue it as pending
    ///
    /// Returns `None` without consulting the models when trading is blocked.
    pub fn generate_trade_proposal(
        &self,
        ticker: &str,
        snapshot: &MarketSnapshot,
    ) -> Option<TradeProposal> {
        let risk = read(&self.risk);

        if let Err(block) = risk.check_trading_allowed() {
            warn!(ticker = %ticker, reason = %block, "Trading blocked");
            return None;
        }

        let capital = risk.current_capital();
        let mut proposal = read(&self.consensus).generate_proposal(ticker, snapshot, capital)?;

        if capital > 0.0 {
            let base_size = proposal.size_pct * capital;
            let adjusted = risk.adjust_position_size(base_size, snapshot.volatility());
            proposal.size_pct = adjusted / capital;
        }
        drop(risk);

        info!(
            ticker = %ticker,
            id = %proposal.id,
            direction = %proposal.direction,
            size_pct = proposal.size_pct,
            confidence = proposal.confidence,
            "Trade proposal generated"
        );

        self.book.insert_pending(proposal.clone());
        Some(proposal)
    }

    /// Move a pending proposal to active trades
    pub fn approve_proposal(&self, id: &str) -> bool {
        let approved = self.book.approve(id).is_some();
        if !approved {
            debug!(id = %id, "No pending proposal to approve");
        }
        approved
    }

    /// Drop a pending proposal with no other effect
    pub fn discard_proposal(&self, id: &str) -> bool {
        match self.book.discard(id) {
            Some(proposal) => {
                info!(id = %id, ticker = %proposal.ticker, "Trade proposal discarded");
                true
            }
            None => false,
        }
    }

    /// Close an active trade at `exit_price` and record the result
    pub fn close_trade(&self, id: &str, exit_price: f64) -> bool {
        let Some(trade) = self.book.take_active(id) else {
            debug!(id = %id, "No active trade to close");
            return false;
        };

        let duration_hours = trade.hold_duration_hours(Utc::now());

        let mut risk = write(&self.risk);
        let notional = trade.size_pct * risk.current_capital();
        let pnl = trade.realized_pnl(exit_price, notional);
        risk.record_trade(pnl);

        write(&self.analytics).record_trade(
            trade.entry_price,
            exit_price,
            trade.direction,
            notional,
            duration_hours,
        );
        let capital = risk.current_capital();
        drop(risk);

        info!(
            id = %id,
            ticker = %trade.ticker,
            exit_price = exit_price,
            pnl = pnl,
            capital = capital,
            "Trade closed"
        );
        true
    }

    /// Apply an externally realized P&L to the risk state
    pub fn record_trade(&self, pnl: f64) {
        write(&self.risk).record_trade(pnl);
    }

    pub fn check_trading_allowed(&self) -> Result<(), TradingBlock> {
        read(&self.risk).check_trading_allowed()
    }

    /// `(allowed, reason)` form of [`Self::check_trading_allowed`]
    pub fn trading_status(&self) -> (bool, String) {
        match self.check_trading_allowed() {
            Ok(()) => (true, TRADING_ALLOWED.to_string()),
            Err(block) => (false, block.description()),
        }
    }

    pub fn get_risk_status(&self) -> RiskStatus {
        read(&self.risk).risk_status()
    }

    pub fn get_performance_report(&self) -> String {
        read(&self.analytics).generate_report()
    }

    pub fn performance_metrics(&self) -> PerformanceMetrics {
        read(&self.analytics).calculate_metrics()
    }

    /// Start a new trading day
    pub fn reset_daily_stats(&self) {
        write(&self.risk).reset_daily_stats();
    }

    pub fn update_model_weights(&self, accuracy_by_model: &HashMap<SignalSource, f64>) {
        write(&self.consensus).update_model_weights(accuracy_by_model);
    }

    pub fn model_weights(&self) -> ModelWeights {
        read(&self.consensus).weights()
    }

    pub fn model_profiles(&self) -> Vec<ModelProfile> {
        read(&self.consensus).models().map(|m| m.profile()).collect()
    }

    pub fn risk_config(&self) -> RiskConfig {
        read(&self.risk).config().clone()
    }

    pub fn pending_proposals(&self) -> Vec<TradeProposal> {
        self.book.pending()
    }

    pub fn active_trades(&self) -> Vec<TradeProposal> {
        self.book.active()
    }

    /// Swap in looser throttling until the returned guard drops
    ///
    /// Guards may overlap, from one caller or several; the configured limits
    /// come back when the last outstanding guard drops.
    pub fn relax_trade_limits(&self, relaxed: TradeLimits) -> TradeLimitsGuard<'_> {
        let mut risk = write(&self.risk);
        risk.relax_trade_limits(relaxed);
        let effective = risk.trade_limits();
        info!(
            cooldown_seconds = effective.cooldown_seconds,
            max_trades_per_day = effective.max_trades_per_day,
            depth = risk.relax_depth(),
            "Trade limits relaxed"
        );
        TradeLimitsGuard { risk: &self.risk }
    }
}

impl Default for AiAnalyst {
    fn default() -> Self {
        Self::new(100_000.0, RiskConfig::default(), ConsensusConfig::default())
    }
}

/// Restores the saved trade limits on drop, including during unwinding
#[must_use = "limits are restored as soon as the guard is dropped"]
pub struct TradeLimitsGuard<'a> {
    risk: &'a RwLock<RiskManager>,
}

impl Drop for TradeLimitsGuard<'_> {
    fn drop(&mut self) {
        let mut risk = write(self.risk);
        if risk.restore_trade_limits() {
            let limits = risk.trade_limits();
            info!(
                cooldown_seconds = limits.cooldown_seconds,
                max_trades_per_day = limits.max_trades_per_day,
                "Trade limits restored"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{AnalystRating, InsiderActivity};
    use crate::models::Direction;
    use crate::strategy::ProposalStatus;
    use std::sync::Arc;

    fn bullish_snapshot() -> MarketSnapshot {
        MarketSnapshot {
            price: Some(110.0),
            sma_20: Some(105.0),
            sma_50: Some(100.0),
            rsi: Some(25.0),
            macd: Some(1.0),
            pe_ratio: Some(12.0),
            roe: Some(0.25),
            debt_equity: Some(0.3),
            revenue_growth: Some(0.20),
            news_sentiment: Some(0.6),
            social_sentiment: Some(0.7),
            analyst_rating: Some(AnalystRating::Buy),
            insider_activity: Some(InsiderActivity::Buying),
            ..Default::default()
        }
    }

    fn bearish_snapshot() -> MarketSnapshot {
        MarketSnapshot {
            price: Some(90.0),
            sma_20: Some(95.0),
            sma_50: Some(100.0),
            rsi: Some(75.0),
            macd: Some(-0.5),
            pe_ratio: Some(45.0),
            roe: Some(-0.05),
            debt_equity: Some(3.0),
            revenue_growth: Some(-0.10),
            news_sentiment: Some(-0.5),
            analyst_rating: Some(AnalystRating::Sell),
            ..Default::default()
        }
    }

    #[test]
    fn test_analyze_stock_attaches_risk() {
        let analyst = AiAnalyst::default();
        let analysis = analyst.analyze_stock("AAPL", &bullish_snapshot());

        assert!(analysis.consensus.is_actionable);
        assert!(analysis.trading_allowed);
        assert_eq!(analysis.risk_message, "Trading allowed");
        assert_eq!(analysis.risk_status.current_capital, 100_000.0);
    }

    #[test]
    fn test_long_round_trip_at_take_profit() {
        let analyst = AiAnalyst::default();
        let proposal = analyst
            .generate_trade_proposal("AAPL", &bullish_snapshot())
            .expect("proposal");
        assert_eq!(analyst.pending_proposals().len(), 1);

        assert!(analyst.approve_proposal(&proposal.id));
        assert_eq!(analyst.active_trades()[0].status, ProposalStatus::Executed);
        assert!(analyst.close_trade(&proposal.id, proposal.take_profit));

        // 25% of 100k moved 8.8 / 110 = 8%
        let status = analyst.get_risk_status();
        assert!((status.current_capital - 102_000.0).abs() < 1e-6);

        let metrics = analyst.performance_metrics();
        assert_eq!(metrics.total_trades, 1);
        assert!(metrics.total_pnl > 0.0);
        assert!((metrics.total_pnl - 2_000.0).abs() < 1e-6);
        assert!(analyst.active_trades().is_empty());
    }

    #[test]
    fn test_short_stopped_out_loses() {
        let analyst = AiAnalyst::default();
        let proposal = analyst
            .generate_trade_proposal("XYZ", &bearish_snapshot())
            .expect("proposal");
        assert_eq!(proposal.direction, Direction::Short);
        assert!(proposal.stop_loss > proposal.entry_price);
        assert!(proposal.take_profit < proposal.entry_price);

        analyst.approve_proposal(&proposal.id);
        analyst.close_trade(&proposal.id, proposal.stop_loss);

        assert!(analyst.performance_metrics().total_pnl < 0.0);
        assert!(analyst.get_risk_status().current_capital < 100_000.0);
    }

    #[test]
    fn test_blocked_generates_nothing() {
        let analyst = AiAnalyst::default();
        analyst.record_trade(-11_000.0);

        assert!(analyst
            .generate_trade_proposal("AAPL", &bullish_snapshot())
            .is_none());
        assert!(analyst.pending_proposals().is_empty());

        let (allowed, reason) = analyst.trading_status();
        assert!(!allowed);
        assert!(reason.starts_with("Drawdown Shield Active"));

        // Analysis still runs and reports the block
        let analysis = analyst.analyze_stock("AAPL", &bullish_snapshot());
        assert!(!analysis.trading_allowed);
        assert!(analysis.consensus.is_actionable);
    }

    #[test]
    fn test_size_reduced_in_high_volatility() {
        let analyst = AiAnalyst::default();
        let snapshot = MarketSnapshot {
            volatility: Some(0.06),
            ..bullish_snapshot()
        };
        let proposal = analyst.generate_trade_proposal("AAPL", &snapshot).unwrap();
        // 25% cut by 20%
        assert!((proposal.size_pct - 0.20).abs() < 1e-9);
        assert!(proposal.size_pct <= 0.25);
    }

    #[test]
    fn test_unknown_ids_return_false() {
        let analyst = AiAnalyst::default();
        assert!(!analyst.approve_proposal("nope"));
        assert!(!analyst.discard_proposal("nope"));
        assert!(!analyst.close_trade("nope", 100.0));
        assert_eq!(analyst.get_risk_status().trades_today, 0);
    }

    #[test]
    fn test_pending_cannot_be_closed() {
        let analyst = AiAnalyst::default();
        let proposal = analyst
            .generate_trade_proposal("AAPL", &bullish_snapshot())
            .unwrap();
        assert!(!analyst.close_trade(&proposal.id, proposal.take_profit));
        assert!(analyst.discard_proposal(&proposal.id));
        assert!(!analyst.approve_proposal(&proposal.id));
        assert_eq!(analyst.performance_metrics().total_trades, 0);
    }

    #[test]
    fn test_concurrent_approve_single_winner() {
        let analyst = AiAnalyst::default();
        let proposal = analyst
            .generate_trade_proposal("AAPL", &bullish_snapshot())
            .unwrap();

        let wins = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| analyst.approve_proposal(&proposal.id)))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|won| *won)
                .count()
        });

        assert_eq!(wins, 1);
        assert_eq!(analyst.active_trades().len(), 1);
    }

    #[test]
    fn test_concurrent_record_trade_is_atomic() {
        let analyst = Arc::new(AiAnalyst::default());

        std::thread::scope(|s| {
            for _ in 0..8 {
                let analyst = Arc::clone(&analyst);
                s.spawn(move || {
                    for _ in 0..100 {
                        analyst.record_trade(10.0);
                        let status = analyst.get_risk_status();
                        assert!(status.peak_capital >= status.current_capital);
                    }
                });
            }
        });

        let status = analyst.get_risk_status();
        assert!((status.current_capital - 108_000.0).abs() < 1e-6);
        assert_eq!(status.peak_capital, status.current_capital);
        assert_eq!(status.trades_today, 800);
    }

    #[test]
    fn test_concurrent_tickers_queue_unique_proposals() {
        let analyst = AiAnalyst::default();
        let tickers = ["AAPL", "MSFT", "NVDA", "AMZN"];

        std::thread::scope(|s| {
            for ticker in tickers {
                let analyst = &analyst;
                s.spawn(move || analyst.generate_trade_proposal(ticker, &bullish_snapshot()));
            }
        });

        let pending = analyst.pending_proposals();
        assert_eq!(pending.len(), 4);
        let mut ids: Vec<_> = pending.iter().map(|p| p.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn test_relaxed_limits_restored_on_drop() {
        let analyst = AiAnalyst::default();
        {
            let _guard = analyst.relax_trade_limits(TradeLimits {
                cooldown_seconds: 0,
                max_trades_per_day: 50,
            });
            assert_eq!(analyst.risk_config().cooldown_seconds, 0);
        }
        assert_eq!(analyst.risk_config(), RiskConfig::default());
    }

    #[test]
    fn test_overlapping_guards_restore_in_any_order() {
        let analyst = AiAnalyst::default();
        let first = analyst.relax_trade_limits(TradeLimits {
            cooldown_seconds: 0,
            max_trades_per_day: 30,
        });
        let second = analyst.relax_trade_limits(TradeLimits {
            cooldown_seconds: 0,
            max_trades_per_day: 40,
        });

        drop(first);
        assert_eq!(analyst.risk_config().max_trades_per_day, 40);
        assert_eq!(analyst.risk_config().cooldown_seconds, 0);

        drop(second);
        assert_eq!(analyst.risk_config(), RiskConfig::default());
    }

    #[test]
    fn test_limits_restored_after_panic() {
        let analyst = AiAnalyst::default();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = analyst.relax_trade_limits(TradeLimits {
                cooldown_seconds: 0,
                max_trades_per_day: 50,
            });
            panic!("simulation failed");
        }));
        assert!(result.is_err());
        assert_eq!(analyst.risk_config().max_trades_per_day, 10);
    }

    #[test]
    fn test_update_model_weights() {
        let analyst = AiAnalyst::default();
        analyst.update_model_weights(&HashMap::from([
            (SignalSource::Technical, 0.8),
            (SignalSource::Fundamental, 0.6),
            (SignalSource::Sentiment, 0.6),
        ]));
        assert!((analyst.model_weights().technical - 0.4).abs() < 1e-9);

        let profiles = analyst.model_profiles();
        assert_eq!(profiles[0].name, "TechnicalAI");
        assert_eq!(profiles[0].mean_accuracy, Some(0.8));
    }
}
