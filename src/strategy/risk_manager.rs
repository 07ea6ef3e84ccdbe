//! Risk Manager
//!
//! Capital state and trading limits for one session. Blocks new trades on
//! drawdown, daily loss, trade count and cooldown, in that priority order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Error;

/// Reasons new trades are blocked, checked in declaration order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradingBlock {
    /// Drawdown from peak at or above the limit
    Drawdown { drawdown: f64, limit: f64 },
    /// Realized loss today at or above the limit
    DailyLoss { loss_pct: f64, limit: f64 },
    /// Trade count for the day exhausted
    MaxTrades { trades: u32, limit: u32 },
    /// Too soon after the last trade
    Cooldown { remaining_secs: f64 },
}

impl TradingBlock {
    /// Get human-readable description
    pub fn description(&self) -> String {
        match self {
            TradingBlock::Drawdown { drawdown, limit } => format!(
                "Drawdown Shield Active: {:.1}% drawdown exceeds {:.1}% limit",
                drawdown * 100.0,
                limit * 100.0
            ),
            TradingBlock::DailyLoss { loss_pct, limit } => format!(
                "Daily Loss Limit: {:.1}% exceeds {:.1}% limit",
                loss_pct * 100.0,
                limit * 100.0
            ),
            TradingBlock::MaxTrades { trades, .. } => {
                format!("Max Trades Reached: {} trades today", trades)
            }
            TradingBlock::Cooldown { remaining_secs } => {
                format!("Cooldown Active: {:.0}s remaining", remaining_secs)
            }
        }
    }
}

impl std::fmt::Display for TradingBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Message reported when no block applies
pub const TRADING_ALLOWED: &str = "Trading allowed";

/// Named risk presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskProfile {
    Conservative,
    #[default]
    Moderate,
    Aggressive,
}

impl FromStr for RiskProfile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conservative" => Ok(RiskProfile::Conservative),
            "moderate" => Ok(RiskProfile::Moderate),
            "aggressive" => Ok(RiskProfile::Aggressive),
            other => Err(Error::UnknownRiskProfile(other.to_string())),
        }
    }
}

impl std::fmt::Display for RiskProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskProfile::Conservative => write!(f, "conservative"),
            RiskProfile::Moderate => write!(f, "moderate"),
            RiskProfile::Aggressive => write!(f, "aggressive"),
        }
    }
}

/// Configuration for risk management
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Block new trades at this drawdown from peak
    pub max_drawdown_pct: f64,
    /// Block new trades once today's loss reaches this fraction of initial capital
    pub daily_loss_limit: f64,
    pub max_trades_per_day: u32,
    /// Minimum seconds between trades
    pub cooldown_seconds: u64,
    /// Volatility above which sizes are cut
    pub volatility_threshold: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self::for_profile(RiskProfile::Moderate)
    }
}

impl RiskConfig {
    pub fn for_profile(profile: RiskProfile) -> Self {
        match profile {
            RiskProfile::Conservative => Self {
                max_drawdown_pct: 0.05,
                daily_loss_limit: 0.02,
                max_trades_per_day: 5,
                cooldown_seconds: 600,
                volatility_threshold: 0.04,
            },
            RiskProfile::Moderate => Self {
                max_drawdown_pct: 0.10,
                daily_loss_limit: 0.03,
                max_trades_per_day: 10,
                cooldown_seconds: 300, // 5 minutes
                volatility_threshold: 0.05,
            },
            RiskProfile::Aggressive => Self {
                max_drawdown_pct: 0.15,
                daily_loss_limit: 0.05,
                max_trades_per_day: 20,
                cooldown_seconds: 60,
                volatility_threshold: 0.08,
            },
        }
    }
}

/// Throttling limits that a simulation may temporarily relax
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeLimits {
    pub cooldown_seconds: u64,
    pub max_trades_per_day: u32,
}

/// Coarse risk level from drawdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_drawdown(drawdown: f64) -> Self {
        if drawdown > 0.05 {
            RiskLevel::High
        } else if drawdown > 0.02 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
        }
    }
}

/// One entry of the trade history log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeLogEntry {
    pub pnl: f64,
    /// Capital after the trade
    pub capital: f64,
    pub timestamp: DateTime<Utc>,
}

/// Point-in-time risk summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskStatus {
    pub current_capital: f64,
    pub peak_capital: f64,
    pub drawdown: f64,
    pub daily_pnl: f64,
    pub trades_today: u32,
    pub trading_allowed: bool,
    pub status_message: String,
    pub risk_level: RiskLevel,
}

/// Risk Manager
#[derive(Debug, Clone)]
pub struct RiskManager {
    config: RiskConfig,
    initial_capital: f64,
    current_capital: f64,
    /// High-water mark, never below current capital
    peak_capital: f64,
    daily_pnl: f64,
    trades_today: u32,
    last_trade_time: Option<DateTime<Utc>>,
    trade_history: Vec<TradeLogEntry>,
    /// Limits in force before the first outstanding relaxation
    saved_limits: Option<TradeLimits>,
    relax_depth: u32,
}

impl RiskManager {
    /// Create a new risk manager
    pub fn new(initial_capital: f64, config: RiskConfig) -> Self {
        Self {
            config,
            initial_capital,
            current_capital: initial_capital,
            peak_capital: initial_capital,
            daily_pnl: 0.0,
            trades_today: 0,
            last_trade_time: None,
            trade_history: Vec::new(),
            saved_limits: None,
            relax_depth: 0,
        }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn current_capital(&self) -> f64 {
        self.current_capital
    }

    pub fn peak_capital(&self) -> f64 {
        self.peak_capital
    }

    pub fn daily_pnl(&self) -> f64 {
        self.daily_pnl
    }

    pub fn trades_today(&self) -> u32 {
        self.trades_today
    }

    pub fn last_trade_time(&self) -> Option<DateTime<Utc>> {
        self.last_trade_time
    }

    pub fn trade_history(&self) -> &[TradeLogEntry] {
        &self.trade_history
    }

    /// Fractional decline of current capital from peak
    pub fn drawdown(&self) -> f64 {
        if self.peak_capital <= 0.0 {
            return 0.0;
        }
        ((self.peak_capital - self.current_capital) / self.peak_capital).max(0.0)
    }

    /// Check if a new trade may be opened
    pub fn check_trading_allowed(&self) -> Result<(), TradingBlock> {
        self.check_trading_allowed_at(Utc::now())
    }

    /// Check against an explicit clock
    pub fn check_trading_allowed_at(&self, now: DateTime<Utc>) -> Result<(), TradingBlock> {
        let drawdown = self.drawdown();
        if drawdown >= self.config.max_drawdown_pct {
            return Err(TradingBlock::Drawdown {
                drawdown,
                limit: self.config.max_drawdown_pct,
            });
        }

        if self.initial_capital > 0.0 {
            let loss_pct = self.daily_pnl.min(0.0).abs() / self.initial_capital;
            if loss_pct >= self.config.daily_loss_limit {
                return Err(TradingBlock::DailyLoss {
                    loss_pct,
                    limit: self.config.daily_loss_limit,
                });
            }
        }

        if self.trades_today >= self.config.max_trades_per_day {
            return Err(TradingBlock::MaxTrades {
                trades: self.trades_today,
                limit: self.config.max_trades_per_day,
            });
        }

        if let Some(last) = self.last_trade_time {
            let elapsed = (now - last).num_milliseconds() as f64 / 1000.0;
            let cooldown = self.config.cooldown_seconds as f64;
            if elapsed < cooldown {
                return Err(TradingBlock::Cooldown {
                    remaining_secs: cooldown - elapsed,
                });
            }
        }

        Ok(())
    }

    /// Shrink a size for high volatility or, failing that, for today's losses
    pub fn adjust_position_size(&self, base_size: f64, volatility: f64) -> f64 {
        let threshold = self.config.volatility_threshold;

        if threshold > 0.0 && volatility > threshold {
            let reduction = (volatility / threshold - 1.0).min(0.5);
            return base_size * (1.0 - reduction);
        }

        if self.daily_pnl < 0.0 {
            let budget = self.initial_capital * self.config.daily_loss_limit;
            if budget > 0.0 {
                let loss_ratio = self.daily_pnl.abs() / budget;
                let reduction = (0.3 * loss_ratio).min(0.5);
                return base_size * (1.0 - reduction);
            }
        }

        base_size
    }

    /// Apply a realized P&L to capital state
    pub fn record_trade(&mut self, pnl: f64) {
        self.record_trade_at(pnl, Utc::now());
    }

    /// Record a trade with an explicit timestamp
    pub fn record_trade_at(&mut self, pnl: f64, at: DateTime<Utc>) {
        self.current_capital += pnl;
        self.daily_pnl += pnl;
        self.trades_today += 1;
        self.last_trade_time = Some(at);

        if self.current_capital > self.peak_capital {
            self.peak_capital = self.current_capital;
        }

        self.trade_history.push(TradeLogEntry {
            pnl,
            capital: self.current_capital,
            timestamp: at,
        });

        tracing::debug!(
            pnl = pnl,
            capital = self.current_capital,
            trades_today = self.trades_today,
            "Trade recorded"
        );
    }

    /// Start a new trading day; capital, peak and cooldown are untouched
    pub fn reset_daily_stats(&mut self) {
        tracing::info!(
            "Daily reset: previous day P&L was {:.2} over {} trades",
            self.daily_pnl,
            self.trades_today
        );
        self.daily_pnl = 0.0;
        self.trades_today = 0;
    }

    pub fn trade_limits(&self) -> TradeLimits {
        TradeLimits {
            cooldown_seconds: self.config.cooldown_seconds,
            max_trades_per_day: self.config.max_trades_per_day,
        }
    }

    fn set_trade_limits(&mut self, limits: TradeLimits) {
        self.config.cooldown_seconds = limits.cooldown_seconds;
        self.config.max_trades_per_day = limits.max_trades_per_day;
    }

    /// Loosen throttling; overlapping relaxations keep the loosest of each limit
    ///
    /// Every call must be paired with one [`Self::restore_trade_limits`].
    pub fn relax_trade_limits(&mut self, relaxed: TradeLimits) {
        let current = self.trade_limits();
        let merged = if self.relax_depth == 0 {
            self.saved_limits = Some(current);
            relaxed
        } else {
            TradeLimits {
                cooldown_seconds: current.cooldown_seconds.min(relaxed.cooldown_seconds),
                max_trades_per_day: current.max_trades_per_day.max(relaxed.max_trades_per_day),
            }
        };
        self.relax_depth += 1;
        self.set_trade_limits(merged);
    }

    /// Undo one relaxation; the original limits return once none are outstanding
    ///
    /// Returns true when the original limits were put back.
    pub fn restore_trade_limits(&mut self) -> bool {
        if self.relax_depth == 0 {
            return false;
        }
        self.relax_depth -= 1;
        if self.relax_depth > 0 {
            return false;
        }
        match self.saved_limits.take() {
            Some(saved) => {
                self.set_trade_limits(saved);
                true
            }
            None => false,
        }
    }

    /// Number of relaxations not yet restored
    pub fn relax_depth(&self) -> u32 {
        self.relax_depth
    }

    /// Get current risk status
    pub fn risk_status(&self) -> RiskStatus {
        self.risk_status_at(Utc::now())
    }

    pub fn risk_status_at(&self, now: DateTime<Utc>) -> RiskStatus {
        let check = self.check_trading_allowed_at(now);
        let drawdown = self.drawdown();

        RiskStatus {
            current_capital: self.current_capital,
            peak_capital: self.peak_capital,
            drawdown,
            daily_pnl: self.daily_pnl,
            trades_today: self.trades_today,
            trading_allowed: check.is_ok(),
            status_message: match check {
                Ok(()) => TRADING_ALLOWED.to_string(),
                Err(block) => block.description(),
            },
            risk_level: RiskLevel::from_drawdown(drawdown),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_small_loss_still_allowed() {
        let mut risk = RiskManager::new(100_000.0, RiskConfig::default());
        let t0 = Utc::now();
        risk.record_trade_at(-4_000.0, t0);

        assert_eq!(risk.current_capital(), 96_000.0);
        assert_eq!(risk.peak_capital(), 100_000.0);
        assert!((risk.drawdown() - 0.04).abs() < 1e-12);

        // 4% is under the drawdown shield; with default limits the daily loss check trips
        let later = t0 + Duration::seconds(301);
        assert!(matches!(
            risk.check_trading_allowed_at(later),
            Err(TradingBlock::DailyLoss { .. })
        ));

        let config = RiskConfig {
            daily_loss_limit: 0.05,
            ..Default::default()
        };
        let mut risk = RiskManager::new(100_000.0, config);
        risk.record_trade_at(-4_000.0, t0);
        assert!(risk.check_trading_allowed_at(later).is_ok());
    }

    #[test]
    fn test_drawdown_takes_priority() {
        let mut risk = RiskManager::new(100_000.0, RiskConfig::default());
        let t0 = Utc::now();
        risk.record_trade_at(-11_000.0, t0);

        // Drawdown, daily loss and cooldown all apply at once
        let result = risk.check_trading_allowed_at(t0);
        assert!(matches!(result, Err(TradingBlock::Drawdown { .. })));
        assert!(result
            .unwrap_err()
            .description()
            .starts_with("Drawdown Shield Active: 11.0% drawdown exceeds 10.0% limit"));
    }

    #[test]
    fn test_daily_loss_before_trade_count() {
        let config = RiskConfig {
            max_trades_per_day: 1,
            ..Default::default()
        };
        let mut risk = RiskManager::new(100_000.0, config);
        let t0 = Utc::now();
        risk.record_trade_at(-3_500.0, t0);

        let result = risk.check_trading_allowed_at(t0 + Duration::hours(1));
        assert!(matches!(result, Err(TradingBlock::DailyLoss { .. })));
    }

    #[test]
    fn test_max_trades_block() {
        let config = RiskConfig {
            max_trades_per_day: 2,
            cooldown_seconds: 0,
            ..Default::default()
        };
        let mut risk = RiskManager::new(100_000.0, config);
        let t0 = Utc::now();
        risk.record_trade_at(100.0, t0);
        assert!(risk.check_trading_allowed_at(t0).is_ok());
        risk.record_trade_at(100.0, t0);

        let result = risk.check_trading_allowed_at(t0);
        assert_eq!(result, Err(TradingBlock::MaxTrades { trades: 2, limit: 2 }));
        assert_eq!(
            result.unwrap_err().description(),
            "Max Trades Reached: 2 trades today"
        );
    }

    #[test]
    fn test_cooldown_remaining() {
        let mut risk = RiskManager::new(100_000.0, RiskConfig::default());
        let t0 = Utc::now();
        risk.record_trade_at(50.0, t0);

        match risk.check_trading_allowed_at(t0 + Duration::seconds(100)) {
            Err(TradingBlock::Cooldown { remaining_secs }) => {
                assert!((remaining_secs - 200.0).abs() < 1e-6);
            }
            other => panic!("expected cooldown, got {:?}", other),
        }

        assert!(risk
            .check_trading_allowed_at(t0 + Duration::seconds(300))
            .is_ok());
    }

    #[test]
    fn test_peak_is_monotonic() {
        let mut risk = RiskManager::new(10_000.0, RiskConfig::default());
        let mut last_peak = risk.peak_capital();

        for pnl in [500.0, -200.0, 1_000.0, -3_000.0, 250.0, 4_000.0] {
            let before = risk.current_capital();
            risk.record_trade(pnl);
            assert_eq!(risk.current_capital(), before + pnl);
            assert!(risk.peak_capital() >= last_peak);
            assert!(risk.peak_capital() >= risk.current_capital());
            last_peak = risk.peak_capital();
        }

        assert_eq!(risk.trade_history().len(), 6);
        assert_eq!(risk.trade_history()[0].capital, 10_500.0);
    }

    #[test]
    fn test_adjust_for_volatility() {
        let risk = RiskManager::new(100_000.0, RiskConfig::default());
        assert_eq!(risk.adjust_position_size(1_000.0, 0.02), 1_000.0);
        // 0.06 / 0.05 - 1 = 0.2
        assert!((risk.adjust_position_size(1_000.0, 0.06) - 800.0).abs() < 1e-9);
        // Capped at a 50% cut
        assert!((risk.adjust_position_size(1_000.0, 0.2) - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_adjust_for_daily_loss() {
        let mut risk = RiskManager::new(100_000.0, RiskConfig::default());
        risk.record_trade(-1_500.0);

        // 1500 / 3000 = 0.5, 0.3 * 0.5 = 0.15
        assert!((risk.adjust_position_size(1_000.0, 0.02) - 850.0).abs() < 1e-9);
        // Volatility path wins when both apply
        assert!((risk.adjust_position_size(1_000.0, 0.06) - 800.0).abs() < 1e-9);
    }

    #[test]
    fn test_reset_daily_stats() {
        let mut risk = RiskManager::new(100_000.0, RiskConfig::default());
        let t0 = Utc::now();
        risk.record_trade_at(2_000.0, t0);
        risk.record_trade_at(-500.0, t0);

        risk.reset_daily_stats();

        assert_eq!(risk.daily_pnl(), 0.0);
        assert_eq!(risk.trades_today(), 0);
        assert_eq!(risk.current_capital(), 101_500.0);
        assert_eq!(risk.peak_capital(), 102_000.0);
        assert_eq!(risk.last_trade_time(), Some(t0));
        assert!(matches!(
            risk.check_trading_allowed_at(t0),
            Err(TradingBlock::Cooldown { .. })
        ));
    }

    #[test]
    fn test_relax_and_restore_limits() {
        let mut risk = RiskManager::new(100_000.0, RiskConfig::default());
        risk.relax_trade_limits(TradeLimits {
            cooldown_seconds: 0,
            max_trades_per_day: 30,
        });
        assert_eq!(risk.config().max_trades_per_day, 30);
        assert_eq!(risk.config().cooldown_seconds, 0);

        assert!(risk.restore_trade_limits());
        assert_eq!(risk.config(), &RiskConfig::default());
        assert_eq!(risk.relax_depth(), 0);
        // Unpaired restore is a no-op
        assert!(!risk.restore_trade_limits());
        assert_eq!(risk.config(), &RiskConfig::default());
    }

    #[test]
    fn test_nested_relaxations_restore_original() {
        let mut risk = RiskManager::new(100_000.0, RiskConfig::default());
        risk.relax_trade_limits(TradeLimits {
            cooldown_seconds: 0,
            max_trades_per_day: 30,
        });
        risk.relax_trade_limits(TradeLimits {
            cooldown_seconds: 10,
            max_trades_per_day: 40,
        });
        // Loosest of both
        assert_eq!(
            risk.trade_limits(),
            TradeLimits {
                cooldown_seconds: 0,
                max_trades_per_day: 40,
            }
        );

        assert!(!risk.restore_trade_limits());
        assert_eq!(risk.config().max_trades_per_day, 40);
        assert!(risk.restore_trade_limits());
        assert_eq!(risk.config(), &RiskConfig::default());
    }

    #[test]
    fn test_max_trades_checked_before_cooldown() {
        let config = RiskConfig {
            max_trades_per_day: 1,
            ..Default::default()
        };
        let mut risk = RiskManager::new(100_000.0, config);
        let t0 = Utc::now();
        risk.record_trade_at(50.0, t0);

        // Both the trade count and the cooldown apply at t0
        assert_eq!(
            risk.check_trading_allowed_at(t0),
            Err(TradingBlock::MaxTrades { trades: 1, limit: 1 })
        );
    }

    #[test]
    fn test_risk_status() {
        let mut risk = RiskManager::new(100_000.0, RiskConfig::default());
        let status = risk.risk_status();
        assert!(status.trading_allowed);
        assert_eq!(status.status_message, TRADING_ALLOWED);
        assert_eq!(status.risk_level, RiskLevel::Low);

        risk.record_trade(-6_000.0);
        let status = risk.risk_status();
        assert!(!status.trading_allowed);
        assert_eq!(status.risk_level, RiskLevel::High);
        assert!(status.status_message.starts_with("Daily Loss Limit"));
    }

    #[test]
    fn test_risk_profiles() {
        assert_eq!("Aggressive".parse::<RiskProfile>().unwrap(), RiskProfile::Aggressive);
        assert!("reckless".parse::<RiskProfile>().unwrap_err().is_config_error());
        assert_eq!(RiskConfig::for_profile(RiskProfile::Conservative).max_trades_per_day, 5);
        assert_eq!(RiskConfig::default().cooldown_seconds, 300);
    }
}
