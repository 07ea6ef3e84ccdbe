//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::analyst::AiAnalyst;
use crate::error::Error;
use crate::strategy::{ConsensusConfig, RiskConfig, RiskProfile};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub account: AccountConfig,
    #[serde(default)]
    pub risk: RiskSettings,
    #[serde(default)]
    pub consensus: ConsensusConfig,
    #[serde(default)]
    pub backtest: BacktestConfig,
}

/// Account configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    #[serde(default = "default_initial_capital")]
    pub initial_capital: f64,
}

fn default_initial_capital() -> f64 {
    100_000.0
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            initial_capital: default_initial_capital(),
        }
    }
}

/// Risk profile plus optional per-limit overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskSettings {
    #[serde(default)]
    pub profile: RiskProfile,
    pub max_drawdown_pct: Option<f64>,
    pub daily_loss_limit: Option<f64>,
    pub max_trades_per_day: Option<u32>,
    pub cooldown_seconds: Option<u64>,
    pub volatility_threshold: Option<f64>,
}

impl RiskSettings {
    /// Profile preset with overrides applied
    pub fn resolve(&self) -> crate::Result<RiskConfig> {
        let mut config = RiskConfig::for_profile(self.profile);

        if let Some(v) = self.max_drawdown_pct {
            config.max_drawdown_pct = v;
        }
        if let Some(v) = self.daily_loss_limit {
            config.daily_loss_limit = v;
        }
        if let Some(v) = self.max_trades_per_day {
            config.max_trades_per_day = v;
        }
        if let Some(v) = self.cooldown_seconds {
            config.cooldown_seconds = v;
        }
        if let Some(v) = self.volatility_threshold {
            config.volatility_threshold = v;
        }

        for (name, value) in [
            ("max_drawdown_pct", config.max_drawdown_pct),
            ("daily_loss_limit", config.daily_loss_limit),
            ("volatility_threshold", config.volatility_threshold),
        ] {
            if !is_fraction(value) {
                return Err(Error::Config(format!(
                    "risk.{} must be in (0, 1], got {}",
                    name, value
                )));
            }
        }

        if config.max_trades_per_day == 0 {
            return Err(Error::Config(
                "risk.max_trades_per_day must be at least 1".to_string(),
            ));
        }

        Ok(config)
    }
}

/// Backtest defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_iterations() -> usize {
    20
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            seed: None,
        }
    }
}

fn is_fraction(value: f64) -> bool {
    value > 0.0 && value <= 1.0
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Start with defaults
            .set_default("account.initial_capital", default_initial_capital())?
            .set_default("risk.profile", RiskProfile::default().to_string())?
            .set_default("backtest.iterations", default_iterations() as i64)?
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix ANALYST__)
            .add_source(
                config::Environment::with_prefix("ANALYST")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.account.initial_capital <= 0.0 || self.account.initial_capital.is_nan() {
            anyhow::bail!("account.initial_capital must be positive");
        }

        self.risk.resolve()?;

        let consensus = &self.consensus;
        for (name, value) in [
            ("risk_per_trade", consensus.risk_per_trade),
            ("max_position_pct", consensus.max_position_pct),
        ] {
            if !is_fraction(value) {
                anyhow::bail!("consensus.{} must be in (0, 1], got {}", name, value);
            }
        }

        let weights = consensus.weights;
        if weights.technical < 0.0 || weights.fundamental < 0.0 || weights.sentiment < 0.0 {
            anyhow::bail!("consensus.weights must be non-negative");
        }
        if weights.total() <= 0.0 {
            anyhow::bail!("consensus.weights must sum to a positive value");
        }

        if consensus.risk_reward <= 0.0 {
            anyhow::bail!("consensus.risk_reward must be positive");
        }
        if consensus.atr_multiplier <= 0.0 {
            anyhow::bail!("consensus.atr_multiplier must be positive");
        }
        if consensus.performance_window == 0 {
            anyhow::bail!("consensus.performance_window must be at least 1");
        }

        Ok(())
    }

    /// Build an analyst from this configuration
    pub fn build_analyst(&self) -> Result<AiAnalyst> {
        let risk = self.risk.resolve()?;
        Ok(AiAnalyst::new(
            self.account.initial_capital,
            risk,
            self.consensus.clone(),
        ))
    }

    /// Human-readable summary of the effective configuration
    pub fn display(&self) -> String {
        let risk = self
            .risk
            .resolve()
            .unwrap_or_else(|_| RiskConfig::for_profile(self.risk.profile));
        let weights = self.consensus.weights;

        format!(
            r#"Configuration:
  Account:
    initial_capital: {:.2}
  Risk ({}):
    max_drawdown: {:.1}%
    daily_loss_limit: {:.1}%
    max_trades_per_day: {}
    cooldown: {}s
    volatility_threshold: {:.1}%
  Consensus:
    weights: technical {:.2} / fundamental {:.2} / sentiment {:.2}
    risk_per_trade: {:.1}%
    risk_reward: {:.1}
    atr_multiplier: {:.1}
    max_position: {:.1}%
    performance_window: {}
  Backtest:
    iterations: {}
    seed: {}
"#,
            self.account.initial_capital,
            self.risk.profile,
            risk.max_drawdown_pct * 100.0,
            risk.daily_loss_limit * 100.0,
            risk.max_trades_per_day,
            risk.cooldown_seconds,
            risk.volatility_threshold * 100.0,
            weights.technical,
            weights.fundamental,
            weights.sentiment,
            self.consensus.risk_per_trade * 100.0,
            self.consensus.risk_reward,
            self.consensus.atr_multiplier,
            self.consensus.max_position_pct * 100.0,
            self.consensus.performance_window,
            self.backtest.iterations,
            self.backtest
                .seed
                .map(|s| s.to_string())
                .unwrap_or_else(|| "random".to_string()),
        )
    }
}
