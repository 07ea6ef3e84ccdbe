//! CLI command implementations

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::analyst::{AiAnalyst, BacktestSummary, MarketBacktester, StockAnalysis};
use crate::config::Config;
use crate::market::{load_snapshots, sample_snapshot, MarketSnapshot};
use crate::models::ModelProfile;
use crate::strategy::{RiskProfile, TradeProposal};

/// Analyze tickers, optionally queueing proposals
pub async fn analyze(
    config: &Config,
    tickers: &[String],
    snapshots_path: Option<&Path>,
    propose: bool,
) -> Result<()> {
    let analyst = Arc::new(config.build_analyst()?);

    let mut snapshots = match snapshots_path {
        Some(path) => load_snapshots(path)
            .await
            .with_context(|| format!("Failed to load snapshots from {}", path.display()))?,
        None => HashMap::new(),
    };

    let requests = tickers
        .iter()
        .map(|ticker| {
            let ticker = ticker.to_uppercase();
            let snapshot = snapshots.remove(&ticker).unwrap_or_else(|| {
                warn!(ticker = %ticker, "No snapshot supplied, using sample data");
                sample_snapshot()
            });
            (ticker, snapshot)
        })
        .collect();

    let results = run_analysis(Arc::clone(&analyst), requests, propose).await?;
    let profiles = analyst.model_profiles();

    for (analysis, proposal) in &results {
        print_analysis(analysis, &profiles);
        if propose {
            match proposal {
                Some(proposal) => println!("Proposal: {}\n", proposal),
                None => println!("Proposal: none\n"),
            }
        }
    }

    if propose {
        println!("Pending proposals: {}", analyst.pending_proposals().len());
    }

    Ok(())
}

/// Analyze each ticker on the blocking pool; results keep request order
pub async fn run_analysis(
    analyst: Arc<AiAnalyst>,
    requests: Vec<(String, MarketSnapshot)>,
    propose: bool,
) -> Result<Vec<(StockAnalysis, Option<TradeProposal>)>> {
    let handles: Vec<_> = requests
        .into_iter()
        .map(|(ticker, snapshot)| {
            let analyst = Arc::clone(&analyst);
            tokio::task::spawn_blocking(move || {
                let analysis = analyst.analyze_stock(&ticker, &snapshot);
                let proposal = if propose {
                    analyst.generate_trade_proposal(&ticker, &snapshot)
                } else {
                    None
                };
                (analysis, proposal)
            })
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await.context("Analysis task failed")?);
    }
    Ok(results)
}

/// Print one analysis with per-model signals
pub fn print_analysis(analysis: &StockAnalysis, profiles: &[ModelProfile]) {
    let consensus = &analysis.consensus;

    println!("\n=== {} ===\n", analysis.ticker);
    println!("{:<22} {:<8} {:>6}  {}", "MODEL", "SIGNAL", "CONF", "REASONING");
    println!("{}", "-".repeat(80));

    for signal in &consensus.signals {
        let name = profiles
            .iter()
            .find(|p| p.source == signal.source)
            .map(|p| p.name)
            .unwrap_or("unknown");
        println!(
            "{:<22} {:<8} {:>5.1}%  {}",
            name,
            signal.direction.to_string(),
            signal.confidence * 100.0,
            signal.reasoning
        );
    }

    println!();
    println!("Consensus: {}", consensus);
    println!(
        "Scores: long {:.3} / short {:.3} / neutral {:.3} | strength {:.3}",
        consensus.scores.long, consensus.scores.short, consensus.scores.neutral, consensus.strength
    );

    let status = &analysis.risk_status;
    println!(
        "Risk: {} | capital ${:.2} | drawdown {:.2}% | trades today {}",
        status.risk_level,
        status.current_capital,
        status.drawdown * 100.0,
        status.trades_today
    );
    println!("Trading: {}", analysis.risk_message);
}

/// Run a seeded or random backtest and print the report
pub async fn backtest(
    config: &Config,
    ticker: &str,
    iterations: Option<usize>,
    seed: Option<u64>,
    profile: Option<&str>,
) -> Result<()> {
    let (summary, report) = run_backtest(config, ticker, iterations, seed, profile).await?;

    println!("\n=== BACKTEST: {} ===\n", summary.ticker);
    println!("Iterations: {}", summary.iterations);
    println!("Proposals:  {}", summary.proposals);
    println!("Wins:       {}", summary.wins);
    println!("Losses:     {}", summary.losses);
    println!("\n{}", report);

    Ok(())
}

/// Build an analyst from `config` and simulate; returns the summary and report
pub async fn run_backtest(
    config: &Config,
    ticker: &str,
    iterations: Option<usize>,
    seed: Option<u64>,
    profile: Option<&str>,
) -> Result<(BacktestSummary, String)> {
    let mut config = config.clone();
    if let Some(profile) = profile {
        config.risk.profile = profile.parse::<RiskProfile>()?;
    }

    let iterations = iterations.unwrap_or(config.backtest.iterations);
    let seed = seed.or(config.backtest.seed);
    let analyst = Arc::new(config.build_analyst()?);
    let ticker = ticker.to_uppercase();

    info!(
        ticker = %ticker,
        profile = %config.risk.profile,
        iterations = iterations,
        "Running backtest"
    );

    let mut backtester = MarketBacktester::new(Arc::clone(&analyst), seed);
    let summary = tokio::task::spawn_blocking(move || backtester.run_simulation(&ticker, iterations))
        .await
        .context("Backtest task failed")?;

    Ok((summary, analyst.get_performance_report()))
}

/// Show the effective configuration
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.display());
    Ok(())
}
