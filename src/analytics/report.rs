//! Fixed-width performance report

use chrono::{DateTime, Utc};

use super::PerformanceMetrics;

/// Characters between the box borders
const INNER_WIDTH: usize = 78;

/// Render metrics as a boxed, fixed-width text block
pub fn render_report(metrics: &PerformanceMetrics, generated_at: DateTime<Utc>) -> String {
    let rule = "─".repeat(INNER_WIDTH - 4);
    let mut lines = vec![
        border('╔', '╗'),
        centered("PERFORMANCE REPORT"),
        centered(&generated_at.format("%Y-%m-%d %H:%M UTC").to_string()),
        border('╠', '╣'),
        row(""),
        row("TRADING SUMMARY"),
        row(&rule),
        row(&format!(
            "Total Trades: {:<10}    Winning: {:<8}    Losing: {:<8}",
            metrics.total_trades, metrics.winning_trades, metrics.losing_trades
        )),
        row(&format!("Win Rate: {:.1}%", metrics.win_rate * 100.0)),
        row(""),
        row("P&L ANALYSIS"),
        row(&rule),
        row(&format!("Total P&L:    {:>14}", currency(metrics.total_pnl))),
        row(&format!("Total Return: {:>+13.2}%", metrics.total_return_pct)),
        row(&format!("Biggest Win:  {:>14}", currency(metrics.biggest_win))),
        row(&format!("Biggest Loss: {:>14}", currency(metrics.biggest_loss))),
        row(""),
        row("RISK METRICS"),
        row(&rule),
        row(&format!("Sharpe Ratio: {:>+8.3}", metrics.sharpe_ratio)),
        row(&format!("Max Drawdown: {:>8.2}%", metrics.max_drawdown * 100.0)),
        row(&format!(
            "Avg Trade Duration: {:>6.1} hours",
            metrics.avg_trade_duration
        )),
        row(""),
        border('╚', '╝'),
    ];
    lines.push(String::new());
    lines.join("\n")
}

fn border(left: char, right: char) -> String {
    format!("{}{}{}", left, "═".repeat(INNER_WIDTH), right)
}

fn row(content: &str) -> String {
    format!("║  {:<width$}║", content, width = INNER_WIDTH - 2)
}

fn centered(content: &str) -> String {
    format!("║{:^width$}║", content, width = INNER_WIDTH)
}

/// Signed amount with a dollar sign and thousands separators, e.g. `+$1,234.50`
fn currency(value: f64) -> String {
    let sign = if value < 0.0 { '-' } else { '+' };
    let cents = format!("{:.2}", value.abs());
    let (whole, frac) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}${}.{}", sign, grouped, frac)
}
