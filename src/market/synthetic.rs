//! Synthetic market snapshots for simulation

use rand::seq::SliceRandom;
use rand::Rng;

use super::snapshot::{AnalystRating, InsiderActivity, MarketSnapshot};

const RATINGS: [AnalystRating; 3] = [AnalystRating::Buy, AnalystRating::Hold, AnalystRating::Sell];
const INSIDER: [InsiderActivity; 3] = [
    InsiderActivity::Buying,
    InsiderActivity::Neutral,
    InsiderActivity::Selling,
];

/// Draw a fully populated snapshot around a 150 base price
pub fn random_snapshot<R: Rng + ?Sized>(rng: &mut R) -> MarketSnapshot {
    let price = 150.0 + rng.gen_range(-20.0..50.0);
    let volatility = rng.gen_range(0.01..0.05);

    MarketSnapshot {
        price: Some(price),
        sma_20: Some(price * rng.gen_range(0.95..1.05)),
        sma_50: Some(price * rng.gen_range(0.92..1.08)),
        rsi: Some(rng.gen_range(20.0..80.0)),
        macd: Some(rng.gen_range(-2.0..2.0)),
        atr: Some(price * volatility),
        volatility: Some(volatility),
        pe_ratio: Some(rng.gen_range(10.0..40.0)),
        roe: Some(rng.gen_range(0.05..0.30)),
        debt_equity: Some(rng.gen_range(0.1..2.5)),
        revenue_growth: Some(rng.gen_range(-0.05..0.25)),
        news_sentiment: Some(rng.gen_range(-0.8..0.8)),
        social_sentiment: Some(rng.gen_range(-0.8..0.8)),
        analyst_rating: RATINGS.choose(rng).copied(),
        insider_activity: INSIDER.choose(rng).copied(),
    }
}
