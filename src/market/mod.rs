//! Market data consumed by the decision engine
//!
//! The engine never fetches data itself; a collaborator hands it a
//! [`MarketSnapshot`] per ticker.

pub mod loader;
pub mod snapshot;
pub mod synthetic;

pub use loader::{load_snapshots, parse_snapshots, sample_snapshot};
pub use snapshot::{AnalystRating, InsiderActivity, MarketSnapshot};
pub use synthetic::random_snapshot;
