pub mod historical;

pub use historical::HistoricalMarket;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{CandleSeries, Timeframe};

/// Candle and price source the signal pipeline reads from.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Up to `lookback` most recent candles, oldest first. Empty when there is no data.
    async fn get_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        lookback: usize,
    ) -> Result<CandleSeries>;

    async fn get_current_price(&self, symbol: &str) -> Result<Option<f64>>;

    /// Clock stamped on new signals. Replays override it with simulated time.
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
