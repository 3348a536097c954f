use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::exchange::MarketData;
use crate::models::{Candle, CandleSeries, Timeframe};

/// A MarketData implementation that replays pre-loaded historical data.
/// A cursor (`now`) controls which candles are visible: only candles that
/// have fully closed by `now` are returned, simulating a forward walk.
#[derive(Debug)]
pub struct HistoricalMarket {
    symbol: String,
    data: HashMap<Timeframe, Vec<Candle>>,
    now: DateTime<Utc>,
}

impl HistoricalMarket {
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            data: HashMap::new(),
            now: Utc::now(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Load candles for a specific timeframe. Candles must be sorted oldest-first.
    pub fn load(&mut self, tf: Timeframe, candles: Vec<Candle>) {
        self.data.insert(tf, candles);
    }

    pub fn timeframes(&self) -> Vec<Timeframe> {
        let mut tfs: Vec<Timeframe> = self.data.keys().copied().collect();
        tfs.sort();
        tfs
    }

    /// Advance the simulation clock.
    pub fn set_time(&mut self, t: DateTime<Utc>) {
        self.now = t;
    }

    pub fn current_time(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn earliest_time(&self) -> Option<DateTime<Utc>> {
        self.data
            .values()
            .filter_map(|v| v.first().map(|c| c.timestamp))
            .min()
    }

    pub fn latest_time(&self) -> Option<DateTime<Utc>> {
        self.data
            .values()
            .filter_map(|v| v.last().map(|c| c.timestamp))
            .max()
    }

    /// Finest loaded timeframe, used for price checks and replays.
    pub fn finest_timeframe(&self) -> Option<Timeframe> {
        self.data
            .iter()
            .filter(|(_, candles)| !candles.is_empty())
            .map(|(tf, _)| *tf)
            .min()
    }

    /// Candles with `from <= timestamp <= until`, ignoring the clock.
    pub fn forward_candles(
        &self,
        tf: Timeframe,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> CandleSeries {
        let Some(all) = self.data.get(&tf) else {
            return CandleSeries::default();
        };
        let start = all.partition_point(|c| c.timestamp < from);
        let end = all.partition_point(|c| c.timestamp <= until);
        if start >= end {
            return CandleSeries::default();
        }
        CandleSeries::new(all[start..end].to_vec())
    }

    /// Closed candles up to `self.now`, capped at `limit`.
    fn visible_candles(&self, tf: Timeframe, limit: usize) -> CandleSeries {
        let Some(all) = self.data.get(&tf) else {
            if tf == Timeframe::H4 {
                return self.resampled_h4(limit);
            }
            return CandleSeries::default();
        };

        let span = tf.span();
        let end = match all.partition_point(|c| c.timestamp + span <= self.now) {
            0 => return CandleSeries::default(),
            n => n,
        };

        let start = end.saturating_sub(limit);
        CandleSeries::new(all[start..end].to_vec())
    }

    /// 4H built from 1H, dropping the still-forming bucket.
    fn resampled_h4(&self, limit: usize) -> CandleSeries {
        let h1 = self.visible_candles(Timeframe::H1, limit * 4 + 4);
        let span = Timeframe::H4.span();
        let closed: CandleSeries = h1
            .resample(Timeframe::H4.as_duration())
            .into_iter()
            .filter(|c| c.timestamp + span <= self.now)
            .collect();
        closed.tail(limit)
    }
}

#[async_trait]
impl MarketData for HistoricalMarket {
    async fn get_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        lookback: usize,
    ) -> Result<CandleSeries> {
        if symbol != self.symbol {
            return Ok(CandleSeries::default());
        }
        Ok(self.visible_candles(timeframe, lookback))
    }

    async fn get_current_price(&self, symbol: &str) -> Result<Option<f64>> {
        if symbol != self.symbol {
            return Ok(None);
        }
        // Most recent close on the finest timeframe loaded
        let Some(tf) = self.finest_timeframe() else {
            return Ok(None);
        };
        Ok(self.visible_candles(tf, 1).last().map(|c| c.close))
    }

    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}
