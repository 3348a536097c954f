#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use structure_signals::exchange::MarketData;
use structure_signals::models::{Candle, CandleSeries, Timeframe};

pub fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// (open, high, low, close) tuples spaced one `interval` apart from `start`.
pub fn make_series(
    start: DateTime<Utc>,
    interval: Duration,
    data: &[(f64, f64, f64, f64)],
) -> CandleSeries {
    data.iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| Candle {
            timestamp: start + interval * i as i32,
            open: o,
            high: h,
            low: l,
            close: c,
            volume: 100.0,
        })
        .collect()
}

/// Each mid becomes (m, m + 1, m - 1, m + 0.5).
pub fn from_mids(start: DateTime<Utc>, interval: Duration, mids: &[f64]) -> CandleSeries {
    let data: Vec<(f64, f64, f64, f64)> =
        mids.iter().map(|&m| (m, m + 1.0, m - 1.0, m + 0.5)).collect();
    make_series(start, interval, &data)
}

/// n candles rising 10 per bar from `start`, no pullbacks.
pub fn make_bullish_trend(n: usize, start: f64, interval: Duration) -> CandleSeries {
    let data: Vec<(f64, f64, f64, f64)> = (0..n)
        .map(|i| {
            let open = start + i as f64 * 10.0;
            let close = open + 8.0;
            (open, close + 2.0, open - 1.0, close)
        })
        .collect();
    make_series(base_time(), interval, &data)
}

/// n candles falling 10 per bar from `start`.
pub fn make_bearish_trend(n: usize, start: f64, interval: Duration) -> CandleSeries {
    let data: Vec<(f64, f64, f64, f64)> = (0..n)
        .map(|i| {
            let open = start - i as f64 * 10.0;
            let close = open - 8.0;
            (open, open + 1.0, close - 2.0, close)
        })
        .collect();
    make_series(base_time(), interval, &data)
}

/// Waves of 6 bars up and 4 down, `step` per bar, each wave shifted by
/// `drift`. A straight run of `tail` bars moving `slope * step` per bar is
/// appended, its first bar on triple volume.
pub fn make_zigzag(
    n: usize,
    base: f64,
    step: f64,
    drift: f64,
    tail: usize,
    slope: f64,
    interval: Duration,
) -> CandleSeries {
    let mut data: Vec<(f64, f64, f64, f64)> = (0..n)
        .map(|i| {
            let wave = (i / 10) as f64;
            let pos = i % 10;
            let offset = if pos < 6 {
                pos as f64 * step
            } else {
                (10 - pos) as f64 * step
            };
            let mid = base + wave * drift + offset;
            let close = if i % 2 == 0 { mid + 0.5 } else { mid - 0.5 };
            (mid, mid + 1.0, mid - 1.0, close)
        })
        .collect();

    let last = data.last().map_or(base, |d| d.3);
    for k in 0..tail {
        let mid = last + (k + 1) as f64 * slope * step;
        let close = if slope >= 0.0 { mid + 0.5 } else { mid - 0.5 };
        data.push((mid, mid + 1.0, mid - 1.0, close));
    }

    let mut candles: Vec<Candle> = make_series(base_time(), interval, &data)
        .into_iter()
        .collect();
    if tail > 0 {
        candles[n].volume = 300.0;
    }
    CandleSeries::new(candles)
}

/// Canned candles keyed by timeframe with a fixed clock and price.
pub struct MockMarket {
    pub symbol: String,
    pub data: HashMap<Timeframe, CandleSeries>,
    pub current_price: Option<f64>,
    pub now: DateTime<Utc>,
}

impl MockMarket {
    pub fn new(symbol: &str, now: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.to_string(),
            data: HashMap::new(),
            current_price: None,
            now,
        }
    }

    pub fn with(mut self, tf: Timeframe, series: CandleSeries) -> Self {
        self.data.insert(tf, series);
        self
    }

    pub fn price(mut self, price: f64) -> Self {
        self.current_price = Some(price);
        self
    }
}

#[async_trait]
impl MarketData for MockMarket {
    async fn get_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        lookback: usize,
    ) -> Result<CandleSeries> {
        if symbol != self.symbol {
            return Ok(CandleSeries::default());
        }
        Ok(self
            .data
            .get(&timeframe)
            .map(|s| s.tail(lookback))
            .unwrap_or_default())
    }

    async fn get_current_price(&self, symbol: &str) -> Result<Option<f64>> {
        if symbol != self.symbol {
            return Ok(None);
        }
        Ok(self.current_price)
    }

    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}
