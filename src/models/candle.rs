use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::SignalError;
use crate::models::Timeframe;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn body_top(&self) -> f64 {
        self.close.max(self.open)
    }

    pub fn body_bottom(&self) -> f64 {
        self.close.min(self.open)
    }

    /// Checks the OHLC envelope. Returns a human readable reason on failure.
    pub fn check(&self) -> Result<(), String> {
        let fields = [self.open, self.high, self.low, self.close, self.volume];
        if fields.iter().any(|v| !v.is_finite()) {
            return Err("non-finite price or volume".to_string());
        }
        if self.high < self.low {
            return Err(format!("high {:.2} below low {:.2}", self.high, self.low));
        }
        if self.high < self.body_top() {
            return Err(format!(
                "high {:.2} below body top {:.2}",
                self.high,
                self.body_top()
            ));
        }
        if self.low > self.body_bottom() {
            return Err(format!(
                "low {:.2} above body bottom {:.2}",
                self.low,
                self.body_bottom()
            ));
        }
        if self.volume < 0.0 {
            return Err(format!("negative volume {:.2}", self.volume));
        }
        Ok(())
    }
}

/// Wraps Vec<Candle> with the window helpers the analyzers need.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(candles: Vec<Candle>) -> Self {
        Self { candles }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn tail(&self, n: usize) -> CandleSeries {
        let start = self.candles.len().saturating_sub(n);
        CandleSeries::new(self.candles[start..].to_vec())
    }

    /// Simple moving average of the last `period` closes, or of every close
    /// when the series is shorter than the period.
    pub fn sma(&self, period: usize) -> Option<f64> {
        if self.candles.is_empty() || period == 0 {
            return None;
        }
        let n = period.min(self.candles.len());
        let start = self.candles.len() - n;
        let sum: f64 = self.candles[start..].iter().map(|c| c.close).sum();
        Some(sum / n as f64)
    }

    /// Mean volume over `[start, end)`, `None` when the range is empty.
    pub fn mean_volume(&self, start: usize, end: usize) -> Option<f64> {
        let e = end.min(self.candles.len());
        if start >= e {
            return None;
        }
        let window = &self.candles[start..e];
        Some(window.iter().map(|c| c.volume).sum::<f64>() / window.len() as f64)
    }

    /// Fails fast on the first candle that breaks the OHLC envelope or the
    /// ascending timestamp order.
    pub fn validate(&self, timeframe: Timeframe) -> Result<(), SignalError> {
        for (index, candle) in self.candles.iter().enumerate() {
            if let Err(reason) = candle.check() {
                return Err(SignalError::MalformedCandle {
                    timeframe,
                    index,
                    reason,
                });
            }
            if index > 0 && candle.timestamp <= self.candles[index - 1].timestamp {
                return Err(SignalError::MalformedCandle {
                    timeframe,
                    index,
                    reason: format!(
                        "timestamp {} not after previous {}",
                        candle.timestamp.to_rfc3339(),
                        self.candles[index - 1].timestamp.to_rfc3339()
                    ),
                });
            }
        }
        Ok(())
    }

    /// Resample to a larger timeframe bucket
    pub fn resample(&self, bucket: Duration) -> CandleSeries {
        if self.candles.is_empty() {
            return CandleSeries::default();
        }
        let bucket_secs = bucket.as_secs() as i64;
        let mut result: Vec<Candle> = Vec::new();

        for candle in &self.candles {
            let ts = candle.timestamp.timestamp();
            let bucket_start = ts - ts.rem_euclid(bucket_secs);
            let bucket_ts =
                DateTime::from_timestamp(bucket_start, 0).unwrap_or(candle.timestamp);

            if let Some(last) = result.last_mut() {
                if last.timestamp == bucket_ts {
                    last.high = last.high.max(candle.high);
                    last.low = last.low.min(candle.low);
                    last.close = candle.close;
                    last.volume += candle.volume;
                    continue;
                }
            }

            result.push(Candle {
                timestamp: bucket_ts,
                ..candle.clone()
            });
        }

        CandleSeries::new(result)
    }

    /// Candles with `start <= timestamp <= end`.
    pub fn between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> CandleSeries {
        let candles: Vec<Candle> = self
            .candles
            .iter()
            .filter(|c| c.timestamp >= start && c.timestamp <= end)
            .cloned()
            .collect();
        CandleSeries::new(candles)
    }
}

impl std::ops::Index<usize> for CandleSeries {
    type Output = Candle;
    fn index(&self, index: usize) -> &Self::Output {
        &self.candles[index]
    }
}

impl FromIterator<Candle> for CandleSeries {
    fn from_iter<I: IntoIterator<Item = Candle>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl IntoIterator for CandleSeries {
    type Item = Candle;
    type IntoIter = std::vec::IntoIter<Candle>;
    fn into_iter(self) -> Self::IntoIter {
        self.candles.into_iter()
    }
}

impl<'a> IntoIterator for &'a CandleSeries {
    type Item = &'a Candle;
    type IntoIter = std::slice::Iter<'a, Candle>;
    fn into_iter(self) -> Self::IntoIter {
        self.candles.iter()
    }
}
