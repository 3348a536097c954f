use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{CandleSeries, SwingType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    pub swing_type: SwingType,
    pub index: usize,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

/// Swing highs and lows in chronological order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwingPoints {
    pub highs: Vec<SwingPoint>,
    pub lows: Vec<SwingPoint>,
}

impl SwingPoints {
    pub fn high_prices(&self) -> Vec<f64> {
        self.highs.iter().map(|s| s.price).collect()
    }

    pub fn low_prices(&self) -> Vec<f64> {
        self.lows.iter().map(|s| s.price).collect()
    }

    /// (prior, latest) swing high, if at least two exist.
    pub fn last_two_highs(&self) -> Option<(&SwingPoint, &SwingPoint)> {
        last_two(&self.highs)
    }

    /// (prior, latest) swing low, if at least two exist.
    pub fn last_two_lows(&self) -> Option<(&SwingPoint, &SwingPoint)> {
        last_two(&self.lows)
    }

    /// Keeps only swings at or after `index`.
    pub fn since(&self, index: usize) -> SwingPoints {
        SwingPoints {
            highs: self.highs.iter().filter(|s| s.index >= index).cloned().collect(),
            lows: self.lows.iter().filter(|s| s.index >= index).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.highs.is_empty() && self.lows.is_empty()
    }
}

fn last_two(points: &[SwingPoint]) -> Option<(&SwingPoint, &SwingPoint)> {
    match points {
        [.., prior, latest] => Some((prior, latest)),
        _ => None,
    }
}

/// Finds local extrema: a candle is a swing high when its high equals the
/// maximum high of the `window` candles on either side (swing lows mirror it).
#[derive(Debug, Clone)]
pub struct SwingPointFinder {
    pub window: usize,
}

impl Default for SwingPointFinder {
    fn default() -> Self {
        Self::with_window(5)
    }
}

impl SwingPointFinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window(window: usize) -> Self {
        Self { window }
    }

    pub fn find(&self, candles: &CandleSeries) -> SwingPoints {
        let w = self.window;
        let len = candles.len();
        let mut points = SwingPoints::default();
        if len < 2 * w + 1 {
            return points;
        }

        for i in w..(len - w) {
            let current_high = candles[i].high;
            if (i - w..=i + w).all(|j| candles[j].high <= current_high) {
                points.highs.push(SwingPoint {
                    swing_type: SwingType::High,
                    index: i,
                    price: current_high,
                    timestamp: candles[i].timestamp,
                });
            }

            let current_low = candles[i].low;
            if (i - w..=i + w).all(|j| candles[j].low >= current_low) {
                points.lows.push(SwingPoint {
                    swing_type: SwingType::Low,
                    index: i,
                    price: current_low,
                    timestamp: candles[i].timestamp,
                });
            }
        }

        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{make_bullish_trend, make_candles};

    /// Tent shape peaking at index 10.
    fn tent() -> CandleSeries {
        let data: Vec<(f64, f64, f64, f64)> = (0..=20)
            .map(|i| {
                let v = 100.0 + 10.0 * (i.min(20 - i)) as f64;
                (v, v + 1.0, v - 1.0, v)
            })
            .collect();
        make_candles(&data)
    }

    #[test]
    fn too_few_candles_yield_nothing() {
        let candles = make_candles(&[(100.0, 101.0, 99.0, 100.0); 10]);
        let points = SwingPointFinder::new().find(&candles);
        assert!(points.is_empty());
    }

    #[test]
    fn tent_has_single_swing_high_at_peak() {
        let points = SwingPointFinder::new().find(&tent());
        assert_eq!(points.highs.len(), 1);
        assert_eq!(points.highs[0].index, 10);
        assert!((points.highs[0].price - 201.0).abs() < 1e-9);
        assert!(points.lows.is_empty());
    }

    #[test]
    fn monotonic_series_has_no_false_positives() {
        let candles = make_bullish_trend(40, 100.0);
        let points = SwingPointFinder::with_window(3).find(&candles);
        assert!(points.highs.is_empty());
        assert!(points.lows.is_empty());
    }

    #[test]
    fn equal_highs_both_count() {
        let mut data: Vec<(f64, f64, f64, f64)> =
            (1..=5).map(|i| (100.0, 100.0 + i as f64, 99.0, 100.0)).collect();
        data.push((100.0, 110.0, 99.0, 105.0));
        data.push((100.0, 110.0, 99.0, 105.0));
        data.extend((1..=5).rev().map(|i| (100.0, 100.0 + i as f64, 99.0, 100.0)));
        let points = SwingPointFinder::with_window(2).find(&make_candles(&data));
        let idx: Vec<usize> = points.highs.iter().map(|s| s.index).collect();
        assert_eq!(idx, vec![5, 6]);
    }

    #[test]
    fn last_two_and_since() {
        let points = SwingPoints {
            highs: vec![
                SwingPoint {
                    swing_type: SwingType::High,
                    index: 3,
                    price: 120.0,
                    timestamp: Utc::now(),
                },
                SwingPoint {
                    swing_type: SwingType::High,
                    index: 9,
                    price: 115.0,
                    timestamp: Utc::now(),
                },
            ],
            lows: Vec::new(),
        };
        let (prior, latest) = points.last_two_highs().unwrap();
        assert!((prior.price - 120.0).abs() < 1e-9);
        assert!((latest.price - 115.0).abs() < 1e-9);
        assert!(points.last_two_lows().is_none());
        assert_eq!(points.since(5).highs.len(), 1);
    }
}
