use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::Config;
use crate::core::swings::{SwingPointFinder, SwingPoints};
use crate::models::{CandleSeries, Timeframe, Trend};

/// Trend call for one timeframe. `timeframe` is `None` when no configured
/// timeframe had enough candles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAssessment {
    pub direction: Trend,
    pub strength: f64,
    pub sma_fast: f64,
    pub sma_slow: f64,
    pub reference_price: f64,
    pub timeframe: Option<Timeframe>,
    pub swing_confirmed: bool,
}

impl TrendAssessment {
    pub fn neutral() -> Self {
        Self {
            direction: Trend::Neutral,
            strength: 0.0,
            sma_fast: 0.0,
            sma_slow: 0.0,
            reference_price: 0.0,
            timeframe: None,
            swing_confirmed: false,
        }
    }
}

pub struct TrendClassifier {
    finder: SwingPointFinder,
    pub sma_fast: usize,
    pub sma_slow: usize,
    pub min_candles: usize,
}

impl Default for TrendClassifier {
    fn default() -> Self {
        Self {
            finder: SwingPointFinder::new(),
            sma_fast: 20,
            sma_slow: 50,
            min_candles: 20,
        }
    }
}

impl TrendClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self {
            finder: SwingPointFinder::with_window(cfg.swing_window),
            sma_fast: cfg.sma_fast,
            sma_slow: cfg.sma_slow,
            min_candles: cfg.trend_min_candles,
        }
    }

    /// Walks `timeframes` in order and classifies the first series with at
    /// least `min_candles` candles. Neutral with zero strength when none qualify.
    pub fn assess(
        &self,
        data: &HashMap<Timeframe, CandleSeries>,
        timeframes: &[Timeframe],
    ) -> TrendAssessment {
        for &tf in timeframes {
            match data.get(&tf) {
                Some(series) if series.len() >= self.min_candles => {
                    return self.classify(series, tf);
                }
                other => {
                    tracing::trace!(
                        "[TREND] {} has {} candles, need {}",
                        tf,
                        other.map_or(0, |s| s.len()),
                        self.min_candles
                    );
                }
            }
        }
        TrendAssessment::neutral()
    }

    /// Classifies a single series, regardless of its length.
    pub fn classify(&self, candles: &CandleSeries, timeframe: Timeframe) -> TrendAssessment {
        let (Some(last), Some(fast), Some(slow)) = (
            candles.last(),
            candles.sma(self.sma_fast),
            candles.sma(self.sma_slow),
        ) else {
            return TrendAssessment::neutral();
        };
        let close = last.close;

        let swings = self.finder.find(candles);
        let stacked_up = close > fast && fast > slow;
        let stacked_down = close < fast && fast < slow;

        let (direction, swing_confirmed) = if stacked_up && progression(&swings, Trend::Bullish) {
            (Trend::Bullish, true)
        } else if stacked_down && progression(&swings, Trend::Bearish) {
            (Trend::Bearish, true)
        } else if stacked_up {
            (Trend::Bullish, false)
        } else if stacked_down {
            (Trend::Bearish, false)
        } else {
            (Trend::Neutral, false)
        };

        let strength = if swing_confirmed && fast > 0.0 {
            ((close - fast).abs() / fast * 10.0).min(1.0)
        } else {
            0.5
        };

        TrendAssessment {
            direction,
            strength,
            sma_fast: fast,
            sma_slow: slow,
            reference_price: close,
            timeframe: Some(timeframe),
            swing_confirmed,
        }
    }
}

/// Both the last two swing highs and the last two swing lows move in `trend`'s direction.
fn progression(swings: &SwingPoints, trend: Trend) -> bool {
    let (Some((ph, lh)), Some((pl, ll))) = (swings.last_two_highs(), swings.last_two_lows()) else {
        return false;
    };
    match trend {
        Trend::Bullish => lh.price > ph.price && ll.price > pl.price,
        Trend::Bearish => lh.price < ph.price && ll.price < pl.price,
        Trend::Neutral => false,
    }
}
