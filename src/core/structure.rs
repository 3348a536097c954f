use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::config::Config;
use crate::core::swings::{SwingPoint, SwingPointFinder};
use crate::models::{CandleSeries, Direction, StructureKind, Timeframe};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureEvent {
    pub kind: StructureKind,
    pub index: usize,
    pub price: f64,
    pub timeframe: Timeframe,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StructureState {
    SearchingChoch,
    ChochFound,
    SearchingBos,
    BosConfirmed,
    /// No qualifying swing pair inside the CHoCH lookback.
    NoChoch,
    /// CHoCH found but nothing broke the prior swing within the BOS lookback.
    BosMissed,
}

impl StructureState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StructureState::BosConfirmed | StructureState::NoChoch | StructureState::BosMissed
        )
    }
}

impl fmt::Display for StructureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StructureState::SearchingChoch => "searching_choch",
            StructureState::ChochFound => "choch_found",
            StructureState::SearchingBos => "searching_bos",
            StructureState::BosConfirmed => "bos_confirmed",
            StructureState::NoChoch => "no_choch",
            StructureState::BosMissed => "bos_missed",
        };
        write!(f, "{s}")
    }
}

/// Outcome of one structure pass on a single timeframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureAnalysis {
    pub direction: Direction,
    pub timeframe: Timeframe,
    pub state: StructureState,
    pub choch: Option<StructureEvent>,
    pub bos: Option<StructureEvent>,
    /// Swing price the BOS had to clear.
    pub broken_level: Option<f64>,
    pub volume_confirmed: bool,
}

impl StructureAnalysis {
    fn new(direction: Direction, timeframe: Timeframe) -> Self {
        Self {
            direction,
            timeframe,
            state: StructureState::SearchingChoch,
            choch: None,
            bos: None,
            broken_level: None,
            volume_confirmed: false,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.state == StructureState::BosConfirmed
    }

    /// CHoCH + BOS count two, a volume-backed break adds one. The entry bonus
    /// is applied by the assembler.
    pub fn confirmations(&self) -> u32 {
        if !self.is_confirmed() {
            return 0;
        }
        2 + u32::from(self.volume_confirmed)
    }
}

/// Detects a CHoCH followed by a BOS against the requested direction.
pub struct MarketStructureAnalyzer {
    finder: SwingPointFinder,
    pub choch_lookback: usize,
    pub bos_lookback: usize,
    pub min_break_fraction: f64,
    pub volume_multiplier: f64,
    pub volume_avg_window: usize,
}

impl Default for MarketStructureAnalyzer {
    fn default() -> Self {
        Self {
            finder: SwingPointFinder::with_window(2),
            choch_lookback: 20,
            bos_lookback: 10,
            min_break_fraction: 0.01,
            volume_multiplier: 1.2,
            volume_avg_window: 5,
        }
    }
}

impl MarketStructureAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self {
            finder: SwingPointFinder::with_window(cfg.structure_swing_window),
            choch_lookback: cfg.choch_lookback,
            bos_lookback: cfg.bos_lookback,
            min_break_fraction: cfg.min_break_fraction,
            volume_multiplier: cfg.volume_multiplier,
            volume_avg_window: cfg.volume_avg_window,
        }
    }

    /// First timeframe in `timeframes` that reaches `BosConfirmed`, if any.
    pub fn find_confirmed(
        &self,
        data: &HashMap<Timeframe, CandleSeries>,
        timeframes: &[Timeframe],
        direction: Direction,
    ) -> Option<StructureAnalysis> {
        for &tf in timeframes {
            let Some(candles) = data.get(&tf) else {
                continue;
            };
            let analysis = self.analyze(candles, tf, direction);
            if analysis.is_confirmed() {
                return Some(analysis);
            }
            tracing::trace!("[STRUCTURE] {} {} ended in {}", direction, tf, analysis.state);
        }
        None
    }

    /// Runs the state machine to a terminal state.
    pub fn analyze(
        &self,
        candles: &CandleSeries,
        timeframe: Timeframe,
        direction: Direction,
    ) -> StructureAnalysis {
        let mut analysis = StructureAnalysis::new(direction, timeframe);
        let mut prior_swing: Option<SwingPoint> = None;

        while !analysis.state.is_terminal() {
            analysis.state = match analysis.state {
                StructureState::SearchingChoch => match self.find_choch(candles, direction) {
                    Some((prior, latest)) => {
                        analysis.choch = Some(StructureEvent {
                            kind: StructureKind::Choch,
                            index: latest.index,
                            price: latest.price,
                            timeframe,
                            timestamp: latest.timestamp,
                        });
                        prior_swing = Some(prior);
                        StructureState::ChochFound
                    }
                    None => StructureState::NoChoch,
                },
                StructureState::ChochFound => StructureState::SearchingBos,
                StructureState::SearchingBos => {
                    let (Some(choch), Some(prior)) = (&analysis.choch, &prior_swing) else {
                        break;
                    };
                    match self.find_bos(candles, choch.index, prior.price, direction) {
                        Some(index) => {
                            let candle = &candles[index];
                            analysis.bos = Some(StructureEvent {
                                kind: StructureKind::Bos,
                                index,
                                price: candle.close,
                                timeframe,
                                timestamp: candle.timestamp,
                            });
                            analysis.broken_level = Some(prior.price);
                            analysis.volume_confirmed = self.volume_confirms(candles, index);
                            StructureState::BosConfirmed
                        }
                        None => StructureState::BosMissed,
                    }
                }
                terminal => terminal,
            };
        }

        analysis
    }

    /// BUY looks for a lower high, SELL for a higher low, among swings inside
    /// the lookback. Returns (prior, latest).
    fn find_choch(
        &self,
        candles: &CandleSeries,
        direction: Direction,
    ) -> Option<(SwingPoint, SwingPoint)> {
        let start = candles.len().saturating_sub(self.choch_lookback);
        let recent = self.finder.find(candles).since(start);
        let pair = match direction {
            Direction::Buy => recent
                .last_two_highs()
                .filter(|(prior, latest)| latest.price < prior.price),
            Direction::Sell => recent
                .last_two_lows()
                .filter(|(prior, latest)| latest.price > prior.price),
        };
        pair.map(|(prior, latest)| (prior.clone(), latest.clone()))
    }

    /// First close after the CHoCH that clears `level` by the break fraction.
    fn find_bos(
        &self,
        candles: &CandleSeries,
        choch_index: usize,
        level: f64,
        direction: Direction,
    ) -> Option<usize> {
        let end = (choch_index + self.bos_lookback).min(candles.len().saturating_sub(1));
        (choch_index + 1..=end).find(|&i| {
            let close = candles[i].close;
            match direction {
                Direction::Buy => close > level * (1.0 + self.min_break_fraction),
                Direction::Sell => close < level * (1.0 - self.min_break_fraction),
            }
        })
    }

    fn volume_confirms(&self, candles: &CandleSeries, index: usize) -> bool {
        let start = index.saturating_sub(self.volume_avg_window);
        match candles.mean_volume(start, index) {
            Some(avg) if avg > 0.0 => candles[index].volume >= self.volume_multiplier * avg,
            _ => false,
        }
    }
}
