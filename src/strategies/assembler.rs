use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, info, trace, warn};

use crate::config::Config;
use crate::core::confidence::{ConfidenceModel, ScoreInputs, StructureConfidence};
use crate::core::entry::{EntryDecision, EntryResolver};
use crate::core::levels::{LevelClusterer, LevelSet};
use crate::core::risk::RiskLevelCalculator;
use crate::core::structure::{MarketStructureAnalyzer, StructureAnalysis};
use crate::core::swings::SwingPointFinder;
use crate::core::trend::{TrendAssessment, TrendClassifier};
use crate::errors::SignalError;
use crate::exchange::MarketData;
use crate::models::{CandleSeries, Direction, EntryKind, Timeframe};
use crate::strategies::signals::{Signal, SignalProvenance};

/// Everything one evaluation reads, captured at `as_of`.
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub candles: HashMap<Timeframe, CandleSeries>,
    pub current_price: f64,
    pub as_of: DateTime<Utc>,
}

impl MarketSnapshot {
    pub fn new(symbol: &str, current_price: f64, as_of: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.to_string(),
            candles: HashMap::new(),
            current_price,
            as_of,
        }
    }

    pub fn with_series(mut self, tf: Timeframe, series: CandleSeries) -> Self {
        self.candles.insert(tf, series);
        self
    }

    pub fn series(&self, tf: Timeframe) -> Option<&CandleSeries> {
        self.candles.get(&tf)
    }

    /// Rejects malformed candles before any analysis runs.
    pub fn validate(&self) -> Result<(), SignalError> {
        let mut tfs: Vec<&Timeframe> = self.candles.keys().collect();
        tfs.sort();
        for tf in tfs {
            self.candles[tf].validate(*tf)?;
        }
        Ok(())
    }

    /// Pulls every timeframe in `timeframes` from `market`. `None` when the
    /// market has no current price for `symbol`.
    pub async fn fetch(
        market: &dyn MarketData,
        symbol: &str,
        timeframes: &[Timeframe],
        lookback: usize,
    ) -> anyhow::Result<Option<Self>> {
        let Some(current_price) = market.get_current_price(symbol).await? else {
            warn!("No current price for {}", symbol);
            return Ok(None);
        };

        let mut snapshot = MarketSnapshot::new(symbol, current_price, market.now());
        for &tf in timeframes {
            let series = market.get_candles(symbol, tf, lookback).await?;
            if series.is_empty() {
                debug!("No {} candles for {}", tf, symbol);
                continue;
            }
            snapshot.candles.insert(tf, series);
        }
        Ok(Some(snapshot))
    }
}

/// Runs swings → levels → trend → structure → entry → risk → confidence and
/// emits at most one validated signal per call.
pub struct SignalAssembler<M: ConfidenceModel = StructureConfidence> {
    cfg: Config,
    swing_finder: SwingPointFinder,
    clusterer: LevelClusterer,
    trend: TrendClassifier,
    structure: MarketStructureAnalyzer,
    entry: EntryResolver,
    risk: RiskLevelCalculator,
    model: M,
}

impl SignalAssembler<StructureConfidence> {
    pub fn new(cfg: &Config) -> Self {
        Self::with_model(cfg, StructureConfidence::default())
    }
}

impl<M: ConfidenceModel> SignalAssembler<M> {
    pub fn with_model(cfg: &Config, model: M) -> Self {
        Self {
            cfg: cfg.clone(),
            swing_finder: SwingPointFinder::with_window(cfg.swing_window),
            clusterer: LevelClusterer::with_params(cfg.level_tolerance, cfg.min_touches),
            trend: TrendClassifier::from_config(cfg),
            structure: MarketStructureAnalyzer::from_config(cfg),
            entry: EntryResolver::new(cfg.key_point_tolerance),
            risk: RiskLevelCalculator::from_config(cfg),
            model,
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Every timeframe the pipeline may read, finest first.
    pub fn timeframes(&self) -> Vec<Timeframe> {
        let mut tfs: Vec<Timeframe> = self
            .cfg
            .level_timeframes
            .iter()
            .chain(&self.cfg.trend_timeframes)
            .chain(&self.cfg.entry_timeframes)
            .chain(std::iter::once(&self.cfg.level_fallback_timeframe))
            .copied()
            .collect();
        tfs.sort();
        tfs.dedup();
        tfs
    }

    /// Fetches a snapshot from `market` and evaluates it.
    pub async fn generate_signal(
        &self,
        market: &dyn MarketData,
        symbol: &str,
        direction_hint: Option<Direction>,
    ) -> anyhow::Result<Option<Signal>> {
        let snapshot =
            MarketSnapshot::fetch(market, symbol, &self.timeframes(), self.cfg.candle_lookback)
                .await?;
        match snapshot {
            Some(snapshot) => Ok(self.evaluate(&snapshot, direction_hint)?),
            None => Ok(None),
        }
    }

    /// Key levels merged across the configured timeframes, falling back to
    /// the fallback timeframe when none of them produced a level.
    pub fn key_levels(&self, snapshot: &MarketSnapshot) -> LevelSet {
        let sets: Vec<LevelSet> = self
            .cfg
            .level_timeframes
            .iter()
            .filter_map(|&tf| snapshot.series(tf).map(|s| self.levels_for(s, tf)))
            .collect();
        let merged = self.clusterer.merge(&sets);
        if !merged.is_empty() {
            return merged;
        }

        let fallback = self.cfg.level_fallback_timeframe;
        trace!("[LEVELS] none on {:?}, trying {}", self.cfg.level_timeframes, fallback);
        snapshot
            .series(fallback)
            .map(|s| self.levels_for(s, fallback))
            .unwrap_or_default()
    }

    fn levels_for(&self, candles: &CandleSeries, tf: Timeframe) -> LevelSet {
        let swings = self.swing_finder.find(candles);
        self.clusterer.level_set(&swings, tf)
    }

    /// Pure evaluation of one snapshot. `Ok(None)` for every business-level
    /// non-match; `Err` only for malformed input.
    pub fn evaluate(
        &self,
        snapshot: &MarketSnapshot,
        direction_hint: Option<Direction>,
    ) -> Result<Option<Signal>, SignalError> {
        snapshot.validate()?;

        let current = snapshot.current_price;
        if !(current.is_finite() && current > 0.0) {
            warn!("[EVAL] {} has no usable price ({})", snapshot.symbol, current);
            return Ok(None);
        }

        // Step 1: Trend gate
        let trend = self.trend.assess(&snapshot.candles, &self.cfg.trend_timeframes);
        let direction = match direction_hint {
            Some(d) if d.accepts(trend.direction) => d,
            Some(d) => {
                trace!("[EVAL] {} {} blocked by {} trend", snapshot.symbol, d, trend.direction);
                return Ok(None);
            }
            None => match trend.direction.to_direction() {
                Some(d) => d,
                None => {
                    trace!("[EVAL] {} neutral trend and no hint", snapshot.symbol);
                    return Ok(None);
                }
            },
        };

        // Step 2: Key levels
        let levels = self.key_levels(snapshot);

        // Step 3: Structure, or the current-price fallback
        let structure =
            self.structure
                .find_confirmed(&snapshot.candles, &self.cfg.entry_timeframes, direction);
        let (entry, confirmations, timeframe, min_confidence) = match &structure {
            Some(s) => {
                let entry = self.entry.resolve(direction, current, &levels);
                let bonus = u32::from(entry.kind == EntryKind::AtLevel);
                (entry, s.confirmations() + bonus, s.timeframe, self.cfg.min_confidence)
            }
            None => {
                debug!(
                    "[EVAL] {} {} no CHoCH/BOS on {:?}, using current price",
                    snapshot.symbol, direction, self.cfg.entry_timeframes
                );
                let entry = EntryDecision {
                    kind: EntryKind::CurrentPrice,
                    price: current,
                    level: None,
                };
                let tf = self.cfg.entry_timeframes.first().copied().unwrap_or(Timeframe::H1);
                (entry, 1, tf, self.cfg.relaxed_min_confidence)
            }
        };

        // Step 4: Stop / target
        let Some(risk) = self.risk.calculate(direction, entry.price, &levels) else {
            debug!("[EVAL] {} {} rejected at risk levels", snapshot.symbol, direction);
            return Ok(None);
        };

        // Step 5: Confidence
        let inputs = ScoreInputs {
            trend_strength: trend.strength,
            choch: structure.as_ref().is_some_and(|s| s.choch.is_some()),
            bos: structure.as_ref().is_some_and(|s| s.bos.is_some()),
            entry_kind: entry.kind,
            confirmations,
            risk_reward: risk.risk_reward,
        };
        let confidence = self.model.score(&inputs);
        if confidence < min_confidence {
            debug!(
                "[EVAL] {} {} confidence {:.3} below {:.3}",
                snapshot.symbol, direction, confidence, min_confidence
            );
            return Ok(None);
        }

        // Step 6: Build
        let reason = describe(direction, &trend, structure.as_ref(), &entry, confidence);
        let provenance = SignalProvenance {
            trend,
            structure,
            entry_level: entry.level.clone(),
            stop_level: risk.stop_level.clone(),
            target_level: risk.target_level.clone(),
            stop_source: risk.stop_source,
            target_source: risk.target_source,
            scoring_model: self.model.name().to_string(),
            reason,
        };

        let built = Signal::builder(&snapshot.symbol, direction)
            .entry(entry.price, entry.kind)
            .stop_loss(risk.stop_loss)
            .target(risk.target)
            .confidence(confidence)
            .timeframe(timeframe)
            .confirmations(confirmations)
            .created_at(snapshot.as_of)
            .min_risk_reward(self.cfg.min_risk_reward)
            .min_confidence(min_confidence)
            .strong_confidence(self.cfg.strong_signal_confidence)
            .provenance(provenance)
            .build();

        match built {
            Ok(signal) => {
                info!(
                    "[SIGNAL] {} {} @ {:.2} | SL {:.2} | TP {:.2} | R:R {:.2} | conf {:.3} | {}",
                    signal.symbol,
                    signal.signal_type,
                    signal.entry_price,
                    signal.stop_loss,
                    signal.target_price,
                    signal.risk_reward_ratio,
                    signal.confidence,
                    signal.timeframe
                );
                Ok(Some(signal))
            }
            Err(e) => {
                debug!("[EVAL] {} candidate discarded: {}", snapshot.symbol, e);
                Ok(None)
            }
        }
    }
}

fn describe(
    direction: Direction,
    trend: &TrendAssessment,
    structure: Option<&StructureAnalysis>,
    entry: &EntryDecision,
    confidence: f64,
) -> String {
    let trend_tf = trend.timeframe.map_or("-".to_string(), |tf| tf.to_string());
    let structure_desc = match structure {
        Some(s) => format!(
            "CHoCH+BOS on {} (vol {})",
            s.timeframe,
            if s.volume_confirmed { "YES" } else { "NO" }
        ),
        None => "no structure".to_string(),
    };
    format!(
        "{} | Trend: {} {} ({:.2}) | {} | Entry: {} @ {:.2} | Conf: {:.3}",
        direction,
        trend.direction,
        trend_tf,
        trend.strength,
        structure_desc,
        entry.kind,
        entry.price,
        confidence
    )
}
