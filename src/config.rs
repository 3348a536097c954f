use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::models::Timeframe;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Data
    pub symbol: String,
    pub data_dir: String,
    pub candle_lookback: usize,

    // Swings & levels
    pub swing_window: usize,
    pub level_tolerance: f64,
    pub min_touches: usize,
    pub level_timeframes: Vec<Timeframe>,
    pub level_fallback_timeframe: Timeframe,

    // Trend
    pub trend_timeframes: Vec<Timeframe>,
    pub trend_min_candles: usize,
    pub sma_fast: usize,
    pub sma_slow: usize,

    // Market structure
    pub entry_timeframes: Vec<Timeframe>,
    pub structure_swing_window: usize,
    pub choch_lookback: usize,
    pub bos_lookback: usize,
    pub min_break_fraction: f64,
    pub volume_multiplier: f64,
    pub volume_avg_window: usize,

    // Entry & risk
    pub key_point_tolerance: f64,
    pub fallback_stop_pct: f64,
    pub fallback_target_pct: f64,
    pub min_risk_reward: f64,

    // Confidence gates
    pub min_confidence: f64,
    pub relaxed_min_confidence: f64,
    pub strong_signal_confidence: f64,

    // Backtest
    pub backtest_expiration_days: i64,
    pub backtest_capital: f64,
    pub position_fraction: f64,

    // Logging
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            symbol: "BTC-USD".to_string(),
            data_dir: "data".to_string(),
            candle_lookback: 200,
            swing_window: 5,
            level_tolerance: 0.005,
            min_touches: 2,
            level_timeframes: vec![Timeframe::D1, Timeframe::H4],
            level_fallback_timeframe: Timeframe::H1,
            trend_timeframes: vec![Timeframe::H4, Timeframe::H1],
            trend_min_candles: 20,
            sma_fast: 20,
            sma_slow: 50,
            entry_timeframes: vec![Timeframe::H1, Timeframe::M15],
            structure_swing_window: 2,
            choch_lookback: 20,
            bos_lookback: 10,
            min_break_fraction: 0.01,
            volume_multiplier: 1.2,
            volume_avg_window: 5,
            key_point_tolerance: 0.01,
            fallback_stop_pct: 0.08,
            fallback_target_pct: 0.15,
            min_risk_reward: 1.5,
            min_confidence: 0.6,
            relaxed_min_confidence: 0.48,
            strong_signal_confidence: 0.8,
            backtest_expiration_days: 7,
            backtest_capital: 10_000.0,
            position_fraction: 0.10,
            log_level: "INFO".to_string(),
        }
    }
}

impl Config {
    /// Defaults overridden by environment variables (and `.env`, when present).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let env = |key: &str| -> Option<String> { std::env::var(key).ok() };
        let num = |key: &str, default: f64| -> f64 {
            env(key).and_then(|v| v.parse().ok()).unwrap_or(default)
        };
        let count = |key: &str, default: usize| -> usize {
            env(key).and_then(|v| v.parse().ok()).unwrap_or(default)
        };
        let tfs = |key: &str, default: Vec<Timeframe>| -> Vec<Timeframe> {
            env(key)
                .map(|v| Timeframe::parse_list(&v))
                .filter(|list| !list.is_empty())
                .unwrap_or(default)
        };

        let d = Config::default();

        Config {
            symbol: env("SYMBOL").unwrap_or(d.symbol),
            data_dir: env("DATA_DIR").unwrap_or(d.data_dir),
            candle_lookback: count("CANDLE_LOOKBACK", d.candle_lookback),
            swing_window: count("SWING_WINDOW", d.swing_window),
            level_tolerance: num("LEVEL_TOLERANCE", d.level_tolerance),
            min_touches: count("MIN_TOUCHES", d.min_touches),
            level_timeframes: tfs("LEVEL_TIMEFRAMES", d.level_timeframes),
            level_fallback_timeframe: env("LEVEL_FALLBACK_TIMEFRAME")
                .and_then(|v| Timeframe::from_str_loose(&v))
                .unwrap_or(d.level_fallback_timeframe),
            trend_timeframes: tfs("TREND_TIMEFRAMES", d.trend_timeframes),
            trend_min_candles: count("TREND_MIN_CANDLES", d.trend_min_candles),
            sma_fast: count("SMA_FAST", d.sma_fast),
            sma_slow: count("SMA_SLOW", d.sma_slow),
            entry_timeframes: tfs("ENTRY_TIMEFRAMES", d.entry_timeframes),
            structure_swing_window: count("STRUCTURE_SWING_WINDOW", d.structure_swing_window),
            choch_lookback: count("CHOCH_LOOKBACK", d.choch_lookback),
            bos_lookback: count("BOS_LOOKBACK", d.bos_lookback),
            min_break_fraction: num("MIN_BREAK_FRACTION", d.min_break_fraction),
            volume_multiplier: num("VOLUME_MULTIPLIER", d.volume_multiplier),
            volume_avg_window: count("VOLUME_AVG_WINDOW", d.volume_avg_window),
            key_point_tolerance: num("KEY_POINT_TOLERANCE", d.key_point_tolerance),
            fallback_stop_pct: num("FALLBACK_STOP_PCT", d.fallback_stop_pct),
            fallback_target_pct: num("FALLBACK_TARGET_PCT", d.fallback_target_pct),
            min_risk_reward: num("MIN_RISK_REWARD", d.min_risk_reward),
            min_confidence: num("MIN_CONFIDENCE", d.min_confidence),
            relaxed_min_confidence: num("RELAXED_MIN_CONFIDENCE", d.relaxed_min_confidence),
            strong_signal_confidence: num("STRONG_SIGNAL_CONFIDENCE", d.strong_signal_confidence),
            backtest_expiration_days: env("BACKTEST_EXPIRATION_DAYS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.backtest_expiration_days),
            backtest_capital: num("BACKTEST_CAPITAL", d.backtest_capital),
            position_fraction: num("POSITION_FRACTION", d.position_fraction),
            log_level: env("LOG_LEVEL").unwrap_or(d.log_level),
        }
    }

    /// Cross-field checks serde and the env parser cannot express.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.swing_window == 0 {
            errors.push("swing_window must be at least 1".into());
        }
        if self.structure_swing_window == 0 {
            errors.push("structure_swing_window must be at least 1".into());
        }
        if !(self.level_tolerance > 0.0 && self.level_tolerance < 1.0) {
            errors.push(format!(
                "level_tolerance must be in (0, 1), got {}",
                self.level_tolerance
            ));
        }
        if self.min_touches == 0 {
            errors.push("min_touches must be at least 1".into());
        }
        if self.level_timeframes.is_empty() {
            errors.push("level_timeframes is empty".into());
        }
        if self.trend_timeframes.is_empty() {
            errors.push("trend_timeframes is empty".into());
        }
        if self.entry_timeframes.is_empty() {
            errors.push("entry_timeframes is empty".into());
        }
        if self.sma_fast == 0 || self.sma_fast >= self.sma_slow {
            errors.push(format!(
                "sma_fast ({}) must be positive and below sma_slow ({})",
                self.sma_fast, self.sma_slow
            ));
        }
        if self.choch_lookback == 0 || self.bos_lookback == 0 {
            errors.push("choch_lookback and bos_lookback must be positive".into());
        }
        if self.min_break_fraction < 0.0 {
            errors.push("min_break_fraction must not be negative".into());
        }
        if self.key_point_tolerance <= 0.0 {
            errors.push("key_point_tolerance must be positive".into());
        }
        for (name, pct) in [
            ("fallback_stop_pct", self.fallback_stop_pct),
            ("fallback_target_pct", self.fallback_target_pct),
            ("position_fraction", self.position_fraction),
        ] {
            if !(pct > 0.0 && pct <= 1.0) {
                errors.push(format!("{name} must be in (0, 1], got {pct}"));
            }
        }
        if self.min_risk_reward <= 0.0 {
            errors.push("min_risk_reward must be positive".into());
        }
        for (name, conf) in [
            ("min_confidence", self.min_confidence),
            ("relaxed_min_confidence", self.relaxed_min_confidence),
            ("strong_signal_confidence", self.strong_signal_confidence),
        ] {
            if !(0.0..=1.0).contains(&conf) {
                errors.push(format!("{name} must be in [0, 1], got {conf}"));
            }
        }
        if self.relaxed_min_confidence > self.min_confidence {
            errors.push(format!(
                "relaxed_min_confidence ({}) exceeds min_confidence ({})",
                self.relaxed_min_confidence, self.min_confidence
            ));
        }
        if self.backtest_expiration_days <= 0 {
            errors.push("backtest_expiration_days must be positive".into());
        }
        if self.backtest_capital <= 0.0 {
            errors.push("backtest_capital must be positive".into());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            bail!(
                "Configuration validation failed ({} error{}):\n  - {}",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" },
                errors.join("\n  - ")
            );
        }
    }

    pub fn expiration(&self) -> chrono::Duration {
        chrono::Duration::days(self.backtest_expiration_days)
    }
}
