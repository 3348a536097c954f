use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::core::levels::{Level, LevelSet};
use crate::models::Direction;

/// Where a stop or target price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    Level,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskLevels {
    pub stop_loss: f64,
    pub target: f64,
    pub risk_reward: f64,
    pub stop_source: PriceSource,
    pub target_source: PriceSource,
    pub stop_level: Option<Level>,
    pub target_level: Option<Level>,
}

/// Reward over risk, `None` unless stop and target sit on the correct sides of entry.
pub fn risk_reward(direction: Direction, entry: f64, stop: f64, target: f64) -> Option<f64> {
    let (risk, reward) = match direction {
        Direction::Buy if stop < entry && entry < target => (entry - stop, target - entry),
        Direction::Sell if target < entry && entry < stop => (stop - entry, entry - target),
        _ => return None,
    };
    Some(reward / risk)
}

pub struct RiskLevelCalculator {
    pub fallback_stop_pct: f64,
    pub fallback_target_pct: f64,
    pub min_risk_reward: f64,
}

impl Default for RiskLevelCalculator {
    fn default() -> Self {
        Self {
            fallback_stop_pct: 0.08,
            fallback_target_pct: 0.15,
            min_risk_reward: 1.5,
        }
    }
}

impl RiskLevelCalculator {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            fallback_stop_pct: cfg.fallback_stop_pct,
            fallback_target_pct: cfg.fallback_target_pct,
            min_risk_reward: cfg.min_risk_reward,
        }
    }

    /// Stop behind the nearest opposing level, target at the nearest level in
    /// the trade direction, percentage fallbacks otherwise. `None` when the
    /// ordering breaks or R:R falls short.
    pub fn calculate(
        &self,
        direction: Direction,
        entry: f64,
        levels: &LevelSet,
    ) -> Option<RiskLevels> {
        let (stop_level, target_level) = match direction {
            Direction::Buy => (
                levels.nearest_support_below(entry),
                levels.nearest_resistance_above(entry),
            ),
            Direction::Sell => (
                levels.nearest_resistance_above(entry),
                levels.nearest_support_below(entry),
            ),
        };

        let sign = match direction {
            Direction::Buy => 1.0,
            Direction::Sell => -1.0,
        };

        let (stop_loss, stop_source) = match stop_level {
            Some(level) => (level.price, PriceSource::Level),
            None => (entry * (1.0 - sign * self.fallback_stop_pct), PriceSource::Fallback),
        };
        let (target, target_source) = match target_level {
            Some(level) => (level.price, PriceSource::Level),
            None => (entry * (1.0 + sign * self.fallback_target_pct), PriceSource::Fallback),
        };

        let Some(rr) = risk_reward(direction, entry, stop_loss, target) else {
            tracing::debug!(
                "[RISK] {} ordering invalid: stop {:.2} entry {:.2} target {:.2}",
                direction,
                stop_loss,
                entry,
                target
            );
            return None;
        };
        if rr < self.min_risk_reward {
            tracing::debug!("[RISK] {} R:R {:.2} below {:.2}", direction, rr, self.min_risk_reward);
            return None;
        }

        Some(RiskLevels {
            stop_loss,
            target,
            risk_reward: rr,
            stop_source,
            target_source,
            stop_level: stop_level.cloned(),
            target_level: target_level.cloned(),
        })
    }
}
