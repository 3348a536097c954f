use serde::{Deserialize, Serialize};

use crate::core::levels::{Level, LevelSet};
use crate::models::{Direction, EntryKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryDecision {
    pub kind: EntryKind,
    pub price: f64,
    /// Level the entry was anchored to (AT_LEVEL) or measured against (NEAR_LEVEL).
    pub level: Option<Level>,
}

/// Anchors the entry to a nearby support at or below the price (BUY) or a
/// resistance at or above it (SELL). Levels on the wrong side are ignored.
#[derive(Debug, Clone)]
pub struct EntryResolver {
    pub tolerance: f64,
}

impl Default for EntryResolver {
    fn default() -> Self {
        Self { tolerance: 0.01 }
    }
}

impl EntryResolver {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn resolve(
        &self,
        direction: Direction,
        current_price: f64,
        levels: &LevelSet,
    ) -> EntryDecision {
        let candidate = match direction {
            Direction::Buy => levels.nearest_support_at_or_below(current_price),
            Direction::Sell => levels.nearest_resistance_at_or_above(current_price),
        };

        let nearest = candidate
            .filter(|_| current_price > 0.0)
            .map(|level| (level, (level.price - current_price).abs() / current_price));

        match nearest {
            Some((level, distance)) if distance <= self.tolerance => EntryDecision {
                kind: EntryKind::AtLevel,
                price: level.price,
                level: Some(level.clone()),
            },
            Some((level, distance)) if distance <= 2.0 * self.tolerance => EntryDecision {
                kind: EntryKind::NearLevel,
                price: current_price,
                level: Some(level.clone()),
            },
            _ => EntryDecision {
                kind: EntryKind::CurrentPrice,
                price: current_price,
                level: None,
            },
        }
    }
}
