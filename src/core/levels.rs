use serde::{Deserialize, Serialize};

use crate::core::swings::SwingPoints;
use crate::models::{LevelKind, Timeframe};

/// A clustered support or resistance price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub price: f64,
    pub touches: usize,
    pub kind: LevelKind,
    pub timeframe: Timeframe,
}

/// Key levels split by side. Support ascending, resistance descending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelSet {
    pub support: Vec<Level>,
    pub resistance: Vec<Level>,
}

impl LevelSet {
    pub fn is_empty(&self) -> bool {
        self.support.is_empty() && self.resistance.is_empty()
    }

    /// Closest support strictly below `price`.
    pub fn nearest_support_below(&self, price: f64) -> Option<&Level> {
        nearest(self.support.iter().filter(|l| l.price < price), price)
    }

    /// Closest resistance strictly above `price`.
    pub fn nearest_resistance_above(&self, price: f64) -> Option<&Level> {
        nearest(self.resistance.iter().filter(|l| l.price > price), price)
    }

    /// Closest support at or below `price`, the only side a BUY can enter on.
    pub fn nearest_support_at_or_below(&self, price: f64) -> Option<&Level> {
        nearest(self.support.iter().filter(|l| l.price <= price), price)
    }

    /// Closest resistance at or above `price`.
    pub fn nearest_resistance_at_or_above(&self, price: f64) -> Option<&Level> {
        nearest(self.resistance.iter().filter(|l| l.price >= price), price)
    }
}

/// Equal distances prefer the level with more touches.
fn nearest<'a>(levels: impl Iterator<Item = &'a Level>, price: f64) -> Option<&'a Level> {
    levels.min_by(|a, b| {
        let da = (a.price - price).abs();
        let db = (b.price - price).abs();
        da.total_cmp(&db).then(b.touches.cmp(&a.touches))
    })
}

/// Groups nearby swing prices into key levels.
#[derive(Debug, Clone)]
pub struct LevelClusterer {
    pub tolerance: f64,
    pub min_touches: usize,
}

impl Default for LevelClusterer {
    fn default() -> Self {
        Self::with_params(0.005, 2)
    }
}

impl LevelClusterer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(tolerance: f64, min_touches: usize) -> Self {
        Self {
            tolerance,
            min_touches,
        }
    }

    /// Greedy single pass over sorted prices. Returns every cluster as
    /// (mean price, member count), including those below `min_touches`.
    pub fn cluster(&self, prices: &[f64]) -> Vec<(f64, usize)> {
        let mut sorted: Vec<f64> = prices
            .iter()
            .copied()
            .filter(|p| p.is_finite() && *p > 0.0)
            .collect();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let mut clusters: Vec<Vec<f64>> = Vec::new();
        for price in sorted {
            match clusters.last_mut() {
                Some(current) if self.joins(current, price) => current.push(price),
                _ => clusters.push(vec![price]),
            }
        }

        clusters
            .into_iter()
            .map(|members| {
                let mean = members.iter().sum::<f64>() / members.len() as f64;
                (mean, members.len())
            })
            .collect()
    }

    fn joins(&self, cluster: &[f64], price: f64) -> bool {
        match cluster.last() {
            Some(&last) => (price - last).abs() / last <= self.tolerance,
            None => false,
        }
    }

    /// Clusters `prices` into levels of one kind, dropping thin clusters.
    pub fn levels(&self, prices: &[f64], kind: LevelKind, timeframe: Timeframe) -> Vec<Level> {
        let mut levels: Vec<Level> = self
            .cluster(prices)
            .into_iter()
            .filter(|&(_, touches)| touches >= self.min_touches)
            .map(|(price, touches)| Level {
                price,
                touches,
                kind,
                timeframe,
            })
            .collect();
        sort_levels(&mut levels, kind);
        levels
    }

    /// Swing highs become resistance, swing lows become support.
    pub fn level_set(&self, swings: &SwingPoints, timeframe: Timeframe) -> LevelSet {
        LevelSet {
            support: self.levels(&swings.low_prices(), LevelKind::Support, timeframe),
            resistance: self.levels(&swings.high_prices(), LevelKind::Resistance, timeframe),
        }
    }

    /// Combines level sets (e.g. daily and 4h) by re-clustering each side with
    /// touch-weighted means. Merging an already clustered set returns it unchanged.
    pub fn merge(&self, sets: &[LevelSet]) -> LevelSet {
        let support: Vec<Level> = sets.iter().flat_map(|s| s.support.iter().cloned()).collect();
        let resistance: Vec<Level> =
            sets.iter().flat_map(|s| s.resistance.iter().cloned()).collect();
        LevelSet {
            support: self.merge_side(support, LevelKind::Support),
            resistance: self.merge_side(resistance, LevelKind::Resistance),
        }
    }

    fn merge_side(&self, mut levels: Vec<Level>, kind: LevelKind) -> Vec<Level> {
        levels.sort_by(|a, b| a.price.total_cmp(&b.price));

        let mut groups: Vec<Vec<Level>> = Vec::new();
        for level in levels {
            match groups.last_mut() {
                Some(group)
                    if group.last().is_some_and(|last| {
                        (level.price - last.price).abs() / last.price <= self.tolerance
                    }) =>
                {
                    group.push(level)
                }
                _ => groups.push(vec![level]),
            }
        }

        let mut merged: Vec<Level> = groups
            .into_iter()
            .filter_map(|mut group| {
                if group.len() == 1 {
                    return group.pop();
                }
                let touches: usize = group.iter().map(|l| l.touches).sum();
                let weighted: f64 = group.iter().map(|l| l.price * l.touches as f64).sum();
                let timeframe = group
                    .iter()
                    .max_by(|a, b| a.touches.cmp(&b.touches).then(a.timeframe.cmp(&b.timeframe)))
                    .map(|l| l.timeframe)?;
                Some(Level {
                    price: weighted / touches as f64,
                    touches,
                    kind,
                    timeframe,
                })
            })
            .collect();
        sort_levels(&mut merged, kind);
        merged
    }
}

fn sort_levels(levels: &mut [Level], kind: LevelKind) {
    match kind {
        LevelKind::Support => levels.sort_by(|a, b| a.price.total_cmp(&b.price)),
        LevelKind::Resistance => levels.sort_by(|a, b| b.price.total_cmp(&a.price)),
    }
}
