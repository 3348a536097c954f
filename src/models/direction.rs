use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Direction> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" | "long" => Some(Direction::Buy),
            "sell" | "short" => Some(Direction::Sell),
            _ => None,
        }
    }

    /// Trend calls this direction may trade with.
    pub fn accepts(&self, trend: Trend) -> bool {
        match self {
            Direction::Buy => matches!(trend, Trend::Bullish | Trend::Neutral),
            Direction::Sell => matches!(trend, Trend::Bearish | Trend::Neutral),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalType {
    Buy,
    StrongBuy,
    Sell,
    StrongSell,
}

impl SignalType {
    pub fn new(direction: Direction, strong: bool) -> Self {
        match (direction, strong) {
            (Direction::Buy, false) => SignalType::Buy,
            (Direction::Buy, true) => SignalType::StrongBuy,
            (Direction::Sell, false) => SignalType::Sell,
            (Direction::Sell, true) => SignalType::StrongSell,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            SignalType::Buy | SignalType::StrongBuy => Direction::Buy,
            SignalType::Sell | SignalType::StrongSell => Direction::Sell,
        }
    }

    pub fn is_strong(&self) -> bool {
        matches!(self, SignalType::StrongBuy | SignalType::StrongSell)
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalType::Buy => write!(f, "BUY"),
            SignalType::StrongBuy => write!(f, "STRONG_BUY"),
            SignalType::Sell => write!(f, "SELL"),
            SignalType::StrongSell => write!(f, "STRONG_SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Trend {
    Bullish,
    Bearish,
    Neutral,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Bullish => write!(f, "bullish"),
            Trend::Bearish => write!(f, "bearish"),
            Trend::Neutral => write!(f, "neutral"),
        }
    }
}

impl Trend {
    pub fn to_direction(self) -> Option<Direction> {
        match self {
            Trend::Bullish => Some(Direction::Buy),
            Trend::Bearish => Some(Direction::Sell),
            Trend::Neutral => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwingType {
    High,
    Low,
}

impl fmt::Display for SwingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwingType::High => write!(f, "high"),
            SwingType::Low => write!(f, "low"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LevelKind {
    Support,
    Resistance,
}

impl fmt::Display for LevelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelKind::Support => write!(f, "support"),
            LevelKind::Resistance => write!(f, "resistance"),
        }
    }
}

/// How the entry price relates to the nearest key level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryKind {
    AtLevel,
    NearLevel,
    CurrentPrice,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::AtLevel => write!(f, "at_level"),
            EntryKind::NearLevel => write!(f, "near_level"),
            EntryKind::CurrentPrice => write!(f, "current_price"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StructureKind {
    Choch,
    Bos,
}

impl fmt::Display for StructureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructureKind::Choch => write!(f, "CHoCH"),
            StructureKind::Bos => write!(f, "BOS"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    TargetHit,
    StopHit,
    Expired,
    NoData,
}

impl Outcome {
    /// Whether the replay actually filled an exit.
    pub fn is_executed(&self) -> bool {
        matches!(self, Outcome::TargetHit | Outcome::StopHit)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::TargetHit => write!(f, "TARGET_HIT"),
            Outcome::StopHit => write!(f, "STOP_HIT"),
            Outcome::Expired => write!(f, "EXPIRED"),
            Outcome::NoData => write!(f, "NO_DATA"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_accepts_matching_or_neutral_trend() {
        assert!(Direction::Buy.accepts(Trend::Bullish));
        assert!(Direction::Buy.accepts(Trend::Neutral));
        assert!(!Direction::Buy.accepts(Trend::Bearish));
        assert!(Direction::Sell.accepts(Trend::Bearish));
        assert!(!Direction::Sell.accepts(Trend::Bullish));
    }

    #[test]
    fn loose_direction_parse() {
        assert_eq!(Direction::from_str_loose(" Long "), Some(Direction::Buy));
        assert_eq!(Direction::from_str_loose("SELL"), Some(Direction::Sell));
        assert_eq!(Direction::from_str_loose("flat"), None);
    }

    #[test]
    fn signal_type_round_trips_direction() {
        assert_eq!(SignalType::new(Direction::Buy, true), SignalType::StrongBuy);
        assert_eq!(SignalType::StrongSell.direction(), Direction::Sell);
        assert!(!SignalType::Buy.is_strong());
        assert_eq!(SignalType::StrongBuy.to_string(), "STRONG_BUY");
    }

    #[test]
    fn outcome_serializes_screaming_case() {
        let json = serde_json::to_string(&Outcome::TargetHit).unwrap();
        assert_eq!(json, "\"TARGET_HIT\"");
        assert!(!Outcome::NoData.is_executed());
        assert!(Outcome::StopHit.is_executed());
    }
}
