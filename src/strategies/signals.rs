use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::levels::Level;
use crate::core::risk::{risk_reward, PriceSource};
use crate::core::structure::StructureAnalysis;
use crate::core::trend::TrendAssessment;
use crate::errors::SignalError;
use crate::models::{Direction, EntryKind, SignalType, Timeframe};

/// Audit trail for how a signal was assembled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalProvenance {
    pub trend: TrendAssessment,
    pub structure: Option<StructureAnalysis>,
    pub entry_level: Option<Level>,
    pub stop_level: Option<Level>,
    pub target_level: Option<Level>,
    pub stop_source: PriceSource,
    pub target_source: PriceSource,
    pub scoring_model: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: Uuid,
    pub symbol: String,
    pub signal_type: SignalType,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub target_price: f64,
    pub confidence: f64,
    pub risk_reward_ratio: f64,
    pub timeframe: Timeframe,
    pub entry_kind: EntryKind,
    pub structure_confirmations: u32,
    pub created_at: DateTime<Utc>,
    pub provenance: Option<SignalProvenance>,
}

impl Signal {
    pub fn builder(symbol: &str, direction: Direction) -> SignalBuilder {
        SignalBuilder::new(symbol, direction)
    }

    pub fn direction(&self) -> Direction {
        self.signal_type.direction()
    }

    pub fn is_buy(&self) -> bool {
        self.direction() == Direction::Buy
    }
}

/// Collects signal fields and refuses to build anything that breaks the
/// price ordering, R:R or confidence floors.
#[derive(Debug, Clone)]
pub struct SignalBuilder {
    symbol: String,
    direction: Direction,
    entry_price: Option<f64>,
    entry_kind: EntryKind,
    stop_loss: Option<f64>,
    target_price: Option<f64>,
    confidence: Option<f64>,
    timeframe: Timeframe,
    confirmations: u32,
    created_at: Option<DateTime<Utc>>,
    provenance: Option<SignalProvenance>,
    min_risk_reward: f64,
    min_confidence: f64,
    strong_confidence: f64,
}

impl SignalBuilder {
    pub fn new(symbol: &str, direction: Direction) -> Self {
        Self {
            symbol: symbol.to_string(),
            direction,
            entry_price: None,
            entry_kind: EntryKind::CurrentPrice,
            stop_loss: None,
            target_price: None,
            confidence: None,
            timeframe: Timeframe::H1,
            confirmations: 0,
            created_at: None,
            provenance: None,
            min_risk_reward: 1.5,
            min_confidence: 0.6,
            strong_confidence: 0.8,
        }
    }

    pub fn entry(mut self, price: f64, kind: EntryKind) -> Self {
        self.entry_price = Some(price);
        self.entry_kind = kind;
        self
    }

    pub fn stop_loss(mut self, price: f64) -> Self {
        self.stop_loss = Some(price);
        self
    }

    pub fn target(mut self, price: f64) -> Self {
        self.target_price = Some(price);
        self
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn timeframe(mut self, timeframe: Timeframe) -> Self {
        self.timeframe = timeframe;
        self
    }

    pub fn confirmations(mut self, confirmations: u32) -> Self {
        self.confirmations = confirmations;
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    pub fn provenance(mut self, provenance: SignalProvenance) -> Self {
        self.provenance = Some(provenance);
        self
    }

    pub fn min_risk_reward(mut self, min: f64) -> Self {
        self.min_risk_reward = min;
        self
    }

    pub fn min_confidence(mut self, min: f64) -> Self {
        self.min_confidence = min;
        self
    }

    pub fn strong_confidence(mut self, threshold: f64) -> Self {
        self.strong_confidence = threshold;
        self
    }

    /// Checks every field and returns the R:R the signal would carry.
    pub fn validate(&self) -> Result<f64, SignalError> {
        let entry = require("entry_price", self.entry_price)?;
        let stop = require("stop_loss", self.stop_loss)?;
        let target = require("target_price", self.target_price)?;
        let confidence = self.confidence.ok_or_else(|| invalid("confidence is missing"))?;

        if self.symbol.trim().is_empty() {
            return Err(invalid("symbol is empty"));
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(invalid(format!("confidence {confidence} outside [0, 1]")));
        }
        if confidence < self.min_confidence {
            return Err(invalid(format!(
                "confidence {confidence:.3} below minimum {:.3}",
                self.min_confidence
            )));
        }

        let rr = risk_reward(self.direction, entry, stop, target).ok_or_else(|| {
            invalid(format!(
                "{} ordering violated: stop {stop:.4} entry {entry:.4} target {target:.4}",
                self.direction
            ))
        })?;
        if rr < self.min_risk_reward {
            return Err(invalid(format!(
                "risk/reward {rr:.2} below minimum {:.2}",
                self.min_risk_reward
            )));
        }

        Ok(rr)
    }

    pub fn build(self) -> Result<Signal, SignalError> {
        let risk_reward_ratio = self.validate()?;
        // validate() has already rejected missing fields
        let (Some(entry_price), Some(stop_loss), Some(target_price), Some(confidence)) = (
            self.entry_price,
            self.stop_loss,
            self.target_price,
            self.confidence,
        ) else {
            return Err(invalid("incomplete signal"));
        };

        Ok(Signal {
            id: Uuid::new_v4(),
            symbol: self.symbol,
            signal_type: SignalType::new(self.direction, confidence >= self.strong_confidence),
            entry_price,
            stop_loss,
            target_price,
            confidence,
            risk_reward_ratio,
            timeframe: self.timeframe,
            entry_kind: self.entry_kind,
            structure_confirmations: self.confirmations,
            created_at: self.created_at.unwrap_or_else(Utc::now),
            provenance: self.provenance,
        })
    }
}

fn require(field: &str, value: Option<f64>) -> Result<f64, SignalError> {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => Ok(v),
        Some(v) => Err(invalid(format!("{field} must be a positive price, got {v}"))),
        None => Err(invalid(format!("{field} is missing"))),
    }
}

fn invalid(reason: impl Into<String>) -> SignalError {
    SignalError::InvalidSignal {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buy() -> SignalBuilder {
        Signal::builder("BTC-USD", Direction::Buy)
            .entry(100.0, EntryKind::AtLevel)
            .stop_loss(95.0)
            .target(110.0)
            .confidence(0.7)
            .timeframe(Timeframe::H1)
            .confirmations(3)
    }

    #[test]
    fn build_valid_buy() {
        let s = buy().build().unwrap();
        assert_eq!(s.signal_type, SignalType::Buy);
        assert!((s.risk_reward_ratio - 2.0).abs() < 1e-9);
        assert_eq!(s.structure_confirmations, 3);
        assert!(s.is_buy());
    }

    #[test]
    fn high_confidence_is_strong() {
        let s = buy().confidence(0.85).build().unwrap();
        assert_eq!(s.signal_type, SignalType::StrongBuy);
        assert_eq!(s.direction(), Direction::Buy);
    }

    #[test]
    fn rejects_inverted_stop() {
        let err = buy().stop_loss(101.0).build().unwrap_err();
        assert!(err.to_string().contains("ordering violated"), "{err}");
    }

    #[test]
    fn rejects_low_reward() {
        let err = buy().target(105.0).build().unwrap_err();
        assert!(err.to_string().contains("risk/reward"), "{err}");
    }

    #[test]
    fn relaxed_confidence_floor() {
        assert!(buy().confidence(0.5).build().is_err());
        assert!(buy().confidence(0.5).min_confidence(0.48).build().is_ok());
    }

    #[test]
    fn missing_fields_are_reported() {
        let err = Signal::builder("BTC-USD", Direction::Sell)
            .entry(100.0, EntryKind::CurrentPrice)
            .confidence(0.7)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("stop_loss is missing"), "{err}");
    }

    #[test]
    fn sell_ordering_and_serde() {
        let s = Signal::builder("ETH-USD", Direction::Sell)
            .entry(100.0, EntryKind::NearLevel)
            .stop_loss(104.0)
            .target(90.0)
            .confidence(0.65)
            .build()
            .unwrap();
        assert_eq!(s.signal_type, SignalType::Sell);
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"signal_type\":\"SELL\""));
        let back: Signal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
