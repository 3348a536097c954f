use serde::{Deserialize, Serialize};

use crate::models::EntryKind;

/// Everything a confidence model may look at for one candidate signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreInputs {
    pub trend_strength: f64,
    pub choch: bool,
    pub bos: bool,
    pub entry_kind: EntryKind,
    pub confirmations: u32,
    pub risk_reward: f64,
}

/// Pluggable scoring for the assembler. Implementations must return a value in [0, 1].
pub trait ConfidenceModel: Send + Sync {
    fn score(&self, inputs: &ScoreInputs) -> f64;

    fn name(&self) -> &'static str;
}

/// Additive structure/level/R:R score, capped at `ceiling` and rounded to
/// three decimals.
#[derive(Debug, Clone)]
pub struct StructureConfidence {
    pub ceiling: f64,
}

impl Default for StructureConfidence {
    fn default() -> Self {
        Self { ceiling: 0.95 }
    }
}

impl ConfidenceModel for StructureConfidence {
    fn score(&self, inputs: &ScoreInputs) -> f64 {
        let mut score = 0.5;

        score += inputs.trend_strength.clamp(0.0, 1.0) * 0.2;

        score += match (inputs.choch, inputs.bos) {
            (true, true) => 0.2,
            (true, false) | (false, true) => 0.1,
            (false, false) => 0.05,
        };

        score += match inputs.entry_kind {
            EntryKind::AtLevel => 0.1,
            _ => 0.05,
        };

        score += match inputs.confirmations {
            0 => 0.05,
            n => n.min(4) as f64 / 4.0 * 0.1,
        };

        score += if inputs.risk_reward >= 2.0 {
            0.1
        } else if inputs.risk_reward >= 1.5 {
            0.05
        } else if inputs.risk_reward >= 1.2 {
            0.02
        } else {
            0.0
        };

        round3(score.clamp(0.0, self.ceiling))
    }

    fn name(&self) -> &'static str {
        "structure"
    }
}

pub(crate) fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> ScoreInputs {
        ScoreInputs {
            trend_strength: 0.5,
            choch: false,
            bos: false,
            entry_kind: EntryKind::CurrentPrice,
            confirmations: 1,
            risk_reward: 1.875,
        }
    }

    #[test]
    fn fallback_path_score() {
        let score = StructureConfidence::default().score(&inputs());
        assert!((score - 0.775).abs() < 1e-9);
    }

    #[test]
    fn full_confirmation_hits_ceiling() {
        let score = StructureConfidence::default().score(&ScoreInputs {
            trend_strength: 1.0,
            choch: true,
            bos: true,
            entry_kind: EntryKind::AtLevel,
            confirmations: 4,
            risk_reward: 2.5,
        });
        assert!((score - 0.95).abs() < 1e-9);
    }

    #[test]
    fn confirmations_are_capped_at_four() {
        let model = StructureConfidence { ceiling: 1.0 };
        let four = model.score(&ScoreInputs {
            confirmations: 4,
            ..inputs()
        });
        let nine = model.score(&ScoreInputs {
            confirmations: 9,
            ..inputs()
        });
        assert!((four - nine).abs() < 1e-9);
    }

    #[test]
    fn zero_confirmations_and_low_rr() {
        let score = StructureConfidence::default().score(&ScoreInputs {
            trend_strength: 0.0,
            confirmations: 0,
            risk_reward: 1.0,
            ..inputs()
        });
        // 0.5 + 0 + 0.05 + 0.05 + 0.05 + 0
        assert!((score - 0.65).abs() < 1e-9);
    }

    #[test]
    fn score_is_rounded_to_three_decimals() {
        let score = StructureConfidence::default().score(&ScoreInputs {
            trend_strength: 1.0 / 3.0,
            ..inputs()
        });
        // 0.5 + 0.0667 + 0.05 + 0.05 + 0.025 + 0.05
        assert_eq!(score, 0.742);
    }

    #[test]
    fn one_structure_event_scores_half() {
        let model = StructureConfidence::default();
        let neither = model.score(&inputs());
        let one = model.score(&ScoreInputs {
            choch: true,
            ..inputs()
        });
        assert!((one - neither - 0.05).abs() < 1e-9);
    }
}
