use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::config::Config;
use crate::core::risk::risk_reward;
use crate::errors::SignalError;
use crate::models::{CandleSeries, Direction, Outcome};
use crate::strategies::Signal;

/// How one signal resolved against the candles that followed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub signal_id: Uuid,
    pub executed: bool,
    pub outcome: Outcome,
    pub execution_price: Option<f64>,
    pub execution_timestamp: Option<DateTime<Utc>>,
    /// Fraction of the entry price, so 0.10 is a 10% move in the signal's favour.
    pub pnl_percentage: f64,
    pub pnl_amount: f64,
}

impl BacktestResult {
    fn unresolved(signal: &Signal, outcome: Outcome) -> Self {
        Self {
            signal_id: signal.id,
            executed: false,
            outcome,
            execution_price: None,
            execution_timestamp: None,
            pnl_percentage: 0.0,
            pnl_amount: 0.0,
        }
    }

    pub fn is_win(&self) -> bool {
        self.outcome == Outcome::TargetHit
    }
}

/// Replays a signal candle by candle. Within one candle the target is
/// checked before the stop since the intrabar path is unknown.
#[derive(Debug, Clone)]
pub struct BacktestSimulator {
    pub expiration: Duration,
    pub capital: f64,
    pub position_fraction: f64,
}

impl Default for BacktestSimulator {
    fn default() -> Self {
        Self {
            expiration: Duration::days(7),
            capital: 10_000.0,
            position_fraction: 0.10,
        }
    }
}

impl BacktestSimulator {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            expiration: cfg.expiration(),
            capital: cfg.backtest_capital,
            position_fraction: cfg.position_fraction,
        }
    }

    pub fn position_size(&self) -> f64 {
        self.capital * self.position_fraction
    }

    /// Resolves `signal` against `forward`. Only candles inside
    /// `[created_at, created_at + expiration]` are considered.
    pub fn run_backtest(
        &self,
        signal: &Signal,
        forward: &CandleSeries,
    ) -> Result<BacktestResult, SignalError> {
        forward.validate(signal.timeframe)?;
        let direction = signal.direction();
        if risk_reward(direction, signal.entry_price, signal.stop_loss, signal.target_price)
            .is_none()
        {
            return Err(SignalError::InvalidSignal {
                reason: format!(
                    "{} {} has stop {:.4} / entry {:.4} / target {:.4} out of order",
                    signal.symbol,
                    signal.signal_type,
                    signal.stop_loss,
                    signal.entry_price,
                    signal.target_price
                ),
            });
        }

        let window = forward.between(signal.created_at, signal.created_at + self.expiration);
        if window.is_empty() {
            debug!("[BACKTEST] {} {} no candles in window", signal.symbol, signal.id);
            return Ok(BacktestResult::unresolved(signal, Outcome::NoData));
        }

        for candle in &window {
            let hit = match direction {
                Direction::Buy => {
                    if candle.high >= signal.target_price {
                        Some((Outcome::TargetHit, signal.target_price))
                    } else if candle.low <= signal.stop_loss {
                        Some((Outcome::StopHit, signal.stop_loss))
                    } else {
                        None
                    }
                }
                Direction::Sell => {
                    if candle.low <= signal.target_price {
                        Some((Outcome::TargetHit, signal.target_price))
                    } else if candle.high >= signal.stop_loss {
                        Some((Outcome::StopHit, signal.stop_loss))
                    } else {
                        None
                    }
                }
            };

            if let Some((outcome, price)) = hit {
                let pnl_percentage = match direction {
                    Direction::Buy => (price - signal.entry_price) / signal.entry_price,
                    Direction::Sell => (signal.entry_price - price) / signal.entry_price,
                };
                trace!(
                    "[BACKTEST] {} {} at {:.2} on {}",
                    signal.symbol,
                    outcome,
                    price,
                    candle.timestamp
                );
                return Ok(BacktestResult {
                    signal_id: signal.id,
                    executed: outcome.is_executed(),
                    outcome,
                    execution_price: Some(price),
                    execution_timestamp: Some(candle.timestamp),
                    pnl_percentage,
                    pnl_amount: pnl_percentage * self.position_size(),
                });
            }
        }

        debug!(
            "[BACKTEST] {} expired after {} candles",
            signal.symbol,
            window.len()
        );
        Ok(BacktestResult::unresolved(signal, Outcome::Expired))
    }
}
