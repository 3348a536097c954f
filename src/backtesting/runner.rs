use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::config::Config;
use crate::core::confidence::{ConfidenceModel, StructureConfidence};
use crate::exchange::HistoricalMarket;
use crate::models::{Direction, Outcome};
use crate::strategies::{Signal, SignalAssembler};

use super::report::BacktestReport;
use super::simulator::{BacktestResult, BacktestSimulator};

/// Everything a walk-forward run produced, in creation order.
#[derive(Debug, Clone)]
pub struct BacktestRun {
    pub signals: Vec<Signal>,
    pub results: Vec<BacktestResult>,
    pub report: BacktestReport,
}

/// Steps the historical clock forward, asks the assembler for a signal at
/// each step and replays it against the candles that follow. While a signal
/// is unresolved no new one is generated.
pub struct BacktestRunner<M: ConfidenceModel = StructureConfidence> {
    pub market: HistoricalMarket,
    assembler: SignalAssembler<M>,
    simulator: BacktestSimulator,
    direction_hint: Option<Direction>,
}

impl BacktestRunner<StructureConfidence> {
    pub fn new(market: HistoricalMarket, cfg: &Config) -> Self {
        Self::with_assembler(market, SignalAssembler::new(cfg), BacktestSimulator::from_config(cfg))
    }
}

impl<M: ConfidenceModel> BacktestRunner<M> {
    pub fn with_assembler(
        market: HistoricalMarket,
        assembler: SignalAssembler<M>,
        simulator: BacktestSimulator,
    ) -> Self {
        Self {
            market,
            assembler,
            simulator,
            direction_hint: None,
        }
    }

    pub fn direction_hint(mut self, hint: Option<Direction>) -> Self {
        self.direction_hint = hint;
        self
    }

    pub async fn run(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: Duration,
    ) -> Result<BacktestRun> {
        let replay_tf = self
            .market
            .finest_timeframe()
            .context("historical market has no candles loaded")?;
        if step < Duration::seconds(1) {
            anyhow::bail!("step must be at least one second, got {}", step);
        }

        let symbol = self.market.symbol().to_string();
        let total_steps = ((end - start).num_seconds() / step.num_seconds()).max(0) as usize + 1;
        let log_interval = (total_steps / 20).max(1); // ~20 progress updates

        info!("=== BACKTEST START ===");
        info!(
            "{} | {} to {} ({} steps of {}m, replay on {})",
            symbol,
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d"),
            total_steps,
            step.num_minutes(),
            replay_tf
        );

        let mut signals = Vec::new();
        let mut results: Vec<BacktestResult> = Vec::new();
        let mut busy_until: Option<DateTime<Utc>> = None;
        let mut current = start;
        let mut step_count = 0usize;

        while current <= end {
            step_count += 1;
            if step_count % log_interval == 0 {
                info!(
                    "  Progress: {:.0}% | {} | Signals: {} | Wins: {}",
                    step_count as f64 / total_steps as f64 * 100.0,
                    current.format("%Y-%m-%d %H:%M"),
                    signals.len(),
                    results.iter().filter(|r| r.is_win()).count(),
                );
            }

            if busy_until.is_some_and(|t| current < t) {
                current += step;
                continue;
            }

            self.market.set_time(current);
            let signal = self
                .assembler
                .generate_signal(&self.market, &symbol, self.direction_hint)
                .await
                .with_context(|| format!("generating signal at {}", current))?;

            if let Some(signal) = signal {
                let horizon = signal.created_at + self.simulator.expiration;
                let forward = self.market.forward_candles(replay_tf, signal.created_at, horizon);
                let result = self.simulator.run_backtest(&signal, &forward)?;

                busy_until = Some(match result.execution_timestamp {
                    Some(ts) => ts + replay_tf.span(),
                    None => horizon,
                });
                debug!(
                    "[BT {}] {} {} @ {:.2} -> {} ({:+.2}%)",
                    current.format("%m-%d %H:%M"),
                    signal.symbol,
                    signal.signal_type,
                    signal.entry_price,
                    result.outcome,
                    result.pnl_percentage * 100.0
                );

                let data_ended = result.outcome == Outcome::NoData;
                signals.push(signal);
                results.push(result);
                if data_ended {
                    info!("Forward data exhausted at {}", current);
                    break;
                }
            }

            current += step;
        }

        info!("=== BACKTEST COMPLETE ===");

        let report = BacktestReport::from_results(&results, self.simulator.capital, start, end);
        Ok(BacktestRun {
            signals,
            results,
            report,
        })
    }
}
