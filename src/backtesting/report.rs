use chrono::{DateTime, Utc};
use std::collections::HashMap;

use super::simulator::BacktestResult;
use crate::models::Outcome;

#[derive(Debug, Clone)]
pub struct BacktestReport {
    // Period
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub days: f64,

    // Outcomes
    pub total_signals: usize,
    pub executed: usize,
    pub outcome_counts: HashMap<Outcome, usize>,
    pub win_rate: f64,

    // P&L (currency)
    pub capital: f64,
    pub total_pnl: f64,
    pub total_return_pct: f64,
    pub avg_pnl: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
    pub profit_factor: f64,
    pub max_drawdown: f64,
}

impl BacktestReport {
    pub fn from_results(
        results: &[BacktestResult],
        capital: f64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        let mut outcome_counts: HashMap<Outcome, usize> = HashMap::new();
        for r in results {
            *outcome_counts.entry(r.outcome).or_default() += 1;
        }

        let executed: Vec<f64> = results
            .iter()
            .filter(|r| r.executed)
            .map(|r| r.pnl_amount)
            .collect();
        let wins = outcome_counts.get(&Outcome::TargetHit).copied().unwrap_or(0);
        let win_rate = if executed.is_empty() {
            0.0
        } else {
            wins as f64 / executed.len() as f64 * 100.0
        };

        let total_pnl: f64 = executed.iter().sum();
        let avg_pnl = if executed.is_empty() {
            0.0
        } else {
            total_pnl / executed.len() as f64
        };

        let gross_win: f64 = executed.iter().filter(|p| **p > 0.0).sum();
        let gross_loss: f64 = executed.iter().filter(|p| **p < 0.0).sum::<f64>().abs();
        let profit_factor = if gross_loss > 0.0 {
            gross_win / gross_loss
        } else if gross_win > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        // Drawdown over the cumulative P&L curve, in signal order
        let mut equity = 0.0f64;
        let mut peak = 0.0f64;
        let mut max_drawdown = 0.0f64;
        for pnl in &executed {
            equity += pnl;
            peak = peak.max(equity);
            max_drawdown = max_drawdown.max(peak - equity);
        }

        BacktestReport {
            start,
            end,
            days: (end - start).num_hours() as f64 / 24.0,
            total_signals: results.len(),
            executed: executed.len(),
            outcome_counts,
            win_rate,
            capital,
            total_pnl,
            total_return_pct: if capital > 0.0 {
                total_pnl / capital * 100.0
            } else {
                0.0
            },
            avg_pnl,
            best_trade: finite_or_zero(executed.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
            worst_trade: finite_or_zero(executed.iter().copied().fold(f64::INFINITY, f64::min)),
            profit_factor,
            max_drawdown,
        }
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcome_counts.get(&outcome).copied().unwrap_or(0)
    }

    pub fn print_summary(&self) {
        println!("\n{}", "=".repeat(70));
        println!("  BACKTEST REPORT");
        println!("{}", "=".repeat(70));
        println!(
            "  Period:      {} to {} ({:.0} days)",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d"),
            self.days
        );
        println!();
        println!("  SIGNALS");
        println!("  ───────────────────────────────────");
        println!("  Generated:   {}", self.total_signals);
        println!("  Executed:    {}", self.executed);
        for outcome in [
            Outcome::TargetHit,
            Outcome::StopHit,
            Outcome::Expired,
            Outcome::NoData,
        ] {
            println!("  {:<12} {}", format!("{}:", outcome), self.count(outcome));
        }
        println!("  Win Rate:    {:.1}%", self.win_rate);
        println!();
        println!("  PERFORMANCE");
        println!("  ───────────────────────────────────");
        println!("  Capital:     ${:.2}", self.capital);
        println!("  PnL:         ${:+.2}", self.total_pnl);
        println!("  Return:      {:+.1}%", self.total_return_pct);
        println!("  Avg Trade:   ${:+.2}", self.avg_pnl);
        println!("  Best:        ${:+.2}", self.best_trade);
        println!("  Worst:       ${:+.2}", self.worst_trade);
        println!("  Profit Factor: {:.2}", self.profit_factor);
        println!("  Max DD:      ${:.2}", self.max_drawdown);
        println!("{}", "=".repeat(70));
    }
}

/// Empty folds leave an infinity behind.
fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::base_time;
    use chrono::Duration;
    use uuid::Uuid;

    fn result(outcome: Outcome, pnl_amount: f64) -> BacktestResult {
        BacktestResult {
            signal_id: Uuid::new_v4(),
            executed: outcome.is_executed(),
            outcome,
            execution_price: None,
            execution_timestamp: None,
            pnl_percentage: pnl_amount / 1000.0,
            pnl_amount,
        }
    }

    #[test]
    fn summarises_mixed_outcomes() {
        let results = vec![
            result(Outcome::TargetHit, 150.0),
            result(Outcome::StopHit, -80.0),
            result(Outcome::StopHit, -40.0),
            result(Outcome::TargetHit, 100.0),
            result(Outcome::Expired, 0.0),
            result(Outcome::NoData, 0.0),
        ];
        let start = base_time();
        let report =
            BacktestReport::from_results(&results, 10_000.0, start, start + Duration::days(10));

        assert_eq!(report.total_signals, 6);
        assert_eq!(report.executed, 4);
        assert_eq!(report.count(Outcome::StopHit), 2);
        assert_eq!(report.count(Outcome::NoData), 1);
        assert!((report.win_rate - 50.0).abs() < 1e-9);
        assert!((report.total_pnl - 130.0).abs() < 1e-9);
        assert!((report.avg_pnl - 32.5).abs() < 1e-9);
        assert!((report.best_trade - 150.0).abs() < 1e-9);
        assert!((report.worst_trade + 80.0).abs() < 1e-9);
        assert!((report.profit_factor - 250.0 / 120.0).abs() < 1e-9);
        assert!((report.max_drawdown - 120.0).abs() < 1e-9);
        assert!((report.total_return_pct - 1.3).abs() < 1e-9);
        assert!((report.days - 10.0).abs() < 1e-9);
    }

    #[test]
    fn empty_run_is_all_zero() {
        let report = BacktestReport::from_results(&[], 10_000.0, base_time(), base_time());
        assert_eq!(report.executed, 0);
        assert_eq!(report.win_rate, 0.0);
        assert_eq!(report.best_trade, 0.0);
        assert_eq!(report.worst_trade, 0.0);
        assert_eq!(report.profit_factor, 0.0);
    }
}
