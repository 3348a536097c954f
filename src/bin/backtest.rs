use anyhow::Result;
use chrono::Duration;
use std::path::Path;
use tracing_subscriber::{fmt, EnvFilter};

use structure_signals::backtesting::{data_loader, BacktestRunner};
use structure_signals::config::Config;
use structure_signals::strategies::SignalAssembler;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .init();

    cfg.validate()?;

    // backtest [step_minutes] [warmup_days]
    let args: Vec<String> = std::env::args().collect();

    let step_minutes: i64 = args
        .get(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(60);

    let warmup_days: i64 = args
        .get(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or(10);

    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║          STRUCTURE SIGNALS BACKTESTER                    ║");
    println!("╠══════════════════════════════════════════════════════════╣");
    println!("║  Symbol:     {:<44}║", cfg.symbol);
    println!("║  Step:       {:<44}║", format!("{} minutes", step_minutes));
    println!("║  Warmup:     {:<44}║", format!("{} days", warmup_days));
    println!("║  Expiration: {:<44}║", format!("{} days", cfg.backtest_expiration_days));
    println!("╚══════════════════════════════════════════════════════════╝");
    println!();

    let timeframes = SignalAssembler::new(&cfg).timeframes();
    let market = data_loader::load_market(&cfg.data_dir, &cfg.symbol, &timeframes)?;

    println!("Data loaded:");
    for tf in market.timeframes() {
        println!("  {}", tf);
    }
    println!();

    let (Some(data_start), Some(data_end)) = (market.earliest_time(), market.latest_time()) else {
        println!("ERROR: No candles in {}", cfg.data_dir);
        return Ok(());
    };

    // Leave room for the slow SMA and the level lookback before the first signal
    let bt_start = data_start + Duration::days(warmup_days);
    let bt_end = data_end;

    if bt_start >= bt_end {
        println!("ERROR: Not enough data for backtesting");
        return Ok(());
    }

    println!(
        "Backtesting from {} to {}",
        bt_start.format("%Y-%m-%d %H:%M"),
        bt_end.format("%Y-%m-%d %H:%M")
    );
    println!();

    let mut runner = BacktestRunner::new(market, &cfg);
    let run = runner.run(bt_start, bt_end, Duration::minutes(step_minutes)).await?;

    run.report.print_summary();

    let results_file = format!(
        "{}/backtest_{}_{}_{}.json",
        cfg.data_dir,
        cfg.symbol,
        run.report.start.format("%Y%m%d"),
        run.report.end.format("%Y%m%d"),
    );
    data_loader::save_run(Path::new(&results_file), &run)?;
    println!("\nResults saved to: {}", results_file);

    Ok(())
}
