use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::exchange::HistoricalMarket;
use crate::models::{Candle, CandleSeries, Timeframe};

use super::runner::BacktestRun;

/// `{data_dir}/{symbol}_{tf}.json`
pub fn cache_path(data_dir: &str, symbol: &str, tf: Timeframe) -> PathBuf {
    Path::new(data_dir).join(format!("{}_{}.json", symbol, tf))
}

/// Reads a cached candle file, sorted oldest-first with duplicate timestamps
/// collapsed to the last occurrence.
pub fn load_candles(path: &Path) -> Result<Vec<Candle>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading candle cache {}", path.display()))?;
    let mut candles: Vec<Candle> = serde_json::from_str(&content)
        .with_context(|| format!("parsing candle cache {}", path.display()))?;

    let raw = candles.len();
    // Stable sort keeps file order for equal timestamps, so reversing before
    // dedup keeps the newest write.
    candles.reverse();
    candles.sort_by_key(|c| c.timestamp);
    candles.dedup_by_key(|c| c.timestamp);
    if candles.len() != raw {
        debug!("  {} duplicate candles dropped from {}", raw - candles.len(), path.display());
    }
    Ok(candles)
}

pub fn save_candles(path: &Path, candles: &[Candle]) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating {}", dir.display()))?;
    }
    let json = serde_json::to_string(candles)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Writes a run's signals and results as one pretty-printed JSON document.
pub fn save_run(path: &Path, run: &BacktestRun) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating {}", dir.display()))?;
    }
    let payload = serde_json::json!({
        "signals": run.signals,
        "results": run.results,
    });
    std::fs::write(path, serde_json::to_string_pretty(&payload)?)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Loads every available timeframe for `symbol` into a replay market.
/// 4H is built from 1H when its own file is missing.
pub fn load_market(
    data_dir: &str,
    symbol: &str,
    timeframes: &[Timeframe],
) -> Result<HistoricalMarket> {
    let mut market = HistoricalMarket::new(symbol);
    let mut loaded = Vec::new();

    for &tf in timeframes {
        let path = cache_path(data_dir, symbol, tf);
        if !path.exists() {
            if tf != Timeframe::H4 {
                warn!("No cached {} data at {}", tf, path.display());
            }
            continue;
        }
        let candles = load_candles(&path)?;
        info!("Loaded {} {} candles from {}", candles.len(), tf, path.display());
        market.load(tf, candles);
        loaded.push(tf);
    }

    if timeframes.contains(&Timeframe::H4) && !loaded.contains(&Timeframe::H4) {
        let h1_path = cache_path(data_dir, symbol, Timeframe::H1);
        if h1_path.exists() {
            let h1 = CandleSeries::new(load_candles(&h1_path)?);
            let h4: Vec<Candle> = h1.resample(Timeframe::H4.as_duration()).into_iter().collect();
            info!("Generated {} 4H candles from H1 data", h4.len());
            market.load(Timeframe::H4, h4);
            loaded.push(Timeframe::H4);
        }
    }

    if loaded.is_empty() {
        anyhow::bail!("no cached candles for {} under {}", symbol, data_dir);
    }
    Ok(market)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{base_time, make_tf_candles};
    use uuid::Uuid;

    fn scratch_dir() -> String {
        std::env::temp_dir()
            .join(format!("structure-signals-{}", Uuid::new_v4()))
            .to_string_lossy()
            .into_owned()
    }

    fn hourly(n: usize) -> Vec<Candle> {
        let data: Vec<(f64, f64, f64, f64)> = (0..n)
            .map(|i| {
                let v = 100.0 + i as f64;
                (v, v + 2.0, v - 2.0, v + 1.0)
            })
            .collect();
        make_tf_candles(Timeframe::H1, &data).into_iter().collect()
    }

    #[test]
    fn load_sorts_and_dedups() {
        let dir = scratch_dir();
        let path = cache_path(&dir, "BTC-USD", Timeframe::H1);
        let mut candles = hourly(5);
        let mut dupe = candles[2].clone();
        dupe.close = 150.0;
        dupe.high = 151.0;
        candles.push(dupe);
        candles.swap(0, 4);
        save_candles(&path, &candles).unwrap();

        let loaded = load_candles(&path).unwrap();
        assert_eq!(loaded.len(), 5);
        assert_eq!(loaded[0].timestamp, base_time());
        assert!(loaded.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert!((loaded[2].close - 150.0).abs() < 1e-9);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn market_resamples_missing_four_hour() {
        let dir = scratch_dir();
        save_candles(&cache_path(&dir, "BTC-USD", Timeframe::H1), &hourly(8)).unwrap();

        let market = load_market(&dir, "BTC-USD", &[Timeframe::H1, Timeframe::H4]).unwrap();
        assert_eq!(market.timeframes(), vec![Timeframe::H1, Timeframe::H4]);

        std::fs::remove_dir_all(&dir).ok();
    }

    fn empty_run() -> BacktestRun {
        BacktestRun {
            signals: Vec::new(),
            results: Vec::new(),
            report: crate::backtesting::BacktestReport::from_results(
                &[],
                10_000.0,
                base_time(),
                base_time(),
            ),
        }
    }

    #[test]
    fn save_run_writes_signals_and_results() {
        let dir = scratch_dir();
        let path = Path::new(&dir).join("backtest.json");
        save_run(&path, &empty_run()).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(json["signals"].as_array().unwrap().is_empty());
        assert!(json["results"].as_array().unwrap().is_empty());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn save_run_names_the_failing_path() {
        let dir = scratch_dir();
        std::fs::create_dir_all(&dir).unwrap();
        // a regular file where the parent directory should be
        let blocker = Path::new(&dir).join("blocker");
        std::fs::write(&blocker, "x").unwrap();

        let err = save_run(&blocker.join("backtest.json"), &empty_run()).unwrap_err();
        assert!(err.to_string().contains("blocker"), "{err}");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn empty_cache_is_an_error() {
        let err = load_market(&scratch_dir(), "BTC-USD", &[Timeframe::H1]).unwrap_err();
        assert!(err.to_string().contains("no cached candles"), "{err}");
    }
}
