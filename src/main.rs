use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use structure_signals::backtesting::data_loader;
use structure_signals::config::Config;
use structure_signals::models::Direction;
use structure_signals::strategies::SignalAssembler;

/// Generates one signal from the cached candles under `DATA_DIR` and prints it
/// as JSON. Usage: `structure-signals [buy|sell]`.
#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    cfg.validate()?;

    let hint = match std::env::args().nth(1) {
        Some(arg) => Some(
            Direction::from_str_loose(&arg)
                .with_context(|| format!("unknown direction '{}', expected buy or sell", arg))?,
        ),
        None => None,
    };

    let assembler = SignalAssembler::new(&cfg);
    let mut market =
        data_loader::load_market(&cfg.data_dir, &cfg.symbol, &assembler.timeframes())?;

    // Put the clock just past the newest candle so everything loaded counts as closed
    let latest = market.latest_time().context("cache holds no candles")?;
    let span = market
        .finest_timeframe()
        .map(|tf| tf.span())
        .unwrap_or_default();
    market.set_time(latest + span);

    info!("Evaluating {} as of {}", cfg.symbol, market.current_time());

    match assembler.generate_signal(&market, &cfg.symbol, hint).await? {
        Some(signal) => println!("{}", serde_json::to_string_pretty(&signal)?),
        None => {
            info!("No qualifying signal for {}", cfg.symbol);
            println!("null");
        }
    }

    Ok(())
}
