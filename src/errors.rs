use thiserror::Error;

use crate::models::Timeframe;

/// Errors surfaced by the signal pipeline and the backtest simulator.
///
/// Business-level non-matches (no trend, no structure, poor R:R) are not errors;
/// they come back as `None`. Only input that would corrupt the analysis lands here.
#[derive(Error, Debug)]
pub enum SignalError {
    #[error("malformed {timeframe} candle at index {index}: {reason}")]
    MalformedCandle {
        timeframe: Timeframe,
        index: usize,
        reason: String,
    },

    #[error("invalid signal: {reason}")]
    InvalidSignal { reason: String },
}
