use chrono::{DateTime, Utc};

use crate::models::{Candle, CandleSeries, Timeframe};

pub fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Create candles from (open, high, low, close) tuples with auto-incrementing 1m timestamps.
pub fn make_candles(data: &[(f64, f64, f64, f64)]) -> CandleSeries {
    make_tf_candles(Timeframe::M1, data)
}

/// Same as `make_candles`, spaced one `tf` apart.
pub fn make_tf_candles(tf: Timeframe, data: &[(f64, f64, f64, f64)]) -> CandleSeries {
    let with_volume: Vec<(f64, f64, f64, f64, f64)> =
        data.iter().map(|&(o, h, l, c)| (o, h, l, c, 100.0)).collect();
    make_volume_candles(tf, &with_volume)
}

/// (open, high, low, close, volume) tuples spaced one `tf` apart.
pub fn make_volume_candles(tf: Timeframe, data: &[(f64, f64, f64, f64, f64)]) -> CandleSeries {
    let base = base_time();
    data.iter()
        .enumerate()
        .map(|(i, &(o, h, l, c, v))| Candle {
            timestamp: base + tf.span() * i as i32,
            open: o,
            high: h,
            low: l,
            close: c,
            volume: v,
        })
        .collect()
}

/// Create n rising (bullish) candles starting from `start` price.
pub fn make_bullish_trend(n: usize, start: f64) -> CandleSeries {
    let data: Vec<(f64, f64, f64, f64)> = (0..n)
        .map(|i| {
            let open = start + i as f64 * 10.0;
            let close = open + 8.0;
            (open, close + 2.0, open - 1.0, close)
        })
        .collect();
    make_candles(&data)
}

/// Create n falling (bearish) candles starting from `start` price.
pub fn make_bearish_trend(n: usize, start: f64) -> CandleSeries {
    let data: Vec<(f64, f64, f64, f64)> = (0..n)
        .map(|i| {
            let open = start - i as f64 * 10.0;
            let close = open - 8.0;
            (open, open + 1.0, close - 2.0, close)
        })
        .collect();
    make_candles(&data)
}

/// Flat candles around `price`, useful as neutral padding.
pub fn make_flat(n: usize, price: f64) -> CandleSeries {
    make_candles(&vec![(price, price + 0.5, price - 0.5, price); n])
}
