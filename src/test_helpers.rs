use chrono::{DateTime, Duration, Utc};

use crate::config::EngineConfig;
use crate::models::{Candle, CandleSeries, Indicators};

fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Create candles from (open, high, low, close) tuples with auto-incrementing 1m timestamps.
pub fn make_candles(data: &[(f64, f64, f64, f64)]) -> CandleSeries {
    let base = base_time();

    let candles: Vec<Candle> = data
        .iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| Candle {
            timestamp: base + Duration::minutes(i as i64),
            open: o,
            high: h,
            low: l,
            close: c,
            volume: 100.0,
            indicators: Indicators::default(),
        })
        .collect();

    CandleSeries::new(candles)
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

/// Zigzag of `cycles` up-legs then down-legs, `leg_len` candles each.
/// With `up > down` every peak and trough is higher than the last (HH-HL);
/// with `up < down` the mirror (LH-LL). Each extreme is unique so swing
/// detection sees exactly one pivot per leg turn.
pub fn make_zigzag(start: f64, up: f64, down: f64, leg_len: usize, cycles: usize) -> CandleSeries {
    let mut data = Vec::new();
    let mut p = start;
    for _ in 0..cycles {
        for _ in 0..leg_len {
            let close = p + up;
            data.push((p, close + 0.3, p - 0.1, close));
            p = close;
        }
        for _ in 0..leg_len {
            let close = p - down;
            data.push((p, p + 0.1, close - 0.3, close));
            p = close;
        }
    }
    make_candles(&data)
}

/// Flat, zero-body candles at `price`.
pub fn make_flat(n: usize, price: f64) -> CandleSeries {
    let data: Vec<(f64, f64, f64, f64)> = (0..n).map(|_| (price, price, price, price)).collect();
    make_candles(&data)
}

/// Copy `indicators` onto every candle of the series.
pub fn with_indicators(series: &CandleSeries, indicators: Indicators) -> CandleSeries {
    let candles: Vec<Candle> = series
        .iter()
        .cloned()
        .map(|mut c| {
            c.indicators = indicators;
            c
        })
        .collect();
    CandleSeries::new(candles)
}

pub fn adx(value: f64) -> Indicators {
    Indicators {
        adx: Some(value),
        ..Indicators::default()
    }
}

/// Engine defaults with logging quiet.
pub fn default_test_config() -> EngineConfig {
    EngineConfig {
        log_level: "ERROR".to_string(),
        ..EngineConfig::default()
    }
}
