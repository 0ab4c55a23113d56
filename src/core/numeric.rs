//! Single home for numeric coercion. Layers never convert or default
//! raw values themselves; they go through these helpers.

use crate::models::Candle;

pub const ATR_PERIOD: usize = 14;
/// Floor on the price-fraction ATR fallback.
pub const ATR_FLOOR: f64 = 0.5;

/// Keeps a value only if it is present and finite.
pub fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Keeps a value only if it is present, finite and strictly positive.
pub fn positive(value: Option<f64>) -> Option<f64> {
    finite(value).filter(|v| *v > 0.0)
}

/// Round to cents.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator).
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// Mean true range over the trailing `period` bars. Needs `period + 1`
/// candles so every bar has a previous close.
pub fn true_range_atr(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < period + 1 {
        return None;
    }
    let start = candles.len() - period;
    let ranges: Vec<f64> = (start..candles.len())
        .map(|i| {
            let c = &candles[i];
            let prev_close = candles[i - 1].close;
            (c.high - c.low)
                .max((c.high - prev_close).abs())
                .max((c.low - prev_close).abs())
        })
        .collect();
    positive(mean(&ranges))
}

/// Default policy for a working-timeframe ATR: the supplied indicator,
/// then a true-range estimate, then a fixed fraction of price.
#[derive(Debug, Clone, Copy)]
pub struct AtrPolicy {
    pub fallback_fraction: f64,
}

impl AtrPolicy {
    pub fn new(fallback_fraction: f64) -> Self {
        Self { fallback_fraction }
    }

    /// ATR without the price-fraction fallback.
    pub fn measured(&self, candles: &[Candle]) -> Option<f64> {
        let indicator = candles.last().and_then(|c| positive(c.indicators.atr));
        indicator.or_else(|| true_range_atr(candles, ATR_PERIOD))
    }

    pub fn resolve(&self, candles: &[Candle], price: f64) -> f64 {
        self.measured(candles)
            .unwrap_or_else(|| (price * self.fallback_fraction).abs().max(ATR_FLOOR))
    }
}
