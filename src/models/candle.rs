use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Precomputed indicator columns supplied alongside each candle.
///
/// Every field is optional; an absent or non-finite value is treated as a
/// missing field by the layer that needs it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Indicators {
    pub ema_short: Option<f64>,
    pub ema_long: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub adx: Option<f64>,
    pub atr: Option<f64>,
    pub stoch_k: Option<f64>,
    pub stoch_d: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
    #[serde(flatten)]
    pub indicators: Indicators,
}

impl Candle {
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn total_range(&self) -> f64 {
        self.high - self.low
    }

    pub fn upper_wick(&self) -> f64 {
        self.high - self.close.max(self.open)
    }

    pub fn lower_wick(&self) -> f64 {
        self.close.min(self.open) - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Body as a fraction of the full range; 0 for a zero-range candle.
    pub fn body_ratio(&self) -> f64 {
        let range = self.total_range();
        if range > 0.0 {
            self.body() / range
        } else {
            0.0
        }
    }

    /// Whether the candle's [low, high] range overlaps the band.
    pub fn intersects(&self, low: f64, high: f64) -> bool {
        self.low <= high && self.high >= low
    }

    pub fn is_well_formed(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close];
        prices.iter().all(|p| p.is_finite())
            && self.high >= self.low
            && self.high >= self.open.max(self.close)
            && self.low <= self.open.min(self.close)
    }
}

/// Ordered candles for one timeframe.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(candles: Vec<Candle>) -> Self {
        Self { candles }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// The `n`-th candle from the end, `from_end(0)` being the last one.
    pub fn from_end(&self, n: usize) -> Option<&Candle> {
        self.candles.len().checked_sub(n + 1).and_then(|i| self.candles.get(i))
    }

    /// Borrowed view of the trailing `n` candles.
    pub fn tail(&self, n: usize) -> &[Candle] {
        let start = self.candles.len().saturating_sub(n);
        &self.candles[start..]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candle> {
        self.candles.iter()
    }

    pub fn as_slice(&self) -> &[Candle] {
        &self.candles
    }

    pub fn last_close(&self) -> Option<f64> {
        self.candles.last().map(|c| c.close)
    }

    /// Indicators on the most recent candle, or all-missing for an empty series.
    pub fn last_indicators(&self) -> Indicators {
        self.candles.last().map(|c| c.indicators).unwrap_or_default()
    }
}

pub fn highs_max(candles: &[Candle]) -> f64 {
    candles.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max)
}

pub fn lows_min(candles: &[Candle]) -> f64 {
    candles.iter().map(|c| c.low).fold(f64::INFINITY, f64::min)
}

impl std::ops::Index<usize> for CandleSeries {
    type Output = Candle;
    fn index(&self, index: usize) -> &Self::Output {
        &self.candles[index]
    }
}

impl From<Vec<Candle>> for CandleSeries {
    fn from(candles: Vec<Candle>) -> Self {
        Self::new(candles)
    }
}

impl IntoIterator for CandleSeries {
    type Item = Candle;
    type IntoIter = std::vec::IntoIter<Candle>;
    fn into_iter(self) -> Self::IntoIter {
        self.candles.into_iter()
    }
}

impl<'a> IntoIterator for &'a CandleSeries {
    type Item = &'a Candle;
    type IntoIter = std::slice::Iter<'a, Candle>;
    fn into_iter(self) -> Self::IntoIter {
        self.candles.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::make_candles;

    fn bullish_candle() -> Candle {
        Candle {
            timestamp: Utc::now(),
            open: 2650.0,
            high: 2665.0,
            low: 2645.0,
            close: 2660.0,
            volume: 50.0,
            indicators: Indicators::default(),
        }
    }

    #[test]
    fn candle_body_range_and_wicks() {
        let c = bullish_candle(); // O=2650, H=2665, L=2645, C=2660
        assert!((c.body() - 10.0).abs() < 1e-9);
        assert!((c.total_range() - 20.0).abs() < 1e-9);
        assert!((c.upper_wick() - 5.0).abs() < 1e-9);
        assert!((c.lower_wick() - 5.0).abs() < 1e-9);
        assert!((c.body_ratio() - 0.5).abs() < 1e-9);
        assert!(c.is_bullish());
        assert!(!c.is_bearish());
    }

    #[test]
    fn zero_range_candle_has_zero_body_ratio() {
        let mut c = bullish_candle();
        c.open = 2650.0;
        c.high = 2650.0;
        c.low = 2650.0;
        c.close = 2650.0;
        assert_eq!(c.body_ratio(), 0.0);
        assert!(c.is_well_formed());
    }

    #[test]
    fn inverted_candle_is_malformed() {
        let mut c = bullish_candle();
        c.high = 2640.0;
        assert!(!c.is_well_formed());
        c.high = f64::NAN;
        assert!(!c.is_well_formed());
    }

    #[test]
    fn intersects_band() {
        let c = bullish_candle();
        assert!(c.intersects(2664.0, 2670.0));
        assert!(c.intersects(2640.0, 2645.0));
        assert!(!c.intersects(2666.0, 2670.0));
    }

    #[test]
    fn series_tail_and_from_end() {
        let s = make_candles(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0),
            (106.0, 112.0, 104.0, 110.0),
        ]);
        assert_eq!(s.len(), 3);
        assert_eq!(s.tail(2).len(), 2);
        assert!((s.tail(2)[0].open - 102.0).abs() < 1e-9);
        assert_eq!(s.tail(10).len(), 3);
        assert!((s.from_end(0).unwrap().close - 110.0).abs() < 1e-9);
        assert!((s.from_end(2).unwrap().close - 102.0).abs() < 1e-9);
        assert!(s.from_end(3).is_none());
        assert!((highs_max(s.as_slice()) - 112.0).abs() < 1e-9);
        assert!((lows_min(s.as_slice()) - 95.0).abs() < 1e-9);
    }

    #[test]
    fn series_deserializes_flat_indicator_columns() {
        let json = r#"[{"timestamp":"2024-01-15T12:00:00Z","open":1.0,"high":2.0,"low":0.5,"close":1.5,"volume":3.0,"adx":27.5,"atr":1.2}]"#;
        let s: CandleSeries = serde_json::from_str(json).unwrap();
        assert_eq!(s.len(), 1);
        assert_eq!(s[0].indicators.adx, Some(27.5));
        assert_eq!(s[0].indicators.rsi, None);
    }
}
