use serde::{Deserialize, Serialize};

use crate::core::numeric::mean;
use crate::models::{highs_max, lows_min, Candle, PremiumDiscount, SlopeType, Tap};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub upper: f64,
    pub lower: f64,
    pub mid: f64,
    pub slope: SlopeType,
    pub tap: Tap,
}

impl Channel {
    pub fn premium_discount(&self, price: f64) -> PremiumDiscount {
        if price >= self.mid {
            PremiumDiscount::Premium
        } else {
            PremiumDiscount::Discount
        }
    }
}

/// Range bounds of the trailing `lookback` candles with slope and tap.
/// `None` for an empty series.
pub fn detect_channel(candles: &[Candle], price: f64, lookback: usize, tap_pct: f64) -> Option<Channel> {
    let offset = candles.len().saturating_sub(lookback);
    let tail = &candles[offset..];
    if tail.is_empty() {
        return None;
    }

    let upper = highs_max(tail);
    let lower = lows_min(tail);
    let mid = (upper + lower) / 2.0;

    let deltas: Vec<f64> = tail.windows(2).map(|w| w[1].close - w[0].close).collect();
    let slope = match mean(&deltas) {
        Some(d) if d > 0.0 => SlopeType::Up,
        Some(d) if d < 0.0 => SlopeType::Down,
        _ => SlopeType::Sideways,
    };

    let near = |bound: f64| price != 0.0 && ((price - bound) / price).abs() < tap_pct;
    let tap = if near(lower) {
        Tap::Support
    } else if near(upper) {
        Tap::Resistance
    } else {
        Tap::None_
    };

    Some(Channel {
        upper,
        lower,
        mid,
        slope,
        tap,
    })
}

pub fn premium_discount(channel: Option<&Channel>, price: f64) -> PremiumDiscount {
    channel
        .map(|c| c.premium_discount(price))
        .unwrap_or(PremiumDiscount::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{make_bearish_trend, make_bullish_trend, make_candles, make_flat};

    #[test]
    fn empty_series_has_no_channel() {
        let empty: Vec<Candle> = Vec::new();
        assert!(detect_channel(&empty, 2650.0, 60, 0.006).is_none());
        assert_eq!(premium_discount(None, 2650.0), PremiumDiscount::Unknown);
    }

    #[test]
    fn rising_series_slopes_up() {
        let s = make_bullish_trend(20, 2600.0);
        let ch = detect_channel(s.as_slice(), 2700.0, 60, 0.006).unwrap();
        assert_eq!(ch.slope, SlopeType::Up);
        assert!((ch.upper - highs_max(s.as_slice())).abs() < 1e-9);
        assert!((ch.lower - lows_min(s.as_slice())).abs() < 1e-9);
        assert!((ch.mid - (ch.upper + ch.lower) / 2.0).abs() < 1e-9);

        let s = make_bearish_trend(20, 2800.0);
        let ch = detect_channel(s.as_slice(), 2700.0, 60, 0.006).unwrap();
        assert_eq!(ch.slope, SlopeType::Down);
    }

    #[test]
    fn flat_series_is_sideways() {
        let s = make_flat(10, 2650.0);
        let ch = detect_channel(s.as_slice(), 2650.0, 60, 0.006).unwrap();
        assert_eq!(ch.slope, SlopeType::Sideways);
        assert_eq!(ch.tap, Tap::Support);
    }

    #[test]
    fn taps_and_premium_discount() {
        let s = make_candles(&[
            (2600.0, 2700.0, 2600.0, 2650.0),
            (2650.0, 2680.0, 2620.0, 2660.0),
        ]);
        let low = detect_channel(s.as_slice(), 2605.0, 60, 0.006).unwrap();
        assert_eq!(low.tap, Tap::Support);
        assert_eq!(low.premium_discount(2605.0), PremiumDiscount::Discount);

        let high = detect_channel(s.as_slice(), 2695.0, 60, 0.006).unwrap();
        assert_eq!(high.tap, Tap::Resistance);
        assert_eq!(premium_discount(Some(&high), 2695.0), PremiumDiscount::Premium);

        let mid = detect_channel(s.as_slice(), 2650.0, 60, 0.006).unwrap();
        assert_eq!(mid.tap, Tap::None_);
        assert_eq!(mid.premium_discount(2650.0), PremiumDiscount::Premium);
    }
}
