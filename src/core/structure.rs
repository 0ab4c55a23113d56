use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Action, Candle, ShiftKind, StructureLabel, SwingType, Trend};

pub const MAX_STRENGTH: u8 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    pub kind: SwingType,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
    /// Index into the series the swing was extracted from.
    pub index: usize,
    pub strength: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Swings {
    pub highs: Vec<SwingPoint>,
    pub lows: Vec<SwingPoint>,
}

impl Swings {
    pub fn is_empty(&self) -> bool {
        self.highs.is_empty() && self.lows.is_empty()
    }

    pub fn last_high(&self) -> Option<&SwingPoint> {
        self.highs.last()
    }

    pub fn last_low(&self) -> Option<&SwingPoint> {
        self.lows.last()
    }

    /// HH-HL / LH-LL / mixed from the two most recent highs and lows.
    pub fn label(&self) -> StructureLabel {
        if self.highs.len() < 2 || self.lows.len() < 2 {
            return StructureLabel::None_;
        }
        let (last_high, prev_high) = (
            self.highs[self.highs.len() - 1].price,
            self.highs[self.highs.len() - 2].price,
        );
        let (last_low, prev_low) = (
            self.lows[self.lows.len() - 1].price,
            self.lows[self.lows.len() - 2].price,
        );
        if last_high > prev_high && last_low > prev_low {
            StructureLabel::HhHl
        } else if last_high < prev_high && last_low < prev_low {
            StructureLabel::LhLl
        } else {
            StructureLabel::Mixed
        }
    }

    /// Copy with the single most recent swing point removed.
    fn without_latest(&self) -> Swings {
        let mut out = self.clone();
        let high_idx = out.highs.last().map(|s| s.index);
        let low_idx = out.lows.last().map(|s| s.index);
        match (high_idx, low_idx) {
            (Some(h), Some(l)) if h >= l => {
                out.highs.pop();
            }
            (Some(_), Some(_)) | (None, Some(_)) => {
                out.lows.pop();
            }
            (Some(_), None) => {
                out.highs.pop();
            }
            (None, None) => {}
        }
        out
    }
}

/// Swing high iff `high[i]` is the maximum of the closed window `[i-w, i+w]`.
/// Needs both sides of the window, so the answer for `i` never changes once
/// `w` later candles exist.
pub fn is_swing_high(candles: &[Candle], i: usize, w: usize) -> bool {
    if i < w || i + w >= candles.len() {
        return false;
    }
    let h = candles[i].high;
    candles[i - w..=i + w].iter().all(|c| c.high <= h)
}

pub fn is_swing_low(candles: &[Candle], i: usize, w: usize) -> bool {
    if i < w || i + w >= candles.len() {
        return false;
    }
    let l = candles[i].low;
    candles[i - w..=i + w].iter().all(|c| c.low >= l)
}

/// How far the extreme dominates to the left, in units of `w`, capped at 5.
/// Reads only candles before `i`.
pub fn swing_strength(candles: &[Candle], i: usize, kind: SwingType, w: usize) -> u8 {
    let Some(pivot) = candles.get(i) else {
        return 1;
    };
    let run = candles[..i]
        .iter()
        .rev()
        .take_while(|c| match kind {
            SwingType::High => c.high <= pivot.high,
            SwingType::Low => c.low >= pivot.low,
        })
        .count();
    let units = run / w.max(1);
    units.clamp(1, MAX_STRENGTH as usize) as u8
}

/// Swings over the trailing `lookback` candles. Fewer than `2w + 3` candles
/// in the series yields no swings.
pub fn find_swings(candles: &[Candle], lookback: usize, w: usize) -> Swings {
    let mut swings = Swings::default();
    if candles.len() < w * 2 + 3 {
        return swings;
    }

    let offset = candles.len().saturating_sub(lookback);
    let tail = &candles[offset..];

    for i in w..tail.len().saturating_sub(w) {
        let abs = offset + i;
        if is_swing_high(tail, i, w) {
            swings.highs.push(SwingPoint {
                kind: SwingType::High,
                price: tail[i].high,
                timestamp: tail[i].timestamp,
                index: abs,
                strength: swing_strength(candles, abs, SwingType::High, w),
            });
        }
        if is_swing_low(tail, i, w) {
            swings.lows.push(SwingPoint {
                kind: SwingType::Low,
                price: tail[i].low,
                timestamp: tail[i].timestamp,
                index: abs,
                strength: swing_strength(candles, abs, SwingType::Low, w),
            });
        }
    }

    swings
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureState {
    pub label: StructureLabel,
    pub bias: Trend,
    pub last_high: Option<f64>,
    pub last_low: Option<f64>,
    pub swings: Swings,
}

impl StructureState {
    /// The explicit "no structure" result for thin data.
    pub fn empty() -> Self {
        Self {
            label: StructureLabel::None_,
            bias: Trend::Neutral,
            last_high: None,
            last_low: None,
            swings: Swings::default(),
        }
    }
}

impl Default for StructureState {
    fn default() -> Self {
        Self::empty()
    }
}

pub fn analyze_structure(candles: &[Candle], lookback: usize, w: usize) -> StructureState {
    let swings = find_swings(candles, lookback, w);
    if swings.is_empty() {
        return StructureState::empty();
    }
    let label = swings.label();
    StructureState {
        label,
        bias: label.trend(),
        last_high: swings.last_high().map(|s| s.price),
        last_low: swings.last_low().map(|s| s.price),
        swings,
    }
}

/// A close through an unbroken prior swing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breach {
    pub direction: Trend,
    pub level: f64,
    pub index: usize,
}

/// Every close-through of the most recent unbroken, already confirmed swing,
/// in bar order. A swing can be breached once.
pub fn breach_history(candles: &[Candle], swings: &Swings, w: usize) -> Vec<Breach> {
    let mut broken_highs = vec![false; swings.highs.len()];
    let mut broken_lows = vec![false; swings.lows.len()];
    let mut out = Vec::new();

    for (i, candle) in candles.iter().enumerate().skip(1) {
        let latest_high = swings
            .highs
            .iter()
            .enumerate()
            .filter(|(k, s)| s.index + w < i && !broken_highs[*k])
            .max_by_key(|(_, s)| s.index);
        if let Some((k, sh)) = latest_high {
            if candle.close > sh.price {
                broken_highs[k] = true;
                out.push(Breach {
                    direction: Trend::Bullish,
                    level: sh.price,
                    index: i,
                });
            }
        }

        let latest_low = swings
            .lows
            .iter()
            .enumerate()
            .filter(|(k, s)| s.index + w < i && !broken_lows[*k])
            .max_by_key(|(_, s)| s.index);
        if let Some((k, sl)) = latest_low {
            if candle.close < sl.price {
                broken_lows[k] = true;
                out.push(Breach {
                    direction: Trend::Bearish,
                    level: sl.price,
                    index: i,
                });
            }
        }
    }

    out
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StructureShift {
    pub kind: Option<ShiftKind>,
    pub direction: Option<Trend>,
    pub level: Option<f64>,
}

impl StructureShift {
    pub fn none() -> Self {
        Self {
            kind: None,
            direction: None,
            level: None,
        }
    }

    pub fn is_some(&self) -> bool {
        self.direction.is_some()
    }

    pub fn supports(&self, action: Action) -> bool {
        action.is_directional() && self.direction == Some(action.trend())
    }

    pub fn opposes(&self, action: Action) -> bool {
        action.is_directional() && self.direction == Some(action.trend().opposite())
    }

    /// Short tag used in duplicate detection, e.g. `bullish`.
    pub fn tag(&self) -> String {
        self.direction
            .map(|d| d.to_string())
            .unwrap_or_else(|| "none".to_string())
    }
}

impl Default for StructureShift {
    fn default() -> Self {
        Self::none()
    }
}

/// BOS / CHOCH on the trailing `lookback` candles.
///
/// The last close breaching the most recent swing high (low) is a bullish
/// (bearish) break. It is a BOS when it agrees with the preceding breach in
/// the window, or there is none, and a CHOCH when it differs. Without a
/// breach on the last bar, a flip of the swing label between the structure
/// without and with its newest swing is reported as a level-less CHOCH.
pub fn detect_shift(candles: &[Candle], lookback: usize, w: usize) -> StructureShift {
    let offset = candles.len().saturating_sub(lookback);
    let window = &candles[offset..];
    if window.len() < w * 2 + 3 {
        return StructureShift::none();
    }
    let swings = find_swings(window, window.len(), w);
    let Some(last) = window.last() else {
        return StructureShift::none();
    };

    let breach = match (swings.last_high(), swings.last_low()) {
        (Some(h), _) if last.close > h.price => Some((Trend::Bullish, h.price)),
        (_, Some(l)) if last.close < l.price => Some((Trend::Bearish, l.price)),
        _ => None,
    };

    if let Some((direction, level)) = breach {
        let last_index = window.len() - 1;
        let previous = breach_history(window, &swings, w)
            .into_iter()
            .filter(|b| b.index < last_index)
            .last()
            .map(|b| b.direction);
        let kind = match previous {
            Some(prev) if prev != direction => ShiftKind::Choch,
            _ => ShiftKind::Bos,
        };
        return StructureShift {
            kind: Some(kind),
            direction: Some(direction),
            level: Some(level),
        };
    }

    let current = swings.label().trend();
    let prior = swings.without_latest().label().trend();
    if current != Trend::Neutral && prior != Trend::Neutral && current != prior {
        return StructureShift {
            kind: Some(ShiftKind::Choch),
            direction: Some(current),
            level: None,
        };
    }

    StructureShift::none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{make_candles, make_flat, make_zigzag};

    fn append(series: &crate::models::CandleSeries, extra: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
        let mut candles = series.as_slice().to_vec();
        let tail = make_candles(extra);
        for (k, mut c) in tail.into_iter().enumerate() {
            c.timestamp = candles[candles.len() - 1].timestamp + chrono::Duration::minutes(1 + k as i64);
            candles.push(c);
        }
        candles
    }

    #[test]
    fn thin_data_yields_no_structure() {
        let candles = make_zigzag(2600.0, 2.0, 1.0, 1, 3);
        let state = analyze_structure(candles.as_slice(), 120, 3);
        assert_eq!(state, StructureState::empty());
        assert!(find_swings(&candles.as_slice()[..2], 120, 0).is_empty());
        assert_eq!(detect_shift(&candles.as_slice()[..4], 50, 2), StructureShift::none());
    }

    #[test]
    fn rising_zigzag_is_hh_hl() {
        let candles = make_zigzag(2600.0, 2.0, 1.0, 4, 4);
        let state = analyze_structure(candles.as_slice(), 120, 2);
        assert_eq!(state.label, StructureLabel::HhHl);
        assert_eq!(state.bias, Trend::Bullish);
        assert!((state.last_high.unwrap() - 2620.3).abs() < 1e-9);
        assert!((state.last_low.unwrap() - 2611.7).abs() < 1e-9);
        assert_eq!(state.swings.highs.len(), 4);
        assert_eq!(state.swings.lows.len(), 3);
    }

    #[test]
    fn falling_zigzag_is_lh_ll() {
        let candles = make_zigzag(2600.0, 1.0, 2.0, 4, 4);
        let state = analyze_structure(candles.as_slice(), 120, 2);
        assert_eq!(state.label, StructureLabel::LhLl);
        assert_eq!(state.bias, Trend::Bearish);
    }

    #[test]
    fn flat_market_is_mixed() {
        let candles = make_flat(30, 2650.0);
        let state = analyze_structure(candles.as_slice(), 120, 2);
        assert_eq!(state.label, StructureLabel::Mixed);
        assert_eq!(state.bias, Trend::Neutral);
    }

    #[test]
    fn swing_indices_are_absolute_with_lookback() {
        let candles = make_zigzag(2600.0, 2.0, 1.0, 4, 4);
        let swings = find_swings(candles.as_slice(), 16, 2);
        assert!(swings.highs.iter().all(|s| s.index >= candles.len() - 16));
        let last = swings.last_high().unwrap();
        assert!((candles[last.index].high - last.price).abs() < 1e-9);
    }

    #[test]
    fn strength_grows_with_left_dominance() {
        let candles = make_zigzag(2600.0, 2.0, 1.0, 4, 4);
        let swings = find_swings(candles.as_slice(), 120, 2);
        for s in swings.highs.iter().chain(swings.lows.iter()) {
            assert!((1..=MAX_STRENGTH).contains(&s.strength));
        }
        // The last peak dominates everything before it: 27 candles / w=2 caps at 5.
        assert_eq!(swings.last_high().unwrap().strength, MAX_STRENGTH);
    }

    #[test]
    fn breakout_above_last_high_is_bos() {
        let base = make_zigzag(2600.0, 2.0, 1.0, 4, 4);
        let candles = append(&base, &[(2616.0, 2622.5, 2615.9, 2622.0)]);
        let shift = detect_shift(&candles, 50, 2);
        assert_eq!(shift.kind, Some(ShiftKind::Bos));
        assert_eq!(shift.direction, Some(Trend::Bullish));
        assert!((shift.level.unwrap() - 2620.3).abs() < 1e-9);
        assert!(shift.supports(Action::Buy));
        assert!(shift.opposes(Action::Sell));
    }

    #[test]
    fn break_below_after_bullish_breaks_is_choch() {
        let base = make_zigzag(2600.0, 2.0, 1.0, 4, 4);
        let candles = append(&base, &[(2616.0, 2616.1, 2609.7, 2610.0)]);
        let shift = detect_shift(&candles, 50, 2);
        assert_eq!(shift.kind, Some(ShiftKind::Choch));
        assert_eq!(shift.direction, Some(Trend::Bearish));
        assert!((shift.level.unwrap() - 2611.7).abs() < 1e-9);
    }

    #[test]
    fn breach_history_marks_each_swing_once() {
        let candles = make_zigzag(2600.0, 2.0, 1.0, 4, 4);
        let swings = find_swings(candles.as_slice(), 120, 2);
        let history = breach_history(candles.as_slice(), &swings, 2);
        assert!(!history.is_empty());
        assert!(history.iter().all(|b| b.direction == Trend::Bullish));
        let mut levels: Vec<f64> = history.iter().map(|b| b.level).collect();
        let before = levels.len();
        levels.dedup_by(|a, b| (*a - *b).abs() < 1e-9);
        assert_eq!(levels.len(), before);
    }
}
