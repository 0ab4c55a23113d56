use serde::{Deserialize, Serialize};

use crate::core::structure::find_swings;
use crate::models::{highs_max, lows_min, Candle, SweepKind};

/// Result of the last-bar stop-hunt check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquiditySweep {
    pub kind: SweepKind,
    /// The prior extreme that was pierced.
    pub level: Option<f64>,
}

impl LiquiditySweep {
    pub fn none() -> Self {
        Self {
            kind: SweepKind::None_,
            level: None,
        }
    }

    pub fn is_none(&self) -> bool {
        self.kind == SweepKind::None_
    }
}

impl Default for LiquiditySweep {
    fn default() -> Self {
        Self::none()
    }
}

/// The last candle pierces the prior window's extreme but closes back inside.
///
/// Above: `high > max(prior highs)` and `close < max(prior highs)`.
/// Below: `low < min(prior lows)` and `close > min(prior lows)`.
/// Fewer than 3 candles never sweeps.
pub fn detect_sweep(candles: &[Candle], lookback: usize) -> LiquiditySweep {
    if candles.len() < 3 {
        return LiquiditySweep::none();
    }
    let offset = candles.len().saturating_sub(lookback.max(3));
    let window = &candles[offset..];
    let Some((last, prior)) = window.split_last() else {
        return LiquiditySweep::none();
    };

    let prior_high = highs_max(prior);
    let prior_low = lows_min(prior);

    if last.high > prior_high && last.close < prior_high {
        tracing::trace!("[LIQUIDITY] sweep above {:.2}", prior_high);
        return LiquiditySweep {
            kind: SweepKind::Above,
            level: Some(prior_high),
        };
    }
    if last.low < prior_low && last.close > prior_low {
        tracing::trace!("[LIQUIDITY] sweep below {:.2}", prior_low);
        return LiquiditySweep {
            kind: SweepKind::Below,
            level: Some(prior_low),
        };
    }
    LiquiditySweep::none()
}

fn sorted_unique(mut values: Vec<f64>) -> Vec<f64> {
    values.retain(|v| v.is_finite());
    values.sort_by(|a, b| a.total_cmp(b));
    values.dedup();
    values
}

/// Swing extremes where resting stops are assumed, ascending and unique.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiquidityPools {
    pub highs: Vec<f64>,
    pub lows: Vec<f64>,
}

impl LiquidityPools {
    pub fn is_empty(&self) -> bool {
        self.highs.is_empty() && self.lows.is_empty()
    }

    pub fn highest(&self) -> Option<f64> {
        self.highs.last().copied()
    }

    pub fn lowest(&self) -> Option<f64> {
        self.lows.first().copied()
    }

    /// Closest pool high strictly above `price`.
    pub fn nearest_above(&self, price: f64) -> Option<f64> {
        self.highs.iter().copied().find(|h| *h > price)
    }

    /// Closest pool low strictly below `price`.
    pub fn nearest_below(&self, price: f64) -> Option<f64> {
        self.lows.iter().rev().copied().find(|l| *l < price)
    }
}

/// Pools from the 15m and 5m swings, merged.
pub fn collect_pools(m15: &[Candle], m5: &[Candle], lookback: usize, w: usize) -> LiquidityPools {
    let a = find_swings(m15, lookback, w);
    let b = find_swings(m5, lookback, w);

    let highs = a.highs.iter().chain(b.highs.iter()).map(|s| s.price).collect();
    let lows = a.lows.iter().chain(b.lows.iter()).map(|s| s.price).collect();

    LiquidityPools {
        highs: sorted_unique(highs),
        lows: sorted_unique(lows),
    }
}

/// The most recent `count` swing highs and lows per low timeframe, merged.
/// Used as structural target and stop candidates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiquidityLevels {
    pub highs: Vec<f64>,
    pub lows: Vec<f64>,
}

impl LiquidityLevels {
    pub fn highs_above(&self, price: f64) -> impl Iterator<Item = f64> + '_ {
        self.highs.iter().copied().filter(move |h| *h > price)
    }

    pub fn lows_below(&self, price: f64) -> impl Iterator<Item = f64> + '_ {
        self.lows.iter().copied().filter(move |l| *l < price)
    }
}

pub fn collect_levels(
    m15: &[Candle],
    m5: &[Candle],
    lookback: usize,
    w: usize,
    count: usize,
) -> LiquidityLevels {
    let mut highs = Vec::new();
    let mut lows = Vec::new();
    for candles in [m15, m5] {
        let swings = find_swings(candles, lookback, w);
        let skip_h = swings.highs.len().saturating_sub(count);
        let skip_l = swings.lows.len().saturating_sub(count);
        highs.extend(swings.highs.iter().skip(skip_h).map(|s| s.price));
        lows.extend(swings.lows.iter().skip(skip_l).map(|s| s.price));
    }
    LiquidityLevels {
        highs: sorted_unique(highs),
        lows: sorted_unique(lows),
    }
}
