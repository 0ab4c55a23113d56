use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::core::structure::find_swings;
use crate::models::{Action, Candle};

/// A plain `[low, high]` price band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBand {
    pub low: f64,
    pub high: f64,
}

impl PriceBand {
    /// Symmetric percentage band around `price`.
    pub fn around(price: f64, pct: f64) -> Self {
        let a = price * (1.0 - pct);
        let b = price * (1.0 + pct);
        Self {
            low: a.min(b),
            high: a.max(b),
        }
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.low && price <= self.high
    }

    pub fn mid(&self) -> f64 {
        (self.low + self.high) / 2.0
    }
}

/// Demand or supply zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub low: f64,
    pub high: f64,
    pub touches: usize,
    /// 0..=100, non-decreasing in `touches`.
    pub confidence: f64,
}

impl Zone {
    pub fn contains(&self, price: f64) -> bool {
        price >= self.low && price <= self.high
    }

    pub fn band(&self) -> PriceBand {
        PriceBand {
            low: self.low,
            high: self.high,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneSet {
    pub demand: Option<Zone>,
    pub supply: Option<Zone>,
}

impl ZoneSet {
    /// Demand zone for BUY, supply zone for SELL.
    pub fn for_action(&self, action: Action) -> Option<&Zone> {
        match action {
            Action::Buy => self.demand.as_ref(),
            Action::Sell => self.supply.as_ref(),
            Action::NoTrade => None,
        }
    }

    /// The zone a trade in `action`'s direction would be running into.
    pub fn opposing(&self, action: Action) -> Option<&Zone> {
        self.for_action(action.opposite())
    }

    /// Whether `price` sits inside the action's zone with at least `min_conf`.
    pub fn inside(&self, action: Action, price: f64, min_conf: f64) -> bool {
        self.for_action(action)
            .is_some_and(|z| z.confidence >= min_conf && z.contains(price))
    }
}

/// Candles whose `[low, high]` overlaps the band.
pub fn count_touches(candles: &[Candle], band: PriceBand) -> usize {
    candles
        .iter()
        .filter(|c| c.intersects(band.low, band.high))
        .count()
}

pub fn zone_confidence(touches: usize, cfg: &AnalysisConfig) -> f64 {
    (cfg.zone_base_confidence + touches as f64 * cfg.zone_touch_weight).min(100.0)
}

fn build_zone(base: f64, window: &[Candle], cfg: &AnalysisConfig) -> Zone {
    let band = PriceBand::around(base, cfg.zone_band_pct);
    let touches = count_touches(window, band);
    Zone {
        low: band.low,
        high: band.high,
        touches,
        confidence: zone_confidence(touches, cfg),
    }
}

/// Demand around the most recent swing low and supply around the most recent
/// swing high of the trailing zone window.
pub fn detect_zones(candles: &[Candle], cfg: &AnalysisConfig) -> ZoneSet {
    let swings = find_swings(candles, cfg.zone_lookback, cfg.zone_window);
    let offset = candles.len().saturating_sub(cfg.zone_lookback);
    let window = &candles[offset..];

    ZoneSet {
        demand: swings.last_low().map(|s| build_zone(s.price, window, cfg)),
        supply: swings.last_high().map(|s| build_zone(s.price, window, cfg)),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBlocks {
    pub bullish: Option<PriceBand>,
    pub bearish: Option<PriceBand>,
}

impl OrderBlocks {
    pub fn for_action(&self, action: Action) -> Option<&PriceBand> {
        match action {
            Action::Buy => self.bullish.as_ref(),
            Action::Sell => self.bearish.as_ref(),
            Action::NoTrade => None,
        }
    }
}

/// Zone bands on the order-block swing basis. A side needs at least two
/// swings of its kind.
pub fn detect_order_blocks(candles: &[Candle], cfg: &AnalysisConfig) -> OrderBlocks {
    let swings = find_swings(candles, cfg.order_block_lookback, cfg.order_block_window);
    let bullish = (swings.lows.len() >= 2)
        .then(|| swings.last_low())
        .flatten()
        .map(|s| PriceBand::around(s.price, cfg.zone_band_pct));
    let bearish = (swings.highs.len() >= 2)
        .then(|| swings.last_high())
        .flatten()
        .map(|s| PriceBand::around(s.price, cfg.zone_band_pct));
    OrderBlocks { bullish, bearish }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Imbalance {
    pub bullish: bool,
    pub bearish: bool,
}

impl Imbalance {
    pub fn supports(&self, action: Action) -> bool {
        match action {
            Action::Buy => self.bullish,
            Action::Sell => self.bearish,
            Action::NoTrade => false,
        }
    }
}

/// Gap between the first two of the last three candles.
pub fn detect_imbalance(candles: &[Candle]) -> Imbalance {
    let n = candles.len();
    if n < 3 {
        return Imbalance::default();
    }
    let (a, b) = (&candles[n - 3], &candles[n - 2]);
    Imbalance {
        bullish: b.low > a.high,
        bearish: b.high < a.low,
    }
}
