use serde::{Deserialize, Serialize};

use crate::core::zones::{Imbalance, ZoneSet};
use crate::models::{Action, Candle};

/// Stand-in body for doji candles so the wick ratio stays finite.
const MIN_BODY: f64 = 1e-8;
const PIN_BAR_RATIO: f64 = 2.0;

/// Pin-bar rejection on a single candle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WickRejection {
    pub bullish: bool,
    pub bearish: bool,
}

impl WickRejection {
    pub fn supports(&self, action: Action) -> bool {
        match action {
            Action::Buy => self.bullish,
            Action::Sell => self.bearish,
            Action::NoTrade => false,
        }
    }
}

/// Bullish: lower wick more than twice the body and a green close.
/// Bearish: upper wick more than twice the body and a red close.
pub fn wick_rejection(candle: &Candle) -> WickRejection {
    let body = if candle.body() == 0.0 { MIN_BODY } else { candle.body() };
    WickRejection {
        bullish: candle.lower_wick() > body * PIN_BAR_RATIO && candle.is_bullish(),
        bearish: candle.upper_wick() > body * PIN_BAR_RATIO && candle.is_bearish(),
    }
}

/// Whether price is at a point of interest for either side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoiTouch {
    pub bullish: bool,
    pub bearish: bool,
}

impl PoiTouch {
    pub fn supports(&self, action: Action) -> bool {
        match action {
            Action::Buy => self.bullish,
            Action::Sell => self.bearish,
            Action::NoTrade => false,
        }
    }

    pub fn tag(&self, action: Action) -> Option<String> {
        match action {
            Action::Buy if self.bullish => Some("bull".to_string()),
            Action::Sell if self.bearish => Some("bear".to_string()),
            _ => None,
        }
    }
}

/// Price inside a zone of at least `min_conf`, or an imbalance on that side.
pub fn poi_touch(price: f64, zones: &ZoneSet, imbalance: &Imbalance, min_conf: f64) -> PoiTouch {
    PoiTouch {
        bullish: zones.inside(Action::Buy, price, min_conf) || imbalance.bullish,
        bearish: zones.inside(Action::Sell, price, min_conf) || imbalance.bearish,
    }
}
