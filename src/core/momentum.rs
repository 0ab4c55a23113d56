use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::GateConfig;
use crate::core::numeric::finite;
use crate::models::{Indicators, Trend};

/// ADX strength bucket for one timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdxTier {
    Blocked,
    Medium,
    High,
}

impl fmt::Display for AdxTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdxTier::Blocked => write!(f, "blocked"),
            AdxTier::Medium => write!(f, "medium"),
            AdxTier::High => write!(f, "high"),
        }
    }
}

impl AdxTier {
    /// Missing or non-finite ADX is the blocked tier.
    pub fn from_adx(adx: Option<f64>, gates: &GateConfig) -> Self {
        match finite(adx) {
            Some(v) if v >= gates.adx_strong => AdxTier::High,
            Some(v) if v >= gates.adx_min => AdxTier::Medium,
            _ => AdxTier::Blocked,
        }
    }
}

/// Combined momentum grade across all four timeframes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AdxConfidence {
    Blocked,
    Low,
    Medium,
    High,
}

impl fmt::Display for AdxConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdxConfidence::Blocked => write!(f, "BLOCKED"),
            AdxConfidence::Low => write!(f, "LOW"),
            AdxConfidence::Medium => write!(f, "MEDIUM"),
            AdxConfidence::High => write!(f, "HIGH"),
        }
    }
}

impl AdxConfidence {
    pub fn combine(m5: AdxTier, m15: AdxTier, h1: AdxTier, h4: AdxTier) -> Self {
        if m5 == AdxTier::Blocked || m15 == AdxTier::Blocked {
            return AdxConfidence::Blocked;
        }
        let ltf = if m5 == AdxTier::High && m15 == AdxTier::High {
            AdxConfidence::High
        } else {
            AdxConfidence::Medium
        };
        if h1 == AdxTier::Blocked || h4 == AdxTier::Blocked {
            return AdxConfidence::Low;
        }
        if ltf == AdxConfidence::Medium && h1 == AdxTier::High && h4 == AdxTier::High {
            return AdxConfidence::High;
        }
        ltf
    }

    /// HIGH or MEDIUM.
    pub fn is_tradeable(self) -> bool {
        matches!(self, AdxConfidence::High | AdxConfidence::Medium)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MomentumRead {
    pub m5: AdxTier,
    pub m15: AdxTier,
    pub h1: AdxTier,
    pub h4: AdxTier,
    pub confidence: AdxConfidence,
}

impl MomentumRead {
    pub fn from_indicators(
        m5: &Indicators,
        m15: &Indicators,
        h1: &Indicators,
        h4: &Indicators,
        gates: &GateConfig,
    ) -> Self {
        let m5 = AdxTier::from_adx(m5.adx, gates);
        let m15 = AdxTier::from_adx(m15.adx, gates);
        let h1 = AdxTier::from_adx(h1.adx, gates);
        let h4 = AdxTier::from_adx(h4.adx, gates);
        Self {
            m5,
            m15,
            h1,
            h4,
            confidence: AdxConfidence::combine(m5, m15, h1, h4),
        }
    }

    /// Fastest timeframe below the ADX floor.
    pub fn fast_blocked(&self) -> bool {
        self.m5 == AdxTier::Blocked
    }

    /// Both fast timeframes at or above the ADX floor.
    pub fn fast_pair_active(&self) -> bool {
        self.m5 != AdxTier::Blocked && self.m15 != AdxTier::Blocked
    }
}

/// EMA stack read: bullish when `close > ema_long` and `ema_short > ema_long`,
/// bearish mirrored. `None` when either EMA is missing.
pub fn ema_trend(indicators: &Indicators, close: f64) -> Option<Trend> {
    let short = finite(indicators.ema_short)?;
    let long = finite(indicators.ema_long)?;
    if close > long && short > long {
        Some(Trend::Bullish)
    } else if close < long && short < long {
        Some(Trend::Bearish)
    } else {
        Some(Trend::Neutral)
    }
}
