//! A discretionary-style read of the 5m chart: swing trend, momentum over the
//! last ten bodies, breakout and retest, reaction at the active zones and the
//! latest liquidity event. It describes the chart and never proposes a trade;
//! the layers decide what to do with it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::AnalysisConfig;
use crate::core::liquidity::LiquidityPools;
use crate::core::numeric::{mean, sample_std};
use crate::core::structure::{find_swings, Swings};
use crate::core::zones::{Zone, ZoneSet};
use crate::models::{Action, Candle, Trend};

const MOMENTUM_WINDOW: usize = 10;
const STEADY_BODY_CV: f64 = 0.6;
const STRONG_MOVE_PCT: f64 = 0.006;
const BUILDING_MOVE_PCT: f64 = 0.003;
const STRONG_BODY_RATIO: f64 = 0.6;
const RETEST_WINDOW: usize = 3;
const REACTION_WINDOW: usize = 10;
const MIN_BODY: f64 = 1e-8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MomentumBias {
    StrongBullish,
    StrongBearish,
    BuildingBullish,
    BuildingBearish,
    Neutral,
}

impl MomentumBias {
    pub fn as_str(&self) -> &'static str {
        match self {
            MomentumBias::StrongBullish => "strong_bullish",
            MomentumBias::StrongBearish => "strong_bearish",
            MomentumBias::BuildingBullish => "building_bullish",
            MomentumBias::BuildingBearish => "building_bearish",
            MomentumBias::Neutral => "neutral",
        }
    }

    pub fn direction(self) -> Trend {
        match self {
            MomentumBias::StrongBullish | MomentumBias::BuildingBullish => Trend::Bullish,
            MomentumBias::StrongBearish | MomentumBias::BuildingBearish => Trend::Bearish,
            MomentumBias::Neutral => Trend::Neutral,
        }
    }

    pub fn is_strong(self) -> bool {
        matches!(self, MomentumBias::StrongBullish | MomentumBias::StrongBearish)
    }

    pub fn supports(self, action: Action) -> bool {
        action.is_directional() && self.direction() == action.trend()
    }

    pub fn opposes(self, action: Action) -> bool {
        action.is_directional() && self.direction() == action.trend().opposite()
    }
}

impl fmt::Display for MomentumBias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakoutStatus {
    BullishBreakout,
    BearishBreakout,
    #[serde(rename = "none")]
    None_,
}

impl BreakoutStatus {
    pub fn direction(self) -> Trend {
        match self {
            BreakoutStatus::BullishBreakout => Trend::Bullish,
            BreakoutStatus::BearishBreakout => Trend::Bearish,
            BreakoutStatus::None_ => Trend::Neutral,
        }
    }
}

impl fmt::Display for BreakoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakoutStatus::BullishBreakout => write!(f, "bullish_breakout"),
            BreakoutStatus::BearishBreakout => write!(f, "bearish_breakout"),
            BreakoutStatus::None_ => write!(f, "none"),
        }
    }
}

/// Quality of a retest or strength of a zone reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    Weak,
    Normal,
    Strong,
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strength::Weak => write!(f, "weak"),
            Strength::Normal => write!(f, "normal"),
            Strength::Strong => write!(f, "strong"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneType {
    Demand,
    Supply,
    #[serde(rename = "none")]
    None_,
}

impl fmt::Display for ZoneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneType::Demand => write!(f, "demand"),
            ZoneType::Supply => write!(f, "supply"),
            ZoneType::None_ => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reaction {
    Rejection,
    Absorption,
    #[serde(rename = "none")]
    None_,
}

impl Reaction {
    pub fn is_some(self) -> bool {
        self != Reaction::None_
    }
}

impl fmt::Display for Reaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reaction::Rejection => write!(f, "rejection"),
            Reaction::Absorption => write!(f, "absorption"),
            Reaction::None_ => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiquidityEvent {
    HighSweep,
    LowSweep,
    #[serde(rename = "none")]
    None_,
}

impl fmt::Display for LiquidityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiquidityEvent::HighSweep => write!(f, "high_sweep"),
            LiquidityEvent::LowSweep => write!(f, "low_sweep"),
            LiquidityEvent::None_ => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiquidityContext {
    Reversal,
    Continuation,
    Unclear,
}

impl fmt::Display for LiquidityContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiquidityContext::Reversal => write!(f, "reversal"),
            LiquidityContext::Continuation => write!(f, "continuation"),
            LiquidityContext::Unclear => write!(f, "unclear"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscretionaryRead {
    /// `Neutral` reads as consolidating.
    pub trend: Trend,
    pub momentum_bias: MomentumBias,
    pub breakout: BreakoutStatus,
    pub breakout_level: Option<f64>,
    pub retest_found: bool,
    pub retest_quality: Strength,
    pub zone_type: ZoneType,
    pub zone_strength: Strength,
    pub reaction: Reaction,
    pub liquidity_event: LiquidityEvent,
    pub liquidity_context: LiquidityContext,
    pub conclusion: String,
}

impl DiscretionaryRead {
    pub fn insufficient(min_candles: usize) -> Self {
        Self {
            trend: Trend::Neutral,
            momentum_bias: MomentumBias::Neutral,
            breakout: BreakoutStatus::None_,
            breakout_level: None,
            retest_found: false,
            retest_quality: Strength::Weak,
            zone_type: ZoneType::None_,
            zone_strength: Strength::Weak,
            reaction: Reaction::None_,
            liquidity_event: LiquidityEvent::None_,
            liquidity_context: LiquidityContext::Unclear,
            conclusion: format!(
                "Insufficient data for discretionary read; fewer than {min_candles} candles."
            ),
        }
    }

    /// A rejection or absorption at the zone matching `action`.
    pub fn reacted_at(&self, action: Action) -> bool {
        let zone = match action {
            Action::Buy => ZoneType::Demand,
            Action::Sell => ZoneType::Supply,
            Action::NoTrade => return false,
        };
        self.zone_type == zone && self.reaction.is_some()
    }

    /// A strong rejection at the zone opposing `action`.
    pub fn strong_counter_rejection(&self, action: Action) -> bool {
        let zone = match action {
            Action::Buy => ZoneType::Supply,
            Action::Sell => ZoneType::Demand,
            Action::NoTrade => return false,
        };
        self.zone_type == zone
            && self.reaction == Reaction::Rejection
            && self.zone_strength == Strength::Strong
    }
}

impl Default for DiscretionaryRead {
    fn default() -> Self {
        Self::insufficient(0)
    }
}

fn trend_from_swings(swings: &Swings) -> Trend {
    swings.label().trend()
}

pub fn momentum_bias(candles: &[Candle]) -> MomentumBias {
    if candles.len() < MOMENTUM_WINDOW {
        return MomentumBias::Neutral;
    }
    let tail = &candles[candles.len() - MOMENTUM_WINDOW..];
    let bodies: Vec<f64> = tail.iter().map(|c| c.body()).collect();
    let steady = match (mean(&bodies), sample_std(&bodies)) {
        (Some(m), Some(s)) if m > 0.0 => s / m < STEADY_BODY_CV,
        _ => false,
    };

    let first = tail[0].close;
    let speed = tail[MOMENTUM_WINDOW - 1].close - first;
    if first == 0.0 || speed == 0.0 {
        return MomentumBias::Neutral;
    }
    let distance = speed.abs() / first;
    let bullish = speed > 0.0;

    if distance > STRONG_MOVE_PCT && steady {
        if bullish {
            MomentumBias::StrongBullish
        } else {
            MomentumBias::StrongBearish
        }
    } else if distance > BUILDING_MOVE_PCT {
        if bullish {
            MomentumBias::BuildingBullish
        } else {
            MomentumBias::BuildingBearish
        }
    } else {
        MomentumBias::Neutral
    }
}

struct BreakoutRead {
    status: BreakoutStatus,
    level: Option<f64>,
    retest_found: bool,
    quality: Strength,
}

fn breakout_and_retest(candles: &[Candle], swings: &Swings) -> BreakoutRead {
    let mut read = BreakoutRead {
        status: BreakoutStatus::None_,
        level: None,
        retest_found: false,
        quality: Strength::Weak,
    };
    let Some(last) = candles.last() else {
        return read;
    };
    let strong_body = last.body_ratio() >= STRONG_BODY_RATIO;

    if swings.highs.len() >= 2 {
        if let Some(h) = swings.last_high() {
            read.level = Some(h.price);
            if last.close > h.price && strong_body {
                read.status = BreakoutStatus::BullishBreakout;
            }
        }
    }
    if read.status == BreakoutStatus::None_ && swings.lows.len() >= 2 {
        if let Some(l) = swings.last_low() {
            read.level = Some(l.price);
            if last.close < l.price && strong_body {
                read.status = BreakoutStatus::BearishBreakout;
            }
        }
    }

    let Some(level) = read.level else {
        return read;
    };
    if read.status == BreakoutStatus::None_ {
        return read;
    }

    let start = candles.len().saturating_sub(RETEST_WINDOW);
    for c in &candles[start..] {
        let body = if c.body() > 0.0 { c.body() } else { MIN_BODY };
        let holds_level = c.low <= level && level <= c.high;
        let wick = match read.status {
            BreakoutStatus::BullishBreakout if holds_level && c.is_bullish() => c.lower_wick(),
            BreakoutStatus::BearishBreakout if holds_level && c.is_bearish() => c.upper_wick(),
            _ => continue,
        };
        if wick > body * 1.5 {
            read.quality = if wick > body * 2.0 {
                Strength::Strong
            } else {
                Strength::Normal
            };
            read.retest_found = true;
            break;
        }
    }
    read
}

/// Reaction of the first candle in the recent window that traded into the zone.
fn zone_reaction(candles: &[Candle], zone: Option<&Zone>) -> (Reaction, Strength) {
    let Some(zone) = zone else {
        return (Reaction::None_, Strength::Weak);
    };

    let start = candles.len().saturating_sub(REACTION_WINDOW);
    let mut reaction = Reaction::None_;
    if let Some(c) = candles[start..].iter().find(|c| c.intersects(zone.low, zone.high)) {
        let body = if c.body() > 0.0 { c.body() } else { MIN_BODY };
        let big_body = body >= c.total_range() * 0.5;
        if c.lower_wick() > body * 1.5 || c.upper_wick() > body * 1.5 {
            reaction = Reaction::Rejection;
        }
        let closes_through = (c.is_bullish() && c.high >= zone.high)
            || (c.is_bearish() && c.low <= zone.low);
        if big_body && closes_through {
            reaction = Reaction::Absorption;
        }
    }

    let strength = match reaction {
        Reaction::Rejection if zone.confidence >= 70.0 || zone.touches >= 2 => Strength::Strong,
        Reaction::Rejection => Strength::Normal,
        Reaction::Absorption if zone.confidence >= 40.0 => Strength::Normal,
        Reaction::Absorption => Strength::Weak,
        Reaction::None_ if zone.confidence < 40.0 => Strength::Weak,
        Reaction::None_ => Strength::Normal,
    };
    (reaction, strength)
}

fn liquidity_event(candles: &[Candle], pools: &LiquidityPools) -> LiquidityEvent {
    let Some(last) = candles.last() else {
        return LiquidityEvent::None_;
    };
    if pools.lowest().is_some_and(|l| last.low < l) {
        return LiquidityEvent::LowSweep;
    }
    if pools.highest().is_some_and(|h| last.high > h) {
        return LiquidityEvent::HighSweep;
    }
    LiquidityEvent::None_
}

fn conclusion(read: &DiscretionaryRead) -> String {
    let trend = match read.trend {
        Trend::Neutral => "consolidating".to_string(),
        t => t.to_string(),
    };
    let momentum = if read.momentum_bias.is_strong() {
        "expanding"
    } else if read.momentum_bias == MomentumBias::Neutral {
        "balanced"
    } else {
        "compressing"
    };
    let breakout = if read.breakout == BreakoutStatus::None_ {
        "No decisive breakout seen.".to_string()
    } else {
        "A breakout is underway.".to_string()
    };
    let retest = match (read.retest_found, read.breakout_level) {
        (true, Some(level)) => format!("Retest at {level:.2} with {} quality.", read.retest_quality),
        _ => "Retest not yet confirmed.".to_string(),
    };
    let zone = if read.zone_type == ZoneType::None_ {
        "No active demand/supply reaction detected.".to_string()
    } else {
        format!(
            "Recent {} zone shows {} with {} strength.",
            read.zone_type, read.reaction, read.zone_strength
        )
    };
    let liquidity = if read.liquidity_event == LiquidityEvent::None_ {
        "No fresh liquidity sweep noted.".to_string()
    } else {
        format!(
            "Liquidity {} suggesting {} context.",
            read.liquidity_event, read.liquidity_context
        )
    };
    format!("Structure leans {trend}; momentum is {momentum}. {breakout} {retest} {zone} {liquidity}")
}

pub fn analyze_discretionary(
    m5: &[Candle],
    zones: &ZoneSet,
    pools: &LiquidityPools,
    cfg: &AnalysisConfig,
) -> DiscretionaryRead {
    if m5.len() < cfg.discretionary_min_candles {
        return DiscretionaryRead::insufficient(cfg.discretionary_min_candles);
    }

    let swings = find_swings(m5, cfg.discretionary_lookback, cfg.ltf_window);
    let trend = trend_from_swings(&swings);
    let momentum_bias = momentum_bias(m5);
    let breakout = breakout_and_retest(m5, &swings);

    let (demand_reaction, demand_strength) = zone_reaction(m5, zones.demand.as_ref());
    let (supply_reaction, supply_strength) = zone_reaction(m5, zones.supply.as_ref());
    let (zone_type, reaction, zone_strength) = if demand_reaction.is_some() {
        (ZoneType::Demand, demand_reaction, demand_strength)
    } else if supply_reaction.is_some() {
        (ZoneType::Supply, supply_reaction, supply_strength)
    } else {
        (ZoneType::None_, Reaction::None_, Strength::Weak)
    };

    let liquidity_event = liquidity_event(m5, pools);
    let liquidity_context = match (liquidity_event, trend) {
        (LiquidityEvent::HighSweep, Trend::Bearish) => LiquidityContext::Reversal,
        (LiquidityEvent::HighSweep, _) => LiquidityContext::Continuation,
        (LiquidityEvent::LowSweep, Trend::Bullish) => LiquidityContext::Reversal,
        (LiquidityEvent::LowSweep, _) => LiquidityContext::Continuation,
        (LiquidityEvent::None_, _) => LiquidityContext::Unclear,
    };

    let mut read = DiscretionaryRead {
        trend,
        momentum_bias,
        breakout: breakout.status,
        breakout_level: breakout.level,
        retest_found: breakout.retest_found,
        retest_quality: breakout.quality,
        zone_type,
        zone_strength,
        reaction,
        liquidity_event,
        liquidity_context,
        conclusion: String::new(),
    };
    read.conclusion = conclusion(&read);
    tracing::trace!("[DISCRETIONARY] {}", read.conclusion);
    read
}
