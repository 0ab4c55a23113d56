//! Breakout-candle continuation read on 5m.

use crate::config::EngineConfig;
use crate::core::context::SharedContext;
use crate::core::discretionary::MomentumBias;
use crate::core::structure::{find_swings, Swings};
use crate::core::zones::PriceBand;
use crate::models::{Action, Candle, DailyBias, MarketData};
use crate::strategies::layers::gates::{
    atr_request, common_gates, require, sanitize, standard_tags, GateBlock, ReactionRequirement,
};
use crate::strategies::layers::LayerKind;
use crate::strategies::signals::CandidateSignal;

const MIN_CANDLES: usize = 30;
const SWING_LOOKBACK: usize = 120;
const SWING_WINDOW: usize = 2;
const MIN_BODY_RATIO: f64 = 0.6;
const MAX_CLOSE_OFFSET: f64 = 0.3;
const ZONE_BUFFER_ATR: f64 = 0.2;
const MICRO_ZONE_PCT: f64 = 0.002;
const CONFIDENCE: f64 = 55.0;

/// Candle pattern on the last 5m bar, reported alongside a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    LiquidityGrabReversal,
    BounceFromDemand,
    RejectionFromSupply,
    ExhaustionTop,
    MicroPullbackContinuation,
    RangeCompression,
    None_,
}

impl Pattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pattern::LiquidityGrabReversal => "liquidity_grab_reversal",
            Pattern::BounceFromDemand => "bounce_from_demand",
            Pattern::RejectionFromSupply => "rejection_from_supply",
            Pattern::ExhaustionTop => "exhaustion_top",
            Pattern::MicroPullbackContinuation => "micro_pullback_continuation",
            Pattern::RangeCompression => "range_compression",
            Pattern::None_ => "none",
        }
    }
}

/// Three strictly rising (or falling) closes.
pub(super) fn closes_trend(candles: &[Candle]) -> Option<Action> {
    match candles {
        [.., a, b, c] if a.close < b.close && b.close < c.close => Some(Action::Buy),
        [.., a, b, c] if a.close > b.close && b.close > c.close => Some(Action::Sell),
        _ => None,
    }
}

pub fn detect_pattern(candles: &[Candle], swings: &Swings) -> Pattern {
    let Some(last) = candles.last() else {
        return Pattern::None_;
    };
    let body = last.body();
    let range = last.total_range().max(1e-8);
    let high = swings.last_high().map(|s| s.price);
    let low = swings.last_low().map(|s| s.price);

    let grabbed_high = high.is_some_and(|h| last.high > h && last.close < h);
    let grabbed_low = low.is_some_and(|l| last.low < l && last.close > l);
    if grabbed_high || grabbed_low {
        return Pattern::LiquidityGrabReversal;
    }
    let in_demand = low.is_some_and(|l| PriceBand::around(l, MICRO_ZONE_PCT).contains(last.close));
    if in_demand && last.lower_wick() > body * 1.5 {
        return Pattern::BounceFromDemand;
    }
    let in_supply = high.is_some_and(|h| PriceBand::around(h, MICRO_ZONE_PCT).contains(last.close));
    if in_supply && last.upper_wick() > body * 1.5 {
        return Pattern::RejectionFromSupply;
    }
    let compressed = body / range < 0.25;
    if compressed && last.upper_wick() > body * 2.0 && last.is_bullish() {
        return Pattern::ExhaustionTop;
    }
    if closes_trend(candles).is_some() {
        return Pattern::MicroPullbackContinuation;
    }
    if compressed {
        return Pattern::RangeCompression;
    }
    Pattern::None_
}

fn buy_setup(ctx: &SharedContext, last: &Candle, swing_high: Option<f64>, atr: f64) -> bool {
    let momentum = matches!(
        ctx.discretionary.momentum_bias,
        MomentumBias::BuildingBullish | MomentumBias::StrongBullish
    );
    let breakout = swing_high.is_some_and(|h| last.close > h)
        && last.body_ratio() >= MIN_BODY_RATIO
        && momentum
        && last.upper_wick() <= last.body()
        && last.high - last.close <= last.total_range() * MAX_CLOSE_OFFSET
        && ctx.bias != DailyBias::SellOnly
        && ctx.breakout_hh;
    // Running into a supply zone price has not yet cleared.
    let supply_block = ctx
        .zones
        .supply
        .is_some_and(|z| last.close >= z.low - atr * ZONE_BUFFER_ATR && last.close < z.high);
    breakout && !supply_block
}

fn sell_setup(ctx: &SharedContext, last: &Candle, swing_low: Option<f64>, atr: f64) -> bool {
    let momentum = matches!(
        ctx.discretionary.momentum_bias,
        MomentumBias::BuildingBearish | MomentumBias::StrongBearish
    );
    let breakdown = swing_low.is_some_and(|l| last.close < l)
        && last.body_ratio() >= MIN_BODY_RATIO
        && momentum
        && last.lower_wick() <= last.body()
        && last.close - last.low <= last.total_range() * MAX_CLOSE_OFFSET
        && ctx.bias != DailyBias::BuyOnly;
    let demand_block = ctx
        .zones
        .demand
        .is_some_and(|z| last.close <= z.high + atr * ZONE_BUFFER_ATR && last.close > z.low);
    breakdown && !demand_block
}

pub fn evaluate(ctx: &SharedContext, data: &MarketData, cfg: &EngineConfig) -> Result<CandidateSignal, GateBlock> {
    require(data.m5.len() >= MIN_CANDLES, GateBlock::InsufficientData)?;
    let candles = data.m5.as_slice();
    let last = data.m5.last().ok_or(GateBlock::InsufficientData)?;
    let swings = find_swings(candles, SWING_LOOKBACK, SWING_WINDOW);
    let atr = ctx.atr.m5;

    let high = swings.last_high().map(|s| s.price);
    let low = swings.last_low().map(|s| s.price);
    let action = if buy_setup(ctx, last, high, atr) {
        Action::Buy
    } else if sell_setup(ctx, last, low, atr) {
        Action::Sell
    } else {
        return Err(GateBlock::Setup("no_price_action_breakout"));
    };

    let confidence = common_gates(
        ctx,
        LayerKind::PriceAction,
        action,
        ReactionRequirement::Structural,
        CONFIDENCE,
        cfg,
    )?;
    let levels = sanitize(ctx, &atr_request(ctx, action, 2.0, 0.0, [1.5, 2.5, 3.5]), cfg)?;

    let pattern = detect_pattern(candles, &swings);
    let mut tags = standard_tags(ctx, action);
    tags.poi = Some("price_action".to_string());
    Ok(
        CandidateSignal::trade(LayerKind::PriceAction, action, levels, confidence, confidence, "price_action")
            .with_tags(tags)
            .note(format!("pattern: {}", pattern.as_str()))
            .note(format!("momentum: {}", ctx.discretionary.momentum_bias)),
    )
}
