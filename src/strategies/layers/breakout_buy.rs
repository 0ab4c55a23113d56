//! BUY-only continuation after a bullish break, kept away from stretched
//! entries and overhead supply.

use crate::config::EngineConfig;
use crate::core::context::SharedContext;
use crate::models::{Action, DailyBias, MarketData, SweepKind, Trend};
use crate::strategies::layers::gates::{
    atr_request, common_gates, last_swing_levels, require, sanitize, standard_tags, GateBlock,
    ReactionRequirement,
};
use crate::strategies::layers::LayerKind;
use crate::strategies::signals::CandidateSignal;

const MIN_CANDLES: usize = 15;
const MIN_BODY_RATIO: f64 = 0.2;
const PREV_HIGH_CLEARANCE: f64 = 0.30;
const MAX_EXTENSION_ATR: f64 = 8.0;
const MIN_SUPPLY_ROOM_ATR: f64 = 0.5;
const CONFIDENCE: f64 = 72.0;

pub fn evaluate(ctx: &SharedContext, data: &MarketData, cfg: &EngineConfig) -> Result<CandidateSignal, GateBlock> {
    require(data.m5.len() >= MIN_CANDLES, GateBlock::InsufficientData)?;
    require(ctx.bias != DailyBias::SellOnly, GateBlock::Bias)?;
    let candles = data.m5.as_slice();
    let [.., prev, last] = candles else {
        return Err(GateBlock::InsufficientData);
    };
    let atr = ctx.atr.m5;
    let read = &ctx.discretionary;

    require(last.body_ratio() >= MIN_BODY_RATIO, GateBlock::Setup("weak_breakout_candle"))?;
    let broke = ctx.shifts.m5.supports(Action::Buy)
        || read.breakout.direction() == Trend::Bullish
        || last.close > prev.high + PREV_HIGH_CLEARANCE;
    require(broke, GateBlock::Setup("no_bullish_break"))?;
    require(
        read.momentum_bias.supports(Action::Buy) && read.trend == Trend::Bullish,
        GateBlock::Setup("no_bullish_momentum"),
    )?;
    require(ctx.sweeps.m5.kind != SweepKind::Above, GateBlock::StopHunt)?;

    let (_, swing_low) = last_swing_levels(candles, 80, 2);
    require(
        swing_low.map_or(true, |low| last.close - low <= atr * MAX_EXTENSION_ATR),
        GateBlock::Setup("overextended"),
    )?;
    // Supply already cleared does not cap the move.
    let capped = ctx
        .zones
        .supply
        .is_some_and(|z| last.close < z.high && z.low - last.close < atr * MIN_SUPPLY_ROOM_ATR);
    require(!capped, GateBlock::Setup("supply_too_close"))?;

    let confidence = common_gates(
        ctx,
        LayerKind::BreakoutBuy,
        Action::Buy,
        ReactionRequirement::Structural,
        CONFIDENCE,
        cfg,
    )?;
    let levels = sanitize(ctx, &atr_request(ctx, Action::Buy, 1.8, 0.0, [1.2, 2.0, 3.0]), cfg)?;
    let mut tags = standard_tags(ctx, Action::Buy);
    tags.poi = Some("breakout".to_string());
    Ok(CandidateSignal::trade(
        LayerKind::BreakoutBuy,
        Action::Buy,
        levels,
        confidence,
        confidence,
        "momentum_breakout_buy",
    )
    .with_tags(tags))
}
