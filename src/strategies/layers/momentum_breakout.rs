//! Full-bodied close through every nearby ceiling (or floor) with three
//! closes in a row behind it. No POI or sweep needed.

use crate::config::EngineConfig;
use crate::core::context::SharedContext;
use crate::models::{Action, Candle, MarketData};
use crate::strategies::layers::gates::{
    atr_request, common_gates, last_swing_levels, require, sanitize, standard_tags, GateBlock,
    ReactionRequirement,
};
use crate::strategies::layers::price_action::closes_trend;
use crate::strategies::layers::LayerKind;
use crate::strategies::signals::CandidateSignal;

const MIN_CANDLES: usize = 3;
const SWING_LOOKBACK: usize = 80;
const SWING_WINDOW: usize = 2;
const MIN_BODY_RATIO: f64 = 0.6;
const MAX_RETRACE: f64 = 0.3;
const CONFIDENCE: f64 = 55.0;

/// Highest of the swing high, pool high and channel top for BUY; lowest of
/// the floors for SELL.
fn breakout_level(ctx: &SharedContext, swing: Option<f64>, action: Action) -> Option<f64> {
    let candidates = match action {
        Action::Buy => [swing, ctx.pools.highest(), ctx.channel.map(|c| c.upper)],
        _ => [swing, ctx.pools.lowest(), ctx.channel.map(|c| c.lower)],
    };
    let levels = candidates.into_iter().flatten();
    match action {
        Action::Buy => levels.reduce(f64::max),
        _ => levels.reduce(f64::min),
    }
}

fn candle_qualifies(last: &Candle, action: Action) -> bool {
    let range = last.total_range();
    match action {
        Action::Buy => {
            last.upper_wick() <= last.body() && last.is_bullish() && last.high - last.close <= range * MAX_RETRACE
        }
        _ => last.lower_wick() <= last.body() && last.is_bearish() && last.close - last.low <= range * MAX_RETRACE,
    }
}

fn setup(ctx: &SharedContext, candles: &[Candle], action: Action) -> bool {
    let Some(last) = candles.last() else {
        return false;
    };
    let (high, low) = last_swing_levels(candles, SWING_LOOKBACK, SWING_WINDOW);
    let swing = if action == Action::Buy { high } else { low };
    let Some(level) = breakout_level(ctx, swing, action) else {
        return false;
    };
    let through = action.sign() * (last.close - level) > 0.0;
    let read = &ctx.discretionary;
    through
        && last.body_ratio() >= MIN_BODY_RATIO
        && closes_trend(candles) == Some(action)
        && candle_qualifies(last, action)
        && read.momentum_bias.supports(action)
        && !read.strong_counter_rejection(action)
        && read.breakout.direction() != action.trend().opposite()
}

pub fn evaluate(ctx: &SharedContext, data: &MarketData, cfg: &EngineConfig) -> Result<CandidateSignal, GateBlock> {
    require(data.m5.len() >= MIN_CANDLES, GateBlock::InsufficientData)?;
    let candles = data.m5.as_slice();
    require(
        data.m5.last().is_some_and(|c| c.total_range() > 0.0),
        GateBlock::Setup("no_range"),
    )?;

    let action = if setup(ctx, candles, Action::Buy) {
        Action::Buy
    } else if !ctx.breakout_hh && setup(ctx, candles, Action::Sell) {
        Action::Sell
    } else {
        return Err(GateBlock::Setup("momentum_breakout_not_met"));
    };

    let confidence = common_gates(
        ctx,
        LayerKind::MomentumBreakout,
        action,
        ReactionRequirement::Structural,
        CONFIDENCE,
        cfg,
    )?;
    let levels = sanitize(ctx, &atr_request(ctx, action, 2.0, 0.0, [1.5, 2.5, 3.5]), cfg)?;
    let mut tags = standard_tags(ctx, action);
    tags.poi = Some(ctx.discretionary.zone_type.to_string());
    Ok(
        CandidateSignal::trade(LayerKind::MomentumBreakout, action, levels, confidence, confidence, "momentum_breakout")
            .with_tags(tags)
            .note("high-momentum continuation entry"),
    )
}
