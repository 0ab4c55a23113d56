//! Relaxed price-action read for quiet sessions where the stricter layers stay
//! flat. BUY is off unless `light_pa_buy_enabled` is set.

use crate::config::EngineConfig;
use crate::core::context::SharedContext;
use crate::core::discretionary::MomentumBias;
use crate::models::{Action, Candle, MarketData};
use crate::strategies::layers::gates::{
    atr_request, common_gates, last_swing_levels, require, sanitize, standard_tags, GateBlock,
    ReactionRequirement,
};
use crate::strategies::layers::LayerKind;
use crate::strategies::signals::CandidateSignal;

const MIN_CANDLES: usize = 20;
const SWING_LOOKBACK: usize = 100;
const MIN_BODY_RATIO: f64 = 0.35;
const MAX_ABSORB_WICK: f64 = 1.6;
const MAX_PULLBACK: f64 = 0.45;
const CONFIDENCE: f64 = 52.0;

/// Body, wick and close placement shared by both sides.
fn candle_ok(last: &Candle, action: Action) -> bool {
    let range = last.total_range();
    let body = last.body();
    let (counter_wick, pullback) = match action {
        Action::Buy => (last.upper_wick(), last.high - last.close),
        _ => (last.lower_wick(), last.close - last.low),
    };
    range > 0.0
        && last.body_ratio() >= MIN_BODY_RATIO
        && counter_wick <= body * MAX_ABSORB_WICK
        && pullback <= range * MAX_PULLBACK
}

/// 5m shift, a close through the last swing, or momentum leaning the way of
/// the trade.
fn leaning(ctx: &SharedContext, last: &Candle, swing: Option<f64>, action: Action) -> bool {
    let through = swing.is_some_and(|s| action.sign() * (last.close - s) > 0.0);
    ctx.shifts.m5.supports(action) || through || ctx.discretionary.momentum_bias.supports(action)
}

fn setup(ctx: &SharedContext, candles: &[Candle], action: Action) -> bool {
    let Some(last) = candles.last() else {
        return false;
    };
    let (high, low) = last_swing_levels(candles, SWING_LOOKBACK, 2);
    let swing = if action == Action::Buy { high } else { low };
    let momentum = ctx.discretionary.momentum_bias;
    let breakout_ok = action != Action::Sell || !ctx.breakout_hh || momentum == MomentumBias::StrongBearish;
    !ctx.bias.contradicts(action)
        && leaning(ctx, last, swing, action)
        && !momentum.opposes(action)
        && candle_ok(last, action)
        && breakout_ok
}

pub fn evaluate(ctx: &SharedContext, data: &MarketData, cfg: &EngineConfig) -> Result<CandidateSignal, GateBlock> {
    require(data.m5.len() >= MIN_CANDLES, GateBlock::InsufficientData)?;
    let candles = data.m5.as_slice();

    let action = if cfg.light_pa_buy_enabled && setup(ctx, candles, Action::Buy) {
        Action::Buy
    } else if setup(ctx, candles, Action::Sell) {
        Action::Sell
    } else {
        return Err(GateBlock::Setup("light_pa_no_setup"));
    };

    let confidence = common_gates(
        ctx,
        LayerKind::LightPriceAction,
        action,
        ReactionRequirement::Structural,
        CONFIDENCE,
        cfg,
    )?;
    let levels = sanitize(ctx, &atr_request(ctx, action, 1.8, 0.0, [1.2, 2.0, 3.0]), cfg)?;
    Ok(
        CandidateSignal::trade(LayerKind::LightPriceAction, action, levels, confidence, confidence, "light_price_action")
            .with_tags(standard_tags(ctx, action)),
    )
}
