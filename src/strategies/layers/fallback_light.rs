//! Last resort: price inside the zone for the action and the last 5m candle
//! closing the right colour.

use crate::config::EngineConfig;
use crate::core::context::SharedContext;
use crate::models::{Action, MarketData};
use crate::strategies::layers::gates::{
    atr_request, common_gates, sanitize, standard_tags, GateBlock, ReactionRequirement,
};
use crate::strategies::layers::LayerKind;
use crate::strategies::signals::CandidateSignal;

const CONFIDENCE: f64 = 45.0;
const MIN_STOP: f64 = 10.0;

pub fn evaluate(ctx: &SharedContext, data: &MarketData, cfg: &EngineConfig) -> Result<CandidateSignal, GateBlock> {
    let last = data.m5.last().ok_or(GateBlock::InsufficientData)?;
    let in_zone = |action: Action| ctx.zones.for_action(action).is_some_and(|z| z.contains(ctx.price));

    let action = if in_zone(Action::Buy) && last.is_bullish() && !ctx.bias.contradicts(Action::Buy) {
        Action::Buy
    } else if in_zone(Action::Sell) && last.is_bearish() && !ctx.bias.contradicts(Action::Sell) && !ctx.breakout_hh {
        Action::Sell
    } else {
        return Err(GateBlock::Setup("no_fallback_setup"));
    };

    let confidence = common_gates(
        ctx,
        LayerKind::FallbackLight,
        action,
        ReactionRequirement::Zone,
        CONFIDENCE,
        cfg,
    )?;
    let levels = sanitize(ctx, &atr_request(ctx, action, 2.5, MIN_STOP, [1.0, 1.6, 2.2]), cfg)?;
    let mut tags = standard_tags(ctx, action);
    tags.poi = Some(if action == Action::Buy { "bull" } else { "bear" }.to_string());
    Ok(
        CandidateSignal::trade(LayerKind::FallbackLight, action, levels, confidence, confidence, "fallback_light_mode")
            .with_tags(tags),
    )
}
