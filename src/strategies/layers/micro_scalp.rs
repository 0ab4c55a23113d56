//! 5m execution in the direction of the daily bias: POI touch, one
//! confirmation (sweep or wick) and a structure shift.

use crate::config::EngineConfig;
use crate::core::context::SharedContext;
use crate::models::Action;
use crate::strategies::layers::gates::{
    atr_request, common_gates, require, sanitize, standard_tags, GateBlock, ReactionRequirement,
};
use crate::strategies::layers::LayerKind;
use crate::strategies::signals::CandidateSignal;

const SWEEP_CONFIDENCE: f64 = 65.0;
const BASE_CONFIDENCE: f64 = 60.0;
const MIN_STOP: f64 = 10.0;

pub fn evaluate(ctx: &SharedContext, cfg: &EngineConfig) -> Result<CandidateSignal, GateBlock> {
    let action = ctx.bias.preferred().ok_or(GateBlock::Setup("no_daily_bias"))?;
    require(
        !(action == Action::Sell && ctx.breakout_hh),
        GateBlock::Setup("blocked_breakout_up"),
    )?;
    require(ctx.poi.supports(action), GateBlock::NoReaction)?;

    let swept = ctx.sweep_confirms(action);
    require(
        swept || ctx.wicks.m5.supports(action),
        GateBlock::Setup("no_sweep_or_wick"),
    )?;
    require(ctx.shift_supports(action), GateBlock::Setup("no_structure_shift"))?;

    let confidence = if swept { SWEEP_CONFIDENCE } else { BASE_CONFIDENCE };
    let confidence = common_gates(
        ctx,
        LayerKind::MicroScalp,
        action,
        ReactionRequirement::Zone,
        confidence,
        cfg,
    )?;
    let req = atr_request(ctx, action, 2.5, MIN_STOP, [1.0, 1.6, 2.2]);
    let levels = sanitize(ctx, &req, cfg)?;

    let reason = format!(
        "Micro scalp {} with {} bias: POI + {} + structure shift",
        action,
        ctx.bias,
        if swept { "sweep" } else { "wick" }
    );
    Ok(
        CandidateSignal::trade(LayerKind::MicroScalp, action, levels, confidence, confidence, reason)
            .with_tags(standard_tags(ctx, action)),
    )
}
