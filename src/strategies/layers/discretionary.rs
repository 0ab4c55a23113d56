//! Trades the discretionary read: a zone reaction backed by trend or
//! momentum, or a breakout that has been retested.

use crate::config::EngineConfig;
use crate::core::context::SharedContext;
use crate::core::discretionary::{DiscretionaryRead, Strength, ZoneType};
use crate::models::Action;
use crate::strategies::layers::gates::{
    common_gates, sanitize, standard_tags, structural_request, GateBlock, ReactionRequirement,
};
use crate::strategies::layers::LayerKind;
use crate::strategies::signals::CandidateSignal;

const BASE_CONFIDENCE: f64 = 60.0;
const STRONG_CONFIDENCE: f64 = 70.0;

/// Setup found by the read, with whether it was strong.
fn setup(read: &DiscretionaryRead, action: Action) -> Option<(&'static str, bool)> {
    let trend = action.trend();
    let backed = read.trend == trend || read.momentum_bias.supports(action);
    if read.reacted_at(action) && backed {
        return Some(("zone_reaction", read.zone_strength == Strength::Strong));
    }
    if read.breakout.direction() == trend && read.retest_found {
        return Some(("breakout_retest", read.retest_quality == Strength::Strong));
    }
    None
}

pub fn evaluate(ctx: &SharedContext, cfg: &EngineConfig) -> Result<CandidateSignal, GateBlock> {
    let read = &ctx.discretionary;
    let (action, (kind, strong)) = [Action::Buy, Action::Sell]
        .into_iter()
        .find_map(|a| setup(read, a).map(|s| (a, s)))
        .ok_or(GateBlock::Setup("no_discretionary_setup"))?;

    let confidence = if strong { STRONG_CONFIDENCE } else { BASE_CONFIDENCE };
    let confidence = common_gates(
        ctx,
        LayerKind::Discretionary,
        action,
        ReactionRequirement::ZoneOrRetest,
        confidence,
        cfg,
    )?;
    let levels = sanitize(ctx, &structural_request(ctx, action), cfg)?;

    let mut tags = standard_tags(ctx, action);
    if read.zone_type != ZoneType::None_ {
        tags.poi = Some(read.zone_type.to_string());
    }
    let reason = format!("Discretionary {} on {}: {}", action, kind, read.conclusion);
    Ok(
        CandidateSignal::trade(LayerKind::Discretionary, action, levels, confidence, confidence, reason)
            .with_tags(tags),
    )
}
