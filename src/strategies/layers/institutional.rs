//! Smart-money vote: six independent confluences per side, the side with at
//! least three and more than the other wins.

use std::collections::BTreeMap;

use crate::config::EngineConfig;
use crate::core::context::SharedContext;
use crate::models::{Action, PremiumDiscount, Trend};
use crate::strategies::layers::gates::{
    common_gates, sanitize, standard_tags, structural_request, GateBlock, ReactionRequirement,
};
use crate::strategies::layers::scalp::tf_trend;
use crate::strategies::layers::LayerKind;
use crate::strategies::signals::CandidateSignal;

const MIN_VOTES: usize = 3;
const CONFIDENCE_CAP: f64 = 85.0;

const WEIGHTS: [(&str, f64); 6] = [
    ("structure", 25.0),
    ("liquidity", 20.0),
    ("zones", 20.0),
    ("momentum", 15.0),
    ("channels", 10.0),
    ("htf_context", 10.0),
];

/// One flag per entry of [`WEIGHTS`], in the same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Votes([bool; 6]);

impl Votes {
    fn count(&self) -> usize {
        self.0.iter().filter(|v| **v).count()
    }

    fn score(&self) -> (f64, BTreeMap<String, f64>) {
        let breakdown: BTreeMap<String, f64> = WEIGHTS
            .iter()
            .zip(self.0.iter())
            .map(|((k, w), hit)| (k.to_string(), if *hit { *w } else { 0.0 }))
            .collect();
        let total = breakdown.values().sum();
        (total, breakdown)
    }
}

fn votes_for(ctx: &SharedContext, action: Action, cfg: &EngineConfig) -> Votes {
    let trend = action.trend();
    let structure = ctx.shift_supports(action) || ctx.ltf.m15.bias == trend;
    // Buying in premium or selling in discount loses the structure vote.
    let structure = structure
        && !matches!(
            (action, ctx.premium_discount),
            (Action::Buy, PremiumDiscount::Premium) | (Action::Sell, PremiumDiscount::Discount)
        );
    let htf = tf_trend(&ctx.h4, ctx.ema.h4) == trend || tf_trend(&ctx.h1, ctx.ema.h1) == trend;
    Votes([
        structure,
        ctx.sweep_confirms(action),
        ctx.zones
            .for_action(action)
            .is_some_and(|z| z.confidence >= cfg.gates.zone_confidence_min),
        ctx.momentum.confidence.is_tradeable() && !ctx.momentum.fast_blocked(),
        ctx.channel.is_some_and(|c| c.tap.supports(action)),
        htf && trend != Trend::Neutral,
    ])
}

pub fn evaluate(ctx: &SharedContext, cfg: &EngineConfig) -> Result<CandidateSignal, GateBlock> {
    let bull = votes_for(ctx, Action::Buy, cfg);
    let bear = votes_for(ctx, Action::Sell, cfg);
    let (action, votes) = if bull.count() >= MIN_VOTES && bull.count() > bear.count() {
        (Action::Buy, bull)
    } else if bear.count() >= MIN_VOTES && bear.count() > bull.count() {
        (Action::Sell, bear)
    } else {
        return Err(GateBlock::Setup("no_layer_majority"));
    };

    let (score, breakdown) = votes.score();
    let confidence = common_gates(
        ctx,
        LayerKind::Institutional,
        action,
        ReactionRequirement::Zone,
        score.min(CONFIDENCE_CAP),
        cfg,
    )?;
    let levels = sanitize(ctx, &structural_request(ctx, action), cfg)?;
    let reason = format!(
        "Institutional {}: {} of 6 layers (score {:.0})",
        action,
        votes.count(),
        score
    );
    Ok(
        CandidateSignal::trade(LayerKind::Institutional, action, levels, score, confidence, reason)
            .with_tags(standard_tags(ctx, action))
            .with_breakdown(breakdown),
    )
}
