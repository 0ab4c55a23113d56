//! Acts on discretionary conviction alone: trend, a reaction at the matching
//! zone, and price still inside it.

use crate::config::EngineConfig;
use crate::core::context::SharedContext;
use crate::core::discretionary::ZoneType;
use crate::core::levels::LevelRequest;
use crate::models::{Action, DailyBias, Trend};
use crate::strategies::layers::gates::{common_gates, sanitize, standard_tags, GateBlock, ReactionRequirement};
use crate::strategies::layers::LayerKind;
use crate::strategies::signals::CandidateSignal;

const ALIGNED_CONFIDENCE: f64 = 55.0;
const BASE_CONFIDENCE: f64 = 40.0;

/// (ATR multiple, floor in price units) for the stop and each target.
const STOP: (f64, f64) = (1.8, 10.0);
const TARGETS: [(f64, f64); 3] = [(1.2, 8.0), (1.8, 12.0), (2.4, 16.0)];

fn qualifies(ctx: &SharedContext, action: Action) -> bool {
    let read = &ctx.discretionary;
    let zone = match action {
        Action::Buy => ZoneType::Demand,
        _ => ZoneType::Supply,
    };
    read.trend == action.trend()
        && read.zone_type == zone
        && read.reaction.is_some()
        && ctx.zones.for_action(action).is_some_and(|z| z.contains(ctx.price))
        && read.momentum_bias.direction() != Trend::Neutral
        && !ctx.bias.contradicts(action)
}

fn request(ctx: &SharedContext, action: Action) -> LevelRequest {
    let price = ctx.price;
    let sign = action.sign();
    let atr = ctx.atr.m5;
    let distance = |(mult, floor): (f64, f64)| (atr * mult).max(floor);
    TARGETS.iter().fold(
        LevelRequest::new(action, price).stop(Some(price - sign * distance(STOP))),
        |req, t| req.volatility_target(price + sign * distance(*t)),
    )
}

pub fn evaluate(ctx: &SharedContext, cfg: &EngineConfig) -> Result<CandidateSignal, GateBlock> {
    let action = [Action::Buy, Action::Sell]
        .into_iter()
        .find(|a| qualifies(ctx, *a))
        .ok_or(GateBlock::Setup("ultralight_filters_not_met"))?;

    let aligned = matches!(
        (action, ctx.bias),
        (Action::Buy, DailyBias::BuyOnly) | (Action::Sell, DailyBias::SellOnly)
    );
    let confidence = if aligned { ALIGNED_CONFIDENCE } else { BASE_CONFIDENCE };
    let confidence = common_gates(
        ctx,
        LayerKind::UltraLight,
        action,
        ReactionRequirement::Zone,
        confidence,
        cfg,
    )?;
    let levels = sanitize(ctx, &request(ctx, action), cfg)?;
    Ok(
        CandidateSignal::trade(LayerKind::UltraLight, action, levels, confidence, confidence, "ultralight_mode")
            .with_tags(standard_tags(ctx, action)),
    )
}
