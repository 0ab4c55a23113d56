//! Fixed scoring matrix shared by the scalp and ultra layers.

use std::collections::BTreeMap;

use crate::config::EngineConfig;
use crate::core::context::SharedContext;
use crate::core::momentum::AdxConfidence;
use crate::core::structure::StructureState;
use crate::models::{Action, MarketData, Trend};
use crate::strategies::layers::gates::{
    common_gates, require, sanitize, standard_tags, structural_request, GateBlock, ReactionRequirement,
};
use crate::strategies::layers::LayerKind;
use crate::strategies::signals::CandidateSignal;

pub(super) const HTF_POINTS: f64 = 40.0;
pub(super) const ZONE_POINTS: f64 = 25.0;
pub(super) const LIQUIDITY_POINTS: f64 = 20.0;
pub(super) const CHANNEL_POINTS: f64 = 15.0;
pub(super) const BOS_POINTS: f64 = 15.0;
pub(super) const WICK_POINTS: f64 = 10.0;
pub(super) const MOMENTUM_POINTS: f64 = 10.0;

/// Which confluences fired for a direction.
#[derive(Debug, Clone, Copy, Default)]
pub(super) struct Confluences {
    pub zones: bool,
    pub liquidity: bool,
    pub channels: bool,
    pub bos: bool,
    pub wick: bool,
    pub momentum: bool,
}

impl Confluences {
    /// Total score with the HTF alignment points, plus the per-item breakdown.
    pub fn score(&self) -> (f64, BTreeMap<String, f64>) {
        let items = [
            ("htf_alignment", true, HTF_POINTS),
            ("zones", self.zones, ZONE_POINTS),
            ("liquidity", self.liquidity, LIQUIDITY_POINTS),
            ("channels", self.channels, CHANNEL_POINTS),
            ("bos", self.bos, BOS_POINTS),
            ("wick", self.wick, WICK_POINTS),
            ("momentum", self.momentum, MOMENTUM_POINTS),
        ];
        let breakdown: BTreeMap<String, f64> = items
            .iter()
            .map(|(k, hit, pts)| (k.to_string(), if *hit { *pts } else { 0.0 }))
            .collect();
        let total = breakdown.values().sum();
        (total, breakdown)
    }
}

/// Structure label when it has one, otherwise the EMA stack.
pub(super) fn tf_trend(state: &StructureState, ema: Option<Trend>) -> Trend {
    match state.label.trend() {
        Trend::Neutral => ema.unwrap_or(Trend::Neutral),
        t => t,
    }
}

/// BUY when 4h and 1h both read bullish, SELL when both bearish.
pub(super) fn htf_direction(ctx: &SharedContext) -> Result<Action, GateBlock> {
    let h4 = tf_trend(&ctx.h4, ctx.ema.h4);
    let h1 = tf_trend(&ctx.h1, ctx.ema.h1);
    match (h4, h1) {
        (Trend::Bullish, Trend::Bullish) => Ok(Action::Buy),
        (Trend::Bearish, Trend::Bearish) => Ok(Action::Sell),
        _ => Err(GateBlock::Setup("htf_not_aligned")),
    }
}

/// 15m may be neutral but never point against the HTF direction.
pub(super) fn m15_confirms(ctx: &SharedContext, action: Action) -> Result<(), GateBlock> {
    let m15 = tf_trend(&ctx.ltf.m15, ctx.ema.m15);
    require(m15 != action.trend().opposite(), GateBlock::Setup("15m_contradicts_htf"))
}

pub(super) fn zone_ok(ctx: &SharedContext, action: Action, cfg: &EngineConfig) -> bool {
    ctx.zones
        .for_action(action)
        .is_some_and(|z| z.confidence >= cfg.gates.zone_confidence_min)
}

pub(super) fn channel_ok(ctx: &SharedContext, action: Action) -> bool {
    ctx.channel_m5.is_some_and(|c| c.tap.supports(action))
}

/// Turns a passing score into a candidate: gates, structural levels, tags.
pub(super) fn finish(
    ctx: &SharedContext,
    kind: LayerKind,
    action: Action,
    score: f64,
    breakdown: BTreeMap<String, f64>,
    conf_cap: f64,
    cfg: &EngineConfig,
) -> Result<CandidateSignal, GateBlock> {
    let confidence = score.clamp(60.0, conf_cap);
    let confidence = common_gates(ctx, kind, action, ReactionRequirement::ZoneOrRetest, confidence, cfg)?;
    let levels = sanitize(ctx, &structural_request(ctx, action), cfg)?;
    let reason = format!("{} {} matrix score {:.0}", kind, action, score);
    Ok(CandidateSignal::trade(kind, action, levels, score, confidence, reason)
        .with_tags(standard_tags(ctx, action))
        .with_breakdown(breakdown))
}

pub fn evaluate(ctx: &SharedContext, _data: &MarketData, cfg: &EngineConfig) -> Result<CandidateSignal, GateBlock> {
    let action = htf_direction(ctx)?;
    m15_confirms(ctx, action)?;

    let hits = Confluences {
        zones: zone_ok(ctx, action, cfg),
        liquidity: ctx.sweeps.m5.kind.confirms(action),
        channels: channel_ok(ctx, action),
        bos: ctx.shift_supports(action),
        wick: ctx.wicks.m5.supports(action),
        momentum: ctx.momentum.confidence != AdxConfidence::Blocked,
    };
    let (score, breakdown) = hits.score();
    require(score >= 60.0, GateBlock::Setup("score_below_threshold"))?;
    finish(ctx, LayerKind::Scalp, action, score, breakdown, 85.0, cfg)
}
