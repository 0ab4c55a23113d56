//! Picks one trade from the layer candidates.
//!
//! Pipeline: drop NO_TRADE and bias contradictions, apply hard vetoes, soften
//! under a neutral bias, rank, fall back through the layer chain when nothing
//! clears the confidence bar, validate geometry, then ask the duplicate guard.

use std::cmp::Ordering;

use crate::config::EngineConfig;
use crate::core::context::SharedContext;
use crate::core::levels::validate_or_rederive;
use crate::models::Action;
use crate::strategies::duplicate_guard::{DuplicateGuard, GuardProbe};
use crate::strategies::signals::{CandidateSignal, Decision, ScoreBreakdown};

const NEUTRAL_SOFT_NOTE: &str = "bias_neutral_soft";

/// Hard vetoes. None of them can be relaxed by momentum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Veto {
    /// 15m BOS/CHOCH against the action with no wick or sweep offsetting it.
    HtfShift,
    /// 15m and 5m labels both against the action with no shift or wick.
    LtfStructureConflict,
    /// Price inside a very-high-confidence opposing zone.
    OpposingZone,
}

impl Veto {
    pub fn as_str(&self) -> &'static str {
        match self {
            Veto::HtfShift => "htf_shift_against",
            Veto::LtfStructureConflict => "ltf_structure_conflict",
            Veto::OpposingZone => "opposing_zone",
        }
    }
}

/// Both fast timeframes labelled against `action` and nothing on them
/// arguing for it.
pub fn ltf_conflict(ctx: &SharedContext, action: Action) -> bool {
    ctx.ltf_opposes(action) && !ctx.shift_supports(action) && !ctx.wick_supports(action)
}

pub fn veto(ctx: &SharedContext, action: Action, cfg: &EngineConfig) -> Option<Veto> {
    if ctx.shifts.m15.opposes(action) && !ctx.wick_supports(action) && !ctx.sweep_confirms(action) {
        return Some(Veto::HtfShift);
    }
    if ltf_conflict(ctx, action) {
        return Some(Veto::LtfStructureConflict);
    }
    let trapped = ctx
        .zones
        .opposing(action)
        .is_some_and(|z| z.contains(ctx.price) && z.confidence >= cfg.gates.opposing_zone_veto);
    if trapped {
        return Some(Veto::OpposingZone);
    }
    None
}

/// Rank score for one candidate; `priority` is set for strict layers whose
/// total clears the priority bar.
pub fn rank_score(candidate: &CandidateSignal, ctx: &SharedContext, cfg: &EngineConfig) -> ScoreBreakdown {
    let c = &cfg.consolidator;
    let layer_weight = c.weight(candidate.layer);
    let tag_bonus = c.tag_bonus * candidate.tags.confluence_count() as f64;
    let momentum_bonus = if candidate.tags.has_strong_momentum() {
        c.momentum_bonus
    } else {
        0.0
    };
    let confidence_bonus = (candidate.confidence / c.confidence_scale).min(c.confidence_bonus_cap);
    let breakout_penalty = if candidate.action == Action::Sell && ctx.breakout_hh {
        c.breakout_sell_penalty
    } else {
        0.0
    };
    let total = layer_weight + tag_bonus + momentum_bonus + confidence_bonus - breakout_penalty;
    ScoreBreakdown {
        layer_weight,
        tag_bonus,
        momentum_bonus,
        confidence_bonus,
        breakout_penalty,
        total,
        priority: candidate.layer.is_strict() && total >= c.priority_bar,
    }
}

#[derive(Debug, Clone)]
pub struct Ranked {
    pub candidate: CandidateSignal,
    pub breakdown: ScoreBreakdown,
    pub softened: bool,
}

/// `(priority, score, confidence, risk_reward)` descending.
fn by_rank(a: &Ranked, b: &Ranked) -> Ordering {
    b.breakdown
        .priority
        .cmp(&a.breakdown.priority)
        .then_with(|| b.breakdown.total.total_cmp(&a.breakdown.total))
        .then_with(|| b.candidate.confidence.total_cmp(&a.candidate.confidence))
        .then_with(|| b.candidate.risk_reward().total_cmp(&a.candidate.risk_reward()))
}

/// Stable sort, so equal tuples keep their layer order.
pub fn rank(mut ranked: Vec<Ranked>) -> Vec<Ranked> {
    ranked.sort_by(by_rank);
    ranked
}

/// Candidates that survive filtering, split into those above the confidence
/// bar and those held back for the fallback chain.
#[derive(Debug, Default)]
pub struct Pool {
    pub eligible: Vec<Ranked>,
    pub held_back: Vec<Ranked>,
    pub vetoed: Vec<(CandidateSignal, Veto)>,
}

pub fn build_pool(ctx: &SharedContext, candidates: &[CandidateSignal], cfg: &EngineConfig) -> Pool {
    let mut pool = Pool::default();
    for candidate in candidates.iter().filter(|c| c.is_trade()) {
        if ctx.bias.contradicts(candidate.action) {
            tracing::debug!("[CONSOLIDATE] {} dropped: bias_conflict", candidate.layer);
            continue;
        }
        if let Some(v) = veto(ctx, candidate.action, cfg) {
            tracing::debug!("[CONSOLIDATE] {} vetoed: {}", candidate.layer, v.as_str());
            pool.vetoed.push((candidate.clone(), v));
            continue;
        }

        let mut candidate = candidate.clone();
        let softened = ctx.bias.is_neutral();
        if softened {
            candidate.confidence *= cfg.consolidator.neutral_bias_factor;
            candidate.notes.push(NEUTRAL_SOFT_NOTE.to_string());
        }
        let breakdown = rank_score(&candidate, ctx, cfg);
        let ranked = Ranked {
            candidate,
            breakdown,
            softened,
        };
        if ranked.candidate.confidence < cfg.consolidator.min_confidence {
            pool.held_back.push(ranked);
        } else {
            pool.eligible.push(ranked);
        }
    }
    pool
}

/// Winner by rank, else the first held-back candidate in layer order.
fn select(pool: Pool) -> (Option<Ranked>, Vec<(CandidateSignal, Veto)>) {
    let Pool {
        eligible,
        held_back,
        vetoed,
    } = pool;
    if let Some(winner) = rank(eligible).into_iter().next() {
        return (Some(winner), vetoed);
    }
    let fallback = held_back.into_iter().min_by_key(|r| r.candidate.layer);
    if let Some(r) = &fallback {
        tracing::debug!("[CONSOLIDATE] fallback chain picked {}", r.candidate.layer);
    }
    (fallback, vetoed)
}

/// Why nothing traded.
fn diagnose(ctx: &SharedContext, vetoed: &[(CandidateSignal, Veto)]) -> &'static str {
    let conflicted = vetoed.iter().any(|(_, v)| *v == Veto::LtfStructureConflict)
        || ctx.bias.preferred().is_some_and(|a| ltf_conflict(ctx, a));
    if conflicted {
        "ltf_structure_conflict"
    } else if ctx.momentum.fast_blocked() {
        "low_volatility"
    } else {
        "no_trend_edge"
    }
}

/// Runs the whole selection. The guard is only touched when a valid trade
/// reaches it.
pub fn consolidate(
    ctx: &SharedContext,
    candidates: &[CandidateSignal],
    guard: &mut DuplicateGuard,
    cfg: &EngineConfig,
) -> Decision {
    let pool = build_pool(ctx, candidates, cfg);
    tracing::debug!(
        "[CONSOLIDATE] eligible={} held_back={} vetoed={}",
        pool.eligible.len(),
        pool.held_back.len(),
        pool.vetoed.len()
    );

    let (winner, vetoed) = select(pool);
    let Some(Ranked {
        candidate,
        breakdown,
        softened,
    }) = winner
    else {
        return Decision::no_trade(diagnose(ctx, &vetoed));
    };

    let Some(levels) = candidate.levels() else {
        return Decision::no_trade("invalid_geometry:missing_levels");
    };
    let levels = match validate_or_rederive(&levels, candidate.action, ctx.atr.m5, &cfg.validation) {
        Ok((levels, rederived)) => {
            if rederived {
                tracing::warn!(
                    "[CONSOLIDATE] {} targets re-derived from risk",
                    candidate.layer
                );
            }
            levels
        }
        Err(check) => {
            tracing::warn!("[CONSOLIDATE] {} failed geometry: {}", candidate.layer, check);
            return Decision::no_trade(format!("invalid_geometry:{check}"));
        }
    };

    let probe = GuardProbe {
        action: candidate.action,
        price: levels.entry,
        timestamp: ctx.timestamp,
        tags: &candidate.tags,
        band: cfg.guard.band_for(candidate.layer),
    };
    if let Some(rule) = guard.should_block(&probe) {
        return Decision::no_trade(format!("duplicate_blocked:{rule}"));
    }

    let reason = if softened {
        format!("{}|{}", candidate.reason, NEUTRAL_SOFT_NOTE)
    } else {
        candidate.reason.clone()
    };
    Decision {
        action: candidate.action,
        levels: Some(levels),
        confidence: candidate.confidence,
        reason,
        layer: Some(candidate.layer),
        tags: candidate.tags,
        breakdown: Some(breakdown),
        layer_breakdown: candidate.breakdown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::levels::Levels;
    use crate::core::momentum::AdxTier;
    use crate::models::{DailyBias, StructureLabel, Trend};
    use crate::strategies::layers::gates::fixtures::{bullish_ctx, bullish_wick, labelled, momentum, shift};
    use crate::strategies::layers::LayerKind;
    use crate::strategies::signals::SignalTags;
    use crate::test_helpers::default_test_config;

    fn buy_levels() -> Levels {
        Levels {
            entry: 2650.0,
            sl: 2644.0,
            tp1: 2657.0,
            tp2: 2660.0,
            tp3: 2665.0,
        }
    }

    fn buy(layer: LayerKind, confidence: f64) -> CandidateSignal {
        CandidateSignal::trade(layer, Action::Buy, buy_levels(), confidence, confidence, layer.as_str())
    }

    #[test]
    fn strongest_candidate_wins() {
        let cfg = default_test_config();
        let ctx = bullish_ctx();
        let mut guard = DuplicateGuard::new();
        let candidates = vec![
            buy(LayerKind::FallbackLight, 60.0),
            CandidateSignal::no_trade(LayerKind::Scalp, "htf_not_aligned"),
            buy(LayerKind::Institutional, 80.0),
        ];
        let d = consolidate(&ctx, &candidates, &mut guard, &cfg);
        assert_eq!(d.action, Action::Buy);
        assert_eq!(d.layer, Some(LayerKind::Institutional));
        assert_eq!(d.levels, Some(buy_levels()));
    }

    #[test]
    fn priority_flag_needs_a_strict_layer_over_the_bar() {
        let cfg = default_test_config();
        let ctx = bullish_ctx();
        let tagged = buy(LayerKind::Institutional, 80.0).with_tags(SignalTags {
            structure: Some("s".into()),
            sweep: Some("below".into()),
            poi: Some("bull".into()),
            momentum: Some("HIGH".into()),
        });
        let b = rank_score(&tagged, &ctx, &cfg);
        // 1.0 + 0.6 + 0.1 + 80/150
        assert!((b.total - (1.7 + 80.0 / 150.0)).abs() < 1e-9);
        assert!(b.priority);
        let loose = rank_score(&buy(LayerKind::Ultra, 80.0), &ctx, &cfg);
        assert!(!loose.priority);
    }

    #[test]
    fn identical_tuples_keep_layer_order() {
        let make = |layer| {
            let candidate = buy(layer, 70.0);
            let breakdown = ScoreBreakdown {
                total: 1.0,
                ..ScoreBreakdown::default()
            };
            Ranked {
                candidate,
                breakdown,
                softened: false,
            }
        };
        for _ in 0..10 {
            let ranked = rank(vec![make(LayerKind::Scalp), make(LayerKind::Ultra)]);
            assert_eq!(ranked[0].candidate.layer, LayerKind::Scalp);
        }
    }

    #[test]
    fn neutral_bias_softens_and_tags_reason() {
        let cfg = default_test_config();
        let mut ctx = bullish_ctx();
        ctx.bias = DailyBias::Neutral;
        let mut guard = DuplicateGuard::new();
        let d = consolidate(&ctx, &[buy(LayerKind::MicroScalp, 80.0)], &mut guard, &cfg);
        assert!((d.confidence - 56.0).abs() < 1e-9);
        assert!(d.reason.ends_with("|bias_neutral_soft"));
    }

    #[test]
    fn held_back_candidates_feed_the_fallback_chain() {
        let cfg = default_test_config();
        let ctx = bullish_ctx();
        let mut guard = DuplicateGuard::new();
        let d = consolidate(
            &ctx,
            &[buy(LayerKind::FallbackLight, 45.0), buy(LayerKind::UltraLight, 40.0)],
            &mut guard,
            &cfg,
        );
        assert_eq!(d.layer, Some(LayerKind::UltraLight));
    }

    #[test]
    fn ltf_conflict_vetoes_and_is_reported() {
        let cfg = default_test_config();
        let mut ctx = bullish_ctx();
        ctx.ltf.m15 = labelled(StructureLabel::LhLl);
        ctx.ltf.m5 = labelled(StructureLabel::LhLl);
        ctx.shifts.m15 = Default::default();
        let mut guard = DuplicateGuard::new();
        let d = consolidate(&ctx, &[buy(LayerKind::Scalp, 80.0)], &mut guard, &cfg);
        assert_eq!(d.action, Action::NoTrade);
        assert_eq!(d.reason, "ltf_structure_conflict");
    }

    #[test]
    fn opposing_htf_shift_needs_an_offset() {
        let cfg = default_test_config();
        let mut ctx = bullish_ctx();
        ctx.shifts.m15 = shift(Trend::Bearish);
        assert_eq!(veto(&ctx, Action::Buy, &cfg), None, "the 15m sweep below offsets it");
        ctx.sweeps.m15 = Default::default();
        assert_eq!(veto(&ctx, Action::Buy, &cfg), Some(Veto::HtfShift));
        ctx.wicks = bullish_wick();
        assert_eq!(veto(&ctx, Action::Buy, &cfg), None);
    }

    #[test]
    fn empty_pool_reports_low_volatility() {
        let cfg = default_test_config();
        let mut ctx = bullish_ctx();
        ctx.bias = DailyBias::Neutral;
        ctx.momentum = momentum(AdxTier::Blocked);
        let mut guard = DuplicateGuard::new();
        let d = consolidate(&ctx, &[], &mut guard, &cfg);
        assert_eq!(d.reason, "low_volatility");
        ctx.momentum = momentum(AdxTier::High);
        assert_eq!(consolidate(&ctx, &[], &mut guard, &cfg).reason, "no_trend_edge");
    }

    #[test]
    fn bad_geometry_is_rederived_or_refused() {
        let cfg = default_test_config();
        let ctx = bullish_ctx();
        let mut guard = DuplicateGuard::new();
        let mut cramped = buy(LayerKind::Scalp, 80.0);
        cramped.tp2 = Some(2657.2);
        let d = consolidate(&ctx, &[cramped], &mut guard, &cfg);
        let levels = d.levels.unwrap();
        assert!(levels.is_ordered(Action::Buy));
        assert!((levels.tp1 - 2656.0).abs() < 1e-9);

        let mut wide = buy(LayerKind::Scalp, 80.0);
        wide.sl = Some(2600.0);
        let d = consolidate(&ctx, &[wide], &mut DuplicateGuard::new(), &cfg);
        assert_eq!(d.reason, "invalid_geometry:stop_distance");
    }

    #[test]
    fn second_identical_trade_is_a_duplicate() {
        let cfg = default_test_config();
        let mut ctx = bullish_ctx();
        let mut guard = DuplicateGuard::new();
        let first = consolidate(&ctx, &[buy(LayerKind::Scalp, 80.0)], &mut guard, &cfg);
        assert_eq!(first.action, Action::Buy);
        ctx.timestamp += chrono::Duration::minutes(5);
        let second = consolidate(&ctx, &[buy(LayerKind::Scalp, 80.0)], &mut guard, &cfg);
        assert_eq!(second.action, Action::NoTrade);
        assert!(second.reason.starts_with("duplicate_blocked:"));
    }
}
