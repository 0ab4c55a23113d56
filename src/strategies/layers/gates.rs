//! Gates shared by every layer, plus the two level templates layers build on.

use std::fmt;

use crate::config::EngineConfig;
use crate::core::context::SharedContext;
use crate::core::levels::{LevelRequest, LevelSanitizer, Levels};
use crate::core::structure::find_swings;
use crate::models::{Action, Candle};
use crate::strategies::layers::LayerKind;
use crate::strategies::signals::SignalTags;

/// Why a layer declined to propose a trade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateBlock {
    /// One-way daily bias points the other way.
    Bias,
    /// 1h labelled against the action and 15m does not support it.
    HtfConflict,
    LowMomentum,
    /// A fresh 5m sweep on the side the trade would run into.
    StopHunt,
    NoReaction,
    InvalidLevels,
    MissingField(&'static str),
    InsufficientData,
    /// The layer's own setup did not form.
    Setup(&'static str),
}

impl fmt::Display for GateBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateBlock::Bias => write!(f, "bias_conflict"),
            GateBlock::HtfConflict => write!(f, "htf_conflict"),
            GateBlock::LowMomentum => write!(f, "low_momentum"),
            GateBlock::StopHunt => write!(f, "stop_hunt_risk"),
            GateBlock::NoReaction => write!(f, "no_reaction"),
            GateBlock::InvalidLevels => write!(f, "invalid_levels"),
            GateBlock::MissingField(name) => write!(f, "missing_field:{name}"),
            GateBlock::InsufficientData => write!(f, "insufficient_data"),
            GateBlock::Setup(what) => write!(f, "{what}"),
        }
    }
}

pub fn require(cond: bool, block: GateBlock) -> Result<(), GateBlock> {
    if cond {
        Ok(())
    } else {
        Err(block)
    }
}

/// Rejects against a one-way bias, and against an opposing 1h label unless
/// 15m structure supports the action.
pub fn direction_gate(ctx: &SharedContext, action: Action) -> Result<(), GateBlock> {
    require(!ctx.bias.contradicts(action), GateBlock::Bias)?;
    let h1_against = ctx.h1.label.opposes(action);
    let m15_allows = ctx.ltf.m15.label.supports(action);
    require(!h1_against || m15_allows, GateBlock::HtfConflict)
}

/// Passes the confidence through, scaled down for relaxed layers trading
/// through a blocked 5m ADX.
pub fn momentum_gate(
    ctx: &SharedContext,
    kind: LayerKind,
    confidence: f64,
    cfg: &EngineConfig,
) -> Result<f64, GateBlock> {
    if !ctx.momentum.fast_blocked() {
        return Ok(confidence);
    }
    if kind.is_relaxed() {
        return Ok(confidence * cfg.gates.relaxed_confidence_factor);
    }
    Err(GateBlock::LowMomentum)
}

pub fn liquidity_gate(ctx: &SharedContext, action: Action) -> Result<(), GateBlock> {
    require(!ctx.sweeps.m5.kind.warns_against(action), GateBlock::StopHunt)
}

/// How a layer must be interacting with a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionRequirement {
    /// Price at a POI or a zone reaction on 5m.
    Zone,
    /// `Zone`, or a breakout in the action's direction that has been retested.
    ZoneOrRetest,
    /// `ZoneOrRetest`, or a fresh break of structure in the action's direction.
    Structural,
}

pub fn reaction_gate(
    ctx: &SharedContext,
    action: Action,
    requirement: ReactionRequirement,
    cfg: &EngineConfig,
) -> Result<(), GateBlock> {
    let d = &ctx.discretionary;
    let at_zone = ctx.zones.inside(action, ctx.price, cfg.gates.zone_confidence_min)
        || ctx.poi.supports(action)
        || d.reacted_at(action);
    let retested = d.breakout.direction() == action.trend() && d.retest_found;
    let broke = ctx.shift_supports(action) || d.breakout.direction() == action.trend();

    let ok = match requirement {
        ReactionRequirement::Zone => at_zone,
        ReactionRequirement::ZoneOrRetest => at_zone || retested,
        ReactionRequirement::Structural => at_zone || retested || broke,
    };
    require(ok, GateBlock::NoReaction)
}

/// Direction, liquidity and reaction gates in order, then the momentum gate.
/// Returns the possibly reduced confidence.
pub fn common_gates(
    ctx: &SharedContext,
    kind: LayerKind,
    action: Action,
    requirement: ReactionRequirement,
    confidence: f64,
    cfg: &EngineConfig,
) -> Result<f64, GateBlock> {
    direction_gate(ctx, action)?;
    liquidity_gate(ctx, action)?;
    reaction_gate(ctx, action, requirement, cfg)?;
    momentum_gate(ctx, kind, confidence, cfg)
}

pub fn sanitize(ctx: &SharedContext, req: &LevelRequest, cfg: &EngineConfig) -> Result<Levels, GateBlock> {
    LevelSanitizer::new(&cfg.levels)
        .sanitize(req, &ctx.atr)
        .ok_or(GateBlock::InvalidLevels)
}

/// Stop beyond the action's zone, swings and channel bound; targets at the
/// opposing zone, swing levels, pools and channel bound. ATR multiples fill
/// in when no structural target exists.
pub fn structural_request(ctx: &SharedContext, action: Action) -> LevelRequest {
    let price = ctx.price;
    let sign = action.sign();
    let channel = ctx.channel_m5.or(ctx.channel);

    let mut adverse: Vec<f64> = Vec::new();
    let mut targets: Vec<f64> = Vec::new();
    match action {
        Action::Buy => {
            adverse.extend(ctx.zones.demand.map(|z| z.low));
            adverse.extend(ctx.levels.lows_below(price));
            adverse.extend(channel.map(|c| c.lower));
            targets.extend(ctx.zones.supply.map(|z| z.high));
            targets.extend(ctx.levels.highs_above(price));
            targets.extend(ctx.pools.nearest_above(price));
            targets.extend(channel.map(|c| c.upper));
        }
        Action::Sell => {
            adverse.extend(ctx.zones.supply.map(|z| z.high));
            adverse.extend(ctx.levels.highs_above(price));
            adverse.extend(channel.map(|c| c.upper));
            targets.extend(ctx.zones.demand.map(|z| z.low));
            targets.extend(ctx.levels.lows_below(price));
            targets.extend(ctx.pools.nearest_below(price));
            targets.extend(channel.map(|c| c.lower));
        }
        Action::NoTrade => {}
    }
    adverse.retain(|l| sign * (price - l) > 0.0);
    targets.retain(|t| sign * (t - price) > 0.0);

    // Widest adverse level as the raw stop, nearest as the fallback anchor.
    let by_distance = |l: &f64| sign * (price - l);
    let widest = adverse.iter().copied().max_by(|a, b| by_distance(a).total_cmp(&by_distance(b)));
    let nearest = adverse.iter().copied().min_by(|a, b| by_distance(a).total_cmp(&by_distance(b)));

    let mut req = LevelRequest::new(action, price).stop(widest).adverse(nearest);
    if targets.is_empty() {
        let atr = ctx.atr.m5;
        req = req
            .volatility_target(price + sign * atr)
            .volatility_target(price + sign * atr * 1.5)
            .volatility_target(price + sign * atr * 2.5);
    } else {
        for t in targets {
            req = req.structural_target(Some(t));
        }
    }
    req
}

/// Stop at `stop_mult` ATR (at least `min_stop`), targets at ATR multiples.
pub fn atr_request(
    ctx: &SharedContext,
    action: Action,
    stop_mult: f64,
    min_stop: f64,
    target_mults: [f64; 3],
) -> LevelRequest {
    let price = ctx.price;
    let sign = action.sign();
    let atr = ctx.atr.m5;
    let stop_distance = (atr * stop_mult).max(min_stop);
    target_mults.iter().fold(
        LevelRequest::new(action, price).stop(Some(price - sign * stop_distance)),
        |req, m| req.volatility_target(price + sign * atr * m),
    )
}

/// Structure, sweep, POI and momentum tags for `action`.
pub fn standard_tags(ctx: &SharedContext, action: Action) -> SignalTags {
    SignalTags {
        structure: Some(ctx.structure_tag()),
        sweep: ctx.sweep_tag(),
        poi: ctx.poi.tag(action),
        momentum: Some(ctx.momentum_tag()),
    }
}

/// Most recent swing high / low of the trailing `lookback` candles.
pub fn last_swing_levels(candles: &[Candle], lookback: usize, w: usize) -> (Option<f64>, Option<f64>) {
    let swings = find_swings(candles, lookback, w);
    (
        swings.last_high().map(|s| s.price),
        swings.last_low().map(|s| s.price),
    )
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Hand-built contexts for layer tests.

    use chrono::{TimeZone, Utc};

    use crate::core::channel::Channel;
    use crate::core::context::{AtrRefs, EmaTrends, SharedContext, TfPair};
    use crate::core::discretionary::DiscretionaryRead;
    use crate::core::liquidity::{LiquidityLevels, LiquidityPools, LiquiditySweep};
    use crate::core::momentum::{AdxConfidence, AdxTier, MomentumRead};
    use crate::core::reversal::{PoiTouch, WickRejection};
    use crate::core::structure::{StructureShift, StructureState};
    use crate::core::zones::{Imbalance, OrderBlocks, Zone, ZoneSet};
    use crate::models::{
        DailyBias, PremiumDiscount, ShiftKind, SlopeType, StructureLabel, SweepKind, Tap, Trend,
    };

    pub fn labelled(label: StructureLabel) -> StructureState {
        StructureState {
            label,
            bias: label.trend(),
            ..StructureState::empty()
        }
    }

    pub fn shift(direction: Trend) -> StructureShift {
        StructureShift {
            kind: Some(ShiftKind::Bos),
            direction: Some(direction),
            level: Some(2648.0),
        }
    }

    pub fn sweep(kind: SweepKind) -> LiquiditySweep {
        LiquiditySweep {
            kind,
            level: Some(2646.0),
        }
    }

    pub fn momentum(tier: AdxTier) -> MomentumRead {
        MomentumRead {
            m5: tier,
            m15: tier,
            h1: tier,
            h4: tier,
            confidence: match tier {
                AdxTier::Blocked => AdxConfidence::Blocked,
                AdxTier::Medium => AdxConfidence::Medium,
                AdxTier::High => AdxConfidence::High,
            },
        }
    }

    /// Bullish everywhere, price 2650 inside a 70-confidence demand zone
    /// after a 15m sweep below and bullish BOS.
    pub fn bullish_ctx() -> SharedContext {
        SharedContext {
            price: 2650.0,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap(),
            bias: DailyBias::BuyOnly,
            h4: labelled(StructureLabel::HhHl),
            h1: labelled(StructureLabel::HhHl),
            ltf: TfPair {
                m15: labelled(StructureLabel::HhHl),
                m5: labelled(StructureLabel::HhHl),
            },
            shifts: TfPair {
                m15: shift(Trend::Bullish),
                m5: StructureShift::none(),
            },
            sweeps: TfPair {
                m15: sweep(SweepKind::Below),
                m5: LiquiditySweep::none(),
            },
            wicks: TfPair::default(),
            pools: LiquidityPools {
                highs: vec![2662.0, 2670.0],
                lows: vec![2630.0, 2640.0],
            },
            levels: LiquidityLevels {
                highs: vec![2660.0, 2668.0],
                lows: vec![2641.0, 2645.0],
            },
            zones: ZoneSet {
                demand: Some(Zone {
                    low: 2645.0,
                    high: 2655.0,
                    touches: 2,
                    confidence: 70.0,
                }),
                supply: Some(Zone {
                    low: 2675.0,
                    high: 2685.0,
                    touches: 1,
                    confidence: 55.0,
                }),
            },
            order_blocks: OrderBlocks::default(),
            imbalance: Imbalance::default(),
            poi: PoiTouch {
                bullish: true,
                bearish: false,
            },
            channel: Some(Channel {
                upper: 2690.0,
                lower: 2630.0,
                mid: 2660.0,
                slope: SlopeType::Up,
                tap: Tap::None_,
            }),
            channel_m5: None,
            premium_discount: PremiumDiscount::Discount,
            momentum: momentum(AdxTier::High),
            discretionary: DiscretionaryRead::default(),
            breakout_hh: false,
            atr: AtrRefs {
                m5: 4.0,
                m15: 6.0,
                h1: Some(5.0),
            },
            ema: EmaTrends {
                m5: Some(Trend::Bullish),
                m15: Some(Trend::Bullish),
                h1: Some(Trend::Bullish),
                h4: Some(Trend::Bullish),
            },
        }
    }

    pub fn bullish_wick() -> TfPair<WickRejection> {
        TfPair {
            m15: WickRejection {
                bullish: true,
                bearish: false,
            },
            m5: WickRejection::default(),
        }
    }
}
