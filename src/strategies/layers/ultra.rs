use crate::config::EngineConfig;
use crate::core::context::SharedContext;
use crate::core::liquidity::detect_sweep;
use crate::models::MarketData;
use crate::strategies::layers::gates::{require, GateBlock};
use crate::strategies::layers::scalp::{channel_ok, finish, htf_direction, m15_confirms, zone_ok, Confluences};
use crate::strategies::layers::LayerKind;
use crate::strategies::signals::CandidateSignal;

/// Sweep window for the strict variant.
const V3_SWEEP_LOOKBACK: usize = 18;

/// Ultra: HTF alignment with a 5m break of structure. Confidence 60..=80.
pub fn evaluate(ctx: &SharedContext, _data: &MarketData, cfg: &EngineConfig) -> Result<CandidateSignal, GateBlock> {
    let action = htf_direction(ctx)?;
    let hits = Confluences {
        zones: zone_ok(ctx, action, cfg),
        liquidity: ctx.sweeps.m5.kind.confirms(action),
        channels: channel_ok(ctx, action),
        bos: ctx.shifts.m5.supports(action),
        wick: ctx.wicks.m5.supports(action),
        momentum: ctx.momentum.fast_pair_active(),
    };
    let (score, breakdown) = hits.score();
    require(score >= 60.0, GateBlock::Setup("score_below_threshold"))?;
    finish(ctx, LayerKind::Ultra, action, score, breakdown, 80.0, cfg)
}

/// Strict ultra: 15m must not contradict, a tighter 5m sweep window, and a
/// score of at least 70.
pub fn evaluate_v3(ctx: &SharedContext, data: &MarketData, cfg: &EngineConfig) -> Result<CandidateSignal, GateBlock> {
    let action = htf_direction(ctx)?;
    m15_confirms(ctx, action)?;
    let sweep = detect_sweep(data.m5.as_slice(), V3_SWEEP_LOOKBACK);
    let hits = Confluences {
        zones: zone_ok(ctx, action, cfg),
        liquidity: sweep.kind.confirms(action),
        channels: channel_ok(ctx, action),
        bos: ctx.shift_supports(action),
        wick: ctx.wicks.m5.supports(action),
        momentum: ctx.momentum.fast_pair_active(),
    };
    let (score, breakdown) = hits.score();
    require(score >= 70.0, GateBlock::Setup("score_below_threshold"))?;
    finish(ctx, LayerKind::UltraV3, action, score, breakdown, 85.0, cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::structure::StructureShift;
    use crate::models::{Action, Trend};
    use crate::strategies::layers::gates::fixtures::{bullish_ctx, shift};
    use crate::test_helpers::{default_test_config, make_flat};

    fn flat_data() -> MarketData {
        let flat = make_flat(30, 2650.0);
        MarketData::new(flat.clone(), flat.clone(), flat.clone(), flat)
    }

    #[test]
    fn ultra_needs_a_5m_break() {
        let cfg = default_test_config();
        let mut ctx = bullish_ctx();
        // 40 + 25 + 10 without the 5m BOS still clears 60
        let sig = evaluate(&ctx, &flat_data(), &cfg).unwrap();
        assert!((sig.score - 75.0).abs() < 1e-9);
        assert!((sig.confidence - 75.0).abs() < 1e-9);

        ctx.shifts.m5 = shift(Trend::Bullish);
        let sig = evaluate(&ctx, &flat_data(), &cfg).unwrap();
        assert!((sig.score - 90.0).abs() < 1e-9);
        assert!((sig.confidence - 80.0).abs() < 1e-9, "ultra caps at 80");
    }

    #[test]
    fn v3_requires_seventy() {
        let cfg = default_test_config();
        let mut ctx = bullish_ctx();
        let sig = evaluate_v3(&ctx, &flat_data(), &cfg).unwrap();
        assert_eq!(sig.action, Action::Buy);
        assert_eq!(sig.layer, LayerKind::UltraV3);

        ctx.shifts.m15 = StructureShift::none();
        if let Some(z) = ctx.zones.demand.as_mut() {
            z.confidence = 40.0;
        }
        ctx.poi.bullish = false;
        // 40 + 10 momentum only
        assert_eq!(
            evaluate_v3(&ctx, &flat_data(), &cfg),
            Err(GateBlock::Setup("score_below_threshold"))
        );
    }
}
