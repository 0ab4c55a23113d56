use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::core::bias::resolve_bias;
use crate::core::channel::{detect_channel, premium_discount, Channel};
use crate::core::discretionary::{analyze_discretionary, DiscretionaryRead};
use crate::core::liquidity::{
    collect_levels, collect_pools, detect_sweep, LiquidityLevels, LiquidityPools, LiquiditySweep,
};
use crate::core::momentum::{ema_trend, MomentumRead};
use crate::core::numeric::AtrPolicy;
use crate::core::reversal::{poi_touch, wick_rejection, PoiTouch, WickRejection};
use crate::core::structure::{analyze_structure, detect_shift, StructureShift, StructureState};
use crate::core::zones::{detect_imbalance, detect_order_blocks, detect_zones, Imbalance, OrderBlocks, ZoneSet};
use crate::error::EngineError;
use crate::models::{Action, DailyBias, MarketData, PremiumDiscount, SweepKind, Timeframe, Trend};

/// One value per low timeframe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TfPair<T> {
    pub m15: T,
    pub m5: T,
}

impl<T> TfPair<T> {
    pub fn any(&self, f: impl Fn(&T) -> bool) -> bool {
        f(&self.m15) || f(&self.m5)
    }

    pub fn both(&self, f: impl Fn(&T) -> bool) -> bool {
        f(&self.m15) && f(&self.m5)
    }
}

/// Volatility references. `m5`/`m15` always resolve through the ATR policy;
/// `h1` is only present when measured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AtrRefs {
    pub m5: f64,
    pub m15: f64,
    pub h1: Option<f64>,
}

/// EMA stack read per timeframe; `None` when the EMA columns are missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EmaTrends {
    pub m5: Option<Trend>,
    pub m15: Option<Trend>,
    pub h1: Option<Trend>,
    pub h4: Option<Trend>,
}

/// Everything the layers read, computed once per evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedContext {
    pub price: f64,
    pub timestamp: DateTime<Utc>,
    pub bias: DailyBias,

    pub h4: StructureState,
    pub h1: StructureState,
    pub ltf: TfPair<StructureState>,
    pub shifts: TfPair<StructureShift>,
    pub sweeps: TfPair<LiquiditySweep>,
    pub wicks: TfPair<WickRejection>,

    pub pools: LiquidityPools,
    pub levels: LiquidityLevels,
    pub zones: ZoneSet,
    pub order_blocks: OrderBlocks,
    pub imbalance: Imbalance,
    pub poi: PoiTouch,

    /// 1h channel.
    pub channel: Option<Channel>,
    pub channel_m5: Option<Channel>,
    pub premium_discount: PremiumDiscount,

    pub momentum: MomentumRead,
    pub discretionary: DiscretionaryRead,
    /// 5m close above the last 5m swing high plus the breakout buffer.
    pub breakout_hh: bool,

    pub atr: AtrRefs,
    pub ema: EmaTrends,
}

impl SharedContext {
    pub fn shift_supports(&self, action: Action) -> bool {
        self.shifts.any(|s| s.supports(action))
    }

    pub fn sweep_confirms(&self, action: Action) -> bool {
        self.sweeps.any(|s| s.kind.confirms(action))
    }

    pub fn wick_supports(&self, action: Action) -> bool {
        self.wicks.any(|w| w.supports(action))
    }

    /// 15m and 5m labels both pointing against `action`.
    pub fn ltf_opposes(&self, action: Action) -> bool {
        self.ltf.both(|s| s.label.opposes(action))
    }

    pub fn htf_supports(&self, action: Action) -> bool {
        self.h4.label.supports(action) || self.h1.label.supports(action)
    }

    /// `15m:<dir>|5m:<dir>` from the structure shifts.
    pub fn structure_tag(&self) -> String {
        format!("15m:{}|5m:{}", self.shifts.m15.tag(), self.shifts.m5.tag())
    }

    /// 15m sweep kind, else the 5m one.
    pub fn sweep_tag(&self) -> Option<String> {
        [self.sweeps.m15.kind, self.sweeps.m5.kind]
            .into_iter()
            .find(|k| *k != SweepKind::None_)
            .map(|k| k.to_string())
    }

    pub fn momentum_tag(&self) -> String {
        self.momentum.confidence.to_string()
    }
}

/// Runs every leaf analyzer over validated market data.
pub struct ContextBuilder<'a> {
    cfg: &'a EngineConfig,
}

impl<'a> ContextBuilder<'a> {
    pub fn new(cfg: &'a EngineConfig) -> Self {
        Self { cfg }
    }

    pub fn build(&self, data: &MarketData) -> Result<SharedContext, EngineError> {
        data.validate()?;

        let a = &self.cfg.analysis;
        let gates = &self.cfg.gates;
        let (m5, m15, h1, h4) = (
            data.m5.as_slice(),
            data.m15.as_slice(),
            data.h1.as_slice(),
            data.h4.as_slice(),
        );
        let last = data.m5.last().ok_or(EngineError::EmptySeries(Timeframe::M5))?;
        let price = last.close;

        let h4_state = analyze_structure(h4, a.htf_lookback, a.htf_window);
        let h1_state = analyze_structure(h1, a.htf_lookback, a.htf_window);
        let bias = resolve_bias(&h4_state, &h1_state);

        let ltf = TfPair {
            m15: analyze_structure(m15, a.m15_structure_lookback, a.ltf_window),
            m5: analyze_structure(m5, a.m5_structure_lookback, a.ltf_window),
        };
        let shifts = TfPair {
            m15: detect_shift(m15, a.shift_lookback, a.shift_window),
            m5: detect_shift(m5, a.shift_lookback, a.shift_window),
        };
        let sweeps = TfPair {
            m15: detect_sweep(m15, a.sweep_lookback_m15),
            m5: detect_sweep(m5, a.sweep_lookback_m5),
        };
        let wicks = TfPair {
            m15: data.m15.last().map(wick_rejection).unwrap_or_default(),
            m5: wick_rejection(last),
        };

        let pools = collect_pools(m15, m5, a.pool_lookback, a.pool_window);
        let levels = collect_levels(m15, m5, a.level_lookback, a.ltf_window, a.level_count);
        let zones = detect_zones(h1, a);
        let order_blocks = detect_order_blocks(h1, a);
        let imbalance = detect_imbalance(m15);
        let poi = poi_touch(price, &zones, &imbalance, gates.zone_confidence_min);

        let channel = detect_channel(h1, price, a.channel_lookback, a.channel_tap_pct);
        let channel_m5 = detect_channel(m5, price, a.channel_lookback, a.channel_tap_pct);
        let premium_discount = premium_discount(channel.as_ref(), price);

        let momentum = MomentumRead::from_indicators(
            &data.m5.last_indicators(),
            &data.m15.last_indicators(),
            &data.h1.last_indicators(),
            &data.h4.last_indicators(),
            gates,
        );
        let discretionary = analyze_discretionary(m5, &zones, &pools, a);

        let breakout_hh = ltf
            .m5
            .last_high
            .is_some_and(|h| price > h + a.breakout_buffer);

        let policy = AtrPolicy::new(a.atr_fallback_fraction);
        let atr = AtrRefs {
            m5: policy.resolve(m5, price),
            m15: policy.resolve(m15, price),
            h1: policy.measured(h1),
        };

        let close_of = |s: &crate::models::CandleSeries| s.last_close().unwrap_or(price);
        let ema = EmaTrends {
            m5: ema_trend(&data.m5.last_indicators(), price),
            m15: ema_trend(&data.m15.last_indicators(), close_of(&data.m15)),
            h1: ema_trend(&data.h1.last_indicators(), close_of(&data.h1)),
            h4: ema_trend(&data.h4.last_indicators(), close_of(&data.h4)),
        };

        tracing::debug!(
            price,
            bias = %bias,
            h4 = %h4_state.label,
            h1 = %h1_state.label,
            m15 = %ltf.m15.label,
            m5 = %ltf.m5.label,
            adx = %momentum.confidence,
            "[CONTEXT] built"
        );

        Ok(SharedContext {
            price,
            timestamp: last.timestamp,
            bias,
            h4: h4_state,
            h1: h1_state,
            ltf,
            shifts,
            sweeps,
            wicks,
            pools,
            levels,
            zones,
            order_blocks,
            imbalance,
            poi,
            channel,
            channel_m5,
            premium_discount,
            momentum,
            discretionary,
            breakout_hh,
            atr,
            ema,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::momentum::{AdxConfidence, AdxTier};
    use crate::models::{CandleSeries, StructureLabel};
    use crate::test_helpers::{adx, default_test_config, make_flat, make_zigzag, with_indicators};

    fn rising(ind_adx: f64) -> CandleSeries {
        with_indicators(&make_zigzag(2600.0, 2.0, 1.0, 4, 8), adx(ind_adx))
    }

    #[test]
    fn builds_from_rising_market() {
        let cfg = default_test_config();
        let data = MarketData::new(rising(30.0), rising(30.0), rising(30.0), rising(30.0));
        let ctx = ContextBuilder::new(&cfg).build(&data).unwrap();

        assert_eq!(ctx.bias, DailyBias::BuyOnly);
        assert_eq!(ctx.h4.label, StructureLabel::HhHl);
        assert_eq!(ctx.ltf.m5.label, StructureLabel::HhHl);
        assert_eq!(ctx.momentum.confidence, AdxConfidence::High);
        assert!(ctx.zones.demand.is_some());
        assert!(ctx.channel.is_some());
        assert!(ctx.atr.m5 > 0.0);
        assert!(ctx.htf_supports(Action::Buy));
        assert!(!ctx.ltf_opposes(Action::Buy));
        assert_eq!(ctx.ema.m5, None);
        assert_eq!(ctx.momentum_tag(), "HIGH");
    }

    #[test]
    fn thin_flat_market_is_neutral_not_an_error() {
        let cfg = default_test_config();
        let flat = make_flat(4, 2650.0);
        let data = MarketData::new(flat.clone(), flat.clone(), flat.clone(), flat);
        let ctx = ContextBuilder::new(&cfg).build(&data).unwrap();

        assert_eq!(ctx.bias, DailyBias::Neutral);
        assert_eq!(ctx.h1.label, StructureLabel::None_);
        assert_eq!(ctx.momentum.m5, AdxTier::Blocked);
        assert_eq!(ctx.momentum.confidence, AdxConfidence::Blocked);
        assert!(ctx.sweep_tag().is_none());
        assert_eq!(ctx.structure_tag(), "15m:none|5m:none");
        assert!(!ctx.breakout_hh);
        assert!(ctx.atr.h1.is_none());
    }

    #[test]
    fn empty_series_is_an_error() {
        let cfg = default_test_config();
        let data = MarketData::new(
            CandleSeries::default(),
            make_flat(4, 1.0),
            make_flat(4, 1.0),
            make_flat(4, 1.0),
        );
        assert!(matches!(
            ContextBuilder::new(&cfg).build(&data),
            Err(EngineError::EmptySeries(Timeframe::M5))
        ));
    }
}
