#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};

use gold_signal_engine::config::EngineConfig;
use gold_signal_engine::core::channel::Channel;
use gold_signal_engine::core::context::{AtrRefs, EmaTrends, SharedContext, TfPair};
use gold_signal_engine::core::discretionary::DiscretionaryRead;
use gold_signal_engine::core::liquidity::{LiquidityLevels, LiquidityPools, LiquiditySweep};
use gold_signal_engine::core::momentum::{AdxConfidence, AdxTier, MomentumRead};
use gold_signal_engine::core::reversal::{PoiTouch, WickRejection};
use gold_signal_engine::core::structure::{StructureShift, StructureState};
use gold_signal_engine::core::zones::{Imbalance, OrderBlocks, Zone, ZoneSet};
use gold_signal_engine::models::{
    Candle, CandleSeries, DailyBias, Indicators, MarketData, PremiumDiscount, ShiftKind, SlopeType,
    StructureLabel, SweepKind, Tap, Trend,
};

pub fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Create candles from (open, high, low, close) tuples, `step` minutes apart,
/// all carrying `indicators`.
pub fn make_candles(data: &[(f64, f64, f64, f64)], step: i64, indicators: Indicators) -> CandleSeries {
    let base = base_time();

    let candles: Vec<Candle> = data
        .iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| Candle {
            timestamp: base + Duration::minutes(i as i64 * step),
            open: o,
            high: h,
            low: l,
            close: c,
            volume: 100.0,
            indicators,
        })
        .collect();

    CandleSeries::new(candles)
}

pub fn adx(value: f64) -> Indicators {
    Indicators {
        adx: Some(value),
        ..Indicators::default()
    }
}

/// `n` zero-range candles at `price`.
pub fn make_flat(n: usize, price: f64, step: i64, indicators: Indicators) -> CandleSeries {
    let data: Vec<_> = (0..n).map(|_| (price, price, price, price)).collect();
    make_candles(&data, step, indicators)
}

/// Same flat series on all four timeframes.
pub fn flat_market(n: usize, price: f64, adx_value: f64) -> MarketData {
    MarketData::new(
        make_flat(n, price, 5, adx(adx_value)),
        make_flat(n, price, 15, adx(adx_value)),
        make_flat(n, price, 60, adx(adx_value)),
        make_flat(n, price, 240, adx(adx_value)),
    )
}

/// Zigzag of `cycles` up-legs then down-legs, `leg` candles each. With
/// `up > down` every peak and trough is higher than the last.
pub fn zigzag(start: f64, up: f64, down: f64, leg: usize, cycles: usize, step: i64, indicators: Indicators) -> CandleSeries {
    let mut data = Vec::new();
    let mut p = start;
    for _ in 0..cycles {
        for _ in 0..leg {
            let close = p + up;
            data.push((p, close + 0.3, p - 0.1, close));
            p = close;
        }
        for _ in 0..leg {
            let close = p - down;
            data.push((p, p + 0.1, close - 0.3, close));
            p = close;
        }
    }
    make_candles(&data, step, indicators)
}

/// Rising zigzag on all four timeframes with trending ADX and a measured ATR.
pub fn rising_market(cycles: usize) -> MarketData {
    let ind = Indicators {
        adx: Some(30.0),
        atr: Some(3.0),
        ..Indicators::default()
    };
    MarketData::new(
        zigzag(2600.0, 2.0, 1.0, 6, cycles, 5, ind),
        zigzag(2600.0, 2.0, 1.0, 6, cycles, 15, ind),
        zigzag(2600.0, 2.0, 1.0, 6, cycles, 60, ind),
        zigzag(2600.0, 2.0, 1.0, 6, cycles, 240, ind),
    )
}

pub fn test_config() -> EngineConfig {
    EngineConfig {
        log_level: "ERROR".to_string(),
        ..EngineConfig::default()
    }
}

pub fn labelled(label: StructureLabel) -> StructureState {
    StructureState {
        label,
        bias: label.trend(),
        ..StructureState::empty()
    }
}

pub fn bos(direction: Trend) -> StructureShift {
    StructureShift {
        kind: Some(ShiftKind::Bos),
        direction: Some(direction),
        level: Some(2648.0),
    }
}

/// Both higher timeframes HH-HL, strong ADX on every timeframe, a 15m sweep
/// below followed by a bullish BOS, price 2650 inside a 70-confidence demand
/// zone at 2645-2655.
pub fn trending_context() -> SharedContext {
    SharedContext {
        price: 2650.0,
        timestamp: base_time(),
        bias: DailyBias::BuyOnly,
        h4: labelled(StructureLabel::HhHl),
        h1: labelled(StructureLabel::HhHl),
        ltf: TfPair {
            m15: labelled(StructureLabel::HhHl),
            m5: labelled(StructureLabel::HhHl),
        },
        shifts: TfPair {
            m15: bos(Trend::Bullish),
            m5: StructureShift::none(),
        },
        sweeps: TfPair {
            m15: LiquiditySweep {
                kind: SweepKind::Below,
                level: Some(2646.0),
            },
            m5: LiquiditySweep::none(),
        },
        wicks: TfPair::<WickRejection>::default(),
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
        momentum: MomentumRead {
            m5: AdxTier::High,
            m15: AdxTier::High,
            h1: AdxTier::High,
            h4: AdxTier::High,
            confidence: AdxConfidence::High,
        },
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

/// Mirror of [`trending_context`]: both higher timeframes LH-LL, a 15m sweep
/// above followed by a bearish BOS, price 2650 inside a supply zone.
pub fn falling_context() -> SharedContext {
    let mut ctx = trending_context();
    ctx.bias = DailyBias::SellOnly;
    ctx.h4 = labelled(StructureLabel::LhLl);
    ctx.h1 = labelled(StructureLabel::LhLl);
    ctx.ltf = TfPair {
        m15: labelled(StructureLabel::LhLl),
        m5: labelled(StructureLabel::LhLl),
    };
    ctx.shifts.m15 = bos(Trend::Bearish);
    ctx.sweeps.m15 = LiquiditySweep {
        kind: SweepKind::Above,
        level: Some(2654.0),
    };
    ctx.zones = ZoneSet {
        demand: Some(Zone {
            low: 2615.0,
            high: 2625.0,
            touches: 1,
            confidence: 55.0,
        }),
        supply: Some(Zone {
            low: 2645.0,
            high: 2655.0,
            touches: 2,
            confidence: 70.0,
        }),
    };
    ctx.poi = PoiTouch {
        bullish: false,
        bearish: true,
    };
    ctx.premium_discount = PremiumDiscount::Premium;
    ctx.ema = EmaTrends {
        m5: Some(Trend::Bearish),
        m15: Some(Trend::Bearish),
        h1: Some(Trend::Bearish),
        h4: Some(Trend::Bearish),
    };
    ctx
}

/// Enough flat 5m history for the layers that need a minimum candle count.
pub fn background_data() -> MarketData {
    flat_market(60, 2650.0, 30.0)
}
