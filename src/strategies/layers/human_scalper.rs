//! EMA / RSI / price-flow confluence on 5m, trading only with the 5m EMA
//! stack.

use crate::config::EngineConfig;
use crate::core::context::SharedContext;
use crate::core::levels::LevelRequest;
use crate::core::numeric::{finite, positive};
use crate::models::{highs_max, lows_min, Action, DailyBias, MarketData, Trend};
use crate::strategies::layers::gates::{
    common_gates, require, sanitize, standard_tags, GateBlock, ReactionRequirement,
};
use crate::strategies::layers::LayerKind;
use crate::strategies::signals::CandidateSignal;

const MIN_CANDLES: usize = 30;
const MIN_CONFLUENCE: u32 = 5;
const STRONG_BODY: f64 = 0.5;

struct Side {
    score: u32,
    blocked: bool,
    reasons: Vec<&'static str>,
}

impl Side {
    fn new() -> Self {
        Self {
            score: 0,
            blocked: false,
            reasons: Vec::new(),
        }
    }

    fn add(&mut self, cond: bool, points: u32, reason: &'static str) {
        if cond {
            self.score += points;
            self.reasons.push(reason);
        }
    }
}

pub fn evaluate(ctx: &SharedContext, data: &MarketData, cfg: &EngineConfig) -> Result<CandidateSignal, GateBlock> {
    require(data.m5.len() >= MIN_CANDLES, GateBlock::InsufficientData)?;
    let tail = data.m5.tail(3);
    let (last, before) = match tail {
        [first, _, last] => (last, first),
        _ => return Err(GateBlock::InsufficientData),
    };
    let ind = last.indicators;
    let ema_short = finite(ind.ema_short).ok_or(GateBlock::MissingField("ema_short"))?;
    let ema_long = finite(ind.ema_long).ok_or(GateBlock::MissingField("ema_long"))?;
    let rsi = finite(ind.rsi).ok_or(GateBlock::MissingField("rsi"))?;
    let atr = positive(ind.atr).unwrap_or(ctx.atr.m5);
    let price = ctx.price;

    let strong_body = last.body_ratio() > STRONG_BODY;
    let near_ema = (price - ema_short).abs() < atr;
    let prev_close = data.m5.from_end(1).map(|c| c.close).unwrap_or(price);
    let htf = ctx.ema.m15.unwrap_or(Trend::Neutral);

    let mut buy = Side::new();
    buy.add(ema_short > ema_long, 2, "5m uptrend");
    buy.add(price > ema_short, 1, "price above short EMA");
    buy.add((40.0..=70.0).contains(&rsi), 2, "RSI bullish zone");
    buy.add(price > before.close, 1, "upward price flow");
    buy.add(last.is_bullish() && strong_body, 1, "strong bullish candle");
    buy.add(htf != Trend::Bearish, 1, "15m alignment");
    buy.add(
        (ema_short > ema_long && price > ema_short && near_ema)
            || (price > ema_short && prev_close <= ema_short && last.is_bullish()),
        1,
        "pullback/breakout setup",
    );
    buy.add(ctx.shift_supports(Action::Buy), 1, "bullish structure shift");
    buy.add(ctx.bias != DailyBias::SellOnly, 1, "bias allows");
    buy.blocked = ema_short <= ema_long
        || rsi > 75.0
        || (htf == Trend::Bearish && ctx.bias == DailyBias::SellOnly)
        || price < ema_short;

    let mut sell = Side::new();
    sell.add(ema_short < ema_long, 2, "5m downtrend");
    sell.add(price < ema_short, 1, "price below short EMA");
    sell.add((30.0..=60.0).contains(&rsi), 2, "RSI bearish zone");
    sell.add(price < before.close, 1, "downward price flow");
    sell.add(last.is_bearish() && strong_body, 1, "strong bearish candle");
    sell.add(htf != Trend::Bullish, 1, "15m alignment");
    sell.add(
        (ema_short < ema_long && price < ema_short && near_ema)
            || (price < ema_short && prev_close >= ema_short && last.is_bearish()),
        1,
        "pullback/breakout setup",
    );
    sell.add(ctx.shift_supports(Action::Sell), 1, "bearish structure shift");
    sell.add(ctx.bias != DailyBias::BuyOnly, 1, "bias allows");
    sell.blocked = ema_short >= ema_long
        || rsi < 25.0
        || (htf == Trend::Bullish && ctx.bias == DailyBias::BuyOnly)
        || price > ema_short
        || ctx.breakout_hh;

    let (action, side) = if buy.score >= MIN_CONFLUENCE && !buy.blocked {
        (Action::Buy, buy)
    } else if sell.score >= MIN_CONFLUENCE && !sell.blocked {
        (Action::Sell, sell)
    } else {
        return Err(GateBlock::Setup("insufficient_confluence"));
    };

    let confidence = (50.0 + 5.0 * side.score as f64).min(85.0);
    let confidence = common_gates(
        ctx,
        LayerKind::HumanScalper,
        action,
        ReactionRequirement::Structural,
        confidence,
        cfg,
    )?;

    let recent = data.m5.tail(5);
    let sign = action.sign();
    let (swing, ema_stop) = match action {
        Action::Buy => (lows_min(recent), ema_long - 0.5 * atr),
        _ => (highs_max(recent), ema_long + 0.5 * atr),
    };
    // Tighter of the two stops.
    let stop = if sign * (swing - ema_stop) > 0.0 { swing } else { ema_stop };
    let req = [1.2, 2.0, 3.0].iter().fold(
        LevelRequest::new(action, price).stop(Some(stop)).adverse(Some(swing)),
        |req, m| req.volatility_target(price + sign * atr * m),
    );
    let levels = sanitize(ctx, &req, cfg)?;

    let reason = format!(
        "Human scalper {} ({} confluences): {}",
        action,
        side.score,
        side.reasons.join(", ")
    );
    Ok(
        CandidateSignal::trade(LayerKind::HumanScalper, action, levels, side.score as f64, confidence, reason)
            .with_tags(standard_tags(ctx, action)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CandleSeries, Indicators};
    use crate::strategies::layers::gates::fixtures::bullish_ctx;
    use crate::test_helpers::{default_test_config, make_bullish_trend, make_flat, with_indicators};

    fn stacked(series: &CandleSeries, short: f64, long: f64, rsi: f64) -> CandleSeries {
        with_indicators(
            series,
            Indicators {
                ema_short: Some(short),
                ema_long: Some(long),
                rsi: Some(rsi),
                adx: Some(30.0),
                atr: Some(4.0),
                ..Indicators::default()
            },
        )
    }

    fn data_with(m5: CandleSeries) -> MarketData {
        let flat = make_flat(10, 2650.0);
        MarketData::new(m5, flat.clone(), flat.clone(), flat)
    }

    #[test]
    fn bullish_stack_buys() {
        let cfg = default_test_config();
        let m5 = stacked(&make_bullish_trend(40, 2300.0), 2600.0, 2500.0, 60.0);
        let mut ctx = bullish_ctx();
        ctx.price = m5.last_close().unwrap();
        let sig = evaluate(&ctx, &data_with(m5), &cfg).unwrap();
        assert_eq!(sig.action, Action::Buy);
        assert!(sig.confidence >= 75.0 && sig.confidence <= 85.0);
        assert!(sig.sl.unwrap() < sig.entry.unwrap());
        assert!(sig.reason.starts_with("Human scalper BUY"));
    }

    #[test]
    fn overbought_rsi_blocks_buy() {
        let cfg = default_test_config();
        let m5 = stacked(&make_bullish_trend(40, 2300.0), 2600.0, 2500.0, 80.0);
        let mut ctx = bullish_ctx();
        ctx.price = m5.last_close().unwrap();
        assert_eq!(
            evaluate(&ctx, &data_with(m5), &cfg),
            Err(GateBlock::Setup("insufficient_confluence"))
        );
    }

    #[test]
    fn missing_rsi_disqualifies() {
        let cfg = default_test_config();
        let base = make_bullish_trend(40, 2300.0);
        let m5 = with_indicators(
            &base,
            Indicators {
                ema_short: Some(2600.0),
                ema_long: Some(2500.0),
                ..Indicators::default()
            },
        );
        assert_eq!(
            evaluate(&bullish_ctx(), &data_with(m5), &cfg),
            Err(GateBlock::MissingField("rsi"))
        );
    }

    #[test]
    fn short_series_is_insufficient() {
        let cfg = default_test_config();
        let m5 = make_bullish_trend(10, 2600.0);
        assert_eq!(
            evaluate(&bullish_ctx(), &data_with(m5), &cfg),
            Err(GateBlock::InsufficientData)
        );
    }
}
