//! Strategy layers. Each layer is a pure function of the shared context and
//! the raw series; none of them mutate anything. [`LayerKind::ALL`] is both
//! the evaluation order and the fallback chain, strictest first.

pub mod breakout_buy;
pub mod discretionary;
pub mod fallback_light;
pub mod gates;
pub mod human_scalper;
pub mod institutional;
pub mod light_price_action;
pub mod micro_scalp;
pub mod momentum_breakout;
pub mod price_action;
pub mod scalp;
pub mod ultra;
pub mod ultralight;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::EngineConfig;
use crate::core::context::SharedContext;
use crate::models::MarketData;
use crate::strategies::signals::CandidateSignal;

use self::gates::GateBlock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Institutional,
    MicroScalp,
    Scalp,
    UltraV3,
    Ultra,
    HumanScalper,
    Discretionary,
    PriceAction,
    MomentumBreakout,
    BreakoutBuy,
    LightPriceAction,
    #[serde(rename = "ultralight")]
    UltraLight,
    FallbackLight,
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl LayerKind {
    pub const ALL: [LayerKind; 13] = [
        LayerKind::Institutional,
        LayerKind::MicroScalp,
        LayerKind::Scalp,
        LayerKind::UltraV3,
        LayerKind::Ultra,
        LayerKind::HumanScalper,
        LayerKind::Discretionary,
        LayerKind::PriceAction,
        LayerKind::MomentumBreakout,
        LayerKind::BreakoutBuy,
        LayerKind::LightPriceAction,
        LayerKind::UltraLight,
        LayerKind::FallbackLight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LayerKind::Institutional => "institutional",
            LayerKind::MicroScalp => "micro_scalp",
            LayerKind::Scalp => "scalp",
            LayerKind::UltraV3 => "ultra_v3",
            LayerKind::Ultra => "ultra",
            LayerKind::HumanScalper => "human_scalper",
            LayerKind::Discretionary => "discretionary",
            LayerKind::PriceAction => "price_action",
            LayerKind::MomentumBreakout => "momentum_breakout",
            LayerKind::BreakoutBuy => "breakout_buy",
            LayerKind::LightPriceAction => "light_price_action",
            LayerKind::UltraLight => "ultralight",
            LayerKind::FallbackLight => "fallback_light",
        }
    }

    /// Base ranking weight.
    pub fn default_weight(&self) -> f64 {
        match self {
            LayerKind::Institutional | LayerKind::MicroScalp => 1.0,
            LayerKind::Scalp | LayerKind::UltraV3 => 0.9,
            LayerKind::Ultra | LayerKind::HumanScalper => 0.85,
            LayerKind::PriceAction => 0.8,
            LayerKind::MomentumBreakout => 0.75,
            LayerKind::Discretionary => 0.7,
            LayerKind::BreakoutBuy => 0.65,
            LayerKind::UltraLight => 0.6,
            LayerKind::LightPriceAction => 0.55,
            LayerKind::FallbackLight => 0.5,
        }
    }

    /// Eligible for the ranking priority flag.
    pub fn is_strict(&self) -> bool {
        matches!(
            self,
            LayerKind::Institutional | LayerKind::MicroScalp | LayerKind::UltraV3
        )
    }

    /// Trades through a blocked 5m ADX at reduced confidence.
    pub fn is_relaxed(&self) -> bool {
        matches!(
            self,
            LayerKind::LightPriceAction | LayerKind::UltraLight | LayerKind::FallbackLight
        )
    }

    fn run(
        &self,
        ctx: &SharedContext,
        data: &MarketData,
        cfg: &EngineConfig,
    ) -> Result<CandidateSignal, GateBlock> {
        match self {
            LayerKind::Institutional => institutional::evaluate(ctx, cfg),
            LayerKind::MicroScalp => micro_scalp::evaluate(ctx, cfg),
            LayerKind::Scalp => scalp::evaluate(ctx, data, cfg),
            LayerKind::UltraV3 => ultra::evaluate_v3(ctx, data, cfg),
            LayerKind::Ultra => ultra::evaluate(ctx, data, cfg),
            LayerKind::HumanScalper => human_scalper::evaluate(ctx, data, cfg),
            LayerKind::Discretionary => discretionary::evaluate(ctx, cfg),
            LayerKind::PriceAction => price_action::evaluate(ctx, data, cfg),
            LayerKind::MomentumBreakout => momentum_breakout::evaluate(ctx, data, cfg),
            LayerKind::BreakoutBuy => breakout_buy::evaluate(ctx, data, cfg),
            LayerKind::LightPriceAction => light_price_action::evaluate(ctx, data, cfg),
            LayerKind::UltraLight => ultralight::evaluate(ctx, cfg),
            LayerKind::FallbackLight => fallback_light::evaluate(ctx, data, cfg),
        }
    }

    /// Runs the layer. A gate rejection comes back as a NO_TRADE candidate
    /// carrying the gate's reason.
    pub fn evaluate(&self, ctx: &SharedContext, data: &MarketData, cfg: &EngineConfig) -> CandidateSignal {
        match self.run(ctx, data, cfg) {
            Ok(candidate) => {
                tracing::debug!(
                    "[EVAL] {} proposed {} conf={:.1}",
                    self,
                    candidate.action,
                    candidate.confidence
                );
                candidate
            }
            Err(block) => {
                tracing::trace!("[EVAL] {} blocked at {}", self, block);
                CandidateSignal::no_trade(*self, block.to_string())
            }
        }
    }
}

/// Every layer in [`LayerKind::ALL`] order.
pub fn evaluate_all(ctx: &SharedContext, data: &MarketData, cfg: &EngineConfig) -> Vec<CandidateSignal> {
    LayerKind::ALL
        .iter()
        .map(|kind| kind.evaluate(ctx, data, cfg))
        .collect()
}

/// Same result as [`evaluate_all`], one scoped thread per layer.
pub fn evaluate_all_parallel(
    ctx: &SharedContext,
    data: &MarketData,
    cfg: &EngineConfig,
) -> Vec<CandidateSignal> {
    std::thread::scope(|scope| {
        let handles: Vec<_> = LayerKind::ALL
            .iter()
            .map(|kind| {
                let kind = *kind;
                (kind, scope.spawn(move || kind.evaluate(ctx, data, cfg)))
            })
            .collect();
        handles
            .into_iter()
            .map(|(kind, handle)| {
                handle
                    .join()
                    .unwrap_or_else(|_| CandidateSignal::no_trade(kind, "layer_panicked"))
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn all_is_exhaustive_and_unique() {
        let set: HashSet<LayerKind> = LayerKind::ALL.iter().copied().collect();
        assert_eq!(set.len(), LayerKind::ALL.len());
        assert_eq!(LayerKind::ALL[0], LayerKind::Institutional);
        assert_eq!(LayerKind::ALL[12], LayerKind::FallbackLight);
    }

    #[test]
    fn strict_and_relaxed_are_disjoint() {
        for kind in LayerKind::ALL {
            assert!(!(kind.is_strict() && kind.is_relaxed()), "{kind}");
            assert!(kind.default_weight() > 0.0);
        }
    }

    #[test]
    fn display_matches_serde() {
        for kind in LayerKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
        }
    }
}
