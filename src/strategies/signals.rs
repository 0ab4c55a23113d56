use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::context::SharedContext;
use crate::core::levels::Levels;
use crate::core::liquidity::LiquidityLevels;
use crate::core::numeric::finite;
use crate::core::zones::ZoneSet;
use crate::models::{Action, DailyBias, ShiftKind, StructureLabel, SweepKind, Timeframe, Trend};
use crate::strategies::layers::LayerKind;

/// Momentum tags that do not earn the ranking bonus.
const WEAK_MOMENTUM_TAGS: [&str; 4] = ["BLOCKED", "LOW", "neutral", "weak"];

/// Similarity keys compared by the duplicate guard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalTags {
    pub structure: Option<String>,
    pub sweep: Option<String>,
    pub poi: Option<String>,
    pub momentum: Option<String>,
}

impl SignalTags {
    /// Number of structure / sweep / POI tags present.
    pub fn confluence_count(&self) -> usize {
        [&self.structure, &self.sweep, &self.poi]
            .iter()
            .filter(|t| t.is_some())
            .count()
    }

    pub fn has_strong_momentum(&self) -> bool {
        self.momentum
            .as_deref()
            .is_some_and(|m| !WEAK_MOMENTUM_TAGS.contains(&m))
    }
}

/// One layer's proposal. NO_TRADE candidates carry the blocking reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSignal {
    pub layer: LayerKind,
    pub action: Action,
    pub entry: Option<f64>,
    pub sl: Option<f64>,
    pub tp1: Option<f64>,
    pub tp2: Option<f64>,
    pub tp3: Option<f64>,
    pub score: f64,
    pub confidence: f64,
    pub reason: String,
    pub tags: SignalTags,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub breakdown: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl CandidateSignal {
    pub fn no_trade(layer: LayerKind, reason: impl Into<String>) -> Self {
        Self {
            layer,
            action: Action::NoTrade,
            entry: None,
            sl: None,
            tp1: None,
            tp2: None,
            tp3: None,
            score: 0.0,
            confidence: 0.0,
            reason: reason.into(),
            tags: SignalTags::default(),
            breakdown: BTreeMap::new(),
            notes: Vec::new(),
        }
    }

    /// Score is floored at 0 and confidence clamped to 0..=100.
    pub fn trade(
        layer: LayerKind,
        action: Action,
        levels: Levels,
        score: f64,
        confidence: f64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            layer,
            action,
            entry: Some(levels.entry),
            sl: Some(levels.sl),
            tp1: Some(levels.tp1),
            tp2: Some(levels.tp2),
            tp3: Some(levels.tp3),
            score: finite(Some(score)).unwrap_or(0.0).max(0.0),
            confidence: finite(Some(confidence)).unwrap_or(0.0).clamp(0.0, 100.0),
            reason: reason.into(),
            tags: SignalTags::default(),
            breakdown: BTreeMap::new(),
            notes: Vec::new(),
        }
    }

    pub fn with_tags(mut self, tags: SignalTags) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_breakdown(mut self, breakdown: BTreeMap<String, f64>) -> Self {
        self.breakdown = breakdown;
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn is_trade(&self) -> bool {
        self.action.is_directional()
    }

    pub fn levels(&self) -> Option<Levels> {
        Some(Levels {
            entry: self.entry?,
            sl: self.sl?,
            tp1: self.tp1?,
            tp2: self.tp2?,
            tp3: self.tp3?,
        })
    }

    pub fn risk_reward(&self) -> f64 {
        self.levels().map(|l| l.risk_reward()).unwrap_or(0.0)
    }
}

/// Contributions to the consolidator's rank score for the winner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub layer_weight: f64,
    pub tag_bonus: f64,
    pub momentum_bonus: f64,
    pub confidence_bonus: f64,
    pub breakout_penalty: f64,
    pub total: f64,
    pub priority: bool,
}

/// The consolidator's verdict before it is dressed with context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: Action,
    pub levels: Option<Levels>,
    pub confidence: f64,
    pub reason: String,
    pub layer: Option<LayerKind>,
    pub tags: SignalTags,
    pub breakdown: Option<ScoreBreakdown>,
    pub layer_breakdown: BTreeMap<String, f64>,
}

impl Decision {
    pub fn no_trade(reason: impl Into<String>) -> Self {
        Self {
            action: Action::NoTrade,
            levels: None,
            confidence: 0.0,
            reason: reason.into(),
            layer: None,
            tags: SignalTags::default(),
            breakdown: None,
            layer_breakdown: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShiftEvent {
    pub timeframe: Timeframe,
    pub direction: Trend,
    pub level: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureSnapshot {
    pub bos: Option<ShiftEvent>,
    pub choch: Option<ShiftEvent>,
    pub pattern: BTreeMap<Timeframe, StructureLabel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiquiditySnapshot {
    pub sweep: BTreeMap<Timeframe, SweepKind>,
    pub levels: LiquidityLevels,
}

/// The engine's single result. Every key is always present; numeric trade
/// fields are `null` for NO_TRADE.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalSignal {
    pub action: Action,
    pub entry: Option<f64>,
    pub sl: Option<f64>,
    /// Alias of `tp1`.
    pub tp: Option<f64>,
    pub tp1: Option<f64>,
    pub tp2: Option<f64>,
    pub tp3: Option<f64>,
    pub confidence: f64,
    pub reason: String,
    pub layer: Option<LayerKind>,
    pub bias: DailyBias,
    pub timestamp: DateTime<Utc>,
    pub trend: BTreeMap<Timeframe, Trend>,
    pub structure: StructureSnapshot,
    pub liquidity: LiquiditySnapshot,
    pub zones: ZoneSet,
    pub score_breakdown: BTreeMap<String, f64>,
    pub reasoning: String,
    pub layers: Vec<CandidateSignal>,
}

impl FinalSignal {
    pub fn assemble(ctx: &SharedContext, decision: Decision, layers: Vec<CandidateSignal>) -> Self {
        let trade = decision.action.is_directional();
        let levels = decision.levels.filter(|_| trade);

        let mut trend = BTreeMap::new();
        trend.insert(Timeframe::H4, ctx.h4.bias);
        trend.insert(Timeframe::H1, ctx.h1.bias);
        trend.insert(Timeframe::M15, ctx.ltf.m15.bias);
        trend.insert(Timeframe::M5, ctx.ltf.m5.bias);

        let mut pattern = BTreeMap::new();
        pattern.insert(Timeframe::H4, ctx.h4.label);
        pattern.insert(Timeframe::H1, ctx.h1.label);
        pattern.insert(Timeframe::M15, ctx.ltf.m15.label);
        pattern.insert(Timeframe::M5, ctx.ltf.m5.label);

        let shift_event = |kind: ShiftKind| {
            [(Timeframe::M15, &ctx.shifts.m15), (Timeframe::M5, &ctx.shifts.m5)]
                .into_iter()
                .find(|(_, s)| s.kind == Some(kind))
                .and_then(|(tf, s)| {
                    s.direction.map(|direction| ShiftEvent {
                        timeframe: tf,
                        direction,
                        level: s.level,
                    })
                })
        };

        let mut sweep = BTreeMap::new();
        sweep.insert(Timeframe::M15, ctx.sweeps.m15.kind);
        sweep.insert(Timeframe::M5, ctx.sweeps.m5.kind);

        let mut score_breakdown: BTreeMap<String, f64> = decision
            .layer_breakdown
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        if let Some(b) = decision.breakdown {
            score_breakdown.insert("rank_layer_weight".to_string(), b.layer_weight);
            score_breakdown.insert("rank_tag_bonus".to_string(), b.tag_bonus);
            score_breakdown.insert("rank_momentum_bonus".to_string(), b.momentum_bonus);
            score_breakdown.insert("rank_confidence_bonus".to_string(), b.confidence_bonus);
            score_breakdown.insert("rank_breakout_penalty".to_string(), -b.breakout_penalty);
            score_breakdown.insert("rank_total".to_string(), b.total);
        }

        Self {
            action: decision.action,
            entry: levels.map(|l| l.entry),
            sl: levels.map(|l| l.sl),
            tp: levels.map(|l| l.tp1),
            tp1: levels.map(|l| l.tp1),
            tp2: levels.map(|l| l.tp2),
            tp3: levels.map(|l| l.tp3),
            confidence: if trade { decision.confidence } else { 0.0 },
            reason: decision.reason,
            layer: decision.layer.filter(|_| trade),
            bias: ctx.bias,
            timestamp: ctx.timestamp,
            trend,
            structure: StructureSnapshot {
                bos: shift_event(ShiftKind::Bos),
                choch: shift_event(ShiftKind::Choch),
                pattern,
            },
            liquidity: LiquiditySnapshot {
                sweep,
                levels: ctx.levels.clone(),
            },
            zones: ctx.zones,
            score_breakdown,
            reasoning: ctx.discretionary.conclusion.clone(),
            layers,
        }
    }

    pub fn is_trade(&self) -> bool {
        self.action.is_directional()
    }

    pub fn levels(&self) -> Option<Levels> {
        Some(Levels {
            entry: self.entry?,
            sl: self.sl?,
            tp1: self.tp1?,
            tp2: self.tp2?,
            tp3: self.tp3?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels() -> Levels {
        Levels {
            entry: 2650.0,
            sl: 2645.0,
            tp1: 2657.5,
            tp2: 2660.0,
            tp3: 2665.0,
        }
    }

    #[test]
    fn trade_clamps_confidence_and_score() {
        let c = CandidateSignal::trade(LayerKind::Scalp, Action::Buy, levels(), -3.0, 140.0, "ok");
        assert!((c.confidence - 100.0).abs() < 1e-9);
        assert_eq!(c.score, 0.0);
        assert!((c.risk_reward() - 1.5).abs() < 1e-9);
        assert!(c.is_trade());
    }

    #[test]
    fn no_trade_has_no_levels() {
        let c = CandidateSignal::no_trade(LayerKind::Ultra, "htf_conflict");
        assert!(c.levels().is_none());
        assert_eq!(c.risk_reward(), 0.0);
        assert_eq!(c.reason, "htf_conflict");
    }

    #[test]
    fn tag_helpers() {
        let tags = SignalTags {
            structure: Some("15m:bullish|5m:none".to_string()),
            sweep: None,
            poi: Some("bull".to_string()),
            momentum: Some("LOW".to_string()),
        };
        assert_eq!(tags.confluence_count(), 2);
        assert!(!tags.has_strong_momentum());
        let strong = SignalTags {
            momentum: Some("HIGH".to_string()),
            ..tags
        };
        assert!(strong.has_strong_momentum());
    }

    #[test]
    fn candidate_serializes_action_and_layer() {
        let c = CandidateSignal::trade(LayerKind::MicroScalp, Action::Sell, levels(), 1.0, 60.0, "x");
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["action"], "SELL");
        assert_eq!(json["layer"], "micro_scalp");
        assert!(json.get("notes").is_none());
    }
}
