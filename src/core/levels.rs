use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{LevelConfig, ValidationConfig};
use crate::core::context::AtrRefs;
use crate::core::numeric::{finite, positive, round2};
use crate::models::Action;

/// Raw take-profit candidate proposed by a layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub price: f64,
    /// Swing, pool, zone or channel level rather than a volatility multiple.
    pub structural: bool,
}

impl Target {
    pub fn structural(price: f64) -> Self {
        Self {
            price,
            structural: true,
        }
    }

    pub fn volatility(price: f64) -> Self {
        Self {
            price,
            structural: false,
        }
    }
}

/// What a layer hands to the sanitizer.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelRequest {
    pub action: Action,
    pub entry: f64,
    pub stop: Option<f64>,
    /// Nearest structural level on the losing side, used when `stop` is
    /// missing or on the wrong side of entry.
    pub adverse_level: Option<f64>,
    pub targets: Vec<Target>,
}

impl LevelRequest {
    pub fn new(action: Action, entry: f64) -> Self {
        Self {
            action,
            entry,
            stop: None,
            adverse_level: None,
            targets: Vec::new(),
        }
    }

    pub fn stop(mut self, stop: Option<f64>) -> Self {
        self.stop = stop;
        self
    }

    pub fn adverse(mut self, level: Option<f64>) -> Self {
        self.adverse_level = level;
        self
    }

    pub fn structural_target(mut self, price: Option<f64>) -> Self {
        if let Some(p) = finite(price) {
            self.targets.push(Target::structural(p));
        }
        self
    }

    pub fn volatility_target(mut self, price: f64) -> Self {
        if price.is_finite() {
            self.targets.push(Target::volatility(price));
        }
        self
    }
}

/// Sanitized trade geometry, rounded to cents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Levels {
    pub entry: f64,
    pub sl: f64,
    pub tp1: f64,
    pub tp2: f64,
    pub tp3: f64,
}

impl Levels {
    pub fn risk(&self) -> f64 {
        (self.entry - self.sl).abs()
    }

    pub fn targets(&self) -> [f64; 3] {
        [self.tp1, self.tp2, self.tp3]
    }

    /// Reward-to-risk at the first target; 0 when risk is 0.
    pub fn risk_reward(&self) -> f64 {
        let risk = self.risk();
        if risk > 0.0 {
            (self.tp1 - self.entry).abs() / risk
        } else {
            0.0
        }
    }

    /// `sl < entry < tp1 < tp2 < tp3` for BUY, mirrored for SELL.
    pub fn is_ordered(&self, action: Action) -> bool {
        let chain = [self.sl, self.entry, self.tp1, self.tp2, self.tp3];
        match action {
            Action::Buy => chain.windows(2).all(|w| w[0] < w[1]),
            Action::Sell => chain.windows(2).all(|w| w[0] > w[1]),
            Action::NoTrade => false,
        }
    }
}

/// Clamps stops and targets into volatility bands around entry.
pub struct LevelSanitizer<'a> {
    cfg: &'a LevelConfig,
}

impl<'a> LevelSanitizer<'a> {
    pub fn new(cfg: &'a LevelConfig) -> Self {
        Self { cfg }
    }

    fn fallback_reference(&self, entry: f64) -> f64 {
        (entry * self.cfg.reference_fallback_fraction).max(self.cfg.reference_fallback_min)
    }

    /// Returns `None` for NO_TRADE, a missing or non-positive entry, or
    /// levels that would cross zero.
    pub fn sanitize(&self, req: &LevelRequest, atr: &AtrRefs) -> Option<Levels> {
        if !req.action.is_directional() {
            return None;
        }
        let entry = positive(Some(req.entry))?;
        let sign = req.action.sign();
        let fallback = self.fallback_reference(entry);
        let reference = positive(atr.h1)
            .or_else(|| positive(Some(atr.m5)))
            .unwrap_or(fallback);
        let reference_tp = positive(Some(atr.m5)).unwrap_or(fallback);

        // Stop
        let stop_min = (self.cfg.stop_min_ref_mult * reference).max(self.cfg.stop_min_abs);
        let stop_max = (self.cfg.stop_max_ref_mult * reference)
            .min(self.cfg.stop_max_abs)
            .max(stop_min);
        let adverse_distance = |level: Option<f64>| {
            finite(level)
                .map(|l| sign * (entry - l))
                .filter(|d| *d > 0.0)
        };
        let stop_distance = adverse_distance(req.stop)
            .or_else(|| adverse_distance(req.adverse_level))
            .unwrap_or(reference)
            .clamp(stop_min, stop_max);

        // Targets by distance from entry, profit side only.
        let mut candidates: Vec<(f64, bool)> = req
            .targets
            .iter()
            .filter(|t| t.price.is_finite())
            .map(|t| (sign * (t.price - entry), t.structural))
            .filter(|(d, _)| *d > 0.0)
            .collect();
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

        let tp1_min = (self.cfg.tp1_min_ref_mult * reference_tp).max(self.cfg.tp1_min_abs);
        let tp1_max = (self.cfg.tp1_max_ref_mult * reference_tp)
            .min(self.cfg.tp1_max_abs)
            .max(tp1_min);
        let d1 = match candidates.first() {
            Some(&(d, true)) if d > tp1_max => d,
            Some(&(d, _)) => d.clamp(tp1_min, tp1_max),
            None => reference_tp.clamp(tp1_min, tp1_max),
        };

        let next_tier = |prev: f64| {
            let floor = prev + self.cfg.tier_gap;
            candidates
                .iter()
                .filter(|(d, s)| *s && *d >= floor)
                .map(|(d, _)| *d)
                .next()
                .or_else(|| candidates.iter().map(|(d, _)| *d).find(|d| *d >= floor))
                .unwrap_or(floor)
        };
        let d2 = next_tier(d1);
        let d3 = next_tier(d2);

        let mut targets = [
            round2(entry + sign * d1),
            round2(entry + sign * d2),
            round2(entry + sign * d3),
        ];
        match req.action {
            Action::Sell => targets.sort_by(|a, b| b.total_cmp(a)),
            _ => targets.sort_by(|a, b| a.total_cmp(b)),
        }

        let levels = Levels {
            entry: round2(entry),
            sl: round2(entry - sign * stop_distance),
            tp1: targets[0],
            tp2: targets[1],
            tp3: targets[2],
        };

        let positive_prices = [levels.sl, levels.tp1, levels.tp2, levels.tp3]
            .iter()
            .all(|p| *p > 0.0);
        if !positive_prices || !levels.is_ordered(req.action) {
            tracing::warn!("[LEVELS] {} @ {:.2}: could not order levels", req.action, entry);
            return None;
        }
        Some(levels)
    }
}

/// The first geometry rule a candidate failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryCheck {
    Ordering,
    StopDistance,
    Tp1Distance,
    TierGap,
    RewardRisk,
}

impl fmt::Display for GeometryCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryCheck::Ordering => write!(f, "ordering"),
            GeometryCheck::StopDistance => write!(f, "stop_distance"),
            GeometryCheck::Tp1Distance => write!(f, "tp1_distance"),
            GeometryCheck::TierGap => write!(f, "tier_gap"),
            GeometryCheck::RewardRisk => write!(f, "reward_risk"),
        }
    }
}

pub fn validate_geometry(
    levels: &Levels,
    action: Action,
    atr_m5: f64,
    cfg: &ValidationConfig,
) -> Result<(), GeometryCheck> {
    if !levels.is_ordered(action) {
        return Err(GeometryCheck::Ordering);
    }
    let risk = levels.risk();
    if risk <= 0.0 || risk > cfg.max_stop_distance {
        return Err(GeometryCheck::StopDistance);
    }
    if (levels.tp1 - levels.entry).abs() < cfg.min_tp1_atr_mult * atr_m5 {
        return Err(GeometryCheck::Tp1Distance);
    }
    let gaps_ok = (levels.tp2 - levels.tp1).abs() >= cfg.min_tier_gap
        && (levels.tp3 - levels.tp2).abs() >= cfg.min_tier_gap;
    if !gaps_ok {
        return Err(GeometryCheck::TierGap);
    }
    if (levels.tp3 - levels.entry).abs() < cfg.min_reward_risk * risk {
        return Err(GeometryCheck::RewardRisk);
    }
    Ok(())
}

/// Targets rebuilt purely from entry and risk, ignoring structure.
pub fn rederive_targets(levels: &Levels, action: Action, cfg: &ValidationConfig) -> Levels {
    let sign = action.sign();
    let risk = levels.risk();
    let [m1, m2, m3] = cfg.rederive_multiples;
    Levels {
        tp1: round2(levels.entry + sign * risk * m1),
        tp2: round2(levels.entry + sign * risk * m2),
        tp3: round2(levels.entry + sign * risk * m3),
        ..*levels
    }
}

/// Validates, and on failure tries one re-derivation. The returned flag is
/// true when the re-derived targets were used.
pub fn validate_or_rederive(
    levels: &Levels,
    action: Action,
    atr_m5: f64,
    cfg: &ValidationConfig,
) -> Result<(Levels, bool), GeometryCheck> {
    match validate_geometry(levels, action, atr_m5, cfg) {
        Ok(()) => Ok((*levels, false)),
        Err(first) => {
            tracing::debug!("[LEVELS] geometry failed ({}), re-deriving targets", first);
            let rebuilt = rederive_targets(levels, action, cfg);
            validate_geometry(&rebuilt, action, atr_m5, cfg).map(|()| (rebuilt, true))
        }
    }
}
