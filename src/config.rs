use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::strategies::layers::LayerKind;

/// Window sizes and tolerances for the leaf analyzers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    // Structure
    pub htf_lookback: usize,
    pub htf_window: usize,
    pub m15_structure_lookback: usize,
    pub m5_structure_lookback: usize,
    pub ltf_window: usize,
    pub shift_lookback: usize,
    pub shift_window: usize,

    // Liquidity
    pub sweep_lookback_m15: usize,
    pub sweep_lookback_m5: usize,
    pub pool_lookback: usize,
    pub pool_window: usize,
    pub level_lookback: usize,
    pub level_count: usize,

    // Zones
    pub zone_lookback: usize,
    pub zone_window: usize,
    pub zone_band_pct: f64,
    pub zone_base_confidence: f64,
    pub zone_touch_weight: f64,
    pub order_block_lookback: usize,
    pub order_block_window: usize,

    // Channel
    pub channel_lookback: usize,
    pub channel_tap_pct: f64,

    // Higher-high breakout filter on 5m
    pub breakout_buffer: f64,

    pub discretionary_min_candles: usize,
    pub discretionary_lookback: usize,

    /// Fraction of price used as ATR when neither the indicator nor a
    /// true-range estimate is available.
    pub atr_fallback_fraction: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            htf_lookback: 140,
            htf_window: 3,
            m15_structure_lookback: 120,
            m5_structure_lookback: 80,
            ltf_window: 2,
            shift_lookback: 50,
            shift_window: 2,
            sweep_lookback_m15: 30,
            sweep_lookback_m5: 20,
            pool_lookback: 120,
            pool_window: 2,
            level_lookback: 80,
            level_count: 5,
            zone_lookback: 120,
            zone_window: 3,
            zone_band_pct: 0.002,
            zone_base_confidence: 40.0,
            zone_touch_weight: 15.0,
            order_block_lookback: 60,
            order_block_window: 2,
            channel_lookback: 60,
            channel_tap_pct: 0.006,
            breakout_buffer: 0.5,
            discretionary_min_candles: 50,
            discretionary_lookback: 120,
            atr_fallback_fraction: 0.003,
        }
    }
}

/// Thresholds shared by the layer gates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// ADX below this is the blocked tier.
    pub adx_min: f64,
    /// ADX at or above this is the high tier.
    pub adx_strong: f64,
    pub zone_confidence_min: f64,
    /// Confidence multiplier for relaxed layers trading through weak momentum.
    pub relaxed_confidence_factor: f64,
    /// Opposing zones at or above this confidence veto a candidate inside them.
    pub opposing_zone_veto: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            adx_min: 20.0,
            adx_strong: 25.0,
            zone_confidence_min: 50.0,
            relaxed_confidence_factor: 0.8,
            opposing_zone_veto: 85.0,
        }
    }
}

/// Stop and target bands applied by the level sanitizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelConfig {
    pub stop_min_ref_mult: f64,
    pub stop_min_abs: f64,
    pub stop_max_ref_mult: f64,
    pub stop_max_abs: f64,
    pub tp1_min_ref_mult: f64,
    pub tp1_min_abs: f64,
    pub tp1_max_ref_mult: f64,
    pub tp1_max_abs: f64,
    pub tier_gap: f64,
    pub reference_fallback_fraction: f64,
    pub reference_fallback_min: f64,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            stop_min_ref_mult: 0.8,
            stop_min_abs: 2.5,
            stop_max_ref_mult: 2.0,
            stop_max_abs: 15.0,
            tp1_min_ref_mult: 0.8,
            tp1_min_abs: 1.5,
            tp1_max_ref_mult: 2.5,
            tp1_max_abs: 20.0,
            tier_gap: 2.0,
            reference_fallback_fraction: 0.001,
            reference_fallback_min: 0.5,
        }
    }
}

/// Final geometry checks run on the consolidated winner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    pub max_stop_distance: f64,
    pub min_tp1_atr_mult: f64,
    pub min_tier_gap: f64,
    pub min_reward_risk: f64,
    /// Target multiples of risk used when re-deriving targets.
    pub rederive_multiples: [f64; 3],
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_stop_distance: 25.0,
            min_tp1_atr_mult: 0.5,
            min_tier_gap: 1.0,
            min_reward_risk: 1.0,
            rederive_multiples: [1.0, 1.5, 2.0],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidatorConfig {
    /// Candidates below this confidence are held back for the fallback chain.
    pub min_confidence: f64,
    /// Strict layers scoring at or above this get the priority flag.
    pub priority_bar: f64,
    pub neutral_bias_factor: f64,
    pub tag_bonus: f64,
    pub momentum_bonus: f64,
    pub confidence_scale: f64,
    pub confidence_bonus_cap: f64,
    pub breakout_sell_penalty: f64,
    pub layer_weights: BTreeMap<LayerKind, f64>,
}

impl Default for ConsolidatorConfig {
    fn default() -> Self {
        Self {
            min_confidence: 50.0,
            priority_bar: 1.5,
            neutral_bias_factor: 0.7,
            tag_bonus: 0.2,
            momentum_bonus: 0.1,
            confidence_scale: 150.0,
            confidence_bonus_cap: 0.6,
            breakout_sell_penalty: 0.4,
            layer_weights: LayerKind::ALL
                .iter()
                .map(|k| (*k, k.default_weight()))
                .collect(),
        }
    }
}

impl ConsolidatorConfig {
    pub fn weight(&self, kind: LayerKind) -> f64 {
        self.layer_weights
            .get(&kind)
            .copied()
            .unwrap_or_else(|| kind.default_weight())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    pub default_band: f64,
    pub layer_bands: BTreeMap<LayerKind, f64>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        let mut layer_bands = BTreeMap::new();
        layer_bands.insert(LayerKind::HumanScalper, 2.0);
        layer_bands.insert(LayerKind::PriceAction, 0.4);
        layer_bands.insert(LayerKind::MomentumBreakout, 0.4);
        layer_bands.insert(LayerKind::LightPriceAction, 0.3);
        layer_bands.insert(LayerKind::UltraLight, 0.3);
        layer_bands.insert(LayerKind::FallbackLight, 0.2);
        Self {
            default_band: 0.5,
            layer_bands,
        }
    }
}

impl GuardConfig {
    pub fn band_for(&self, kind: LayerKind) -> f64 {
        self.layer_bands.get(&kind).copied().unwrap_or(self.default_band)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub symbol: String,
    pub log_level: String,

    /// Evaluate layers on scoped threads instead of sequentially.
    pub parallel_layers: bool,
    /// Enables the light price-action BUY branch (SELL mirror).
    pub light_pa_buy_enabled: bool,

    pub analysis: AnalysisConfig,
    pub gates: GateConfig,
    pub levels: LevelConfig,
    pub validation: ValidationConfig,
    pub consolidator: ConsolidatorConfig,
    pub guard: GuardConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            symbol: "XAUUSD".to_string(),
            log_level: "INFO".to_string(),
            parallel_layers: false,
            light_pa_buy_enabled: false,
            analysis: AnalysisConfig::default(),
            gates: GateConfig::default(),
            levels: LevelConfig::default(),
            validation: ValidationConfig::default(),
            consolidator: ConsolidatorConfig::default(),
            guard: GuardConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let env = |key: &str, default: &str| -> String {
            std::env::var(key).unwrap_or_else(|_| default.to_string())
        };

        let mut cfg = EngineConfig::default();
        cfg.symbol = env("SIGNAL_SYMBOL", "XAUUSD");
        cfg.log_level = env("LOG_LEVEL", "INFO");
        cfg.parallel_layers = env("SIGNAL_PARALLEL_LAYERS", "false").to_lowercase() == "true";
        cfg.light_pa_buy_enabled = env("SIGNAL_LIGHT_PA_BUY", "false").to_lowercase() == "true";
        cfg.gates.adx_min = env("SIGNAL_ADX_MIN", "20").parse().unwrap_or(20.0);
        cfg.gates.zone_confidence_min = env("SIGNAL_ZONE_CONF_MIN", "50").parse().unwrap_or(50.0);
        cfg.guard.default_band = env("SIGNAL_DUPLICATE_BAND", "0.5").parse().unwrap_or(0.5);
        cfg.consolidator.min_confidence = env("SIGNAL_MIN_CONFIDENCE", "50").parse().unwrap_or(50.0);
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_tuned_constants() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.analysis.htf_lookback, 140);
        assert!((cfg.levels.stop_max_abs - 15.0).abs() < 1e-9);
        assert!((cfg.validation.max_stop_distance - 25.0).abs() < 1e-9);
        assert!(!cfg.light_pa_buy_enabled);
    }

    #[test]
    fn every_layer_has_a_weight() {
        let cfg = ConsolidatorConfig::default();
        for kind in LayerKind::ALL {
            assert!(cfg.weight(kind) > 0.0, "{kind} has no weight");
        }
        assert!((cfg.weight(LayerKind::FallbackLight) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn duplicate_bands_fall_back_to_default() {
        let guard = GuardConfig::default();
        assert!((guard.band_for(LayerKind::Scalp) - 0.5).abs() < 1e-9);
        assert!((guard.band_for(LayerKind::FallbackLight) - 0.2).abs() < 1e-9);
        assert!((guard.band_for(LayerKind::HumanScalper) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn config_round_trips_through_json() {
        let cfg = EngineConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.consolidator.layer_weights.len(), LayerKind::ALL.len());
    }
}
