use crate::core::structure::StructureState;
use crate::models::{DailyBias, StructureLabel};

/// One-way bias only when both higher timeframes agree on their label.
pub fn resolve_bias(h4: &StructureState, h1: &StructureState) -> DailyBias {
    match (h4.label, h1.label) {
        (StructureLabel::HhHl, StructureLabel::HhHl) => DailyBias::BuyOnly,
        (StructureLabel::LhLl, StructureLabel::LhLl) => DailyBias::SellOnly,
        _ => DailyBias::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Trend;

    fn state(label: StructureLabel) -> StructureState {
        StructureState {
            label,
            bias: label.trend(),
            ..StructureState::empty()
        }
    }

    #[test]
    fn agreement_sets_one_way_bias() {
        let up = state(StructureLabel::HhHl);
        let down = state(StructureLabel::LhLl);
        assert_eq!(resolve_bias(&up, &up), DailyBias::BuyOnly);
        assert_eq!(resolve_bias(&down, &down), DailyBias::SellOnly);
        assert_eq!(up.bias, Trend::Bullish);
    }

    #[test]
    fn disagreement_or_missing_is_neutral() {
        let up = state(StructureLabel::HhHl);
        let mixed = state(StructureLabel::Mixed);
        assert_eq!(resolve_bias(&up, &mixed), DailyBias::Neutral);
        assert_eq!(resolve_bias(&StructureState::empty(), &up), DailyBias::Neutral);
        assert_eq!(
            resolve_bias(&up, &state(StructureLabel::LhLl)),
            DailyBias::Neutral
        );
    }
}
