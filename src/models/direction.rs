use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
    #[serde(rename = "NO_TRADE")]
    NoTrade,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::NoTrade => "NO_TRADE",
        }
    }

    pub fn is_directional(self) -> bool {
        !matches!(self, Action::NoTrade)
    }

    pub fn opposite(self) -> Action {
        match self {
            Action::Buy => Action::Sell,
            Action::Sell => Action::Buy,
            Action::NoTrade => Action::NoTrade,
        }
    }

    /// The trend a directional action trades with.
    pub fn trend(self) -> Trend {
        match self {
            Action::Buy => Trend::Bullish,
            Action::Sell => Trend::Bearish,
            Action::NoTrade => Trend::Neutral,
        }
    }

    /// +1 for BUY, -1 for SELL, 0 otherwise. Multiplies distances from entry.
    pub fn sign(self) -> f64 {
        match self {
            Action::Buy => 1.0,
            Action::Sell => -1.0,
            Action::NoTrade => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Bullish,
    Bearish,
    Neutral,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Bullish => write!(f, "bullish"),
            Trend::Bearish => write!(f, "bearish"),
            Trend::Neutral => write!(f, "neutral"),
        }
    }
}

impl Trend {
    pub fn opposite(self) -> Trend {
        match self {
            Trend::Bullish => Trend::Bearish,
            Trend::Bearish => Trend::Bullish,
            Trend::Neutral => Trend::Neutral,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwingType {
    High,
    Low,
}

impl fmt::Display for SwingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwingType::High => write!(f, "high"),
            SwingType::Low => write!(f, "low"),
        }
    }
}

/// Label derived from the two most recent swing highs and lows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructureLabel {
    #[serde(rename = "HH-HL")]
    HhHl,
    #[serde(rename = "LH-LL")]
    LhLl,
    #[serde(rename = "mixed")]
    Mixed,
    #[serde(rename = "none")]
    None_,
}

impl fmt::Display for StructureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructureLabel::HhHl => write!(f, "HH-HL"),
            StructureLabel::LhLl => write!(f, "LH-LL"),
            StructureLabel::Mixed => write!(f, "mixed"),
            StructureLabel::None_ => write!(f, "none"),
        }
    }
}

impl StructureLabel {
    pub fn trend(self) -> Trend {
        match self {
            StructureLabel::HhHl => Trend::Bullish,
            StructureLabel::LhLl => Trend::Bearish,
            _ => Trend::Neutral,
        }
    }

    /// True when the label actively points the other way from `action`.
    pub fn opposes(self, action: Action) -> bool {
        match action {
            Action::Buy => self == StructureLabel::LhLl,
            Action::Sell => self == StructureLabel::HhHl,
            Action::NoTrade => false,
        }
    }

    pub fn supports(self, action: Action) -> bool {
        match action {
            Action::Buy => self == StructureLabel::HhHl,
            Action::Sell => self == StructureLabel::LhLl,
            Action::NoTrade => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShiftKind {
    #[serde(rename = "BOS")]
    Bos,
    #[serde(rename = "CHOCH")]
    Choch,
}

impl fmt::Display for ShiftKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShiftKind::Bos => write!(f, "BOS"),
            ShiftKind::Choch => write!(f, "CHOCH"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepKind {
    Above,
    Below,
    #[serde(rename = "none")]
    None_,
}

impl fmt::Display for SweepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepKind::Above => write!(f, "above"),
            SweepKind::Below => write!(f, "below"),
            SweepKind::None_ => write!(f, "none"),
        }
    }
}

impl SweepKind {
    /// A sweep that hunted stops on the side `action` would be trading into.
    pub fn warns_against(self, action: Action) -> bool {
        matches!(
            (self, action),
            (SweepKind::Above, Action::Buy) | (SweepKind::Below, Action::Sell)
        )
    }

    /// A sweep that cleared liquidity in favour of `action`.
    pub fn confirms(self, action: Action) -> bool {
        matches!(
            (self, action),
            (SweepKind::Below, Action::Buy) | (SweepKind::Above, Action::Sell)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlopeType {
    Up,
    Down,
    Sideways,
}

impl fmt::Display for SlopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlopeType::Up => write!(f, "up"),
            SlopeType::Down => write!(f, "down"),
            SlopeType::Sideways => write!(f, "sideways"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tap {
    Support,
    Resistance,
    #[serde(rename = "none")]
    None_,
}

impl fmt::Display for Tap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tap::Support => write!(f, "support"),
            Tap::Resistance => write!(f, "resistance"),
            Tap::None_ => write!(f, "none"),
        }
    }
}

impl Tap {
    pub fn supports(self, action: Action) -> bool {
        matches!(
            (self, action),
            (Tap::Support, Action::Buy) | (Tap::Resistance, Action::Sell)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DailyBias {
    #[serde(rename = "BUY ONLY")]
    BuyOnly,
    #[serde(rename = "SELL ONLY")]
    SellOnly,
    #[serde(rename = "NEUTRAL")]
    Neutral,
}

impl fmt::Display for DailyBias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DailyBias::BuyOnly => write!(f, "BUY ONLY"),
            DailyBias::SellOnly => write!(f, "SELL ONLY"),
            DailyBias::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

impl DailyBias {
    /// The only action a one-way bias allows, if any.
    pub fn preferred(self) -> Option<Action> {
        match self {
            DailyBias::BuyOnly => Some(Action::Buy),
            DailyBias::SellOnly => Some(Action::Sell),
            DailyBias::Neutral => None,
        }
    }

    pub fn contradicts(self, action: Action) -> bool {
        matches!(
            (self, action),
            (DailyBias::BuyOnly, Action::Sell) | (DailyBias::SellOnly, Action::Buy)
        )
    }

    pub fn is_neutral(self) -> bool {
        self == DailyBias::Neutral
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PremiumDiscount {
    Premium,
    Discount,
    Unknown,
}

impl fmt::Display for PremiumDiscount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PremiumDiscount::Premium => write!(f, "premium"),
            PremiumDiscount::Discount => write!(f, "discount"),
            PremiumDiscount::Unknown => write!(f, "unknown"),
        }
    }
}
