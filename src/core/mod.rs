pub mod bias;
pub mod channel;
pub mod context;
pub mod discretionary;
pub mod levels;
pub mod liquidity;
pub mod momentum;
pub mod numeric;
pub mod reversal;
pub mod structure;
pub mod zones;
