pub mod candle;
pub mod direction;
pub mod market_data;
pub mod timeframe;

pub use candle::{highs_max, lows_min, Candle, CandleSeries, Indicators};
pub use direction::*;
pub use market_data::MarketData;
pub use timeframe::Timeframe;
