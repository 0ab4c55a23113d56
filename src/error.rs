use thiserror::Error;

use crate::models::Timeframe;

/// Structurally malformed input. Everything else the engine encounters
/// degrades to a NO_TRADE result instead of an error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("{0} series is empty")]
    EmptySeries(Timeframe),

    #[error("{timeframe} series timestamps are not strictly increasing at index {index}")]
    UnorderedSeries { timeframe: Timeframe, index: usize },

    #[error("{timeframe} candle {index} has non-finite or inverted prices")]
    MalformedCandle { timeframe: Timeframe, index: usize },
}
