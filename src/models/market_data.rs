use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::models::{CandleSeries, Timeframe};

/// Four time-aligned candle series for one instrument, fastest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketData {
    pub m5: CandleSeries,
    pub m15: CandleSeries,
    pub h1: CandleSeries,
    pub h4: CandleSeries,
}

impl MarketData {
    pub fn new(m5: CandleSeries, m15: CandleSeries, h1: CandleSeries, h4: CandleSeries) -> Self {
        Self { m5, m15, h1, h4 }
    }

    pub fn series(&self, tf: Timeframe) -> &CandleSeries {
        match tf {
            Timeframe::M5 => &self.m5,
            Timeframe::M15 => &self.m15,
            Timeframe::H1 => &self.h1,
            Timeframe::H4 => &self.h4,
        }
    }

    /// Rejects structurally malformed input: empty series, timestamps that
    /// are not strictly increasing, or candles with non-finite / inverted
    /// prices. Thin-but-valid data passes.
    pub fn validate(&self) -> Result<(), EngineError> {
        for tf in Timeframe::ALL {
            let series = self.series(tf);
            if series.is_empty() {
                return Err(EngineError::EmptySeries(tf));
            }
            for (index, candle) in series.iter().enumerate() {
                if !candle.is_well_formed() {
                    return Err(EngineError::MalformedCandle { timeframe: tf, index });
                }
                if index > 0 && series[index - 1].timestamp >= candle.timestamp {
                    return Err(EngineError::UnorderedSeries { timeframe: tf, index });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{make_bullish_trend, make_candles};

    fn filled() -> MarketData {
        MarketData::new(
            make_bullish_trend(5, 2600.0),
            make_bullish_trend(5, 2600.0),
            make_bullish_trend(5, 2600.0),
            make_bullish_trend(5, 2600.0),
        )
    }

    #[test]
    fn thin_series_are_valid() {
        assert!(filled().validate().is_ok());
    }

    #[test]
    fn empty_series_is_rejected() {
        let mut data = filled();
        data.h1 = CandleSeries::default();
        assert!(matches!(
            data.validate(),
            Err(EngineError::EmptySeries(Timeframe::H1))
        ));
    }

    #[test]
    fn duplicate_timestamps_are_rejected() {
        let mut data = filled();
        let mut m15 = make_candles(&[(1.0, 2.0, 0.5, 1.5), (1.5, 2.0, 1.0, 1.8)]);
        let first_ts = m15[0].timestamp;
        let mut second = m15[1].clone();
        second.timestamp = first_ts;
        m15 = CandleSeries::new(vec![m15[0].clone(), second]);
        data.m15 = m15;
        assert!(matches!(
            data.validate(),
            Err(EngineError::UnorderedSeries { timeframe: Timeframe::M15, index: 1 })
        ));
    }

    #[test]
    fn inverted_candle_is_rejected() {
        let mut data = filled();
        data.m5 = make_candles(&[(10.0, 9.0, 11.0, 10.0)]);
        assert!(matches!(
            data.validate(),
            Err(EngineError::MalformedCandle { timeframe: Timeframe::M5, index: 0 })
        ));
    }
}
