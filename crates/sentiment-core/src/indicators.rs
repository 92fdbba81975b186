//! Technical indicators for the market panel
//!
//! Both series are aligned with the input closes. Positions before the first full
//! window are `None`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use ta::Next;
use ta::indicators::{BollingerBands, SimpleMovingAverage};

/// RSI look-back in candles
pub const RSI_PERIOD: usize = 14;
/// RSI level drawn as the overbought guide
pub const RSI_OVERBOUGHT: f64 = 70.0;
/// RSI level drawn as the oversold guide
pub const RSI_OVERSOLD: f64 = 30.0;
/// Bollinger look-back in candles
pub const BOLLINGER_PERIOD: usize = 20;
/// Bollinger band width in standard deviations
pub const BOLLINGER_STD_DEV: f64 = 2.0;

/// One point of the Bollinger bands
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandPoint {
    /// Upper band
    pub upper: f64,
    /// Moving average
    pub middle: f64,
    /// Lower band
    pub lower: f64,
}

/// RSI from simple rolling means of gains and losses
///
/// Index 0 counts as an unchanged candle, so the first full window ends at index
/// `period - 1`. A window with no movement at all has no RSI; a window without
/// losses is 100.
pub fn rolling_rsi(closes: &[f64], period: usize) -> Result<Vec<Option<f64>>> {
    let mut avg_gain = SimpleMovingAverage::new(period)
        .map_err(|e| Error::MarketData(format!("RSI period {period}: {e}")))?;
    let mut avg_loss = SimpleMovingAverage::new(period)
        .map_err(|e| Error::MarketData(format!("RSI period {period}: {e}")))?;

    let changes = closes
        .first()
        .map(|_| 0.0)
        .into_iter()
        .chain(closes.windows(2).map(|pair| pair[1] - pair[0]));

    Ok(changes
        .enumerate()
        .map(|(i, delta)| {
            let gain = avg_gain.next(delta.max(0.0));
            let loss = avg_loss.next((-delta).max(0.0));

            if i + 1 < period {
                None
            } else if loss == 0.0 {
                (gain > 0.0).then_some(100.0)
            } else {
                Some(100.0 - 100.0 / (1.0 + gain / loss))
            }
        })
        .collect())
}

/// Bollinger bands over `period` candles, `std_dev` standard deviations wide
///
/// The deviation is the sample standard deviation of the window, so `period`
/// must be at least 2.
pub fn bollinger_bands(
    closes: &[f64],
    period: usize,
    std_dev: f64,
) -> Result<Vec<Option<BandPoint>>> {
    if period < 2 {
        return Err(Error::MarketData(format!(
            "Bollinger period {period}: at least 2 candles required"
        )));
    }
    let mut bands = BollingerBands::new(period, std_dev)
        .map_err(|e| Error::MarketData(format!("Bollinger period {period}: {e}")))?;

    // ta reports the population deviation
    let sample_correction = (period as f64 / (period - 1) as f64).sqrt();

    Ok(closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let out = bands.next(close);
            let half_width = (out.upper - out.average) * sample_correction;
            (i + 1 >= period).then_some(BandPoint {
                upper: out.average + half_width,
                middle: out.average,
                lower: out.average - half_width,
            })
        })
        .collect())
}
