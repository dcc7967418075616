//! OHLCV bar representation and input validation.

use chrono::NaiveDate;

use crate::domain::error::GridtraderError;

#[derive(Debug, Clone)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl Bar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

/// Check that an instrument's bar sequence satisfies the input contract:
/// non-empty, strictly increasing dates, every price field finite.
///
/// A violation is fatal for that instrument only; callers skip the symbol
/// and continue with the rest of the run.
pub fn validate_bars(symbol: &str, bars: &[Bar]) -> Result<(), GridtraderError> {
    if bars.is_empty() {
        return Err(GridtraderError::NoData {
            symbol: symbol.to_string(),
        });
    }

    for (i, bar) in bars.iter().enumerate() {
        let fields = [bar.open, bar.high, bar.low, bar.close];
        if fields.iter().any(|v| !v.is_finite()) {
            return Err(GridtraderError::DataInvalid {
                symbol: symbol.to_string(),
                reason: format!("non-finite price field on {}", bar.date),
            });
        }
        if i > 0 && bar.date <= bars[i - 1].date {
            return Err(GridtraderError::DataInvalid {
                symbol: symbol.to_string(),
                reason: format!(
                    "bar dates not strictly increasing at {} (previous {})",
                    bar.date,
                    bars[i - 1].date
                ),
            });
        }
    }

    Ok(())
}
