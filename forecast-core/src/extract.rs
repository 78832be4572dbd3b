use chrono::DateTime;
use tracing::debug;

use crate::{
    error::ForecastError,
    model::{ForecastResponse, ForecastSample, ForecastSeries},
};

/// Turn a provider response into aligned timestamp/temperature/humidity columns.
///
/// Values are copied as-is (the request already asked for metric units) and
/// provider order is kept. An empty sample list gives an empty series.
pub fn extract_samples(response: &ForecastResponse) -> Result<ForecastSeries, ForecastError> {
    let mut series = ForecastSeries::with_capacity(response.list.len());

    for entry in &response.list {
        let timestamp =
            DateTime::from_timestamp(entry.dt, 0).ok_or(ForecastError::InvalidTimestamp(entry.dt))?;

        series.push(ForecastSample {
            timestamp,
            temperature_c: entry.main.temp,
            humidity_pct: entry.main.humidity,
        });
    }

    debug!(samples = series.len(), "extracted forecast samples");

    Ok(series)
}
