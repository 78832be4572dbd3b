use std::{path::PathBuf, time::Duration};

use reqwest::StatusCode;
use thiserror::Error;

/// Every way a single dashboard run can fail. None of these are retried.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("Request to the forecast provider timed out after {}s", .timeout.as_secs_f64())]
    Timeout { timeout: Duration },

    #[error("An error occurred while contacting the forecast provider")]
    Transport(#[source] reqwest::Error),

    #[error("HTTP error occurred: {status}: {message}")]
    HttpStatus { status: StatusCode, message: String },

    #[error("Forecast provider returned a malformed response")]
    Decode(#[source] serde_json::Error),

    #[error("City {city} not found. Please check the spelling. (provider code {code})")]
    CityNotFound { city: String, code: String },

    #[error("Forecast sample has an out-of-range timestamp: {0}")]
    InvalidTimestamp(i64),

    #[error(transparent)]
    Render(#[from] RenderError),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Forecast contains no samples, nothing to plot")]
    NoSamples,

    #[error("Failed to create output directory '{}'", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Chart size {width}x{height} px is too small to draw")]
    InvalidSize { width: u32, height: u32 },

    #[error(
        "No usable font found for chart text.\n\
         Hint: set `font_path` under [chart] in the config file to a .ttf/.otf file."
    )]
    FontUnavailable,

    #[error("Failed to draw chart: {0}")]
    Draw(String),
}
