//! Core library for the `weather-dashboard` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The forecast provider abstraction and its OpenWeather implementation
//! - Sample extraction and PNG chart rendering
//! - The pipeline that ties them together, failing fast with typed errors
//!
//! It is used by `forecast-cli`, but can also be reused by other binaries or services.

pub mod chart;
pub mod config;
pub mod error;
pub mod extract;
pub mod model;
pub mod pipeline;
pub mod provider;

pub use chart::{ChartRenderer, PngChartRenderer, artifact_path};
pub use config::{ChartConfig, Config};
pub use error::{ForecastError, RenderError};
pub use extract::extract_samples;
pub use model::{ApiKey, ChartArtifact, ForecastRequest, ForecastResponse, ForecastSample, ForecastSeries};
pub use pipeline::ForecastPipeline;
pub use provider::{ForecastProvider, provider_from_config};
