use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provider credential. Kept out of `Debug` output so it never lands in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[derive(Debug, Clone)]
pub struct ForecastRequest {
    pub city: String,
    pub credential: ApiKey,
}

impl ForecastRequest {
    /// Build a request, trimming the city name. Fails when nothing is left.
    pub fn new(city: &str, credential: ApiKey) -> anyhow::Result<Self> {
        let city = city.trim();
        if city.is_empty() {
            anyhow::bail!("City name must not be empty");
        }

        Ok(Self { city: city.to_string(), credential })
    }
}

/// Status code as reported inside the response body. OpenWeather sends it as a
/// string on success (`"200"`) but has been seen to send bare numbers on errors.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ProviderCode {
    Text(String),
    Number(i64),
}

impl ProviderCode {
    pub const OK: &'static str = "200";

    pub fn is_ok(&self) -> bool {
        match self {
            ProviderCode::Text(s) => s == Self::OK,
            ProviderCode::Number(n) => *n == 200,
        }
    }
}

impl fmt::Display for ProviderCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderCode::Text(s) => f.write_str(s),
            ProviderCode::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Raw forecast reply, as returned by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastResponse {
    pub cod: ProviderCode,
    #[serde(default)]
    pub message: Option<serde_json::Value>,
    #[serde(default)]
    pub city: Option<ForecastCity>,
    #[serde(default)]
    pub list: Vec<RawSample>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastCity {
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSample {
    pub dt: i64,
    pub main: RawMain,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMain {
    pub temp: f64,
    pub humidity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastSample {
    pub timestamp: DateTime<Utc>,
    pub temperature_c: f64,
    pub humidity_pct: f64,
}

/// Index-aligned columns extracted from a response, in provider order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastSeries {
    timestamps: Vec<DateTime<Utc>>,
    temperatures: Vec<f64>,
    humidity: Vec<f64>,
}

impl ForecastSeries {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            timestamps: Vec::with_capacity(capacity),
            temperatures: Vec::with_capacity(capacity),
            humidity: Vec::with_capacity(capacity),
        }
    }

    /// Appends one sample to all three columns at once, which keeps them aligned.
    pub fn push(&mut self, sample: ForecastSample) {
        self.timestamps.push(sample.timestamp);
        self.temperatures.push(sample.temperature_c);
        self.humidity.push(sample.humidity_pct);
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn temperatures(&self) -> &[f64] {
        &self.temperatures
    }

    pub fn humidity(&self) -> &[f64] {
        &self.humidity
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn samples(&self) -> impl Iterator<Item = ForecastSample> + '_ {
        self.timestamps
            .iter()
            .zip(&self.temperatures)
            .zip(&self.humidity)
            .map(|((&timestamp, &temperature_c), &humidity_pct)| ForecastSample {
                timestamp,
                temperature_c,
                humidity_pct,
            })
    }

    /// Earliest and latest timestamps. Provider order is not assumed to be sorted.
    pub fn time_span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = *self.timestamps.iter().min()?;
        let last = *self.timestamps.iter().max()?;
        Some((first, last))
    }
}

impl FromIterator<ForecastSample> for ForecastSeries {
    fn from_iter<I: IntoIterator<Item = ForecastSample>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut series = Self::with_capacity(iter.size_hint().0);
        for sample in iter {
            series.push(sample);
        }
        series
    }
}

/// The PNG written by one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartArtifact {
    pub path: std::path::PathBuf,
    pub sample_count: usize,
    /// Earliest and latest plotted timestamps.
    pub time_span: Option<(DateTime<Utc>, DateTime<Utc>)>,
}
