use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::{
    error::ForecastError,
    model::{ForecastRequest, ForecastResponse},
};

use super::ForecastProvider;

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    forecast_url: Url,
    timeout: Duration,
    http: Client,
}

impl OpenWeatherProvider {
    /// `base_url` is the API root, e.g. `https://api.openweathermap.org/data/2.5`.
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let forecast_url = format!("{}/forecast", base_url.trim_end_matches('/'));
        let forecast_url = Url::parse(&forecast_url)
            .with_context(|| format!("Invalid provider base URL: {base_url}"))?;

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { forecast_url, timeout, http })
    }

    fn transport_error(&self, err: reqwest::Error) -> ForecastError {
        if err.is_timeout() {
            ForecastError::Timeout { timeout: self.timeout }
        } else {
            ForecastError::Transport(err)
        }
    }
}

#[async_trait]
impl ForecastProvider for OpenWeatherProvider {
    async fn fetch(&self, request: &ForecastRequest) -> Result<ForecastResponse, ForecastError> {
        debug!(city = %request.city, url = %self.forecast_url, "requesting 5-day forecast");

        let res = self
            .http
            .get(self.forecast_url.clone())
            .query(&[
                ("q", request.city.as_str()),
                ("appid", request.credential.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = res.status();
        let body = res.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(ForecastError::HttpStatus { status, message: error_message(&body) });
        }

        let parsed: ForecastResponse = serde_json::from_str(&body).map_err(ForecastError::Decode)?;

        debug!(code = %parsed.cod, samples = parsed.list.len(), "forecast received");

        Ok(parsed)
    }
}

#[derive(Debug, Deserialize)]
struct OwErrorBody {
    message: String,
}

/// OpenWeather error bodies look like `{"cod":"401","message":"Invalid API key..."}`.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<OwErrorBody>(body) {
        Ok(err) => err.message,
        Err(_) => truncate_body(body),
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
