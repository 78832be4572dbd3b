use crate::{
    Config, ForecastError,
    model::{ForecastRequest, ForecastResponse},
    provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

/// A source of raw forecast data.
///
/// Implementations perform exactly one request per call and never retry.
#[async_trait]
pub trait ForecastProvider: Send + Sync + Debug {
    async fn fetch(&self, request: &ForecastRequest) -> Result<ForecastResponse, ForecastError>;
}

/// Construct the OpenWeather provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn ForecastProvider>> {
    let provider = OpenWeatherProvider::new(&config.base_url, config.timeout())?;
    Ok(Box::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_from_default_config_builds() {
        let cfg = Config::default();
        let provider = provider_from_config(&cfg).expect("default config must build a provider");
        assert!(format!("{provider:?}").contains("OpenWeatherProvider"));
    }

    #[test]
    fn provider_from_config_rejects_bad_base_url() {
        let cfg = Config { base_url: "not a url".into(), ..Config::default() };
        let err = provider_from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("Invalid provider base URL"));
    }
}
