//! The fetch → validate → extract → render driver.

use tracing::{debug, info};

use crate::{
    chart::ChartRenderer,
    error::ForecastError,
    extract::extract_samples,
    model::{ChartArtifact, ForecastRequest, ForecastResponse},
    provider::ForecastProvider,
};

/// One run produces one chart from one city, or nothing at all.
#[derive(Debug)]
pub struct ForecastPipeline<'a> {
    provider: &'a dyn ForecastProvider,
    renderer: &'a dyn ChartRenderer,
}

impl<'a> ForecastPipeline<'a> {
    pub fn new(provider: &'a dyn ForecastProvider, renderer: &'a dyn ChartRenderer) -> Self {
        Self { provider, renderer }
    }

    /// Stops at the first failing stage; later stages never run.
    pub async fn run(&self, request: &ForecastRequest) -> Result<ChartArtifact, ForecastError> {
        let response = self.provider.fetch(request).await?;
        ensure_city_found(&response, &request.city)?;

        if let Some(city) = &response.city {
            debug!(name = %city.name, country = ?city.country, "provider resolved city");
        }

        let series = extract_samples(&response)?;
        let artifact = self.renderer.render(&series, &request.city)?;

        info!(city = %request.city, path = %artifact.path.display(), "dashboard run complete");
        Ok(artifact)
    }
}

/// The body carries its own status code; anything but OK means the city was not resolved.
fn ensure_city_found(response: &ForecastResponse, city: &str) -> Result<(), ForecastError> {
    if response.cod.is_ok() {
        return Ok(());
    }

    Err(ForecastError::CityNotFound { city: city.to_string(), code: response.cod.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        chart::PngChartRenderer,
        config::ChartConfig,
        error::RenderError,
        model::{ApiKey, ForecastSeries},
        provider::openweather::OpenWeatherProvider,
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::{path::PathBuf, sync::Mutex, time::Duration};
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    #[derive(Debug)]
    struct CannedProvider(serde_json::Value);

    #[async_trait]
    impl ForecastProvider for CannedProvider {
        async fn fetch(&self, _: &ForecastRequest) -> Result<ForecastResponse, ForecastError> {
            serde_json::from_value(self.0.clone()).map_err(ForecastError::Decode)
        }
    }

    /// Records what it was asked to draw instead of drawing it.
    #[derive(Debug, Default)]
    struct RecordingRenderer {
        calls: Mutex<Vec<(ForecastSeries, String)>>,
    }

    impl RecordingRenderer {
        fn calls(&self) -> Vec<(ForecastSeries, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ChartRenderer for RecordingRenderer {
        fn render(&self, series: &ForecastSeries, city: &str) -> Result<ChartArtifact, RenderError> {
            self.calls.lock().unwrap().push((series.clone(), city.to_string()));
            Ok(ChartArtifact {
                path: PathBuf::from(format!("weather_graphs/{city}_weather.png")),
                sample_count: series.len(),
                time_span: series.time_span(),
            })
        }
    }

    fn request(city: &str) -> ForecastRequest {
        ForecastRequest::new(city, ApiKey::new("KEY")).unwrap()
    }

    #[tokio::test]
    async fn ok_response_is_extracted_and_rendered() {
        let provider = CannedProvider(json!({
            "cod": "200",
            "list": [
                { "dt": 1700000000, "main": { "temp": 20.5, "humidity": 60 } },
                { "dt": 1700003600, "main": { "temp": 19.0, "humidity": 65 } }
            ],
            "city": { "name": "Paris", "country": "FR" }
        }));
        let renderer = RecordingRenderer::default();

        let artifact =
            ForecastPipeline::new(&provider, &renderer).run(&request("Paris")).await.unwrap();

        assert_eq!(artifact.path, PathBuf::from("weather_graphs/Paris_weather.png"));
        assert_eq!(artifact.sample_count, 2);

        let calls = renderer.calls();
        assert_eq!(calls.len(), 1);
        let (series, city) = &calls[0];
        assert_eq!(city, "Paris");
        assert_eq!(series.temperatures(), [20.5, 19.0]);
        assert_eq!(series.humidity(), [60.0, 65.0]);
    }

    #[tokio::test]
    async fn non_ok_code_stops_before_rendering() {
        let provider = CannedProvider(json!({ "cod": "404", "message": "city not found" }));
        let renderer = RecordingRenderer::default();

        let err =
            ForecastPipeline::new(&provider, &renderer).run(&request("Atlantis")).await.unwrap_err();

        match &err {
            ForecastError::CityNotFound { city, code } => {
                assert_eq!(city, "Atlantis");
                assert_eq!(code, "404");
            }
            other => panic!("expected CityNotFound, got {other:?}"),
        }
        assert!(err.to_string().contains("City Atlantis not found"));
        assert!(renderer.calls().is_empty());
    }

    #[tokio::test]
    async fn transport_failure_stops_before_rendering() {
        let provider = OpenWeatherProvider::new("http://127.0.0.1:1", Duration::from_secs(5)).unwrap();
        let renderer = RecordingRenderer::default();

        let err =
            ForecastPipeline::new(&provider, &renderer).run(&request("Paris")).await.unwrap_err();

        assert!(matches!(err, ForecastError::Transport(_)), "got {err:?}");
        assert!(std::error::Error::source(&err).is_some());
        assert!(renderer.calls().is_empty());
    }

    #[tokio::test]
    async fn empty_forecast_is_reported_by_the_png_renderer() {
        let provider = CannedProvider(json!({ "cod": "200", "list": [] }));
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("weather_graphs");
        let renderer = PngChartRenderer::new(
            &out,
            ChartConfig { open_viewer: false, ..ChartConfig::default() },
        );

        let err =
            ForecastPipeline::new(&provider, &renderer).run(&request("Paris")).await.unwrap_err();

        assert!(matches!(err, ForecastError::Render(RenderError::NoSamples)), "got {err:?}");
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn end_to_end_over_http() {
        let list: Vec<_> = (0..40)
            .map(|i| {
                json!({
                    "dt": 1700000000 + i * 10800,
                    "main": { "temp": 5.0 + f64::from(i % 8), "humidity": 70 + i % 3 }
                })
            })
            .collect();

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "cod": "200", "list": list })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let provider = OpenWeatherProvider::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let renderer = RecordingRenderer::default();

        let artifact =
            ForecastPipeline::new(&provider, &renderer).run(&request("Berlin")).await.unwrap();

        assert_eq!(artifact.sample_count, 40);
        let calls = renderer.calls();
        let (series, _) = &calls[0];
        assert_eq!(series.timestamps()[39].timestamp(), 1700000000 + 39 * 10800);
        assert_eq!(series.humidity()[4], 71.0);
    }
}
