use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use forecast_core::{
    ApiKey, ChartArtifact, Config, ForecastPipeline, ForecastRequest, PngChartRenderer,
    provider_from_config,
};
use inquire::{Password, PasswordDisplayMode, Text, validator::Validation};
use tracing::debug;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "weather-dashboard",
    version,
    about = "Plot a 5-day temperature and humidity forecast for a city"
)]
pub struct Cli {
    /// Use this config file instead of the platform default.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Without a subcommand, prompts for a city and plots its forecast.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key in the config file.
    Configure,

    /// Fetch and plot the forecast for a city.
    Show {
        /// City name; prompted for when absent.
        city: Option<String>,

        /// Save the chart without opening it in an image viewer.
        #[arg(long)]
        no_open: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config_path = match self.config {
            Some(path) => path,
            None => Config::config_file_path()?,
        };
        let config = Config::load_from(&config_path)?;
        debug!(path = %config_path.display(), "configuration loaded");

        match self.command {
            None => {
                println!("=== Weather Dashboard ===");
                let city = prompt_city()?;
                show(&config, &city, false).await
            }
            Some(Command::Show { city, no_open }) => {
                let city = match city {
                    Some(city) => city,
                    None => prompt_city()?,
                };
                show(&config, &city, no_open).await
            }
            Some(Command::Configure) => configure(config, &config_path),
        }
    }
}

fn prompt_city() -> anyhow::Result<String> {
    Text::new("Enter the city name:")
        .with_validator(|input: &str| {
            if input.trim().is_empty() {
                Ok(Validation::Invalid("City name must not be empty".into()))
            } else {
                Ok(Validation::Valid)
            }
        })
        .prompt()
        .context("Failed to read city name")
}

async fn show(config: &Config, city: &str, no_open: bool) -> anyhow::Result<()> {
    let request = ForecastRequest::new(city, config.api_key()?.clone())?;
    let provider = provider_from_config(config)?;

    let mut renderer = PngChartRenderer::from_config(config);
    if no_open {
        renderer = renderer.without_viewer();
    }

    let artifact = ForecastPipeline::new(provider.as_ref(), &renderer).run(&request).await?;

    println!("Graphs saved as '{}'", artifact.path.display());
    println!("{}", summary(&artifact));
    Ok(())
}

fn configure(mut config: Config, path: &Path) -> anyhow::Result<()> {
    let key = Password::new("OpenWeather API key:")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .prompt()
        .context("Failed to read API key")?;

    let key = key.trim();
    if key.is_empty() {
        bail!("API key must not be empty");
    }

    config.set_api_key(ApiKey::new(key));
    config.save_to(path)?;

    println!("API key saved to {}", path.display());
    Ok(())
}

fn summary(artifact: &ChartArtifact) -> String {
    match artifact.time_span {
        Some((first, last)) => format!(
            "Plotted {} samples from {} to {}",
            artifact.sample_count,
            local(first),
            local(last)
        ),
        None => format!("Plotted {} samples", artifact.sample_count),
    }
}

fn local(t: DateTime<Utc>) -> String {
    t.with_timezone(&Local).format("%a %d %b %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_interactive() {
        let cli = Cli::try_parse_from(["weather-dashboard"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn show_accepts_city_and_flags() {
        let cli = Cli::try_parse_from([
            "weather-dashboard",
            "show",
            "Paris",
            "--no-open",
            "--config",
            "/tmp/weather.toml",
        ])
        .unwrap();

        match cli.command {
            Some(Command::Show { city, no_open }) => {
                assert_eq!(city.as_deref(), Some("Paris"));
                assert!(no_open);
            }
            other => panic!("expected show, got {other:?}"),
        }
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/weather.toml")));
    }

    #[test]
    fn summary_without_span_only_counts() {
        let artifact = ChartArtifact {
            path: PathBuf::from("weather_graphs/Paris_weather.png"),
            sample_count: 0,
            time_span: None,
        };
        assert_eq!(summary(&artifact), "Plotted 0 samples");
    }

    #[tokio::test]
    async fn show_without_api_key_explains_configure() {
        let err = show(&Config::default(), "Paris", true).await.unwrap_err();
        assert!(err.to_string().contains("weather-dashboard configure"));
    }
}
