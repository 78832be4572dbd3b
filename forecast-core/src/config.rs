use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::model::ApiKey;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const DEFAULT_OUTPUT_DIR: &str = "weather_graphs";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Figure geometry and presentation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub width_in: f64,
    pub height_in: f64,
    pub dpi: u32,
    /// Open the saved PNG in the desktop image viewer.
    pub open_viewer: bool,
    /// TrueType/OpenType font for chart text; system locations are searched when unset.
    pub font_path: Option<PathBuf>,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self { width_in: 14.0, height_in: 6.0, dpi: 300, open_viewer: true, font_path: None }
    }
}

impl ChartConfig {
    /// Pixel size of the whole figure.
    pub fn pixel_size(&self) -> (u32, u32) {
        let dpi = f64::from(self.dpi);
        ((self.width_in * dpi).round() as u32, (self.height_in * dpi).round() as u32)
    }

    /// Rejects geometry that cannot produce an image.
    pub fn validate(&self) -> Result<()> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.width_in) || !positive(self.height_in) {
            bail!(
                "Chart size must be positive, got {} x {} inches",
                self.width_in,
                self.height_in
            );
        }
        if self.dpi == 0 {
            bail!("Chart dpi must be greater than zero");
        }

        let (width, height) = self.pixel_size();
        if width < 2 || height == 0 {
            bail!("Chart is only {width}x{height} px; increase the size or dpi");
        }

        Ok(())
    }

    /// Converts a point size to pixels at the configured DPI.
    pub fn points(&self, pt: f64) -> f64 {
        pt * f64::from(self.dpi) / 72.0
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// timeout_secs = 30
///
/// [chart]
/// dpi = 150
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<ApiKey>,
    pub base_url: String,
    pub timeout_secs: u64,
    pub output_dir: PathBuf,
    pub chart: ChartConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            chart: ChartConfig::default(),
        }
    }
}

impl Config {
    /// Return the configured API key or explain how to set one.
    pub fn api_key(&self) -> Result<&ApiKey> {
        self.api_key.as_ref().ok_or_else(|| {
            anyhow!(
                "No API key configured.\n\
                 Hint: run `weather-dashboard configure` and enter your OpenWeather API key."
            )
        })
    }

    pub fn set_api_key(&mut self, api_key: ApiKey) {
        self.api_key = Some(api_key);
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Load config from the default location, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        cfg.chart.validate().with_context(|| {
            format!("Invalid [chart] settings in config file: {}", path.display())
        })?;

        Ok(cfg)
    }

    /// Save config to the default location, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-dashboard", "weather-dashboard")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
