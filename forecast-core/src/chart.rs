//! PNG rendering of a forecast series as two side-by-side line charts.

use std::{
    fmt::{Debug, Display},
    fs,
    ops::Range,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use chrono::{DateTime, TimeDelta, Utc};
use plotters::{
    coord::{Shift, types::RangedDateTime},
    prelude::*,
    style::{
        FontStyle, FontTransform, register_font,
        text_anchor::{HPos, Pos, VPos},
    },
};
use tracing::{debug, info, warn};

use crate::{
    config::{ChartConfig, Config},
    error::RenderError,
    model::{ChartArtifact, ForecastSeries},
};

const FONT_FAMILY: &str = "sans-serif";
const MAX_X_TICKS: usize = 12;

/// Pixel extent `(x, y)` of a panel's plotting area in the output image.
type PixelRect = (Range<i32>, Range<i32>);

/// Searched in order when no font is configured.
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Font registration is process-wide in plotters, so it happens once.
static REGISTERED_FONT: OnceLock<Option<PathBuf>> = OnceLock::new();

pub trait ChartRenderer: Send + Sync + Debug {
    fn render(&self, series: &ForecastSeries, city: &str) -> Result<ChartArtifact, RenderError>;
}

/// Writes `<output_dir>/<city>_weather.png` and optionally opens it in the
/// desktop image viewer.
#[derive(Debug, Clone)]
pub struct PngChartRenderer {
    output_dir: PathBuf,
    chart: ChartConfig,
}

struct Panel<'a> {
    title: String,
    y_desc: &'a str,
    color: RGBColor,
}

impl PngChartRenderer {
    pub fn new(output_dir: impl Into<PathBuf>, chart: ChartConfig) -> Self {
        Self { output_dir: output_dir.into(), chart }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.output_dir.clone(), config.chart.clone())
    }

    /// Skip the viewer regardless of configuration.
    pub fn without_viewer(mut self) -> Self {
        self.chart.open_viewer = false;
        self
    }

    pub fn artifact_path(&self, city: &str) -> PathBuf {
        artifact_path(&self.output_dir, city)
    }

    fn draw(
        &self,
        series: &ForecastSeries,
        city: &str,
        path: &Path,
    ) -> Result<[PixelRect; 2], RenderError> {
        let (width, height) = self.chart.pixel_size();
        let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let (left, right) = root.split_horizontally(width / 2);

        let temperature = Panel {
            title: format!("Temperature Trend in {city}"),
            y_desc: "Temperature (°C)",
            color: RED,
        };
        let left_plot =
            draw_panel(&left, &self.chart, &temperature, series.timestamps(), series.temperatures())?;

        let humidity = Panel {
            title: format!("Humidity Trend in {city}"),
            y_desc: "Humidity (%)",
            color: BLUE,
        };
        let right_plot =
            draw_panel(&right, &self.chart, &humidity, series.timestamps(), series.humidity())?;

        root.present().map_err(draw_err)?;
        Ok([left_plot, right_plot])
    }
}

impl ChartRenderer for PngChartRenderer {
    fn render(&self, series: &ForecastSeries, city: &str) -> Result<ChartArtifact, RenderError> {
        if series.is_empty() {
            return Err(RenderError::NoSamples);
        }

        let (width, height) = self.chart.pixel_size();
        if width < 2 || height == 0 {
            return Err(RenderError::InvalidSize { width, height });
        }

        ensure_font(self.chart.font_path.as_deref())?;

        fs::create_dir_all(&self.output_dir).map_err(|source| RenderError::CreateDir {
            path: self.output_dir.clone(),
            source,
        })?;

        let path = self.artifact_path(city);
        self.draw(series, city, &path)?;
        info!(path = %path.display(), samples = series.len(), "chart saved");

        if self.chart.open_viewer {
            open_in_viewer(&path);
        }

        Ok(ChartArtifact { path, sample_count: series.len(), time_span: series.time_span() })
    }
}

/// `<output_dir>/<city>_weather.png`. Path separators in the city name become
/// `_` so the file always lands directly in `output_dir`.
pub fn artifact_path(output_dir: &Path, city: &str) -> PathBuf {
    let name: String =
        city.chars().map(|c| if matches!(c, '/' | '\\') { '_' } else { c }).collect();
    output_dir.join(format!("{name}_weather.png"))
}

/// Draws one panel and returns the pixel extent of its plotting area.
fn draw_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    chart: &ChartConfig,
    panel: &Panel<'_>,
    timestamps: &[DateTime<Utc>],
    values: &[f64],
) -> Result<PixelRect, RenderError> {
    let x_range = time_range(timestamps).ok_or(RenderError::NoSamples)?;
    let y_range = value_range(values).ok_or(RenderError::NoSamples)?;
    let y_floor = y_range.start;

    let title_font = (FONT_FAMILY, chart.points(14.0));
    let desc_font = (FONT_FAMILY, chart.points(11.0));
    let tick_font = (FONT_FAMILY, chart.points(8.0));

    let mut ctx = ChartBuilder::on(area)
        .caption(&panel.title, title_font)
        .margin(chart.points(10.0) as u32)
        .x_label_area_size(chart.points(80.0) as u32)
        .y_label_area_size(chart.points(48.0) as u32)
        .build_cartesian_2d(RangedDateTime::from(x_range), y_range)
        .map_err(draw_err)?;

    // Date ticks are drawn below, the mesh only contributes grid lines for them.
    ctx.configure_mesh()
        .x_desc("Date and Time")
        .y_desc(panel.y_desc)
        .x_labels(MAX_X_TICKS)
        .x_label_formatter(&|_: &DateTime<Utc>| String::new())
        .y_label_style(tick_font)
        .axis_desc_style(desc_font)
        .light_line_style(RGBColor(238, 238, 238))
        .bold_line_style(RGBColor(210, 210, 210))
        .draw()
        .map_err(draw_err)?;

    // Rotated a quarter turn and anchored at their left edge, so the text hangs
    // down from the axis instead of straddling it.
    let tick_style = TextStyle::from(tick_font.into_font().transform(FontTransform::Rotate90))
        .pos(Pos::new(HPos::Left, VPos::Center));
    let gap = chart.points(4.0) as i32;
    let (base_x, base_y) = area.get_base_pixel();
    for i in tick_indices(timestamps.len(), MAX_X_TICKS) {
        let (x, y) = ctx.backend_coord(&(timestamps[i], y_floor));
        let label = timestamps[i].format("%m-%d %H:%M").to_string();
        area.draw(&Text::new(label, (x - base_x, y - base_y + gap), tick_style.clone()))
            .map_err(draw_err)?;
    }

    let stroke = chart.points(1.5).max(1.0) as u32;
    let marker = chart.points(3.0).max(2.0) as u32;
    let points: Vec<(DateTime<Utc>, f64)> =
        timestamps.iter().copied().zip(values.iter().copied()).collect();

    ctx.draw_series(LineSeries::new(points.iter().copied(), panel.color.stroke_width(stroke)))
        .map_err(draw_err)?;
    ctx.draw_series(points.iter().map(|&p| Circle::new(p, marker, panel.color.filled())))
        .map_err(draw_err)?;

    Ok(ctx.plotting_area().get_pixel_range())
}

/// Every n-th sample, so that at most `max_ticks` labels are drawn.
fn tick_indices(len: usize, max_ticks: usize) -> impl Iterator<Item = usize> {
    let step = len.div_ceil(max_ticks.max(1)).max(1);
    (0..len).step_by(step)
}

/// X extent of the series, widened by an hour each side when it has no width.
fn time_range(timestamps: &[DateTime<Utc>]) -> Option<Range<DateTime<Utc>>> {
    let first = *timestamps.iter().min()?;
    let last = *timestamps.iter().max()?;
    if first == last {
        let pad = TimeDelta::hours(1);
        return Some(first - pad..last + pad);
    }
    Some(first..last)
}

/// Y extent of the series with 5% headroom, or ±1 for a flat line.
fn value_range(values: &[f64]) -> Option<Range<f64>> {
    let (min, max) = values.iter().fold(None, |acc: Option<(f64, f64)>, &v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })?;
    let span = max - min;
    let pad = if span > 0.0 { span * 0.05 } else { 1.0 };
    Some(min - pad..max + pad)
}

fn draw_err(err: impl Display) -> RenderError {
    RenderError::Draw(err.to_string())
}

fn ensure_font(configured: Option<&Path>) -> Result<(), RenderError> {
    match REGISTERED_FONT.get_or_init(|| register_first_font(configured)) {
        Some(_) => Ok(()),
        None => Err(RenderError::FontUnavailable),
    }
}

fn register_first_font(configured: Option<&Path>) -> Option<PathBuf> {
    let candidates =
        configured.map(Path::to_path_buf).into_iter().chain(SYSTEM_FONTS.iter().map(PathBuf::from));

    for path in candidates {
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) => {
                if configured == Some(path.as_path()) {
                    warn!(
                        font = %path.display(),
                        error = %err,
                        "configured chart font could not be read, trying system fonts"
                    );
                }
                continue;
            }
        };
        // plotters keeps a 'static reference to registered font data.
        let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
        match register_font(FONT_FAMILY, FontStyle::Normal, bytes) {
            Ok(()) => {
                debug!(font = %path.display(), "registered chart font");
                return Some(path);
            }
            Err(_) => warn!(font = %path.display(), "unusable font file"),
        }
    }

    None
}

fn open_in_viewer(path: &Path) {
    if let Err(err) = opener::open(path) {
        warn!(path = %path.display(), error = %err, "could not open chart in image viewer");
    }
}
