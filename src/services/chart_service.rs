use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use plotters::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{AxisLabelFormat, PricePoint, PriceSeries, RangeBucket};
use crate::utils::format::{format_axis_usd, format_usd};

/// Interpolated points inserted between two samples of the smoothed line
const SMOOTHING_SEGMENTS: usize = 8;
/// Stacked fill layers approximating the vertical gradient
const GRADIENT_LAYERS: usize = 5;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("Not enough price data to draw a chart ({0} point(s), need at least 2)")]
    NotEnoughData(usize),
    #[error("Chart backend error: {0}")]
    Backend(String),
}

/// Fixed look of the market chart
#[derive(Debug, Clone, PartialEq)]
pub struct ChartStyle {
    pub line_color: RGBColor,
    pub stroke_width: u32,
    pub smooth: bool,
    /// Fill opacity right under the line
    pub fill_opacity_top: f64,
    /// Fill opacity at the bottom of the plot
    pub fill_opacity_bottom: f64,
    pub label_color: RGBColor,
    pub grid_color: RGBColor,
    pub label_font_size: f64,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            line_color: RGBColor(0x01, 0xA3, 0xFF),
            stroke_width: 2,
            smooth: true,
            fill_opacity_top: 0.4,
            fill_opacity_bottom: 0.1,
            label_color: RGBColor(0x6c, 0x75, 0x7d),
            grid_color: RGBColor(0xe5, 0xe7, 0xeb),
            label_font_size: 12.0,
        }
    }
}

/// The chart instance: data, axis format and style
#[derive(Debug, Clone, PartialEq)]
pub struct PriceChart {
    pub title: String,
    pub series: PriceSeries,
    pub axis_format: AxisLabelFormat,
    pub style: ChartStyle,
}

impl PriceChart {
    /// Tooltip text for a sample, e.g. `19 Oct 2026: $67,123.46`
    pub fn tooltip(point: &PricePoint) -> String {
        format!("{}: {}", point.timestamp.format("%d %b %Y"), format_usd(point.price))
    }

    pub fn latest_tooltip(&self) -> Option<String> {
        self.series.last().map(Self::tooltip)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartState {
    Uninitialized,
    Active(PriceChart),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartTransition {
    Created,
    Updated,
}

/// Where a chart gets drawn
pub trait ChartSurface: Send {
    fn render(&mut self, chart: &PriceChart) -> Result<(), ChartError>;
}

/// Owns the single chart instance and decides between create and update
pub struct ChartController<S> {
    state: ChartState,
    surface: S,
    style: ChartStyle,
}

impl<S: ChartSurface> ChartController<S> {
    pub fn new(surface: S, style: ChartStyle) -> Self {
        Self {
            state: ChartState::Uninitialized,
            surface,
            style,
        }
    }

    pub fn state(&self) -> &ChartState {
        &self.state
    }

    /// Show `series` for `range`, creating the chart on first use and updating
    /// it in place afterwards
    pub fn apply_series(
        &mut self,
        title: &str,
        series: PriceSeries,
        range: RangeBucket,
    ) -> Result<ChartTransition, ChartError> {
        match &mut self.state {
            ChartState::Uninitialized => {
                let chart = PriceChart {
                    title: title.to_string(),
                    series,
                    axis_format: range.label_format(),
                    style: self.style.clone(),
                };
                // A failed first render leaves no instance behind
                self.surface.render(&chart)?;
                info!("📈 Created {} chart ({} points)", chart.title, chart.series.len());
                self.state = ChartState::Active(chart);
                Ok(ChartTransition::Created)
            }
            ChartState::Active(chart) => {
                let updated = PriceChart {
                    title: title.to_string(),
                    series,
                    axis_format: range.label_format(),
                    style: chart.style.clone(),
                };
                // Only what was actually drawn becomes the current chart
                self.surface.render(&updated)?;
                *chart = updated;
                debug!(
                    "Updated {} chart in place ({} points, latest {:?})",
                    chart.title,
                    chart.series.len(),
                    chart.latest_tooltip()
                );
                Ok(ChartTransition::Updated)
            }
        }
    }
}

/// Output settings for the PNG surface
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSettings {
    pub output_path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Renders the chart as an area chart PNG, overwriting the same file each time
pub struct PngSurface {
    settings: ChartSettings,
}

impl PngSurface {
    pub fn new(settings: ChartSettings) -> Self {
        Self { settings }
    }
}

impl ChartSurface for PngSurface {
    fn render(&mut self, chart: &PriceChart) -> Result<(), ChartError> {
        let points = &chart.series.points;
        if points.len() < 2 {
            return Err(ChartError::NotEnoughData(points.len()));
        }

        let style = &chart.style;
        let line: Vec<(DateTime<Utc>, f64)> = if style.smooth {
            smooth_points(points, SMOOTHING_SEGMENTS)
        } else {
            points.iter().map(|p| (p.timestamp, p.price)).collect()
        };

        // Find price range
        let (min_price, max_price) = chart.series.price_bounds().unwrap_or((0.0, 1.0));
        let price_range = (max_price - min_price).max(1e-8);
        let padding = price_range * 0.1;
        let y_min = (min_price - padding).max(0.0);
        let y_max = max_price + padding;

        let x_min = points[0].timestamp;
        let x_max = points[points.len() - 1].timestamp;

        let size = (self.settings.width, self.settings.height);
        let backend = BitMapBackend::new(&self.settings.output_path, size);
        let root = backend.into_drawing_area();
        root.fill(&WHITE)
            .map_err(|e| ChartError::Backend(format!("Failed to fill canvas: {}", e)))?;

        let label_style = ("sans-serif", style.label_font_size)
            .into_font()
            .color(&style.label_color);

        let mut cartesian = ChartBuilder::on(&root)
            .caption(&chart.title, ("sans-serif", 28.0).into_font())
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(80)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)
            .map_err(|e| ChartError::Backend(format!("Failed to build chart: {}", e)))?;

        let axis_pattern = chart.axis_format.pattern();
        cartesian
            .configure_mesh()
            .light_line_style(style.grid_color)
            .bold_line_style(style.grid_color)
            .x_label_style(label_style.clone())
            .y_label_style(label_style)
            .x_label_formatter(&|t: &DateTime<Utc>| t.format(axis_pattern).to_string())
            .y_label_formatter(&|v: &f64| format_axis_usd(*v))
            .draw()
            .map_err(|e| ChartError::Backend(format!("Failed to draw mesh: {}", e)))?;

        // Each layer spans from the line down to a lower copy of it, so the
        // region just under the line is covered by every layer
        let alpha = layer_alpha(style.fill_opacity_top, style.fill_opacity_bottom, GRADIENT_LAYERS);
        for layer in 1..=GRADIENT_LAYERS {
            let depth = layer as f64 / GRADIENT_LAYERS as f64;
            let mut polygon: Vec<(DateTime<Utc>, f64)> = line.clone();
            polygon.extend(line.iter().rev().map(|(t, p)| (*t, p - (p - y_min) * depth)));
            cartesian
                .draw_series(std::iter::once(Polygon::new(
                    polygon,
                    style.line_color.mix(alpha).filled(),
                )))
                .map_err(|e| ChartError::Backend(format!("Failed to draw fill: {}", e)))?;
        }

        cartesian
            .draw_series(LineSeries::new(
                line,
                style.line_color.stroke_width(style.stroke_width),
            ))
            .map_err(|e| ChartError::Backend(format!("Failed to draw line: {}", e)))?;

        root.present()
            .map_err(|e| ChartError::Backend(format!("Failed to render chart: {}", e)))?;

        debug!("Chart written to {}", self.settings.output_path.display());
        Ok(())
    }
}

/// Per-layer opacity so that one layer gives `bottom` and all layers
/// together give roughly `top`
fn layer_alpha(top: f64, bottom: f64, layers: usize) -> f64 {
    if layers <= 1 {
        return top;
    }
    // 1 - (1 - a)^n = top, bounded below by the single-layer opacity
    let a = 1.0 - (1.0 - top).powf(1.0 / layers as f64);
    a.max(bottom.min(top))
}

/// Catmull-Rom interpolation of the samples; passes through every sample
pub fn smooth_points(points: &[PricePoint], segments: usize) -> Vec<(DateTime<Utc>, f64)> {
    if points.len() < 3 || segments < 2 {
        return points.iter().map(|p| (p.timestamp, p.price)).collect();
    }

    let origin = points[0].timestamp;
    let xs: Vec<f64> = points
        .iter()
        .map(|p| (p.timestamp - origin).num_milliseconds() as f64)
        .collect();
    let ys: Vec<f64> = points.iter().map(|p| p.price).collect();
    let n = points.len();

    let mut out = Vec::with_capacity((n - 1) * segments + 1);
    for i in 0..n - 1 {
        let i0 = i.saturating_sub(1);
        let i3 = (i + 2).min(n - 1);
        for s in 0..segments {
            let t = s as f64 / segments as f64;
            let x = catmull_rom(xs[i0], xs[i], xs[i + 1], xs[i3], t);
            let y = catmull_rom(ys[i0], ys[i], ys[i + 1], ys[i3], t);
            // Keep x monotonic so the line never folds back on itself
            let x = x.clamp(xs[i], xs[i + 1]);
            out.push((origin + Duration::milliseconds(x.round() as i64), y));
        }
    }
    out.push((points[n - 1].timestamp, ys[n - 1]));
    out
}

fn catmull_rom(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p1)
        + (-p0 + p2) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t3)
}
