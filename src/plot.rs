//! # Plot Module
//!
//! Offline rendering of a finished telemetry log.
//!
//! Draws three stacked panels over time (thrust, torque and RPM), each with
//! the commanded PWM on a secondary axis, and saves them as a PNG.

use plotters::prelude::*;
use std::error::Error;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::PlotConfig;
use crate::error::{Result, ThrustStandError};
use crate::telemetry::TelemetryRecord;

/// Lowest PWM shown on the secondary axis (ESC idle pulse width)
const PWM_AXIS_FLOOR: f64 = 1000.0;
/// Headroom above the highest PWM on the secondary axis
const PWM_AXIS_HEADROOM: f64 = 100.0;

const CAPTION_FONT: (&str, i32) = ("sans-serif", 20);
const LINE_WIDTH: u32 = 2;

const THRUST_COLOR: RGBColor = RGBColor(31, 119, 180);
const TORQUE_COLOR: RGBColor = RGBColor(214, 39, 40);
const RPM_COLOR: RGBColor = RGBColor(44, 160, 44);
const PWM_COLOR: RGBColor = RGBColor(255, 127, 14);

struct Panel {
    title: &'static str,
    label: &'static str,
    color: RGBColor,
    value: fn(&TelemetryRecord) -> f64,
}

fn thrust(row: &TelemetryRecord) -> f64 {
    row.thrust_kg
}

fn torque(row: &TelemetryRecord) -> f64 {
    row.torque_nm
}

fn rpm(row: &TelemetryRecord) -> f64 {
    row.rpm
}

const PANELS: [Panel; 3] = [
    Panel {
        title: "Thrust vs PWM",
        label: "Thrust (kg)",
        color: THRUST_COLOR,
        value: thrust,
    },
    Panel {
        title: "Torque vs PWM",
        label: "Torque (N*m)",
        color: TORQUE_COLOR,
        value: torque,
    },
    Panel {
        title: "RPM vs PWM",
        label: "RPM",
        color: RPM_COLOR,
        value: rpm,
    },
];

/// Read every parseable row of a log file as records
///
/// Rows that do not deserialize are skipped with a warning.
///
/// # Errors
///
/// Returns error if the file cannot be opened or has no header
pub fn read_log<P: AsRef<Path>>(path: P) -> Result<Vec<TelemetryRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path.as_ref())?;

    let mut rows = Vec::new();
    for (idx, result) in reader.deserialize::<TelemetryRecord>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            // +2: header line plus 1-based numbering
            Err(e) => warn!("Skipping log line {}: {}", idx + 2, e),
        }
    }
    Ok(rows)
}

/// Secondary-axis range for PWM: from the ESC idle floor to just above the peak
///
/// The floor drops below 1000 µs when the log holds lower values so the
/// axis never inverts.
pub fn pwm_axis_range(rows: &[TelemetryRecord]) -> Range<f64> {
    let max = rows.iter().map(|r| r.pwm).max().unwrap_or(0) as f64;
    let min = rows.iter().map(|r| r.pwm).min().unwrap_or(0) as f64;
    PWM_AXIS_FLOOR.min(min)..(max + PWM_AXIS_HEADROOM)
}

/// Range of `values` with 10% padding, or a fixed pad when flat
fn padded_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return 0.0..1.0;
    }
    let span = max - min;
    let pad = if span < 1e-6 { 0.5 } else { span * 0.1 };
    (min - pad)..(max + pad)
}

fn time_range(rows: &[TelemetryRecord]) -> Range<f64> {
    let end = rows.iter().map(TelemetryRecord::time_s).fold(0.0, f64::max);
    0.0..if end > 0.0 { end } else { 1.0 }
}

/// Render the log at `input` to `config.output_file`
///
/// # Errors
///
/// * [`ThrustStandError::EmptyLog`] when the log has no rows
/// * [`ThrustStandError::Plot`] when drawing fails
///
/// # Examples
///
/// ```no_run
/// use thrust_stand::config::PlotConfig;
/// use thrust_stand::plot::render_log;
///
/// let png = render_log("thrust_data.csv".as_ref(), &PlotConfig::default())?;
/// println!("saved {}", png.display());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn render_log(input: &Path, config: &PlotConfig) -> Result<PathBuf> {
    let rows = read_log(input)?;
    if rows.is_empty() {
        return Err(ThrustStandError::EmptyLog(input.display().to_string()));
    }

    let output = PathBuf::from(&config.output_file);
    draw_panels(&rows, &output, (config.width, config.height))
        .map_err(|e| ThrustStandError::Plot(e.to_string()))?;

    info!("Plotted {} rows to {}", rows.len(), output.display());
    Ok(output)
}

fn draw_panels(
    rows: &[TelemetryRecord],
    output: &Path,
    size: (u32, u32),
) -> std::result::Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(output, size).into_drawing_area();
    root.fill(&WHITE)?;

    let x_range = time_range(rows);
    let pwm_range = pwm_axis_range(rows);
    let pwm_points: Vec<(f64, f64)> = rows.iter().map(|r| (r.time_s(), r.pwm as f64)).collect();

    let areas = root.split_evenly((PANELS.len(), 1));
    for (area, panel) in areas.iter().zip(PANELS.iter()) {
        let points: Vec<(f64, f64)> = rows.iter().map(|r| (r.time_s(), (panel.value)(r))).collect();
        let y_range = padded_range(points.iter().map(|&(_, y)| y));

        let mut chart = ChartBuilder::on(area)
            .caption(panel.title, CAPTION_FONT)
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .right_y_label_area_size(60)
            .build_cartesian_2d(x_range.clone(), y_range)?
            .set_secondary_coord(x_range.clone(), pwm_range.clone());

        chart
            .configure_mesh()
            .x_desc("Time (s)")
            .y_desc(panel.label)
            .axis_desc_style(("sans-serif", 15).into_font().color(&panel.color))
            .draw()?;

        chart
            .configure_secondary_axes()
            .y_desc("PWM (µs)")
            .draw()?;

        chart.draw_series(LineSeries::new(points, panel.color.stroke_width(LINE_WIDTH)))?;
        chart.draw_secondary_series(LineSeries::new(
            pwm_points.iter().copied(),
            PWM_COLOR.stroke_width(LINE_WIDTH),
        ))?;
    }

    root.present()?;
    Ok(())
}
