use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::summary::format_thousands;
use crate::domain::CountryBoundary;
use crate::geometry::{BoundingBox, Polygon, Scaler};
use crate::simulation::SimulationResult;

const CANVAS: (f64, f64) = (1200.0, 1000.0);
const PREVIEW_CANVAS: (f64, f64) = (900.0, 900.0);
/// Room for tick labels and axis titles on every side
const MARGIN: f64 = 100.0;
const TITLE_BAND: f64 = 20.0;
const TITLE_Y: f64 = 40.0;
const TARGET_TICKS: f64 = 8.0;

/// Write an SVG plot of a simulation run
///
/// Layers, bottom to top:
/// - grid with tick labels in meters
/// - country polygon (even-odd fill, so holes stay empty)
/// - dashed bounding box
/// - retained outside samples (red)
/// - retained inside samples (green)
/// - title and legend
pub fn write_svg(
    path: &Path,
    polygon: &Polygon,
    result: &SimulationResult,
    title: &str,
) -> Result<()> {
    let mut writer = create(path)?;
    render_svg(&mut writer, polygon, result, title)?;
    writer.flush()?;
    Ok(())
}

/// Write a quick look at a boundary in geographic degrees, before projection
///
/// Longitude and latitude share one scale, so shapes look as they do on an
/// equirectangular map.
pub fn write_preview_svg(path: &Path, boundary: &CountryBoundary) -> Result<()> {
    let mut writer = create(path)?;
    render_preview_svg(&mut writer, boundary)?;
    writer.flush()?;
    Ok(())
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create plot file: {}", path.display()))?;
    Ok(BufWriter::new(file))
}

pub fn render_svg<W: Write>(
    writer: &mut W,
    polygon: &Polygon,
    result: &SimulationResult,
    title: &str,
) -> Result<()> {
    let bbox = result.bounding_box();
    let scaler = Scaler::fit(bbox, CANVAS, MARGIN, TITLE_BAND);

    write_header(writer, &scaler)?;
    let axes = Axes {
        x_title: "X (meters)",
        y_title: "Y (meters)",
        dashed: false,
    };
    write_grid(writer, &scaler, bbox, &axes, |v, _| format_thousands(v, 0))?;

    let path_data = ring_path(
        &scaler,
        polygon.rings().iter().map(|ring| ring.points().iter().copied()),
    );
    writeln!(
        writer,
        r##"<path d="{}" fill="#add8e6" fill-opacity="0.7" fill-rule="evenodd" stroke="#00008b" stroke-width="1.5"/>"##,
        path_data
    )?;

    // Bounding box
    let (x0, y0) = scaler.scale(bbox.min_x, bbox.max_y);
    writeln!(
        writer,
        r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="none" stroke="red" stroke-width="2" stroke-dasharray="8,4"/>"#,
        x0,
        y0,
        scaler.scale_length(bbox.width()),
        scaler.scale_length(bbox.height())
    )?;

    write_points(writer, &scaler, result.outside_samples(), "red", 1.0, 0.3)?;
    write_points(writer, &scaler, result.inside_samples(), "green", 1.5, 0.5)?;

    write_title(writer, &scaler, title)?;
    write_legend(writer, scaler.canvas().0)?;

    writeln!(writer, "</svg>")?;
    Ok(())
}

pub fn render_preview_svg<W: Write>(writer: &mut W, boundary: &CountryBoundary) -> Result<()> {
    let extent = boundary
        .extent()
        .with_context(|| format!("Boundary of {} is empty", boundary.name))?;
    let bbox = BoundingBox::new(extent.min_lon, extent.min_lat, extent.max_lon, extent.max_lat)
        .with_context(|| format!("Boundary of {} has no extent", boundary.name))?;
    let scaler = Scaler::fit(&bbox, PREVIEW_CANVAS, MARGIN, TITLE_BAND);

    write_header(writer, &scaler)?;
    let axes = Axes {
        x_title: "Longitude",
        y_title: "Latitude",
        dashed: true,
    };
    write_grid(writer, &scaler, &bbox, &axes, format_degrees)?;

    let rings = boundary
        .geometry
        .0
        .iter()
        .flat_map(|polygon| std::iter::once(polygon.exterior()).chain(polygon.interiors()))
        .map(|ring| ring.coords().map(|c| (c.x, c.y)));
    writeln!(
        writer,
        r##"<path d="{}" fill="#e6e6e6" fill-rule="evenodd" stroke="#333333" stroke-width="1"/>"##,
        ring_path(&scaler, rings)
    )?;

    let title = format!("Geographic view: {} (WGS84, degrees)", boundary.name);
    write_title(writer, &scaler, &title)?;

    writeln!(writer, "</svg>")?;
    Ok(())
}

fn write_header<W: Write>(writer: &mut W, scaler: &Scaler) -> Result<()> {
    let (width, height) = scaler.canvas();
    writeln!(
        writer,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    )?;
    writeln!(writer, r#"<rect width="100%" height="100%" fill="white"/>"#)?;
    Ok(())
}

fn write_title<W: Write>(writer: &mut W, scaler: &Scaler, title: &str) -> Result<()> {
    writeln!(
        writer,
        r#"<text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="16" font-weight="bold" text-anchor="middle">{}</text>"#,
        scaler.canvas().0 / 2.0,
        TITLE_Y,
        escape_xml(title)
    )?;
    Ok(())
}

/// One subpath per ring, each closed with `Z`
fn ring_path<R, P>(scaler: &Scaler, rings: R) -> String
where
    R: Iterator<Item = P>,
    P: Iterator<Item = (f64, f64)>,
{
    let mut path_data = String::new();
    for ring in rings {
        for (i, (x, y)) in ring.enumerate() {
            let (px, py) = scaler.scale(x, y);
            path_data.push_str(if i == 0 { "M" } else { "L" });
            path_data.push_str(&format!("{:.2},{:.2} ", px, py));
        }
        path_data.push_str("Z ");
    }
    path_data.trim_end().to_string()
}

struct Axes {
    x_title: &'static str,
    y_title: &'static str,
    dashed: bool,
}

/// Light grid over the drawing extent, tick labels and axis titles
fn write_grid<W, F>(
    writer: &mut W,
    scaler: &Scaler,
    bbox: &BoundingBox,
    axes: &Axes,
    label: F,
) -> Result<()>
where
    W: Write,
    F: Fn(f64, f64) -> String,
{
    let (left, top) = scaler.scale(bbox.min_x, bbox.max_y);
    let (right, bottom) = scaler.scale(bbox.max_x, bbox.min_y);
    let x_step = tick_step(bbox.width());
    let y_step = tick_step(bbox.height());
    let x_ticks = ticks(bbox.min_x, bbox.max_x, x_step);
    let y_ticks = ticks(bbox.min_y, bbox.max_y, y_step);

    let dash = if axes.dashed {
        r#" stroke-dasharray="4,4""#
    } else {
        ""
    };
    writeln!(
        writer,
        r##"<g stroke="#b0b0b0" stroke-width="0.5" stroke-opacity="0.6"{}>"##,
        dash
    )?;
    for &x in &x_ticks {
        let (px, _) = scaler.scale(x, bbox.min_y);
        writeln!(
            writer,
            r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}"/>"#,
            px, top, px, bottom
        )?;
    }
    for &y in &y_ticks {
        let (_, py) = scaler.scale(bbox.min_x, y);
        writeln!(
            writer,
            r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}"/>"#,
            left, py, right, py
        )?;
    }
    writeln!(writer, "</g>")?;

    writeln!(writer, r##"<g font-family="sans-serif" font-size="11" fill="#444444">"##)?;
    for &x in &x_ticks {
        let (px, _) = scaler.scale(x, bbox.min_y);
        writeln!(
            writer,
            r#"<text x="{:.2}" y="{:.2}" text-anchor="middle">{}</text>"#,
            px,
            bottom + 16.0,
            label(x, x_step)
        )?;
    }
    for &y in &y_ticks {
        let (_, py) = scaler.scale(bbox.min_x, y);
        writeln!(
            writer,
            r#"<text x="{:.2}" y="{:.2}" text-anchor="end">{}</text>"#,
            left - 6.0,
            py + 4.0,
            label(y, y_step)
        )?;
    }
    writeln!(writer, "</g>")?;

    let center_x = (left + right) / 2.0;
    let center_y = (top + bottom) / 2.0;
    writeln!(
        writer,
        r#"<text x="{:.2}" y="{:.2}" font-family="sans-serif" font-size="12" text-anchor="middle">{}</text>"#,
        center_x,
        bottom + 40.0,
        axes.x_title
    )?;
    let title_x = left - 80.0;
    writeln!(
        writer,
        r#"<text x="{x:.2}" y="{y:.2}" font-family="sans-serif" font-size="12" text-anchor="middle" transform="rotate(-90 {x:.2} {y:.2})">{t}</text>"#,
        x = title_x,
        y = center_y,
        t = axes.y_title
    )?;
    Ok(())
}

/// Round step (1, 2 or 5 times a power of ten) giving about eight ticks
fn tick_step(range: f64) -> f64 {
    let raw = range / TARGET_TICKS;
    let magnitude = 10f64.powi(raw.log10().floor() as i32);
    let nice = match raw / magnitude {
        r if r <= 1.0 => 1.0,
        r if r <= 2.0 => 2.0,
        r if r <= 5.0 => 5.0,
        _ => 10.0,
    };
    nice * magnitude
}

/// Multiples of `step` within `[min, max]`
fn ticks(min: f64, max: f64, step: f64) -> Vec<f64> {
    let first = (min / step).ceil() as i64;
    let last = (max / step).floor() as i64;
    (first..=last).map(|i| i as f64 * step).collect()
}

fn format_degrees(value: f64, step: f64) -> String {
    let decimals = if step >= 1.0 {
        0
    } else {
        (-step.log10()).ceil() as usize
    };
    format!("{:.*}°", decimals, value)
}

fn write_points<W: Write>(
    writer: &mut W,
    scaler: &Scaler,
    points: &[(f64, f64)],
    color: &str,
    radius: f64,
    opacity: f64,
) -> Result<()> {
    if points.is_empty() {
        return Ok(());
    }
    writeln!(writer, r#"<g fill="{}" fill-opacity="{}">"#, color, opacity)?;
    for &(x, y) in points {
        let (px, py) = scaler.scale(x, y);
        writeln!(writer, r#"<circle cx="{:.2}" cy="{:.2}" r="{}"/>"#, px, py, radius)?;
    }
    writeln!(writer, "</g>")?;
    Ok(())
}

fn write_legend<W: Write>(writer: &mut W, width: f64) -> Result<()> {
    let entries = [
        ("#add8e6", "Country area"),
        ("red", "Bounding box"),
        ("green", "Points inside (sample)"),
        ("red", "Points outside (sample)"),
    ];
    let x = width - MARGIN - 190.0;
    for (i, (color, label)) in entries.iter().enumerate() {
        let y = TITLE_Y + TITLE_BAND + 20.0 * i as f64;
        writeln!(
            writer,
            r#"<rect x="{:.1}" y="{:.1}" width="12" height="12" fill="{}"/><text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="12">{}</text>"#,
            x,
            y,
            color,
            x + 18.0,
            y + 10.0,
            label
        )?;
    }
    Ok(())
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
