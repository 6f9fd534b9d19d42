//! Plain-text rendering of simulation inputs and results

use std::fmt::Write;

use crate::domain::GeographicExtent;
use crate::geometry::BoundingBox;
use crate::simulation::{ErrorReport, SimulationResult};

const RULE_WIDTH: usize = 60;

/// Format a number with `,` thousands separators and fixed decimals
pub fn format_thousands(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let formatted = format!("{:.*}", decimals, value.abs());
    let (integer, fraction) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && formatted.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };
    match fraction {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}

pub fn render_geographic_extent(extent: &GeographicExtent) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Geographic extent (WGS84, degrees):");
    let _ = writeln!(
        out,
        "  Latitude:   min {:>10.4}  max {:>10.4}",
        extent.min_lat, extent.max_lat
    );
    let _ = writeln!(
        out,
        "  Longitude:  min {:>10.4}  max {:>10.4}",
        extent.min_lon, extent.max_lon
    );
    out
}

pub fn render_bounding_box(bbox: &BoundingBox) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Projected extent (meters):");
    let _ = writeln!(
        out,
        "  X:  min {:>18}  max {:>18}",
        format_thousands(bbox.min_x, 2),
        format_thousands(bbox.max_x, 2)
    );
    let _ = writeln!(
        out,
        "  Y:  min {:>18}  max {:>18}",
        format_thousands(bbox.min_y, 2),
        format_thousands(bbox.max_y, 2)
    );
    let _ = writeln!(out, "Bounding box:");
    let _ = writeln!(out, "  Width:   {:>22} m", format_thousands(bbox.width(), 2));
    let _ = writeln!(out, "  Height:  {:>22} m", format_thousands(bbox.height(), 2));
    let _ = writeln!(out, "  Area:    {:>22} m²", format_thousands(bbox.area(), 2));
    let _ = writeln!(
        out,
        "           {:>22} km²",
        format_thousands(bbox.area() / 1_000_000.0, 2)
    );
    out
}

/// Full result block: statistics, area calculation, validation and band
pub fn render_results(country: &str, result: &SimulationResult, report: &ErrorReport) -> String {
    let mut out = String::new();
    let heavy = "=".repeat(RULE_WIDTH);

    let _ = writeln!(out, "{}", heavy);
    let _ = writeln!(out, "  MONTE CARLO SIMULATION RESULTS");
    let _ = writeln!(out, "{}", heavy);
    let _ = writeln!(out);
    let _ = writeln!(out, "  Country: {}", country);
    let _ = writeln!(out);

    let _ = writeln!(out, "  Simulation:");
    let _ = writeln!(
        out,
        "  ├─ Points generated:            {:>20}",
        format_thousands(result.total_points() as f64, 0)
    );
    let _ = writeln!(
        out,
        "  ├─ Points inside:               {:>20}",
        format_thousands(result.inside_count() as f64, 0)
    );
    let _ = writeln!(
        out,
        "  ├─ Points outside:              {:>20}",
        format_thousands(result.outside_count() as f64, 0)
    );
    let _ = writeln!(
        out,
        "  └─ Time:                        {:>16.2} sec",
        result.elapsed().as_secs_f64()
    );
    let _ = writeln!(out);

    let (low, high) = result.confidence_interval_95_km2();
    let _ = writeln!(out, "  Area:");
    let _ = writeln!(
        out,
        "  ├─ Bounding box area:           {:>16} km²",
        format_thousands(result.bbox_area_km2(), 2)
    );
    let _ = writeln!(
        out,
        "  ├─ Ratio (inside/total):        {:>20.6}",
        result.inside_ratio()
    );
    let _ = writeln!(
        out,
        "  ├─ Standard error:              {:>16} km²",
        format_thousands(result.standard_error_km2(), 2)
    );
    let _ = writeln!(
        out,
        "  ├─ 95% interval:                {} .. {} km²",
        format_thousands(low, 2),
        format_thousands(high, 2)
    );
    let _ = writeln!(
        out,
        "  └─ ESTIMATED AREA:              {:>16} km²",
        format_thousands(result.estimated_area_km2(), 2)
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "  Validation:");
    match report.reference {
        Some(reference) => {
            let _ = writeln!(
                out,
                "  ├─ Reference area:              {:>16} km²",
                format_thousands(reference, 0)
            );
            let _ = writeln!(
                out,
                "  ├─ Estimated area:              {:>16} km²",
                format_thousands(report.estimate, 2)
            );
            let _ = writeln!(
                out,
                "  ├─ Absolute error:              {:>16} km²",
                format_thousands(report.absolute_error, 2)
            );
            let _ = writeln!(
                out,
                "  └─ Relative error:              {:>18.4} %",
                report.relative_error
            );
        }
        None => {
            let _ = writeln!(out, "  └─ No reference area available");
        }
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", heavy);

    if let Some(band) = report.band() {
        match band.hint(country) {
            Some(hint) => {
                let _ = writeln!(out, "  ({})", band.label());
                let _ = writeln!(out, "  {}", hint);
            }
            None => {
                let _ = writeln!(out, "  ({})", band.label());
            }
        }
        let _ = writeln!(out, "{}", heavy);
    }

    out
}

/// One-line plot title
pub fn plot_title(country: &str, result: &SimulationResult, report: &ErrorReport) -> String {
    let mut title = format!(
        "Monte Carlo simulation - {} | N = {} points | Estimated area: {} km²",
        country,
        format_thousands(result.total_points() as f64, 0),
        format_thousands(result.estimated_area_km2(), 2)
    );
    if report.has_reference() {
        let _ = write!(title, " | Error: {:.2}%", report.relative_error);
    }
    title
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Polygon;
    use crate::simulation::{MonteCarloEstimator, evaluate};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0.0, 0), "0");
        assert_eq!(format_thousands(999.0, 0), "999");
        assert_eq!(format_thousands(1000.0, 0), "1,000");
        assert_eq!(format_thousands(8_515_770.0, 0), "8,515,770");
        assert_eq!(format_thousands(1_234_567.891, 2), "1,234,567.89");
        assert_eq!(format_thousands(-2_500_000.5, 1), "-2,500,000.5");
        assert_eq!(format_thousands(-0.001, 2), "0.00");
    }

    fn sample_result() -> SimulationResult {
        let polygon = Polygon::from_rings(vec![vec![
            (0.0, 0.0),
            (2_000_000.0, 0.0),
            (0.0, 2_000_000.0),
        ]])
        .unwrap();
        let bbox = polygon.bounding_box().unwrap();
        MonteCarloEstimator::default()
            .run(&polygon, &bbox, 10_000, &mut StdRng::seed_from_u64(1), None)
            .unwrap()
    }

    #[test]
    fn test_render_results_with_reference() {
        let result = sample_result();
        let report = evaluate(result.estimated_area_km2(), Some(2_000_000.0));
        let text = render_results("Triangleland", &result, &report);

        assert!(text.contains("Country: Triangleland"));
        assert!(text.contains("10,000"));
        assert!(text.contains("Reference area"));
        assert!(text.contains("2,000,000 km²"));
        assert!(text.contains("error <"));
    }

    #[test]
    fn test_render_results_without_reference() {
        let result = sample_result();
        let report = evaluate(result.estimated_area_km2(), None);
        let text = render_results("Triangleland", &result, &report);

        assert!(text.contains("No reference area available"));
        assert!(!text.contains("Relative error"));
        assert!(!plot_title("Triangleland", &result, &report).contains("Error"));
    }

    #[test]
    fn test_render_bounding_box() {
        let bbox = BoundingBox::new(-1_000.0, 0.0, 1_000.0, 500.0).unwrap();
        let text = render_bounding_box(&bbox);
        assert!(text.contains("-1,000.00"));
        assert!(text.contains("1,000,000.00 m²"));
        assert!(text.contains("1.00 km²"));
    }
}
