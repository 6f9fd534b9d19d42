//! Property and end-to-end tests for the area estimator.

use geo::{GeodesicArea, Intersects, LineString, Point};
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

use montearea::dataset::parse_countries;
use montearea::geometry::projection::{SOUTH_AMERICA_ALBERS, UTM_18_SOUTH};
use montearea::geometry::{Polygon, ProjectionProvider};
use montearea::simulation::{AccuracyBand, EstimatorConfig, MonteCarloEstimator, evaluate};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

/// Radii of a polygon that is star-shaped around the origin, so it never
/// self-intersects.
fn arb_star_radii() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0f64..100.0, 3..24)
}

fn star_ring(radii: &[f64], scale: f64) -> Vec<(f64, f64)> {
    let n = radii.len() as f64;
    radii
        .iter()
        .enumerate()
        .map(|(k, r)| {
            let angle = std::f64::consts::TAU * k as f64 / n;
            (scale * r * angle.cos(), scale * r * angle.sin())
        })
        .collect()
}

fn arb_point() -> impl Strategy<Value = (f64, f64)> {
    (-110.0f64..110.0, -110.0f64..110.0)
}

fn l_shape() -> Polygon {
    Polygon::from_rings(vec![vec![
        (0.0, 0.0),
        (2.0, 0.0),
        (2.0, 1.0),
        (1.0, 1.0),
        (1.0, 2.0),
        (0.0, 2.0),
    ]])
    .unwrap()
}

// ---------------------------------------------------------------------------
// Classifier agrees with geo on random star polygons, with and without a hole
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn classifier_matches_geo(
        radii in arb_star_radii(),
        with_hole in any::<bool>(),
        points in prop::collection::vec(arb_point(), 50),
    ) {
        let outer = star_ring(&radii, 1.0);
        let inner = star_ring(&radii, 0.3);

        let (ours, theirs) = if with_hole {
            (
                Polygon::from_rings(vec![outer.clone(), inner.clone()]).unwrap(),
                geo::Polygon::new(LineString::from(outer), vec![LineString::from(inner)]),
            )
        } else {
            (
                Polygon::from_rings(vec![outer.clone()]).unwrap(),
                geo::Polygon::new(LineString::from(outer), vec![]),
            )
        };

        for (x, y) in points {
            let expected = theirs.intersects(&Point::new(x, y));
            prop_assert_eq!(ours.contains_point((x, y)), expected,
                "disagreement at ({}, {})", x, y);
        }
    }
}

// ---------------------------------------------------------------------------
// Every trial is counted exactly once and buffers respect their caps
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn counts_partition_trials(
        radii in arb_star_radii(),
        count in 1u64..5_000,
        seed in any::<u64>(),
        inside_cap in 0usize..200,
        outside_cap in 0usize..200,
    ) {
        let polygon = Polygon::from_rings(vec![star_ring(&radii, 1.0)]).unwrap();
        let bbox = polygon.bounding_box().unwrap();
        let estimator = MonteCarloEstimator::new(EstimatorConfig {
            inside_cap,
            outside_cap,
            ..Default::default()
        });

        let result = estimator
            .run(&polygon, &bbox, count, &mut StdRng::seed_from_u64(seed), None)
            .unwrap();

        prop_assert_eq!(result.inside_count() + result.outside_count(), count);
        prop_assert!(result.estimated_area() <= bbox.area());
        prop_assert_eq!(
            result.inside_samples().len() as u64,
            result.inside_count().min(inside_cap as u64)
        );
        prop_assert_eq!(
            result.outside_samples().len() as u64,
            result.outside_count().min(outside_cap as u64)
        );
        for &point in result.inside_samples() {
            prop_assert!(polygon.contains_point(point));
        }
        for &point in result.outside_samples() {
            prop_assert!(!polygon.contains_point(point));
        }
    }
}

// ---------------------------------------------------------------------------
// Estimates
// ---------------------------------------------------------------------------

#[test]
fn l_shape_estimate_converges() {
    let polygon = l_shape();
    let bbox = polygon.bounding_box().unwrap();

    let result = MonteCarloEstimator::default()
        .run(&polygon, &bbox, 200_000, &mut StdRng::seed_from_u64(7), None)
        .unwrap();

    assert_eq!(result.bbox_area(), 4.0);
    assert!((result.estimated_area() - 3.0).abs() < 0.03);
    let (low, high) = {
        let se = result.standard_error();
        (result.estimated_area() - 5.0 * se, result.estimated_area() + 5.0 * se)
    };
    assert!(low < 3.0 && 3.0 < high);
}

#[test]
fn parallel_run_is_reproducible_and_complete() {
    let polygon = l_shape();
    let bbox = polygon.bounding_box().unwrap();
    let estimator = MonteCarloEstimator::new(EstimatorConfig {
        chunk_size: 1_000,
        ..Default::default()
    });

    let a = estimator
        .run_parallel(&polygon, &bbox, 50_001, Some(42), None)
        .unwrap();
    let b = estimator
        .run_parallel(&polygon, &bbox, 50_001, Some(42), None)
        .unwrap();

    assert_eq!(a.total_points(), 50_001);
    assert_eq!(a.inside_count() + a.outside_count(), 50_001);
    assert_eq!(a.inside_count(), b.inside_count());
    assert_eq!(a.inside_samples(), b.inside_samples());
    assert!((a.estimated_area() - 3.0).abs() < 0.1);
}

#[test]
fn large_run_keeps_buffers_bounded() {
    let polygon = l_shape();
    let bbox = polygon.bounding_box().unwrap();

    let result = MonteCarloEstimator::default()
        .run(&polygon, &bbox, 100_000, &mut StdRng::seed_from_u64(3), None)
        .unwrap();

    assert_eq!(result.inside_samples().len(), 5_000);
    assert_eq!(result.outside_samples().len(), 2_500);
}

// ---------------------------------------------------------------------------
// GeoJSON -> projection -> estimate
// ---------------------------------------------------------------------------

const SQUARELAND: &str = r#"{"type": "FeatureCollection", "features": [
    {"type": "Feature", "properties": {"NAME": "Squareland"},
     "geometry": {"type": "Polygon", "coordinates":
        [[[-61.0, -33.0], [-60.0, -33.0], [-60.0, -32.0], [-61.0, -32.0], [-61.0, -33.0]]]}},
    {"type": "Feature", "properties": {"NAME": "Pointland"},
     "geometry": {"type": "Point", "coordinates": [-60.0, -32.0]}}
]}"#;

#[test]
fn end_to_end_estimate_matches_geodesic_area() {
    let dataset = parse_countries(SQUARELAND, "NAME").unwrap();
    assert_eq!(dataset.len(), 1);

    let boundary = dataset.get("squareland").unwrap();
    let geodesic_km2 = boundary.geometry.geodesic_area_unsigned() / 1_000_000.0;

    let provider = ProjectionProvider::new(SOUTH_AMERICA_ALBERS, UTM_18_SOUTH);
    let projected = provider.project(&boundary.to_polygon().unwrap()).unwrap();
    assert!(!projected.used_fallback);

    let bbox = projected.polygon.bounding_box().unwrap();
    let result = MonteCarloEstimator::default()
        .run(
            &projected.polygon,
            &bbox,
            200_000,
            &mut StdRng::seed_from_u64(11),
            None,
        )
        .unwrap();

    let report = evaluate(result.estimated_area_km2(), Some(geodesic_km2));
    assert!(
        report.relative_error < 1.0,
        "estimate {} vs geodesic {}",
        result.estimated_area_km2(),
        geodesic_km2
    );
    assert_eq!(report.band(), Some(AccuracyBand::Excellent));
}

#[test]
fn unknown_primary_projection_falls_back() {
    let dataset = parse_countries(SQUARELAND, "NAME").unwrap();
    let polygon = dataset.get("Squareland").unwrap().to_polygon().unwrap();

    let provider = ProjectionProvider::new("EPSG:999999", UTM_18_SOUTH);
    let projected = provider.project(&polygon).unwrap();
    assert!(projected.used_fallback);
    assert_eq!(projected.projection_id, UTM_18_SOUTH);

    let broken = ProjectionProvider::new("EPSG:999999", "nonsense");
    assert!(broken.project(&polygon).is_err());
}
