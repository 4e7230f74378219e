//! Scan point computation over whole axis chains.

use nexgen::error::ScanError;
use nexgen::geometry::{Axis, GeometryGraph, ROOT};
use nexgen::scan::{compute_scan, compute_scan_for, ScanDirection, ScanOptions};
use tracing_test::traced_test;

fn grid(n_s: usize, n_f: usize) -> GeometryGraph {
    GeometryGraph::build(vec![
        Axis::rotation("omega", [0.0, 0.0, -1.0], ROOT, 0.0),
        Axis::translation("sam_y", [0.0, 1.0, 0.0], "omega", 0.0).with_scan(1.0, n_s),
        Axis::translation("sam_x", [1.0, 0.0, 0.0], "sam_y", 0.0).with_scan(1.0, n_f),
    ])
    .unwrap()
}

fn pairs(graph: &GeometryGraph, options: &ScanOptions) -> Vec<(f64, f64)> {
    compute_scan(graph, options)
        .unwrap()
        .iter()
        .map(|frame| (frame[0], frame[1]))
        .collect()
}

#[test]
fn test_snaked_grid_reverses_odd_rows() {
    assert_eq!(
        pairs(&grid(2, 3), &ScanOptions::snaked()),
        vec![(0.0, 0.0), (0.0, 1.0), (0.0, 2.0), (1.0, 2.0), (1.0, 1.0), (1.0, 0.0)]
    );
}

#[test]
fn test_raster_grid_keeps_row_order() {
    assert_eq!(
        pairs(&grid(2, 3), &ScanOptions::default()),
        vec![(0.0, 0.0), (0.0, 1.0), (0.0, 2.0), (1.0, 0.0), (1.0, 1.0), (1.0, 2.0)]
    );
}

#[test]
fn test_grid_axes_ordered_slow_then_fast_regardless_of_declaration() {
    // Fast axis declared first.
    let graph = GeometryGraph::build(vec![
        Axis::translation("sam_x", [1.0, 0.0, 0.0], "sam_y", 0.0).with_scan(1.0, 3),
        Axis::translation("sam_y", [0.0, 1.0, 0.0], ROOT, 0.0).with_scan(1.0, 2),
    ])
    .unwrap();
    let points = compute_scan(&graph, &ScanOptions::default()).unwrap();
    assert_eq!(points.axes(), ["sam_y".to_string(), "sam_x".to_string()]);
    assert_eq!(points.frame(3), Some(&[1.0, 0.0][..]));
}

#[test]
fn test_scan_length_invariant() {
    for (n_s, n_f) in [(1, 1), (1, 7), (4, 1), (5, 9), (12, 3)] {
        assert_eq!(compute_scan(&grid(n_s, n_f), &ScanOptions::snaked()).unwrap().len(), n_s * n_f);
    }
    for n in [1usize, 2, 100] {
        let graph = GeometryGraph::build(vec![
            Axis::rotation("omega", [0.0, 0.0, -1.0], ROOT, 0.0).with_scan(0.1, n),
        ])
        .unwrap();
        assert_eq!(compute_scan(&graph, &ScanOptions::default()).unwrap().len(), n);
    }
    let static_chain = GeometryGraph::build(vec![
        Axis::rotation("omega", [0.0, 0.0, -1.0], ROOT, 45.0),
        Axis::rotation("phi", [0.0, 0.0, -1.0], "omega", 90.0),
    ])
    .unwrap();
    let points = compute_scan(&static_chain, &ScanOptions::default()).unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points.frame(0), Some(&[45.0, 90.0][..]));
}

#[test]
fn test_linear_scan_is_exact() {
    let axis = Axis::rotation("omega", [0.0, 0.0, -1.0], ROOT, 10.0).with_scan(0.1, 5);
    let graph = GeometryGraph::build(vec![axis]).unwrap();
    let values = compute_scan(&graph, &ScanOptions::default())
        .unwrap()
        .column("omega")
        .unwrap();

    let expected = [10.0, 10.1, 10.2, 10.3, 10.4];
    for (i, (value, literal)) in values.iter().zip(expected).enumerate() {
        assert_eq!(*value, 10.0 + i as f64 * 0.1);
        assert!((value - literal).abs() < 1e-12);
    }
}

#[test]
fn test_no_drift_over_long_scan() {
    let n = 36_000;
    let graph = GeometryGraph::build(vec![
        Axis::rotation("phi", [0.0, 0.0, -1.0], ROOT, 0.0).with_scan(0.01, n),
    ])
    .unwrap();
    let values = compute_scan(&graph, &ScanOptions::default())
        .unwrap()
        .column("phi")
        .unwrap();
    assert_eq!(values[n - 1], (n - 1) as f64 * 0.01);
}

#[test]
fn test_single_step_with_increment_is_accepted() {
    let graph = GeometryGraph::build(vec![
        Axis::rotation("omega", [0.0, 0.0, -1.0], ROOT, 5.0).with_scan(2.0, 1),
    ])
    .unwrap();
    let points = compute_scan(&graph, &ScanOptions::default()).unwrap();
    assert_eq!(points.column("omega").unwrap(), vec![5.0]);
}

#[test]
#[traced_test]
fn test_zero_increment_repeats_start_and_warns() {
    let graph = GeometryGraph::build(vec![
        Axis::translation("delay", [0.0, 0.0, 1.0], ROOT, 3.5).with_scan(0.0, 4),
    ])
    .unwrap();
    let points = compute_scan(&graph, &ScanOptions::default()).unwrap();
    assert_eq!(points.column("delay").unwrap(), vec![3.5; 4]);
    assert!(logs_contain("zero increment"));
}

#[test]
fn test_zero_steps_rejected() {
    let graph = GeometryGraph::build(vec![
        Axis::rotation("omega", [0.0, 0.0, -1.0], ROOT, 0.0).with_scan(0.1, 0),
    ])
    .unwrap();
    let err = compute_scan(&graph, &ScanOptions::default()).unwrap_err();
    assert!(matches!(err, ScanError::ScanAxis { ref axis, .. } if axis == "omega"));
}

#[test]
fn test_three_scan_axes_rejected() {
    let graph = GeometryGraph::build(vec![
        Axis::rotation("omega", [0.0, 0.0, -1.0], ROOT, 0.0).with_scan(0.1, 2),
        Axis::translation("sam_y", [0.0, 1.0, 0.0], "omega", 0.0).with_scan(1.0, 2),
        Axis::translation("sam_x", [1.0, 0.0, 0.0], "sam_y", 0.0).with_scan(1.0, 2),
    ])
    .unwrap();
    assert_eq!(
        compute_scan(&graph, &ScanOptions::default()).unwrap_err(),
        ScanError::MultipleScanAxes(vec!["omega".into(), "sam_y".into(), "sam_x".into()])
    );
}

#[test]
fn test_sibling_scan_axes_rejected() {
    let graph = GeometryGraph::build(vec![
        Axis::rotation("omega", [0.0, 0.0, -1.0], ROOT, 0.0),
        Axis::translation("sam_y", [0.0, 1.0, 0.0], "omega", 0.0).with_scan(1.0, 2),
        Axis::translation("sam_x", [1.0, 0.0, 0.0], "omega", 0.0).with_scan(1.0, 2),
    ])
    .unwrap();
    assert_eq!(
        compute_scan(&graph, &ScanOptions::default()).unwrap_err(),
        ScanError::AmbiguousGridOrder {
            first: "sam_y".into(),
            second: "sam_x".into()
        }
    );
}

#[test]
fn test_requested_axis_must_be_declared_scan_axis() {
    let graph = grid(2, 3);
    assert!(compute_scan_for(&graph, "sam_x", &ScanOptions::default()).is_ok());
    let err = compute_scan_for(&graph, "omega", &ScanOptions::default()).unwrap_err();
    assert_eq!(
        err,
        ScanError::ScanAxisNotFound {
            axis: "omega".into(),
            declared: vec!["sam_y".into(), "sam_x".into()]
        }
    );
}

#[test]
fn test_negative_direction_reverses_rotation() {
    let graph = GeometryGraph::build(vec![
        Axis::rotation("omega", [0.0, 0.0, -1.0], ROOT, 90.0).with_scan(0.5, 3),
    ])
    .unwrap();
    let options = ScanOptions {
        direction: ScanDirection::Negative,
        ..Default::default()
    };
    let points = compute_scan(&graph, &options).unwrap();
    assert_eq!(points.column("omega").unwrap(), vec![90.0, 89.5, 89.0]);
    assert_eq!(points.range_of("omega"), Some((90.0, 89.0)));
}

#[test]
fn test_scan_is_deterministic() {
    let graph = grid(7, 11);
    let first = compute_scan(&graph, &ScanOptions::snaked()).unwrap();
    let second = compute_scan(&graph, &ScanOptions::snaked()).unwrap();
    assert_eq!(first, second);
    let bits = |set: &nexgen::scan::ScanPointSet| -> Vec<u64> {
        set.iter().flatten().map(|v| v.to_bits()).collect()
    };
    assert_eq!(bits(&first), bits(&second));
}
