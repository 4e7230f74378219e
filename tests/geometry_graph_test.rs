//! Axis chain construction and queries.

use nexgen::error::GeometryError;
use nexgen::geometry::{Axis, GeometryGraph, ScanAxes, ROOT};

fn i19_goniometer() -> Vec<Axis> {
    vec![
        Axis::rotation("omega", [-1.0, 0.0, 0.0], ROOT, 0.0),
        Axis::rotation("kappa", [-0.642788, -0.766044, 0.0], "omega", 0.0),
        Axis::rotation("phi", [-1.0, 0.0, 0.0], "kappa", 0.0).with_scan(0.1, 3600),
        Axis::translation("sam_z", [0.0, 0.0, 1.0], "phi", 0.0),
        Axis::translation("sam_y", [0.0, 1.0, 0.0], "sam_z", 0.0),
        Axis::translation("sam_x", [1.0, 0.0, 0.0], "sam_y", 0.0),
    ]
}

#[test]
fn test_resolve_chain_runs_from_root() {
    let graph = GeometryGraph::build(i19_goniometer()).unwrap();
    let names: Vec<&str> = graph
        .resolve_chain("sam_x")
        .unwrap()
        .iter()
        .map(|ax| ax.name.as_str())
        .collect();
    assert_eq!(names, vec!["omega", "kappa", "phi", "sam_z", "sam_y", "sam_x"]);
    assert_eq!(graph.resolve_chain("omega").unwrap().len(), 1);
}

#[test]
fn test_single_scan_axis_identified() {
    let graph = GeometryGraph::build(i19_goniometer()).unwrap();
    match graph.scan_axis().unwrap() {
        ScanAxes::Single(axis) => assert_eq!(axis.name, "phi"),
        other => panic!("expected single scan axis, got {:?}", other.names()),
    }
}

#[test]
fn test_unknown_dependency_rejected() {
    let mut axes = i19_goniometer();
    axes[3].depends_on = "chi".to_string();
    let err = GeometryGraph::build(axes).unwrap_err();
    assert_eq!(
        err,
        GeometryError::UnknownDependency {
            axis: "sam_z".into(),
            depends_on: "chi".into()
        }
    );
    assert!(err.to_string().contains("'sam_z' depends on unknown axis 'chi'"));
}

#[test]
fn test_duplicate_name_rejected() {
    let mut axes = i19_goniometer();
    axes.push(Axis::translation("sam_x", [1.0, 0.0, 0.0], "omega", 0.0));
    assert_eq!(
        GeometryGraph::build(axes).unwrap_err(),
        GeometryError::DuplicateAxisName("sam_x".into())
    );
}

#[test]
fn test_self_dependency_is_a_cycle() {
    let axes = vec![Axis::rotation("omega", [0.0, 0.0, 1.0], "omega", 0.0)];
    assert!(matches!(
        GeometryGraph::build(axes),
        Err(GeometryError::CyclicDependency { .. })
    ));
}

#[test]
fn test_acyclicity_over_generated_chains() {
    // Every axis i depends on axis parent[i]; some assignments close a loop.
    let n = 5;
    for seed in 0..(n * n * n) {
        let axes: Vec<Axis> = (0..n)
            .map(|i| {
                let target = (seed / (i + 1) + i) % (n + 1);
                let depends_on = if target == n {
                    ROOT.to_string()
                } else {
                    format!("ax{}", target)
                };
                Axis::rotation(format!("ax{}", i), [0.0, 0.0, 1.0], depends_on, 0.0)
            })
            .collect();

        match GeometryGraph::build(axes.clone()) {
            Ok(graph) => {
                // A tree: every chain terminates at the root within n hops.
                for axis in &axes {
                    let chain = graph.resolve_chain(&axis.name).unwrap();
                    assert!(chain.len() <= n);
                    assert!(chain[0].is_root_child());
                }
            }
            Err(GeometryError::CyclicDependency { chain, .. }) => assert!(chain.len() > 1),
            Err(other) => panic!("unexpected error {}", other),
        }
    }
}

#[test]
fn test_total_axis_range() {
    let graph = GeometryGraph::build(vec![
        Axis::rotation("omega", [0.0, 0.0, -1.0], ROOT, 10.0).with_scan(0.5, 5),
        Axis::rotation("phi", [0.0, 0.0, -1.0], "omega", 3.0).with_scan(0.0, 7),
    ])
    .unwrap();
    assert_eq!(graph.total_axis_range("omega").unwrap(), (10.0, 12.0));
    assert_eq!(graph.total_axis_range("phi").unwrap(), (3.0, 3.0));
    assert!(graph.total_axis_range("chi").is_err());
}

#[test]
fn test_linked_detector_chain_paths() {
    let gonio = GeometryGraph::build(i19_goniometer()).unwrap();
    let linked = GeometryGraph::build_linked(
        vec![Axis::translation("fine_x", [1.0, 0.0, 0.0], "sam_x", 0.0)],
        &gonio,
    )
    .unwrap();
    assert_eq!(linked.len(), 1);
    assert_eq!(linked.resolve_chain("fine_x").unwrap().len(), 7);
    assert_eq!(
        linked
            .dependency_path("fine_x", "/entry/stage", Some("/entry/sample/transformations"))
            .unwrap(),
        "/entry/sample/transformations/sam_x"
    );
}
