//! Validated axis dependency tree.
//!
//! Axes are stored in an arena together with a name index and a parent index
//! per axis, so parent lookup is O(1) and chain resolution is O(depth). A
//! graph may be linked to an upstream graph (e.g. a sample chain hanging off
//! the goniometer): dependencies are then resolved in the combined namespace,
//! while scan-axis identification only considers the chain's own axes.

use super::{Axis, ROOT};
use crate::error::{GeometryError, ScanError};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Scan axes identified in a chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScanAxes<'a> {
    /// No axis declares scan parameters.
    None,
    /// Exactly one scanning axis.
    Single(&'a Axis),
    /// Two scanning axes, `fast` depends (directly or transitively) on `slow`.
    Grid {
        /// Outer axis, advances once per row.
        slow: &'a Axis,
        /// Inner axis, traversed within each row.
        fast: &'a Axis,
    },
}

impl ScanAxes<'_> {
    /// Names of the scanning axes, slow first.
    pub fn names(&self) -> Vec<String> {
        match self {
            ScanAxes::None => Vec::new(),
            ScanAxes::Single(axis) => vec![axis.name.clone()],
            ScanAxes::Grid { slow, fast } => vec![slow.name.clone(), fast.name.clone()],
        }
    }
}

/// What an axis' `depends_on` resolves to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dependency<'a> {
    /// The lab frame.
    Root,
    /// An axis of the same chain.
    Local(&'a Axis),
    /// An axis of the upstream chain.
    Upstream(&'a Axis),
}

/// An axis chain whose `depends_on` relation is a validated tree.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryGraph {
    /// Local axes first, then any upstream axes.
    axes: Vec<Axis>,
    parents: Vec<Option<usize>>,
    index: HashMap<String, usize>,
    local_count: usize,
}

impl GeometryGraph {
    /// Build a graph from a standalone chain.
    ///
    /// Fails with [`GeometryError::DuplicateAxisName`] on repeated names,
    /// [`GeometryError::UnknownDependency`] on dangling references and
    /// [`GeometryError::CyclicDependency`] if a walk towards the root does not
    /// terminate within `axes.len()` hops.
    pub fn build(axes: Vec<Axis>) -> Result<Self, GeometryError> {
        Self::assemble(axes, None)
    }

    /// Build a graph whose axes may depend on axes of `upstream`.
    ///
    /// Names must be unique across both chains.
    pub fn build_linked(axes: Vec<Axis>, upstream: &GeometryGraph) -> Result<Self, GeometryError> {
        Self::assemble(axes, Some(upstream))
    }

    fn assemble(local: Vec<Axis>, upstream: Option<&GeometryGraph>) -> Result<Self, GeometryError> {
        let local_count = local.len();
        let mut axes = local;
        let mut upstream_parents = Vec::new();
        if let Some(up) = upstream {
            axes.extend(up.axes.iter().cloned());
            upstream_parents.extend(up.parents.iter().map(|p| p.map(|idx| idx + local_count)));
        }

        let mut index = HashMap::with_capacity(axes.len());
        for (idx, axis) in axes.iter().enumerate() {
            if axis.name == ROOT {
                return Err(GeometryError::DuplicateAxisName(axis.name.clone()));
            }
            if index.insert(axis.name.clone(), idx).is_some() {
                return Err(GeometryError::DuplicateAxisName(axis.name.clone()));
            }
        }

        let mut parents = Vec::with_capacity(axes.len());
        for axis in &axes[..local_count] {
            if axis.depends_on == ROOT {
                parents.push(None);
                continue;
            }
            match index.get(&axis.depends_on) {
                Some(&parent) => parents.push(Some(parent)),
                None => {
                    return Err(GeometryError::UnknownDependency {
                        axis: axis.name.clone(),
                        depends_on: axis.depends_on.clone(),
                    })
                }
            }
        }
        parents.extend(upstream_parents);

        let graph = Self {
            axes,
            parents,
            index,
            local_count,
        };
        graph.check_acyclic()?;

        for axis in graph.axes() {
            if crate::validation::is_unit_vector(&axis.vector).is_err() {
                warn!(axis = %axis.name, vector = ?axis.vector, "Axis vector is not normalised");
            }
        }
        debug!(
            axes = graph.local_count,
            linked = graph.axes.len() - graph.local_count,
            "Geometry graph built"
        );
        Ok(graph)
    }

    fn check_acyclic(&self) -> Result<(), GeometryError> {
        let limit = self.axes.len();
        for start in 0..self.local_count {
            let mut current = start;
            let mut visited = vec![self.axes[start].name.clone()];
            let mut hops = 0;
            while let Some(parent) = self.parents[current] {
                hops += 1;
                visited.push(self.axes[parent].name.clone());
                if hops > limit || parent == start {
                    return Err(GeometryError::CyclicDependency {
                        axis: self.axes[start].name.clone(),
                        chain: visited,
                    });
                }
                current = parent;
            }
        }
        Ok(())
    }

    /// The chain's own axes, in declaration order.
    pub fn axes(&self) -> &[Axis] {
        &self.axes[..self.local_count]
    }

    /// Number of axes owned by the chain.
    pub fn len(&self) -> usize {
        self.local_count
    }

    /// Whether the chain owns no axes.
    pub fn is_empty(&self) -> bool {
        self.local_count == 0
    }

    /// Look up an axis in the combined namespace.
    pub fn get(&self, name: &str) -> Option<&Axis> {
        self.index.get(name).map(|&idx| &self.axes[idx])
    }

    fn index_of(&self, name: &str) -> Result<usize, GeometryError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| GeometryError::AxisNotFound(name.to_string()))
    }

    /// Resolve what the axis' `depends_on` points to.
    pub fn dependency(&self, name: &str) -> Result<Dependency<'_>, GeometryError> {
        let idx = self.index_of(name)?;
        Ok(match self.parents[idx] {
            None => Dependency::Root,
            Some(parent) if parent < self.local_count => Dependency::Local(&self.axes[parent]),
            Some(parent) => Dependency::Upstream(&self.axes[parent]),
        })
    }

    /// Axes from the root down to `name`, inclusive.
    pub fn resolve_chain(&self, name: &str) -> Result<Vec<&Axis>, GeometryError> {
        let mut current = self.index_of(name)?;
        let mut chain = vec![&self.axes[current]];
        while let Some(parent) = self.parents[current] {
            chain.push(&self.axes[parent]);
            current = parent;
        }
        chain.reverse();
        Ok(chain)
    }

    /// Whether `axis` depends, directly or transitively, on `ancestor`.
    pub fn depends_on(&self, axis: &str, ancestor: &str) -> Result<bool, GeometryError> {
        let target = self.index_of(ancestor)?;
        let mut current = self.index_of(axis)?;
        while let Some(parent) = self.parents[current] {
            if parent == target {
                return Ok(true);
            }
            current = parent;
        }
        Ok(false)
    }

    /// Identify the chain's scan axis, or its grid pair ordered slow then fast.
    ///
    /// An axis is a scan axis when it declares `num_steps`. More than two
    /// fails with [`ScanError::MultipleScanAxes`]; two axes where neither
    /// depends on the other fail with [`ScanError::AmbiguousGridOrder`].
    pub fn scan_axis(&self) -> Result<ScanAxes<'_>, ScanError> {
        let scanning: Vec<&Axis> = self.axes().iter().filter(|ax| ax.is_scan()).collect();
        match scanning.as_slice() {
            [] => Ok(ScanAxes::None),
            [single] => Ok(ScanAxes::Single(single)),
            [first, second] => {
                // Both names are local, lookups cannot fail.
                if self.depends_on(&second.name, &first.name).unwrap_or(false) {
                    Ok(ScanAxes::Grid {
                        slow: first,
                        fast: second,
                    })
                } else if self.depends_on(&first.name, &second.name).unwrap_or(false) {
                    Ok(ScanAxes::Grid {
                        slow: second,
                        fast: first,
                    })
                } else {
                    Err(ScanError::AmbiguousGridOrder {
                        first: first.name.clone(),
                        second: second.name.clone(),
                    })
                }
            }
            many => Err(ScanError::MultipleScanAxes(
                many.iter().map(|ax| ax.name.clone()).collect(),
            )),
        }
    }

    /// `(start, end)` of an axis. `end == start` for static or zero-increment axes.
    pub fn total_axis_range(&self, name: &str) -> Result<(f64, f64), GeometryError> {
        let axis = self.get(name).ok_or_else(|| GeometryError::AxisNotFound(name.to_string()))?;
        Ok((axis.start, axis.end()))
    }

    /// Value of the NeXus `depends_on` attribute for `name`.
    ///
    /// `group` is where the chain's transformations live, `upstream_group`
    /// where the upstream chain's live. Root dependencies yield `"."`.
    pub fn dependency_path(
        &self,
        name: &str,
        group: &str,
        upstream_group: Option<&str>,
    ) -> Result<String, GeometryError> {
        let join = |prefix: &str, axis: &str| format!("{}/{}", prefix.trim_end_matches('/'), axis);
        Ok(match self.dependency(name)? {
            Dependency::Root => ROOT.to_string(),
            Dependency::Local(parent) => join(group, &parent.name),
            Dependency::Upstream(parent) => join(upstream_group.unwrap_or(group), &parent.name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gonio() -> Vec<Axis> {
        vec![
            Axis::rotation("omega", [0.0, 0.0, -1.0], ROOT, -90.0),
            Axis::rotation("phi", [0.0, 0.0, -1.0], "omega", 180.0),
            Axis::translation("sam_y", [0.0, 1.0, 0.0], "phi", 0.0).with_scan(0.1, 10),
            Axis::translation("sam_x", [1.0, 0.0, 0.0], "sam_y", 0.0).with_scan(0.2, 5),
        ]
    }

    #[test]
    fn parent_lookup_and_chain_resolution() {
        let graph = GeometryGraph::build(gonio()).unwrap();
        let chain: Vec<&str> = graph
            .resolve_chain("sam_x")
            .unwrap()
            .iter()
            .map(|ax| ax.name.as_str())
            .collect();
        assert_eq!(chain, vec!["omega", "phi", "sam_y", "sam_x"]);
        assert!(matches!(graph.dependency("omega").unwrap(), Dependency::Root));
        assert!(graph.depends_on("sam_x", "omega").unwrap());
        assert!(!graph.depends_on("omega", "sam_x").unwrap());
    }

    #[test]
    fn grid_axes_ordered_slow_then_fast() {
        let mut axes = gonio();
        // Declaration order must not matter.
        axes.swap(2, 3);
        let graph = GeometryGraph::build(axes).unwrap();
        match graph.scan_axis().unwrap() {
            ScanAxes::Grid { slow, fast } => {
                assert_eq!(slow.name, "sam_y");
                assert_eq!(fast.name, "sam_x");
            }
            other => panic!("unexpected scan axes: {:?}", other),
        }
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let axes = vec![Axis::rotation("omega", [0.0, 0.0, -1.0], "omega", 0.0)];
        assert!(matches!(
            GeometryGraph::build(axes),
            Err(GeometryError::CyclicDependency { .. })
        ));
    }

    #[test]
    fn root_name_is_reserved() {
        let axes = vec![Axis::rotation(".", [0.0, 0.0, -1.0], ROOT, 0.0)];
        assert!(matches!(
            GeometryGraph::build(axes),
            Err(GeometryError::DuplicateAxisName(_))
        ));
    }

    #[test]
    fn dependency_path_formats_group() {
        let graph = GeometryGraph::build(gonio()).unwrap();
        assert_eq!(
            graph
                .dependency_path("phi", "/entry/sample/transformations/", None)
                .unwrap(),
            "/entry/sample/transformations/omega"
        );
        assert_eq!(graph.dependency_path("omega", "/entry", None).unwrap(), ".");
    }
}
