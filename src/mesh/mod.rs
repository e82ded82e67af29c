//! Mesh container: node table, element list, boundary node sets
//!
//! A mesh owns reference coordinates and `GeomElement`s built once at
//! construction. Surface meshes used by boundary conditions may share the
//! body's node table (same global indices), or, when meshed independently,
//! be merged onto it by coordinate matching.

use std::fs;
use std::path::Path;

use nalgebra::Vector3;

use crate::error::{Result, SimError};
use crate::fem::{ElementKind, GeomElement};

/// Finite element mesh over a shared global node table
#[derive(Debug, Clone)]
pub struct FeMesh {
    nodes: Vec<Vector3<f64>>,
    elements: Vec<GeomElement>,
}

impl FeMesh {
    /// Build a volume mesh from a node-coordinate table and a connectivity
    /// table (one node-index tuple per element)
    ///
    /// All elements must share one topology, classified from the node count.
    pub fn volume_from_tables(
        nodes: Vec<Vector3<f64>>,
        connectivity: &[Vec<usize>],
    ) -> Result<Self> {
        Self::from_tables(nodes, connectivity, false)
    }

    /// Build a surface mesh (triangular patches embedded in 3D)
    ///
    /// Typically constructed over the same node table as the body mesh so
    /// that node indices coincide.
    pub fn surface_from_tables(
        nodes: Vec<Vector3<f64>>,
        connectivity: &[Vec<usize>],
    ) -> Result<Self> {
        Self::from_tables(nodes, connectivity, true)
    }

    fn from_tables(
        nodes: Vec<Vector3<f64>>,
        connectivity: &[Vec<usize>],
        surface: bool,
    ) -> Result<Self> {
        let mut elements = Vec::with_capacity(connectivity.len());

        for (e, conn) in connectivity.iter().enumerate() {
            for &n in conn {
                if n >= nodes.len() {
                    return Err(SimError::InvalidConnectivity {
                        element: e,
                        node: n,
                        num_nodes: nodes.len(),
                    });
                }
            }

            let topo_dim = if surface { 2 } else { 3 };
            let kind = ElementKind::from_topology(topo_dim, conn.len())?;
            let element = if surface {
                GeomElement::surface(kind, conn.clone(), &nodes)?
            } else {
                GeomElement::volume(kind, conn.clone(), &nodes)?
            };
            elements.push(element);
        }

        Ok(Self { nodes, elements })
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    /// Reference coordinates of a node
    pub fn x(&self, node: usize) -> Vector3<f64> {
        self.nodes[node]
    }

    pub fn nodes(&self) -> &[Vector3<f64>] {
        &self.nodes
    }

    pub fn elements(&self) -> &[GeomElement] {
        &self.elements
    }

    /// For each node in `node_set`, the indices of elements containing it
    ///
    /// Used by boundary conditions that average element normals at nodes.
    pub fn elements_adjacent_to(&self, node_set: &[usize]) -> Vec<Vec<usize>> {
        node_set
            .iter()
            .map(|&node| {
                self.elements
                    .iter()
                    .enumerate()
                    .filter(|(_, el)| el.nodes().contains(&node))
                    .map(|(e, _)| e)
                    .collect()
            })
            .collect()
    }
}

/// Read a boundary node set: a leading count followed by node indices
///
/// The file is read until exhausted; the leading count must match the number
/// of indices found.
pub fn read_node_set<P: AsRef<Path>>(path: P) -> Result<Vec<usize>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let mut tokens = contents.split_whitespace();

    let declared: usize = tokens
        .next()
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| SimError::Config(format!("node set {} is empty", path.display())))?;

    let mut nodes = Vec::with_capacity(declared);
    for tok in tokens {
        let n: usize = tok
            .parse()
            .map_err(|_| SimError::Config(format!("bad node index '{}' in {}", tok, path.display())))?;
        nodes.push(n);
    }

    if nodes.len() != declared {
        return Err(SimError::NodeSetCountMismatch {
            path: path.display().to_string(),
            declared,
            found: nodes.len(),
        });
    }

    log::info!("read node set {} ({} nodes)", path.display(), nodes.len());
    Ok(nodes)
}

/// Merge an independently numbered node table onto an existing one by
/// coordinate match
///
/// Returns the combined node table and, for each node of `incoming`, its
/// index in the combined table. Nodes within `tol` of an existing node are
/// identified with it; the rest are appended.
pub fn merge_coincident(
    base: &[Vector3<f64>],
    incoming: &[Vector3<f64>],
    tol: f64,
) -> (Vec<Vector3<f64>>, Vec<usize>) {
    let mut merged = base.to_vec();
    let mut map = Vec::with_capacity(incoming.len());

    for x in incoming {
        match base.iter().position(|b| (b - x).norm() <= tol) {
            Some(i) => map.push(i),
            None => {
                merged.push(*x);
                map.push(merged.len() - 1);
            }
        }
    }

    (merged, map)
}
