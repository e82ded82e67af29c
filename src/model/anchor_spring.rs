//! Linear anchoring spring boundary condition
//!
//! Penalizes nodal displacement along the outward surface normal relative to
//! an anchor point. Normals are averaged from the adjacent surface elements
//! of the previous-step configuration; the anchor point is refreshed once
//! per load step by projecting the incremental displacement onto the tangent
//! plane, so the spring resists normal drift but lets nodes slide
//! tangentially.

use nalgebra::Vector3;

use crate::mesh::FeMesh;
use crate::model::{averaged_surface_normals, ModelResult, Request};

#[derive(Debug, Clone)]
pub struct AnchoringSpring {
    surface: FeMesh,
    nodes: Vec<usize>,
    stiffness: f64,
    node_to_elems: Vec<Vec<usize>>,
    normals: Vec<Vector3<f64>>,
}

impl AnchoringSpring {
    /// `surface` shares the body mesh's node numbering; `nodes` lists the
    /// anchored boundary nodes
    pub fn new(surface: FeMesh, nodes: Vec<usize>, stiffness: f64) -> Self {
        assert!(stiffness >= 0.0, "spring stiffness must be non-negative");
        let node_to_elems = surface.elements_adjacent_to(&nodes);
        let normals = vec![Vector3::zeros(); nodes.len()];
        log::info!("anchoring spring on {} nodes, k = {:.3e}", nodes.len(), stiffness);

        Self {
            surface,
            nodes,
            stiffness,
            node_to_elems,
            normals,
        }
    }

    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    pub fn normals(&self) -> &[Vector3<f64>] {
        &self.normals
    }

    /// Recompute per-node normals from the previous-step configuration
    pub(crate) fn refresh_normals(&mut self, prev_field: &[f64]) {
        let position = |node: usize| {
            Vector3::new(
                prev_field[node * 3],
                prev_field[node * 3 + 1],
                prev_field[node * 3 + 2],
            )
        };
        self.normals =
            averaged_surface_normals(&self.surface, &position, &self.node_to_elems, &self.nodes);
    }

    /// Advance the anchor points, writing them into `next_anchors`
    ///
    /// `next_anchors` starts as a snapshot of the current field; anchored
    /// nodes are overwritten. The incremental displacement u = x - x_bar is
    /// projected onto the tangent plane (u minus its normal component); the
    /// anchor slides along that tangent so that only normal motion is
    /// penalized next step.
    pub(crate) fn update_anchor_points(
        &self,
        field: &[f64],
        prev_field: &[f64],
        next_anchors: &mut [f64],
    ) {
        for (n, &node) in self.nodes.iter().enumerate() {
            let x = Vector3::new(field[node * 3], field[node * 3 + 1], field[node * 3 + 2]);
            let x_bar = Vector3::new(
                prev_field[node * 3],
                prev_field[node * 3 + 1],
                prev_field[node * 3 + 2],
            );
            let u = x - x_bar;
            let tangent = u - u.dot(&self.normals[n]) * self.normals[n];
            let x_bar_next = x_bar + tangent.dot(&(x - x_bar)) * tangent;

            next_anchors[node * 3] = x_bar_next.x;
            next_anchors[node * 3 + 1] = x_bar_next.y;
            next_anchors[node * 3 + 2] = x_bar_next.z;
        }
    }

    /// Accumulate the spring contribution
    pub(crate) fn contribute(&self, field: &[f64], prev_field: &[f64], r: &mut ModelResult) {
        for (n, &node) in self.nodes.iter().enumerate() {
            let normal = self.normals[n];
            let x = Vector3::new(field[node * 3], field[node * 3 + 1], field[node * 3 + 2]);
            let x_anchor = Vector3::new(
                prev_field[node * 3],
                prev_field[node * 3 + 1],
                prev_field[node * 3 + 2],
            );
            let gap = (x - x_anchor).dot(&normal);

            if r.request().contains(Request::ENERGY) {
                r.add_energy(0.5 * self.stiffness * gap * gap);
            }

            if r.request().contains(Request::FORCE) || r.request().contains(Request::DMATPROP) {
                for i in 0..3 {
                    r.add_residual(node * 3 + i, self.stiffness * normal[i] * gap);
                }
            }

            if r.request().contains(Request::STIFFNESS) {
                // Rank-1 outer product of the node normal
                for i in 0..3 {
                    for j in 0..3 {
                        r.add_stiffness(
                            node * 3 + i,
                            node * 3 + j,
                            self.stiffness * normal[i] * normal[j],
                        );
                    }
                }
            }
        }
    }
}
