//! Torsional spring boundary condition
//!
//! Penalizes displacement along the circumferential direction about the
//! z-axis through the mesh centroid. Tangents are built once from the fixed
//! reference geometry under an isotropic-radial assumption: the in-plane
//! radial direction at each node is rotated by 90 degrees to give
//! t = (-n_y, n_x, 0).

use nalgebra::{Vector2, Vector3};

use crate::mesh::FeMesh;
use crate::model::{ModelResult, Request};

#[derive(Debug, Clone)]
pub struct TorsionalSpring {
    nodes: Vec<usize>,
    stiffness: f64,
    tangents: Vec<Vector3<f64>>,
}

impl TorsionalSpring {
    /// Tangents are derived from `mesh` reference coordinates and the
    /// centroid of all its nodes
    pub fn new(mesh: &FeMesh, nodes: Vec<usize>, stiffness: f64) -> Self {
        assert!(stiffness >= 0.0, "spring stiffness must be non-negative");

        let centroid = compute_centroid(mesh);
        let tangents = nodes
            .iter()
            .map(|&node| {
                let radial = mesh.x(node) - centroid;
                let normal = Vector2::new(radial.x, radial.y).normalize();
                Vector3::new(-normal.y, normal.x, 0.0)
            })
            .collect();

        log::info!("torsional spring on {} nodes, k = {:.3e}", nodes.len(), stiffness);

        Self {
            nodes,
            stiffness,
            tangents,
        }
    }

    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    pub fn tangents(&self) -> &[Vector3<f64>] {
        &self.tangents
    }

    /// Accumulate the torsional contribution; displacement is measured from
    /// the reference geometry
    pub(crate) fn contribute(&self, mesh: &FeMesh, field: &[f64], r: &mut ModelResult) {
        for (n, &node) in self.nodes.iter().enumerate() {
            let tangent = self.tangents[n];
            let x_ref = mesh.x(node);
            let x = Vector3::new(field[node * 3], field[node * 3 + 1], field[node * 3 + 2]);
            let swing = (x - x_ref).dot(&tangent);

            if r.request().contains(Request::ENERGY) {
                r.add_energy(0.5 * self.stiffness * swing * swing);
            }

            if r.request().contains(Request::FORCE) || r.request().contains(Request::DMATPROP) {
                for i in 0..3 {
                    r.add_residual(node * 3 + i, self.stiffness * tangent[i] * swing);
                }
            }

            if r.request().contains(Request::STIFFNESS) {
                for i in 0..3 {
                    for j in 0..3 {
                        r.add_stiffness(
                            node * 3 + i,
                            node * 3 + j,
                            self.stiffness * tangent[i] * tangent[j],
                        );
                    }
                }
            }
        }
    }
}

fn compute_centroid(mesh: &FeMesh) -> Vector3<f64> {
    let sum: Vector3<f64> = mesh.nodes().iter().sum();
    sum / mesh.num_nodes() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square_patch() -> FeMesh {
        // Four nodes around the origin in the z = 0 plane
        let nodes = vec![
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(-1.0, 0.0, 0.0),
            Vector3::new(0.0, -1.0, 0.0),
        ];
        FeMesh::surface_from_tables(nodes, &[vec![0, 1, 2], vec![0, 2, 3]]).unwrap()
    }

    #[test]
    fn tangents_are_circumferential() {
        let mesh = square_patch();
        let spring = TorsionalSpring::new(&mesh, vec![0, 1], 1.0);

        // Node 0 sits at +x; its tangent is +y
        assert_relative_eq!(spring.tangents()[0].x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(spring.tangents()[0].y, 1.0, epsilon = 1e-12);
        // Node 1 sits at +y; its tangent is -x
        assert_relative_eq!(spring.tangents()[1].x, -1.0, epsilon = 1e-12);
        assert_relative_eq!(spring.tangents()[1].y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn radial_motion_is_free_circumferential_is_penalized() {
        let mesh = square_patch();
        let spring = TorsionalSpring::new(&mesh, vec![0], 4.0);

        // Radial displacement of node 0 (+x): no energy
        let mut field: Vec<f64> = mesh.nodes().iter().flat_map(|x| [x.x, x.y, x.z]).collect();
        field[0] = 1.5;
        let mut r = ModelResult::new(12, 0);
        r.set_request(Request::ENERGY);
        r.reset();
        spring.contribute(&mesh, &field, &mut r);
        assert_relative_eq!(r.energy(), 0.0, epsilon = 1e-12);

        // Circumferential displacement (+y at node 0): penalized
        let mut field: Vec<f64> = mesh.nodes().iter().flat_map(|x| [x.x, x.y, x.z]).collect();
        field[1] = 0.2;
        let mut r = ModelResult::new(12, 0);
        r.set_request(Request::ENERGY | Request::FORCE);
        r.reset();
        spring.contribute(&mesh, &field, &mut r);
        assert_relative_eq!(r.energy(), 0.5 * 4.0 * 0.2 * 0.2, epsilon = 1e-12);
        assert_relative_eq!(r.residual()[1], 4.0 * 0.2, epsilon = 1e-12);
    }
}
