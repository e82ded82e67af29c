//! Follower pressure load over a companion surface mesh
//!
//! The outward normal is built from the previous-step configuration (frozen
//! for the load step) while the work term uses the current displacement, so
//! the load direction follows the deformation once per step rather than per
//! Newton iteration. With the normal frozen, the load contributes no
//! stiffness block and the tangent stays symmetric.

use nalgebra::Vector3;

use crate::mesh::FeMesh;
use crate::model::{ModelResult, Request};

#[derive(Debug, Clone)]
pub struct PressureLoad {
    surface: FeMesh,
    pressure: f64,
}

impl PressureLoad {
    /// `surface` must share the body mesh's global node numbering
    pub fn new(surface: FeMesh, pressure: f64) -> Self {
        Self { surface, pressure }
    }

    /// Update the load magnitude (e.g. between load steps)
    pub fn set_pressure(&mut self, pressure: f64) {
        self.pressure = pressure;
    }

    pub fn pressure(&self) -> f64 {
        self.pressure
    }

    pub fn surface(&self) -> &FeMesh {
        &self.surface
    }

    /// Accumulate the pressure contribution
    ///
    /// `field`/`prev_field` hold current and previous nodal positions in the
    /// body's global numbering.
    pub(crate) fn contribute(&self, field: &[f64], prev_field: &[f64], r: &mut ModelResult) {
        for element in self.surface.elements() {
            let nodes = element.nodes();

            for q in 0..element.num_quad_points() {
                // Surface tangents from the previous configuration and the
                // interpolated displacement from the current one
                let mut a1 = Vector3::zeros();
                let mut a2 = Vector3::zeros();
                let mut u = Vector3::zeros();
                for (a, &node) in nodes.iter().enumerate() {
                    let x_prev = Vector3::new(
                        prev_field[node * 3],
                        prev_field[node * 3 + 1],
                        prev_field[node * 3 + 2],
                    );
                    let x_curr = Vector3::new(
                        field[node * 3],
                        field[node * 3 + 1],
                        field[node * 3 + 2],
                    );
                    a1 += x_prev * element.dn(q, a, 0);
                    a2 += x_prev * element.dn(q, a, 1);
                    u += (x_curr - self.surface.x(node)) * element.n(q, a);
                }

                let a3 = a1.cross(&a2);
                let area = a3.norm();
                let normal = a3 / area;
                let weighted_area = area * element.weight(q);

                if r.request().contains(Request::ENERGY) {
                    r.add_energy(self.pressure * weighted_area * normal.dot(&u));
                }

                if r.request().contains(Request::FORCE) || r.request().contains(Request::DMATPROP)
                {
                    for (a, &node) in nodes.iter().enumerate() {
                        for i in 0..3 {
                            r.add_residual(
                                node * 3 + i,
                                self.pressure * weighted_area * normal[i] * element.n(q, a),
                            );
                        }
                    }
                }
            }
        }
    }
}
