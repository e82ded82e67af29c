//! Fiber-reinforced transversely isotropic hyperelasticity
//!
//! An isotropic Neo-Hookean matrix stiffened along one fiber direction N:
//!
//! W = c1 (I1 - 3 - 2 ln J) + c2 (ln J)^2 + c3 (I4 - 1)^2
//!
//! with I4 = N . C N = |F N|^2 the squared fiber stretch. The fiber term
//! engages in both extension and compression; laws that switch the fiber off
//! under compression can be built by zeroing c3 per quadrature point.

use nalgebra::{Matrix3, Vector3};

use crate::materials::{MaterialResponse, MechanicsMaterial, Tangent4};
use crate::model::Request;

#[derive(Debug, Clone)]
pub struct FiberReinforcedElasticity {
    mat_id: usize,
    c1: f64,
    c2: f64,
    /// Fiber stiffening modulus
    c3: f64,
    /// Unit fiber direction in the reference configuration
    fiber: Vector3<f64>,
}

impl FiberReinforcedElasticity {
    pub fn new(mat_id: usize, c1: f64, c2: f64, c3: f64, fiber: Vector3<f64>) -> Self {
        assert!(c1 > 0.0 && c2 > 0.0 && c3 >= 0.0, "moduli must be positive");
        let norm = fiber.norm();
        assert!(norm > 0.0, "fiber direction must be nonzero");
        Self {
            mat_id,
            c1,
            c2,
            c3,
            fiber: fiber / norm,
        }
    }

    pub fn fiber(&self) -> Vector3<f64> {
        self.fiber
    }
}

impl MechanicsMaterial for FiberReinforcedElasticity {
    #[allow(non_snake_case)]
    fn compute(&self, request: Request, F: &Matrix3<f64>) -> MaterialResponse {
        let mut response = MaterialResponse::zeros();

        let J = F.determinant();
        let ln_J = J.ln();
        let Finv_T = F
            .try_inverse()
            .unwrap_or_else(|| {
                log::warn!("non-invertible deformation gradient, det F = {:.3e}", J);
                Matrix3::identity()
            })
            .transpose();
        let I1 = (F.transpose() * F).trace();

        let N = self.fiber;
        let FN = F * N;
        let I4 = FN.dot(&FN);
        // dP/dc3 with the fiber-term structure factored out
        let fiber_outer = FN * N.transpose();

        if request.contains(Request::ENERGY) {
            response.energy = self.c1 * (I1 - 3.0 - 2.0 * ln_J)
                + self.c2 * ln_J * ln_J
                + self.c3 * (I4 - 1.0) * (I4 - 1.0);
        }

        if request.contains(Request::FORCE) || request.contains(Request::DMATPROP) {
            response.stress = 2.0 * self.c1 * (F - Finv_T)
                + 2.0 * self.c2 * ln_J * Finv_T
                + 4.0 * self.c3 * (I4 - 1.0) * fiber_outer;
        }

        if request.contains(Request::STIFFNESS) {
            let mut tangent = Tangent4::zeros();
            for i in 0..3 {
                for j in 0..3 {
                    for k in 0..3 {
                        for l in 0..3 {
                            let delta_ik = if i == k { 1.0 } else { 0.0 };
                            let delta_jl = if j == l { 1.0 } else { 0.0 };
                            let inv_outer = Finv_T[(i, l)] * Finv_T[(k, j)];

                            let matrix_part = 2.0 * self.c1 * (delta_ik * delta_jl + inv_outer)
                                + 2.0
                                    * self.c2
                                    * (Finv_T[(k, l)] * Finv_T[(i, j)] - ln_J * inv_outer);

                            let fiber_part = 4.0
                                * self.c3
                                * (2.0 * FN[i] * N[j] * FN[k] * N[l]
                                    + (I4 - 1.0) * delta_ik * N[j] * N[l]);

                            tangent.add(i, j, k, l, matrix_part + fiber_part);
                        }
                    }
                }
            }
            response.tangent = tangent;
        }

        if request.contains(Request::DMATPROP) {
            response.stress_sensitivity = vec![
                2.0 * (F - Finv_T),
                2.0 * ln_J * Finv_T,
                4.0 * (I4 - 1.0) * fiber_outer,
            ];
        }

        response
    }

    fn mat_id(&self) -> usize {
        self.mat_id
    }

    fn parameters(&self) -> Vec<f64> {
        vec![self.c1, self.c2, self.c3]
    }

    fn set_parameters(&mut self, params: &[f64]) {
        assert_eq!(params.len(), 3, "fiber-reinforced law takes [c1, c2, c3]");
        self.c1 = params[0];
        self.c2 = params[1];
        self.c3 = params[2];
    }

    fn internal_parameters(&self) -> Vec<f64> {
        vec![self.fiber.x, self.fiber.y, self.fiber.z]
    }

    fn set_internal_parameters(&mut self, params: &[f64]) {
        assert_eq!(params.len(), 3, "internal state is the fiber direction");
        let fiber = Vector3::new(params[0], params[1], params[2]);
        let norm = fiber.norm();
        assert!(norm > 0.0, "fiber direction must be nonzero");
        self.fiber = fiber / norm;
    }

    fn direction_vectors(&self) -> Vec<Vector3<f64>> {
        vec![self.fiber]
    }

    fn clone_box(&self) -> Box<dyn MechanicsMaterial> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::check_consistency;
    use approx::assert_relative_eq;

    #[test]
    fn reduces_to_isotropic_when_fiber_modulus_is_zero() {
        let fiber = FiberReinforcedElasticity::new(0, 1.0, 1.0, 0.0, Vector3::z());
        let iso = crate::materials::NeoHookeanElasticity::new(0, 1.0, 1.0);
        let f = Matrix3::new(1.1, 0.0, 0.0, 0.0, 0.9, 0.1, 0.0, 0.0, 1.05);

        let rf = fiber.compute(Request::ENERGY | Request::FORCE, &f);
        let ri = iso.compute(Request::ENERGY | Request::FORCE, &f);
        assert_relative_eq!(rf.energy, ri.energy, epsilon = 1e-14);
        assert_relative_eq!((rf.stress - ri.stress).norm(), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn stretch_along_fiber_raises_energy() {
        let mat = FiberReinforcedElasticity::new(0, 1.0, 1.0, 5.0, Vector3::z());
        let stretch = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, 1.2));
        let across = Matrix3::from_diagonal(&Vector3::new(1.2, 1.0, 1.0));

        let along = mat.compute(Request::ENERGY, &stretch).energy;
        let perp = mat.compute(Request::ENERGY, &across).energy;
        assert!(along > perp, "fiber stretch must cost more energy");
    }

    #[test]
    fn derivatives_match_finite_differences() {
        let mat = FiberReinforcedElasticity::new(
            0,
            1.3,
            0.9,
            2.1,
            Vector3::new(1.0, 1.0, 0.5),
        );
        let f = Matrix3::new(1.05, 0.02, -0.01, 0.0, 1.1, 0.04, 0.03, 0.0, 0.92);
        assert!(f.determinant() > 0.0);

        let report = check_consistency(&mat, &f, 1e-6, 1e-7);
        assert!(report.passed(), "report: {:?}", report);
    }
}
