//! St. Venant-Kirchhoff elasticity
//!
//! The geometrically nonlinear extension of the linear (spring-class) law:
//!
//! W = lambda/2 (tr E)^2 + mu tr(E^2),   E = (F^T F - I) / 2
//!
//! Stress and tangent follow from S = lambda tr(E) I + 2 mu E and P = F S.

use nalgebra::Matrix3;

use crate::materials::{MaterialResponse, MechanicsMaterial, Tangent4};
use crate::model::Request;

#[derive(Debug, Clone)]
pub struct StVenantKirchhoff {
    mat_id: usize,
    lambda: f64,
    mu: f64,
}

impl StVenantKirchhoff {
    pub fn new(mat_id: usize, lambda: f64, mu: f64) -> Self {
        assert!(mu > 0.0, "shear modulus must be positive");
        Self { mat_id, lambda, mu }
    }
}

impl MechanicsMaterial for StVenantKirchhoff {
    #[allow(non_snake_case)]
    fn compute(&self, request: Request, F: &Matrix3<f64>) -> MaterialResponse {
        let mut response = MaterialResponse::zeros();

        let E = (F.transpose() * F - Matrix3::identity()) * 0.5;
        let tr_E = E.trace();
        // Second Piola-Kirchhoff stress
        let S = Matrix3::identity() * (self.lambda * tr_E) + E * (2.0 * self.mu);

        if request.contains(Request::ENERGY) {
            response.energy =
                0.5 * self.lambda * tr_E * tr_E + self.mu * (E * E).trace();
        }

        if request.contains(Request::FORCE) || request.contains(Request::DMATPROP) {
            response.stress = F * S;
        }

        if request.contains(Request::STIFFNESS) {
            // K(i,J,k,L) = delta_ik S(L,J) + lambda F(i,J) F(k,L)
            //            + mu (F(i,L) F(k,J) + delta_JL B(i,k)),  B = F F^T
            let B = F * F.transpose();
            let mut tangent = Tangent4::zeros();
            for i in 0..3 {
                for j in 0..3 {
                    for k in 0..3 {
                        for l in 0..3 {
                            let delta_ik = if i == k { 1.0 } else { 0.0 };
                            let delta_jl = if j == l { 1.0 } else { 0.0 };
                            let value = delta_ik * S[(l, j)]
                                + self.lambda * F[(i, j)] * F[(k, l)]
                                + self.mu * (F[(i, l)] * F[(k, j)] + delta_jl * B[(i, k)]);
                            tangent.add(i, j, k, l, value);
                        }
                    }
                }
            }
            response.tangent = tangent;
        }

        if request.contains(Request::DMATPROP) {
            response.stress_sensitivity = vec![F * tr_E, F * E * 2.0];
        }

        response
    }

    fn mat_id(&self) -> usize {
        self.mat_id
    }

    fn parameters(&self) -> Vec<f64> {
        vec![self.lambda, self.mu]
    }

    fn set_parameters(&mut self, params: &[f64]) {
        assert_eq!(params.len(), 2, "St. Venant-Kirchhoff takes [lambda, mu]");
        self.lambda = params[0];
        self.mu = params[1];
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
    fn stress_free_reference() {
        let mat = StVenantKirchhoff::new(0, 1.2, 0.8);
        let r = mat.compute(Request::ENERGY | Request::FORCE, &Matrix3::identity());
        assert_relative_eq!(r.energy, 0.0, epsilon = 1e-14);
        assert_relative_eq!(r.stress.norm(), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn small_strain_matches_linear_elasticity() {
        // Uniaxial small strain: sigma_xx ~ (lambda + 2 mu) eps
        let (lambda, mu) = (1.0, 1.0);
        let mat = StVenantKirchhoff::new(0, lambda, mu);
        let eps = 1e-6;
        let mut f = Matrix3::identity();
        f[(0, 0)] += eps;

        let r = mat.compute(Request::FORCE, &f);
        assert_relative_eq!(
            r.stress[(0, 0)],
            (lambda + 2.0 * mu) * eps,
            max_relative = 1e-4
        );
    }

    #[test]
    fn derivatives_match_finite_differences() {
        let mat = StVenantKirchhoff::new(0, 2.0, 1.5);
        let f = Matrix3::new(1.08, 0.03, 0.0, -0.04, 0.97, 0.02, 0.0, 0.01, 1.06);
        let report = check_consistency(&mat, &f, 1e-6, 1e-7);
        assert!(report.passed(), "report: {:?}", report);
    }
}
