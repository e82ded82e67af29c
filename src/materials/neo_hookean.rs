//! Compressible Neo-Hookean hyperelasticity
//!
//! W = c1 (I1 - 3 - 2 ln J) + c2 (ln J)^2
//!
//! with I1 = tr(F^T F) and J = det F. Both parameters enter the energy
//! linearly, so the parameter-sensitivity tensors are exact and the inverse
//! solver's Hessian approximation holds exactly for this law.
//!
//! # References
//! - Bonet & Wood, "Nonlinear Continuum Mechanics for Finite Element
//!   Analysis", Ch. 6

use nalgebra::Matrix3;

use crate::materials::{MaterialResponse, MechanicsMaterial, Tangent4};
use crate::model::Request;

#[derive(Debug, Clone)]
pub struct NeoHookeanElasticity {
    mat_id: usize,
    /// Shear-like modulus c1
    c1: f64,
    /// Volumetric modulus c2
    c2: f64,
}

impl NeoHookeanElasticity {
    pub fn new(mat_id: usize, c1: f64, c2: f64) -> Self {
        assert!(c1 > 0.0 && c2 > 0.0, "moduli must be positive");
        Self { mat_id, c1, c2 }
    }
}

impl MechanicsMaterial for NeoHookeanElasticity {
    #[allow(non_snake_case)]
    fn compute(&self, request: Request, F: &Matrix3<f64>) -> MaterialResponse {
        let mut response = MaterialResponse::zeros();

        let J = F.determinant();
        let ln_J = J.ln();
        // F^{-T}: d(ln J)/dF
        let Finv_T = F
            .try_inverse()
            .unwrap_or_else(|| {
                log::warn!("non-invertible deformation gradient, det F = {:.3e}", J);
                Matrix3::identity()
            })
            .transpose();
        let I1 = (F.transpose() * F).trace();

        if request.contains(Request::ENERGY) {
            response.energy = self.c1 * (I1 - 3.0 - 2.0 * ln_J) + self.c2 * ln_J * ln_J;
        }

        if request.contains(Request::FORCE) || request.contains(Request::DMATPROP) {
            // P = 2 c1 (F - F^{-T}) + 2 c2 ln J F^{-T}
            response.stress =
                2.0 * self.c1 * (F - Finv_T) + 2.0 * self.c2 * ln_J * Finv_T;
        }

        if request.contains(Request::STIFFNESS) {
            // d(F^{-T}(i,J))/dF(k,L) = -F^{-T}(i,L) F^{-T}(k,J)
            let mut tangent = Tangent4::zeros();
            for i in 0..3 {
                for j in 0..3 {
                    for k in 0..3 {
                        for l in 0..3 {
                            let delta_ik = if i == k { 1.0 } else { 0.0 };
                            let delta_jl = if j == l { 1.0 } else { 0.0 };
                            let inv_outer = Finv_T[(i, l)] * Finv_T[(k, j)];
                            let value = 2.0 * self.c1 * (delta_ik * delta_jl + inv_outer)
                                + 2.0
                                    * self.c2
                                    * (Finv_T[(k, l)] * Finv_T[(i, j)] - ln_J * inv_outer);
                            tangent.add(i, j, k, l, value);
                        }
                    }
                }
            }
            response.tangent = tangent;
        }

        if request.contains(Request::DMATPROP) {
            response.stress_sensitivity =
                vec![2.0 * (F - Finv_T), 2.0 * ln_J * Finv_T];
        }

        response
    }

    fn mat_id(&self) -> usize {
        self.mat_id
    }

    fn parameters(&self) -> Vec<f64> {
        vec![self.c1, self.c2]
    }

    fn set_parameters(&mut self, params: &[f64]) {
        assert_eq!(params.len(), 2, "Neo-Hookean takes [c1, c2]");
        self.c1 = params[0];
        self.c2 = params[1];
    }

    fn clone_box(&self) -> Box<dyn MechanicsMaterial> {
        Box::new(self.clone())
    }
}
