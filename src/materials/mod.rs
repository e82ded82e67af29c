//! Constitutive materials: deformation measure -> energy, stress, tangent
//!
//! Every law maps a deformation gradient F to an energy density W, the first
//! Piola-Kirchhoff stress P = dW/dF, the fourth-order tangent K = dP/dF, and
//! optionally the sensitivity of P to each material parameter. Laws are
//! polymorphic over a shared capability set so that the assembly engine can
//! hold one independently mutable instance per quadrature point.

pub mod fiber;
pub mod neo_hookean;
pub mod st_venant;

pub use fiber::FiberReinforcedElasticity;
pub use neo_hookean::NeoHookeanElasticity;
pub use st_venant::StVenantKirchhoff;

use nalgebra::{Matrix3, Vector3};

use crate::model::Request;

/// Fourth-order tangent tensor K(i, J, k, L) = dP(i, J)/dF(k, L)
#[derive(Debug, Clone)]
pub struct Tangent4 {
    data: [f64; 81],
}

impl Tangent4 {
    pub fn zeros() -> Self {
        Self { data: [0.0; 81] }
    }

    #[inline]
    fn index(i: usize, j: usize, k: usize, l: usize) -> usize {
        ((i * 3 + j) * 3 + k) * 3 + l
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize, k: usize, l: usize) -> f64 {
        self.data[Self::index(i, j, k, l)]
    }

    #[inline]
    pub fn add(&mut self, i: usize, j: usize, k: usize, l: usize, value: f64) {
        self.data[Self::index(i, j, k, l)] += value;
    }
}

/// Per-quadrature-point constitutive response
///
/// Only the parts gated by the request are meaningful; the rest stay zeroed.
#[derive(Debug, Clone)]
pub struct MaterialResponse {
    /// Strain-energy density W
    pub energy: f64,
    /// First Piola-Kirchhoff stress P = dW/dF
    pub stress: Matrix3<f64>,
    /// Tangent K = dP/dF
    pub tangent: Tangent4,
    /// dP/d(alpha) for each material parameter, in parameter order
    pub stress_sensitivity: Vec<Matrix3<f64>>,
}

impl MaterialResponse {
    pub fn zeros() -> Self {
        Self {
            energy: 0.0,
            stress: Matrix3::zeros(),
            tangent: Tangent4::zeros(),
            stress_sensitivity: Vec::new(),
        }
    }
}

/// Shared capability set of all constitutive law variants
pub trait MechanicsMaterial: Send {
    /// Evaluate the law at deformation gradient `f`, computing only the
    /// parts gated by `request` (DMATPROP gates `stress_sensitivity`)
    fn compute(&self, request: Request, f: &Matrix3<f64>) -> MaterialResponse;

    /// Stable id of the parameter vector this instance shares
    fn mat_id(&self) -> usize;

    fn parameters(&self) -> Vec<f64>;

    fn set_parameters(&mut self, params: &[f64]);

    /// Internal (history/state) variables, if the law carries any
    fn internal_parameters(&self) -> Vec<f64> {
        Vec::new()
    }

    fn set_internal_parameters(&mut self, _params: &[f64]) {}

    fn has_history_variables(&self) -> bool {
        false
    }

    /// Characteristic directions (e.g. fiber direction) for output
    fn direction_vectors(&self) -> Vec<Vector3<f64>> {
        Vec::new()
    }

    fn clone_box(&self) -> Box<dyn MechanicsMaterial>;
}

impl Clone for Box<dyn MechanicsMaterial> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Outcome of a finite-difference consistency check
///
/// Diagnostic-only: reported with error and norm magnitudes, never fatal.
#[derive(Debug, Clone)]
pub struct ConsistencyReport {
    pub stress_error: f64,
    pub stress_norm: f64,
    pub tangent_error: f64,
    pub tangent_norm: f64,
    pub tolerance: f64,
}

impl ConsistencyReport {
    pub fn passed(&self) -> bool {
        self.stress_error <= self.stress_norm * self.tolerance
            && self.tangent_error <= self.tangent_norm * self.tolerance
    }
}

/// Verify that analytic stress and tangent match centered finite differences
/// of the energy and stress at deformation `f`
///
/// Perturbs each component of F by +/- h. Results are logged; callers decide
/// what to do with a failure.
pub fn check_consistency(
    material: &dyn MechanicsMaterial,
    f: &Matrix3<f64>,
    h: f64,
    tolerance: f64,
) -> ConsistencyReport {
    let request = Request::ENERGY | Request::FORCE | Request::STIFFNESS;
    let analytic = material.compute(request, f);

    let mut stress_error = 0.0;
    let mut stress_norm = 0.0;
    let mut tangent_error = 0.0;
    let mut tangent_norm = 0.0;

    for k in 0..3 {
        for l in 0..3 {
            let mut f_plus = *f;
            let mut f_minus = *f;
            f_plus[(k, l)] += h;
            f_minus[(k, l)] -= h;

            let plus = material.compute(request, &f_plus);
            let minus = material.compute(request, &f_minus);

            // dW/dF(k, l) against P(k, l)
            let dw = (plus.energy - minus.energy) / (2.0 * h);
            stress_error += (dw - analytic.stress[(k, l)]).powi(2);
            stress_norm += analytic.stress[(k, l)].powi(2);

            // dP(i, j)/dF(k, l) against K(i, j, k, l)
            for i in 0..3 {
                for j in 0..3 {
                    let dp = (plus.stress[(i, j)] - minus.stress[(i, j)]) / (2.0 * h);
                    let k_an = analytic.tangent.get(i, j, k, l);
                    tangent_error += (dp - k_an).powi(2);
                    tangent_norm += k_an.powi(2);
                }
            }
        }
    }

    let report = ConsistencyReport {
        stress_error: stress_error.sqrt(),
        stress_norm: stress_norm.sqrt(),
        tangent_error: tangent_error.sqrt(),
        tangent_norm: tangent_norm.sqrt(),
        tolerance,
    };

    if report.passed() {
        log::info!(
            "material consistency check passed: stress err {:.3e} (norm {:.3e}), tangent err {:.3e} (norm {:.3e})",
            report.stress_error,
            report.stress_norm,
            report.tangent_error,
            report.tangent_norm
        );
    } else {
        log::warn!(
            "material consistency check FAILED: stress err {:.3e} (norm {:.3e}), tangent err {:.3e} (norm {:.3e})",
            report.stress_error,
            report.stress_norm,
            report.tangent_error,
            report.tangent_norm
        );
    }

    report
}
