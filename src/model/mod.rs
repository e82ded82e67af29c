//! Assembly engine: request flags, result accumulator, mechanics model and
//! boundary-condition sub-models

pub mod anchor_spring;
pub mod contact;
pub mod mechanics;
pub mod pressure;
pub mod torsion;

pub use anchor_spring::AnchoringSpring;
pub use contact::{ContactPotential, PotentialKind};
pub use mechanics::{MechanicsModel, SensitivityReport};
pub use pressure::PressureLoad;
pub use torsion::TorsionalSpring;

use nalgebra::{DMatrix, DVector, Vector3};
use sprs::{CsMat, TriMat};

use crate::mesh::FeMesh;

/// Area-weighted outward normals at a node subset of a surface mesh
///
/// Element normals a1 x a2 are accumulated over quadrature points without
/// normalizing, so elements with larger area count more; each node's normal
/// is the normalized sum over its adjacent elements. Positions are supplied
/// by the caller (previous-step field for staggered boundary conditions).
pub(crate) fn averaged_surface_normals(
    surface: &FeMesh,
    position: &dyn Fn(usize) -> Vector3<f64>,
    adjacency: &[Vec<usize>],
    nodes: &[usize],
) -> Vec<Vector3<f64>> {
    let mut element_normals = vec![Vector3::zeros(); surface.num_elements()];

    for (e, element) in surface.elements().iter().enumerate() {
        for q in 0..element.num_quad_points() {
            let mut a1 = Vector3::zeros();
            let mut a2 = Vector3::zeros();
            for (a, &node) in element.nodes().iter().enumerate() {
                let x = position(node);
                a1 += x * element.dn(q, a, 0);
                a2 += x * element.dn(q, a, 1);
            }
            element_normals[e] += a1.cross(&a2);
        }
    }

    nodes
        .iter()
        .zip(adjacency.iter())
        .map(|(_, connected)| {
            let sum: Vector3<f64> = connected.iter().map(|&e| element_normals[e]).sum();
            sum / sum.norm()
        })
        .collect()
}

/// Request bitmask gating which quantities a `compute` call accumulates
///
/// Any subset may be requested; each flag gates its own accumulation loop so
/// that unneeded tensor work is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request(u32);

impl Request {
    pub const NONE: Request = Request(0);
    pub const ENERGY: Request = Request(1);
    pub const FORCE: Request = Request(2);
    pub const STIFFNESS: Request = Request(4);
    /// Material-parameter sensitivity (gradient and Hessian of the
    /// force-matching objective)
    pub const DMATPROP: Request = Request(8);

    pub fn contains(self, other: Request) -> bool {
        self.0 & other.0 != 0
    }
}

impl std::ops::BitOr for Request {
    type Output = Request;

    fn bitor(self, rhs: Request) -> Request {
        Request(self.0 | rhs.0)
    }
}

/// Request-gated accumulator for one `compute` call
///
/// Holds the scalar energy, the global residual, the sparse tangent
/// (collected as triplets, then merged with duplicate summation), and, in
/// parameter-identification mode, the parameter gradient and Hessian.
/// Allocated once per problem and reset on every `compute`.
#[derive(Debug, Clone)]
pub struct ModelResult {
    request: Request,
    energy: f64,
    residual: DVector<f64>,
    triplets: Vec<(usize, usize, f64)>,
    stiffness: Option<CsMat<f64>>,
    gradient: DVector<f64>,
    hessian: DMatrix<f64>,
}

impl ModelResult {
    /// Allocate an accumulator for `num_dofs` degrees of freedom and
    /// `num_params` total distinct material parameters
    pub fn new(num_dofs: usize, num_params: usize) -> Self {
        Self {
            request: Request::NONE,
            energy: 0.0,
            residual: DVector::zeros(num_dofs),
            triplets: Vec::new(),
            stiffness: None,
            gradient: DVector::zeros(num_params),
            hessian: DMatrix::zeros(num_params, num_params),
        }
    }

    pub fn set_request(&mut self, request: Request) {
        self.request = request;
    }

    pub fn request(&self) -> Request {
        self.request
    }

    /// Zero out exactly the parts gated by the active request
    pub fn reset(&mut self) {
        if self.request.contains(Request::ENERGY) {
            self.energy = 0.0;
        }
        if self.request.contains(Request::FORCE) || self.request.contains(Request::DMATPROP) {
            self.residual.fill(0.0);
        }
        if self.request.contains(Request::STIFFNESS) {
            self.triplets.clear();
            self.stiffness = None;
        }
        if self.request.contains(Request::DMATPROP) {
            self.gradient.fill(0.0);
            self.hessian.fill(0.0);
        }
    }

    /// Grow the residual when extra DOFs appear (flexible contact membrane);
    /// already-accumulated entries are preserved
    pub fn resize_dofs(&mut self, num_dofs: usize) {
        if self.residual.len() < num_dofs {
            let mut grown = DVector::zeros(num_dofs);
            grown.rows_mut(0, self.residual.len()).copy_from(&self.residual);
            self.residual = grown;
        }
    }

    pub fn num_dofs(&self) -> usize {
        self.residual.len()
    }

    pub fn num_params(&self) -> usize {
        self.gradient.len()
    }

    pub fn add_energy(&mut self, w: f64) {
        self.energy += w;
    }

    pub fn energy(&self) -> f64 {
        self.energy
    }

    pub fn add_residual(&mut self, dof: usize, value: f64) {
        self.residual[dof] += value;
    }

    pub fn residual(&self) -> &DVector<f64> {
        &self.residual
    }

    /// Append one (row, col, value) stiffness contribution
    pub fn add_stiffness(&mut self, row: usize, col: usize, value: f64) {
        self.triplets.push((row, col, value));
    }

    /// Merge collected triplets into CSR, summing duplicate (row, col) pairs
    pub fn finalize_stiffness(&mut self) {
        let n = self.residual.len();
        let mut tri = TriMat::with_capacity((n, n), self.triplets.len());
        for &(r, c, v) in &self.triplets {
            tri.add_triplet(r, c, v);
        }
        self.stiffness = Some(tri.to_csr());
    }

    /// Assembled tangent; available after `finalize_stiffness`
    pub fn stiffness(&self) -> Option<&CsMat<f64>> {
        self.stiffness.as_ref()
    }

    pub fn add_gradient(&mut self, param: usize, value: f64) {
        self.gradient[param] += value;
    }

    pub fn gradient(&self) -> &DVector<f64> {
        &self.gradient
    }

    pub fn add_hessian(&mut self, alpha: usize, beta: usize, value: f64) {
        self.hessian[(alpha, beta)] += value;
    }

    pub fn hessian(&self) -> &DMatrix<f64> {
        &self.hessian
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn request_subsets() {
        let r = Request::FORCE | Request::STIFFNESS;
        assert!(r.contains(Request::FORCE));
        assert!(r.contains(Request::STIFFNESS));
        assert!(!r.contains(Request::ENERGY));
        assert!(!r.contains(Request::DMATPROP));
    }

    #[test]
    fn duplicate_triplets_are_summed() {
        let mut result = ModelResult::new(3, 0);
        result.set_request(Request::STIFFNESS);
        result.reset();

        result.add_stiffness(0, 1, 2.0);
        result.add_stiffness(0, 1, 3.0);
        result.add_stiffness(2, 2, 1.0);
        result.finalize_stiffness();

        let k = result.stiffness().unwrap();
        assert_relative_eq!(*k.get(0, 1).unwrap(), 5.0);
        assert_relative_eq!(*k.get(2, 2).unwrap(), 1.0);
        assert!(k.get(1, 0).is_none());
    }

    #[test]
    fn reset_only_touches_requested_parts() {
        let mut result = ModelResult::new(2, 1);
        result.set_request(Request::ENERGY | Request::FORCE);
        result.add_energy(4.0);
        result.add_residual(0, 1.0);
        result.add_gradient(0, 7.0);

        result.reset();
        assert_relative_eq!(result.energy(), 0.0);
        assert_relative_eq!(result.residual()[0], 0.0);
        // DMATPROP not requested: gradient untouched
        assert_relative_eq!(result.gradient()[0], 7.0);
    }

    #[test]
    fn resize_preserves_accumulated_entries() {
        let mut result = ModelResult::new(2, 0);
        result.set_request(Request::FORCE);
        result.reset();
        result.add_residual(1, 3.0);

        result.resize_dofs(5);
        assert_eq!(result.num_dofs(), 5);
        assert_relative_eq!(result.residual()[1], 3.0);
        assert_relative_eq!(result.residual()[4], 0.0);
    }
}
