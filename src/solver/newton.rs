//! Newton-Raphson equilibrium solver
//!
//! Drives the assembly engine to equilibrium in one of two modes:
//!
//! - `Disp`: solve for the displacement field given Dirichlet constraints.
//!   Each iteration requests FORCE + STIFFNESS, eliminates the prescribed
//!   rows/columns by direct substitution, factorizes the reduced symmetric
//!   system (dense Cholesky, LU as fallback), and applies the increment
//!   through the model's linearized-update contract.
//! - `Mat`: inverse parameter identification. Displacements are held at the
//!   prescribed target values; iterations update the material-parameter
//!   unknowns from the DMATPROP gradient/Hessian with the same Newton and
//!   factorization machinery.
//!
//! Convergence is the RMS-weighted residual (or parameter-gradient) norm
//! below an absolute tolerance; exceeding the iteration cap is an error,
//! never silently accepted. After convergence the model's step protocol
//! (`finalize_compute`) refreshes the boundary-condition geometry for the
//! next load step.

use nalgebra::{DMatrix, DVector};

use crate::error::{Result, SimError};
use crate::model::{MechanicsModel, ModelResult, Request};

/// Which unknowns the Newton iteration updates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveMode {
    /// Displacement field, fixed material parameters
    Disp,
    /// Material parameters, fixed (prescribed) displacement field
    Mat,
}

/// Convergence record of one solve
#[derive(Debug, Clone)]
pub struct SolveStats {
    pub iterations: usize,
    pub residual_norm: f64,
    /// RMS residual per iteration, starting with the initial state
    pub residual_history: Vec<f64>,
}

pub struct NewtonSolver {
    tolerance: f64,
    max_iterations: usize,
}

impl NewtonSolver {
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        assert!(tolerance > 0.0, "tolerance must be positive");
        assert!(max_iterations > 0, "need at least one iteration");
        Self {
            tolerance,
            max_iterations,
        }
    }

    /// Solve one load step; `dof_ids`/`dof_values` are the prescribed DOF
    /// indices and values (Dirichlet set in `Disp` mode, displacement
    /// targets in `Mat` mode)
    pub fn solve(
        &self,
        model: &mut MechanicsModel,
        mode: SolveMode,
        dof_ids: &[usize],
        dof_values: &[f64],
    ) -> Result<SolveStats> {
        assert_eq!(dof_ids.len(), dof_values.len());
        match mode {
            SolveMode::Disp => self.solve_displacement(model, dof_ids, dof_values),
            SolveMode::Mat => self.solve_parameters(model, dof_ids, dof_values),
        }
    }

    fn solve_displacement(
        &self,
        model: &mut MechanicsModel,
        dof_ids: &[usize],
        dof_values: &[f64],
    ) -> Result<SolveStats> {
        // Direct substitution of the prescribed values
        for (&dof, &value) in dof_ids.iter().zip(dof_values.iter()) {
            model.set_field(dof, value);
        }

        let total = model.total_dofs();
        let mut prescribed = vec![false; total];
        for &dof in dof_ids {
            prescribed[dof] = true;
        }
        let free: Vec<usize> = (0..total).filter(|&d| !prescribed[d]).collect();
        // Global DOF -> reduced index
        let mut reduced_index = vec![usize::MAX; total];
        for (i, &dof) in free.iter().enumerate() {
            reduced_index[dof] = i;
        }

        let mut r = ModelResult::new(total, 0);
        r.set_request(Request::FORCE | Request::STIFFNESS);

        let mut history = Vec::with_capacity(self.max_iterations);
        for iteration in 0..self.max_iterations {
            model.compute(&mut r)?;

            let norm = rms_norm_at(r.residual(), &free);
            history.push(norm);
            log::info!("newton iteration {}: residual {:.6e}", iteration, norm);

            if norm < self.tolerance {
                model.finalize_compute();
                return Ok(SolveStats {
                    iterations: iteration,
                    residual_norm: norm,
                    residual_history: history,
                });
            }

            // Reduced system: eliminate prescribed rows/columns
            let stiffness = r.stiffness().ok_or(SimError::SingularSystem)?;
            let n_free = free.len();
            let mut k_reduced = DMatrix::zeros(n_free, n_free);
            for (value, (row, col)) in stiffness.iter() {
                let (i, j) = (reduced_index[row], reduced_index[col]);
                if i != usize::MAX && j != usize::MAX {
                    k_reduced[(i, j)] += *value;
                }
            }
            let rhs = DVector::from_iterator(n_free, free.iter().map(|&d| -r.residual()[d]));

            let delta = solve_dense_spd(k_reduced, &rhs)?;
            for (i, &dof) in free.iter().enumerate() {
                model.linearized_update(dof, delta[i]);
            }
        }

        let residual = *history.last().unwrap_or(&f64::NAN);
        Err(SimError::ConvergenceFailed {
            iterations: self.max_iterations,
            residual,
        })
    }

    fn solve_parameters(
        &self,
        model: &mut MechanicsModel,
        dof_ids: &[usize],
        dof_values: &[f64],
    ) -> Result<SolveStats> {
        // Hold the field at the prescribed target values
        for (&dof, &value) in dof_ids.iter().zip(dof_values.iter()) {
            model.set_field(dof, value);
        }

        let total_params = model.total_material_parameters()?;
        let mut r = ModelResult::new(model.total_dofs(), total_params);
        r.set_request(Request::DMATPROP);

        let mut history = Vec::with_capacity(self.max_iterations);
        for iteration in 0..self.max_iterations {
            model.compute(&mut r)?;

            let norm = if total_params == 0 {
                0.0
            } else {
                r.gradient().norm() / (total_params as f64).sqrt()
            };
            history.push(norm);
            log::info!(
                "newton (parameter) iteration {}: gradient {:.6e}",
                iteration,
                norm
            );

            if norm < self.tolerance {
                model.finalize_compute();
                return Ok(SolveStats {
                    iterations: iteration,
                    residual_norm: norm,
                    residual_history: history,
                });
            }

            let delta = solve_dense_spd(r.hessian().clone(), &(-r.gradient()))?;
            model.apply_parameter_increment(&delta)?;
        }

        let residual = *history.last().unwrap_or(&f64::NAN);
        Err(SimError::ConvergenceFailed {
            iterations: self.max_iterations,
            residual,
        })
    }
}

/// RMS norm of selected entries
fn rms_norm_at(vector: &DVector<f64>, dofs: &[usize]) -> f64 {
    if dofs.is_empty() {
        return 0.0;
    }
    let sum: f64 = dofs.iter().map(|&d| vector[d] * vector[d]).sum();
    (sum / dofs.len() as f64).sqrt()
}

/// Factorize and solve a dense symmetric positive-definite system
///
/// Cholesky first; an LU fallback covers semi-definite corner cases (e.g. a
/// parameter Hessian with an inactive parameter) and is reported when used.
fn solve_dense_spd(matrix: DMatrix<f64>, rhs: &DVector<f64>) -> Result<DVector<f64>> {
    match matrix.clone().cholesky() {
        Some(factorization) => Ok(factorization.solve(rhs)),
        None => {
            log::warn!("Cholesky factorization failed, falling back to LU");
            matrix
                .lu()
                .solve(rhs)
                .ok_or(SimError::SingularSystem)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn dense_solver_recovers_known_solution() {
        // SPD system [[4, 1], [1, 3]] x = [1, 2]
        let matrix = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
        let rhs = DVector::from_vec(vec![1.0, 2.0]);
        let x = solve_dense_spd(matrix.clone(), &rhs).unwrap();

        let check = matrix * x;
        assert_relative_eq!(check[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(check[1], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn singular_system_is_reported() {
        let matrix = DMatrix::zeros(2, 2);
        let rhs = DVector::from_vec(vec![1.0, 0.0]);
        assert!(matches!(
            solve_dense_spd(matrix, &rhs),
            Err(SimError::SingularSystem)
        ));
    }

    #[test]
    fn rms_norm_ignores_prescribed_entries() {
        let v = DVector::from_vec(vec![3.0, 100.0, 4.0]);
        let norm = rms_norm_at(&v, &[0, 2]);
        assert_relative_eq!(norm, (25.0f64 / 2.0).sqrt(), epsilon = 1e-12);
    }
}
