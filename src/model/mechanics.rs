//! Mechanics model: the assembly engine
//!
//! Owns the mesh, one constitutive material instance per quadrature point,
//! and the current/previous configuration fields. `compute` walks the
//! elements, builds the deformation gradient from nodal field values via
//! shape-function gradients, dispatches to the materials, and accumulates
//! energy, residual, sparse tangent triplets, and (for inverse mode)
//! per-parameter residual sensitivities; attached boundary-condition
//! sub-models then add their own contributions.
//!
//! The field holds nodal *positions* (not displacements): it is initialized
//! to the reference coordinates and evolves through `linearized_update`.

use std::fs;
use std::path::Path;

use nalgebra::{DVector, Matrix3, Vector3};

use crate::error::{Result, SimError};
use crate::fem::GeomElement;
use crate::materials::MechanicsMaterial;
use crate::mesh::FeMesh;
use crate::model::{
    AnchoringSpring, ContactPotential, ModelResult, PressureLoad, Request, TorsionalSpring,
};

/// Outcome of the parameter-sensitivity finite-difference check
#[derive(Debug, Clone)]
pub struct SensitivityReport {
    pub gradient_error: f64,
    pub gradient_norm: f64,
    pub hessian_error: f64,
    pub hessian_norm: f64,
    pub tolerance: f64,
}

impl SensitivityReport {
    pub fn passed(&self) -> bool {
        self.gradient_error <= self.gradient_norm * self.tolerance
            && self.hessian_error <= self.hessian_norm * self.tolerance
    }
}

pub struct MechanicsModel {
    mesh: FeMesh,
    /// One instance per quadrature point, unrolled as `e * num_qp + q`
    materials: Vec<Box<dyn MechanicsMaterial>>,
    node_dof: usize,
    /// Current nodal positions (+ membrane DOFs in flexible-contact mode)
    field: Vec<f64>,
    /// Previous-step snapshot: anchor points and follower-load reference
    prev_field: Vec<f64>,
    pressure: Option<PressureLoad>,
    nodal_forces: Option<(Vec<usize>, Vec<f64>)>,
    anchor_spring: Option<AnchoringSpring>,
    torsional_spring: Option<TorsionalSpring>,
    contact: Option<ContactPotential>,
}

impl MechanicsModel {
    /// `materials` must hold exactly one instance per quadrature point, in
    /// element-major order
    pub fn new(
        mesh: FeMesh,
        materials: Vec<Box<dyn MechanicsMaterial>>,
        node_dof: usize,
    ) -> Result<Self> {
        assert_eq!(node_dof, 3, "the mechanics model is three-dimensional");

        let total_qp: usize = mesh.elements().iter().map(|e| e.num_quad_points()).sum();
        if materials.len() != total_qp {
            return Err(SimError::Config(format!(
                "expected {} material instances (one per quadrature point), got {}",
                total_qp,
                materials.len()
            )));
        }

        let mut field = vec![0.0; mesh.num_nodes() * node_dof];
        for n in 0..mesh.num_nodes() {
            let x = mesh.x(n);
            for i in 0..node_dof {
                field[n * node_dof + i] = x[i];
            }
        }
        let prev_field = field.clone();

        Ok(Self {
            mesh,
            materials,
            node_dof,
            field,
            prev_field,
            pressure: None,
            nodal_forces: None,
            anchor_spring: None,
            torsional_spring: None,
            contact: None,
        })
    }

    pub fn mesh(&self) -> &FeMesh {
        &self.mesh
    }

    pub fn node_dof(&self) -> usize {
        self.node_dof
    }

    /// Degrees of freedom of the body mesh alone
    pub fn num_main_dofs(&self) -> usize {
        self.mesh.num_nodes() * self.node_dof
    }

    /// All degrees of freedom, including membrane DOFs in flexible-contact
    /// mode
    pub fn total_dofs(&self) -> usize {
        self.field.len()
    }

    pub fn field(&self) -> &[f64] {
        &self.field
    }

    pub fn prev_field(&self) -> &[f64] {
        &self.prev_field
    }

    /// Displacement of a body node relative to the reference configuration
    pub fn displacement(&self, node: usize) -> Vector3<f64> {
        let x = self.mesh.x(node);
        Vector3::new(
            self.field[node * self.node_dof] - x.x,
            self.field[node * self.node_dof + 1] - x.y,
            self.field[node * self.node_dof + 2] - x.z,
        )
    }

    /// The solver's update contract: add an increment to one DOF
    pub fn linearized_update(&mut self, dof: usize, delta: f64) {
        self.field[dof] += delta;
    }

    /// Overwrite one DOF (Dirichlet substitution)
    pub fn set_field(&mut self, dof: usize, value: f64) {
        self.field[dof] = value;
    }

    /// Snapshot the current field as the previous-step reference
    pub fn set_prev_field(&mut self) {
        self.prev_field.clone_from(&self.field);
    }

    pub fn materials(&self) -> &[Box<dyn MechanicsMaterial>] {
        &self.materials
    }

    // -- boundary-condition setup --------------------------------------

    /// Attach a follower pressure load over `surface` (sharing the body's
    /// node numbering)
    pub fn init_pressure(&mut self, surface: FeMesh, pressure: f64) {
        self.pressure = Some(PressureLoad::new(surface, pressure));
    }

    pub fn update_pressure(&mut self, pressure: f64) {
        if let Some(p) = &mut self.pressure {
            p.set_pressure(pressure);
        }
    }

    pub fn pressure(&self) -> Option<&PressureLoad> {
        self.pressure.as_ref()
    }

    /// Attach prescribed nodal forces as (dof index, value) pairs
    pub fn set_nodal_forces(&mut self, dof_ids: Vec<usize>, forces: Vec<f64>) {
        assert_eq!(dof_ids.len(), forces.len());
        self.nodal_forces = Some((dof_ids, forces));
    }

    /// Attach an anchoring spring over `surface` at `nodes`
    pub fn init_anchor_spring(&mut self, surface: FeMesh, nodes: Vec<usize>, stiffness: f64) {
        let mut spring = AnchoringSpring::new(surface, nodes, stiffness);
        spring.refresh_normals(&self.prev_field);
        self.anchor_spring = Some(spring);
    }

    pub fn anchor_spring(&self) -> Option<&AnchoringSpring> {
        self.anchor_spring.as_ref()
    }

    /// Attach a torsional spring at `nodes`
    pub fn init_torsional_spring(&mut self, nodes: Vec<usize>, stiffness: f64) {
        self.torsional_spring = Some(TorsionalSpring::new(&self.mesh, nodes, stiffness));
    }

    pub fn torsional_spring(&self) -> Option<&TorsionalSpring> {
        self.torsional_spring.as_ref()
    }

    /// Attach a contact potential; normals and neighbor lists are built
    /// immediately from the current configuration
    pub fn init_contact(&mut self, mut contact: ContactPotential) {
        let main_dofs = self.num_main_dofs();
        contact.refresh(main_dofs, &self.field);
        self.contact = Some(contact);
    }

    pub fn contact(&self) -> Option<&ContactPotential> {
        self.contact.as_ref()
    }

    /// Switch the contact boundary to an elastic membrane: its nodes become
    /// extra DOFs appended after the body DOFs
    pub fn make_contact_flexible(&mut self, membrane_stiffness: f64) {
        let main_dofs = self.num_main_dofs();
        let contact = self
            .contact
            .as_mut()
            .expect("attach a contact potential before making it flexible");
        contact.set_membrane_stiffness(membrane_stiffness);

        self.field.truncate(main_dofs);
        for n in 0..contact.rigid_mesh().num_nodes() {
            let x = contact.rigid_mesh().x(n);
            self.field.extend_from_slice(&[x.x, x.y, x.z]);
        }
        self.prev_field.clone_from(&self.field);
        contact.refresh_normals(main_dofs, &self.field);
        contact.search_neighbors(main_dofs, &self.field);
    }

    /// Reset the contact minimum distance from the current average gap
    pub fn recompute_contact_min_distance(&mut self, constant: bool) {
        let main_dofs = self.num_main_dofs();
        if let Some(contact) = &mut self.contact {
            contact.recompute_min_distance(main_dofs, &self.field, constant);
        }
    }

    // -- material-parameter bookkeeping --------------------------------

    /// (number of unique material ids, parameters per material)
    ///
    /// All instances must agree on the parameter count; ids must be dense
    /// starting at zero.
    pub fn parameter_layout(&self) -> Result<(usize, usize)> {
        let mut max_id = 0usize;
        let mut nprop: Option<usize> = None;

        for material in &self.materials {
            max_id = max_id.max(material.mat_id());
            let count = material.parameters().len();
            match nprop {
                None => nprop = Some(count),
                Some(expected) if expected != count => {
                    return Err(SimError::ParameterCountMismatch {
                        mat_id: material.mat_id(),
                        expected,
                        found: count,
                    });
                }
                _ => {}
            }
        }

        Ok((max_id + 1, nprop.unwrap_or(0)))
    }

    /// Total distinct material parameters across unique ids
    pub fn total_material_parameters(&self) -> Result<usize> {
        let (unique, nprop) = self.parameter_layout()?;
        Ok(unique * nprop)
    }

    /// Parameters of the first instance carrying `mat_id`
    pub fn parameters_for_id(&self, mat_id: usize) -> Result<Vec<f64>> {
        self.materials
            .iter()
            .find(|m| m.mat_id() == mat_id)
            .map(|m| m.parameters())
            .ok_or_else(|| SimError::Config(format!("no material with id {}", mat_id)))
    }

    /// Set the parameter vector on every instance sharing `mat_id`
    pub fn set_parameters_for_id(&mut self, mat_id: usize, params: &[f64]) {
        for material in &mut self.materials {
            if material.mat_id() == mat_id {
                material.set_parameters(params);
            }
        }
    }

    /// Apply a flat parameter increment, indexed `mat_id * nprop + alpha`
    pub fn apply_parameter_increment(&mut self, delta: &DVector<f64>) -> Result<()> {
        let (unique, nprop) = self.parameter_layout()?;
        assert_eq!(delta.len(), unique * nprop, "increment length mismatch");

        for id in 0..unique {
            let mut params = self.parameters_for_id(id)?;
            for m in 0..nprop {
                params[m] += delta[id * nprop + m];
            }
            self.set_parameters_for_id(id, &params);
        }
        Ok(())
    }

    // -- kinematics ----------------------------------------------------

    /// Deformation gradient at every quadrature point of one element:
    /// F(i, J) = sum_a field[node_a * dof + i] dN_a/dX_J
    pub fn deformation_gradients(&self, element: &GeomElement) -> Vec<Matrix3<f64>> {
        let nodes = element.nodes();
        (0..element.num_quad_points())
            .map(|q| {
                let mut f = Matrix3::zeros();
                for (a, &node) in nodes.iter().enumerate() {
                    for i in 0..3 {
                        for j in 0..3 {
                            f[(i, j)] += self.field[node * self.node_dof + i] * element.dn(q, a, j);
                        }
                    }
                }
                f
            })
            .collect()
    }

    /// Green-Lagrange strain E = (F^T F - I) / 2 at every quadrature point
    pub fn green_lagrange_strains(&self, element: &GeomElement) -> Vec<Matrix3<f64>> {
        self.deformation_gradients(element)
            .into_iter()
            .map(|f| (f.transpose() * f - Matrix3::identity()) * 0.5)
            .collect()
    }

    /// Volume of the reference configuration (quadrature-weight sum)
    pub fn reference_volume(&self) -> f64 {
        self.mesh
            .elements()
            .iter()
            .map(|el| (0..el.num_quad_points()).map(|q| el.weight(q)).sum::<f64>())
            .sum()
    }

    /// Volume of the current configuration (det F weighted)
    ///
    /// Elements with a non-finite determinant are logged and skipped; treat
    /// recurring reports as a modeling failure.
    pub fn current_volume(&self) -> f64 {
        let mut volume = 0.0;
        for (e, element) in self.mesh.elements().iter().enumerate() {
            let f_list = self.deformation_gradients(element);
            for (q, f) in f_list.iter().enumerate() {
                let det = f.determinant();
                if !det.is_finite() {
                    log::warn!("element {} has non-finite det F at quadrature point {}", e, q);
                    continue;
                }
                volume += element.weight(q) * det;
            }
        }
        volume
    }

    // -- assembly ------------------------------------------------------

    /// Assemble the quantities gated by the result's request bitmask
    ///
    /// In DMATPROP mode the parameter gradient is g = 2 (dR/da)^T R and the
    /// Hessian is taken as 2 (dR/da)(dR/da)^T, which is exact only when the
    /// energy is linear in each parameter; for laws where it is not, this is
    /// a known approximation.
    pub fn compute(&self, r: &mut ModelResult) -> Result<()> {
        r.reset();
        if self.contact.as_ref().is_some_and(|c| c.is_flexible()) {
            r.resize_dofs(self.total_dofs());
        }
        let request = r.request();

        let mut dr_dalpha: Vec<DVector<f64>> = Vec::new();
        let mut nprop = 0usize;
        if request.contains(Request::DMATPROP) {
            let (unique, per_mat) = self.parameter_layout()?;
            nprop = per_mat;
            dr_dalpha = vec![DVector::zeros(r.num_dofs()); unique * per_mat];
        }

        let mut qp_offset = 0usize;
        for element in self.mesh.elements() {
            let nodes = element.nodes();
            let num_qp = element.num_quad_points();
            let f_list = self.deformation_gradients(element);

            for q in 0..num_qp {
                let material = &self.materials[qp_offset + q];
                let response = material.compute(request, &f_list[q]);
                let vol = element.weight(q);

                if request.contains(Request::ENERGY) {
                    r.add_energy(response.energy * vol);
                }

                if request.contains(Request::FORCE) || request.contains(Request::DMATPROP) {
                    for (a, &node) in nodes.iter().enumerate() {
                        for i in 0..3 {
                            let mut value = 0.0;
                            for j in 0..3 {
                                value += response.stress[(i, j)] * element.dn(q, a, j);
                            }
                            r.add_residual(node * 3 + i, value * vol);
                        }
                    }
                }

                if request.contains(Request::STIFFNESS) {
                    for (a, &node_a) in nodes.iter().enumerate() {
                        for i in 0..3 {
                            for (b, &node_b) in nodes.iter().enumerate() {
                                for j in 0..3 {
                                    let mut value = 0.0;
                                    for m in 0..3 {
                                        for n in 0..3 {
                                            value += response.tangent.get(i, m, j, n)
                                                * element.dn(q, a, m)
                                                * element.dn(q, b, n);
                                        }
                                    }
                                    r.add_stiffness(node_a * 3 + i, node_b * 3 + j, value * vol);
                                }
                            }
                        }
                    }
                }

                if request.contains(Request::DMATPROP) {
                    let base = material.mat_id() * nprop;
                    for alpha in 0..nprop {
                        let sensitivity = &response.stress_sensitivity[alpha];
                        for (a, &node) in nodes.iter().enumerate() {
                            for i in 0..3 {
                                let mut value = 0.0;
                                for j in 0..3 {
                                    value += sensitivity[(i, j)] * element.dn(q, a, j);
                                }
                                dr_dalpha[base + alpha][node * 3 + i] += value * vol;
                            }
                        }
                    }
                }
            }

            qp_offset += num_qp;
        }

        // Boundary-condition sub-models
        if let Some(spring) = &self.anchor_spring {
            spring.contribute(&self.field, &self.prev_field, r);
        }
        if let Some(torsion) = &self.torsional_spring {
            torsion.contribute(&self.mesh, &self.field, r);
        }
        if let Some(contact) = &self.contact {
            contact.contribute_membrane(self.num_main_dofs(), &self.field, r)?;
            contact.contribute(self.num_main_dofs(), &self.field, r);
        }

        if request.contains(Request::STIFFNESS) {
            r.finalize_stiffness();
        }

        if let Some(pressure) = &self.pressure {
            pressure.contribute(&self.field, &self.prev_field, r);
        }

        if let Some((dof_ids, forces)) = &self.nodal_forces {
            if request.contains(Request::FORCE) || request.contains(Request::DMATPROP) {
                for (&dof, &force) in dof_ids.iter().zip(forces.iter()) {
                    r.add_residual(dof, force);
                }
            }
        }

        if request.contains(Request::DMATPROP) {
            let residual = r.residual().clone();
            for alpha in 0..dr_dalpha.len() {
                r.add_gradient(alpha, 2.0 * dr_dalpha[alpha].dot(&residual));
                for beta in 0..dr_dalpha.len() {
                    // Exact only if the energy is linear in each parameter
                    r.add_hessian(alpha, beta, 2.0 * dr_dalpha[alpha].dot(&dr_dalpha[beta]));
                }
            }
        }

        Ok(())
    }

    /// Refresh boundary-condition auxiliary geometry after a converged load
    /// step: spring normals and anchors, follower-load reference, contact
    /// normals and neighbor lists
    ///
    /// Two-phase step protocol: this runs once per load step, never inside
    /// the Newton loop, so the tangent stays consistent with the
    /// linearization point.
    pub fn finalize_compute(&mut self) {
        if let Some(spring) = &mut self.anchor_spring {
            spring.refresh_normals(&self.prev_field);
        }

        let mut next_prev = self.field.clone();
        if let Some(spring) = &self.anchor_spring {
            spring.update_anchor_points(&self.field, &self.prev_field, &mut next_prev);
        }
        self.prev_field = next_prev;

        let main_dofs = self.num_main_dofs();
        if let Some(contact) = &mut self.contact {
            contact.refresh(main_dofs, &self.field);
        }
    }

    // -- diagnostics ---------------------------------------------------

    /// Finite-difference check of the parameter gradient and Hessian
    ///
    /// The field is perturbed away from the reference configuration (where
    /// both vanish identically) with a deterministic pseudo-random pattern,
    /// the analytic gradient/Hessian are compared against centered
    /// differences of R^T R and of the gradient, and the field is restored.
    /// Diagnostic-only: results are logged and returned, never fatal.
    pub fn check_parameter_sensitivity(
        &mut self,
        perturbation: f64,
        h: f64,
        tolerance: f64,
        seed: u64,
    ) -> Result<SensitivityReport> {
        let num_dofs = self.num_main_dofs();

        // Small linear congruential generator; keeps the check reproducible
        let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let mut next_unit = move || {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 11) as f64 / (1u64 << 53) as f64
        };

        let perturb: Vec<f64> = (0..num_dofs)
            .map(|_| perturbation * (next_unit() - 0.5))
            .collect();
        for (dof, dp) in perturb.iter().enumerate() {
            self.linearized_update(dof, *dp);
        }

        let (unique, nprop) = self.parameter_layout()?;
        let total = unique * nprop;
        let mut r = ModelResult::new(self.total_dofs(), total);

        r.set_request(Request::DMATPROP);
        self.compute(&mut r)?;
        let gradient_analytic = r.gradient().clone();
        let hessian_analytic = r.hessian().clone();

        let mut gradient_error = 0.0;
        let mut gradient_norm = 0.0;
        for id in 0..unique {
            let params = self.parameters_for_id(id)?;
            for m in 0..nprop {
                r.set_request(Request::FORCE);

                let mut p = params.clone();
                p[m] += h;
                self.set_parameters_for_id(id, &p);
                self.compute(&mut r)?;
                let plus = r.residual().dot(r.residual());

                p[m] -= 2.0 * h;
                self.set_parameters_for_id(id, &p);
                self.compute(&mut r)?;
                let minus = r.residual().dot(r.residual());

                self.set_parameters_for_id(id, &params);

                let fd = (plus - minus) / (2.0 * h);
                gradient_error += (fd - gradient_analytic[id * nprop + m]).powi(2);
                gradient_norm += gradient_analytic[id * nprop + m].powi(2);
            }
        }

        let mut hessian_error = 0.0;
        let mut hessian_norm = 0.0;
        for id_a in 0..unique {
            for m_a in 0..nprop {
                let row = id_a * nprop + m_a;
                for id_b in 0..unique {
                    let params_b = self.parameters_for_id(id_b)?;
                    for m_b in 0..nprop {
                        let col = id_b * nprop + m_b;

                        let mut p = params_b.clone();
                        p[m_b] += h;
                        self.set_parameters_for_id(id_b, &p);
                        r.set_request(Request::DMATPROP);
                        self.compute(&mut r)?;
                        let grad_plus = r.gradient()[row];

                        p[m_b] -= 2.0 * h;
                        self.set_parameters_for_id(id_b, &p);
                        self.compute(&mut r)?;
                        let grad_minus = r.gradient()[row];

                        self.set_parameters_for_id(id_b, &params_b);

                        let fd = (grad_plus - grad_minus) / (2.0 * h);
                        hessian_error += (fd - hessian_analytic[(row, col)]).powi(2);
                        hessian_norm += hessian_analytic[(row, col)].powi(2);
                    }
                }
            }
        }

        // Restore the unperturbed field
        for (dof, dp) in perturb.iter().enumerate() {
            self.linearized_update(dof, -dp);
        }

        let report = SensitivityReport {
            gradient_error: gradient_error.sqrt(),
            gradient_norm: gradient_norm.sqrt(),
            hessian_error: hessian_error.sqrt(),
            hessian_norm: hessian_norm.sqrt(),
            tolerance,
        };
        if report.passed() {
            log::info!(
                "parameter sensitivity check passed: grad err {:.3e} (norm {:.3e}), Hessian err {:.3e} (norm {:.3e})",
                report.gradient_error,
                report.gradient_norm,
                report.hessian_error,
                report.hessian_norm
            );
        } else {
            log::warn!(
                "parameter sensitivity check FAILED: grad err {:.3e} (norm {:.3e}), Hessian err {:.3e} (norm {:.3e})",
                report.gradient_error,
                report.gradient_norm,
                report.hessian_error,
                report.hessian_norm
            );
        }
        Ok(report)
    }

    // -- field serialization -------------------------------------------

    /// Write the field: leading DOF count, then one value per line at full
    /// precision
    pub fn write_field<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut out = String::with_capacity(self.field.len() * 25);
        out.push_str(&format!("{}\n", self.field.len()));
        for value in &self.field {
            out.push_str(&format!("{:.17e}\n", value));
        }
        fs::write(path, out)?;
        Ok(())
    }

    /// Read a field written by `write_field`; the DOF count must match
    pub fn read_field<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let mut tokens = contents.split_whitespace();

        let declared: usize = tokens
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| SimError::Config(format!("field file {} is empty", path.display())))?;
        if declared != self.field.len() {
            return Err(SimError::Config(format!(
                "field file {} holds {} DOFs, model has {}",
                path.display(),
                declared,
                self.field.len()
            )));
        }

        let mut found = 0usize;
        for (dof, tok) in tokens.enumerate() {
            if dof >= declared {
                break;
            }
            self.field[dof] = tok.parse().map_err(|_| {
                SimError::Config(format!("bad field value '{}' in {}", tok, path.display()))
            })?;
            found += 1;
        }
        if found != declared {
            return Err(SimError::Config(format!(
                "field file {} declares {} DOFs but holds {}",
                path.display(),
                declared,
                found
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::NeoHookeanElasticity;
    use approx::assert_relative_eq;

    fn single_tet_model() -> MechanicsModel {
        let nodes = vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
        ];
        let mesh = FeMesh::volume_from_tables(nodes, &[vec![0, 1, 2, 3]]).unwrap();
        let materials: Vec<Box<dyn MechanicsMaterial>> =
            vec![Box::new(NeoHookeanElasticity::new(0, 1.0, 1.0))];
        MechanicsModel::new(mesh, materials, 3).unwrap()
    }

    #[test]
    fn reference_configuration_is_stress_free() {
        let model = single_tet_model();
        let mut r = ModelResult::new(model.total_dofs(), 0);
        r.set_request(Request::ENERGY | Request::FORCE);
        model.compute(&mut r).unwrap();

        assert_relative_eq!(r.energy(), 0.0, epsilon = 1e-13);
        assert_relative_eq!(r.residual().norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn volumes_match_at_rest() {
        let model = single_tet_model();
        assert_relative_eq!(model.reference_volume(), 1.0 / 6.0, epsilon = 1e-12);
        assert_relative_eq!(
            model.current_volume(),
            model.reference_volume(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn uniform_stretch_scales_volume() {
        let mut model = single_tet_model();
        // Scale every position by 1.1: det F = 1.1^3
        for dof in 0..model.total_dofs() {
            let value = model.field()[dof] * 1.1;
            model.set_field(dof, value);
        }
        assert_relative_eq!(
            model.current_volume(),
            model.reference_volume() * 1.1f64.powi(3),
            epsilon = 1e-10
        );
    }

    #[test]
    fn deformation_gradient_tracks_affine_map() {
        let mut model = single_tet_model();
        // x = F X with F = diag(1.2, 1.0, 0.9)
        for n in 0..model.mesh().num_nodes() {
            let x = model.mesh().x(n);
            model.set_field(n * 3, 1.2 * x.x);
            model.set_field(n * 3 + 1, x.y);
            model.set_field(n * 3 + 2, 0.9 * x.z);
        }

        let element = &model.mesh().elements()[0];
        let f = model.deformation_gradients(element);
        for fq in &f {
            assert_relative_eq!(fq[(0, 0)], 1.2, epsilon = 1e-12);
            assert_relative_eq!(fq[(1, 1)], 1.0, epsilon = 1e-12);
            assert_relative_eq!(fq[(2, 2)], 0.9, epsilon = 1e-12);
            assert_relative_eq!(fq[(0, 1)], 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn stiffness_is_assembled_and_symmetric() {
        let mut model = single_tet_model();
        // Slightly deformed state so the tangent is nontrivial
        for n in 0..model.mesh().num_nodes() {
            let x = model.mesh().x(n);
            model.set_field(n * 3, 1.05 * x.x + 0.01 * x.y);
        }

        let mut r = ModelResult::new(model.total_dofs(), 0);
        r.set_request(Request::STIFFNESS);
        model.compute(&mut r).unwrap();
        let k = r.stiffness().unwrap();

        for (value, (row, col)) in k.iter() {
            let transposed = k.get(col, row).copied().unwrap_or(0.0);
            assert_relative_eq!(*value, transposed, epsilon = 1e-9);
        }
    }
}
