//! Per-step diagnostic snapshot for external exporters
//!
//! The core exposes, per load step, the data a visualization or
//! postprocessing collaborator needs: nodal positions and displacements,
//! per-element stress/strain, material parameters and internal variables,
//! and boundary-condition diagnostics. Serialization formats live outside
//! the crate.

use nalgebra::{Matrix3, Vector3};

use crate::model::{MechanicsModel, ModelResult, Request};

/// Contact sub-model diagnostics
#[derive(Debug, Clone)]
pub struct ContactDiagnostics {
    /// Outward normals at the rigid boundary nodes
    pub rigid_normals: Vec<Vector3<f64>>,
    /// Body boundary nodes, in the body mesh's numbering
    pub body_nodes: Vec<usize>,
    /// Rigid neighbors of each body node (same order as `body_nodes`)
    pub neighbors: Vec<Vec<usize>>,
    /// Contact force acting on each body node
    pub contact_forces: Vec<Vector3<f64>>,
}

/// One load step's worth of output data
#[derive(Debug, Clone)]
pub struct StepOutput {
    pub step: usize,
    /// Reference nodal coordinates
    pub positions: Vec<Vector3<f64>>,
    /// Current displacements relative to the reference configuration
    pub displacements: Vec<Vector3<f64>>,
    /// First Piola-Kirchhoff stress per element (first-quadrature-point
    /// convention)
    pub pk1_stress: Vec<Matrix3<f64>>,
    /// Green-Lagrange strain per element (first quadrature point)
    pub green_strain: Vec<Matrix3<f64>>,
    /// Material parameters per element, averaged over quadrature points
    pub material_parameters: Vec<Vec<f64>>,
    /// Internal variables per element, averaged over quadrature points
    pub internal_variables: Vec<Vec<f64>>,
    /// Anchoring-spring normals, when that sub-model is attached
    pub spring_normals: Option<Vec<Vector3<f64>>>,
    pub contact: Option<ContactDiagnostics>,
}

/// Collect the current state of `model` into a `StepOutput`
pub fn snapshot(model: &MechanicsModel, step: usize) -> StepOutput {
    let mesh = model.mesh();
    let num_nodes = mesh.num_nodes();

    let positions: Vec<Vector3<f64>> = (0..num_nodes).map(|n| mesh.x(n)).collect();
    let displacements: Vec<Vector3<f64>> = (0..num_nodes).map(|n| model.displacement(n)).collect();

    let mut pk1_stress = Vec::with_capacity(mesh.num_elements());
    let mut green_strain = Vec::with_capacity(mesh.num_elements());
    let mut material_parameters = Vec::with_capacity(mesh.num_elements());
    let mut internal_variables = Vec::with_capacity(mesh.num_elements());

    let mut qp_offset = 0usize;
    for element in mesh.elements() {
        let num_qp = element.num_quad_points();
        let f_list = model.deformation_gradients(element);
        let e_list = model.green_lagrange_strains(element);

        // First-QP stress/strain per element
        let response = model.materials()[qp_offset].compute(Request::FORCE, &f_list[0]);
        pk1_stress.push(response.stress);
        green_strain.push(e_list[0]);

        // Quadrature-point averages of parameters and internal variables
        let mut params = model.materials()[qp_offset].parameters();
        let mut internals = model.materials()[qp_offset].internal_parameters();
        for q in 1..num_qp {
            let material = &model.materials()[qp_offset + q];
            for (accum, value) in params.iter_mut().zip(material.parameters()) {
                *accum += value;
            }
            for (accum, value) in internals.iter_mut().zip(material.internal_parameters()) {
                *accum += value;
            }
        }
        let scale = 1.0 / num_qp as f64;
        params.iter_mut().for_each(|p| *p *= scale);
        internals.iter_mut().for_each(|p| *p *= scale);
        material_parameters.push(params);
        internal_variables.push(internals);

        qp_offset += num_qp;
    }

    let spring_normals = model.anchor_spring().map(|s| s.normals().to_vec());
    let contact = model.contact().map(|c| contact_diagnostics(model, c));

    StepOutput {
        step,
        positions,
        displacements,
        pk1_stress,
        green_strain,
        material_parameters,
        internal_variables,
        spring_normals,
        contact,
    }
}

fn contact_diagnostics(
    model: &MechanicsModel,
    contact: &crate::model::ContactPotential,
) -> ContactDiagnostics {
    // Re-run only the contact contribution to isolate its nodal forces
    let mut r = ModelResult::new(model.total_dofs(), 0);
    r.set_request(Request::FORCE);
    r.reset();
    contact.contribute(model.num_main_dofs(), model.field(), &mut r);

    let contact_forces = contact
        .body_nodes()
        .iter()
        .map(|&node| {
            Vector3::new(
                -r.residual()[node * 3],
                -r.residual()[node * 3 + 1],
                -r.residual()[node * 3 + 2],
            )
        })
        .collect();

    ContactDiagnostics {
        rigid_normals: contact.rigid_normals().to_vec(),
        body_nodes: contact.body_nodes().to_vec(),
        neighbors: contact.neighbors().to_vec(),
        contact_forces,
    }
}
