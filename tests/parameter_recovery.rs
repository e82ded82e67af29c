//! Inverse-mode round trip: forward-solve with known material parameters,
//! perturb them, and recover the truth from the converged displacement field

use approx::assert_relative_eq;
use nalgebra::Vector3;
use tissue_simulator::{
    FeMesh, MechanicsMaterial, MechanicsModel, ModelResult, NeoHookeanElasticity, NewtonSolver,
    Request, SolveMode,
};

fn cube_model(c1: f64, c2: f64) -> MechanicsModel {
    let nodes: Vec<Vector3<f64>> = (0..8)
        .map(|n| {
            Vector3::new(
                (n & 1) as f64,
                ((n >> 1) & 1) as f64,
                ((n >> 2) & 1) as f64,
            )
        })
        .collect();
    let connectivity = vec![
        vec![0, 1, 3, 7],
        vec![0, 5, 1, 7],
        vec![0, 3, 2, 7],
        vec![0, 2, 6, 7],
        vec![0, 4, 5, 7],
        vec![0, 6, 4, 7],
    ];
    let mesh = FeMesh::volume_from_tables(nodes, &connectivity).unwrap();
    let materials: Vec<Box<dyn MechanicsMaterial>> = (0..mesh.num_elements())
        .map(|_| Box::new(NeoHookeanElasticity::new(0, c1, c2)) as Box<dyn MechanicsMaterial>)
        .collect();
    MechanicsModel::new(mesh, materials, 3).unwrap()
}

#[test]
fn known_parameters_are_recovered_from_displacements() {
    let (c1_true, c2_true) = (1.0, 1.0);
    let mut model = cube_model(c1_true, c2_true);

    // Pull the top face down with prescribed nodal forces
    let mut force_ids = Vec::new();
    let mut forces = Vec::new();
    for node in 4..8 {
        force_ids.push(node * 3 + 2);
        forces.push(-0.02);
    }
    model.set_nodal_forces(force_ids.clone(), forces.clone());

    // Base held at its reference position
    let mut ids = Vec::new();
    let mut values = Vec::new();
    for node in 0..4 {
        let x = model.mesh().x(node);
        for i in 0..3 {
            ids.push(node * 3 + i);
            values.push(x[i]);
        }
    }

    let solver = NewtonSolver::new(1.0e-12, 50);
    solver
        .solve(&mut model, SolveMode::Disp, &ids, &values)
        .expect("forward solve");

    // Freeze the support reactions as external forces so the residual
    // vanishes at every DOF for the true parameters
    let mut r = ModelResult::new(model.total_dofs(), 0);
    r.set_request(Request::FORCE);
    model.compute(&mut r).unwrap();
    for &dof in &ids {
        force_ids.push(dof);
        forces.push(-r.residual()[dof]);
    }
    model.set_nodal_forces(force_ids, forces);

    // Every DOF of the converged field becomes a target
    let targets: Vec<f64> = model.field().to_vec();
    let target_ids: Vec<usize> = (0..targets.len()).collect();

    // Perturb the parameters away from the truth
    model.set_parameters_for_id(0, &[0.6 * c1_true, 1.7 * c2_true]);

    let inverse = NewtonSolver::new(1.0e-9, 10);
    let stats = inverse
        .solve(&mut model, SolveMode::Mat, &target_ids, &targets)
        .expect("inverse solve");

    let recovered = model.parameters_for_id(0).unwrap();
    assert_relative_eq!(recovered[0], c1_true, max_relative = 1e-6);
    assert_relative_eq!(recovered[1], c2_true, max_relative = 1e-6);

    // The energy is linear in both parameters here, so the Hessian
    // approximation is exact and convergence is immediate
    assert!(stats.iterations <= 3, "stats: {:?}", stats);
}

#[test]
fn parameter_sensitivity_check_passes_for_linear_law() {
    let mut model = cube_model(1.2, 0.9);
    let report = model
        .check_parameter_sensitivity(0.05, 1e-6, 1e-6, 42)
        .unwrap();
    assert!(report.passed(), "{:?}", report);
}
