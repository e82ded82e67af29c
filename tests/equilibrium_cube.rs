//! End-to-end equilibrium tests on a unit cube of six tetrahedra

use nalgebra::Vector3;
use approx::assert_relative_eq;
use tissue_simulator::{
    FeMesh, MechanicsMaterial, MechanicsModel, ModelResult, NeoHookeanElasticity, NewtonSolver,
    Request, SolveMode,
};

/// Unit cube nodes; node n sits at the binary digits of n
fn cube_nodes() -> Vec<Vector3<f64>> {
    (0..8)
        .map(|n| {
            Vector3::new(
                (n & 1) as f64,
                ((n >> 1) & 1) as f64,
                ((n >> 2) & 1) as f64,
            )
        })
        .collect()
}

/// Six positively oriented tetrahedra filling the cube
fn cube_connectivity() -> Vec<Vec<usize>> {
    vec![
        vec![0, 1, 3, 7],
        vec![0, 5, 1, 7],
        vec![0, 3, 2, 7],
        vec![0, 2, 6, 7],
        vec![0, 4, 5, 7],
        vec![0, 6, 4, 7],
    ]
}

fn cube_model() -> MechanicsModel {
    let mesh = FeMesh::volume_from_tables(cube_nodes(), &cube_connectivity()).unwrap();
    let materials: Vec<Box<dyn MechanicsMaterial>> = (0..mesh.num_elements())
        .map(|_| Box::new(NeoHookeanElasticity::new(0, 1.0, 1.0)) as Box<dyn MechanicsMaterial>)
        .collect();
    MechanicsModel::new(mesh, materials, 3).unwrap()
}

/// Top face of the cube (z = 1), wound for an outward (+z) normal
fn top_surface() -> FeMesh {
    FeMesh::surface_from_tables(cube_nodes(), &[vec![4, 5, 7], vec![4, 7, 6]]).unwrap()
}

/// Dirichlet set pinning the base (z = 0) at its reference position
fn base_constraints(model: &MechanicsModel) -> (Vec<usize>, Vec<f64>) {
    let mut ids = Vec::new();
    let mut values = Vec::new();
    for node in 0..4 {
        let x = model.mesh().x(node);
        for i in 0..3 {
            ids.push(node * 3 + i);
            values.push(x[i]);
        }
    }
    (ids, values)
}

#[test]
fn unloaded_reference_state_has_zero_residual() {
    let model = cube_model();
    let mut r = ModelResult::new(model.total_dofs(), 0);
    r.set_request(Request::ENERGY | Request::FORCE);
    model.compute(&mut r).unwrap();

    assert_relative_eq!(r.energy(), 0.0, epsilon = 1e-12);
    for dof in 0..model.total_dofs() {
        assert_relative_eq!(r.residual()[dof], 0.0, epsilon = 1e-11);
    }
}

#[test]
fn pressure_patch_totals_area_times_normal() {
    // Sum of nodal pressure contributions over one loaded face must equal
    // pressure * face area * outward unit normal
    let mut model = cube_model();
    let pressure = 1.54;
    model.init_pressure(top_surface(), pressure);

    let mut r = ModelResult::new(model.total_dofs(), 0);
    r.set_request(Request::FORCE);
    model.compute(&mut r).unwrap();

    let mut total = Vector3::zeros();
    for node in 0..model.mesh().num_nodes() {
        total += Vector3::new(
            r.residual()[node * 3],
            r.residual()[node * 3 + 1],
            r.residual()[node * 3 + 2],
        );
    }

    // Face area 1.0, normal +z
    assert_relative_eq!(total.x, 0.0, epsilon = 1e-12);
    assert_relative_eq!(total.y, 0.0, epsilon = 1e-12);
    assert_relative_eq!(total.z, pressure, epsilon = 1e-12);
}

#[test]
fn newton_converges_monotonically_under_pressure() {
    let mut model = cube_model();
    model.init_pressure(top_surface(), 0.02);

    let (ids, values) = base_constraints(&model);
    let solver = NewtonSolver::new(1.0e-11, 30);
    let stats = solver
        .solve(&mut model, SolveMode::Disp, &ids, &values)
        .expect("well-posed problem must converge");

    assert!(stats.iterations <= 30);
    assert!(stats.residual_norm < 1.0e-11);

    // Residual norm strictly decreases over the iteration history
    for pair in stats.residual_history.windows(2) {
        assert!(
            pair[1] < pair[0],
            "residual must decrease monotonically: {:?}",
            stats.residual_history
        );
    }

    // The loaded face moved; the constrained base did not
    assert!(model.displacement(7).norm() > 1e-6);
    assert_relative_eq!(model.displacement(0).norm(), 0.0, epsilon = 1e-12);
}

#[test]
fn iteration_cap_is_a_reported_failure() {
    let mut model = cube_model();
    model.init_pressure(top_surface(), 0.05);

    let (ids, values) = base_constraints(&model);
    // One iteration cannot reach a 1e-14 tolerance from a loaded state
    let solver = NewtonSolver::new(1.0e-14, 1);
    let err = solver
        .solve(&mut model, SolveMode::Disp, &ids, &values)
        .unwrap_err();
    assert!(matches!(
        err,
        tissue_simulator::SimError::ConvergenceFailed { iterations: 1, .. }
    ));
}

#[test]
fn field_round_trips_through_file() {
    let mut model = cube_model();
    // A nontrivial state
    for dof in 0..model.total_dofs() {
        let value = model.field()[dof] * 1.0371 + 0.019 * (dof as f64);
        model.set_field(dof, value);
    }
    let before = model.field().to_vec();

    let path = std::env::temp_dir().join("tissue_simulator_field_roundtrip.txt");
    model.write_field(&path).unwrap();
    // Scramble, then reload
    for dof in 0..model.total_dofs() {
        model.set_field(dof, 0.0);
    }
    model.read_field(&path).unwrap();
    std::fs::remove_file(&path).ok();

    for (a, b) in before.iter().zip(model.field()) {
        assert_eq!(a, b, "field values must round-trip bit-for-bit");
    }
}

#[test]
fn energy_only_request_skips_tensor_work() {
    let mut model = cube_model();
    model.init_pressure(top_surface(), 0.03);

    let mut r = ModelResult::new(model.total_dofs(), 0);
    r.set_request(Request::ENERGY);
    model.compute(&mut r).unwrap();

    // Stiffness was never assembled under an energy-only request
    assert!(r.stiffness().is_none());
}
