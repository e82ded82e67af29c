use nalgebra::Vector3;

use tissue_simulator::{
    snapshot, FeMesh, MechanicsMaterial, MechanicsModel, NeoHookeanElasticity, NewtonSolver,
    SolveMode,
};

fn main() {
    env_logger::init();

    println!("=== Pressurized Cube Equilibrium Demo ===\n");

    // Problem setup: unit cube of Neo-Hookean material, base held fixed,
    // follower pressure on the top face, ramped over a few load steps.

    // Unit cube split into six positively oriented tetrahedra
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
    let mesh = FeMesh::volume_from_tables(nodes.clone(), &connectivity).expect("cube mesh");

    // Top face (z = 1), wound for an outward (+z) normal
    let surface =
        FeMesh::surface_from_tables(nodes, &[vec![4, 5, 7], vec![4, 7, 6]]).expect("top surface");

    println!("Nodes: {}", mesh.num_nodes());
    println!("Elements: {}", mesh.num_elements());

    // One material instance per quadrature point (Tet4: one each)
    let materials: Vec<Box<dyn MechanicsMaterial>> = (0..mesh.num_elements())
        .map(|_| Box::new(NeoHookeanElasticity::new(0, 1.0, 1.0)) as Box<dyn MechanicsMaterial>)
        .collect();

    let mut model = MechanicsModel::new(mesh, materials, 3).expect("model");
    model.init_pressure(surface, 0.0);

    // Base nodes (z = 0) fully fixed at their reference positions
    let mut dof_ids = Vec::new();
    let mut dof_values = Vec::new();
    for node in 0..4 {
        let x = model.mesh().x(node);
        for i in 0..3 {
            dof_ids.push(node * 3 + i);
            dof_values.push(x[i]);
        }
    }
    println!("Fixed DOFs: {} / {}\n", dof_ids.len(), model.total_dofs());

    let solver = NewtonSolver::new(1.0e-10, 50);
    let final_pressure = 0.1;
    let load_steps = 4;

    for step in 1..=load_steps {
        let pressure = final_pressure * step as f64 / load_steps as f64;
        model.update_pressure(pressure);

        match solver.solve(&mut model, SolveMode::Disp, &dof_ids, &dof_values) {
            Ok(stats) => println!(
                "step {}: p = {:.4}, {} iterations, residual {:.3e}",
                step, pressure, stats.iterations, stats.residual_norm
            ),
            Err(e) => {
                eprintln!("step {} failed: {}", step, e);
                std::process::exit(1);
            }
        }
    }

    let output = snapshot(&model, load_steps);
    let top_uz = output.displacements[7].z;
    println!("\nCurrent volume: {:.6}", model.current_volume());
    println!("Top corner displacement u_z = {:+.6}", top_uz);

    model.write_field("equilibrium_demo.field").expect("write field");
    println!("Field written to equilibrium_demo.field");
}
