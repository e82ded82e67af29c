//! Finite-difference consistency of every constitutive law
//!
//! Analytic stress and tangent must match centered differences of the
//! energy and stress across randomized deformation states with det F > 0,
//! for step sizes spanning [1e-8, 1e-5].

use nalgebra::{Matrix3, Vector3};
use tissue_simulator::{
    check_consistency, FiberReinforcedElasticity, MechanicsMaterial, NeoHookeanElasticity,
    StVenantKirchhoff,
};

/// Deterministic pseudo-random deformation gradients near the identity,
/// filtered to det F > 0
fn random_deformations(count: usize, seed: u64) -> Vec<Matrix3<f64>> {
    let mut state = seed;
    let mut next_unit = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (state >> 11) as f64 / (1u64 << 53) as f64
    };

    let mut out = Vec::with_capacity(count);
    while out.len() < count {
        let mut f = Matrix3::identity();
        for i in 0..3 {
            for j in 0..3 {
                f[(i, j)] += 0.3 * (next_unit() - 0.5);
            }
        }
        if f.determinant() > 0.1 {
            out.push(f);
        }
    }
    out
}

fn check_law(material: &dyn MechanicsMaterial, label: &str) {
    for (trial, f) in random_deformations(8, 0x5eed).into_iter().enumerate() {
        for h in [1e-5f64, 1e-6, 1e-7] {
            // FD truncation error scales with h, roundoff with 1/h; the
            // tolerance tracks both with headroom
            let tolerance = (h * 1e-2).max(1e-7);
            let report = check_consistency(material, &f, h, tolerance);
            assert!(
                report.passed(),
                "{}: trial {} h {:.0e} failed: {:?}",
                label,
                trial,
                h,
                report
            );
        }
    }
}

#[test]
fn neo_hookean_consistency() {
    let material = NeoHookeanElasticity::new(0, 2.0, 1.3);
    check_law(&material, "neo-hookean");
}

#[test]
fn fiber_reinforced_consistency() {
    let material =
        FiberReinforcedElasticity::new(0, 1.1, 0.9, 3.0, Vector3::new(0.3, -0.5, 0.8));
    check_law(&material, "fiber-reinforced");
}

#[test]
fn st_venant_consistency() {
    let material = StVenantKirchhoff::new(0, 1.5, 1.0);
    check_law(&material, "st-venant");
}

#[test]
fn tight_step_sizes_stay_within_order_h() {
    // The sharpest step of the mandated range on one law
    let material = NeoHookeanElasticity::new(0, 1.0, 1.0);
    let f = Matrix3::new(1.05, 0.02, 0.0, 0.01, 0.97, -0.03, 0.0, 0.02, 1.08);
    let report = check_consistency(&material, &f, 1e-8, 1e-6);
    assert!(report.passed(), "{:?}", report);
}

#[test]
fn clone_preserves_parameters_and_id() {
    let material = FiberReinforcedElasticity::new(3, 1.0, 2.0, 3.0, Vector3::z());
    let copy = material.clone_box();
    assert_eq!(copy.mat_id(), 3);
    assert_eq!(copy.parameters(), vec![1.0, 2.0, 3.0]);
    assert_eq!(copy.direction_vectors()[0], Vector3::z());
}
