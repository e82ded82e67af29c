//! Shape functions for the supported element topologies
//!
//! Volume elements (tetrahedra) use barycentric coordinates L0..L3 with
//! L0 + L1 + L2 + L3 = 1; surface elements (triangles) use L0..L2.
//! Derivatives are returned with respect to the reference coordinates
//! (r, s, t) for tetrahedra and (xi, eta) for triangles, where
//! L0 = 1 - r - s - t, L1 = r, L2 = s, L3 = t.

/// 4-node linear tetrahedron
pub struct Tet4Basis;

impl Tet4Basis {
    /// Shape functions are the barycentric coordinates themselves
    #[allow(non_snake_case)]
    pub fn shape_functions(L: &[f64; 4]) -> [f64; 4] {
        *L
    }

    /// Derivatives with respect to (r, s, t); constant over the element
    pub fn shape_derivatives(_l: &[f64; 4]) -> [[f64; 3]; 4] {
        [
            [-1.0, -1.0, -1.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ]
    }
}

/// 10-node quadratic tetrahedron
///
/// Node numbering:
///   Vertices: 0, 1, 2, 3
///   Edge midpoints:
///     4: edge 0-1
///     5: edge 1-2
///     6: edge 2-0
///     7: edge 0-3
///     8: edge 1-3
///     9: edge 2-3
pub struct Tet10Basis;

impl Tet10Basis {
    /// Evaluate all 10 shape functions at barycentric coordinates
    ///
    /// Vertices:       N_i = L_i (2 L_i - 1)
    /// Edge midpoints: N_ab = 4 L_a L_b
    #[allow(non_snake_case)]
    pub fn shape_functions(L: &[f64; 4]) -> [f64; 10] {
        let [L0, L1, L2, L3] = *L;

        [
            L0 * (2.0 * L0 - 1.0),
            L1 * (2.0 * L1 - 1.0),
            L2 * (2.0 * L2 - 1.0),
            L3 * (2.0 * L3 - 1.0),
            4.0 * L0 * L1,
            4.0 * L1 * L2,
            4.0 * L2 * L0,
            4.0 * L0 * L3,
            4.0 * L1 * L3,
            4.0 * L2 * L3,
        ]
    }

    /// Derivatives with respect to the reference coordinates (r, s, t)
    ///
    /// Obtained from the barycentric derivatives via
    /// d/dr = d/dL1 - d/dL0, d/ds = d/dL2 - d/dL0, d/dt = d/dL3 - d/dL0.
    #[allow(non_snake_case)]
    pub fn shape_derivatives(L: &[f64; 4]) -> [[f64; 3]; 10] {
        let [L0, L1, L2, L3] = *L;

        let g0 = 4.0 * L0 - 1.0;
        let g1 = 4.0 * L1 - 1.0;
        let g2 = 4.0 * L2 - 1.0;
        let g3 = 4.0 * L3 - 1.0;

        [
            [-g0, -g0, -g0],
            [g1, 0.0, 0.0],
            [0.0, g2, 0.0],
            [0.0, 0.0, g3],
            [4.0 * (L0 - L1), -4.0 * L1, -4.0 * L1],
            [4.0 * L2, 4.0 * L1, 0.0],
            [-4.0 * L2, 4.0 * (L0 - L2), -4.0 * L2],
            [-4.0 * L3, -4.0 * L3, 4.0 * (L0 - L3)],
            [4.0 * L3, 0.0, 4.0 * L1],
            [0.0, 4.0 * L3, 4.0 * L2],
        ]
    }
}

/// 3-node linear triangle (surface patch)
pub struct Tri3Basis;

impl Tri3Basis {
    #[allow(non_snake_case)]
    pub fn shape_functions(L: &[f64; 3]) -> [f64; 3] {
        *L
    }

    /// Derivatives with respect to (xi, eta); constant over the element
    pub fn shape_derivatives(_l: &[f64; 3]) -> [[f64; 2]; 3] {
        [[-1.0, -1.0], [1.0, 0.0], [0.0, 1.0]]
    }
}

/// 6-node quadratic triangle (surface patch)
///
/// Vertices 0, 1, 2; midside nodes 3 (edge 0-1), 4 (edge 1-2), 5 (edge 2-0).
pub struct Tri6Basis;

impl Tri6Basis {
    #[allow(non_snake_case)]
    pub fn shape_functions(L: &[f64; 3]) -> [f64; 6] {
        let [L0, L1, L2] = *L;

        [
            L0 * (2.0 * L0 - 1.0),
            L1 * (2.0 * L1 - 1.0),
            L2 * (2.0 * L2 - 1.0),
            4.0 * L0 * L1,
            4.0 * L1 * L2,
            4.0 * L2 * L0,
        ]
    }

    /// Derivatives with respect to (xi, eta)
    #[allow(non_snake_case)]
    pub fn shape_derivatives(L: &[f64; 3]) -> [[f64; 2]; 6] {
        let [L0, L1, L2] = *L;

        let g0 = 4.0 * L0 - 1.0;
        let g1 = 4.0 * L1 - 1.0;
        let g2 = 4.0 * L2 - 1.0;

        [
            [-g0, -g0],
            [g1, 0.0],
            [0.0, g2],
            [4.0 * (L0 - L1), -4.0 * L1],
            [4.0 * L2, 4.0 * L1],
            [-4.0 * L2, 4.0 * (L0 - L2)],
        ]
    }
}
