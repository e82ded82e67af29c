//! Geometric elements: per-quadrature-point shape data
//!
//! A `GeomElement` stores, for every quadrature point, the shape-function
//! values, shape-function gradients, and integration weight needed to build
//! deformation measures. Volume elements carry gradients with respect to
//! physical reference coordinates (isoparametric map applied once at
//! construction) and weights scaled by |det J|; surface elements keep the
//! parametric derivatives so that callers can form surface tangents
//! a1 = sum_a x_a dN_a/dxi and a2 = sum_a x_a dN_a/deta, whose cross product
//! carries the area measure.

use nalgebra::{Matrix3, Vector3};

use crate::error::{Result, SimError};
use crate::fem::basis::{Tet10Basis, Tet4Basis, Tri3Basis, Tri6Basis};
use crate::fem::quadrature::{TetQuadrature, TriQuadrature};

/// Supported element topologies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Tet4,
    Tet10,
    Tri3,
    Tri6,
}

impl ElementKind {
    /// Classify an element from its embedding dimension and node count
    pub fn from_topology(dim: usize, nodes_per_element: usize) -> Result<Self> {
        match (dim, nodes_per_element) {
            (3, 4) => Ok(ElementKind::Tet4),
            (3, 10) => Ok(ElementKind::Tet10),
            (2, 3) => Ok(ElementKind::Tri3),
            (2, 6) => Ok(ElementKind::Tri6),
            (dim, nodes) => Err(SimError::UnsupportedTopology { dim, nodes }),
        }
    }

    pub fn nodes_per_element(&self) -> usize {
        match self {
            ElementKind::Tet4 => 4,
            ElementKind::Tet10 => 10,
            ElementKind::Tri3 => 3,
            ElementKind::Tri6 => 6,
        }
    }

    pub fn is_surface(&self) -> bool {
        matches!(self, ElementKind::Tri3 | ElementKind::Tri6)
    }
}

/// One finite element with precomputed quadrature data
#[derive(Debug, Clone)]
pub struct GeomElement {
    kind: ElementKind,
    nodes: Vec<usize>,
    /// Shape-function values, indexed [qp][node]
    shape: Vec<Vec<f64>>,
    /// Shape-function gradients, indexed [qp][node][direction]
    ///
    /// Physical gradients for volume elements (3 directions); parametric
    /// derivatives for surface elements (directions 0 and 1; entry 2 unused)
    shape_grad: Vec<Vec<[f64; 3]>>,
    /// Integration weights; |det J|-scaled for volume elements
    weights: Vec<f64>,
}

impl GeomElement {
    /// Build a volume (tetrahedral) element
    ///
    /// Computes the isoparametric Jacobian at every quadrature point, maps
    /// shape derivatives to the physical reference frame, and scales the
    /// weights by |det J|. A non-finite or non-positive determinant marks a
    /// degenerate or inverted element; it is logged and the element is still
    /// constructed so that callers can treat it as a data-quality signal.
    pub fn volume(kind: ElementKind, nodes: Vec<usize>, coords: &[Vector3<f64>]) -> Result<Self> {
        assert!(!kind.is_surface(), "volume() requires a tetrahedral kind");
        assert_eq!(nodes.len(), kind.nodes_per_element());

        let (points, qweights) = match kind {
            ElementKind::Tet4 => {
                let q = TetQuadrature::one_point();
                (q.points, q.weights)
            }
            ElementKind::Tet10 => {
                let q = TetQuadrature::four_point();
                (q.points, q.weights)
            }
            _ => unreachable!(),
        };

        let mut shape = Vec::with_capacity(points.len());
        let mut shape_grad = Vec::with_capacity(points.len());
        let mut weights = Vec::with_capacity(points.len());

        for (qp, w) in points.iter().zip(qweights.iter()) {
            let (n, dn_ref) = match kind {
                ElementKind::Tet4 => (
                    Tet4Basis::shape_functions(qp).to_vec(),
                    Tet4Basis::shape_derivatives(qp).to_vec(),
                ),
                ElementKind::Tet10 => (
                    Tet10Basis::shape_functions(qp).to_vec(),
                    Tet10Basis::shape_derivatives(qp).to_vec(),
                ),
                _ => unreachable!(),
            };

            // Isoparametric Jacobian: J_ij = sum_a X_a(i) dN_a/dxi_j
            let mut jac: Matrix3<f64> = Matrix3::zeros();
            for (a, dn_a) in dn_ref.iter().enumerate() {
                let x = coords[nodes[a]];
                for i in 0..3 {
                    for j in 0..3 {
                        jac[(i, j)] += x[i] * dn_a[j];
                    }
                }
            }

            let det = jac.determinant();
            if !det.is_finite() || det <= 0.0 {
                log::warn!(
                    "degenerate element (nodes {:?}): Jacobian determinant {:.3e}",
                    nodes,
                    det
                );
            }

            let jac_inv = jac.try_inverse().ok_or(SimError::SingularSystem)?;

            // Physical gradients: dN/dX = J^{-T} dN/dxi
            let grads: Vec<[f64; 3]> = dn_ref
                .iter()
                .map(|dn_a| {
                    let mut g = [0.0; 3];
                    for i in 0..3 {
                        for j in 0..3 {
                            g[i] += jac_inv[(j, i)] * dn_a[j];
                        }
                    }
                    g
                })
                .collect();

            shape.push(n);
            shape_grad.push(grads);
            weights.push(w * det.abs());
        }

        Ok(Self {
            kind,
            nodes,
            shape,
            shape_grad,
            weights,
        })
    }

    /// Build a surface (triangular) element embedded in 3D
    ///
    /// Parametric derivatives are kept as-is; the area measure is carried by
    /// the tangent cross product formed at the point of use.
    pub fn surface(kind: ElementKind, nodes: Vec<usize>, _coords: &[Vector3<f64>]) -> Result<Self> {
        assert!(kind.is_surface(), "surface() requires a triangular kind");
        assert_eq!(nodes.len(), kind.nodes_per_element());

        let (points, qweights) = match kind {
            ElementKind::Tri3 => {
                let q = TriQuadrature::one_point();
                (q.points, q.weights)
            }
            ElementKind::Tri6 => {
                let q = TriQuadrature::three_point();
                (q.points, q.weights)
            }
            _ => unreachable!(),
        };

        let mut shape = Vec::with_capacity(points.len());
        let mut shape_grad = Vec::with_capacity(points.len());

        for qp in points.iter() {
            let (n, dn): (Vec<f64>, Vec<[f64; 3]>) = match kind {
                ElementKind::Tri3 => (
                    Tri3Basis::shape_functions(qp).to_vec(),
                    Tri3Basis::shape_derivatives(qp)
                        .iter()
                        .map(|d| [d[0], d[1], 0.0])
                        .collect(),
                ),
                ElementKind::Tri6 => (
                    Tri6Basis::shape_functions(qp).to_vec(),
                    Tri6Basis::shape_derivatives(qp)
                        .iter()
                        .map(|d| [d[0], d[1], 0.0])
                        .collect(),
                ),
                _ => unreachable!(),
            };
            shape.push(n);
            shape_grad.push(dn);
        }

        Ok(Self {
            kind,
            nodes,
            shape,
            shape_grad,
            weights: qweights,
        })
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Global node indices of this element
    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    pub fn nodes_per_element(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_quad_points(&self) -> usize {
        self.weights.len()
    }

    /// Shape-function value N_a at quadrature point q
    pub fn n(&self, q: usize, a: usize) -> f64 {
        self.shape[q][a]
    }

    /// Shape-function gradient component dN_a/dX_j at quadrature point q
    pub fn dn(&self, q: usize, a: usize, j: usize) -> f64 {
        self.shape_grad[q][a][j]
    }

    /// Integration weight of quadrature point q
    pub fn weight(&self, q: usize) -> f64 {
        self.weights[q]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_tet() -> (Vec<Vector3<f64>>, Vec<usize>) {
        (
            vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(0.0, 1.0, 0.0),
                Vector3::new(0.0, 0.0, 1.0),
            ],
            vec![0, 1, 2, 3],
        )
    }

    #[test]
    fn tet4_volume_from_weights() {
        let (coords, conn) = unit_tet();
        let el = GeomElement::volume(ElementKind::Tet4, conn, &coords).unwrap();
        let vol: f64 = (0..el.num_quad_points()).map(|q| el.weight(q)).sum();
        assert_relative_eq!(vol, 1.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn tet4_gradients_reproduce_linear_field() {
        // For u(X) = X the gradient sum_a x_a dN_a must be the identity
        let (coords, conn) = unit_tet();
        let el = GeomElement::volume(ElementKind::Tet4, conn, &coords).unwrap();

        for q in 0..el.num_quad_points() {
            for i in 0..3 {
                for j in 0..3 {
                    let mut g = 0.0;
                    for a in 0..el.nodes_per_element() {
                        g += coords[el.nodes()[a]][i] * el.dn(q, a, j);
                    }
                    let expected = if i == j { 1.0 } else { 0.0 };
                    assert_relative_eq!(g, expected, epsilon = 1e-12);
                }
            }
        }
    }

    #[test]
    fn surface_tri_area_from_tangents() {
        // Right triangle in the z = 0 plane with legs of length 1
        let coords = vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        ];
        let el = GeomElement::surface(ElementKind::Tri3, vec![0, 1, 2], &coords).unwrap();

        let mut area = 0.0;
        for q in 0..el.num_quad_points() {
            let mut a1 = Vector3::zeros();
            let mut a2 = Vector3::zeros();
            for a in 0..3 {
                a1 += coords[a] * el.dn(q, a, 0);
                a2 += coords[a] * el.dn(q, a, 1);
            }
            area += a1.cross(&a2).norm() * el.weight(q);
        }
        assert_relative_eq!(area, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn unknown_topology_is_rejected() {
        assert!(ElementKind::from_topology(3, 8).is_err());
        assert!(ElementKind::from_topology(1, 2).is_err());
    }
}
