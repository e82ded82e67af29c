//! Finite element kernel: shape functions, quadrature, geometric elements

pub mod basis;
pub mod element;
pub mod quadrature;

pub use basis::{Tet10Basis, Tet4Basis, Tri3Basis, Tri6Basis};
pub use element::{ElementKind, GeomElement};
pub use quadrature::{TetQuadrature, TriQuadrature};
