//! Equilibrium solvers

pub mod newton;

pub use newton::{NewtonSolver, SolveMode, SolveStats};
