//! Error types for the equilibrium simulator

use thiserror::Error;

/// Main error type for model setup and solution
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Unsupported element topology: {nodes} nodes in dimension {dim}")]
    UnsupportedTopology { dim: usize, nodes: usize },

    #[error("Unknown contact potential type '{0}' (expected 'quadratic' or 'quartic')")]
    UnknownPotentialType(String),

    #[error("Node set '{path}' declares {declared} nodes but contains {found}")]
    NodeSetCountMismatch {
        path: String,
        declared: usize,
        found: usize,
    },

    #[error("Element {element} references node {node}, but the mesh has {num_nodes} nodes")]
    InvalidConnectivity {
        element: usize,
        node: usize,
        num_nodes: usize,
    },

    #[error("Newton iteration cap ({iterations}) exceeded, residual norm {residual:.3e}")]
    ConvergenceFailed { iterations: usize, residual: f64 },

    #[error("Reduced stiffness factorization failed - system may be rank deficient")]
    SingularSystem,

    #[error("Materials sharing id {mat_id} disagree on parameter count ({expected} vs {found})")]
    ParameterCountMismatch {
        mat_id: usize,
        expected: usize,
        found: usize,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
