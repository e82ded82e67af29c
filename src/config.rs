//! Configuration management for equilibrium runs
//!
//! Reads TOML configuration files and provides structured data for setting
//! up materials, loading, boundary conditions, and solver parameters.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::model::PotentialKind;

/// Main run configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    pub solver: SolverConfig,
    pub material: MaterialConfig,
    pub loading: LoadingConfig,
    pub contact: Option<ContactConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SolverConfig {
    /// Absolute tolerance on the RMS residual norm
    pub tolerance: f64,
    /// Newton iteration cap per load step
    pub max_iterations: usize,
    /// Number of load steps
    pub load_steps: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MaterialConfig {
    /// Law selector: "neo_hookean", "fiber" or "st_venant"
    pub law: String,
    pub parameters: Vec<f64>,
    /// Reference fiber direction for the "fiber" law
    pub fiber_direction: Option<[f64; 3]>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoadingConfig {
    /// Follower pressure magnitude at the final load step
    pub pressure: f64,
    /// Anchoring-spring stiffness, if that BC is active
    pub spring_stiffness: Option<f64>,
    /// Torsional-spring stiffness, if that BC is active
    pub torsional_stiffness: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContactConfig {
    /// Penalty selector: "quadratic" or "quartic"
    pub potential: String,
    pub search_radius: f64,
    pub well_depth: f64,
    pub min_distance: f64,
    pub max_neighbors: Option<usize>,
    /// Present when the boundary is an elastic membrane
    pub membrane_stiffness: Option<f64>,
}

impl SimulationConfig {
    /// Load and validate a configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config: SimulationConfig = toml::from_str(&contents)
            .map_err(|e| SimError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject unknown selectors and out-of-range values up front
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.material.law.as_str(), "neo_hookean" | "fiber" | "st_venant") {
            return Err(SimError::Config(format!(
                "unknown material law '{}'",
                self.material.law
            )));
        }
        if self.material.law == "fiber" && self.material.fiber_direction.is_none() {
            return Err(SimError::Config(
                "the 'fiber' law needs a fiber_direction".to_string(),
            ));
        }
        if self.solver.tolerance <= 0.0 {
            return Err(SimError::Config("solver tolerance must be positive".to_string()));
        }
        if let Some(contact) = &self.contact {
            // Unknown potential selectors are fatal configuration errors
            PotentialKind::from_str(&contact.potential)?;
            if contact.search_radius <= 0.0 {
                return Err(SimError::Config("search radius must be positive".to_string()));
            }
        }
        Ok(())
    }

    pub fn potential_kind(&self) -> Result<Option<PotentialKind>> {
        self.contact
            .as_ref()
            .map(|c| PotentialKind::from_str(&c.potential))
            .transpose()
    }
}
