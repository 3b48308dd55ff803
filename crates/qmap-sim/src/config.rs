//! Simulator configuration.
//!
//! Supports loading configuration from:
//! 1. Configuration files (YAML)
//! 2. Environment variables (with QMAP_ prefix)
//!
//! Configuration precedence (highest to lowest):
//! 1. Environment variables
//! 2. Configuration file
//! 3. Default values

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Settings for a [`Simulator`](crate::Simulator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Seed for the measurement random source.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Probabilities closer than this to 0 or 1 count as classical; forced
    /// outcomes below it are rejected.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Maximum number of simultaneously allocated qubits.
    #[serde(default = "default_max_qubits")]
    pub max_qubits: usize,
}

fn default_seed() -> u64 {
    1
}

fn default_tolerance() -> f64 {
    1e-12
}

fn default_max_qubits() -> usize {
    30
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            tolerance: default_tolerance(),
            max_qubits: default_max_qubits(),
        }
    }
}

impl SimulatorConfig {
    /// Set the random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the classicality tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the qubit limit.
    #[must_use]
    pub fn with_max_qubits(mut self, max_qubits: usize) -> Self {
        self.max_qubits = max_qubits;
        self
    }

    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_yaml(&contents)
    }

    /// Parse configuration from a YAML document.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: SimulatorConfig = serde_yaml_ng::from_str(contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables.
    ///
    /// Unset variables keep their default; unparsable ones are ignored with
    /// a warning.
    pub fn from_env() -> Self {
        Self::default().merge_env()
    }

    /// Override fields from `QMAP_SEED`, `QMAP_TOLERANCE` and `QMAP_MAX_QUBITS`.
    #[must_use]
    pub fn merge_env(mut self) -> Self {
        if let Ok(seed) = std::env::var("QMAP_SEED") {
            match seed.parse() {
                Ok(val) => self.seed = val,
                Err(_) => warn!(value = %seed, "ignoring unparsable QMAP_SEED"),
            }
        }
        if let Ok(tolerance) = std::env::var("QMAP_TOLERANCE") {
            match tolerance.parse() {
                Ok(val) => self.tolerance = val,
                Err(_) => warn!(value = %tolerance, "ignoring unparsable QMAP_TOLERANCE"),
            }
        }
        if let Ok(max) = std::env::var("QMAP_MAX_QUBITS") {
            match max.parse() {
                Ok(val) => self.max_qubits = val,
                Err(_) => warn!(value = %max, "ignoring unparsable QMAP_MAX_QUBITS"),
            }
        }
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tolerance > 0.0 && self.tolerance < 0.5) {
            return Err(ConfigError::ValidationError(format!(
                "tolerance must lie in (0, 0.5), got {}",
                self.tolerance
            )));
        }

        let limit = usize::BITS as usize - 1;
        if self.max_qubits == 0 || self.max_qubits > limit {
            return Err(ConfigError::ValidationError(format!(
                "max_qubits must lie in 1..={limit}, got {}",
                self.max_qubits
            )));
        }

        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
