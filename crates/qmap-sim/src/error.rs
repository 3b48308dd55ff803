//! Error types for the mapping layer.

use thiserror::Error;

use crate::config::ConfigError;
use crate::qubit_map::QubitId;
use qmap_engine::EngineError;

/// Errors produced by [`Simulator`](crate::Simulator) operations.
///
/// Every operation validates its arguments before touching the map or the
/// register, so an `Err` never leaves either partially updated.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SimError {
    /// `allocate_qubit` was called with an id that is already live.
    #[error("Qubit {0} is already allocated; qubit ids must be unique")]
    DuplicateId(QubitId),

    /// An operation referenced an id that is not currently allocated.
    #[error("No qubit with id {0} is allocated")]
    UnknownId(QubitId),

    /// Deallocation of a qubit that is still in superposition.
    #[error(
        "Qubit {id} has not been measured or uncomputed (P(1) = {probability}); \
         refusing to discard it"
    )]
    NotClassical {
        /// The qubit being deallocated.
        id: QubitId,
        /// Its probability of reading |1⟩.
        probability: f64,
    },

    /// An id list must be exactly a permutation of the allocated qubits.
    #[error("Invalid qubit permutation: {0}")]
    InvalidPermutation(String),

    /// A forced outcome has (numerically) zero probability.
    #[error("Invalid collapse: outcome probability {probability} is ~0")]
    NearZeroProbability {
        /// Probability of the requested outcome.
        probability: f64,
    },

    /// A state vector length is not `2^(number of qubits)`.
    #[error("State vector has {actual} amplitudes, expected {expected}")]
    SizeMismatch {
        /// Required length.
        expected: usize,
        /// Supplied length.
        actual: usize,
    },

    /// Two argument lists that are paired element-wise differ in length.
    #[error("Length mismatch in {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Which argument pair disagreed.
        what: &'static str,
        /// Required length.
        expected: usize,
        /// Supplied length.
        actual: usize,
    },

    /// An argument is structurally invalid for the requested operation.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Allocation would exceed the configured register width.
    #[error("Allocation would grow the register to {requested} qubits; limit is {max}")]
    CapacityExceeded {
        /// Register width the allocation would produce.
        requested: usize,
        /// Configured maximum.
        max: usize,
    },

    /// The operation needs a register but no qubits are allocated.
    #[error("No qubits are allocated")]
    EmptyRegister,

    /// The register engine rejected an operation.
    #[error("Register engine error: {0}")]
    Engine(#[from] EngineError),

    /// Simulator configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for mapping-layer operations.
pub type SimResult<T> = Result<T, SimError>;
