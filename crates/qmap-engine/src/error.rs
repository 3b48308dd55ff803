//! Error types for register engines.

use thiserror::Error;

/// Errors reported by a [`RegisterEngine`](crate::RegisterEngine).
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum EngineError {
    /// An amplitude vector does not match the register size.
    #[error("State vector has {actual} amplitudes but the register holds {expected}")]
    StateSizeMismatch {
        /// Number of amplitudes the register holds (2^n).
        expected: usize,
        /// Number of amplitudes supplied.
        actual: usize,
    },

    /// A position lies outside the register.
    #[error("Position {position} out of range for a {num_qubits}-qubit register")]
    PositionOutOfRange {
        /// The offending position.
        position: usize,
        /// Current register width.
        num_qubits: usize,
    },

    /// An arithmetic operand is not usable (e.g. division by zero).
    #[error("Invalid operand: {0}")]
    InvalidOperand(String),
}

/// Result type for register engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
