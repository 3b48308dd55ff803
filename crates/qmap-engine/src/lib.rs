//! `qmap-engine` — the register engine abstraction.
//!
//! The qubit-mapping layer in `qmap-sim` never touches amplitudes directly.
//! It drives an implementation of [`RegisterEngine`], which owns a `2^n`
//! amplitude vector and exposes position-indexed primitives: single-qubit and
//! controlled gates, swaps, multiplexed rotations, controlled arithmetic,
//! measurement, composition/disposal, state transfer and time evolution.
//!
//! Swapping in a different simulation backend means implementing this trait;
//! the bookkeeping layer stays untouched.
//!
//! # Example
//!
//! ```rust
//! use qmap_engine::{HamiltonianOp, Matrix2};
//!
//! // H = 0.5·Z on position 0
//! let op = HamiltonianOp::new(0, Matrix2::pauli_z().scale(0.5.into()));
//! assert_eq!(op.target, 0);
//! assert!(op.controls.is_empty());
//! ```

pub mod engine;
pub mod error;
pub mod matrix;

pub use engine::{ArithmeticOp, HamiltonianOp, RegisterEngine};
pub use error::{EngineError, EngineResult};
pub use matrix::Matrix2;
