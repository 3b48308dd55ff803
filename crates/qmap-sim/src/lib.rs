//! `qmap-sim` — qubit bookkeeping and gate dispatch over a register engine.
//!
//! Callers name qubits by stable ids they choose themselves. A register
//! engine addresses them by dense positions `0..n` that shift as qubits come
//! and go. [`Simulator`] keeps the two consistent and translates:
//!
//! - **Lifecycle**: allocate, deallocate (classical qubits only), introspect
//! - **Gate dispatch**: controlled gates, swaps, phase, multiplexed
//!   rotations, controlled arithmetic
//! - **Measurement & state transfer**: sampling, probabilities, amplitudes,
//!   forced collapse, full and partial state preparation
//! - **Hamiltonians**: time evolution, operator application and expectation
//!   values over weighted Pauli sums
//!
//! # Quick start
//!
//! ```rust
//! use qmap_engine::Matrix2;
//! use qmap_sim::{DenseSimulator, QubitId};
//!
//! let mut sim = DenseSimulator::with_seed(42);
//! let (a, b) = (QubitId(10), QubitId(20));
//! sim.allocate_qubit(a).unwrap();
//! sim.allocate_qubit(b).unwrap();
//!
//! // Bell pair
//! sim.apply_controlled_gate(&Matrix2::hadamard(), &[a], &[]).unwrap();
//! sim.apply_controlled_gate(&Matrix2::pauli_x(), &[b], &[a]).unwrap();
//!
//! let bits = sim.measure(&[a, b]).unwrap();
//! assert_eq!(bits[0], bits[1]);
//! ```

pub mod config;
mod dispatch;
pub mod error;
mod hamiltonian;
mod measurement;
pub mod qubit_map;
pub mod simulator;
pub mod terms;

pub use config::{ConfigError, SimulatorConfig};
pub use error::{SimError, SimResult};
pub use qubit_map::{QubitId, QubitMap};
pub use simulator::{DenseSimulator, Simulator, Snapshot};
pub use terms::{ComplexTermsDict, Pauli, PauliTerm, TermsDict};
