//! qmap dense statevector engine
//!
//! This crate provides the reference [`RegisterEngine`](qmap_engine::RegisterEngine)
//! implementation used by `qmap-sim`. It keeps the full amplitude vector in
//! memory, which gives exact results but limits practical use to ~25 qubits.
//!
//! # Features
//!
//! - **Exact Simulation**: Full statevector representation
//! - **Arbitrary 2×2 Gates**: With any number of controls
//! - **Multiplexed Rotations**: Uniformly controlled RY/RZ
//! - **Register Arithmetic**: Controlled increment/decrement/multiply/divide
//! - **Dynamic Width**: Compose and dispose blocks of qubits at runtime
//!
//! # Performance
//!
//! | Qubits | Memory | Simulation Speed |
//! |--------|--------|------------------|
//! | 10 | ~16 KB | Instant |
//! | 15 | ~512 KB | Fast |
//! | 20 | ~16 MB | Moderate |
//! | 25 | ~512 MB | Slow |
//! | 30+ | ~16 GB+ | Not recommended |
//!
//! # Example
//!
//! ```rust
//! use qmap_adapter_dense::DenseRegister;
//! use qmap_engine::{Matrix2, RegisterEngine};
//!
//! let mut reg = DenseRegister::new(2);
//! reg.apply_single_qubit_gate(&Matrix2::hadamard(), 0);
//! reg.apply_controlled_single_qubit_gate(&[0], &Matrix2::pauli_x(), 1);
//!
//! // Expect ~50% |00⟩ and ~50% |11⟩
//! assert!((reg.prob_mask(0b11, 0b11) - 0.5).abs() < 1e-12);
//! ```

mod statevector;

pub use statevector::DenseRegister;
