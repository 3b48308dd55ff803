//! The register engine contract.
//!
//! A register engine owns `2^n` complex amplitudes and exposes primitive
//! operations addressed by dense positions `0..n`. It knows nothing about
//! caller-issued qubit ids; that bookkeeping lives in `qmap-sim`.
//!
//! # Contract
//!
//! - Positions passed to any method MUST be `< num_qubits()`. Callers validate
//!   before calling; engines MAY panic on violation.
//! - Masks and patterns are bit sets over positions (`1 << position`).
//! - Engines MAY defer work internally; `finish()` MUST block until every
//!   previously issued operation is visible to subsequent reads.

use num_complex::Complex64;
use rand::RngCore;
use std::fmt;

use crate::error::EngineResult;
use crate::matrix::Matrix2;

/// In-place arithmetic on a contiguous block of positions.
///
/// The operand block always starts at the `start` argument of
/// [`RegisterEngine::controlled_arithmetic`] and spans `length` positions,
/// least significant bit first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    /// `x ← (x + value) mod 2^length`.
    Inc(u64),
    /// `x ← (x − value) mod 2^length`.
    Dec(u64),
    /// Out-of-place multiply into a zeroed carry block of the same length
    /// starting at `carry_start`: `(x, 0) ← (x·value mod 2^len, x·value >> len)`.
    ///
    /// Amplitude on basis states with a non-zero carry is discarded, so the
    /// result is unnormalised unless the carry block starts in |0…0⟩.
    Mul {
        /// Multiplier; must be non-zero.
        factor: u64,
        /// First position of the carry block.
        carry_start: usize,
    },
    /// Inverse of [`ArithmeticOp::Mul`]. Amplitude on basis states whose
    /// `(carry, x)` is not a multiple of `divisor` is discarded.
    Div {
        /// Divisor; must be non-zero.
        divisor: u64,
        /// First position of the carry block.
        carry_start: usize,
    },
}

/// One single-qubit contribution to a Hamiltonian.
#[derive(Debug, Clone, PartialEq)]
pub struct HamiltonianOp {
    /// Target position.
    pub target: usize,
    /// Control positions; the op acts only where all of them are set.
    pub controls: Vec<usize>,
    /// The (usually Hermitian) generator acting on `target`.
    pub matrix: Matrix2,
}

impl HamiltonianOp {
    /// An uncontrolled op.
    pub fn new(target: usize, matrix: Matrix2) -> Self {
        Self {
            target,
            controls: Vec::new(),
            matrix,
        }
    }

    /// An op conditioned on `controls`.
    pub fn controlled(controls: Vec<usize>, target: usize, matrix: Matrix2) -> Self {
        Self {
            target,
            controls,
            matrix,
        }
    }
}

/// A dense amplitude store with position-indexed primitives.
pub trait RegisterEngine: Clone + fmt::Debug {
    /// A fresh register of `num_qubits` qubits in |0…0⟩.
    fn with_qubits(num_qubits: usize) -> Self;

    /// Current register width.
    fn num_qubits(&self) -> usize;

    /// Number of amplitudes, `2^num_qubits`.
    fn max_power(&self) -> usize {
        1 << self.num_qubits()
    }

    /// Apply `matrix` to `target`.
    fn apply_single_qubit_gate(&mut self, matrix: &Matrix2, target: usize) {
        self.apply_controlled_single_qubit_gate(&[], matrix, target);
    }

    /// Apply `matrix` to `target` where every control is |1⟩.
    fn apply_controlled_single_qubit_gate(
        &mut self,
        controls: &[usize],
        matrix: &Matrix2,
        target: usize,
    );

    /// Exchange two positions.
    fn swap(&mut self, q1: usize, q2: usize) {
        self.controlled_swap(&[], q1, q2);
    }

    /// Exchange two positions where every control is |1⟩.
    fn controlled_swap(&mut self, controls: &[usize], q1: usize, q2: usize);

    /// Square root of SWAP.
    fn sqrt_swap(&mut self, q1: usize, q2: usize) {
        self.controlled_sqrt_swap(&[], q1, q2);
    }

    /// Square root of SWAP where every control is |1⟩.
    fn controlled_sqrt_swap(&mut self, controls: &[usize], q1: usize, q2: usize);

    /// Multiplexed RY: the angle applied to `target` is `angles[k]` where bit
    /// `j` of `k` is the value of `controls[j]`.
    fn uniformly_controlled_ry(&mut self, controls: &[usize], target: usize, angles: &[f64]);

    /// Multiplexed RZ, same indexing as [`uniformly_controlled_ry`](Self::uniformly_controlled_ry).
    fn uniformly_controlled_rz(&mut self, controls: &[usize], target: usize, angles: &[f64]);

    /// Run `op` on the block `start..start + length` where every control is |1⟩.
    fn controlled_arithmetic(
        &mut self,
        op: ArithmeticOp,
        start: usize,
        length: usize,
        controls: &[usize],
    ) -> EngineResult<()>;

    /// Jointly measure the positions in `mask`, collapsing the state.
    ///
    /// Returns the outcome as a bit set over positions (subset of `mask`).
    fn measure(&mut self, mask: usize, rng: &mut dyn RngCore) -> usize;

    /// Probability that `position` reads |1⟩.
    fn prob(&self, position: usize) -> f64;

    /// Probability that the positions in `mask` read `pattern`.
    fn prob_mask(&self, mask: usize, pattern: usize) -> f64;

    /// Project the positions in `mask` onto `pattern` and renormalise.
    fn force_measure(&mut self, mask: usize, pattern: usize);

    /// Append `other` above the current positions (`other ⊗ self`).
    ///
    /// Returns the position of `other`'s first qubit.
    fn compose(&mut self, other: Self) -> usize;

    /// Remove the separable block `start..start + length`.
    fn dispose(&mut self, start: usize, length: usize);

    /// Copy out all amplitudes, index bit `k` ↔ position `k`.
    fn state(&self) -> Vec<Complex64>;

    /// Replace all amplitudes.
    fn set_state(&mut self, amplitudes: &[Complex64]) -> EngineResult<()>;

    /// Amplitude of basis index `index`.
    fn amplitude(&self, index: usize) -> Complex64;

    /// Evolve under `Σ ops` for `duration`, applying `exp(-i·H_k·t)` per op.
    fn time_evolve(&mut self, hamiltonian: &[HamiltonianOp], duration: f64);

    /// Block until deferred work has completed.
    fn finish(&mut self) {}
}
