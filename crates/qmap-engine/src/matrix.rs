//! 2×2 complex operators.
//!
//! Every gate the mapping layer hands to an engine is a single-qubit operator
//! stored row-major as `[m00, m01, m10, m11]`. Controlled and multiplexed
//! variants are built by the engine from these.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_1_SQRT_2;
use std::ops::{Add, AddAssign, Mul};

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);
const I: Complex64 = Complex64::new(0.0, 1.0);

/// A 2×2 complex matrix, row-major.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix2(pub [Complex64; 4]);

impl Matrix2 {
    /// Build a matrix from its four entries, row-major.
    pub const fn new(m00: Complex64, m01: Complex64, m10: Complex64, m11: Complex64) -> Self {
        Self([m00, m01, m10, m11])
    }

    /// Build a matrix from real entries.
    pub const fn real(m00: f64, m01: f64, m10: f64, m11: f64) -> Self {
        Self::new(
            Complex64::new(m00, 0.0),
            Complex64::new(m01, 0.0),
            Complex64::new(m10, 0.0),
            Complex64::new(m11, 0.0),
        )
    }

    /// The all-zero matrix.
    pub const fn zero() -> Self {
        Self([ZERO; 4])
    }

    /// The identity.
    pub const fn identity() -> Self {
        Self::new(ONE, ZERO, ZERO, ONE)
    }

    /// Pauli-X.
    pub const fn pauli_x() -> Self {
        Self::new(ZERO, ONE, ONE, ZERO)
    }

    /// Pauli-Y.
    pub const fn pauli_y() -> Self {
        Self::new(ZERO, Complex64::new(0.0, -1.0), I, ZERO)
    }

    /// Pauli-Z.
    pub const fn pauli_z() -> Self {
        Self::new(ONE, ZERO, ZERO, Complex64::new(-1.0, 0.0))
    }

    /// Hadamard.
    pub const fn hadamard() -> Self {
        Self::real(FRAC_1_SQRT_2, FRAC_1_SQRT_2, FRAC_1_SQRT_2, -FRAC_1_SQRT_2)
    }

    /// `diag(e^{iθ}, e^{iθ})`, a pure global phase.
    pub fn global_phase(theta: f64) -> Self {
        let p = Complex64::from_polar(1.0, theta);
        Self::new(p, ZERO, ZERO, p)
    }

    /// `diag(1, e^{iθ})`.
    pub fn phase_shift(theta: f64) -> Self {
        Self::new(ONE, ZERO, ZERO, Complex64::from_polar(1.0, theta))
    }

    /// Rotation about Y: `exp(-i θ Y / 2)`.
    pub fn ry(theta: f64) -> Self {
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        Self::real(c, -s, s, c)
    }

    /// Rotation about Z: `diag(e^{-iθ/2}, e^{iθ/2})`.
    pub fn rz(theta: f64) -> Self {
        Self::new(
            Complex64::from_polar(1.0, -theta / 2.0),
            ZERO,
            ZERO,
            Complex64::from_polar(1.0, theta / 2.0),
        )
    }

    /// Entry at `(row, col)`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Complex64 {
        self.0[row * 2 + col]
    }

    /// Multiply every entry by `factor`.
    #[must_use]
    pub fn scale(&self, factor: Complex64) -> Self {
        Self(self.0.map(|m| m * factor))
    }

    /// Apply the matrix to the amplitude pair `(a, b)` of a |0⟩/|1⟩ slice.
    #[inline]
    pub fn apply(&self, a: Complex64, b: Complex64) -> (Complex64, Complex64) {
        let [m00, m01, m10, m11] = self.0;
        (m00 * a + m01 * b, m10 * a + m11 * b)
    }

    /// Conjugate transpose.
    #[must_use]
    pub fn adjoint(&self) -> Self {
        let [m00, m01, m10, m11] = self.0;
        Self::new(m00.conj(), m10.conj(), m01.conj(), m11.conj())
    }

    /// The propagator `exp(-i · self · t)`.
    ///
    /// Uses the Pauli decomposition `M = a₀·I + a·σ`, for which
    /// `exp(-iMt) = e^{-i a₀ t} (cos(λt)·I − i·sin(λt)/λ · a·σ)` with
    /// `λ = √(a·a)`. Works for non-Hermitian `M` since `λ` is kept complex.
    #[must_use]
    pub fn evolution(&self, t: f64) -> Self {
        let [m00, m01, m10, m11] = self.0;
        let a0 = (m00 + m11) * 0.5;
        let ax = (m01 + m10) * 0.5;
        let ay = I * (m01 - m10) * 0.5;
        let az = (m00 - m11) * 0.5;

        let lambda = (ax * ax + ay * ay + az * az).sqrt();
        let c = (lambda * t).cos();
        // sin(λt)/λ → t as λ → 0
        let s = if lambda.norm() < 1e-12 {
            Complex64::new(t, 0.0)
        } else {
            (lambda * t).sin() / lambda
        };
        let n = -I * s;
        let phase = (-I * a0 * t).exp();

        Self::new(
            phase * (c + n * az),
            phase * n * (ax - I * ay),
            phase * n * (ax + I * ay),
            phase * (c - n * az),
        )
    }

    /// Maximum entry-wise distance to `other`.
    pub fn distance(&self, other: &Self) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b).norm())
            .fold(0.0, f64::max)
    }
}

impl Default for Matrix2 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Add for Matrix2 {
    type Output = Matrix2;

    fn add(self, rhs: Self) -> Self::Output {
        let mut out = self;
        out += rhs;
        out
    }
}

impl AddAssign for Matrix2 {
    fn add_assign(&mut self, rhs: Self) {
        for (a, b) in self.0.iter_mut().zip(rhs.0) {
            *a += b;
        }
    }
}

impl Mul for Matrix2 {
    type Output = Matrix2;

    fn mul(self, rhs: Self) -> Self::Output {
        let [a00, a01, a10, a11] = self.0;
        let [b00, b01, b10, b11] = rhs.0;
        Self::new(
            a00 * b00 + a01 * b10,
            a00 * b01 + a01 * b11,
            a10 * b00 + a11 * b10,
            a10 * b01 + a11 * b11,
        )
    }
}

impl From<[[Complex64; 2]; 2]> for Matrix2 {
    fn from(m: [[Complex64; 2]; 2]) -> Self {
        Self::new(m[0][0], m[0][1], m[1][0], m[1][1])
    }
}
