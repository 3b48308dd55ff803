//! Statevector register engine.

use num_complex::Complex64;
use rand::{Rng, RngCore};
use tracing::{debug, trace};

use qmap_engine::{
    ArithmeticOp, EngineError, EngineResult, HamiltonianOp, Matrix2, RegisterEngine,
};

const ZERO: Complex64 = Complex64::new(0.0, 0.0);

/// A dense register holding all `2^n` amplitudes in memory.
///
/// Basis index bit `k` is the value of position `k`.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseRegister {
    /// The state amplitudes (2^n complex numbers).
    amplitudes: Vec<Complex64>,
    /// Number of qubits.
    num_qubits: usize,
}

impl DenseRegister {
    /// Create a new register initialized to |0...0⟩.
    pub fn new(num_qubits: usize) -> Self {
        let size = 1 << num_qubits;
        let mut amplitudes = vec![ZERO; size];
        amplitudes[0] = Complex64::new(1.0, 0.0);
        Self {
            amplitudes,
            num_qubits,
        }
    }

    /// Borrow the amplitudes without copying.
    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    /// Squared norm of the whole state.
    pub fn norm_sqr(&self) -> f64 {
        self.amplitudes.iter().map(Complex64::norm_sqr).sum()
    }

    fn renormalize(&mut self, norm_sqr: f64) {
        if norm_sqr > 0.0 {
            let norm = norm_sqr.sqrt();
            for amp in &mut self.amplitudes {
                *amp /= norm;
            }
        }
    }

    /// Apply a different 2×2 matrix per control pattern to `target`.
    fn apply_multiplexed(&mut self, controls: &[usize], target: usize, matrices: &[Matrix2]) {
        let tgt_mask = 1 << target;
        for i in 0..self.amplitudes.len() {
            if i & tgt_mask == 0 {
                let pattern = control_pattern(i, controls);
                let j = i | tgt_mask;
                let (a, b) = matrices[pattern].apply(self.amplitudes[i], self.amplitudes[j]);
                self.amplitudes[i] = a;
                self.amplitudes[j] = b;
            }
        }
    }

    /// Where the basis state `i` is sent by `op`, or `None` if its amplitude
    /// lies outside the subspace the op is defined on.
    fn arithmetic_image(op: ArithmeticOp, i: usize, start: usize, length: usize) -> Option<usize> {
        let lmask = low_mask(length);
        let value = (i >> start) & lmask;
        let cleared = i & !(lmask << start);

        match op {
            ArithmeticOp::Inc(n) => {
                let shifted = value.wrapping_add(n as usize) & lmask;
                Some(cleared | (shifted << start))
            }
            ArithmeticOp::Dec(n) => {
                let shifted = value.wrapping_sub(n as usize) & lmask;
                Some(cleared | (shifted << start))
            }
            ArithmeticOp::Mul {
                factor,
                carry_start,
            } => {
                let carry = (i >> carry_start) & lmask;
                if carry != 0 {
                    return None;
                }
                let product = value as u128 * u128::from(factor);
                let low = (product as usize) & lmask;
                let high = ((product >> length) as usize) & lmask;
                let base = cleared & !(lmask << carry_start);
                Some(base | (low << start) | (high << carry_start))
            }
            ArithmeticOp::Div {
                divisor,
                carry_start,
            } => {
                let carry = (i >> carry_start) & lmask;
                let combined = ((carry as u128) << length) | value as u128;
                let divisor = u128::from(divisor);
                if combined % divisor != 0 || combined / divisor > lmask as u128 {
                    return None;
                }
                let quotient = (combined / divisor) as usize;
                let base = cleared & !(lmask << carry_start);
                Some(base | (quotient << start))
            }
        }
    }
}

impl Default for DenseRegister {
    fn default() -> Self {
        Self::new(0)
    }
}

impl RegisterEngine for DenseRegister {
    fn with_qubits(num_qubits: usize) -> Self {
        Self::new(num_qubits)
    }

    fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    fn apply_controlled_single_qubit_gate(
        &mut self,
        controls: &[usize],
        matrix: &Matrix2,
        target: usize,
    ) {
        let ctrl_mask = mask_of(controls);
        let tgt_mask = 1 << target;
        for i in 0..self.amplitudes.len() {
            if (i & ctrl_mask == ctrl_mask) && (i & tgt_mask == 0) {
                let j = i | tgt_mask;
                let (a, b) = matrix.apply(self.amplitudes[i], self.amplitudes[j]);
                self.amplitudes[i] = a;
                self.amplitudes[j] = b;
            }
        }
    }

    fn controlled_swap(&mut self, controls: &[usize], q1: usize, q2: usize) {
        if q1 == q2 {
            return;
        }
        let ctrl_mask = mask_of(controls);
        let mask1 = 1 << q1;
        let mask2 = 1 << q2;
        for i in 0..self.amplitudes.len() {
            if i & ctrl_mask == ctrl_mask && (i & mask1 != 0) && (i & mask2 == 0) {
                let j = (i & !mask1) | mask2;
                self.amplitudes.swap(i, j);
            }
        }
    }

    fn controlled_sqrt_swap(&mut self, controls: &[usize], q1: usize, q2: usize) {
        if q1 == q2 {
            return;
        }
        let ctrl_mask = mask_of(controls);
        let mask1 = 1 << q1;
        let mask2 = 1 << q2;
        let p = Complex64::new(0.5, 0.5);
        let m = Complex64::new(0.5, -0.5);
        let sqrt_swap = Matrix2::new(p, m, m, p);
        for i in 0..self.amplitudes.len() {
            if i & ctrl_mask == ctrl_mask && (i & mask1 != 0) && (i & mask2 == 0) {
                let j = (i & !mask1) | mask2;
                let (a, b) = sqrt_swap.apply(self.amplitudes[i], self.amplitudes[j]);
                self.amplitudes[i] = a;
                self.amplitudes[j] = b;
            }
        }
    }

    fn uniformly_controlled_ry(&mut self, controls: &[usize], target: usize, angles: &[f64]) {
        let matrices: Vec<Matrix2> = angles.iter().map(|&t| Matrix2::ry(t)).collect();
        self.apply_multiplexed(controls, target, &matrices);
    }

    fn uniformly_controlled_rz(&mut self, controls: &[usize], target: usize, angles: &[f64]) {
        let matrices: Vec<Matrix2> = angles.iter().map(|&t| Matrix2::rz(t)).collect();
        self.apply_multiplexed(controls, target, &matrices);
    }

    fn controlled_arithmetic(
        &mut self,
        op: ArithmeticOp,
        start: usize,
        length: usize,
        controls: &[usize],
    ) -> EngineResult<()> {
        let carry_end = match op {
            ArithmeticOp::Mul {
                factor: value,
                carry_start,
            }
            | ArithmeticOp::Div {
                divisor: value,
                carry_start,
            } => {
                if value == 0 || (length < 64 && value >> length != 0) {
                    return Err(EngineError::InvalidOperand(format!(
                        "{value} does not fit a nonzero {length}-bit operand"
                    )));
                }
                carry_start + length
            }
            ArithmeticOp::Inc(_) | ArithmeticOp::Dec(_) => 0,
        };
        let end = (start + length).max(carry_end);
        if end > self.num_qubits {
            return Err(EngineError::PositionOutOfRange {
                position: end - 1,
                num_qubits: self.num_qubits,
            });
        }

        let ctrl_mask = mask_of(controls);
        let mut next = vec![ZERO; self.amplitudes.len()];
        for (i, &amp) in self.amplitudes.iter().enumerate() {
            if i & ctrl_mask != ctrl_mask {
                next[i] += amp;
            } else if let Some(j) = Self::arithmetic_image(op, i, start, length) {
                next[j] += amp;
            }
        }
        self.amplitudes = next;
        trace!(?op, start, length, "applied controlled arithmetic");
        Ok(())
    }

    fn measure(&mut self, mask: usize, rng: &mut dyn RngCore) -> usize {
        if mask == 0 {
            return 0;
        }
        let r: f64 = rng.r#gen::<f64>() * self.norm_sqr();

        let mut cumulative = 0.0;
        let mut outcome = self.amplitudes.len() - 1;
        for (i, amp) in self.amplitudes.iter().enumerate() {
            cumulative += amp.norm_sqr();
            if r < cumulative {
                outcome = i;
                break;
            }
        }

        let result = outcome & mask;
        self.force_measure(mask, result);
        result
    }

    fn prob(&self, position: usize) -> f64 {
        self.prob_mask(1 << position, 1 << position)
    }

    fn prob_mask(&self, mask: usize, pattern: usize) -> f64 {
        self.amplitudes
            .iter()
            .enumerate()
            .filter(|(i, _)| i & mask == pattern)
            .map(|(_, amp)| amp.norm_sqr())
            .sum()
    }

    fn force_measure(&mut self, mask: usize, pattern: usize) {
        let mut norm_sqr = 0.0;
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if i & mask == pattern {
                norm_sqr += amp.norm_sqr();
            } else {
                *amp = ZERO;
            }
        }
        self.renormalize(norm_sqr);
    }

    fn compose(&mut self, other: Self) -> usize {
        let base = self.num_qubits;
        let mut amplitudes = Vec::with_capacity(self.amplitudes.len() * other.amplitudes.len());
        for high in &other.amplitudes {
            for low in &self.amplitudes {
                amplitudes.push(low * high);
            }
        }
        self.amplitudes = amplitudes;
        self.num_qubits += other.num_qubits;
        debug!(base, added = other.num_qubits, "composed register block");
        base
    }

    fn dispose(&mut self, start: usize, length: usize) {
        // The block is assumed separable: keep the slice belonging to its most
        // likely pattern and renormalise.
        let lmask = low_mask(length);
        let mut weights = vec![0.0; 1 << length];
        for (i, amp) in self.amplitudes.iter().enumerate() {
            weights[(i >> start) & lmask] += amp.norm_sqr();
        }
        let (pattern, weight) = weights
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

        let remaining = self.num_qubits - length;
        let below = low_mask(start);
        let amplitudes: Vec<Complex64> = (0..1usize << remaining)
            .map(|r| {
                let i = (r & below) | (pattern << start) | ((r & !below) << length);
                self.amplitudes[i]
            })
            .collect();

        self.amplitudes = amplitudes;
        self.num_qubits = remaining;
        self.renormalize(weight);
        debug!(start, length, remaining, "disposed register block");
    }

    fn state(&self) -> Vec<Complex64> {
        self.amplitudes.clone()
    }

    fn set_state(&mut self, amplitudes: &[Complex64]) -> EngineResult<()> {
        if amplitudes.len() != self.amplitudes.len() {
            return Err(EngineError::StateSizeMismatch {
                expected: self.amplitudes.len(),
                actual: amplitudes.len(),
            });
        }
        self.amplitudes.copy_from_slice(amplitudes);
        Ok(())
    }

    fn amplitude(&self, index: usize) -> Complex64 {
        self.amplitudes.get(index).copied().unwrap_or(ZERO)
    }

    fn time_evolve(&mut self, hamiltonian: &[HamiltonianOp], duration: f64) {
        for op in hamiltonian {
            let propagator = op.matrix.evolution(duration);
            self.apply_controlled_single_qubit_gate(&op.controls, &propagator, op.target);
        }
    }
}

fn mask_of(positions: &[usize]) -> usize {
    positions.iter().fold(0, |m, &p| m | (1 << p))
}

fn low_mask(length: usize) -> usize {
    if length >= usize::BITS as usize {
        usize::MAX
    } else {
        (1 << length) - 1
    }
}

fn control_pattern(index: usize, controls: &[usize]) -> usize {
    controls
        .iter()
        .enumerate()
        .fold(0, |k, (bit, &c)| k | (((index >> c) & 1) << bit))
}
