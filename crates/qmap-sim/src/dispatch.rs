//! Gate dispatch: resolve ids to positions and drive engine primitives.
//!
//! Every method resolves and validates all ids before the first engine call.
//! Targets may not double as controls.
//!
//! The arithmetic primitives need their operand at positions `0..k`. The
//! dispatcher gathers the operand ids there with a swap network and leaves
//! the permutation in place afterwards; callers that care about positions
//! must re-query them after any arithmetic call.

use tracing::{debug, instrument, trace};

use qmap_engine::{ArithmeticOp, Matrix2, RegisterEngine};

use crate::error::{SimError, SimResult};
use crate::qubit_map::QubitId;
use crate::simulator::Simulator;

impl<E: RegisterEngine> Simulator<E> {
    /// Apply `matrix` to each target in list order, conditioned on `controls`.
    #[instrument(skip(self, matrix))]
    pub fn apply_controlled_gate(
        &mut self,
        matrix: &Matrix2,
        targets: &[QubitId],
        controls: &[QubitId],
    ) -> SimResult<()> {
        let (targets, controls) = self.resolve_disjoint(targets, controls)?;
        if targets.is_empty() {
            return Ok(());
        }
        let engine = self.engine_mut()?;
        for target in targets {
            engine.apply_controlled_single_qubit_gate(&controls, matrix, target);
        }
        Ok(())
    }

    /// Pairwise SWAP of `ids1[k]` with `ids2[k]`, conditioned on `controls`.
    #[instrument(skip(self))]
    pub fn apply_controlled_swap(
        &mut self,
        ids1: &[QubitId],
        ids2: &[QubitId],
        controls: &[QubitId],
    ) -> SimResult<()> {
        let pairs = self.resolve_pairs(ids1, ids2, controls)?;
        let Some((pairs, controls)) = pairs else {
            return Ok(());
        };
        let engine = self.engine_mut()?;
        for (a, b) in pairs {
            engine.controlled_swap(&controls, a, b);
        }
        Ok(())
    }

    /// Pairwise √SWAP of `ids1[k]` with `ids2[k]`, conditioned on `controls`.
    #[instrument(skip(self))]
    pub fn apply_controlled_sqrtswap(
        &mut self,
        ids1: &[QubitId],
        ids2: &[QubitId],
        controls: &[QubitId],
    ) -> SimResult<()> {
        let pairs = self.resolve_pairs(ids1, ids2, controls)?;
        let Some((pairs, controls)) = pairs else {
            return Ok(());
        };
        let engine = self.engine_mut()?;
        for (a, b) in pairs {
            engine.controlled_sqrt_swap(&controls, a, b);
        }
        Ok(())
    }

    /// Multiply the all-controls-set subspace by `e^{iθ}`.
    ///
    /// A phase is symmetric in its qubits, so the target is picked as the
    /// lowest position not among the controls. When every allocated qubit is
    /// a control, the last control becomes the target of `diag(1, e^{iθ})`,
    /// which has the same effect. Without controls this is a global phase.
    #[instrument(skip(self))]
    pub fn apply_controlled_phase_gate(
        &mut self,
        angle: f64,
        controls: &[QubitId],
    ) -> SimResult<()> {
        let mut controls = self.map.resolve(controls)?;
        if self.register.is_none() {
            return Ok(());
        }
        controls.sort_unstable();
        controls.dedup();

        let phase = Matrix2::global_phase(angle);
        let free = (0..self.map.len()).find(|p| controls.binary_search(p).is_err());
        let engine = self.engine_mut()?;
        match free {
            Some(target) => {
                trace!(target, "phase target chosen");
                engine.apply_controlled_single_qubit_gate(&controls, &phase, target);
            }
            None => {
                let Some(target) = controls.pop() else {
                    return Ok(());
                };
                let shift = Matrix2::phase_shift(angle);
                engine.apply_controlled_single_qubit_gate(&controls, &shift, target);
            }
        }
        Ok(())
    }

    /// Multiplexed RY on each target. `angles[k]` is used when bit `j` of `k`
    /// equals the value of `controls[j]`.
    #[instrument(skip(self, angles))]
    pub fn apply_uniformly_controlled_ry(
        &mut self,
        angles: &[f64],
        targets: &[QubitId],
        controls: &[QubitId],
    ) -> SimResult<()> {
        let Some((targets, controls)) = self.resolve_multiplexed(angles, targets, controls)? else {
            return Ok(());
        };
        let engine = self.engine_mut()?;
        for target in targets {
            engine.uniformly_controlled_ry(&controls, target, angles);
        }
        Ok(())
    }

    /// Multiplexed RZ, indexed like [`apply_uniformly_controlled_ry`](Self::apply_uniformly_controlled_ry).
    #[instrument(skip(self, angles))]
    pub fn apply_uniformly_controlled_rz(
        &mut self,
        angles: &[f64],
        targets: &[QubitId],
        controls: &[QubitId],
    ) -> SimResult<()> {
        let Some((targets, controls)) = self.resolve_multiplexed(angles, targets, controls)? else {
            return Ok(());
        };
        let engine = self.engine_mut()?;
        for target in targets {
            engine.uniformly_controlled_rz(&controls, target, angles);
        }
        Ok(())
    }

    /// `x ← x + value mod 2^|ids|`, where `ids[0]` is the least significant bit.
    pub fn apply_controlled_inc(
        &mut self,
        ids: &[QubitId],
        controls: &[QubitId],
        value: u64,
    ) -> SimResult<()> {
        self.run_arithmetic(ArithmeticOp::Inc(value), ids, controls)
    }

    /// `x ← x − value mod 2^|ids|`.
    pub fn apply_controlled_dec(
        &mut self,
        ids: &[QubitId],
        controls: &[QubitId],
        value: u64,
    ) -> SimResult<()> {
        self.run_arithmetic(ArithmeticOp::Dec(value), ids, controls)
    }

    /// Out-of-place multiply. The first half of `ids` holds `x`, the second
    /// half a zeroed carry register that receives the high bits of the product.
    pub fn apply_controlled_mul(
        &mut self,
        ids: &[QubitId],
        controls: &[QubitId],
        factor: u64,
    ) -> SimResult<()> {
        let half = Self::half_width(ids, factor)?;
        let op = ArithmeticOp::Mul {
            factor,
            carry_start: half,
        };
        self.run_arithmetic(op, ids, controls)
    }

    /// Inverse of [`apply_controlled_mul`](Self::apply_controlled_mul).
    pub fn apply_controlled_div(
        &mut self,
        ids: &[QubitId],
        controls: &[QubitId],
        divisor: u64,
    ) -> SimResult<()> {
        let half = Self::half_width(ids, divisor)?;
        let op = ArithmeticOp::Div {
            divisor,
            carry_start: half,
        };
        self.run_arithmetic(op, ids, controls)
    }

    // ------------------------------------------------------------------
    // Resolution helpers
    // ------------------------------------------------------------------

    /// Resolve targets and controls, rejecting overlap between the two.
    fn resolve_disjoint(
        &self,
        targets: &[QubitId],
        controls: &[QubitId],
    ) -> SimResult<(Vec<usize>, Vec<usize>)> {
        let target_pos = self.map.resolve(targets)?;
        let control_pos = self.map.resolve(controls)?;
        if let Some(id) = targets.iter().find(|t| controls.contains(t)) {
            return Err(SimError::InvalidArgument(format!(
                "qubit {id} is used both as a target and as a control"
            )));
        }
        Ok((target_pos, control_pos))
    }

    #[allow(clippy::type_complexity)]
    fn resolve_pairs(
        &self,
        ids1: &[QubitId],
        ids2: &[QubitId],
        controls: &[QubitId],
    ) -> SimResult<Option<(Vec<(usize, usize)>, Vec<usize>)>> {
        if ids1.len() != ids2.len() {
            return Err(SimError::LengthMismatch {
                what: "swap operands",
                expected: ids1.len(),
                actual: ids2.len(),
            });
        }
        let (first, control_pos) = self.resolve_disjoint(ids1, controls)?;
        let (second, _) = self.resolve_disjoint(ids2, controls)?;
        if first.is_empty() {
            return Ok(None);
        }
        Ok(Some((first.into_iter().zip(second).collect(), control_pos)))
    }

    #[allow(clippy::type_complexity)]
    fn resolve_multiplexed(
        &self,
        angles: &[f64],
        targets: &[QubitId],
        controls: &[QubitId],
    ) -> SimResult<Option<(Vec<usize>, Vec<usize>)>> {
        let expected = 1usize
            .checked_shl(controls.len() as u32)
            .ok_or_else(|| SimError::InvalidArgument("too many multiplexer controls".into()))?;
        if angles.len() != expected {
            return Err(SimError::LengthMismatch {
                what: "multiplexer angles",
                expected,
                actual: angles.len(),
            });
        }
        let (targets, controls) = self.resolve_disjoint(targets, controls)?;
        if targets.is_empty() {
            return Ok(None);
        }
        Ok(Some((targets, controls)))
    }

    /// Validate a mul/div operand list and return the width of each half.
    fn half_width(ids: &[QubitId], value: u64) -> SimResult<usize> {
        if ids.is_empty() || ids.len() % 2 != 0 {
            return Err(SimError::InvalidArgument(format!(
                "multiply/divide needs an even, non-zero number of qubits, got {}",
                ids.len()
            )));
        }
        let half = ids.len() / 2;
        if value == 0 || (half < 64 && value >> half != 0) {
            return Err(SimError::InvalidArgument(format!(
                "operand {value} must be non-zero and fit in {half} bits"
            )));
        }
        Ok(half)
    }

    // ------------------------------------------------------------------
    // Arithmetic
    // ------------------------------------------------------------------

    #[instrument(skip(self))]
    fn run_arithmetic(
        &mut self,
        op: ArithmeticOp,
        ids: &[QubitId],
        controls: &[QubitId],
    ) -> SimResult<()> {
        if ids.is_empty() {
            return Err(SimError::InvalidArgument(
                "arithmetic needs at least one operand qubit".into(),
            ));
        }
        self.resolve_disjoint(ids, controls)?;
        if let Some((k, id)) = ids
            .iter()
            .enumerate()
            .find(|(k, id)| ids[..*k].contains(id))
        {
            return Err(SimError::InvalidArgument(format!(
                "operand qubit {id} is listed twice (index {k})"
            )));
        }

        self.gather_to_front(ids)?;
        let control_pos = self.map.resolve(controls)?;
        let length = match op {
            ArithmeticOp::Mul { carry_start, .. } | ArithmeticOp::Div { carry_start, .. } => {
                carry_start
            }
            ArithmeticOp::Inc(_) | ArithmeticOp::Dec(_) => ids.len(),
        };
        self.engine_mut()?
            .controlled_arithmetic(op, 0, length, &control_pos)?;
        debug!(?op, length, "applied arithmetic");
        Ok(())
    }

    /// Move `ids[k]` to position `k` for every `k`, keeping the map in step
    /// with each engine swap.
    fn gather_to_front(&mut self, ids: &[QubitId]) -> SimResult<()> {
        for (k, &id) in ids.iter().enumerate() {
            let current = self.map.position(id).ok_or(SimError::UnknownId(id))?;
            if current != k {
                self.engine_mut()?.swap(k, current);
                self.map.swap_positions(k, current);
            }
        }
        Ok(())
    }
}
