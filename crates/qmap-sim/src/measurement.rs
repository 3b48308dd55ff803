//! Measurement, probability queries and state transfer.
//!
//! Reads observe whatever the engine has completed; call
//! [`barrier`](Simulator::barrier) first when the engine defers work.

use num_complex::Complex64;
use tracing::{debug, instrument, warn};

use qmap_engine::RegisterEngine;

use crate::error::{SimError, SimResult};
use crate::qubit_map::QubitId;
use crate::simulator::{Simulator, mask_of, pattern_of};

impl<E: RegisterEngine> Simulator<E> {
    /// Jointly measure `ids`, collapsing the register. Returns one bit per id.
    #[instrument(skip(self))]
    pub fn measure(&mut self, ids: &[QubitId]) -> SimResult<Vec<bool>> {
        let positions = self.map.resolve(ids)?;
        if positions.is_empty() {
            return Ok(Vec::new());
        }
        let mask = mask_of(&positions);
        let register = self.register.as_mut().ok_or(SimError::EmptyRegister)?;
        let outcome = register.measure(mask, &mut self.rng);
        let bits: Vec<bool> = positions.iter().map(|p| outcome & (1 << p) != 0).collect();
        debug!(?bits, "measured");
        Ok(bits)
    }

    /// Probability that `ids` read `bits`.
    pub fn get_probability(&self, bits: &[bool], ids: &[QubitId]) -> SimResult<f64> {
        check_lengths("probability pattern", ids.len(), bits.len())?;
        let positions = self.map.resolve(ids)?;
        match positions.as_slice() {
            [] => Ok(1.0),
            [position] => {
                let p1 = self.engine()?.prob(*position);
                Ok(if bits[0] { p1 } else { 1.0 - p1 })
            }
            _ => {
                let engine = self.engine()?;
                Ok(engine.prob_mask(mask_of(&positions), pattern_of(&positions, bits)))
            }
        }
    }

    /// Amplitude of the basis state where `ids[k]` reads `bits[k]`.
    ///
    /// `ids` must name every allocated qubit exactly once.
    pub fn get_amplitude(&self, bits: &[bool], ids: &[QubitId]) -> SimResult<Complex64> {
        check_lengths("amplitude pattern", ids.len(), bits.len())?;
        if !self.map.is_permutation(ids) {
            return Err(SimError::InvalidPermutation(
                "amplitude lookup must name every allocated qubit exactly once".into(),
            ));
        }
        let positions = self.map.resolve(ids)?;
        Ok(self.engine()?.amplitude(pattern_of(&positions, bits)))
    }

    /// Project `ids` onto `values` and renormalise.
    #[instrument(skip(self))]
    pub fn collapse(&mut self, ids: &[QubitId], values: &[bool]) -> SimResult<()> {
        check_lengths("collapse values", ids.len(), values.len())?;
        let positions = self.map.resolve(ids)?;
        if positions.is_empty() {
            return Ok(());
        }
        let mask = mask_of(&positions);
        let pattern = pattern_of(&positions, values);
        let probability = self.engine()?.prob_mask(mask, pattern);
        if probability < self.config.tolerance {
            warn!(probability, "refusing to collapse onto a ~0 outcome");
            return Err(SimError::NearZeroProbability { probability });
        }
        self.engine_mut()?.force_measure(mask, pattern);
        Ok(())
    }

    /// Replace the whole state. Afterwards `ordering[k]` sits at position `k`.
    #[instrument(skip(self, amplitudes), fields(len = amplitudes.len()))]
    pub fn set_state(&mut self, amplitudes: &[Complex64], ordering: &[QubitId]) -> SimResult<()> {
        if !self.map.is_permutation(ordering) {
            return Err(SimError::InvalidPermutation(
                "state ordering must name every allocated qubit exactly once".into(),
            ));
        }
        check_size(ordering.len(), amplitudes.len())?;
        if ordering.is_empty() {
            return Ok(());
        }
        self.engine_mut()?.set_state(amplitudes)?;
        self.map.reorder(ordering)?;
        Ok(())
    }

    /// Prepare `amplitudes` on the subset `ids`, leaving the other qubits'
    /// reduced state alone.
    ///
    /// The old content of `ids` is measured away. The ids then occupy the
    /// highest positions, in list order.
    #[instrument(skip(self, amplitudes), fields(len = amplitudes.len()))]
    pub fn prepare_substate(
        &mut self,
        ids: &[QubitId],
        amplitudes: &[Complex64],
    ) -> SimResult<()> {
        check_size(ids.len(), amplitudes.len())?;
        self.map.resolve(ids)?;
        if let Some(id) = ids
            .iter()
            .enumerate()
            .find_map(|(k, id)| ids[..k].contains(id).then_some(id))
        {
            return Err(SimError::InvalidArgument(format!(
                "qubit {id} is listed twice in the substate"
            )));
        }
        if ids.is_empty() {
            return Ok(());
        }

        if ids.len() == self.map.len() {
            self.engine_mut()?.set_state(amplitudes)?;
            self.map.reorder(ids)?;
            return Ok(());
        }

        let mut block = E::with_qubits(ids.len());
        block.set_state(amplitudes)?;

        for &id in ids {
            let position = self.map.position(id).ok_or(SimError::UnknownId(id))?;
            let register = self.register.as_mut().ok_or(SimError::EmptyRegister)?;
            register.measure(1 << position, &mut self.rng);
            register.dispose(position, 1);
            self.map.remove(id)?;
        }

        let base = self.engine_mut()?.compose(block);
        for &id in ids {
            self.map.insert(id)?;
        }
        debug!(base, qubits = ids.len(), "prepared substate");
        Ok(())
    }
}

fn check_lengths(what: &'static str, expected: usize, actual: usize) -> SimResult<()> {
    if expected != actual {
        return Err(SimError::LengthMismatch {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}

fn check_size(num_qubits: usize, actual: usize) -> SimResult<()> {
    let expected = 1usize
        .checked_shl(num_qubits as u32)
        .ok_or_else(|| SimError::InvalidArgument(format!("{num_qubits} qubits is too wide")))?;
    if expected != actual {
        return Err(SimError::SizeMismatch { expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::DenseSimulator;
    use qmap_engine::Matrix2;
    use std::f64::consts::FRAC_1_SQRT_2;

    fn q(id: u32) -> QubitId {
        QubitId(id)
    }

    fn c(re: f64) -> Complex64 {
        Complex64::new(re, 0.0)
    }

    fn sim_with(ids: &[u32]) -> DenseSimulator {
        let mut sim = DenseSimulator::with_seed(5);
        for &id in ids {
            sim.allocate_qubit(q(id)).unwrap();
        }
        sim
    }

    #[test]
    fn test_measure_fresh_qubits() {
        let mut sim = sim_with(&[3, 4]);
        assert_eq!(sim.measure(&[q(4), q(3)]).unwrap(), vec![false, false]);
    }

    #[test]
    fn test_probability_fast_path_matches_mask() {
        let mut sim = sim_with(&[0, 1]);
        sim.apply_controlled_gate(&Matrix2::ry(1.0), &[q(1)], &[])
            .unwrap();
        let single = sim.get_probability(&[true], &[q(1)]).unwrap();
        let joint = sim.get_probability(&[true, false], &[q(1), q(0)]).unwrap();
        assert!((single - joint).abs() < 1e-12);
    }

    #[test]
    fn test_probability_length_mismatch() {
        let sim = sim_with(&[0]);
        assert!(matches!(
            sim.get_probability(&[true, false], &[q(0)]),
            Err(SimError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_amplitude_requires_permutation() {
        let sim = sim_with(&[0, 1]);
        assert!(matches!(
            sim.get_amplitude(&[false], &[q(0)]),
            Err(SimError::InvalidPermutation(_))
        ));
        let amp = sim.get_amplitude(&[false, false], &[q(1), q(0)]).unwrap();
        assert!((amp - c(1.0)).norm() < 1e-12);
    }

    #[test]
    fn test_collapse_near_zero() {
        let mut sim = sim_with(&[0]);
        assert!(matches!(
            sim.collapse(&[q(0)], &[true]),
            Err(SimError::NearZeroProbability { .. })
        ));
        sim.collapse(&[q(0)], &[false]).unwrap();
    }

    #[test]
    fn test_set_state_reorders() {
        let mut sim = sim_with(&[0, 1]);
        // |01⟩ in the order [q1, q0]: q1 at position 0 is set
        let state = [c(0.0), c(1.0), c(0.0), c(0.0)];
        sim.set_state(&state, &[q(1), q(0)]).unwrap();
        assert_eq!(sim.position(q(1)), Some(0));
        assert!(sim.classical_value(q(1)).unwrap());
        assert!(!sim.classical_value(q(0)).unwrap());
    }

    #[test]
    fn test_set_state_validation() {
        let mut sim = sim_with(&[0, 1]);
        assert!(matches!(
            sim.set_state(&[c(1.0), c(0.0)], &[q(0)]),
            Err(SimError::InvalidPermutation(_))
        ));
        assert!(matches!(
            sim.set_state(&[c(1.0), c(0.0)], &[q(0), q(1)]),
            Err(SimError::SizeMismatch { expected: 4, actual: 2 })
        ));
    }

    #[test]
    fn test_prepare_substate_keeps_rest() {
        let mut sim = sim_with(&[0, 1, 2]);
        sim.apply_controlled_gate(&Matrix2::pauli_x(), &[q(2)], &[])
            .unwrap();

        let plus = [c(FRAC_1_SQRT_2), c(FRAC_1_SQRT_2)];
        sim.prepare_substate(&[q(0)], &plus).unwrap();

        assert_eq!(sim.position(q(0)), Some(2));
        assert_eq!(sim.position(q(1)), Some(0));
        assert_eq!(sim.position(q(2)), Some(1));
        assert!(sim.classical_value(q(2)).unwrap());
        let p = sim.get_probability(&[true], &[q(0)]).unwrap();
        assert!((p - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_prepare_full_set_remaps() {
        let mut sim = sim_with(&[0, 1]);
        let state = [c(0.0), c(1.0), c(0.0), c(0.0)];
        sim.prepare_substate(&[q(1), q(0)], &state).unwrap();
        assert!(sim.classical_value(q(1)).unwrap());
        assert!(!sim.classical_value(q(0)).unwrap());
    }

    #[test]
    fn test_prepare_substate_size_checked() {
        let mut sim = sim_with(&[0, 1]);
        assert!(matches!(
            sim.prepare_substate(&[q(0)], &[c(1.0)]),
            Err(SimError::SizeMismatch { expected: 2, actual: 1 })
        ));
    }
}
