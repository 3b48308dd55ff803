//! Time evolution, operator application and expectation values over
//! weighted Pauli sums.
//!
//! Local indices inside each [`PauliTerm`](crate::terms::PauliTerm) refer to
//! the `ids` slice passed alongside the terms.

use num_complex::Complex64;
use std::collections::BTreeMap;
use tracing::{debug, instrument, trace};

use qmap_engine::{HamiltonianOp, Matrix2, RegisterEngine};

use crate::error::{SimError, SimResult};
use crate::qubit_map::QubitId;
use crate::simulator::{Simulator, mask_of};
use crate::terms::{ComplexTermsDict, PauliTerm, TermsDict};

impl<E: RegisterEngine> Simulator<E> {
    /// Evolve under `Σ c_k P_k` for `duration`, conditioned on `controls`.
    ///
    /// Contributions are summed per qubit into one 2×2 generator each. This
    /// is exact only when the Hamiltonian is a sum of single-qubit terms;
    /// products across qubits are split into independent factors. Identity
    /// terms add a global phase and are dropped.
    #[instrument(skip(self, terms), fields(terms = terms.len()))]
    pub fn time_evolve(
        &mut self,
        terms: &TermsDict,
        duration: f64,
        ids: &[QubitId],
        controls: &[QubitId],
    ) -> SimResult<()> {
        terms.check_width(ids.len())?;
        let positions = self.map.resolve(ids)?;
        let control_pos = self.map.resolve(controls)?;

        let mut generators: BTreeMap<usize, Matrix2> = BTreeMap::new();
        for (term, coeff) in terms.terms() {
            for &(index, pauli) in term.ops() {
                let position = positions[index];
                *generators.entry(position).or_insert_with(Matrix2::zero) +=
                    pauli.matrix().scale(Complex64::new(*coeff, 0.0));
            }
        }

        if let Some(target) = generators.keys().find(|p| control_pos.contains(p)) {
            return Err(SimError::InvalidArgument(format!(
                "position {target} is both evolved and used as a control"
            )));
        }
        if generators.is_empty() {
            return Ok(());
        }

        let hamiltonian: Vec<HamiltonianOp> = generators
            .into_iter()
            .map(|(target, matrix)| HamiltonianOp::controlled(control_pos.clone(), target, matrix))
            .collect();
        debug!(ops = hamiltonian.len(), duration, "time evolution");
        self.engine_mut()?.time_evolve(&hamiltonian, duration);
        Ok(())
    }

    /// Apply `Σ c_k P_k` term by term.
    ///
    /// Each term is applied as its Pauli factors with `c_k` folded into the
    /// first one. The result equals the operator only if every term is
    /// unitary, or there is a single term; this is not checked. Unlike
    /// backends that scale every factor by `-c_k`, the coefficient enters
    /// once and with its own sign.
    #[instrument(skip(self, terms), fields(terms = terms.len()))]
    pub fn apply_operator(&mut self, terms: &ComplexTermsDict, ids: &[QubitId]) -> SimResult<()> {
        terms.check_width(ids.len())?;
        let positions = self.map.resolve(ids)?;
        if terms.is_empty() || self.register.is_none() {
            return Ok(());
        }

        let engine = self.engine_mut()?;
        for (term, coeff) in terms.terms() {
            let Some(((first_index, first), rest)) = term.ops().split_first() else {
                engine.apply_single_qubit_gate(&Matrix2::identity().scale(*coeff), 0);
                continue;
            };
            engine.apply_single_qubit_gate(&first.matrix().scale(*coeff), positions[*first_index]);
            for &(index, pauli) in rest {
                engine.apply_single_qubit_gate(&pauli.matrix(), positions[index]);
            }
        }
        Ok(())
    }

    /// Estimate `⟨ψ| Σ c_k P_k |ψ⟩` from single-qubit readings.
    ///
    /// Every term starts from a copy of the current state. Its factors are
    /// rotated into the Z basis, with the sign of `c_k` carried by the
    /// rotations, and each affected qubit contributes `P(0) − P(1)`. The
    /// product is clamped to `[-1, 1]` and weighted by `|c_k|`; the sum is
    /// clamped again. Identity terms contribute `|c_k|`.
    ///
    /// Marginals ignore correlations: a Bell pair reads 0 for `Z0 Z1`. Use
    /// [`parity_expectation_value`](Self::parity_expectation_value) for the
    /// exact value. The live register is not modified.
    #[instrument(skip(self, terms), fields(terms = terms.len()))]
    pub fn expectation_value(&self, terms: &TermsDict, ids: &[QubitId]) -> SimResult<f64> {
        let positions = self.observable_positions(terms, ids)?;

        let mut expectation: f64 = 0.0;
        for (term, coeff) in terms.terms() {
            let mut product: f64 = 1.0;
            if !term.is_identity() {
                let phase = Complex64::new(if *coeff < 0.0 { -1.0 } else { 1.0 }, 0.0);
                let scratch = self.diagonalized_copy(term, &positions, phase)?;
                for &(index, _) in term.ops() {
                    product *= 1.0 - 2.0 * scratch.prob(positions[index]);
                }
            }
            let contribution = coeff.abs() * product.clamp(-1.0, 1.0);
            trace!(ops = term.ops().len(), contribution, "term evaluated");
            expectation += contribution;
        }
        Ok(expectation.clamp(-1.0, 1.0))
    }

    /// Exact `⟨ψ| Σ c_k P_k |ψ⟩` for a real-weighted Pauli sum.
    ///
    /// Each term is rotated into the Z basis on a copy of the state and the
    /// joint parity of the affected qubits is read off, so correlations are
    /// kept. Coefficients keep their sign and the sum is not clamped.
    #[instrument(skip(self, terms), fields(terms = terms.len()))]
    pub fn parity_expectation_value(&self, terms: &TermsDict, ids: &[QubitId]) -> SimResult<f64> {
        let positions = self.observable_positions(terms, ids)?;

        let mut expectation = 0.0;
        for (term, coeff) in terms.terms() {
            if term.is_identity() {
                expectation += coeff;
                continue;
            }
            let scratch = self.diagonalized_copy(term, &positions, Complex64::new(1.0, 0.0))?;
            let touched: Vec<usize> = term.ops().iter().map(|&(index, _)| positions[index]).collect();
            let parity = parity_expectation(&scratch, mask_of(&touched)).clamp(-1.0, 1.0);
            trace!(?touched, parity, "term evaluated");
            expectation += coeff * parity;
        }
        Ok(expectation)
    }

    fn observable_positions(&self, terms: &TermsDict, ids: &[QubitId]) -> SimResult<Vec<usize>> {
        terms.check_width(ids.len())?;
        let positions = self.map.resolve(ids)?;
        if let Some((term, _)) = terms.terms().iter().find(|(t, _)| t.has_repeated_index()) {
            return Err(SimError::InvalidArgument(format!(
                "term {:?} acts twice on the same qubit",
                term.ops()
            )));
        }
        Ok(positions)
    }

    /// A copy of the register with every factor of `term` rotated into the
    /// Z basis, each rotation scaled by `phase`.
    fn diagonalized_copy(
        &self,
        term: &PauliTerm,
        positions: &[usize],
        phase: Complex64,
    ) -> SimResult<E> {
        let mut scratch = self.engine()?.clone();
        for &(index, pauli) in term.ops() {
            let rotation = pauli.diagonalizer().unwrap_or_else(Matrix2::identity);
            scratch.apply_single_qubit_gate(&rotation.scale(phase), positions[index]);
        }
        Ok(scratch)
    }
}

/// `Σ_i |a_i|² (−1)^{popcount(i & mask)}`.
fn parity_expectation<E: RegisterEngine>(register: &E, mask: usize) -> f64 {
    register
        .state()
        .iter()
        .enumerate()
        .map(|(i, amp)| {
            let p = amp.norm_sqr();
            if (i & mask).count_ones() % 2 == 0 { p } else { -p }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::DenseSimulator;
    use crate::terms::Pauli;

    fn q(id: u32) -> QubitId {
        QubitId(id)
    }

    fn sim_with(ids: &[u32]) -> DenseSimulator {
        let mut sim = DenseSimulator::with_seed(2);
        for &id in ids {
            sim.allocate_qubit(q(id)).unwrap();
        }
        sim
    }

    #[test]
    fn test_z_expectation_fresh() {
        let sim = sim_with(&[0]);
        let obs = TermsDict::from_terms(vec![(PauliTerm::single(0, Pauli::Z), 1.0)]);
        let e = sim.expectation_value(&obs, &[q(0)]).unwrap();
        assert!((e - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_x_expectation_plus_state() {
        let mut sim = sim_with(&[0]);
        sim.apply_controlled_gate(&Matrix2::hadamard(), &[q(0)], &[])
            .unwrap();
        let obs = TermsDict::from_terms(vec![
            (PauliTerm::single(0, Pauli::X), 0.5),
            (PauliTerm::single(0, Pauli::Z), 2.0),
        ]);
        let e = sim.expectation_value(&obs, &[q(0)]).unwrap();
        assert!((e - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_expectation_leaves_state_untouched() {
        let mut sim = sim_with(&[0]);
        sim.apply_controlled_gate(&Matrix2::ry(0.3), &[q(0)], &[])
            .unwrap();
        let before = sim.extract();
        let obs = TermsDict::from_terms(vec![(PauliTerm::single(0, Pauli::Y), 1.0)]);
        sim.expectation_value(&obs, &[q(0)]).unwrap();
        assert_eq!(sim.extract(), before);
    }

    #[test]
    fn test_negative_weight_reads_magnitude() {
        let sim = sim_with(&[0]);
        let obs = TermsDict::from_terms(vec![(PauliTerm::single(0, Pauli::Z), -1.0)]);
        let e = sim.expectation_value(&obs, &[q(0)]).unwrap();
        assert!((e - 1.0).abs() < 1e-12, "{e}");
        let exact = sim.parity_expectation_value(&obs, &[q(0)]).unwrap();
        assert!((exact + 1.0).abs() < 1e-12, "{exact}");
    }

    #[test]
    fn test_sum_is_clamped() {
        let sim = sim_with(&[0, 1]);
        let obs = TermsDict::from_terms(vec![
            (PauliTerm::single(0, Pauli::Z), 1.0),
            (PauliTerm::single(1, Pauli::Z), 1.0),
        ]);
        let e = sim.expectation_value(&obs, &[q(0), q(1)]).unwrap();
        assert!((e - 1.0).abs() < 1e-12, "{e}");
        let exact = sim.parity_expectation_value(&obs, &[q(0), q(1)]).unwrap();
        assert!((exact - 2.0).abs() < 1e-12, "{exact}");
    }

    #[test]
    fn test_repeated_index_rejected() {
        let sim = sim_with(&[0]);
        let obs = TermsDict::from_terms(vec![(
            PauliTerm::from_ops([(0, Pauli::X), (0, Pauli::Z)]),
            1.0,
        )]);
        assert!(matches!(
            sim.expectation_value(&obs, &[q(0)]),
            Err(SimError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_width_checked() {
        let sim = sim_with(&[0]);
        let obs = TermsDict::from_terms(vec![(PauliTerm::single(1, Pauli::Z), 1.0)]);
        assert!(sim.expectation_value(&obs, &[q(0)]).is_err());
    }

    #[test]
    fn test_apply_operator_single_x() {
        let mut sim = sim_with(&[0, 1]);
        let op = ComplexTermsDict::from_terms(vec![(
            PauliTerm::single(1, Pauli::X),
            Complex64::new(1.0, 0.0),
        )]);
        sim.apply_operator(&op, &[q(0), q(1)]).unwrap();
        assert!(sim.classical_value(q(1)).unwrap());
        assert!(!sim.classical_value(q(0)).unwrap());
    }

    #[test]
    fn test_time_evolve_control_overlap() {
        let mut sim = sim_with(&[0, 1]);
        let h = TermsDict::from_terms(vec![(PauliTerm::single(0, Pauli::X), 1.0)]);
        assert!(matches!(
            sim.time_evolve(&h, 1.0, &[q(0)], &[q(0)]),
            Err(SimError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_time_evolve_flips() {
        let mut sim = sim_with(&[0]);
        // exp(-i·(π/2)·X) = -i·X
        let h = TermsDict::from_terms(vec![(PauliTerm::single(0, Pauli::X), 1.0)]);
        sim.time_evolve(&h, std::f64::consts::FRAC_PI_2, &[q(0)], &[])
            .unwrap();
        assert!(sim.is_classical(q(0)).unwrap());
        assert!(sim.classical_value(q(0)).unwrap());
    }
}
