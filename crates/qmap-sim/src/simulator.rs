//! The simulator: qubit lifecycle over a register engine.
//!
//! [`Simulator`] owns the id/position map, the (optional) register and the
//! measurement random source. This file covers construction, allocation,
//! deallocation and introspection; gate dispatch, measurement/state transfer
//! and Hamiltonian evaluation live in sibling modules as further `impl`
//! blocks on the same type.

use num_complex::Complex64;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

use qmap_adapter_dense::DenseRegister;
use qmap_engine::RegisterEngine;

use crate::config::SimulatorConfig;
use crate::error::{SimError, SimResult};
use crate::qubit_map::{QubitId, QubitMap};

/// A copy of the map and the full amplitude vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// id → position at the time of the snapshot.
    pub map: BTreeMap<QubitId, usize>,
    /// All amplitudes; basis index bit `k` is the qubit at position `k`.
    pub state: Vec<Complex64>,
}

/// Qubit-mapping layer over a register engine `E`.
///
/// All operations are synchronous and take `&mut self`; one instance must not
/// be shared between threads without external synchronisation.
#[derive(Debug)]
pub struct Simulator<E: RegisterEngine = DenseRegister> {
    pub(crate) config: SimulatorConfig,
    pub(crate) map: QubitMap,
    /// `Some` iff at least one qubit is allocated.
    pub(crate) register: Option<E>,
    pub(crate) rng: StdRng,
}

/// A simulator over the in-memory statevector engine.
pub type DenseSimulator = Simulator<DenseRegister>;

impl<E: RegisterEngine> Simulator<E> {
    /// Create a simulator from a validated configuration.
    pub fn new(config: SimulatorConfig) -> SimResult<Self> {
        config.validate()?;
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self {
            config,
            map: QubitMap::new(),
            register: None,
            rng,
        })
    }

    /// Create a simulator with default settings and the given seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            config: SimulatorConfig::default().with_seed(seed),
            map: QubitMap::new(),
            register: None,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Number of allocated qubits.
    pub fn num_qubits(&self) -> usize {
        self.map.len()
    }

    /// True iff every id in `ids` is allocated.
    pub fn check_ids(&self, ids: &[QubitId]) -> bool {
        self.map.contains_all(ids)
    }

    /// Current position of `id`.
    ///
    /// Positions change on deallocation, state preparation and arithmetic;
    /// re-query after any of those.
    pub fn position(&self, id: QubitId) -> Option<usize> {
        self.map.position(id)
    }

    /// True if no qubit is allocated.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Allocated ids in position order.
    pub fn ids(&self) -> &[QubitId] {
        self.map.ids()
    }

    /// The id currently at `position`.
    pub fn id_at(&self, position: usize) -> Option<QubitId> {
        self.map.id_at(position)
    }

    /// Allocate a qubit in |0⟩ under the caller-chosen `id`.
    #[instrument(skip(self))]
    pub fn allocate_qubit(&mut self, id: QubitId) -> SimResult<()> {
        if self.map.contains(id) {
            return Err(SimError::DuplicateId(id));
        }
        let requested = self.map.len() + 1;
        if requested > self.config.max_qubits {
            return Err(SimError::CapacityExceeded {
                requested,
                max: self.config.max_qubits,
            });
        }

        let base = match self.register.as_mut() {
            Some(reg) => reg.compose(E::with_qubits(1)),
            None => {
                self.register = Some(E::with_qubits(1));
                0
            }
        };
        let position = self.map.insert(id)?;
        debug_assert_eq!(base, position);
        debug!(%id, position, "allocated qubit");
        Ok(())
    }

    /// Release `id`. The qubit must be classical (measured or uncomputed).
    #[instrument(skip(self))]
    pub fn deallocate_qubit(&mut self, id: QubitId) -> SimResult<()> {
        let position = self.map.position(id).ok_or(SimError::UnknownId(id))?;
        let probability = self.engine()?.prob(position);
        if !self.within_tolerance(probability) {
            warn!(%id, probability, "refusing to deallocate non-classical qubit");
            return Err(SimError::NotClassical { id, probability });
        }

        if self.map.len() == 1 {
            self.register = None;
        } else {
            self.engine_mut()?.dispose(position, 1);
        }
        self.map.remove(id)?;
        debug!(%id, position, remaining = self.map.len(), "deallocated qubit");
        Ok(())
    }

    /// True if `id` reads |0⟩ or |1⟩ with probability within tolerance of 1.
    pub fn is_classical(&self, id: QubitId) -> SimResult<bool> {
        let position = self.map.position(id).ok_or(SimError::UnknownId(id))?;
        Ok(self.within_tolerance(self.engine()?.prob(position)))
    }

    /// The value a classical qubit holds (`P(1) ≥ 0.5`).
    pub fn classical_value(&self, id: QubitId) -> SimResult<bool> {
        let position = self.map.position(id).ok_or(SimError::UnknownId(id))?;
        Ok(self.engine()?.prob(position) >= 0.5)
    }

    /// Block until the engine has finished all deferred work.
    pub fn barrier(&mut self) {
        if let Some(reg) = self.register.as_mut() {
            reg.finish();
        }
    }

    /// Copy out the map and full state.
    ///
    /// With no qubits allocated the state is the trivial vector `[0]`.
    pub fn extract(&self) -> Snapshot {
        let state = match &self.register {
            Some(reg) => reg.state(),
            None => vec![Complex64::new(0.0, 0.0)],
        };
        Snapshot {
            map: self.map.to_btree(),
            state,
        }
    }

    pub(crate) fn within_tolerance(&self, probability: f64) -> bool {
        probability < self.config.tolerance || 1.0 - probability < self.config.tolerance
    }

    pub(crate) fn engine(&self) -> SimResult<&E> {
        self.register.as_ref().ok_or(SimError::EmptyRegister)
    }

    pub(crate) fn engine_mut(&mut self) -> SimResult<&mut E> {
        self.register.as_mut().ok_or(SimError::EmptyRegister)
    }
}

impl Default for Simulator<DenseRegister> {
    fn default() -> Self {
        Self::with_seed(SimulatorConfig::default().seed)
    }
}

/// Bit set over positions.
pub(crate) fn mask_of(positions: &[usize]) -> usize {
    positions.iter().fold(0, |m, &p| m | (1 << p))
}

/// Bit set over positions selecting those whose `bits` entry is set.
pub(crate) fn pattern_of(positions: &[usize], bits: &[bool]) -> usize {
    positions
        .iter()
        .zip(bits)
        .filter(|(_, b)| **b)
        .fold(0, |m, (&p, _)| m | (1 << p))
}
