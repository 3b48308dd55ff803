//! Qubit id ↔ register position bookkeeping.
//!
//! Callers name qubits by stable [`QubitId`]s; the register engine addresses
//! them by dense positions `0..n`. [`QubitMap`] keeps both directions in step:
//! a hash map from id to position and a vector indexed by position. Every
//! mutation updates the two together so the inverse is never recomputed.
//!
//! Invariant: the positions in use are exactly `{0, …, len-1}`.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{SimError, SimResult};

/// Caller-assigned identifier of a logical qubit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QubitId(pub u32);

impl fmt::Display for QubitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

impl From<u32> for QubitId {
    fn from(id: u32) -> Self {
        QubitId(id)
    }
}

/// Bijection between live qubit ids and register positions.
#[derive(Debug, Clone, Default)]
pub struct QubitMap {
    /// id → position.
    positions: FxHashMap<QubitId, usize>,
    /// position → id.
    ids: Vec<QubitId>,
}

impl QubitMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mapped qubits.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True if no qubit is mapped.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// True if `id` is mapped.
    pub fn contains(&self, id: QubitId) -> bool {
        self.positions.contains_key(&id)
    }

    /// True iff every id in `ids` is mapped.
    pub fn contains_all(&self, ids: &[QubitId]) -> bool {
        ids.iter().all(|id| self.contains(*id))
    }

    /// Position of `id`, if mapped.
    pub fn position(&self, id: QubitId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    /// Id stored at `position`, if in range.
    pub fn id_at(&self, position: usize) -> Option<QubitId> {
        self.ids.get(position).copied()
    }

    /// Ids in position order.
    pub fn ids(&self) -> &[QubitId] {
        &self.ids
    }

    /// Resolve a list of ids to positions, failing on the first unknown id.
    pub fn resolve(&self, ids: &[QubitId]) -> SimResult<Vec<usize>> {
        ids.iter()
            .map(|&id| self.position(id).ok_or(SimError::UnknownId(id)))
            .collect()
    }

    /// True iff `ids` names every mapped qubit exactly once.
    pub fn is_permutation(&self, ids: &[QubitId]) -> bool {
        if ids.len() != self.ids.len() {
            return false;
        }
        let mut seen = vec![false; self.ids.len()];
        for id in ids {
            match self.position(*id) {
                Some(p) if !seen[p] => seen[p] = true,
                _ => return false,
            }
        }
        true
    }

    /// Map `id` to the next free position and return it.
    pub fn insert(&mut self, id: QubitId) -> SimResult<usize> {
        if self.contains(id) {
            return Err(SimError::DuplicateId(id));
        }
        let position = self.ids.len();
        self.ids.push(id);
        self.positions.insert(id, position);
        self.debug_check();
        Ok(position)
    }

    /// Unmap `id`, shifting every higher position down by one.
    ///
    /// Returns the position `id` occupied.
    pub fn remove(&mut self, id: QubitId) -> SimResult<usize> {
        let position = self.positions.remove(&id).ok_or(SimError::UnknownId(id))?;
        self.ids.remove(position);
        for (p, moved) in self.ids.iter().enumerate().skip(position) {
            self.positions.insert(*moved, p);
        }
        self.debug_check();
        Ok(position)
    }

    /// Exchange the ids stored at two positions.
    pub fn swap_positions(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.ids.swap(a, b);
        self.positions.insert(self.ids[a], a);
        self.positions.insert(self.ids[b], b);
        self.debug_check();
    }

    /// Renumber so that `order[k]` sits at position `k`.
    ///
    /// `order` must be a permutation of the mapped ids.
    pub fn reorder(&mut self, order: &[QubitId]) -> SimResult<()> {
        if !self.is_permutation(order) {
            return Err(SimError::InvalidPermutation(
                "ordering must name every allocated qubit exactly once".into(),
            ));
        }
        self.ids.clear();
        self.ids.extend_from_slice(order);
        for (p, id) in order.iter().enumerate() {
            self.positions.insert(*id, p);
        }
        self.debug_check();
        Ok(())
    }

    /// Ordered copy of the id → position map.
    pub fn to_btree(&self) -> BTreeMap<QubitId, usize> {
        self.positions.iter().map(|(id, p)| (*id, *p)).collect()
    }

    /// Both directions agree and positions are dense.
    pub fn is_consistent(&self) -> bool {
        self.positions.len() == self.ids.len()
            && self
                .ids
                .iter()
                .enumerate()
                .all(|(p, id)| self.positions.get(id) == Some(&p))
    }

    #[inline]
    fn debug_check(&self) {
        debug_assert!(self.is_consistent(), "qubit map out of sync: {self:?}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(id: u32) -> QubitId {
        QubitId(id)
    }

    #[test]
    fn test_insert_appends() {
        let mut map = QubitMap::new();
        assert_eq!(map.insert(q(7)).unwrap(), 0);
        assert_eq!(map.insert(q(3)).unwrap(), 1);
        assert_eq!(map.position(q(3)), Some(1));
        assert_eq!(map.id_at(0), Some(q(7)));
    }

    #[test]
    fn test_insert_duplicate() {
        let mut map = QubitMap::new();
        map.insert(q(1)).unwrap();
        assert!(matches!(map.insert(q(1)), Err(SimError::DuplicateId(id)) if id == q(1)));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_remove_compacts() {
        let mut map = QubitMap::new();
        for id in [10, 11, 12, 13] {
            map.insert(q(id)).unwrap();
        }
        assert_eq!(map.remove(q(11)).unwrap(), 1);
        assert_eq!(map.ids(), &[q(10), q(12), q(13)]);
        assert_eq!(map.position(q(12)), Some(1));
        assert_eq!(map.position(q(13)), Some(2));
        assert!(map.is_consistent());
    }

    #[test]
    fn test_remove_unknown() {
        let mut map = QubitMap::new();
        assert!(matches!(map.remove(q(4)), Err(SimError::UnknownId(_))));
    }

    #[test]
    fn test_swap_positions() {
        let mut map = QubitMap::new();
        for id in [0, 1, 2] {
            map.insert(q(id)).unwrap();
        }
        map.swap_positions(0, 2);
        assert_eq!(map.position(q(0)), Some(2));
        assert_eq!(map.position(q(2)), Some(0));
        assert_eq!(map.id_at(1), Some(q(1)));
    }

    #[test]
    fn test_reorder() {
        let mut map = QubitMap::new();
        for id in [5, 6, 7] {
            map.insert(q(id)).unwrap();
        }
        map.reorder(&[q(7), q(5), q(6)]).unwrap();
        assert_eq!(map.ids(), &[q(7), q(5), q(6)]);

        assert!(map.reorder(&[q(7), q(7), q(6)]).is_err());
        assert!(map.reorder(&[q(7), q(5)]).is_err());
        // failed reorder leaves the map untouched
        assert_eq!(map.ids(), &[q(7), q(5), q(6)]);
    }

    #[test]
    fn test_resolve_reports_unknown() {
        let mut map = QubitMap::new();
        map.insert(q(0)).unwrap();
        assert_eq!(map.resolve(&[q(0)]).unwrap(), vec![0]);
        assert!(matches!(
            map.resolve(&[q(0), q(9)]),
            Err(SimError::UnknownId(id)) if id == q(9)
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(q(12).to_string(), "q12");
    }
}
