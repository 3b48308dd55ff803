//! Weighted Pauli-string structures.
//!
//! A [`TermsDict`] is a sum of weighted Pauli strings:
//!
//!   O = Σ_k  c_k · P_k
//!
//! where each P_k is a tensor product of single-qubit Pauli operators. Qubits
//! inside a [`PauliTerm`] are named by *local indices* into an id list that is
//! supplied alongside the terms, so one observable can be evaluated on
//! different qubits without rebuilding it.
//!
//! # Example
//!
//! ```rust
//! use qmap_sim::terms::{Pauli, PauliTerm, TermsDict};
//!
//! // O = -1.0·Z₀Z₁  +  0.5·X₀
//! let obs = TermsDict::from_terms(vec![
//!     (PauliTerm::from_ops([(0, Pauli::Z), (1, Pauli::Z)]), -1.0),
//!     (PauliTerm::single(0, Pauli::X), 0.5),
//! ]);
//! assert_eq!(obs.len(), 2);
//! assert_eq!(obs.width(), 2);
//! ```

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_1_SQRT_2;

use crate::error::{SimError, SimResult};
use qmap_engine::Matrix2;

/// Single-qubit Pauli operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pauli {
    /// Pauli-X.
    X,
    /// Pauli-Y.
    Y,
    /// Pauli-Z.
    Z,
}

impl Pauli {
    /// The operator as a matrix.
    pub fn matrix(self) -> Matrix2 {
        match self {
            Pauli::X => Matrix2::pauli_x(),
            Pauli::Y => Matrix2::pauli_y(),
            Pauli::Z => Matrix2::pauli_z(),
        }
    }

    /// A unitary taking the +1/−1 eigenvectors of this operator to |0⟩/|1⟩,
    /// or `None` if the operator is already diagonal.
    pub fn diagonalizer(self) -> Option<Matrix2> {
        let r = Complex64::new(FRAC_1_SQRT_2, 0.0);
        let ri = Complex64::new(0.0, FRAC_1_SQRT_2);
        match self {
            Pauli::X => Some(Matrix2::hadamard()),
            Pauli::Y => Some(Matrix2::new(r, -ri, r, ri)),
            Pauli::Z => None,
        }
    }
}

impl TryFrom<char> for Pauli {
    type Error = SimError;

    fn try_from(symbol: char) -> Result<Self, Self::Error> {
        match symbol {
            'X' | 'x' => Ok(Pauli::X),
            'Y' | 'y' => Ok(Pauli::Y),
            'Z' | 'z' => Ok(Pauli::Z),
            other => Err(SimError::InvalidArgument(format!(
                "'{other}' is not a Pauli symbol (expected X, Y or Z)"
            ))),
        }
    }
}

/// A tensor product of Pauli operators on local qubit indices.
///
/// Factors are kept in the order given. An empty term is the identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauliTerm {
    ops: Vec<(usize, Pauli)>,
}

impl PauliTerm {
    /// Construct a term from `(local_index, Pauli)` pairs.
    pub fn from_ops(ops: impl IntoIterator<Item = (usize, Pauli)>) -> Self {
        Self {
            ops: ops.into_iter().collect(),
        }
    }

    /// A single-factor term.
    pub fn single(index: usize, pauli: Pauli) -> Self {
        Self {
            ops: vec![(index, pauli)],
        }
    }

    /// The identity term.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Parse a term like `"X0 Y2 Z5"`.
    pub fn parse(text: &str) -> SimResult<Self> {
        text.split_whitespace()
            .map(|factor| {
                let mut chars = factor.chars();
                let symbol = chars.next().ok_or_else(|| {
                    SimError::InvalidArgument("empty Pauli factor".into())
                })?;
                let pauli = Pauli::try_from(symbol)?;
                let index = chars.as_str().parse::<usize>().map_err(|_| {
                    SimError::InvalidArgument(format!("bad qubit index in factor '{factor}'"))
                })?;
                Ok((index, pauli))
            })
            .collect::<SimResult<Vec<_>>>()
            .map(Self::from_ops)
    }

    /// The `(local_index, Pauli)` factors.
    pub fn ops(&self) -> &[(usize, Pauli)] {
        &self.ops
    }

    /// True if the term has no factors.
    pub fn is_identity(&self) -> bool {
        self.ops.is_empty()
    }

    /// The highest local index referenced, or `None` for the identity.
    pub fn max_index(&self) -> Option<usize> {
        self.ops.iter().map(|(i, _)| *i).max()
    }

    /// True if some local index appears in more than one factor.
    pub fn has_repeated_index(&self) -> bool {
        self.ops
            .iter()
            .enumerate()
            .any(|(k, (i, _))| self.ops[..k].iter().any(|(j, _)| j == i))
    }
}

/// A weighted sum of Pauli terms with coefficients of type `C`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TermsDict<C = f64> {
    terms: Vec<(PauliTerm, C)>,
}

/// A [`TermsDict`] with complex coefficients.
pub type ComplexTermsDict = TermsDict<Complex64>;

impl<C> TermsDict<C> {
    /// Create from a list of `(term, coefficient)` pairs.
    pub fn from_terms(terms: Vec<(PauliTerm, C)>) -> Self {
        Self { terms }
    }

    /// Append a term.
    #[must_use]
    pub fn with_term(mut self, term: PauliTerm, coeff: C) -> Self {
        self.terms.push((term, coeff));
        self
    }

    /// All terms.
    pub fn terms(&self) -> &[(PauliTerm, C)] {
        &self.terms
    }

    /// Number of terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// True if there are no terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// The number of local indices the terms need: highest index + 1.
    pub fn width(&self) -> usize {
        self.terms
            .iter()
            .filter_map(|(t, _)| t.max_index())
            .max()
            .map_or(0, |i| i + 1)
    }

    /// Fail unless every local index is below `available`.
    pub fn check_width(&self, available: usize) -> SimResult<()> {
        let width = self.width();
        if width > available {
            return Err(SimError::InvalidArgument(format!(
                "terms reference local index {} but only {available} qubit ids were given",
                width - 1
            )));
        }
        Ok(())
    }
}

impl<C> FromIterator<(PauliTerm, C)> for TermsDict<C> {
    fn from_iter<T: IntoIterator<Item = (PauliTerm, C)>>(iter: T) -> Self {
        Self {
            terms: iter.into_iter().collect(),
        }
    }
}
