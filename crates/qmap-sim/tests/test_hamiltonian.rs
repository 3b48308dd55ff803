//! Tests for Pauli-sum evolution, operator application and expectation values.

use num_complex::Complex64;
use qmap_engine::Matrix2;
use qmap_sim::{ComplexTermsDict, DenseSimulator, Pauli, PauliTerm, QubitId, TermsDict};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("qmap_sim=debug")
        .with_test_writer()
        .try_init();
}

fn q(id: u32) -> QubitId {
    QubitId(id)
}

fn bell(a: QubitId, b: QubitId) -> DenseSimulator {
    let mut sim = DenseSimulator::with_seed(17);
    sim.allocate_qubit(a).unwrap();
    sim.allocate_qubit(b).unwrap();
    sim.apply_controlled_gate(&Matrix2::hadamard(), &[a], &[])
        .unwrap();
    sim.apply_controlled_gate(&Matrix2::pauli_x(), &[b], &[a])
        .unwrap();
    sim
}

fn single(term: &str, coeff: f64) -> TermsDict {
    TermsDict::from_terms(vec![(PauliTerm::parse(term).unwrap(), coeff)])
}

// ---------------------------------------------------------------------------
// Expectation values
// ---------------------------------------------------------------------------

#[test]
fn bell_marginals_read_zero() {
    init_tracing();
    let sim = bell(q(4), q(8));
    let ids = [q(4), q(8)];

    for term in ["Z0 Z1", "X0 X1", "Y0 Y1", "Z0"] {
        let e = sim.expectation_value(&single(term, 1.0), &ids).unwrap();
        assert!(e.abs() < 1e-12, "{term} = {e}");
    }
}

#[test]
fn bell_parity_correlations() {
    let sim = bell(q(4), q(8));
    let ids = [q(4), q(8)];

    let zz = sim.parity_expectation_value(&single("Z0 Z1", 1.0), &ids).unwrap();
    let xx = sim.parity_expectation_value(&single("X0 X1", 1.0), &ids).unwrap();
    let yy = sim.parity_expectation_value(&single("Y0 Y1", 1.0), &ids).unwrap();
    let z0 = sim.parity_expectation_value(&single("Z0", 1.0), &ids).unwrap();

    assert!((zz - 1.0).abs() < 1e-12, "ZZ = {zz}");
    assert!((xx - 1.0).abs() < 1e-12, "XX = {xx}");
    assert!((yy + 1.0).abs() < 1e-12, "YY = {yy}");
    assert!(z0.abs() < 1e-12, "Z = {z0}");
}

#[test]
fn weighted_sum_with_identity() {
    let sim = bell(q(0), q(1));
    let obs = TermsDict::from_terms(vec![
        (PauliTerm::identity(), 0.25),
        (PauliTerm::parse("Z0 Z1").unwrap(), -2.0),
        (PauliTerm::parse("X1").unwrap(), 3.0),
    ]);
    let e = sim.expectation_value(&obs, &[q(0), q(1)]).unwrap();
    assert!((e - 0.25).abs() < 1e-12, "{e}");
    let exact = sim.parity_expectation_value(&obs, &[q(0), q(1)]).unwrap();
    assert!((exact - (0.25 - 2.0)).abs() < 1e-12, "{exact}");
}

#[test]
fn product_state_readings_multiply() {
    let mut sim = DenseSimulator::with_seed(3);
    for id in [0, 1] {
        sim.allocate_qubit(q(id)).unwrap();
    }
    // q0 = |1⟩, q1 = |+⟩
    sim.apply_controlled_gate(&Matrix2::pauli_x(), &[q(0)], &[])
        .unwrap();
    sim.apply_controlled_gate(&Matrix2::hadamard(), &[q(1)], &[])
        .unwrap();
    let ids = [q(0), q(1)];

    let zx = sim.expectation_value(&single("Z0 X1", 0.5), &ids).unwrap();
    assert!((zx + 0.5).abs() < 1e-12, "{zx}");
    let negated = sim.expectation_value(&single("Z0 X1", -0.5), &ids).unwrap();
    assert!((negated + 0.5).abs() < 1e-12, "{negated}");
}

#[test]
fn local_indices_follow_id_list() {
    let mut sim = DenseSimulator::with_seed(3);
    for id in [0, 1] {
        sim.allocate_qubit(q(id)).unwrap();
    }
    sim.apply_controlled_gate(&Matrix2::pauli_x(), &[q(1)], &[])
        .unwrap();
    let obs = single("Z0", 1.0);
    let e0 = sim.expectation_value(&obs, &[q(0)]).unwrap();
    let e1 = sim.expectation_value(&obs, &[q(1)]).unwrap();
    assert!((e0 - 1.0).abs() < 1e-12);
    assert!((e1 + 1.0).abs() < 1e-12);
}

#[test]
fn expectation_with_only_identity_needs_no_qubits() {
    let sim = DenseSimulator::default();
    let obs = TermsDict::from_terms(vec![(PauliTerm::identity(), 0.75)]);
    assert_eq!(sim.expectation_value(&obs, &[]).unwrap(), 0.75);

    let heavy = TermsDict::from_terms(vec![(PauliTerm::identity(), 1.5)]);
    assert_eq!(sim.expectation_value(&heavy, &[]).unwrap(), 1.0);
    assert_eq!(sim.parity_expectation_value(&heavy, &[]).unwrap(), 1.5);
}

// ---------------------------------------------------------------------------
// Time evolution
// ---------------------------------------------------------------------------

#[test]
fn terms_on_same_qubit_accumulate() {
    let mut sim = DenseSimulator::with_seed(1);
    sim.allocate_qubit(q(0)).unwrap();
    sim.apply_controlled_gate(&Matrix2::hadamard(), &[q(0)], &[])
        .unwrap();

    // 1·Z + 1·Z = 2·Z; exp(-i·2Z·π/4) sends |+⟩ to |−⟩ up to phase
    let h = TermsDict::from_terms(vec![
        (PauliTerm::single(0, Pauli::Z), 1.0),
        (PauliTerm::single(0, Pauli::Z), 1.0),
    ]);
    sim.time_evolve(&h, FRAC_PI_4, &[q(0)], &[]).unwrap();

    let x = sim.expectation_value(&single("X0", 1.0), &[q(0)]).unwrap();
    assert!((x + 1.0).abs() < 1e-12, "{x}");
}

#[test]
fn controlled_evolution() {
    let mut sim = DenseSimulator::with_seed(1);
    for id in [0, 1] {
        sim.allocate_qubit(q(id)).unwrap();
    }
    let h = single("X0", 1.0);

    sim.time_evolve(&h, FRAC_PI_2, &[q(0)], &[q(1)]).unwrap();
    assert!(!sim.classical_value(q(0)).unwrap());

    sim.apply_controlled_gate(&Matrix2::pauli_x(), &[q(1)], &[])
        .unwrap();
    sim.time_evolve(&h, FRAC_PI_2, &[q(0)], &[q(1)]).unwrap();
    assert!(sim.is_classical(q(0)).unwrap());
    assert!(sim.classical_value(q(0)).unwrap());
}

#[test]
fn evolution_by_zero_time_is_identity() {
    let mut sim = bell(q(0), q(1));
    let before = sim.extract();
    let h = TermsDict::from_terms(vec![
        (PauliTerm::parse("X0").unwrap(), 0.3),
        (PauliTerm::parse("Y1").unwrap(), -1.2),
    ]);
    sim.time_evolve(&h, 0.0, &[q(0), q(1)], &[]).unwrap();
    let after = sim.extract();
    for (a, b) in before.state.iter().zip(&after.state) {
        assert!((a - b).norm() < 1e-12);
    }
}

// ---------------------------------------------------------------------------
// Operator application
// ---------------------------------------------------------------------------

#[test]
fn apply_operator_folds_complex_coefficient() {
    let mut sim = DenseSimulator::with_seed(1);
    sim.allocate_qubit(q(0)).unwrap();
    let op = ComplexTermsDict::from_terms(vec![(
        PauliTerm::single(0, Pauli::X),
        Complex64::new(0.0, 1.0),
    )]);
    sim.apply_operator(&op, &[q(0)]).unwrap();
    let amp = sim.get_amplitude(&[true], &[q(0)]).unwrap();
    assert!((amp - Complex64::new(0.0, 1.0)).norm() < 1e-12);
}

#[test]
fn apply_operator_multi_factor_term() {
    let mut sim = DenseSimulator::with_seed(1);
    for id in [0, 1, 2] {
        sim.allocate_qubit(q(id)).unwrap();
    }
    let op = ComplexTermsDict::from_terms(vec![(
        PauliTerm::parse("X0 X2").unwrap(),
        Complex64::new(1.0, 0.0),
    )]);
    // local indices 0 and 2 are q2 and q1
    sim.apply_operator(&op, &[q(2), q(0), q(1)]).unwrap();
    assert!(sim.classical_value(q(2)).unwrap());
    assert!(sim.classical_value(q(1)).unwrap());
    assert!(!sim.classical_value(q(0)).unwrap());
}

#[test]
fn apply_identity_term_is_global_factor() {
    let mut sim = DenseSimulator::with_seed(1);
    sim.allocate_qubit(q(0)).unwrap();
    let op = ComplexTermsDict::from_terms(vec![(PauliTerm::identity(), Complex64::new(-1.0, 0.0))]);
    sim.apply_operator(&op, &[]).unwrap();
    let amp = sim.get_amplitude(&[false], &[q(0)]).unwrap();
    assert!((amp + Complex64::new(1.0, 0.0)).norm() < 1e-12);
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

#[test]
fn terms_dict_json_shape() {
    let obs = single("X0 Z3", 0.5);
    let json = serde_json::to_value(&obs).unwrap();
    assert_eq!(json["terms"][0][1], 0.5);
    assert_eq!(json["terms"][0][0]["ops"][1], serde_json::json!([3, "Z"]));
}
