//! Property-based tests for text round-trips.
//!
//! `parse(serialize(c)) == c` for every circuit the dialect can express, and
//! serializing is stable once text is canonical.

use dqpu_ir::{Circuit, ClbitId, GateId, ParameterExpression, QubitId};
use dqpu_qasm::{parse, serialize};
use proptest::prelude::*;

/// Gate operations that can be applied to a circuit.
#[derive(Debug, Clone)]
enum GateOp {
    Fixed1(GateId, u32),
    Param1(GateId, ParameterExpression, u32),
    Fixed2(GateId, u32, u32),
    Param2(GateId, ParameterExpression, u32, u32),
}

impl GateOp {
    fn apply(self, circuit: &mut Circuit) {
        let _ = match self {
            GateOp::Fixed1(g, q) => circuit.apply(g, &[QubitId(q)]),
            GateOp::Param1(g, p, q) => circuit.apply_parametrized(g, p, &[QubitId(q)]),
            GateOp::Fixed2(g, a, b) => circuit.apply(g, &[QubitId(a), QubitId(b)]),
            GateOp::Param2(g, p, a, b) => circuit.apply_parametrized(g, p, &[QubitId(a), QubitId(b)]),
        };
    }
}

/// Non-negative parameter expressions over small literals and `pi`.
fn arb_param() -> impl Strategy<Value = ParameterExpression> {
    let leaf = prop_oneof![
        Just(ParameterExpression::pi()),
        (0_u32..64).prop_map(|v| ParameterExpression::constant(f64::from(v))),
        (1_u32..1000).prop_map(|v| ParameterExpression::constant(f64::from(v) / 8.0)),
    ];
    leaf.prop_recursive(3, 12, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a + b),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a - b),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a * b),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a / b),
            inner.prop_map(|a| -a),
        ]
    })
}

fn arb_gate_op(num_qubits: u32) -> BoxedStrategy<GateOp> {
    let single = prop_oneof![
        (
            prop::sample::select(vec![
                GateId::I,
                GateId::X,
                GateId::Y,
                GateId::Z,
                GateId::S,
                GateId::T,
                GateId::H,
            ]),
            0..num_qubits
        )
            .prop_map(|(g, q)| GateOp::Fixed1(g, q)),
        (
            prop::sample::select(vec![GateId::P, GateId::RX, GateId::RY, GateId::RZ, GateId::R]),
            arb_param(),
            0..num_qubits
        )
            .prop_map(|(g, p, q)| GateOp::Param1(g, p, q)),
    ];
    if num_qubits < 2 {
        return single.boxed();
    }
    let pair = (0..num_qubits, 1..num_qubits).prop_map(move |(a, off)| (a, (a + off) % num_qubits));
    prop_oneof![
        2 => single,
        1 => (
            prop::sample::select(vec![GateId::CX, GateId::CZ, GateId::SWAP]),
            pair.clone()
        )
            .prop_map(|(g, (a, b))| GateOp::Fixed2(g, a, b)),
        1 => (
            prop::sample::select(vec![GateId::CP, GateId::CR]),
            arb_param(),
            pair
        )
            .prop_map(|(g, p, (a, b))| GateOp::Param2(g, p, a, b)),
    ]
    .boxed()
}

/// Measurement tail: none, full `measure q -> c`, or an arbitrary list.
#[derive(Debug, Clone)]
enum Tail {
    None,
    All,
    Partial(Vec<(u32, u32)>),
}

fn arb_circuit() -> impl Strategy<Value = Circuit> {
    (1_u32..=5).prop_flat_map(|num_qubits| {
        (
            Just(num_qubits),
            0..=num_qubits,
            prop::collection::vec(arb_gate_op(num_qubits), 0..=12),
            prop_oneof![
                Just(Tail::None),
                Just(Tail::All),
                prop::collection::vec((0..num_qubits, 0..num_qubits), 1..4).prop_map(Tail::Partial),
            ],
        )
            .prop_map(|(nq, nc, ops, tail)| {
                let mut circuit = Circuit::new(nq, nc);
                for op in ops {
                    op.apply(&mut circuit);
                }
                match tail {
                    Tail::None => {}
                    Tail::All => {
                        let _ = circuit.measure_all();
                    }
                    Tail::Partial(pairs) => {
                        for (q, c) in pairs {
                            let _ = circuit.measure(QubitId(q), ClbitId(c));
                        }
                    }
                }
                circuit
            })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_parse_inverts_serialize(circuit in arb_circuit()) {
        let text = serialize(&circuit);
        let parsed = parse(&text).map_err(|e| TestCaseError::fail(format!("{e}\n{text}")))?;
        prop_assert_eq!(parsed, circuit);
    }

    #[test]
    fn prop_serialize_is_stable(circuit in arb_circuit()) {
        let text = serialize(&circuit);
        let again = serialize(&parse(&text).unwrap());
        prop_assert_eq!(again, text);
    }
}

#[test]
fn test_scenario_text() {
    let text = "OPENQASM 2.0;\ninclude \"qelib1.inc\";\nqreg q[2];\ncreg c[2];\nh q[0];\ncx q[0], q[1];\nmeasure q -> c;";
    let circuit = parse(text).unwrap();
    assert_eq!(circuit.num_qubits(), 2);
    assert_eq!(serialize(&circuit), text);
}
