//! Statevector simulation engine.

use ndarray::{Array1, ArrayView2};
use num_complex::Complex64;
use rand::Rng;
use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;

use dqpu_hal::{HalError, HalResult};
use dqpu_ir::Operation;

/// Amplitudes of an `n`-qubit state. Basis index bit `i` is qubit `i`.
pub struct Statevector {
    amplitudes: Vec<Complex64>,
    num_qubits: usize,
}

impl Statevector {
    /// Create a new statevector initialized to |0...0⟩.
    pub fn new(num_qubits: usize) -> Self {
        let size = 1 << num_qubits;
        let mut amplitudes = vec![Complex64::new(0.0, 0.0); size];
        amplitudes[0] = Complex64::new(1.0, 0.0);
        Self {
            amplitudes,
            num_qubits,
        }
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Apply a gate operation. Measurements leave the state untouched; they
    /// are resolved when sampling.
    pub fn apply(&mut self, op: &Operation) -> HalResult<()> {
        let Some(matrix) = op.matrix()? else {
            return Ok(());
        };
        match op.qubits() {
            [q] => self.apply_single(q.index(), matrix.view()),
            [a, b] => self.apply_pair(a.index(), b.index(), matrix.view()),
            other => {
                return Err(HalError::InvalidCircuit(format!(
                    "unsupported gate arity {}",
                    other.len()
                )));
            }
        }
        Ok(())
    }

    fn apply_single(&mut self, qubit: usize, m: ArrayView2<'_, Complex64>) {
        let mask = 1 << qubit;
        for i in 0..self.amplitudes.len() {
            if i & mask == 0 {
                let j = i | mask;
                let (a, b) = (self.amplitudes[i], self.amplitudes[j]);
                self.amplitudes[i] = m[[0, 0]] * a + m[[0, 1]] * b;
                self.amplitudes[j] = m[[1, 0]] * a + m[[1, 1]] * b;
            }
        }
    }

    /// Apply a 4×4 unitary with basis index `2·b(first) + b(second)`.
    fn apply_pair(&mut self, first: usize, second: usize, m: ArrayView2<'_, Complex64>) {
        let (m0, m1) = (1 << first, 1 << second);
        for base in 0..self.amplitudes.len() {
            if base & (m0 | m1) != 0 {
                continue;
            }
            let idx = [base, base | m1, base | m0, base | m0 | m1];
            let v = Array1::from_iter(idx.iter().map(|&i| self.amplitudes[i]));
            let out = m.dot(&v);
            for (k, &i) in idx.iter().enumerate() {
                self.amplitudes[i] = out[k];
            }
        }
    }

    /// Probability of each basis state.
    pub fn probabilities(&self) -> Vec<f64> {
        self.amplitudes.iter().map(Complex64::norm_sqr).collect()
    }

    /// Draw `shots` basis states.
    pub fn sample<R: Rng + ?Sized>(&self, shots: u64, rng: &mut R) -> HalResult<Vec<usize>> {
        let dist = WeightedIndex::new(self.probabilities())
            .map_err(|e| HalError::SamplingFailed(e.to_string()))?;
        Ok((0..shots).map(|_| dist.sample(rng)).collect())
    }

    /// Amplitude of a basis state.
    #[cfg(test)]
    pub(crate) fn amplitude(&self, index: usize) -> Complex64 {
        self.amplitudes[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dqpu_ir::{GateId, ParameterExpression, QubitId};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn approx_eq(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < 1e-10
    }

    fn gate(id: GateId, qubits: &[u32]) -> Operation {
        Operation::gate(id, qubits.iter().map(|&q| QubitId(q)))
    }

    #[test]
    fn test_initial_state() {
        let sv = Statevector::new(2);
        assert!(approx_eq(sv.amplitude(0), Complex64::new(1.0, 0.0)));
        assert!((1..4).all(|i| approx_eq(sv.amplitude(i), Complex64::new(0.0, 0.0))));
    }

    #[test]
    fn test_bell_state() {
        let mut sv = Statevector::new(2);
        sv.apply(&gate(GateId::H, &[0])).unwrap();
        sv.apply(&gate(GateId::CX, &[0, 1])).unwrap();

        let h = 1.0 / 2.0_f64.sqrt();
        assert!(approx_eq(sv.amplitude(0), Complex64::new(h, 0.0)));
        assert!(approx_eq(sv.amplitude(1), Complex64::new(0.0, 0.0)));
        assert!(approx_eq(sv.amplitude(2), Complex64::new(0.0, 0.0)));
        assert!(approx_eq(sv.amplitude(3), Complex64::new(h, 0.0)));
    }

    #[test]
    fn test_cx_control_is_first_operand() {
        let mut sv = Statevector::new(2);
        sv.apply(&gate(GateId::X, &[1])).unwrap();
        sv.apply(&gate(GateId::CX, &[1, 0])).unwrap();
        // qubits 0 and 1 both set
        assert!(approx_eq(sv.amplitude(3), Complex64::new(1.0, 0.0)));
    }

    #[test]
    fn test_swap() {
        let mut sv = Statevector::new(3);
        sv.apply(&gate(GateId::X, &[0])).unwrap();
        sv.apply(&gate(GateId::SWAP, &[0, 2])).unwrap();
        assert!(approx_eq(sv.amplitude(0b100), Complex64::new(1.0, 0.0)));
    }

    #[test]
    fn test_parametrized_rx_pi_flips() {
        let mut sv = Statevector::new(1);
        let op = Operation::parametrized(GateId::RX, ParameterExpression::pi(), [QubitId(0)]);
        sv.apply(&op).unwrap();
        assert!((sv.probabilities()[1] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_sample_deterministic() {
        let mut sv = Statevector::new(1);
        sv.apply(&gate(GateId::X, &[0])).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        assert!(sv.sample(100, &mut rng).unwrap().iter().all(|&o| o == 1));
    }
}
