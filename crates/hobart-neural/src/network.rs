//! Fully connected sigmoid network
//!
//! Each layer is stored as a single `(outputs, inputs + 1)` matrix whose last
//! column holds the bias weights, i.e. the bias is the weight of a synthetic
//! input that is always `1.0`.
//!
//! Training is plain per-sample gradient descent on squared error:
//!
//! - output delta: `o * (1 - o) * (t - o)`
//! - hidden delta: `o * (1 - o) * sum_k(w_kj * delta_k)`
//! - update: `w += rate * delta * upstream_output`

use crate::{NetworkError, Result};
use ndarray::{Array1, Array2, Axis, s};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Initial weights are drawn uniformly from `[-WEIGHT_INIT_RANGE, WEIGHT_INIT_RANGE)`
const WEIGHT_INIT_RANGE: f64 = 0.5;

/// One fully connected layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Layer {
    /// Shape `(outputs, inputs + 1)`, bias in the last column
    weights: Array2<f64>,
}

impl Layer {
    fn random<R: Rng>(inputs: usize, outputs: usize, rng: &mut R) -> Self {
        let weights = Array2::from_shape_fn((outputs, inputs + 1), |_| {
            rng.gen_range(-WEIGHT_INIT_RANGE..WEIGHT_INIT_RANGE)
        });
        Self { weights }
    }

    fn inputs(&self) -> usize {
        self.weights.ncols() - 1
    }

    fn outputs(&self) -> usize {
        self.weights.nrows()
    }

    fn activate(&self, input: &Array1<f64>) -> Array1<f64> {
        let n = self.inputs();
        let net = self.weights.slice(s![.., ..n]).dot(input) + self.weights.column(n);
        net.mapv_into(sigmoid)
    }
}

/// A feed-forward network with sigmoid activations at every node.
///
/// The topology `[inputs, hidden.., outputs]` is fixed at construction.
///
/// # Example
///
/// ```
/// use hobart_neural::NeuralNetwork;
///
/// let mut net = NeuralNetwork::with_seed(&[2, 3, 1], 42).unwrap();
/// let before = net.squared_error(&[0.2, 0.9], &[0.8]).unwrap();
/// net.backpropagate(&[0.2, 0.9], &[0.8], 0.5).unwrap();
/// let after = net.squared_error(&[0.2, 0.9], &[0.8]).unwrap();
/// assert!(after < before);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuralNetwork {
    layers: Vec<Layer>,
}

impl NeuralNetwork {
    /// Create a network with weights drawn from OS entropy.
    ///
    /// # Errors
    /// Returns [`NetworkError::InvalidTopology`] when fewer than two layer
    /// sizes are given or any layer is empty.
    pub fn new(topology: &[usize]) -> Result<Self> {
        Self::with_rng(topology, &mut StdRng::from_entropy())
    }

    /// Create a network with reproducible weights.
    pub fn with_seed(topology: &[usize], seed: u64) -> Result<Self> {
        Self::with_rng(topology, &mut StdRng::seed_from_u64(seed))
    }

    /// Create a network drawing its initial weights from `rng`.
    pub fn with_rng<R: Rng>(topology: &[usize], rng: &mut R) -> Result<Self> {
        if topology.len() < 2 {
            return Err(NetworkError::InvalidTopology(format!(
                "need at least an input and an output layer, got {} layer(s)",
                topology.len()
            )));
        }
        if let Some(position) = topology.iter().position(|&n| n == 0) {
            return Err(NetworkError::InvalidTopology(format!(
                "layer {position} has no nodes"
            )));
        }

        let layers = topology
            .windows(2)
            .map(|pair| Layer::random(pair[0], pair[1], rng))
            .collect();

        Ok(Self { layers })
    }

    /// Number of inputs the network expects
    pub fn inputs(&self) -> usize {
        self.layers[0].inputs()
    }

    /// Number of outputs the network produces
    pub fn outputs(&self) -> usize {
        self.layers[self.layers.len() - 1].outputs()
    }

    /// Node count of every layer, input layer first
    pub fn topology(&self) -> Vec<usize> {
        std::iter::once(self.inputs())
            .chain(self.layers.iter().map(Layer::outputs))
            .collect()
    }

    /// Run a forward pass and return the output layer activations.
    ///
    /// # Errors
    /// Returns [`NetworkError::DimensionMismatch`] when `input` does not
    /// match the input layer.
    pub fn execute(&self, input: &[f64]) -> Result<Vec<f64>> {
        self.check_input(input)?;

        let output = self
            .layers
            .iter()
            .fold(Array1::from_vec(input.to_vec()), |signal, layer| {
                layer.activate(&signal)
            });

        Ok(output.to_vec())
    }

    /// Half the summed squared difference between the output and `target`
    pub fn squared_error(&self, input: &[f64], target: &[f64]) -> Result<f64> {
        self.check_target(target)?;
        let output = self.execute(input)?;
        Ok(0.5
            * output
                .iter()
                .zip(target)
                .map(|(o, t)| (t - o).powi(2))
                .sum::<f64>())
    }

    /// Perform one gradient step towards `target` for a single sample.
    ///
    /// All deltas are computed from the current weights before any weight
    /// is changed; on error the network is left untouched.
    ///
    /// # Errors
    /// Returns [`NetworkError::DimensionMismatch`] when `input` or `target`
    /// does not match the topology.
    pub fn backpropagate(&mut self, input: &[f64], target: &[f64], rate: f64) -> Result<()> {
        self.check_input(input)?;
        self.check_target(target)?;

        // activations[0] is the input, activations[i + 1] the output of layer i
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(Array1::from_vec(input.to_vec()));
        for layer in &self.layers {
            let next = layer.activate(&activations[activations.len() - 1]);
            activations.push(next);
        }

        let depth = self.layers.len();
        let mut deltas = vec![Array1::<f64>::zeros(0); depth];

        let output = &activations[depth];
        let target = Array1::from_vec(target.to_vec());
        deltas[depth - 1] = sigmoid_slope(output) * (target - output);

        for i in (0..depth - 1).rev() {
            let downstream = &self.layers[i + 1];
            let n = downstream.inputs();
            let sigma = downstream.weights.slice(s![.., ..n]).t().dot(&deltas[i + 1]);
            deltas[i] = sigmoid_slope(&activations[i + 1]) * sigma;
        }

        for (i, layer) in self.layers.iter_mut().enumerate() {
            let n = layer.inputs();
            let delta = deltas[i].view().insert_axis(Axis(1));
            let upstream = activations[i].view().insert_axis(Axis(0));

            layer
                .weights
                .slice_mut(s![.., ..n])
                .scaled_add(rate, &delta.dot(&upstream));
            layer.weights.column_mut(n).scaled_add(rate, &deltas[i]);
        }

        Ok(())
    }

    fn check_input(&self, input: &[f64]) -> Result<()> {
        if input.len() != self.inputs() {
            return Err(NetworkError::DimensionMismatch {
                expected: self.inputs(),
                actual: input.len(),
            });
        }
        Ok(())
    }

    fn check_target(&self, target: &[f64]) -> Result<()> {
        if target.len() != self.outputs() {
            return Err(NetworkError::DimensionMismatch {
                expected: self.outputs(),
                actual: target.len(),
            });
        }
        Ok(())
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Derivative of the sigmoid expressed through its output
fn sigmoid_slope(output: &Array1<f64>) -> Array1<f64> {
    output.mapv(|o| o * (1.0 - o))
}
