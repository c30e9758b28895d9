use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::{activation::ActivationFunction, math::matrix::Matrix};

/// Fully connected layer. Weights are `input_size × size`, biases `1 × size`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    pub size: usize,
    pub weights: Matrix,
    pub biases: Matrix,
    pub activator: ActivationFunction,
    #[serde(skip)]
    input: Matrix,
    #[serde(skip)]
    pre_activation: Matrix,
}

impl Dense {
    /// He init for ReLU-family layers, Xavier for everything else.
    pub fn new<R: Rng + ?Sized>(
        size: usize,
        input_size: usize,
        activation: ActivationFunction,
        rng: &mut R,
    ) -> Dense {
        let weights = match activation {
            ActivationFunction::ReLU | ActivationFunction::LeakyReLU { .. } => {
                Matrix::he(input_size, size, rng)
            }
            _ => Matrix::xavier(input_size, size, rng),
        };
        Dense {
            size,
            weights,
            biases: Matrix::zeros(1, size),
            activator: activation,
            input: Matrix::default(),
            pre_activation: Matrix::default(),
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.rows
    }

    /// Forward pass that caches the input and `z = xW + b` for backprop.
    pub fn forward(&mut self, input: &[f64]) -> Vec<f64> {
        let x = Matrix::row(input.to_vec());
        let z = &(&x * &self.weights) + &self.biases;
        let a = self.activator.apply(&z.data);
        self.input = x;
        self.pre_activation = z;
        a
    }

    /// Forward pass without touching the backprop cache.
    pub fn predict(&self, input: &[f64]) -> Vec<f64> {
        let z = &(&Matrix::row(input.to_vec()) * &self.weights) + &self.biases;
        self.activator.apply(&z.data)
    }

    /// Given ∂L/∂a for this layer, returns `(weights_grad, biases_grad, ∂L/∂input)`.
    pub fn backward(&self, output_delta: &Matrix) -> (Matrix, Matrix, Matrix) {
        let act_derivative = self.pre_activation.map(|x| self.activator.derivative(x));
        let delta = output_delta.hadamard(&act_derivative);
        let weights_grad = &self.input.transpose() * &delta;
        let input_delta = &delta * &self.weights.transpose();
        (weights_grad, delta, input_delta)
    }
}
