use crate::math::matrix::Matrix;
use crate::network::Network;

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const EPSILON: f64 = 1e-7;

/// First and second moment estimates for one layer.
#[derive(Debug, Clone)]
struct Moments {
    m_w: Matrix,
    v_w: Matrix,
    m_b: Matrix,
    v_b: Matrix,
}

/// Adam optimizer. Moment buffers are created lazily on the first step so a
/// single instance can be built before the network it trains.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    t: u64,
    moments: Vec<Moments>,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Adam {
        Adam { learning_rate, t: 0, moments: Vec::new() }
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Changes the step size without touching the moment estimates.
    pub fn set_learning_rate(&mut self, learning_rate: f64) {
        self.learning_rate = learning_rate;
    }

    /// Drops all moment estimates and the step counter.
    pub fn reset(&mut self) {
        self.t = 0;
        self.moments.clear();
    }

    pub fn steps(&self) -> u64 {
        self.t
    }

    /// Applies one update. `grads[i]` is `(weights_grad, biases_grad)` for layer `i`.
    pub fn step(&mut self, network: &mut Network, grads: &[(Matrix, Matrix)]) {
        assert_eq!(grads.len(), network.layers.len(), "one gradient pair per layer");
        if self.moments.len() != network.layers.len() {
            self.moments = network.layers.iter()
                .map(|l| Moments {
                    m_w: Matrix::zeros(l.weights.rows, l.weights.cols),
                    v_w: Matrix::zeros(l.weights.rows, l.weights.cols),
                    m_b: Matrix::zeros(l.biases.rows, l.biases.cols),
                    v_b: Matrix::zeros(l.biases.rows, l.biases.cols),
                })
                .collect();
        }

        self.t += 1;
        let t = self.t as i32;
        let lr_t = self.learning_rate * (1.0 - BETA2.powi(t)).sqrt() / (1.0 - BETA1.powi(t));

        for ((layer, (w_grad, b_grad)), m) in network.layers.iter_mut()
            .zip(grads)
            .zip(self.moments.iter_mut())
        {
            update(&mut layer.weights, w_grad, &mut m.m_w, &mut m.v_w, lr_t);
            update(&mut layer.biases, b_grad, &mut m.m_b, &mut m.v_b, lr_t);
        }
    }
}

fn update(param: &mut Matrix, grad: &Matrix, m: &mut Matrix, v: &mut Matrix, lr_t: f64) {
    for i in 0..param.data.len() {
        let g = grad.data[i];
        m.data[i] = BETA1 * m.data[i] + (1.0 - BETA1) * g;
        v.data[i] = BETA2 * v.data[i] + (1.0 - BETA2) * g * g;
        param.data[i] -= lr_t * m.data[i] / (v.data[i].sqrt() + EPSILON);
    }
}
