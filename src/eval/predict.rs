use crate::network::Network;
use crate::train::loop_fn::argmax;

/// Picks the class for one output vector.
///
/// The highest-scoring class wins unless its score is below `1 / n_classes`
/// (worse than a uniform guess), in which case `negative_class` is returned
/// when one is configured.
pub fn classify(output: &[f64], negative_class: Option<usize>) -> usize {
    let best = argmax(output);
    match negative_class {
        Some(neg) if !output.is_empty() && output[best] < 1.0 / output.len() as f64 => neg,
        _ => best,
    }
}

pub fn predict_classes(network: &Network, inputs: &[Vec<f64>], negative_class: Option<usize>) -> Vec<usize> {
    inputs.iter()
        .map(|x| classify(&network.predict(x), negative_class))
        .collect()
}
