use std::time::Instant;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::data::samples::{SampleSource, Samples};
use crate::error::{Result, WeedsError};
use crate::math::matrix::Matrix;
use crate::network::Network;
use crate::optim::Adam;
use crate::train::callbacks::FitCallbacks;
use crate::train::epoch_stats::EpochStats;
use crate::train::history::FitHistory;
use crate::train::train_config::FitConfig;

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Trains `network` for at most `config.epochs` epochs.
///
/// After every epoch the callbacks run in order: checkpoint, early stopping,
/// learning-rate reduction, CSV logging. The fit ends early when early
/// stopping fires; `FitHistory::stopped_epoch` then carries its epoch.
///
/// Callback state is reset at the start of every call.
pub fn fit<T, V>(
    network: &mut Network,
    optimizer: &mut Adam,
    train: &T,
    val: &V,
    config: &FitConfig,
    callbacks: &mut FitCallbacks,
    rng: &mut StdRng,
) -> Result<FitHistory>
where
    T: SampleSource + ?Sized,
    V: SampleSource + ?Sized,
{
    if train.is_empty() {
        return Err(WeedsError::Training("training set is empty".into()));
    }
    if val.is_empty() {
        return Err(WeedsError::Training("validation set is empty".into()));
    }
    if config.batch_size == 0 {
        return Err(WeedsError::Training("batch_size must be at least 1".into()));
    }

    if let Some(es) = callbacks.early_stopping.as_mut() {
        es.on_train_begin();
    }
    if let Some(r) = callbacks.reduce_lr.as_mut() {
        r.on_train_begin();
    }

    let mut history = FitHistory::default();

    for epoch in 0..config.epochs {
        let t_start = Instant::now();
        let learning_rate = optimizer.learning_rate();

        // ── One full pass over the training data ───────────────────────────
        let train_samples = train.epoch(rng)?;
        check_shapes(network, &train_samples, "training")?;
        let (train_loss, train_accuracy) =
            run_one_epoch(network, optimizer, &train_samples, config.batch_size, rng);

        // ── Validation ────────────────────────────────────────────────────
        let val_samples = val.epoch(rng)?;
        check_shapes(network, &val_samples, "validation")?;
        let (val_loss, val_accuracy) = evaluate(network, &val_samples);

        let stats = EpochStats {
            epoch,
            global_epoch: config.global_epoch + epoch,
            train_loss,
            val_loss,
            train_accuracy,
            val_accuracy,
            learning_rate,
            elapsed_ms: t_start.elapsed().as_millis() as u64,
        };
        debug!(
            epoch = stats.global_epoch,
            train_loss, train_accuracy, val_loss, val_accuracy, learning_rate,
            "epoch finished"
        );
        history.val_loss.push(val_loss);

        // ── Callbacks ─────────────────────────────────────────────────────
        if let Some(cp) = callbacks.checkpoint.as_mut() {
            cp.on_epoch_end(epoch, val_loss, network)?;
        }
        let stop = match callbacks.early_stopping.as_mut() {
            Some(es) => es.on_epoch_end(epoch, val_loss, network),
            None => false,
        };
        if let Some(r) = callbacks.reduce_lr.as_mut() {
            if let Some(new_lr) = r.on_epoch_end(val_loss, learning_rate) {
                optimizer.set_learning_rate(new_lr);
            }
        }
        if let Some(logger) = callbacks.csv_logger.as_mut() {
            logger.on_epoch_end(&stats)?;
        }

        if stop {
            break;
        }
    }

    history.stopped_epoch = callbacks.early_stopping.as_ref().map(|es| es.stopped_epoch).unwrap_or(0);
    Ok(history)
}

/// Mean loss and categorical accuracy over `samples` without updating weights.
pub fn evaluate(network: &Network, samples: &Samples) -> (f64, f64) {
    let n = samples.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let (loss, correct) = samples.inputs.iter().zip(samples.labels.iter())
        .fold((0.0, 0usize), |(loss, correct), (input, label)| {
            let output = network.predict(input);
            let hit = argmax(&output) == argmax(label);
            (loss + network.loss.loss(&output, label), correct + hit as usize)
        });
    (loss / n as f64, correct as f64 / n as f64)
}

/// Index of the maximum element; the first wins ties, NaN never wins.
pub fn argmax(v: &[f64]) -> usize {
    v.iter()
        .enumerate()
        .filter(|(_, x)| !x.is_nan())
        .fold(None, |best: Option<(usize, f64)>, (i, &x)| match best {
            Some((_, b)) if b >= x => best,
            _ => Some((i, x)),
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn check_shapes(network: &Network, samples: &Samples, what: &str) -> Result<()> {
    let (n_in, n_out) = (network.input_size(), network.output_size());
    if let Some(x) = samples.inputs.iter().find(|x| x.len() != n_in) {
        return Err(WeedsError::Training(format!(
            "{} sample has {} features, network expects {}",
            what, x.len(), n_in
        )));
    }
    if let Some(y) = samples.labels.iter().find(|y| y.len() != n_out) {
        return Err(WeedsError::Training(format!(
            "{} label has {} entries, network outputs {}",
            what, y.len(), n_out
        )));
    }
    Ok(())
}

/// One shuffled pass of mini-batch training. Returns mean loss and the
/// running categorical accuracy.
fn run_one_epoch(
    network: &mut Network,
    optimizer: &mut Adam,
    samples: &Samples,
    batch_size: usize,
    rng: &mut StdRng,
) -> (f64, f64) {
    let n = samples.len();
    let mut total_loss = 0.0;
    let mut correct = 0usize;

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);

    for batch in indices.chunks(batch_size) {
        let mut acc_grads: Vec<(Matrix, Matrix)> = network.layers.iter()
            .map(|layer| (
                Matrix::zeros(layer.weights.rows, layer.weights.cols),
                Matrix::zeros(layer.biases.rows, layer.biases.cols),
            ))
            .collect();

        for &idx in batch {
            let expected = &samples.labels[idx];
            let output = network.forward(&samples.inputs[idx]);

            total_loss += network.loss.loss(&output, expected);
            if argmax(&output) == argmax(expected) {
                correct += 1;
            }

            let mut delta = Matrix::row(network.loss.derivative(&output, expected));
            for i in (0..network.layers.len()).rev() {
                let (w_grad, b_grad, input_delta) = network.layers[i].backward(&delta);
                acc_grads[i].0.add_assign(&w_grad);
                acc_grads[i].1.add_assign(&b_grad);
                delta = input_delta;
            }
        }

        let inv_batch = 1.0 / batch.len() as f64;
        let averaged: Vec<(Matrix, Matrix)> = acc_grads.into_iter()
            .map(|(w, b)| (w.map(|x| x * inv_batch), b.map(|x| x * inv_batch)))
            .collect();
        optimizer.step(network, &averaged);
    }

    (total_loss / n as f64, correct as f64 / n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::ModelSpec;
    use crate::train::callbacks::{CsvLogger, EarlyStopping, ModelCheckpoint};
    use rand::SeedableRng;

    /// Two linearly separable blobs, one-hot over 2 classes.
    fn blobs(n: usize) -> Samples {
        let inputs: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                let c = (i % 2) as f64;
                let jitter = ((i as f64) * 0.37).sin() * 0.05;
                vec![0.2 + 0.6 * c + jitter, 0.8 - 0.6 * c - jitter]
            })
            .collect();
        let classes: Vec<usize> = (0..n).map(|i| i % 2).collect();
        Samples::from_classes(inputs, &classes, 2).unwrap()
    }

    fn setup(seed: u64) -> (Network, StdRng) {
        let mut rng = StdRng::seed_from_u64(seed);
        let net = Network::from_spec(&ModelSpec::dense_head(2, 8, 2), &mut rng).unwrap();
        (net, rng)
    }

    #[test]
    fn loss_decreases_on_separable_data() {
        let (mut net, mut rng) = setup(42);
        let data = blobs(40);
        let before = evaluate(&net, &data).0;
        let mut adam = Adam::new(0.05);
        let history = fit(
            &mut net, &mut adam, &data, &data,
            &FitConfig::new(60, 8), &mut FitCallbacks::default(), &mut rng,
        ).unwrap();
        assert_eq!(history.epochs_run(), 60);
        assert_eq!(history.stopped_epoch, 0);
        let (after, acc) = evaluate(&net, &data);
        assert!(after < before);
        assert!(acc > 0.9);
    }

    #[test]
    fn early_stopping_bounds_the_fit_and_sets_marker() {
        let (mut net, mut rng) = setup(1);
        let data = blobs(10);
        let mut adam = Adam::new(0.0);
        let mut callbacks = FitCallbacks {
            early_stopping: Some(EarlyStopping::new(2)),
            ..FitCallbacks::default()
        };
        let history = fit(
            &mut net, &mut adam, &data, &data,
            &FitConfig::new(20, 4), &mut callbacks, &mut rng,
        ).unwrap();
        // Zero learning rate: the loss never improves after the first epoch.
        assert_eq!(history.epochs_run(), 3);
        assert_eq!(history.stopped_epoch, 2);
    }

    #[test]
    fn callbacks_write_checkpoint_and_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let (mut net, mut rng) = setup(2);
        let data = blobs(12);
        let mut adam = Adam::new(0.01);
        let mut callbacks = FitCallbacks {
            checkpoint: Some(ModelCheckpoint::new(dir.path().join("lastbest-0.json"))),
            csv_logger: Some(CsvLogger::new(dir.path().join("training_metrics.csv"))),
            ..FitCallbacks::default()
        };
        fit(
            &mut net, &mut adam, &data, &data,
            &FitConfig::new(3, 4).starting_at(5), &mut callbacks, &mut rng,
        ).unwrap();
        assert!(dir.path().join("lastbest-0.json").exists());
        let metrics = std::fs::read_to_string(dir.path().join("training_metrics.csv")).unwrap();
        assert_eq!(metrics.lines().count(), 4);
        assert!(metrics.lines().nth(1).unwrap().starts_with("5,0,"));
    }

    #[test]
    fn diverged_weights_fail_at_the_first_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let (mut net, mut rng) = setup(6);
        let mut train = blobs(8);
        train.inputs[0][0] = f64::NAN;
        let val = blobs(8);
        let mut callbacks = FitCallbacks {
            checkpoint: Some(ModelCheckpoint::new(dir.path().join("lastbest-0.json"))),
            ..FitCallbacks::default()
        };
        let err = fit(
            &mut net, &mut Adam::new(0.01), &train, &val,
            &FitConfig::new(3, 8), &mut callbacks, &mut rng,
        );
        assert!(matches!(err, Err(WeedsError::Checkpoint(_))));
        assert!(!dir.path().join("lastbest-0.json").exists());
    }

    #[test]
    fn mismatched_features_are_rejected() {
        let (mut net, mut rng) = setup(3);
        let data = Samples::from_classes(vec![vec![0.0; 3]], &[0], 2).unwrap();
        let err = fit(
            &mut net, &mut Adam::new(0.01), &data, &data,
            &FitConfig::new(1, 1), &mut FitCallbacks::default(), &mut rng,
        );
        assert!(matches!(err, Err(WeedsError::Training(_))));
    }

    #[test]
    fn argmax_prefers_first_and_ignores_nan() {
        assert_eq!(argmax(&[0.1, 0.9, 0.9]), 1);
        assert_eq!(argmax(&[f64::NAN, 0.2, 0.1]), 1);
        assert_eq!(argmax(&[]), 0);
    }
}
