use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use crate::config::RunConfig;
use crate::data::{read_labels, Augmentation, FoldFiles, ImageLoader, ImageSamples, SampleSource};
use crate::error::{Result, WeedsError};
use crate::eval::{predict_classes, ClassificationReport};
use crate::network::{ImageShape, ModelSpec, Network};
use crate::train::controller::{run, RunOutcome};
use crate::train::ledger::CheckpointDir;
use crate::train::trainable::NetworkModel;
use crate::workflow::timestamped_dir;

pub const METRICS_FILE: &str = "training_metrics.csv";
pub const REPORT_FILE: &str = "classification_report.csv";
pub const CONFUSION_FILE: &str = "confusion_matrix.csv";

/// Where the architecture of each fold's fresh model comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelSource {
    /// `ModelSpec::dense_head` sized from the config.
    Dense,
    Spec(ModelSpec),
}

impl ModelSource {
    /// `"dense"` or a path to a model spec JSON file.
    pub fn parse(arg: &str) -> Result<ModelSource> {
        if arg == "dense" {
            return Ok(ModelSource::Dense);
        }
        Ok(ModelSource::Spec(ModelSpec::load_json(Path::new(arg))?))
    }

    fn spec(&self, config: &RunConfig, input_len: usize) -> Result<ModelSpec> {
        let mut spec = match self {
            ModelSource::Dense => ModelSpec::dense_head(input_len, config.training.hidden_units, config.n_classes()),
            ModelSource::Spec(spec) => spec.clone(),
        };
        if spec.input_size != input_len {
            return Err(WeedsError::Config(format!(
                "model '{}' takes {} inputs but images produce {}",
                spec.name, spec.input_size, input_len
            )));
        }
        if spec.output_size() != config.n_classes() {
            return Err(WeedsError::Config(format!(
                "model '{}' has {} outputs for {} classes",
                spec.name,
                spec.output_size(),
                config.n_classes()
            )));
        }
        let [width, height] = config.data.image_size;
        spec.metadata.input_shape.get_or_insert(ImageShape { width, height });
        spec.metadata.class_names.get_or_insert_with(|| config.data.class_names.clone());
        Ok(spec)
    }
}

/// Outcome of one fold.
#[derive(Debug)]
pub struct FoldSummary {
    pub fold: usize,
    pub output_dir: PathBuf,
    pub outcome: RunOutcome,
    pub report: ClassificationReport,
}

/// Trains and tests a fresh model on every fold listed in the label
/// directory, each in its own timestamped output directory.
pub fn cross_validate(config: &RunConfig, source: &ModelSource) -> Result<Vec<FoldSummary>> {
    config.validate()?;
    let mut summaries = Vec::with_capacity(config.data.folds);
    for fold in 0..config.data.folds {
        let output_dir = timestamped_dir(&config.paths.output_dir, &format!("-fold{}", fold))?;
        info!(fold = fold + 1, folds = config.data.folds, dir = %output_dir.display(), "starting fold");
        let summary = run_fold(config, source, fold, &output_dir)?;
        info!(
            fold = fold + 1,
            accuracy = summary.report.accuracy,
            restarts = summary.outcome.state.restart_count,
            "finished testing fold"
        );
        summaries.push(summary);
    }
    Ok(summaries)
}

/// Runs fold `fold` writing every artifact into `output_dir`.
pub fn run_fold(config: &RunConfig, source: &ModelSource, fold: usize, output_dir: &Path) -> Result<FoldSummary> {
    let files = FoldFiles::new(&config.paths.label_dir, fold);
    let n_classes = config.n_classes();
    let [raw_w, raw_h] = config.data.raw_image_size;
    let [w, h] = config.data.image_size;

    let train_loader = ImageLoader { resize: (raw_w, raw_h), crop: Some((w, h)) };
    let test_loader = ImageLoader { resize: (w, h), crop: None };
    let augmentation = config.data.augment.then(Augmentation::default);
    let image_dir = &config.paths.image_dir;

    let train = ImageSamples::load(&read_labels(&files.train)?, image_dir, train_loader, augmentation, n_classes)?;
    let val = ImageSamples::load(&read_labels(&files.val)?, image_dir, train_loader, augmentation, n_classes)?;
    let test = ImageSamples::load(&read_labels(&files.test)?, image_dir, test_loader, None, n_classes)?;
    info!(train = train.len(), val = val.len(), test = test.len(), "loaded fold images");

    let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(fold as u64));
    let spec = source.spec(config, train.input_len())?;
    let network = Network::from_spec(&spec, &mut rng)?;

    let schedule = config.schedule(Some(output_dir.join(METRICS_FILE)));
    let mut model = NetworkModel::new(network, config.training.initial_lr, train, val, schedule, rng);
    let mut ledger = CheckpointDir::create(output_dir)?;
    let outcome = run(&mut model, &mut ledger, &config.controller())?;
    let network = model.into_network();

    let test_samples = test.epoch(&mut StdRng::seed_from_u64(config.seed))?;
    let y_pred = predict_classes(&network, &test_samples.inputs, config.data.negative_class);
    let report = ClassificationReport::new(&test.classes, &y_pred, &config.data.class_names)?;
    report.write_csv(&output_dir.join(REPORT_FILE))?;
    report.confusion.write_csv(&output_dir.join(CONFUSION_FILE))?;

    Ok(FoldSummary { fold, output_dir: output_dir.to_path_buf(), outcome, report })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> RunConfig {
        let mut config = RunConfig::default();
        config.data.class_names = vec!["a".into(), "b".into()];
        config.data.negative_class = None;
        config.data.image_size = [2, 2];
        config.data.raw_image_size = [4, 4];
        config
    }

    #[test]
    fn dense_source_is_sized_from_config() {
        let config = small_config();
        let spec = ModelSource::Dense.spec(&config, 12).unwrap();
        assert_eq!(spec.input_size, 12);
        assert_eq!(spec.output_size(), 2);
        assert_eq!(spec.metadata.input_shape, Some(ImageShape { width: 2, height: 2 }));
        assert_eq!(spec.metadata.class_names.as_deref(), Some(&config.data.class_names[..]));
    }

    #[test]
    fn mismatched_spec_is_rejected() {
        let config = small_config();
        let spec = ModelSpec::dense_head(10, 4, 2);
        assert!(matches!(ModelSource::Spec(spec).spec(&config, 12), Err(WeedsError::Config(_))));
        let spec = ModelSpec::dense_head(12, 4, 3);
        assert!(ModelSource::Spec(spec).spec(&config, 12).is_err());
    }
}
