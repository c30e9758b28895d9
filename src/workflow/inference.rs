use std::path::PathBuf;
use std::time::Instant;

use tracing::info;

use crate::config::RunConfig;
use crate::data::{read_labels, ImageLoader};
use crate::error::{Result, WeedsError};
use crate::eval::classify;
use crate::network::Network;
use crate::workflow::timestamped_dir;

pub const INFERENCE_TIMES_FILE: &str = "inference_times.csv";

/// Wall-clock cost of classifying one image.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceTiming {
    pub filename: String,
    pub preprocessing_ms: f64,
    pub inference_ms: f64,
    pub predicted: usize,
}

/// Times preprocessing and prediction for every image in `labels.csv`
/// and writes the results to `inference_times.csv` in a new output directory.
pub fn inference(config: &RunConfig, network: &Network) -> Result<(PathBuf, Vec<InferenceTiming>)> {
    let [w, h] = config.data.image_size;
    let loader = ImageLoader { resize: (w, h), crop: None };
    if loader.input_len() != network.input_size() {
        return Err(WeedsError::Config(format!(
            "network takes {} inputs but {}x{} images produce {}",
            network.input_size(),
            w,
            h,
            loader.input_len()
        )));
    }

    let records = read_labels(&config.paths.label_dir.join("labels.csv"))?;
    let mut timings = Vec::with_capacity(records.len());
    for record in &records {
        let start = Instant::now();
        let input = loader.load(&config.paths.image_dir.join(&record.filename))?;
        let preprocessing_ms = start.elapsed().as_secs_f64() * 1000.0;

        let start = Instant::now();
        let predicted = classify(&network.predict(&input), config.data.negative_class);
        let inference_ms = start.elapsed().as_secs_f64() * 1000.0;

        timings.push(InferenceTiming { filename: record.filename.clone(), preprocessing_ms, inference_ms, predicted });
    }

    let output_dir = timestamped_dir(&config.paths.output_dir, "")?;
    let path = output_dir.join(INFERENCE_TIMES_FILE);
    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record(["Filename", "Preprocessing time (ms)", "Inference time (ms)"])?;
    for t in &timings {
        writer.write_record([t.filename.clone(), t.preprocessing_ms.to_string(), t.inference_ms.to_string()])?;
    }
    writer.flush()?;
    info!(images = timings.len(), file = %path.display(), "wrote inference times");
    Ok((path, timings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::ModelSpec;
    use image::{Rgb, RgbImage};
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn writes_one_row_per_labelled_image() {
        let root = tempfile::tempdir().unwrap();
        let images = root.path().join("images");
        let labels = root.path().join("labels");
        std::fs::create_dir_all(&images).unwrap();
        std::fs::create_dir_all(&labels).unwrap();
        for name in ["x.png", "y.png"] {
            RgbImage::from_pixel(3, 3, Rgb([10, 20, 30])).save(images.join(name)).unwrap();
        }
        std::fs::write(labels.join("labels.csv"), "Filename,Label\nx.png,0\ny.png,1\n").unwrap();

        let mut config = RunConfig::default();
        config.paths.image_dir = images;
        config.paths.label_dir = labels;
        config.paths.output_dir = root.path().join("out");
        config.data.image_size = [2, 2];
        let n_classes = config.n_classes();

        let network = Network::from_spec(&ModelSpec::dense_head(12, 4, n_classes), &mut StdRng::seed_from_u64(0)).unwrap();
        let (path, timings) = inference(&config, &network).unwrap();
        assert_eq!(timings.len(), 2);
        assert!(timings.iter().all(|t| t.predicted < n_classes && t.inference_ms >= 0.0));

        let contents = std::fs::read_to_string(path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("Filename,Preprocessing time (ms),Inference time (ms)"));
        assert_eq!(lines.filter(|l| l.starts_with("x.png,") || l.starts_with("y.png,")).count(), 2);
    }

    #[test]
    fn input_size_mismatch_is_rejected() {
        let network = Network::from_spec(&ModelSpec::dense_head(5, 2, 9), &mut StdRng::seed_from_u64(0)).unwrap();
        assert!(matches!(inference(&RunConfig::default(), &network), Err(WeedsError::Config(_))));
    }
}
