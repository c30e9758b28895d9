use std::fs::OpenOptions;
use std::path::PathBuf;

use crate::error::Result;
use crate::train::epoch_stats::EpochStats;

const HEADER: [&str; 7] = [
    "global_epoch",
    "epoch",
    "train_loss",
    "train_accuracy",
    "val_loss",
    "val_accuracy",
    "learning_rate",
];

/// Appends one row per epoch to a metrics CSV shared by every restart.
#[derive(Debug, Clone)]
pub struct CsvLogger {
    path: PathBuf,
}

impl CsvLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvLogger { path: path.into() }
    }

    pub fn on_epoch_end(&mut self, stats: &EpochStats) -> Result<()> {
        let is_new = std::fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let mut w = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        if is_new {
            w.write_record(HEADER)?;
        }
        w.write_record(&[
            stats.global_epoch.to_string(),
            stats.epoch.to_string(),
            stats.train_loss.to_string(),
            stats.train_accuracy.to_string(),
            stats.val_loss.to_string(),
            stats.val_accuracy.to_string(),
            stats.learning_rate.to_string(),
        ])?;
        w.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(global_epoch: usize) -> EpochStats {
        EpochStats {
            epoch: 0,
            global_epoch,
            train_loss: 0.5,
            val_loss: 0.6,
            train_accuracy: 0.7,
            val_accuracy: 0.65,
            learning_rate: 1e-4,
            elapsed_ms: 3,
        }
    }

    #[test]
    fn header_is_written_once_across_loggers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("training_metrics.csv");
        CsvLogger::new(&path).on_epoch_end(&stats(0)).unwrap();
        CsvLogger::new(&path).on_epoch_end(&stats(1)).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("global_epoch,epoch"));
        assert!(lines[2].starts_with("1,0,"));
    }
}
