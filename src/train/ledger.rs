use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Ledger of the best checkpoint per restart, written next to the slots.
pub const MANIFEST_FILE: &str = "last_best_models.csv";
const MANIFEST_HEADER: [&str; 3] = ["Model file", "Global epoch", "Validation loss"];

/// Where the model for one restart is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointId {
    pub restart: usize,
    pub file_name: String,
    pub path: PathBuf,
}

/// Best result of one restart, appended to the ledger once it is known.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointRecord {
    pub file_name: String,
    pub global_epoch: usize,
    pub validation_loss: f64,
}

pub fn checkpoint_file_name(restart: usize) -> String {
    format!("lastbest-{}.json", restart)
}

/// Allocates checkpoint slots and records their outcome.
pub trait CheckpointWriter {
    fn slot(&mut self, restart: usize) -> Result<CheckpointId>;
    fn record(&mut self, record: &CheckpointRecord) -> Result<()>;
}

/// Checkpoints as files in one directory, ledger alongside them.
#[derive(Debug, Clone)]
pub struct CheckpointDir {
    dir: PathBuf,
    manifest: PathBuf,
}

impl CheckpointDir {
    /// Creates `dir` if needed and starts a fresh ledger.
    pub fn create(dir: &Path) -> Result<CheckpointDir> {
        std::fs::create_dir_all(dir)?;
        let manifest = dir.join(MANIFEST_FILE);
        let mut w = csv::Writer::from_path(&manifest)?;
        w.write_record(MANIFEST_HEADER)?;
        w.flush()?;
        Ok(CheckpointDir { dir: dir.to_path_buf(), manifest })
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest
    }
}

impl CheckpointWriter for CheckpointDir {
    fn slot(&mut self, restart: usize) -> Result<CheckpointId> {
        let file_name = checkpoint_file_name(restart);
        Ok(CheckpointId { restart, path: self.dir.join(&file_name), file_name })
    }

    fn record(&mut self, record: &CheckpointRecord) -> Result<()> {
        let file = OpenOptions::new().append(true).open(&self.manifest)?;
        let mut w = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        w.write_record(&[
            record.file_name.clone(),
            record.global_epoch.to_string(),
            record.validation_loss.to_string(),
        ])?;
        w.flush()?;
        Ok(())
    }
}
