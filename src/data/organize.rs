use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::info;

use crate::data::labels::read_labels;
use crate::error::{Result, WeedsError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeciesSplit {
    pub species: String,
    pub train: usize,
    pub test: usize,
}

/// Reorganises a flat image folder into per-species train/test folders.
///
/// Layout produced under `out_dir`:
///
/// ```text
/// train_/<species>/<file>            (staging copy, emptied by the split)
/// set/<species>/train/<file>
/// set/<species>/test/<file>
/// ```
///
/// Copies every labelled image into its species folder, then moves the
/// first `test_fraction` of each species (by file name) into `test/` and
/// the remainder into `train/`.
pub fn organize(
    labels_csv: &Path,
    image_dir: &Path,
    out_dir: &Path,
    test_fraction: f64,
) -> Result<Vec<SpeciesSplit>> {
    if !(0.0..=1.0).contains(&test_fraction) {
        return Err(WeedsError::Config(format!("test fraction {} is outside [0, 1]", test_fraction)));
    }

    let mut by_species: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for record in read_labels(labels_csv)? {
        let species = record.species.ok_or_else(|| {
            WeedsError::Dataset(format!("'{}' has no Species column value", record.filename))
        })?;
        by_species.entry(species).or_default().push(record.filename);
    }

    let staging = out_dir.join("train_");
    for (species, files) in &by_species {
        let dir = staging.join(species);
        fs::create_dir_all(&dir)?;
        for file in files {
            fs::copy(image_dir.join(file), dir.join(file))?;
        }
    }

    let mut splits = Vec::with_capacity(by_species.len());
    for species in by_species.keys() {
        let in_dir = staging.join(species);
        let train_dir = out_dir.join("set").join(species).join("train");
        let test_dir = out_dir.join("set").join(species).join("test");
        fs::create_dir_all(&train_dir)?;
        fs::create_dir_all(&test_dir)?;

        let mut names: Vec<_> = fs::read_dir(&in_dir)?
            .map(|entry| entry.map(|e| e.file_name()))
            .collect::<std::io::Result<_>>()?;
        names.sort();

        let n_test = (names.len() as f64 * test_fraction) as usize;
        for (i, name) in names.iter().enumerate() {
            let target = if i < n_test { &test_dir } else { &train_dir };
            fs::rename(in_dir.join(name), target.join(name))?;
        }

        info!(species = %species, train = names.len() - n_test, test = n_test, "split species");
        splits.push(SpeciesSplit { species: species.clone(), train: names.len() - n_test, test: n_test });
    }
    Ok(splits)
}
