use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, WeedsError};

/// One row of a DeepWeeds label manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRecord {
    pub filename: String,
    pub label: usize,
    /// Present in the full `labels.csv`, absent from the per-fold subsets.
    pub species: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "Filename")]
    filename: String,
    #[serde(rename = "Label")]
    label: String,
    #[serde(rename = "Species", default)]
    species: Option<String>,
}

/// Reads a `Filename,Label[,Species]` manifest.
pub fn read_labels(path: &Path) -> Result<Vec<LabelRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for (i, row) in reader.deserialize::<RawRow>().enumerate() {
        let row = row?;
        let label = row.label.trim().parse::<usize>().map_err(|_| {
            WeedsError::Dataset(format!(
                "{} row {}: label '{}' is not a class index",
                path.display(),
                i + 1,
                row.label
            ))
        })?;
        records.push(LabelRecord {
            filename: row.filename,
            label,
            species: row.species.filter(|s| !s.is_empty()),
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn reads_full_manifest_with_species() {
        let f = write("Filename,Label,Species\n20160928-140314-0.jpg,0,Chinee apple\nb.jpg,8,Negative\n");
        let records = read_labels(f.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].label, 8);
        assert_eq!(records[0].species.as_deref(), Some("Chinee apple"));
    }

    #[test]
    fn reads_subset_without_species() {
        let f = write("Filename,Label\na.jpg,3\n");
        let records = read_labels(f.path()).unwrap();
        assert_eq!(records[0], LabelRecord { filename: "a.jpg".into(), label: 3, species: None });
    }

    #[test]
    fn non_numeric_label_is_a_dataset_error() {
        let f = write("Filename,Label\na.jpg,weed\n");
        assert!(matches!(read_labels(f.path()), Err(WeedsError::Dataset(_))));
    }
}
