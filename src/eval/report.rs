use std::fmt;
use std::path::Path;

use crate::error::{Result, WeedsError};

/// Precision, recall and F1 for one class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassMetrics {
    pub name: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Square confusion matrix, `counts[true][predicted]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn new(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> Result<ConfusionMatrix> {
        if y_true.len() != y_pred.len() {
            return Err(WeedsError::Dataset(format!(
                "{} true labels but {} predictions",
                y_true.len(),
                y_pred.len()
            )));
        }
        let mut counts = vec![vec![0; n_classes]; n_classes];
        for (&t, &p) in y_true.iter().zip(y_pred) {
            if t >= n_classes || p >= n_classes {
                return Err(WeedsError::Dataset(format!(
                    "class pair ({}, {}) out of range for {} classes",
                    t, p, n_classes
                )));
            }
            counts[t][p] += 1;
        }
        Ok(ConfusionMatrix { counts })
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut w = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
        for row in &self.counts {
            w.write_record(row.iter().map(|c| c.to_string()))?;
        }
        w.flush()?;
        Ok(())
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.counts {
            let cells: Vec<String> = row.iter().map(|c| format!("{:>5}", c)).collect();
            writeln!(f, "[{}]", cells.join(""))?;
        }
        Ok(())
    }
}

/// Per-class and averaged classification metrics. Ratios with a zero
/// denominator are reported as 0.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
    pub confusion: ConfusionMatrix,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

impl ClassificationReport {
    pub fn new(y_true: &[usize], y_pred: &[usize], class_names: &[String]) -> Result<ClassificationReport> {
        let n = class_names.len();
        let confusion = ConfusionMatrix::new(y_true, y_pred, n)?;
        let c = &confusion.counts;

        let classes: Vec<ClassMetrics> = class_names.iter().enumerate()
            .map(|(k, name)| {
                let tp = c[k][k];
                let predicted: usize = (0..n).map(|t| c[t][k]).sum();
                let support: usize = c[k].iter().sum();
                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                let f1 = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };
                ClassMetrics { name: name.clone(), precision, recall, f1, support }
            })
            .collect();

        let total: usize = classes.iter().map(|m| m.support).sum();
        let correct: usize = (0..n).map(|k| c[k][k]).sum();
        let mean = |f: fn(&ClassMetrics) -> f64| {
            if n == 0 { 0.0 } else { classes.iter().map(f).sum::<f64>() / n as f64 }
        };
        let weighted = |f: fn(&ClassMetrics) -> f64| {
            if total == 0 { 0.0 } else { classes.iter().map(|m| f(m) * m.support as f64).sum::<f64>() / total as f64 }
        };

        let macro_avg = ClassMetrics {
            name: "macro avg".into(),
            precision: mean(|m| m.precision),
            recall: mean(|m| m.recall),
            f1: mean(|m| m.f1),
            support: total,
        };
        let weighted_avg = ClassMetrics {
            name: "weighted avg".into(),
            precision: weighted(|m| m.precision),
            recall: weighted(|m| m.recall),
            f1: weighted(|m| m.f1),
            support: total,
        };

        Ok(ClassificationReport {
            classes,
            accuracy: ratio(correct, total),
            macro_avg,
            weighted_avg,
            confusion,
        })
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut w = csv::Writer::from_path(path)?;
        w.write_record(["class", "precision", "recall", "f1-score", "support"])?;
        let row = |m: &ClassMetrics| {
            vec![
                m.name.clone(),
                m.precision.to_string(),
                m.recall.to_string(),
                m.f1.to_string(),
                m.support.to_string(),
            ]
        };
        for m in &self.classes {
            w.write_record(row(m))?;
        }
        w.write_record([
            "accuracy".to_string(),
            String::new(),
            String::new(),
            self.accuracy.to_string(),
            self.macro_avg.support.to_string(),
        ])?;
        w.write_record(row(&self.macro_avg))?;
        w.write_record(row(&self.weighted_avg))?;
        w.flush()?;
        Ok(())
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.classes.iter().map(|m| m.name.len()).max().unwrap_or(0).max(12);
        writeln!(f, "{:>w$}  {:>9}  {:>9}  {:>9}  {:>9}", "", "precision", "recall", "f1-score", "support", w = width)?;
        writeln!(f)?;
        let line = |f: &mut fmt::Formatter<'_>, m: &ClassMetrics| {
            writeln!(
                f,
                "{:>w$}  {:>9.2}  {:>9.2}  {:>9.2}  {:>9}",
                m.name, m.precision, m.recall, m.f1, m.support,
                w = width
            )
        };
        for m in &self.classes {
            line(f, m)?;
        }
        writeln!(f)?;
        writeln!(f, "{:>w$}  {:>9}  {:>9}  {:>9.2}  {:>9}", "accuracy", "", "", self.accuracy, self.macro_avg.support, w = width)?;
        line(f, &self.macro_avg)?;
        line(f, &self.weighted_avg)
    }
}
