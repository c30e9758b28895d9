use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::error::{Result, WeedsError};

/// Correct and total predictions for one class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassTally {
    pub name: String,
    /// 1.0 for a correct prediction, 0.0 otherwise, in sample order.
    pub outcomes: Vec<f64>,
}

impl ClassTally {
    pub fn new(name: impl Into<String>) -> ClassTally {
        ClassTally { name: name.into(), outcomes: Vec::new() }
    }

    pub fn push(&mut self, correct: bool) {
        self.outcomes.push(if correct { 1.0 } else { 0.0 });
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn correct(&self) -> usize {
        self.outcomes.iter().filter(|&&o| o > 0.0).count()
    }

    pub fn accuracy(&self) -> f64 {
        if self.outcomes.is_empty() {
            0.0
        } else {
            self.correct() as f64 / self.total() as f64
        }
    }
}

/// Per-class accuracies with Student-t confidence intervals.
#[derive(Debug, Clone, PartialEq)]
pub struct AccuracyReport {
    pub level: f64,
    pub classes: Vec<ClassTally>,
    pub class_intervals: Vec<Option<(f64, f64)>>,
    /// Correct over total across all classes.
    pub combined: f64,
    /// Interval over the per-class accuracies.
    pub combined_interval: Option<(f64, f64)>,
}

impl AccuracyReport {
    pub fn new(classes: Vec<ClassTally>, level: f64) -> Result<AccuracyReport> {
        let class_intervals = classes.iter()
            .map(|c| confidence_interval(&c.outcomes, level))
            .collect::<Result<Vec<_>>>()?;
        let accuracies: Vec<f64> = classes.iter().map(ClassTally::accuracy).collect();
        let correct: usize = classes.iter().map(ClassTally::correct).sum();
        let total: usize = classes.iter().map(ClassTally::total).sum();
        let combined = if total == 0 { 0.0 } else { correct as f64 / total as f64 };
        let combined_interval = confidence_interval(&accuracies, level)?;
        Ok(AccuracyReport { level, classes, class_intervals, combined, combined_interval })
    }
}

fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        None
    } else {
        Some(samples.iter().sum::<f64>() / samples.len() as f64)
    }
}

/// Two-sided Student-t interval for the mean of `samples` at confidence
/// `level`, using the standard error with one degree of freedom removed.
///
/// Returns `None` for fewer than two samples. Zero variance collapses the
/// interval onto the mean.
pub fn confidence_interval(samples: &[f64], level: f64) -> Result<Option<(f64, f64)>> {
    if !(level > 0.0 && level < 1.0) {
        return Err(WeedsError::Stats(format!("confidence level {} must be in (0, 1)", level)));
    }
    let n = samples.len();
    let m = match mean(samples) {
        Some(m) if n >= 2 => m,
        _ => return Ok(None),
    };
    let var = samples.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (n - 1) as f64;
    let sem = (var / n as f64).sqrt();
    if sem == 0.0 {
        return Ok(Some((m, m)));
    }
    let t = StudentsT::new(0.0, 1.0, (n - 1) as f64)
        .map_err(|e| WeedsError::Stats(e.to_string()))?;
    let q = t.inverse_cdf((1.0 + level) / 2.0);
    Ok(Some((m - q * sem, m + q * sem)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_matches_t_table() {
        // n = 4, mean 2.5, sd = 1.2910, sem = 0.6455, t(0.975, 3) = 3.1824
        let (lo, hi) = confidence_interval(&[1.0, 2.0, 3.0, 4.0], 0.95).unwrap().unwrap();
        assert!((lo - (2.5 - 3.1824 * 0.645497)).abs() < 1e-3);
        assert!((hi - (2.5 + 3.1824 * 0.645497)).abs() < 1e-3);
    }

    #[test]
    fn too_few_samples_give_no_interval() {
        assert_eq!(confidence_interval(&[1.0], 0.95).unwrap(), None);
        assert_eq!(confidence_interval(&[], 0.95).unwrap(), None);
    }

    #[test]
    fn constant_samples_collapse() {
        assert_eq!(confidence_interval(&[1.0, 1.0, 1.0], 0.9).unwrap(), Some((1.0, 1.0)));
    }

    #[test]
    fn bad_level_is_rejected() {
        assert!(confidence_interval(&[0.0, 1.0], 1.0).is_err());
    }

    #[test]
    fn report_combines_class_accuracies() {
        let mut a = ClassTally::new("a");
        a.push(true);
        a.push(false);
        let mut b = ClassTally::new("b");
        b.push(true);
        b.push(true);
        b.push(true);
        let report = AccuracyReport::new(vec![a, b], 0.95).unwrap();
        assert_eq!(report.classes[0].accuracy(), 0.5);
        assert!((report.combined - 0.8).abs() < 1e-12);
        assert_eq!(report.class_intervals[1], Some((1.0, 1.0)));
        assert!(report.combined_interval.is_some());
    }
}
