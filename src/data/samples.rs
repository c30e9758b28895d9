use std::borrow::Cow;

use rand::rngs::StdRng;

use crate::error::{Result, WeedsError};

/// In-memory inputs with one-hot labels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Samples {
    pub inputs: Vec<Vec<f64>>,
    pub labels: Vec<Vec<f64>>,
}

impl Samples {
    pub fn new(inputs: Vec<Vec<f64>>, labels: Vec<Vec<f64>>) -> Result<Samples> {
        if inputs.len() != labels.len() {
            return Err(WeedsError::Dataset(format!(
                "{} inputs but {} labels",
                inputs.len(),
                labels.len()
            )));
        }
        if let Some(first) = inputs.first() {
            if let Some(i) = inputs.iter().position(|x| x.len() != first.len()) {
                return Err(WeedsError::Dataset(format!(
                    "sample {} has {} features, expected {}",
                    i,
                    inputs[i].len(),
                    first.len()
                )));
            }
        }
        Ok(Samples { inputs, labels })
    }

    /// Builds samples from class indices, one-hot encoding each label.
    pub fn from_classes(inputs: Vec<Vec<f64>>, classes: &[usize], n_classes: usize) -> Result<Samples> {
        let labels = classes.iter()
            .map(|&c| one_hot(c, n_classes))
            .collect::<Result<Vec<_>>>()?;
        Samples::new(inputs, labels)
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

pub fn one_hot(class: usize, n_classes: usize) -> Result<Vec<f64>> {
    if class >= n_classes {
        return Err(WeedsError::Dataset(format!(
            "class index {} out of range for {} classes",
            class, n_classes
        )));
    }
    let mut v = vec![0.0; n_classes];
    v[class] = 1.0;
    Ok(v)
}

/// Anything that can hand the fit loop one epoch worth of samples.
///
/// Augmenting sources produce fresh samples on every call; static sources
/// borrow their data.
pub trait SampleSource {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn epoch(&self, rng: &mut StdRng) -> Result<Cow<'_, Samples>>;
}

impl SampleSource for Samples {
    fn len(&self) -> usize {
        self.inputs.len()
    }

    fn epoch(&self, _rng: &mut StdRng) -> Result<Cow<'_, Samples>> {
        Ok(Cow::Borrowed(self))
    }
}
