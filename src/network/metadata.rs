use serde::{Deserialize, Serialize};

/// Shape of the image a network expects, after cropping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageShape {
    pub width: u32,
    pub height: u32,
}

impl ImageShape {
    /// Flattened RGB input length.
    pub fn input_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// Optional annotations stored alongside the weights.
/// All fields are optional so bare weight files still deserialize.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ModelMetadata {
    pub description: Option<String>,
    pub input_shape: Option<ImageShape>,
    /// Class names for the output units, in index order.
    pub class_names: Option<Vec<String>>,
}
