use std::borrow::Cow;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::RgbImage;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::debug;

use crate::data::labels::LabelRecord;
use crate::data::samples::{one_hot, SampleSource, Samples};
use crate::error::{Result, WeedsError};

/// How a stored image is turned into a network input.
///
/// Images are resized to `resize`, then concentrically cropped to `crop`
/// when set. Pixels are scaled to [0, 1] and flattened as R,G,B,...
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageLoader {
    pub resize: (u32, u32),
    pub crop: Option<(u32, u32)>,
}

/// Random perturbations applied to each image on every epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Augmentation {
    pub horizontal_flip: bool,
    pub brightness_range: Option<(f64, f64)>,
}

impl Default for Augmentation {
    fn default() -> Self {
        Augmentation { horizontal_flip: true, brightness_range: Some((0.75, 1.25)) }
    }
}

impl ImageLoader {
    /// Opens `path` and resizes it. Cropping is deferred to `finish`.
    pub fn open(&self, path: &Path) -> Result<RgbImage> {
        let img = image::open(path)
            .map_err(|e| WeedsError::Image(path.to_path_buf(), e))?
            .to_rgb8();
        let (w, h) = self.resize;
        if img.dimensions() == (w, h) {
            return Ok(img);
        }
        Ok(imageops::resize(&img, w, h, FilterType::Triangle))
    }

    /// Crops, optionally augments, and flattens an image opened by `open`.
    pub fn finish(&self, img: &RgbImage, augment: Option<(&Augmentation, &mut StdRng)>) -> Vec<f64> {
        let mut img = match self.crop {
            Some(size) => center_crop(img, size),
            None => img.clone(),
        };
        let mut brightness = 1.0;
        if let Some((aug, rng)) = augment {
            if aug.horizontal_flip && rng.gen_bool(0.5) {
                imageops::flip_horizontal_in_place(&mut img);
            }
            if let Some((lo, hi)) = aug.brightness_range {
                brightness = rng.gen_range(lo..=hi);
            }
        }
        img.pixels()
            .flat_map(|p| p.0)
            .map(|c| (c as f64 * brightness).min(255.0) / 255.0)
            .collect()
    }

    /// Input length produced by `finish`.
    pub fn input_len(&self) -> usize {
        let (w, h) = self.crop.unwrap_or(self.resize);
        w as usize * h as usize * 3
    }

    pub fn load(&self, path: &Path) -> Result<Vec<f64>> {
        Ok(self.finish(&self.open(path)?, None))
    }
}

fn center_crop(img: &RgbImage, (w, h): (u32, u32)) -> RgbImage {
    let (iw, ih) = img.dimensions();
    let (w, h) = (w.min(iw), h.min(ih));
    let x = (iw - w) / 2;
    let y = (ih - h) / 2;
    imageops::crop_imm(img, x, y, w, h).to_image()
}

/// A labelled image set kept resized in memory and re-augmented per epoch.
pub struct ImageSamples {
    loader: ImageLoader,
    augmentation: Option<Augmentation>,
    images: Vec<RgbImage>,
    pub filenames: Vec<String>,
    pub classes: Vec<usize>,
    n_classes: usize,
}

impl ImageSamples {
    pub fn load(
        records: &[LabelRecord],
        image_dir: &Path,
        loader: ImageLoader,
        augmentation: Option<Augmentation>,
        n_classes: usize,
    ) -> Result<ImageSamples> {
        let mut images = Vec::with_capacity(records.len());
        for record in records {
            if record.label >= n_classes {
                return Err(WeedsError::Dataset(format!(
                    "'{}' has label {} but only {} classes are configured",
                    record.filename, record.label, n_classes
                )));
            }
            images.push(loader.open(&image_dir.join(&record.filename))?);
        }
        debug!(count = images.len(), dir = %image_dir.display(), "loaded images");
        Ok(ImageSamples {
            loader,
            augmentation,
            images,
            filenames: records.iter().map(|r| r.filename.clone()).collect(),
            classes: records.iter().map(|r| r.label).collect(),
            n_classes,
        })
    }

    pub fn input_len(&self) -> usize {
        self.loader.input_len()
    }
}

impl SampleSource for ImageSamples {
    fn len(&self) -> usize {
        self.images.len()
    }

    fn epoch(&self, rng: &mut StdRng) -> Result<Cow<'_, Samples>> {
        let inputs = self.images.iter()
            .map(|img| match &self.augmentation {
                Some(aug) => self.loader.finish(img, Some((aug, &mut *rng))),
                None => self.loader.finish(img, None),
            })
            .collect();
        let labels = self.classes.iter()
            .map(|&c| one_hot(c, self.n_classes))
            .collect::<Result<Vec<_>>>()?;
        Ok(Cow::Owned(Samples { inputs, labels }))
    }
}
