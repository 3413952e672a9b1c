//! Deterministic image preprocessing and channel normalization.

use crate::{common::*, config::Scale};
use image::{imageops::FilterType, DynamicImage};

/// ImageNet channel statistics.
pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// The preprocessing pipeline applied to every image and mask during
/// materialization: resize to the preset output size, then convert to
/// `[0, 1]` floats.
#[derive(Debug, Clone)]
pub struct Transform {
    output_size: (i64, i64),
}

impl Transform {
    pub fn new(scale: Scale) -> Self {
        Self {
            output_size: scale.output_size(),
        }
    }

    /// Output size in (height, width) order.
    pub fn output_size(&self) -> (i64, i64) {
        self.output_size
    }

    /// Load a base image as a `(3, H, W)` float tensor in `[0, 1]`.
    pub fn load_image<P>(&self, path: P) -> Result<Tensor>
    where
        P: AsRef<Path>,
    {
        let (height, width) = self.output_size;
        let samples = open_image(path.as_ref())?
            .resize_exact(width as u32, height as u32, FilterType::Triangle)
            .to_rgb8()
            .into_flat_samples()
            .samples;
        debug_assert_eq!(samples.len(), (height * width * 3) as usize);

        let image = tch::no_grad(|| {
            (Tensor::of_slice(&samples).to_kind(Kind::Float) / 255.0)
                .view([height, width, 3])
                .permute(&[2, 0, 1])
        });
        Ok(image)
    }

    /// Load a ground-truth mask as a `(H, W)` integer tensor.
    ///
    /// The `[0, 1]` float conversion followed by the integer cast truncates
    /// toward zero, so only full-intensity pixels survive as nonzero. This
    /// mirrors the annotation convention of the dataset, where defect pixels
    /// are stored at full intensity.
    pub fn load_mask<P>(&self, path: P) -> Result<Tensor>
    where
        P: AsRef<Path>,
    {
        let (height, width) = self.output_size;
        let samples = open_image(path.as_ref())?
            .resize_exact(width as u32, height as u32, FilterType::Triangle)
            .to_luma8()
            .into_flat_samples()
            .samples;
        debug_assert_eq!(samples.len(), (height * width) as usize);

        let mask = tch::no_grad(|| {
            (Tensor::of_slice(&samples).to_kind(Kind::Float) / 255.0)
                .view([height, width])
                .to_kind(Kind::Int64)
        });
        Ok(mask)
    }
}

fn open_image(path: &Path) -> Result<DynamicImage> {
    let image = image::io::Reader::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?
        .with_guessed_format()
        .with_context(|| {
            format!(
                "failed to determine the image file format: {}",
                path.display()
            )
        })?
        .decode()
        .with_context(|| format!("failed to decode image file: {}", path.display()))?;
    Ok(image)
}

/// Apply channel-wise ImageNet normalization to a `(3, H, W)` image.
pub fn normalize(image: &Tensor) -> Tensor {
    let (mean, std) = channel_stats();
    (image - mean) / std
}

/// The exact inverse of [normalize]. Intended for visualization.
pub fn denormalize(image: &Tensor) -> Tensor {
    let (mean, std) = channel_stats();
    image * std + mean
}

fn channel_stats() -> (Tensor, Tensor) {
    let mean = Tensor::of_slice(&MEAN).view([3, 1, 1]);
    let std = Tensor::of_slice(&STD).view([3, 1, 1]);
    (mean, std)
}
