// Transform: image preprocessing pipeline
//
// Transforms operate on interleaved float RGB images with samples in [0, 1]
// (8-bit values divided by 255). Float resampling in the image crate clamps to
// that range, so pixels must be scaled before any Resize runs. The dataset
// applies the same transform instance independently to the anchor, positive
// and negative images.

use image::imageops::{self, FilterType};
use image::{Rgb, Rgb32FImage, RgbImage};

/// ImageNet per-channel mean.
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet per-channel standard deviation.
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// An image-to-image transform applied to each decoded image.
pub trait Transform: Send + Sync {
    /// Apply the transform, returning the modified image.
    fn apply(&self, image: Rgb32FImage) -> Rgb32FImage;
}

/// Convert 8-bit pixels to `f32` in `[0, 1]`.
pub fn to_float(img: &RgbImage) -> Rgb32FImage {
    let (w, h) = img.dimensions();
    Rgb32FImage::from_fn(w, h, |x, y| {
        Rgb(img.get_pixel(x, y).0.map(|v| v as f32 / 255.0))
    })
}

// Built-in transforms

/// Per-channel normalization: `(x / max_pixel_value - mean) / std`.
///
/// `max_pixel_value` defaults to 1.0, matching the `[0, 1]` output of
/// [`to_float`].
#[derive(Debug, Clone)]
pub struct Normalize {
    pub mean: [f32; 3],
    pub std: [f32; 3],
    pub max_pixel_value: f32,
}

impl Normalize {
    pub fn new(mean: [f32; 3], std: [f32; 3]) -> Self {
        Self {
            mean,
            std,
            max_pixel_value: 1.0,
        }
    }

    /// The ImageNet statistics used by the default loader.
    pub fn imagenet() -> Self {
        Self::new(IMAGENET_MEAN, IMAGENET_STD)
    }

    pub fn max_pixel_value(mut self, v: f32) -> Self {
        self.max_pixel_value = v;
        self
    }
}

impl Transform for Normalize {
    fn apply(&self, mut image: Rgb32FImage) -> Rgb32FImage {
        for px in image.pixels_mut() {
            for c in 0..3 {
                px.0[c] = (px.0[c] / self.max_pixel_value - self.mean[c]) / self.std[c];
            }
        }
        image
    }
}

/// Resize to a fixed `(width, height)`.
///
/// Useful when substituted sibling images may differ in size from the
/// canonical file.
#[derive(Debug, Clone)]
pub struct Resize {
    pub width: u32,
    pub height: u32,
    pub filter: FilterType,
}

impl Resize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            filter: FilterType::Triangle,
        }
    }

    pub fn filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }
}

impl Transform for Resize {
    fn apply(&self, image: Rgb32FImage) -> Rgb32FImage {
        if image.dimensions() == (self.width, self.height) {
            return image;
        }
        imageops::resize(&image, self.width, self.height, self.filter)
    }
}

/// Chain multiple transforms.
pub struct Compose {
    transforms: Vec<Box<dyn Transform>>,
}

impl Compose {
    pub fn new(transforms: Vec<Box<dyn Transform>>) -> Self {
        Self { transforms }
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl Transform for Compose {
    fn apply(&self, mut image: Rgb32FImage) -> Rgb32FImage {
        for t in &self.transforms {
            image = t.apply(image);
        }
        image
    }
}

// Tests
