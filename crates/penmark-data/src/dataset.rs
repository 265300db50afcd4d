// Dataset trait: unified interface for triplet sources

use std::path::{Path, PathBuf};

use image::Rgb32FImage;

use crate::error::{DataError, Result};

/// One resolved corpus entry: a canonical image and the writer who produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub path: PathBuf,
    pub writer_id: String,
}

/// Ordered, immutable list of resolved samples.
///
/// Built from two parallel vectors that must have the same length.
#[derive(Debug, Clone, Default)]
pub struct CorpusIndex {
    samples: Vec<Sample>,
}

impl CorpusIndex {
    /// Zip image paths with writer ids.
    ///
    /// Fails with [`DataError::LengthMismatch`] when the two lists differ in length.
    pub fn new(image_paths: Vec<PathBuf>, writer_ids: Vec<String>) -> Result<Self> {
        if image_paths.len() != writer_ids.len() {
            return Err(DataError::LengthMismatch {
                paths: image_paths.len(),
                labels: writer_ids.len(),
            });
        }
        let samples = image_paths
            .into_iter()
            .zip(writer_ids)
            .map(|(path, writer_id)| Sample { path, writer_id })
            .collect();
        Ok(Self { samples })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn get(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }

    pub fn path_of(&self, index: usize) -> &Path {
        &self.samples[index].path
    }

    pub fn writer_of(&self, index: usize) -> &str {
        &self.samples[index].writer_id
    }

    /// Writer ids in sample order.
    pub fn writer_ids(&self) -> Vec<&str> {
        self.samples.iter().map(|s| s.writer_id.as_str()).collect()
    }
}

/// A channel-first `[C, H, W]` float image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    pub data: Vec<f32>,
    pub shape: [usize; 3],
}

impl ImageTensor {
    /// Convert an interleaved `[H, W, 3]` image to planar `[3, H, W]`.
    pub fn from_rgb32f(img: &Rgb32FImage) -> Self {
        let (w, h) = img.dimensions();
        let raw = img.as_raw();
        let npix = (w * h) as usize;
        let mut data = vec![0.0f32; 3 * npix];
        for i in 0..npix {
            data[i] = raw[i * 3]; // R
            data[npix + i] = raw[i * 3 + 1]; // G
            data[2 * npix + i] = raw[i * 3 + 2]; // B
        }
        Self {
            data,
            shape: [3, h as usize, w as usize],
        }
    }

    pub fn channels(&self) -> usize {
        self.shape[0]
    }

    pub fn height(&self) -> usize {
        self.shape[1]
    }

    pub fn width(&self) -> usize {
        self.shape[2]
    }
}

/// Indices drawn for one triplet access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TripletIndices {
    pub anchor: usize,
    pub positive: usize,
    pub negative: usize,
}

/// Anchor, positive (same writer) and negative (other writer) images.
#[derive(Debug, Clone)]
pub struct Triplet {
    pub indices: TripletIndices,
    pub anchor: ImageTensor,
    pub positive: ImageTensor,
    pub negative: ImageTensor,
}

/// A dataset is an indexed collection of triplets.
///
/// Implementations must be `Send + Sync` so DataLoader can read from multiple
/// threads when parallel fetching is enabled.
pub trait Dataset: Send + Sync {
    /// Total number of anchors in the dataset.
    fn len(&self) -> usize;

    /// Whether the dataset is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Draw and load the triplet anchored at `index`.
    fn get(&self, index: usize) -> Result<Triplet>;

    /// Optional human-readable name.
    fn name(&self) -> &str {
        "dataset"
    }
}
