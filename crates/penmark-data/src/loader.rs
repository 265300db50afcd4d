// DataLoader: batching, shuffling, iteration over triplets

use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{thread_rng, SeedableRng};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::config::LoaderConfig;
use crate::dataset::{Dataset, Triplet, TripletIndices};
use crate::error::{DataError, Result};
use crate::reader::ResilientReader;
use crate::transform::{Compose, Normalize, Resize, Transform};
use crate::triplet::TripletDataset;

/// Configuration for the DataLoader.
#[derive(Debug, Clone)]
pub struct DataLoaderConfig {
    /// Number of triplets per batch.
    pub batch_size: usize,
    /// Whether to shuffle indices each epoch.
    pub shuffle: bool,
    /// Whether to drop the last incomplete batch.
    pub drop_last: bool,
    /// Number of parallel workers for triplet fetching (0 = sequential).
    pub num_workers: usize,
    /// Optional random seed for reproducible shuffling.
    pub seed: Option<u64>,
}

impl Default for DataLoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            shuffle: true,
            drop_last: false,
            num_workers: 0,
            seed: None,
        }
    }
}

impl DataLoaderConfig {
    pub fn batch_size(mut self, bs: usize) -> Self {
        self.batch_size = bs;
        self
    }

    pub fn shuffle(mut self, s: bool) -> Self {
        self.shuffle = s;
        self
    }

    pub fn drop_last(mut self, d: bool) -> Self {
        self.drop_last = d;
        self
    }

    pub fn num_workers(mut self, n: usize) -> Self {
        self.num_workers = n;
        self
    }

    pub fn seed(mut self, s: u64) -> Self {
        self.seed = Some(s);
        self
    }
}

/// A stacked batch of triplets.
///
/// Each buffer holds `shape = [B, 3, H, W]` values in row-major order.
#[derive(Debug, Clone)]
pub struct TripletBatch {
    pub anchor: Vec<f32>,
    pub positive: Vec<f32>,
    pub negative: Vec<f32>,
    pub shape: [usize; 4],
    /// Indices drawn for each row.
    pub indices: Vec<TripletIndices>,
}

impl TripletBatch {
    pub fn len(&self) -> usize {
        self.shape[0]
    }

    pub fn is_empty(&self) -> bool {
        self.shape[0] == 0
    }

    fn stack(triplets: Vec<Triplet>) -> Result<Self> {
        let Some(first) = triplets.first() else {
            return Err(DataError::msg("cannot stack an empty batch"));
        };
        let img_shape = first.anchor.shape;
        let per_image: usize = img_shape.iter().product();
        let n = triplets.len();

        let mut anchor = Vec::with_capacity(n * per_image);
        let mut positive = Vec::with_capacity(n * per_image);
        let mut negative = Vec::with_capacity(n * per_image);
        let mut indices = Vec::with_capacity(n);

        for t in triplets {
            for img in [&t.anchor, &t.positive, &t.negative] {
                if img.shape != img_shape {
                    return Err(DataError::ShapeMismatch {
                        expected: img_shape,
                        got: img.shape,
                    });
                }
            }
            anchor.extend_from_slice(&t.anchor.data);
            positive.extend_from_slice(&t.positive.data);
            negative.extend_from_slice(&t.negative.data);
            indices.push(t.indices);
        }

        Ok(Self {
            anchor,
            positive,
            negative,
            shape: [n, img_shape[0], img_shape[1], img_shape[2]],
            indices,
        })
    }
}

/// A DataLoader owns a Dataset and produces stacked triplet batches.
pub struct DataLoader<D: Dataset> {
    dataset: D,
    config: DataLoaderConfig,
    pool: Option<ThreadPool>,
    indices: Vec<usize>,
    epoch: u64,
}

impl<D: Dataset> DataLoader<D> {
    /// Create a new DataLoader over a dataset.
    pub fn new(dataset: D, config: DataLoaderConfig) -> Result<Self> {
        if config.batch_size == 0 {
            return Err(DataError::Config("batch_size must be at least 1".into()));
        }
        let pool = if config.num_workers > 0 {
            let pool = ThreadPoolBuilder::new()
                .num_threads(config.num_workers)
                .build()
                .map_err(|e| DataError::Config(format!("worker pool: {e}")))?;
            Some(pool)
        } else {
            None
        };
        let indices: Vec<usize> = (0..dataset.len()).collect();
        Ok(Self {
            dataset,
            config,
            pool,
            indices,
            epoch: 0,
        })
    }

    pub fn dataset(&self) -> &D {
        &self.dataset
    }

    pub fn config(&self) -> &DataLoaderConfig {
        &self.config
    }

    /// The number of batches per epoch.
    pub fn num_batches(&self) -> usize {
        if self.config.drop_last {
            self.dataset.len() / self.config.batch_size
        } else {
            self.dataset.len().div_ceil(self.config.batch_size)
        }
    }

    /// Total number of anchors.
    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    /// Anchor order for the current epoch.
    pub fn order(&self) -> &[usize] {
        &self.indices
    }

    /// Reshuffle indices (called at the start of each epoch).
    pub fn reshuffle(&mut self) {
        if self.config.shuffle {
            match self.config.seed {
                Some(seed) => {
                    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(self.epoch));
                    self.indices.shuffle(&mut rng);
                }
                None => {
                    let mut rng = thread_rng();
                    self.indices.shuffle(&mut rng);
                }
            }
        }
        self.epoch += 1;
    }

    /// Fetch a slice of triplets, in parallel when workers are configured.
    fn fetch_triplets(&self, indices: &[usize]) -> Result<Vec<Triplet>> {
        match &self.pool {
            Some(pool) if indices.len() > 1 => pool.install(|| {
                indices
                    .par_iter()
                    .map(|&i| self.dataset.get(i))
                    .collect()
            }),
            _ => indices.iter().map(|&i| self.dataset.get(i)).collect(),
        }
    }

    /// Iterate over batches one at a time, reshuffling first.
    pub fn iter_batches(&mut self) -> BatchIterator<'_, D> {
        self.reshuffle();
        BatchIterator {
            loader: self,
            batch_idx: 0,
        }
    }
}

/// Iterator that yields one batch at a time.
pub struct BatchIterator<'l, D: Dataset> {
    loader: &'l DataLoader<D>,
    batch_idx: usize,
}

impl<'l, D: Dataset> Iterator for BatchIterator<'l, D> {
    type Item = Result<TripletBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        let bs = self.loader.config.batch_size;
        let n = self.loader.dataset.len();
        let start = self.batch_idx * bs;

        if start >= n {
            return None;
        }

        if self.loader.config.drop_last && start + bs > n {
            return None;
        }

        let end = (start + bs).min(n);
        self.batch_idx += 1;

        let batch_indices = &self.loader.indices[start..end];
        Some(
            self.loader
                .fetch_triplets(batch_indices)
                .and_then(TripletBatch::stack),
        )
    }
}

// Loader factory

/// Build a triplet loader from a [`LoaderConfig`].
///
/// Images are optionally resized, then normalized with the configured
/// per-channel mean and std.
pub fn build_loader(cfg: &LoaderConfig) -> Result<DataLoader<TripletDataset>> {
    cfg.validate()?;

    let mut transforms: Vec<Box<dyn Transform>> = Vec::new();
    if let Some((w, h)) = cfg.resize {
        transforms.push(Box::new(Resize::new(w, h)));
    }
    transforms.push(Box::new(Normalize::new(cfg.mean, cfg.std)));

    let dataset =
        TripletDataset::open_with(&cfg.layout, &cfg.root, cfg.split(), cfg.sanity_check)?
            .with_reader(ResilientReader::new(cfg.max_probes))
            .with_transform(Box::new(Compose::new(transforms)));
    let dataset = match cfg.seed {
        Some(seed) => dataset.seed(seed),
        None => dataset,
    };

    let mut loader_cfg = DataLoaderConfig::default()
        .batch_size(cfg.batch_size)
        .shuffle(cfg.shuffle)
        .drop_last(cfg.drop_last)
        .num_workers(cfg.num_workers);
    loader_cfg.seed = cfg.seed;
    DataLoader::new(dataset, loader_cfg)
}

/// Shorthand for [`build_loader`] with the default layout and ImageNet
/// normalization.
pub fn get_dataloader<P: AsRef<Path>>(
    root: P,
    is_train: bool,
    sanity_check: bool,
    batch_size: usize,
    shuffle: bool,
) -> Result<DataLoader<TripletDataset>> {
    build_loader(
        &LoaderConfig::new(root)
            .is_train(is_train)
            .sanity_check(sanity_check)
            .batch_size(batch_size)
            .shuffle(shuffle),
    )
}
