// LoaderConfig: everything needed to build a triplet loader

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DataError, Result};
use crate::layout::{CorpusLayout, Split};
use crate::reader::DEFAULT_MAX_PROBES;
use crate::transform::{IMAGENET_MEAN, IMAGENET_STD};

/// Configuration for [`build_loader`](crate::loader::build_loader).
///
/// Deserializable from JSON; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Corpus root containing `Training/` and `Validation/`.
    pub root: PathBuf,
    /// Index the training split (`false` = validation).
    pub is_train: bool,
    /// Stop indexing early for smoke tests.
    pub sanity_check: bool,
    /// Number of triplets per batch.
    pub batch_size: usize,
    /// Whether to shuffle anchor order each epoch.
    pub shuffle: bool,
    /// Whether to drop the last incomplete batch.
    pub drop_last: bool,
    /// Number of parallel workers for triplet fetching (0 = sequential).
    pub num_workers: usize,
    /// Optional seed for both shuffling and triplet sampling.
    pub seed: Option<u64>,
    /// Optional fixed `(width, height)` applied before normalization.
    pub resize: Option<(u32, u32)>,
    /// Siblings tried when an image cannot be decoded.
    pub max_probes: usize,
    pub mean: [f32; 3],
    pub std: [f32; 3],
    pub layout: CorpusLayout,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data"),
            is_train: true,
            sanity_check: false,
            batch_size: 32,
            shuffle: true,
            drop_last: false,
            num_workers: 0,
            seed: None,
            resize: None,
            max_probes: DEFAULT_MAX_PROBES,
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
            layout: CorpusLayout::default(),
        }
    }
}

impl LoaderConfig {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Load a config from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read(path).map_err(|e| DataError::io(path, e))?;
        let cfg: Self = serde_json::from_slice(&raw).map_err(|e| DataError::Json {
            path: path.to_path_buf(),
            source: e,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn is_train(mut self, t: bool) -> Self {
        self.is_train = t;
        self
    }

    pub fn sanity_check(mut self, s: bool) -> Self {
        self.sanity_check = s;
        self
    }

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

    pub fn resize(mut self, width: u32, height: u32) -> Self {
        self.resize = Some((width, height));
        self
    }

    pub fn max_probes(mut self, n: usize) -> Self {
        self.max_probes = n;
        self
    }

    pub fn layout(mut self, layout: CorpusLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn split(&self) -> Split {
        Split::from_is_train(self.is_train)
    }

    /// Reject values the loader cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(DataError::Config("batch_size must be at least 1".into()));
        }
        if self.std.iter().any(|&s| s == 0.0) {
            return Err(DataError::Config("std must be non-zero".into()));
        }
        if matches!(self.resize, Some((0, _)) | Some((_, 0))) {
            return Err(DataError::Config("resize dimensions must be non-zero".into()));
        }
        if self.sanity_check {
            self.layout.sanity_limits(self.split()).validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let cfg = LoaderConfig::new("/corpus")
            .is_train(false)
            .sanity_check(true)
            .batch_size(8)
            .shuffle(false)
            .seed(5);
        assert_eq!(cfg.root, PathBuf::from("/corpus"));
        assert_eq!(cfg.split(), Split::Validation);
        assert!(cfg.sanity_check);
        assert_eq!(cfg.batch_size, 8);
        assert!(!cfg.shuffle);
        assert_eq!(cfg.seed, Some(5));
        assert_eq!(cfg.mean, IMAGENET_MEAN);
    }

    #[test]
    fn json_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loader.json");
        fs::write(
            &path,
            r#"{"root": "/mnt/hw", "batch_size": 4, "layout": {"traced_marker": "copy"}}"#,
        )
        .unwrap();
        let cfg = LoaderConfig::from_json_file(&path).unwrap();
        assert_eq!(cfg.root, PathBuf::from("/mnt/hw"));
        assert_eq!(cfg.batch_size, 4);
        assert!(cfg.shuffle);
        assert_eq!(cfg.layout.traced_marker, "copy");
        assert_eq!(cfg.layout.canonical_marker, "_0150_x");
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let err = LoaderConfig::default().batch_size(0).validate().unwrap_err();
        assert!(matches!(err, DataError::Config(_)));
    }

    #[test]
    fn zero_sanity_limit_only_matters_for_sanity_runs() {
        use crate::layout::SanityLimits;
        let layout = CorpusLayout::default().validation_sanity(SanityLimits::new(2, 0));
        let cfg = LoaderConfig::default().is_train(false).layout(layout);
        assert!(cfg.validate().is_ok());
        let err = cfg.sanity_check(true).validate().unwrap_err();
        assert!(matches!(err, DataError::Config(_)));
    }
}
