// CorpusLayout: fixed names of the handwriting corpus tree
//
// The corpus is two parallel trees per split, one holding images and one
// holding per-writer JSON labels:
//
//   root/
//     Training/
//       01.원천데이터/TS_images/<sentence>/<writer-attempt>/<variant>/*_0150_x*.png
//       02.라벨링데이터/TL_labels/<sentence>/<writer-attempt>/<variant>/labels(sent1).json
//     Validation/
//       01.원천데이터/VS_images/...
//       02.라벨링데이터/VL_labels/...
//
// Every name below can be overridden; the defaults describe the published corpus.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DataError, Result};

/// Which half of the corpus to index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Split {
    Training,
    Validation,
}

impl Split {
    pub fn from_is_train(is_train: bool) -> Self {
        if is_train {
            Split::Training
        } else {
            Split::Validation
        }
    }
}

/// How the image and label listings are aligned at the sentence and
/// writer-attempt levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PairingMode {
    /// Entries are aligned by sorted name and must carry the same name.
    #[default]
    Strict,
    /// Entries are aligned by sorted position only.
    ListingOrder,
}

/// Early-stop limits for sanity-check runs.
///
/// Both limits count listing positions, traced writer-attempts included, and
/// must be at least 1. [`SanityLimits::validate`] rejects zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanityLimits {
    /// Sentence groups visited before stopping.
    pub sentence_groups: usize,
    /// Writer-attempts visited per sentence group before moving on.
    pub writer_attempts: usize,
}

impl SanityLimits {
    pub fn new(sentence_groups: usize, writer_attempts: usize) -> Self {
        Self {
            sentence_groups,
            writer_attempts,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.sentence_groups == 0 || self.writer_attempts == 0 {
            return Err(DataError::Config(format!(
                "sanity limits must be at least 1, got {}x{}",
                self.sentence_groups, self.writer_attempts
            )));
        }
        Ok(())
    }
}

/// Names and markers describing one corpus on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusLayout {
    pub training_dir: String,
    pub validation_dir: String,
    /// Parent of the image branch (`<split>/<image_root>/<prefix>S_images`).
    pub image_root: String,
    /// Parent of the label branch (`<split>/<label_root>/<prefix>L_labels`).
    pub label_root: String,
    /// Writer-attempt folders whose name contains this are traced copies.
    pub traced_marker: String,
    /// Canonical-resolution image files contain this in their name.
    pub canonical_marker: String,
    /// Label file read from the first label variant folder.
    pub label_file: String,
    pub pairing: PairingMode,
    pub train_sanity: SanityLimits,
    pub validation_sanity: SanityLimits,
}

impl Default for CorpusLayout {
    fn default() -> Self {
        Self {
            training_dir: "Training".to_string(),
            validation_dir: "Validation".to_string(),
            image_root: "01.원천데이터".to_string(),
            label_root: "02.라벨링데이터".to_string(),
            traced_marker: "모사".to_string(),
            canonical_marker: "_0150_x".to_string(),
            label_file: "labels(sent1).json".to_string(),
            pairing: PairingMode::Strict,
            train_sanity: SanityLimits::new(4, 4),
            validation_sanity: SanityLimits::new(2, 2),
        }
    }
}

impl CorpusLayout {
    pub fn traced_marker(mut self, marker: impl Into<String>) -> Self {
        self.traced_marker = marker.into();
        self
    }

    pub fn canonical_marker(mut self, marker: impl Into<String>) -> Self {
        self.canonical_marker = marker.into();
        self
    }

    pub fn label_file(mut self, name: impl Into<String>) -> Self {
        self.label_file = name.into();
        self
    }

    pub fn pairing(mut self, mode: PairingMode) -> Self {
        self.pairing = mode;
        self
    }

    pub fn train_sanity(mut self, limits: SanityLimits) -> Self {
        self.train_sanity = limits;
        self
    }

    pub fn validation_sanity(mut self, limits: SanityLimits) -> Self {
        self.validation_sanity = limits;
        self
    }

    fn split_dir(&self, root: &Path, split: Split) -> PathBuf {
        match split {
            Split::Training => root.join(&self.training_dir),
            Split::Validation => root.join(&self.validation_dir),
        }
    }

    fn prefix(split: Split) -> &'static str {
        match split {
            Split::Training => "T",
            Split::Validation => "V",
        }
    }

    /// Root of the image branch for `split`.
    pub fn image_branch(&self, root: &Path, split: Split) -> PathBuf {
        self.split_dir(root, split)
            .join(&self.image_root)
            .join(format!("{}S_images", Self::prefix(split)))
    }

    /// Root of the label branch for `split`.
    pub fn label_branch(&self, root: &Path, split: Split) -> PathBuf {
        self.split_dir(root, split)
            .join(&self.label_root)
            .join(format!("{}L_labels", Self::prefix(split)))
    }

    pub fn sanity_limits(&self, split: Split) -> SanityLimits {
        match split {
            Split::Training => self.train_sanity,
            Split::Validation => self.validation_sanity,
        }
    }

    pub fn is_traced(&self, attempt_name: &str) -> bool {
        !self.traced_marker.is_empty() && attempt_name.contains(&self.traced_marker)
    }

    pub fn is_canonical(&self, file_name: &str) -> bool {
        file_name.contains(&self.canonical_marker)
    }
}
