use std::path::PathBuf;

/// All errors that can occur while indexing or sampling a handwriting corpus.
///
/// Corpus-structure variants (`KeyMismatch`, `SubfolderCountMismatch`,
/// `WriterMismatch`, `MissingCanonical`, `LengthMismatch`) abort dataset
/// construction. Read failures on a single image are recovered inside the
/// reader and only surface as `ProbeExhausted` or a fatal `Image`/`Io` error.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// I/O failure on a specific path.
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A label document is not valid JSON.
    #[error("json parse error at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A label document has no usable `person.id`.
    #[error("label {path} has no person.id field")]
    MissingLabelField { path: PathBuf },

    /// Expected a directory.
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Two paired listings disagree on the entry name at the same position.
    #[error("paired entries disagree at position {position}: image {image:?} vs label {label:?}")]
    KeyMismatch {
        position: usize,
        image: PathBuf,
        label: PathBuf,
    },

    /// A writer-attempt has a different number of image and label variant folders.
    #[error("variant folder count mismatch: {images} image folders ({image_dir:?}) vs {labels} label folders ({label_dir:?})")]
    SubfolderCountMismatch {
        images: usize,
        labels: usize,
        image_dir: PathBuf,
        label_dir: PathBuf,
    },

    /// An image and its label belong to different writer-attempts.
    #[error("writer segment mismatch: image {image:?} ({image_writer}) vs label {label:?} ({label_writer})")]
    WriterMismatch {
        image: PathBuf,
        label: PathBuf,
        image_writer: String,
        label_writer: String,
    },

    /// No file in a variant folder carries the canonical-resolution marker.
    #[error("no file matching {marker:?} in {dir:?}")]
    MissingCanonical { dir: PathBuf, marker: String },

    /// Resolved image paths and writer ids have different lengths.
    #[error("resolved {paths} image paths but {labels} writer ids")]
    LengthMismatch { paths: usize, labels: usize },

    /// Image decode failure that is not retried.
    #[error("image error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The backward probe ran out of sibling files or retries.
    #[error("no decodable image near {path} after {attempts} attempts")]
    ProbeExhausted { path: PathBuf, attempts: usize },

    /// The anchor's writer has no other sample.
    #[error("writer {writer:?} of anchor {anchor} has no other sample to use as positive")]
    NoPositive { anchor: usize, writer: String },

    /// Every sample belongs to the anchor's writer.
    #[error("writer {writer:?} of anchor {anchor} has no other writer to use as negative")]
    NoNegative { anchor: usize, writer: String },

    /// Index beyond the dataset length.
    #[error("index {index} out of range for dataset of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Images in one batch do not share a shape.
    #[error("shape mismatch in batch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: [usize; 3], got: [usize; 3] },

    /// Invalid loader or layout configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Generic message for cases not covered above.
    #[error("{0}")]
    Msg(String),
}

impl DataError {
    /// Create an error from any string message.
    pub fn msg(s: impl Into<String>) -> Self {
        DataError::Msg(s.into())
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DataError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias used throughout penmark-data.
pub type Result<T> = std::result::Result<T, DataError>;
