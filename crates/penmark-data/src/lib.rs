//! # penmark-data
//!
//! Handwriting corpus indexing and writer-triplet sampling.
//!
//! This crate provides:
//! - [`resolve`]: walk the parallel image/label trees of a corpus split into a
//!   [`CorpusIndex`] of (canonical image, writer id) samples
//! - [`IdentityIndex`]: dense integer codes for writer ids
//! - [`ResilientReader`]: image decoding that falls back to earlier siblings
//! - [`TripletDataset`]: (anchor, positive, negative) triplets as
//!   channel-first float tensors
//! - [`DataLoader`] / [`build_loader`]: shuffled, batched triplet iteration
//   - CorpusLayout: directory names and markers of the corpus tree
//   - PairedListing: lock-step walk over two sorted directory listings
//   - SamplingPolicy: positive/negative selection with an injectable RNG
//   - Transforms: Normalize, Resize, Compose

pub mod config;
pub mod dataset;
pub mod error;
pub mod identity;
pub mod label;
pub mod layout;
pub mod loader;
pub mod paired;
pub mod reader;
pub mod resolver;
pub mod sampler;
pub mod transform;
pub mod triplet;

pub use config::LoaderConfig;
pub use dataset::{CorpusIndex, Dataset, ImageTensor, Sample, Triplet, TripletIndices};
pub use error::{DataError, Result};
pub use identity::IdentityIndex;
pub use layout::{CorpusLayout, PairingMode, SanityLimits, Split};
pub use loader::{build_loader, get_dataloader, DataLoader, DataLoaderConfig, TripletBatch};
pub use paired::PairedListing;
pub use reader::ResilientReader;
pub use resolver::{resolve, resolve_with};
pub use sampler::SamplingPolicy;
pub use transform::{Compose, Normalize, Resize, Transform};
pub use triplet::TripletDataset;
