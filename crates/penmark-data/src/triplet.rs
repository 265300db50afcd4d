// TripletDataset: (anchor, positive, negative) handwriting triplets
//
// Every access draws a fresh positive (same writer, different sample) and
// negative (different writer) for the requested anchor, reads all three
// images through the resilient reader, applies the configured transform to
// each and returns them as channel-first float tensors.
//
// USAGE:
//
//   let ds = TripletDataset::open("data/handwriting", true, false)?
//       .with_transform(Box::new(Normalize::imagenet()));
//   let triplet = ds.get(0)?;
//
// The corpus index, identity map and sampling policy never change after
// construction. The random source is the only mutable state and sits behind a
// mutex so workers can share one dataset.

use std::path::Path;
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::dataset::{CorpusIndex, Dataset, ImageTensor, Triplet, TripletIndices};
use crate::error::{DataError, Result};
use crate::identity::IdentityIndex;
use crate::layout::{CorpusLayout, Split};
use crate::reader::ResilientReader;
use crate::resolver::resolve_with;
use crate::sampler::SamplingPolicy;
use crate::transform::{to_float, Transform};

pub struct TripletDataset<R = StdRng> {
    index: CorpusIndex,
    identity: IdentityIndex,
    policy: SamplingPolicy,
    reader: ResilientReader,
    transform: Option<Box<dyn Transform>>,
    rng: Mutex<R>,
}

impl TripletDataset<StdRng> {
    /// Wrap an already resolved corpus, seeding the sampler from entropy.
    pub fn new(index: CorpusIndex) -> Self {
        let writers = index.writer_ids();
        let identity = IdentityIndex::build(&writers);
        let policy = SamplingPolicy::new(&writers);
        Self {
            index,
            identity,
            policy,
            reader: ResilientReader::default(),
            transform: None,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Resolve `root` with the default layout and wrap the result.
    pub fn open<P: AsRef<Path>>(root: P, is_train: bool, sanity_check: bool) -> Result<Self> {
        Self::open_with(
            &CorpusLayout::default(),
            root,
            Split::from_is_train(is_train),
            sanity_check,
        )
    }

    pub fn open_with<P: AsRef<Path>>(
        layout: &CorpusLayout,
        root: P,
        split: Split,
        sanity_check: bool,
    ) -> Result<Self> {
        let index = resolve_with(layout, root.as_ref(), split, sanity_check)?;
        Ok(Self::new(index))
    }

    /// Reseed the sampler for reproducible draws.
    pub fn seed(self, seed: u64) -> Self {
        self.with_rng(StdRng::seed_from_u64(seed))
    }
}

impl<R> TripletDataset<R> {
    /// Replace the random source.
    pub fn with_rng<R2: Rng>(self, rng: R2) -> TripletDataset<R2> {
        TripletDataset {
            index: self.index,
            identity: self.identity,
            policy: self.policy,
            reader: self.reader,
            transform: self.transform,
            rng: Mutex::new(rng),
        }
    }

    pub fn with_transform(mut self, transform: Box<dyn Transform>) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn with_reader(mut self, reader: ResilientReader) -> Self {
        self.reader = reader;
        self
    }

    pub fn samples(&self) -> &CorpusIndex {
        &self.index
    }

    /// Writer id -> code map (not part of the triplet output).
    pub fn identity(&self) -> &IdentityIndex {
        &self.identity
    }

    pub fn policy(&self) -> &SamplingPolicy {
        &self.policy
    }

    fn load(&self, index: usize) -> Result<ImageTensor> {
        let raw = self.reader.read(&self.index, index)?;
        let mut img = to_float(&raw);
        if let Some(t) = &self.transform {
            img = t.apply(img);
        }
        Ok(ImageTensor::from_rgb32f(&img))
    }
}

impl<R: Rng> TripletDataset<R> {
    /// Draw positive and negative indices for `anchor` without loading images.
    pub fn draw(&self, anchor: usize) -> Result<TripletIndices> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| DataError::msg("sampler random source poisoned"))?;
        self.policy.choose(anchor, &mut *rng)
    }
}

impl<R: Rng + Send> Dataset for TripletDataset<R> {
    fn len(&self) -> usize {
        self.index.len()
    }

    fn get(&self, index: usize) -> Result<Triplet> {
        let indices = self.draw(index)?;
        Ok(Triplet {
            indices,
            anchor: self.load(indices.anchor)?,
            positive: self.load(indices.positive)?,
            negative: self.load(indices.negative)?,
        })
    }

    fn name(&self) -> &str {
        "TripletDataset"
    }
}
