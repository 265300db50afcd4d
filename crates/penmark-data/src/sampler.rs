// SamplingPolicy: positive/negative index selection for triplets
//
// Indices are grouped by writer once at construction. A draw picks the
// positive uniformly among the anchor writer's other samples and the negative
// uniformly among all samples of other writers, using whatever random source
// the caller passes in.

use std::collections::HashMap;

use rand::Rng;

use crate::dataset::TripletIndices;
use crate::error::{DataError, Result};

/// Precomputed writer groups over a fixed list of writer ids.
#[derive(Debug, Clone, Default)]
pub struct SamplingPolicy {
    /// Group number of each sample.
    group_of: Vec<usize>,
    /// Sorted sample indices of each group.
    groups: Vec<Vec<usize>>,
    /// Writer id of each group.
    writers: Vec<String>,
}

impl SamplingPolicy {
    pub fn new<S: AsRef<str>>(writer_ids: &[S]) -> Self {
        let mut lookup: HashMap<&str, usize> = HashMap::new();
        let mut group_of = Vec::with_capacity(writer_ids.len());
        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut writers = Vec::new();
        for (i, id) in writer_ids.iter().enumerate() {
            let id = id.as_ref();
            let g = *lookup.entry(id).or_insert_with(|| {
                groups.push(Vec::new());
                writers.push(id.to_string());
                groups.len() - 1
            });
            groups[g].push(i);
            group_of.push(g);
        }
        Self {
            group_of,
            groups,
            writers,
        }
    }

    /// Number of samples covered.
    pub fn len(&self) -> usize {
        self.group_of.len()
    }

    pub fn is_empty(&self) -> bool {
        self.group_of.is_empty()
    }

    /// Number of distinct writers.
    pub fn num_writers(&self) -> usize {
        self.groups.len()
    }

    fn group(&self, anchor: usize) -> Result<usize> {
        self.group_of
            .get(anchor)
            .copied()
            .ok_or(DataError::IndexOutOfRange {
                index: anchor,
                len: self.len(),
            })
    }

    /// Indices sharing the anchor's writer, excluding the anchor.
    pub fn positive_candidates(&self, anchor: usize) -> Result<Vec<usize>> {
        let g = self.group(anchor)?;
        Ok(self.groups[g]
            .iter()
            .copied()
            .filter(|&i| i != anchor)
            .collect())
    }

    /// Indices with a different writer than the anchor.
    pub fn negative_candidates(&self, anchor: usize) -> Result<Vec<usize>> {
        let g = self.group(anchor)?;
        Ok((0..self.len()).filter(|&i| self.group_of[i] != g).collect())
    }

    /// Draw a positive and a negative index for `anchor`.
    ///
    /// Fails with [`DataError::NoPositive`] when the anchor's writer has a single
    /// sample and with [`DataError::NoNegative`] when every sample belongs to
    /// that writer.
    pub fn choose<R: Rng + ?Sized>(&self, anchor: usize, rng: &mut R) -> Result<TripletIndices> {
        let g = self.group(anchor)?;
        let group = &self.groups[g];
        if group.len() < 2 {
            return Err(DataError::NoPositive {
                anchor,
                writer: self.writers[g].clone(),
            });
        }
        let negatives = self.len() - group.len();
        if negatives == 0 {
            return Err(DataError::NoNegative {
                anchor,
                writer: self.writers[g].clone(),
            });
        }

        // k-th member of the group, skipping the anchor itself
        let anchor_pos = group.partition_point(|&i| i < anchor);
        let k = rng.gen_range(0..group.len() - 1);
        let positive = if k < anchor_pos { group[k] } else { group[k + 1] };

        // k-th index outside the (sorted) group
        let mut negative = rng.gen_range(0..negatives);
        for &member in group {
            if member <= negative {
                negative += 1;
            } else {
                break;
            }
        }

        Ok(TripletIndices {
            anchor,
            positive,
            negative,
        })
    }
}
