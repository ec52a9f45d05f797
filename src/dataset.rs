use std::collections::BTreeSet;
use std::ops::Range;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::errors::{Error, Result};
use crate::index::Index;

/// A mention is a multiset of feature ids
pub type Mention = Vec<u32>;

/// A group of mentions sharing one entity/slot-value pair
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    /// One feature vector per mention
    pub mentions: Vec<Mention>,
    /// Labels known to hold for this group
    pub positive: BTreeSet<u32>,
    /// Labels known not to hold for this group
    pub negative: BTreeSet<u32>,
}

impl Group {
    /// Number of mentions in the group
    pub fn len(&self) -> usize {
        self.mentions.len()
    }

    /// Always `false` for groups accepted by a dataset
    pub fn is_empty(&self) -> bool {
        self.mentions.is_empty()
    }
}

/// The grouped training corpus
///
/// The dataset owns the canonical label and feature indices while it is being
/// built. Extractors clone them when training starts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiLabelDataset {
    groups: Vec<Group>,
    labels: Index,
    features: Index,
}

impl MultiLabelDataset {
    /// Create an empty dataset
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of groups
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns `true` if the dataset has no groups
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn group(&self, i: usize) -> &Group {
        &self.groups[i]
    }

    /// The label index
    pub fn labels(&self) -> &Index {
        &self.labels
    }

    /// The feature index
    pub fn features(&self) -> &Index {
        &self.features
    }

    pub fn num_features(&self) -> usize {
        self.features.len()
    }

    pub fn num_labels(&self) -> usize {
        self.labels.len()
    }

    /// Total number of mentions across all groups
    pub fn num_mentions(&self) -> usize {
        self.groups.iter().map(Group::len).sum()
    }

    /// Append a group, interning its labels and features
    ///
    /// Positive labels are interned before negative ones. A group without
    /// mentions, or with a label that is both positive and negative, is
    /// rejected.
    pub fn add_group<P, N, M, F>(&mut self, positive: &[P], negative: &[N], mentions: &[M]) -> Result<()>
    where
        P: AsRef<str>,
        N: AsRef<str>,
        M: AsRef<[F]>,
        F: AsRef<str>,
    {
        if mentions.is_empty() {
            return Err(Error::invalid_argument("a group must have at least one mention"));
        }
        if let Some(label) = positive
            .iter()
            .find(|p| negative.iter().any(|n| n.as_ref() == p.as_ref()))
        {
            return Err(Error::invalid_argument(format!(
                "label {} is both positive and negative",
                label.as_ref()
            )));
        }

        let positive = positive
            .iter()
            .map(|l| self.labels.get_or_insert(l.as_ref()))
            .collect();
        let negative = negative
            .iter()
            .map(|l| self.labels.get_or_insert(l.as_ref()))
            .collect();
        let mentions = mentions
            .iter()
            .map(|m| {
                m.as_ref()
                    .iter()
                    .map(|f| self.features.get_or_insert(f.as_ref()))
                    .collect()
            })
            .collect();

        self.groups.push(Group {
            mentions,
            positive,
            negative,
        });
        Ok(())
    }

    /// Total count (over all mentions) of each feature id
    pub fn feature_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.features.len()];
        for group in &self.groups {
            for mention in &group.mentions {
                for &f in mention {
                    counts[f as usize] += 1;
                }
            }
        }
        counts
    }

    /// Expunge every feature that occurs fewer than `threshold` times
    ///
    /// Surviving features are renumbered contiguously from zero, keeping
    /// their relative order.
    pub fn apply_feature_count_threshold(&mut self, threshold: usize) {
        let counts = self.feature_counts();

        let mut new_features = Index::new();
        let mut fmap: Vec<Option<u32>> = vec![None; self.features.len()];
        for (name, old_id) in self.features.iter() {
            if counts[old_id as usize] >= threshold {
                fmap[old_id as usize] = Some(new_features.get_or_insert(name));
            }
        }

        let removed = self.features.len() - new_features.len();
        self.features = new_features;

        for group in &mut self.groups {
            for mention in &mut group.mentions {
                *mention = mention.iter().filter_map(|&f| fmap[f as usize]).collect();
            }
        }

        tracing::info!(
            threshold,
            removed,
            remaining = self.features.len(),
            "applied feature count threshold"
        );
    }

    /// Shuffle the groups in place, deterministically for a given seed
    pub fn randomize(&mut self, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        self.groups.shuffle(&mut rng);
    }

    /// Boundaries of one of `folds` contiguous folds
    ///
    /// Every fold holds `len / folds` groups; the last one also takes the
    /// remainder.
    pub fn fold_range(&self, fold: usize, folds: usize) -> Result<Range<usize>> {
        fold_range(fold, folds, self.len())
    }

    /// Build a dataset with the groups accepted by `keep`, sharing the indices
    pub fn filter_groups<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&Group) -> bool,
    {
        Self {
            groups: self.groups.iter().filter(|g| keep(g)).cloned().collect(),
            labels: self.labels.clone(),
            features: self.features.clone(),
        }
    }
}

pub(crate) fn fold_range(fold: usize, folds: usize, size: usize) -> Result<Range<usize>> {
    if folds == 0 || fold >= folds {
        return Err(Error::invalid_argument(format!(
            "fold {} out of range for {} folds",
            fold, folds
        )));
    }
    let fold_size = size / folds;
    if fold_size == 0 {
        return Err(Error::degenerate(format!(
            "cannot split {} groups into {} folds",
            size, folds
        )));
    }
    let start = fold * fold_size;
    let end = if fold == folds - 1 {
        size
    } else {
        (fold + 1) * fold_size
    };
    Ok(start..end)
}
