//! Latent Z label inference for the joint model's E-step.

use std::collections::BTreeSet;

use crate::aggregate::{YClassifier, YFeatureContext};

/// Joint log-score of Z assignments for one group
#[derive(Debug, Clone, Copy)]
pub struct JointScorer<'a> {
    /// Z log-probabilities of every mention, fixed during inference
    pub log_probs: &'a [Vec<f64>],
    /// Gold labels of the group
    pub positive: &'a BTreeSet<u32>,
    /// Known negative labels of the group
    pub negative: &'a BTreeSet<u32>,
    /// Y classifier of every label, indexed by label id
    pub y_classifiers: &'a [YClassifier],
    pub y_features: YFeatureContext<'a>,
}

impl JointScorer<'_> {
    /// Joint score of every candidate label of mention `s`
    ///
    /// The other mentions keep their labels from `assignment`.
    pub fn candidate_scores(&self, s: usize, assignment: &[u32]) -> Vec<f64> {
        let mut z = assignment.to_vec();
        let local = &self.log_probs[s];
        (0..local.len())
            .map(|candidate| {
                z[s] = candidate as u32;
                let mut score = local[candidate];
                for &y in self.positive {
                    let feats = self.y_features.extract(y, &z);
                    score += self.y_classifiers[y as usize].log_probabilities(&feats)
                        [YClassifier::POSITIVE as usize];
                }
                for &y in self.negative {
                    let feats = self.y_features.extract(y, &z);
                    score += self.y_classifiers[y as usize].log_probabilities(&feats)
                        [YClassifier::NEGATIVE as usize];
                }
                score
            })
            .collect()
    }
}

/// A strategy updating a group's Z labels in place
pub trait ZInference {
    /// Returns the number of mentions whose label changed
    fn infer(&self, scorer: &JointScorer<'_>, z_labels: &mut [u32]) -> usize;
}

/// Hill climbing: flip the single best mention per round until nothing improves
#[derive(Debug, Clone, Copy, Default)]
pub struct SlowInference;

/// One pass over the mentions against a snapshot of the assignment
#[derive(Debug, Clone, Copy, Default)]
pub struct StableInference;

/// Best candidate and its score, ties going to the smaller label id
fn best_candidate(scores: &[f64]) -> Option<(u32, f64)> {
    let mut best: Option<(u32, f64)> = None;
    for (c, &score) in scores.iter().enumerate() {
        let max = best.map_or(f64::NEG_INFINITY, |(_, s)| s);
        if score > max {
            best = Some((c as u32, score));
        }
    }
    best
}

fn is_uniform(scores: &[f64]) -> bool {
    match scores.split_first() {
        Some((first, rest)) if !rest.is_empty() => rest.iter().all(|s| s == first),
        _ => false,
    }
}

impl ZInference for SlowInference {
    fn infer(&self, scorer: &JointScorer<'_>, z_labels: &mut [u32]) -> usize {
        let mut flipped = vec![false; z_labels.len()];
        let mut flips = 0;

        loop {
            let mut global: Option<(usize, u32, f64)> = None;
            for s in 0..z_labels.len() {
                if flipped[s] {
                    continue;
                }
                let scores = scorer.candidate_scores(s, z_labels);
                let (label, score) = match best_candidate(&scores) {
                    Some(best) => best,
                    None => continue,
                };
                // a uniform distribution predicts nothing
                if label == z_labels[s] || is_uniform(&scores) {
                    continue;
                }
                if global.map_or(true, |(_, _, g)| score > g) {
                    global = Some((s, label, score));
                }
            }

            match global {
                Some((s, label, _)) => {
                    tracing::trace!(mention = s, from = z_labels[s], to = label, "flip");
                    z_labels[s] = label;
                    flipped[s] = true;
                    flips += 1;
                }
                None => break,
            }
        }

        let missed = scorer
            .positive
            .iter()
            .filter(|y| !z_labels.contains(y))
            .count();
        if missed > 0 {
            tracing::debug!(
                missed,
                mentions = z_labels.len(),
                gold = scorer.positive.len(),
                "gold labels left without a mention"
            );
        }
        flips
    }
}

impl ZInference for StableInference {
    fn infer(&self, scorer: &JointScorer<'_>, z_labels: &mut [u32]) -> usize {
        let snapshot = z_labels.to_vec();
        let mut flips = 0;
        for (s, z) in z_labels.iter_mut().enumerate() {
            let scores = scorer.candidate_scores(s, &snapshot);
            if let Some((label, _)) = best_candidate(&scores) {
                if label != *z {
                    *z = label;
                    flips += 1;
                }
            }
        }
        flips
    }
}
