//! Mention-level (Z) classifiers.

use crate::label_weights::LabelWeights;
use crate::logistic::{argmax_last, softmax, LogisticClassifier};

/// Softmax temperature used to turn perceptron scores into probabilities
pub const SOFTMAX_GAMMA: f64 = 1.0;

/// A multi-class scorer for single mentions
pub trait LocalClassifier {
    /// Number of labels scored, including the "no relation" label
    fn num_labels(&self) -> usize;

    /// Score of every label for one mention
    fn scores(&self, mention: &[u32]) -> Vec<f64>;

    /// Probability of every label for one mention
    fn probabilities(&self, mention: &[u32]) -> Vec<f64> {
        softmax(&self.scores(mention), SOFTMAX_GAMMA)
    }
}

/// Averaged-perceptron ensemble, one weight vector per label
#[derive(Debug, Clone, PartialEq)]
pub struct PerceptronClassifier {
    labels: Vec<LabelWeights>,
}

impl PerceptronClassifier {
    pub fn new(num_labels: usize, num_features: usize) -> Self {
        Self {
            labels: (0..num_labels)
                .map(|l| LabelWeights::new(l as u32, num_features))
                .collect(),
        }
    }

    pub(crate) fn from_label_weights(labels: Vec<LabelWeights>) -> Self {
        Self { labels }
    }

    pub fn label_weights(&self) -> &[LabelWeights] {
        &self.labels
    }

    pub(crate) fn label_weights_mut(&mut self) -> &mut [LabelWeights] {
        &mut self.labels
    }

    /// Scores against the live weights, used while training
    pub fn live_scores(&self, mention: &[u32]) -> Vec<f64> {
        self.labels.iter().map(|lw| lw.dot_product(mention)).collect()
    }

    /// Increment every label's survival counter
    pub fn survive(&mut self) {
        for lw in &mut self.labels {
            lw.update_survival_iterations();
        }
    }

    /// Flush the live weights into the average and normalize it
    pub fn finalize(&mut self, iterations: u64) {
        for lw in &mut self.labels {
            lw.add_to_average();
            lw.normalize(iterations);
        }
    }
}

impl LocalClassifier for PerceptronClassifier {
    fn num_labels(&self) -> usize {
        self.labels.len()
    }

    fn scores(&self, mention: &[u32]) -> Vec<f64> {
        self.labels
            .iter()
            .map(|lw| lw.avg_dot_product_ids(mention))
            .collect()
    }
}

impl LocalClassifier for LogisticClassifier {
    fn num_labels(&self) -> usize {
        LogisticClassifier::num_labels(self)
    }

    fn scores(&self, mention: &[u32]) -> Vec<f64> {
        LogisticClassifier::scores(self, mention)
    }

    fn probabilities(&self, mention: &[u32]) -> Vec<f64> {
        LogisticClassifier::probabilities(self, mention)
    }
}

/// Fold classifiers voting with equal weight
#[derive(Debug, Clone, Copy)]
pub struct FoldEnsemble<'a> {
    folds: &'a [LogisticClassifier],
}

impl<'a> FoldEnsemble<'a> {
    pub fn new(folds: &'a [LogisticClassifier]) -> Self {
        Self { folds }
    }
}

impl LocalClassifier for FoldEnsemble<'_> {
    fn num_labels(&self) -> usize {
        self.folds.first().map_or(0, |c| c.num_labels())
    }

    /// Averaged fold probabilities
    fn scores(&self, mention: &[u32]) -> Vec<f64> {
        self.probabilities(mention)
    }

    fn probabilities(&self, mention: &[u32]) -> Vec<f64> {
        let mut probs = vec![0.0; self.num_labels()];
        for fold in self.folds {
            for (acc, p) in probs.iter_mut().zip(fold.probabilities(mention)) {
                *acc += p;
            }
        }
        let n = self.folds.len() as f64;
        if n > 0.0 {
            for p in &mut probs {
                *p /= n;
            }
        }
        probs
    }
}

/// Perceptron decision rule: best strictly positive label, else `nil`
///
/// Ties go to the larger label id.
pub fn predict_label(scores: &[f64], nil: u32) -> u32 {
    match argmax_last(scores) {
        Some(best) if scores[best] > 0.0 => best as u32,
        _ => nil,
    }
}
