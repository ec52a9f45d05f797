use crate::index::Index;

/// Averaged-perceptron weights for one label
///
/// `avg_weights` accumulates `weights * survival_iterations` every time the
/// live vector is about to change, so at the end of training it holds the
/// time-weighted sum of every vector that was ever live.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelWeights {
    /// Label id these weights score
    label: u32,
    /// Live weights
    pub(crate) weights: Vec<f64>,
    /// Time-weighted sum of the live weights
    pub(crate) avg_weights: Vec<f64>,
    /// Number of groups seen since the last update
    survival_iterations: u64,
}

impl LabelWeights {
    pub fn new(label: u32, num_features: usize) -> Self {
        Self {
            label,
            weights: vec![0.0; num_features],
            avg_weights: vec![0.0; num_features],
            survival_iterations: 0,
        }
    }

    /// Rebuild a label from averaged weights only
    pub(crate) fn from_avg_weights(label: u32, avg_weights: Vec<f64>) -> Self {
        Self {
            label,
            weights: Vec::new(),
            avg_weights,
            survival_iterations: 0,
        }
    }

    pub fn label(&self) -> u32 {
        self.label
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn avg_weights(&self) -> &[f64] {
        &self.avg_weights
    }

    pub fn survival_iterations(&self) -> u64 {
        self.survival_iterations
    }

    /// Score a feature multiset against the live weights
    ///
    /// # Panics
    ///
    /// Panics when a feature id is outside the weight vector. Indices must not
    /// be rebuilt under existing weights.
    pub fn dot_product(&self, features: &[u32]) -> f64 {
        let mut sum = 0.0;
        for &f in features {
            match self.weights.get(f as usize) {
                Some(w) => sum += w,
                None => panic!(
                    "feature {} out of range for label {} (weight vector length {})",
                    f,
                    self.label,
                    self.weights.len()
                ),
            }
        }
        sum
    }

    /// Score feature strings against the averaged weights
    ///
    /// Features missing from `features_index` are ignored.
    pub fn avg_dot_product<S: AsRef<str>>(&self, features: &[S], feature_index: &Index) -> f64 {
        let ids: Vec<u32> = features
            .iter()
            .filter_map(|f| feature_index.index_of(f.as_ref()))
            .collect();
        self.avg_dot_product_ids(&ids)
    }

    /// Score resolved feature ids against the averaged weights
    pub fn avg_dot_product_ids(&self, features: &[u32]) -> f64 {
        features
            .iter()
            .filter_map(|&f| self.avg_weights.get(f as usize))
            .sum()
    }

    /// Add `delta` once per occurrence of each feature id
    pub fn update(&mut self, features: &[u32], delta: f64) {
        self.add_to_average();
        for &f in features {
            let len = self.weights.len();
            match self.weights.get_mut(f as usize) {
                Some(w) => *w += delta,
                None => panic!(
                    "feature {} out of range for label {} (weight vector length {})",
                    f, self.label, len
                ),
            }
        }
        self.survival_iterations = 0;
    }

    pub fn update_survival_iterations(&mut self) {
        self.survival_iterations += 1;
    }

    /// Flush the live vector into the average
    pub fn add_to_average(&mut self) {
        if self.survival_iterations == 0 {
            return;
        }
        let iters = self.survival_iterations as f64;
        for (avg, w) in self.avg_weights.iter_mut().zip(&self.weights) {
            *avg += w * iters;
        }
    }

    /// Divide the averaged weights by the number of processed groups
    pub fn normalize(&mut self, iterations: u64) {
        if iterations == 0 {
            return;
        }
        let n = iterations as f64;
        for avg in &mut self.avg_weights {
            *avg /= n;
        }
    }

    /// Drop the live weights; only the average is needed for inference
    pub fn clear(&mut self) {
        self.weights = Vec::new();
        self.survival_iterations = 0;
    }
}
