//! Multinomial logistic regression trained with L-BFGS.

/// One weighted training example
#[derive(Debug, Clone, PartialEq)]
pub struct Datum {
    /// Feature multiset
    pub features: Vec<u32>,
    /// Gold label id
    pub label: u32,
    /// Contribution of the datum to the objective
    pub weight: f64,
}

impl Datum {
    pub fn new(features: Vec<u32>, label: u32) -> Self {
        Self::with_weight(features, label, 1.0)
    }

    pub fn with_weight(features: Vec<u32>, label: u32, weight: f64) -> Self {
        Self {
            features,
            label,
            weight,
        }
    }
}

/// Optimizer settings for one logistic model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogisticParams {
    /// Standard deviation of the Gaussian prior on every weight
    pub sigma: f64,
    /// Maximum number of L-BFGS iterations
    pub max_iterations: usize,
    /// Convergence threshold on the gradient norm
    pub epsilon: f64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            sigma: 1.0,
            max_iterations: 100,
            epsilon: 1e-4,
        }
    }
}

/// Numerically stable `log(sum(exp(x)))`
pub fn log_sum_exp(xs: &[f64]) -> f64 {
    let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + xs.iter().map(|x| (x - max).exp()).sum::<f64>().ln()
}

/// Softmax of `gamma * scores`
pub fn softmax(scores: &[f64], gamma: f64) -> Vec<f64> {
    let scaled: Vec<f64> = scores.iter().map(|s| s * gamma).collect();
    let z = log_sum_exp(&scaled);
    scaled.iter().map(|s| (s - z).exp()).collect()
}

/// Linear multi-class model, `weights[label * num_features + feature]`
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticClassifier {
    num_labels: usize,
    num_features: usize,
    weights: Vec<f64>,
}

impl LogisticClassifier {
    /// A zero-weight model, uniform over every label
    pub fn new(num_labels: usize, num_features: usize) -> Self {
        Self {
            num_labels,
            num_features,
            weights: vec![0.0; num_labels * num_features],
        }
    }

    pub(crate) fn from_weights(num_labels: usize, num_features: usize, weights: Vec<f64>) -> Self {
        debug_assert_eq!(weights.len(), num_labels * num_features);
        Self {
            num_labels,
            num_features,
            weights,
        }
    }

    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn weight(&self, label: u32, feature: u32) -> f64 {
        self.weights[label as usize * self.num_features + feature as usize]
    }

    pub fn set_weight(&mut self, label: u32, feature: u32, value: f64) {
        self.weights[label as usize * self.num_features + feature as usize] = value;
    }

    /// Raw linear score of every label
    pub fn scores(&self, features: &[u32]) -> Vec<f64> {
        scores_with(&self.weights, self.num_labels, self.num_features, features)
    }

    pub fn probabilities(&self, features: &[u32]) -> Vec<f64> {
        softmax(&self.scores(features), 1.0)
    }

    pub fn log_probabilities(&self, features: &[u32]) -> Vec<f64> {
        let scores = self.scores(features);
        let z = log_sum_exp(&scores);
        scores.iter().map(|s| s - z).collect()
    }

    /// Fit a fresh model to `data`
    ///
    /// Minimizes the weighted negative log-likelihood plus an L2 prior of
    /// `w^2 / (2 sigma^2)`. When the optimizer fails (typically a line search
    /// running into rounding errors close to the optimum), the weights reached
    /// so far are kept.
    pub fn train(
        num_labels: usize,
        num_features: usize,
        data: &[Datum],
        params: &LogisticParams,
    ) -> Self {
        let dims = num_labels * num_features;
        let mut weights = vec![0.0; dims];
        if dims == 0 || data.is_empty() {
            return Self::from_weights(num_labels, num_features, weights);
        }

        let inv_var = 1.0 / (params.sigma * params.sigma);

        // Objective function: weighted negative log-likelihood + Gaussian prior
        let evaluate = |x: &[f64], gx: &mut [f64]| -> Result<f64, anyhow::Error> {
            gx.fill(0.0);
            let mut loss = 0.0;

            for datum in data {
                let scores = scores_with(x, num_labels, num_features, &datum.features);
                let log_z = log_sum_exp(&scores);
                loss -= datum.weight * (scores[datum.label as usize] - log_z);

                // gradient = expected - observed
                for (label, score) in scores.iter().enumerate() {
                    let mut coef = (score - log_z).exp();
                    if label == datum.label as usize {
                        coef -= 1.0;
                    }
                    let coef = coef * datum.weight;
                    if coef == 0.0 {
                        continue;
                    }
                    let base = label * num_features;
                    for &f in &datum.features {
                        gx[base + f as usize] += coef;
                    }
                }
            }

            for (g, w) in gx.iter_mut().zip(x) {
                *g += w * inv_var;
                loss += w * w * inv_var / 2.0;
            }

            Ok(loss)
        };

        let progress = |prgr: &liblbfgs::Progress| -> bool {
            tracing::trace!(
                iteration = prgr.niter,
                loss = prgr.fx,
                xnorm = prgr.xnorm,
                gnorm = prgr.gnorm,
                "L-BFGS progress"
            );
            false
        };

        let result = liblbfgs::lbfgs()
            .with_max_iterations(params.max_iterations)
            .with_epsilon(params.epsilon)
            .with_linesearch_algorithm("MoreThuente")
            .minimize(&mut weights, evaluate, progress);

        match result {
            Ok(report) => tracing::debug!(loss = report.fx, datums = data.len(), "trained logistic model"),
            Err(e) => tracing::warn!("L-BFGS stopped early, keeping current weights: {}", e),
        }

        Self::from_weights(num_labels, num_features, weights)
    }
}

fn scores_with(weights: &[f64], num_labels: usize, num_features: usize, features: &[u32]) -> Vec<f64> {
    (0..num_labels)
        .map(|label| {
            let row = &weights[label * num_features..(label + 1) * num_features];
            features
                .iter()
                .filter_map(|&f| row.get(f as usize))
                .sum()
        })
        .collect()
}

/// Index of the largest value, ties going to the larger index
pub(crate) fn argmax_last(values: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some(b) if values[b] > v => {}
            _ => best = Some(i),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        let p = softmax(&[1.0, 2.0, 3.0], 1.0);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(p[2] > p[1] && p[1] > p[0]);

        let uniform = softmax(&[1000.0, 1000.0], 1.0);
        assert!((uniform[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_log_sum_exp_is_stable() {
        let v = log_sum_exp(&[1000.0, 1000.0]);
        assert!((v - (1000.0 + 2f64.ln())).abs() < 1e-9);
        assert_eq!(log_sum_exp(&[]), f64::NEG_INFINITY);
    }

    #[test]
    fn test_argmax_last_breaks_ties_to_larger_index() {
        assert_eq!(argmax_last(&[1.0, 3.0, 3.0, 0.0]), Some(2));
        assert_eq!(argmax_last(&[]), None);
    }

    #[test]
    fn test_untrained_model_is_uniform() {
        let model = LogisticClassifier::new(4, 3);
        for p in model.probabilities(&[0, 1, 2]) {
            assert!((p - 0.25).abs() < 1e-12);
        }
    }

    #[test]
    fn test_train_separable_data() {
        let data = vec![
            Datum::new(vec![0], 0),
            Datum::new(vec![0, 2], 0),
            Datum::new(vec![1], 1),
            Datum::new(vec![1, 2], 1),
        ];
        let params = LogisticParams {
            sigma: 1.0,
            max_iterations: 50,
            epsilon: 1e-5,
        };
        let model = LogisticClassifier::train(2, 3, &data, &params);
        assert!(model.probabilities(&[0])[0] > 0.7);
        assert!(model.probabilities(&[1])[1] > 0.7);
        assert!(model.weight(0, 0) > 0.0);
        assert!(model.weight(1, 0) < 0.0);
    }

    #[test]
    fn test_datum_weights_shift_the_decision() {
        let data = vec![
            Datum::with_weight(vec![0], 0, 0.2),
            Datum::with_weight(vec![0], 1, 1.0),
        ];
        let model = LogisticClassifier::train(2, 1, &data, &LogisticParams::default());
        let p = model.probabilities(&[0]);
        assert!(p[1] > p[0]);
    }
}
