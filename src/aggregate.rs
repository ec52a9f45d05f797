//! Group-level (Y) decisions built on top of mention-level predictions.

use std::collections::BTreeSet;
use std::str::FromStr;

use crate::errors::{Error, Result};
use crate::index::Index;
use crate::logistic::{Datum, LogisticClassifier, LogisticParams};

/// Fired when at least one mention predicts the label
pub const ATLEASTONCE_FEAT: &str = "atleastonce";
/// Fired when no mention predicts the label
pub const NONE_FEAT: &str = "none";
/// Weight given to the deterministic features of an untrained Y classifier
pub const BIG_WEIGHT: f64 = 10.0;

/// Labels predicted by at least one mention, excluding `nil`
pub fn deterministic_or(z_labels: &[u32], nil: u32) -> BTreeSet<u32> {
    z_labels.iter().copied().filter(|&z| z != nil).collect()
}

/// `1 - prod(1 - p)`; zero for an empty input
pub fn noisy_or<I: IntoIterator<Item = f64>>(probs: I) -> f64 {
    1.0 - probs.into_iter().fold(1.0, |acc, p| acc * (1.0 - p))
}

/// Name of the feature recording that `dst` was predicted next to `src`
pub fn cooccurrence_feature(src: &str, dst: &str) -> String {
    format!("co:s|{}|d|{}|", src, dst)
}

/// Which features summarize a Z assignment for a Y classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YFeatureModel {
    /// Only `atleastonce` / `none`
    #[default]
    AtLeastOnce,
    /// Also label co-occurrence features for known dependencies
    Dependencies,
}

impl YFeatureModel {
    pub fn as_u32(self) -> u32 {
        match self {
            Self::AtLeastOnce => 0,
            Self::Dependencies => 1,
        }
    }

    pub(crate) fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(Self::AtLeastOnce),
            1 => Some(Self::Dependencies),
            _ => None,
        }
    }
}

impl FromStr for YFeatureModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "0" => Ok(Self::AtLeastOnce),
            "1" => Ok(Self::Dependencies),
            other => Err(Error::unknown_value("feature model", other)),
        }
    }
}

/// Everything needed to compute Y features for a group
#[derive(Debug, Clone, Copy)]
pub struct YFeatureContext<'a> {
    /// Z labels; Y label ids are a prefix of this index
    pub labels: &'a Index,
    /// Id of the "no relation" label
    pub nil: u32,
    pub model: YFeatureModel,
    /// Co-occurrence features observed in training
    pub dependencies: &'a BTreeSet<String>,
}

impl YFeatureContext<'_> {
    /// Features summarizing `z_labels` from the point of view of label `y`
    pub fn extract(&self, y: u32, z_labels: &[u32]) -> Vec<String> {
        let count = z_labels.iter().filter(|&&z| z == y).count();
        if count == 0 {
            return vec![NONE_FEAT.to_string()];
        }

        let mut features = vec![ATLEASTONCE_FEAT.to_string()];
        if self.model == YFeatureModel::Dependencies {
            let y_name = self.labels.get(y).unwrap_or_default();
            let others: BTreeSet<u32> = z_labels
                .iter()
                .copied()
                .filter(|&z| z != y && z != self.nil)
                .collect();
            for z in others {
                if let Some(z_name) = self.labels.get(z) {
                    let f = cooccurrence_feature(y_name, z_name);
                    if self.dependencies.contains(&f) {
                        features.push(f);
                    }
                }
            }
        }
        features
    }
}

/// A training example for a Y classifier
#[derive(Debug, Clone, PartialEq)]
pub struct YDatum {
    pub features: Vec<String>,
    pub positive: bool,
}

/// Binary classifier deciding whether one label holds for a group
///
/// Class 0 is the label itself, class 1 is "no relation".
#[derive(Debug, Clone, PartialEq)]
pub struct YClassifier {
    label: String,
    features: Index,
    model: LogisticClassifier,
}

impl YClassifier {
    pub const POSITIVE: u32 = 0;
    pub const NEGATIVE: u32 = 1;

    /// The deterministic "at least once" classifier
    pub fn at_least_once(label: &str) -> Self {
        let features: Index = [ATLEASTONCE_FEAT, NONE_FEAT].iter().collect();
        let mut model = LogisticClassifier::new(2, features.len());
        model.set_weight(Self::POSITIVE, 0, BIG_WEIGHT);
        model.set_weight(Self::NEGATIVE, 1, BIG_WEIGHT);
        Self {
            label: label.to_string(),
            features,
            model,
        }
    }

    pub(crate) fn from_parts(label: String, features: Index, model: LogisticClassifier) -> Self {
        Self {
            label,
            features,
            model,
        }
    }

    /// Fit a new classifier for `label` to `data`
    pub fn train(label: &str, data: &[YDatum], params: &LogisticParams) -> Self {
        let mut features: Index = [ATLEASTONCE_FEAT, NONE_FEAT].iter().collect();
        let datums: Vec<Datum> = data
            .iter()
            .map(|d| {
                let ids = d.features.iter().map(|f| features.get_or_insert(f)).collect();
                let class = if d.positive {
                    Self::POSITIVE
                } else {
                    Self::NEGATIVE
                };
                Datum::new(ids, class)
            })
            .collect();
        let model = LogisticClassifier::train(2, features.len(), &datums, params);
        Self {
            label: label.to_string(),
            features,
            model,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn features(&self) -> &Index {
        &self.features
    }

    pub fn model(&self) -> &LogisticClassifier {
        &self.model
    }

    fn resolve(&self, features: &[String]) -> Vec<u32> {
        features
            .iter()
            .filter_map(|f| self.features.index_of(f))
            .collect()
    }

    /// `[P(label), P(no relation)]`
    pub fn probabilities(&self, features: &[String]) -> [f64; 2] {
        let p = self.model.probabilities(&self.resolve(features));
        [p[0], p[1]]
    }

    /// `[log P(label), log P(no relation)]`
    pub fn log_probabilities(&self, features: &[String]) -> [f64; 2] {
        let p = self.model.log_probabilities(&self.resolve(features));
        [p[0], p[1]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_or() {
        let ys = deterministic_or(&[0, 3, 2, 0, 3], 3);
        assert_eq!(ys.into_iter().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn test_noisy_or() {
        assert_eq!(noisy_or(Vec::new()), 0.0);
        assert!((noisy_or(vec![0.5, 0.5]) - 0.75).abs() < 1e-12);
        assert!((noisy_or(vec![0.9]) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_y_features() {
        let labels: Index = ["A", "B", "C", "_NR"].iter().collect();
        let deps: BTreeSet<String> = [cooccurrence_feature("A", "B")].into_iter().collect();
        let ctx = YFeatureContext {
            labels: &labels,
            nil: 3,
            model: YFeatureModel::Dependencies,
            dependencies: &deps,
        };

        assert_eq!(ctx.extract(0, &[0, 1, 2, 3]), vec!["atleastonce", "co:s|A|d|B|"]);
        assert_eq!(ctx.extract(1, &[0, 1]), vec!["atleastonce"]);
        assert_eq!(ctx.extract(2, &[0, 1, 3]), vec!["none"]);

        let plain = YFeatureContext {
            model: YFeatureModel::AtLeastOnce,
            ..ctx
        };
        assert_eq!(plain.extract(0, &[0, 1]), vec!["atleastonce"]);
    }

    #[test]
    fn test_feature_model_from_str() {
        assert_eq!("0".parse::<YFeatureModel>().unwrap(), YFeatureModel::AtLeastOnce);
        assert_eq!("1".parse::<YFeatureModel>().unwrap(), YFeatureModel::Dependencies);
        let err = "2".parse::<YFeatureModel>().unwrap_err();
        assert_eq!(err.to_string(), "unknown feature model: 2");
    }

    #[test]
    fn test_at_least_once_classifier() {
        let clf = YClassifier::at_least_once("A");
        let pos = clf.probabilities(&[ATLEASTONCE_FEAT.to_string()]);
        assert!(pos[0] > 0.99);
        let neg = clf.probabilities(&[NONE_FEAT.to_string()]);
        assert!(neg[1] > 0.99);
        let unknown = clf.probabilities(&["co:s|A|d|B|".to_string()]);
        assert!((unknown[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_train_y_classifier() {
        let data = vec![
            YDatum {
                features: vec![ATLEASTONCE_FEAT.to_string()],
                positive: true,
            },
            YDatum {
                features: vec![NONE_FEAT.to_string()],
                positive: false,
            },
            YDatum {
                features: vec![ATLEASTONCE_FEAT.to_string(), "co:s|A|d|B|".to_string()],
                positive: true,
            },
        ];
        let clf = YClassifier::train("A", &data, &LogisticParams::default());
        assert_eq!(clf.features().len(), 3);
        let p = clf.probabilities(&[ATLEASTONCE_FEAT.to_string()]);
        assert!(p[0] > p[1]);
    }
}
