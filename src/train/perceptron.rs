use std::collections::BTreeMap;

use crate::aggregate::{deterministic_or, noisy_or};
use crate::dataset::{Group, MultiLabelDataset};
use crate::errors::{Error, Result};
use crate::extractor::{RelationExtractor, UNRELATED};
use crate::index::Index;
use crate::label_weights::LabelWeights;
use crate::local::{predict_label, LocalClassifier, PerceptronClassifier};
use crate::logistic::argmax_last;
use crate::model::{Header, ModelReader, Sections};
use crate::score::Score;

use super::at_least_once;
use super::config::{ExtractorConfig, ModelType};
use super::model_writer::ModelWriter;

/// Per-epoch update counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateStats {
    /// `+1` updates on real labels
    pub positive: usize,
    /// `-1` updates on real labels
    pub negative: usize,
    /// Updates on the "no relation" label
    pub nil: usize,
}

/// Weight updates applied while processing one group
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupUpdate {
    /// Label predicted for every mention before the update
    pub z_predicted: Vec<u32>,
    /// `(mention, label)` pairs that received `+1`
    pub positive: Vec<(usize, u32)>,
    /// `(mention, label)` pairs that received `-1`
    pub negative: Vec<(usize, u32)>,
}

impl GroupUpdate {
    pub fn is_empty(&self) -> bool {
        self.positive.is_empty() && self.negative.is_empty()
    }

    pub(crate) fn apply(
        &mut self,
        clf: &mut PerceptronClassifier,
        group: &Group,
        mention: usize,
        label: u32,
        delta: f64,
    ) {
        clf.label_weights_mut()[label as usize].update(&group.mentions[mention], delta);
        if delta > 0.0 {
            self.positive.push((mention, label));
        } else {
            self.negative.push((mention, label));
        }
    }

    pub(crate) fn record(&self, nil: u32, stats: &mut UpdateStats) {
        for &(_, label) in self.positive.iter().chain(&self.negative) {
            if label == nil {
                stats.nil += 1;
            }
        }
        stats.positive += self.positive.iter().filter(|&&(_, l)| l != nil).count();
        stats.negative += self.negative.iter().filter(|&&(_, l)| l != nil).count();
    }
}

/// One local perceptron step over a group
///
/// With `incomplete`, a wrong prediction is only penalized when it is a
/// known negative of the group.
pub fn train_local_group(
    clf: &mut PerceptronClassifier,
    group: &Group,
    nil: u32,
    incomplete: bool,
) -> GroupUpdate {
    let mut update = GroupUpdate::default();

    for m in 0..group.len() {
        let scores = clf.live_scores(&group.mentions[m]);
        let pred = predict_label(&scores, nil);
        update.z_predicted.push(pred);

        for &gold in &group.positive {
            if gold != nil && gold != pred {
                update.apply(clf, group, m, gold, 1.0);
            }
        }
        if group.positive.is_empty() && pred != nil {
            update.apply(clf, group, m, nil, 1.0);
        }
        if pred != nil
            && !group.positive.contains(&pred)
            && (!incomplete || group.negative.contains(&pred))
        {
            update.apply(clf, group, m, pred, -1.0);
        }
        if pred == nil && !group.positive.is_empty() {
            update.apply(clf, group, m, nil, -1.0);
        }
    }

    update
}

/// Averaged perceptron extractors: `atleastonce`, `perceptron` and `perceptron_inc`
#[derive(Debug, Clone)]
pub struct PerceptronExtractor {
    config: ExtractorConfig,
    labels: Index,
    features: Index,
    classifier: Option<PerceptronClassifier>,
}

impl PerceptronExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self {
            config,
            labels: Index::new(),
            features: Index::new(),
            classifier: None,
        }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Trained label weights, `None` until trained or loaded
    pub fn label_weights(&self) -> Option<&[LabelWeights]> {
        self.classifier.as_ref().map(|c| c.label_weights())
    }

    fn nil(&self) -> u32 {
        self.labels.index_of(UNRELATED).unwrap_or(0)
    }

    pub(crate) fn read(reader: &mut ModelReader<'_>, header: Header) -> Result<Self> {
        if !header.sections.contains(Sections::PERCEPTRON) {
            return Err(Error::invalid_format("missing perceptron section"));
        }
        let features = reader.read_index()?;
        let labels = reader.read_index()?;
        if labels.is_empty() || labels.index_of(UNRELATED) != Some(labels.len() as u32 - 1) {
            return Err(Error::invalid_format(format!(
                "{} must be the last label",
                UNRELATED
            )));
        }
        let num_labels = reader.read_u32()? as usize;
        if num_labels != labels.len() {
            return Err(Error::invalid_format(format!(
                "{} weight vectors for {} labels",
                num_labels,
                labels.len()
            )));
        }
        let mut weights = Vec::with_capacity(num_labels);
        for label in 0..num_labels {
            let len = reader.read_u32()? as usize;
            if len != features.len() {
                return Err(Error::invalid_format(format!(
                    "weight vector of length {} for {} features",
                    len,
                    features.len()
                )));
            }
            weights.push(LabelWeights::from_avg_weights(
                label as u32,
                reader.read_f64s(len)?,
            ));
        }

        Ok(Self {
            config: ExtractorConfig::new(header.model_type),
            labels,
            features,
            classifier: Some(PerceptronClassifier::from_label_weights(weights)),
        })
    }

    /// Group-level predictions with the live weights, for training diagnostics
    fn training_score(&self, clf: &PerceptronClassifier, data: &MultiLabelDataset) -> Score {
        let nil = self.nil();
        let mut score = Score::new();
        for group in data.groups() {
            let z: Vec<u32> = group
                .mentions
                .iter()
                .map(|m| predict_label(&clf.live_scores(m), nil))
                .collect();
            score.add(&deterministic_or(&z, nil), &group.positive);
        }
        score
    }
}

impl RelationExtractor for PerceptronExtractor {
    fn model_type(&self) -> ModelType {
        self.config.model()
    }

    fn train(&mut self, data: &mut MultiLabelDataset) -> Result<()> {
        let model_type = self.config.model();
        if !model_type.is_perceptron() {
            return Err(Error::invalid_argument(format!(
                "{} is not a perceptron model",
                model_type
            )));
        }
        if self.config.feature_count_threshold() > 1 {
            data.apply_feature_count_threshold(self.config.feature_count_threshold());
        }
        if data.is_empty() {
            return Err(Error::degenerate("no training groups"));
        }
        if data.labels().contains(UNRELATED) {
            return Err(Error::invalid_argument(format!(
                "label {} is reserved",
                UNRELATED
            )));
        }

        let mut labels = data.labels().clone();
        let nil = labels.get_or_insert(UNRELATED);
        self.labels = labels;
        self.features = data.features().clone();

        tracing::info!(
            model = %model_type,
            features = self.features.len(),
            labels = self.labels.len(),
            groups = data.len(),
            "training perceptron model"
        );

        let mut clf = PerceptronClassifier::new(self.labels.len(), self.features.len());
        let mut iterations = 0u64;
        for epoch in 0..self.config.epochs() {
            data.randomize(epoch as u64);
            let mut stats = UpdateStats::default();

            for group in data.groups() {
                iterations += 1;
                let update = match model_type {
                    ModelType::AtLeastOnce => at_least_once::train_group(&mut clf, group, nil),
                    ModelType::PerceptronIncomplete => {
                        train_local_group(&mut clf, group, nil, true)
                    }
                    _ => train_local_group(&mut clf, group, nil, false),
                };
                update.record(nil, &mut stats);
                clf.survive();
            }

            tracing::info!(
                epoch,
                groups = data.len(),
                positive_updates = stats.positive,
                negative_updates = stats.negative,
                nil_updates = stats.nil,
                "epoch completed"
            );
            if model_type != ModelType::AtLeastOnce {
                let score = self.training_score(&clf, data);
                tracing::info!(epoch, %score, "training score");
            }
        }

        clf.finalize(iterations);
        for lw in clf.label_weights_mut() {
            lw.clear();
        }
        tracing::info!(iterations, "perceptron training completed");
        self.classifier = Some(clf);
        Ok(())
    }

    fn feature_index(&self) -> Option<&Index> {
        self.classifier.as_ref().map(|_| &self.features)
    }

    fn label_index(&self) -> Option<&Index> {
        self.classifier.as_ref().map(|_| &self.labels)
    }

    /// Noisy-or over the softmax probability of each mention's top label
    fn classify_ids(&self, mentions: &[Vec<u32>]) -> Result<BTreeMap<u32, f64>> {
        let clf = self.classifier.as_ref().ok_or(Error::NotTrained)?;
        let nil = self.nil();

        let mut tops: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
        for mention in mentions {
            let probs = clf.probabilities(mention);
            if let Some(top) = argmax_last(&probs) {
                if top as u32 != nil {
                    tops.entry(top as u32).or_default().push(probs[top]);
                }
            }
        }

        Ok(tops
            .into_iter()
            .map(|(label, probs)| (label, noisy_or(probs)))
            .collect())
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        let clf = self.classifier.as_ref().ok_or(Error::NotTrained)?;
        let mut w = ModelWriter::new(Vec::new());
        w.write_header(self.model_type(), Sections::PERCEPTRON)?;
        w.write_index(&self.features)?;
        w.write_index(&self.labels)?;
        w.write_len(clf.label_weights().len())?;
        for lw in clf.label_weights() {
            w.write_len(lw.avg_weights().len())?;
            w.write_f64s(lw.avg_weights())?;
        }
        Ok(w.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: u32 = 0;
    const B: u32 = 1;
    const NIL: u32 = 2;

    fn group(positive: &[u32], negative: &[u32]) -> Group {
        Group {
            mentions: vec![vec![0], vec![1]],
            positive: positive.iter().copied().collect(),
            negative: negative.iter().copied().collect(),
        }
    }

    #[test]
    fn test_local_update_on_empty_weights() {
        let mut clf = PerceptronClassifier::new(3, 2);
        let update = train_local_group(&mut clf, &group(&[A], &[]), NIL, false);
        assert_eq!(update.z_predicted, vec![NIL, NIL]);
        assert_eq!(update.positive, vec![(0, A), (1, A)]);
        assert_eq!(update.negative, vec![(0, NIL), (1, NIL)]);
        assert_eq!(clf.live_scores(&[0]), vec![1.0, 0.0, -1.0]);
    }

    #[test]
    fn test_local_update_for_unrelated_group() {
        let mut clf = PerceptronClassifier::new(3, 2);
        clf.label_weights_mut()[B as usize].update(&[0], 1.0);
        let update = train_local_group(&mut clf, &group(&[], &[]), NIL, false);
        assert_eq!(update.z_predicted, vec![B, NIL]);
        assert_eq!(update.positive, vec![(0, NIL)]);
        assert_eq!(update.negative, vec![(0, B)]);
    }

    #[test]
    fn test_incomplete_negatives() {
        let mut clf = PerceptronClassifier::new(3, 2);
        clf.label_weights_mut()[B as usize].update(&[0], 1.0);
        // B is neither positive nor negative: unknown, no penalty
        let update = train_local_group(&mut clf, &group(&[A], &[]), NIL, true);
        assert!(!update.negative.contains(&(0, B)));

        let mut clf = PerceptronClassifier::new(3, 2);
        clf.label_weights_mut()[B as usize].update(&[0], 1.0);
        let update = train_local_group(&mut clf, &group(&[A], &[B]), NIL, true);
        assert!(update.negative.contains(&(0, B)));
    }

    #[test]
    fn test_update_stats() {
        let update = GroupUpdate {
            z_predicted: vec![NIL, B],
            positive: vec![(0, A), (1, A)],
            negative: vec![(0, NIL), (1, B)],
        };
        let mut stats = UpdateStats::default();
        update.record(NIL, &mut stats);
        assert_eq!(
            stats,
            UpdateStats {
                positive: 2,
                negative: 1,
                nil: 1
            }
        );
    }
}
