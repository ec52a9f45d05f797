use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::ops::Range;
use std::path::Path;

use crate::aggregate::{
    cooccurrence_feature, deterministic_or, noisy_or, YClassifier, YDatum, YFeatureContext,
    YFeatureModel,
};
use crate::dataset::MultiLabelDataset;
use crate::errors::{Error, Result};
use crate::extractor::{write_model_file, RelationExtractor, UNRELATED};
use crate::index::Index;
use crate::local::{FoldEnsemble, LocalClassifier};
use crate::logistic::{Datum, LogisticClassifier, LogisticParams};
use crate::model::{Header, ModelReader, Sections};
use crate::score::Score;

use super::config::{epoch_path, ExtractorConfig, InferenceType, LocalFilter, ModelType};
use super::inference::{JointScorer, SlowInference, StableInference, ZInference};
use super::model_writer::ModelWriter;

/// Parameters of a trained MIML-RE model
#[derive(Debug, Clone, PartialEq)]
pub struct JointModel {
    features: Index,
    /// Y labels followed by the "no relation" label
    z_labels: Index,
    nil: u32,
    /// One Z classifier per fold
    z_classifiers: Vec<LogisticClassifier>,
    dependencies: BTreeSet<String>,
    /// One Y classifier per Y label, indexed by label id
    y_classifiers: Vec<YClassifier>,
    feature_model: YFeatureModel,
}

impl JointModel {
    pub fn z_classifiers(&self) -> &[LogisticClassifier] {
        &self.z_classifiers
    }

    pub fn y_classifiers(&self) -> &[YClassifier] {
        &self.y_classifiers
    }

    /// Ordered label pairs seen together in a training group, as co-occurrence features
    pub fn dependencies(&self) -> &BTreeSet<String> {
        &self.dependencies
    }

    pub fn feature_model(&self) -> YFeatureModel {
        self.feature_model
    }

    fn y_features(&self) -> YFeatureContext<'_> {
        YFeatureContext {
            labels: &self.z_labels,
            nil: self.nil,
            model: self.feature_model,
            dependencies: &self.dependencies,
        }
    }

    fn write<W: std::io::Write>(&self, w: &mut ModelWriter<W>) -> std::io::Result<()> {
        w.write_u32(self.feature_model.as_u32())?;
        w.write_index(&self.features)?;
        w.write_index(&self.z_labels)?;
        w.write_len(self.z_classifiers.len())?;
        for clf in &self.z_classifiers {
            w.write_logistic(clf)?;
        }
        w.write_string_set(&self.dependencies)?;
        w.write_len(self.y_classifiers.len())?;
        for clf in &self.y_classifiers {
            w.write_str(clf.label())?;
            w.write_index(clf.features())?;
            w.write_logistic(clf.model())?;
        }
        Ok(())
    }

    fn read(reader: &mut ModelReader<'_>) -> Result<Self> {
        let raw_model = reader.read_u32()?;
        let feature_model = YFeatureModel::from_u32(raw_model).ok_or_else(|| {
            Error::invalid_format(format!("unknown feature model {}", raw_model))
        })?;
        let features = reader.read_index()?;
        let z_labels = reader.read_index()?;
        let nil = match z_labels.index_of(UNRELATED) {
            Some(nil) if nil as usize + 1 == z_labels.len() => nil,
            _ => {
                return Err(Error::invalid_format(format!(
                    "{} must be the last label",
                    UNRELATED
                )))
            }
        };

        let folds = reader.read_len()?;
        if folds == 0 {
            return Err(Error::invalid_format("no fold classifiers"));
        }
        let mut z_classifiers = Vec::with_capacity(folds);
        for _ in 0..folds {
            let clf = reader.read_logistic()?;
            if clf.num_labels() != z_labels.len() || clf.num_features() != features.len() {
                return Err(Error::invalid_format(format!(
                    "fold classifier of shape {}x{} for {} labels and {} features",
                    clf.num_labels(),
                    clf.num_features(),
                    z_labels.len(),
                    features.len()
                )));
            }
            z_classifiers.push(clf);
        }

        let dependencies = reader.read_string_set()?;
        let num_y = reader.read_len()?;
        if num_y != nil as usize {
            return Err(Error::invalid_format(format!(
                "{} Y classifiers for {} labels",
                num_y, nil
            )));
        }
        let mut y_classifiers = Vec::with_capacity(num_y);
        for y in 0..num_y {
            let label = reader.read_str()?;
            if z_labels.get(y as u32) != Some(label) {
                return Err(Error::invalid_format(format!(
                    "Y classifier {} out of label order",
                    label
                )));
            }
            let y_features = reader.read_index()?;
            let model = reader.read_logistic()?;
            if model.num_labels() != 2 || model.num_features() != y_features.len() {
                return Err(Error::invalid_format(format!(
                    "malformed Y classifier for {}",
                    label
                )));
            }
            y_classifiers.push(YClassifier::from_parts(label.to_string(), y_features, model));
        }

        Ok(Self {
            features,
            z_labels,
            nil,
            z_classifiers,
            dependencies,
            y_classifiers,
            feature_model,
        })
    }
}

/// Highest probability, ties going to the label whose name sorts first
fn top_label(probs: &[f64], labels: &Index) -> u32 {
    let mut best = 0u32;
    for (l, &p) in probs.iter().enumerate().skip(1) {
        let l = l as u32;
        let current = probs[best as usize];
        if p > current || (p == current && labels.get(l) < labels.get(best)) {
            best = l;
        }
    }
    best
}

fn outside(fold: &Range<usize>, size: usize) -> impl Iterator<Item = usize> + '_ {
    (0..size).filter(move |i| !fold.contains(i))
}

/// Flatten the groups outside `fold` into weighted mention datums
///
/// A group without gold labels yields one "no relation" datum per mention;
/// otherwise every mention yields one datum per gold label, weighted so that
/// each mention counts once.
fn make_local_data(
    data: &MultiLabelDataset,
    fold: &Range<usize>,
    filter: LocalFilter,
    nil: u32,
) -> Result<Vec<Datum>> {
    let mut datums = Vec::new();
    let mut positive = 0;
    for i in outside(fold, data.len()) {
        let group = data.group(i);
        if !filter.keep_local(group) {
            continue;
        }
        if group.positive.is_empty() {
            for mention in &group.mentions {
                datums.push(Datum::new(mention.clone(), nil));
            }
        } else {
            let weight = 1.0 / group.positive.len() as f64;
            for &label in &group.positive {
                for mention in &group.mentions {
                    datums.push(Datum::with_weight(mention.clone(), label, weight));
                    positive += 1;
                }
            }
        }
    }
    if positive == 0 {
        return Err(Error::degenerate(format!(
            "no positive training examples outside fold {:?}",
            fold
        )));
    }
    tracing::debug!(datums = datums.len(), positive, "built local dataset");
    Ok(datums)
}

/// Mentions of the groups outside `fold`, labelled with their current Z labels
fn make_em_data(data: &MultiLabelDataset, fold: &Range<usize>, z: &[Vec<u32>]) -> Vec<Datum> {
    outside(fold, data.len())
        .flat_map(|i| {
            data.group(i)
                .mentions
                .iter()
                .zip(&z[i])
                .map(|(m, &label)| Datum::new(m.clone(), label))
        })
        .collect()
}

/// Every ordered pair of distinct gold labels sharing a group
fn detect_dependencies(data: &MultiLabelDataset) -> BTreeSet<String> {
    let mut deps = BTreeSet::new();
    for group in data.groups() {
        for &src in &group.positive {
            for &dst in &group.positive {
                if src == dst {
                    continue;
                }
                if let (Some(s), Some(d)) = (data.labels().get(src), data.labels().get(dst)) {
                    deps.insert(cooccurrence_feature(s, d));
                }
            }
        }
    }
    deps
}

/// Label-level score of the group predictions implied by `z_labels`
fn y_score(z_labels: &[Vec<u32>], data: &MultiLabelDataset, nil: u32) -> Score {
    let mut score = Score::new();
    for (z, group) in z_labels.iter().zip(data.groups()) {
        score.add(&deterministic_or(z, nil), &group.positive);
    }
    score
}

/// How often a label fires within one group, split by whether it is gold
///
/// Keys are per-group mention counts, values the number of (group, label)
/// pairs with that count.
fn confusion_counts(
    z_labels: &[Vec<u32>],
    data: &MultiLabelDataset,
    nil: u32,
) -> (BTreeMap<usize, usize>, BTreeMap<usize, usize>) {
    let mut pos = BTreeMap::new();
    let mut neg = BTreeMap::new();
    for (z, group) in z_labels.iter().zip(data.groups()) {
        let mut freqs: BTreeMap<u32, usize> = BTreeMap::new();
        for &label in z.iter().filter(|&&l| l != nil) {
            *freqs.entry(label).or_default() += 1;
        }
        for (label, f) in freqs {
            let bucket = if group.positive.contains(&label) {
                &mut pos
            } else {
                &mut neg
            };
            *bucket.entry(f).or_insert(0) += 1;
        }
    }
    (pos, neg)
}

fn log_diagnostics(name: &str, z_labels: &[Vec<u32>], data: &MultiLabelDataset, nil: u32) {
    let (pos, neg) = confusion_counts(z_labels, data, nil);
    tracing::info!(stage = name, ?pos, ?neg, "label frequency confusion");
    let score = y_score(z_labels, data, nil);
    tracing::info!(stage = name, %score, "label score");
}

/// Cross-validated EM extractor: `jointbayes`, and `localbayes` which stops
/// after the local initialization
#[derive(Debug, Clone)]
pub struct JointBayesExtractor {
    config: ExtractorConfig,
    model: Option<JointModel>,
}

impl JointBayesExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self {
            config,
            model: None,
        }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Trained parameters, `None` until trained or loaded
    pub fn model(&self) -> Option<&JointModel> {
        self.model.as_ref()
    }

    pub(crate) fn read(reader: &mut ModelReader<'_>, header: Header) -> Result<Self> {
        if !header.sections.contains(Sections::JOINT) {
            return Err(Error::invalid_format("missing joint section"));
        }
        let model = JointModel::read(reader)?;
        let config = ExtractorConfig::new(header.model_type)
            .with_features(model.feature_model)
            .with_folds(model.z_classifiers.len())?;
        Ok(Self {
            config,
            model: Some(model),
        })
    }

    /// Train one Z classifier per fold on the other folds and report how it
    /// does on its own fold
    fn initialize_local(
        &self,
        data: &MultiLabelDataset,
        z_labels: &Index,
        nil: u32,
        params: &LogisticParams,
    ) -> Result<Vec<LogisticClassifier>> {
        let folds = self.config.folds();
        let mut classifiers = Vec::with_capacity(folds);
        for fold in 0..folds {
            let range = data.fold_range(fold, folds)?;
            let datums = make_local_data(data, &range, self.config.filter(), nil)?;
            tracing::info!(fold, datums = datums.len(), "training local model");
            let clf = LogisticClassifier::train(z_labels.len(), data.num_features(), &datums, params);

            let mut score = Score::new();
            for group in &data.groups()[range] {
                let predicted: BTreeSet<u32> = group
                    .mentions
                    .iter()
                    .map(|m| top_label(&clf.probabilities(m), z_labels))
                    .filter(|&l| l != nil)
                    .collect();
                score.add(&predicted, &group.positive);
            }
            tracing::info!(
                fold,
                %score,
                labels = z_labels.len(),
                features = data.num_features(),
                "local model on held-out fold"
            );
            classifiers.push(clf);
        }
        Ok(classifiers)
    }

    /// Fold-trained local models, read from the initial model cache when it
    /// exists and written to it otherwise
    fn local_models(
        &self,
        data: &MultiLabelDataset,
        z_labels: &Index,
        nil: u32,
        params: &LogisticParams,
    ) -> Result<Vec<LogisticClassifier>> {
        let path = match self.config.initial_model_path() {
            Some(path) => path,
            None => return self.initialize_local(data, z_labels, nil, params),
        };
        if path.exists() {
            let classifiers = read_initial(&path, data.features(), z_labels, self.config.folds())?;
            tracing::info!(path = %path.display(), folds = classifiers.len(), "loaded initial local models");
            return Ok(classifiers);
        }
        let classifiers = self.initialize_local(data, z_labels, nil, params)?;
        let buf = encode_initial(self.model_type(), data.features(), z_labels, &classifiers)?;
        write_model_file(&path, &buf)?;
        Ok(classifiers)
    }

    fn save_checkpoint(&self, model: &JointModel, epoch: usize) {
        let path = match self.config.model_path() {
            Some(path) => epoch_path(path, epoch),
            None => return,
        };
        let result = encode(self.model_type(), model).and_then(|buf| write_model_file(&path, &buf));
        if let Err(e) = result {
            tracing::warn!(epoch, path = %path.display(), "could not save epoch model: {}", e);
        }
    }
}

fn encode(model_type: ModelType, model: &JointModel) -> Result<Vec<u8>> {
    let mut w = ModelWriter::new(Vec::new());
    w.write_header(model_type, Sections::JOINT)?;
    model.write(&mut w)?;
    Ok(w.into_inner())
}

fn encode_initial(
    model_type: ModelType,
    features: &Index,
    z_labels: &Index,
    classifiers: &[LogisticClassifier],
) -> Result<Vec<u8>> {
    let mut w = ModelWriter::new(Vec::new());
    w.write_header(model_type, Sections::INITIAL)?;
    w.write_index(features)?;
    w.write_index(z_labels)?;
    w.write_len(classifiers.len())?;
    for clf in classifiers {
        w.write_logistic(clf)?;
    }
    Ok(w.into_inner())
}

/// Load cached local models, which must match the indices and fold count of
/// the current run
fn read_initial(
    path: &Path,
    features: &Index,
    z_labels: &Index,
    folds: usize,
) -> Result<Vec<LogisticClassifier>> {
    let buf = fs::read(path)?;
    let mut reader = ModelReader::new(&buf);
    let header = reader.read_header()?;
    if header.model_type.is_perceptron() || !header.sections.contains(Sections::INITIAL) {
        return Err(Error::invalid_format("missing initial model section"));
    }
    if reader.read_index()? != *features || reader.read_index()? != *z_labels {
        return Err(Error::invalid_argument(format!(
            "initial models in {} were trained on different features or labels",
            path.display()
        )));
    }
    let num_folds = reader.read_len()?;
    if num_folds != folds {
        return Err(Error::invalid_argument(format!(
            "initial models in {} have {} folds, expected {}",
            path.display(),
            num_folds,
            folds
        )));
    }
    let mut classifiers = Vec::with_capacity(folds);
    for _ in 0..folds {
        let clf = reader.read_logistic()?;
        if clf.num_labels() != z_labels.len() || clf.num_features() != features.len() {
            return Err(Error::invalid_format("initial model of the wrong shape"));
        }
        classifiers.push(clf);
    }
    if !reader.is_at_end() {
        return Err(Error::invalid_format("trailing data after initial models"));
    }
    Ok(classifiers)
}

impl RelationExtractor for JointBayesExtractor {
    fn model_type(&self) -> ModelType {
        self.config.model()
    }

    fn train(&mut self, data: &mut MultiLabelDataset) -> Result<()> {
        let model_type = self.config.model();
        if !matches!(model_type, ModelType::LocalBayes | ModelType::JointBayes) {
            return Err(Error::invalid_argument(format!(
                "{} is not a joint model",
                model_type
            )));
        }
        if self.config.feature_count_threshold() > 1 {
            data.apply_feature_count_threshold(self.config.feature_count_threshold());
        }
        let filter = self.config.filter();
        let filtered;
        let data: &MultiLabelDataset = if let LocalFilter::Large(_) = filter {
            filtered = data.filter_groups(|g| filter.keep_joint(g));
            tracing::info!(before = data.len(), after = filtered.len(), "skipping large groups");
            &filtered
        } else {
            data
        };
        if data.is_empty() {
            return Err(Error::degenerate("no training groups"));
        }
        if data.labels().contains(UNRELATED) {
            return Err(Error::invalid_argument(format!(
                "label {} is reserved",
                UNRELATED
            )));
        }
        let folds = self.config.folds();
        if data.len() < folds {
            return Err(Error::degenerate(format!(
                "{} groups for {} folds",
                data.len(),
                folds
            )));
        }

        let mut z_labels = data.labels().clone();
        let nil = z_labels.get_or_insert(UNRELATED);
        let z_params = self.config.z_params();
        let y_params = self.config.y_params();
        tracing::info!(
            model = %model_type,
            groups = data.len(),
            mentions = data.num_mentions(),
            features = data.num_features(),
            labels = data.num_labels(),
            folds,
            "training joint model"
        );

        let z_classifiers = self.local_models(data, &z_labels, nil, &z_params)?;
        let y_classifiers = data
            .labels()
            .iter()
            .map(|(name, _)| YClassifier::at_least_once(name))
            .collect();
        let mut model = JointModel {
            features: data.features().clone(),
            z_labels,
            nil,
            z_classifiers,
            dependencies: BTreeSet::new(),
            y_classifiers,
            feature_model: self.config.features(),
        };

        if model_type == ModelType::LocalBayes {
            self.model = Some(model);
            return Ok(());
        }

        model.dependencies = detect_dependencies(data);
        tracing::info!(dependencies = model.dependencies.len(), "detected label dependencies");

        let ranges = (0..folds)
            .map(|fold| data.fold_range(fold, folds))
            .collect::<Result<Vec<_>>>()?;

        let mut z: Vec<Vec<u32>> = vec![Vec::new(); data.len()];
        for (fold, range) in ranges.iter().enumerate() {
            let clf = &model.z_classifiers[fold];
            for i in range.clone() {
                z[i] = data
                    .group(i)
                    .mentions
                    .iter()
                    .map(|m| top_label(&clf.probabilities(m), &model.z_labels))
                    .collect();
            }
        }
        log_diagnostics("local", &z, data, nil);

        let inference: &dyn ZInference = match self.config.inference() {
            InferenceType::Slow => &SlowInference,
            InferenceType::Stable => &StableInference,
        };

        for epoch in 0..self.config.epochs() {
            let mut flips = 0;
            let mut y_data: Vec<Vec<YDatum>> = vec![Vec::new(); nil as usize];
            let mut z_only: Vec<Vec<u32>> = vec![Vec::new(); data.len()];

            // E-step
            for (fold, range) in ranges.iter().enumerate() {
                let clf = &model.z_classifiers[fold];
                for i in range.clone() {
                    let group = data.group(i);
                    let log_probs: Vec<Vec<f64>> = group
                        .mentions
                        .iter()
                        .map(|m| clf.log_probabilities(m))
                        .collect();
                    z_only[i] = log_probs
                        .iter()
                        .map(|lp| top_label(lp, &model.z_labels))
                        .collect();

                    let scorer = JointScorer {
                        log_probs: &log_probs,
                        positive: &group.positive,
                        negative: &group.negative,
                        y_classifiers: &model.y_classifiers,
                        y_features: model.y_features(),
                    };
                    flips += inference.infer(&scorer, &mut z[i]);

                    for &y in &group.positive {
                        y_data[y as usize].push(YDatum {
                            features: scorer.y_features.extract(y, &z[i]),
                            positive: true,
                        });
                    }
                    for &y in &group.negative {
                        y_data[y as usize].push(YDatum {
                            features: scorer.y_features.extract(y, &z[i]),
                            positive: false,
                        });
                    }
                }
            }

            log_diagnostics(&format!("epoch {}", epoch), &z, data, nil);
            let z_score = y_score(&z_only, data, nil);
            tracing::info!(epoch, score = %z_score, "label score of Z classifiers alone");
            tracing::info!(epoch, flips, "E-step completed");
            if flips == 0 {
                tracing::info!(epoch, "no Z label changed, stopping");
                break;
            }

            // M-step
            for (fold, range) in ranges.iter().enumerate() {
                let datums = make_em_data(data, range, &z);
                tracing::debug!(epoch, fold, datums = datums.len(), "training Z classifier");
                model.z_classifiers[fold] = LogisticClassifier::train(
                    model.z_labels.len(),
                    model.features.len(),
                    &datums,
                    &z_params,
                );
            }
            if self.config.train_y() {
                for (y, datums) in y_data.iter().enumerate() {
                    if datums.is_empty() {
                        continue;
                    }
                    let label = model.y_classifiers[y].label().to_string();
                    tracing::debug!(epoch, label = %label, datums = datums.len(), "training Y classifier");
                    model.y_classifiers[y] = YClassifier::train(&label, datums, &y_params);
                }
            }

            self.save_checkpoint(&model, epoch);
        }

        self.model = Some(model);
        Ok(())
    }

    fn feature_index(&self) -> Option<&Index> {
        self.model.as_ref().map(|m| &m.features)
    }

    fn label_index(&self) -> Option<&Index> {
        self.model.as_ref().map(|m| &m.z_labels)
    }

    /// Y classifiers decide which labels hold; the noisy-or of the mentions
    /// predicting a label ranks it
    fn classify_ids(&self, mentions: &[Vec<u32>]) -> Result<BTreeMap<u32, f64>> {
        let model = self.model.as_ref().ok_or(Error::NotTrained)?;
        let ensemble = FoldEnsemble::new(&model.z_classifiers);

        let mut z = Vec::with_capacity(mentions.len());
        let mut tops: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
        for mention in mentions {
            let probs = ensemble.probabilities(mention);
            let top = top_label(&probs, &model.z_labels);
            z.push(top);
            if top != model.nil {
                tops.entry(top).or_default().push(probs[top as usize]);
            }
        }

        let y_features = model.y_features();
        let mut result = BTreeMap::new();
        for (y, clf) in model.y_classifiers.iter().enumerate() {
            let y = y as u32;
            let p = clf.probabilities(&y_features.extract(y, &z));
            if p[YClassifier::POSITIVE as usize] > p[YClassifier::NEGATIVE as usize] {
                let score = tops.get(&y).map_or(0.0, |ps| noisy_or(ps.iter().copied()));
                result.insert(y, score);
            }
        }
        Ok(result)
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        let model = self.model.as_ref().ok_or(Error::NotTrained)?;
        encode(self.model_type(), model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> MultiLabelDataset {
        let mut data = MultiLabelDataset::new();
        data.add_group(&["A", "B"], &[] as &[&str], &[vec!["a"], vec!["b"]])
            .unwrap();
        data.add_group(&["A"], &["B"], &[vec!["a"], vec!["a", "x"]])
            .unwrap();
        data.add_group(&[] as &[&str], &["A"], &[vec!["x"]]).unwrap();
        data
    }

    #[test]
    fn test_top_label_tie_break() {
        let labels: Index = ["B", "A", "_NR"].iter().collect();
        assert_eq!(top_label(&[0.4, 0.4, 0.2], &labels), 1);
        assert_eq!(top_label(&[0.5, 0.3, 0.2], &labels), 0);
        assert_eq!(top_label(&[0.1, 0.1, 0.8], &labels), 2);
    }

    #[test]
    fn test_local_data() {
        let data = dataset();
        let nil = 2;
        let datums = make_local_data(&data, &(2..3), LocalFilter::All, nil).unwrap();
        // two labels x two mentions, then two single-label mentions
        assert_eq!(datums.len(), 6);
        assert_eq!(datums[0], Datum::with_weight(vec![0], 0, 0.5));
        assert_eq!(datums[1], Datum::with_weight(vec![1], 0, 0.5));
        assert_eq!(datums[2], Datum::with_weight(vec![0], 1, 0.5));
        assert_eq!(datums[4], Datum::new(vec![0], 0));
        assert_eq!(datums[5], Datum::new(vec![0, 2], 0));

        let datums = make_local_data(&data, &(0..2), LocalFilter::All, nil);
        assert!(matches!(datums, Err(Error::DegenerateDataset(_))));

        let single = make_local_data(&data, &(2..3), LocalFilter::Single, nil).unwrap();
        assert_eq!(single.len(), 2);
    }

    #[test]
    fn test_unrelated_group_yields_nil_datums() {
        let data = dataset();
        let datums = make_local_data(&data, &(0..1), LocalFilter::All, 2).unwrap();
        assert_eq!(datums.last(), Some(&Datum::new(vec![2], 2)));
    }

    #[test]
    fn test_em_data_skips_own_fold() {
        let mut data = MultiLabelDataset::new();
        for i in 0..7 {
            let f = format!("g{}", i);
            data.add_group(&["A"], &[] as &[&str], &[vec![f.as_str()], vec![f.as_str()]])
                .unwrap();
        }
        // group i only has feature i; its mentions carry labels (i, i + 1) mod 2
        let z: Vec<Vec<u32>> = (0..7u32).map(|i| vec![i % 2, (i + 1) % 2]).collect();
        let folds = 3;
        for fold in 0..folds {
            let range = data.fold_range(fold, folds).unwrap();
            let datums = make_em_data(&data, &range, &z);

            let groups: BTreeSet<usize> = datums.iter().map(|d| d.features[0] as usize).collect();
            let expected: BTreeSet<usize> = (0..7).filter(|i| !range.contains(i)).collect();
            assert_eq!(groups, expected, "fold {}", fold);
            assert_eq!(datums.len(), 2 * expected.len());
            for d in &datums {
                let g = d.features[0] as usize;
                assert!(z[g].contains(&d.label));
            }
        }
    }

    #[test]
    fn test_detect_dependencies() {
        let deps = detect_dependencies(&dataset());
        let expected: BTreeSet<String> = ["co:s|A|d|B|", "co:s|B|d|A|"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(deps, expected);
    }

    #[test]
    fn test_confusion_counts() {
        let data = dataset();
        let z = vec![vec![0, 0], vec![1, 2], vec![2]];
        let (pos, neg) = confusion_counts(&z, &data, 2);
        assert_eq!(pos.into_iter().collect::<Vec<_>>(), vec![(2, 1)]);
        assert_eq!(neg.into_iter().collect::<Vec<_>>(), vec![(1, 1)]);

        let score = y_score(&z, &data, 2);
        assert_eq!(score.correct, 1);
        assert_eq!(score.predicted, 2);
        assert_eq!(score.total, 3);
    }

    #[test]
    fn test_untrained() {
        let extractor = JointBayesExtractor::new(ExtractorConfig::new(ModelType::JointBayes));
        assert!(matches!(extractor.to_bytes(), Err(Error::NotTrained)));
        assert!(matches!(
            extractor.classify_ids(&[vec![0]]),
            Err(Error::NotTrained)
        ));
    }
}
