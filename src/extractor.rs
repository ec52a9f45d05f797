use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::dataset::MultiLabelDataset;
use crate::errors::{Error, Result};
use crate::index::Index;
use crate::model::ModelReader;
use crate::score::Score;
use crate::train::{ExtractorConfig, JointBayesExtractor, ModelType, PerceptronExtractor};

/// Name of the reserved "no relation" label
pub const UNRELATED: &str = "_NR";

/// The contract shared by every relation extractor
pub trait RelationExtractor {
    /// The kind of model this extractor trains
    fn model_type(&self) -> ModelType;

    /// Learn a model from `data`
    ///
    /// The dataset may be thresholded and reordered in place. Groups a
    /// filter leaves out of training stay in the dataset.
    fn train(&mut self, data: &mut MultiLabelDataset) -> Result<()>;

    /// Frozen feature index, `None` until trained or loaded
    fn feature_index(&self) -> Option<&Index>;

    /// Frozen label index including [`UNRELATED`], `None` until trained or loaded
    fn label_index(&self) -> Option<&Index>;

    /// Score every supported label for a group of resolved mentions
    fn classify_ids(&self, mentions: &[Vec<u32>]) -> Result<BTreeMap<u32, f64>>;

    /// Serialize the trained model
    fn to_bytes(&self) -> Result<Vec<u8>>;

    /// Score the labels of a group given as feature strings
    ///
    /// Unknown features are ignored and labels scoring below `threshold`
    /// are omitted.
    fn classify<M, S>(&self, mentions: &[M], threshold: f64) -> Result<BTreeMap<String, f64>>
    where
        Self: Sized,
        M: AsRef<[S]>,
        S: AsRef<str>,
    {
        let features = self.feature_index().ok_or(Error::NotTrained)?;
        let labels = self.label_index().ok_or(Error::NotTrained)?;
        let resolved: Vec<Vec<u32>> = mentions
            .iter()
            .map(|m| {
                m.as_ref()
                    .iter()
                    .filter_map(|f| features.index_of(f.as_ref()))
                    .collect()
            })
            .collect();

        let mut result = BTreeMap::new();
        for (label, score) in self.classify_ids(&resolved)? {
            if score < threshold {
                continue;
            }
            if let Some(name) = labels.get(label) {
                result.insert(name.to_string(), score);
            }
        }
        Ok(result)
    }

    /// Classify every group of `data` and score against its positive labels
    fn test(&self, data: &MultiLabelDataset, threshold: f64) -> Result<Score>
    where
        Self: Sized,
    {
        let mut score = Score::new();
        for group in data.groups() {
            let mentions: Vec<Vec<&str>> = group
                .mentions
                .iter()
                .map(|m| m.iter().filter_map(|&f| data.features().get(f)).collect())
                .collect();
            let predicted: BTreeSet<String> =
                self.classify(&mentions, threshold)?.into_keys().collect();
            let gold: BTreeSet<String> = group
                .positive
                .iter()
                .filter_map(|&l| data.labels().get(l))
                .map(str::to_string)
                .collect();
            score.add(&predicted, &gold);
        }
        tracing::info!(%score, groups = data.len(), "test score");
        Ok(score)
    }

    /// Write the trained model to `path`, creating parent directories
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()>
    where
        Self: Sized,
    {
        write_model_file(path.as_ref(), &self.to_bytes()?)
    }
}

pub(crate) fn write_model_file(path: &Path, buf: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }
    let mut file = fs::File::create(path)?;
    file.write_all(buf)?;
    file.flush()?;
    tracing::info!(path = %path.display(), bytes = buf.len(), "saved model");
    Ok(())
}

/// One of the supported extractors, selected by configuration
#[derive(Debug, Clone)]
pub enum Extractor {
    /// `atleastonce`, `perceptron` and `perceptron_inc`
    Perceptron(PerceptronExtractor),
    /// `localbayes` and `jointbayes`
    JointBayes(JointBayesExtractor),
}

impl Extractor {
    /// Create an untrained extractor for `config.model()`
    pub fn from_config(config: ExtractorConfig) -> Self {
        if config.model().is_perceptron() {
            Extractor::Perceptron(PerceptronExtractor::new(config))
        } else {
            Extractor::JointBayes(JointBayesExtractor::new(config))
        }
    }

    /// Load a model from a serialized buffer
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        let mut reader = ModelReader::new(buf);
        let header = reader.read_header()?;
        let extractor = if header.model_type.is_perceptron() {
            Extractor::Perceptron(PerceptronExtractor::read(&mut reader, header)?)
        } else {
            Extractor::JointBayes(JointBayesExtractor::read(&mut reader, header)?)
        };
        if !reader.is_at_end() {
            return Err(Error::invalid_format("trailing data after model"));
        }
        Ok(extractor)
    }

    /// Load a model from a file written by [`RelationExtractor::save`]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let buf = fs::read(path.as_ref())?;
        let extractor = Self::from_bytes(&buf)?;
        tracing::info!(
            path = %path.as_ref().display(),
            model = %extractor.model_type(),
            "loaded model"
        );
        Ok(extractor)
    }
}

impl RelationExtractor for Extractor {
    fn model_type(&self) -> ModelType {
        match self {
            Extractor::Perceptron(e) => e.model_type(),
            Extractor::JointBayes(e) => e.model_type(),
        }
    }

    fn train(&mut self, data: &mut MultiLabelDataset) -> Result<()> {
        match self {
            Extractor::Perceptron(e) => e.train(data),
            Extractor::JointBayes(e) => e.train(data),
        }
    }

    fn feature_index(&self) -> Option<&Index> {
        match self {
            Extractor::Perceptron(e) => e.feature_index(),
            Extractor::JointBayes(e) => e.feature_index(),
        }
    }

    fn label_index(&self) -> Option<&Index> {
        match self {
            Extractor::Perceptron(e) => e.label_index(),
            Extractor::JointBayes(e) => e.label_index(),
        }
    }

    fn classify_ids(&self, mentions: &[Vec<u32>]) -> Result<BTreeMap<u32, f64>> {
        match self {
            Extractor::Perceptron(e) => e.classify_ids(mentions),
            Extractor::JointBayes(e) => e.classify_ids(mentions),
        }
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Extractor::Perceptron(e) => e.to_bytes(),
            Extractor::JointBayes(e) => e.to_bytes(),
        }
    }
}
