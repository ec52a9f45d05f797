use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::aggregate::YFeatureModel;
use crate::dataset::Group;
use crate::errors::{Error, Result};
use crate::logistic::LogisticParams;

/// Which extractor to train
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelType {
    /// Local perceptron
    Perceptron,
    /// Local perceptron, negative updates only on known negatives
    PerceptronIncomplete,
    /// Structured perceptron with "at least once" conditional inference
    #[default]
    AtLeastOnce,
    /// Fold-trained local logistic classifiers, no EM
    LocalBayes,
    /// MIML-RE
    JointBayes,
}

impl ModelType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Perceptron => "perceptron",
            Self::PerceptronIncomplete => "perceptron_inc",
            Self::AtLeastOnce => "atleastonce",
            Self::LocalBayes => "localbayes",
            Self::JointBayes => "jointbayes",
        }
    }

    pub(crate) fn to_u32(self) -> u32 {
        match self {
            Self::Perceptron => 0,
            Self::PerceptronIncomplete => 1,
            Self::AtLeastOnce => 2,
            Self::LocalBayes => 3,
            Self::JointBayes => 4,
        }
    }

    pub(crate) fn from_u32(v: u32) -> Option<Self> {
        Some(match v {
            0 => Self::Perceptron,
            1 => Self::PerceptronIncomplete,
            2 => Self::AtLeastOnce,
            3 => Self::LocalBayes,
            4 => Self::JointBayes,
            _ => return None,
        })
    }

    /// Returns `true` for models made of averaged perceptron weights
    pub fn is_perceptron(self) -> bool {
        matches!(
            self,
            Self::Perceptron | Self::PerceptronIncomplete | Self::AtLeastOnce
        )
    }
}

impl FromStr for ModelType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "perceptron" => Ok(Self::Perceptron),
            "perceptron_inc" => Ok(Self::PerceptronIncomplete),
            "atleastonce" => Ok(Self::AtLeastOnce),
            "localbayes" => Ok(Self::LocalBayes),
            "jointbayes" | "jointbayes_inc" => Ok(Self::JointBayes),
            _ => Err(Error::unknown_value("model type", s)),
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latent label inference used in the E-step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InferenceType {
    /// Hill climbing, one global flip at a time
    Slow,
    /// One pass against a snapshot of the assignment
    #[default]
    Stable,
}

impl FromStr for InferenceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slow" => Ok(Self::Slow),
            "stable" => Ok(Self::Stable),
            _ => Err(Error::unknown_value("inference type", s)),
        }
    }
}

/// Which groups feed the initial local classifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalFilter {
    #[default]
    All,
    /// Groups with at most one positive label
    Single,
    /// Groups with at most one positive label and more than one mention
    Redundancy,
    /// Groups with at most N mentions; also drops larger groups from EM
    Large(usize),
}

impl LocalFilter {
    /// Returns `true` if the group trains the initial local classifiers
    pub fn keep_local(&self, group: &Group) -> bool {
        match *self {
            Self::All => true,
            Self::Single => group.positive.len() <= 1,
            Self::Redundancy => group.positive.len() <= 1 && group.len() > 1,
            Self::Large(n) => group.len() <= n,
        }
    }

    /// Returns `true` if the group takes part in joint training at all
    pub fn keep_joint(&self, group: &Group) -> bool {
        match *self {
            Self::Large(n) => group.len() <= n,
            _ => true,
        }
    }
}

impl FromStr for LocalFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let v = s.trim().to_ascii_lowercase();
        match v.as_str() {
            "all" => return Ok(Self::All),
            "single" => return Ok(Self::Single),
            "redundancy" => return Ok(Self::Redundancy),
            _ => {}
        }
        if let Some(n) = v.strip_prefix("large") {
            if let Ok(n) = n.parse::<usize>() {
                if n > 0 {
                    return Ok(Self::Large(n));
                }
            }
        }
        Err(Error::unknown_value("local filter", s))
    }
}

/// Training configuration shared by every extractor
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractorConfig {
    model: ModelType,
    epochs: usize,
    folds: usize,
    filter: LocalFilter,
    inference: InferenceType,
    train_y: bool,
    features: YFeatureModel,
    feature_count_threshold: usize,
    z_sigma: f64,
    y_sigma: f64,
    max_iterations: usize,
    epsilon: f64,
    model_path: Option<PathBuf>,
    initial_model_path: Option<PathBuf>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            model: ModelType::default(),
            epochs: 10,
            folds: 5,
            filter: LocalFilter::default(),
            inference: InferenceType::default(),
            train_y: true,
            features: YFeatureModel::default(),
            feature_count_threshold: 0,
            z_sigma: 1.0,
            y_sigma: 1.0,
            max_iterations: 100,
            epsilon: 1e-4,
            model_path: None,
            initial_model_path: None,
        }
    }
}

impl ExtractorConfig {
    pub fn new(model: ModelType) -> Self {
        Self {
            model,
            ..Self::default()
        }
    }

    /// Set a parameter from its string form
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        match name {
            "model" => self.model = value.parse()?,
            "epochs" => self.set_epochs(parse_value(name, value)?)?,
            "folds" => self.set_folds(parse_value(name, value)?)?,
            "filter" => self.filter = value.parse()?,
            "inference" => self.inference = value.parse()?,
            "train_y" => self.train_y = parse_value(name, value)?,
            "features" => self.features = value.parse()?,
            "feature_count_threshold" => self.feature_count_threshold = parse_value(name, value)?,
            "z_sigma" => self.set_z_sigma(parse_value(name, value)?)?,
            "y_sigma" => self.set_y_sigma(parse_value(name, value)?)?,
            "max_iterations" => self.set_max_iterations(parse_value(name, value)?)?,
            "epsilon" => self.set_epsilon(parse_value(name, value)?)?,
            "model_path" => self.model_path = Some(PathBuf::from(value)),
            "initial_model_path" => self.initial_model_path = Some(PathBuf::from(value)),
            _ => return Err(Error::UnknownParameter(name.to_string())),
        }
        Ok(())
    }

    pub fn model(&self) -> ModelType {
        self.model
    }

    pub fn set_model(&mut self, model: ModelType) {
        self.model = model;
    }

    pub fn epochs(&self) -> usize {
        self.epochs
    }

    pub fn set_epochs(&mut self, epochs: usize) -> Result<()> {
        if epochs < 1 {
            return Err(Error::invalid_argument("epochs must be at least 1"));
        }
        self.epochs = epochs;
        Ok(())
    }

    pub fn folds(&self) -> usize {
        self.folds
    }

    pub fn set_folds(&mut self, folds: usize) -> Result<()> {
        if folds < 1 {
            return Err(Error::invalid_argument("folds must be at least 1"));
        }
        self.folds = folds;
        Ok(())
    }

    pub fn filter(&self) -> LocalFilter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: LocalFilter) {
        self.filter = filter;
    }

    pub fn inference(&self) -> InferenceType {
        self.inference
    }

    pub fn set_inference(&mut self, inference: InferenceType) {
        self.inference = inference;
    }

    pub fn train_y(&self) -> bool {
        self.train_y
    }

    pub fn set_train_y(&mut self, train_y: bool) {
        self.train_y = train_y;
    }

    pub fn features(&self) -> YFeatureModel {
        self.features
    }

    pub fn set_features(&mut self, features: YFeatureModel) {
        self.features = features;
    }

    pub fn feature_count_threshold(&self) -> usize {
        self.feature_count_threshold
    }

    pub fn set_feature_count_threshold(&mut self, threshold: usize) {
        self.feature_count_threshold = threshold;
    }

    pub fn z_sigma(&self) -> f64 {
        self.z_sigma
    }

    pub fn set_z_sigma(&mut self, sigma: f64) -> Result<()> {
        if sigma.is_nan() || sigma <= 0.0 {
            return Err(Error::invalid_argument("z_sigma must be positive"));
        }
        self.z_sigma = sigma;
        Ok(())
    }

    pub fn y_sigma(&self) -> f64 {
        self.y_sigma
    }

    pub fn set_y_sigma(&mut self, sigma: f64) -> Result<()> {
        if sigma.is_nan() || sigma <= 0.0 {
            return Err(Error::invalid_argument("y_sigma must be positive"));
        }
        self.y_sigma = sigma;
        Ok(())
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn set_max_iterations(&mut self, max_iterations: usize) -> Result<()> {
        if max_iterations < 1 {
            return Err(Error::invalid_argument("max_iterations must be at least 1"));
        }
        self.max_iterations = max_iterations;
        Ok(())
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn set_epsilon(&mut self, epsilon: f64) -> Result<()> {
        if epsilon.is_nan() || epsilon < 0.0 {
            return Err(Error::invalid_argument("epsilon must be non-negative"));
        }
        self.epsilon = epsilon;
        Ok(())
    }

    /// Where the final model will be written; epoch checkpoints are derived from it
    pub fn model_path(&self) -> Option<&Path> {
        self.model_path.as_deref()
    }

    pub fn set_model_path<P: Into<PathBuf>>(&mut self, path: Option<P>) {
        self.model_path = path.map(Into::into);
    }

    /// Cache of the fold-trained local models
    ///
    /// Falls back to [`initial_path`] of the model path when not set.
    pub fn initial_model_path(&self) -> Option<PathBuf> {
        match (&self.initial_model_path, &self.model_path) {
            (Some(path), _) => Some(path.clone()),
            (None, Some(path)) => Some(initial_path(path)),
            (None, None) => None,
        }
    }

    pub fn set_initial_model_path<P: Into<PathBuf>>(&mut self, path: Option<P>) {
        self.initial_model_path = path.map(Into::into);
    }

    pub fn with_model(mut self, model: ModelType) -> Self {
        self.model = model;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Result<Self> {
        self.set_epochs(epochs)?;
        Ok(self)
    }

    pub fn with_folds(mut self, folds: usize) -> Result<Self> {
        self.set_folds(folds)?;
        Ok(self)
    }

    pub fn with_inference(mut self, inference: InferenceType) -> Self {
        self.inference = inference;
        self
    }

    pub fn with_filter(mut self, filter: LocalFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_features(mut self, features: YFeatureModel) -> Self {
        self.features = features;
        self
    }

    pub(crate) fn z_params(&self) -> LogisticParams {
        LogisticParams {
            sigma: self.z_sigma,
            max_iterations: self.max_iterations,
            epsilon: self.epsilon,
        }
    }

    pub(crate) fn y_params(&self) -> LogisticParams {
        LogisticParams {
            sigma: self.y_sigma,
            max_iterations: self.max_iterations,
            epsilon: self.epsilon,
        }
    }
}

fn parse_value<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        Error::invalid_argument(format!("invalid value for {}: {}", name, value))
    })
}

/// Path of the checkpoint written after `epoch`
///
/// `model.bin` becomes `model_EPOCH3.bin`; a path without extension just gets
/// the suffix appended.
pub fn epoch_path(path: &Path, epoch: usize) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}_EPOCH{}.{}", stem, epoch, ext.to_string_lossy()),
        None => format!("{}_EPOCH{}", stem, epoch),
    };
    path.with_file_name(name)
}

/// Path of the cached local models next to the final model
///
/// `model.bin` becomes `model.initial.bin`.
pub fn initial_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}.initial.{}", stem, ext.to_string_lossy()),
        None => format!("{}.initial", stem),
    };
    path.with_file_name(name)
}
