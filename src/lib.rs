//! Multi-instance multi-label relation extraction
//!
//! This library learns relation classifiers from distantly supervised data,
//! where only the set of labels of a group of mentions is known. It provides
//! the "at least once" averaged perceptron, local perceptron baselines and
//! the cross-validated EM joint model (MIML-RE).
//!
//! # Examples
//!
//! ## Training
//!
//! ```no_run
//! use mimlre::train::{ExtractorConfig, ModelType};
//! use mimlre::{Extractor, MultiLabelDataset, RelationExtractor};
//!
//! let mut data = MultiLabelDataset::new();
//! data.add_group(
//!     &["per:employee_of"],
//!     &["per:city_of_birth"],
//!     &[vec!["word:works", "word:at"], vec!["word:joined"]],
//! )?;
//!
//! let mut config = ExtractorConfig::new(ModelType::JointBayes);
//! config.set("epochs", "8")?;
//! config.set("inference", "stable")?;
//! let mut extractor = Extractor::from_config(config);
//! extractor.train(&mut data)?;
//! extractor.save("model.bin")?;
//! # Ok::<(), mimlre::Error>(())
//! ```
//!
//! ## Prediction
//!
//! ```no_run
//! use mimlre::{Extractor, RelationExtractor};
//!
//! let extractor = Extractor::load("model.bin")?;
//! let mentions = vec![vec!["word:works", "word:at"]];
//! for (label, score) in extractor.classify(&mentions, 0.5)? {
//!     println!("{} {:.3}", label, score);
//! }
//! # Ok::<(), mimlre::Error>(())
//! ```

mod aggregate;
mod dataset;
mod edge_cover;
mod errors;
mod extractor;
mod index;
mod label_weights;
mod local;
mod logistic;
mod model;
mod score;

/// Training module containing the trainers and their configuration
pub mod train;

// Re-export main types
pub use self::aggregate::{
    cooccurrence_feature, deterministic_or, noisy_or, YClassifier, YDatum, YFeatureContext,
    YFeatureModel, ATLEASTONCE_FEAT, BIG_WEIGHT, NONE_FEAT,
};
pub use self::dataset::{Group, Mention, MultiLabelDataset};
pub use self::edge_cover::{edge_cover, EdgeCover};
pub use self::errors::{Error, Result};
pub use self::extractor::{Extractor, RelationExtractor, UNRELATED};
pub use self::index::Index;
pub use self::label_weights::LabelWeights;
pub use self::local::{
    predict_label, FoldEnsemble, LocalClassifier, PerceptronClassifier, SOFTMAX_GAMMA,
};
pub use self::logistic::{log_sum_exp, softmax, Datum, LogisticClassifier, LogisticParams};
pub use self::model::Sections;
pub use self::score::Score;

// Re-export training types for convenience
pub use self::train::{ExtractorConfig, ModelType};
