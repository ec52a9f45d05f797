//! Training module for relation extractors
//!
//! This module contains the configuration surface, the averaged perceptron
//! trainers, the cross-validated EM joint trainer and model serialization.

mod at_least_once;
mod config;
mod inference;
mod joint_bayes;
mod model_writer;
mod perceptron;

// Re-export public types
pub use self::at_least_once::train_group;
pub use self::config::{epoch_path, initial_path, ExtractorConfig, InferenceType, LocalFilter, ModelType};
pub use self::inference::{JointScorer, SlowInference, StableInference, ZInference};
pub use self::joint_bayes::{JointBayesExtractor, JointModel};
pub use self::perceptron::{train_local_group, GroupUpdate, PerceptronExtractor, UpdateStats};
