use std::path::Path;

use mimlre::train::{ExtractorConfig, InferenceType, LocalFilter, ModelType};
use mimlre::{Error, YFeatureModel};

#[test]
fn test_defaults() {
    let config = ExtractorConfig::default();
    assert_eq!(config.model(), ModelType::AtLeastOnce);
    assert_eq!(config.epochs(), 10);
    assert_eq!(config.folds(), 5);
    assert_eq!(config.filter(), LocalFilter::All);
    assert_eq!(config.inference(), InferenceType::Stable);
    assert!(config.train_y());
    assert_eq!(config.features(), YFeatureModel::AtLeastOnce);
    assert_eq!(config.z_sigma(), 1.0);
    assert_eq!(config.y_sigma(), 1.0);
    assert_eq!(config.epsilon(), 1e-4);
    assert!(config.model_path().is_none());
}

#[test]
fn test_epochs_validation() {
    let mut config = ExtractorConfig::default();

    // epochs must be positive
    let result = config.set("epochs", "0");
    assert!(result.is_err());
    assert_eq!(
        result.unwrap_err().to_string(),
        "invalid argument: epochs must be at least 1"
    );

    assert!(config.set("epochs", "3").is_ok());
    assert_eq!(config.epochs(), 3);
    assert!(config.set("epochs", "three").is_err());
    assert!(ExtractorConfig::default().with_epochs(0).is_err());
}

#[test]
fn test_folds_validation() {
    let mut config = ExtractorConfig::default();
    let result = config.set("folds", "0");
    assert_eq!(
        result.unwrap_err().to_string(),
        "invalid argument: folds must be at least 1"
    );
    assert!(config.set("folds", "10").is_ok());
    assert_eq!(config.folds(), 10);
}

#[test]
fn test_sigma_validation() {
    let mut config = ExtractorConfig::default();

    // sigma must be positive
    for value in ["0", "-1.0", "NaN"] {
        let result = config.set("z_sigma", value);
        assert_eq!(
            result.unwrap_err().to_string(),
            "invalid argument: z_sigma must be positive"
        );
        assert!(config.set("y_sigma", value).is_err());
    }

    assert!(config.set("z_sigma", "2.5").is_ok());
    assert!(config.set("y_sigma", "0.5").is_ok());
    assert_eq!(config.z_sigma(), 2.5);
    assert_eq!(config.y_sigma(), 0.5);
}

#[test]
fn test_optimizer_validation() {
    let mut config = ExtractorConfig::default();
    assert!(config.set("max_iterations", "0").is_err());
    assert!(config.set("max_iterations", "50").is_ok());
    assert_eq!(config.max_iterations(), 50);

    assert!(config.set("epsilon", "-0.1").is_err());
    assert!(config.set("epsilon", "0.0").is_ok());
    assert_eq!(config.epsilon(), 0.0);
}

#[test]
fn test_unknown_values_fail_fast() {
    let mut config = ExtractorConfig::default();

    let err = config.set("model", "selprefor").unwrap_err();
    assert!(matches!(err, Error::UnknownConfigValue { kind: "model type", .. }));
    assert_eq!(err.to_string(), "unknown model type: selprefor");

    let err = config.set("inference", "fast").unwrap_err();
    assert_eq!(err.to_string(), "unknown inference type: fast");

    let err = config.set("filter", "largest").unwrap_err();
    assert_eq!(err.to_string(), "unknown local filter: largest");

    let err = config.set("features", "2").unwrap_err();
    assert_eq!(err.to_string(), "unknown feature model: 2");

    let err = config.set("learning_rate", "0.1").unwrap_err();
    assert!(matches!(err, Error::UnknownParameter(_)));
    assert_eq!(err.to_string(), "unknown parameter: learning_rate");

    // nothing was changed by the failed calls
    assert_eq!(config, ExtractorConfig::default());
}

#[test]
fn test_string_parameters() {
    let mut config = ExtractorConfig::default();
    config.set("model", "JointBayes").unwrap();
    config.set("filter", "large100").unwrap();
    config.set("inference", "slow").unwrap();
    config.set("train_y", "false").unwrap();
    config.set("features", "1").unwrap();
    config.set("feature_count_threshold", "3").unwrap();
    config.set("model_path", "/tmp/out/model.bin").unwrap();

    assert_eq!(config.model(), ModelType::JointBayes);
    assert_eq!(config.filter(), LocalFilter::Large(100));
    assert_eq!(config.inference(), InferenceType::Slow);
    assert!(!config.train_y());
    assert_eq!(config.features(), YFeatureModel::Dependencies);
    assert_eq!(config.feature_count_threshold(), 3);
    assert_eq!(config.model_path(), Some(Path::new("/tmp/out/model.bin")));

    config.set("model", "localbayes").unwrap();
    assert_eq!(config.model(), ModelType::LocalBayes);
    assert!(!config.model().is_perceptron());
    config.set("model", "perceptron_inc").unwrap();
    assert!(config.model().is_perceptron());
}
