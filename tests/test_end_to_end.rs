use mimlre::train::{ExtractorConfig, ModelType};
use mimlre::{Error, Extractor, MultiLabelDataset, RelationExtractor};

fn training_data() -> MultiLabelDataset {
    let none: &[&str] = &[];
    let mut data = MultiLabelDataset::new();
    data.add_group(&["spouse"], &["sibling"], &[vec!["w:married", "w:to"]])
        .unwrap();
    data.add_group(&["sibling"], &["spouse"], &[vec!["w:brother", "w:of"]])
        .unwrap();
    data.add_group(none, none, &[vec!["w:met"], vec!["w:saw"]])
        .unwrap();
    data.add_group(&["spouse"], none, &[vec!["w:wife"], vec!["w:married"]])
        .unwrap();
    data.add_group(&["sibling"], none, &[vec!["w:sister", "w:of"]])
        .unwrap();
    data.add_group(none, &["spouse"], &[vec!["w:saw"]]).unwrap();
    data.add_group(
        &["spouse", "sibling"],
        none,
        &[vec!["w:married"], vec!["w:brother"]],
    )
    .unwrap();
    data.add_group(none, none, &[vec!["w:met"]]).unwrap();
    data.add_group(&["spouse"], &["sibling"], &[vec!["w:husband", "w:married"]])
        .unwrap();
    data.add_group(none, none, &[vec!["w:saw", "w:met"]])
        .unwrap();
    data
}

fn train(model: ModelType) -> Extractor {
    let config = ExtractorConfig::new(model).with_epochs(3).unwrap();
    let mut extractor = Extractor::from_config(config);
    extractor.train(&mut training_data()).unwrap();
    extractor
}

#[test]
fn test_train_save_load_classify() {
    for model in [
        ModelType::AtLeastOnce,
        ModelType::Perceptron,
        ModelType::PerceptronIncomplete,
        ModelType::LocalBayes,
        ModelType::JointBayes,
    ] {
        let extractor = train(model);
        assert_eq!(extractor.model_type(), model);

        // Use NamedTempFile for automatic cleanup on panic
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        extractor.save(temp_file.path()).unwrap();
        assert!(temp_file.path().exists());

        let loaded = Extractor::load(temp_file.path()).unwrap();
        assert_eq!(loaded.model_type(), model);
        assert_eq!(loaded.feature_index(), extractor.feature_index());
        assert_eq!(loaded.label_index(), extractor.label_index());

        let groups = vec![
            vec![vec!["w:married", "w:to"]],
            vec![vec!["w:brother"], vec!["w:wife"]],
            vec![vec!["w:unknown"]],
            vec![vec!["w:met"], vec!["w:saw"]],
        ];
        for group in &groups {
            assert_eq!(
                loaded.classify(group, 0.0).unwrap(),
                extractor.classify(group, 0.0).unwrap(),
                "{} changed after loading",
                model
            );
        }
        assert_eq!(loaded.to_bytes().unwrap(), extractor.to_bytes().unwrap());
    }
}

#[test]
fn test_classify_scores_are_non_negative() {
    for model in [ModelType::AtLeastOnce, ModelType::JointBayes] {
        let extractor = train(model);
        let result = extractor
            .classify(&[vec!["w:married"], vec!["w:sister", "w:of"]], 0.0)
            .unwrap();
        assert!(result.values().all(|&s| (0.0..=1.0).contains(&s)));
    }
}

#[test]
fn test_untrained_extractor() {
    let extractor = Extractor::from_config(ExtractorConfig::default());
    assert!(extractor.feature_index().is_none());
    assert!(matches!(
        extractor.classify(&[vec!["w:married"]], 0.0),
        Err(Error::NotTrained)
    ));
    assert!(matches!(extractor.to_bytes(), Err(Error::NotTrained)));
}

#[test]
fn test_save_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("model.bin");
    train(ModelType::AtLeastOnce).save(&path).unwrap();
    assert!(path.exists());
}

#[test]
fn test_load_rejects_corrupt_models() {
    assert!(matches!(
        Extractor::from_bytes(b"junk"),
        Err(Error::InvalidFormat(_))
    ));
    assert!(matches!(Extractor::from_bytes(b""), Err(Error::InvalidFormat(_))));

    for model in [ModelType::AtLeastOnce, ModelType::LocalBayes] {
        let buf = train(model).to_bytes().unwrap();
        assert!(Extractor::from_bytes(&buf).is_ok());

        let truncated = &buf[..buf.len() / 2];
        assert!(Extractor::from_bytes(truncated).is_err());

        let mut trailing = buf.clone();
        trailing.push(0);
        assert!(matches!(
            Extractor::from_bytes(&trailing),
            Err(Error::InvalidFormat(_))
        ));

        let mut wrong_version = buf.clone();
        wrong_version[4] = 9;
        assert!(matches!(
            Extractor::from_bytes(&wrong_version),
            Err(Error::InvalidFormat(_))
        ));
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.bin");
    std::fs::write(&path, b"MIML\x01\x00\x00\x00").unwrap();
    assert!(Extractor::load(&path).is_err());
    assert!(matches!(
        Extractor::load(dir.path().join("missing.bin")),
        Err(Error::Io(_))
    ));
}

#[test]
fn test_configuration_selects_variant() {
    let perceptron = Extractor::from_config(ExtractorConfig::new(ModelType::Perceptron));
    assert!(matches!(perceptron, Extractor::Perceptron(_)));
    let joint = Extractor::from_config(ExtractorConfig::new(ModelType::LocalBayes));
    assert!(matches!(joint, Extractor::JointBayes(_)));
}
