use std::collections::BTreeSet;

use mimlre::train::{ExtractorConfig, ModelType, PerceptronExtractor};
use mimlre::{edge_cover, MultiLabelDataset, RelationExtractor, UNRELATED};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn training_data() -> MultiLabelDataset {
    let none: &[&str] = &[];
    let mut data = MultiLabelDataset::new();
    data.add_group(&["born_in"], &["works_for"], &[vec!["w:born", "w:in"]])
        .unwrap();
    data.add_group(&["works_for"], &["born_in"], &[vec!["w:works", "w:for"]])
        .unwrap();
    data.add_group(none, none, &[vec!["w:visited"]]).unwrap();
    data.add_group(&["born_in"], none, &[vec!["w:born"], vec!["w:born", "w:native"]])
        .unwrap();
    data.add_group(&["works_for"], none, &[vec!["w:works", "w:at"]])
        .unwrap();
    data.add_group(none, none, &[vec!["w:visited"], vec!["w:met"]])
        .unwrap();
    data.add_group(
        &["born_in", "works_for"],
        none,
        &[vec!["w:born", "w:in"], vec!["w:works", "w:for"]],
    )
    .unwrap();
    data.add_group(none, &["born_in"], &[vec!["w:met"]]).unwrap();
    data
}

fn train(model: ModelType) -> PerceptronExtractor {
    let config = ExtractorConfig::new(model).with_epochs(5).unwrap();
    let mut extractor = PerceptronExtractor::new(config);
    extractor.train(&mut training_data()).unwrap();
    extractor
}

#[test]
fn test_learns_separable_relations() {
    let extractor = train(ModelType::AtLeastOnce);

    let born = extractor.classify(&[vec!["w:born", "w:in"]], 0.0).unwrap();
    assert!(born.contains_key("born_in"));
    assert!(!born.contains_key("works_for"));
    assert!(born["born_in"] > 0.0 && born["born_in"] <= 1.0);

    let works = extractor.classify(&[vec!["w:works"]], 0.0).unwrap();
    assert!(works.contains_key("works_for"));
    assert!(!works.contains_key("born_in"));

    let both = extractor
        .classify(&[vec!["w:born"], vec!["w:works"]], 0.0)
        .unwrap();
    assert_eq!(both.len(), 2);
}

#[test]
fn test_unrelated_label_is_never_reported() {
    let extractor = train(ModelType::AtLeastOnce);
    let labels = extractor.label_index().unwrap();
    assert_eq!(labels.index_of(UNRELATED), Some(labels.len() as u32 - 1));

    let unknown = extractor.classify(&[vec!["w:unseen"]], 0.0).unwrap();
    assert!(unknown.is_empty());
    let result = extractor.classify(&[vec!["w:met"]], 0.0).unwrap();
    assert!(!result.contains_key(UNRELATED));
}

#[test]
fn test_threshold_filters_labels() {
    let extractor = train(ModelType::AtLeastOnce);
    let all = extractor.classify(&[vec!["w:born"]], 0.0).unwrap();
    assert!(!all.is_empty());
    let none = extractor.classify(&[vec!["w:born"]], 1.5).unwrap();
    assert!(none.is_empty());
}

#[test]
fn test_deterministic_replay() {
    let a = train(ModelType::AtLeastOnce);
    let b = train(ModelType::AtLeastOnce);
    assert_eq!(a.label_weights(), b.label_weights());
    assert_eq!(a.to_bytes().unwrap(), b.to_bytes().unwrap());

    let mut x = training_data();
    let mut y = training_data();
    x.randomize(7);
    y.randomize(7);
    assert_eq!(x.groups(), y.groups());
}

#[test]
fn test_live_weights_are_dropped() {
    let extractor = train(ModelType::AtLeastOnce);
    for lw in extractor.label_weights().unwrap() {
        assert!(lw.weights().is_empty());
        assert_eq!(lw.avg_weights().len(), extractor.feature_index().unwrap().len());
    }
}

#[test]
fn test_local_perceptron_baselines() {
    for model in [ModelType::Perceptron, ModelType::PerceptronIncomplete] {
        let extractor = train(model);
        assert_eq!(extractor.model_type(), model);
        let born = extractor.classify(&[vec!["w:native"]], 0.0).unwrap();
        assert!(born.contains_key("born_in"), "{} missed born_in", model);
    }
}

#[test]
fn test_test_scores_every_group() {
    let extractor = train(ModelType::AtLeastOnce);
    let data = training_data();
    let score = extractor.test(&data, 0.0).unwrap();
    assert_eq!(score.groups, data.len());
    assert_eq!(score.total, 6);
    assert!(score.recall() > 0.0);
}

#[test]
fn test_reserved_label_is_rejected() {
    let mut data = MultiLabelDataset::new();
    data.add_group(&[UNRELATED], &[] as &[&str], &[vec!["f"]])
        .unwrap();
    let mut extractor = PerceptronExtractor::new(ExtractorConfig::default());
    assert!(extractor.train(&mut data).is_err());
}

#[test]
fn test_edge_cover_covers_every_gold_label() {
    let mut rng = StdRng::seed_from_u64(42);
    let nil = 4;
    for _ in 0..200 {
        let mentions = rng.gen_range(1..6);
        let scores: Vec<Vec<f64>> = (0..mentions)
            .map(|_| (0..5).map(|_| rng.gen_range(-1.0..1.0)).collect())
            .collect();
        let gold: BTreeSet<u32> = (0..nil).filter(|_| rng.gen_bool(0.5)).collect();
        let cover = edge_cover(&scores, &gold, nil);

        assert_eq!(cover.z_update.len(), mentions);
        if gold.len() <= mentions {
            assert!(cover.covers(&gold));
            for y in &gold {
                let assigned = cover.z_update.iter().filter(|z| **z == Some(*y)).count();
                assert!(assigned >= 1);
                assert_eq!(cover.z_update[cover.cover[y]], Some(*y));
            }
        } else {
            assert_eq!(cover.cover.len(), mentions);
        }
        assert!(cover.z_update.iter().flatten().all(|z| gold.contains(z)));
    }
}
