//! Structured perceptron step with "at least once" conditional inference.

use crate::aggregate::deterministic_or;
use crate::dataset::Group;
use crate::edge_cover::edge_cover;
use crate::local::{predict_label, PerceptronClassifier};

use super::perceptron::GroupUpdate;

/// Process one group with the live weights
///
/// Nothing changes when the labels predicted by the mentions already equal
/// the gold set. Otherwise the edge cover decides which label every mention
/// should have predicted and the weights are moved towards it.
pub fn train_group(clf: &mut PerceptronClassifier, group: &Group, nil: u32) -> GroupUpdate {
    let scores: Vec<Vec<f64>> = group
        .mentions
        .iter()
        .map(|m| clf.live_scores(m))
        .collect();
    let z_predicted: Vec<u32> = scores.iter().map(|s| predict_label(s, nil)).collect();
    let y_predicted = deterministic_or(&z_predicted, nil);

    let mut update = GroupUpdate {
        z_predicted,
        ..GroupUpdate::default()
    };
    if y_predicted == group.positive {
        return update;
    }

    let cover = edge_cover(&scores, &group.positive, nil);
    tracing::debug!(
        mentions = group.len(),
        gold = ?group.positive,
        predicted = ?y_predicted,
        z_update = ?cover.z_update,
        "conditional inference"
    );

    for (m, target) in cover.z_update.iter().enumerate() {
        let pred = update.z_predicted[m];
        match *target {
            Some(gold) => {
                if pred != gold {
                    // includes the nil prediction of a mention that must explain a label
                    update.apply(clf, group, m, pred, -1.0);
                    update.apply(clf, group, m, gold, 1.0);
                }
            }
            None => {
                if pred != nil {
                    update.apply(clf, group, m, pred, -1.0);
                    update.apply(clf, group, m, nil, 1.0);
                }
            }
        }
    }

    update
}
