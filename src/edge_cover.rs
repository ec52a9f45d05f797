//! Conditional inference for "at least once" supervision.
//!
//! Given per-mention label scores and the gold label set of a group, find a
//! mention to label assignment in which every gold label is explained by at
//! least one mention and every mention explains at most one label. The
//! solver is greedy; it approximates a maximum-weight cover but does not
//! guarantee the optimum.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Result of conditional inference over one group
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeCover {
    /// Target label per mention, `None` when the mention explains no gold label
    pub z_update: Vec<Option<u32>>,
    /// Gold label to the mention covering it
    pub cover: BTreeMap<u32, usize>,
}

impl EdgeCover {
    /// Returns `true` if every label of `gold` is covered
    pub fn covers(&self, gold: &BTreeSet<u32>) -> bool {
        gold.iter().all(|y| self.cover.contains_key(y))
    }
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    mention: usize,
    label: u32,
    score: f64,
}

fn by_score_desc(a: &Edge, b: &Edge) -> Ordering {
    b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal)
}

/// Solve the edge cover problem for one group
///
/// `scores[m][label]` is the score of mention `m` for `label`; `nil` is the
/// id of the "no relation" label, which never needs to be covered.
pub fn edge_cover(scores: &[Vec<f64>], gold: &BTreeSet<u32>, nil: u32) -> EdgeCover {
    let num_mentions = scores.len();
    let mut z_update: Vec<Option<u32>> = vec![None; num_mentions];
    let mut cover = BTreeMap::new();

    // edges between every mention and gold + nil, in (mention, label) order
    let mut edges = Vec::with_capacity(num_mentions * (gold.len() + 1));
    for (mention, row) in scores.iter().enumerate() {
        for (label, &score) in row.iter().enumerate() {
            let label = label as u32;
            if label == nil || gold.contains(&label) {
                edges.push(Edge {
                    mention,
                    label,
                    score,
                });
            }
        }
    }

    if gold.len() > num_mentions {
        // more labels than mentions: cover as many labels as possible
        edges.sort_by(by_score_desc);
        for e in &edges {
            if e.label == nil {
                continue;
            }
            if !cover.contains_key(&e.label) && z_update[e.mention].is_none() {
                z_update[e.mention] = Some(e.label);
                cover.insert(e.label, e.mention);
            }
        }
        return EdgeCover { z_update, cover };
    }

    // each gold label takes its best still unassigned mention
    for &y in gold {
        let mut candidates: Vec<&Edge> = edges.iter().filter(|e| e.label == y).collect();
        candidates.sort_by(|a, b| by_score_desc(a, b));
        if let Some(e) = candidates
            .into_iter()
            .find(|e| z_update[e.mention].is_none())
        {
            z_update[e.mention] = Some(y);
            cover.insert(y, e.mention);
        }
    }

    // leftover mentions take their best edge, unless that edge is nil
    for m in 0..num_mentions {
        if z_update[m].is_some() {
            continue;
        }
        let mut own: Vec<&Edge> = edges.iter().filter(|e| e.mention == m).collect();
        own.sort_by(|a, b| by_score_desc(a, b));
        if let Some(best) = own.first() {
            if best.label != nil {
                z_update[m] = Some(best.label);
            }
        }
    }

    EdgeCover { z_update, cover }
}
