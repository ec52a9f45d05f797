use std::collections::BTreeSet;
use std::fmt;

/// Label-level precision/recall over groups, plus exact-match group accuracy
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Score {
    /// Predicted labels that are gold
    pub correct: usize,
    /// All predicted labels
    pub predicted: usize,
    /// All gold labels
    pub total: usize,
    /// Groups whose predicted set equals the gold set
    pub groups_correct: usize,
    pub groups: usize,
}

impl Score {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one group's predicted and gold label sets
    pub fn add<T: Ord>(&mut self, predicted: &BTreeSet<T>, gold: &BTreeSet<T>) {
        self.predicted += predicted.len();
        self.total += gold.len();
        self.correct += predicted.intersection(gold).count();
        self.groups += 1;
        if predicted == gold {
            self.groups_correct += 1;
        }
    }

    pub fn precision(&self) -> f64 {
        ratio(self.correct, self.predicted)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.correct, self.total)
    }

    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p != 0.0 && r != 0.0 {
            2.0 * p * r / (p + r)
        } else {
            0.0
        }
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.groups_correct, self.groups)
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "P {:.4} R {:.4} F1 {:.4} A {:.4}",
            self.precision(),
            self.recall(),
            self.f1(),
            self.accuracy()
        )
    }
}
