//! Random forest binary classifier.
//!
//! Trees are CART classifiers split on Gini impurity. The forest reports the
//! mean positive-class probability of its trees.

mod forest;
mod tree;

pub use forest::RandomForest;
pub use tree::DecisionTree;

/// Fraction of `predicted` that equals `actual`.
pub fn accuracy(predicted: &[bool], actual: &[bool]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let hits = predicted
        .iter()
        .zip(actual)
        .filter(|(p, a)| p == a)
        .count();
    hits as f64 / actual.len() as f64
}
