use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        positive: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fully grown classification tree. Nodes live in a flat arena, the root at 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    max_features: usize,
}

struct Candidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

impl DecisionTree {
    /// Grows a tree over the rows of `x` named by `samples` (duplicates allowed).
    /// `max_features` features are considered per split, more only when none of
    /// those separates the samples.
    pub fn fit(
        x: ArrayView2<f64>,
        y: &[bool],
        samples: Vec<usize>,
        max_features: usize,
        rng: &mut StdRng,
    ) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            max_features: max_features.max(1),
        };
        tree.grow(x, y, samples, rng);
        tree
    }

    #[cfg(test)]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Whether every split names a feature below `n_features` and children that
    /// come after it in the arena, so traversal stays in bounds and terminates.
    pub fn is_well_formed(&self, n_features: usize) -> bool {
        !self.nodes.is_empty()
            && self.nodes.iter().enumerate().all(|(idx, node)| match node {
                Node::Leaf { .. } => true,
                Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    *feature < n_features
                        && (idx + 1..self.nodes.len()).contains(left)
                        && (idx + 1..self.nodes.len()).contains(right)
                }
            })
    }

    /// Positive-class probability for one row.
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { positive } => return *positive,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    fn grow(
        &mut self,
        x: ArrayView2<f64>,
        y: &[bool],
        samples: Vec<usize>,
        rng: &mut StdRng,
    ) -> usize {
        let positives = samples.iter().filter(|&&i| y[i]).count();
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            positive: positives as f64 / samples.len().max(1) as f64,
        });

        if samples.len() < 2 || positives == 0 || positives == samples.len() {
            return id;
        }

        let Some(best) = self.best_split(x, y, &samples, rng) else {
            return id;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = samples
            .into_iter()
            .partition(|&i| x[[i, best.feature]] <= best.threshold);

        let left = self.grow(x, y, left, rng);
        let right = self.grow(x, y, right, rng);
        self.nodes[id] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        id
    }

    fn best_split(
        &self,
        x: ArrayView2<f64>,
        y: &[bool],
        samples: &[usize],
        rng: &mut StdRng,
    ) -> Option<Candidate> {
        let mut features: Vec<usize> = (0..x.ncols()).collect();
        features.shuffle(rng);

        let mut best: Option<Candidate> = None;
        for (visited, &feature) in features.iter().enumerate() {
            if visited >= self.max_features && best.is_some() {
                break;
            }
            if let Some(c) = split_on(x, y, samples, feature) {
                if best.as_ref().map_or(true, |b| c.impurity < b.impurity) {
                    best = Some(c);
                }
            }
        }
        best
    }
}

/// Lowest weighted Gini impurity split on one feature, if the feature takes
/// more than one value among `samples`.
fn split_on(
    x: ArrayView2<f64>,
    y: &[bool],
    samples: &[usize],
    feature: usize,
) -> Option<Candidate> {
    let mut sorted: Vec<(f64, bool)> = samples
        .iter()
        .map(|&i| (x[[i, feature]], y[i]))
        .collect();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

    let n = sorted.len() as f64;
    let total_pos = sorted.iter().filter(|s| s.1).count() as f64;
    let mut left_pos = 0.0;
    let mut best: Option<Candidate> = None;

    for k in 1..sorted.len() {
        if sorted[k - 1].1 {
            left_pos += 1.0;
        }
        if sorted[k - 1].0 == sorted[k].0 {
            continue;
        }
        let left_n = k as f64;
        let right_n = n - left_n;
        let impurity = (left_n * gini(left_pos, left_n)
            + right_n * gini(total_pos - left_pos, right_n))
            / n;
        if best.as_ref().map_or(true, |b| impurity < b.impurity) {
            best = Some(Candidate {
                feature,
                threshold: (sorted[k - 1].0 + sorted[k].0) / 2.0,
                impurity,
            });
        }
    }
    best
}

fn gini(positives: f64, n: f64) -> f64 {
    let p = positives / n;
    2.0 * p * (1.0 - p)
}
