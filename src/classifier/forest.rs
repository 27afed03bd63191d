use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{accuracy, DecisionTree};
use crate::error::ClassifierError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    n_estimators: usize,
    seed: u64,
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn new(n_estimators: usize, seed: u64) -> Self {
        Self {
            n_estimators: n_estimators.max(1),
            seed,
            n_features: 0,
            trees: Vec::new(),
        }
    }

    /// Fits every tree on its own bootstrap sample of the rows of `x`.
    /// Refitting discards the previous trees.
    pub fn fit(&mut self, x: ArrayView2<f64>, y: &[bool]) -> Result<(), ClassifierError> {
        let rows = x.nrows();
        if rows == 0 || x.ncols() == 0 {
            return Err(ClassifierError::EmptyTrainingSet);
        }
        if y.len() != rows {
            return Err(ClassifierError::LabelMismatch {
                rows,
                labels: y.len(),
            });
        }

        let max_features = ((x.ncols() as f64).sqrt().floor() as usize).max(1);
        let mut seeds = StdRng::seed_from_u64(self.seed);

        self.n_features = x.ncols();
        self.trees = (0..self.n_estimators)
            .map(|_| {
                let mut rng = StdRng::seed_from_u64(seeds.gen());
                let bootstrap: Vec<usize> = (0..rows).map(|_| rng.gen_range(0..rows)).collect();
                DecisionTree::fit(x, y, bootstrap, max_features, &mut rng)
            })
            .collect();
        Ok(())
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    /// Width of the vectors the forest was trained on.
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Checks a forest read back from storage before it serves requests.
    pub fn validate(&self) -> Result<(), ClassifierError> {
        if !self.is_fitted() {
            return Err(ClassifierError::NotFitted);
        }
        match self
            .trees
            .iter()
            .position(|t| !t.is_well_formed(self.n_features))
        {
            Some(tree) => Err(ClassifierError::MalformedTree { tree }),
            None => Ok(()),
        }
    }

    /// Probability of the positive class, averaged over the trees.
    pub fn predict_proba(&self, row: &[f64]) -> Result<f64, ClassifierError> {
        if !self.is_fitted() {
            return Err(ClassifierError::NotFitted);
        }
        if row.len() != self.n_features {
            return Err(ClassifierError::WidthMismatch {
                expected: self.n_features,
                got: row.len(),
            });
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict_proba(row)).sum();
        Ok(sum / self.trees.len() as f64)
    }

    pub fn predict(&self, row: &[f64]) -> Result<bool, ClassifierError> {
        Ok(self.predict_proba(row)? > 0.5)
    }

    /// Accuracy over the labelled rows of `x`.
    pub fn score(&self, x: ArrayView2<f64>, y: &[bool]) -> Result<f64, ClassifierError> {
        if y.len() != x.nrows() {
            return Err(ClassifierError::LabelMismatch {
                rows: x.nrows(),
                labels: y.len(),
            });
        }
        let predicted = x
            .outer_iter()
            .map(|row| self.predict(&row.to_vec()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(accuracy(&predicted, y))
    }
}
