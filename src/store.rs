//! Produces the one model the service runs with.
//!
//! `ModelStore::bootstrap` walks load → train → dummy and stops at the first
//! tier that works. It never fails; the tier reached is kept as `ModelSource`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::{error, info, warn};
use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::classifier::RandomForest;
use crate::config::{ServerConfig, TrainingConfig};
use crate::dataset::{build_training_set, load_training_rows, train_test_split};
use crate::encoder::MealRecord;
use crate::error::StoreError;
use crate::schema::FeatureSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSource {
    /// Read back from a persisted model unit.
    Loaded,
    /// Trained from the dataset at startup.
    Trained,
    /// Synthetic forest over random data; accuracy is a placeholder.
    DummyFallback,
}

/// The persisted unit: forest, the schema it was trained against, and its
/// held-out accuracy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub schema: FeatureSchema,
    pub classifier: RandomForest,
    pub accuracy: f64,
}

impl TrainedModel {
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let reader = BufReader::new(File::open(path)?);
        let model: Self = serde_json::from_reader(reader)?;
        model.check_loaded()?;
        Ok(model)
    }

    /// Writes to a temp file beside `path`, then renames it into place.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer(&mut writer, self)?;
            writer.flush()?;
        }
        tmp.persist(path)?;
        Ok(())
    }

    /// Trains on `rows`: schema from the rows, protein-median labels, a seeded
    /// split and accuracy measured on the held-out side.
    pub fn train(rows: &[MealRecord], cfg: &TrainingConfig) -> Result<Self, StoreError> {
        let set = build_training_set(rows)?;
        let (train_idx, test_idx) = train_test_split(rows.len(), cfg.test_ratio, cfg.seed);

        let x_train = set.features.select(Axis(0), &train_idx);
        let y_train: Vec<bool> = train_idx.iter().map(|&i| set.labels[i]).collect();
        let x_test = set.features.select(Axis(0), &test_idx);
        let y_test: Vec<bool> = test_idx.iter().map(|&i| set.labels[i]).collect();

        let mut classifier = RandomForest::new(cfg.n_estimators, cfg.seed);
        classifier.fit(x_train.view(), &y_train)?;
        let accuracy = classifier.score(x_test.view(), &y_test)?;

        Ok(Self {
            schema: set.schema,
            classifier,
            accuracy,
        })
    }

    /// A forest over the canonical schema fit on seeded random data.
    pub fn dummy(cfg: &TrainingConfig) -> Result<Self, StoreError> {
        let schema = FeatureSchema::canonical();
        let n = cfg.dummy_samples.max(1);
        let mut rng = StdRng::seed_from_u64(cfg.seed);

        let x = Array2::from_shape_simple_fn((n, schema.len()), || rng.gen::<f64>());
        let y: Vec<bool> = (0..n).map(|_| rng.gen_bool(0.5)).collect();

        let mut classifier = RandomForest::new(cfg.dummy_estimators, cfg.seed);
        classifier.fit(x.view(), &y)?;

        Ok(Self {
            schema,
            classifier,
            accuracy: cfg.dummy_accuracy,
        })
    }

    pub fn feature_count(&self) -> usize {
        self.schema.len()
    }

    /// A unit only counts as loaded when its forest is fitted, every tree
    /// stays within bounds, and the schema is as wide as the forest's input.
    fn check_loaded(&self) -> Result<(), StoreError> {
        self.classifier.validate()?;
        if self.schema.len() != self.classifier.n_features() {
            return Err(StoreError::SchemaMismatch {
                schema: self.schema.len(),
                classifier: self.classifier.n_features(),
            });
        }
        Ok(())
    }
}

/// Startup result: the model plus the tier it came from. Read-only afterwards.
#[derive(Debug, Clone)]
pub struct ModelStore {
    model: TrainedModel,
    source: ModelSource,
}

impl ModelStore {
    pub fn new(model: TrainedModel, source: ModelSource) -> Self {
        Self { model, source }
    }

    pub fn bootstrap(server: &ServerConfig, training: &TrainingConfig) -> Self {
        match TrainedModel::load(&server.model_path) {
            Ok(model) => {
                info!(
                    "loaded model from {} ({} features, accuracy {:.3})",
                    server.model_path.display(),
                    model.feature_count(),
                    model.accuracy
                );
                return Self::new(model, ModelSource::Loaded);
            }
            Err(e) => warn!(
                "could not load model from {}: {e}; training from dataset",
                server.model_path.display()
            ),
        }

        match Self::train_from_dataset(server, training) {
            Ok(model) => return Self::new(model, ModelSource::Trained),
            Err(e) => warn!(
                "could not train from {}: {e}; using dummy model",
                server.dataset_path.display()
            ),
        }

        Self::new(Self::dummy_or_untrained(training), ModelSource::DummyFallback)
    }

    fn train_from_dataset(
        server: &ServerConfig,
        training: &TrainingConfig,
    ) -> Result<TrainedModel, StoreError> {
        let rows = load_training_rows(&server.dataset_path, training)?;
        info!("loaded dataset with {} complete rows", rows.len());

        let model = TrainedModel::train(&rows, training)?;
        info!(
            "model trained with accuracy {:.3} over {} features",
            model.accuracy,
            model.feature_count()
        );

        match model.save(&server.model_path) {
            Ok(()) => info!("model saved to {}", server.model_path.display()),
            Err(e) => warn!("trained model not persisted: {e}"),
        }
        Ok(model)
    }

    fn dummy_or_untrained(training: &TrainingConfig) -> TrainedModel {
        match TrainedModel::dummy(training) {
            Ok(model) => {
                info!("dummy model created with {} features", model.feature_count());
                model
            }
            Err(e) => {
                // Predictions will fail with an inference error, but the service stays up.
                error!("dummy model could not be fit: {e}");
                TrainedModel {
                    schema: FeatureSchema::canonical(),
                    classifier: RandomForest::new(training.dummy_estimators, training.seed),
                    accuracy: training.dummy_accuracy,
                }
            }
        }
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    pub fn source(&self) -> ModelSource {
        self.source
    }

    pub fn is_loaded(&self) -> bool {
        self.model.classifier.is_fitted()
    }
}
