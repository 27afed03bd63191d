use std::env;
use std::path::PathBuf;

use log::warn;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_MODEL_PATH: &str = "model.json";
pub const DEFAULT_DATASET_PATH: &str = "indian_food_nutrition_dataset.csv";

/// Dataset column names.
pub const CALORIES_COLUMN: &str = "Calories (kcal)";
pub const PROTEIN_COLUMN: &str = "Protein (g)";
pub const CATEGORY_COLUMN: &str = "Category";
pub const DIET_COLUMN: &str = "Dietary Preference";

/// Process-level settings, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub dataset_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            dataset_path: PathBuf::from(DEFAULT_DATASET_PATH),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = match env::var("PORT") {
            Ok(raw) => raw.trim().parse::<u16>().unwrap_or_else(|e| {
                warn!("ignoring PORT={raw:?} ({e}), using {DEFAULT_PORT}");
                DEFAULT_PORT
            }),
            Err(_) => defaults.port,
        };

        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port,
            model_path: env::var("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            dataset_path: env::var("DATASET_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.dataset_path),
        }
    }

    pub fn bind_addr(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

/// Training-time heuristics. None of these are user facing; they only shape
/// how a fresh model is built from the dataset or synthesized without one.
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub seed: u64,
    pub test_ratio: f64,
    pub n_estimators: usize,
    pub dummy_estimators: usize,
    pub dummy_samples: usize,
    pub dummy_accuracy: f64,
    /// Dataset categories whose meals are labelled `north_indian_label`.
    pub north_indian_categories: Vec<String>,
    pub north_indian_label: String,
    pub general_label: String,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            test_ratio: 0.2,
            n_estimators: 100,
            dummy_estimators: 10,
            dummy_samples: 100,
            dummy_accuracy: 0.75,
            north_indian_categories: vec!["Main Dish".to_string(), "Lentil Dish".to_string()],
            north_indian_label: "North Indian".to_string(),
            general_label: "General".to_string(),
        }
    }
}

impl TrainingConfig {
    /// Derives the synthetic cuisine value from a dataset category.
    pub fn cuisine_for(&self, category: &str) -> String {
        if self.north_indian_categories.iter().any(|c| c == category) {
            self.north_indian_label.clone()
        } else {
            self.general_label.clone()
        }
    }
}
