use log::warn;
use serde_json::Value;

use crate::encoder::{encode, MealRecord};
use crate::error::AppError;
use crate::models::{BatchItem, BatchResponse, PredictionResponse};
use crate::store::{ModelStore, TrainedModel};

/// Fields `/predict` insists on. Batch entries are not checked against these.
pub const REQUIRED_FIELDS: [&str; 5] = ["calories", "protein", "cuisine", "category", "diet"];

const UNKNOWN_MEAL: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub recommended: bool,
    pub confidence: f64,
}

/// Encoder plus forest, shared read-only by every worker.
#[derive(Debug, Clone)]
pub struct PredictionService {
    store: ModelStore,
}

impl PredictionService {
    pub fn new(store: ModelStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    pub fn model(&self) -> &TrainedModel {
        self.store.model()
    }

    pub fn predict(&self, meal: &MealRecord) -> Result<Prediction, AppError> {
        let model = self.model();
        let vector = encode(meal, &model.schema);
        let confidence = model.classifier.predict_proba(&vector)?;
        Ok(Prediction {
            recommended: confidence > 0.5,
            confidence,
        })
    }

    /// Single prediction. Every field in `REQUIRED_FIELDS` must be present.
    pub fn predict_one(&self, body: &Value) -> Result<PredictionResponse, AppError> {
        let obj = body
            .as_object()
            .ok_or_else(|| AppError::BadRequest("request body must be a JSON object".to_string()))?;
        if let Some(missing) = REQUIRED_FIELDS.iter().find(|f| !obj.contains_key(**f)) {
            return Err(AppError::Validation(missing.to_string()));
        }

        let meal = MealRecord::from_json(body)?;
        let prediction = self.predict(&meal)?;
        Ok(PredictionResponse {
            meal_name: meal_name(body),
            recommended: prediction.recommended,
            confidence: prediction.confidence,
            features_used: self.model().feature_count(),
        })
    }

    /// Predicts every entry; a failing entry becomes an inline error.
    pub fn predict_batch(&self, meals: &[Value]) -> BatchResponse {
        let results: Vec<BatchItem> = meals
            .iter()
            .map(|raw| {
                let meal_name = meal_name(raw);
                let outcome = MealRecord::from_json(raw)
                    .map_err(AppError::from)
                    .and_then(|meal| self.predict(&meal));
                match outcome {
                    Ok(p) => BatchItem::Prediction {
                        meal_name,
                        recommended: p.recommended,
                        confidence: p.confidence,
                    },
                    Err(e) => {
                        warn!("batch entry {meal_name:?} failed: {e}");
                        BatchItem::Failure {
                            meal_name,
                            error: e.to_string(),
                        }
                    }
                }
            })
            .collect();

        BatchResponse {
            successful_predictions: results.iter().filter(|r| r.is_success()).count(),
            total_meals: meals.len(),
            results,
        }
    }
}

fn meal_name(raw: &Value) -> String {
    raw.get("meal_name")
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN_MEAL)
        .to_string()
}
