use std::collections::BTreeMap;

use serde::Serialize;

use crate::store::ModelSource;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PredictionResponse {
    pub meal_name: String,
    pub recommended: bool,
    pub confidence: f64,
    pub features_used: usize,
}

/// One entry of a batch response; failures are reported inline.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum BatchItem {
    Prediction {
        meal_name: String,
        recommended: bool,
        confidence: f64,
    },
    Failure {
        meal_name: String,
        error: String,
    },
}

impl BatchItem {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Prediction { .. })
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct BatchResponse {
    pub results: Vec<BatchItem>,
    pub total_meals: usize,
    pub successful_predictions: usize,
}

#[derive(Debug, Serialize)]
pub struct FeaturesResponse {
    pub features: Vec<String>,
    pub feature_count: usize,
    pub model_accuracy: f64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_loaded: bool,
    pub model_source: ModelSource,
    pub feature_count: usize,
    pub model_accuracy: f64,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub message: &'static str,
    /// Three decimals, or `N/A` when no accuracy is known.
    pub model_accuracy: String,
    pub feature_count: usize,
    pub model_loaded: bool,
    pub model_source: ModelSource,
    pub endpoints: BTreeMap<&'static str, &'static str>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}
