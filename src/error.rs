use std::error::Error as StdError;
use std::io;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::ErrorBody;

/// Errors surfaced to HTTP callers.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required prediction field is absent.
    #[error("Missing required field: {0}")]
    Validation(String),
    #[error("{0}")]
    BadRequest(String),
    /// Anything that went wrong while building the feature vector or running the forest.
    #[error("{message}")]
    Inference { message: String, trace: String },
}

impl AppError {
    pub fn inference<E: StdError>(stage: &str, err: E) -> Self {
        let mut trace = format!("{stage}: {err}");
        let mut source = err.source();
        while let Some(cause) = source {
            trace.push_str(&format!("\ncaused by: {cause}"));
            source = cause.source();
        }
        Self::Inference {
            message: err.to_string(),
            trace,
        }
    }
}

impl From<MealError> for AppError {
    fn from(e: MealError) -> Self {
        Self::inference("encode meal", e)
    }
}

impl From<ClassifierError> for AppError {
    fn from(e: ClassifierError) -> Self {
        Self::inference("run classifier", e)
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Inference { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let trace = match self {
            Self::Inference { trace, .. } => Some(trace.clone()),
            _ => None,
        };
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
            trace,
        })
    }
}

/// Raised while turning raw meal JSON into a `MealRecord`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MealError {
    #[error("meal must be a JSON object, got {0}")]
    NotAnObject(String),
    #[error("invalid value for `{field}`: expected {expected}, got {got}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
        got: String,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassifierError {
    #[error("cannot fit on an empty training set")]
    EmptyTrainingSet,
    #[error("label count {labels} does not match row count {rows}")]
    LabelMismatch { rows: usize, labels: usize },
    #[error("classifier has not been fitted")]
    NotFitted,
    #[error("tree {tree} references a node or feature out of range")]
    MalformedTree { tree: usize },
    #[error("feature vector has {got} values, classifier expects {expected}")]
    WidthMismatch { expected: usize, got: usize },
}

/// Failures inside the model store. These only drive fallback transitions and
/// are never returned to a caller.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("model unit is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("dataset is not valid csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("dataset has no column named {0:?}")]
    MissingColumn(&'static str),
    #[error("row {row}: cannot parse {column:?} value {value:?} as a number")]
    BadNumber {
        row: usize,
        column: &'static str,
        value: String,
    },
    #[error("feature matrix shape: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("dataset has no complete rows")]
    EmptyDataset,
    #[error("schema has {schema} slots but classifier was trained on {classifier} features")]
    SchemaMismatch { schema: usize, classifier: usize },
    #[error("failed to persist model unit: {0}")]
    Persist(#[from] tempfile::PersistError),
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_400_naming_the_field() {
        let err = AppError::Validation("protein".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Missing required field: protein");
    }

    #[test]
    fn inference_carries_stage_in_trace() {
        let err: AppError = MealError::InvalidField {
            field: "calories",
            expected: "a number",
            got: "\"lots\"".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        match err {
            AppError::Inference { message, trace } => {
                assert!(message.contains("calories"));
                assert!(trace.starts_with("encode meal: "));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
