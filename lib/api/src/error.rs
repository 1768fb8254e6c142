//! Error types for the REST API

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use carscope_features::FeatureError;
use carscope_model::ModelError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No model is loaded; prediction features are disabled")]
    ModelUnavailable,

    #[error("Prediction failed: {0}")]
    Model(#[from] ModelError),

    #[error("{0}")]
    Data(#[from] carscope_core::Error),

    #[error("{0}")]
    Feature(#[from] FeatureError),
}

pub type Result<T> = std::result::Result<T, ApiError>;

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Model(ModelError::Data(e)) => data_status(e),
            ApiError::Model(
                ModelError::MissingColumns(_)
                | ModelError::DimensionMismatch { .. }
                | ModelError::Feature(_),
            ) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Model(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Data(e) => data_status(e),
            ApiError::Feature(FeatureError::EmptyDataset) => StatusCode::NOT_FOUND,
            ApiError::Feature(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            tracing::error!(detail = %self, "Internal server error");
        }
        HttpResponse::build(status).json(json!({
            "error": self.to_string()
        }))
    }
}

fn data_status(e: &carscope_core::Error) -> StatusCode {
    use carscope_core::Error;
    match e {
        Error::Csv(_)
        | Error::ColumnNotFound(_)
        | Error::UnsupportedColumn(_)
        | Error::InvalidRange { .. } => StatusCode::BAD_REQUEST,
        Error::EmptyDataset => StatusCode::NOT_FOUND,
        Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
