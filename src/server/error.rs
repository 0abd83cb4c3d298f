use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::ingest::AdmissionError;
use crate::store::StoreError;

#[derive(Debug)]
pub enum ApiError {
    Admission(AdmissionError),
    /// Request body was not JSON, or not sent as JSON
    Body(JsonRejection),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Store(StoreError),
    Internal(String),
}

impl ApiError {
    pub fn not_found(collection: &str, id: &str) -> Self {
        ApiError::NotFound(format!("{collection} {id} not found"))
    }

    pub fn internal(error: impl std::fmt::Display) -> Self {
        ApiError::Internal(error.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Admission(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Body(rejection) => rejection.status(),
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Store(StoreError::Protocol(_)) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Store(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::Admission(e) => e.to_string(),
            ApiError::Body(rejection) => rejection.body_text(),
            ApiError::Store(e) => e.to_string(),
            ApiError::BadRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::Internal(msg) => msg.clone(),
        }
    }
}

impl From<AdmissionError> for ApiError {
    fn from(e: AdmissionError) -> Self {
        ApiError::Admission(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Body(rejection)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Store(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        if status.is_server_error() {
            log::error!("{} {}", status, message);
        } else {
            log::debug!("{} {}", status, message);
        }

        let body = serde_json::json!({ "success": false, "error": message });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(AdmissionError::EmptyBatch).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::not_found("vendors", "7").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Conflict("V1: already exists".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(StoreError::Transport("timed out".into())).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(StoreError::Protocol("bad json".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_message() {
        let err = ApiError::from(AdmissionError::NotAnObject { row: 3 });
        assert_eq!(err.message(), "row 3: record must be an object");
        assert_eq!(ApiError::not_found("brands", "9").message(), "brands 9 not found");
    }
}
