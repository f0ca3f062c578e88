use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pentkit_core::{CatalogError, ErrorKind};
use serde_json::json;

/// HTTP wrapper around a catalog error
#[derive(Debug)]
pub struct ApiError(pub CatalogError);

pub type ApiResult<T> = Result<T, ApiError>;

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(CatalogError::validation(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError(CatalogError::validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let message = match kind {
            ErrorKind::InternalError => {
                tracing::error!(error = %self.0, "request failed");
                "Internal server error".to_string()
            }
            _ => {
                tracing::debug!(%kind, error = %self.0, "request rejected");
                self.0.to_string()
            }
        };
        let body = Json(json!({
            "error": {
                "kind": kind,
                "message": message,
            }
        }));
        (status_for(kind), body).into_response()
    }
}
