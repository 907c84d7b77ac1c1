use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde_json::json;
use tracing::error;
use tvshows_dal::show::PatchError;

pub type Error = anyhow::Error;
pub type Result<T, E = Error> = std::result::Result<T, E>;
pub type ApiResult<T, E = ApiError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidQuery(String),

    #[error("{0}")]
    ResourceNotFound(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] tvshows_dal::Error),

    #[error("Show search service error: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<PatchError> for ApiError {
    fn from(value: PatchError) -> Self {
        ApiError::InvalidQuery(value.to_string())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(value: QueryRejection) -> Self {
        ApiError::InvalidQuery(value.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(value: PathRejection) -> Self {
        ApiError::InvalidQuery(value.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        ApiError::InvalidQuery(value.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::InvalidQuery(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::ResourceNotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::StoreUnavailable(e) => {
                error!("Store error: {e}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Show store is unavailable".to_string(),
                )
            }
            ApiError::Upstream(e) => {
                error!("Show search error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "Show search service is unavailable".to_string(),
                )
            }
            ApiError::Serialization(_) | ApiError::InvalidUrl(_) | ApiError::Internal(_) => {
                error!("Internal error: {self}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;

    #[test]
    fn test_status_codes() {
        let resp = ApiError::InvalidQuery("bad".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let resp = ApiError::ResourceNotFound("gone".into()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = ApiError::from(PatchError::ImmutableId).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let resp = ApiError::Internal(anyhow::anyhow!("boom")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    #[traced_test]
    fn test_internal_details_only_logged() {
        let resp = ApiError::Internal(anyhow::anyhow!("disk on fire")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(logs_contain("disk on fire"));
    }
}
