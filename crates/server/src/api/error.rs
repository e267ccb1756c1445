//! HTTP error mapping for API handlers.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::Serialize;

use docforge_core::artifact::ArtifactError;
use docforge_core::job::JobError;
use docforge_core::router::RouterError;

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// One error type for all API handlers, mapped to an HTTP status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    #[cfg(test)]
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<ArtifactError> for ApiError {
    fn from(e: ArtifactError) -> Self {
        let status = match &e {
            ArtifactError::NotFound(_) => StatusCode::NOT_FOUND,
            ArtifactError::Expired(_) => StatusCode::GONE,
            ArtifactError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ArtifactError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<JobError> for ApiError {
    fn from(e: JobError) -> Self {
        let status = match &e {
            JobError::NotFound(_) => StatusCode::NOT_FOUND,
            JobError::IllegalTransition { .. } => StatusCode::CONFLICT,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<RouterError> for ApiError {
    fn from(e: RouterError) -> Self {
        match e {
            RouterError::NotSupported { .. } => Self {
                status: StatusCode::UNSUPPORTED_MEDIA_TYPE,
                message: e.to_string(),
            },
            RouterError::QueueFull | RouterError::PoolUnhealthy { .. } => Self {
                status: StatusCode::SERVICE_UNAVAILABLE,
                message: e.to_string(),
            },
            RouterError::Artifact(e) => e.into(),
            RouterError::Job(e) => e.into(),
            // ChainExhausted and Cancelled surface as job states, not
            // as request errors.
            other => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docforge_core::artifact::ArtifactId;
    use docforge_core::format::DocumentFormat;

    #[test]
    fn test_artifact_error_mapping() {
        let id = ArtifactId::generate();
        assert_eq!(
            ApiError::from(ArtifactError::NotFound(id.clone())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(ArtifactError::Expired(id)).status(),
            StatusCode::GONE
        );
        assert_eq!(
            ApiError::from(ArtifactError::TooLarge { size: 2, limit: 1 }).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn test_router_error_mapping() {
        assert_eq!(
            ApiError::from(RouterError::NotSupported {
                source: DocumentFormat::Png,
                target: DocumentFormat::Docx,
            })
            .status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            ApiError::from(RouterError::QueueFull).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
