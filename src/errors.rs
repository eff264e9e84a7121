use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("invalid or expired token")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    RateLimited { message: String, retry_after: u64 },

    #[error("{0}")]
    Upstream(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match &self {
            // Internal detail stays in the logs; callers get a generic message.
            AppError::Database(e) => {
                tracing::error!(error = %e, "database failure");
                serde_json::json!({ "error": "internal server error" })
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal failure");
                serde_json::json!({ "error": "internal server error" })
            }
            AppError::RateLimited {
                message,
                retry_after,
            } => serde_json::json!({ "error": message, "retry_after": retry_after }),
            AppError::Upstream(message) => {
                serde_json::json!({ "error": "payment creation failed", "message": message })
            }
            other => serde_json::json!({ "error": other.to_string() }),
        };

        (status, axum::Json(body)).into_response()
    }
}
