use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

/// Failure type for every account operation.
///
/// Each variant carries a human-readable message and maps to one HTTP status.
/// `IntoResponse` renders the `{ "success": false, "message": ... }` body the
/// frontend expects.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or mismatched request fields, invalid/expired reset token.
    #[error("{0}")]
    Validation(String),

    /// Bad credentials or a missing/invalid session token.
    #[error("{0}")]
    Auth(String),

    /// Authenticated but below the required role tier.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// An external collaborator (the mailer) failed.
    #[error("{0}")]
    Dependency(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Internal(String),
}

/// Convenience alias for handler return values.
pub type ApiResult<T> = Result<T, ApiError>;

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Dependency(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Database(err) => classify_sqlx_error(err).0,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validation(msg)
            | ApiError::Auth(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Dependency(msg) => (self.status(), msg.clone()),
            ApiError::Database(err) => classify_sqlx_error(err),
            ApiError::Internal(msg) => {
                error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "success": false,
            "message": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Map a sqlx error to a status and a message safe to show the client.
///
/// `RowNotFound` maps to 404, a unique-constraint violation (Postgres 23505,
/// in practice the `users.email` key) maps to 400, everything else to a
/// sanitized 500.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, String) {
    match err {
        sqlx::Error::RowNotFound => (StatusCode::NOT_FOUND, "Resource not found".to_string()),
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => (
            StatusCode::BAD_REQUEST,
            "Email already registered".to_string(),
        ),
        other => {
            error!(error = %other, "database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred".to_string(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_map_to_expected_statuses() {
        assert_eq!(
            ApiError::Validation("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Auth("who".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden("no".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound("gone".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Dependency("smtp down".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn row_not_found_maps_to_404() {
        let err = ApiError::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn response_carries_the_variant_status() {
        let res = ApiError::Validation("Please enter name".into()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = ApiError::Auth("Invalid email or password".into()).into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn anyhow_errors_become_internal() {
        let err: ApiError = anyhow::anyhow!("signing failed").into();
        assert!(matches!(err, ApiError::Internal(_)));
    }
}
