//! Shared API types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::broker::BrokerError;
use crate::data::PostgresError;

/// Standard API error response.
///
/// Domain conflicts surface as 400 with a human-readable reason;
/// infrastructure failures surface as 500 without internal detail.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Internal(String),
    ServiceUnavailable,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// A store error at the API edge: a lookup that found nothing is the
    /// caller's mistake; everything else is ours.
    pub fn from_store(e: PostgresError) -> Self {
        match e {
            PostgresError::Database(sqlx::Error::RowNotFound) => Self::BadRequest(e.to_string()),
            other => {
                tracing::error!(error = %other, "Store error");
                Self::Internal("database operation failed".to_string())
            }
        }
    }

    /// A broker error at the API edge: schema violations are rejected
    /// locally before anything is sent, so they are the caller's 400.
    pub fn from_broker(e: BrokerError) -> Self {
        if e.is_schema_violation() {
            Self::BadRequest(e.to_string())
        } else {
            tracing::error!(error = %e, "Broker error");
            Self::Internal("failed to publish message".to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message),
            Self::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
            Self::ServiceUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service unavailable".to_string(),
            ),
        };
        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::SchemaError;

    #[test]
    fn row_not_found_is_a_bad_request() {
        let err = ApiError::from_store(PostgresError::Database(sqlx::Error::RowNotFound));
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn other_store_errors_are_internal() {
        let err = ApiError::from_store(PostgresError::ZeroRows);
        assert!(matches!(err, ApiError::Internal(_)));
    }

    #[test]
    fn schema_violation_is_a_bad_request() {
        let err = ApiError::from_broker(BrokerError::Schema(SchemaError::Invalid {
            schema: "ingestion-accession".to_string(),
            detail: "does not match pattern".to_string(),
        }));
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
