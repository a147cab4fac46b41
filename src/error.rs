use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Card declined and similar errors the payer can act on
    #[error("Payment error: {0}")]
    Payment(String),

    #[error("Stripe error: {0}")]
    Stripe(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Stripe(err.to_string())
    }
}

impl AppError {
    /// Whether this is a database unique-constraint violation
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, AppError::Database(err) if is_unique_violation(err))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::MissingFields(_)
            | AppError::Conflict(_)
            | AppError::Payment(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) | AppError::TokenExpired => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(err) if is_unique_violation(err) => StatusCode::BAD_REQUEST,
            AppError::Database(_)
            | AppError::Migration(_)
            | AppError::Stripe(_)
            | AppError::Config(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match self {
            AppError::MissingFields(fields) => serde_json::json!({
                "error": "Missing required fields",
                "missing_fields": fields,
            }),
            AppError::Validation(msg)
            | AppError::Auth(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::Payment(msg) => serde_json::json!({ "error": msg }),
            AppError::TokenExpired => serde_json::json!({ "error": "Token expired" }),
            AppError::Database(err) if is_unique_violation(&err) => {
                tracing::debug!("Unique constraint violated: {}", err);
                serde_json::json!({ "error": "Duplicate entry" })
            }
            err => {
                tracing::error!("{}", err);
                serde_json::json!({ "error": "Internal server error" })
            }
        };

        (status, Json(body)).into_response()
    }
}
