use actix_web::{HttpResponse, http::StatusCode};
use thiserror::Error;

/// Unified error type of the workflow engine. Every rejected transition names
/// the expected prior state so the caller can explain why.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{0}")]
    Validation(String),

    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// The record exists but belongs to another district. Renders exactly
    /// like `NotFound` so a caller cannot probe other districts.
    #[error("{entity} not found")]
    TenantMismatch { entity: &'static str },

    #[error("cannot {action}: requires {expected}, but record is {actual}")]
    InvalidState {
        action: &'static str,
        expected: String,
        actual: String,
    },

    #[error("record is locked: {reason}")]
    Locked { reason: String },

    #[error("record was modified concurrently, please retry")]
    Conflict,

    /// Recommendation-service failures. Callers downgrade this to an
    /// informational note; it never fails an enclosing operation.
    #[error("substitute recommendation unavailable: {0}")]
    External(String),

    #[error("database error")]
    Database(#[from] sqlx::Error),
}

impl WorkflowError {
    pub fn validation(msg: impl Into<String>) -> Self {
        WorkflowError::Validation(msg.into())
    }
}

impl actix_web::ResponseError for WorkflowError {
    fn status_code(&self) -> StatusCode {
        match self {
            WorkflowError::Validation(_) => StatusCode::BAD_REQUEST,
            WorkflowError::NotFound { .. } | WorkflowError::TenantMismatch { .. } => {
                StatusCode::NOT_FOUND
            }
            WorkflowError::InvalidState { .. } | WorkflowError::Conflict => StatusCode::CONFLICT,
            WorkflowError::Locked { .. } => StatusCode::LOCKED,
            WorkflowError::External(_) | WorkflowError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            WorkflowError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(serde_json::json!({ "message": message }))
    }
}
