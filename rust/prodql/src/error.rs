use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

pub type Result<T> = std::result::Result<T, ServiceError>;

const UNSUPPORTED_QUESTION: &str =
    "Sorry, I can't answer that kind of question yet. Try asking about daily, hourly or monthly production, energy or utilisation.";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("authentication failed")]
    Auth,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("no SQL template registered for {category} at {granularity} granularity")]
    TemplateNotFound {
        category: String,
        granularity: String,
    },

    #[error("template '{template}' has no value bound for placeholder '{placeholder}'")]
    MissingParameter {
        template: String,
        placeholder: String,
    },

    #[error("query execution failed: {0}")]
    Execution(String),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    /// Message safe to show an end user in place of an answer.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::TemplateNotFound { .. } | ServiceError::MissingParameter { .. } => {
                UNSUPPORTED_QUESTION.to_string()
            }
            other => other.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match self {
            ServiceError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Auth => StatusCode::UNAUTHORIZED,
            ServiceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::TemplateNotFound { .. } | ServiceError::MissingParameter { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ServiceError::Execution(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if !matches!(
            self,
            ServiceError::InvalidRequest(_) | ServiceError::Auth | ServiceError::TemplateNotFound { .. }
        ) {
            error!(error = %self, "request failed");
        }

        let message = matches!(
            self,
            ServiceError::TemplateNotFound { .. } | ServiceError::MissingParameter { .. }
        )
        .then(|| self.user_message());

        let body = ErrorBody {
            error: self.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}
