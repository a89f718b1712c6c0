use axum::http::StatusCode;
use thiserror::Error;

use agora_core::storage::{repository_error_to_status_code, RepositoryError};

use crate::views::TemplateError;

/// Failure of a pipeline stage or controller.
///
/// Errors travel up through `next` to the pipeline boundary, which renders
/// them once through [`RequestScope::fail`](crate::context::RequestScope::fail).
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Session(#[from] agora_core::auth::AuthError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("{0}")]
    Internal(String),

    #[error("panic: {0}")]
    Panic(String),
}

impl PipelineError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Repository(err) => StatusCode::from_u16(repository_error_to_status_code(err))
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Self::Session(_) | Self::Template(_) | Self::Internal(_) | Self::Panic(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message shown to the client.
    ///
    /// Not found is always "Not Found". Other errors show their full text in
    /// debug mode and the canonical status reason otherwise.
    pub fn public_message(&self, debug: bool) -> String {
        let status = self.status();
        if status == StatusCode::NOT_FOUND {
            return "Not Found".to_string();
        }
        if debug {
            return self.to_string();
        }
        status
            .canonical_reason()
            .unwrap_or("Internal Server Error")
            .to_string()
    }
}

impl From<agora_auth::AuthError> for PipelineError {
    fn from(err: agora_auth::AuthError) -> Self {
        match err {
            agora_auth::AuthError::Core(err) => Self::Session(err),
            other => Self::Internal(other.to_string()),
        }
    }
}
