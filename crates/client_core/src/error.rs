use shared::{domain::EntityKey, error::ApiError};
use thiserror::Error;

use crate::validation::FieldErrors;

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{key} is not loaded")]
    NotFound { key: EntityKey },
    #[error("request failed with status {status}: {}", join_titles(.errors))]
    Request { status: u16, errors: Vec<ApiError> },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("invalid response body: {0}")]
    Decode(String),
    #[error("form has {} invalid field(s)", .0.len())]
    Validation(FieldErrors),
    #[error("{key} cannot be toggled while a save is in flight")]
    NotToggleable { key: EntityKey },
    #[error("{key} is awaiting deselection confirmation")]
    AwaitingConfirmation { key: EntityKey },
    #[error("{key} has no deselection awaiting confirmation")]
    NoPendingDeselection { key: EntityKey },
    #[error("{key} does not support selection")]
    NotSelectable { key: EntityKey },
    #[error("invalid base url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ClientError {
    /// Errors to show the user; empty for failures that never reached a request.
    pub fn api_errors(&self) -> Vec<ApiError> {
        match self {
            ClientError::Request { errors, .. } => errors.clone(),
            ClientError::Transport(message) | ClientError::Decode(message) => {
                vec![ApiError::new(message.clone())]
            }
            _ => Vec::new(),
        }
    }
}

fn join_titles(errors: &[ApiError]) -> String {
    errors
        .iter()
        .map(|error| error.title.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
