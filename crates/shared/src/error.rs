use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One entry of a failure response's `errors` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ApiError {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            code: None,
        }
    }

    pub fn with_code(title: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            code: Some(code.into()),
        }
    }
}

/// Body of a non-2xx response: `{ "errors": [{ "title": ..., "code": ... }] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDocument {
    #[serde(default)]
    pub errors: Vec<ApiError>,
}

impl ErrorDocument {
    pub fn single(error: ApiError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl From<Vec<ApiError>> for ErrorDocument {
    fn from(errors: Vec<ApiError>) -> Self {
        Self { errors }
    }
}

#[derive(Debug, Error)]
#[error("{}", titles(.errors))]
pub struct ApiException {
    pub status: u16,
    pub errors: Vec<ApiError>,
}

impl ApiException {
    pub fn new(status: u16, errors: Vec<ApiError>) -> Self {
        Self { status, errors }
    }
}

impl From<ApiException> for ErrorDocument {
    fn from(value: ApiException) -> Self {
        Self {
            errors: value.errors,
        }
    }
}

fn titles(errors: &[ApiError]) -> String {
    errors
        .iter()
        .map(|error| error.title.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
