use serde::Serialize;

use crate::request::Request;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    Error,
    Success,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastPosition {
    Top,
    #[default]
    Bottom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub id: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: ToastKind,
}

/// The toast stack an edit or show view renders for one request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Toaster {
    pub position: ToastPosition,
    pub toasts: Vec<Toast>,
}

impl Toaster {
    pub fn for_request(request: &Request) -> Self {
        Self {
            position: ToastPosition::Bottom,
            toasts: error_toasts(request),
        }
    }

    pub fn error_count(&self) -> usize {
        self.toasts
            .iter()
            .filter(|toast| toast.kind == ToastKind::Error)
            .count()
    }
}

/// One error toast per error of a rejected request, keyed `error-<timestamp>-<index>`.
pub fn error_toasts(request: &Request) -> Vec<Toast> {
    if !request.is_rejected() {
        return Vec::new();
    }
    let timestamp = request.timestamp.unwrap_or_default();
    request
        .errors
        .iter()
        .enumerate()
        .map(|(index, error)| Toast {
            id: format!("error-{timestamp}-{index}"),
            message: error.title.clone(),
            kind: ToastKind::Error,
        })
        .collect()
}
