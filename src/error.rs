use thiserror::Error;

/// Errors produced by editor operations.
///
/// All of these are recoverable: callers catch them at the operation
/// boundary, surface a notification and leave the document as it was.
#[derive(Debug, Error)]
pub enum EditorError {
    /// Rejected input (bad dimensions, oversize upload, oversize document).
    #[error("{0}")]
    Validation(String),

    /// A payload that should have been parseable was not.
    #[error("failed to parse {context}: {detail}")]
    Parse { context: &'static str, detail: String },

    /// A font, image or remote resource failed to load. Retryable by
    /// repeating the action that needed it.
    #[error("failed to load {what}: {detail}")]
    ResourceLoad { what: String, detail: String },
}

/// Failures that end a session instead of degrading it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("template not found")]
    TemplateNotFound,

    #[error("this template cannot be customized")]
    NotCustomizable,

    #[error("template has no usable settings: {0}")]
    InvalidSettings(String),

    #[error("could not reach the template store: {0}")]
    StoreUnavailable(String),
}

pub type EditorResult<T> = Result<T, EditorError>;
