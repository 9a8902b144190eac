use thiserror::Error;

/// Errors raised while building or parsing model values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Unknown document type: {0}")]
    UnknownDocumentType(String),
    #[error("Unknown role: {0}")]
    UnknownRole(String),
    #[error("Attachment is missing its {0}")]
    IncompleteAttachment(&'static str),
}
