//! Analysis pipeline error types

use clauselens_common::errors::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("PDF parse error: {message}")]
    PdfParse { message: String },

    #[error("No text content extracted from PDF")]
    EmptyDocument,

    #[error("Uploaded file is not a PDF")]
    NotAPdf,

    #[error("Staged upload expired or missing: {key}")]
    UploadExpired { key: String },

    #[error("Malformed model response: {message}")]
    MalformedResponse { message: String },

    #[error("Model response missing required field: {field}")]
    IncompleteReport { field: String },

    #[error(transparent)]
    Upstream(#[from] AppError),
}

impl From<AnalysisError> for AppError {
    fn from(e: AnalysisError) -> Self {
        match e {
            AnalysisError::PdfParse { message } => AppError::UnreadableDocument { message },
            AnalysisError::EmptyDocument => AppError::UnreadableDocument {
                message: "no text content could be extracted".to_string(),
            },
            AnalysisError::NotAPdf => AppError::UnsupportedMediaType {
                content_type: "only PDF documents are accepted".to_string(),
            },
            AnalysisError::UploadExpired { .. } => AppError::Validation {
                message: "uploaded file expired, please upload it again".to_string(),
                field: Some("contract".to_string()),
            },
            AnalysisError::MalformedResponse { message } => AppError::MalformedAiResponse { message },
            AnalysisError::IncompleteReport { field } => AppError::MalformedAiResponse {
                message: format!("missing required field '{}'", field),
            },
            AnalysisError::Upstream(inner) => inner,
        }
    }
}
