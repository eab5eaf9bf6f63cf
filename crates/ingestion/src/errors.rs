//! Import error types

use acadex_common::errors::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Cannot open archive {path}: {message}")]
    Archive { path: String, message: String },

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    App(#[from] AppError),
}

impl IngestionError {
    /// A CSV file that is missing, empty, or has a bad row
    pub fn malformed(file: &str, message: impl Into<String>) -> Self {
        IngestionError::App(AppError::MalformedInput {
            file: file.to_string(),
            message: message.into(),
        })
    }

    pub fn is_malformed_input(&self) -> bool {
        matches!(self, IngestionError::App(AppError::MalformedInput { .. }))
    }
}

impl From<sea_orm::DbErr> for IngestionError {
    fn from(e: sea_orm::DbErr) -> Self {
        IngestionError::App(e.into())
    }
}
