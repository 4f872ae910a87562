//! Error types for the facility importer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("The submitted file is empty.")]
  EmptyUpload,

  #[error("upload is not valid UTF-8")]
  NotUtf8,

  #[error("invalid JSON: {0}")]
  Json(#[from] serde_json::Error),

  #[error("invalid CSV: {0}")]
  Csv(#[from] csv::Error),

  #[error("row {row}: expected an object")]
  NotAnObject { row: usize },

  #[error("row {row}: FacCode is required")]
  MissingCode { row: usize },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// `true` when the upload itself was unacceptable, as opposed to a
  /// failure while writing it.
  pub fn is_invalid_upload(&self) -> bool { !matches!(self, Self::Store(_)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
