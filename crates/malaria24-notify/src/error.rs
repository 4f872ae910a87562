//! Error type for `malaria24-notify`.
//!
//! These errors never reach an HTTP caller; the worker logs them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("case not found: {0}")]
  CaseNotFound(i64),

  #[error("digest period of {0} days is out of range")]
  PeriodOutOfRange(i64),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("mail error: {0}")]
  Mail(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
