//! Error types for `malaria24-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown actor role: {0:?}")]
  UnknownRole(String),

  #[error("unknown digest kind: {0:?}")]
  UnknownDigestKind(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
