//! Error type for `sitrep-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A domain rule violation detected inside the store (duplicate period,
  /// illegal transition, ...). Carried through unchanged.
  #[error(transparent)]
  Core(sitrep_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored value did not decode to its domain type (unknown status code,
  /// unknown report kind, ...).
  #[error("stored value could not be decoded: {0}")]
  Decode(String),
}

impl From<sitrep_core::Error> for Error {
  fn from(e: sitrep_core::Error) -> Self { Self::Core(e) }
}

impl From<rusqlite::Error> for Error {
  fn from(e: rusqlite::Error) -> Self {
    Self::Database(tokio_rusqlite::Error::Rusqlite(e))
  }
}

/// Classify for the API layer: domain errors pass through, busy/locked
/// databases surface as retryable conflicts, everything else is a backend
/// fault.
impl From<Error> for sitrep_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(inner) => inner,
      Error::Database(tokio_rusqlite::Error::Rusqlite(
        rusqlite::Error::SqliteFailure(code, message),
      )) if matches!(
        code.code,
        rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
      ) =>
      {
        sitrep_core::Error::Conflict(
          message.unwrap_or_else(|| code.to_string()),
        )
      }
      other => sitrep_core::Error::Storage(other.to_string()),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
