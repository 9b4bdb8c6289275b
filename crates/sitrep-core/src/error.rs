//! Error types for `sitrep-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::situation::Status;

#[derive(Debug, Error)]
pub enum Error {
  #[error("situation not found: {0}")]
  SituationNotFound(Uuid),

  #[error("structure not found: {0:?}")]
  StructureNotFound(String),

  #[error("user not found: {0}")]
  UserNotFound(Uuid),

  #[error("category not found: {0:?}")]
  CategoryNotFound(String),

  #[error("a situation for {structure} {month} {year} already exists")]
  DuplicatePeriod {
    structure: String,
    month:     String,
    year:      String,
  },

  #[error("cannot {action} a situation in the {from} state")]
  InvalidTransition { from: Status, action: &'static str },

  #[error("a rejection requires a non-empty comment")]
  EmptyRejectionComment,

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("user {0} still owns situations and cannot be deleted")]
  OwnedSituationsExist(Uuid),

  #[error("concurrent modification detected: {0}")]
  Conflict(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("storage error: {0}")]
  Storage(String),
}

impl Error {
  /// Shorthand for the ownership gate failure on mutations.
  pub fn not_owner() -> Self {
    Self::Forbidden("only the owner may modify this situation".into())
  }

  /// Shorthand for a scope-membership failure on reads or validations.
  pub fn out_of_scope() -> Self {
    Self::Forbidden("situation is outside the caller's scope".into())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
