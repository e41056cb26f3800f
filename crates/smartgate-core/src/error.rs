//! Error types for `smartgate-core`.

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

/// A type-erased store error, carried inside [`Error::Persistence`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("identity not found: {0}")]
  IdentityNotFound(Uuid),

  #[error("invalid input: {0}")]
  Validation(String),

  /// A conditional attendance write lost against a concurrent writer.
  /// Retried by the tracker; only ever seen wrapped in `Persistence`.
  #[error("concurrent attendance write for {subject_id} on {day}")]
  Conflict { subject_id: Uuid, day: NaiveDate },

  #[error("store failure for {subject_id} on {day}: {source}")]
  Persistence {
    subject_id: Uuid,
    day:        NaiveDate,
    #[source]
    source:     BoxError,
  },
}

impl Error {
  pub fn persistence(
    subject_id: Uuid,
    day: NaiveDate,
    source: impl std::error::Error + Send + Sync + 'static,
  ) -> Self {
    Self::Persistence { subject_id, day, source: Box::new(source) }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
