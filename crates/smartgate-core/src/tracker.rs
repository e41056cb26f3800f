//! The attendance session tracker.
//!
//! Turns a stream of identity events into at most one check-in and one
//! check-out per subject per day:
//!
//! | stored record for the day | effect of an event            |
//! |---------------------------|-------------------------------|
//! | none                      | open it (check-in, `present`) |
//! | open (no check-out)       | close it (check-out, hours)   |
//! | closed                    | nothing; returned as-is       |
//!
//! Each step is a conditional write. When a concurrent writer gets there
//! first the tracker re-reads and re-derives the step, so a losing check-in
//! becomes a check-out and a losing check-out returns the closed record.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  attendance::{
    AttendanceMethod, AttendanceRecord, AttendanceStatus, PriorState, WriteOutcome, day_key,
    status_for,
  },
  store::RecordStore,
};

/// How many times a conditional write is attempted before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// One resolved identity event.
#[derive(Debug, Clone)]
pub struct AttendanceEvent {
  pub subject_id:   Uuid,
  pub display_name: String,
  pub at:           DateTime<Utc>,
  pub method:       AttendanceMethod,
}

/// Derives and persists attendance transitions over a [`RecordStore`].
pub struct AttendanceTracker<S> {
  store:        Arc<S>,
  max_attempts: u32,
}

impl<S> Clone for AttendanceTracker<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), max_attempts: self.max_attempts }
  }
}

impl<S: RecordStore> AttendanceTracker<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self { store, max_attempts: DEFAULT_MAX_ATTEMPTS }
  }

  /// Override the conflict retry bound (minimum one attempt).
  pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
    self.max_attempts = max_attempts.max(1);
    self
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  /// Record an event for an already-resolved subject and return the
  /// resulting record for its day.
  pub async fn record_event(&self, event: AttendanceEvent) -> Result<AttendanceRecord> {
    if event.subject_id.is_nil() {
      return Err(Error::Validation("subject id must not be nil".into()));
    }
    if event.display_name.trim().is_empty() {
      return Err(Error::Validation(format!(
        "display name for {} must not be empty",
        event.subject_id
      )));
    }

    let subject_id = event.subject_id;
    let day = day_key(event.at);
    let persistence = |e: S::Error| Error::persistence(subject_id, day, e);

    for attempt in 1..=self.max_attempts {
      let existing = self
        .store
        .find_attendance(subject_id, day)
        .await
        .map_err(persistence)?;

      let (candidate, expected) = match existing {
        None => (
          AttendanceRecord::open(subject_id, event.display_name.clone(), event.at, event.method),
          PriorState::Absent,
        ),
        Some(open) if open.check_in.is_some_and(|check_in| event.at < check_in) => {
          // A straggler from the same burst that opened the record.
          debug!(%subject_id, %day, at = %event.at, "event precedes check-in; ignored");
          return Ok(open);
        }
        Some(open) if !open.is_closed() => (open.closed_at(event.at)?, PriorState::Open),
        Some(closed) => {
          debug!(%subject_id, %day, "attendance already closed; event ignored");
          return Ok(closed);
        }
      };

      match self
        .store
        .write_attendance(&candidate, expected)
        .await
        .map_err(persistence)?
      {
        WriteOutcome::Applied(record) => {
          match expected {
            PriorState::Absent => {
              info!(%subject_id, %day, check_in = %event.at, "checked in")
            }
            PriorState::Open => info!(
              %subject_id,
              %day,
              check_out = %event.at,
              working_hours = record.working_hours,
              "checked out"
            ),
          }
          return Ok(record);
        }
        WriteOutcome::Lost => {
          warn!(%subject_id, %day, attempt, ?expected, "attendance write lost a race; retrying");
        }
      }
    }

    Err(Error::Persistence {
      subject_id,
      day,
      source: Box::new(Error::Conflict { subject_id, day }),
    })
  }

  /// Resolve `subject_id` in the store and record an event under its
  /// current display name.
  pub async fn record_identity_event(
    &self,
    subject_id: Uuid,
    at: DateTime<Utc>,
    method: AttendanceMethod,
  ) -> Result<AttendanceRecord> {
    let identity = self
      .store
      .get_identity(subject_id)
      .await
      .map_err(|e| Error::persistence(subject_id, day_key(at), e))?
      .ok_or(Error::IdentityNotFound(subject_id))?;

    self
      .record_event(AttendanceEvent {
        subject_id,
        display_name: identity.name,
        at,
        method,
      })
      .await
  }

  /// Attendance status of a subject on `day`.
  pub async fn status_on(&self, subject_id: Uuid, day: NaiveDate) -> Result<AttendanceStatus> {
    let record = self
      .store
      .find_attendance(subject_id, day)
      .await
      .map_err(|e| Error::persistence(subject_id, day, e))?;
    Ok(status_for(record.as_ref()))
  }
}
