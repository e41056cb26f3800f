//! [`MemoryStore`]: an in-process [`RecordStore`] for tests and demos.

use std::{
  collections::HashMap,
  sync::{Mutex, MutexGuard, PoisonError},
};

use chrono::{NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::{
  attendance::{AttendanceQuery, AttendanceRecord, PriorState, WriteOutcome},
  identity::{Identity, LoginRecord, NewIdentity, Role},
  store::RecordStore,
};

#[derive(Debug, Error)]
pub enum MemoryError {
  /// Attendance was written for a subject with no identity, which a
  /// relational store rejects through its foreign key.
  #[error("no identity for subject {0}")]
  UnknownSubject(Uuid),
}

#[derive(Default)]
struct Inner {
  identities: HashMap<Uuid, LoginRecord>,
  attendance: HashMap<(Uuid, NaiveDate), AttendanceRecord>,
}

/// A [`RecordStore`] held entirely in memory behind a single mutex, which
/// makes every conditional write trivially atomic.
#[derive(Default)]
pub struct MemoryStore {
  inner: Mutex<Inner>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Number of attendance records held, across all subjects and days.
  pub fn attendance_len(&self) -> usize { self.lock().attendance.len() }
}

impl RecordStore for MemoryStore {
  type Error = MemoryError;

  async fn add_identity(&self, input: NewIdentity) -> Result<Option<Identity>, MemoryError> {
    let mut inner = self.lock();
    if inner
      .identities
      .values()
      .any(|l| l.identity.email == input.email)
    {
      return Ok(None);
    }

    let now = Utc::now();
    let identity = Identity {
      subject_id:    Uuid::new_v4(),
      name:          input.name,
      email:         input.email,
      role:          input.role,
      department:    input.department,
      position:      input.position,
      biometric_ref: None,
      created_at:    now,
      updated_at:    now,
    };
    inner.identities.insert(identity.subject_id, LoginRecord {
      identity:      identity.clone(),
      password_hash: input.password_hash,
    });
    Ok(Some(identity))
  }

  async fn get_identity(&self, id: Uuid) -> Result<Option<Identity>, MemoryError> {
    Ok(self.lock().identities.get(&id).map(|l| l.identity.clone()))
  }

  async fn find_login(&self, email: &str) -> Result<Option<LoginRecord>, MemoryError> {
    Ok(
      self
        .lock()
        .identities
        .values()
        .find(|l| l.identity.email == email)
        .cloned(),
    )
  }

  async fn list_identities(&self, role: Option<Role>) -> Result<Vec<Identity>, MemoryError> {
    let mut out: Vec<Identity> = self
      .lock()
      .identities
      .values()
      .map(|l| l.identity.clone())
      .filter(|i| role.is_none_or(|r| i.role == r))
      .collect();
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(out)
  }

  async fn set_biometric_ref(
    &self,
    id: Uuid,
    reference: String,
  ) -> Result<Option<Identity>, MemoryError> {
    let mut inner = self.lock();
    Ok(inner.identities.get_mut(&id).map(|l| {
      l.identity.biometric_ref = Some(reference);
      l.identity.updated_at = Utc::now();
      l.identity.clone()
    }))
  }

  async fn find_attendance(
    &self,
    subject_id: Uuid,
    day: NaiveDate,
  ) -> Result<Option<AttendanceRecord>, MemoryError> {
    Ok(self.lock().attendance.get(&(subject_id, day)).cloned())
  }

  async fn write_attendance(
    &self,
    record: &AttendanceRecord,
    expected: PriorState,
  ) -> Result<WriteOutcome, MemoryError> {
    let mut inner = self.lock();
    let key = (record.subject_id, record.day);

    let outcome = match expected {
      PriorState::Absent if inner.attendance.contains_key(&key) => WriteOutcome::Lost,
      PriorState::Absent if !inner.identities.contains_key(&record.subject_id) => {
        return Err(MemoryError::UnknownSubject(record.subject_id));
      }
      PriorState::Absent => {
        inner.attendance.insert(key, record.clone());
        WriteOutcome::Applied(record.clone())
      }
      PriorState::Open => match inner.attendance.get_mut(&key) {
        Some(stored) if stored.check_out.is_none() => {
          stored.check_out = record.check_out;
          stored.working_hours = record.working_hours;
          WriteOutcome::Applied(stored.clone())
        }
        _ => WriteOutcome::Lost,
      },
    };
    Ok(outcome)
  }

  async fn list_attendance(
    &self,
    query: &AttendanceQuery,
  ) -> Result<Vec<AttendanceRecord>, MemoryError> {
    let mut out: Vec<AttendanceRecord> = self
      .lock()
      .attendance
      .values()
      .filter(|r| query.subject_id.is_none_or(|id| r.subject_id == id))
      .filter(|r| query.day.is_none_or(|d| r.day == d))
      .cloned()
      .collect();
    out.sort_by(|a, b| b.day.cmp(&a.day).then(b.check_in.cmp(&a.check_in)));
    if let Some(limit) = query.limit {
      out.truncate(limit);
    }
    Ok(out)
  }
}
