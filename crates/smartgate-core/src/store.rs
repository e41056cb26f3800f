//! The `RecordStore` trait.
//!
//! Implemented by storage backends (`smartgate-store-sqlite`, and
//! [`crate::memory::MemoryStore`] for tests). The tracker and the web layer
//! depend on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
  attendance::{AttendanceQuery, AttendanceRecord, PriorState, WriteOutcome},
  identity::{Identity, LoginRecord, NewIdentity, Role},
};

/// Durable storage for identities and attendance records.
///
/// Attendance writes are conditional: a backend must apply
/// [`write_attendance`](RecordStore::write_attendance) atomically with
/// respect to other writers of the same (subject, day).
///
/// All methods return `Send` futures so the trait can be used behind axum.
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Identities ────────────────────────────────────────────────────────

  /// Persist a new identity. Returns `None` if the email is already taken.
  fn add_identity(
    &self,
    input: NewIdentity,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + '_;

  /// Retrieve an identity by subject id.
  fn get_identity(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + '_;

  /// Look up an identity and its password hash by (normalised) email.
  fn find_login<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<LoginRecord>, Self::Error>> + Send + 'a;

  /// List identities, newest first, optionally restricted to one role.
  fn list_identities(
    &self,
    role: Option<Role>,
  ) -> impl Future<Output = Result<Vec<Identity>, Self::Error>> + Send + '_;

  /// Replace the biometric reference of an identity. Returns the updated
  /// identity, or `None` if it does not exist.
  fn set_biometric_ref(
    &self,
    id: Uuid,
    reference: String,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + '_;

  // ── Attendance ────────────────────────────────────────────────────────

  /// The record for (subject, day), if one exists.
  fn find_attendance(
    &self,
    subject_id: Uuid,
    day: NaiveDate,
  ) -> impl Future<Output = Result<Option<AttendanceRecord>, Self::Error>> + Send + '_;

  /// Conditionally write `record`.
  ///
  /// - [`PriorState::Absent`]: insert, unless a record for
  ///   `(record.subject_id, record.day)` already exists.
  /// - [`PriorState::Open`]: set `check_out` and `working_hours` on the
  ///   stored record, only while its `check_out` is still unset.
  ///
  /// A write whose expectation no longer holds returns
  /// [`WriteOutcome::Lost`] and changes nothing.
  ///
  /// Inserting a record for a subject with no stored identity is an error,
  /// not a lost write.
  fn write_attendance<'a>(
    &'a self,
    record: &'a AttendanceRecord,
    expected: PriorState,
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + 'a;

  /// List attendance records matching `query`, newest day first.
  fn list_attendance<'a>(
    &'a self,
    query: &'a AttendanceQuery,
  ) -> impl Future<Output = Result<Vec<AttendanceRecord>, Self::Error>> + Send + 'a;
}
