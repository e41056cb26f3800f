//! Attendance records, one per subject per calendar day.
//!
//! The day key is the UTC calendar date of the event. A record is opened by
//! the first event of the day, closed by the second, and left alone after
//! that.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, identity::Identity};

// ─── Tags ────────────────────────────────────────────────────────────────────

/// Attendance status for a subject on a day.
///
/// `Partial` exists in the stored vocabulary but no transition assigns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
  Absent,
  Partial,
  Present,
}

impl AttendanceStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Absent => "absent",
      Self::Partial => "partial",
      Self::Present => "present",
    }
  }
}

/// How the event that opened the record was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttendanceMethod {
  #[default]
  FaceRecognition,
  Manual,
}

impl AttendanceMethod {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::FaceRecognition => "face-recognition",
      Self::Manual => "manual",
    }
  }
}

// ─── Day key ─────────────────────────────────────────────────────────────────

/// The calendar day an event belongs to: its UTC date.
pub fn day_key(at: DateTime<Utc>) -> NaiveDate { at.date_naive() }

/// Elapsed hours between two instants, rounded to two decimal places.
pub fn working_hours(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> f64 {
  let millis = (check_out - check_in).num_milliseconds() as f64;
  (millis / 3_600_000.0 * 100.0).round() / 100.0
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// Serialised with the dashboard's field names: `id`, `userId`, `userName`,
/// `date`, then camelCase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
  #[serde(rename = "id")]
  pub record_id:     Uuid,
  #[serde(rename = "userId")]
  pub subject_id:    Uuid,
  /// Copied from the identity when the record is opened.
  #[serde(rename = "userName")]
  pub display_name:  String,
  #[serde(rename = "date")]
  pub day:           NaiveDate,
  pub check_in:      Option<DateTime<Utc>>,
  pub check_out:     Option<DateTime<Utc>>,
  pub status:        AttendanceStatus,
  pub working_hours: Option<f64>,
  pub method:        AttendanceMethod,
}

impl AttendanceRecord {
  /// A freshly opened record for the day containing `at`.
  pub fn open(
    subject_id: Uuid,
    display_name: impl Into<String>,
    at: DateTime<Utc>,
    method: AttendanceMethod,
  ) -> Self {
    Self {
      record_id: Uuid::new_v4(),
      subject_id,
      display_name: display_name.into(),
      day: day_key(at),
      check_in: Some(at),
      check_out: None,
      status: AttendanceStatus::Present,
      working_hours: None,
      method,
    }
  }

  pub fn is_closed(&self) -> bool { self.check_out.is_some() }

  /// The record as it looks after checking out at `at`.
  ///
  /// Fails if the record is already closed or `at` precedes the check-in.
  pub fn closed_at(&self, at: DateTime<Utc>) -> Result<Self> {
    if self.is_closed() {
      return Err(Error::Validation(format!(
        "attendance for {} on {} is already closed",
        self.subject_id, self.day
      )));
    }
    if let Some(check_in) = self.check_in
      && at < check_in
    {
      return Err(Error::Validation(format!(
        "check-out {at} precedes check-in {check_in} for {} on {}",
        self.subject_id, self.day
      )));
    }

    let mut closed = self.clone();
    closed.check_out = Some(at);
    closed.working_hours = self.check_in.map(|check_in| working_hours(check_in, at));
    Ok(closed)
  }
}

/// Status for a subject on a day given the record found for it, if any.
pub fn status_for(record: Option<&AttendanceRecord>) -> AttendanceStatus {
  match record {
    None => AttendanceStatus::Absent,
    Some(r) if r.check_in.is_some() => AttendanceStatus::Present,
    Some(r) => r.status,
  }
}

// ─── Conditional writes ──────────────────────────────────────────────────────

/// The state a conditional write expects the stored record to be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorState {
  /// No record exists yet for (subject, day): insert.
  Absent,
  /// A record exists with no check-out: set check-out and working hours.
  Open,
}

/// Result of [`crate::store::RecordStore::write_attendance`].
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
  Applied(AttendanceRecord),
  /// The stored state no longer matched the expectation; nothing was written.
  Lost,
}

// ─── Queries ─────────────────────────────────────────────────────────────────

/// Parameters for [`crate::store::RecordStore::list_attendance`]. Results
/// are ordered newest day first.
#[derive(Debug, Clone, Default)]
pub struct AttendanceQuery {
  pub subject_id: Option<Uuid>,
  pub day:        Option<NaiveDate>,
  pub limit:      Option<usize>,
}

/// Head-count for one day over the given staff roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
  pub date:        NaiveDate,
  pub total_staff: usize,
  pub present:     usize,
  pub absent:      usize,
}

impl DaySummary {
  pub fn compute(
    date: NaiveDate,
    staff: &[Identity],
    records: &[AttendanceRecord],
  ) -> Self {
    let present = staff
      .iter()
      .filter(|member| {
        let record = records
          .iter()
          .find(|r| r.subject_id == member.subject_id && r.day == date);
        status_for(record) == AttendanceStatus::Present
      })
      .count();

    Self {
      date,
      total_staff: staff.len(),
      present,
      absent: staff.len() - present,
    }
  }
}
