//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are fixed-width RFC 3339 UTC strings (microsecond precision,
//! `Z` suffix) so that they compare correctly as text. Days are `YYYY-MM-DD`.
//! UUIDs are hyphenated lowercase strings.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use smartgate_core::{
  attendance::{AttendanceMethod, AttendanceRecord, AttendanceStatus},
  identity::{Identity, LoginRecord, Role},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_day(day: NaiveDate) -> String { day.format("%Y-%m-%d").to_string() }

pub fn decode_day(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Tags ────────────────────────────────────────────────────────────────────

pub fn encode_role(r: Role) -> &'static str { r.as_str() }

pub fn decode_role(s: &str) -> Result<Role> {
  match s {
    "admin" => Ok(Role::Admin),
    "staff" => Ok(Role::Staff),
    other => Err(Error::UnknownTag { column: "role", value: other.to_owned() }),
  }
}

pub fn decode_status(s: &str) -> Result<AttendanceStatus> {
  match s {
    "absent" => Ok(AttendanceStatus::Absent),
    "partial" => Ok(AttendanceStatus::Partial),
    "present" => Ok(AttendanceStatus::Present),
    other => Err(Error::UnknownTag { column: "status", value: other.to_owned() }),
  }
}

pub fn decode_method(s: &str) -> Result<AttendanceMethod> {
  match s {
    "face-recognition" => Ok(AttendanceMethod::FaceRecognition),
    "manual" => Ok(AttendanceMethod::Manual),
    other => Err(Error::UnknownTag { column: "method", value: other.to_owned() }),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching the field order of [`RawIdentity::from_row`].
pub const IDENTITY_COLUMNS: &str = "subject_id, name, email, role, department, position, \
                                    biometric_ref, password_hash, created_at, updated_at";

/// Raw strings read directly from an `identities` row.
pub struct RawIdentity {
  pub subject_id:    String,
  pub name:          String,
  pub email:         String,
  pub role:          String,
  pub department:    Option<String>,
  pub position:      Option<String>,
  pub biometric_ref: Option<String>,
  pub password_hash: String,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawIdentity {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subject_id:    row.get(0)?,
      name:          row.get(1)?,
      email:         row.get(2)?,
      role:          row.get(3)?,
      department:    row.get(4)?,
      position:      row.get(5)?,
      biometric_ref: row.get(6)?,
      password_hash: row.get(7)?,
      created_at:    row.get(8)?,
      updated_at:    row.get(9)?,
    })
  }

  pub fn into_login(self) -> Result<LoginRecord> {
    let identity = Identity {
      subject_id:    decode_uuid(&self.subject_id)?,
      name:          self.name,
      email:         self.email,
      role:          decode_role(&self.role)?,
      department:    self.department,
      position:      self.position,
      biometric_ref: self.biometric_ref,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    };
    Ok(LoginRecord { identity, password_hash: self.password_hash })
  }

  pub fn into_identity(self) -> Result<Identity> { Ok(self.into_login()?.identity) }
}

/// Column list matching the field order of [`RawAttendance::from_row`].
pub const ATTENDANCE_COLUMNS: &str = "record_id, subject_id, display_name, day, check_in, \
                                      check_out, status, working_hours, method";

/// Raw values read directly from an `attendance` row.
pub struct RawAttendance {
  pub record_id:     String,
  pub subject_id:    String,
  pub display_name:  String,
  pub day:           String,
  pub check_in:      Option<String>,
  pub check_out:     Option<String>,
  pub status:        String,
  pub working_hours: Option<f64>,
  pub method:        String,
}

impl RawAttendance {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:     row.get(0)?,
      subject_id:    row.get(1)?,
      display_name:  row.get(2)?,
      day:           row.get(3)?,
      check_in:      row.get(4)?,
      check_out:     row.get(5)?,
      status:        row.get(6)?,
      working_hours: row.get(7)?,
      method:        row.get(8)?,
    })
  }

  pub fn into_record(self) -> Result<AttendanceRecord> {
    Ok(AttendanceRecord {
      record_id:     decode_uuid(&self.record_id)?,
      subject_id:    decode_uuid(&self.subject_id)?,
      display_name:  self.display_name,
      day:           decode_day(&self.day)?,
      check_in:      self.check_in.as_deref().map(decode_dt).transpose()?,
      check_out:     self.check_out.as_deref().map(decode_dt).transpose()?,
      status:        decode_status(&self.status)?,
      working_hours: self.working_hours,
      method:        decode_method(&self.method)?,
    })
  }
}
