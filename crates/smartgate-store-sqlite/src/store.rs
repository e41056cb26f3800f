//! [`SqliteStore`], the SQLite implementation of [`RecordStore`].

use std::path::Path;

use chrono::{NaiveDate, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use smartgate_core::{
  attendance::{AttendanceQuery, AttendanceRecord, PriorState, WriteOutcome},
  identity::{Identity, LoginRecord, NewIdentity, Role, normalize_email},
  store::RecordStore,
};

use crate::{
  Result,
  encode::{
    ATTENDANCE_COLUMNS, IDENTITY_COLUMNS, RawAttendance, RawIdentity, encode_day, encode_dt,
    encode_role, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A SmartGate record store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All writes
/// go through one connection thread, and the attendance conditional writes
/// are single statements guarded by the `UNIQUE (subject_id, day)`
/// constraint and a `check_out IS NULL` predicate.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn identity_row(&self, id: Uuid) -> Result<Option<RawIdentity>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE subject_id = ?1"),
              rusqlite::params![id_str],
              RawIdentity::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    Ok(raw)
  }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = crate::Error;

  // ── Identities ────────────────────────────────────────────────────────────

  async fn add_identity(&self, input: NewIdentity) -> Result<Option<Identity>> {
    let now = Utc::now();
    let identity = Identity {
      subject_id:    Uuid::new_v4(),
      name:          input.name,
      email:         normalize_email(&input.email),
      role:          input.role,
      department:    input.department,
      position:      input.position,
      biometric_ref: None,
      created_at:    now,
      updated_at:    now,
    };

    let id_str    = encode_uuid(identity.subject_id);
    let name      = identity.name.clone();
    let email     = identity.email.clone();
    let role_str  = encode_role(identity.role).to_owned();
    let dept      = identity.department.clone();
    let position  = identity.position.clone();
    let hash      = input.password_hash;
    let at_str    = encode_dt(now);

    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO identities (
             subject_id, name, email, role, department, position,
             password_hash, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
           ON CONFLICT (email) DO NOTHING",
          rusqlite::params![id_str, name, email, role_str, dept, position, hash, at_str],
        )?)
      })
      .await?;

    if inserted == 0 {
      tracing::debug!(email = %identity.email, "identity email already registered");
      return Ok(None);
    }
    Ok(Some(identity))
  }

  async fn get_identity(&self, id: Uuid) -> Result<Option<Identity>> {
    self.identity_row(id).await?.map(RawIdentity::into_identity).transpose()
  }

  async fn find_login(&self, email: &str) -> Result<Option<LoginRecord>> {
    let email = normalize_email(email);

    let raw: Option<RawIdentity> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE email = ?1"),
              rusqlite::params![email],
              RawIdentity::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawIdentity::into_login).transpose()
  }

  async fn list_identities(&self, role: Option<Role>) -> Result<Vec<Identity>> {
    let role_str = role.map(encode_role).map(str::to_owned);

    let raws: Vec<RawIdentity> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {IDENTITY_COLUMNS} FROM identities
           WHERE (?1 IS NULL OR role = ?1)
           ORDER BY created_at DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![role_str], RawIdentity::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawIdentity::into_identity).collect()
  }

  async fn set_biometric_ref(&self, id: Uuid, reference: String) -> Result<Option<Identity>> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(Utc::now());

    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE identities SET biometric_ref = ?2, updated_at = ?3 WHERE subject_id = ?1",
          rusqlite::params![id_str, reference, at_str],
        )?)
      })
      .await?;

    if updated == 0 {
      return Ok(None);
    }
    self.get_identity(id).await
  }

  // ── Attendance ────────────────────────────────────────────────────────────

  async fn find_attendance(
    &self,
    subject_id: Uuid,
    day:        NaiveDate,
  ) -> Result<Option<AttendanceRecord>> {
    let subject_str = encode_uuid(subject_id);
    let day_str     = encode_day(day);

    let raw: Option<RawAttendance> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE subject_id = ?1 AND day = ?2"
              ),
              rusqlite::params![subject_str, day_str],
              RawAttendance::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAttendance::into_record).transpose()
  }

  async fn write_attendance(
    &self,
    record:   &AttendanceRecord,
    expected: PriorState,
  ) -> Result<WriteOutcome> {
    let record_str    = encode_uuid(record.record_id);
    let subject_str   = encode_uuid(record.subject_id);
    let display_name  = record.display_name.clone();
    let day_str       = encode_day(record.day);
    let check_in_str  = record.check_in.map(encode_dt);
    let check_out_str = record.check_out.map(encode_dt);
    let status_str    = record.status.as_str().to_owned();
    let working_hours = record.working_hours;
    let method_str    = record.method.as_str().to_owned();

    let stored: Option<RawAttendance> = self
      .conn
      .call(move |conn| {
        let changed = match expected {
          PriorState::Absent => conn.execute(
            "INSERT INTO attendance (
               record_id, subject_id, display_name, day, check_in,
               check_out, status, working_hours, method
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT (subject_id, day) DO NOTHING",
            rusqlite::params![
              record_str,
              subject_str,
              display_name,
              day_str,
              check_in_str,
              check_out_str,
              status_str,
              working_hours,
              method_str,
            ],
          )?,
          PriorState::Open => conn.execute(
            "UPDATE attendance
             SET check_out = ?3, working_hours = ?4
             WHERE subject_id = ?1 AND day = ?2 AND check_out IS NULL",
            rusqlite::params![subject_str, day_str, check_out_str, working_hours],
          )?,
        };

        if changed == 0 {
          return Ok(None);
        }

        Ok(Some(conn.query_row(
          &format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE subject_id = ?1 AND day = ?2"
          ),
          rusqlite::params![subject_str, day_str],
          RawAttendance::from_row,
        )?))
      })
      .await?;

    match stored {
      Some(raw) => Ok(WriteOutcome::Applied(raw.into_record()?)),
      None => Ok(WriteOutcome::Lost),
    }
  }

  async fn list_attendance(&self, query: &AttendanceQuery) -> Result<Vec<AttendanceRecord>> {
    let subject_str = query.subject_id.map(encode_uuid);
    let day_str     = query.day.map(encode_day);
    // SQLite treats a negative LIMIT as "no limit".
    let limit_val   = query.limit.map_or(-1, |l| l as i64);

    let raws: Vec<RawAttendance> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ATTENDANCE_COLUMNS} FROM attendance
           WHERE (?1 IS NULL OR subject_id = ?1)
             AND (?2 IS NULL OR day = ?2)
           ORDER BY day DESC, check_in DESC
           LIMIT ?3"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![subject_str, day_str, limit_val],
            RawAttendance::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAttendance::into_record).collect()
  }
}
