//! Handlers for `/attendance` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/attendance/user/{id}` | Self or admin |
//! | `GET`  | `/attendance/all` | Admin; optional `?date=YYYY-MM-DD` |
//! | `GET`  | `/attendance/summary` | Admin; optional `?date=`, defaults to today |
//! | `GET`  | `/attendance/export` | Admin; CSV, optional `?date=` |
//! | `POST` | `/attendance/mark` | Admin; body `{"subjectId","at"?}` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::header,
  response::IntoResponse,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use smartgate_core::{
  attendance::{
    AttendanceMethod, AttendanceQuery, AttendanceRecord, AttendanceStatus, DaySummary, day_key,
    status_for,
  },
  identity::Role,
  store::RecordStore,
};
use uuid::Uuid;

use crate::{AppState, auth::AuthUser, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct DayParams {
  pub date: Option<NaiveDate>,
}

// ─── Per user ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAttendance {
  pub attendance:       Vec<AttendanceRecord>,
  pub today_attendance: Option<AttendanceRecord>,
  pub today_status:     AttendanceStatus,
}

/// `GET /attendance/user/{id}`
pub async fn for_user<S>(
  State(state): State<AppState<S>>,
  AuthUser(claims): AuthUser,
  Path(id): Path<Uuid>,
) -> Result<Json<UserAttendance>, ApiError>
where
  S: RecordStore + 'static,
{
  if claims.sub != id && !claims.is_admin() {
    return Err(ApiError::Forbidden("access denied".into()));
  }

  let attendance = state
    .store
    .list_attendance(&AttendanceQuery { subject_id: Some(id), ..Default::default() })
    .await
    .map_err(ApiError::store)?;

  let today = day_key(Utc::now());
  let today_attendance = attendance.iter().find(|r| r.day == today).cloned();
  let today_status = status_for(today_attendance.as_ref());

  Ok(Json(UserAttendance { attendance, today_attendance, today_status }))
}

// ─── All ──────────────────────────────────────────────────────────────────────

async fn records_for<S: RecordStore>(
  state: &AppState<S>,
  day: Option<NaiveDate>,
) -> Result<Vec<AttendanceRecord>, ApiError> {
  state
    .store
    .list_attendance(&AttendanceQuery { day, ..Default::default() })
    .await
    .map_err(ApiError::store)
}

/// `GET /attendance/all[?date=YYYY-MM-DD]`
pub async fn all<S>(
  State(state): State<AppState<S>>,
  caller: AuthUser,
  Query(params): Query<DayParams>,
) -> Result<Json<Vec<AttendanceRecord>>, ApiError>
where
  S: RecordStore + 'static,
{
  caller.require_admin()?;
  Ok(Json(records_for(&state, params.date).await?))
}

// ─── Summary ──────────────────────────────────────────────────────────────────

/// `GET /attendance/summary[?date=YYYY-MM-DD]`
pub async fn summary<S>(
  State(state): State<AppState<S>>,
  caller: AuthUser,
  Query(params): Query<DayParams>,
) -> Result<Json<DaySummary>, ApiError>
where
  S: RecordStore + 'static,
{
  caller.require_admin()?;

  let date = params.date.unwrap_or_else(|| day_key(Utc::now()));
  let staff = state
    .store
    .list_identities(Some(Role::Staff))
    .await
    .map_err(ApiError::store)?;
  let records = records_for(&state, Some(date)).await?;

  Ok(Json(DaySummary::compute(date, &staff, &records)))
}

// ─── Export ───────────────────────────────────────────────────────────────────

const CSV_HEADER: [&str; 6] = ["Name", "Date", "Check In", "Check Out", "Working Hours", "Status"];

fn clock(at: Option<DateTime<Utc>>) -> String {
  at.map(|t| t.format("%H:%M").to_string()).unwrap_or_default()
}

/// Render records as CSV, one row per record.
pub fn render_csv(records: &[AttendanceRecord]) -> Result<Vec<u8>, ApiError> {
  let csv_err = |e: csv::Error| ApiError::Internal(format!("csv encoding failed: {e}"));

  let mut writer = csv::Writer::from_writer(Vec::new());
  writer.write_record(CSV_HEADER).map_err(csv_err)?;
  for r in records {
    writer
      .write_record([
        r.display_name.clone(),
        r.day.format("%Y-%m-%d").to_string(),
        clock(r.check_in),
        clock(r.check_out),
        r.working_hours.map(|h| h.to_string()).unwrap_or_default(),
        r.status.as_str().to_string(),
      ])
      .map_err(csv_err)?;
  }
  writer
    .into_inner()
    .map_err(|e| ApiError::Internal(format!("csv encoding failed: {}", e.error())))
}

/// `GET /attendance/export[?date=YYYY-MM-DD]`
pub async fn export<S>(
  State(state): State<AppState<S>>,
  caller: AuthUser,
  Query(params): Query<DayParams>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore + 'static,
{
  caller.require_admin()?;

  let records = records_for(&state, params.date).await?;
  let body = render_csv(&records)?;
  let filename = match params.date {
    Some(date) => format!("attendance-{date}.csv"),
    None => "attendance-all.csv".to_string(),
  };

  Ok((
    [
      (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
      (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
    ],
    body,
  ))
}

// ─── Manual mark ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkBody {
  pub subject_id: Uuid,
  /// RFC 3339; defaults to now.
  pub at:         Option<String>,
}

/// `POST /attendance/mark`
pub async fn mark<S>(
  State(state): State<AppState<S>>,
  caller: AuthUser,
  Json(body): Json<MarkBody>,
) -> Result<Json<AttendanceRecord>, ApiError>
where
  S: RecordStore + 'static,
{
  caller.require_admin()?;

  let at = match body.at.as_deref() {
    None => Utc::now(),
    Some(raw) => DateTime::parse_from_rfc3339(raw)
      .map(|t| t.with_timezone(&Utc))
      .map_err(|e| ApiError::BadRequest(format!("invalid timestamp {raw:?}: {e}")))?,
  };

  let record = state
    .tracker
    .record_identity_event(body.subject_id, at, AttendanceMethod::Manual)
    .await?;
  Ok(Json(record))
}
