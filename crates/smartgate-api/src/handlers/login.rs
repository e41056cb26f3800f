//! Handlers for `/auth` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/login` | Body: `{"email","password"}`; 401 on bad credentials |
//! | `GET`  | `/auth/validate` | Bearer token; returns the caller |
//! | `POST` | `/auth/recognize` | Body: `{"image"}`; records attendance on a match |

use axum::{Json, extract::State};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use smartgate_core::{
  attendance::{AttendanceMethod, AttendanceRecord},
  identity::{Identity, normalize_email},
  store::RecordStore,
  tracker::AttendanceEvent,
};

use crate::{
  AppState,
  auth::{AuthUser, verify_password},
  error::ApiError,
  recognition::strip_data_url,
};

#[derive(Debug, Serialize)]
pub struct SessionResponse {
  pub token: String,
  pub user:  Identity,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
  pub user: Identity,
}

pub(crate) fn issue_token<S>(state: &AppState<S>, identity: &Identity) -> Result<String, ApiError> {
  state
    .tokens
    .issue(identity, Utc::now())
    .map_err(|e| ApiError::Internal(format!("token issue failed: {e}")))
}

// ─── Login ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub email:    String,
  pub password: String,
}

/// `POST /auth/login`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<LoginBody>,
) -> Result<Json<SessionResponse>, ApiError>
where
  S: RecordStore,
{
  let email = normalize_email(&body.email);
  let login = state
    .store
    .find_login(&email)
    .await
    .map_err(ApiError::store)?;

  let Some(login) = login.filter(|l| verify_password(&body.password, &l.password_hash)) else {
    tracing::info!(%email, "login refused");
    return Err(ApiError::Unauthorized("invalid credentials".into()));
  };

  let token = issue_token(&state, &login.identity)?;
  tracing::info!(subject_id = %login.identity.subject_id, "login");
  Ok(Json(SessionResponse { token, user: login.identity }))
}

// ─── Validate ─────────────────────────────────────────────────────────────────

/// `GET /auth/validate`
pub async fn validate<S>(
  State(state): State<AppState<S>>,
  AuthUser(claims): AuthUser,
) -> Result<Json<UserResponse>, ApiError>
where
  S: RecordStore + 'static,
{
  let user = state
    .store
    .get_identity(claims.sub)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("identity {} not found", claims.sub)))?;
  Ok(Json(UserResponse { user }))
}

// ─── Recognize ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ImageBody {
  pub image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecognizeResponse {
  pub recognized: bool,
  pub message:    String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub token:      Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub user:       Option<Identity>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub attendance: Option<AttendanceRecord>,
}

impl RecognizeResponse {
  fn not_recognized() -> Self {
    Self {
      recognized: false,
      message:    "Face not recognized".into(),
      token:      None,
      user:       None,
      attendance: None,
    }
  }
}

/// Extract the bare base64 payload from an image body.
pub(crate) fn image_payload(body: &ImageBody) -> Result<&str, ApiError> {
  body
    .image
    .as_deref()
    .map(strip_data_url)
    .filter(|s| !s.is_empty())
    .ok_or_else(|| ApiError::BadRequest("no image provided".into()))
}

/// `POST /auth/recognize`
pub async fn recognize<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<ImageBody>,
) -> Result<Json<RecognizeResponse>, ApiError>
where
  S: RecordStore,
{
  let image = image_payload(&body)?;

  let matched = state.recognizer.recognize(image).await.map_err(|e| {
    tracing::warn!(error = %e, "recognition service failed");
    ApiError::Unavailable("recognition service unavailable".into())
  })?;
  let Some(subject_id) = matched else {
    return Ok(Json(RecognizeResponse::not_recognized()));
  };

  let Some(identity) = state
    .store
    .get_identity(subject_id)
    .await
    .map_err(ApiError::store)?
  else {
    tracing::warn!(%subject_id, "recognized subject has no identity");
    return Ok(Json(RecognizeResponse::not_recognized()));
  };

  let record = state
    .tracker
    .record_event(AttendanceEvent {
      subject_id,
      display_name: identity.name.clone(),
      at: Utc::now(),
      method: AttendanceMethod::FaceRecognition,
    })
    .await?;

  let token = issue_token(&state, &identity)?;
  Ok(Json(RecognizeResponse {
    recognized: true,
    message:    format!("Welcome, {}!", identity.name),
    token:      Some(token),
    user:       Some(identity),
    attendance: Some(record),
  }))
}
