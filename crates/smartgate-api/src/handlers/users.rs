//! Handlers for `/users` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/users/staff` | Admin; newest first |
//! | `POST` | `/users/staff` | Admin; body `{"name","email"?,"department"?,"position"?}` |
//! | `POST` | `/users/staff/send-email` | Admin; body `{"email","name","password"}` |
//! | `POST` | `/users/face-encoding` | Any user; body `{"image"}` |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use smartgate_core::{
  identity::{Identity, NewIdentity, Role},
  store::RecordStore,
};

use crate::{
  AppState,
  auth::{AuthUser, hash_password},
  credentials::{generate_email, generate_password},
  error::ApiError,
  handlers::login::{ImageBody, UserResponse, image_payload},
  notify::EmailMessage,
};

/// Attempts at finding a free generated email before giving up.
const EMAIL_ATTEMPTS: usize = 5;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
  pub message: String,
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /users/staff`
pub async fn list_staff<S>(
  State(state): State<AppState<S>>,
  caller: AuthUser,
) -> Result<Json<Vec<Identity>>, ApiError>
where
  S: RecordStore + 'static,
{
  caller.require_admin()?;
  let staff = state
    .store
    .list_identities(Some(Role::Staff))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(staff))
}

// ─── Register ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub name:       String,
  pub email:      Option<String>,
  pub department: Option<String>,
  pub position:   Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Credentials {
  pub email:    String,
  pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
  pub credentials: Credentials,
  pub user:        Identity,
}

fn non_empty(value: Option<String>) -> Option<String> {
  value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// `POST /users/staff`
pub async fn register_staff<S>(
  State(state): State<AppState<S>>,
  caller: AuthUser,
  Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore + 'static,
{
  caller.require_admin()?;

  let name = body.name.trim().to_string();
  if name.is_empty() {
    return Err(ApiError::BadRequest("name is required".into()));
  }

  let password = generate_password();
  let password_hash = hash_password(&password)?;
  let explicit_email = non_empty(body.email);
  let attempts = if explicit_email.is_some() { 1 } else { EMAIL_ATTEMPTS };

  for _ in 0..attempts {
    let email = explicit_email
      .clone()
      .unwrap_or_else(|| generate_email(&name, &state.settings.email_domain));

    let mut input = NewIdentity::new(name.clone(), &email, Role::Staff, password_hash.clone());
    input.department = non_empty(body.department.clone());
    input.position = non_empty(body.position.clone());
    let email = input.email.clone();

    if let Some(user) = state
      .store
      .add_identity(input)
      .await
      .map_err(ApiError::store)?
    {
      tracing::info!(subject_id = %user.subject_id, %email, "staff registered");
      let body = RegisterResponse { credentials: Credentials { email, password }, user };
      return Ok((StatusCode::CREATED, Json(body)));
    }
  }

  Err(ApiError::Conflict("user already exists".into()))
}

// ─── Send credentials ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SendCredentialsBody {
  pub email:    Option<String>,
  pub name:     Option<String>,
  pub password: Option<String>,
}

/// `POST /users/staff/send-email`
pub async fn send_credentials<S>(
  State(state): State<AppState<S>>,
  caller: AuthUser,
  Json(body): Json<SendCredentialsBody>,
) -> Result<Json<MessageResponse>, ApiError>
where
  S: RecordStore + 'static,
{
  caller.require_admin()?;

  let (Some(email), Some(name), Some(password)) =
    (non_empty(body.email), non_empty(body.name), non_empty(body.password))
  else {
    return Err(ApiError::BadRequest("email, name and password are required".into()));
  };

  let message = EmailMessage::credentials(&name, &email, &password);
  state.notifier.send(&message).await.map_err(|e| {
    tracing::warn!(error = %e, to = %email, "credential email failed");
    ApiError::Unavailable("failed to send email".into())
  })?;

  tracing::info!(to = %email, "credential email sent");
  Ok(Json(MessageResponse { message: "Email sent successfully".into() }))
}

// ─── Face encoding ────────────────────────────────────────────────────────────

/// `POST /users/face-encoding`
pub async fn face_encoding<S>(
  State(state): State<AppState<S>>,
  AuthUser(claims): AuthUser,
  Json(body): Json<ImageBody>,
) -> Result<Json<UserResponse>, ApiError>
where
  S: RecordStore + 'static,
{
  let image = image_payload(&body)?;

  let reference = state
    .recognizer
    .encode(image, claims.sub)
    .await
    .map_err(|e| {
      tracing::warn!(error = %e, subject_id = %claims.sub, "encoding service failed");
      ApiError::Unavailable("encoding service unavailable".into())
    })?
    .ok_or_else(|| ApiError::Unprocessable("failed to process face encoding".into()))?;

  let user = state
    .store
    .set_biometric_ref(claims.sub, reference)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("identity {} not found", claims.sub)))?;

  tracing::info!(subject_id = %user.subject_id, "face encoding saved");
  Ok(Json(UserResponse { user }))
}
