//! JSON REST API for SmartGate.
//!
//! Exposes an axum [`Router`] backed by any [`RecordStore`]. Collaborators
//! (token issuer, face recognizer, notifier) are passed in through
//! [`AppState`]; nothing here reads configuration or the environment.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = smartgate_api::router(state);
//! axum::serve(listener, app).await?;
//! ```

pub mod auth;
pub mod credentials;
pub mod error;
pub mod handlers;
pub mod notify;
pub mod recognition;
pub mod token;

use std::sync::Arc;

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use smartgate_core::{AttendanceTracker, store::RecordStore};
use tower_http::trace::TraceLayer;

pub use error::ApiError;
use handlers::{attendance, login, users};
use notify::Notifier;
use recognition::FaceRecognizer;
use token::TokenIssuer;

/// Face images arrive base64-encoded in JSON bodies.
const BODY_LIMIT: usize = 10 * 1024 * 1024;

// ─── Application state ────────────────────────────────────────────────────────

/// Settings the handlers need that are not collaborators.
#[derive(Debug, Clone)]
pub struct ApiSettings {
  /// Domain used when generating staff email addresses.
  pub email_domain: String,
}

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:      Arc<S>,
  pub tracker:    AttendanceTracker<S>,
  pub tokens:     Arc<TokenIssuer>,
  pub recognizer: Arc<dyn FaceRecognizer>,
  pub notifier:   Arc<dyn Notifier>,
  pub settings:   Arc<ApiSettings>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:      Arc::clone(&self.store),
      tracker:    self.tracker.clone(),
      tokens:     Arc::clone(&self.tokens),
      recognizer: Arc::clone(&self.recognizer),
      notifier:   Arc::clone(&self.notifier),
      settings:   Arc::clone(&self.settings),
    }
  }
}

impl<S: RecordStore> AppState<S> {
  pub fn new(
    store: Arc<S>,
    tokens: TokenIssuer,
    recognizer: Arc<dyn FaceRecognizer>,
    notifier: Arc<dyn Notifier>,
    settings: ApiSettings,
  ) -> Self {
    Self {
      tracker: AttendanceTracker::new(Arc::clone(&store)),
      store,
      tokens: Arc::new(tokens),
      recognizer,
      notifier,
      settings: Arc::new(settings),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the `/api` router for `state`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: RecordStore + 'static,
{
  let api = Router::new()
    // Auth
    .route("/auth/login", post(login::login::<S>))
    .route("/auth/validate", get(login::validate::<S>))
    .route("/auth/recognize", post(login::recognize::<S>))
    // Staff
    .route("/users/staff", get(users::list_staff::<S>).post(users::register_staff::<S>))
    .route("/users/staff/send-email", post(users::send_credentials::<S>))
    .route("/users/face-encoding", post(users::face_encoding::<S>))
    // Attendance
    .route("/attendance/user/{id}", get(attendance::for_user::<S>))
    .route("/attendance/all", get(attendance::all::<S>))
    .route("/attendance/summary", get(attendance::summary::<S>))
    .route("/attendance/export", get(attendance::export::<S>))
    .route("/attendance/mark", post(attendance::mark::<S>));

  Router::new()
    .nest("/api", api)
    .layer(DefaultBodyLimit::max(BODY_LIMIT))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

#[cfg(test)]
mod tests;
