//! Bearer-token extractor and password hashing helpers.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use chrono::Utc;
use rand_core::OsRng;
use smartgate_core::store::RecordStore;

use crate::{AppState, error::ApiError, token::Claims};

/// Hash `password` into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

/// Whether `password` matches the PHC string `hash`. A malformed hash never
/// matches.
pub fn verify_password(password: &str, hash: &str) -> bool {
  let Ok(parsed) = PasswordHash::new(hash) else {
    return false;
  };
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .is_ok()
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .ok_or_else(|| ApiError::Unauthorized("access token required".into()))
}

/// The verified claims of the calling user.
pub struct AuthUser(pub Claims);

impl AuthUser {
  pub fn require_admin(&self) -> Result<(), ApiError> {
    if self.0.is_admin() {
      Ok(())
    } else {
      Err(ApiError::Forbidden("admin access required".into()))
    }
  }
}

impl<S> FromRequestParts<AppState<S>> for AuthUser
where
  S: RecordStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = bearer_token(&parts.headers)?;
    let claims = state.tokens.verify(token, Utc::now()).map_err(|e| {
      tracing::debug!(error = %e, "rejected bearer token");
      ApiError::Unauthorized("invalid or expired token".into())
    })?;
    Ok(AuthUser(claims))
  }
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  #[test]
  fn hashed_password_verifies() {
    let hash = hash_password("staff123").unwrap();
    assert!(hash.starts_with("$argon2"));
    assert!(verify_password("staff123", &hash));
    assert!(!verify_password("staff124", &hash));
  }

  #[test]
  fn malformed_hash_never_matches() {
    assert!(!verify_password("anything", "not-a-phc-string"));
  }

  #[test]
  fn bearer_prefix_is_required() {
    let mut headers = HeaderMap::new();
    assert!(bearer_token(&headers).is_err());

    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
    assert!(bearer_token(&headers).is_err());

    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
    assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
  }
}
