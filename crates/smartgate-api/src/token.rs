//! Signed bearer tokens (JWT, HS256).
//!
//! A token is `base64url(header).base64url(claims).base64url(hmac)`, with
//! the HMAC-SHA256 taken over the first two segments. Only the `HS256`
//! algorithm is accepted on verification.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use smartgate_core::identity::{Identity, Role};
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "HS256";

/// Default lifetime of an issued token.
pub const DEFAULT_TTL_HOURS: i64 = 24;

#[derive(Debug, Error)]
pub enum TokenError {
  #[error("token is malformed")]
  Malformed,

  #[error("unsupported token algorithm {0:?}")]
  Algorithm(String),

  #[error("token signature does not match")]
  BadSignature,

  #[error("token has expired")]
  Expired,

  #[error("invalid signing key")]
  Key,

  #[error("claims encoding failed: {0}")]
  Encode(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
  alg: String,
  typ: String,
}

/// Payload carried by a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  pub sub:   Uuid,
  pub email: String,
  pub role:  Role,
  /// Issued-at, seconds since the epoch.
  pub iat:   i64,
  /// Expiry, seconds since the epoch.
  pub exp:   i64,
}

impl Claims {
  pub fn is_admin(&self) -> bool { self.role == Role::Admin }
}

/// Issues and verifies tokens with a shared secret.
pub struct TokenIssuer {
  key: Vec<u8>,
  ttl: Duration,
}

impl TokenIssuer {
  pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
    Self { key: secret.as_ref().to_vec(), ttl }
  }

  fn mac(&self) -> Result<HmacSha256, TokenError> {
    <HmacSha256>::new_from_slice(&self.key).map_err(|_| TokenError::Key)
  }

  /// Issue a token for `identity`, valid from `now` for the configured TTL.
  pub fn issue(&self, identity: &Identity, now: DateTime<Utc>) -> Result<String, TokenError> {
    let claims = Claims {
      sub:   identity.subject_id,
      email: identity.email.clone(),
      role:  identity.role,
      iat:   now.timestamp(),
      exp:   (now + self.ttl).timestamp(),
    };
    let header = Header { alg: ALGORITHM.to_string(), typ: "JWT".to_string() };

    let signing_input = format!(
      "{}.{}",
      URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
      URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?),
    );
    let mut mac = self.mac()?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{signing_input}.{signature}"))
  }

  /// Verify `token`'s signature and expiry as of `now`.
  pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
    let (signing_input, signature) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;
    let (header, claims) = signing_input.split_once('.').ok_or(TokenError::Malformed)?;

    let header: Header = decode_segment(header)?;
    if header.alg != ALGORITHM {
      return Err(TokenError::Algorithm(header.alg));
    }

    let signature = URL_SAFE_NO_PAD
      .decode(signature)
      .map_err(|_| TokenError::Malformed)?;
    let mut mac = self.mac()?;
    mac.update(signing_input.as_bytes());
    mac
      .verify_slice(&signature)
      .map_err(|_| TokenError::BadSignature)?;

    let claims: Claims = decode_segment(claims)?;
    if claims.exp <= now.timestamp() {
      return Err(TokenError::Expired);
    }
    Ok(claims)
  }
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str) -> Result<T, TokenError> {
  let bytes = URL_SAFE_NO_PAD
    .decode(segment)
    .map_err(|_| TokenError::Malformed)?;
  serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}
