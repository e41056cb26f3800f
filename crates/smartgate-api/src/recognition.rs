//! Client for the external face-recognition service.
//!
//! The service exposes two JSON endpoints:
//!
//! | Method | Path | Body | Reply |
//! |--------|------|------|-------|
//! | `POST` | `/recognize` | `{"image"}` | `{"success", "userId"?, "confidence"?, "message"?}` |
//! | `POST` | `/encode` | `{"image", "userId"}` | `{"success", "encoding"?, "message"?}` |
//!
//! Images are bare base64; see [`strip_data_url`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RecognitionError {
  #[error("recognition service timed out")]
  Timeout,

  #[error("recognition service returned {0}")]
  Status(reqwest::StatusCode),

  #[error("recognition transport error: {0}")]
  Transport(#[source] reqwest::Error),
}

impl From<reqwest::Error> for RecognitionError {
  fn from(e: reqwest::Error) -> Self {
    if e.is_timeout() { Self::Timeout } else { Self::Transport(e) }
  }
}

/// The biometric identity provider.
#[async_trait]
pub trait FaceRecognizer: Send + Sync {
  /// Match a face image against the enrolled subjects. `Ok(None)` means no
  /// match, which is not an error.
  async fn recognize(&self, image: &str) -> Result<Option<Uuid>, RecognitionError>;

  /// Enrol (or re-enrol) `subject_id` from a face image. Returns the opaque
  /// biometric reference, or `Ok(None)` if the service refused the image.
  async fn encode(&self, image: &str, subject_id: Uuid)
  -> Result<Option<String>, RecognitionError>;
}

/// Remove a leading `data:image/<type>;base64,` prefix, if any.
pub fn strip_data_url(image: &str) -> &str {
  let Some(rest) = image.strip_prefix("data:image/") else {
    return image;
  };
  match rest.split_once(";base64,") {
    Some((kind, payload)) if !kind.is_empty() && kind.bytes().all(|b| b.is_ascii_lowercase()) => {
      payload
    }
    _ => image,
  }
}

// ─── HTTP implementation ─────────────────────────────────────────────────────

#[derive(Serialize)]
struct RecognizeRequest<'a> {
  image: &'a str,
}

#[derive(Serialize)]
struct EncodeRequest<'a> {
  image:   &'a str,
  #[serde(rename = "userId")]
  user_id: String,
}

#[derive(Debug, Deserialize)]
struct RecognizeReply {
  #[serde(default)]
  success:    bool,
  #[serde(rename = "userId")]
  user_id:    Option<String>,
  confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct EncodeReply {
  #[serde(default)]
  success:  bool,
  encoding: Option<String>,
  message:  Option<String>,
}

/// [`FaceRecognizer`] backed by the recognition service over HTTP.
#[derive(Clone)]
pub struct HttpRecognizer {
  client:   Client,
  base_url: String,
}

impl HttpRecognizer {
  pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RecognitionError> {
    let client = Client::builder()
      .timeout(timeout)
      .build()
      .map_err(RecognitionError::Transport)?;
    Ok(Self { client, base_url: base_url.into() })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.base_url.trim_end_matches('/'), path)
  }
}

#[async_trait]
impl FaceRecognizer for HttpRecognizer {
  async fn recognize(&self, image: &str) -> Result<Option<Uuid>, RecognitionError> {
    let resp = self
      .client
      .post(self.url("/recognize"))
      .json(&RecognizeRequest { image })
      .send()
      .await?;
    if !resp.status().is_success() {
      return Err(RecognitionError::Status(resp.status()));
    }

    let reply: RecognizeReply = resp.json().await?;
    if !reply.success {
      return Ok(None);
    }
    let Some(raw) = reply.user_id else {
      return Ok(None);
    };
    match Uuid::parse_str(&raw) {
      Ok(id) => {
        tracing::debug!(subject_id = %id, confidence = ?reply.confidence, "face matched");
        Ok(Some(id))
      }
      Err(_) => {
        tracing::warn!(user_id = %raw, "recognition service returned a foreign id");
        Ok(None)
      }
    }
  }

  async fn encode(
    &self,
    image: &str,
    subject_id: Uuid,
  ) -> Result<Option<String>, RecognitionError> {
    let resp = self
      .client
      .post(self.url("/encode"))
      .json(&EncodeRequest { image, user_id: subject_id.to_string() })
      .send()
      .await?;
    if !resp.status().is_success() {
      return Err(RecognitionError::Status(resp.status()));
    }

    let reply: EncodeReply = resp.json().await?;
    match reply {
      EncodeReply { success: true, encoding: Some(encoding), .. } => Ok(Some(encoding)),
      EncodeReply { message, .. } => {
        tracing::info!(%subject_id, message = ?message, "face encoding refused");
        Ok(None)
      }
    }
  }
}
