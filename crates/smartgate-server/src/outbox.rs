//! [`Notifier`] that drops each message into a directory as an `.eml` file
//! for an external mail transfer agent to pick up.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use smartgate_api::notify::{EmailMessage, Notifier, NotifyError};
use uuid::Uuid;

pub struct OutboxNotifier {
  dir:  PathBuf,
  from: String,
}

impl OutboxNotifier {
  pub fn new(dir: impl Into<PathBuf>, from: impl Into<String>) -> Self {
    Self { dir: dir.into(), from: from.into() }
  }

  pub fn dir(&self) -> &Path { &self.dir }

  /// Render `message` as a `multipart/alternative` RFC 5322 message.
  fn render(&self, message: &EmailMessage, id: Uuid) -> String {
    let boundary = format!("smartgate-{}", id.simple());
    let mut out = String::new();
    out.push_str(&format!("From: {}\r\n", self.from));
    out.push_str(&format!("To: {}\r\n", message.to));
    out.push_str(&format!("Subject: {}\r\n", message.subject));
    out.push_str(&format!("Date: {}\r\n", Utc::now().to_rfc2822()));
    out.push_str(&format!("Message-ID: <{id}@smartgate>\r\n"));
    out.push_str("MIME-Version: 1.0\r\n");
    out.push_str(&format!(
      "Content-Type: multipart/alternative; boundary=\"{boundary}\"\r\n\r\n"
    ));
    for (kind, body) in [("text/plain", &message.text), ("text/html", &message.html)] {
      out.push_str(&format!("--{boundary}\r\n"));
      out.push_str(&format!("Content-Type: {kind}; charset=utf-8\r\n\r\n"));
      out.push_str(&body.replace('\n', "\r\n"));
      out.push_str("\r\n");
    }
    out.push_str(&format!("--{boundary}--\r\n"));
    out
  }
}

#[async_trait]
impl Notifier for OutboxNotifier {
  async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
    if message.to.contains(['\r', '\n']) || message.subject.contains(['\r', '\n']) {
      return Err(NotifyError::Delivery("header contains a line break".into()));
    }

    let id = Uuid::new_v4();
    tokio::fs::create_dir_all(&self.dir).await?;
    let path = self
      .dir
      .join(format!("{}-{}.eml", Utc::now().format("%Y%m%dT%H%M%S"), id.simple()));
    tokio::fs::write(&path, self.render(message, id)).await?;

    tracing::info!(to = %message.to, path = %path.display(), "message queued in outbox");
    Ok(())
  }
}
