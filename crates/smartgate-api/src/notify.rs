//! Credential notification.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("delivery failed: {0}")]
  Delivery(String),
}

/// An outgoing email with plain-text and HTML alternatives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
  pub to:      String,
  pub subject: String,
  pub text:    String,
  pub html:    String,
}

impl EmailMessage {
  /// The message that hands a new staff member their login credentials.
  pub fn credentials(name: &str, email: &str, password: &str) -> Self {
    let text = format!(
      "Hello {name},\n\n\
       Your staff account has been created.\n\n\
       Email: {email}\n\
       Password: {password}\n\n\
       Please keep these credentials safe and change your password after \
       your first login.\n"
    );
    let html = format!(
      "<div style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;\">\n\
       <h2>Welcome to the team!</h2>\n\
       <p>Hello {name},</p>\n\
       <p>Your staff account has been created. Your login credentials:</p>\n\
       <div style=\"background-color: #f5f5f5; padding: 20px; border-radius: 5px;\">\n\
       <p><strong>Email:</strong> {email}</p>\n\
       <p><strong>Password:</strong> {password}</p>\n\
       </div>\n\
       <p>Please keep these credentials safe and change your password after your first login.</p>\n\
       </div>\n",
      name = escape_html(name),
      email = escape_html(email),
      password = escape_html(password),
    );

    Self {
      to: email.to_string(),
      subject: "Your Staff Account Credentials".to_string(),
      text,
      html,
    }
  }
}

fn escape_html(raw: &str) -> String {
  let mut out = String::with_capacity(raw.len());
  for c in raw.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      c => out.push(c),
    }
  }
  out
}

/// Delivers messages. Implementations decide the transport.
#[async_trait]
pub trait Notifier: Send + Sync {
  async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError>;
}
