//! Identities: people who can authenticate and accrue attendance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What an identity is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Admin,
  #[default]
  Staff,
}

impl Role {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Admin => "admin",
      Self::Staff => "staff",
    }
  }
}

// ─── Identity ────────────────────────────────────────────────────────────────

/// A registered subject. The password hash is deliberately absent; see
/// [`LoginRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
  #[serde(rename = "id")]
  pub subject_id:    Uuid,
  pub name:          String,
  /// Unique, trimmed and lower-cased.
  pub email:         String,
  pub role:          Role,
  pub department:    Option<String>,
  pub position:      Option<String>,
  /// Opaque reference returned by the recognition service.
  #[serde(rename = "faceEncoding")]
  pub biometric_ref: Option<String>,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

impl Identity {
  pub fn is_admin(&self) -> bool { self.role == Role::Admin }
}

/// Input to [`crate::store::RecordStore::add_identity`]. Timestamps and the
/// subject id are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewIdentity {
  pub name:          String,
  pub email:         String,
  pub role:          Role,
  pub department:    Option<String>,
  pub position:      Option<String>,
  /// argon2 PHC string.
  pub password_hash: String,
}

impl NewIdentity {
  /// An identity with the given role and no department or position. The
  /// email is normalised.
  pub fn new(
    name: impl Into<String>,
    email: &str,
    role: Role,
    password_hash: impl Into<String>,
  ) -> Self {
    Self {
      name: name.into(),
      email: normalize_email(email),
      role,
      department: None,
      position: None,
      password_hash: password_hash.into(),
    }
  }
}

/// An identity together with its stored password hash, for credential checks.
#[derive(Debug, Clone)]
pub struct LoginRecord {
  pub identity:      Identity,
  pub password_hash: String,
}

/// Email handles are compared trimmed and lower-cased everywhere.
pub fn normalize_email(raw: &str) -> String { raw.trim().to_lowercase() }

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn emails_are_trimmed_and_lowercased() {
    assert_eq!(normalize_email("  Jane.Smith@SmartGate.com "), "jane.smith@smartgate.com");
  }

  #[test]
  fn new_identity_keeps_the_given_role() {
    let admin = NewIdentity::new("Root", " Root@Company.com", Role::Admin, "hash");
    assert_eq!(admin.role, Role::Admin);
    assert_eq!(admin.email, "root@company.com");
    assert!(admin.department.is_none() && admin.position.is_none());
  }

  #[test]
  fn identity_uses_dashboard_field_names() {
    let now = Utc::now();
    let identity = Identity {
      subject_id: Uuid::new_v4(),
      name: "Jane".into(),
      email: "jane@company.com".into(),
      role: Role::Staff,
      department: Some("HR".into()),
      position: None,
      biometric_ref: Some("enc".into()),
      created_at: now,
      updated_at: now,
    };
    let v = serde_json::to_value(&identity).unwrap();
    assert_eq!(v["id"], identity.subject_id.to_string());
    assert_eq!(v["faceEncoding"], "enc");
    assert!(v["createdAt"].is_string() && v["updatedAt"].is_string());
    assert!(v.get("subject_id").is_none());
  }

  #[test]
  fn role_serialises_lowercase() {
    assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
  }
}
