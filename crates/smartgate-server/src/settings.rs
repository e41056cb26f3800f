//! Runtime server configuration.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;

/// Deserialised from `config.toml` layered under `SMARTGATE_*` environment
/// variables. Every field has a default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                     String,
  pub port:                     u16,
  pub store_path:               PathBuf,
  /// HS256 signing secret. A random one is generated at startup when unset,
  /// so tokens do not survive a restart.
  pub jwt_secret:               Option<String>,
  pub token_ttl_hours:          i64,
  pub recognition_url:          String,
  pub recognition_timeout_secs: u64,
  pub email_domain:             String,
  pub mail_from:                String,
  pub outbox_dir:               PathBuf,
  pub seed_admin_name:          String,
  pub seed_admin_email:         String,
  pub seed_admin_password:      String,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                     "127.0.0.1".into(),
      port:                     3001,
      store_path:               PathBuf::from("smartgate.db"),
      jwt_secret:               None,
      token_ttl_hours:          smartgate_api::token::DEFAULT_TTL_HOURS,
      recognition_url:          "http://localhost:5000".into(),
      recognition_timeout_secs: 10,
      email_domain:             "company.com".into(),
      mail_from:                "\"Admin Team\" <no-reply@company.com>".into(),
      outbox_dir:               PathBuf::from("outbox"),
      seed_admin_name:          "System Administrator".into(),
      seed_admin_email:         "admin@company.com".into(),
      seed_admin_password:      "admin123".into(),
    }
  }
}

impl ServerConfig {
  /// Load from `path` (optional) and the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("SMARTGATE"))
      .build()
      .context("failed to read config file")?;

    let mut cfg: ServerConfig = settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")?;
    // A blank secret would sign with an empty HMAC key.
    cfg.jwt_secret = cfg.jwt_secret.filter(|s| !s.trim().is_empty());
    cfg.store_path = expand_tilde(&cfg.store_path);
    cfg.outbox_dir = expand_tilde(&cfg.outbox_dir);
    Ok(cfg)
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_file_yields_defaults() {
    let cfg = ServerConfig::load(Path::new("/nonexistent/smartgate.toml")).unwrap();
    assert_eq!(cfg.token_ttl_hours, 24);
    assert_eq!(cfg.recognition_timeout_secs, 10);
    assert_eq!(cfg.seed_admin_email, "admin@company.com");
  }

  #[test]
  fn file_values_override_defaults() {
    let path = std::env::temp_dir().join(format!("smartgate-{}.toml", uuid::Uuid::new_v4()));
    std::fs::write(
      &path,
      "port = 8080\nemail_domain = \"example.org\"\njwt_secret = \"s3cret\"\n",
    )
    .unwrap();

    let cfg = ServerConfig::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.email_domain, "example.org");
    assert_eq!(cfg.jwt_secret.as_deref(), Some("s3cret"));
    assert_eq!(cfg.host, "127.0.0.1");
  }

  #[test]
  fn blank_jwt_secret_is_treated_as_unset() {
    for raw in ["\"\"", "\"   \""] {
      let path = std::env::temp_dir().join(format!("smartgate-{}.toml", uuid::Uuid::new_v4()));
      std::fs::write(&path, format!("jwt_secret = {raw}\n")).unwrap();

      let cfg = ServerConfig::load(&path).unwrap();
      std::fs::remove_file(&path).ok();

      assert_eq!(cfg.jwt_secret, None, "secret {raw} should be dropped");
    }
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/db.sqlite")), PathBuf::from(home).join("db.sqlite"));
    assert_eq!(expand_tilde(Path::new("/abs/db")), PathBuf::from("/abs/db"));
  }
}
