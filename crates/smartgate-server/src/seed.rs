//! Startup seeding: the default administrator and optional demo staff.

use anyhow::Context as _;
use smartgate_api::auth::hash_password;
use smartgate_core::{
  identity::{Identity, NewIdentity, Role},
  store::RecordStore,
};

use crate::settings::ServerConfig;

const DEMO_PASSWORD: &str = "staff123";

/// (name, email, department, position)
const DEMO_STAFF: [(&str, &str, &str, &str); 2] = [
  ("John Doe", "john.doe@company.com", "IT", "Software Developer"),
  ("Jane Smith", "jane.smith@company.com", "HR", "HR Manager"),
];

/// Create the configured administrator unless some admin already exists.
pub async fn ensure_admin<S: RecordStore>(
  store: &S,
  cfg: &ServerConfig,
) -> anyhow::Result<Option<Identity>> {
  let admins = store
    .list_identities(Some(Role::Admin))
    .await
    .context("failed to list administrators")?;
  if !admins.is_empty() {
    return Ok(None);
  }

  let mut input = NewIdentity::new(
    cfg.seed_admin_name.clone(),
    &cfg.seed_admin_email,
    Role::Admin,
    hash_password(&cfg.seed_admin_password)?,
  );
  input.department = Some("IT".into());
  input.position = Some("Administrator".into());

  let created = store
    .add_identity(input)
    .await
    .context("failed to create administrator")?;
  match &created {
    Some(admin) => tracing::info!(email = %admin.email, "created default administrator"),
    None => tracing::warn!(
      email = %cfg.seed_admin_email,
      "administrator email is taken by a non-admin identity"
    ),
  }
  Ok(created)
}

/// Insert the demo staff members whose emails are still free. Returns how
/// many were created.
pub async fn seed_demo<S: RecordStore>(store: &S) -> anyhow::Result<usize> {
  let hash = hash_password(DEMO_PASSWORD)?;
  let mut created = 0;
  for (name, email, department, position) in DEMO_STAFF {
    let mut input = NewIdentity::new(name, email, Role::Staff, hash.clone());
    input.department = Some(department.into());
    input.position = Some(position.into());

    if store
      .add_identity(input)
      .await
      .with_context(|| format!("failed to seed {email}"))?
      .is_some()
    {
      tracing::info!(%email, "seeded demo staff member");
      created += 1;
    }
  }
  Ok(created)
}
