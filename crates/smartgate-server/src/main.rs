//! SmartGate server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered under
//! `SMARTGATE_*` environment variables, opens the SQLite store, seeds the
//! default administrator, and serves the JSON API over HTTP.
//!
//! # Password hash generation
//!
//! ```sh
//! cargo run -p smartgate-server -- --hash-password
//! ```

mod outbox;
mod seed;
mod settings;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use clap::Parser;
use rand_core::{OsRng, RngCore};
use smartgate_api::{
  ApiSettings, AppState,
  auth::hash_password,
  recognition::HttpRecognizer,
  token::TokenIssuer,
};
use smartgate_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::{outbox::OutboxNotifier, settings::ServerConfig};

#[derive(Parser)]
#[command(author, version, about = "SmartGate attendance server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,

  /// Also insert the demo staff members if their emails are free.
  #[arg(long)]
  seed_demo: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_password {
    let password = read_password()?;
    println!("{}", hash_password(&password)?);
    return Ok(());
  }

  let cfg = ServerConfig::load(&cli.config)?;

  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;
  let store = Arc::new(store);

  seed::ensure_admin(store.as_ref(), &cfg).await?;
  if cli.seed_demo {
    let created = seed::seed_demo(store.as_ref()).await?;
    tracing::info!(created, "demo seeding finished");
  }

  let secret = match &cfg.jwt_secret {
    Some(secret) => secret.as_bytes().to_vec(),
    None => {
      tracing::warn!("jwt_secret is not set; tokens will not survive a restart");
      let mut key = vec![0u8; 32];
      OsRng.fill_bytes(&mut key);
      key
    }
  };
  let tokens = TokenIssuer::new(secret, chrono::Duration::hours(cfg.token_ttl_hours));

  let recognizer = HttpRecognizer::new(
    cfg.recognition_url.clone(),
    Duration::from_secs(cfg.recognition_timeout_secs),
  )
  .context("failed to build recognition client")?;
  let notifier = OutboxNotifier::new(cfg.outbox_dir.clone(), cfg.mail_from.clone());

  let state = AppState::new(
    store,
    tokens,
    Arc::new(recognizer),
    Arc::new(notifier),
    ApiSettings { email_domain: cfg.email_domain.clone() },
  );

  let app = smartgate_api::router(state);
  let address = cfg.address();

  tracing::info!(recognition = %cfg.recognition_url, "Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
