//! Préfecture server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) plus
//! `PREFECTURE__*` environment overrides, opens the SQLite store, and serves
//! the portal over HTTP.
//!
//! # Granting moderation rights
//!
//! Roles are never assigned through the HTTP surface:
//!
//! ```
//! cargo run -p prefecture-server -- --promote someone@university.edu
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use prefecture_core::{
  notify::{NoopNotifier, Notifier},
  profile::Role,
};
use prefecture_server::{AppState, ServerConfig, notify::ResendNotifier};
use prefecture_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Préfecture Q&A portal server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Give the account with this email the admin role, then exit.
  #[arg(long, value_name = "EMAIL", conflicts_with = "demote")]
  promote: Option<String>,

  /// Return the account with this email to the student role, then exit.
  #[arg(long, value_name = "EMAIL")]
  demote: Option<String>,
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

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config.as_path()).required(false))
    .add_source(config::Environment::with_prefix("PREFECTURE").separator("__"))
    .build()
    .context("failed to read config file")?;

  let mut server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  server_cfg.store_path = expand_tilde(&server_cfg.store_path);
  server_cfg.blob_dir = expand_tilde(&server_cfg.blob_dir);

  let store = SqliteStore::open(&server_cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", server_cfg.store_path))?;

  tokio::fs::create_dir_all(&server_cfg.blob_dir)
    .await
    .with_context(|| format!("failed to create blob dir {:?}", server_cfg.blob_dir))?;

  let notifier: Arc<dyn Notifier> = match &server_cfg.notify {
    Some(cfg) => match ResendNotifier::new(cfg).context("failed to build mail client")? {
      Some(resend) => Arc::new(resend),
      None => {
        tracing::warn!("[notify] has no recipients; admins will not be emailed");
        Arc::new(NoopNotifier)
      }
    },
    None => {
      tracing::warn!("no [notify] section; admins will not be emailed");
      Arc::new(NoopNotifier)
    }
  };

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  let state = AppState::new(Arc::new(store), server_cfg, notifier);

  // Helper modes: change a role and exit.
  let role_change = match (cli.promote, cli.demote) {
    (Some(email), _) => Some((email, Role::Admin)),
    (None, Some(email)) => Some((email, Role::Student)),
    (None, None) => None,
  };
  if let Some((email, role)) = role_change {
    let profile = state
      .portal
      .assign_role(&email, role)
      .await
      .with_context(|| format!("failed to set role for {email}"))?;
    println!("{} is now {}", profile.email, profile.role);
    return Ok(());
  }

  let app = prefecture_server::router(state);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
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
