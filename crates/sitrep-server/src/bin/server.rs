//! sitrep server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, and serves the JSON API over HTTP.
//!
//! # Bootstrapping
//!
//! A fresh database has no users, so no request can authenticate. Create
//! the first admin and print its session token with:
//!
//! ```
//! cargo run -p sitrep-server --bin server -- --bootstrap-admin admin
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use sitrep_core::{engine::Reporting, principal::Role, user::NewUser};
use sitrep_core::store::SituationStore as _;
use sitrep_server::{AppState, ServerConfig};
use sitrep_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about = "sitrep reporting server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Create an active super-admin with the given username, print its
  /// session token, and exit.
  #[arg(long, value_name = "USERNAME")]
  bootstrap_admin: Option<String>,
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
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("SITREP"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Helper mode: create the first admin and exit.
  if let Some(username) = cli.bootstrap_admin {
    let token = bootstrap_admin(&store, &username).await?;
    println!("{token}");
    return Ok(());
  }

  let state = AppState {
    engine: Arc::new(Reporting::new(store)),
    config: Arc::new(server_cfg.clone()),
  };

  let app = sitrep_server::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

async fn bootstrap_admin(store: &SqliteStore, username: &str) -> anyhow::Result<String> {
  let mut input = NewUser::new(username, Role::Admin);
  input.is_super_admin = true;
  let user = store
    .create_user(input)
    .await
    .context("failed to create admin user")?;
  store
    .set_user_active(user.user_id, true)
    .await
    .context("failed to activate admin")?;

  let token = Uuid::new_v4().hyphenated().to_string();
  store
    .set_session_token(user.user_id, Some(token.clone()))
    .await
    .context("failed to set session token")?;

  tracing::info!(username, "bootstrapped super-admin");
  Ok(token)
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
