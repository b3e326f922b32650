//! healthsync-api server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), overlays any
//! `HEALTHSYNC_*` environment variables, and serves the measurement API over
//! HTTP.
//!
//! # Issuing a token
//!
//! To mint a bearer token signed with the configured secret:
//!
//! ```text
//! cargo run -p healthsync-api --bin server -- --issue-token user-123 --email user@example.com
//! ```

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use healthsync_api::{AppState, LogFormat, ServerConfig};
use healthsync_core::{identity::Identity, store::EphemeralStore};
use healthsync_token::ttl_from_minutes;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "HealthSync measurement API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print a bearer token for this subject and exit.
  #[arg(long, value_name = "SUBJECT")]
  issue_token: Option<String>,

  /// Email claim for `--issue-token`.
  #[arg(long, requires = "issue_token")]
  email: Option<String>,

  /// Lifetime for `--issue-token`, overriding `access_token_expire_minutes`.
  #[arg(long, requires = "issue_token", allow_negative_numbers = true)]
  ttl_minutes: Option<i64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();
  let server_cfg = load_config(&cli)?;

  init_tracing(server_cfg.log_format);

  if server_cfg.uses_development_secret() {
    tracing::warn!(
      "secret_key is the development placeholder; set HEALTHSYNC_SECRET_KEY before deploying"
    );
  }

  let state = AppState::new(EphemeralStore, &server_cfg).context("invalid configuration")?;

  // Helper mode: issue a token and exit.
  if let Some(subject) = cli.issue_token {
    let mut identity = Identity::new(subject);
    if let Some(email) = cli.email {
      identity = identity.with_email(email);
    }
    let ttl = cli
      .ttl_minutes
      .map(ttl_from_minutes)
      .transpose()
      .context("invalid --ttl-minutes")?;
    let token = state
      .codec
      .issue(&identity, ttl)
      .context("failed to sign token")?;
    println!("{token}");
    return Ok(());
  }

  tracing::info!(version = env!("CARGO_PKG_VERSION"), "HealthSync API starting up");

  let app = healthsync_api::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  tracing::info!("HealthSync API shutting down");
  Ok(())
}

/// Defaults, then the config file if present, then the environment.
fn load_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
  let defaults = ServerConfig::default();

  let settings = config::Config::builder()
    .set_default("host", defaults.host)?
    .set_default("port", i64::from(defaults.port))?
    .set_default("secret_key", defaults.secret_key)?
    .set_default("algorithm", defaults.algorithm)?
    .set_default("access_token_expire_minutes", defaults.access_token_expire_minutes)?
    .set_default("log_format", "pretty")?
    .add_source(config::File::from(cli.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("HEALTHSYNC").try_parsing(true))
    .build()
    .context("failed to read config file")?;

  settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")
}

/// Logs go to stderr so `--issue-token` output stays clean.
fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::builder()
    .with_default_directive(LevelFilter::INFO.into())
    .from_env_lossy();

  match format {
    LogFormat::Pretty => tracing_subscriber::fmt()
      .with_env_filter(filter)
      .with_writer(std::io::stderr)
      .init(),
    LogFormat::Json => tracing_subscriber::fmt()
      .json()
      .with_env_filter(filter)
      .with_writer(std::io::stderr)
      .init(),
  }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      tracing::error!(error = %e, "failed to listen for ctrl-c");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
      Ok(mut sig) => {
        sig.recv().await;
      }
      Err(e) => {
        tracing::error!(error = %e, "failed to listen for SIGTERM");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    () = ctrl_c => {},
    () = terminate => {},
  }
}
