//! malaria24 server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, starts the notifier and serves the HTTP API.
//!
//! # Creating users
//!
//! Gateway and staff accounts authenticate with HTTP Basic auth:
//!
//! ```text
//! echo 's3cret' | malaria24 add-user --username gateway --email ops@example.org
//! echo 's3cret' | malaria24 add-user --username admin --email admin@example.org --staff
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::{Parser, Subcommand};
use malaria24_api::AppState;
use malaria24_core::{store::MalariaStore, user::NewUser};
use malaria24_notify::{NotifyContext, spawn_notifier};
use malaria24_server::{LogMailer, ServerConfig, run_digest_schedule, seed_actors};
use malaria24_store_sqlite::SqliteStore;
use rand_core::OsRng;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Malaria24 case reporting server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, global = true, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,
  /// Print the argon2 hash for a password entered on stdin and exit.
  HashPassword,
  /// Create a user whose password is read from stdin.
  AddUser {
    #[arg(long)]
    username: String,
    #[arg(long)]
    email:    String,
    /// Allow access to the admin endpoints.
    #[arg(long)]
    staff:    bool,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
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
    .add_source(malaria24_server::environment())
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(server_cfg).await,
    Command::HashPassword => {
      println!("{}", hash_password(&read_password()?)?);
      Ok(())
    }
    Command::AddUser { username, email, staff } => {
      let store = open_store(&server_cfg).await?;
      let password_hash = hash_password(&read_password()?)?;
      let user = store
        .add_user(NewUser { username, email, password_hash, is_staff: staff })
        .await
        .context("failed to add user")?;
      tracing::info!(id = user.id, username = %user.username, staff = user.is_staff, "user created");
      Ok(())
    }
  }
}

async fn serve(server_cfg: ServerConfig) -> anyhow::Result<()> {
  let store = Arc::new(open_store(&server_cfg).await?);
  seed_actors(store.as_ref(), &server_cfg.actors)
    .await
    .context("failed to seed actors")?;

  let mailer = Arc::new(LogMailer::new(server_cfg.mail_from.clone()));

  // Start the notifier.
  let mut ctx = NotifyContext::new(Arc::clone(&store), Arc::clone(&mailer));
  ctx.digest_period_days = server_cfg.digest_period_days;
  let (notifier, pool) = spawn_notifier(
    Arc::new(ctx),
    server_cfg.notifier_workers,
    server_cfg.notifier_queue,
  );

  let schedule = (server_cfg.digest_interval_hours > 0).then(|| {
    let every = Duration::from_secs(server_cfg.digest_interval_hours * 3600);
    tokio::spawn(run_digest_schedule(notifier.clone(), every))
  });

  let state = AppState { store, mailer, notifier };
  let app = malaria24_api::router(state).layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      let _ = tokio::signal::ctrl_c().await;
    })
    .await
    .context("server error")?;

  // The schedule holds the last notifier handle; stopping it lets the pool
  // drain whatever is still queued.
  if let Some(schedule) = schedule {
    schedule.abort();
    let _ = schedule.await;
  }
  tracing::info!("waiting for queued notifications");
  pool.await.context("notifier pool failed")?;

  Ok(())
}

async fn open_store(server_cfg: &ServerConfig) -> anyhow::Result<SqliteStore> {
  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    tokio::fs::create_dir_all(parent)
      .await
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))
}

fn hash_password(password: &str) -> anyhow::Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string(),
  )
}

/// Read a password from the first line of stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  eprint!("Password: ");
  io::stderr().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  let password = line.trim_end_matches(['\n', '\r']).to_owned();
  anyhow::ensure!(!password.is_empty(), "empty password");
  Ok(password)
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
