//! Runtime wiring for the `malaria24` binary: configuration, the logging
//! mail transport, actor seeding and the digest schedule.

use std::{collections::HashSet, convert::Infallible, path::PathBuf, time::Duration};

use malaria24_core::{
  actor::{DigestKind, NewActor, Role},
  mail::{Email, Mailer},
  store::MalariaStore,
};
use malaria24_notify::{Job, NotifierHandle};
use serde::Deserialize;
use strum::IntoEnumIterator as _;
use tokio::time::MissedTickBehavior;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Environment overrides: `MALARIA24_PORT=9000`, `MALARIA24_STORE_PATH=...`.
/// Nested keys use `__`.
pub fn environment() -> config::Environment {
  config::Environment::with_prefix("MALARIA24")
    .prefix_separator("_")
    .separator("__")
}

/// Runtime server configuration, deserialised from `config.toml` and
/// `MALARIA24_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                  String,
  pub port:                  u16,
  pub store_path:            PathBuf,
  /// Sender address stamped on outgoing mail.
  pub mail_from:             String,
  pub notifier_workers:      usize,
  pub notifier_queue:        usize,
  /// Hours between digest runs; `0` turns the schedule off.
  pub digest_interval_hours: u64,
  pub digest_period_days:    i64,
  pub actors:                Vec<ActorConfig>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                  "127.0.0.1".to_owned(),
      port:                  8000,
      store_path:            PathBuf::from("malaria24.db"),
      mail_from:             "malaria24@localhost".to_owned(),
      notifier_workers:      2,
      notifier_queue:        256,
      digest_interval_hours: 168,
      digest_period_days:    7,
      actors:                Vec::new(),
    }
  }
}

/// An actor declared in configuration, with the digests they receive.
#[derive(Debug, Clone, Deserialize)]
pub struct ActorConfig {
  pub name:          String,
  pub email:         String,
  #[serde(default)]
  pub phone_number:  String,
  pub role:          Role,
  #[serde(default)]
  pub district:      String,
  #[serde(default)]
  pub province:      String,
  #[serde(default)]
  pub facility_code: Option<String>,
  #[serde(default)]
  pub digests:       Vec<DigestKind>,
}

impl ActorConfig {
  pub fn to_new_actor(&self) -> NewActor {
    NewActor {
      name:          self.name.clone(),
      email:         self.email.clone(),
      phone_number:  self.phone_number.clone(),
      role:          self.role,
      district:      self.district.clone(),
      province:      self.province.clone(),
      facility_code: self.facility_code.clone(),
    }
  }
}

// ─── Seeding ──────────────────────────────────────────────────────────────────

/// Upsert configured actors and subscribe them to their digests.
///
/// Safe to run on every start: actors are keyed on email and a digest is
/// only created for subscribers not already receiving that kind.
pub async fn seed_actors<S>(store: &S, actors: &[ActorConfig]) -> Result<(), S::Error>
where
  S: MalariaStore,
{
  let mut ids = Vec::with_capacity(actors.len());
  for config in actors {
    let actor = store.upsert_actor(config.to_new_actor()).await?;
    ids.push(actor.id);
  }

  for kind in DigestKind::iter() {
    let existing: HashSet<i64> = store
      .digest_recipients(kind)
      .await?
      .into_iter()
      .map(|a| a.id)
      .collect();
    let missing: Vec<i64> = actors
      .iter()
      .zip(&ids)
      .filter(|(config, id)| config.digests.contains(&kind) && !existing.contains(id))
      .map(|(_, id)| *id)
      .collect();

    if !missing.is_empty() {
      tracing::info!(%kind, count = missing.len(), "subscribing actors to digest");
      store.create_digest(kind, missing).await?;
    }
  }
  Ok(())
}

// ─── Digest schedule ──────────────────────────────────────────────────────────

/// Queue every digest kind once per `every`, starting one period from now.
pub async fn run_digest_schedule(notifier: NotifierHandle, every: Duration) {
  let mut ticker = tokio::time::interval(every);
  ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
  ticker.tick().await;

  loop {
    ticker.tick().await;
    for kind in DigestKind::iter() {
      notifier.submit(Job::Digest(kind));
    }
  }
}

// ─── Mail transport ───────────────────────────────────────────────────────────

/// Writes outgoing mail to the log instead of delivering it.
#[derive(Debug, Clone)]
pub struct LogMailer {
  from: String,
}

impl LogMailer {
  pub fn new(from: impl Into<String>) -> Self { Self { from: from.into() } }
}

impl Mailer for LogMailer {
  type Error = Infallible;

  async fn send(&self, email: Email) -> Result<(), Self::Error> {
    tracing::info!(
      from = %self.from,
      to = ?email.to,
      subject = %email.subject,
      attachments = email.attachments.len(),
      "email"
    );
    tracing::debug!(body = %email.text);
    Ok(())
  }
}
