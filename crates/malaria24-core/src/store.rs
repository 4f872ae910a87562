//! The `MalariaStore` trait.
//!
//! Implemented by storage backends (e.g. `malaria24-store-sqlite`). The HTTP
//! layer, the importer and the notifier depend on this abstraction only.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  actor::{Actor, Digest, DigestKind, NewActor},
  case::{Case, NewCase},
  facility::{Facility, NewFacility, Upsert},
  inbound::{InboundSms, NewInboundSms},
  user::{NewUser, User},
};

/// Abstraction over a Malaria24 store backend.
///
/// All methods return `Send` futures so the trait can be used from
/// multi-threaded runtimes and spawned worker tasks.
pub trait MalariaStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Facilities ────────────────────────────────────────────────────────

  /// Look up a facility by code. Returns `None` if unknown.
  fn get_facility<'a>(
    &'a self,
    facility_code: &'a str,
  ) -> impl Future<Output = Result<Option<Facility>, Self::Error>> + Send + 'a;

  /// All facilities, ordered by facility code.
  fn list_facilities(
    &self,
  ) -> impl Future<Output = Result<Vec<Facility>, Self::Error>> + Send + '_;

  /// Insert a facility, or update the row with the same code in place.
  ///
  /// An update keeps the row's `id`.
  fn upsert_facility(
    &self,
    input: NewFacility,
  ) -> impl Future<Output = Result<(Facility, Upsert), Self::Error>> + Send + '_;

  /// Delete every facility and return how many rows were removed.
  fn wipe_facilities(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Distinct, non-empty subdistrict names in the district of the facility
  /// identified by `facility_code`, sorted ascending. `None` if the code is
  /// unknown.
  fn localities<'a>(
    &'a self,
    facility_code: &'a str,
  ) -> impl Future<Output = Result<Option<Vec<String>>, Self::Error>> + Send + 'a;

  // ── Inbound SMS ───────────────────────────────────────────────────────

  /// Persist a validated inbound message.
  fn record_inbound(
    &self,
    input: NewInboundSms,
  ) -> impl Future<Output = Result<InboundSms, Self::Error>> + Send + '_;

  /// All inbound messages, oldest first.
  fn list_inbound(&self) -> impl Future<Output = Result<Vec<InboundSms>, Self::Error>> + Send + '_;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Create a user. Fails if the username is taken.
  fn add_user(&self, input: NewUser) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn find_user<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  // ── Actors and digests ────────────────────────────────────────────────

  /// Insert an actor, or update the actor with the same email in place.
  fn upsert_actor(&self, input: NewActor) -> impl Future<Output = Result<Actor, Self::Error>> + Send + '_;

  fn list_actors(&self) -> impl Future<Output = Result<Vec<Actor>, Self::Error>> + Send + '_;

  /// Create a digest subscription of `kind` for the given actor ids.
  fn create_digest(
    &self,
    kind: DigestKind,
    recipients: Vec<i64>,
  ) -> impl Future<Output = Result<Digest, Self::Error>> + Send + '_;

  /// Every actor subscribed to at least one digest of `kind`, ordered by id.
  fn digest_recipients(
    &self,
    kind: DigestKind,
  ) -> impl Future<Output = Result<Vec<Actor>, Self::Error>> + Send + '_;

  // ── Cases ─────────────────────────────────────────────────────────────

  /// Persist a validated case. The `created_at` timestamp is set by the store.
  fn create_case(&self, input: NewCase) -> impl Future<Output = Result<Case, Self::Error>> + Send + '_;

  fn get_case(&self, id: i64) -> impl Future<Output = Result<Option<Case>, Self::Error>> + Send + '_;

  /// Cases created at or after `since`, oldest first.
  fn cases_since(
    &self,
    since: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<Case>, Self::Error>> + Send + '_;
}
