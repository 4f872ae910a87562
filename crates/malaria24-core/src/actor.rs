//! Actors (people who receive notifications) and digest subscriptions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

use crate::{Error, Result};

/// The job an actor does in the malaria programme.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
  AsRefStr, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  /// Environmental health practitioner; follows up individual cases.
  Ehp,
  /// Communicable disease control coordinator.
  Cdc,
  /// Malaria information system staff.
  Mis,
  Manager,
}

impl Role {
  pub fn parse(s: &str) -> Result<Self> {
    s.parse().map_err(|_| Error::UnknownRole(s.to_owned()))
  }
}

/// A person who may receive case reports and digests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
  pub id:            i64,
  pub name:          String,
  pub email:         String,
  pub phone_number:  String,
  pub role:          Role,
  pub district:      String,
  pub province:      String,
  /// Set for EHPs attached to a single facility.
  pub facility_code: Option<String>,
}

/// Actor fields without a storage key. Actors are upserted by email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewActor {
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
}

// ─── Digests ─────────────────────────────────────────────────────────────────

/// The geographic scope of a digest.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
  AsRefStr, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DigestKind {
  District,
  Provincial,
  National,
}

impl DigestKind {
  pub fn parse(s: &str) -> Result<Self> {
    s.parse().map_err(|_| Error::UnknownDigestKind(s.to_owned()))
  }

  /// Human-readable title, e.g. `"Provincial"`.
  pub fn title(self) -> &'static str {
    match self {
      Self::District => "District",
      Self::Provincial => "Provincial",
      Self::National => "National",
    }
  }
}

/// A digest subscription: a set of actors receiving one kind of digest.
///
/// Several digests of the same kind may exist; the recipients of a kind are
/// the union over all of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Digest {
  pub id:         i64,
  pub kind:       DigestKind,
  pub created_at: DateTime<Utc>,
  pub recipients: Vec<i64>,
}
