//! Health facilities, keyed by their facility code.

use serde::{Deserialize, Serialize};

/// A health facility as persisted by the store.
///
/// `id` is the storage key. It is stable across re-imports of the same
/// facility code and is never reused once a row has been deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facility {
  #[serde(skip_serializing, default)]
  pub id:            i64,
  pub facility_code: String,
  pub facility_name: String,
  pub district:      String,
  pub subdistrict:   String,
  pub province:      String,
  pub phase:         String,
}

/// The fields of a facility as supplied by an import, without a storage key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFacility {
  pub facility_code: String,
  pub facility_name: String,
  pub district:      String,
  pub subdistrict:   String,
  pub province:      String,
  pub phase:         String,
}

impl NewFacility {
  pub fn new(facility_code: impl Into<String>) -> Self {
    Self { facility_code: facility_code.into(), ..Self::default() }
  }
}

/// Whether an upsert inserted a fresh row or updated one in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Upsert {
  Created,
  Updated,
}
