//! Who receives the report for a new case.

use std::collections::HashSet;

use malaria24_core::{
  actor::{Actor, DigestKind, Role},
  case::Case,
  facility::Facility,
  store::MalariaStore,
};

use crate::{Error, Result};

/// Resolve the recipients of the report for `case`:
///
/// - EHPs attached to the case's facility code,
/// - district digest subscribers in the facility's district,
/// - provincial digest subscribers in the facility's province,
/// - every national digest subscriber.
///
/// District and provincial matches need the facility; without it only EHPs
/// and national subscribers are returned. Actors are deduplicated by email
/// (case-insensitively), keeping first-seen order.
pub async fn for_case<S>(store: &S, case: &Case, facility: Option<&Facility>) -> Result<Vec<Actor>>
where
  S: MalariaStore,
{
  let store_err = |e: S::Error| Error::Store(Box::new(e));

  let mut candidates: Vec<Actor> = store
    .list_actors()
    .await
    .map_err(store_err)?
    .into_iter()
    .filter(|a| a.role == Role::Ehp && a.facility_code.as_deref() == Some(case.facility_code.as_str()))
    .collect();

  if let Some(facility) = facility {
    let district = store
      .digest_recipients(DigestKind::District)
      .await
      .map_err(store_err)?;
    candidates.extend(
      district
        .into_iter()
        .filter(|a| !facility.district.is_empty() && a.district == facility.district),
    );

    let provincial = store
      .digest_recipients(DigestKind::Provincial)
      .await
      .map_err(store_err)?;
    candidates.extend(
      provincial
        .into_iter()
        .filter(|a| !facility.province.is_empty() && a.province == facility.province),
    );
  }

  candidates.extend(
    store
      .digest_recipients(DigestKind::National)
      .await
      .map_err(store_err)?,
  );

  Ok(dedup_by_email(candidates))
}

pub fn dedup_by_email(actors: Vec<Actor>) -> Vec<Actor> {
  let mut seen = HashSet::new();
  actors
    .into_iter()
    .filter(|a| !a.email.is_empty() && seen.insert(a.email.to_lowercase()))
    .collect()
}
