//! Read-only facility lookups used by the case reporting USSD/SMS flows.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/api/v1/facility/{facility_code}/` | 404 if unknown |
//! | `GET`  | `/api/v1/localities/{facility_code}/` | Subdistricts in the facility's district |

use axum::{
  Json,
  extract::{Path, State},
};
use malaria24_core::{facility::Facility, mail::Mailer, store::MalariaStore};

use crate::{AppState, error::ApiError};

/// `GET /api/v1/facility/{facility_code}/`
pub async fn get_one<S, M>(
  State(state): State<AppState<S, M>>,
  Path(facility_code): Path<String>,
) -> Result<Json<Facility>, ApiError>
where
  S: MalariaStore,
  M: Mailer,
{
  let facility = state
    .store
    .get_facility(&facility_code)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::NotFound)?;
  Ok(Json(facility))
}

/// `GET /api/v1/localities/{facility_code}/`
pub async fn localities<S, M>(
  State(state): State<AppState<S, M>>,
  Path(facility_code): Path<String>,
) -> Result<Json<Vec<String>>, ApiError>
where
  S: MalariaStore,
  M: Mailer,
{
  let names = state
    .store
    .localities(&facility_code)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::NotFound)?;
  Ok(Json(names))
}
