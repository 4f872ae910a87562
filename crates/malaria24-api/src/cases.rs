//! `POST /api/v1/cases/`: report a new malaria case.
//!
//! The case is stored synchronously; the report email is queued on the
//! notifier and never delays the response.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use bytes::Bytes;
use malaria24_core::{case::NewCase, mail::Mailer, store::MalariaStore};
use malaria24_notify::Job;

use crate::{AppState, auth::Authenticated, error::ApiError, inbound::parse_json};

pub async fn create<S, M>(
  State(state): State<AppState<S, M>>,
  Authenticated(user): Authenticated,
  body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
  S: MalariaStore,
  M: Mailer,
{
  let payload = parse_json(&body)?;
  let mut input = NewCase::from_payload(&payload)?;
  if input.reported_by.is_empty() {
    input.reported_by = user.username.clone();
  }

  let case = state
    .store
    .create_case(input)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(id = case.id, facility_code = %case.facility_code, "case created");

  if !state.notifier.submit(Job::CaseCreated { case_id: case.id }) {
    tracing::warn!(id = case.id, "case report not queued");
  }
  Ok((StatusCode::CREATED, Json(case)))
}
