//! `POST /api/v1/inbound/`: SMS messages pushed by the messaging gateway.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use bytes::Bytes;
use malaria24_core::{inbound::NewInboundSms, mail::Mailer, store::MalariaStore};
use serde_json::Value;

use crate::{AppState, auth::Authenticated, error::ApiError};

/// Parse a request body as JSON, reporting syntax errors as a `detail`.
pub(crate) fn parse_json(body: &[u8]) -> Result<Value, ApiError> {
  serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("JSON parse error - {e}")))
}

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
  let input = NewInboundSms::from_payload(&payload)?;

  let sms = state
    .store
    .record_inbound(input)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(
    id = sms.id,
    message_id = %sms.message_id,
    user = %user.username,
    "inbound sms recorded"
  );
  Ok((StatusCode::CREATED, Json(sms)))
}
