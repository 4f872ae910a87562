//! HTTP Basic-auth extractors backed by the user table.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use malaria24_core::{mail::Mailer, store::MalariaStore, user::User};

use crate::{
  AppState,
  error::{ApiError, NOT_AUTHENTICATED, PERMISSION_DENIED},
};

/// Any user with valid credentials.
#[derive(Debug)]
pub struct Authenticated(pub User);

/// A user with valid credentials and the staff flag set.
#[derive(Debug)]
pub struct Staff(pub User);

/// Pull `(username, password)` out of an `Authorization: Basic` header.
pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())?;
  let encoded = header_val.strip_prefix("Basic ")?;
  let decoded = B64.decode(encoded.trim()).ok()?;
  let creds = String::from_utf8(decoded).ok()?;
  let (username, password) = creds.split_once(':')?;
  Some((username.to_owned(), password.to_owned()))
}

/// Check `password` against a PHC string produced by argon2.
pub fn verify_password(password: &str, phc: &str) -> bool {
  let Ok(parsed_hash) = PasswordHash::new(phc) else {
    return false;
  };
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .is_ok()
}

/// Resolve the request's credentials to a stored user.
pub async fn authenticate<S>(headers: &HeaderMap, store: &S) -> Result<User, ApiError>
where
  S: MalariaStore,
{
  let (username, password) = basic_credentials(headers).ok_or(ApiError::Forbidden(NOT_AUTHENTICATED))?;

  let user = store
    .find_user(&username)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::Forbidden(NOT_AUTHENTICATED))?;

  if !verify_password(&password, &user.password_hash) {
    tracing::debug!(%username, "rejected credentials");
    return Err(ApiError::Forbidden(NOT_AUTHENTICATED));
  }
  Ok(user)
}

impl<S, M> FromRequestParts<AppState<S, M>> for Authenticated
where
  S: MalariaStore + 'static,
  M: Mailer + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, M>,
  ) -> Result<Self, Self::Rejection> {
    authenticate(&parts.headers, state.store.as_ref())
      .await
      .map(Authenticated)
  }
}

impl<S, M> FromRequestParts<AppState<S, M>> for Staff
where
  S: MalariaStore + 'static,
  M: Mailer + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, M>,
  ) -> Result<Self, Self::Rejection> {
    let user = authenticate(&parts.headers, state.store.as_ref()).await?;
    if !user.is_staff {
      return Err(ApiError::Forbidden(PERMISSION_DENIED));
    }
    Ok(Staff(user))
  }
}
