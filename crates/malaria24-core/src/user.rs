//! Authenticated users of the API and the admin endpoints.

use serde::Serialize;

/// A login identity. `password_hash` is an argon2 PHC string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
  pub id:            i64,
  pub username:      String,
  pub email:         String,
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub is_staff:      bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
  pub username:      String,
  pub email:         String,
  pub password_hash: String,
  pub is_staff:      bool,
}
