//! HTTP surface for Malaria24.
//!
//! Exposes an axum [`Router`] backed by any [`MalariaStore`] and [`Mailer`]:
//! the gateway and case intake endpoints, the public facility lookups, and
//! the staff-only admin endpoints. TLS and request tracing are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = malaria24_api::router(state).layer(TraceLayer::new_for_http());
//! ```

pub mod admin;
pub mod auth;
pub mod cases;
pub mod error;
pub mod facilities;
pub mod inbound;

use std::sync::Arc;

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use malaria24_core::{mail::Mailer, store::MalariaStore};
use malaria24_notify::NotifierHandle;

pub use error::ApiError;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, M> {
  pub store:    Arc<S>,
  pub mailer:   Arc<M>,
  pub notifier: NotifierHandle,
}

impl<S, M> Clone for AppState<S, M> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      mailer:   Arc::clone(&self.mailer),
      notifier: self.notifier.clone(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router.
pub fn router<S, M>(state: AppState<S, M>) -> Router
where
  S: MalariaStore + 'static,
  M: Mailer + 'static,
{
  Router::new()
    // Gateway and case intake
    .route("/api/v1/inbound/", post(inbound::create::<S, M>))
    .route("/api/v1/cases/", post(cases::create::<S, M>))
    // Public lookups
    .route("/api/v1/facility/{facility_code}/", get(facilities::get_one::<S, M>))
    .route("/api/v1/localities/{facility_code}/", get(facilities::localities::<S, M>))
    // Admin
    .route(
      "/admin/facilities/upload",
      post(admin::upload_facilities::<S, M>).layer(DefaultBodyLimit::max(admin::UPLOAD_LIMIT)),
    )
    .route("/admin/ehp_report/{case_pk}/", get(admin::ehp_report::<S, M>))
    .with_state(state)
}

#[cfg(test)]
mod tests;
