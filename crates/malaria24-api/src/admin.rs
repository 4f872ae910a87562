//! Staff-only endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/admin/facilities/upload` | Multipart: `upload` file, `wipe` flag |
//! | `GET`  | `/admin/ehp_report/{case_pk}/` | HTML case report preview |

use axum::{
  Json,
  extract::{Multipart, Path, State, rejection::PathRejection},
  response::Html,
};
use malaria24_core::{mail::Mailer, store::MalariaStore, validation::FieldErrors};
use malaria24_import::{ImportSummary, run_import};
use malaria24_notify::CaseReport;

use crate::{AppState, auth::Staff, error::ApiError};

/// Largest accepted facility upload.
pub const UPLOAD_LIMIT: usize = 16 * 1024 * 1024;

const NO_FILE: &str = "No file was submitted.";
const NOT_A_BOOLEAN: &str = "Must be a valid boolean.";

fn parse_flag(value: &str) -> Option<bool> {
  match value.trim().to_ascii_lowercase().as_str() {
    "true" | "on" | "1" | "yes" => Some(true),
    "false" | "off" | "0" | "no" | "" => Some(false),
    _ => None,
  }
}

/// `POST /admin/facilities/upload`
pub async fn upload_facilities<S, M>(
  State(state): State<AppState<S, M>>,
  Staff(user): Staff,
  mut multipart: Multipart,
) -> Result<Json<ImportSummary>, ApiError>
where
  S: MalariaStore,
  M: Mailer,
{
  let mut upload = None;
  let mut wipe = false;
  let bad_form = |e: axum::extract::multipart::MultipartError| ApiError::BadRequest(e.body_text());

  while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
    match field.name() {
      Some("upload") => upload = Some(field.bytes().await.map_err(bad_form)?),
      Some("wipe") => {
        let text = field.text().await.map_err(bad_form)?;
        wipe = parse_flag(&text).ok_or_else(|| FieldErrors::single("wipe", NOT_A_BOOLEAN))?;
      }
      _ => {}
    }
  }

  let upload = upload.ok_or_else(|| FieldErrors::single("upload", NO_FILE))?;

  let summary = run_import(
    state.store.as_ref(),
    state.mailer.as_ref(),
    &upload,
    wipe,
    &user.email,
  )
  .await
  .map_err(|e| {
    if e.is_invalid_upload() {
      ApiError::Validation(FieldErrors::single("upload", e.to_string()))
    } else {
      ApiError::Store(Box::new(e))
    }
  })?;

  tracing::info!(
    user = %user.username,
    created = summary.created,
    updated = summary.updated,
    wiped = summary.wiped,
    "facility upload processed"
  );
  Ok(Json(summary))
}

/// `GET /admin/ehp_report/{case_pk}/`. A non-numeric key is a 404.
pub async fn ehp_report<S, M>(
  State(state): State<AppState<S, M>>,
  Staff(_): Staff,
  case_pk: Result<Path<i64>, PathRejection>,
) -> Result<Html<String>, ApiError>
where
  S: MalariaStore,
  M: Mailer,
{
  let Ok(Path(case_pk)) = case_pk else {
    return Err(ApiError::NotFound);
  };
  let case = state
    .store
    .get_case(case_pk)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::NotFound)?;
  let facility = state
    .store
    .get_facility(&case.facility_code)
    .await
    .map_err(ApiError::store)?;

  Ok(Html(CaseReport::new(&case, facility.as_ref()).render_html()))
}
