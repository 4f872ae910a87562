//! Facility import pipeline.
//!
//! An upload (JSON array or CSV) is decoded and validated in full, then
//! optionally the existing facilities are wiped, then every row is upserted
//! by facility code in file order. The acting user receives a confirmation
//! email once the rows are written.
//!
//! Rows are upserted one at a time; a storage failure part-way through
//! leaves the earlier rows in place.

pub mod error;
mod parse;

pub use error::{Error, Result};
pub use parse::parse_upload;

use malaria24_core::{
  facility::Upsert,
  mail::{Email, Mailer},
  store::MalariaStore,
};
use serde::Serialize;

pub const CONFIRMATION_SUBJECT: &str = "Facilities import complete.";

/// Counts reported back to the uploader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
  pub created: usize,
  pub updated: usize,
  /// Rows removed by the wipe step; zero when no wipe was requested.
  pub wiped:   u64,
}

impl ImportSummary {
  fn confirmation_text(&self) -> String {
    format!(
      "{CONFIRMATION_SUBJECT}\n\n\
       Facilities created: {}\n\
       Facilities updated: {}\n\
       Facilities removed before import: {}\n",
      self.created, self.updated, self.wiped,
    )
  }
}

/// Import `upload` into `store` and email `notify` when done.
///
/// A malformed upload is rejected before anything is written, so it never
/// triggers a wipe. A failure to send the confirmation is logged and does
/// not fail the import.
pub async fn run_import<S, M>(
  store: &S,
  mailer: &M,
  upload: &[u8],
  wipe: bool,
  notify: &str,
) -> Result<ImportSummary>
where
  S: MalariaStore,
  M: Mailer,
{
  let rows = parse_upload(upload)?;
  let mut summary = ImportSummary::default();

  if wipe {
    summary.wiped = store
      .wipe_facilities()
      .await
      .map_err(|e| Error::Store(Box::new(e)))?;
  }

  for row in rows {
    let code = row.facility_code.clone();
    let (facility, outcome) = store
      .upsert_facility(row)
      .await
      .map_err(|e| Error::Store(Box::new(e)))?;

    match outcome {
      Upsert::Created => summary.created += 1,
      Upsert::Updated => summary.updated += 1,
    }
    tracing::debug!(facility_code = %code, id = facility.id, ?outcome, "facility upserted");
  }

  tracing::info!(
    created = summary.created,
    updated = summary.updated,
    wiped = summary.wiped,
    "facility import finished"
  );

  let email = Email::new(vec![notify.to_owned()], CONFIRMATION_SUBJECT, summary.confirmation_text());
  if let Err(e) = mailer.send(email).await {
    tracing::error!(to = %notify, error = %e, "failed to send import confirmation");
  }

  Ok(summary)
}

#[cfg(test)]
mod tests {
  use malaria24_core::{facility::NewFacility, mail::MemoryOutbox};
  use malaria24_store_sqlite::SqliteStore;

  use super::*;

  const UPLOAD: &[u8] = br#"[{
    "District": "District",
    "FacCode": "123456",
    "Facility": "Facility Name",
    "Phase": "D",
    "Province": "Province",
    "Sub-District (Locality)": "Sub-District"
  }]"#;

  async fn store_with_old_facility() -> (SqliteStore, i64) {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let mut old = NewFacility::new("123456");
    old.facility_name = "The Old Name".into();
    let (facility, _) = store.upsert_facility(old).await.unwrap();
    (store, facility.id)
  }

  #[tokio::test]
  async fn import_creates_facility_and_emails_uploader() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let outbox = MemoryOutbox::new();

    let summary = run_import(&store, &outbox, UPLOAD, false, "user@example.org")
      .await
      .unwrap();
    assert_eq!(summary, ImportSummary { created: 1, updated: 0, wiped: 0 });

    let all = store.list_facilities().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].facility_code, "123456");
    assert_eq!(all[0].subdistrict, "Sub-District");

    let sent = outbox.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, ["user@example.org"]);
    assert_eq!(sent[0].subject, "Facilities import complete.");
  }

  #[tokio::test]
  async fn reimport_updates_in_place() {
    let (store, old_id) = store_with_old_facility().await;
    let outbox = MemoryOutbox::new();

    let summary = run_import(&store, &outbox, UPLOAD, false, "user@example.org")
      .await
      .unwrap();
    assert_eq!(summary.updated, 1);

    let all = store.list_facilities().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].facility_name, "Facility Name");
    assert_eq!(all[0].id, old_id);
  }

  #[tokio::test]
  async fn wipe_discards_old_rows_and_keys() {
    let (store, old_id) = store_with_old_facility().await;
    let outbox = MemoryOutbox::new();

    let summary = run_import(&store, &outbox, UPLOAD, true, "user@example.org")
      .await
      .unwrap();
    assert_eq!(summary, ImportSummary { created: 1, updated: 0, wiped: 1 });

    let all = store.list_facilities().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].facility_name, "Facility Name");
    assert_ne!(all[0].id, old_id);
    assert_eq!(outbox.len(), 1);
  }

  #[tokio::test]
  async fn malformed_upload_writes_nothing() {
    let (store, old_id) = store_with_old_facility().await;
    let outbox = MemoryOutbox::new();

    let err = run_import(&store, &outbox, b"[{\"Facility\": \"x\"}]", true, "user@example.org")
      .await
      .unwrap_err();
    assert!(err.is_invalid_upload());

    let all = store.list_facilities().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, old_id);
    assert!(outbox.is_empty());
  }

  #[tokio::test]
  async fn repeated_code_in_one_upload_updates_the_first_row() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let outbox = MemoryOutbox::new();
    let upload = br#"[{"FacCode": "1", "Facility": "First"}, {"FacCode": "1", "Facility": "Second"}]"#;

    let summary = run_import(&store, &outbox, upload, false, "user@example.org")
      .await
      .unwrap();
    assert_eq!((summary.created, summary.updated), (1, 1));
    let facility = store.get_facility("1").await.unwrap().unwrap();
    assert_eq!(facility.facility_name, "Second");
  }
}
