//! Asynchronous notifications for Malaria24.
//!
//! - Case reports: when a case is created, its report is rendered (HTML
//!   body, plain text, PDF attachment) and emailed to the EHPs and digest
//!   subscribers responsible for the reporting facility.
//! - Digests: periodic case counts per district, province or nation.
//!
//! Work runs on a worker pool started with [`spawn_notifier`]; callers only
//! ever see a non-blocking [`NotifierHandle::submit`].

pub mod digest;
pub mod error;
pub mod pdf;
pub mod recipients;
pub mod report;
mod worker;

use std::{collections::HashMap, sync::Arc};

use chrono::{Duration, Utc};
use malaria24_core::{
  actor::DigestKind,
  mail::{Email, Mailer},
  store::MalariaStore,
};

pub use error::{Error, Result};
pub use pdf::{PdfRenderer, ReportRenderer};
pub use report::CaseReport;
pub use worker::{Job, NotifierHandle, spawn_notifier};

/// Everything a worker needs to run a [`Job`].
pub struct NotifyContext<S, M, R = PdfRenderer> {
  pub store:              Arc<S>,
  pub mailer:             Arc<M>,
  pub renderer:           R,
  /// How far back a digest looks.
  pub digest_period_days: i64,
}

impl<S, M> NotifyContext<S, M, PdfRenderer> {
  pub fn new(store: Arc<S>, mailer: Arc<M>) -> Self {
    Self { store, mailer, renderer: PdfRenderer, digest_period_days: 7 }
  }
}

impl<S, M, R> NotifyContext<S, M, R>
where
  S: MalariaStore,
  M: Mailer,
  R: ReportRenderer,
{
  /// Run `job`, logging instead of returning any failure.
  pub async fn run(&self, job: Job) {
    let outcome = match job {
      Job::CaseCreated { case_id } => self.send_case_report(case_id).await,
      Job::Digest(kind) => self.send_digest(kind).await.map(|_| ()),
    };

    if let Err(e) = outcome {
      tracing::error!(error = %e, "notification failed");
    }
  }

  /// Email the report for case `case_id`. Returns without sending when no
  /// recipient is subscribed.
  pub async fn send_case_report(&self, case_id: i64) -> Result<()> {
    let store_err = |e: S::Error| Error::Store(Box::new(e));

    let case = self
      .store
      .get_case(case_id)
      .await
      .map_err(store_err)?
      .ok_or(Error::CaseNotFound(case_id))?;
    let facility = self
      .store
      .get_facility(&case.facility_code)
      .await
      .map_err(store_err)?;

    let recipients = recipients::for_case(&*self.store, &case, facility.as_ref()).await?;
    if recipients.is_empty() {
      tracing::info!(case_id, facility_code = %case.facility_code, "no recipients for case report");
      return Ok(());
    }

    let report = CaseReport::new(&case, facility.as_ref());
    let attachment = self.renderer.render(&report)?;
    let to: Vec<String> = recipients.into_iter().map(|a| a.email).collect();
    let count = to.len();

    let email = Email::new(to, report.subject(), report.render_text())
      .with_html(report.render_html())
      .with_attachment(attachment);

    self
      .mailer
      .send(email)
      .await
      .map_err(|e| Error::Mail(Box::new(e)))?;

    tracing::info!(case_id, recipients = count, "case report sent");
    Ok(())
  }

  /// Email one digest of `kind` to each subscriber. Returns the number of
  /// emails sent; a failed send is logged and does not stop the others.
  pub async fn send_digest(&self, kind: DigestKind) -> Result<usize> {
    let store_err = |e: S::Error| Error::Store(Box::new(e));

    let recipients = self.store.digest_recipients(kind).await.map_err(store_err)?;
    if recipients.is_empty() {
      tracing::debug!(%kind, "no digest subscribers");
      return Ok(0);
    }

    let since = Duration::try_days(self.digest_period_days)
      .and_then(|period| Utc::now().checked_sub_signed(period))
      .ok_or(Error::PeriodOutOfRange(self.digest_period_days))?;
    let cases = self.store.cases_since(since).await.map_err(store_err)?;
    let facilities: HashMap<_, _> = self
      .store
      .list_facilities()
      .await
      .map_err(store_err)?
      .into_iter()
      .map(|f| (f.facility_code.clone(), f))
      .collect();

    let mut sent = 0;
    for recipient in &recipients {
      let Some(table) = digest::tally(kind, recipient, &cases, &facilities) else {
        tracing::warn!(%kind, email = %recipient.email, "digest recipient has no scope; skipped");
        continue;
      };

      let email = table.into_email(recipient, self.digest_period_days);
      match self.mailer.send(email).await {
        Ok(()) => sent += 1,
        Err(e) => tracing::error!(%kind, email = %recipient.email, error = %e, "digest send failed"),
      }
    }

    tracing::info!(%kind, sent, "digest sent");
    Ok(sent)
  }
}
