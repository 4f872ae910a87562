//! The notification worker pool.
//!
//! Request handlers hold a [`NotifierHandle`] and submit jobs without
//! waiting. A fixed number of workers pull jobs off one bounded queue and run
//! them against a shared [`NotifyContext`]. Each job runs in a task of its
//! own, so an error or a panic is logged and the worker moves on to the
//! next job; nothing is reported back to the submitter.

use std::sync::Arc;

use malaria24_core::{actor::DigestKind, mail::Mailer, store::MalariaStore};
use tokio::{
  sync::{Mutex, mpsc},
  task::{JoinHandle, JoinSet},
};
use tracing::Instrument as _;
use uuid::Uuid;

use crate::{NotifyContext, pdf::ReportRenderer};

/// A unit of notification work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
  /// Render and email the report for a newly created case.
  CaseCreated { case_id: i64 },
  /// Compile and email one kind of digest to its subscribers.
  Digest(DigestKind),
}

/// Cheap, cloneable submission side of the worker pool.
///
/// The pool shuts down once every handle has been dropped and the queue has
/// drained.
#[derive(Debug, Clone)]
pub struct NotifierHandle {
  tx: mpsc::Sender<Job>,
}

impl NotifierHandle {
  /// Queue `job` without waiting. Returns `false` (and logs a warning) if
  /// the queue is full or the pool has stopped.
  pub fn submit(&self, job: Job) -> bool {
    match self.tx.try_send(job) {
      Ok(()) => true,
      Err(mpsc::error::TrySendError::Full(job)) => {
        tracing::warn!(?job, "notification queue full; job dropped");
        false
      }
      Err(mpsc::error::TrySendError::Closed(job)) => {
        tracing::warn!(?job, "notifier stopped; job dropped");
        false
      }
    }
  }
}

/// Start `workers` workers (at least one) sharing a queue of `capacity`
/// jobs (at least one).
///
/// The returned [`JoinHandle`] completes after the last handle is dropped
/// and every queued job has run.
pub fn spawn_notifier<S, M, R>(
  ctx: Arc<NotifyContext<S, M, R>>,
  workers: usize,
  capacity: usize,
) -> (NotifierHandle, JoinHandle<()>)
where
  S: MalariaStore + 'static,
  M: Mailer + 'static,
  R: ReportRenderer + 'static,
{
  let (tx, rx) = mpsc::channel(capacity.max(1));
  let rx = Arc::new(Mutex::new(rx));

  let mut pool = JoinSet::new();
  for worker in 0..workers.max(1) {
    let rx = Arc::clone(&rx);
    let ctx = Arc::clone(&ctx);
    pool.spawn(async move {
      loop {
        let next = rx.lock().await.recv().await;
        let Some(job) = next else { break };

        // A panicking job takes down its own task, never the worker.
        let span = tracing::info_span!("notify", worker, job_id = %Uuid::new_v4(), ?job);
        let ctx = Arc::clone(&ctx);
        let task = tokio::spawn(async move { ctx.run(job).await }.instrument(span));
        if let Err(e) = task.await {
          tracing::error!(worker, ?job, error = %e, "notification job panicked");
        }
      }
      tracing::debug!(worker, "notifier worker stopped");
    });
  }

  let supervisor = tokio::spawn(async move {
    while let Some(joined) = pool.join_next().await {
      if let Err(e) = joined {
        tracing::error!(error = %e, "notifier worker stopped unexpectedly");
      }
    }
  });

  (NotifierHandle { tx }, supervisor)
}
