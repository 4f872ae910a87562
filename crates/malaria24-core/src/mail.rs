//! Outbound email: the message type, the [`Mailer`] transport trait and an
//! in-memory outbox.

use std::{
  convert::Infallible,
  future::Future,
  sync::{Arc, Mutex},
};

use serde::{Deserialize, Serialize};

/// A file attached to an [`Email`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
  pub filename:     String,
  pub content_type: String,
  pub data:         Vec<u8>,
}

/// A single outbound message. `text` is always present; `html` is an
/// optional alternative body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
  pub to:          Vec<String>,
  pub subject:     String,
  pub text:        String,
  pub html:        Option<String>,
  pub attachments: Vec<Attachment>,
}

impl Email {
  pub fn new(to: Vec<String>, subject: impl Into<String>, text: impl Into<String>) -> Self {
    Self { to, subject: subject.into(), text: text.into(), ..Self::default() }
  }

  pub fn with_html(mut self, html: impl Into<String>) -> Self {
    self.html = Some(html.into());
    self
  }

  pub fn with_attachment(mut self, attachment: Attachment) -> Self {
    self.attachments.push(attachment);
    self
  }
}

/// Abstraction over a mail transport (SMTP relay, HTTP mail API, ...).
pub trait Mailer: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Hand `email` to the transport. Returning `Ok` means the transport
  /// accepted it, not that it was delivered.
  fn send(&self, email: Email) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

/// A [`Mailer`] that keeps every message in memory.
///
/// Cloning shares the underlying outbox, so a test can keep one clone and
/// hand another to the code under test.
#[derive(Debug, Clone, Default)]
pub struct MemoryOutbox {
  sent: Arc<Mutex<Vec<Email>>>,
}

impl MemoryOutbox {
  pub fn new() -> Self { Self::default() }

  /// A snapshot of every message sent so far, oldest first.
  pub fn sent(&self) -> Vec<Email> {
    self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
  }

  pub fn len(&self) -> usize {
    self.sent.lock().map(|sent| sent.len()).unwrap_or(0)
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl Mailer for MemoryOutbox {
  type Error = Infallible;

  async fn send(&self, email: Email) -> Result<(), Infallible> {
    if let Ok(mut sent) = self.sent.lock() {
      sent.push(email);
    }
    Ok(())
  }
}
