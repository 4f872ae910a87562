//! Field-level validation of loosely-typed JSON request bodies.
//!
//! Inbound payloads come from third-party gateways and field workers, so they
//! are read as a JSON object and checked field by field. Every problem is
//! collected into a [`FieldErrors`] map before anything is rejected, giving
//! the caller one response that names all offending fields.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

pub const REQUIRED: &str = "This field is required.";
pub const NOT_NULL: &str = "This field may not be null.";
pub const NOT_BLANK: &str = "This field may not be blank.";
pub const NOT_STRING: &str = "Not a valid string.";
pub const BAD_DATETIME: &str = "Datetime has wrong format.";

/// Key used for errors that do not belong to a single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Maps a field name to the list of messages describing what is wrong with it.
///
/// Serialises as a plain JSON object, e.g.
/// `{"message_id": ["This field is required."]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
  pub fn new() -> Self { Self::default() }

  /// A map holding a single message for a single field.
  pub fn single(field: &str, message: impl Into<String>) -> Self {
    let mut errors = Self::new();
    errors.add(field, message);
    errors
  }

  pub fn add(&mut self, field: &str, message: impl Into<String>) {
    self.0.entry(field.to_owned()).or_default().push(message.into());
  }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn get(&self, field: &str) -> Option<&[String]> {
    self.0.get(field).map(Vec::as_slice)
  }

  pub fn fields(&self) -> impl Iterator<Item = &str> {
    self.0.keys().map(String::as_str)
  }
}

impl std::fmt::Display for FieldErrors {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let mut first = true;
    for (field, messages) in &self.0 {
      if !first {
        f.write_str("; ")?;
      }
      first = false;
      write!(f, "{field}: {}", messages.join(" "))?;
    }
    Ok(())
  }
}

impl std::error::Error for FieldErrors {}

// ─── Validator ───────────────────────────────────────────────────────────────

/// Reads typed values out of a JSON object, recording errors as it goes.
///
/// Call the field accessors for every field of interest, then
/// [`Validator::finish`] to find out whether the body was acceptable.
pub struct Validator<'a> {
  body:   &'a Map<String, Value>,
  errors: FieldErrors,
}

impl<'a> Validator<'a> {
  /// Start validating `body`. A body that is not a JSON object is rejected
  /// immediately with a non-field error.
  pub fn new(body: &'a Value) -> Result<Self, FieldErrors> {
    match body {
      Value::Object(map) => Ok(Self { body: map, errors: FieldErrors::new() }),
      other => Err(FieldErrors::single(
        NON_FIELD_ERRORS,
        format!(
          "Invalid data. Expected a dictionary, but got {}.",
          json_type_name(other)
        ),
      )),
    }
  }

  /// A string that must be present, non-null and non-blank.
  ///
  /// Returns an empty string when the field is invalid; the error has
  /// already been recorded.
  pub fn required_str(&mut self, field: &str, max_len: usize) -> String {
    match self.body.get(field) {
      None => {
        self.errors.add(field, REQUIRED);
        String::new()
      }
      Some(Value::Null) => {
        self.errors.add(field, NOT_NULL);
        String::new()
      }
      Some(value) => match coerce_str(value) {
        Some(s) if s.trim().is_empty() => {
          self.errors.add(field, NOT_BLANK);
          String::new()
        }
        Some(s) => {
          self.check_len(field, &s, max_len);
          s
        }
        None => {
          self.errors.add(field, NOT_STRING);
          String::new()
        }
      },
    }
  }

  /// A string that may be absent, null or blank; all of those become `""`.
  /// Stored as sent, with no length limit.
  pub fn optional_str(&mut self, field: &str) -> String {
    match self.body.get(field) {
      None | Some(Value::Null) => String::new(),
      Some(value) => match coerce_str(value) {
        Some(s) => s,
        None => {
          self.errors.add(field, NOT_STRING);
          String::new()
        }
      },
    }
  }

  /// An optional timestamp. Accepts `YYYY-MM-DD HH:MM:SS[.ffffff]` (taken as
  /// UTC) and RFC 3339.
  pub fn optional_datetime(&mut self, field: &str) -> Option<DateTime<Utc>> {
    match self.body.get(field) {
      None | Some(Value::Null) => None,
      Some(Value::String(s)) if s.trim().is_empty() => None,
      Some(Value::String(s)) => match parse_datetime(s) {
        Some(dt) => Some(dt),
        None => {
          self.errors.add(field, BAD_DATETIME);
          None
        }
      },
      Some(_) => {
        self.errors.add(field, BAD_DATETIME);
        None
      }
    }
  }

  /// Finish validation, returning every recorded error if there were any.
  pub fn finish(self) -> Result<(), FieldErrors> {
    if self.errors.is_empty() { Ok(()) } else { Err(self.errors) }
  }

  fn check_len(&mut self, field: &str, value: &str, max_len: usize) {
    if value.chars().count() > max_len {
      self.errors.add(
        field,
        format!("Ensure this field has no more than {max_len} characters."),
      );
    }
  }
}

fn coerce_str(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    _ => None,
  }
}

fn json_type_name(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "bool",
    Value::Number(_) => "int",
    Value::String(_) => "str",
    Value::Array(_) => "list",
    Value::Object(_) => "dict",
  }
}

/// Parse the timestamp formats sent by SMS gateways.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
  let s = s.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.with_timezone(&Utc));
  }
  ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    .map(|naive| naive.and_utc())
}
