//! Malaria case reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::validation::{FieldErrors, Validator};

const SHORT: usize = 255;

/// A reported malaria case, tied to the facility that reported it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
  pub id:            i64,
  pub facility_code: String,
  pub first_name:    String,
  pub last_name:     String,
  pub locality:      String,
  pub msisdn:        String,
  pub gender:        String,
  pub date_of_birth: String,
  pub sa_id_number:  String,
  pub reported_by:   String,
  pub created_at:    DateTime<Utc>,
}

impl Case {
  /// `"first last"`, or `"Unknown patient"` when neither name is known.
  pub fn patient_name(&self) -> String {
    let name = format!("{} {}", self.first_name, self.last_name);
    let name = name.trim();
    if name.is_empty() { "Unknown patient".to_owned() } else { name.to_owned() }
  }
}

/// A validated case ready to be persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewCase {
  pub facility_code: String,
  pub first_name:    String,
  pub last_name:     String,
  pub locality:      String,
  pub msisdn:        String,
  pub gender:        String,
  pub date_of_birth: String,
  pub sa_id_number:  String,
  pub reported_by:   String,
}

impl NewCase {
  pub fn new(facility_code: impl Into<String>) -> Self {
    Self { facility_code: facility_code.into(), ..Self::default() }
  }

  /// Validate a case submission; only `facility_code` is required and
  /// length-limited.
  pub fn from_payload(body: &Value) -> Result<Self, FieldErrors> {
    let mut v = Validator::new(body)?;
    let case = Self {
      facility_code: v.required_str("facility_code", SHORT),
      first_name:    v.optional_str("first_name"),
      last_name:     v.optional_str("last_name"),
      locality:      v.optional_str("locality"),
      msisdn:        v.optional_str("msisdn"),
      gender:        v.optional_str("gender"),
      date_of_birth: v.optional_str("date_of_birth"),
      sa_id_number:  v.optional_str("sa_id_number"),
      reported_by:   v.optional_str("reported_by"),
    };
    v.finish()?;
    Ok(case)
  }
}
