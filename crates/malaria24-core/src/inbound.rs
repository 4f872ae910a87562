//! Inbound SMS messages delivered by the SMS gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::validation::{FieldErrors, Validator};

pub const MESSAGE_ID_MAX_LEN: usize = 255;

/// A stored inbound message. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundSms {
  pub id:         i64,
  pub message_id: String,
  #[serde(rename = "from")]
  pub sender:     String,
  #[serde(rename = "to")]
  pub recipient:  String,
  pub channel_id: String,
  pub timestamp:  Option<DateTime<Utc>>,
  pub content:    String,
  pub created_at: DateTime<Utc>,
}

/// A validated inbound message ready to be persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewInboundSms {
  pub message_id: String,
  pub sender:     String,
  pub recipient:  String,
  pub channel_id: String,
  pub timestamp:  Option<DateTime<Utc>>,
  pub content:    String,
}

impl NewInboundSms {
  /// Validate a gateway payload.
  ///
  /// Only `message_id` is required. `content`, `from`, `to` and
  /// `channel_id` default to empty strings; `channel_data`, `reply_to` and
  /// `group` are accepted and ignored.
  pub fn from_payload(body: &Value) -> Result<Self, FieldErrors> {
    let mut v = Validator::new(body)?;
    let message_id = v.required_str("message_id", MESSAGE_ID_MAX_LEN);
    let sender = v.optional_str("from");
    let recipient = v.optional_str("to");
    let channel_id = v.optional_str("channel_id");
    let timestamp = v.optional_datetime("timestamp");
    let content = v.optional_str("content");
    v.finish()?;

    Ok(Self { message_id, sender, recipient, channel_id, timestamp, content })
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn payload() -> Value {
    json!({
      "channel_data": {}, "from": "+27111111111",
      "channel_id": "test_channel",
      "timestamp": "2017-12-05 12:32:15.899992",
      "content": "test message", "to": "+27222222222",
      "reply_to": null, "group": null,
      "message_id": "c2c5a129da554bd2b799e391883d893d"
    })
  }

  #[test]
  fn full_payload_validates() {
    let sms = NewInboundSms::from_payload(&payload()).unwrap();
    assert_eq!(sms.sender, "+27111111111");
    assert_eq!(sms.recipient, "+27222222222");
    assert_eq!(sms.message_id, "c2c5a129da554bd2b799e391883d893d");
    assert_eq!(sms.content, "test message");
    assert!(sms.timestamp.is_some());
  }

  #[test]
  fn missing_content_becomes_empty() {
    let mut body = payload();
    body.as_object_mut().unwrap().remove("content");
    let sms = NewInboundSms::from_payload(&body).unwrap();
    assert_eq!(sms.content, "");
  }

  #[test]
  fn optional_fields_are_not_length_limited() {
    let mut body = payload();
    let map = body.as_object_mut().unwrap();
    map.insert("content".into(), json!("x".repeat(1001)));
    map.insert("from".into(), json!("y".repeat(300)));
    let sms = NewInboundSms::from_payload(&body).unwrap();
    assert_eq!(sms.content.len(), 1001);
    assert_eq!(sms.sender.len(), 300);
  }

  #[test]
  fn long_message_id_is_rejected() {
    let mut body = payload();
    body.as_object_mut().unwrap().insert("message_id".into(), json!("m".repeat(256)));
    let errors = NewInboundSms::from_payload(&body).unwrap_err();
    assert_eq!(
      errors.get("message_id").unwrap(),
      ["Ensure this field has no more than 255 characters.".to_string()]
    );
  }

  #[test]
  fn missing_message_id_is_the_only_error() {
    let mut body = payload();
    body.as_object_mut().unwrap().remove("message_id");
    let errors = NewInboundSms::from_payload(&body).unwrap_err();
    assert_eq!(
      serde_json::to_value(&errors).unwrap(),
      json!({ "message_id": ["This field is required."] })
    );
  }
}
