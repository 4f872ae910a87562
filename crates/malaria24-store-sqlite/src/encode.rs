//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings in UTC
//! (microsecond precision, `Z` suffix) so that lexical order matches
//! chronological order. Enums are stored as their lowercase names.

use chrono::{DateTime, SecondsFormat, Utc};
use malaria24_core::{
  actor::{Actor, DigestKind, Role},
  case::Case,
  inbound::InboundSms,
  user::User,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

/// The strum lowercase name, shared with the JSON representation.
pub fn encode_role(role: Role) -> &'static str { role.into() }

pub fn encode_digest_kind(kind: DigestKind) -> &'static str { kind.into() }

// ─── Row types ───────────────────────────────────────────────────────────────

pub const INBOUND_COLUMNS: &str =
  "id, message_id, sender, recipient, channel_id, timestamp, content, created_at";

/// Raw values read directly from an `inbound_sms` row.
pub struct RawInbound {
  pub id:         i64,
  pub message_id: String,
  pub sender:     String,
  pub recipient:  String,
  pub channel_id: String,
  pub timestamp:  Option<String>,
  pub content:    String,
  pub created_at: String,
}

impl RawInbound {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      message_id: row.get(1)?,
      sender:     row.get(2)?,
      recipient:  row.get(3)?,
      channel_id: row.get(4)?,
      timestamp:  row.get(5)?,
      content:    row.get(6)?,
      created_at: row.get(7)?,
    })
  }

  pub fn into_inbound(self) -> Result<InboundSms> {
    Ok(InboundSms {
      id:         self.id,
      message_id: self.message_id,
      sender:     self.sender,
      recipient:  self.recipient,
      channel_id: self.channel_id,
      timestamp:  self.timestamp.as_deref().map(decode_dt).transpose()?,
      content:    self.content,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub const USER_COLUMNS: &str = "id, username, email, password_hash, is_staff";

pub fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
  Ok(User {
    id:            row.get(0)?,
    username:      row.get(1)?,
    email:         row.get(2)?,
    password_hash: row.get(3)?,
    is_staff:      row.get(4)?,
  })
}

pub const ACTOR_COLUMNS: &str =
  "id, name, email, phone_number, role, district, province, facility_code";

/// Raw values read directly from an `actors` row.
pub struct RawActor {
  pub id:            i64,
  pub name:          String,
  pub email:         String,
  pub phone_number:  String,
  pub role:          String,
  pub district:      String,
  pub province:      String,
  pub facility_code: Option<String>,
}

impl RawActor {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      name:          row.get(1)?,
      email:         row.get(2)?,
      phone_number:  row.get(3)?,
      role:          row.get(4)?,
      district:      row.get(5)?,
      province:      row.get(6)?,
      facility_code: row.get(7)?,
    })
  }

  pub fn into_actor(self) -> Result<Actor> {
    Ok(Actor {
      id:            self.id,
      name:          self.name,
      email:         self.email,
      phone_number:  self.phone_number,
      role:          Role::parse(&self.role)?,
      district:      self.district,
      province:      self.province,
      facility_code: self.facility_code,
    })
  }
}

pub const CASE_COLUMNS: &str = "id, facility_code, first_name, last_name, locality, msisdn, \
                                gender, date_of_birth, sa_id_number, reported_by, created_at";

/// Raw values read directly from a `cases` row.
pub struct RawCase {
  pub case:       Case,
  pub created_at: String,
}

impl RawCase {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      case:       Case {
        id:            row.get(0)?,
        facility_code: row.get(1)?,
        first_name:    row.get(2)?,
        last_name:     row.get(3)?,
        locality:      row.get(4)?,
        msisdn:        row.get(5)?,
        gender:        row.get(6)?,
        date_of_birth: row.get(7)?,
        sa_id_number:  row.get(8)?,
        reported_by:   row.get(9)?,
        created_at:    DateTime::<Utc>::MIN_UTC,
      },
      created_at: row.get(10)?,
    })
  }

  pub fn into_case(self) -> Result<Case> {
    Ok(Case { created_at: decode_dt(&self.created_at)?, ..self.case })
  }
}
