//! [`SqliteStore`]: the SQLite implementation of [`MalariaStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;

use malaria24_core::{
  actor::{Actor, Digest, DigestKind, NewActor},
  case::{Case, NewCase},
  facility::{Facility, NewFacility, Upsert},
  inbound::{InboundSms, NewInboundSms},
  store::MalariaStore,
  user::{NewUser, User},
};

use crate::{
  encode::{
    encode_digest_kind, encode_dt, encode_role, user_from_row, RawActor, RawCase, RawInbound,
    ACTOR_COLUMNS, CASE_COLUMNS, INBOUND_COLUMNS, USER_COLUMNS,
  },
  schema::SCHEMA,
  Error, Result,
};

const FACILITY_COLUMNS: &str =
  "id, facility_code, facility_name, district, subdistrict, province, phase";

fn facility_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Facility> {
  Ok(Facility {
    id:            row.get(0)?,
    facility_code: row.get(1)?,
    facility_name: row.get(2)?,
    district:      row.get(3)?,
    subdistrict:   row.get(4)?,
    province:      row.get(5)?,
    phase:         row.get(6)?,
  })
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Malaria24 store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── MalariaStore impl ───────────────────────────────────────────────────────

impl MalariaStore for SqliteStore {
  type Error = Error;

  // ── Facilities ────────────────────────────────────────────────────────────

  async fn get_facility(&self, facility_code: &str) -> Result<Option<Facility>> {
    let code = facility_code.to_owned();

    let facility = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {FACILITY_COLUMNS} FROM facilities WHERE facility_code = ?1"),
            rusqlite::params![code],
            facility_from_row,
          )
          .optional()?)
      })
      .await?;

    Ok(facility)
  }

  async fn list_facilities(&self) -> Result<Vec<Facility>> {
    let facilities = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {FACILITY_COLUMNS} FROM facilities ORDER BY facility_code"
        ))?;
        let rows = stmt
          .query_map([], facility_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(facilities)
  }

  async fn upsert_facility(&self, input: NewFacility) -> Result<(Facility, Upsert)> {
    let row = input.clone();

    let (id, outcome) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let existing: Option<i64> = tx
          .query_row(
            "SELECT id FROM facilities WHERE facility_code = ?1",
            rusqlite::params![row.facility_code],
            |r| r.get(0),
          )
          .optional()?;

        let result = match existing {
          Some(id) => {
            tx.execute(
              "UPDATE facilities
               SET facility_name = ?2, district = ?3, subdistrict = ?4,
                   province = ?5, phase = ?6
               WHERE id = ?1",
              rusqlite::params![
                id,
                row.facility_name,
                row.district,
                row.subdistrict,
                row.province,
                row.phase,
              ],
            )?;
            (id, Upsert::Updated)
          }
          None => {
            tx.execute(
              "INSERT INTO facilities (
                 facility_code, facility_name, district, subdistrict, province, phase
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
              rusqlite::params![
                row.facility_code,
                row.facility_name,
                row.district,
                row.subdistrict,
                row.province,
                row.phase,
              ],
            )?;
            (tx.last_insert_rowid(), Upsert::Created)
          }
        };

        tx.commit()?;
        Ok(result)
      })
      .await?;

    let facility = Facility {
      id,
      facility_code: input.facility_code,
      facility_name: input.facility_name,
      district:      input.district,
      subdistrict:   input.subdistrict,
      province:      input.province,
      phase:         input.phase,
    };

    Ok((facility, outcome))
  }

  async fn wipe_facilities(&self) -> Result<u64> {
    let removed = self
      .conn
      .call(|conn| Ok(conn.execute("DELETE FROM facilities", [])?))
      .await?;

    tracing::debug!(removed, "wiped facilities");
    Ok(removed as u64)
  }

  async fn localities(&self, facility_code: &str) -> Result<Option<Vec<String>>> {
    let code = facility_code.to_owned();

    let names = self
      .conn
      .call(move |conn| {
        let district: Option<String> = conn
          .query_row(
            "SELECT district FROM facilities WHERE facility_code = ?1",
            rusqlite::params![code],
            |r| r.get(0),
          )
          .optional()?;

        let Some(district) = district else {
          return Ok(None);
        };

        let mut stmt = conn.prepare(
          "SELECT DISTINCT subdistrict FROM facilities
           WHERE district = ?1 AND subdistrict != ''
           ORDER BY subdistrict",
        )?;
        let names = stmt
          .query_map(rusqlite::params![district], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(Some(names))
      })
      .await?;

    Ok(names)
  }

  // ── Inbound SMS ───────────────────────────────────────────────────────────

  async fn record_inbound(&self, input: NewInboundSms) -> Result<InboundSms> {
    let created_at = Utc::now();
    let row = input.clone();
    let timestamp_str = input.timestamp.map(encode_dt);
    let created_at_str = encode_dt(created_at);

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO inbound_sms (
             message_id, sender, recipient, channel_id, timestamp, content, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            row.message_id,
            row.sender,
            row.recipient,
            row.channel_id,
            timestamp_str,
            row.content,
            created_at_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(InboundSms {
      id,
      message_id: input.message_id,
      sender: input.sender,
      recipient: input.recipient,
      channel_id: input.channel_id,
      timestamp: input.timestamp,
      content: input.content,
      created_at,
    })
  }

  async fn list_inbound(&self) -> Result<Vec<InboundSms>> {
    let raws = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare(&format!("SELECT {INBOUND_COLUMNS} FROM inbound_sms ORDER BY id"))?;
        let rows = stmt
          .query_map([], RawInbound::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawInbound::into_inbound).collect()
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn add_user(&self, input: NewUser) -> Result<User> {
    let row = input.clone();

    let id = self
      .conn
      .call(move |conn| {
        let taken: bool = conn
          .query_row(
            "SELECT 1 FROM users WHERE username = ?1",
            rusqlite::params![row.username],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        if taken {
          return Ok(None);
        }

        conn.execute(
          "INSERT INTO users (username, email, password_hash, is_staff)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![row.username, row.email, row.password_hash, row.is_staff],
        )?;
        Ok(Some(conn.last_insert_rowid()))
      })
      .await?
      .ok_or_else(|| Error::UsernameTaken(input.username.clone()))?;

    Ok(User {
      id,
      username: input.username,
      email: input.email,
      password_hash: input.password_hash,
      is_staff: input.is_staff,
    })
  }

  async fn find_user(&self, username: &str) -> Result<Option<User>> {
    let username = username.to_owned();

    let user = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
            rusqlite::params![username],
            user_from_row,
          )
          .optional()?)
      })
      .await?;

    Ok(user)
  }

  // ── Actors and digests ────────────────────────────────────────────────────

  async fn upsert_actor(&self, input: NewActor) -> Result<Actor> {
    let row = input.clone();
    let role_str = encode_role(input.role);

    let id = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "INSERT INTO actors (
             name, email, phone_number, role, district, province, facility_code
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
           ON CONFLICT (email) DO UPDATE SET
             name          = excluded.name,
             phone_number  = excluded.phone_number,
             role          = excluded.role,
             district      = excluded.district,
             province      = excluded.province,
             facility_code = excluded.facility_code
           RETURNING id",
          rusqlite::params![
            row.name,
            row.email,
            row.phone_number,
            role_str,
            row.district,
            row.province,
            row.facility_code,
          ],
          |r| r.get::<_, i64>(0),
        )?)
      })
      .await?;

    Ok(Actor {
      id,
      name: input.name,
      email: input.email,
      phone_number: input.phone_number,
      role: input.role,
      district: input.district,
      province: input.province,
      facility_code: input.facility_code,
    })
  }

  async fn list_actors(&self) -> Result<Vec<Actor>> {
    let raws = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!("SELECT {ACTOR_COLUMNS} FROM actors ORDER BY id"))?;
        let rows = stmt
          .query_map([], RawActor::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawActor::into_actor).collect()
  }

  async fn create_digest(&self, kind: DigestKind, recipients: Vec<i64>) -> Result<Digest> {
    let created_at = Utc::now();
    let created_at_str = encode_dt(created_at);
    let kind_str = encode_digest_kind(kind);

    let mut recipients = recipients;
    recipients.sort_unstable();
    recipients.dedup();
    let actor_ids = recipients.clone();

    // Inner `Err` carries the first actor id that does not exist.
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        for actor_id in &actor_ids {
          let exists = tx
            .query_row(
              "SELECT 1 FROM actors WHERE id = ?1",
              rusqlite::params![actor_id],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
          if !exists {
            return Ok(Err(*actor_id));
          }
        }

        tx.execute(
          "INSERT INTO digests (kind, created_at) VALUES (?1, ?2)",
          rusqlite::params![kind_str, created_at_str],
        )?;
        let digest_id = tx.last_insert_rowid();

        for actor_id in &actor_ids {
          tx.execute(
            "INSERT INTO digest_recipients (digest_id, actor_id) VALUES (?1, ?2)",
            rusqlite::params![digest_id, actor_id],
          )?;
        }

        tx.commit()?;
        Ok(Ok(digest_id))
      })
      .await?;

    let id = outcome.map_err(Error::ActorNotFound)?;
    Ok(Digest { id, kind, created_at, recipients })
  }

  async fn digest_recipients(&self, kind: DigestKind) -> Result<Vec<Actor>> {
    let kind_str = encode_digest_kind(kind);

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT
             a.id, a.name, a.email, a.phone_number, a.role,
             a.district, a.province, a.facility_code
           FROM actors a
           JOIN digest_recipients dr ON dr.actor_id = a.id
           JOIN digests d            ON d.id        = dr.digest_id
           WHERE d.kind = ?1
           ORDER BY a.id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![kind_str], RawActor::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawActor::into_actor).collect()
  }

  // ── Cases ─────────────────────────────────────────────────────────────────

  async fn create_case(&self, input: NewCase) -> Result<Case> {
    let created_at = Utc::now();
    let created_at_str = encode_dt(created_at);
    let row = input.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO cases (
             facility_code, first_name, last_name, locality, msisdn,
             gender, date_of_birth, sa_id_number, reported_by, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
          rusqlite::params![
            row.facility_code,
            row.first_name,
            row.last_name,
            row.locality,
            row.msisdn,
            row.gender,
            row.date_of_birth,
            row.sa_id_number,
            row.reported_by,
            created_at_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Case {
      id,
      facility_code: input.facility_code,
      first_name: input.first_name,
      last_name: input.last_name,
      locality: input.locality,
      msisdn: input.msisdn,
      gender: input.gender,
      date_of_birth: input.date_of_birth,
      sa_id_number: input.sa_id_number,
      reported_by: input.reported_by,
      created_at,
    })
  }

  async fn get_case(&self, id: i64) -> Result<Option<Case>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {CASE_COLUMNS} FROM cases WHERE id = ?1"),
            rusqlite::params![id],
            RawCase::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawCase::into_case).transpose()
  }

  async fn cases_since(&self, since: DateTime<Utc>) -> Result<Vec<Case>> {
    let since_str = encode_dt(since);

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CASE_COLUMNS} FROM cases WHERE created_at >= ?1 ORDER BY created_at, id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![since_str], RawCase::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCase::into_case).collect()
  }
}
