//! SQL schema for the Malaria24 SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Every table keyed by an integer uses `AUTOINCREMENT` so ids are never
/// reused after a delete; a wiped-and-reloaded facility gets a new id.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS facilities (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    facility_code TEXT NOT NULL UNIQUE,
    facility_name TEXT NOT NULL DEFAULT '',
    district      TEXT NOT NULL DEFAULT '',
    subdistrict   TEXT NOT NULL DEFAULT '',
    province      TEXT NOT NULL DEFAULT '',
    phase         TEXT NOT NULL DEFAULT ''
);

-- Written once per gateway delivery; never updated.
CREATE TABLE IF NOT EXISTS inbound_sms (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    message_id TEXT NOT NULL,
    sender     TEXT NOT NULL DEFAULT '',
    recipient  TEXT NOT NULL DEFAULT '',
    channel_id TEXT NOT NULL DEFAULT '',
    timestamp  TEXT,              -- RFC 3339 UTC, as sent by the gateway
    content    TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL      -- RFC 3339 UTC; server-assigned
);

CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    username      TEXT NOT NULL UNIQUE,
    email         TEXT NOT NULL,
    password_hash TEXT NOT NULL,  -- argon2 PHC string
    is_staff      INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS actors (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    name          TEXT NOT NULL,
    email         TEXT NOT NULL UNIQUE,
    phone_number  TEXT NOT NULL DEFAULT '',
    role          TEXT NOT NULL,  -- 'ehp' | 'cdc' | 'mis' | 'manager'
    district      TEXT NOT NULL DEFAULT '',
    province      TEXT NOT NULL DEFAULT '',
    facility_code TEXT
);

CREATE TABLE IF NOT EXISTS digests (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    kind       TEXT NOT NULL,     -- 'district' | 'provincial' | 'national'
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS digest_recipients (
    digest_id INTEGER NOT NULL REFERENCES digests(id) ON DELETE CASCADE,
    actor_id  INTEGER NOT NULL REFERENCES actors(id)  ON DELETE CASCADE,
    PRIMARY KEY (digest_id, actor_id)
);

-- facility_code is not a foreign key: cases may name codes that have not been
-- imported yet, and a facility wipe leaves cases untouched.
CREATE TABLE IF NOT EXISTS cases (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    facility_code TEXT NOT NULL,
    first_name    TEXT NOT NULL DEFAULT '',
    last_name     TEXT NOT NULL DEFAULT '',
    locality      TEXT NOT NULL DEFAULT '',
    msisdn        TEXT NOT NULL DEFAULT '',
    gender        TEXT NOT NULL DEFAULT '',
    date_of_birth TEXT NOT NULL DEFAULT '',
    sa_id_number  TEXT NOT NULL DEFAULT '',
    reported_by   TEXT NOT NULL DEFAULT '',
    created_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS facilities_district_idx ON facilities(district);
CREATE INDEX IF NOT EXISTS actors_role_idx         ON actors(role);
CREATE INDEX IF NOT EXISTS digests_kind_idx        ON digests(kind);
CREATE INDEX IF NOT EXISTS cases_created_idx       ON cases(created_at);

PRAGMA user_version = 1;
";
