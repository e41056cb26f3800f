//! SQL schema for the SmartGate SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS identities (
    subject_id     TEXT PRIMARY KEY,
    name           TEXT NOT NULL,
    email          TEXT NOT NULL,   -- trimmed, lower-cased
    role           TEXT NOT NULL,   -- 'admin' | 'staff'
    department     TEXT,
    position       TEXT,
    biometric_ref  TEXT,            -- opaque, owned by the recognition service
    password_hash  TEXT NOT NULL,   -- argon2 PHC string
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL,
    UNIQUE (email)
);

-- One row per subject per UTC calendar day. Rows are inserted once and
-- updated at most once (check-out); never deleted.
CREATE TABLE IF NOT EXISTS attendance (
    record_id      TEXT PRIMARY KEY,
    subject_id     TEXT NOT NULL REFERENCES identities(subject_id),
    display_name   TEXT NOT NULL,
    day            TEXT NOT NULL,   -- YYYY-MM-DD
    check_in       TEXT,            -- RFC 3339 UTC
    check_out      TEXT,            -- RFC 3339 UTC
    status         TEXT NOT NULL DEFAULT 'absent',
    working_hours  REAL,
    method         TEXT NOT NULL DEFAULT 'face-recognition',
    UNIQUE (subject_id, day),
    CHECK  (check_out IS NULL OR check_out >= check_in)
);

CREATE INDEX IF NOT EXISTS identities_role_idx ON identities(role);
CREATE INDEX IF NOT EXISTS attendance_day_idx  ON attendance(day);

PRAGMA user_version = 1;
";
