//! SQL schema for the pitchside SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS matches (
    match_id               TEXT PRIMARY KEY,
    status                 TEXT NOT NULL DEFAULT 'scheduled',
    home_score             INTEGER NOT NULL DEFAULT 0,
    away_score             INTEGER NOT NULL DEFAULT 0,
    total_duration_minutes INTEGER NOT NULL DEFAULT 0,
    updated_at             TEXT NOT NULL
);

-- Replaced wholesale on every schedule save.
CREATE TABLE IF NOT EXISTS periods (
    match_id         TEXT NOT NULL REFERENCES matches(match_id),
    period_id        TEXT NOT NULL,
    name             TEXT NOT NULL,
    duration_minutes INTEGER NOT NULL,
    order_index      INTEGER NOT NULL,
    is_break         INTEGER NOT NULL,
    PRIMARY KEY (match_id, period_id),
    UNIQUE (match_id, order_index)
);

-- One row per match; last writer wins.
CREATE TABLE IF NOT EXISTS checkpoints (
    match_id             TEXT PRIMARY KEY REFERENCES matches(match_id),
    current_period_order INTEGER NOT NULL,
    elapsed_in_period_ms INTEGER NOT NULL,
    total_playing_ms     INTEGER NOT NULL,
    last_updated_at      TEXT NOT NULL,   -- ISO 8601 UTC
    is_paused            INTEGER NOT NULL,
    finished             INTEGER NOT NULL DEFAULT 0,
    version              INTEGER NOT NULL DEFAULT 0
);

-- Events are append-only; rows are deleted only by a full match reset.
CREATE TABLE IF NOT EXISTS events (
    event_id        TEXT PRIMARY KEY,
    match_id        TEXT NOT NULL REFERENCES matches(match_id),
    sequence        INTEGER NOT NULL,
    kind            TEXT NOT NULL,   -- EventKind discriminant
    minute          REAL NOT NULL,
    team            TEXT,            -- 'home' | 'away' | NULL
    player_id       TEXT,
    player_name     TEXT,
    description     TEXT NOT NULL,
    additional_info TEXT NOT NULL DEFAULT '{\"type\":\"none\"}',
    recorded_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS periods_match_idx ON periods(match_id);
CREATE INDEX IF NOT EXISTS events_match_idx  ON events(match_id, minute, sequence);

PRAGMA user_version = 1;
";
