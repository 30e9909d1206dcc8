//! Encoding and decoding helpers between domain types and the plain values
//! stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings and
//! event payloads compact JSON. Millisecond counters are stored as `INTEGER`
//! (signed 64-bit), which comfortably covers any match length.

use chrono::{DateTime, Utc};
use pitchside_core::{
  clock::Checkpoint,
  event::{Event, EventDetail, EventKind, Score, Side},
  period::Period,
  status::MatchStatus,
  store::MatchRecord,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_ms(ms: u64) -> i64 { i64::try_from(ms).unwrap_or(i64::MAX) }

pub fn decode_ms(v: i64) -> u64 { u64::try_from(v).unwrap_or(0) }

pub fn encode_counter(n: u64) -> i64 { encode_ms(n) }

pub fn decode_counter(v: i64) -> u64 { decode_ms(v) }

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_status(s: &str) -> Result<MatchStatus> {
  MatchStatus::parse(s).ok_or_else(|| Error::UnknownValue {
    column: "status",
    value:  s.to_owned(),
  })
}

pub fn decode_kind(s: &str) -> Result<EventKind> {
  EventKind::parse(s).ok_or_else(|| Error::UnknownValue {
    column: "kind",
    value:  s.to_owned(),
  })
}

pub fn decode_side(s: &str) -> Result<Side> {
  match s {
    "home" => Ok(Side::Home),
    "away" => Ok(Side::Away),
    other => Err(Error::UnknownValue {
      column: "team",
      value:  other.to_owned(),
    }),
  }
}

// ─── Payloads ────────────────────────────────────────────────────────────────

pub fn encode_detail(d: &EventDetail) -> Result<String> { Ok(serde_json::to_string(d)?) }

pub fn decode_detail(s: &str) -> Result<EventDetail> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `matches` row.
pub struct RawMatch {
  pub match_id:               String,
  pub status:                 String,
  pub home_score:             u32,
  pub away_score:             u32,
  pub total_duration_minutes: u32,
  pub updated_at:             String,
}

impl RawMatch {
  pub fn into_record(self, periods: Vec<RawPeriodRow>) -> Result<MatchRecord> {
    let periods = periods
      .into_iter()
      .map(RawPeriodRow::into_period)
      .collect::<Result<Vec<_>>>()?;
    Ok(MatchRecord {
      match_id: decode_uuid(&self.match_id)?,
      status: decode_status(&self.status)?,
      periods,
      total_duration_minutes: self.total_duration_minutes,
      score: Score {
        home: self.home_score,
        away: self.away_score,
      },
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read directly from a `periods` row.
pub struct RawPeriodRow {
  pub period_id:        String,
  pub name:             String,
  pub duration_minutes: u32,
  pub order_index:      u32,
  pub is_break:         bool,
}

impl RawPeriodRow {
  pub fn into_period(self) -> Result<Period> {
    Ok(Period {
      period_id:        decode_uuid(&self.period_id)?,
      name:             self.name,
      duration_minutes: self.duration_minutes,
      order_index:      self.order_index,
      is_break:         self.is_break,
    })
  }
}

/// Raw values read directly from a `checkpoints` row.
pub struct RawCheckpoint {
  pub current_period_order: u32,
  pub elapsed_in_period_ms: i64,
  pub total_playing_ms:     i64,
  pub last_updated_at:      String,
  pub is_paused:            bool,
  pub finished:             bool,
  pub version:              i64,
}

impl RawCheckpoint {
  pub fn into_checkpoint(self) -> Result<Checkpoint> {
    Ok(Checkpoint {
      current_period_order: self.current_period_order,
      elapsed_in_period_ms: decode_ms(self.elapsed_in_period_ms),
      total_playing_ms:     decode_ms(self.total_playing_ms),
      last_updated_at:      decode_dt(&self.last_updated_at)?,
      is_paused:            self.is_paused,
      finished:             self.finished,
      version:              decode_counter(self.version),
    })
  }
}

/// Raw values read directly from an `events` row.
pub struct RawEvent {
  pub event_id:        String,
  pub match_id:        String,
  pub sequence:        i64,
  pub kind:            String,
  pub minute:          f64,
  pub team:            Option<String>,
  pub player_id:       Option<String>,
  pub player_name:     Option<String>,
  pub description:     String,
  pub additional_info: String,
  pub recorded_at:     String,
}

impl RawEvent {
  pub const COLUMNS: &'static str = "event_id, match_id, sequence, kind, minute, team, \
                                     player_id, player_name, description, additional_info, \
                                     recorded_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:        row.get(0)?,
      match_id:        row.get(1)?,
      sequence:        row.get(2)?,
      kind:            row.get(3)?,
      minute:          row.get(4)?,
      team:            row.get(5)?,
      player_id:       row.get(6)?,
      player_name:     row.get(7)?,
      description:     row.get(8)?,
      additional_info: row.get(9)?,
      recorded_at:     row.get(10)?,
    })
  }

  pub fn into_event(self) -> Result<Event> {
    Ok(Event {
      event_id:        decode_uuid(&self.event_id)?,
      match_id:        decode_uuid(&self.match_id)?,
      kind:            decode_kind(&self.kind)?,
      minute:          self.minute,
      team:            self.team.as_deref().map(decode_side).transpose()?,
      player_id:       self.player_id,
      player_name:     self.player_name,
      description:     self.description,
      additional_info: decode_detail(&self.additional_info)?,
      sequence:        decode_counter(self.sequence),
      recorded_at:     decode_dt(&self.recorded_at)?,
    })
  }
}
