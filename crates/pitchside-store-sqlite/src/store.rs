//! [`SqliteStore`], the SQLite implementation of [`MatchStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use pitchside_core::{
  clock::Checkpoint,
  event::{Event, Score},
  period::PeriodSchedule,
  status::MatchStatus,
  store::{MatchRecord, MatchStore},
};

use crate::{
  encode::{
    encode_counter, encode_detail, encode_dt, encode_ms, encode_uuid, RawCheckpoint,
    RawEvent, RawMatch, RawPeriodRow,
  },
  schema::SCHEMA,
  Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A pitchside match store backed by a single SQLite file.
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

  /// Open an in-memory store, for tests.
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

  /// Run `f` against the match row, creating the row first if needed. Bumps
  /// `updated_at`.
  async fn touch_match<F>(&self, match_id: Uuid, f: F) -> Result<()>
  where
    F: FnOnce(&rusqlite::Transaction<'_>, &str) -> rusqlite::Result<()> + Send + 'static,
  {
    let id_str = encode_uuid(match_id);
    let now_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        ensure_match(&tx, &id_str, &now_str)?;
        f(&tx, &id_str)?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────

fn ensure_match(conn: &rusqlite::Connection, id: &str, now: &str) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO matches (match_id, updated_at) VALUES (?1, ?2)
     ON CONFLICT (match_id) DO UPDATE SET updated_at = excluded.updated_at",
    rusqlite::params![id, now],
  )?;
  Ok(())
}

fn read_match(
  conn: &rusqlite::Connection,
  id: &str,
) -> rusqlite::Result<Option<(RawMatch, Vec<RawPeriodRow>)>> {
  let raw = conn
    .query_row(
      "SELECT match_id, status, home_score, away_score, total_duration_minutes, updated_at
       FROM matches WHERE match_id = ?1",
      rusqlite::params![id],
      |row| {
        Ok(RawMatch {
          match_id:               row.get(0)?,
          status:                 row.get(1)?,
          home_score:             row.get(2)?,
          away_score:             row.get(3)?,
          total_duration_minutes: row.get(4)?,
          updated_at:             row.get(5)?,
        })
      },
    )
    .optional()?;

  let Some(raw) = raw else {
    return Ok(None);
  };

  let mut stmt = conn.prepare(
    "SELECT period_id, name, duration_minutes, order_index, is_break
     FROM periods WHERE match_id = ?1 ORDER BY order_index",
  )?;
  let periods = stmt
    .query_map(rusqlite::params![id], |row| {
      Ok(RawPeriodRow {
        period_id:        row.get(0)?,
        name:             row.get(1)?,
        duration_minutes: row.get(2)?,
        order_index:      row.get(3)?,
        is_break:         row.get(4)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  Ok(Some((raw, periods)))
}

// ─── MatchStore impl ─────────────────────────────────────────────────────────

impl MatchStore for SqliteStore {
  type Error = crate::Error;

  fn is_rejection(error: &crate::Error) -> bool {
    matches!(error, crate::Error::Core(_) | crate::Error::Validation(_))
  }

  // ── Match ─────────────────────────────────────────────────────────────────

  async fn load_match(&self, match_id: Uuid) -> Result<Option<MatchRecord>> {
    let id_str = encode_uuid(match_id);

    let raw = self
      .conn
      .call(move |conn| Ok(read_match(conn, &id_str)?))
      .await?;

    raw
      .map(|(m, periods)| m.into_record(periods))
      .transpose()
  }

  async fn save_periods(
    &self,
    match_id: Uuid,
    schedule: PeriodSchedule,
  ) -> Result<MatchRecord> {
    let id_str = encode_uuid(match_id);
    let now_str = encode_dt(Utc::now());
    let total = schedule.total_duration_minutes();
    let rows: Vec<(String, String, u32, u32, bool)> = schedule
      .periods()
      .iter()
      .map(|p| {
        (
          encode_uuid(p.period_id),
          p.name.clone(),
          p.duration_minutes,
          p.order_index,
          p.is_break,
        )
      })
      .collect();

    let (raw, periods) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        ensure_match(&tx, &id_str, &now_str)?;
        tx.execute(
          "DELETE FROM periods WHERE match_id = ?1",
          rusqlite::params![id_str],
        )?;
        {
          let mut insert = tx.prepare(
            "INSERT INTO periods (
               match_id, period_id, name, duration_minutes, order_index, is_break
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          )?;
          for (period_id, name, minutes, order, is_break) in &rows {
            insert.execute(rusqlite::params![id_str, period_id, name, minutes, order, is_break])?;
          }
        }
        tx.execute(
          "UPDATE matches SET total_duration_minutes = ?2 WHERE match_id = ?1",
          rusqlite::params![id_str, total],
        )?;
        let record = read_match(&tx, &id_str)?;
        tx.commit()?;
        record.ok_or_else(|| rusqlite::Error::QueryReturnedNoRows.into())
      })
      .await?;

    tracing::debug!(%match_id, total_duration_minutes = total, "saved period schedule");
    raw.into_record(periods)
  }

  async fn save_score(&self, match_id: Uuid, score: Score) -> Result<()> {
    self
      .touch_match(match_id, move |tx, id| {
        tx.execute(
          "UPDATE matches SET home_score = ?2, away_score = ?3 WHERE match_id = ?1",
          rusqlite::params![id, score.home, score.away],
        )?;
        Ok(())
      })
      .await
  }

  async fn save_status(&self, match_id: Uuid, status: MatchStatus) -> Result<()> {
    self
      .touch_match(match_id, move |tx, id| {
        tx.execute(
          "UPDATE matches SET status = ?2 WHERE match_id = ?1",
          rusqlite::params![id, status.as_str()],
        )?;
        Ok(())
      })
      .await
  }

  // ── Clock ─────────────────────────────────────────────────────────────────

  async fn load_checkpoint(&self, match_id: Uuid) -> Result<Option<Checkpoint>> {
    let id_str = encode_uuid(match_id);

    let raw: Option<RawCheckpoint> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT current_period_order, elapsed_in_period_ms, total_playing_ms,
                      last_updated_at, is_paused, finished, version
               FROM checkpoints WHERE match_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawCheckpoint {
                  current_period_order: row.get(0)?,
                  elapsed_in_period_ms: row.get(1)?,
                  total_playing_ms:     row.get(2)?,
                  last_updated_at:      row.get(3)?,
                  is_paused:            row.get(4)?,
                  finished:             row.get(5)?,
                  version:              row.get(6)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCheckpoint::into_checkpoint).transpose()
  }

  async fn save_checkpoint(&self, match_id: Uuid, checkpoint: Checkpoint) -> Result<()> {
    let order      = checkpoint.current_period_order;
    let elapsed    = encode_ms(checkpoint.elapsed_in_period_ms);
    let total      = encode_ms(checkpoint.total_playing_ms);
    let updated_at = encode_dt(checkpoint.last_updated_at);
    let paused     = checkpoint.is_paused;
    let finished   = checkpoint.finished;
    let version    = encode_counter(checkpoint.version);

    self
      .touch_match(match_id, move |tx, id| {
        tx.execute(
          "INSERT INTO checkpoints (
             match_id, current_period_order, elapsed_in_period_ms, total_playing_ms,
             last_updated_at, is_paused, finished, version
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
           ON CONFLICT (match_id) DO UPDATE SET
             current_period_order = excluded.current_period_order,
             elapsed_in_period_ms = excluded.elapsed_in_period_ms,
             total_playing_ms     = excluded.total_playing_ms,
             last_updated_at      = excluded.last_updated_at,
             is_paused            = excluded.is_paused,
             finished             = excluded.finished,
             version              = excluded.version",
          rusqlite::params![id, order, elapsed, total, updated_at, paused, finished, version],
        )?;
        Ok(())
      })
      .await
  }

  async fn clear_checkpoint(&self, match_id: Uuid) -> Result<()> {
    let id_str = encode_uuid(match_id);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM checkpoints WHERE match_id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Events ────────────────────────────────────────────────────────────────

  async fn append_event(&self, event: Event) -> Result<()> {
    let event_id    = encode_uuid(event.event_id);
    let sequence    = encode_counter(event.sequence);
    let kind        = event.kind.as_str();
    let minute      = event.minute;
    let team        = event.team.map(|s| s.as_str());
    let player_id   = event.player_id;
    let player_name = event.player_name;
    let description = event.description;
    let detail      = encode_detail(&event.additional_info)?;
    let recorded_at = encode_dt(event.recorded_at);

    self
      .touch_match(event.match_id, move |tx, id| {
        let inserted = tx.execute(
          "INSERT OR IGNORE INTO events (
             event_id, match_id, sequence, kind, minute, team,
             player_id, player_name, description, additional_info, recorded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
          rusqlite::params![
            event_id,
            id,
            sequence,
            kind,
            minute,
            team,
            player_id,
            player_name,
            description,
            detail,
            recorded_at
          ],
        )?;
        if inserted == 0 {
          tracing::debug!(%event_id, "event already stored; ignoring duplicate");
        }
        Ok(())
      })
      .await
  }

  async fn list_events(&self, match_id: Uuid) -> Result<Vec<Event>> {
    let id_str = encode_uuid(match_id);

    let raws: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM events WHERE match_id = ?1 ORDER BY minute, sequence",
          RawEvent::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawEvent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }

  async fn clear_events(&self, match_id: Uuid) -> Result<()> {
    let id_str = encode_uuid(match_id);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM events WHERE match_id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
