//! Recent focus sessions.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fg_db::{Database, SessionLogRecord};
use serde::Serialize;

use super::util::format_clock;

/// JSON shape of one history entry.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryEntry<'a> {
    id: &'a str,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    requested_seconds: u64,
    elapsed_seconds: u64,
    completed: bool,
    coins_earned: u64,
}

impl<'a> From<&'a SessionLogRecord> for HistoryEntry<'a> {
    fn from(record: &'a SessionLogRecord) -> Self {
        Self {
            id: &record.id,
            started_at: record.started_at,
            ended_at: record.ended_at,
            requested_seconds: record.requested_secs,
            elapsed_seconds: record.elapsed_secs,
            completed: record.completed,
            coins_earned: record.coins_earned,
        }
    }
}

pub fn run<W: Write>(writer: &mut W, db: &Database, limit: usize, json: bool) -> Result<()> {
    let sessions = db
        .list_session_logs(limit)
        .context("failed to load session history")?;
    render(writer, &sessions, json)
}

fn render<W: Write>(writer: &mut W, sessions: &[SessionLogRecord], json: bool) -> Result<()> {
    if json {
        let entries: Vec<HistoryEntry<'_>> = sessions.iter().map(HistoryEntry::from).collect();
        serde_json::to_writer_pretty(&mut *writer, &entries)?;
        writeln!(writer)?;
        return Ok(());
    }

    if sessions.is_empty() {
        writeln!(writer, "No focus sessions recorded.")?;
        return Ok(());
    }

    for session in sessions {
        let outcome = if session.completed {
            "completed"
        } else {
            "stopped"
        };
        writeln!(
            writer,
            "{}  {:>8} / {:<8} {:<9}  +{} coins",
            session.started_at.format("%Y-%m-%d %H:%M UTC"),
            format_clock(session.elapsed_secs),
            format_clock(session.requested_secs),
            outcome,
            session.coins_earned
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;
    use insta::assert_snapshot;

    fn record(start_hour: u32, elapsed: u64, completed: bool) -> SessionLogRecord {
        let started_at = Utc.with_ymd_and_hms(2026, 3, 2, start_hour, 0, 0).unwrap();
        let ended_at = started_at + chrono::Duration::seconds(i64::try_from(elapsed).unwrap());
        SessionLogRecord {
            id: format!("session-{start_hour}"),
            started_at,
            ended_at,
            requested_secs: 1500,
            elapsed_secs: elapsed,
            completed,
            coins_earned: if completed { elapsed / 60 } else { 0 },
        }
    }

    #[test]
    fn history_lists_sessions() {
        let sessions = vec![record(10, 1500, true), record(9, 312, false)];
        let mut output = Vec::new();
        render(&mut output, &sessions, false).unwrap();

        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        2026-03-02 10:00 UTC     25:00 / 25:00    completed  +25 coins
        2026-03-02 09:00 UTC     05:12 / 25:00    stopped    +0 coins
        ");
    }

    #[test]
    fn empty_history() {
        let mut output = Vec::new();
        render(&mut output, &[], false).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "No focus sessions recorded.\n"
        );
    }

    #[test]
    fn history_json_round_trips_through_database() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_session_log(&record(8, 1500, true)).unwrap();

        let mut output = Vec::new();
        run(&mut output, &db, 10, true).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value[0]["id"], "session-8");
        assert_eq!(value[0]["completed"], true);
        assert_eq!(value[0]["coinsEarned"], 25);
        assert_eq!(value[0]["startedAt"], "2026-03-02T08:00:00Z");
    }
}
