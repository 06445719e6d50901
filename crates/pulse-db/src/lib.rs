pub mod migrations;
pub mod models;
pub mod queries;

use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

pub use queries::requests::{NewBloodRequest, RequestFilter};
pub use queries::responses::{NewResponse, RecordOutcome};
pub use queries::sessions::{LoginOutcome, NewLogin, SessionLookup, hash_token};
pub use queries::users::ProfileChanges;

/// A single SQLite connection behind a mutex. Every write happens while the
/// lock is held, so a transaction opened through [`Database::with_conn_mut`]
/// is never interleaved with another writer from this process.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Fresh private database, used by tests and throwaway runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|e| anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }

    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock().map_err(|e| anyhow!("DB lock poisoned: {}", e))?;
        f(&mut conn)
    }
}

/// Timestamps are written as RFC 3339 in UTC with a fixed number of
/// fractional digits, so that string order in SQL matches time order.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Reads a stored timestamp back as UTC.
///
/// Values carrying an offset are converted to UTC. Values without one (as
/// produced by SQLite's `datetime('now')`) are UTC by construction and are
/// tagged as such rather than being interpreted in the local zone.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|ndt| ndt.and_utc())
        .map_err(|e| anyhow!("Corrupt timestamp '{}': {}", raw, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    #[test]
    fn naive_sqlite_timestamps_are_utc() {
        let ts = parse_timestamp("2024-03-01 10:00:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn offset_timestamps_are_normalised() {
        let ts = parse_timestamp("2024-03-01T15:30:00+05:30").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn formatted_timestamps_sort_chronologically() {
        let offset = FixedOffset::east_opt(9 * 3600).unwrap();
        let earlier = offset
            .with_ymd_and_hms(2024, 1, 1, 8, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        let later = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 1).unwrap();

        let (a, b) = (format_timestamp(earlier), format_timestamp(later));
        assert!(a < b, "{} should sort before {}", a, b);
        assert_eq!(parse_timestamp(&a).unwrap(), earlier);
    }

    #[test]
    fn garbage_timestamp_is_an_error() {
        assert!(parse_timestamp("yesterday").is_err());
    }
}
