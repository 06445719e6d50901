use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::models::{SESSION_COLUMNS, SessionRow, UserRow};
use crate::queries::users::upsert_user;
use crate::{Database, format_timestamp, parse_timestamp};

/// Sessions are keyed by the SHA-256 of the token so a leaked database does
/// not leak usable cookies.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[derive(Debug)]
pub enum SessionLookup {
    Active(SessionRow),
    /// The row existed but had expired; it has been deleted.
    Expired,
    Missing,
}

/// A verified provider login, ready to be stored.
pub struct NewLogin<'a> {
    /// Used only if `subject` has never logged in before.
    pub new_user_id: &'a str,
    pub subject: &'a str,
    pub email: &'a str,
    pub name: &'a str,
    pub picture: Option<&'a str>,
    pub token: &'a str,
    pub now: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub enum LoginOutcome {
    Recorded(UserRow),
    /// The token already maps to another user's session; nothing was written.
    TokenOwnedByOtherUser,
}

impl Database {
    /// Stores a session for `token`. Storing the same token again for the same
    /// user (a retried handshake) only refreshes its expiry. Returns false,
    /// writing nothing, if the token is already bound to a different user.
    pub fn upsert_session(
        &self,
        token: &str,
        user_id: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| write_session(conn, token, user_id, created_at, expires_at))
    }

    /// Completes a provider handshake: the user for `subject` and the session
    /// for `token` are written together or not at all.
    pub fn record_login(&self, login: &NewLogin<'_>) -> Result<LoginOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let user = upsert_user(
                &tx,
                login.new_user_id,
                login.subject,
                login.email,
                login.name,
                login.picture,
                &format_timestamp(login.now),
            )?;

            if !write_session(&tx, login.token, &user.id, login.now, login.expires_at)? {
                warn!("Session token for subject {} belongs to another user", login.subject);
                return Ok(LoginOutcome::TokenOwnedByOtherUser);
            }

            tx.commit()?;
            Ok(LoginOutcome::Recorded(user))
        })
    }

    /// Looks a token up against `now`. Both sides of the expiry comparison are
    /// UTC instants regardless of how the row was written.
    pub fn resolve_session(&self, token: &str, now: DateTime<Utc>) -> Result<SessionLookup> {
        let token_hash = hash_token(token);
        self.with_conn_mut(|conn| {
            let sql = format!("SELECT {} FROM sessions WHERE token_hash = ?1", SESSION_COLUMNS);
            let Some(row) = conn
                .query_row(&sql, [&token_hash], SessionRow::from_row)
                .optional()?
            else {
                return Ok(SessionLookup::Missing);
            };

            let expires_at = parse_timestamp(&row.expires_at)?;
            if now > expires_at {
                conn.execute("DELETE FROM sessions WHERE token_hash = ?1", [&token_hash])?;
                debug!("Session for user {} expired at {}", row.user_id, expires_at);
                return Ok(SessionLookup::Expired);
            }

            Ok(SessionLookup::Active(row))
        })
    }

    /// Returns true if a session was removed.
    pub fn delete_session(&self, token: &str) -> Result<bool> {
        let token_hash = hash_token(token);
        self.with_conn_mut(|conn| {
            let removed = conn.execute("DELETE FROM sessions WHERE token_hash = ?1", [&token_hash])?;
            Ok(removed > 0)
        })
    }

    /// Removes every session that expired before `now`.
    pub fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let expired: Vec<String> = {
                let mut stmt = tx.prepare("SELECT token_hash, expires_at FROM sessions")?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows.into_iter()
                    .filter(|(hash, raw)| match parse_timestamp(raw) {
                        Ok(expires_at) => now > expires_at,
                        Err(e) => {
                            warn!("Dropping session {} with unreadable expiry: {}", hash, e);
                            true
                        }
                    })
                    .map(|(hash, _)| hash)
                    .collect()
            };

            for hash in &expired {
                tx.execute("DELETE FROM sessions WHERE token_hash = ?1", [hash])?;
            }
            tx.commit()?;
            Ok(expired.len())
        })
    }
}

fn write_session(
    conn: &Connection,
    token: &str,
    user_id: &str,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Result<bool> {
    let written = conn.execute(
        "INSERT INTO sessions (token_hash, user_id, created_at, expires_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(token_hash) DO UPDATE SET expires_at = excluded.expires_at
         WHERE sessions.user_id = excluded.user_id",
        params![
            hash_token(token),
            user_id,
            format_timestamp(created_at),
            format_timestamp(expires_at),
        ],
    )?;
    Ok(written == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::{new_db, seed_user};
    use chrono::{Duration, FixedOffset, TimeZone};
    use rstest::rstest;

    fn base_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn fresh_session_resolves_to_its_user() {
        let db = new_db();
        let user = seed_user(&db, "sub-1");
        let now = base_instant();
        db.upsert_session("tok", &user.id, now, now + Duration::days(7)).unwrap();

        match db.resolve_session("tok", now + Duration::days(6)).unwrap() {
            SessionLookup::Active(row) => assert_eq!(row.user_id, user.id),
            other => panic!("expected active session, got {:?}", other),
        }
    }

    #[test]
    fn token_is_not_stored_in_clear() {
        let db = new_db();
        let user = seed_user(&db, "sub-1");
        let now = base_instant();
        db.upsert_session("secret-token", &user.id, now, now + Duration::days(1)).unwrap();

        let stored: String = db
            .with_conn(|conn| Ok(conn.query_row("SELECT token_hash FROM sessions", [], |r| r.get(0))?))
            .unwrap();
        assert_ne!(stored, "secret-token");
        assert_eq!(stored, hash_token("secret-token"));
    }

    #[test]
    fn expired_session_is_deleted_on_lookup() {
        let db = new_db();
        let user = seed_user(&db, "sub-1");
        let now = base_instant();
        db.upsert_session("tok", &user.id, now, now + Duration::hours(1)).unwrap();

        let later = now + Duration::hours(2);
        assert!(matches!(db.resolve_session("tok", later).unwrap(), SessionLookup::Expired));
        assert!(matches!(db.resolve_session("tok", now).unwrap(), SessionLookup::Missing));
    }

    #[test]
    fn retried_handshake_refreshes_expiry() {
        let db = new_db();
        let user = seed_user(&db, "sub-1");
        let now = base_instant();
        db.upsert_session("tok", &user.id, now, now + Duration::hours(1)).unwrap();
        db.upsert_session("tok", &user.id, now, now + Duration::days(7)).unwrap();

        let later = now + Duration::days(2);
        assert!(matches!(db.resolve_session("tok", later).unwrap(), SessionLookup::Active(_)));
    }

    #[test]
    fn token_of_another_user_is_not_taken_over() {
        let db = new_db();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");
        let now = base_instant();
        assert!(db.upsert_session("shared", &alice.id, now, now + Duration::days(7)).unwrap());

        assert!(!db.upsert_session("shared", &bob.id, now, now + Duration::days(30)).unwrap());
        match db.resolve_session("shared", now + Duration::days(8)).unwrap() {
            SessionLookup::Expired => {}
            other => panic!("expiry must be untouched, got {:?}", other),
        }
    }

    fn login<'a>(subject: &'a str, new_user_id: &'a str, token: &'a str) -> NewLogin<'a> {
        let now = base_instant();
        NewLogin {
            new_user_id,
            subject,
            email: "someone@example.com",
            name: "Someone",
            picture: None,
            token,
            now,
            expires_at: now + Duration::days(7),
        }
    }

    #[test]
    fn record_login_writes_user_and_session_together() {
        let db = new_db();
        let user = match db.record_login(&login("alice", "u-alice", "tok-a")).unwrap() {
            LoginOutcome::Recorded(user) => user,
            other => panic!("expected recorded login, got {:?}", other),
        };
        assert_eq!(user.id, "u-alice");

        match db.resolve_session("tok-a", base_instant()).unwrap() {
            SessionLookup::Active(row) => assert_eq!(row.user_id, "u-alice"),
            other => panic!("expected active session, got {:?}", other),
        }
    }

    #[test]
    fn record_login_with_foreign_token_writes_nothing() {
        let db = new_db();
        db.record_login(&login("alice", "u-alice", "tok-a")).unwrap();

        assert!(matches!(
            db.record_login(&login("bob", "u-bob", "tok-a")).unwrap(),
            LoginOutcome::TokenOwnedByOtherUser
        ));
        assert!(db.get_user_by_id("u-bob").unwrap().is_none());
        match db.resolve_session("tok-a", base_instant()).unwrap() {
            SessionLookup::Active(row) => assert_eq!(row.user_id, "u-alice"),
            other => panic!("expected alice's session, got {:?}", other),
        }
    }

    #[test]
    fn deleted_session_no_longer_resolves() {
        let db = new_db();
        let user = seed_user(&db, "sub-1");
        let now = base_instant();
        db.upsert_session("tok", &user.id, now, now + Duration::days(7)).unwrap();

        assert!(db.delete_session("tok").unwrap());
        assert!(!db.delete_session("tok").unwrap());
        assert!(matches!(db.resolve_session("tok", now).unwrap(), SessionLookup::Missing));
    }

    #[test]
    fn purge_removes_only_expired_sessions() {
        let db = new_db();
        let user = seed_user(&db, "sub-1");
        let now = base_instant();
        db.upsert_session("old", &user.id, now, now - Duration::minutes(1)).unwrap();
        db.upsert_session("new", &user.id, now, now + Duration::minutes(1)).unwrap();

        assert_eq!(db.delete_expired_sessions(now).unwrap(), 1);
        assert!(matches!(db.resolve_session("new", now).unwrap(), SessionLookup::Active(_)));
    }

    /// Whatever zone the expiry was written in and whatever zone the clock
    /// reading came from, a session is live exactly until its expiry instant.
    #[rstest]
    fn expiry_holds_across_time_zones(
        #[values(-12, -8, -3, 0, 1, 5, 9, 14)] stored_offset_hours: i32,
        #[values(-11, -5, 0, 3, 8, 13)] clock_offset_hours: i32,
        #[values(-86_400, -3_600, -1, 1, 3_600, 86_400)] seconds_until_expiry: i64,
        #[values(true, false)] stored_with_offset: bool,
    ) {
        let db = new_db();
        let user = seed_user(&db, "sub-tz");

        let now_utc = base_instant();
        let expires_utc = now_utc + Duration::seconds(seconds_until_expiry);

        let stored_zone = FixedOffset::east_opt(stored_offset_hours * 3600).unwrap();
        let raw_expiry = if stored_with_offset {
            expires_utc.with_timezone(&stored_zone).to_rfc3339()
        } else {
            // SQLite `datetime()` style: naive, implicitly UTC.
            expires_utc.format("%Y-%m-%d %H:%M:%S").to_string()
        };

        db.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO sessions (token_hash, user_id, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![hash_token("tz"), user.id, format_timestamp(now_utc), raw_expiry],
            )?;
            Ok(())
        })
        .unwrap();

        let clock_zone = FixedOffset::east_opt(clock_offset_hours * 3600).unwrap();
        let clock_reading = now_utc.with_timezone(&clock_zone);

        let lookup = db
            .resolve_session("tz", clock_reading.with_timezone(&Utc))
            .unwrap();

        if seconds_until_expiry < 0 {
            assert!(matches!(lookup, SessionLookup::Expired), "raw expiry {}", raw_expiry);
        } else {
            assert!(matches!(lookup, SessionLookup::Active(_)), "raw expiry {}", raw_expiry);
        }
    }
}
