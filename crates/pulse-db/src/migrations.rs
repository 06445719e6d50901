use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id                  TEXT PRIMARY KEY,
                subject             TEXT NOT NULL UNIQUE,
                email               TEXT NOT NULL,
                name                TEXT NOT NULL,
                picture             TEXT,
                role                TEXT,
                city                TEXT NOT NULL DEFAULT 'Unknown',
                phone               TEXT,
                emergency_contact   TEXT,
                created_at          TEXT NOT NULL
            );

            -- Tokens are stored hashed; the cookie value never touches disk.
            CREATE TABLE sessions (
                token_hash  TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id),
                created_at  TEXT NOT NULL,
                expires_at  TEXT NOT NULL
            );

            CREATE INDEX idx_sessions_user ON sessions(user_id);

            CREATE TABLE blood_requests (
                id                  TEXT PRIMARY KEY,
                requester_id        TEXT NOT NULL REFERENCES users(id),
                requester_name      TEXT NOT NULL,
                requester_phone     TEXT,
                patient_name        TEXT NOT NULL,
                blood_group         TEXT,
                units_needed        INTEGER NOT NULL CHECK (units_needed BETWEEN 1 AND 10),
                hospital_name       TEXT NOT NULL,
                hospital_address    TEXT NOT NULL,
                city                TEXT NOT NULL,
                urgency             TEXT NOT NULL CHECK (urgency IN ('normal', 'urgent', 'critical')),
                description         TEXT NOT NULL,
                status              TEXT NOT NULL DEFAULT 'active'
                                    CHECK (status IN ('active', 'fulfilled', 'closed')),
                responses_count     INTEGER NOT NULL DEFAULT 0,
                created_at          TEXT NOT NULL
            );

            CREATE INDEX idx_requests_created ON blood_requests(created_at);
            CREATE INDEX idx_requests_requester ON blood_requests(requester_id, created_at);

            CREATE TABLE donor_responses (
                id              TEXT PRIMARY KEY,
                request_id      TEXT NOT NULL REFERENCES blood_requests(id),
                donor_id        TEXT NOT NULL REFERENCES users(id),
                donor_name      TEXT NOT NULL,
                donor_phone     TEXT,
                donor_email     TEXT NOT NULL,
                message         TEXT NOT NULL,
                created_at      TEXT NOT NULL,
                UNIQUE(request_id, donor_id)
            );

            CREATE INDEX idx_responses_donor ON donor_responses(donor_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
