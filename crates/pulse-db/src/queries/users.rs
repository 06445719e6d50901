use anyhow::Result;
use pulse_types::models::UNKNOWN_CITY;
use rusqlite::{Connection, OptionalExtension, params};

use crate::Database;
use crate::models::{USER_COLUMNS, UserRow};

/// Fields a user may change on their own profile. `None` leaves the stored
/// value untouched.
#[derive(Debug, Default)]
pub struct ProfileChanges<'a> {
    pub name: Option<&'a str>,
    pub role: Option<&'a str>,
    pub city: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub emergency_contact: Option<&'a str>,
}

impl Database {
    /// Creates the local user for a provider subject on first login. For a
    /// returning subject only the provider-owned fields are refreshed; the
    /// profile the user filled in (name, role, city, contact) is kept.
    pub fn upsert_provider_user(
        &self,
        new_id: &str,
        subject: &str,
        email: &str,
        name: &str,
        picture: Option<&str>,
        created_at: &str,
    ) -> Result<UserRow> {
        self.with_conn_mut(|conn| {
            upsert_user(conn, new_id, subject, email, name, picture, created_at)
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    /// Applies a partial profile update. Returns `None` if the user does not
    /// exist.
    pub fn update_profile(&self, id: &str, changes: &ProfileChanges<'_>) -> Result<Option<UserRow>> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET
                     name = COALESCE(?2, name),
                     role = COALESCE(?3, role),
                     city = COALESCE(?4, city),
                     phone = COALESCE(?5, phone),
                     emergency_contact = COALESCE(?6, emergency_contact)
                 WHERE id = ?1",
                params![
                    id,
                    changes.name,
                    changes.role,
                    changes.city,
                    changes.phone,
                    changes.emergency_contact,
                ],
            )?;
            query_user_by_id(conn, id)
        })
    }
}

pub(crate) fn upsert_user(
    conn: &Connection,
    new_id: &str,
    subject: &str,
    email: &str,
    name: &str,
    picture: Option<&str>,
    created_at: &str,
) -> Result<UserRow> {
    conn.execute(
        "INSERT INTO users (id, subject, email, name, picture, city, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(subject) DO UPDATE SET
             email = excluded.email,
             picture = COALESCE(excluded.picture, users.picture)",
        params![new_id, subject, email, name, picture, UNKNOWN_CITY, created_at],
    )?;

    let sql = format!("SELECT {} FROM users WHERE subject = ?1", USER_COLUMNS);
    let row = conn.query_row(&sql, [subject], UserRow::from_row)?;
    Ok(row)
}

fn query_user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
    let row = conn.query_row(&sql, [id], UserRow::from_row).optional()?;
    Ok(row)
}
