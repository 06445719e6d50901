use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, params};

use crate::Database;
use crate::models::{BloodRequestRow, REQUEST_COLUMNS};

pub struct NewBloodRequest<'a> {
    pub id: &'a str,
    pub requester_id: &'a str,
    pub requester_name: &'a str,
    pub requester_phone: Option<&'a str>,
    pub patient_name: &'a str,
    pub blood_group: Option<&'a str>,
    pub units_needed: i64,
    pub hospital_name: &'a str,
    pub hospital_address: &'a str,
    pub city: &'a str,
    pub urgency: &'a str,
    pub description: &'a str,
    pub created_at: &'a str,
}

/// Equality filters for the request listing. `None` matches everything.
///
/// City is compared with SQLite's `NOCASE` collation, which folds ASCII
/// letters only; callers are expected to trim the value first.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestFilter<'a> {
    pub city: Option<&'a str>,
    pub urgency: Option<&'a str>,
    pub status: Option<&'a str>,
}

impl Database {
    /// Stores a new request as `active` with no responses.
    pub fn insert_request(&self, req: &NewBloodRequest<'_>) -> Result<BloodRequestRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO blood_requests (
                     id, requester_id, requester_name, requester_phone, patient_name,
                     blood_group, units_needed, hospital_name, hospital_address, city,
                     urgency, description, status, responses_count, created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 'active', 0, ?13)",
                params![
                    req.id,
                    req.requester_id,
                    req.requester_name,
                    req.requester_phone,
                    req.patient_name,
                    req.blood_group,
                    req.units_needed,
                    req.hospital_name,
                    req.hospital_address,
                    req.city,
                    req.urgency,
                    req.description,
                    req.created_at,
                ],
            )?;

            query_request(conn, req.id)?
                .ok_or_else(|| anyhow::anyhow!("Request {} vanished after insert", req.id))
        })
    }

    pub fn get_request(&self, id: &str) -> Result<Option<BloodRequestRow>> {
        self.with_conn(|conn| query_request(conn, id))
    }

    /// Newest first. Ties on `created_at` fall back to insertion order.
    pub fn list_requests(&self, filter: &RequestFilter<'_>) -> Result<Vec<BloodRequestRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM blood_requests
                 WHERE (?1 IS NULL OR city = ?1 COLLATE NOCASE)
                   AND (?2 IS NULL OR urgency = ?2)
                   AND (?3 IS NULL OR status = ?3)
                 ORDER BY created_at DESC, rowid DESC",
                REQUEST_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    params![filter.city, filter.urgency, filter.status],
                    BloodRequestRow::from_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_requests_by_requester(&self, requester_id: &str) -> Result<Vec<BloodRequestRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM blood_requests
                 WHERE requester_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
                REQUEST_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([requester_id], BloodRequestRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns false if no request has this id.
    pub fn update_request_status(&self, id: &str, status: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE blood_requests SET status = ?2 WHERE id = ?1",
                params![id, status],
            )?;
            Ok(changed == 1)
        })
    }
}

pub(crate) fn query_request(conn: &Connection, id: &str) -> Result<Option<BloodRequestRow>> {
    let sql = format!("SELECT {} FROM blood_requests WHERE id = ?1", REQUEST_COLUMNS);
    let row = conn
        .query_row(&sql, [id], BloodRequestRow::from_row)
        .optional()?;
    Ok(row)
}
