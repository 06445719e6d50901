use anyhow::Result;
use rusqlite::{OptionalExtension, TransactionBehavior, params};

use crate::Database;
use crate::models::{RESPONSE_COLUMNS, ResponseRow};

pub struct NewResponse<'a> {
    pub id: &'a str,
    pub request_id: &'a str,
    pub donor_id: &'a str,
    pub donor_name: &'a str,
    pub donor_phone: Option<&'a str>,
    pub donor_email: &'a str,
    pub message: &'a str,
    pub created_at: &'a str,
}

#[derive(Debug)]
pub enum RecordOutcome {
    Recorded(ResponseRow),
    /// This donor already answered this request; nothing was written.
    Duplicate,
    RequestNotFound,
    /// The request is fulfilled or closed. Carries its current status.
    RequestInactive(String),
}

impl Database {
    /// Records a donor response and bumps the request's counter in one
    /// transaction.
    ///
    /// Uniqueness of (request, donor) is decided by the insert itself against
    /// the table's UNIQUE constraint, so two racing submissions cannot both
    /// succeed and the counter always equals the number of stored responses.
    /// An existing response is reported as `Duplicate` even once the request
    /// is no longer active.
    pub fn record_response(&self, new: &NewResponse<'_>) -> Result<RecordOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let status: Option<String> = tx
                .query_row(
                    "SELECT status FROM blood_requests WHERE id = ?1",
                    [new.request_id],
                    |row| row.get(0),
                )
                .optional()?;

            let Some(status) = status else {
                return Ok(RecordOutcome::RequestNotFound);
            };

            let inserted = tx.execute(
                "INSERT INTO donor_responses (
                     id, request_id, donor_id, donor_name, donor_phone, donor_email, message, created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(request_id, donor_id) DO NOTHING",
                params![
                    new.id,
                    new.request_id,
                    new.donor_id,
                    new.donor_name,
                    new.donor_phone,
                    new.donor_email,
                    new.message,
                    new.created_at,
                ],
            )?;

            // Dropping the transaction rolls it back.
            if inserted == 0 {
                return Ok(RecordOutcome::Duplicate);
            }
            if status != "active" {
                return Ok(RecordOutcome::RequestInactive(status));
            }

            tx.execute(
                "UPDATE blood_requests SET responses_count = responses_count + 1 WHERE id = ?1",
                [new.request_id],
            )?;

            let sql = format!("SELECT {} FROM donor_responses WHERE id = ?1", RESPONSE_COLUMNS);
            let row = tx.query_row(&sql, [new.id], ResponseRow::from_row)?;

            tx.commit()?;
            Ok(RecordOutcome::Recorded(row))
        })
    }

    /// Newest first.
    pub fn list_responses_by_donor(&self, donor_id: &str) -> Result<Vec<ResponseRow>> {
        self.list_responses_where("donor_id", donor_id)
    }

    /// Newest first.
    pub fn list_responses_for_request(&self, request_id: &str) -> Result<Vec<ResponseRow>> {
        self.list_responses_where("request_id", request_id)
    }

    fn list_responses_where(&self, column: &'static str, value: &str) -> Result<Vec<ResponseRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM donor_responses WHERE {} = ?1 ORDER BY created_at DESC, rowid DESC",
                RESPONSE_COLUMNS, column
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([value], ResponseRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}
