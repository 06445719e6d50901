use anyhow::Result;
use pulse_types::models::Stats;

use crate::Database;

impl Database {
    /// Platform-wide counts, recomputed on every call.
    pub fn stats(&self) -> Result<Stats> {
        self.with_conn(|conn| {
            let (total_requests, active_requests, total_responses, total_users): (i64, i64, i64, i64) =
                conn.query_row(
                    "SELECT
                         (SELECT COUNT(*) FROM blood_requests),
                         (SELECT COUNT(*) FROM blood_requests WHERE status = 'active'),
                         (SELECT COUNT(*) FROM donor_responses),
                         (SELECT COUNT(*) FROM users)",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                )?;

            Ok(Stats {
                total_requests: total_requests.try_into()?,
                active_requests: active_requests.try_into()?,
                total_responses: total_responses.try_into()?,
                total_users: total_users.try_into()?,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::responses::NewResponse;
    use crate::queries::test_support::{new_db, seed_request, seed_user};

    #[test]
    fn empty_database_has_zero_counts() {
        let db = new_db();
        assert_eq!(db.stats().unwrap(), Stats::default());
    }

    #[test]
    fn counts_reflect_requests_responses_and_users() {
        let db = new_db();
        let requester = seed_user(&db, "requester");
        let donor = seed_user(&db, "donor");
        let open = seed_request(&db, &requester.id, "Delhi", "critical");
        let done = seed_request(&db, &requester.id, "Delhi", "normal");
        db.update_request_status(&done.id, "fulfilled").unwrap();

        db.record_response(&NewResponse {
            id: "resp-1",
            request_id: &open.id,
            donor_id: &donor.id,
            donor_name: &donor.name,
            donor_phone: None,
            donor_email: &donor.email,
            message: "On my way",
            created_at: "2024-01-01T00:00:00.000000Z",
        })
        .unwrap();

        assert_eq!(
            db.stats().unwrap(),
            Stats {
                total_requests: 2,
                active_requests: 1,
                total_responses: 1,
                total_users: 2,
            }
        );
    }
}
