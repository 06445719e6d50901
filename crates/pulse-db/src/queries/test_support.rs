use chrono::Utc;
use uuid::Uuid;

use crate::models::{BloodRequestRow, UserRow};
use crate::queries::requests::NewBloodRequest;
use crate::{Database, format_timestamp};

pub(crate) fn new_db() -> Database {
    Database::open_in_memory().unwrap()
}

pub(crate) fn seed_user(db: &Database, subject: &str) -> UserRow {
    let id = Uuid::new_v4().to_string();
    let email = format!("{}@example.com", subject);
    db.upsert_provider_user(&id, subject, &email, "Test User", None, &format_timestamp(Utc::now()))
        .unwrap()
}

pub(crate) fn new_request<'a>(
    id: &'a str,
    requester_id: &'a str,
    city: &'a str,
    urgency: &'a str,
    created_at: &'a str,
) -> NewBloodRequest<'a> {
    NewBloodRequest {
        id,
        requester_id,
        requester_name: "Test User",
        requester_phone: None,
        patient_name: "Patient",
        blood_group: Some("O+"),
        units_needed: 2,
        hospital_name: "City Hospital",
        hospital_address: "1 Main Road",
        city,
        urgency,
        description: "Surgery scheduled",
        created_at,
    }
}

pub(crate) fn seed_request(
    db: &Database,
    requester_id: &str,
    city: &str,
    urgency: &str,
) -> BloodRequestRow {
    let id = Uuid::new_v4().to_string();
    let created_at = format_timestamp(Utc::now());
    db.insert_request(&new_request(&id, requester_id, city, urgency, &created_at))
        .unwrap()
}
