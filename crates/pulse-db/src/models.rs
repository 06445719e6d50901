//! Database row types. These map directly to SQLite rows.
//! Conversions into the `pulse-types` models live here so that a corrupt row
//! surfaces as an error instead of a silently defaulted field.

use anyhow::{Context, Result};
use pulse_types::models::{BloodRequest, DonorResponse, RequestStatus, Role, Urgency, User};
use rusqlite::Row;
use uuid::Uuid;

use crate::parse_timestamp;

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub subject: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
    pub role: Option<String>,
    pub city: String,
    pub phone: Option<String>,
    pub emergency_contact: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct SessionRow {
    pub token_hash: String,
    pub user_id: String,
    pub created_at: String,
    pub expires_at: String,
}

#[derive(Debug, Clone)]
pub struct BloodRequestRow {
    pub id: String,
    pub requester_id: String,
    pub requester_name: String,
    pub requester_phone: Option<String>,
    pub patient_name: String,
    pub blood_group: Option<String>,
    pub units_needed: i64,
    pub hospital_name: String,
    pub hospital_address: String,
    pub city: String,
    pub urgency: String,
    pub description: String,
    pub status: String,
    pub responses_count: i64,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct ResponseRow {
    pub id: String,
    pub request_id: String,
    pub donor_id: String,
    pub donor_name: String,
    pub donor_phone: Option<String>,
    pub donor_email: String,
    pub message: String,
    pub created_at: String,
}

pub(crate) const USER_COLUMNS: &str =
    "id, subject, email, name, picture, role, city, phone, emergency_contact, created_at";

pub(crate) const SESSION_COLUMNS: &str = "token_hash, user_id, created_at, expires_at";

pub(crate) const REQUEST_COLUMNS: &str = "id, requester_id, requester_name, requester_phone, \
     patient_name, blood_group, units_needed, hospital_name, hospital_address, city, urgency, \
     description, status, responses_count, created_at";

pub(crate) const RESPONSE_COLUMNS: &str =
    "id, request_id, donor_id, donor_name, donor_phone, donor_email, message, created_at";

impl UserRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            subject: row.get(1)?,
            email: row.get(2)?,
            name: row.get(3)?,
            picture: row.get(4)?,
            role: row.get(5)?,
            city: row.get(6)?,
            phone: row.get(7)?,
            emergency_contact: row.get(8)?,
            created_at: row.get(9)?,
        })
    }
}

impl SessionRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            token_hash: row.get(0)?,
            user_id: row.get(1)?,
            created_at: row.get(2)?,
            expires_at: row.get(3)?,
        })
    }
}

impl BloodRequestRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            requester_id: row.get(1)?,
            requester_name: row.get(2)?,
            requester_phone: row.get(3)?,
            patient_name: row.get(4)?,
            blood_group: row.get(5)?,
            units_needed: row.get(6)?,
            hospital_name: row.get(7)?,
            hospital_address: row.get(8)?,
            city: row.get(9)?,
            urgency: row.get(10)?,
            description: row.get(11)?,
            status: row.get(12)?,
            responses_count: row.get(13)?,
            created_at: row.get(14)?,
        })
    }
}

impl ResponseRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            request_id: row.get(1)?,
            donor_id: row.get(2)?,
            donor_name: row.get(3)?,
            donor_phone: row.get(4)?,
            donor_email: row.get(5)?,
            message: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}

fn parse_uuid(raw: &str, what: &str) -> Result<Uuid> {
    raw.parse()
        .with_context(|| format!("Corrupt {} '{}'", what, raw))
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: parse_uuid(&row.id, "user id")?,
            email: row.email,
            name: row.name,
            picture: row.picture,
            role: row.role.as_deref().map(str::parse::<Role>).transpose()?,
            city: row.city,
            phone: row.phone,
            emergency_contact: row.emergency_contact,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

impl TryFrom<BloodRequestRow> for BloodRequest {
    type Error = anyhow::Error;

    fn try_from(row: BloodRequestRow) -> Result<Self> {
        Ok(BloodRequest {
            id: parse_uuid(&row.id, "request id")?,
            requester_id: parse_uuid(&row.requester_id, "requester id")?,
            requester_name: row.requester_name,
            requester_phone: row.requester_phone,
            patient_name: row.patient_name,
            blood_group: row.blood_group,
            units_needed: u8::try_from(row.units_needed)
                .with_context(|| format!("Corrupt units_needed {}", row.units_needed))?,
            hospital_name: row.hospital_name,
            hospital_address: row.hospital_address,
            city: row.city,
            urgency: row.urgency.parse::<Urgency>()?,
            description: row.description,
            status: row.status.parse::<RequestStatus>()?,
            responses_count: u32::try_from(row.responses_count)
                .with_context(|| format!("Corrupt responses_count {}", row.responses_count))?,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

impl TryFrom<ResponseRow> for DonorResponse {
    type Error = anyhow::Error;

    fn try_from(row: ResponseRow) -> Result<Self> {
        Ok(DonorResponse {
            id: parse_uuid(&row.id, "response id")?,
            request_id: parse_uuid(&row.request_id, "request id")?,
            donor_id: parse_uuid(&row.donor_id, "donor id")?,
            donor_name: row.donor_name,
            donor_phone: row.donor_phone,
            donor_email: row.donor_email,
            message: row.message,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}
