use serde::{Deserialize, Serialize};

use crate::models::{Role, User};

// -- Auth --

/// Returned once the identity provider has vouched for a login.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: User,
    pub session_token: String,
    pub redirect_to: String,
    pub profile_complete: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetSessionRequest {
    pub session_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: User,
    pub profile_complete: bool,
}

/// Partial profile update. Identity fields (id, email, picture) are owned by
/// the identity provider and cannot be changed here.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub role: Option<Role>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub emergency_contact: Option<String>,
}

// -- Blood requests --

/// Text fields default to empty so that validation can report every missing
/// field at once instead of failing on the first one during decoding.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CreateBloodRequest {
    #[serde(default)]
    pub patient_name: String,
    pub blood_group: Option<String>,
    #[serde(default)]
    pub units_needed: i64,
    #[serde(default)]
    pub hospital_name: String,
    #[serde(default)]
    pub hospital_address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub urgency: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateStatusRequest {
    pub status: String,
}

// -- Donor responses --

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CreateResponseRequest {
    pub request_id: String,
    #[serde(default)]
    pub message: String,
}

// -- Misc --

#[derive(Debug, Serialize, Deserialize)]
pub struct AckResponse {
    pub message: String,
}

impl AckResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
