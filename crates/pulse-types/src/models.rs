use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// City assigned to users created by the login handshake until they fill in
/// their profile.
pub const UNKNOWN_CITY: &str = "Unknown";

/// Returned when a stored or submitted enum value is not one of the known
/// variants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Donor,
    Requester,
    Ngo,
}

text_enum!(Role, "role", {
    Donor => "donor",
    Requester => "requester",
    Ngo => "ngo",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Normal,
    Urgent,
    Critical,
}

text_enum!(Urgency, "urgency", {
    Normal => "normal",
    Urgent => "urgent",
    Critical => "critical",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Active,
    Fulfilled,
    Closed,
}

text_enum!(RequestStatus, "status", {
    Active => "active",
    Fulfilled => "fulfilled",
    Closed => "closed",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
    /// Unset until the user picks one on the profile page.
    pub role: Option<Role>,
    pub city: String,
    pub phone: Option<String>,
    pub emergency_contact: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// The dashboard prompts for profile completion until both a role and a
    /// real city are set.
    pub fn profile_complete(&self) -> bool {
        self.role.is_some() && self.city != UNKNOWN_CITY
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BloodRequest {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub requester_name: String,
    pub requester_phone: Option<String>,
    pub patient_name: String,
    pub blood_group: Option<String>,
    pub units_needed: u8,
    pub hospital_name: String,
    pub hospital_address: String,
    pub city: String,
    pub urgency: Urgency,
    pub description: String,
    pub status: RequestStatus,
    pub responses_count: u32,
    pub created_at: DateTime<Utc>,
}

/// A donor's answer to a blood request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonorResponse {
    pub id: Uuid,
    pub request_id: Uuid,
    pub donor_id: Uuid,
    pub donor_name: String,
    pub donor_phone: Option<String>,
    pub donor_email: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub total_requests: u64,
    pub active_requests: u64,
    pub total_responses: u64,
    pub total_users: u64,
}
