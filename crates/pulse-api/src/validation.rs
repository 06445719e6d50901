//! Input checks for request bodies. Each function either returns a cleaned
//! value ready for storage or every field error found, not just the first.

use pulse_types::api::{CreateBloodRequest, UpdateProfileRequest};
use pulse_types::models::{RequestStatus, Role, Urgency};

use crate::error::{ApiError, FieldError};

pub const MIN_UNITS: i64 = 1;
pub const MAX_UNITS: i64 = 10;

#[derive(Debug)]
pub struct ValidBloodRequest {
    pub patient_name: String,
    pub blood_group: Option<String>,
    pub units_needed: i64,
    pub hospital_name: String,
    pub hospital_address: String,
    pub city: String,
    pub urgency: Urgency,
    pub description: String,
}

pub fn blood_request(input: CreateBloodRequest) -> Result<ValidBloodRequest, ApiError> {
    let mut errors = Vec::new();

    let patient_name = required(&mut errors, "patient_name", &input.patient_name);
    let hospital_name = required(&mut errors, "hospital_name", &input.hospital_name);
    let hospital_address = required(&mut errors, "hospital_address", &input.hospital_address);
    let city = required(&mut errors, "city", &input.city);

    if !(MIN_UNITS..=MAX_UNITS).contains(&input.units_needed) {
        errors.push(FieldError::new(
            "units_needed",
            format!("must be between {} and {}", MIN_UNITS, MAX_UNITS),
        ));
    }

    let urgency = match input.urgency.trim().parse::<Urgency>() {
        Ok(u) => Some(u),
        Err(_) => {
            errors.push(FieldError::new("urgency", expected_one_of(Urgency::ALL)));
            None
        }
    };

    let blood_group = input
        .blood_group
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty());

    match urgency {
        Some(urgency) if errors.is_empty() => Ok(ValidBloodRequest {
            patient_name,
            blood_group,
            units_needed: input.units_needed,
            hospital_name,
            hospital_address,
            city,
            urgency,
            description: input.description.trim().to_string(),
        }),
        _ => Err(ApiError::Validation(errors)),
    }
}

/// A profile update with text fields trimmed. Blank name or city are
/// rejected; blank phone or emergency contact are stored as given.
#[derive(Debug, Default)]
pub struct ValidProfile {
    pub name: Option<String>,
    pub role: Option<Role>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub emergency_contact: Option<String>,
}

pub fn profile_update(input: UpdateProfileRequest) -> Result<ValidProfile, ApiError> {
    let mut errors = Vec::new();

    let name = input
        .name
        .map(|n| required(&mut errors, "name", &n));
    let city = input
        .city
        .map(|c| required(&mut errors, "city", &c));

    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    Ok(ValidProfile {
        name,
        role: input.role,
        city,
        phone: input.phone.map(|p| p.trim().to_string()),
        emergency_contact: input.emergency_contact.map(|c| c.trim().to_string()),
    })
}

pub fn request_status(raw: &str) -> Result<RequestStatus, ApiError> {
    raw.trim()
        .parse::<RequestStatus>()
        .map_err(|_| ApiError::invalid("status", expected_one_of(RequestStatus::ALL)))
}

pub fn response_message(raw: &str) -> Result<String, ApiError> {
    let message = raw.trim();
    if message.is_empty() {
        return Err(ApiError::invalid("message", "is required"));
    }
    Ok(message.to_string())
}

fn required(errors: &mut Vec<FieldError>, field: &'static str, value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.push(FieldError::new(field, "is required"));
    }
    value.to_string()
}

fn expected_one_of<T: std::fmt::Display>(all: &[T]) -> String {
    let names: Vec<String> = all.iter().map(|v| v.to_string()).collect();
    format!("must be one of: {}", names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn valid_input() -> CreateBloodRequest {
        CreateBloodRequest {
            patient_name: "Ravi".into(),
            blood_group: Some("O+".into()),
            units_needed: 2,
            hospital_name: "City Hospital".into(),
            hospital_address: "12 Ring Road".into(),
            city: "Delhi".into(),
            urgency: "urgent".into(),
            description: String::new(),
        }
    }

    fn field_names(err: ApiError) -> Vec<&'static str> {
        match err {
            ApiError::Validation(fields) => fields.into_iter().map(|f| f.field).collect(),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[rstest]
    #[case(0, false)]
    #[case(1, true)]
    #[case(10, true)]
    #[case(11, false)]
    #[case(-3, false)]
    fn units_must_be_in_range(#[case] units: i64, #[case] ok: bool) {
        let input = CreateBloodRequest {
            units_needed: units,
            ..valid_input()
        };
        assert_eq!(blood_request(input).is_ok(), ok);
    }

    #[test]
    fn reports_every_missing_field() {
        let input = CreateBloodRequest {
            units_needed: 1,
            urgency: "normal".into(),
            ..Default::default()
        };
        assert_eq!(
            field_names(blood_request(input).unwrap_err()),
            vec!["patient_name", "hospital_name", "hospital_address", "city"]
        );
    }

    #[test]
    fn unknown_urgency_is_a_field_error() {
        let input = CreateBloodRequest {
            urgency: "asap".into(),
            ..valid_input()
        };
        assert_eq!(field_names(blood_request(input).unwrap_err()), vec!["urgency"]);
    }

    #[test]
    fn trims_text_and_drops_blank_blood_group() {
        let input = CreateBloodRequest {
            city: "  Pune ".into(),
            blood_group: Some("  ".into()),
            ..valid_input()
        };
        let valid = blood_request(input).unwrap();
        assert_eq!(valid.city, "Pune");
        assert_eq!(valid.blood_group, None);
        assert_eq!(valid.urgency, Urgency::Urgent);
    }

    #[test]
    fn blank_profile_name_or_city_rejected() {
        let input = UpdateProfileRequest {
            name: Some(" ".into()),
            city: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(
            field_names(profile_update(input).unwrap_err()),
            vec!["name", "city"]
        );
    }

    #[test]
    fn absent_profile_fields_stay_absent() {
        let valid = profile_update(UpdateProfileRequest {
            role: Some(Role::Donor),
            ..Default::default()
        })
        .unwrap();
        assert!(valid.name.is_none());
        assert!(valid.city.is_none());
        assert_eq!(valid.role, Some(Role::Donor));
    }

    #[test]
    fn status_and_message_checks() {
        assert_eq!(request_status(" fulfilled ").unwrap(), RequestStatus::Fulfilled);
        assert!(request_status("done").is_err());
        assert!(response_message("   ").is_err());
        assert_eq!(response_message(" on my way ").unwrap(), "on my way");
    }
}
