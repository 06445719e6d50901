use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use pulse_db::{NewBloodRequest, RequestFilter, format_timestamp};
use pulse_types::api::{CreateBloodRequest, UpdateStatusRequest};
use pulse_types::models::{BloodRequest, RequestStatus, Urgency};

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::into_models;
use crate::middleware::AuthUser;
use crate::state::{AppState, with_db};
use crate::validation;

pub async fn create_request(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    JsonBody(req): JsonBody<CreateBloodRequest>,
) -> Result<(StatusCode, Json<BloodRequest>), ApiError> {
    let valid = validation::blood_request(req)?;
    let requester = auth.user;

    let row = with_db(&state, move |db| {
        let id = Uuid::new_v4().to_string();
        let requester_id = requester.id.to_string();
        let created_at = format_timestamp(Utc::now());
        db.insert_request(&NewBloodRequest {
            id: &id,
            requester_id: &requester_id,
            requester_name: &requester.name,
            requester_phone: requester.phone.as_deref(),
            patient_name: &valid.patient_name,
            blood_group: valid.blood_group.as_deref(),
            units_needed: valid.units_needed,
            hospital_name: &valid.hospital_name,
            hospital_address: &valid.hospital_address,
            city: &valid.city,
            urgency: valid.urgency.as_str(),
            description: &valid.description,
            created_at: &created_at,
        })
    })
    .await?;

    let request = BloodRequest::try_from(row)?;
    info!(
        "Blood request {} created in {} ({})",
        request.id, request.city, request.urgency
    );
    Ok((StatusCode::CREATED, Json(request)))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub city: Option<String>,
    pub urgency: Option<String>,
    pub status: Option<String>,
}

/// Public listing. Blank filters are ignored; city matches case-insensitively
/// after trimming.
pub async fn list_requests(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<BloodRequest>>, ApiError> {
    let city = non_blank(query.city);
    let urgency = match non_blank(query.urgency) {
        Some(u) => Some(
            u.parse::<Urgency>()
                .map_err(|e| ApiError::invalid("urgency", e.to_string()))?,
        ),
        None => None,
    };
    let status = match non_blank(query.status) {
        Some(s) => Some(validation::request_status(&s)?),
        None => None,
    };

    let rows = with_db(&state, move |db| {
        db.list_requests(&RequestFilter {
            city: city.as_deref(),
            urgency: urgency.map(Urgency::as_str),
            status: status.map(RequestStatus::as_str),
        })
    })
    .await?;

    Ok(Json(into_models(rows)?))
}

pub async fn my_requests(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<BloodRequest>>, ApiError> {
    let requester_id = auth.user.id.to_string();
    let rows = with_db(&state, move |db| db.list_requests_by_requester(&requester_id)).await?;
    Ok(Json(into_models(rows)?))
}

pub async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BloodRequest>, ApiError> {
    Ok(Json(load_request(&state, &id).await?))
}

/// Owner-only. Any status may move to any other; the response counter is
/// left alone.
pub async fn update_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateStatusRequest>,
) -> Result<Json<BloodRequest>, ApiError> {
    let status = validation::request_status(&req.status)?;
    let request = load_request(&state, &id).await?;
    if request.requester_id != auth.user.id {
        return Err(ApiError::Forbidden);
    }

    let request_id = request.id.to_string();
    let row = with_db(&state, move |db| {
        if !db.update_request_status(&request_id, status.as_str())? {
            return Ok(None);
        }
        db.get_request(&request_id)
    })
    .await?
    .ok_or(ApiError::NotFound("Request"))?;

    info!("Blood request {} is now {}", request.id, status);
    Ok(Json(BloodRequest::try_from(row)?))
}

/// Fetches a request by its path id. Ids that are not UUIDs cannot exist and
/// are reported the same as missing ones.
pub(crate) async fn load_request(state: &AppState, id: &str) -> Result<BloodRequest, ApiError> {
    let id = Uuid::parse_str(id.trim())
        .map_err(|_| ApiError::NotFound("Request"))?
        .to_string();
    let row = with_db(state, move |db| db.get_request(&id))
        .await?
        .ok_or(ApiError::NotFound("Request"))?;
    Ok(BloodRequest::try_from(row)?)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
