use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use pulse_db::{NewResponse, RecordOutcome, format_timestamp};
use pulse_types::api::CreateResponseRequest;
use pulse_types::models::DonorResponse;

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::into_models;
use crate::middleware::AuthUser;
use crate::requests::load_request;
use crate::state::{AppState, with_db};
use crate::validation;

/// Records the caller's response to a request. A donor gets one response per
/// request; a second attempt fails without touching the counter.
pub async fn create_response(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    JsonBody(req): JsonBody<CreateResponseRequest>,
) -> Result<(StatusCode, Json<DonorResponse>), ApiError> {
    let request_id = Uuid::parse_str(req.request_id.trim())
        .map_err(|_| ApiError::NotFound("Request"))?
        .to_string();
    let message = validation::response_message(&req.message)?;
    let donor = auth.user;

    let outcome = with_db(&state, move |db| {
        let id = Uuid::new_v4().to_string();
        let donor_id = donor.id.to_string();
        let created_at = format_timestamp(Utc::now());
        db.record_response(&NewResponse {
            id: &id,
            request_id: &request_id,
            donor_id: &donor_id,
            donor_name: &donor.name,
            donor_phone: donor.phone.as_deref(),
            donor_email: &donor.email,
            message: &message,
            created_at: &created_at,
        })
    })
    .await?;

    match outcome {
        RecordOutcome::Recorded(row) => {
            let response = DonorResponse::try_from(row)?;
            info!(
                "Donor {} responded to request {}",
                response.donor_id, response.request_id
            );
            Ok((StatusCode::CREATED, Json(response)))
        }
        RecordOutcome::Duplicate => Err(ApiError::DuplicateResponse),
        RecordOutcome::RequestNotFound => Err(ApiError::NotFound("Request")),
        RecordOutcome::RequestInactive(status) => {
            debug!("Response refused, request is {}", status);
            Err(ApiError::invalid(
                "request_id",
                format!("request is {} and no longer accepts responses", status),
            ))
        }
    }
}

pub async fn my_responses(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<DonorResponse>>, ApiError> {
    let donor_id = auth.user.id.to_string();
    let rows = with_db(&state, move |db| db.list_responses_by_donor(&donor_id)).await?;
    Ok(Json(into_models(rows)?))
}

/// Responses to one request, visible only to the requester who owns it.
pub async fn request_responses(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Vec<DonorResponse>>, ApiError> {
    let request = load_request(&state, &id).await?;
    if request.requester_id != auth.user.id {
        return Err(ApiError::Forbidden);
    }

    let request_id = request.id.to_string();
    let rows = with_db(&state, move |db| db.list_responses_for_request(&request_id)).await?;
    Ok(Json(into_models(rows)?))
}
