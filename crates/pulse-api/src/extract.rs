use axum::extract::FromRequest;

use crate::error::ApiError;

/// `axum::Json` for request bodies, with decode failures reported through
/// [`ApiError`] so they carry the usual JSON error body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);
