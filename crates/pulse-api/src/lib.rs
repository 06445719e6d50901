pub mod auth;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod provider;
pub mod requests;
pub mod responses;
pub mod routes;
pub mod state;
pub mod stats;
pub mod validation;

pub use error::ApiError;
pub use routes::router;
pub use state::{AppState, AppStateInner, AuthSettings};

/// Converts stored rows into API models, failing on the first corrupt row.
pub(crate) fn into_models<R, T>(rows: Vec<R>) -> Result<Vec<T>, ApiError>
where
    T: TryFrom<R, Error = anyhow::Error>,
{
    rows.into_iter()
        .map(|row| T::try_from(row).map_err(ApiError::Internal))
        .collect()
}
