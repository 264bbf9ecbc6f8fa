//! Admin views over submitters

use axum::extract::{Path, State};
use axum::Json;

use crate::api::server::ApiState;
use crate::api::types::ApiError;
use crate::data::SubmissionFileInfo;

/// List users with at least one file not yet in a dataset
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    responses(
        (status = 200, description = "Active users", body = Vec<String>),
        (status = 401, description = "Not an admin")
    )
)]
pub async fn list_active_users(
    State(state): State<ApiState>,
) -> Result<Json<Vec<String>>, ApiError> {
    let users = state
        .store
        .list_active_users()
        .await
        .map_err(ApiError::from_store)?;

    Ok(Json(users))
}

/// List a user's files that are not yet in a dataset.
///
/// Usernames are OIDC subjects; the `@` arrives re-encoded as `_` in the
/// path and is restored before the lookup.
#[utoipa::path(
    get,
    path = "/users/{username}/files",
    tag = "users",
    params(("username" = String, Path, description = "Submitter, with @ re-encoded as _")),
    responses(
        (status = 200, description = "The user's files", body = Vec<SubmissionFileInfo>),
        (status = 401, description = "Not an admin")
    )
)]
pub async fn list_user_files(
    State(state): State<ApiState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<SubmissionFileInfo>>, ApiError> {
    let username = username.replace('@', "_");
    let files = state
        .store
        .get_user_files(&username)
        .await
        .map_err(ApiError::from_store)?;

    Ok(Json(files))
}
