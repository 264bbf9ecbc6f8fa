//! Submitter-facing file listing

use axum::extract::State;
use axum::{Extension, Json};

use crate::api::auth::Claims;
use crate::api::server::ApiState;
use crate::api::types::ApiError;
use crate::data::SubmissionFileInfo;

/// List the caller's own files with their latest status.
///
/// Only files not yet attached to a dataset are shown.
#[utoipa::path(
    get,
    path = "/files",
    tag = "files",
    responses(
        (status = 200, description = "The caller's files", body = Vec<SubmissionFileInfo>),
        (status = 401, description = "No or invalid token")
    )
)]
pub async fn get_files(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<SubmissionFileInfo>>, ApiError> {
    let files = state
        .store
        .get_user_files(&claims.sub)
        .await
        .map_err(ApiError::from_store)?;

    Ok(Json(files))
}
