//! Admin-triggered ingestion

use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::server::ApiState;
use crate::api::types::ApiError;
use crate::broker::Message;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct IngestRequest {
    #[validate(length(min = 1, message = "filepath is required"))]
    pub filepath: String,
    #[validate(length(min = 1, message = "user is required"))]
    pub user: String,
}

/// Trigger ingestion of an uploaded file.
///
/// Publishes the `ingest` command on the file's existing correlation id;
/// the ingest worker owns the resulting state transition, this endpoint
/// writes no event itself.
#[utoipa::path(
    post,
    path = "/file/ingest",
    tag = "files",
    request_body = IngestRequest,
    responses(
        (status = 200, description = "Ingest message published"),
        (status = 400, description = "Malformed payload or unknown user/path"),
        (status = 401, description = "Not an admin"),
        (status = 500, description = "Database or broker failure")
    )
)]
pub async fn ingest_file(
    State(state): State<ApiState>,
    ValidatedJson(body): ValidatedJson<IngestRequest>,
) -> Result<StatusCode, ApiError> {
    let correlation_id = state
        .store
        .get_corr_id(&body.user, &body.filepath)
        .await
        .map_err(ApiError::from_store)?;

    let message = Message::Ingest {
        user: body.user,
        filepath: body.filepath,
    };
    state
        .broker
        .publish(&message, &correlation_id)
        .await
        .map_err(ApiError::from_broker)?;

    Ok(StatusCode::OK)
}
