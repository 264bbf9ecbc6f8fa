//! Dataset creation and release

use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::server::ApiState;
use crate::api::types::ApiError;
use crate::broker::Message;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateDatasetRequest {
    #[validate(length(min = 1, message = "accession_ids must not be empty"))]
    pub accession_ids: Vec<String>,
    #[validate(length(min = 1, message = "dataset_id is required"))]
    pub dataset_id: String,
}

/// Group accessions into a dataset.
///
/// Publishes the `mapping` command; the mapper worker writes the mapping
/// atomically. This endpoint does not touch the database.
#[utoipa::path(
    post,
    path = "/dataset/create",
    tag = "datasets",
    request_body = CreateDatasetRequest,
    responses(
        (status = 200, description = "Mapping message published"),
        (status = 400, description = "Malformed payload"),
        (status = 401, description = "Not an admin"),
        (status = 500, description = "Broker failure")
    )
)]
pub async fn create_dataset(
    State(state): State<ApiState>,
    ValidatedJson(body): ValidatedJson<CreateDatasetRequest>,
) -> Result<StatusCode, ApiError> {
    let message = Message::Mapping {
        dataset_id: body.dataset_id,
        accession_ids: body.accession_ids,
    };

    // A dataset command starts its own conversation.
    let correlation_id = Uuid::new_v4().to_string();
    state
        .broker
        .publish(&message, &correlation_id)
        .await
        .map_err(ApiError::from_broker)?;

    Ok(StatusCode::OK)
}

/// Release a dataset for download
#[utoipa::path(
    post,
    path = "/dataset/release/{dataset}",
    tag = "datasets",
    params(("dataset" = String, Path, description = "Dataset stable id")),
    responses(
        (status = 200, description = "Release message published"),
        (status = 400, description = "Missing dataset name"),
        (status = 401, description = "Not an admin"),
        (status = 500, description = "Broker failure")
    )
)]
pub async fn release_dataset(
    State(state): State<ApiState>,
    Path(dataset): Path<String>,
) -> Result<StatusCode, ApiError> {
    let dataset_id = match dataset_name(&dataset) {
        Some(name) => name,
        None => return Err(ApiError::bad_request("dataset name is required")),
    };

    let message = Message::Release {
        dataset_id: dataset_id.to_string(),
    };
    let correlation_id = Uuid::new_v4().to_string();
    state
        .broker
        .publish(&message, &correlation_id)
        .await
        .map_err(ApiError::from_broker)?;

    Ok(StatusCode::OK)
}

/// Reached when the release path carries no dataset segment at all
pub async fn release_dataset_missing() -> ApiError {
    ApiError::bad_request("dataset name is required")
}

/// The dataset name from the wildcard path segment, if there is one
fn dataset_name(raw: &str) -> Option<&str> {
    let name = raw.trim_matches('/');
    if name.is_empty() { None } else { Some(name) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_name_from_path() {
        assert_eq!(dataset_name("API:dataset-01"), Some("API:dataset-01"));
        assert_eq!(dataset_name("/API:dataset-01"), Some("API:dataset-01"));
        assert_eq!(dataset_name(""), None);
        assert_eq!(dataset_name("/"), None);
    }
}
