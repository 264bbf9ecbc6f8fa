//! Admin-triggered accession assignment

use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::server::ApiState;
use crate::api::types::ApiError;
use crate::broker::{Checksum, Message};
use crate::data::{AccessionCheck, FileEvent};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AccessionRequest {
    #[validate(length(min = 1, message = "accession_id is required"))]
    pub accession_id: String,
    #[validate(length(min = 1, message = "filepath is required"))]
    pub filepath: String,
    #[validate(length(min = 1, message = "user is required"))]
    pub user: String,
}

/// Assign a stable accession id to a verified file.
///
/// Verifies the file's latest event admits an accession and that the id is
/// unused, then publishes the `accession` command. The accession worker
/// performs the write.
#[utoipa::path(
    post,
    path = "/file/accession",
    tag = "files",
    request_body = AccessionRequest,
    responses(
        (status = 200, description = "Accession message published"),
        (status = 400, description = "Malformed payload, wrong state, or duplicate accession"),
        (status = 401, description = "Not an admin"),
        (status = 500, description = "Database or broker failure")
    )
)]
pub async fn set_accession(
    State(state): State<ApiState>,
    ValidatedJson(body): ValidatedJson<AccessionRequest>,
) -> Result<StatusCode, ApiError> {
    let correlation_id = state
        .store
        .get_corr_id(&body.user, &body.filepath)
        .await
        .map_err(ApiError::from_store)?;

    let file_id = state
        .store
        .get_file_id(&correlation_id)
        .await
        .map_err(ApiError::from_store)?;

    let status = state
        .store
        .get_file_status(&correlation_id)
        .await
        .map_err(ApiError::from_store)?;

    match FileEvent::parse(&status) {
        Some(event) if event.admits_accession() => {}
        _ => {
            return Err(ApiError::bad_request(format!(
                "file in state '{}' cannot take an accession",
                status
            )));
        }
    }

    let check = state
        .store
        .check_accession_id_exists(&body.accession_id, &file_id)
        .await
        .map_err(ApiError::from_store)?;
    if check == AccessionCheck::Duplicate {
        return Err(ApiError::bad_request(format!(
            "accession id {} is already in use",
            body.accession_id
        )));
    }

    let info = state
        .store
        .get_file_info(&file_id)
        .await
        .map_err(ApiError::from_store)?;

    let message = Message::Accession {
        accession_id: body.accession_id,
        user: body.user,
        filepath: body.filepath,
        decrypted_checksums: vec![Checksum::sha256(info.decrypted_checksum)],
    };
    state
        .broker
        .publish(&message, &correlation_id)
        .await
        .map_err(ApiError::from_broker)?;

    Ok(StatusCode::OK)
}
