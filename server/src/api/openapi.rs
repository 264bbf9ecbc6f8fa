//! OpenAPI document for the admin API

use axum::Json;
use utoipa::OpenApi;

use super::routes;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Sensitive Data Archive admin API",
        description = "Drives files through the archive pipeline and groups them into datasets"
    ),
    paths(
        routes::files::get_files,
        routes::ingest::ingest_file,
        routes::accession::set_accession,
        routes::dataset::create_dataset,
        routes::dataset::release_dataset,
        routes::users::list_active_users,
        routes::users::list_user_files,
        routes::ready::ready,
    ),
    components(schemas(
        crate::data::SubmissionFileInfo,
        routes::ingest::IngestRequest,
        routes::accession::AccessionRequest,
        routes::dataset::CreateDatasetRequest,
    )),
    tags(
        (name = "files", description = "File lifecycle commands"),
        (name = "datasets", description = "Dataset commands"),
        (name = "users", description = "Submitter views"),
        (name = "health", description = "Probes")
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
