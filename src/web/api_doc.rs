use utoipa::OpenApi;

use super::api::error::ErrorResponse;
use super::api::passes::{PassesQuery, PassesResponse, UploadRequest};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::api::passes::get_passes,
        super::api::passes::post_passes,
        super::api::passes::get_passes_csv,
    ),
    components(
        schemas(
            PassesQuery,
            PassesResponse,
            UploadRequest,
            ErrorResponse,
            crate::report::PassReport,
            crate::report::ReportRow,
            crate::report::PolarPoint,
            crate::predict::TrackPoint,
        )
    ),
    info(
        title = "Passcast API",
        description = "Satellite pass predictions for a fixed ground station",
        version = "0.1.0"
    ),
    tags(
        (name = "passes", description = "Pass prediction")
    )
)]
pub struct ApiDoc;
