//! OpenAPI 3.0 specification definition

use utoipa::OpenApi;

use crate::api::handlers::{
    convert::ConvertRequest, health::HealthResponse, version::VersionInfo,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "PDFSmith API",
        version = "2.0.0",
        description = "HTML to PDF conversion service with headless Chromium rendering",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "/", description = "Current server")
    ),
    tags(
        (name = "system", description = "System health and status endpoints"),
        (name = "convert", description = "HTML to PDF conversion")
    ),
    paths(
        crate::api::handlers::health::health_check,
        crate::api::handlers::version::version_info,
        crate::api::handlers::convert::convert_html,
    ),
    components(
        schemas(
            HealthResponse,
            VersionInfo,
            ConvertRequest,
        )
    )
)]
pub struct ApiDoc;
