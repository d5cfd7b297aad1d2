//! OpenAPI documentation configuration.
//!
//! The generated spec is served raw at `/api-docs/openapi.json` and rendered
//! interactively at `/docs`.

use utoipa::OpenApi;

use crate::api;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "boardlens",
        description = "Turn whiteboard photos into extracted text and a concise summary."
    ),
    paths(api::handlers::whiteboard::process_whiteboard),
    components(schemas(
        crate::api::models::whiteboard::ProcessingResult,
        crate::api::models::whiteboard::ErrorBody,
    )),
    tags(
        (name = "whiteboard", description = "Whiteboard photo processing")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_includes_processing_endpoint() {
        let spec = ApiDoc::openapi();
        let json = serde_json::to_value(&spec).unwrap();

        assert!(json["paths"]["/api/process-whiteboard"]["post"].is_object());
        assert!(json["components"]["schemas"]["ProcessingResult"].is_object());
        assert!(json["components"]["schemas"]["ErrorBody"].is_object());
    }
}
