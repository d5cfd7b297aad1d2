//! Whiteboard photo processing endpoint.
//!
//! A single POST accepts a multipart upload, runs the two-stage pipeline
//! (vision extraction, then summarization) and returns both outputs. The
//! stages run strictly in sequence: the summary prompt embeds the extracted
//! text, so stage two never starts if stage one fails.

use crate::AppState;
use crate::api::models::whiteboard::{ErrorBody, ProcessingResult, UploadedImage};
use crate::errors::{Error, Result, Stage};
use anyhow::anyhow;
use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
};
use uuid::Uuid;

/// Instruction sent to the vision model alongside the uploaded image.
pub const EXTRACTION_INSTRUCTION: &str = "Extract all text and content from this whiteboard image. Organize it in a clear, readable format. Preserve any structure like bullet points, lists, or sections. If there are diagrams or drawings, describe them briefly.";

/// Render the summarization prompt around the extracted text.
pub fn summary_prompt(extracted_text: &str) -> String {
    format!(
        "Based on the following whiteboard content, create a concise summary highlighting the key points, main ideas, and action items:\n\n{extracted_text}"
    )
}

#[utoipa::path(
    post,
    path = "/api/process-whiteboard",
    tag = "whiteboard",
    summary = "Process whiteboard photo",
    description = "Upload a whiteboard photo as the `image` field of a multipart form. The image is transcribed by a vision model, then the transcription is summarized. Both outputs are returned together.",
    request_body(
        content_type = "multipart/form-data",
        description = "Form upload with an `image` file part"
    ),
    responses(
        (status = 200, description = "Whiteboard processed", body = ProcessingResult),
        (status = 400, description = "No image provided", body = ErrorBody),
        (status = 500, description = "Processing failed", body = ErrorBody)
    )
)]
pub async fn process_whiteboard(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<ProcessingResult>> {
    let request_id = Uuid::new_v4();

    // A body that isn't multipart at all is a processing failure, not a
    // missing image: the 400 is reserved for well-formed forms without one.
    let mut multipart = multipart.map_err(|e| Error::Processing {
        stage: Stage::Parse,
        source: anyhow!("Request body is not multipart form data: {}", e),
    })?;

    let mut image: Option<UploadedImage> = None;

    while let Some(field) = multipart.next_field().await.map_err(map_multipart_error)? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "image" => {
                if image.is_some() {
                    tracing::debug!(request_id = %request_id, "Ignoring additional image part");
                    continue;
                }

                // A plain form value named "image" is not a file upload
                let Some(file_name) = field.file_name().map(str::to_string) else {
                    tracing::debug!(request_id = %request_id, "Ignoring non-file form value named image");
                    continue;
                };

                // Capture part metadata before bytes() consumes the field
                let declared_type = field.content_type().map(str::to_string);

                let data = field.bytes().await.map_err(map_multipart_error)?;

                if data.is_empty() {
                    tracing::debug!(request_id = %request_id, filename = %file_name, "Ignoring empty image upload");
                    continue;
                }

                let media_type = resolve_media_type(declared_type, &file_name);

                tracing::info!(
                    request_id = %request_id,
                    filename = %file_name,
                    media_type = %media_type,
                    size_bytes = data.len(),
                    "Received whiteboard image"
                );

                image = Some(UploadedImage::new(data, media_type));
            }
            other => {
                tracing::debug!(request_id = %request_id, field = %other, "Ignoring unknown multipart field");
            }
        }
    }

    let image = image.ok_or(Error::MissingImage)?;
    let data_uri = image.to_data_uri();

    tracing::debug!(request_id = %request_id, "Starting extraction stage");
    let extracted_text = state
        .generate
        .extract(EXTRACTION_INSTRUCTION, &data_uri)
        .await
        .map_err(|source| Error::Processing {
            stage: Stage::Extraction,
            source,
        })?;

    tracing::debug!(request_id = %request_id, extracted_chars = extracted_text.len(), "Starting summarization stage");
    let summary = state
        .generate
        .summarize(&summary_prompt(&extracted_text))
        .await
        .map_err(|source| Error::Processing {
            stage: Stage::Summarization,
            source,
        })?;

    tracing::info!(
        request_id = %request_id,
        extracted_chars = extracted_text.len(),
        summary_chars = summary.len(),
        "Whiteboard processed"
    );

    Ok(Json(ProcessingResult { extracted_text, summary }))
}

/// Pick the media type for the data URI: the part's declared content type if
/// the browser sent one, otherwise a guess from the filename extension.
fn resolve_media_type(declared: Option<String>, file_name: &str) -> String {
    declared.unwrap_or_else(|| mime_guess::from_path(file_name).first_or_octet_stream().to_string())
}

/// Errors while draining the form are processing failures, except for the
/// body-limit overflow which keeps its 413.
fn map_multipart_error(e: MultipartError) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return Error::PayloadTooLarge {
            message: "Uploaded image exceeds the configured size limit".to_string(),
        };
    }
    Error::Processing {
        stage: Stage::Parse,
        source: anyhow!("Failed to read multipart data: {}", e),
    }
}
