use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// An image pulled out of the multipart upload, ready for the vision stage.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// Raw image bytes exactly as uploaded
    pub data: Bytes,
    /// MIME type of the image (e.g., "image/png")
    pub media_type: String,
}

impl UploadedImage {
    pub fn new(data: Bytes, media_type: impl Into<String>) -> Self {
        Self {
            data,
            media_type: media_type.into(),
        }
    }

    /// Encode as a `data:` URI suitable for an OpenAI-style `image_url` content part.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.media_type, BASE64_STANDARD.encode(&self.data))
    }
}

/// Result of a completed processing run
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResult {
    /// Verbatim output of the vision extraction stage
    pub extracted_text: String,
    /// Output of the summarization stage
    pub summary: String,
}

/// Error response body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_uri_encoding() {
        let image = UploadedImage::new(Bytes::from_static(b"hello"), "image/png");
        assert_eq!(image.to_data_uri(), "data:image/png;base64,aGVsbG8=");
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let result = ProcessingResult {
            extracted_text: "- item".to_string(),
            summary: "One item.".to_string(),
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json, serde_json::json!({"extractedText": "- item", "summary": "One item."}));
    }
}
