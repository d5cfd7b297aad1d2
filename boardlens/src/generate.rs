//! Text generation client for the processing pipeline.
//!
//! Both pipeline stages talk to the same OpenAI-compatible chat completions
//! endpoint: extraction sends a vision message (instruction text plus the image
//! as a `data:` URI), summarization sends a plain text prompt. The [`Generate`]
//! trait is the seam that lets handler tests run against a scripted
//! implementation instead of a live endpoint.

use crate::config::GenerationConfig;
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use url::Url;

/// A trait for running chat completions against a generation endpoint.
/// In production this is `GenerateReqwest`, which speaks the OpenAI wire
/// format over HTTP via the `reqwest` library.
#[async_trait]
pub trait Generate: Send + Sync {
    /// Run the vision extraction stage: instruction text plus the image,
    /// returning the model's transcription of the whiteboard.
    async fn extract(&self, instruction: &str, image_data_uri: &str) -> anyhow::Result<String>;

    /// Run the summarization stage on a fully rendered prompt.
    async fn summarize(&self, prompt: &str) -> anyhow::Result<String>;
}

/// The concrete implementation of `Generate`.
pub struct GenerateReqwest {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    extraction_model: String,
    summary_model: String,
}

impl GenerateReqwest {
    pub fn new(config: &GenerationConfig) -> anyhow::Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            debug!("Generation requests will time out after {}", humantime::format_duration(timeout));
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.url.clone(),
            api_key: config.api_key.clone(),
            extraction_model: config.extraction_model.clone(),
            summary_model: config.summary_model.clone(),
        })
    }

    /// Send one chat completion request and return the first choice's content.
    async fn chat(&self, model: &str, messages: serde_json::Value) -> anyhow::Result<String> {
        let url = ensure_slash(&self.base_url)
            .join("chat/completions")
            .map_err(|e| anyhow!("Failed to construct chat completions URL: {}", e))?;

        debug!("Sending chat completion request for model {} to {}", model, url);

        let payload = json!({
            "model": model,
            "messages": messages,
        });

        let mut request = self.client.post(url.clone()).json(&payload);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Chat completion request to {} failed with status {}", url, status);
            return Err(anyhow!("Generation API error: {} - {}", status, body));
        }

        // Get the response body as text first for logging
        let body_text = response.text().await?;
        debug!("Chat completion response body: {}", body_text);

        let completion = match serde_json::from_str::<ChatCompletion>(&body_text) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::error!("Failed to parse chat completion response as JSON. Error: {}", e);
                tracing::error!("Response body was: {}", body_text);
                return Err(anyhow!("error decoding response body: {}", e));
            }
        };

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("Generation API returned no message content"))
    }
}

#[async_trait]
impl Generate for GenerateReqwest {
    async fn extract(&self, instruction: &str, image_data_uri: &str) -> anyhow::Result<String> {
        // Text part first, then the image, matching the order vision models
        // are prompted with elsewhere in the OpenAI ecosystem.
        let messages = json!([
            {
                "role": "user",
                "content": [
                    {
                        "type": "text",
                        "text": instruction,
                    },
                    {
                        "type": "image_url",
                        "image_url": {
                            "url": image_data_uri,
                        },
                    },
                ],
            }
        ]);

        self.chat(&self.extraction_model, messages).await
    }

    async fn summarize(&self, prompt: &str) -> anyhow::Result<String> {
        let messages = json!([
            {
                "role": "user",
                "content": prompt,
            }
        ]);

        self.chat(&self.summary_model, messages).await
    }
}

/// Makes sure a url has a trailing slash.
///
/// This fixes a weird idiosyncracy in rusts 'join' method on urls, where joining URLs like
/// '/hello', 'world' gives you '/world', but '/hello/', 'world' gives you '/hello/world'.
/// Basically, call this before calling .join
fn ensure_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        url.clone()
    } else {
        let mut new_url = url.clone();
        let mut path = new_url.path().to_string();
        path.push('/');
        new_url.set_path(&path);
        new_url
    }
}

/// The slice of the chat completions response we care about. Unknown fields
/// (usage, ids, timestamps) are ignored during deserialization.
#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(url: &str, api_key: Option<&str>) -> GenerationConfig {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
        GenerationConfig {
            url: Url::parse(url).unwrap(),
            api_key: api_key.map(String::from),
            extraction_model: "vision-model".to_string(),
            summary_model: "summary-model".to_string(),
            request_timeout: None,
        }
    }

    fn completion_body(content: &str) -> serde_json::Value {
        json!({
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "choices": [
                {
                    "index": 0,
                    "message": {"role": "assistant", "content": content},
                    "finish_reason": "stop"
                }
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        })
    }

    #[tokio::test]
    async fn test_extract_sends_text_then_image() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("- buy milk")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let generate = GenerateReqwest::new(&test_config(&mock_server.uri(), None)).unwrap();
        let result = generate.extract("Read the board.", "data:image/png;base64,AAAA").await.unwrap();
        assert_eq!(result, "- buy milk");

        let requests = mock_server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();

        assert_eq!(body["model"], "vision-model");
        let content = &body["messages"][0]["content"];
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[0]["text"], "Read the board.");
        assert_eq!(content[1]["type"], "image_url");
        assert_eq!(content[1]["image_url"]["url"], "data:image/png;base64,AAAA");
    }

    #[tokio::test]
    async fn test_summarize_sends_plain_prompt() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("A summary.")))
            .mount(&mock_server)
            .await;

        let generate = GenerateReqwest::new(&test_config(&mock_server.uri(), Some("sk-test"))).unwrap();
        let result = generate.summarize("Summarize this.").await.unwrap();
        assert_eq!(result, "A summary.");

        let requests = mock_server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();

        assert_eq!(body["model"], "summary-model");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Summarize this.");

        let auth = requests[0].headers.get("authorization").unwrap();
        assert_eq!(auth, "Bearer sk-test");
    }

    #[tokio::test]
    async fn test_no_auth_header_without_api_key() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("ok")))
            .mount(&mock_server)
            .await;

        let generate = GenerateReqwest::new(&test_config(&mock_server.uri(), None)).unwrap();
        generate.summarize("hi").await.unwrap();

        let requests = mock_server.received_requests().await.unwrap();
        assert!(!requests[0].headers.contains_key("authorization"));
    }

    #[tokio::test]
    async fn test_base_url_path_is_preserved() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("ok")))
            .expect(1)
            .mount(&mock_server)
            .await;

        // No trailing slash on /v1; join must not swallow the path segment.
        let generate = GenerateReqwest::new(&test_config(&format!("{}/v1", mock_server.uri()), None)).unwrap();
        generate.summarize("hi").await.unwrap();
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&mock_server)
            .await;

        let generate = GenerateReqwest::new(&test_config(&mock_server.uri(), None)).unwrap();
        let err = generate.summarize("hi").await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("500"), "unexpected error: {msg}");
        assert!(msg.contains("upstream exploded"), "unexpected error: {msg}");
    }

    #[tokio::test]
    async fn test_invalid_json_is_an_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway error</html>"))
            .mount(&mock_server)
            .await;

        let generate = GenerateReqwest::new(&test_config(&mock_server.uri(), None)).unwrap();
        assert!(generate.summarize("hi").await.is_err());
    }

    #[tokio::test]
    async fn test_empty_choices_is_an_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&mock_server)
            .await;

        let generate = GenerateReqwest::new(&test_config(&mock_server.uri(), None)).unwrap();
        assert!(generate.extract("instr", "data:,").await.is_err());
    }

    #[tokio::test]
    async fn test_null_content_is_an_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"choices": [{"message": {"role": "assistant"}}]})),
            )
            .mount(&mock_server)
            .await;

        let generate = GenerateReqwest::new(&test_config(&mock_server.uri(), None)).unwrap();
        assert!(generate.summarize("hi").await.is_err());
    }

    #[tokio::test]
    async fn test_empty_content_passes_through() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("")))
            .mount(&mock_server)
            .await;

        let generate = GenerateReqwest::new(&test_config(&mock_server.uri(), None)).unwrap();
        assert_eq!(generate.summarize("hi").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_error() {
        // Port 1 is never listening locally
        let generate = GenerateReqwest::new(&test_config("http://127.0.0.1:1/v1", None)).unwrap();
        assert!(generate.summarize("hi").await.is_err());
    }

    #[test]
    fn test_ensure_slash() {
        let no_slash = Url::parse("http://example.com/v1").unwrap();
        assert_eq!(ensure_slash(&no_slash).join("chat/completions").unwrap().path(), "/v1/chat/completions");

        let with_slash = Url::parse("http://example.com/v1/").unwrap();
        assert_eq!(ensure_slash(&with_slash).join("chat/completions").unwrap().path(), "/v1/chat/completions");
    }
}
