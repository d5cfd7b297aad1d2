//! Shared helpers for the crate's test modules.

use crate::config::Config;
use crate::generate::Generate;
use async_trait::async_trait;
use axum_test::TestServer;
use std::sync::{Arc, Mutex};

pub fn create_test_config() -> Config {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        ..Default::default()
    }
}

/// Build a test server around the full router with a scripted generation
/// backend in place of the HTTP client.
pub fn create_test_app(generate: Arc<dyn Generate>) -> TestServer {
    let config = create_test_config();
    let state = crate::AppState::builder().config(Arc::new(config)).generate(generate).build();
    let router = crate::build_router(state).expect("Failed to build router");
    TestServer::new(router).expect("Failed to create test server")
}

/// Canned `Generate` implementation. Each stage returns its scripted output
/// (or error), and every call is recorded for assertions.
pub struct ScriptedGenerate {
    extraction: Result<String, String>,
    summary: Result<String, String>,
    pub extract_calls: Mutex<Vec<(String, String)>>,
    pub summarize_calls: Mutex<Vec<String>>,
}

impl ScriptedGenerate {
    pub fn succeeding(extraction: &str, summary: &str) -> Self {
        Self {
            extraction: Ok(extraction.to_string()),
            summary: Ok(summary.to_string()),
            extract_calls: Mutex::new(Vec::new()),
            summarize_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_extraction(message: &str) -> Self {
        Self {
            extraction: Err(message.to_string()),
            summary: Err("summarization should not have run".to_string()),
            extract_calls: Mutex::new(Vec::new()),
            summarize_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_summary(message: &str) -> Self {
        Self {
            extraction: Ok("extracted".to_string()),
            summary: Err(message.to_string()),
            extract_calls: Mutex::new(Vec::new()),
            summarize_calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Generate for ScriptedGenerate {
    async fn extract(&self, instruction: &str, image_data_uri: &str) -> anyhow::Result<String> {
        self.extract_calls
            .lock()
            .unwrap()
            .push((instruction.to_string(), image_data_uri.to_string()));
        self.extraction.clone().map_err(|message| anyhow::anyhow!(message))
    }

    async fn summarize(&self, prompt: &str) -> anyhow::Result<String> {
        self.summarize_calls.lock().unwrap().push(prompt.to_string());
        self.summary.clone().map_err(|message| anyhow::anyhow!(message))
    }
}
