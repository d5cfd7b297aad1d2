//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `BOARDLENS_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `BOARDLENS_` override YAML values
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `BOARDLENS_GENERATION__API_KEY=sk-...` sets the `generation.api_key` field.
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use boardlens::config::{Args, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let args = Args::parse();
//! let config = Config::load(&args)?;
//!
//! println!("Server will bind to {}:{}", config.host, config.port);
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration Structure
//!
//! See the repository's `config.yaml` for a complete commented example. Key sections:
//!
//! - **Server**: `host`, `port` - HTTP server binding configuration
//! - **Generation**: `generation.url`, `generation.api_key`, `generation.extraction_model`,
//!   `generation.summary_model`, `generation.request_timeout` - the model endpoint
//! - **Security**: `cors` - CORS settings
//! - **Limits**: `limits.max_upload_bytes` - optional upload size cap (unlimited by default)
//! - **Features**: `enable_metrics`, `enable_otel_export` - optional feature toggles
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Override server port
//! BOARDLENS_PORT=8080
//!
//! # Point at a different OpenAI-compatible endpoint
//! BOARDLENS_GENERATION__URL="http://localhost:8000/v1"
//!
//! # Supply the API key without putting it in the file
//! BOARDLENS_GENERATION__API_KEY="sk-..."
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "BOARDLENS_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines to catch config errors before deployment.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// This is the root configuration structure loaded from YAML and environment variables.
/// All fields have sensible defaults defined in the `Default` implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// External text-generation service used for both pipeline stages
    pub generation: GenerationConfig,
    /// CORS settings for the HTTP surface
    pub cors: CorsConfig,
    /// Request size limits
    pub limits: LimitsConfig,
    /// Serve Prometheus metrics at /metrics
    pub enable_metrics: bool,
    /// Export traces over OTLP (configured via OTEL_* environment variables)
    pub enable_otel_export: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            generation: GenerationConfig::default(),
            cors: CorsConfig::default(),
            limits: LimitsConfig::default(),
            enable_metrics: false,
            enable_otel_export: false,
        }
    }
}

/// Connection settings for the OpenAI-compatible generation endpoint.
///
/// Both pipeline stages go through the same endpoint. The extraction stage
/// needs a vision-capable model; the summarization stage does not, so the
/// two model names are configurable independently.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationConfig {
    /// Base URL of the chat completions API (e.g., "https://api.openai.com/v1")
    pub url: Url,
    /// Bearer token sent with generation requests, if the endpoint needs one
    pub api_key: Option<String>,
    /// Model used for the vision extraction stage
    pub extraction_model: String,
    /// Model used for the summarization stage
    pub summary_model: String,
    /// Client-side timeout for generation requests (e.g., "90s").
    /// Unset by default: requests wait as long as the upstream service does.
    #[serde(default, with = "humantime_serde")]
    pub request_timeout: Option<Duration>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            url: Url::parse("https://api.openai.com/v1").unwrap(),
            api_key: None,
            extraction_model: "gpt-4o".to_string(),
            summary_model: "gpt-4o".to_string(),
            request_timeout: None,
        }
    }
}

/// CORS configuration for browser clients.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests. Use "*" for wildcard.
    pub allowed_origins: Vec<CorsOrigin>,
    /// Allow credentials (cookies) in CORS requests
    pub allow_credentials: bool,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            // The frontend is served from the same origin, so the permissive
            // default costs nothing; tighten it when embedding elsewhere.
            allowed_origins: vec![CorsOrigin::Wildcard],
            allow_credentials: false,
            max_age: Some(3600), // Cache preflight for 1 hour
        }
    }
}

/// One entry in the allowed origins list.
///
/// Either a wildcard (`*`) allowing all origins, or a specific URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://app.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

/// Request size limits.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum accepted upload size in bytes. Unset means no cap is applied,
    /// matching the behavior of accepting whatever the browser sends.
    pub max_upload_bytes: Option<usize>,
}

impl Config {
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            .merge(Env::prefixed("BOARDLENS_").split("__"))
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.generation.extraction_model.is_empty() {
            anyhow::bail!("Config validation: generation.extraction_model cannot be empty");
        }

        if self.generation.summary_model.is_empty() {
            anyhow::bail!("Config validation: generation.summary_model cannot be empty");
        }

        // Validate CORS configuration
        if self.cors.allowed_origins.is_empty() {
            anyhow::bail!("Config validation: cors.allowed_origins cannot be empty. Add at least one allowed origin.");
        }

        // Validate that wildcard is not used with credentials
        let has_wildcard = self.cors.allowed_origins.iter().any(|origin| matches!(origin, CorsOrigin::Wildcard));
        if has_wildcard && self.cors.allow_credentials {
            anyhow::bail!("Config validation: CORS cannot use wildcard origin '*' with allow_credentials=true. Specify explicit origins.");
        }

        if self.limits.max_upload_bytes == Some(0) {
            anyhow::bail!("Config validation: limits.max_upload_bytes cannot be 0. Omit it to disable the cap.");
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
