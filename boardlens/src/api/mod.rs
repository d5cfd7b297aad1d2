//! API layer for HTTP request handling and data models.
//!
//! This module contains the REST API implementation, organized into:
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! - **Whiteboard processing** (`/api/process-whiteboard`): Photo upload and
//!   the two-stage extraction/summarization pipeline
//! - **Frontend** (`/`, `/index.html`, ...): Embedded single-page app assets
//!
//! # OpenAPI Documentation
//!
//! The processing endpoint is documented with OpenAPI annotations using `utoipa`.
//! API documentation is available at `/docs` when the server is running.

pub mod handlers;
pub mod models;
