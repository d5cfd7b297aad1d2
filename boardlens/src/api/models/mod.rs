//! API request and response data models.
//!
//! This module contains the data structures used for HTTP request deserialization
//! and response serialization. These models define the public API contract.
//!
//! # Design Principles
//!
//! - **Field naming**: Response bodies use camelCase field names, matching what
//!   the browser frontend expects
//! - **OpenAPI**: All models are annotated with `utoipa` for automatic API docs
//!
//! # Model Categories
//!
//! - [`whiteboard`]: Uploaded image data, processing results, and error bodies

pub mod whiteboard;
