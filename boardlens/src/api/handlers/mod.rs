//! HTTP request handlers for all API endpoints.
//!
//! This module contains Axum route handlers organized by resource type.
//! Each handler is responsible for:
//! - Request validation and deserialization
//! - Business logic execution
//! - Response serialization
//!
//! # Handler Modules
//!
//! - [`whiteboard`]: Multipart photo upload and the extraction/summarization pipeline
//! - [`static_assets`]: Frontend asset serving and SPA routing
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`] which automatically converts to
//! appropriate HTTP status codes and JSON error responses.

pub mod static_assets;
pub mod whiteboard;
