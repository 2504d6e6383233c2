#![deny(missing_docs)]

//! Core library for the document query service.

/// HTTP routing and REST handlers.
pub mod api;
/// SQLite-backed document catalog and query log.
pub mod catalog;
/// Environment-driven configuration management.
pub mod config;
/// Text extraction for the supported upload formats.
pub mod extract;
/// Gemini embedding and generation client.
pub mod gemini;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion and query metrics helpers.
pub mod metrics;
/// Pinecone vector store integration.
pub mod pinecone;
/// Document processing pipeline utilities.
pub mod processing;
