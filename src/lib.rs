#![deny(missing_docs)]

//! Core library for the student records HTTP service.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Structured logging and tracing setup.
pub mod logging;
/// Record service coordinating uploads and the store.
pub mod records;
/// Document store integrations.
pub mod store;
/// The student entity and its field sets.
pub mod student;
/// Local blob storage for uploaded images.
pub mod uploads;
