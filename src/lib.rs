/// Basic application code
pub mod app;
/// REST clients for outside services
pub mod client;
/// Controllers for REST endpoints
pub mod controller;
/// Newsletter fan-out to subscribers, and the background worker driving it
pub mod dispatch;
/// Domain objects
pub mod domain;
/// Error enums
pub mod error;
/// Public URLs embedded in emails
pub mod links;
/// Uploaded media storage
pub mod media;
/// Stored records
pub mod model;
/// Repositories
pub mod repo;
/// Time-driven delivery of scheduled newsletters
pub mod scheduler;
/// Application settings
pub mod settings;
/// Application telemetry for tracing and logging
pub mod telemetry;
