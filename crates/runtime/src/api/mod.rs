//! HTTP API for the answer-and-reflect workflow
//!
//! Conditionally compiled behind the `http-api` feature flag.

#[cfg(feature = "http-api")]
pub mod server;

#[cfg(feature = "http-api")]
pub mod routes;

#[cfg(feature = "http-api")]
pub mod types;

#[cfg(feature = "http-api")]
pub use server::{ApiServerError, HttpApiConfig, HttpApiServer};

#[cfg(feature = "http-api")]
pub use types::{ErrorResponse, HealthResponse, RootResponse};
