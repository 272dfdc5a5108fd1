//! HTTP API layer for academy-rs.
//!
//! This crate exposes the enrollment workflows over JSON:
//!
//! - **Endpoints**: one `POST` route per workflow operation
//! - **Extractors**: acting user supplied by the upstream gateway
//! - **Middleware**: request metrics
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::{AppState, metrics_middleware};
