//! Common utilities and shared types for academy-rs.
//!
//! This crate provides foundational components used across all academy-rs crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based entity identifiers and prefixed business codes via [`IdGenerator`]
//! - **Metrics**: Workflow counters via [`Metrics`]
//!
//! # Example
//!
//! ```no_run
//! use academy_common::{AppResult, CodeKind, Config, IdGenerator};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let code = id_gen.generate_code(CodeKind::EnrollmentRequest);
//!     println!("{} listening on port {}", code, config.server.port);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod metrics;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::{CodeKind, CodeSource, IdGenerator, RandomCodeSource};
pub use metrics::{Metrics, MetricsSnapshot, get_metrics};
