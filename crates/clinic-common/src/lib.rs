//! Clinic Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared pieces used by every workspace member:
//!
//! - **Error Handling**: the crate-wide [`ClinicError`] and its `Result` alias
//! - **Logging**: subscriber setup driven by `LOG_*` environment variables
//!
//! # Example
//!
//! ```no_run
//! use clinic_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_logging(&LogConfig::from_env()?)?;
//!     tracing::info!("ready");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;

pub use error::{ClinicError, Result};
