//! Shelf Common Library
//!
//! Shared utilities for the Shelf workspace members.
//!
//! - **Error Handling**: the [`ShelfError`] type and [`Result`] alias
//! - **Logging**: tracing subscriber bootstrap driven by environment variables
//!
//! # Example
//!
//! ```no_run
//! use shelf_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> shelf_common::Result<()> {
//!     let config = LogConfig::from_env()?;
//!     let _guard = init_logging(&config)?;
//!     tracing::info!("Application started");
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;

pub use error::{Result, ShelfError};
