//! Core configuration types and errors for dirwatch.
//!
//! This crate provides the pieces shared across the workspace:
//!
//! - [`WatchConfig`] and [`Config`] describing what to watch
//! - [`ConfigError`] for loading and validation failures

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;

pub use config::{Config, DEFAULT_FILTER, WatchConfig};
pub use error::ConfigError;
