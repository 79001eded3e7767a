//! Shared utilities for screener-rs
//!
//! This crate provides the ambient pieces used by the screener binaries:
//! tracing setup and layered configuration.

pub mod config;
pub mod logging;

pub use config::{Config, ConfigBuilder, ConfigError, LogFormat};
pub use logging::init_tracing;
